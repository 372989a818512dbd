use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use crossbeam_channel::bounded;
use wry::application::{
    dpi::{LogicalPosition, LogicalSize},
    event::{Event, KeyEvent, StartCause, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    keyboard::Key,
    window::{Fullscreen, Window, WindowBuilder},
};
use wry::webview::WebViewBuilder;

mod assets;
mod events;
mod ipc;
mod settings;
mod worker;

use events::ShellEvent;
use settings::{load_settings, resolve_config_dir, Settings, WindowMode};
use vitrine_bridge::settle_script;
use vitrine_host::CommandTable;

#[derive(Debug, Parser)]
#[command(name = "vitrine", about = "Webview shell with an async host command bridge")]
struct Cli {
    /// Directory holding vitrine.toml and the page assets
    #[arg(long)]
    config_dir: Option<PathBuf>,
    /// Load this URL instead of index.html from the config directory
    #[arg(long)]
    url: Option<String>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();
    let config_dir = resolve_config_dir(cli.config_dir);
    let settings = load_settings(&config_dir)?;
    let table = CommandTable::from_config(&settings.commands)
        .context("invalid [commands] configuration")?;

    let event_loop = EventLoop::<ShellEvent>::with_user_event();
    let proxy = event_loop.create_proxy();

    let (cmd_tx, cmd_rx) = bounded(settings.bridge.queue_depth);
    worker::launch(cmd_rx, proxy.clone(), table, settings.bridge);

    let window = build_window(&event_loop, &settings)?;

    let url = cli
        .url
        .unwrap_or_else(|| assets::start_url(&config_dir, "index.html"));
    tracing::info!(%url, "vitrine starting");

    let asset_root = config_dir.clone();
    let ipc_proxy = proxy.clone();
    let webview = WebViewBuilder::new(window)
        .context("failed to create webview")?
        .with_transparent(settings.window.transparent)
        .with_devtools(settings.debug.devtools)
        .with_ipc_handler(move |_window: &Window, raw: String| {
            if let Some(reply) = ipc::intake(&raw, &cmd_tx) {
                let _ = ipc_proxy.send_event(ShellEvent::BridgeReply(reply));
            }
        })
        .with_custom_protocol(assets::SCHEME.into(), move |request| {
            assets::handle(&asset_root, request)
        })
        .with_url(&url)
        .context("failed to load start url")?
        .build()
        .context("failed to build webview")?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            Event::NewEvents(StartCause::Init) => tracing::debug!("event loop started"),
            Event::UserEvent(ShellEvent::BridgeReply(reply)) => match settle_script(&reply) {
                Ok(script) => {
                    if let Err(err) = webview.evaluate_script(&script) {
                        tracing::warn!(id = %reply.id, "failed to settle bridge reply: {err}");
                    }
                }
                Err(err) => {
                    tracing::warn!(id = %reply.id, "failed to serialize bridge reply: {err}");
                }
            },
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => *control_flow = ControlFlow::Exit,
            Event::WindowEvent {
                event:
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                logical_key: Key::Escape,
                                ..
                            },
                        ..
                    },
                ..
            } => *control_flow = ControlFlow::Exit,
            _ => (),
        }
    });
}

fn build_window(event_loop: &EventLoop<ShellEvent>, settings: &Settings) -> anyhow::Result<Window> {
    let window = WindowBuilder::new()
        .with_title(settings.window.title.clone())
        .with_decorations(settings.window.decorated)
        .with_always_on_top(settings.window.always_on_top)
        .with_transparent(settings.window.transparent)
        .with_fullscreen(match settings.window.mode {
            WindowMode::Fullscreen => Some(Fullscreen::Borderless(None)),
            _ => None,
        })
        .build(event_loop)
        .context("failed to create window")?;

    match settings.window.mode {
        WindowMode::Windowed => {
            // only touch geometry when configured, otherwise let the WM place us
            if let Some([width, height]) = settings.window.size {
                window.set_inner_size(LogicalSize::new(width, height));
            }
            if let Some([x, y]) = settings.window.position {
                window.set_outer_position(LogicalPosition::new(x, y));
            }
        }
        WindowMode::Borderless => {
            if let Some(monitor) = window.primary_monitor() {
                window.set_inner_size(monitor.size());
                window.set_outer_position(monitor.position());
            }
        }
        WindowMode::Fullscreen => {}
    }

    Ok(window)
}
