//! Backend worker: executes bridge requests off the event-loop thread.
//!
//! One dedicated thread owns a multi-threaded tokio runtime. Requests
//! arrive on a bounded crossbeam channel; every request is registered in
//! the pending registry and executed as a task. Replies cross back to the
//! event loop only through the `EventLoopProxy`, where the settle script
//! is evaluated in the webview.

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use wry::application::event_loop::EventLoopProxy;

use vitrine_bridge::{
    BridgeError, BridgeReply, ErrorCode, IpcRequest, PendingRegistry, RegistryError,
};
use vitrine_host::{CommandTable, HostError};

use crate::events::ShellEvent;
use crate::settings::BridgeSettings;

const SWEEP_INTERVAL: Duration = Duration::from_millis(250);

pub fn launch(
    cmd_rx: Receiver<IpcRequest>,
    proxy: EventLoopProxy<ShellEvent>,
    table: CommandTable,
    settings: BridgeSettings,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                tracing::error!("failed to build bridge worker runtime: {err}");
                return;
            }
        };

        runtime.block_on(run(cmd_rx, proxy, table, settings));
    });
}

async fn run(
    cmd_rx: Receiver<IpcRequest>,
    proxy: EventLoopProxy<ShellEvent>,
    table: CommandTable,
    settings: BridgeSettings,
) {
    let registry = Arc::new(Mutex::new(PendingRegistry::new(
        settings.max_in_flight,
        Duration::from_millis(settings.timeout_ms),
    )));
    let table = Arc::new(table);

    spawn_sweeper(Arc::clone(&registry), proxy.clone(), settings.timeout_ms);
    tracing::debug!(
        timeout_ms = settings.timeout_ms,
        max_in_flight = settings.max_in_flight,
        "bridge worker ready"
    );

    while let Ok(request) = cmd_rx.recv() {
        let IpcRequest { id, command, args } = request;

        if let Err(err) = lock(&registry).insert(&id, &command, Instant::now()) {
            let code = match err {
                RegistryError::Overloaded { .. } => ErrorCode::Overloaded,
                RegistryError::DuplicateId(_) => ErrorCode::InvalidRequest,
            };
            let _ = proxy.send_event(ShellEvent::BridgeReply(BridgeReply::rejected(
                id,
                BridgeError::new(code, err.to_string()),
            )));
            continue;
        }

        let registry = Arc::clone(&registry);
        let proxy = proxy.clone();
        let table = Arc::clone(&table);
        tokio::spawn(async move {
            let outcome = table.run(&command, &args).await;

            if lock(&registry).complete(&id).is_none() {
                // the sweeper already rejected this request as timed out
                tracing::debug!(%id, %command, "discarding late completion");
                return;
            }

            let _ = proxy.send_event(ShellEvent::BridgeReply(reply_for(id, outcome)));
        });
    }

    tracing::debug!("bridge command queue closed; worker exiting");
}

fn spawn_sweeper(
    registry: Arc<Mutex<PendingRegistry>>,
    proxy: EventLoopProxy<ShellEvent>,
    timeout_ms: u64,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let expired = lock(&registry).sweep_expired(Instant::now());
            for (id, entry) in expired {
                tracing::debug!(%id, command = %entry.command, "bridge request timed out");
                let _ = proxy.send_event(ShellEvent::BridgeReply(BridgeReply::rejected(
                    id,
                    BridgeError::new(
                        ErrorCode::TimedOut,
                        format!("{:?} did not complete within {timeout_ms}ms", entry.command),
                    ),
                )));
            }
        }
    });
}

fn reply_for(id: String, outcome: Result<String, HostError>) -> BridgeReply {
    match outcome {
        Ok(value) => BridgeReply::resolved(id, value),
        Err(err @ HostError::UnknownCommand(_)) => BridgeReply::rejected(
            id,
            BridgeError::new(ErrorCode::UnknownCommand, err.to_string()),
        ),
        Err(err) => BridgeReply::rejected(
            id,
            BridgeError::new(ErrorCode::CommandFailed, err.to_string()),
        ),
    }
}

fn lock(registry: &Mutex<PendingRegistry>) -> MutexGuard<'_, PendingRegistry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_outcome_resolves_with_the_value() {
        let reply = reply_for("req-1".to_string(), Ok("Linux".to_string()));
        assert!(reply.ok);
        assert_eq!(reply.value.as_deref(), Some("Linux"));
    }

    #[test]
    fn unknown_command_maps_to_its_own_code() {
        let reply = reply_for(
            "req-1".to_string(),
            Err(HostError::UnknownCommand("nope".to_string())),
        );
        assert_eq!(reply.error.expect("error").code, ErrorCode::UnknownCommand);
    }

    #[test]
    fn other_host_errors_map_to_command_failed() {
        let reply = reply_for(
            "req-1".to_string(),
            Err(HostError::EmptyCommand("bad".to_string())),
        );
        assert_eq!(reply.error.expect("error").code, ErrorCode::CommandFailed);
    }
}
