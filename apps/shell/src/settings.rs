//! Shell configuration: `<config_dir>/vitrine.toml` with defaults and a
//! few environment overrides applied on top.

use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::Deserialize;

pub const SETTINGS_FILE: &str = "vitrine.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// Let the window manager place the window; size/position apply if set.
    Windowed,
    /// Undecorated window covering the primary monitor.
    Borderless,
    Fullscreen,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub title: String,
    pub decorated: bool,
    pub always_on_top: bool,
    pub transparent: bool,
    pub mode: WindowMode,
    pub size: Option<[u32; 2]>,
    pub position: Option<[i32; 2]>,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Vitrine".to_string(),
            decorated: false,
            always_on_top: false,
            transparent: true,
            mode: WindowMode::Windowed,
            size: None,
            position: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// A request not completed within this window is rejected as timed out.
    pub timeout_ms: u64,
    pub max_in_flight: usize,
    pub queue_depth: usize,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            max_in_flight: 64,
            queue_depth: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DebugSettings {
    pub devtools: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub window: WindowSettings,
    pub bridge: BridgeSettings,
    pub debug: DebugSettings,
    /// Command name -> command line, split on whitespace into an argv.
    pub commands: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            bridge: BridgeSettings::default(),
            debug: DebugSettings::default(),
            commands: default_commands(),
        }
    }
}

fn default_commands() -> HashMap<String, String> {
    HashMap::from([
        ("kernel_name".to_string(), "uname -sr".to_string()),
        ("host_name".to_string(), "uname -n".to_string()),
        ("user_name".to_string(), "id -un".to_string()),
    ])
}

pub fn resolve_config_dir(flag: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("vitrine");
    }
    dirs::home_dir()
        .map(|home| home.join(".config").join("vitrine"))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn load_settings(config_dir: &Path) -> anyhow::Result<Settings> {
    let path = config_dir.join(SETTINGS_FILE);
    let mut settings = match fs::read_to_string(&path) {
        Ok(raw) => toml::from_str(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?,
        Err(_) => Settings::default(),
    };
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(v) = env::var("VITRINE_DEVTOOLS") {
        settings.debug.devtools = matches!(v.as_str(), "1" | "true");
    }
    if let Ok(v) = env::var("VITRINE_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.bridge.timeout_ms = parsed;
        }
    }
}
