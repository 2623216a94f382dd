use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

use crate::event::DaemonEvent;

pub const MIN_POLL_INTERVAL_SECS: u64 = 1;
pub const MAX_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
/// Process name CS2 runs under on every platform.
pub const DEFAULT_EXECUTABLE_NAME: &str = "cs2.exe";
/// Discord application id registered for CS2 rich presence.
pub const DEFAULT_CLIENT_ID: &str = "1158877933042143272";
pub const DEFAULT_DETAILS: &str = "Ranked Competitive";
pub const DEFAULT_STATE: &str = "Smurfing";
pub const DEFAULT_LARGE_IMAGE: &str = "cs2";
pub const DEFAULT_LARGE_TEXT: &str = "Counter-Strike 2";

#[cfg(windows)]
pub const DEFAULT_PYTHON_PATH: &str = "python";
#[cfg(not(windows))]
pub const DEFAULT_PYTHON_PATH: &str = "/usr/bin/python3";

/// Root configuration structure. Deserialized from config.toml in the
/// CrossStrike app data directory.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            presence: PresenceConfig::default(),
        }
    }
}

/// Target-process detection settings.
#[derive(Debug, Deserialize, Clone)]
pub struct MonitorConfig {
    /// Executable base name to detect (exact, case-sensitive match).
    /// Captured once at daemon startup; changing it requires a restart.
    #[serde(default = "default_executable_name")]
    pub executable_name: String,
    /// Seconds between process-table polls. Clamped to [1, 60].
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            executable_name: DEFAULT_EXECUTABLE_NAME.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl MonitorConfig {
    /// Returns the poll interval clamped to the supported range.
    pub fn effective_poll_interval_secs(&self) -> u64 {
        self.poll_interval_secs
            .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS)
    }
}

/// Fields published to Discord while the target is running, plus the
/// interpreter used to run the generated worker script.
#[derive(Debug, Deserialize, Clone)]
pub struct PresenceConfig {
    /// Discord application/client id the worker connects with.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Top "activity" line shown on the profile.
    #[serde(default = "default_details")]
    pub details: String,
    /// Second "state" line shown on the profile.
    #[serde(default = "default_state")]
    pub state: String,
    /// Asset key of the large profile image.
    #[serde(default = "default_large_image")]
    pub large_image: String,
    /// Hover text of the large profile image.
    #[serde(default = "default_large_text")]
    pub large_text: String,
    /// Interpreter used to run the generated worker script.
    #[serde(default = "default_python_path")]
    pub python_path: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            details: DEFAULT_DETAILS.to_string(),
            state: DEFAULT_STATE.to_string(),
            large_image: DEFAULT_LARGE_IMAGE.to_string(),
            large_text: DEFAULT_LARGE_TEXT.to_string(),
            python_path: DEFAULT_PYTHON_PATH.to_string(),
        }
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`.  Whenever the config
/// file is created or modified, reloads it and sends a `ConfigReloaded` event.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("[config] Failed to create file watcher: {e}");
            return;
        }
    };

    // Watch the parent directory rather than the file directly so we catch
    // editor-style atomic saves (write-new + rename).
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            eprintln!("[config] Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        eprintln!("[config] Failed to watch config directory: {e}");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load_or_default(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("[config] Failed to reload config: {e}"),
            }
        }
    }
}

fn default_executable_name() -> String {
    DEFAULT_EXECUTABLE_NAME.to_string()
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_details() -> String {
    DEFAULT_DETAILS.to_string()
}

fn default_state() -> String {
    DEFAULT_STATE.to_string()
}

fn default_large_image() -> String {
    DEFAULT_LARGE_IMAGE.to_string()
}

fn default_large_text() -> String {
    DEFAULT_LARGE_TEXT.to_string()
}

fn default_python_path() -> String {
    DEFAULT_PYTHON_PATH.to_string()
}
