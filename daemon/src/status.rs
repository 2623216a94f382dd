use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::watcher::PresenceState;

/// Runtime status written by the daemon to status.toml in the app data
/// directory. The menu-bar GUI reads this file (read-only) to render the
/// target and Discord indicators; it is the daemon's entire UI surface.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    /// Executable base name being watched.
    pub target: String,
    /// Current belief about the target process.
    pub state: PresenceState,
    /// Whether the Discord presence worker is currently active.
    pub session_active: bool,
    /// RFC 3339 timestamp of the most recent state transition, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition: Option<String>,
    /// Human-readable message of the most recent non-fatal error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonStatus {
    /// Constructs the initial status on daemon startup, before the first
    /// observation has arrived.
    pub fn new(target: String) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            target,
            state: PresenceState::Unknown,
            session_active: false,
            last_transition: None,
            error: None,
        }
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Logs errors to stderr rather than panicking; a status write failure must
/// never crash the daemon.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("[status] Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                eprintln!("[status] Failed to write status file: {e}");
            }
        }
        Err(e) => eprintln!("[status] Failed to serialize status: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> DaemonStatus {
        DaemonStatus::new("cs2.exe".to_string())
    }

    // ── DaemonStatus::new ─────────────────────────────────────────────────────

    #[test]
    fn new_starts_unknown_and_inactive() {
        let s = status();
        assert_eq!(s.state, PresenceState::Unknown);
        assert!(!s.session_active);
    }

    #[test]
    fn new_has_no_optional_fields() {
        let s = status();
        assert!(s.last_transition.is_none());
        assert!(s.error.is_none());
    }

    #[test]
    fn new_version_matches_cargo_pkg() {
        let s = status();
        assert_eq!(s.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn new_records_the_watched_target() {
        let s = status();
        assert_eq!(s.target, "cs2.exe");
    }

    // ── state serialization ───────────────────────────────────────────────────

    #[test]
    fn state_serializes_to_kebab_case() {
        let mut s = status();
        let unknown = toml::to_string_pretty(&s).unwrap();
        assert!(unknown.contains("state = \"unknown\""));

        s.state = PresenceState::Running;
        let running = toml::to_string_pretty(&s).unwrap();
        assert!(running.contains("state = \"running\""));

        s.state = PresenceState::NotRunning;
        let not_running = toml::to_string_pretty(&s).unwrap();
        assert!(not_running.contains("state = \"not-running\""));
    }

    #[test]
    fn state_round_trips_through_toml() {
        for state in [
            PresenceState::Unknown,
            PresenceState::NotRunning,
            PresenceState::Running,
        ] {
            let mut s = status();
            s.state = state;
            let serialized = toml::to_string_pretty(&s).unwrap();
            let deserialized: DaemonStatus = toml::from_str(&serialized).unwrap();
            assert_eq!(deserialized.state, state);
        }
    }

    // ── write_status ──────────────────────────────────────────────────────────

    #[test]
    fn write_status_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.toml");
        write_status(&path, &status());
        assert!(path.exists());
    }

    #[test]
    fn write_status_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dir").join("status.toml");
        write_status(&path, &status());
        assert!(path.exists());
    }

    #[test]
    fn write_status_content_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.toml");

        let mut original = status();
        original.state = PresenceState::Running;
        original.session_active = true;
        original.last_transition = Some("2026-08-06T12:00:00+00:00".to_string());

        write_status(&path, &original);

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: DaemonStatus = toml::from_str(&content).unwrap();

        assert_eq!(parsed.state, PresenceState::Running);
        assert!(parsed.session_active);
        assert_eq!(
            parsed.last_transition.as_deref(),
            Some("2026-08-06T12:00:00+00:00")
        );
    }

    #[test]
    fn write_status_omits_none_optional_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.toml");
        write_status(&path, &status());

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("last_transition"));
        assert!(!content.contains("error"));
    }

    #[test]
    fn write_status_includes_populated_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.toml");

        let mut s = status();
        s.error = Some("Presence session failed: spawn refused".to_string());
        write_status(&path, &s);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("error"));
        assert!(content.contains("spawn refused"));
    }
}
