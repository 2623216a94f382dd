use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::session::SessionControl;

/// The single authoritative answer to "is the target running".
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceState {
    /// No observation has arrived yet; only valid before the first check.
    Unknown,
    NotRunning,
    Running,
}

/// Core state machine reconciling the two signal sources (notification
/// bridge and poll loop) into presence-session start/stop transitions.
///
/// Both sources funnel through [`report_observation`], so the watcher never
/// needs to care which of them spoke: repeated identical observations are
/// no-ops, and each effective edge drives the session controller exactly
/// once. Must only be driven from the daemon's single-writer event loop.
///
/// [`report_observation`]: PresenceWatcher::report_observation
pub struct PresenceWatcher<S> {
    state: PresenceState,
    session: S,
    /// Message of the most recent session-start failure, kept for the status
    /// file until the episode ends or a later start succeeds.
    session_error: Option<String>,
}

impl<S: SessionControl> PresenceWatcher<S> {
    pub fn new(session: S) -> Self {
        Self {
            state: PresenceState::Unknown,
            session,
            session_error: None,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    pub fn session_active(&self) -> bool {
        self.session.is_active()
    }

    pub fn session_error(&self) -> Option<&str> {
        self.session_error.as_deref()
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Feeds one level observation from either signal source into the state
    /// machine. Returns whether anything observable changed, so the caller
    /// knows when to republish status.
    ///
    /// A session-start failure is absorbed here: the target is still
    /// considered Running, the error is recorded for the status file, and the
    /// next `Running → NotRunning` edge clears it. Presence detection and
    /// session health are independent.
    pub fn report_observation(&mut self, present: bool, config: &Config) -> bool {
        match (present, self.state) {
            (true, PresenceState::Running) => false,
            (true, _) => {
                self.state = PresenceState::Running;
                eprintln!(
                    "[watcher] Target detected: {}",
                    config.monitor.executable_name
                );
                match self.session.start(config) {
                    Ok(()) => self.session_error = None,
                    Err(e) => {
                        eprintln!("[watcher] Failed to start presence session: {e:#}");
                        self.session_error = Some(format!("Presence session failed: {e:#}"));
                    }
                }
                true
            }
            (false, PresenceState::Running) => {
                self.state = PresenceState::NotRunning;
                eprintln!(
                    "[watcher] Target exited: {}",
                    config.monitor.executable_name
                );
                self.session.stop();
                self.session_error = None;
                true
            }
            (false, PresenceState::Unknown) => {
                // First observation with the target absent. No session was
                // ever started, so there is nothing to stop.
                self.state = PresenceState::NotRunning;
                true
            }
            (false, PresenceState::NotRunning) => false,
        }
    }

    /// Fail-safe cleanup: force-stops any active session regardless of the
    /// current state and settles at NotRunning. Safe to call at any point,
    /// including before the first observation.
    pub fn shutdown(&mut self) {
        self.session.stop();
        self.session_error = None;
        self.state = PresenceState::NotRunning;
    }
}
