use crate::config::Config;

pub enum DaemonEvent {
    /// A signal source's current belief about target presence.
    ///
    /// This is a level, not an edge: both the poll loop and the notification
    /// bridge report "present" or "absent" based on their own check, and the
    /// watcher computes the transitions.
    Observation { present: bool },
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Ctrl+C or SIGTERM received; the daemon should stop the session and exit.
    Shutdown,
}
