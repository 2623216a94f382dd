/// Generation of the presence worker script.
///
/// The worker is a self-contained Python program using `pypresence`: it
/// connects to Discord with the configured client id, publishes the activity
/// fields with a session-start timestamp, then idles on a keep-alive loop
/// until it receives SIGTERM/SIGINT, at which point it closes the connection
/// and exits. The daemon rewrites the file on every session start so config
/// changes take effect on the next episode.
use anyhow::{Context, Result};
use std::path::Path;

use crate::config::PresenceConfig;

/// Escapes a configuration value for embedding inside a double-quoted
/// Python string literal.
fn py_str(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Renders the worker script for `presence`.
pub fn render(presence: &PresenceConfig) -> String {
    format!(
        r#"#!/usr/bin/env python3
import signal
import sys
import time

try:
    from pypresence import Presence
except ImportError:
    print("ERROR: pypresence module not found!")
    print("Please install it by running: pip3 install pypresence")
    sys.exit(1)

CLIENT_ID = "{client_id}"

rpc = Presence(CLIENT_ID)
try:
    rpc.connect()
    print("Connected to Discord")
except Exception as e:
    print(f"Failed to connect to Discord: {{e}}")
    sys.exit(1)

rpc.update(
    details="{details}",
    state="{state}",
    start=int(time.time()),
    large_image="{large_image}",
    large_text="{large_text}",
)
print("Rich Presence updated")

running = True

def _stop(signum, frame):
    global running
    running = False

signal.signal(signal.SIGTERM, _stop)
signal.signal(signal.SIGINT, _stop)

# Keep the connection alive until we are told to stop; sleep is interrupted
# by signal delivery, so shutdown stays prompt.
while running:
    time.sleep(15)

rpc.close()
print("Disconnected from Discord")
"#,
        client_id = py_str(&presence.client_id),
        details = py_str(&presence.details),
        state = py_str(&presence.state),
        large_image = py_str(&presence.large_image),
        large_text = py_str(&presence.large_text),
    )
}

/// Writes the rendered script to `path` (overwriting any previous session's
/// copy) and marks it executable on Unix.
pub fn write(path: &Path, presence: &PresenceConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create script directory: {}", parent.display()))?;
    }
    std::fs::write(path, render(presence))
        .with_context(|| format!("Failed to write presence script: {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to mark script executable: {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PresenceConfig;

    // ── py_str ────────────────────────────────────────────────────────────────

    #[test]
    fn py_str_passes_plain_values_through() {
        assert_eq!(py_str("Ranked Competitive"), "Ranked Competitive");
    }

    #[test]
    fn py_str_escapes_quotes_and_backslashes() {
        assert_eq!(py_str(r#"say "gg"\n"#), r#"say \"gg\"\\n"#);
    }

    #[test]
    fn py_str_escapes_newlines() {
        assert_eq!(py_str("a\nb"), "a\\nb");
    }

    // ── render ────────────────────────────────────────────────────────────────

    #[test]
    fn render_starts_with_shebang() {
        let script = render(&PresenceConfig::default());
        assert!(script.starts_with("#!/usr/bin/env python3"));
    }

    #[test]
    fn render_embeds_configured_fields() {
        let presence = PresenceConfig::default();
        let script = render(&presence);
        assert!(script.contains(&format!("CLIENT_ID = \"{}\"", presence.client_id)));
        assert!(script.contains(&format!("details=\"{}\"", presence.details)));
        assert!(script.contains(&format!("state=\"{}\"", presence.state)));
        assert!(script.contains(&format!("large_image=\"{}\"", presence.large_image)));
        assert!(script.contains(&format!("large_text=\"{}\"", presence.large_text)));
    }

    #[test]
    fn render_installs_termination_handlers() {
        let script = render(&PresenceConfig::default());
        assert!(script.contains("signal.SIGTERM"));
        assert!(script.contains("signal.SIGINT"));
        assert!(script.contains("rpc.close()"));
    }

    #[test]
    fn render_escapes_hostile_config_values() {
        let mut presence = PresenceConfig::default();
        presence.details = r#"pwn" ; import os"#.to_string();
        let script = render(&presence);
        assert!(script.contains(r#"details="pwn\" ; import os""#));
    }

    // ── write ─────────────────────────────────────────────────────────────────

    #[test]
    fn write_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("discord_presence.py");
        write(&path, &PresenceConfig::default()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn write_overwrites_previous_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discord_presence.py");

        let mut presence = PresenceConfig::default();
        write(&path, &presence).unwrap();

        presence.details = "Casual".to_string();
        write(&path, &presence).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("details=\"Casual\""));
        assert!(!content.contains("Ranked Competitive"));
    }

    #[cfg(unix)]
    #[test]
    fn write_marks_script_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("discord_presence.py");
        write(&path, &PresenceConfig::default()).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
