/// Canonical file paths for CrossStrike data files.
///
/// All three files live under the per-user app data directory:
///   - config.toml           Written by the user/GUI, read by the daemon.
///   - status.toml           Written by the daemon, read by the GUI.
///   - discord_presence.py   Rewritten by the daemon at each session start.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "CrossStrike";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATUS_FILE_NAME: &str = "status.toml";
pub const SCRIPT_FILE_NAME: &str = "discord_presence.py";

/// Returns the CrossStrike application data directory:
///   macOS    ~/Library/Application Support/CrossStrike/
///   Windows  %APPDATA%\CrossStrike\
///   other    $XDG_DATA_HOME/CrossStrike/ or ~/.local/share/CrossStrike/
pub fn app_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        let home = std::env::var("HOME").expect("HOME environment variable not set");
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
            .join(APP_DIR_NAME)
    }
    #[cfg(windows)]
    {
        let appdata = std::env::var("APPDATA").expect("APPDATA environment variable not set");
        PathBuf::from(appdata).join(APP_DIR_NAME)
    }
    #[cfg(not(any(target_os = "macos", windows)))]
    {
        match std::env::var("XDG_DATA_HOME") {
            Ok(xdg) if !xdg.is_empty() => PathBuf::from(xdg).join(APP_DIR_NAME),
            _ => {
                let home = std::env::var("HOME").expect("HOME environment variable not set");
                PathBuf::from(home).join(".local").join("share").join(APP_DIR_NAME)
            }
        }
    }
}

/// Returns the full path to the config file.
pub fn config_file_path() -> PathBuf {
    app_data_dir().join(CONFIG_FILE_NAME)
}

/// Returns the full path to the status file.
pub fn status_file_path() -> PathBuf {
    app_data_dir().join(STATUS_FILE_NAME)
}

/// Returns the full path of the generated presence worker script.
pub fn script_file_path() -> PathBuf {
    app_data_dir().join(SCRIPT_FILE_NAME)
}
