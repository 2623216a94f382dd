mod bridge;
mod config;
mod event;
mod paths;
mod poller;
mod script;
mod session;
mod snapshot;
mod status;
mod watcher;

use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::session::SessionController;
use crate::watcher::{PresenceState, PresenceWatcher};

#[tokio::main]
async fn main() {
    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = paths::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        eprintln!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let initial_config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        eprintln!("[config] Error (using defaults): {e}");
        config::Config::default()
    });
    // The target identity is fixed for the lifetime of the daemon; config
    // reloads may change everything else.
    let target = initial_config.monitor.executable_name.clone();
    let shared_config = Arc::new(RwLock::new(initial_config));

    // ── Initial status ────────────────────────────────────────────────────────
    let status_path = paths::status_file_path();
    let mut current_status = status::DaemonStatus::new(target.clone());
    status::write_status(&status_path, &current_status);

    let (event_tx, mut event_rx) = mpsc::channel::<event::DaemonEvent>(32);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path, event_tx.clone()));
    tokio::spawn(poller::run(Arc::clone(&shared_config), event_tx.clone()));

    // The bridge is optional: if the subscription fails, the poll loop alone
    // still provides correct (if slightly slower) detection.
    let bridge_handle = match bridge::start(&target, event_tx.clone()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("[bridge] Subscription failed ({e:#}); running poll-only");
            None
        }
    };

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(event::DaemonEvent::Shutdown).await;
            }
        });
    }

    // Graceful shutdown on SIGTERM (launchd/systemd stop).
    #[cfg(unix)]
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut term) => {
                    if term.recv().await.is_some() {
                        let _ = tx.send(event::DaemonEvent::Shutdown).await;
                    }
                }
                Err(e) => eprintln!("[signal] Failed to register SIGTERM handler: {e}"),
            }
        });
    }

    println!(
        "crossstrike-daemon v{} started (watching {})",
        env!("CARGO_PKG_VERSION"),
        target
    );

    // ── Event loop ────────────────────────────────────────────────────────────
    // Single writer: this loop is the only context that touches the watcher
    // state, the session controller, and the published status.
    let mut watcher = PresenceWatcher::new(SessionController::new(paths::script_file_path()));

    while let Some(evt) = event_rx.recv().await {
        match evt {
            event::DaemonEvent::Observation { present } => {
                let changed = {
                    let config = shared_config.read().await;
                    watcher.report_observation(present, &config)
                };
                if changed {
                    current_status.state = watcher.state();
                    current_status.session_active = watcher.session_active();
                    current_status.error = watcher.session_error().map(str::to_string);
                    current_status.last_transition = Some(chrono::Local::now().to_rfc3339());
                    status::write_status(&status_path, &current_status);
                }
            }

            event::DaemonEvent::ConfigReloaded(mut new_config) => {
                println!("Config reloaded");
                if new_config.monitor.executable_name != target {
                    eprintln!(
                        "[config] Changing executable_name requires a restart; keeping {target}"
                    );
                    new_config.monitor.executable_name = target.clone();
                }
                *shared_config.write().await = new_config;
            }

            event::DaemonEvent::Shutdown => {
                println!("Shutting down");
                let was_running = watcher.state() == PresenceState::Running;
                watcher.shutdown();
                current_status.state = watcher.state();
                current_status.session_active = false;
                current_status.error = None;
                if was_running {
                    current_status.last_transition = Some(chrono::Local::now().to_rfc3339());
                }
                status::write_status(&status_path, &current_status);
                break;
            }
        }
    }

    if let Some(bridge) = bridge_handle {
        bridge.stop();
    }
    // Give the presence worker its termination grace period before exiting.
    watcher.session_mut().drained().await;
}
