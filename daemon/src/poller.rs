use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, interval_at, Instant};

use crate::config::Config;
use crate::event::DaemonEvent;
use crate::snapshot::{self, ProcessSnapshotSource};

/// Polls the OS process table and reports a level observation every tick:
/// "the target is present" or "the target is absent". The watcher turns
/// those levels into transitions, so this loop stays stateless about edges
/// and any notification the bridge missed is healed within one interval.
///
/// The first tick fires immediately, which seeds the watcher before the
/// first periodic interval elapses: a target already running when the
/// daemon launches is detected right away.
///
/// A failed process query is logged and produces no observation for that
/// tick; a transient platform failure must never read as "target absent".
pub async fn run(config: Arc<RwLock<Config>>, tx: mpsc::Sender<DaemonEvent>) {
    let mut source = ProcessSnapshotSource::new();
    let mut period = {
        let config = config.read().await;
        Duration::from_secs(config.monitor.effective_poll_interval_secs())
    };
    let mut ticker = interval(period);

    loop {
        ticker.tick().await;

        let (target, interval_secs) = {
            let config = config.read().await;
            (
                config.monitor.executable_name.clone(),
                config.monitor.effective_poll_interval_secs(),
            )
        };

        match source.snapshot() {
            Ok(records) => {
                let present = snapshot::contains_target(&records, &target);
                if tx.send(DaemonEvent::Observation { present }).await.is_err() {
                    break;
                }
            }
            Err(e) => eprintln!("[poller] Process query failed (skipping tick): {e:#}"),
        }

        // Apply a reloaded poll interval without an extra immediate tick.
        let new_period = Duration::from_secs(interval_secs);
        if new_period != period {
            period = new_period;
            ticker = interval_at(Instant::now() + period, period);
        }
    }
}
