/// Lifecycle of the external presence session.
///
/// A session is one spawned worker process running the generated presence
/// script. The controller owns at most one live worker handle at a time:
/// `start` is an idempotent no-op while a handle exists, and `stop` clears
/// the handle synchronously before handing the process to a background
/// reaper, so a later `start` can never overlap at the handle level.
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::script;

/// How long a terminated worker gets to close its Discord connection before
/// it is killed outright.
const TERMINATE_GRACE: Duration = Duration::from_secs(3);

/// Session operations the watcher drives on presence transitions. Split out
/// as a trait so the state machine can be exercised against a scripted fake
/// and the worker implementation stays swappable.
pub trait SessionControl {
    /// Starts the session. Idempotent: success without relaunching if a
    /// session is already active.
    fn start(&mut self, config: &Config) -> Result<()>;
    /// Stops the session. Idempotent no-op when inactive; never fails the
    /// caller, and always leaves the controller inactive.
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// One live presence worker process.
pub struct SessionWorker {
    child: Child,
}

impl SessionWorker {
    /// Writes nothing itself; expects `script_path` to already exist. Spawns
    /// `interpreter script_path` with stdout/stderr drained into `[session]`
    /// log lines by background tasks so the worker can never block on a full
    /// pipe.
    pub fn spawn(interpreter: &str, script_path: &std::path::Path) -> Result<Self> {
        let mut cmd = Command::new(interpreter);
        cmd.arg(script_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn presence worker: {interpreter}"))?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(drain_lines(stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_lines(stderr));
        }

        eprintln!(
            "[session] Presence worker started (pid {})",
            child.id().map_or_else(|| "?".to_string(), |p| p.to_string())
        );
        Ok(Self { child })
    }

    /// Asks the worker to exit (SIGTERM on Unix so the script can close the
    /// Discord connection) and hands it to a background reaper that kills it
    /// after [`TERMINATE_GRACE`]. Termination problems are logged, never
    /// returned: the caller's handle is already gone by the time this runs.
    pub fn terminate(mut self) -> JoinHandle<()> {
        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                eprintln!("[session] Failed to signal worker (pid {pid}): {e}");
            }
        }
        #[cfg(not(unix))]
        if let Err(e) = self.child.start_kill() {
            eprintln!("[session] Failed to kill worker: {e}");
        }

        tokio::spawn(async move {
            match tokio::time::timeout(TERMINATE_GRACE, self.child.wait()).await {
                Ok(Ok(status)) => eprintln!("[session] Worker exited: {status}"),
                Ok(Err(e)) => eprintln!("[session] Failed to reap worker: {e}"),
                Err(_) => {
                    eprintln!("[session] Worker did not exit in time; killing");
                    if let Err(e) = self.child.kill().await {
                        eprintln!("[session] Failed to kill worker: {e}");
                    }
                }
            }
        })
    }
}

/// Forwards one output stream of the worker, line by line, to the daemon log.
async fn drain_lines<R: AsyncRead + Unpin>(stream: R) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.trim().is_empty() {
            eprintln!("[session] {line}");
        }
    }
}

/// Owns the single worker handle and the script artifact path.
pub struct SessionController {
    script_path: PathBuf,
    worker: Option<SessionWorker>,
    /// Reaper of the most recently stopped worker, awaited on daemon
    /// shutdown so the grace period is honored before process exit.
    reaper: Option<JoinHandle<()>>,
}

impl SessionController {
    pub fn new(script_path: PathBuf) -> Self {
        Self {
            script_path,
            worker: None,
            reaper: None,
        }
    }

    /// Waits for the most recent worker reaper to finish. Called once on
    /// daemon shutdown, after `stop`.
    pub async fn drained(&mut self) {
        if let Some(reaper) = self.reaper.take() {
            let _ = reaper.await;
        }
    }
}

impl SessionControl for SessionController {
    fn start(&mut self, config: &Config) -> Result<()> {
        if self.worker.is_some() {
            eprintln!("[session] Presence session already active");
            return Ok(());
        }

        // Rewrite the script on every start so presence config edits take
        // effect on the next episode.
        script::write(&self.script_path, &config.presence)?;
        let worker = SessionWorker::spawn(&config.presence.python_path, &self.script_path)?;
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            eprintln!("[session] Stopping presence worker");
            self.reaper = Some(worker.terminate());
        }
    }

    fn is_active(&self) -> bool {
        self.worker.is_some()
    }
}
