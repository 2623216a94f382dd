use anyhow::{ensure, Result};
use sysinfo::{ProcessesToUpdate, System};

/// One entry of a process-table snapshot. Matching is by executable base
/// name only; the pid is carried for diagnostics and never compared.
#[derive(Debug, Clone)]
pub struct ProcessRecord {
    pub name: String,
    pub pid: u32,
}

/// Queries the OS for the currently running processes.
///
/// Each [`snapshot`](ProcessSnapshotSource::snapshot) call refreshes the
/// underlying table, so staleness is bounded by the caller's polling
/// interval. The `System` is reused across calls to avoid re-allocating the
/// process map every tick.
pub struct ProcessSnapshotSource {
    sys: System,
}

impl ProcessSnapshotSource {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }

    /// Returns a fresh enumeration of all running processes.
    ///
    /// A live system always has at least one process, so an empty refresh
    /// means the platform query itself failed; that is reported as an error
    /// rather than an empty (and therefore "target absent") snapshot.
    pub fn snapshot(&mut self) -> Result<Vec<ProcessRecord>> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);

        let records: Vec<ProcessRecord> = self
            .sys
            .processes()
            .iter()
            .map(|(pid, process)| ProcessRecord {
                name: process.name().to_string_lossy().into_owned(),
                pid: pid.as_u32(),
            })
            .collect();

        ensure!(
            !records.is_empty(),
            "process enumeration returned an empty set"
        );
        Ok(records)
    }
}

/// Exact, case-sensitive base-name match against the configured target.
pub fn contains_target(records: &[ProcessRecord], target: &str) -> bool {
    records.iter().any(|r| r.name == target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, pid: u32) -> ProcessRecord {
        ProcessRecord {
            name: name.to_string(),
            pid,
        }
    }

    // ── contains_target ───────────────────────────────────────────────────────

    #[test]
    fn matches_exact_name() {
        let records = vec![record("launcher", 10), record("cs2.exe", 11)];
        assert!(contains_target(&records, "cs2.exe"));
    }

    #[test]
    fn match_is_case_sensitive() {
        let records = vec![record("CS2.EXE", 10)];
        assert!(!contains_target(&records, "cs2.exe"));
    }

    #[test]
    fn no_substring_or_path_matching() {
        let records = vec![record("cs2.exe.backup", 10), record("/games/cs2.exe", 11)];
        assert!(!contains_target(&records, "cs2.exe"));
    }

    #[test]
    fn empty_snapshot_contains_nothing() {
        assert!(!contains_target(&[], "cs2.exe"));
    }

    #[test]
    fn pid_is_never_part_of_the_match() {
        let a = vec![record("cs2.exe", 100)];
        let b = vec![record("cs2.exe", 200)];
        assert!(contains_target(&a, "cs2.exe"));
        assert!(contains_target(&b, "cs2.exe"));
    }

    // ── snapshot ──────────────────────────────────────────────────────────────

    #[test]
    fn snapshot_sees_the_current_process() {
        let mut source = ProcessSnapshotSource::new();
        let records = source.snapshot().unwrap();
        let own_pid = std::process::id();
        assert!(
            records.iter().any(|r| r.pid == own_pid),
            "snapshot should include the test process itself"
        );
    }

    #[test]
    fn consecutive_snapshots_are_fresh() {
        let mut source = ProcessSnapshotSource::new();
        let first = source.snapshot().unwrap();
        let second = source.snapshot().unwrap();
        assert!(!first.is_empty());
        assert!(!second.is_empty());
    }
}
