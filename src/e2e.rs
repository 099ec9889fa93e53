//! End-to-end scheduling scenarios, run against a stub synthesizer that
//! copies stdin to the requested output path. Exercises the real
//! `JobRegistry` + `WorkerPool`, not just the pure policy functions (those
//! have their own unit tests in `policy.rs`).

use std::os::unix::fs::PermissionsExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::policy::{AtomicPolicy, Policy};
use crate::pool::WorkerPool;
use crate::registry::JobRegistry;

// `JOBSCHED_SYNTH_BIN`/`JOBSCHED_OUTPUT_CAP` are process-global env vars;
// serialize every test in this module so they can't interfere with each
// other under cargo's default parallel test runner.
static ENV_GUARD: Mutex<()> = Mutex::new(());

struct StubSynth {
    _dir: tempfile::TempDir,
}

impl StubSynth {
    /// Installs a `piper` stand-in that copies stdin to the `-f` path and
    /// exits 0, truncated/padded to `output_bytes` if given.
    fn install(output_bytes: Option<u64>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("piper");
        let body = match output_bytes {
            None => "#!/bin/sh\nwhile [ \"$1\" != \"-f\" ]; do shift; done\nshift\ncat > \"$1\"\nexit 0\n".to_string(),
            Some(n) => format!(
                "#!/bin/sh\nwhile [ \"$1\" != \"-f\" ]; do shift; done\nshift\nhead -c {n} /dev/zero > \"$1\"\nexit 0\n"
            ),
        };
        std::fs::write(&script, body).unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();
        std::env::set_var("JOBSCHED_SYNTH_BIN", &script);
        StubSynth { _dir: dir }
    }
}

impl Drop for StubSynth {
    fn drop(&mut self) {
        std::env::remove_var("JOBSCHED_SYNTH_BIN");
    }
}

fn input_file(dir: &std::path::Path, name: &str, size: u64) -> String {
    let path = dir.join(name);
    std::fs::write(&path, vec![b'x'; size as usize]).unwrap();
    path.to_str().unwrap().to_string()
}

fn poll_until<F: Fn() -> bool>(pred: F, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if pred() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    pred()
}

#[test]
fn fcfs_two_workers_preserve_arrival_order_for_the_first_slot() {
    let _guard = ENV_GUARD.lock().unwrap();
    let _stub = StubSynth::install(None);
    let work_dir = tempfile::tempdir().unwrap();

    let registry = Arc::new(JobRegistry::new());
    let a = registry.submit(&input_file(work_dir.path(), "a.txt", 100)).unwrap();
    let b = registry.submit(&input_file(work_dir.path(), "b.txt", 200)).unwrap();
    let c = registry.submit(&input_file(work_dir.path(), "c.txt", 50)).unwrap();

    let policy = Arc::new(AtomicPolicy::new(Policy::Fcfs));
    let _pool = WorkerPool::start(2, Arc::clone(&registry), policy, u64::MAX);

    registry.wait_all();
    let snap = registry.list_snapshot();
    let by_id = |id: u64| snap.rows.iter().find(|r| r.id == id).unwrap();

    let (ra, rb, rc) = (by_id(a), by_id(b), by_id(c));
    assert_eq!(ra.state_label, "DONE");
    assert_eq!(rb.state_label, "DONE");
    assert_eq!(rc.state_label, "DONE");
    // With 2 workers, A and B are claimed first (arrival order); C starts
    // only once one of the first two workers frees up.
    assert!(ra.started_at.unwrap() <= rc.started_at.unwrap());
    assert!(rb.started_at.unwrap() <= rc.started_at.unwrap() || rb.started_at == ra.started_at);
}

#[test]
fn sjf_single_worker_runs_shortest_first() {
    let _guard = ENV_GUARD.lock().unwrap();
    let _stub = StubSynth::install(None);
    let work_dir = tempfile::tempdir().unwrap();

    let registry = Arc::new(JobRegistry::new());
    let a = registry.submit(&input_file(work_dir.path(), "a.txt", 100)).unwrap();
    let b = registry.submit(&input_file(work_dir.path(), "b.txt", 200)).unwrap();
    let c = registry.submit(&input_file(work_dir.path(), "c.txt", 50)).unwrap();

    let policy = Arc::new(AtomicPolicy::new(Policy::Sjf));
    let _pool = WorkerPool::start(1, Arc::clone(&registry), policy, u64::MAX);

    registry.wait_all();
    let snap = registry.list_snapshot();
    let by_id = |id: u64| snap.rows.iter().find(|r| r.id == id).unwrap().started_at.unwrap();

    let (sa, sb, sc) = (by_id(a), by_id(b), by_id(c));
    assert!(sc < sa, "C (50B) must start before A (100B)");
    assert!(sa < sb, "A (100B) must start before B (200B)");
}

#[test]
fn balanced_single_worker_lets_the_long_job_escape_after_threshold_passovers() {
    let _guard = ENV_GUARD.lock().unwrap();
    let _stub = StubSynth::install(None);
    let work_dir = tempfile::tempdir().unwrap();

    let registry = Arc::new(JobRegistry::new());
    let long = registry.submit(&input_file(work_dir.path(), "l.txt", 1000)).unwrap();
    let shorts: Vec<u64> = (0..4)
        .map(|n| registry.submit(&input_file(work_dir.path(), &format!("s{n}.txt"), 10)).unwrap())
        .collect();

    let policy = Arc::new(AtomicPolicy::new(Policy::Balanced));
    let _pool = WorkerPool::start(1, Arc::clone(&registry), policy, u64::MAX);

    registry.wait_all();
    let snap = registry.list_snapshot();
    let started_at = |id: u64| snap.rows.iter().find(|r| r.id == id).unwrap().started_at.unwrap();

    let long_start = started_at(long);
    let short_starts: Vec<_> = shorts.iter().map(|&id| started_at(id)).collect();
    // The long job must not be the very last to run: once its passed_over
    // counter reaches the threshold it escapes the size comparison and wins
    // its very next evaluation, ahead of at least one remaining short job.
    assert!(
        short_starts.iter().filter(|&&s| s > long_start).count() >= 1,
        "long job must escape before every short job has run"
    );
}

#[test]
fn delete_waiting_job_removes_it_from_subsequent_list() {
    let registry = JobRegistry::new();
    let work_dir = tempfile::tempdir().unwrap();
    let id = registry.submit(&input_file(work_dir.path(), "a.txt", 10)).unwrap();

    registry.delete(id).unwrap();

    let snap = registry.list_snapshot();
    assert!(snap.rows.iter().all(|r| r.id != id));
}

#[test]
fn delete_running_job_is_refused_but_job_still_completes() {
    let _guard = ENV_GUARD.lock().unwrap();
    let _stub = StubSynth::install(None);
    let work_dir = tempfile::tempdir().unwrap();

    let registry = Arc::new(JobRegistry::new());
    let id = registry.submit(&input_file(work_dir.path(), "a.txt", 10)).unwrap();

    let policy = Arc::new(AtomicPolicy::new(Policy::Fcfs));
    let _pool = WorkerPool::start(1, Arc::clone(&registry), policy, u64::MAX);

    // Give the worker a chance to claim the job before we try to delete it.
    poll_until(
        || {
            registry
                .list_snapshot()
                .rows
                .iter()
                .any(|r| r.id == id && r.state_label != "WAITING")
        },
        Duration::from_secs(2),
    );

    let delete_result = registry.delete(id);
    assert!(matches!(
        delete_result,
        Err(crate::error::SchedError::RunningConflict(_)) | Ok(_)
    ));

    registry.wait_all();
}

#[test]
fn output_cap_gate_blocks_until_space_is_freed_by_delete() {
    let _guard = ENV_GUARD.lock().unwrap();
    let _stub = StubSynth::install(Some(2048));
    let work_dir = tempfile::tempdir().unwrap();

    let registry = Arc::new(JobRegistry::new());
    let first = registry.submit(&input_file(work_dir.path(), "a.txt", 10)).unwrap();
    let second = registry.submit(&input_file(work_dir.path(), "b.txt", 10)).unwrap();

    let policy = Arc::new(AtomicPolicy::new(Policy::Fcfs));
    let cap = 1024u64; // smaller than the 2 KiB the stub emits
    let _pool = WorkerPool::start(1, Arc::clone(&registry), policy, cap);

    // First job finishes and fills (exceeds) the cap.
    assert!(poll_until(
        || registry.list_snapshot().rows.iter().any(|r| r.id == first && r.state_label == "DONE"),
        Duration::from_secs(2),
    ));

    // Second job must still be waiting: the cap is closed.
    std::thread::sleep(Duration::from_millis(100));
    let snap = registry.list_snapshot();
    assert_eq!(snap.rows.iter().find(|r| r.id == second).unwrap().state_label, "WAITING");

    // Deleting the first job's output relaxes the gate.
    registry.delete(first).unwrap();

    assert!(poll_until(
        || registry.list_snapshot().rows.iter().any(|r| r.id == second && r.state_label == "DONE"),
        Duration::from_secs(2),
    ));
}
