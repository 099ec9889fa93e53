//! Worker pool: a fixed number of long-lived threads, each looping over
//! (wait for dispatchable work -> select -> run -> commit).

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::SystemTime;

use crate::policy::AtomicPolicy;
use crate::registry::JobRegistry;
use crate::runner::{self, RunOutcome};

/// Handle to a started pool. Workers never terminate voluntarily (short of
/// the fatal invariant-violation case below); there is no join-on-shutdown
/// path because process exit on `quit` is abrupt.
pub struct WorkerPool {
    _workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn start(n: usize, registry: Arc<JobRegistry>, policy: Arc<AtomicPolicy>, output_cap: u64) -> Self {
        tracing::info!(count = n, output_cap, "starting worker pool");
        let mut workers = Vec::with_capacity(n);
        for idx in 0..n {
            let registry = Arc::clone(&registry);
            let policy = Arc::clone(&policy);
            let handle = std::thread::Builder::new()
                .name(format!("jobsched-worker-{idx}"))
                .spawn(move || worker_loop(idx, registry, policy, output_cap))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }
        WorkerPool { _workers: workers }
    }
}

fn worker_loop(idx: usize, registry: Arc<JobRegistry>, policy: Arc<AtomicPolicy>, output_cap: u64) {
    tracing::debug!(worker = idx, "worker thread started");
    loop {
        let Some(dispatched) = registry.dispatch_next(policy.load(), output_cap) else {
            tracing::error!(
                worker = idx,
                "worker exiting: policy selector returned no candidate while waiting work was believed to exist"
            );
            return;
        };

        let started_at = SystemTime::now();
        let outcome = runner::run(&dispatched.input_path, &dispatched.output_path);
        let output_size = match outcome {
            RunOutcome::Success => std::fs::metadata(&dispatched.output_path)
                .map(|m| m.len())
                .unwrap_or(0),
            RunOutcome::Failed => 0,
        };
        let finished_at = SystemTime::now();

        registry.commit(dispatched.id, output_size, started_at, finished_at);
    }
}
