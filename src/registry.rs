//! The job registry: the only shared mutable state. One mutex protects an
//! arrival-ordered `Vec<Job>` plus its aggregate counters; one condition
//! variable coordinates admission, dispatch, and completion.
//!
//! Jobs are kept in a plain `Vec` in arrival order rather than a linked list;
//! a `Vec` never exposes a raw node pointer across the lock boundary and
//! linear scan by id is cheap at this scale.

use std::sync::{Condvar, Mutex};
use std::time::SystemTime;

use crate::error::{Result, SchedError};
use crate::job::{Job, JobState};
use crate::policy::{self, Policy};

struct Inner {
    jobs: Vec<Job>,
    next_id: u64,
    total_count: u64,
    waiting_count: u64,
    done_count: u64,
    total_output_size: u64,
}

impl Inner {
    fn find(&self, id: u64) -> Option<usize> {
        self.jobs.iter().position(|j| j.id == id)
    }
}

pub struct JobRegistry {
    inner: Mutex<Inner>,
    cond: Condvar,
}

/// A snapshot row for `list`.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: u64,
    pub state_label: &'static str,
    pub input_path: String,
    pub input_size: u64,
    pub output_path: String,
    pub output_size: u64,
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
}

/// Aggregate view returned by `list_snapshot`.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub rows: Vec<JobRow>,
    pub total_input_size: u64,
    pub total_output_size: u64,
    /// `None` when no job has finished yet.
    pub mean_turnaround_secs: Option<f64>,
    pub mean_response_secs: Option<f64>,
}

/// What a worker hands to the runner: enough to run the job without holding
/// the registry lock.
pub struct DispatchedJob {
    pub id: u64,
    pub input_path: String,
    pub output_path: String,
}

/// Outcome reported by `wait`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failure,
}

impl JobRegistry {
    pub fn new() -> Self {
        JobRegistry {
            inner: Mutex::new(Inner {
                jobs: Vec::new(),
                next_id: 1,
                total_count: 0,
                waiting_count: 0,
                done_count: 0,
                total_output_size: 0,
            }),
            cond: Condvar::new(),
        }
    }

    /// Recovers from a poisoned mutex rather than panicking the caller: a
    /// prior panic while the lock was held (never expected in normal
    /// operation) is logged and the guard is taken anyway, since every
    /// mutation in this module leaves the registry's own counters consistent
    /// before returning.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            tracing::error!("job registry mutex poisoned; recovering guard");
            poisoned.into_inner()
        })
    }

    fn cond_wait<'a>(&self, guard: std::sync::MutexGuard<'a, Inner>) -> std::sync::MutexGuard<'a, Inner> {
        self.cond.wait(guard).unwrap_or_else(|poisoned| {
            tracing::error!("job registry condvar wait observed a poisoned mutex; recovering guard");
            poisoned.into_inner()
        })
    }

    /// Stats `input_path`; rejects empty/missing files without touching the
    /// registry. On success, appends a new `Waiting` job and broadcasts
    /// (broadcast, not signal: a new job can unblock either the
    /// waiting-jobs predicate or be irrelevant to the output-cap predicate,
    /// and which worker should notice is not obvious at wake time).
    pub fn submit(&self, input_path: &str) -> Result<u64> {
        let input_size = std::fs::metadata(input_path).map(|m| m.len()).unwrap_or(0);
        if input_size == 0 {
            return Err(SchedError::InputRejected);
        }

        let mut guard = self.lock();
        let id = guard.next_id;
        guard.next_id += 1;
        guard.jobs.push(Job::new(id, input_path.to_string(), input_size));
        guard.total_count += 1;
        guard.waiting_count += 1;
        self.cond.notify_all();
        Ok(id)
    }

    pub fn list_snapshot(&self) -> Snapshot {
        let guard = self.lock();

        let mut total_input_size = 0u64;
        let mut turnaround_total = std::time::Duration::ZERO;
        let mut response_total = std::time::Duration::ZERO;
        let mut done_seen = 0u64;
        let mut rows = Vec::with_capacity(guard.jobs.len());

        for job in &guard.jobs {
            total_input_size += job.input_size;
            if let (Some(t), Some(r)) = (job.turnaround(), job.response_time()) {
                turnaround_total += t;
                response_total += r;
                done_seen += 1;
            }
            rows.push(JobRow {
                id: job.id,
                state_label: job.state.label(),
                input_path: job.input_path.clone(),
                input_size: job.input_size,
                output_path: job.output_path.clone(),
                output_size: job.output_size,
                started_at: job.started_at,
                finished_at: job.finished_at,
            });
        }

        let (mean_turnaround_secs, mean_response_secs) = if done_seen > 0 {
            (
                Some(turnaround_total.as_secs_f64() / done_seen as f64),
                Some(response_total.as_secs_f64() / done_seen as f64),
            )
        } else {
            (None, None)
        };

        Snapshot {
            rows,
            total_input_size,
            total_output_size: guard.total_output_size,
            mean_turnaround_secs,
            mean_response_secs,
        }
    }

    /// Deletes a `Waiting` or `Done` job. Refuses `Running` jobs. A disk
    /// removal failure on a `Done` job's output file is reported by the
    /// caller but never vetoes the logical delete, so the registry's own
    /// counters never diverge from what `delete` itself just decided.
    pub fn delete(&self, id: u64) -> Result<Option<String>> {
        let mut guard = self.lock();
        let idx = guard.find(id).ok_or(SchedError::NotFound(id))?;

        match guard.jobs[idx].state {
            JobState::Running => return Err(SchedError::RunningConflict(id)),
            JobState::Waiting => {
                guard.waiting_count -= 1;
                guard.total_count -= 1;
                guard.jobs.remove(idx);
                self.cond.notify_all();
                Ok(None)
            }
            JobState::Done => {
                let output_size = guard.jobs[idx].output_size;
                let output_path = guard.jobs[idx].output_path.clone();
                guard.done_count -= 1;
                guard.total_count -= 1;
                guard.total_output_size -= output_size;
                guard.jobs.remove(idx);
                self.cond.notify_all();
                Ok(Some(output_path))
            }
        }
    }

    /// Blocks until job `id` reaches `Done`, or until it disappears (unknown
    /// at call time, or deleted while waiting — both report `NotFound`).
    /// Every return path drops the lock via RAII; the source bug where the
    /// not-found path returned without unlocking has no equivalent here.
    pub fn wait(&self, id: u64) -> Result<JobOutcome> {
        let mut guard = self.lock();
        loop {
            match guard.find(id) {
                None => return Err(SchedError::NotFound(id)),
                Some(idx) if guard.jobs[idx].state == JobState::Done => {
                    let success = guard.jobs[idx].succeeded();
                    return Ok(if success {
                        JobOutcome::Success
                    } else {
                        JobOutcome::Failure
                    });
                }
                _ => {
                    guard = self.cond_wait(guard);
                }
            }
        }
    }

    pub fn wait_all(&self) {
        let mut guard = self.lock();
        while guard.done_count < guard.total_count {
            guard = self.cond_wait(guard);
        }
    }

    /// Blocks until a job is dispatchable (`waiting_count > 0` and the
    /// output-size gate is open), selects one under `policy`, and marks it
    /// `Running`. Returns `None` only on the fatal invariant violation of a
    /// selector returning no candidate while `waiting_count > 0`.
    pub(crate) fn dispatch_next(&self, policy: Policy, output_cap: u64) -> Option<DispatchedJob> {
        let mut guard = self.lock();
        loop {
            if guard.waiting_count > 0 && guard.total_output_size < output_cap {
                break;
            }
            guard = self.cond_wait(guard);
        }

        let idx = policy::select(policy, &mut guard.jobs)?;
        let job = &mut guard.jobs[idx];
        job.output_path = format!("job{}.wav", job.id);
        job.state = JobState::Running;
        let dispatched = DispatchedJob {
            id: job.id,
            input_path: job.input_path.clone(),
            output_path: job.output_path.clone(),
        };
        guard.waiting_count -= 1;
        Some(dispatched)
    }

    /// Commits a `Running -> Done` transition and broadcasts so `wait`,
    /// `wait_all`, and gated workers all re-evaluate their predicates.
    pub(crate) fn commit(
        &self,
        id: u64,
        output_size: u64,
        started_at: SystemTime,
        finished_at: SystemTime,
    ) {
        let mut guard = self.lock();
        if let Some(idx) = guard.find(id) {
            let job = &mut guard.jobs[idx];
            job.started_at = Some(started_at);
            job.finished_at = Some(finished_at);
            job.output_size = output_size;
            job.state = JobState::Done;
            guard.total_output_size += output_size;
            guard.done_count += 1;
        }
        drop(guard);
        self.cond.notify_all();
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}
