//! Policy selectors: pure functions of the job list that pick the next
//! `Waiting` job to dispatch. Called only while the registry lock is held
//! and only when at least one job is `Waiting`.

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::SchedError;
use crate::job::{Job, JobState};

/// A job that has been the current best-shortest candidate this many times
/// without being picked escapes the size comparison and runs next.
pub const BALANCED_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Fcfs,
    Sjf,
    Balanced,
}

impl FromStr for Policy {
    type Err = SchedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fcfs" => Ok(Policy::Fcfs),
            "sjf" => Ok(Policy::Sjf),
            "balanced" => Ok(Policy::Balanced),
            other => Err(SchedError::PolicyUnknown(other.to_string())),
        }
    }
}

impl Policy {
    fn to_u8(self) -> u8 {
        match self {
            Policy::Fcfs => 0,
            Policy::Sjf => 1,
            Policy::Balanced => 2,
        }
    }

    fn from_u8(v: u8) -> Policy {
        match v {
            0 => Policy::Fcfs,
            1 => Policy::Sjf,
            _ => Policy::Balanced,
        }
    }
}

/// Lock-free cell shared between the control surface (writer, on `schedule`)
/// and the worker pool (readers, one load per selection). Lives outside the
/// registry so the scheduling policy and the job table stay decoupled.
pub struct AtomicPolicy(AtomicU8);

impl AtomicPolicy {
    pub fn new(initial: Policy) -> Self {
        AtomicPolicy(AtomicU8::new(initial.to_u8()))
    }

    pub fn load(&self) -> Policy {
        Policy::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn store(&self, policy: Policy) {
        self.0.store(policy.to_u8(), Ordering::SeqCst);
    }
}

/// Selects the index of the next job to dispatch, or `None` if no job is
/// `Waiting` (a fatal invariant violation when the caller already observed
/// `waiting_count > 0`).
pub fn select(policy: Policy, jobs: &mut [Job]) -> Option<usize> {
    match policy {
        Policy::Fcfs => select_fcfs(jobs),
        Policy::Sjf => select_sjf(jobs),
        Policy::Balanced => select_balanced(jobs),
    }
}

fn select_fcfs(jobs: &[Job]) -> Option<usize> {
    jobs.iter().position(|j| j.state == JobState::Waiting)
}

fn select_sjf(jobs: &[Job]) -> Option<usize> {
    // Iterator::min_by_key returns the first element on ties, which is
    // exactly "earliest arrival wins" since arrival order is iteration order.
    jobs.iter()
        .enumerate()
        .filter(|(_, j)| j.state == JobState::Waiting)
        .min_by_key(|(_, j)| j.input_size)
        .map(|(i, _)| i)
}

fn select_balanced(jobs: &mut [Job]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for i in 0..jobs.len() {
        if jobs[i].state != JobState::Waiting {
            continue;
        }
        if best.is_none() {
            best = Some(i);
        }
        if jobs[i].passed_over >= BALANCED_THRESHOLD {
            return Some(i);
        }
        if let Some(b) = best {
            if i != b && jobs[i].input_size < jobs[b].input_size {
                jobs[b].passed_over += 1;
                best = Some(i);
            }
        }
    }
    best
}
