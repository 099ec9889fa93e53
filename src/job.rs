//! Job record and lifecycle state.

use std::time::SystemTime;

/// Where a job sits in its lifecycle. Formatted to a label on output rather
/// than duplicating a string field alongside the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Waiting,
    Running,
    Done,
}

impl JobState {
    pub fn label(self) -> &'static str {
        match self {
            JobState::Waiting => "WAITING",
            JobState::Running => "RUNNING",
            JobState::Done => "DONE",
        }
    }
}

/// One row of state per submitted job. All fields are set by whoever holds
/// the registry lock, except `output_size` and `finished_at`, which are the
/// runner's observations committed under the lock on return.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: u64,
    pub input_path: String,
    pub input_size: u64,
    pub submitted_at: SystemTime,
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
    /// Non-empty iff `state != Waiting`.
    pub output_path: String,
    pub output_size: u64,
    pub state: JobState,
    /// Used only by the Balanced policy.
    pub passed_over: u32,
}

impl Job {
    pub fn new(id: u64, input_path: String, input_size: u64) -> Self {
        Job {
            id,
            input_path,
            input_size,
            submitted_at: SystemTime::now(),
            started_at: None,
            finished_at: None,
            output_path: String::new(),
            output_size: 0,
            state: JobState::Waiting,
            passed_over: 0,
        }
    }

    /// A `Done` job with `output_size == 0` is the surface-level signal of a
    /// failed synthesizer invocation (no separate error type ever surfaces
    /// for a subprocess failure).
    pub fn succeeded(&self) -> bool {
        self.state == JobState::Done && self.output_size > 0
    }

    pub fn turnaround(&self) -> Option<std::time::Duration> {
        self.finished_at?.duration_since(self.submitted_at).ok()
    }

    pub fn response_time(&self) -> Option<std::time::Duration> {
        self.started_at?.duration_since(self.submitted_at).ok()
    }
}
