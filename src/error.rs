//! Error kinds surfaced by the registry and control surface.
//!
//! `SubprocessFailed` deliberately has no variant here: a failed synthesizer
//! invocation never surfaces as a `Result::Err`, only as a `Done` job with
//! `output_size == 0`. Likewise there is no generic IO variant: a stat
//! failure on submit is folded into `InputRejected`, an unlink failure on
//! delete is reported directly without vetoing the logical delete, and a
//! spawn failure in the runner becomes `RunOutcome::Failed` — every IO
//! failure this scheduler observes already has a typed, more specific home.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedError {
    #[error("empty or non-existent file, not adding to queue")]
    InputRejected,

    #[error("unable to find job with id: {0}")]
    NotFound(u64),

    #[error("Job {0} is currently running, and cannot be deleted")]
    RunningConflict(u64),

    #[error("must choose from fcfs, sjf, or balanced (got '{0}')")]
    PolicyUnknown(String),

    #[error("only allowed to use nthreads once per runtime; no new threads started")]
    ThreadsAlreadyStarted,

    #[error("invalid thread count '{0}'")]
    InvalidThreadCount(String),
}

pub type Result<T> = std::result::Result<T, SchedError>;
