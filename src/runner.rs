//! Subprocess runner: invokes the synthesizer on one job's input file and
//! observes its termination. Never touches the registry — callers own the
//! one job record this operates on, which is guaranteed `Running` for the
//! duration of the call.

use std::process::{Command, Stdio};

use crate::config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed,
}

/// Spawns the synthesizer with `input_path` wired to its stdin (read-only)
/// and both stdout/stderr redirected to a null sink (`<bin> -f <output_path>
/// -m arctic.onnx`). A normal exit (status code 0) is success; anything
/// else — non-zero exit, signal, core dump, or a spawn failure — is
/// `Failed`.
pub fn run(input_path: &str, output_path: &str) -> RunOutcome {
    let stdin_file = match std::fs::File::open(input_path) {
        Ok(f) => f,
        Err(_) => return RunOutcome::Failed,
    };

    let status = Command::new(config::synth_bin())
        .arg("-f")
        .arg(output_path)
        .arg("-m")
        .arg(config::SYNTH_MODEL)
        .stdin(Stdio::from(stdin_file))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => RunOutcome::Success,
        _ => RunOutcome::Failed,
    }
}
