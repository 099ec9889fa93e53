//! Ambient configuration. Everything here is an environment-overridable
//! default, not a user-facing command-language feature.

/// Admission-gate cap on aggregate `Done` output size, in bytes. Overridable
/// via `JOBSCHED_OUTPUT_CAP` so a boundary test can shrink it without
/// waiting on 100 MiB of real synthesizer output.
pub const DEFAULT_OUTPUT_CAP: u64 = 100 * 1024 * 1024;

/// Default synthesizer binary and model invoked by the subprocess contract.
pub const DEFAULT_SYNTH_BIN: &str = "piper";
pub const SYNTH_MODEL: &str = "arctic.onnx";

pub fn output_cap() -> u64 {
    std::env::var("JOBSCHED_OUTPUT_CAP")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_OUTPUT_CAP)
}

/// Overridable so tests can substitute a stub executable that copies stdin to
/// the requested output path instead of invoking the real synthesizer.
pub fn synth_bin() -> String {
    std::env::var("JOBSCHED_SYNTH_BIN").unwrap_or_else(|_| DEFAULT_SYNTH_BIN.to_string())
}
