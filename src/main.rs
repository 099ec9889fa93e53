use std::io::BufRead;
use std::process::ExitCode;

mod config;
mod control;
mod error;
mod job;
mod policy;
mod pool;
mod registry;
mod runner;

#[cfg(test)]
mod e2e;

use control::Continue;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let scheduler = control::Scheduler::new();
    let stdin = std::io::stdin();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if scheduler.dispatch(&line) == Continue::Quit {
            break;
        }
    }

    ExitCode::SUCCESS
}
