//! Control surface: translates one parsed command-language line into a
//! registry/pool operation and prints the user-visible diagnostic. Holds no
//! state of its own beyond the live scheduling policy and the one-shot
//! "has nthreads run yet" flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config;
use crate::error::SchedError;
use crate::policy::{AtomicPolicy, Policy};
use crate::pool::WorkerPool;
use crate::registry::{JobOutcome, JobRegistry};

/// Tells the REPL loop whether to keep reading lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continue {
    Yes,
    Quit,
}

pub struct Scheduler {
    registry: Arc<JobRegistry>,
    policy: Arc<AtomicPolicy>,
    output_cap: u64,
    pool: Mutex<Option<WorkerPool>>,
    nthreads_used: AtomicBool,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            registry: Arc::new(JobRegistry::new()),
            policy: Arc::new(AtomicPolicy::new(Policy::Fcfs)),
            output_cap: config::output_cap(),
            pool: Mutex::new(None),
            nthreads_used: AtomicBool::new(false),
        }
    }

    /// Tokenizes and dispatches one input line. Tokens split on whitespace;
    /// more than two tokens, or a command with the wrong arity, is a no-op
    /// diagnostic rather than an error the caller must handle.
    pub fn dispatch(&self, line: &str) -> Continue {
        let mut tokens = line.split_whitespace();
        let command = match tokens.next() {
            Some(c) => c,
            None => return Continue::Yes, // blank line
        };
        let rest: Vec<&str> = tokens.collect();

        if rest.len() > 1 {
            println!("jobsched: too many arguments! Must pick from one of the specified arguments, and only use up to two words!");
            return Continue::Yes;
        }
        let arg = rest.first().copied();

        match (command, arg) {
            ("quit", None) => return Continue::Quit,
            ("help", None) => self.help(),
            ("list", None) => self.list(),
            ("waitall", None) => self.wait_all(),
            ("submit", Some(path)) => self.submit(path),
            ("nthreads", Some(n)) => self.nthreads(n),
            ("wait", Some(id)) => self.wait(id),
            ("delete", Some(id)) => self.delete(id),
            ("schedule", Some(mode)) => self.schedule(mode),
            ("submit", None) => println!("jobsched-submit: must use the format submit <text_filename>!"),
            ("nthreads", None) => println!("jobsched-nthreads: usage must be nthreads <number-of-threads>!"),
            ("wait", None) => println!("jobsched-wait: usage: wait <jobid>"),
            ("delete", None) => println!("jobsched-delete: usage: delete <jobid>"),
            ("schedule", None) => println!("jobsched-schedule: usage: schedule <fcfs|sjf|balanced>"),
            ("list", Some(_)) | ("waitall", Some(_)) | ("help", Some(_)) | ("quit", Some(_)) => {
                println!("jobsched: command \"{command}\" takes no arguments");
            }
            (other, _) => println!("jobsched: command \"{other}\" not found. Try \"help\"."),
        }
        Continue::Yes
    }

    fn submit(&self, path: &str) {
        match self.registry.submit(path) {
            Ok(id) => println!("jobsched: Job {id} started on file {path}"),
            Err(SchedError::InputRejected) => {
                println!("jobsched-submit: empty or non-existent file, not adding to queue")
            }
            Err(e) => println!("jobsched-submit: {e}"),
        }
    }

    fn list(&self) {
        let snap = self.registry.list_snapshot();
        println!("JOBID  STATE    INPUT_FILENAME  INPUT_SIZE  OUTPUT_FILE  OUTPUT_SIZE");
        println!("____________________________________________________________________");
        for row in &snap.rows {
            println!(
                "{:<7}{:<9}{:<16}{:<9}B  {:<13}{:<10}B",
                row.id, row.state_label, row.input_path, row.input_size, row.output_path, row.output_size
            );
        }
        println!("____________________________________________________________________");
        println!("Total input file size: {} B", snap.total_input_size);
        println!("Total output file size: {} B", snap.total_output_size);
        if let (Some(turnaround), Some(response)) = (snap.mean_turnaround_secs, snap.mean_response_secs) {
            println!("Average turnaround time: {turnaround}s");
            println!("Average response time: {response}s");
        }
    }

    fn nthreads(&self, arg: &str) {
        if let Err(e) = self.start_threads(arg) {
            println!("jobsched-nthreads: {e}");
        }
    }

    fn start_threads(&self, arg: &str) -> Result<(), SchedError> {
        let n: usize = arg
            .parse()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| SchedError::InvalidThreadCount(arg.to_string()))?;
        if self.nthreads_used.swap(true, Ordering::SeqCst) {
            return Err(SchedError::ThreadsAlreadyStarted);
        }
        let mut pool = self.pool.lock().unwrap();
        *pool = Some(WorkerPool::start(
            n,
            Arc::clone(&self.registry),
            Arc::clone(&self.policy),
            self.output_cap,
        ));
        Ok(())
    }

    fn wait(&self, arg: &str) {
        let id: u64 = match arg.parse() {
            Ok(id) if id > 0 => id,
            _ => {
                println!("jobsched-wait: error reading jobid!");
                return;
            }
        };
        match self.registry.wait(id) {
            Ok(JobOutcome::Success) => println!("Job {id} was a Success!"),
            Ok(JobOutcome::Failure) => println!("Job {id} was a Failure!"),
            Err(e) => println!("jobsched-wait: {e}"),
        }
    }

    fn wait_all(&self) {
        self.registry.wait_all();
        println!("All Jobs Are Done!!");
    }

    fn delete(&self, arg: &str) {
        let id: u64 = match arg.parse() {
            Ok(id) if id > 0 => id,
            _ => {
                println!("jobsched-delete: error reading jobid or invalid jobid!");
                return;
            }
        };
        match self.registry.delete(id) {
            Ok(Some(output_path)) => {
                if let Err(e) = std::fs::remove_file(&output_path) {
                    println!("jobsched-delete: Error removing file {output_path}: {e}");
                    println!("jobsched-delete: still removing job {id}");
                }
                println!("jobsched-delete: Job {id} has been removed");
            }
            Ok(None) => println!("jobsched-delete: Job {id} has been removed"),
            Err(SchedError::NotFound(_)) => {
                println!("jobsched-delete: unable to find job with id: {id}. No job was deleted.")
            }
            Err(SchedError::RunningConflict(_)) => println!(
                "jobsched-delete: Job {id} is currently running, and cannot be deleted!!"
            ),
            Err(e) => println!("jobsched-delete: {e}"),
        }
    }

    fn schedule(&self, arg: &str) {
        match arg.parse::<Policy>() {
            Ok(policy) => {
                tracing::info!(?policy, "scheduling policy changed");
                self.policy.store(policy);
            }
            Err(e) => println!("jobsched-schedule: {e}"),
        }
    }

    fn help(&self) {
        println!(
            "Jobsched: help\n\
             \x20\x20\x20\x20Usage: help\n\
             \x20\x20\x20\x20displays help message\n\
             \n\
             \x20\x20\x20\x20Jobsched Functions:\n\
             \x20\x20\x20\x20\x20\x20\x20\x20submit:\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20usage: submit <filename>\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20Submits a file to the job queue\n\
             \x20\x20\x20\x20\x20\x20\x20\x20nthreads:\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20usage: nthreads <number of threads>\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20starts x worker threads to process the jobs\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20CAN ONLY BE CALLED ONCE PER JOBSCHED RUN\n\
             \x20\x20\x20\x20\x20\x20\x20\x20list:\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20usage: list\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20lists the jobs and their data\n\
             \x20\x20\x20\x20\x20\x20\x20\x20wait:\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20usage: wait <jobid>\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20waits for the job with the specified jobid\n\
             \x20\x20\x20\x20\x20\x20\x20\x20waitall:\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20usage: waitall\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20blocks until all jobs are done\n\
             \x20\x20\x20\x20\x20\x20\x20\x20delete:\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20usage: delete <jobid>\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20deletes the specified job and the corresponding output file\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20WILL NOT DELETE FILES THAT ARE IN THE RUNNING STATE\n\
             \x20\x20\x20\x20\x20\x20\x20\x20schedule:\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20usage: schedule <fcfs|sjf|balanced>\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20selects the scheduling algorithm\n\
             \x20\x20\x20\x20\x20\x20\x20\x20quit:\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20usage: quit\n\
             \x20\x20\x20\x20\x20\x20\x20\x20\x20\x20gracefully exits"
        );
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
