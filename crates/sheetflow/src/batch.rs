//! Batch executor
//!
//! Runs independent jobs on a fixed-size rayon pool. Every job builds its
//! own backend through the caller's factory, dispatches its sheets in
//! order and (for writes) finalizes the backend, all on one worker. Jobs
//! share nothing mutable, so a failing job is reported on its own and
//! never affects its siblings.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rayon::prelude::*;
use sheetflow_core::{
    read_all, read_keyed, write_range_bulk, Error, ErrorKind, ReadBackend, Result, WriteBackend,
};
use tracing::{debug, info_span, warn};

use crate::file::{FileReader, FileWriter};
use crate::job::{ReadJob, SheetPayloads, WriteJob};

/// Environment variable overriding the worker count
pub const WORKERS_ENV: &str = "SHEETFLOW_WORKERS";

/// Read results of one target, by workbook sheet name
pub type SheetResults = BTreeMap<String, SheetPayloads>;

/// Batch execution options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    /// Number of parallel workers; 1 runs every job on the calling thread
    pub workers: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

impl BatchOptions {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    /// Default options, with the worker count taken from `SHEETFLOW_WORKERS` if set
    pub fn from_env() -> Self {
        std::env::var(WORKERS_ENV)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .map(Self::with_workers)
            .unwrap_or_default()
    }
}

/// Result of one job
#[derive(Debug)]
pub struct JobOutcome<T> {
    pub target: String,
    pub result: Result<T>,
}

impl<T> JobOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Kind of the failure, if the job failed
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.result.as_ref().err().map(Error::kind)
    }
}

/// Per-job outcomes of a batch, in job order
#[derive(Debug)]
pub struct BatchReport<T> {
    outcomes: Vec<JobOutcome<T>>,
}

impl<T> BatchReport<T> {
    pub fn outcomes(&self) -> &[JobOutcome<T>] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<JobOutcome<T>> {
        self.outcomes
    }

    /// Outcome of the first job with this target
    pub fn get(&self, target: &str) -> Option<&JobOutcome<T>> {
        self.outcomes.iter().find(|o| o.target == target)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = (&str, &T)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|v| (o.target.as_str(), v)))
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.target.as_str(), e)))
    }

    /// True when every job succeeded
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(JobOutcome::is_success)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

fn build_pool(workers: usize) -> Option<rayon::ThreadPool> {
    let try_build = |n| rayon::ThreadPoolBuilder::new().num_threads(n).build();
    match try_build(workers) {
        Ok(pool) => Some(pool),
        Err(e) => {
            warn!(workers, error = %e, "could not build worker pool, running jobs sequentially");
            None
        }
    }
}

/// Run `run` over every job, keeping job order in the output
fn run_jobs<J, T, F>(jobs: &[J], options: &BatchOptions, run: F) -> Vec<T>
where
    J: Sync,
    T: Send,
    F: Fn(&J) -> T + Sync,
{
    let workers = options.workers.max(1).min(jobs.len().max(1));
    if workers == 1 {
        return jobs.iter().map(&run).collect();
    }
    match build_pool(workers) {
        Some(pool) => pool.install(|| jobs.par_iter().map(&run).collect()),
        None => jobs.iter().map(&run).collect(),
    }
}

fn write_job<W, F>(job: &WriteJob, factory: &F) -> Result<W::Persisted>
where
    W: WriteBackend,
    F: Fn(&str) -> Result<W>,
{
    let mut backend = factory(&job.target)?;
    for sheet in &job.sheets {
        let handle = backend.create_sheet(&sheet.name)?;
        for (range, payload) in &sheet.ranges {
            write_range_bulk(&mut backend, handle, range, payload)?;
        }
    }
    // A failed job drops its backend here without finalizing
    backend.finalize()
}

fn read_job<R, F>(job: &ReadJob, factory: &F) -> Result<SheetResults>
where
    R: ReadBackend,
    F: Fn(&str) -> Result<R>,
{
    let mut backend = factory(&job.target)?;
    let names = backend.sheet_names();
    let mut results = SheetResults::new();
    for sheet in &job.sheets {
        let name = sheet.sheet.resolve(&names)?;
        let handle = backend.open_sheet(&name)?;
        let keyed = read_keyed(&backend, handle, &sheet.keyed)?;
        let ordered = read_all(&backend, handle, &sheet.ordered)?;

        // A name and an index may select the same sheet
        let payloads = results.entry(name).or_default();
        for (key, payload) in keyed {
            if payloads.keyed.contains_key(&key) {
                return Err(Error::other(format!(
                    "duplicate range key {:?} in sheet {}",
                    key, sheet.sheet
                )));
            }
            payloads.keyed.insert(key, payload);
        }
        payloads.ordered.extend(ordered);
    }
    Ok(results)
}

fn report<T>(target: &str, result: &Result<T>) {
    match result {
        Ok(_) => debug!(job = target, "job succeeded"),
        Err(e) => warn!(job = target, kind = %e.kind(), error = %e, "job failed"),
    }
}

/// Write every job through a backend built by `factory`
///
/// `factory` receives the job's target and must return a fresh backend;
/// it is called once per job on the worker that runs the job.
pub fn run_write_batch<W, F>(
    jobs: &[WriteJob],
    options: &BatchOptions,
    factory: F,
) -> BatchReport<W::Persisted>
where
    W: WriteBackend,
    W::Persisted: Send,
    F: Fn(&str) -> Result<W> + Sync,
{
    let _span = info_span!("write_batch", jobs = jobs.len(), workers = options.workers).entered();

    let outcomes = run_jobs(jobs, options, |job| {
        let _span = info_span!("write_job", job = %job.target, ranges = job.range_count()).entered();
        let result = write_job(job, &factory);
        report(&job.target, &result);
        JobOutcome {
            target: job.target.clone(),
            result,
        }
    });
    BatchReport { outcomes }
}

/// Read every job through a backend built by `factory`
pub fn run_read_batch<R, F>(
    jobs: &[ReadJob],
    options: &BatchOptions,
    factory: F,
) -> BatchReport<SheetResults>
where
    R: ReadBackend,
    F: Fn(&str) -> Result<R> + Sync,
{
    let _span = info_span!("read_batch", jobs = jobs.len(), workers = options.workers).entered();

    let outcomes = run_jobs(jobs, options, |job| {
        let _span = info_span!("read_job", job = %job.target, ranges = job.range_count()).entered();
        let result = read_job(job, &factory);
        report(&job.target, &result);
        JobOutcome {
            target: job.target.clone(),
            result,
        }
    });
    BatchReport { outcomes }
}

/// Write XLSX and CSV targets, choosing the format from each target path
pub fn write_many(jobs: &[WriteJob], options: &BatchOptions) -> BatchReport<PathBuf> {
    run_write_batch(jobs, options, |target: &str| FileWriter::create(target))
}

/// Read XLSX and CSV sources, choosing the format from each source path
pub fn read_many(jobs: &[ReadJob], options: &BatchOptions) -> BatchReport<SheetResults> {
    run_read_batch(jobs, options, |target: &str| FileReader::open(target))
}
