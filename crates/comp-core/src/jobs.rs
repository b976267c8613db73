//! Persistent background job queue
//!
//! Network-bound work (git fetch/push) and recurring maintenance are queued
//! here instead of running inline. `composition run-jobs` drains the queue
//! from cron. Scheduling is coalescing: a kind already pending is not queued
//! twice.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use comp_fs::{FileLock, NormalizedPath, io, lock::DEFAULT_POLL_INTERVAL};
use serde::{Deserialize, Serialize};

use crate::cache::PackageCache;
use crate::context::AppContext;
use crate::vcs::Synchronizer;
use crate::{Error, Result};

const LOCK_WAIT: Duration = Duration::from_secs(5);
/// Upper bound on drain rounds, since running a job may schedule another.
const MAX_ROUNDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    /// Merge with upstream and push.
    GitPush,
    /// Refresh the package cache, commit and push.
    Hourly,
    /// Remove stale merge branches and the git lock file.
    Midnight,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GitPush => "git-push",
            Self::Hourly => "hourly",
            Self::Midnight => "midnight",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub kind: JobKind,
    pub scheduled_at: DateTime<Utc>,
}

/// JSON-file job queue.
#[derive(Debug, Clone)]
pub struct JobQueue {
    path: NormalizedPath,
}

impl JobQueue {
    pub fn new(path: NormalizedPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    fn lock(&self) -> Result<FileLock> {
        let lock_path = NormalizedPath::new(format!("{}.lock", self.path.as_str()));
        Ok(FileLock::acquire(&lock_path, LOCK_WAIT, DEFAULT_POLL_INTERVAL)?)
    }

    fn load(&self) -> Result<Vec<Job>> {
        match io::read_text_optional(&self.path)? {
            Some(content) if !content.trim().is_empty() => serde_json::from_str(&content)
                .map_err(|e| Error::parse(self.path.to_native(), &e)),
            _ => Ok(Vec::new()),
        }
    }

    fn store(&self, jobs: &[Job]) -> Result<()> {
        let content = serde_json::to_string_pretty(jobs)?;
        io::write_atomic(&self.path, content.as_bytes()).map_err(|source| Error::WriteError {
            path: self.path.to_native(),
            source,
        })
    }

    /// Queue a job unless one of the same kind is already pending.
    ///
    /// Returns `true` when a job was added.
    pub fn schedule(&self, kind: JobKind) -> Result<bool> {
        let _lock = self.lock()?;
        let mut jobs = self.load()?;
        if jobs.iter().any(|j| j.kind == kind) {
            tracing::debug!(job = %kind, "Job already pending");
            return Ok(false);
        }
        jobs.push(Job {
            kind,
            scheduled_at: Utc::now(),
        });
        self.store(&jobs)?;
        tracing::info!(job = %kind, "Job scheduled");
        Ok(true)
    }

    pub fn pending(&self) -> Result<Vec<Job>> {
        self.load()
    }

    pub fn is_pending(&self, kind: JobKind) -> Result<bool> {
        Ok(self.load()?.iter().any(|j| j.kind == kind))
    }

    /// Remove and return every pending job, oldest first.
    pub fn drain(&self) -> Result<Vec<Job>> {
        let _lock = self.lock()?;
        let jobs = self.load()?;
        if !jobs.is_empty() {
            self.store(&[])?;
        }
        Ok(jobs)
    }
}

/// Outcome of one job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub kind: JobKind,
    pub success: bool,
    pub message: Option<String>,
}

/// Drain and run pending jobs until the queue is empty.
///
/// Failures are logged and reported; a failed job is not requeued, the next
/// recurring trigger retries from scratch.
pub fn run_pending(ctx: &AppContext) -> Result<Vec<JobResult>> {
    let mut results = Vec::new();
    for _ in 0..MAX_ROUNDS {
        let jobs = ctx.queue().drain()?;
        if jobs.is_empty() {
            break;
        }
        for job in jobs {
            let outcome = run_job(ctx, job.kind);
            ctx.dispatch_events();
            let result = match outcome {
                Ok(()) => JobResult {
                    kind: job.kind,
                    success: true,
                    message: None,
                },
                Err(e) => {
                    tracing::error!(job = %job.kind, error = %e, "Job failed");
                    JobResult {
                        kind: job.kind,
                        success: false,
                        message: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }
    }
    Ok(results)
}

fn run_job(ctx: &AppContext, kind: JobKind) -> Result<()> {
    tracing::info!(job = %kind, "Running job");
    match kind {
        JobKind::GitPush => match Synchronizer::open(ctx)? {
            Some(sync) => sync.push_cycle().map(|_| ()),
            None => Ok(()),
        },
        JobKind::Hourly => {
            match PackageCache::new(ctx)?.refresh(false) {
                Ok(outcome) => tracing::info!(outcome = %outcome, "Hourly cache refresh"),
                Err(e) => tracing::warn!(error = %e, "Hourly cache refresh skipped"),
            }
            ctx.dispatch_events();
            match Synchronizer::open(ctx)? {
                Some(sync) => sync.sync_now().map(|_| ()),
                None => Ok(()),
            }
        }
        JobKind::Midnight => match Synchronizer::open(ctx)? {
            Some(sync) => sync.cleanup(),
            None => Ok(()),
        },
    }
}
