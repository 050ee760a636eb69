//! Job feed rendering
//!
//! Turns a job store snapshot into counts and one text line per job, for the
//! log-based display of the `run` command.

use crate::jobs::{Job, JobStatus, SinkOutcome};
use std::collections::HashMap;
use std::fmt;

/// Job counts by status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub total: usize,
    pub by_status: HashMap<JobStatus, usize>,
    /// Jobs whose sink write failed
    pub sink_failures: usize,
}

impl FeedSummary {
    /// Counts a snapshot of jobs
    pub fn from_jobs(jobs: &[Job]) -> Self {
        let mut summary = Self {
            total: jobs.len(),
            ..Self::default()
        };

        for job in jobs {
            *summary.by_status.entry(job.status).or_insert(0) += 1;
            if matches!(job.sink_outcome, Some(SinkOutcome::Failed(_))) {
                summary.sink_failures += 1;
            }
        }
        summary
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }

    /// Jobs that are Queued or InProgress
    pub fn active(&self) -> usize {
        self.count(JobStatus::Queued) + self.count(JobStatus::InProgress)
    }
}

impl fmt::Display for FeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} job(s): {} queued, {} in progress, {} completed, {} error",
            self.total,
            self.count(JobStatus::Queued),
            self.count(JobStatus::InProgress),
            self.count(JobStatus::Completed),
            self.count(JobStatus::Error),
        )?;
        if self.sink_failures > 0 {
            write!(f, ", {} sink failure(s)", self.sink_failures)?;
        }
        Ok(())
    }
}

/// Renders one line for a job
///
/// Format: `#<id> [<status>] <url>`, followed by the title for completed jobs
/// or the error for failed ones.
pub fn render_job(job: &Job) -> String {
    let mut line = format!("#{} [{}] {}", job.id, job.status, job.url);

    if let Some(error) = job.error() {
        line.push_str(" - ");
        line.push_str(error);
    } else if let Some(title) = job.title() {
        line.push_str(" - ");
        line.push_str(title);
    }

    if let Some(SinkOutcome::Failed(reason)) = &job.sink_outcome {
        line.push_str(" (sink failed: ");
        line.push_str(reason);
        line.push(')');
    }
    line
}

/// Renders every job, one line each, in the given order
pub fn render_feed(jobs: &[Job]) -> String {
    jobs.iter().map(render_job).collect::<Vec<_>>().join("\n")
}

/// Prints the summary followed by the feed to stdout
pub fn print_feed(jobs: &[Job]) {
    println!("{}", FeedSummary::from_jobs(jobs));
    if !jobs.is_empty() {
        println!("{}", render_feed(jobs));
    }
}
