use crate::fetcher::ScrapeResult;
use crate::jobs::{Job, JobError, JobStatus, SinkOutcome, SinkTarget};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::error;

#[derive(Debug)]
struct Registry {
    next_id: u64,
    jobs: BTreeMap<u64, Job>,
}

/// In-memory registry of every job created in this process
///
/// Ids come from a counter held under the same lock as the map, so concurrent
/// creation yields unique, gap-free ids. Every mutation happens under the
/// write lock, so a snapshot never observes a half-updated job.
#[derive(Debug)]
pub struct JobStore {
    inner: RwLock<Registry>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Registry {
                next_id: 1,
                jobs: BTreeMap::new(),
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a new job in the Queued state
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch; surrounding whitespace is trimmed
    /// * `sink` - Output the result is persisted to, for polled sources
    ///
    /// # Returns
    ///
    /// * `Ok(Job)` - A copy of the created job
    /// * `Err(JobError::EmptyUrl)` - The URL was blank
    pub fn create_job(&self, url: &str, sink: Option<SinkTarget>) -> Result<Job, JobError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(JobError::EmptyUrl);
        }

        let mut registry = self.write();
        let id = registry.next_id;
        registry.next_id += 1;

        let job = Job::new(id, url.to_string(), sink);
        registry.jobs.insert(id, job.clone());
        Ok(job)
    }

    /// Moves a job to its next status
    ///
    /// The result is attached only when `to` is terminal, and a terminal
    /// transition must carry one. Any transition not allowed by
    /// [`JobStatus::can_transition_to`] is rejected and leaves the job
    /// untouched.
    ///
    /// # Returns
    ///
    /// * `Ok(Job)` - A copy of the job after the transition
    /// * `Err(JobError)` - Unknown job or illegal transition
    pub fn transition(
        &self,
        id: u64,
        to: JobStatus,
        result: Option<ScrapeResult>,
    ) -> Result<Job, JobError> {
        let mut registry = self.write();
        let job = registry.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;

        if !job.status.can_transition_to(to) {
            error!(
                job_id = id,
                from = %job.status,
                to = %to,
                "Rejected job status transition"
            );
            return Err(JobError::InvalidTransition {
                id,
                from: job.status,
                to,
            });
        }

        if to.is_terminal() {
            let Some(result) = result else {
                error!(job_id = id, to = %to, "Rejected terminal transition without a result");
                return Err(JobError::MissingResult { id, to });
            };
            job.result = Some(result);
        }
        job.status = to;

        Ok(job.clone())
    }

    /// Records how persisting a finished job's result went
    pub fn record_sink_outcome(&self, id: u64, outcome: SinkOutcome) -> Result<(), JobError> {
        let mut registry = self.write();
        let job = registry.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        job.sink_outcome = Some(outcome);
        Ok(())
    }

    /// Returns a copy of one job
    pub fn get(&self, id: u64) -> Option<Job> {
        self.read().jobs.get(&id).cloned()
    }

    /// Returns every job in creation order, taken under one read lock
    pub fn snapshot(&self) -> Vec<Job> {
        self.read().jobs.values().cloned().collect()
    }

    /// Removes all jobs; the id sequence keeps counting
    pub fn clear(&self) {
        self.write().jobs.clear();
    }

    /// Number of jobs currently Queued or InProgress
    pub fn active_count(&self) -> usize {
        self.read()
            .jobs
            .values()
            .filter(|job| job.status.is_active())
            .count()
    }

    pub fn len(&self) -> usize {
        self.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}
