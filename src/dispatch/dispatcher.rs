use crate::config::DispatcherConfig;
use crate::dispatch::{DispatchError, ResultSink};
use crate::fetcher::{PageFetcher, ScrapeResult};
use crate::jobs::{Job, JobError, JobStatus, JobStore, SinkOutcome, SinkTarget};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Work item carried by the queue
#[derive(Debug)]
struct QueuedJob {
    id: u64,
    url: String,
    sink: Option<SinkTarget>,
}

/// State shared by the dispatcher handle and its workers
struct Shared {
    jobs: Arc<JobStore>,
    fetcher: PageFetcher,
    sinks: HashMap<String, ResultSink>,
    request_delay: Duration,
    /// Submitted jobs whose worker has not finished yet
    pending: AtomicUsize,
    idle: Notify,
}

/// Bounded worker pool turning queued URLs into finished jobs
///
/// `submit` only enqueues; a fixed number of workers drain the queue.
/// Completion order across workers is unspecified.
pub struct Dispatcher {
    shared: Arc<Shared>,
    sender: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    /// Starts the worker pool
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `config` - Worker count and per-worker request delay
    /// * `fetcher` - Page fetcher shared by all workers
    /// * `jobs` - Registry receiving every job
    /// * `sinks` - Result sinks keyed by source name
    pub fn start(
        config: &DispatcherConfig,
        fetcher: PageFetcher,
        jobs: Arc<JobStore>,
        sinks: HashMap<String, ResultSink>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(AsyncMutex::new(receiver));

        let shared = Arc::new(Shared {
            jobs,
            fetcher,
            sinks,
            request_delay: config.request_delay(),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
        });

        let worker_count = config.workers.max(1) as usize;
        let workers = (0..worker_count)
            .map(|worker_id| {
                let shared = Arc::clone(&shared);
                let receiver = Arc::clone(&receiver);
                tokio::spawn(worker_loop(worker_id, shared, receiver))
            })
            .collect();

        info!("Dispatcher started with {} workers", worker_count);

        Self {
            shared,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        }
    }

    /// Creates a job for `url` and queues it
    ///
    /// Returns as soon as the job is queued; the fetch happens on a worker.
    ///
    /// # Returns
    ///
    /// * `Ok(Job)` - The created job, in the Queued state
    /// * `Err(DispatchError)` - Blank URL, or the dispatcher was shut down
    pub fn submit(&self, url: &str, sink: Option<SinkTarget>) -> Result<Job, DispatchError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = sender.as_ref() else {
            return Err(DispatchError::Closed);
        };

        let job = self.shared.jobs.create_job(url, sink)?;
        self.shared.pending.fetch_add(1, Ordering::SeqCst);

        let queued = QueuedJob {
            id: job.id,
            url: job.url.clone(),
            sink: job.sink.clone(),
        };
        if sender.send(queued).is_err() {
            self.shared.finish_one();
            return Err(DispatchError::Closed);
        }

        debug!(job_id = job.id, url = %job.url, "Job queued");
        Ok(job)
    }

    /// Submits URLs in order
    ///
    /// Blank URLs are skipped with a warning. Stops at the first error other
    /// than a blank URL.
    pub fn submit_many<I, S>(&self, urls: I, sink: Option<SinkTarget>) -> Result<Vec<Job>, DispatchError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut created = Vec::new();
        for url in urls {
            match self.submit(url.as_ref(), sink.clone()) {
                Ok(job) => created.push(job),
                Err(DispatchError::Job(JobError::EmptyUrl)) => {
                    warn!("Skipping blank URL");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }

    /// Waits until every submitted job has finished, including its sink write
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Number of submitted jobs not yet finished
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.shared.jobs
    }

    /// Closes the queue and waits for the workers to drain it
    ///
    /// Later submissions fail with [`DispatchError::Closed`].
    pub async fn shutdown(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let workers: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for worker in workers {
            if let Err(e) = worker.await {
                warn!("Worker ended abnormally: {}", e);
            }
        }
        info!("Dispatcher stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    shared: Arc<Shared>,
    receiver: Arc<AsyncMutex<mpsc::UnboundedReceiver<QueuedJob>>>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(queued) = next else {
            debug!("Worker {} exiting", worker_id);
            break;
        };

        shared.run_job(queued).await;
        shared.finish_one();

        if !shared.request_delay.is_zero() {
            tokio::time::sleep(shared.request_delay).await;
        }
    }
}

impl Shared {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn run_job(&self, queued: QueuedJob) {
        let QueuedJob { id, url, sink } = queued;

        if let Err(e) = self.jobs.transition(id, JobStatus::InProgress, None) {
            debug!(job_id = id, "Could not mark job in progress: {}", e);
        }

        let result = self.fetcher.fetch(&url).await;
        let status = if result.is_success() {
            JobStatus::Completed
        } else {
            JobStatus::Error
        };

        match &result.error {
            Some(error) => info!(job_id = id, url = %url, "Job failed: {}", error),
            None => info!(job_id = id, url = %url, status = %status, "Job finished"),
        }

        let finished = match self.jobs.transition(id, status, Some(result.clone())) {
            Ok(job) => job,
            Err(e) => {
                debug!(job_id = id, "Could not record job result: {}", e);
                detached_job(id, url, sink.clone(), status, result)
            }
        };

        if let Some(target) = sink {
            self.write_sink(&target, &finished).await;
        }
    }

    async fn write_sink(&self, target: &SinkTarget, job: &Job) {
        let outcome = match self.sinks.get(&target.source) {
            Some(sink) => match sink.write(&target.output_table, job).await {
                Ok(()) => SinkOutcome::Written,
                Err(e) => {
                    warn!(
                        job_id = job.id,
                        "Failed to write result to {}.{}: {}", target.source, target.output_table, e
                    );
                    SinkOutcome::Failed(e.to_string())
                }
            },
            None => {
                warn!(job_id = job.id, "No sink configured for source '{}'", target.source);
                SinkOutcome::Failed(format!("no sink for source '{}'", target.source))
            }
        };

        if let Err(e) = self.jobs.record_sink_outcome(job.id, outcome) {
            debug!(job_id = job.id, "Could not record sink outcome: {}", e);
        }
    }
}

/// Rebuilds a finished job that is no longer in the registry
fn detached_job(
    id: u64,
    url: String,
    sink: Option<SinkTarget>,
    status: JobStatus,
    result: ScrapeResult,
) -> Job {
    let mut job = Job::new(id, url, sink);
    job.status = status;
    job.result = Some(result);
    job
}
