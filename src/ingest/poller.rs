use crate::dispatch::{DispatchError, Dispatcher};
use crate::ingest::SourceCursor;
use crate::jobs::SinkTarget;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Recurring cursor-bounded fetch-and-dispatch cycle for one source
///
/// Ticks are serialized, so the cursor is only ever touched by one tick at a
/// time. A failing source is reported and retried at the next tick, forever.
pub struct PollLoop {
    cursor: SourceCursor,
    dispatcher: Arc<Dispatcher>,
    sink: Option<SinkTarget>,
}

impl PollLoop {
    pub fn new(cursor: SourceCursor, dispatcher: Arc<Dispatcher>, sink: Option<SinkTarget>) -> Self {
        Self {
            cursor,
            dispatcher,
            sink,
        }
    }

    /// Runs one poll cycle
    ///
    /// Reads the next batch and submits every non-blank value in ascending id
    /// order. Does not wait for the submitted jobs.
    ///
    /// # Returns
    ///
    /// The number of jobs submitted
    pub async fn tick(&mut self) -> usize {
        let source = self.cursor.key().source.clone();

        let rows = match self.cursor.next_batch().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Source '{}' unavailable: {}", source, e);
                return 0;
            }
        };

        let mut submitted = 0;
        for row in rows {
            let Some(url) = row.value.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
                debug!("Source '{}' row {} has no URL, skipping", source, row.id);
                continue;
            };

            match self.dispatcher.submit(url, self.sink.clone()) {
                Ok(_) => submitted += 1,
                Err(DispatchError::Closed) => {
                    warn!("Dispatcher closed while polling source '{}'", source);
                    break;
                }
                Err(e) => warn!("Source '{}' row {} rejected: {}", source, row.id, e),
            }
        }

        if submitted > 0 {
            info!(
                "Source '{}' dispatched {} job(s), cursor at {}",
                source,
                submitted,
                self.cursor.last_seen_id()
            );
        }
        submitted
    }

    /// Runs ticks every poll interval until the task is aborted
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.cursor.poll_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }

    pub fn cursor(&self) -> &SourceCursor {
        &self.cursor
    }
}
