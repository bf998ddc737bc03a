//! Persisted offline submission queue
//!
//! Items are replayed in enqueue order. The queue lock is never held across
//! a network call: each item is submitted unlocked and its outcome applied
//! to whatever the queue holds afterwards, so `enqueue` never waits on the
//! network and a concurrent `clear_queue` wins.

use crate::connectivity::ConnectivityMonitor;
use crate::payload::SubmissionPayload;
use crate::store::KeyValueStore;
use crate::submitter::{SubmitError, Submitter};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_STORAGE_KEY: &str = "offline_queue";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub max_retries: u32,
    pub submit_timeout_ms: u64,
    pub storage_key: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            submit_timeout_ms: 30_000,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
        }
    }
}

impl QueueConfig {
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedSubmission {
    pub id: String,
    pub payload: SubmissionPayload,
    pub enqueued_at: DateTime<Utc>,
    pub retry_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessStatus {
    Completed,
    /// Queue was cleared mid-run
    Interrupted,
    AlreadyRunning,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub status: ProcessStatus,
    pub succeeded: usize,
    pub retried: usize,
    pub dropped: usize,
}

impl ProcessSummary {
    fn new(status: ProcessStatus) -> Self {
        Self {
            status,
            succeeded: 0,
            retried: 0,
            dropped: 0,
        }
    }
}

/// Releases the single-flight flag however processing ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum Outcome {
    Succeeded,
    Retried,
    Dropped,
    /// Item vanished while it was in flight
    Gone,
}

pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    submitter: Arc<dyn Submitter>,
    connectivity: ConnectivityMonitor,
    config: QueueConfig,
    items: Mutex<Vec<QueuedSubmission>>,
    processing: AtomicBool,
    /// Bumped by `clear_queue`; checked between items
    generation: AtomicU64,
}

impl OfflineQueue {
    /// Open the queue, restoring whatever was persisted.
    ///
    /// Unreadable queue data is logged and discarded rather than blocking
    /// new submissions.
    pub async fn open(
        store: Arc<dyn KeyValueStore>,
        submitter: Arc<dyn Submitter>,
        connectivity: ConnectivityMonitor,
        config: QueueConfig,
    ) -> Result<Self> {
        let items = match store.get(&config.storage_key).await? {
            Some(raw) => match serde_json::from_str::<Vec<QueuedSubmission>>(&raw) {
                Ok(items) => items,
                Err(e) => {
                    error!("Discarding unreadable offline queue '{}': {}", config.storage_key, e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        if !items.is_empty() {
            info!("Restored {} queued submission(s)", items.len());
        }

        Ok(Self {
            store,
            submitter,
            connectivity,
            config,
            items: Mutex::new(items),
            processing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Snapshot in enqueue order
    pub async fn items(&self) -> Vec<QueuedSubmission> {
        self.items.lock().await.clone()
    }

    /// Persist a new item with retry count 0 and return its id
    pub async fn enqueue(&self, payload: SubmissionPayload) -> Result<String> {
        let item = QueuedSubmission {
            id: Uuid::new_v4().to_string(),
            payload,
            enqueued_at: Utc::now(),
            retry_count: 0,
        };
        let id = item.id.clone();
        let kind = item.payload.kind();

        let mut items = self.items.lock().await;
        items.push(item);
        if let Err(e) = self.persist(&items).await {
            items.pop();
            return Err(e);
        }

        info!("Queued {} submission {} ({} pending)", kind, id, items.len());
        Ok(id)
    }

    /// Unconditional wipe, e.g. on logout
    pub async fn clear_queue(&self) -> Result<()> {
        let mut items = self.items.lock().await;
        // Storage first: on failure memory still matches what `open` would restore
        self.store.remove(&self.config.storage_key).await?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        let cleared = items.len();
        items.clear();
        info!("Cleared offline queue ({} item(s))", cleared);
        Ok(())
    }

    /// Replay queued items in order.
    ///
    /// A call while another is in flight, or while offline, does nothing.
    /// Item failures are independent; a failure at the retry ceiling drops
    /// the item.
    pub async fn process_queue(&self) -> ProcessSummary {
        if !self.connectivity.is_online() {
            debug!("Offline, queue processing skipped");
            return ProcessSummary::new(ProcessStatus::Offline);
        }
        let Some(_guard) = InFlight::acquire(&self.processing) else {
            debug!("Queue processing already in flight");
            return ProcessSummary::new(ProcessStatus::AlreadyRunning);
        };

        let generation = self.generation.load(Ordering::Acquire);
        let batch = self.items.lock().await.clone();
        let mut summary = ProcessSummary::new(ProcessStatus::Completed);

        if !batch.is_empty() {
            info!("Processing {} queued submission(s)", batch.len());
        }

        for item in batch {
            if self.generation.load(Ordering::Acquire) != generation {
                info!("Offline queue cleared during processing, stopping");
                summary.status = ProcessStatus::Interrupted;
                break;
            }

            let result = match tokio::time::timeout(self.config.submit_timeout(), self.submitter.submit(&item.payload)).await {
                Ok(result) => result,
                Err(_) => Err(SubmitError::Timeout),
            };

            match self.apply_outcome(&item.id, generation, result).await {
                Outcome::Succeeded => summary.succeeded += 1,
                Outcome::Retried => summary.retried += 1,
                Outcome::Dropped => summary.dropped += 1,
                Outcome::Gone => {}
            }
        }

        if summary.succeeded + summary.retried + summary.dropped > 0 {
            info!(
                "Queue processed: {} succeeded, {} retried, {} dropped",
                summary.succeeded, summary.retried, summary.dropped
            );
        }
        summary
    }

    async fn apply_outcome(
        &self,
        id: &str,
        generation: u64,
        result: std::result::Result<crate::SubmissionReceipt, SubmitError>,
    ) -> Outcome {
        let mut items = self.items.lock().await;
        if self.generation.load(Ordering::Acquire) != generation {
            return Outcome::Gone;
        }
        let Some(pos) = items.iter().position(|i| i.id == id) else {
            return Outcome::Gone;
        };

        let outcome = match result {
            Ok(receipt) => {
                info!("Queued submission {} delivered (id {:?})", id, receipt.id);
                items.remove(pos);
                Outcome::Succeeded
            }
            Err(e) if items[pos].retry_count < self.config.max_retries => {
                items[pos].retry_count += 1;
                warn!(
                    "Queued submission {} failed (attempt {}): {}",
                    id, items[pos].retry_count, e
                );
                Outcome::Retried
            }
            Err(e) => {
                let dropped = items.remove(pos);
                warn!(
                    "Dropping {} submission {} after {} attempts: {}",
                    dropped.payload.kind(),
                    id,
                    dropped.retry_count + 1,
                    e
                );
                Outcome::Dropped
            }
        };

        if let Err(e) = self.persist(&items).await {
            error!("Failed to persist offline queue: {}", e);
        }
        outcome
    }

    async fn persist(&self, items: &[QueuedSubmission]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.store.set(&self.config.storage_key, &raw).await
    }

    /// Process the queue on every offline -> online transition.
    ///
    /// Watch updates coalesce, so a quick offline -> online flap can arrive
    /// as one wakeup that reads `true`. Every wakeup landing online replays.
    /// The initial value is not marked seen, so a flap before the task first
    /// runs still wakes it.
    ///
    /// The task holds a weak reference and ends once the queue is dropped.
    pub fn spawn_connectivity_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let queue: Weak<Self> = Arc::downgrade(self);
        let mut rx = self.connectivity.subscribe();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                if !*rx.borrow_and_update() {
                    continue;
                }
                let Some(queue) = queue.upgrade() else { break };
                debug!("Back online, replaying offline queue");
                queue.process_queue().await;
            }
        })
    }
}
