//! Submission Queue Library
//!
//! Incident submissions with location data pass a region gate, get their
//! address completed by reverse geocoding, and go to the backend. Anything
//! that cannot complete because of the network lands in a persisted
//! `OfflineQueue` and is replayed when connectivity returns.
//!
//! # Retry policy
//!
//! Each replay failure increments an item's retry count. A failure at the
//! retry ceiling (3 by default) drops the item, so a permanently failing
//! submission is attempted exactly `max_retries + 1` times.

use thiserror::Error;

pub mod connectivity;
pub mod payload;
pub mod pipeline;
pub mod queue;
pub mod store;
pub mod submitter;

pub use connectivity::ConnectivityMonitor;
pub use payload::{
    IncidentDetails, IncidentReport, IncidentTypeDetails, LocationDetails, StolenItemDetails, SubmissionPayload,
    VictimDetails,
};
pub use pipeline::{PipelineConfig, ReportPipeline, SubmissionError, SubmissionOutcome};
pub use queue::{OfflineQueue, ProcessStatus, ProcessSummary, QueueConfig, QueuedSubmission};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use submitter::{Address, ReverseGeocoder, SubmissionReceipt, SubmitError, Submitter};

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Queue serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, QueueError>;
