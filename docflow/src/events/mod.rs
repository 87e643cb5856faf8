//! Event reporting for stages and the harness.
//!
//! Components never reach for a process-wide reporter; they are handed an
//! `Arc<dyn EventSink>` and emit through it.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

/// Event type names emitted by this crate.
pub mod types {
    /// A stage run is starting.
    pub const STAGE_STARTED: &str = "stage.started";
    /// One file was transformed and written.
    pub const FILE_PROCESSED: &str = "stage.file_processed";
    /// One file failed under per-file isolation.
    pub const FILE_FAILED: &str = "stage.file_failed";
    /// A stage run finished.
    pub const STAGE_COMPLETED: &str = "stage.completed";
    /// An object was downloaded.
    pub const DOWNLOADED: &str = "storage.downloaded";
    /// An object was uploaded.
    pub const UPLOADED: &str = "storage.uploaded";
    /// The harness moved to a new state.
    pub const HARNESS_STATE: &str = "harness.state";
    /// The harness checked the output prefix.
    pub const HARNESS_POLL: &str = "harness.poll";
}
