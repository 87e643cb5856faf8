//! # Docflow
//!
//! A three-stage document pipeline (preprocess, GPU process, postprocess)
//! that moves files between object storage and a shared filesystem mount,
//! stamping each file with a provenance marker at every stage.
//!
//! The crate provides:
//!
//! - **Stage configuration**: fail-fast resolution from environment values
//! - **Stage runner**: a non-recursive directory loop applying a pluggable
//!   document transform, with structured reporting
//! - **Marker transforms**: the `[<Stage> at <timestamp>]` annotations and
//!   their verification
//! - **Storage gateway**: list/download/upload over `object_store`
//! - **Test harness**: fixture upload, HTTP trigger, a bounded polling state
//!   machine and marker verification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docflow::prelude::*;
//!
//! let config = PreprocessConfig::from_env(&ProcessEnv)?;
//! let gateway = ObjectStoreGateway::s3();
//! let sink = Arc::new(LoggingEventSink::default());
//! let report = preprocess::run(&config, &gateway, sink, Arc::new(SystemClock::new())).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod harness;
pub mod observability;
pub mod runtime;
pub mod stages;
pub mod storage;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        EnvSource, GpuConfig, HarnessConfig, MapEnv, PipelineLayout, PostprocessConfig,
        PreprocessConfig, ProcessEnv, StageOptions,
    };
    pub use crate::core::{FileFailure, FileRecord, Marker, StageLabel, StageReport};
    pub use crate::errors::{PipelineError, PipelineResult};
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::harness::{HarnessOutcome, HarnessState, PipelineHarness};
    pub use crate::stages::{
        gpu, postprocess, preprocess, DocumentTransform, FailureMode, MarkerTransform,
        OutputNaming, StageRunner, WriteMode,
    };
    pub use crate::storage::{ObjectStoreGateway, StorageGateway};
    pub use crate::utils::{Clock, ManualClock, SystemClock};
}
