//! Core domain model types for docflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Stage labels and provenance markers
//! - File records for the entries a stage processes
//! - Stage reports with per-file failure records

mod marker;
mod record;
mod report;

pub use marker::{Marker, MarkerCheck, StageLabel};
pub use record::{scan_directory, FileRecord, OutputNaming};
pub use report::{FileFailure, StageReport};
