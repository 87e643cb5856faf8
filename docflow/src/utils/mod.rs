//! Clock and timestamp helpers.
//!
//! Everything that reads the time goes through [`Clock`] so the polling
//! loop and the marker timestamps can be driven deterministically in tests.

mod clock;
pub mod timestamps;

pub use clock::{Clock, ManualClock, SystemClock};
pub use timestamps::{format_marker_timestamp, Timestamp, MARKER_TIMESTAMP_FORMAT};
