//! Provenance markers stamped onto documents by each stage.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{format_marker_timestamp, Timestamp};

/// Device name used when a GPU marker is rendered without one.
const UNKNOWN_DEVICE: &str = "unknown device";

/// The three pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageLabel {
    /// Downloads inputs and prepends the first marker.
    Preprocess,
    /// Accelerator stage; appends the device marker.
    GpuProcess,
    /// Appends the last marker and uploads results.
    Postprocess,
}

impl StageLabel {
    /// All stages in pipeline order.
    pub const ALL: [Self; 3] = [Self::Preprocess, Self::GpuProcess, Self::Postprocess];

    /// Short stage name used in logs and configuration errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Preprocess => "preprocess",
            Self::GpuProcess => "gpu",
            Self::Postprocess => "postprocess",
        }
    }

    /// The fixed text every marker of this stage starts with.
    #[must_use]
    pub const fn marker_prefix(self) -> &'static str {
        match self {
            Self::Preprocess => "[Preprocessed at",
            Self::GpuProcess => "[GPU Processed with",
            Self::Postprocess => "[Postprocessed at",
        }
    }
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single `[<StageLabel> at <timestamp>]` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    label: StageLabel,
    device: Option<String>,
    timestamp: String,
}

impl Marker {
    /// Creates a marker for `label` stamped with `timestamp`.
    #[must_use]
    pub fn new(label: StageLabel, timestamp: &Timestamp) -> Self {
        Self {
            label,
            device: None,
            timestamp: format_marker_timestamp(timestamp),
        }
    }

    /// Creates the GPU stage marker naming the device that did the work.
    #[must_use]
    pub fn gpu(device: impl Into<String>, timestamp: &Timestamp) -> Self {
        Self::new(StageLabel::GpuProcess, timestamp).with_device(device)
    }

    /// Sets the device identifier.
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    /// The stage this marker belongs to.
    #[must_use]
    pub const fn label(&self) -> StageLabel {
        self.label
    }

    /// Applies the marker to document content.
    ///
    /// The preprocess marker is prepended followed by a newline; the other
    /// two are appended after a newline. The original content is kept
    /// byte for byte.
    #[must_use]
    pub fn apply(&self, content: &str) -> String {
        match self.label {
            StageLabel::Preprocess => format!("{self}\n{content}"),
            StageLabel::GpuProcess | StageLabel::Postprocess => format!("{content}\n{self}"),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label {
            StageLabel::GpuProcess => write!(
                f,
                "{} {} at {}]",
                self.label.marker_prefix(),
                self.device.as_deref().unwrap_or(UNKNOWN_DEVICE),
                self.timestamp
            ),
            StageLabel::Preprocess | StageLabel::Postprocess => {
                write!(f, "{} {}]", self.label.marker_prefix(), self.timestamp)
            }
        }
    }
}

/// Result of scanning a document for the three stage markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerCheck {
    found: Vec<(StageLabel, usize)>,
    missing: Vec<StageLabel>,
}

impl MarkerCheck {
    /// Scans content for each stage's marker prefix.
    ///
    /// The prepended preprocess marker is located from the start and the
    /// two appended markers from the end, so a body quoting a marker
    /// prefix does not disturb the order check.
    #[must_use]
    pub fn inspect(content: &str) -> Self {
        let mut found = Vec::new();
        let mut missing = Vec::new();

        for label in StageLabel::ALL {
            let offset = match label {
                StageLabel::Preprocess => content.find(label.marker_prefix()),
                StageLabel::GpuProcess | StageLabel::Postprocess => content.rfind(label.marker_prefix()),
            };
            match offset {
                Some(offset) => found.push((label, offset)),
                None => missing.push(label),
            }
        }

        Self { found, missing }
    }

    /// True when every stage's marker is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// True when the present markers appear in pipeline order.
    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.found.windows(2).all(|pair| pair[0].1 < pair[1].1)
    }

    /// Stages whose marker is absent.
    #[must_use]
    pub fn missing(&self) -> &[StageLabel] {
        &self.missing
    }

    /// Marker prefixes of the absent stages, for error reporting.
    #[must_use]
    pub fn missing_prefixes(&self) -> Vec<String> {
        self.missing
            .iter()
            .map(|label| label.marker_prefix().to_string())
            .collect()
    }
}
