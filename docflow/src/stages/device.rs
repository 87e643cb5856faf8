//! GPU stage preconditions: device setup and model load.
//!
//! Both must succeed before the GPU stage touches any file.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::info;

use crate::errors::{PipelineError, PipelineResult};

/// Where the NVIDIA kernel driver publishes one directory per GPU.
const NVIDIA_PROC_ROOT: &str = "/proc/driver/nvidia/gpus";

/// The accelerator selected for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Index among the detected devices.
    pub index: usize,
    /// Human-readable model name, used in the GPU marker.
    pub name: String,
}

/// Detects and selects an accelerator.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceProbe: Send + Sync {
    /// Selects device `index`, or fails with `DeviceUnavailable`.
    fn probe(&self, index: usize) -> PipelineResult<DeviceInfo>;
}

/// Probes GPUs through the NVIDIA driver's procfs entries.
#[derive(Debug, Clone)]
pub struct NvidiaProcProbe {
    root: PathBuf,
}

impl Default for NvidiaProcProbe {
    fn default() -> Self {
        Self::new(NVIDIA_PROC_ROOT)
    }
}

impl NvidiaProcProbe {
    /// Creates a probe reading device entries under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn device_dirs(&self) -> PipelineResult<Vec<PathBuf>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(PipelineError::io(&self.root, err)),
        };

        let mut dirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();
        Ok(dirs)
    }
}

/// Pulls the `Model:` value out of a driver information file.
fn parse_model_name(information: &str) -> Option<String> {
    information.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        (key.trim() == "Model").then(|| value.trim().to_string())
    })
}

impl DeviceProbe for NvidiaProcProbe {
    fn probe(&self, index: usize) -> PipelineResult<DeviceInfo> {
        let dirs = self.device_dirs()?;
        if dirs.is_empty() {
            return Err(PipelineError::DeviceUnavailable(format!(
                "no devices under {}",
                self.root.display()
            )));
        }

        let dir = dirs.get(index).ok_or_else(|| {
            PipelineError::DeviceUnavailable(format!(
                "device index {index} out of range ({} present)",
                dirs.len()
            ))
        })?;

        let information_path = dir.join("information");
        let information = std::fs::read_to_string(&information_path)
            .map_err(|err| PipelineError::io(&information_path, err))?;

        let name = parse_model_name(&information).unwrap_or_else(|| {
            dir.file_name()
                .map_or_else(|| format!("gpu{index}"), |n| n.to_string_lossy().into_owned())
        });

        Ok(DeviceInfo { index, name })
    }
}

/// Loads the model onto the selected device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Loads the model; failure gates the whole GPU stage.
    async fn load(&self, device: &DeviceInfo) -> PipelineResult<()>;
}

/// No model: the GPU stage only annotates documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderModel;

#[async_trait]
impl ModelLoader for PlaceholderModel {
    async fn load(&self, device: &DeviceInfo) -> PipelineResult<()> {
        info!(device = %device.name, index = device.index, "No model configured, running annotation only");
        Ok(())
    }
}
