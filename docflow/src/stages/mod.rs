//! Stage transforms, the directory runner and the three stage entry points.
//!
//! Every stage has the same shape: resolve configuration, gather inputs,
//! run a [`DocumentTransform`] over each file with the [`StageRunner`],
//! then hand the outputs on.

mod device;
pub mod gpu;
pub mod postprocess;
pub mod preprocess;
mod runner;
mod transform;

pub use device::{DeviceInfo, DeviceProbe, ModelLoader, NvidiaProcProbe, PlaceholderModel};
pub use runner::{FailureMode, StageRunner, WriteMode};
pub use transform::{DocumentTransform, FnTransform, GpuTransform, MarkerTransform};

pub use crate::core::OutputNaming;

#[cfg(test)]
pub use device::{MockDeviceProbe, MockModelLoader};
