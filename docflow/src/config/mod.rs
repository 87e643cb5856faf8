//! Configuration for stages and the test harness.
//!
//! Stage configuration is resolved once, at process start, from a fixed set
//! of environment values. Missing required values abort before any I/O.

mod env;
mod harness;
mod stage;

pub use env::{EnvSource, MapEnv, ProcessEnv};
pub use harness::HarnessConfig;
pub use stage::{
    GpuConfig, PipelineLayout, PostprocessConfig, PreprocessConfig, StageOptions,
    DEFAULT_MOUNT_ROOT, DEFAULT_SCRATCH_ROOT,
};
