//! Per-stage configuration and the fixed filesystem layout.

use std::path::PathBuf;
use std::time::Duration;

use super::env::{optional, require_all, EnvSource};
use crate::core::{OutputNaming, StageLabel};
use crate::errors::PipelineResult;
use crate::stages::{FailureMode, WriteMode};

/// Default shared mount used for inter-stage handoff.
pub const DEFAULT_MOUNT_ROOT: &str = "/efs";

/// Default root of the stage-local scratch directories.
pub const DEFAULT_SCRATCH_ROOT: &str = "/tmp";

const MOUNT_ROOT_ENV: &str = "DOCFLOW_MOUNT_ROOT";
const SCRATCH_ROOT_ENV: &str = "DOCFLOW_SCRATCH_ROOT";
const WRITE_MODE_ENV: &str = "DOCFLOW_WRITE_MODE";
const FAILURE_MODE_ENV: &str = "DOCFLOW_FAILURE_MODE";
const GPU_WORK_ENV: &str = "GPU_SIMULATED_WORK_MS";
const GPU_INDEX_ENV: &str = "GPU_DEVICE_INDEX";
const GPU_SUFFIX_ENV: &str = "GPU_OUTPUT_SUFFIX";

const DEFAULT_GPU_WORK_MS: u64 = 1000;

/// Directory layout shared by all stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineLayout {
    mount_root: PathBuf,
    scratch_root: PathBuf,
}

impl Default for PipelineLayout {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT_ROOT, DEFAULT_SCRATCH_ROOT)
    }
}

impl PipelineLayout {
    /// Creates a layout with explicit roots.
    #[must_use]
    pub fn new(mount_root: impl Into<PathBuf>, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            mount_root: mount_root.into(),
            scratch_root: scratch_root.into(),
        }
    }

    /// Reads the optional root overrides.
    pub fn from_env(env: &dyn EnvSource) -> Self {
        Self::new(
            env.non_empty(MOUNT_ROOT_ENV)
                .unwrap_or_else(|| DEFAULT_MOUNT_ROOT.to_string()),
            env.non_empty(SCRATCH_ROOT_ENV)
                .unwrap_or_else(|| DEFAULT_SCRATCH_ROOT.to_string()),
        )
    }

    /// `<mount>/preprocessed`: preprocess output, GPU input.
    #[must_use]
    pub fn preprocessed_dir(&self) -> PathBuf {
        self.mount_root.join("preprocessed")
    }

    /// `<mount>/processed`: GPU output, postprocess input.
    #[must_use]
    pub fn processed_dir(&self) -> PathBuf {
        self.mount_root.join("processed")
    }

    /// `<scratch>/input`: preprocess download target.
    #[must_use]
    pub fn scratch_input(&self) -> PathBuf {
        self.scratch_root.join("input")
    }

    /// `<scratch>/output`: postprocess staging before upload.
    #[must_use]
    pub fn scratch_output(&self) -> PathBuf {
        self.scratch_root.join("output")
    }
}

/// Runner knobs shared by all stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageOptions {
    /// How output files are written.
    pub write_mode: WriteMode,
    /// What a per-file failure does to the batch.
    pub failure_mode: FailureMode,
}

impl StageOptions {
    /// Reads the optional runner knobs.
    pub fn from_env(env: &dyn EnvSource) -> PipelineResult<Self> {
        Ok(Self {
            write_mode: optional(env, WRITE_MODE_ENV)?.unwrap_or_default(),
            failure_mode: optional(env, FAILURE_MODE_ENV)?.unwrap_or_default(),
        })
    }
}

/// Preprocess stage configuration.
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Bucket holding the input documents.
    pub source_bucket: String,
    /// Key prefix of the input documents.
    pub input_directory: String,
    /// Filesystem layout.
    pub layout: PipelineLayout,
    /// Runner knobs.
    pub options: StageOptions,
}

impl PreprocessConfig {
    /// Requires `SOURCE_BUCKET` and `INPUT_DIRECTORY`.
    pub fn from_env(env: &dyn EnvSource) -> PipelineResult<Self> {
        let mut values = require_all(
            env,
            StageLabel::Preprocess.name(),
            &["SOURCE_BUCKET", "INPUT_DIRECTORY"],
        )?
        .into_iter();

        Ok(Self {
            source_bucket: values.next().unwrap_or_default(),
            input_directory: values.next().unwrap_or_default(),
            layout: PipelineLayout::from_env(env),
            options: StageOptions::from_env(env)?,
        })
    }
}

/// GPU stage configuration. Nothing is required.
#[derive(Debug, Clone)]
pub struct GpuConfig {
    /// Filesystem layout.
    pub layout: PipelineLayout,
    /// Runner knobs.
    pub options: StageOptions,
    /// Accelerator to select.
    pub device_index: usize,
    /// Fixed per-file delay standing in for inference.
    pub simulated_work: Duration,
    /// Output file naming; same name unless `GPU_OUTPUT_SUFFIX` is set.
    pub naming: OutputNaming,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            layout: PipelineLayout::default(),
            options: StageOptions::default(),
            device_index: 0,
            simulated_work: Duration::from_millis(DEFAULT_GPU_WORK_MS),
            naming: OutputNaming::SameName,
        }
    }
}

impl GpuConfig {
    /// Reads the optional GPU knobs.
    pub fn from_env(env: &dyn EnvSource) -> PipelineResult<Self> {
        Ok(Self {
            layout: PipelineLayout::from_env(env),
            options: StageOptions::from_env(env)?,
            device_index: optional(env, GPU_INDEX_ENV)?.unwrap_or(0),
            simulated_work: Duration::from_millis(
                optional(env, GPU_WORK_ENV)?.unwrap_or(DEFAULT_GPU_WORK_MS),
            ),
            naming: env
                .non_empty(GPU_SUFFIX_ENV)
                .map_or(OutputNaming::SameName, OutputNaming::Suffixed),
        })
    }
}

/// Postprocess stage configuration.
#[derive(Debug, Clone)]
pub struct PostprocessConfig {
    /// Bucket receiving the results.
    pub output_bucket: String,
    /// Key prefix for the results.
    pub output_prefix: String,
    /// Filesystem layout.
    pub layout: PipelineLayout,
    /// Runner knobs.
    pub options: StageOptions,
}

impl PostprocessConfig {
    /// Requires `OUTPUT_BUCKET` and `OUTPUT_PREFIX`.
    pub fn from_env(env: &dyn EnvSource) -> PipelineResult<Self> {
        let mut values = require_all(
            env,
            StageLabel::Postprocess.name(),
            &["OUTPUT_BUCKET", "OUTPUT_PREFIX"],
        )?
        .into_iter();

        Ok(Self {
            output_bucket: values.next().unwrap_or_default(),
            output_prefix: values.next().unwrap_or_default(),
            layout: PipelineLayout::from_env(env),
            options: StageOptions::from_env(env)?,
        })
    }
}
