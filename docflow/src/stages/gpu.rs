//! GPU stage: preprocessed directory to processed directory, both on the
//! shared mount.

use std::sync::Arc;
use tracing::info;

use super::{DeviceProbe, GpuTransform, ModelLoader, StageRunner};
use crate::config::GpuConfig;
use crate::core::StageReport;
use crate::errors::PipelineResult;
use crate::events::EventSink;
use crate::utils::Clock;

/// Selects the device, loads the model, then annotates every preprocessed
/// file. Either precondition failing stops the stage before any file is
/// read.
pub async fn run(
    config: &GpuConfig,
    probe: &dyn DeviceProbe,
    model: &dyn ModelLoader,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
) -> PipelineResult<StageReport> {
    let device = probe.probe(config.device_index)?;
    info!(device = %device.name, index = device.index, "Using GPU: {}", device.name);

    model.load(&device).await?;

    let transform = GpuTransform::new(device.name, config.simulated_work, clock.clone());
    let runner = StageRunner::new(Arc::new(transform), sink, clock)
        .with_options(config.options)
        .with_naming(config.naming.clone());

    runner
        .run(&config.layout.preprocessed_dir(), &config.layout.processed_dir())
        .await?
        .into_result()
}
