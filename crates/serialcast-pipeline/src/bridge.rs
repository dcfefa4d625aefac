use serialcast_frame::{FrameConfig, FrameReader};
use serialcast_transport::{open_serial, MulticastConfig, MulticastSink, SerialConfig, SerialLink};
use tracing::info;

use crate::error::Result;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Everything needed to bridge one serial device to one multicast group.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfig {
    pub serial: SerialConfig,
    pub framing: FrameConfig,
    pub multicast: MulticastConfig,
    pub pipeline: PipelineConfig,
}

/// A pipeline reading a serial device and publishing to multicast.
pub type SerialBridge = Pipeline<FrameReader<SerialLink>, MulticastSink>;

/// Acquire both transports and assemble the pipeline.
///
/// Fails before any thread starts if the socket cannot be bound or the
/// device cannot be opened.
pub fn open_bridge(config: &BridgeConfig) -> Result<SerialBridge> {
    let sink = MulticastSink::open(&config.multicast)?;
    let link = open_serial(&config.serial)?;
    let source = FrameReader::with_config(link, config.framing.clone())?;

    info!(
        device = ?config.serial.path,
        group = %sink.group(),
        capacity = config.pipeline.capacity,
        "bridge ready"
    );

    Ok(Pipeline::new(source, sink, config.pipeline.clone()))
}
