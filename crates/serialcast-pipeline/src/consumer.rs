use tracing::{debug, info, warn};

use crate::channel::BoundedChannel;
use crate::sink::FrameSink;
use crate::stats::PipelineStats;

/// Publish frames from `channel` to `sink` until the channel is drained.
///
/// Each frame gets exactly one publish attempt; failures are logged and the
/// frame is dropped. The sink is closed on exit.
pub(crate) fn run<K: FrameSink>(mut sink: K, channel: &BoundedChannel, stats: &PipelineStats) {
    info!("consumer started");

    while let Ok(frame) = channel.get() {
        match sink.publish(&frame) {
            Ok(()) => {
                stats.record_published();
                debug!(
                    bytes = frame.len(),
                    queue_len = channel.size(),
                    "consumer published frame"
                );
            }
            Err(err) => {
                stats.record_send_error();
                warn!(error = %err, bytes = frame.len(), "publish failed, frame dropped");
            }
        }
    }

    info!("consumer drained channel, closing sink");
    sink.close();
}
