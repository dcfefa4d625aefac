use std::time::Duration;

use serialcast_frame::FrameError;
use tracing::{debug, info, trace, warn};

use crate::channel::BoundedChannel;
use crate::signal::CancellationSignal;
use crate::source::FrameSource;
use crate::stats::PipelineStats;

/// Producer loop settings.
#[derive(Debug, Clone)]
pub(crate) struct ProducerSettings {
    /// Drop the first frame read (it may have started before we attached).
    pub discard_first_frame: bool,
    /// Pause after a failed read before trying again.
    pub retry_delay: Duration,
}

/// Read frames from `source` into `channel` until cancelled.
///
/// Read failures are logged and retried. Cancellation is checked before each
/// read, so a frame that was already being read is still enqueued. The source
/// is closed on exit.
pub(crate) fn run<S: FrameSource>(
    mut source: S,
    channel: &BoundedChannel,
    signal: &CancellationSignal,
    stats: &PipelineStats,
    settings: &ProducerSettings,
) {
    let mut discard_next = settings.discard_first_frame;
    info!("producer started");

    while !signal.is_cancelled() {
        let frame = match source.read_frame() {
            Ok(frame) => frame,
            Err(err) if err.is_timeout() => {
                trace!("read timed out");
                continue;
            }
            Err(err) => {
                stats.record_read_error();
                warn!(error = %err, "read failed");
                // An oversized record is already skipped; only device faults back off.
                let backoff = !matches!(err, FrameError::FrameTooLarge { .. });
                if backoff && signal.wait_timeout(settings.retry_delay) {
                    break;
                }
                continue;
            }
        };
        stats.record_read();

        if discard_next {
            discard_next = false;
            stats.record_discarded();
            debug!(bytes = frame.len(), "discarded first frame");
            continue;
        }

        let bytes = frame.len();
        match channel.put(frame) {
            Ok(()) => {
                stats.record_enqueued();
                trace!(bytes, "producer enqueued frame");
            }
            Err(err) => {
                stats.record_rejected();
                warn!(error = %err, "channel closed, producer stopping");
                break;
            }
        }
    }

    info!("producer exiting, closing source");
    source.close();
}
