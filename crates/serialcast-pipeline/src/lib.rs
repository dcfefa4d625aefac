//! Bounded producer/consumer pipeline from a frame source to a frame sink.
//!
//! Two threads share one [`BoundedChannel`]:
//! - the producer reads frames from a [`FrameSource`] and blocks when the
//!   channel is full (backpressure on the device)
//! - the consumer publishes frames to a [`FrameSink`], best-effort
//!
//! A single [`CancellationSignal`] stops both. The producer stops reading;
//! the consumer keeps publishing until every queued frame has had one send
//! attempt, then exits.

pub mod bridge;
pub mod channel;
mod consumer;
pub mod error;
pub mod pipeline;
mod producer;
pub mod signal;
pub mod sink;
pub mod source;
pub mod stats;

pub use bridge::{open_bridge, BridgeConfig, SerialBridge};
pub use channel::{BoundedChannel, DEFAULT_CAPACITY};
pub use error::{ChannelError, PipelineError, Result};
pub use pipeline::{Pipeline, PipelineConfig, PipelineHandle, DEFAULT_RETRY_DELAY};
pub use signal::CancellationSignal;
pub use sink::FrameSink;
pub use source::FrameSource;
pub use stats::{PipelineStats, StatsSnapshot};
