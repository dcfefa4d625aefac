use std::io;
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use crate::channel::{BoundedChannel, DEFAULT_CAPACITY};
use crate::consumer;
use crate::error::{PipelineError, Result};
use crate::producer::{self, ProducerSettings};
use crate::signal::CancellationSignal;
use crate::sink::FrameSink;
use crate::source::FrameSource;
use crate::stats::{PipelineStats, StatsSnapshot};

/// Default pause after a failed read.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Pipeline behavior config.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Frames held between reader and publisher. Default: 100.
    pub capacity: usize,
    /// Drop the first frame after startup. Default: true.
    ///
    /// The device may have been mid-record when the port was opened, so the
    /// first record is usually a fragment.
    pub discard_first_frame: bool,
    /// Pause after a failed read before retrying. Cancellation cuts it short.
    pub retry_delay: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            discard_first_frame: true,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// A source and a sink, not yet running.
pub struct Pipeline<S, K> {
    source: S,
    sink: K,
    config: PipelineConfig,
    signal: CancellationSignal,
}

impl<S, K> Pipeline<S, K>
where
    S: FrameSource + 'static,
    K: FrameSink + 'static,
{
    /// Pair a source with a sink using `config`.
    pub fn new(source: S, sink: K, config: PipelineConfig) -> Self {
        Self {
            source,
            sink,
            config,
            signal: CancellationSignal::new(),
        }
    }

    /// Use an externally owned cancellation signal.
    pub fn with_signal(mut self, signal: CancellationSignal) -> Self {
        self.signal = signal;
        self
    }

    /// The signal that stops this pipeline.
    pub fn signal(&self) -> CancellationSignal {
        self.signal.clone()
    }

    /// Start the producer and consumer threads.
    pub fn spawn(self) -> Result<PipelineHandle> {
        if self.config.capacity == 0 {
            return Err(PipelineError::InvalidCapacity);
        }

        let Pipeline {
            source,
            sink,
            config,
            signal,
        } = self;

        let channel = BoundedChannel::new(config.capacity, &signal);
        let stats = Arc::new(PipelineStats::default());
        let settings = ProducerSettings {
            discard_first_frame: config.discard_first_frame,
            retry_delay: config.retry_delay,
        };

        let consumer = {
            let channel = Arc::clone(&channel);
            let stats = Arc::clone(&stats);
            let signal = signal.clone();
            start_loop(named("serialcast-consumer"), sink, K::close, move |sink| {
                let _guard = LoopGuard::new("consumer", &signal, &channel);
                consumer::run(sink, &channel, &stats);
            })
        };
        let consumer = match consumer {
            Ok(handle) => handle,
            Err(err) => {
                let mut source = source;
                source.close();
                return Err(PipelineError::Spawn {
                    role: "consumer",
                    source: err,
                });
            }
        };

        let producer = {
            let channel = Arc::clone(&channel);
            let stats = Arc::clone(&stats);
            let signal = signal.clone();
            start_loop(named("serialcast-producer"), source, S::close, move |source| {
                let _guard = LoopGuard::new("producer", &signal, &channel);
                producer::run(source, &channel, &signal, &stats, &settings);
            })
        };
        let producer = match producer {
            Ok(handle) => handle,
            Err(err) => {
                signal.cancel();
                if consumer.join().is_err() {
                    error!("consumer loop panicked during aborted startup");
                }
                return Err(PipelineError::Spawn {
                    role: "producer",
                    source: err,
                });
            }
        };

        info!(capacity = channel.capacity(), "pipeline started");

        Ok(PipelineHandle {
            signal,
            channel,
            stats,
            producer,
            consumer,
        })
    }

    /// Run until the signal is cancelled, then drain and return final stats.
    pub fn run(self) -> Result<StatsSnapshot> {
        let handle = self.spawn()?;
        handle.wait();
        handle.join()
    }
}

/// A running pipeline.
pub struct PipelineHandle {
    signal: CancellationSignal,
    channel: Arc<BoundedChannel>,
    stats: Arc<PipelineStats>,
    producer: JoinHandle<()>,
    consumer: JoinHandle<()>,
}

impl PipelineHandle {
    /// Request shutdown. Returns `true` for the first request only.
    pub fn cancel(&self) -> bool {
        self.signal.cancel()
    }

    /// The pipeline's cancellation signal.
    pub fn signal(&self) -> &CancellationSignal {
        &self.signal
    }

    /// Block until cancellation is requested (by any clone of the signal, or
    /// by a loop that panicked).
    pub fn wait(&self) {
        self.signal.wait();
    }

    /// Frames currently queued. Advisory only.
    pub fn queue_len(&self) -> usize {
        self.channel.size()
    }

    /// Current counter values.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Cancel if not already cancelled, wait for both loops to finish, and
    /// return the final counters.
    ///
    /// The consumer publishes every queued frame before it exits.
    pub fn join(self) -> Result<StatsSnapshot> {
        self.signal.cancel();

        let producer = self.producer.join();
        let consumer = self.consumer.join();
        self.channel.close();

        let stats = self.stats.snapshot();
        info!(
            published = stats.frames_published,
            send_errors = stats.send_errors,
            read_errors = stats.read_errors,
            "pipeline stopped"
        );

        if producer.is_err() {
            return Err(PipelineError::LoopPanicked("producer"));
        }
        if consumer.is_err() {
            return Err(PipelineError::LoopPanicked("consumer"));
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("signal", &self.signal)
            .field("channel", &self.channel)
            .finish()
    }
}

type LoopBody = Box<dyn FnOnce() + Send>;

fn named(name: &'static str) -> impl FnOnce(LoopBody) -> io::Result<JoinHandle<()>> {
    move |body| thread::Builder::new().name(name.to_string()).spawn(body)
}

/// Start a loop thread, then hand it `endpoint`.
///
/// The endpoint only moves once the thread exists. If it cannot be started
/// the endpoint is closed here, matching what the loop does on exit.
fn start_loop<T, B>(
    spawn: impl FnOnce(LoopBody) -> io::Result<JoinHandle<()>>,
    mut endpoint: T,
    close: fn(&mut T),
    body: B,
) -> io::Result<JoinHandle<()>>
where
    T: Send + 'static,
    B: FnOnce(T) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<T>(1);
    let handle = match spawn(Box::new(move || {
        if let Ok(endpoint) = rx.recv() {
            body(endpoint);
        }
    })) {
        Ok(handle) => handle,
        Err(err) => {
            close(&mut endpoint);
            return Err(err);
        }
    };

    if let Err(mpsc::SendError(mut endpoint)) = tx.send(endpoint) {
        error!("loop exited before receiving its endpoint");
        close(&mut endpoint);
    }
    Ok(handle)
}

/// Cancels the pipeline and closes the channel if its loop unwinds.
struct LoopGuard<'a> {
    role: &'static str,
    signal: &'a CancellationSignal,
    channel: &'a BoundedChannel,
}

impl<'a> LoopGuard<'a> {
    fn new(role: &'static str, signal: &'a CancellationSignal, channel: &'a BoundedChannel) -> Self {
        Self {
            role,
            signal,
            channel,
        }
    }
}

impl Drop for LoopGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(role = self.role, "loop panicked, cancelling pipeline");
            self.signal.cancel();
            self.channel.close();
        }
    }
}
