use std::sync::atomic::{AtomicU64, Ordering};

/// Running counters updated by the pipeline loops.
#[derive(Debug, Default)]
pub struct PipelineStats {
    frames_read: AtomicU64,
    frames_discarded: AtomicU64,
    read_errors: AtomicU64,
    frames_enqueued: AtomicU64,
    frames_rejected: AtomicU64,
    frames_published: AtomicU64,
    send_errors: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Frames returned by the source, including discarded ones.
    pub frames_read: u64,
    /// Frames dropped by the producer's discard-first policy.
    pub frames_discarded: u64,
    /// Failed reads, excluding timeouts.
    pub read_errors: u64,
    /// Frames accepted by the channel.
    pub frames_enqueued: u64,
    /// Frames refused because the channel had closed.
    pub frames_rejected: u64,
    /// Frames handed to the sink successfully.
    pub frames_published: u64,
    /// Frames the sink failed to send (dropped).
    pub send_errors: u64,
}

impl StatsSnapshot {
    /// Enqueued frames not yet accounted for by a publish attempt.
    pub fn in_flight(&self) -> u64 {
        self.frames_enqueued
            .saturating_sub(self.frames_published + self.send_errors)
    }
}

impl PipelineStats {
    pub(crate) fn record_read(&self) {
        self.frames_read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded(&self) {
        self.frames_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_enqueued(&self) {
        self.frames_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self) {
        self.frames_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_error(&self) {
        self.send_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            frames_discarded: self.frames_discarded.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
            frames_enqueued: self.frames_enqueued.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_published: self.frames_published.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
        }
    }
}
