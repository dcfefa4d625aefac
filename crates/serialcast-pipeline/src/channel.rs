use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use serialcast_frame::Frame;
use tracing::debug;

use crate::error::ChannelError;
use crate::signal::CancellationSignal;

/// Default number of frames held between reader and publisher.
pub const DEFAULT_CAPACITY: usize = 100;

/// Fixed-capacity FIFO of frames between one producer and one consumer.
///
/// `put` blocks while the channel is full, which is what throttles reads
/// from the device when publishing falls behind. `get` blocks while the
/// channel is empty and the pipeline is running; once cancellation is
/// active it keeps returning queued frames and then reports
/// [`ChannelError::Drained`]. After that the channel is closed and further
/// `put`s are rejected, so a frame can never be stranded behind a consumer
/// that has already left.
pub struct BoundedChannel {
    state: Mutex<State>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

#[derive(Default)]
struct State {
    queue: VecDeque<Frame>,
    draining: bool,
    closed: bool,
    /// Producers parked in `put` waiting for space. Their frames were read
    /// before they blocked, so a drain waits for them.
    waiting_puts: usize,
}

impl BoundedChannel {
    /// Create a channel tied to `signal`.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, signal: &CancellationSignal) -> Arc<Self> {
        let capacity = capacity.max(1);
        let channel = Arc::new(Self {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                ..State::default()
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        });

        let weak = Arc::downgrade(&channel);
        signal.on_cancel(move || {
            if let Some(channel) = weak.upgrade() {
                channel.begin_drain();
            }
        });

        channel
    }

    /// Append a frame, blocking while the channel is full.
    ///
    /// Fails with [`ChannelError::Closed`] (handing the frame back) once the
    /// channel has been closed or drained.
    pub fn put(&self, frame: Frame) -> Result<(), ChannelError> {
        let mut state = self.lock();
        loop {
            if state.closed {
                return Err(ChannelError::Closed(frame));
            }
            if state.queue.len() < self.capacity {
                state.queue.push_back(frame);
                self.not_empty.notify_one();
                return Ok(());
            }
            state.waiting_puts += 1;
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.waiting_puts -= 1;
        }
    }

    /// Take the oldest frame.
    ///
    /// Returns immediately when a frame is queued. When empty, blocks while
    /// running and returns [`ChannelError::Drained`] once cancelling (or
    /// closed), closing the channel to further `put`s. While cancelling, a
    /// `put` still parked on a full channel holds off `Drained` until its
    /// frame has been queued and taken.
    pub fn get(&self) -> Result<Frame, ChannelError> {
        let mut state = self.lock();
        loop {
            if let Some(frame) = state.queue.pop_front() {
                self.not_full.notify_one();
                return Ok(frame);
            }
            if state.closed || (state.draining && state.waiting_puts == 0) {
                if !state.closed {
                    debug!("channel drained");
                    state.closed = true;
                    self.not_full.notify_all();
                }
                return Err(ChannelError::Drained);
            }
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Reject all further `put`s and wake every waiter.
    ///
    /// Frames already queued can still be taken with `get`.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            state.closed = true;
            self.not_empty.notify_all();
            self.not_full.notify_all();
        }
    }

    /// Current number of queued frames. Advisory only.
    pub fn size(&self) -> usize {
        self.lock().queue.len()
    }

    /// True when no frames are queued. Advisory only.
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Maximum number of queued frames.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True once the channel rejects `put`.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    #[cfg(test)]
    fn waiting_puts(&self) -> usize {
        self.lock().waiting_puts
    }

    fn begin_drain(&self) {
        let mut state = self.lock();
        state.draining = true;
        self.not_empty.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for BoundedChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("BoundedChannel")
            .field("len", &state.queue.len())
            .field("capacity", &self.capacity)
            .field("draining", &state.draining)
            .field("closed", &state.closed)
            .field("waiting_puts", &state.waiting_puts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    const BLOCKED: Duration = Duration::from_millis(100);
    const WAKE: Duration = Duration::from_secs(5);

    fn frame(payload: &'static str) -> Frame {
        Frame::new(payload.as_bytes())
    }

    fn payload(frame: &Frame) -> &str {
        std::str::from_utf8(frame.as_ref()).unwrap()
    }

    #[test]
    fn fifo_order_and_size() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(4, &signal);

        channel.put(frame("a")).unwrap();
        channel.put(frame("b")).unwrap();
        channel.put(frame("c")).unwrap();
        assert_eq!(channel.size(), 3);

        assert_eq!(payload(&channel.get().unwrap()), "a");
        assert_eq!(payload(&channel.get().unwrap()), "b");
        assert_eq!(payload(&channel.get().unwrap()), "c");
        assert!(channel.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(0, &signal);
        assert_eq!(channel.capacity(), 1);
        channel.put(frame("only")).unwrap();
        assert_eq!(channel.size(), 1);
    }

    #[test]
    fn put_blocks_at_capacity_until_get() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(2, &signal);
        channel.put(frame("A")).unwrap();
        channel.put(frame("B")).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let producer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                channel.put(frame("C")).unwrap();
                done_tx.send(()).unwrap();
            })
        };

        assert!(done_rx.recv_timeout(BLOCKED).is_err(), "put should block");
        assert_eq!(channel.size(), 2);

        assert_eq!(payload(&channel.get().unwrap()), "A");
        done_rx.recv_timeout(WAKE).expect("put should resume after get");
        producer.join().unwrap();

        assert_eq!(payload(&channel.get().unwrap()), "B");
        assert_eq!(payload(&channel.get().unwrap()), "C");
    }

    #[test]
    fn get_blocks_while_empty_until_put() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(2, &signal);

        let (tx, rx) = mpsc::channel();
        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                let got = channel.get().unwrap();
                tx.send(got).unwrap();
            })
        };

        assert!(rx.recv_timeout(BLOCKED).is_err(), "get should block");
        channel.put(frame("late")).unwrap();
        let got = rx.recv_timeout(WAKE).expect("get should resume after put");
        assert_eq!(payload(&got), "late");
        consumer.join().unwrap();
    }

    #[test]
    fn blocked_get_is_released_by_cancellation() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(2, &signal);

        let (tx, rx) = mpsc::channel();
        let consumer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                tx.send(channel.get()).unwrap();
            })
        };

        assert!(rx.recv_timeout(BLOCKED).is_err());
        signal.cancel();
        let result = rx.recv_timeout(WAKE).expect("get should return on cancel");
        assert!(matches!(result, Err(ChannelError::Drained)));
        consumer.join().unwrap();
    }

    #[test]
    fn drain_returns_queued_frames_before_drained() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(4, &signal);
        channel.put(frame("x")).unwrap();
        channel.put(frame("y")).unwrap();

        signal.cancel();

        assert_eq!(payload(&channel.get().unwrap()), "x");
        assert_eq!(payload(&channel.get().unwrap()), "y");
        assert!(matches!(channel.get(), Err(ChannelError::Drained)));
        assert!(matches!(channel.get(), Err(ChannelError::Drained)));
    }

    #[test]
    fn put_after_drain_is_rejected_with_frame() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(4, &signal);
        signal.cancel();

        assert!(matches!(channel.get(), Err(ChannelError::Drained)));
        assert!(channel.is_closed());

        match channel.put(frame("too-late")) {
            Err(ChannelError::Closed(rejected)) => assert_eq!(payload(&rejected), "too-late"),
            other => panic!("expected Closed, got {other:?}"),
        }
    }

    #[test]
    fn put_while_cancelling_but_not_drained_is_accepted() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(4, &signal);
        channel.put(frame("queued")).unwrap();
        signal.cancel();

        channel.put(frame("in-flight")).unwrap();
        assert_eq!(payload(&channel.get().unwrap()), "queued");
        assert_eq!(payload(&channel.get().unwrap()), "in-flight");
        assert!(matches!(channel.get(), Err(ChannelError::Drained)));
    }

    #[test]
    fn put_blocked_at_cancel_is_not_drained_away() {
        for _ in 0..200 {
            let signal = CancellationSignal::new();
            let channel = BoundedChannel::new(1, &signal);
            channel.put(frame("X")).unwrap();

            let (tx, rx) = mpsc::channel();
            let producer = {
                let channel = Arc::clone(&channel);
                thread::spawn(move || {
                    tx.send(channel.put(frame("Y"))).unwrap();
                })
            };
            while channel.waiting_puts() == 0 {
                thread::yield_now();
            }

            signal.cancel();
            assert_eq!(payload(&channel.get().unwrap()), "X");
            assert_eq!(payload(&channel.get().unwrap()), "Y");
            assert!(matches!(channel.get(), Err(ChannelError::Drained)));

            let put = rx.recv_timeout(WAKE).expect("blocked put should finish");
            assert!(put.is_ok());
            producer.join().unwrap();
        }
    }

    #[test]
    fn close_releases_blocked_put() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(1, &signal);
        channel.put(frame("full")).unwrap();

        let (tx, rx) = mpsc::channel();
        let producer = {
            let channel = Arc::clone(&channel);
            thread::spawn(move || {
                tx.send(channel.put(frame("blocked"))).unwrap();
            })
        };

        assert!(rx.recv_timeout(BLOCKED).is_err());
        channel.close();
        let result = rx.recv_timeout(WAKE).expect("put should return on close");
        assert!(matches!(result, Err(ChannelError::Closed(_))));
        producer.join().unwrap();

        assert_eq!(payload(&channel.get().unwrap()), "full");
        assert!(matches!(channel.get(), Err(ChannelError::Drained)));
    }

    #[test]
    fn channel_created_after_cancel_drains_immediately() {
        let signal = CancellationSignal::new();
        signal.cancel();
        let channel = BoundedChannel::new(2, &signal);
        assert!(matches!(channel.get(), Err(ChannelError::Drained)));
    }

    #[test]
    fn many_frames_through_small_channel_keep_order() {
        let signal = CancellationSignal::new();
        let channel = BoundedChannel::new(3, &signal);

        let producer = {
            let channel = Arc::clone(&channel);
            let signal = signal.clone();
            thread::spawn(move || {
                for i in 0..500u32 {
                    channel.put(Frame::new(i.to_le_bytes().to_vec())).unwrap();
                }
                signal.cancel();
            })
        };

        let mut received = Vec::new();
        while let Ok(frame) = channel.get() {
            assert!(channel.size() <= 3);
            let bytes: [u8; 4] = frame.as_ref().try_into().unwrap();
            received.push(u32::from_le_bytes(bytes));
        }
        producer.join().unwrap();

        assert_eq!(received, (0..500).collect::<Vec<_>>());
    }
}
