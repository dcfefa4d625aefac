use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::info;

type Hook = Box<dyn FnOnce() + Send>;

/// One-way Running → Cancelling switch shared by every pipeline thread.
///
/// Cloning is cheap; all clones observe the same state. Cancelling more than
/// once has no further effect.
#[derive(Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    hooks: Mutex<Vec<Hook>>,
    changed: Condvar,
}

impl CancellationSignal {
    /// Create a signal in the Running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to Cancelling and wake every waiter.
    ///
    /// Returns `true` only for the call that performed the transition.
    pub fn cancel(&self) -> bool {
        let mut hooks = self
            .inner
            .hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return false;
        }
        let pending = std::mem::take(&mut *hooks);
        self.inner.changed.notify_all();
        drop(hooks);

        info!("cancellation requested");
        for hook in pending {
            hook();
        }
        true
    }

    /// True once [`cancel`](Self::cancel) has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Run `hook` when cancellation happens, or now if it already has.
    ///
    /// Hooks run on the cancelling thread, outside the signal's lock.
    pub fn on_cancel(&self, hook: impl FnOnce() + Send + 'static) {
        let mut hooks = self
            .inner
            .hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_cancelled() {
            drop(hooks);
            hook();
        } else {
            hooks.push(Box::new(hook));
        }
    }

    /// Block until cancelled.
    pub fn wait(&self) {
        let mut hooks = self
            .inner
            .hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        while !self.is_cancelled() {
            hooks = self
                .inner
                .changed
                .wait(hooks)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Block until cancelled or `timeout` elapses. Returns `true` if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut hooks = self
            .inner
            .hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            hooks = self
                .inner
                .changed
                .wait_timeout(hooks, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }
}

impl std::fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    use super::*;

    #[test]
    fn starts_running() {
        let signal = CancellationSignal::new();
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let signal = CancellationSignal::new();
        let clone = signal.clone();

        assert!(signal.cancel());
        assert!(!signal.cancel());
        assert!(!clone.cancel());
        assert!(clone.is_cancelled());
    }

    #[test]
    fn hooks_run_exactly_once() {
        let signal = CancellationSignal::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        signal.on_cancel(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        signal.cancel();
        signal.cancel();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hook_registered_after_cancel_runs_immediately() {
        let signal = CancellationSignal::new();
        signal.cancel();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        signal.on_cancel(move || flag.store(true, Ordering::SeqCst));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn wait_timeout_expires_while_running() {
        let signal = CancellationSignal::new();
        let start = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn wait_wakes_on_cancel_from_other_thread() {
        let signal = CancellationSignal::new();
        let remote = signal.clone();

        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        assert!(signal.wait_timeout(Duration::from_secs(5)));
        signal.wait();
        canceller.join().unwrap();
    }
}
