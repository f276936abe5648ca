//! Deferred view transitions
//!
//! A [`DeferredTimer`] runs one callback after a delay. Scheduling again while
//! a callback is pending aborts the pending one, so two hides never race for
//! the same element.

use std::time::Duration;

use tokio::{runtime::Handle, task::JoinHandle};
use tracing::debug;

/// Single-slot cancellable timer.
#[derive(Debug)]
pub struct DeferredTimer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl DeferredTimer {
    /// A timer firing `delay` after each schedule.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Delay between scheduling and firing.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `callback` after the delay, superseding any pending callback.
    ///
    /// Returns `false` without scheduling when called outside a tokio runtime.
    pub fn schedule<F>(&mut self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let Ok(handle) = Handle::try_current() else {
            debug!("no runtime available; deferred callback not scheduled");
            return false;
        };

        let delay = self.delay;

        self.pending = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        }));

        true
    }

    /// Abort the pending callback, if any.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }

    /// Whether a callback is scheduled and has not yet run.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.is_finished())
    }
}

impl Drop for DeferredTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use tokio::time::sleep;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let fired = Arc::new(AtomicUsize::new(0));
        let shared = Arc::clone(&fired);

        let make = move || -> Box<dyn FnOnce() + Send> {
            let fired = Arc::clone(&shared);
            Box::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };

        (fired, make)
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let (fired, make) = counter();
        let mut timer = DeferredTimer::new(Duration::from_secs(3));

        assert!(timer.schedule(make()));
        assert!(timer.is_pending());

        sleep(Duration::from_millis(2_900)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_cancels_the_pending_callback() {
        let (fired, make) = counter();
        let mut timer = DeferredTimer::new(Duration::from_secs(3));

        timer.schedule(make());
        sleep(Duration::from_secs(2)).await;
        timer.schedule(make());

        // The first callback would have fired at 3s.
        sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_abort() {
        let (fired, make) = counter();

        let mut timer = DeferredTimer::new(Duration::from_secs(1));
        timer.schedule(make());
        timer.cancel();

        assert!(!timer.is_pending());

        let mut dropped = DeferredTimer::new(Duration::from_secs(1));
        dropped.schedule(make());
        drop(dropped);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn schedule_without_runtime_is_refused() {
        let mut timer = DeferredTimer::new(Duration::from_secs(1));

        assert!(!timer.schedule(|| {}));
        assert!(!timer.is_pending());
    }
}
