//! Abort signals.
//!
//! A [Signal] fires at most once and stays fired. Signals can be composed:
//! [Signal::child] fires when its parent fires, [Signal::any] fires when any of
//! its sources fires, and [TimeoutSignal] fires after a duration unless it is
//! dropped first.

use std::{
    fmt::{self, Debug, Formatter},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
    time::Duration,
};

use tokio::{sync::Notify, task::JoinHandle};

#[derive(Default)]
struct SignalInner {
    aborted: AtomicBool,
    notify: Notify,
    /// Signals that must fire when this one fires.
    dependents: Mutex<Vec<Weak<SignalInner>>>,
}

impl SignalInner {
    fn abort(&self) {
        if self.aborted.swap(true, Ordering::SeqCst) {
            return;
        }

        self.notify.notify_waiters();

        let dependents = std::mem::take(&mut *self.dependents.lock().expect("mutex"));

        for dependent in dependents {
            if let Some(dependent) = dependent.upgrade() {
                dependent.abort();
            }
        }
    }

    /// Make `dependent` fire when this signal fires, or right away if it already did.
    fn register(&self, dependent: &Arc<SignalInner>) {
        {
            let mut dependents = self.dependents.lock().expect("mutex");

            if !self.aborted.load(Ordering::SeqCst) {
                dependents.retain(|d| d.strong_count() > 0);
                dependents.push(Arc::downgrade(dependent));
                return;
            }
        }

        dependent.abort();
    }
}

#[derive(Clone, Default)]
/// An idempotent, single-fire abort signal.
pub struct Signal(Arc<SignalInner>);

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that fires when `self` fires, but can also be fired on its own
    /// without affecting `self`.
    pub fn child(&self) -> Signal {
        let child = Signal::new();
        self.0.register(&child.0);

        child
    }

    /// A signal that fires as soon as any of the `sources` fires.
    pub fn any<'a, I>(sources: I) -> Signal
    where
        I: IntoIterator<Item = &'a Signal>,
    {
        let signal = Signal::new();

        for source in sources {
            source.0.register(&signal.0);
        }

        signal
    }

    // === Getters ===

    pub fn is_aborted(&self) -> bool {
        self.0.aborted.load(Ordering::SeqCst)
    }

    // === Public Methods ===

    /// Fire this signal and every signal derived from it. Calling it again is a no-op.
    pub fn abort(&self) {
        self.0.abort()
    }

    /// Resolves once the signal has fired.
    pub async fn aborted(&self) {
        loop {
            let notified = self.0.notify.notified();

            if self.is_aborted() {
                return;
            }

            notified.await;
        }
    }
}

impl Debug for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

/// A [Signal] that fires after a timeout.
///
/// Dropping it cancels the timer, the signal itself stays valid but will only
/// fire if it is aborted explicitly.
#[derive(Debug)]
pub struct TimeoutSignal {
    signal: Signal,
    timer: JoinHandle<()>,
}

impl TimeoutSignal {
    /// Must be called from within a tokio runtime.
    pub fn new(timeout: Duration) -> Self {
        let signal = Signal::new();
        let weak = Arc::downgrade(&signal.0);

        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            if let Some(inner) = weak.upgrade() {
                inner.abort();
            }
        });

        Self { signal, timer }
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Stop the timer without firing the signal.
    pub fn clear(&self) {
        self.timer.abort();
    }
}

impl Drop for TimeoutSignal {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn abort_is_idempotent() {
        let signal = Signal::new();
        assert!(!signal.is_aborted());

        signal.abort();
        signal.abort();

        assert!(signal.is_aborted());
    }

    #[test]
    fn child_follows_parent_only() {
        let parent = Signal::new();
        let child = parent.child();

        child.abort();
        assert!(!parent.is_aborted());

        let other = parent.child();
        parent.abort();
        assert!(other.is_aborted());

        // Children of an aborted signal start aborted.
        assert!(parent.child().is_aborted());
    }

    #[test]
    fn any_fires_on_first_source() {
        let a = Signal::new();
        let b = Signal::new();

        let any = Signal::any([&a, &b]);
        assert!(!any.is_aborted());

        b.abort();
        assert!(any.is_aborted());
        assert!(!a.is_aborted());
    }

    #[tokio::test]
    async fn aborted_resolves() {
        let signal = Signal::new();
        let clone = signal.clone();

        let waiter = tokio::spawn(async move { clone.aborted().await });

        tokio::task::yield_now().await;
        signal.abort();

        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_fires() {
        let timeout = TimeoutSignal::new(Duration::from_millis(100));
        let signal = timeout.signal().clone();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!signal.is_aborted());

        signal.aborted().await;
        assert!(signal.is_aborted());
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_timeout_never_fires() {
        let timeout = TimeoutSignal::new(Duration::from_millis(100));
        let signal = timeout.signal().clone();
        timeout.clear();

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!signal.is_aborted());
    }
}
