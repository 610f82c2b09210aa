//! Readiness signalling.
//!
//! A [`ReadySignal`] goes from pending to ready exactly once. The first
//! resolution wins; later calls to [`ReadySignal::resolve`] are ignored and
//! report `false`. Waiters never observe an error state: they either get the
//! value or, if the signal is dropped while still pending, `None`.

use tokio::sync::watch;

/// Single-resolution signal owned by the adapter.
#[derive(Debug)]
pub struct ReadySignal<T> {
    tx: watch::Sender<Option<T>>,
}

/// Cloneable handle that waits for a [`ReadySignal`].
#[derive(Clone, Debug)]
pub struct ReadyWaiter<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> ReadySignal<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Resolve with `value`. Returns `false` (and drops `value`) when already resolved.
    pub fn resolve(&self, value: T) -> bool {
        let mut value = Some(value);
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = value.take();
            true
        })
    }

    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// The resolved value, if any.
    pub fn get(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub fn waiter(&self) -> ReadyWaiter<T> {
        ReadyWaiter {
            rx: self.tx.subscribe(),
        }
    }
}

impl<T: Clone> Default for ReadySignal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ReadyWaiter<T> {
    /// Wait until the signal resolves. No timeout.
    ///
    /// Returns `None` only if the signal was dropped before resolving.
    pub async fn wait(&mut self) -> Option<T> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(value) => value.as_ref().cloned(),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_resolution_wins() {
        let signal = ReadySignal::new();
        assert!(!signal.is_ready());
        assert!(signal.resolve("first"));
        assert!(!signal.resolve("second"));
        assert_eq!(signal.get(), Some("first"));
    }

    #[tokio::test]
    async fn waiter_wakes_on_resolve() {
        let signal = ReadySignal::new();
        let mut waiter = signal.waiter();
        let task = tokio::spawn(async move { waiter.wait().await });
        tokio::task::yield_now().await;
        signal.resolve(7u32);
        assert_eq!(task.await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn late_waiter_sees_value_immediately() {
        let signal = ReadySignal::new();
        signal.resolve(1u8);
        signal.resolve(2u8);
        assert_eq!(signal.waiter().wait().await, Some(1));
    }

    #[tokio::test]
    async fn dropped_signal_releases_waiters() {
        let signal = ReadySignal::<u8>::new();
        let mut waiter = signal.waiter();
        drop(signal);
        assert_eq!(waiter.wait().await, None);
    }
}
