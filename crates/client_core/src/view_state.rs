//! Per-controller state container read by presentation code.

use tokio::sync::watch;

/// Holds one controller's view data. Only the owning controller writes;
/// presentation code reads snapshots or subscribes to changes.
#[derive(Debug)]
pub struct ViewState<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> ViewState<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn snapshot(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Applies `change` under the channel lock and notifies subscribers.
    pub(crate) fn modify(&self, change: impl FnOnce(&mut T)) {
        self.tx.send_modify(change);
    }

    /// Like [`ViewState::modify`], but subscribers are only notified when
    /// `change` reports that it altered the value.
    pub(crate) fn modify_if(&self, change: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(change)
    }
}

/// Monotonic request counter. A response is applied only when it carries
/// the latest token issued by its controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// Whether a completed request changed controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Applied,
    /// A newer request was issued before this one resolved; its response
    /// was dropped.
    Superseded,
}
