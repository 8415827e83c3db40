//! Delivery of the root callback to the consumer's execution context.

use tokio::sync::mpsc;
use tracing::warn;

/// A unit of work to run on the consumer's side.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs consumer callbacks on whatever context the consumer requires.
///
/// Implementations must not block the calling scanner task.
pub trait Dispatcher: Send + Sync + 'static {
    /// Hand `job` over for execution.
    fn dispatch(&self, job: Job);
}

/// Runs the callback directly on the scanning task.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Forwards callbacks over a channel to a consumer-owned thread.
///
/// The consumer drains the paired receiver (e.g. from its UI loop) and runs
/// each job there; see [`drain_pending`].
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::UnboundedSender<Job>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiver the consumer must drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Job>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Dispatcher for ChannelDispatcher {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            warn!("Callback receiver dropped; root callback discarded");
        }
    }
}

/// Run every job currently queued on `rx` without waiting. Returns the number run.
pub fn drain_pending(rx: &mut mpsc::UnboundedReceiver<Job>) -> usize {
    let mut count = 0;
    while let Ok(job) = rx.try_recv() {
        job();
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_inline_runs_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        InlineDispatcher.dispatch(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channel_defers_until_drained() {
        let (dispatcher, mut rx) = ChannelDispatcher::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        dispatcher.dispatch(Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(drain_pending(&mut rx), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channel_with_dropped_receiver_does_not_panic() {
        let (dispatcher, rx) = ChannelDispatcher::new();
        drop(rx);
        dispatcher.dispatch(Box::new(|| {}));
    }
}
