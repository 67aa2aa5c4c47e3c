use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Holds at most one delayed write for a playback session.
///
/// Scheduling aborts whatever was pending before; dropping the slot aborts
/// the pending task without running it.
#[derive(Debug, Default)]
pub(crate) struct PersistSlot {
    pending: Option<JoinHandle<()>>,
}

impl PersistSlot {
    /// Runs `write` after `delay`, replacing any task already in the slot.
    pub(crate) async fn schedule<F>(&mut self, delay: Duration, write: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel().await;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            write.await;
        }));
    }

    /// Aborts the pending task and waits for it to stop. Returns `true` if it
    /// had not yet finished.
    ///
    /// A write already handed to the store may still land; once this returns
    /// it has landed, so any write issued afterwards wins.
    pub(crate) async fn cancel(&mut self) -> bool {
        let Some(handle) = self.pending.take() else {
            return false;
        };
        let was_pending = !handle.is_finished();
        handle.abort();
        // The JoinError is the abort itself, or a panic inside the write.
        let _ = handle.await;
        was_pending
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for PersistSlot {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_the_pending_task() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut slot = PersistSlot::default();

        for _ in 0..5 {
            slot.schedule(Duration::from_secs(10), counting(&fired)).await;
            tokio::time::advance(Duration::from_secs(2)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(slot.is_pending());

        tokio::time::advance(Duration::from_secs(10)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!slot.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_write() {
        let fired = Arc::new(AtomicUsize::new(0));
        let mut slot = PersistSlot::default();

        slot.schedule(Duration::from_secs(10), counting(&fired)).await;
        assert!(slot.cancel().await);
        assert!(!slot.cancel().await);

        tokio::time::advance(Duration::from_secs(30)).await;
        tokio::task::yield_now().await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancel_waits_for_a_write_already_running() {
        let landed = Arc::new(AtomicUsize::new(0));
        let mut slot = PersistSlot::default();

        let flag = Arc::clone(&landed);
        slot.schedule(Duration::ZERO, async move {
            // A store call that cannot be interrupted once started.
            std::thread::sleep(Duration::from_millis(100));
            flag.fetch_add(1, Ordering::SeqCst);
        })
        .await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(slot.cancel().await);
        assert_eq!(landed.load(Ordering::SeqCst), 1);
        assert!(!slot.is_pending());
    }
}
