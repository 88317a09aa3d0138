use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A cancellable trailing-edge timer.
///
/// Each [`schedule`](Debouncer::schedule) aborts whatever was pending and
/// starts a fresh wait. The scheduled job is told its generation, and the
/// owner asks [`fire`](Debouncer::fire) before acting on it, so a job that
/// slipped out just before being cancelled is still ignored.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Restart the timer. `job` receives the new generation and runs once the
    /// delay passes without another call to `schedule` or `cancel`.
    pub fn schedule<F, Fut>(&mut self, job: F) -> u64
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;
        let work = job(generation);
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
        }));
        generation
    }

    /// Abort the pending timer, if any. Its generation becomes stale.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
            self.generation += 1;
        }
    }

    /// Claim a fired timer. True only for the generation currently pending.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use tokio::sync::mpsc;

    type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn sender_job(tx: &mpsc::UnboundedSender<u64>) -> impl FnOnce(u64) -> Job {
        let tx = tx.clone();
        move |generation| {
            Box::pin(async move {
                let _ = tx.send(generation);
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_quiet_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        let generation = debouncer.schedule(sender_job(&tx));
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.try_recv().unwrap(), generation);
        assert!(debouncer.fire(generation));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_restarts_the_wait() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));

        let first = debouncer.schedule(sender_job(&tx));
        tokio::time::sleep(Duration::from_millis(400)).await;
        let second = debouncer.schedule(sender_job(&tx));
        assert_ne!(first, second);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(rx.try_recv().unwrap(), second);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_drop_stop_the_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let generation = debouncer.schedule(sender_job(&tx));
        debouncer.cancel();
        assert!(!debouncer.fire(generation));

        let mut dropped = Debouncer::new(Duration::from_millis(100));
        dropped.schedule(sender_job(&tx));
        drop(dropped);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_is_refused() {
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        let old = debouncer.schedule(|_| async {});
        let new = debouncer.schedule(|_| async {});
        assert!(!debouncer.fire(old));
        assert!(debouncer.fire(new));
        assert!(!debouncer.fire(new));
    }
}
