//! Trailing-edge debouncing on the Tokio runtime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs only the last of a burst of calls, `delay` after the burst ends.
///
/// Each call cancels the pending one and schedules anew. Dropping the
/// debouncer cancels whatever is still pending. Calls must be made from
/// within a Tokio runtime.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn call<Fut>(&mut self, task: Fut)
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Drop the pending call, if any. Returns whether one was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Wrap `f` so that bursts of calls collapse into one trailing call with the
/// last argument.
pub fn debounce<A, F>(delay: Duration, f: F) -> impl FnMut(A)
where
    A: Send + 'static,
    F: Fn(A) + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let mut debouncer = Debouncer::new(delay);
    move |arg| {
        let f = Arc::clone(&f);
        debouncer.call(async move { (*f)(arg) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::time::sleep;

    const DELAY: Duration = Duration::from_millis(300);

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_one_trailing_run() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new(DELAY);

        for i in 0..5 {
            let hits = Arc::clone(&hits);
            debouncer.call(async move { hits.lock().push(i) });
            sleep(Duration::from_millis(100)).await;
        }
        assert!(debouncer.is_pending());
        assert!(hits.lock().is_empty());

        sleep(DELAY).await;
        assert_eq!(*hits.lock(), vec![4]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_calls_each_run() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new(DELAY);

        for i in 0..2 {
            let hits = Arc::clone(&hits);
            debouncer.call(async move { hits.lock().push(i) });
            sleep(DELAY * 2).await;
        }
        assert_eq!(*hits.lock(), vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_prevent_the_run() {
        let hits = Arc::new(Mutex::new(0));

        let mut debouncer = Debouncer::new(DELAY);
        let counter = Arc::clone(&hits);
        debouncer.call(async move { *counter.lock() += 1 });
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        let counter = Arc::clone(&hits);
        debouncer.call(async move { *counter.lock() += 1 });
        drop(debouncer);

        sleep(DELAY * 2).await;
        assert_eq!(*hits.lock(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wrapper_forwards_the_last_argument() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut search = debounce(DELAY, move |text: String| sink.lock().push(text));

        for text in ["r", "re", "rep", "report"] {
            search(text.to_string());
            sleep(Duration::from_millis(50)).await;
        }
        sleep(DELAY).await;
        assert_eq!(*seen.lock(), vec!["report".to_string()]);
    }
}
