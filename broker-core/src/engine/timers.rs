//! Per-intent timers.
//!
//! Each intent owns at most two live timers (bidding close, execution
//! deadline). Rather than reimplementing a timer wheel, each timer is a
//! spawned task sleeping on tokio's own (already-shared, already-a-wheel)
//! timer driver; cancellation is `JoinHandle::abort`, and every fire
//! callback re-checks the intent's current state before acting so a
//! timer that fires after the intent has already moved on is a no-op.

use std::future::Future;
use std::time::Duration as StdDuration;

use tokio::task::JoinHandle;

pub struct TimerHandle(JoinHandle<()>);

impl TimerHandle {
    pub fn spawn<F>(delay: StdDuration, on_fire: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            on_fire.await;
        });
        TimerHandle(handle)
    }

    pub fn cancel(self) {
        self.0.abort();
    }
}
