//! Cancellable one-shot reversion timer.

use std::time::Instant;

use tokio::task::JoinHandle;

/// Current instant on the tokio clock, as a `std` instant.
///
/// Follows the paused clock in tests, so the pure core sees the same time
/// the timers sleep on.
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// A spawned sleep that runs `on_fire` at `deadline` unless cancelled.
/// Dropping the timer cancels it.
#[derive(Debug)]
pub struct ReversionTimer {
    deadline: Instant,
    generation: u64,
    handle: JoinHandle<()>,
}

impl ReversionTimer {
    pub fn schedule<F>(deadline: Instant, generation: u64, on_fire: F) -> Self
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
            on_fire(generation);
        });
        Self {
            deadline,
            generation,
            handle,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl Drop for ReversionTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
