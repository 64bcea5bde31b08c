//! Process-wide limiter for outbound metadata calls.

use std::time::Duration;
use tokio::sync::{Mutex, Semaphore, SemaphorePermit};
use tokio::time::Instant;

/// Bounded concurrency plus minimum spacing between call starts.
///
/// The spacing is a token bucket of depth one: the caller that holds the
/// `last_start` mutex sleeps until the interval since the previous start has
/// elapsed, records its own start and releases the mutex. Concurrency is
/// bounded separately by the semaphore, which is held for the whole call.
#[derive(Debug)]
pub struct Throttle {
    slots: Semaphore,
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl Throttle {
    #[must_use]
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            slots: Semaphore::new(max_concurrent.max(1)),
            min_interval,
            last_start: Mutex::new(None),
        }
    }

    /// Wait for a free slot and for the start interval, then return the slot.
    ///
    /// Returns `None` only if the semaphore was closed, which never happens
    /// while the throttle is alive.
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        let permit = self.slots.acquire().await.ok()?;

        let mut last = self.last_start.lock().await;
        if let Some(previous) = *last {
            tokio::time::sleep_until(previous + self.min_interval).await;
        }
        *last = Some(Instant::now());

        Some(permit)
    }

    #[must_use]
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }
}
