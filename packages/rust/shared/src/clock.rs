//! Injectable time source.
//!
//! Cooldown checks and the idle wait go through [`Clock`] so tests can run
//! against a [`ManualClock`] instead of wall-clock time.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Time source used by the drain and intake pipelines.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Suspend for `duration`. Callers race this against a cancellation token.
    async fn sleep(&self, duration: Duration);

    /// Current time as milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall-clock implementation backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock for tests. `sleep` returns immediately and advances
/// the held instant by the requested duration.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(time),
        }
    }

    /// A clock fixed at 2024-01-01 12:00:00 UTC.
    pub fn fixed() -> Self {
        Self::new(DateTime::from_timestamp(1_704_110_400, 0).unwrap_or_default())
    }

    pub fn advance(&self, duration: Duration) {
        let Ok(delta) = chrono::Duration::from_std(duration) else {
            return;
        };
        let mut current = self.lock();
        if let Some(next) = current.checked_add_signed(delta) {
            *current = next;
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.lock() = time;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // A poisoned lock still holds a valid timestamp.
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_sleep_advances_time() {
        let clock = ManualClock::fixed();
        let before = clock.now_millis();
        clock.sleep(Duration::from_secs(30)).await;
        assert_eq!(clock.now_millis() - before, 30_000);
    }

    #[test]
    fn manual_clock_set() {
        let clock = ManualClock::fixed();
        let later = clock.now() + chrono::Duration::hours(2);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[tokio::test]
    async fn system_clock_zero_sleep_returns() {
        let clock = SystemClock;
        let before = clock.now();
        clock.sleep(Duration::ZERO).await;
        assert!(clock.now() >= before);
    }
}
