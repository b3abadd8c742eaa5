// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock & timer service: monotonic `now`, cancellable sleep, and a
//! tiny cron-style schedule used by [`crate::scheduled_publisher`] and
//! [`crate::maintenance`].

use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;

/// Wall-clock source. A trait (not a free function) so tests can substitute
/// [`crate::testing::FakeClock`] without pausing the whole Tokio runtime.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> SystemTime;

    /// Sleep for `dur`. Implementations should honor `tokio::time::pause`
    /// in tests (i.e. delegate to `tokio::time::sleep`).
    fn sleep(&self, dur: Duration) -> impl std::future::Future<Output = ()> + Send;
}

/// Real wall-clock / real sleep implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}

/// Sleep for `dur` unless `cancel` fires first. Used at every poll point
/// across the engine's loops (driver loop, round loop, pause loop).
pub async fn sleep_cancellable<C: Clock>(clock: &C, dur: Duration, cancel: &CancellationToken) {
    tokio::select! {
        _ = clock.sleep(dur) => {}
        _ = cancel.cancelled() => {}
    }
}

/// The subset of cron syntax the engine requires: `EVERY_MINUTE`, `EVERY_HOUR`,
/// "every N hours", "daily at HH:MM". Kept as a closed enum rather than a
/// string grammar so `next_fire` is total and unit-testable in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CronSchedule {
    EveryMinute,
    EveryHour,
    EveryNHours(u32),
    DailyAt { hour: u32, minute: u32 },
}

const SECS_PER_DAY: u64 = 86_400;

impl CronSchedule {
    /// Next fire time strictly after `now`.
    pub fn next_fire(&self, now: SystemTime) -> SystemTime {
        let epoch_secs = now.duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        match *self {
            CronSchedule::EveryMinute => {
                let next = (epoch_secs / 60 + 1) * 60;
                std::time::UNIX_EPOCH + Duration::from_secs(next)
            }
            CronSchedule::EveryHour => {
                let next = (epoch_secs / 3600 + 1) * 3600;
                std::time::UNIX_EPOCH + Duration::from_secs(next)
            }
            CronSchedule::EveryNHours(n) => {
                let step = u64::from(n.max(1)) * 3600;
                let next = (epoch_secs / step + 1) * step;
                std::time::UNIX_EPOCH + Duration::from_secs(next)
            }
            CronSchedule::DailyAt { hour, minute } => {
                let day_start = (epoch_secs / SECS_PER_DAY) * SECS_PER_DAY;
                let target_today = day_start + u64::from(hour) * 3600 + u64::from(minute) * 60;
                let target = if target_today > epoch_secs { target_today } else { target_today + SECS_PER_DAY };
                std::time::UNIX_EPOCH + Duration::from_secs(target)
            }
        }
    }

    /// Duration from `now` until the next fire, floored at zero.
    pub fn duration_until_next(&self, now: SystemTime) -> Duration {
        self.next_fire(now).duration_since(now).unwrap_or(Duration::ZERO)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
