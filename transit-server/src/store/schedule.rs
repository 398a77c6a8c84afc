//! Daily refresh trigger.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};
use tokio::task::JoinHandle;
use tracing::info;

use crate::browser::Browser;

use super::LineStore;

/// Once-a-day refresh at a fixed local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSchedule {
    /// Local time of day the refresh runs.
    pub at: NaiveTime,
}

impl RefreshSchedule {
    pub fn daily_at(at: NaiveTime) -> Self {
        Self { at }
    }

    /// The first scheduled run strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            today + chrono::Duration::days(1)
        }
    }

    /// How long to sleep from `now` until the next run.
    pub fn delay_after(&self, now: NaiveDateTime) -> Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self::daily_at(NaiveTime::from_hms_opt(3, 0, 0).unwrap_or(NaiveTime::MIN))
    }
}

/// Refresh `store` now, then once a day per `schedule`, forever.
///
/// A failed refresh never stops the loop.
pub fn spawn_refresh_loop<B: Browser>(
    store: Arc<LineStore<B>>,
    schedule: RefreshSchedule,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            // Errors are already logged and recorded in the store's status
            let _ = store.refresh().await;

            let now = Local::now().naive_local();
            let next = schedule.next_after(now);
            info!(next = %next, "Next data refresh scheduled");
            tokio::time::sleep(schedule.delay_after(now)).await;
        }
    })
}
