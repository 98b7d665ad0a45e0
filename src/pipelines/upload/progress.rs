// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic progress for transports without byte counts
//!
//! The proxy call is a single request/response, so progress is simulated:
//! a small value right away, then a fixed increment per tick up to a cap.
//! Completion is never simulated; it is reported when the call succeeds.
//!
//! The ticker is owned by a [`SyntheticProgress`] value. Stopping consumes
//! it and dropping aborts it, so it is cancelled exactly once on whichever
//! path the job settles.

use super::job::JobTracker;
use crate::constants::progress;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::trace;

/// Shape of the simulated progress curve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSchedule {
    pub start: u8,
    pub step: u8,
    pub cap: u8,
    pub interval: Duration,
}

impl Default for ProgressSchedule {
    fn default() -> Self {
        Self {
            start: progress::SYNTHETIC_START,
            step: progress::SYNTHETIC_STEP,
            cap: progress::SYNTHETIC_CAP,
            interval: progress::SYNTHETIC_INTERVAL,
        }
    }
}

impl ProgressSchedule {
    /// Value after `ticks` intervals
    pub fn value_after(&self, ticks: u32) -> u8 {
        let value = self.start as u32 + self.step as u32 * ticks;
        value.min(self.cap as u32) as u8
    }
}

/// Running progress simulation for one job
pub struct SyntheticProgress {
    task: Option<JoinHandle<()>>,
}

impl SyntheticProgress {
    /// Report the start value now and begin ticking
    pub fn start(tracker: JobTracker, schedule: ProgressSchedule) -> Self {
        tracker.advance(schedule.start);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + schedule.interval, schedule.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            let mut ticks = 0u32;
            loop {
                ticker.tick().await;
                if tracker.is_terminal() {
                    break;
                }

                ticks += 1;
                let value = schedule.value_after(ticks);
                tracker.advance(value);
                trace!(value, "Synthetic progress tick");

                if value >= schedule.cap {
                    break;
                }
            }
        });

        Self { task: Some(task) }
    }

    /// Cancel the ticker and wait until it can no longer run
    pub async fn stop(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // Cancelled, or already finished at the cap
            let _ = task.await;
        }
    }
}

impl Drop for SyntheticProgress {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
