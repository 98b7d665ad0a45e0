// SPDX-License-Identifier: GPL-3.0-only

//! Upload job state
//!
//! One [`UploadJob`] exists per upload attempt. Its transitions only move
//! forward (PENDING → IN_PROGRESS → SUCCEEDED | FAILED) and its progress
//! never decreases; a finished job cannot be restarted, only superseded by a
//! new one.

use super::UploadStrategy;
use crate::constants::progress::COMPLETE;
use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

/// Stored image as returned by the store or the proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub remote_url: String,
    /// Opaque identifier needed for deletion
    pub asset_id: String,
    pub format: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl UploadResult {
    pub fn asset(&self) -> Asset {
        Asset {
            asset_id: self.asset_id.clone(),
            remote_url: self.remote_url.clone(),
        }
    }
}

/// Identifies a stored image for later deletion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    pub remote_url: String,
}

/// Outcome of a diagnostic reachability check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub reachable: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

/// A single upload attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub id: Uuid,
    pub strategy: UploadStrategy,
    pub status: JobStatus,
    /// 0-100, non-decreasing; 100 only once SUCCEEDED
    pub progress: u8,
    pub result: Option<UploadResult>,
    pub error: Option<AppError>,
}

impl UploadJob {
    pub fn new(strategy: UploadStrategy) -> Self {
        Self {
            id: Uuid::new_v4(),
            strategy,
            status: JobStatus::Pending,
            progress: 0,
            result: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Asset produced by a successful job
    pub fn asset(&self) -> Option<Asset> {
        self.result.as_ref().map(UploadResult::asset)
    }

    /// PENDING → IN_PROGRESS
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::InProgress;
        true
    }

    /// Raise progress while in flight
    ///
    /// Lower values are ignored, and values are held below 100 so completion
    /// is only ever reported by [`UploadJob::succeed`].
    pub fn advance(&mut self, percent: u8) -> bool {
        if self.status != JobStatus::InProgress {
            return false;
        }
        let percent = percent.min(COMPLETE - 1);
        if percent <= self.progress {
            return false;
        }
        self.progress = percent;
        true
    }

    pub fn succeed(&mut self, result: UploadResult) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Succeeded;
        self.progress = COMPLETE;
        self.result = Some(result);
        true
    }

    /// Terminal failure; progress stays where it was
    pub fn fail(&mut self, error: AppError) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = JobStatus::Failed;
        self.error = Some(error);
        true
    }
}

/// Shared writer side of a job, publishing every accepted change to listeners
#[derive(Debug, Clone)]
pub struct JobTracker {
    job: Arc<watch::Sender<UploadJob>>,
}

impl JobTracker {
    pub fn new(job: UploadJob) -> Self {
        let (sender, _) = watch::channel(job);
        Self {
            job: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadJob> {
        self.job.subscribe()
    }

    pub fn snapshot(&self) -> UploadJob {
        self.job.borrow().clone()
    }

    pub fn is_terminal(&self) -> bool {
        self.job.borrow().is_terminal()
    }

    pub fn start(&self) -> bool {
        self.job.send_if_modified(UploadJob::start)
    }

    pub fn advance(&self, percent: u8) -> bool {
        self.job.send_if_modified(|job| job.advance(percent))
    }

    pub fn succeed(&self, result: UploadResult) -> bool {
        self.job.send_if_modified(|job| job.succeed(result))
    }

    pub fn fail(&self, error: AppError) -> bool {
        self.job.send_if_modified(|job| job.fail(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> UploadResult {
        UploadResult {
            remote_url: "https://store/x.jpg".to_string(),
            asset_id: "x".to_string(),
            format: None,
            width: None,
            height: None,
        }
    }

    #[test]
    fn test_progress_is_monotonic_and_held_below_complete() {
        let mut job = UploadJob::new(UploadStrategy::Direct);
        assert!(!job.advance(10), "pending jobs do not report progress");

        assert!(job.start());
        assert!(job.advance(40));
        assert!(!job.advance(20));
        assert_eq!(job.progress, 40);

        assert!(job.advance(100));
        assert_eq!(job.progress, 99);
        assert_eq!(job.status, JobStatus::InProgress);
    }

    #[test]
    fn test_success_is_terminal() {
        let mut job = UploadJob::new(UploadStrategy::Proxied);
        job.start();
        assert!(job.succeed(result()));
        assert_eq!(job.progress, 100);
        assert_eq!(job.asset().unwrap().asset_id, "x");

        assert!(!job.advance(50));
        assert!(!job.fail(AppError::upload("late")));
        assert!(!job.start());
        assert_eq!(job.status, JobStatus::Succeeded);
    }

    #[test]
    fn test_failure_keeps_progress() {
        let mut job = UploadJob::new(UploadStrategy::Proxied);
        job.start();
        job.advance(35);
        assert!(job.fail(AppError::upload("boom")));
        assert_eq!(job.progress, 35);
        assert!(!job.succeed(result()));
        assert!(job.result.is_none());
    }

    #[test]
    fn test_tracker_publishes_changes() {
        let tracker = JobTracker::new(UploadJob::new(UploadStrategy::Direct));
        let mut listener = tracker.subscribe();
        listener.mark_unchanged();

        tracker.start();
        assert!(listener.has_changed().unwrap());
        listener.mark_unchanged();

        tracker.advance(0);
        assert!(!listener.has_changed().unwrap());

        tracker.advance(12);
        assert_eq!(listener.borrow_and_update().progress, 12);
    }
}
