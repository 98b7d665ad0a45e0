// SPDX-License-Identifier: GPL-3.0-only

//! Dual-path upload pipeline
//!
//! ```text
//!                 ┌── DIRECT ──▶ ImageStore (multipart, real byte progress)
//! upload(blob) ───┤
//!                 └── PROXIED ─▶ TrustedProxy (base64, synthetic progress)
//!                                      │
//!                                      ▼
//!                      UploadJob: PENDING → IN_PROGRESS → SUCCEEDED | FAILED
//! ```
//!
//! The strategy is an input chosen by the caller; the pipeline never infers
//! it. There is no automatic retry: uploading the same photo again starts a
//! brand-new job.

pub mod deletion;
pub mod job;
pub mod progress;

pub use deletion::DeletionGate;
pub use job::{Asset, ConnectionReport, JobStatus, JobTracker, UploadJob, UploadResult};
pub use progress::{ProgressSchedule, SyntheticProgress};

use crate::backends::proxy::{CallableProxy, ProxyUploadRequest, TrustedProxy};
use crate::backends::store::{CloudinaryStore, ImageStore, TransferProgress};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::ImageBlob;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Where an upload goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UploadStrategy {
    /// Straight to the image store with an unsigned preset
    Direct,
    /// Through the trusted backend
    Proxied,
}

impl std::fmt::Display for UploadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStrategy::Direct => write!(f, "direct"),
            UploadStrategy::Proxied => write!(f, "proxied"),
        }
    }
}

impl std::str::FromStr for UploadStrategy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" => Ok(UploadStrategy::Direct),
            "proxied" | "proxy" => Ok(UploadStrategy::Proxied),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown upload strategy: {}",
                other
            ))),
        }
    }
}

/// Byte counts to a percentage; 100 is left for the success transition
fn transfer_percent(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (sent.min(total) * 100 / total).min(99) as u8
}

/// In-flight upload
///
/// Dropping the task does not cancel the upload; it keeps running to a
/// terminal state.
pub struct UploadTask {
    id: Uuid,
    job: watch::Receiver<UploadJob>,
    handle: JoinHandle<UploadJob>,
}

impl UploadTask {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state of the job
    pub fn job(&self) -> UploadJob {
        self.job.borrow().clone()
    }

    /// Receiver observing every state change of the job
    pub fn subscribe(&self) -> watch::Receiver<UploadJob> {
        self.job.clone()
    }

    /// Progress values in non-decreasing order, ending once the job settles
    pub fn progress_stream(&self) -> impl Stream<Item = u8> + Send + 'static {
        let mut job = self.job.clone();
        async_stream::stream! {
            let mut last = None;
            loop {
                let (progress, terminal) = {
                    let current = job.borrow_and_update();
                    (current.progress, current.is_terminal())
                };
                if last != Some(progress) {
                    last = Some(progress);
                    yield progress;
                }
                if terminal || job.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Wait for the job to settle
    pub async fn wait(self) -> UploadJob {
        match self.handle.await {
            Ok(job) => job,
            Err(e) => {
                error!(job = %self.id, error = %e, "Upload task aborted");
                let mut job = self.job.borrow().clone();
                job.fail(AppError::upload(format!("Upload task aborted: {}", e)));
                job
            }
        }
    }
}

/// Runs uploads with either strategy and reports their progress
#[derive(Clone)]
pub struct UploadPipeline {
    store: Option<Arc<dyn ImageStore>>,
    proxy: Arc<dyn TrustedProxy>,
    schedule: ProgressSchedule,
}

impl UploadPipeline {
    pub fn new(store: Option<Arc<dyn ImageStore>>, proxy: Arc<dyn TrustedProxy>) -> Self {
        Self {
            store,
            proxy,
            schedule: ProgressSchedule::default(),
        }
    }

    /// Build the HTTP store and proxy clients from configuration
    ///
    /// Without a cloud name only the proxied path is available.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let store: Option<Arc<dyn ImageStore>> = match CloudinaryStore::new(config) {
            Ok(store) => Some(Arc::new(store)),
            Err(AppError::Config(msg)) => {
                warn!(reason = %msg, "Direct uploads disabled");
                None
            }
            Err(e) => return Err(e),
        };
        let proxy: Arc<dyn TrustedProxy> = Arc::new(CallableProxy::new(config)?);
        Ok(Self::new(store, proxy))
    }

    pub fn with_schedule(mut self, schedule: ProgressSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Gate for deleting assets, always bound to the proxy
    pub fn deletion_gate(&self) -> DeletionGate {
        DeletionGate::new(Arc::clone(&self.proxy))
    }

    /// Start uploading `blob`
    ///
    /// Must be called within a tokio runtime. Each call creates a new job.
    pub fn upload(
        &self,
        blob: ImageBlob,
        folder: Option<String>,
        strategy: UploadStrategy,
    ) -> UploadTask {
        let job = UploadJob::new(strategy);
        let id = job.id;
        let tracker = JobTracker::new(job);
        let receiver = tracker.subscribe();

        info!(job = %id, %strategy, size = blob.len(), "Upload requested");

        let pipeline = self.clone();
        let handle = tokio::spawn(async move {
            tracker.start();
            let outcome = match strategy {
                UploadStrategy::Direct => pipeline.run_direct(&tracker, &blob, folder).await,
                UploadStrategy::Proxied => pipeline.run_proxied(&tracker, &blob, folder).await,
            };

            match outcome {
                Ok(result) => {
                    info!(job = %id, asset_id = %result.asset_id, url = %result.remote_url, "Upload succeeded");
                    tracker.succeed(result);
                }
                Err(e) => {
                    error!(job = %id, error = %e, "Upload failed");
                    tracker.fail(e);
                }
            }
            tracker.snapshot()
        });

        UploadTask {
            id,
            job: receiver,
            handle,
        }
    }

    async fn run_direct(
        &self,
        tracker: &JobTracker,
        blob: &ImageBlob,
        folder: Option<String>,
    ) -> AppResult<UploadResult> {
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| AppError::Config("Image store is not configured".to_string()))?;

        // Without byte counts the job only ever shows 0 and then 100
        let progress: TransferProgress = if store.reports_transfer_progress() {
            let tracker = tracker.clone();
            Arc::new(move |sent, total| {
                tracker.advance(transfer_percent(sent, total));
            })
        } else {
            Arc::new(|_, _| {})
        };

        store.upload(blob, folder.as_deref(), progress).await
    }

    async fn run_proxied(
        &self,
        tracker: &JobTracker,
        blob: &ImageBlob,
        folder: Option<String>,
    ) -> AppResult<UploadResult> {
        let ticker = SyntheticProgress::start(tracker.clone(), self.schedule);

        let encoded = {
            let blob = blob.clone();
            tokio::task::spawn_blocking(move || blob.to_data_uri()).await
        };
        let base64_image = match encoded {
            Ok(data_uri) => data_uri,
            Err(e) => {
                ticker.stop().await;
                return Err(AppError::Encoding(format!("Base64 encoding failed: {}", e)));
            }
        };

        let response = self
            .proxy
            .upload_image(ProxyUploadRequest {
                base64_image,
                folder: folder.filter(|f| !f.is_empty()),
            })
            .await;
        ticker.stop().await;

        response
            .map_err(|e| AppError::UploadFailed {
                status: e.status,
                message: e.message,
            })?
            .into_result()
    }

    /// Diagnostic reachability check; never touches an upload job
    pub async fn test_connection(&self, strategy: UploadStrategy) -> ConnectionReport {
        match strategy {
            UploadStrategy::Direct => match &self.store {
                Some(store) => store.probe().await,
                None => ConnectionReport {
                    reachable: false,
                    detail: "Image store is not configured (CLOUDINARY_CLOUD_NAME)".to_string(),
                },
            },
            UploadStrategy::Proxied => match self.proxy.test_connection().await {
                Ok(response) => response.into(),
                Err(e) => ConnectionReport {
                    reachable: false,
                    detail: e.to_string(),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_percent() {
        assert_eq!(transfer_percent(0, 0), 0);
        assert_eq!(transfer_percent(50, 200), 25);
        assert_eq!(transfer_percent(200, 200), 99);
        assert_eq!(transfer_percent(300, 200), 99);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("Direct".parse::<UploadStrategy>().unwrap(), UploadStrategy::Direct);
        assert_eq!("proxy".parse::<UploadStrategy>().unwrap(), UploadStrategy::Proxied);
        assert!(matches!(
            "ftp".parse::<UploadStrategy>(),
            Err(AppError::InvalidArgument(_))
        ));
        assert_eq!(UploadStrategy::Proxied.to_string(), "proxied");
    }
}
