// SPDX-License-Identifier: GPL-3.0-only

//! Session controller
//!
//! Composes the capture session, the upload pipeline and the deletion gate
//! into the state machine presentation code drives. Every outcome, success or
//! failure, lands in the published [`ControllerSnapshot`].

use super::state::{ControllerSnapshot, ControllerState};
use crate::backends::camera::CaptureSession;
use crate::config::FeatureFlags;
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::{ImageBlob, OptimizeOptions, Photo, optimize_image};
use crate::pipelines::upload::{
    Asset, DeletionGate, JobStatus, UploadJob, UploadPipeline, UploadStrategy,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub struct SessionController {
    session: CaptureSession,
    pipeline: UploadPipeline,
    gate: DeletionGate,
    flags: FeatureFlags,
    optimize: OptimizeOptions,
    snapshot: watch::Sender<ControllerSnapshot>,
}

impl SessionController {
    pub fn new(session: CaptureSession, pipeline: UploadPipeline, flags: FeatureFlags) -> Self {
        let gate = pipeline.deletion_gate();
        let snapshot = ControllerSnapshot {
            facing: session.facing(),
            session: session.status(),
            ..Default::default()
        };
        let (snapshot, _) = watch::channel(snapshot);

        Self {
            session,
            pipeline,
            gate,
            flags,
            optimize: OptimizeOptions::default(),
            snapshot,
        }
    }

    pub fn with_optimize_options(mut self, options: OptimizeOptions) -> Self {
        self.optimize = options;
        self
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> ControllerState {
        self.snapshot.borrow().state
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshot.subscribe()
    }

    /// Start the camera: IDLE → DEVICE_ACTIVE
    pub async fn initialize(&self) -> AppResult<()> {
        let result = self.session.initialize().await;
        self.settle_device(&result);
        result
    }

    /// Switch cameras as one operation
    pub async fn toggle_facing(&self) -> AppResult<()> {
        let result = self.session.toggle_facing().await;
        self.settle_device(&result);
        result
    }

    /// Capture a still from the live preview: DEVICE_ACTIVE → PHOTO_READY
    pub async fn capture(&self) -> AppResult<Photo> {
        if self.state() != ControllerState::DeviceActive {
            return self.reject(AppError::NotReady(format!(
                "Capture needs a live camera without a pending photo (state {})",
                self.state()
            )));
        }

        match self.session.capture_photo().await {
            Ok(photo) => {
                info!(width = photo.width, height = photo.height, "Photo ready");
                let held = photo.clone();
                self.snapshot.send_modify(|s| {
                    s.discard_photo();
                    s.photo = Some(held);
                    s.state = ControllerState::PhotoReady;
                    s.error = None;
                });
                Ok(photo)
            }
            Err(e) => self.reject(e),
        }
    }

    /// Upload with the strategy selected by the feature flags
    pub async fn upload_with_flags(&self, folder: Option<String>) -> AppResult<Asset> {
        self.upload(folder, self.flags.upload_strategy()).await
    }

    /// Upload the held photo: PHOTO_READY → UPLOADING → UPLOADED | UPLOAD_FAILED
    ///
    /// Every call creates a new job; a failed job is replaced, never retried.
    pub async fn upload(&self, folder: Option<String>, strategy: UploadStrategy) -> AppResult<Asset> {
        // Claim the upload slot before any work so concurrent calls cannot both start
        let mut photo = None;
        let mut current = self.state();
        self.snapshot.send_if_modified(|s| {
            current = s.state;
            if !s.state.can_upload() || s.photo.is_none() {
                return false;
            }
            photo = s.photo.clone();
            s.state = ControllerState::Uploading;
            s.job = None;
            s.asset = None;
            s.error = None;
            true
        });

        let photo = match photo {
            Some(photo) => photo,
            None if current == ControllerState::Uploading => {
                return self.reject(AppError::InvalidArgument(
                    "An upload is already in progress".to_string(),
                ));
            }
            None => return self.reject(AppError::NotReady("No photo to upload".to_string())),
        };

        let blob = self.prepare_blob(&photo.blob).await;
        let task = self.pipeline.upload(blob, folder, strategy);

        let initial = task.job();
        let attached = self.snapshot.send_if_modified(|s| {
            if s.state != ControllerState::Uploading || s.job.is_some() {
                return false;
            }
            s.job = Some(initial);
            true
        });
        if !attached {
            // Photo discarded while preparing; the job runs to completion unobserved
            warn!(job = %task.id(), "Upload detached from a discarded photo");
        }

        let mut updates = task.subscribe();
        loop {
            let job = updates.borrow_and_update().clone();
            let terminal = job.is_terminal();
            self.publish_job(job);
            if terminal || updates.changed().await.is_err() {
                break;
            }
        }

        let job = task.wait().await;
        self.publish_job(job.clone());

        match job.status {
            JobStatus::Succeeded => job
                .asset()
                .ok_or_else(|| AppError::upload("Upload finished without an asset")),
            _ => Err(job
                .error
                .unwrap_or_else(|| AppError::upload("Upload did not complete"))),
        }
    }

    /// Delete the asset of the last successful upload
    ///
    /// On success the photo is kept and can be uploaded again. On failure
    /// the asset stays known so deletion can be retried.
    pub async fn delete_uploaded(&self) -> AppResult<()> {
        let asset_id = self
            .snapshot
            .borrow()
            .asset
            .as_ref()
            .map(|asset| asset.asset_id.clone())
            .unwrap_or_default();

        match self.gate.delete_asset(&asset_id).await {
            Ok(()) => {
                self.snapshot.send_modify(|s| {
                    if s.asset.as_ref().is_some_and(|a| a.asset_id == asset_id) {
                        s.asset = None;
                        s.job = None;
                        s.state = ControllerState::PhotoReady;
                    }
                    s.error = None;
                });
                Ok(())
            }
            Err(e) => self.reject(e),
        }
    }

    /// Discard the photo and any job, keeping the camera: → DEVICE_ACTIVE
    ///
    /// Falls back to IDLE when the device is no longer live.
    pub fn retake(&self) {
        let status = self.session.status();
        self.snapshot.send_modify(|s| {
            s.discard_photo();
            s.error = None;
            s.session = status.clone();
            s.state = if status.is_active() {
                ControllerState::DeviceActive
            } else {
                ControllerState::Idle
            };
        });
        debug!(state = %self.state(), "Photo discarded");
    }

    /// Discard everything and release the camera: → IDLE
    pub async fn reset(&self) {
        self.session.release().await;
        let status = self.session.status();
        self.snapshot.send_modify(|s| {
            s.discard_photo();
            s.error = None;
            s.session = status;
            s.state = ControllerState::Idle;
        });
        info!("Session reset");
    }

    /// Optimize according to the flags; the original blob is used if that fails
    async fn prepare_blob(&self, blob: &ImageBlob) -> ImageBlob {
        if !self.flags.image_optimization {
            return blob.clone();
        }

        let source = blob.clone();
        let options = self.optimize;
        match tokio::task::spawn_blocking(move || optimize_image(&source, options)).await {
            Ok(Ok(optimized)) => {
                debug!(before = blob.len(), after = optimized.len(), "Image optimized");
                optimized
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Image optimization failed, uploading original");
                blob.clone()
            }
            Err(e) => {
                warn!(error = %e, "Image optimization task failed, uploading original");
                blob.clone()
            }
        }
    }

    /// Mirror a job update, ignoring jobs that were discarded meanwhile
    fn publish_job(&self, job: UploadJob) {
        self.snapshot.send_if_modified(|s| {
            if s.job_id() != Some(job.id) || s.job.as_ref() == Some(&job) {
                return false;
            }
            match job.status {
                JobStatus::Succeeded => {
                    s.state = ControllerState::Uploaded;
                    s.asset = job.asset();
                }
                JobStatus::Failed => {
                    s.state = ControllerState::UploadFailed;
                    s.error = job.error.clone();
                }
                JobStatus::Pending | JobStatus::InProgress => {}
            }
            s.job = Some(job);
            true
        });
    }

    /// Fold the outcome of a device operation into the snapshot
    fn settle_device(&self, result: &AppResult<()>) {
        let status = self.session.status();
        let facing = self.session.facing();
        self.snapshot.send_modify(|s| {
            s.session = status.clone();
            s.facing = facing;
            match result {
                Ok(()) => {
                    if s.state == ControllerState::Idle && status.is_active() {
                        s.state = ControllerState::DeviceActive;
                    }
                    s.error = None;
                }
                Err(e) => {
                    if s.state == ControllerState::DeviceActive {
                        s.state = ControllerState::Idle;
                    }
                    s.error = Some(e.clone());
                }
            }
        });
    }

    fn reject<T>(&self, error: AppError) -> AppResult<T> {
        warn!(error = %error, state = %self.state(), "Operation failed");
        let surfaced = error.clone();
        self.snapshot.send_modify(|s| s.error = Some(surfaced));
        Err(error)
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("state", &self.state())
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
