// SPDX-License-Identifier: MPL-2.0

//! Camera Upload - capture session and photo upload orchestration
//!
//! This library drives a camera through capture and into remote image
//! storage, either straight to the image store or through a trusted proxy,
//! and deletes stored images again through that proxy.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Session controller composing capture, upload and deletion
//! - [`backends`]: Media device contract, image store and proxy clients
//! - [`pipelines`]: Photo encoding and the dual-path upload pipeline
//! - [`config`]: Account identifiers and feature flags
//! - [`errors`]: Error taxonomy shared by every component
//!
//! # Example
//!
//! ```ignore
//! let config = Config::from_env();
//! let device = Arc::new(FileCaptureDevice::new("still.jpg"));
//! let session = CaptureSession::new(device, DeviceClass::Desktop, DeviceFacing::Back);
//! let controller = SessionController::new(session, UploadPipeline::from_config(&config)?, config.flags);
//!
//! controller.initialize().await?;
//! controller.capture().await?;
//! let asset = controller.upload_with_flags(Some("uploads".into())).await?;
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod pipelines;

// Re-export commonly used types
pub use app::{ControllerSnapshot, ControllerState, SessionController};
pub use backends::camera::{
    CaptureSession, DeviceClass, DeviceFacing, FileCaptureDevice, MediaDevice, SessionStatus,
    VideoConstraints,
};
pub use config::{Config, FeatureFlags};
pub use errors::{AppError, AppResult};
pub use pipelines::photo::{ImageBlob, Photo};
pub use pipelines::upload::{Asset, UploadJob, UploadPipeline, UploadStrategy};
