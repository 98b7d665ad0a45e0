// SPDX-License-Identifier: GPL-3.0-only

//! Media device abstraction
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  SessionController  │
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    CaptureSession   │  ← Owns the single live DeviceHandle
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │  MediaDevice Trait  │  ← acquire / attach / capture / release
//! └──────────┬──────────┘
//!            │
//!       ┌────┴─────────┐
//!       ▼              ▼
//!   Browser/OS     FileCaptureDevice
//!   camera         (native file fallback)
//! ```
//!
//! The raw [`DeviceHandle`] never leaves the capture session; presentation
//! code only sees session status and the [`PreviewSink`].

pub mod file_source;
pub mod session;
pub mod types;

pub use file_source::FileCaptureDevice;
pub use session::CaptureSession;
pub use types::*;

use crate::errors::DeviceResult;
use async_trait::async_trait;

/// Contract over a platform camera stack
#[async_trait]
pub trait MediaDevice: Send + Sync {
    /// Human readable adapter name for logs
    fn name(&self) -> &str;

    /// Open a video stream matching `constraints`
    ///
    /// # Returns
    /// * `Ok(DeviceHandle)` - Stream opened; the caller now owns it
    /// * `Err(DeviceError::PermissionDenied)` - The user refused access
    /// * `Err(DeviceError::Unavailable)` - No camera, or it is busy
    async fn acquire(&self, constraints: &VideoConstraints) -> DeviceResult<DeviceHandle>;

    /// Start rendering the stream into `sink`
    fn attach_preview(&self, handle: &DeviceHandle, sink: &PreviewSink) -> DeviceResult<()>;

    /// Stop every track of the stream
    ///
    /// Must be idempotent: releasing a handle twice is a no-op, never an error.
    fn release(&self, handle: &DeviceHandle);

    /// Grab the currently rendered frame
    ///
    /// Fails with `DeviceError::NotReady` while the preview has no frame.
    async fn capture_still(&self, handle: &DeviceHandle) -> DeviceResult<RawImage>;
}
