// SPDX-License-Identifier: GPL-3.0-only

//! Capture session lifecycle
//!
//! The session owns the only live [`DeviceHandle`]. Every device operation
//! runs while holding the handle slot's async lock, so a `release()` issued
//! during a pending `initialize()` waits for it to settle instead of tearing
//! the stream down underneath a preview attach.
//!
//! ```text
//!  INACTIVE ──initialize──▶ INITIALIZING ──ok──▶ ACTIVE
//!     ▲                          │                 │
//!     │                          └──err──▶ ERROR   │
//!     └──────────────release (any state)───────────┘
//! ```

use super::MediaDevice;
use super::types::{
    DeviceClass, DeviceFacing, DeviceHandle, PreviewSink, RawImage, SessionStatus,
    VideoConstraints,
};
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::{Photo, PhotoEncoder};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

/// Observable session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub facing: DeviceFacing,
    pub last_error: Option<AppError>,
}

/// Resets a pending INITIALIZING status if the initializing future is dropped
///
/// Acquisition either completes and disarms the guard, or it is abandoned and
/// the session falls back to INACTIVE rather than staying INITIALIZING forever.
struct InitializingGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    armed: bool,
}

impl InitializingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InitializingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_if_modified(|s| {
                if s.status == SessionStatus::Initializing {
                    s.status = SessionStatus::Inactive;
                    true
                } else {
                    false
                }
            });
        }
    }
}

/// Camera session owning device lifecycle, facing mode and still capture
pub struct CaptureSession {
    device: Arc<dyn MediaDevice>,
    device_class: DeviceClass,
    encoder: PhotoEncoder,
    /// Exclusively owned handle slot; at most one live handle at a time
    slot: Mutex<Option<DeviceHandle>>,
    state: watch::Sender<SessionState>,
    preview: PreviewSink,
}

impl CaptureSession {
    /// Create an inactive session over `device`
    pub fn new(device: Arc<dyn MediaDevice>, device_class: DeviceClass, facing: DeviceFacing) -> Self {
        info!(adapter = device.name(), ?device_class, %facing, "Creating capture session");

        let (state, _) = watch::channel(SessionState {
            status: SessionStatus::Inactive,
            facing,
            last_error: None,
        });

        Self {
            device,
            device_class,
            encoder: PhotoEncoder::new(),
            slot: Mutex::new(None),
            state,
            preview: PreviewSink::new(),
        }
    }

    /// Replace the still encoder (quality settings)
    pub fn with_encoder(mut self, encoder: PhotoEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status.clone()
    }

    pub fn facing(&self) -> DeviceFacing {
        self.state.borrow().facing
    }

    pub fn last_error(&self) -> Option<AppError> {
        self.state.borrow().last_error.clone()
    }

    /// Constraints the next acquisition will request
    pub fn constraints(&self) -> VideoConstraints {
        VideoConstraints::for_device(self.device_class, self.facing())
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Sink the live stream renders into
    pub fn preview(&self) -> &PreviewSink {
        &self.preview
    }

    /// Whether a device handle is currently held
    ///
    /// Waits for any in-flight device operation to settle first.
    pub async fn has_device(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    /// Acquire the camera for the current facing mode
    ///
    /// A call made while the session is already active is a no-op. A call
    /// made while another initialization is in flight starts nothing and
    /// returns that initialization's outcome once it settles.
    pub async fn initialize(&self) -> AppResult<()> {
        let mut current = None;
        self.state.send_if_modified(|s| match s.status {
            SessionStatus::Initializing | SessionStatus::Active => {
                current = Some(s.status.clone());
                false
            }
            SessionStatus::Inactive | SessionStatus::Error(_) => {
                s.status = SessionStatus::Initializing;
                true
            }
        });

        match current {
            Some(SessionStatus::Active) => return Ok(()),
            Some(_) => {
                debug!("Initialize coalesced with in-flight acquisition");
                return self.settled().await;
            }
            None => {}
        }

        let guard = InitializingGuard {
            state: &self.state,
            armed: true,
        };
        let mut slot = self.slot.lock().await;
        let result = self.start_locked(&mut slot).await;
        guard.disarm();
        result
    }

    /// Release the camera; always safe, from any state
    pub async fn release(&self) {
        let mut slot = self.slot.lock().await;
        self.stop_locked(&mut slot);

        self.state.send_if_modified(|s| {
            if s.status == SessionStatus::Inactive {
                false
            } else {
                s.status = SessionStatus::Inactive;
                true
            }
        });
    }

    /// Switch between front and back cameras
    ///
    /// Runs release → flip → initialize as one operation under the handle
    /// lock; live constraint changes are not relied on.
    pub async fn toggle_facing(&self) -> AppResult<()> {
        let mut slot = self.slot.lock().await;
        self.stop_locked(&mut slot);

        self.state.send_modify(|s| {
            s.facing = s.facing.flipped();
            s.status = SessionStatus::Initializing;
        });
        info!(facing = %self.facing(), "Toggling camera facing");

        let guard = InitializingGuard {
            state: &self.state,
            armed: true,
        };
        let result = self.start_locked(&mut slot).await;
        guard.disarm();
        result
    }

    /// Extract a still and its encoded blob from the live preview
    ///
    /// Fails with `NotReady` when the session is not active or the preview
    /// has not rendered a frame yet.
    pub async fn capture_photo(&self) -> AppResult<Photo> {
        let frame = self.capture_still().await?;
        self.encoder.encode(frame).await
    }

    /// Wait until the preview has rendered its first frame
    ///
    /// Returns false on timeout or when the session stops.
    pub async fn wait_for_frame(&self, timeout: Duration) -> bool {
        let mut frames = self.preview.subscribe();
        matches!(
            tokio::time::timeout(timeout, frames.wait_for(|frame| frame.is_some())).await,
            Ok(Ok(_))
        )
    }

    /// Wait for a pending acquisition and report how it ended
    async fn settled(&self) -> AppResult<()> {
        let mut updates = self.state.subscribe();
        let settled = updates
            .wait_for(|s| s.status != SessionStatus::Initializing)
            .await
            .map(|s| (s.status.clone(), s.last_error.clone()))
            .map_err(|_| AppError::NotReady("Capture session closed".to_string()))?;

        match settled {
            (SessionStatus::Active, _) => Ok(()),
            (SessionStatus::Error(_), Some(err)) => Err(err),
            (status, _) => Err(AppError::NotReady(format!(
                "Camera initialization did not complete (session {})",
                status
            ))),
        }
    }

    async fn capture_still(&self) -> AppResult<RawImage> {
        let slot = self.slot.lock().await;

        let handle = match (&*slot, self.status()) {
            (Some(handle), SessionStatus::Active) => handle,
            (_, status) => {
                return Err(AppError::NotReady(format!(
                    "No active camera (session {})",
                    status
                )));
            }
        };

        let frame = self.device.capture_still(handle).await?;
        debug!(width = frame.width, height = frame.height, "Still captured");
        Ok(frame)
    }

    /// Acquire and attach with the slot lock held
    async fn start_locked(&self, slot: &mut Option<DeviceHandle>) -> AppResult<()> {
        // A stale handle must be gone before a new one is requested
        self.stop_locked(slot);

        let constraints = self.constraints();
        info!(adapter = self.device.name(), constraints = %constraints, "Acquiring camera");

        let handle = match self.device.acquire(&constraints).await {
            Ok(handle) => handle,
            Err(e) => {
                let err = AppError::from(e);
                self.fail(&err);
                return Err(err);
            }
        };

        if let Err(e) = self.device.attach_preview(&handle, &self.preview) {
            // Partially acquired: the stream still has to be stopped
            self.device.release(&handle);
            self.preview.clear();
            let err = AppError::from(e);
            self.fail(&err);
            return Err(err);
        }

        *slot = Some(handle);
        self.state.send_modify(|s| {
            s.status = SessionStatus::Active;
            s.last_error = None;
        });
        info!(facing = %self.facing(), "Camera active");
        Ok(())
    }

    /// Release the held handle, if any, with the slot lock held
    fn stop_locked(&self, slot: &mut Option<DeviceHandle>) {
        if let Some(handle) = slot.take() {
            debug!(handle = handle.id(), "Releasing camera");
            self.device.release(&handle);
        }
        self.preview.clear();
    }

    fn fail(&self, err: &AppError) {
        error!(error = %err, "Camera initialization failed");
        let message = err.to_string();
        self.state.send_modify(|s| {
            s.status = SessionStatus::Error(message);
            s.last_error = Some(err.clone());
        });
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(handle) = self.slot.get_mut().take() {
            warn!(handle = handle.id(), "Capture session dropped with a live camera, releasing");
            self.device.release(&handle);
        }
    }
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CaptureSession")
            .field("adapter", &self.device.name())
            .field("status", &state.status)
            .field("facing", &state.facing)
            .finish()
    }
}
