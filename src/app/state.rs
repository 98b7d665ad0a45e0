// SPDX-License-Identifier: GPL-3.0-only

//! Controller state management

use crate::backends::camera::{DeviceFacing, SessionStatus};
use crate::errors::AppError;
use crate::pipelines::photo::Photo;
use crate::pipelines::upload::{Asset, UploadJob};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Composite state exposed to presentation code
///
/// ```text
/// IDLE ─initialize─▶ DEVICE_ACTIVE ─capture─▶ PHOTO_READY ─upload─▶ UPLOADING
///  ▲                    ▲                          ▲                  │
///  │                    └──────── retake ──────────┤          UPLOADED | UPLOAD_FAILED
///  └──────────── reset (device released) ──────────┴──────────────────┘
/// ```
///
/// There is no terminal state; the machine can be re-entered indefinitely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControllerState {
    /// No device held
    #[default]
    Idle,
    /// Live preview running, nothing captured
    DeviceActive,
    /// A photo is held and can be uploaded
    PhotoReady,
    /// An upload job is in flight
    Uploading,
    /// The last job succeeded; an asset is known
    Uploaded,
    /// The last job failed; the photo is kept for a new attempt
    UploadFailed,
}

impl ControllerState {
    /// Whether an upload may be started from this state
    pub fn can_upload(self) -> bool {
        matches!(
            self,
            ControllerState::PhotoReady | ControllerState::Uploaded | ControllerState::UploadFailed
        )
    }
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControllerState::Idle => "idle",
            ControllerState::DeviceActive => "device active",
            ControllerState::PhotoReady => "photo ready",
            ControllerState::Uploading => "uploading",
            ControllerState::Uploaded => "uploaded",
            ControllerState::UploadFailed => "upload failed",
        };
        write!(f, "{}", name)
    }
}

/// Everything presentation code renders, published on every change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub state: ControllerState,
    pub facing: DeviceFacing,
    pub session: SessionStatus,
    pub photo: Option<Photo>,
    /// Current upload attempt; replaced, never restarted
    pub job: Option<UploadJob>,
    pub asset: Option<Asset>,
    /// Most recent failure of any operation
    pub error: Option<AppError>,
}

impl ControllerSnapshot {
    /// Progress of the current job, 0 when there is none
    pub fn progress(&self) -> u8 {
        self.job.as_ref().map_or(0, |job| job.progress)
    }

    pub(crate) fn job_id(&self) -> Option<Uuid> {
        self.job.as_ref().map(|job| job.id)
    }

    /// Drop the photo and everything derived from it
    pub(crate) fn discard_photo(&mut self) {
        self.photo = None;
        self.job = None;
        self.asset = None;
    }
}
