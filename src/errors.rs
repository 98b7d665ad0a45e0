// SPDX-License-Identifier: GPL-3.0-only

//! Error types for capture sessions, uploads and deletions
//!
//! Every failure in the engine ends up as an [`AppError`] so the session
//! controller can expose it to presentation code. None of them is fatal: the
//! state machine that produced the error stays re-enterable.

use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Permission denied or no camera; the user may retry initialization
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),
    /// Capture requested before an active device delivered a frame
    #[error("Camera not ready: {0}")]
    NotReady(String),
    /// Network failure, non-2xx store response or proxy-reported failure
    #[error("Upload failed: {message}")]
    UploadFailed {
        /// HTTP status of the store or proxy response, when one was received
        status: Option<u16>,
        message: String,
    },
    /// Deletion failed; the asset identifier is kept so the caller can retry
    #[error("Failed to delete {asset_id}: {message}")]
    DeletionFailed { asset_id: String, message: String },
    /// Programmer error such as deleting without an identifier
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// A captured still could not be encoded or decoded
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Build an upload failure without an HTTP status (transport errors, proxy errors)
    pub fn upload(message: impl Into<String>) -> Self {
        AppError::UploadFailed {
            status: None,
            message: message.into(),
        }
    }

    /// Whether the user can recover by simply trying the same action again
    pub fn is_retriable(&self) -> bool {
        !matches!(self, AppError::InvalidArgument(_) | AppError::Config(_))
    }
}

/// Errors reported by a media device adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The user (or platform policy) refused camera access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// No matching camera, or the camera is held elsewhere
    #[error("Device unavailable: {0}")]
    Unavailable(String),
    /// The preview has not rendered a frame yet
    #[error("No frame available yet")]
    NotReady,
}

/// Result type for media device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

impl From<DeviceError> for AppError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::PermissionDenied(_) | DeviceError::Unavailable(_) => {
                AppError::DeviceUnavailable(err.to_string())
            }
            DeviceError::NotReady => AppError::NotReady(err.to_string()),
        }
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Encoding(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::UploadFailed {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
