// SPDX-License-Identifier: GPL-3.0-only

//! Photo extraction and pre-upload processing
//!
//! ```text
//! Live preview → RawImage (RGBA) → JPEG blob + data URI → Photo
//!                                        ↓ (optional)
//!                                 optimize_image → smaller blob
//! ```

pub mod encoding;
pub mod optimize;

pub use encoding::PhotoEncoder;
pub use optimize::{OptimizeOptions, fit_dimensions, optimize_image};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Encoded image bytes plus their MIME type
///
/// Cheap to clone; the bytes are shared.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    data: Arc<[u8]>,
    mime_type: String,
}

impl ImageBlob {
    pub fn new(data: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// File extension matching the MIME type
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }

    /// Encode as a `data:<mime>;base64,...` URI
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

impl std::fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImageBlob({}, {} bytes)", self.mime_type, self.data.len())
    }
}

/// A captured photo
///
/// Created once per capture and never mutated; a retake discards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    /// `data:` URI for immediate preview
    pub preview_data_uri: String,
    /// Encoded bytes handed to the upload pipeline
    pub blob: ImageBlob,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

/// Unique upload folder below `base`, `base/<unix millis>`
pub fn generate_upload_path(base: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{}/{}", base, Utc::now().timestamp_millis())
}
