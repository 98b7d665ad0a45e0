// SPDX-License-Identifier: GPL-3.0-only

//! Still encoding
//!
//! Turns an RGBA still into the two representations a [`Photo`] carries: a
//! JPEG blob for upload and a `data:` URI for immediate preview. Encoding is
//! CPU-bound and runs on the blocking pool.

use super::{ImageBlob, Photo};
use crate::backends::camera::types::RawImage;
use crate::constants::capture;
use crate::errors::{AppError, AppResult};
use image::RgbImage;
use tracing::{debug, info};

/// JPEG encoder for captured stills
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    quality: u8,
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl PhotoEncoder {
    /// Create an encoder with the default still quality
    pub fn new() -> Self {
        Self {
            quality: capture::STILL_JPEG_QUALITY,
        }
    }

    /// Set JPEG quality (clamped to 1-100)
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Encode a still into a [`Photo`] asynchronously
    pub async fn encode(&self, frame: RawImage) -> AppResult<Photo> {
        info!(
            width = frame.width,
            height = frame.height,
            quality = self.quality,
            "Encoding still"
        );

        let quality = self.quality;
        tokio::task::spawn_blocking(move || {
            let rgb = rgba_to_rgb(&frame)?;
            let data = encode_jpeg(&rgb, quality)?;
            debug!(size = data.len(), "Still encoded");

            let blob = ImageBlob::new(data, "image/jpeg");
            Ok(Photo {
                preview_data_uri: blob.to_data_uri(),
                blob,
                width: frame.width,
                height: frame.height,
                captured_at: chrono::Utc::now(),
            })
        })
        .await
        .map_err(|e| AppError::Encoding(format!("Encoding task error: {}", e)))?
    }
}

/// Drop the alpha channel of an RGBA still
fn rgba_to_rgb(frame: &RawImage) -> AppResult<RgbImage> {
    let rgb: Vec<u8> = frame
        .data
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();

    RgbImage::from_raw(frame.width, frame.height, rgb).ok_or_else(|| {
        AppError::Encoding(format!(
            "Frame buffer does not match {}x{}",
            frame.width, frame.height
        ))
    })
}

/// Encode an RGB image as JPEG
pub(crate) fn encode_jpeg(image: &RgbImage, quality: u8) -> AppResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.encode(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgb8,
    )?;
    Ok(buffer)
}
