// SPDX-License-Identifier: GPL-3.0-only

//! Optional pre-upload resize/compress
//!
//! Pure geometric downscale plus re-encode. No format transcoding beyond
//! what re-encoding requires: PNG stays PNG, everything else becomes JPEG.

use super::ImageBlob;
use super::encoding::encode_jpeg;
use crate::constants::optimize;
use crate::errors::AppResult;
use image::ImageFormat;
use image::imageops::FilterType;
use tracing::debug;

/// Bounds and quality for [`optimize_image`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// JPEG quality, 1-100
    pub quality: u8,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            max_width: optimize::MAX_WIDTH,
            max_height: optimize::MAX_HEIGHT,
            quality: optimize::JPEG_QUALITY,
        }
    }
}

/// Target dimensions preserving aspect ratio
///
/// Landscape images are bounded by `max_width`; portrait and square images by
/// `max_height`. Images already inside their bound are left alone.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    let scale = |value: u32, num: u32, den: u32| -> u32 {
        let scaled = (value as f64 * num as f64 / den as f64).round() as u32;
        scaled.max(1)
    };

    if width > height {
        if width > max_width {
            return (max_width, scale(height, max_width, width));
        }
    } else if height > max_height {
        return (scale(width, max_height, height), max_height);
    }
    (width, height)
}

/// Resize and re-encode an image blob
pub fn optimize_image(blob: &ImageBlob, options: OptimizeOptions) -> AppResult<ImageBlob> {
    let format = image::guess_format(blob.bytes())?;
    let image = image::load_from_memory_with_format(blob.bytes(), format)?;

    let (width, height) = fit_dimensions(
        image.width(),
        image.height(),
        options.max_width,
        options.max_height,
    );
    let resized = if (width, height) == (image.width(), image.height()) {
        image
    } else {
        image.resize_exact(width, height, FilterType::Triangle)
    };

    let optimized = if format == ImageFormat::Png {
        let mut buffer = Vec::new();
        resized.write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)?;
        ImageBlob::new(buffer, "image/png")
    } else {
        let data = encode_jpeg(&resized.to_rgb8(), options.quality.clamp(1, 100))?;
        ImageBlob::new(data, "image/jpeg")
    };

    debug!(
        original = blob.len(),
        optimized = optimized.len(),
        width,
        height,
        "Image optimized"
    );
    Ok(optimized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::AppError;

    fn jpeg_blob(width: u32, height: u32) -> ImageBlob {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 100, 50]));
        ImageBlob::new(encode_jpeg(&image, 90).unwrap(), "image/jpeg")
    }

    #[test]
    fn test_fit_dimensions() {
        // Landscape bounded by width
        assert_eq!(fit_dimensions(3200, 1800, 1600, 1600), (1600, 900));
        // Portrait bounded by height
        assert_eq!(fit_dimensions(1000, 4000, 1600, 1600), (400, 1600));
        // Square counts as portrait
        assert_eq!(fit_dimensions(2000, 2000, 1600, 1000), (1000, 1000));
        // Already small
        assert_eq!(fit_dimensions(640, 480, 1600, 1600), (640, 480));
    }

    #[test]
    fn test_optimize_downscales_large_jpeg() {
        let blob = jpeg_blob(400, 200);
        let options = OptimizeOptions {
            max_width: 100,
            max_height: 100,
            quality: 70,
        };

        let optimized = optimize_image(&blob, options).unwrap();
        assert_eq!(optimized.mime_type(), "image/jpeg");

        let decoded = image::load_from_memory(optimized.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 50));
    }

    #[test]
    fn test_optimize_keeps_png() {
        let image = image::RgbaImage::from_pixel(10, 20, image::Rgba([0, 0, 0, 255]));
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();

        let optimized =
            optimize_image(&ImageBlob::new(buffer, "image/png"), OptimizeOptions::default())
                .unwrap();
        assert_eq!(optimized.mime_type(), "image/png");
    }

    #[test]
    fn test_garbage_input_is_an_encoding_error() {
        let blob = ImageBlob::new(vec![1, 2, 3, 4], "image/jpeg");
        assert!(matches!(
            optimize_image(&blob, OptimizeOptions::default()),
            Err(AppError::Encoding(_))
        ));
    }
}
