// SPDX-License-Identifier: GPL-3.0-only

//! Native file-capture fallback
//!
//! When no live camera stream is available, the platform's file picker (with
//! its own capture UI) produces an image file instead. This adapter serves
//! that file as a single-frame "stream" so the rest of the engine runs the
//! same acquire → attach → capture → release sequence.

use super::MediaDevice;
use super::types::{DeviceHandle, PreviewSink, RawImage, VideoConstraints};
use crate::errors::{DeviceError, DeviceResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Stream state kept per live handle
struct LiveStream {
    frame: Arc<RawImage>,
    sink: Option<PreviewSink>,
}

/// Media device backed by an image file on disk
pub struct FileCaptureDevice {
    path: PathBuf,
    streams: Mutex<HashMap<u64, LiveStream>>,
}

impl FileCaptureDevice {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            streams: Mutex::new(HashMap::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of streams acquired and not yet released
    pub fn live_streams(&self) -> usize {
        self.streams().len()
    }

    fn streams(&self) -> MutexGuard<'_, HashMap<u64, LiveStream>> {
        self.streams.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Decode an image file into an RGBA frame
pub fn load_image_as_frame(path: &Path) -> DeviceResult<RawImage> {
    if !path.exists() {
        return Err(DeviceError::Unavailable(format!(
            "Capture file not found: {}",
            path.display()
        )));
    }

    let image = image::open(path).map_err(|e| {
        DeviceError::Unavailable(format!("Failed to decode {}: {}", path.display(), e))
    })?;
    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();

    RawImage::from_rgba(width, height, rgba.into_raw())
        .ok_or_else(|| DeviceError::Unavailable(format!("Empty image: {}", path.display())))
}

#[async_trait]
impl MediaDevice for FileCaptureDevice {
    fn name(&self) -> &str {
        "file-capture"
    }

    async fn acquire(&self, constraints: &VideoConstraints) -> DeviceResult<DeviceHandle> {
        info!(path = %self.path.display(), constraints = %constraints, "Opening capture file");

        let path = self.path.clone();
        let frame = tokio::task::spawn_blocking(move || load_image_as_frame(&path))
            .await
            .map_err(|e| DeviceError::Unavailable(format!("Decoder task failed: {}", e)))??;

        debug!(
            width = frame.width,
            height = frame.height,
            "Capture file decoded"
        );

        // Files are not resized to the requested resolution; constraints are
        // preferences, the same as with a real camera
        let handle = DeviceHandle::new(*constraints);
        self.streams().insert(
            handle.id(),
            LiveStream {
                frame: Arc::new(frame),
                sink: None,
            },
        );
        Ok(handle)
    }

    fn attach_preview(&self, handle: &DeviceHandle, sink: &PreviewSink) -> DeviceResult<()> {
        let mut streams = self.streams();
        let stream = streams
            .get_mut(&handle.id())
            .ok_or_else(|| DeviceError::Unavailable("Stream already released".to_string()))?;

        sink.publish(stream.frame.as_ref().clone());
        stream.sink = Some(sink.clone());
        Ok(())
    }

    fn release(&self, handle: &DeviceHandle) {
        match self.streams().remove(&handle.id()) {
            Some(stream) => {
                if let Some(sink) = stream.sink {
                    sink.clear();
                }
                debug!(handle = handle.id(), "Capture file stream released");
            }
            None => debug!(handle = handle.id(), "Stream already released"),
        }
    }

    async fn capture_still(&self, handle: &DeviceHandle) -> DeviceResult<RawImage> {
        let streams = self.streams();
        let Some(stream) = streams.get(&handle.id()) else {
            warn!(handle = handle.id(), "Capture requested on a released stream");
            return Err(DeviceError::NotReady);
        };

        // Nothing is rendered until the preview is attached
        if stream.sink.is_none() {
            return Err(DeviceError::NotReady);
        }

        Ok(stream.frame.as_ref().clone())
    }
}
