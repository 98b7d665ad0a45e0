// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for camera adapters

use crate::constants::capture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::watch;

/// Which physical camera a capture device should prefer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceFacing {
    /// User-facing (selfie) camera
    Front,
    /// Environment-facing camera
    #[default]
    Back,
}

impl DeviceFacing {
    /// The other camera
    pub fn flipped(self) -> Self {
        match self {
            DeviceFacing::Front => DeviceFacing::Back,
            DeviceFacing::Back => DeviceFacing::Front,
        }
    }

    /// Front cameras are previewed mirrored, like looking into a mirror
    pub fn mirrors_preview(self) -> bool {
        matches!(self, DeviceFacing::Front)
    }
}

impl std::fmt::Display for DeviceFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceFacing::Front => write!(f, "front"),
            DeviceFacing::Back => write!(f, "back"),
        }
    }
}

/// Class of the host device, used to pick a capture resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceClass {
    Mobile,
    #[default]
    Desktop,
}

impl DeviceClass {
    /// Detect a mobile-class browser from its user agent
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if capture::MOBILE_UA_TOKENS.iter().any(|token| ua.contains(token)) {
            DeviceClass::Mobile
        } else {
            DeviceClass::Desktop
        }
    }
}

/// Desired capture resolution and camera; derived, never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoConstraints {
    pub target_width: u32,
    pub target_height: u32,
    pub facing: DeviceFacing,
}

impl VideoConstraints {
    /// Lower resolution for mobile-class devices, higher otherwise
    pub fn for_device(class: DeviceClass, facing: DeviceFacing) -> Self {
        let (target_width, target_height) = match class {
            DeviceClass::Mobile => (capture::MOBILE_WIDTH, capture::MOBILE_HEIGHT),
            DeviceClass::Desktop => (capture::DESKTOP_WIDTH, capture::DESKTOP_HEIGHT),
        };
        Self {
            target_width,
            target_height,
            facing,
        }
    }
}

impl std::fmt::Display for VideoConstraints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} ({})",
            self.target_width, self.target_height, self.facing
        )
    }
}

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Live device stream handed out by an adapter's `acquire`
///
/// Deliberately neither `Clone` nor `Copy`: exactly one owner holds it and
/// gives it back through `release`.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceHandle {
    id: u64,
    constraints: VideoConstraints,
}

impl DeviceHandle {
    /// Mint a fresh handle for a stream opened with `constraints`
    pub fn new(constraints: VideoConstraints) -> Self {
        Self {
            id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
            constraints,
        }
    }

    /// Process-unique identifier, for adapters that track their streams
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn constraints(&self) -> &VideoConstraints {
        &self.constraints
    }
}

/// RGBA still frame taken from a live preview
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA, `width * height * 4` bytes
    pub data: Arc<[u8]>,
    pub captured_at: Instant,
}

impl RawImage {
    /// Wrap RGBA bytes, checking the buffer matches the dimensions
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if width == 0 || height == 0 || data.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            data: Arc::from(data),
            captured_at: Instant::now(),
        })
    }
}

/// Renderable sink a device stream is attached to
///
/// Adapters publish rendered frames into it; presentation code subscribes to
/// draw them. Clones share the same underlying channel.
#[derive(Debug, Clone)]
pub struct PreviewSink {
    frames: Arc<watch::Sender<Option<Arc<RawImage>>>>,
}

impl Default for PreviewSink {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewSink {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            frames: Arc::new(sender),
        }
    }

    /// Publish a newly rendered frame
    pub fn publish(&self, frame: RawImage) {
        self.frames.send_replace(Some(Arc::new(frame)));
    }

    /// Drop the current frame (stream stopped)
    pub fn clear(&self) {
        self.frames.send_replace(None);
    }

    /// Most recently rendered frame
    pub fn latest(&self) -> Option<Arc<RawImage>> {
        self.frames.borrow().clone()
    }

    pub fn has_frame(&self) -> bool {
        self.frames.borrow().is_some()
    }

    /// Receiver for presentation code drawing the preview
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<RawImage>>> {
        self.frames.subscribe()
    }
}

/// Lifecycle of a capture session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Inactive,
    Initializing,
    Active,
    /// Initialization failed with the given message; the device is released
    Error(String),
}

impl SessionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Inactive => write!(f, "inactive"),
            SessionStatus::Initializing => write!(f, "initializing"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_flip_and_mirror() {
        assert_eq!(DeviceFacing::Back.flipped(), DeviceFacing::Front);
        assert_eq!(DeviceFacing::Front.flipped(), DeviceFacing::Back);
        assert!(DeviceFacing::Front.mirrors_preview());
        assert!(!DeviceFacing::Back.mirrors_preview());
    }

    #[test]
    fn test_constraints_follow_device_class() {
        let ua = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
        let mobile = VideoConstraints::for_device(DeviceClass::from_user_agent(ua), DeviceFacing::Back);
        assert_eq!((mobile.target_width, mobile.target_height), (640, 480));

        let ua = "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox/128.0";
        let desktop =
            VideoConstraints::for_device(DeviceClass::from_user_agent(ua), DeviceFacing::Front);
        assert_eq!((desktop.target_width, desktop.target_height), (1280, 720));
    }

    #[test]
    fn test_handles_are_unique() {
        let constraints = VideoConstraints::for_device(DeviceClass::Desktop, DeviceFacing::Back);
        let a = DeviceHandle::new(constraints);
        let b = DeviceHandle::new(constraints);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_raw_image_checks_buffer_size() {
        assert!(RawImage::from_rgba(2, 2, vec![0; 16]).is_some());
        assert!(RawImage::from_rgba(2, 2, vec![0; 12]).is_none());
        assert!(RawImage::from_rgba(0, 2, Vec::new()).is_none());
    }

    #[test]
    fn test_preview_sink_shares_frames() {
        let sink = PreviewSink::new();
        let view = sink.clone();
        assert!(!view.has_frame());

        sink.publish(RawImage::from_rgba(1, 1, vec![255; 4]).unwrap());
        assert_eq!(view.latest().map(|f| f.width), Some(1));

        sink.clear();
        assert!(view.latest().is_none());
    }
}
