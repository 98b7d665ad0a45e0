// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the capture session lifecycle

mod common;

use camera_upload::backends::camera::{
    CaptureSession, DeviceClass, DeviceFacing, FileCaptureDevice, SessionStatus,
};
use camera_upload::errors::AppError;
use common::{FakeDevice, session};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_initialize_activates_with_desktop_constraints() {
    let device = FakeDevice::new();
    let session = session(&device);

    session.initialize().await.unwrap();

    assert_eq!(session.status(), SessionStatus::Active);
    assert!(session.has_device().await);
    assert!(session.preview().has_frame());
    assert_eq!(session.constraints().target_width, 1280);
    assert_eq!(device.live(), 1);
}

#[tokio::test]
async fn test_at_most_one_live_handle() {
    let device = FakeDevice::new();
    let session = session(&device);

    session.initialize().await.unwrap();
    session.initialize().await.unwrap();
    session.toggle_facing().await.unwrap();
    session.release().await;
    session.initialize().await.unwrap();
    session.toggle_facing().await.unwrap();
    session.toggle_facing().await.unwrap();

    assert_eq!(device.max_live(), 1, "a handle was acquired before the previous one was released");
    assert_eq!(device.live(), 1);

    session.release().await;
    assert_eq!(device.live(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_initialize_is_coalesced() {
    let device = FakeDevice::new();
    device.set_acquire_delay(Duration::from_millis(200));
    let session = session(&device);

    let (first, second) = tokio::join!(session.initialize(), session.initialize());
    assert!(first.is_ok());
    assert!(second.is_ok());

    assert_eq!(device.acquisitions(), 1);
    assert_eq!(device.max_live(), 1);
    assert_eq!(session.status(), SessionStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn test_coalesced_initialize_reports_failed_acquisition() {
    let device = FakeDevice::new();
    device.set_acquire_delay(Duration::from_millis(500));
    device.deny_permission(true);
    let session = session(&device);

    let (first, second) = tokio::join!(session.initialize(), session.initialize());

    let first = first.unwrap_err();
    assert!(matches!(first, AppError::DeviceUnavailable(_)));
    assert_eq!(second.unwrap_err(), first);
    assert!(matches!(session.status(), SessionStatus::Error(_)));
    assert_eq!(device.live(), 0);
}

#[tokio::test]
async fn test_failed_attach_releases_acquired_handle() {
    let device = FakeDevice::new();
    device.fail_attach(true);
    let session = session(&device);

    let err = session.initialize().await.unwrap_err();

    assert!(matches!(err, AppError::DeviceUnavailable(_)));
    assert!(matches!(session.status(), SessionStatus::Error(_)));
    assert_eq!(device.acquisitions(), 1);
    assert_eq!(device.releases(), 1);
    assert_eq!(device.live(), 0);
    assert!(!session.has_device().await);
    assert!(!session.preview().has_frame());

    device.fail_attach(false);
    session.initialize().await.unwrap();
    assert_eq!(device.live(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_initialize_returns_to_inactive() {
    let device = FakeDevice::new();
    device.set_acquire_delay(Duration::from_millis(500));
    let session = session(&device);

    let abandoned = tokio::time::timeout(Duration::from_millis(100), session.initialize()).await;
    assert!(abandoned.is_err());

    assert_eq!(session.status(), SessionStatus::Inactive);
    assert_eq!(device.live(), 0);
    assert!(!session.has_device().await);

    session.initialize().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Active);
    assert_eq!(device.live(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_release_waits_for_pending_initialize() {
    let device = FakeDevice::new();
    device.set_acquire_delay(Duration::from_millis(500));
    let session = Arc::new(session(&device));

    let pending = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.initialize().await })
    };
    // Let the initialization take the handle slot
    tokio::task::yield_now().await;
    assert_eq!(session.status(), SessionStatus::Initializing);

    session.release().await;
    pending.await.unwrap().unwrap();

    assert_eq!(session.status(), SessionStatus::Inactive);
    assert_eq!(device.live(), 0);
    assert!(!session.preview().has_frame());
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let device = FakeDevice::new();
    let session = session(&device);

    // Releasing an inactive session is a no-op
    session.release().await;
    assert_eq!(session.status(), SessionStatus::Inactive);
    assert_eq!(device.releases(), 0);

    session.initialize().await.unwrap();
    session.release().await;
    session.release().await;

    assert_eq!(session.status(), SessionStatus::Inactive);
    assert_eq!(device.releases(), 1);
    assert_eq!(device.live(), 0);
}

#[tokio::test]
async fn test_toggle_flips_facing() {
    let device = FakeDevice::new();
    let session = session(&device);
    session.initialize().await.unwrap();
    assert_eq!(session.facing(), DeviceFacing::Back);

    session.toggle_facing().await.unwrap();
    assert_eq!(session.facing(), DeviceFacing::Front);
    assert_eq!(session.status(), SessionStatus::Active);

    session.toggle_facing().await.unwrap();
    assert_eq!(session.facing(), DeviceFacing::Back);

    assert_eq!(
        device.requested_facings(),
        vec![DeviceFacing::Back, DeviceFacing::Front, DeviceFacing::Back]
    );
}

#[tokio::test]
async fn test_failed_toggle_leaves_device_released() {
    let device = FakeDevice::new();
    let session = session(&device);
    session.initialize().await.unwrap();

    device.deny_permission(true);
    let err = session.toggle_facing().await.unwrap_err();

    assert!(matches!(err, AppError::DeviceUnavailable(_)));
    assert!(matches!(session.status(), SessionStatus::Error(_)));
    assert_eq!(session.facing(), DeviceFacing::Front);
    assert_eq!(device.live(), 0);
    assert!(!session.has_device().await);
}

#[tokio::test]
async fn test_permission_denied_scenario() {
    let device = FakeDevice::new();
    device.deny_permission(true);
    let session = session(&device);

    let err = session.initialize().await.unwrap_err();
    assert!(matches!(err, AppError::DeviceUnavailable(_)));
    assert!(matches!(session.status(), SessionStatus::Error(_)));
    assert!(session
        .last_error()
        .unwrap()
        .to_string()
        .contains("Permission denied"));
    assert!(!session.has_device().await);

    session.release().await;
    assert_eq!(session.status(), SessionStatus::Inactive);

    // The user may retry once access is granted
    device.deny_permission(false);
    session.initialize().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Active);
    assert_eq!(session.last_error(), None);
}

#[tokio::test]
async fn test_capture_requires_active_session() {
    let device = FakeDevice::new();
    let session = session(&device);

    let err = session.capture_photo().await.unwrap_err();
    assert!(matches!(err, AppError::NotReady(_)));
}

#[tokio::test]
async fn test_capture_before_first_frame_is_not_ready() {
    let device = FakeDevice::new();
    device.withhold_frames(true);
    let session = session(&device);
    session.initialize().await.unwrap();

    assert!(!session.wait_for_frame(Duration::from_millis(20)).await);
    let err = session.capture_photo().await.unwrap_err();
    assert!(matches!(err, AppError::NotReady(_)));
    assert_eq!(session.status(), SessionStatus::Active);
}

#[tokio::test]
async fn test_capture_produces_jpeg_photo() {
    let device = FakeDevice::new();
    let session = session(&device);
    session.initialize().await.unwrap();
    assert!(session.wait_for_frame(Duration::from_secs(1)).await);

    let photo = session.capture_photo().await.unwrap();
    assert_eq!((photo.width, photo.height), (8, 6));
    assert_eq!(photo.blob.mime_type(), "image/jpeg");
    assert_eq!(&photo.blob.bytes()[..2], &[0xFF, 0xD8]);
    assert!(photo.preview_data_uri.starts_with("data:image/jpeg;base64,"));
}

#[tokio::test]
async fn test_dropping_session_releases_device() {
    let device = FakeDevice::new();
    {
        let session = session(&device);
        session.initialize().await.unwrap();
        assert_eq!(device.live(), 1);
    }
    assert_eq!(device.live(), 0);
}

#[tokio::test]
async fn test_file_capture_device_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plant.png");
    image::RgbaImage::from_pixel(16, 12, image::Rgba([40, 160, 40, 255]))
        .save(&path)
        .unwrap();

    let device = Arc::new(FileCaptureDevice::new(&path));
    let session = CaptureSession::new(device.clone(), DeviceClass::Mobile, DeviceFacing::Front);

    session.initialize().await.unwrap();
    assert_eq!(session.constraints().target_width, 640);
    assert!(session.facing().mirrors_preview());

    let photo = session.capture_photo().await.unwrap();
    assert_eq!((photo.width, photo.height), (16, 12));

    session.release().await;
    assert_eq!(device.live_streams(), 0);
}
