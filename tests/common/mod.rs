// SPDX-License-Identifier: GPL-3.0-only

//! Fakes shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use camera_upload::backends::camera::{
    CaptureSession, DeviceClass, DeviceFacing, DeviceHandle, MediaDevice, PreviewSink, RawImage,
    VideoConstraints,
};
use camera_upload::backends::proxy::{
    ProxyConnectionResponse, ProxyDeleteRequest, ProxyDeleteResponse, ProxyError, ProxyResult,
    ProxyUploadRequest, ProxyUploadResponse, TrustedProxy,
};
use camera_upload::backends::store::{ImageStore, TransferProgress};
use camera_upload::errors::{AppError, AppResult, DeviceError, DeviceResult};
use camera_upload::pipelines::photo::ImageBlob;
use camera_upload::pipelines::upload::{ConnectionReport, UploadPipeline, UploadResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct DeviceStreams {
    live: HashSet<u64>,
    attached: HashSet<u64>,
    max_live: usize,
    facings: Vec<DeviceFacing>,
}

/// Camera double counting live handles
#[derive(Default)]
pub struct FakeDevice {
    streams: Mutex<DeviceStreams>,
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
    deny: AtomicBool,
    no_frames: AtomicBool,
    fail_attach: AtomicBool,
    acquire_delay: Mutex<Option<Duration>>,
}

impl FakeDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Refuse every acquisition from now on
    pub fn deny_permission(&self, deny: bool) {
        self.deny.store(deny, Ordering::SeqCst);
    }

    /// Attach the preview without ever rendering a frame
    pub fn withhold_frames(&self, withhold: bool) {
        self.no_frames.store(withhold, Ordering::SeqCst);
    }

    /// Acquire successfully but refuse to attach the preview
    pub fn fail_attach(&self, fail: bool) {
        self.fail_attach.store(fail, Ordering::SeqCst);
    }

    pub fn set_acquire_delay(&self, delay: Duration) {
        *self.acquire_delay.lock().unwrap() = Some(delay);
    }

    pub fn live(&self) -> usize {
        self.streams.lock().unwrap().live.len()
    }

    pub fn max_live(&self) -> usize {
        self.streams.lock().unwrap().max_live
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Facing requested by each acquisition, in order
    pub fn requested_facings(&self) -> Vec<DeviceFacing> {
        self.streams.lock().unwrap().facings.clone()
    }
}

pub fn test_frame() -> RawImage {
    let mut data = Vec::with_capacity(8 * 6 * 4);
    for i in 0..(8 * 6) {
        data.extend_from_slice(&[(i * 5) as u8, 120, 200, 255]);
    }
    RawImage::from_rgba(8, 6, data).unwrap()
}

#[async_trait]
impl MediaDevice for FakeDevice {
    fn name(&self) -> &str {
        "fake"
    }

    async fn acquire(&self, constraints: &VideoConstraints) -> DeviceResult<DeviceHandle> {
        let delay = *self.acquire_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.deny.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied("user dismissed the prompt".into()));
        }

        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let handle = DeviceHandle::new(*constraints);
        let mut streams = self.streams.lock().unwrap();
        streams.live.insert(handle.id());
        streams.max_live = streams.max_live.max(streams.live.len());
        streams.facings.push(constraints.facing);
        Ok(handle)
    }

    fn attach_preview(&self, handle: &DeviceHandle, sink: &PreviewSink) -> DeviceResult<()> {
        let mut streams = self.streams.lock().unwrap();
        if !streams.live.contains(&handle.id()) {
            return Err(DeviceError::Unavailable("stream stopped".into()));
        }
        if self.fail_attach.load(Ordering::SeqCst) {
            return Err(DeviceError::Unavailable("preview sink gone".into()));
        }
        streams.attached.insert(handle.id());
        if !self.no_frames.load(Ordering::SeqCst) {
            sink.publish(test_frame());
        }
        Ok(())
    }

    fn release(&self, handle: &DeviceHandle) {
        let mut streams = self.streams.lock().unwrap();
        if streams.live.remove(&handle.id()) {
            streams.attached.remove(&handle.id());
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn capture_still(&self, handle: &DeviceHandle) -> DeviceResult<RawImage> {
        let streams = self.streams.lock().unwrap();
        if !streams.attached.contains(&handle.id()) || self.no_frames.load(Ordering::SeqCst) {
            return Err(DeviceError::NotReady);
        }
        Ok(test_frame())
    }
}

pub fn session(device: &Arc<FakeDevice>) -> CaptureSession {
    CaptureSession::new(device.clone(), DeviceClass::Desktop, DeviceFacing::Back)
}

pub fn stored(url: &str, asset_id: &str) -> UploadResult {
    UploadResult {
        remote_url: url.to_string(),
        asset_id: asset_id.to_string(),
        format: Some("jpg".to_string()),
        width: None,
        height: None,
    }
}

/// Image store double
pub struct FakeStore {
    response: Mutex<AppResult<UploadResult>>,
    byte_progress: bool,
    uploads: AtomicUsize,
    probes: AtomicUsize,
    folders: Mutex<Vec<Option<String>>>,
}

impl FakeStore {
    pub fn succeeding(url: &str, asset_id: &str) -> Arc<Self> {
        Arc::new(Self::with_response(Ok(stored(url, asset_id)), false))
    }

    pub fn failing(status: u16, message: &str) -> Arc<Self> {
        Arc::new(Self::with_response(
            Err(AppError::UploadFailed {
                status: Some(status),
                message: message.to_string(),
            }),
            false,
        ))
    }

    pub fn with_byte_progress(url: &str, asset_id: &str) -> Arc<Self> {
        Arc::new(Self::with_response(Ok(stored(url, asset_id)), true))
    }

    fn with_response(response: AppResult<UploadResult>, byte_progress: bool) -> Self {
        Self {
            response: Mutex::new(response),
            byte_progress,
            uploads: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            folders: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(&self, response: AppResult<UploadResult>) {
        *self.response.lock().unwrap() = response;
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn folders(&self) -> Vec<Option<String>> {
        self.folders.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for FakeStore {
    fn reports_transfer_progress(&self) -> bool {
        self.byte_progress
    }

    async fn upload(
        &self,
        blob: &ImageBlob,
        folder: Option<&str>,
        progress: TransferProgress,
    ) -> AppResult<UploadResult> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.folders.lock().unwrap().push(folder.map(str::to_string));

        if self.byte_progress {
            let total = blob.len() as u64;
            progress(total / 2, total);
            tokio::task::yield_now().await;
            progress(total, total);
        }
        self.response.lock().unwrap().clone()
    }

    async fn probe(&self) -> ConnectionReport {
        self.probes.fetch_add(1, Ordering::SeqCst);
        ConnectionReport {
            reachable: true,
            detail: "HTTP 200".to_string(),
        }
    }
}

/// Trusted proxy double
pub struct FakeProxy {
    upload_response: Mutex<ProxyResult<ProxyUploadResponse>>,
    delete_response: Mutex<ProxyResult<ProxyDeleteResponse>>,
    hold_uploads: AtomicBool,
    resume: Notify,
    uploads: AtomicUsize,
    deletes: AtomicUsize,
    connection_tests: AtomicUsize,
    upload_requests: Mutex<Vec<ProxyUploadRequest>>,
    deleted_ids: Mutex<Vec<String>>,
}

impl Default for FakeProxy {
    fn default() -> Self {
        Self {
            upload_response: Mutex::new(Ok(ProxyUploadResponse {
                success: true,
                url: Some("https://store/proxied.jpg".to_string()),
                public_id: Some("uploads/proxied".to_string()),
                format: Some("jpg".to_string()),
                width: Some(8),
                height: Some(6),
                error: None,
            })),
            delete_response: Mutex::new(Ok(ProxyDeleteResponse {
                success: true,
                message: Some("Image deleted successfully".to_string()),
                error: None,
            })),
            hold_uploads: AtomicBool::new(false),
            resume: Notify::new(),
            uploads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            connection_tests: AtomicUsize::new(0),
            upload_requests: Mutex::new(Vec::new()),
            deleted_ids: Mutex::new(Vec::new()),
        }
    }
}

impl FakeProxy {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Keep upload calls outstanding until [`FakeProxy::resume_uploads`]
    pub fn hold_uploads(&self) {
        self.hold_uploads.store(true, Ordering::SeqCst);
    }

    pub fn resume_uploads(&self) {
        self.hold_uploads.store(false, Ordering::SeqCst);
        self.resume.notify_waiters();
    }

    pub fn respond_to_uploads_with(&self, response: ProxyResult<ProxyUploadResponse>) {
        *self.upload_response.lock().unwrap() = response;
    }

    pub fn respond_to_deletes_with(&self, response: ProxyResult<ProxyDeleteResponse>) {
        *self.delete_response.lock().unwrap() = response;
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn connection_tests(&self) -> usize {
        self.connection_tests.load(Ordering::SeqCst)
    }

    pub fn upload_requests(&self) -> Vec<ProxyUploadRequest> {
        self.upload_requests.lock().unwrap().clone()
    }

    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted_ids.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrustedProxy for FakeProxy {
    async fn upload_image(&self, request: ProxyUploadRequest) -> ProxyResult<ProxyUploadResponse> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.upload_requests.lock().unwrap().push(request);

        while self.hold_uploads.load(Ordering::SeqCst) {
            let resumed = self.resume.notified();
            if !self.hold_uploads.load(Ordering::SeqCst) {
                break;
            }
            resumed.await;
        }
        self.upload_response.lock().unwrap().clone()
    }

    async fn delete_image(&self, request: ProxyDeleteRequest) -> ProxyResult<ProxyDeleteResponse> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.deleted_ids.lock().unwrap().push(request.public_id);
        self.delete_response.lock().unwrap().clone()
    }

    async fn test_connection(&self) -> ProxyResult<ProxyConnectionResponse> {
        self.connection_tests.fetch_add(1, Ordering::SeqCst);
        Err(ProxyError {
            status: None,
            message: "emulator not running".to_string(),
        })
    }
}

pub fn pipeline(store: &Arc<FakeStore>, proxy: &Arc<FakeProxy>) -> UploadPipeline {
    let store: Arc<dyn ImageStore> = store.clone();
    UploadPipeline::new(Some(store), proxy.clone())
}

pub fn jpeg_blob() -> ImageBlob {
    let image = image::RgbImage::from_pixel(8, 6, image::Rgb([90, 140, 60]));
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 90)
        .encode_image(&image)
        .unwrap();
    ImageBlob::new(bytes, "image/jpeg")
}
