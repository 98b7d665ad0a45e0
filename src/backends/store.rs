// SPDX-License-Identifier: GPL-3.0-only

//! Image store HTTP API (direct path)
//!
//! Uploads go straight to the store's public endpoint with an unsigned
//! upload preset. The public path never holds the privileged credential
//! deletion needs, so [`ImageStore`] has no delete operation at all.

use crate::config::Config;
use crate::constants::remote;
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::ImageBlob;
use crate::pipelines::upload::{ConnectionReport, UploadResult};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client as HttpClient, multipart};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Callback receiving `(bytes_sent, bytes_total)` while a body is streamed
pub type TransferProgress = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Public, unsigned upload endpoint of the image store
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Whether `upload` reports byte-level progress through its callback
    fn reports_transfer_progress(&self) -> bool;

    /// Upload `blob` into `folder`
    ///
    /// Network errors and non-2xx responses both fail with
    /// `AppError::UploadFailed` carrying the store's status and message.
    async fn upload(
        &self,
        blob: &ImageBlob,
        folder: Option<&str>,
        progress: TransferProgress,
    ) -> AppResult<UploadResult>;

    /// Lightweight reachability check of the public endpoint
    async fn probe(&self) -> ConnectionReport;
}

/// Body of a successful upload response
#[derive(Debug, Deserialize)]
struct StoreUploadResponse {
    secure_url: String,
    public_id: String,
    format: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct StoreErrorBody {
    error: StoreErrorMessage,
}

#[derive(Debug, Deserialize)]
struct StoreErrorMessage {
    message: String,
}

/// Interpret a store response
///
/// Error messages are passed through verbatim; the store's JSON error
/// envelope is unwrapped when present.
pub fn parse_upload_response(status: u16, body: &str) -> AppResult<UploadResult> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<StoreErrorBody>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        let message = if message.is_empty() {
            format!("Upload failed with status: {}", status)
        } else {
            message
        };
        return Err(AppError::UploadFailed {
            status: Some(status),
            message,
        });
    }

    let response: StoreUploadResponse =
        serde_json::from_str(body).map_err(|e| AppError::UploadFailed {
            status: Some(status),
            message: format!("Unexpected store response: {}", e),
        })?;

    Ok(UploadResult {
        remote_url: response.secure_url,
        asset_id: response.public_id,
        format: response.format,
        width: response.width,
        height: response.height,
    })
}

/// reqwest client for the Cloudinary-compatible upload API
pub struct CloudinaryStore {
    http: HttpClient,
    cloud_name: String,
    upload_preset: String,
    api_base: String,
    delivery_base: String,
}

impl CloudinaryStore {
    /// Create a store client; fails when no cloud name is configured
    pub fn new(config: &Config) -> AppResult<Self> {
        let cloud_name = config.require_cloud_name()?.to_string();
        let http = HttpClient::builder()
            .timeout(remote::REQUEST_TIMEOUT)
            .user_agent(concat!("camera-upload/", env!("GIT_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            cloud_name,
            upload_preset: config.upload_preset.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            delivery_base: config.delivery_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn upload_url(&self) -> String {
        format!("{}/{}/upload", self.api_base, self.cloud_name)
    }

    pub fn probe_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.delivery_base,
            self.cloud_name,
            remote::PROBE_ASSET
        )
    }
}

/// Stream `data` in chunks, reporting each chunk as the transport pulls it
fn progress_body(data: Arc<[u8]>, progress: TransferProgress) -> reqwest::Body {
    let total = data.len() as u64;
    let chunks: Vec<Vec<u8>> = data
        .chunks(remote::UPLOAD_CHUNK_SIZE)
        .map(<[u8]>::to_vec)
        .collect();

    let mut sent = 0u64;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        progress(sent, total);
        Ok::<Vec<u8>, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}

#[async_trait]
impl ImageStore for CloudinaryStore {
    fn reports_transfer_progress(&self) -> bool {
        true
    }

    async fn upload(
        &self,
        blob: &ImageBlob,
        folder: Option<&str>,
        progress: TransferProgress,
    ) -> AppResult<UploadResult> {
        info!(
            cloud = %self.cloud_name,
            preset = %self.upload_preset,
            folder = folder.unwrap_or(""),
            size = blob.len(),
            "Uploading directly to image store"
        );

        let file = multipart::Part::stream_with_length(
            progress_body(blob.shared_bytes(), progress),
            blob.len() as u64,
        )
        .file_name(format!("capture.{}", blob.extension()))
        .mime_str(blob.mime_type())
        .map_err(|e| AppError::upload(format!("Invalid MIME type: {}", e)))?;

        let mut form = multipart::Form::new()
            .part("file", file)
            .text("upload_preset", self.upload_preset.clone());
        if let Some(folder) = folder.filter(|f| !f.is_empty()) {
            form = form.text("folder", folder.to_string());
        }

        let response = self
            .http
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::upload(format!("Network error during upload: {}", e)))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| AppError::UploadFailed {
            status: Some(status),
            message: format!("Failed to read image store response: {}", e),
        })?;
        debug!(status, "Image store responded");

        parse_upload_response(status, &body)
    }

    async fn probe(&self) -> ConnectionReport {
        let url = self.probe_url();
        let result = self
            .http
            .head(&url)
            .timeout(remote::PROBE_TIMEOUT)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                ConnectionReport {
                    reachable: status.is_success(),
                    detail: format!("HTTP {} from {} (preset {})", status, url, self.upload_preset),
                }
            }
            Err(e) => {
                warn!(url = %url, error = %e, "Image store probe failed");
                ConnectionReport {
                    reachable: false,
                    detail: format!("Network error: {}", e),
                }
            }
        }
    }
}
