// SPDX-License-Identifier: GPL-3.0-only

//! Trusted upload proxy (proxied path)
//!
//! A backend that already holds the store's signing credential. It uploads
//! base64 image data on the client's behalf and is the only route through
//! which assets can be deleted. Authentication is handled by whoever supplies
//! the bearer token; this client only forwards it.
//!
//! The HTTP client speaks the callable-function envelope:
//!
//! ```text
//! POST {base}/{function}   {"data": {...}}
//!   200  {"result": {...}}
//!   4xx  {"error": {"message": "...", "status": "..."}}
//! ```

use crate::config::Config;
use crate::constants::remote::{self, functions};
use crate::errors::{AppError, AppResult};
use crate::pipelines::upload::{ConnectionReport, UploadResult};
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Request/response interface of the trusted backend
#[async_trait]
pub trait TrustedProxy: Send + Sync {
    async fn upload_image(&self, request: ProxyUploadRequest) -> ProxyResult<ProxyUploadResponse>;

    async fn delete_image(&self, request: ProxyDeleteRequest) -> ProxyResult<ProxyDeleteResponse>;

    async fn test_connection(&self) -> ProxyResult<ProxyConnectionResponse>;
}

/// Failure to complete a proxy call at all (transport, HTTP status, envelope)
///
/// A call that completes but reports `success: false` is not a `ProxyError`;
/// it arrives as a response and the caller interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", http_suffix(.status))]
pub struct ProxyError {
    pub status: Option<u16>,
    pub message: String,
}

fn http_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

pub type ProxyResult<T> = Result<T, ProxyError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyUploadRequest {
    /// Image as a `data:` URI
    pub base64_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyUploadResponse {
    pub success: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub public_id: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProxyUploadResponse {
    /// Convert to an upload result, or the backend-reported failure
    pub fn into_result(self) -> AppResult<UploadResult> {
        if !self.success {
            return Err(AppError::upload(
                self.error
                    .unwrap_or_else(|| "Server upload failed".to_string()),
            ));
        }

        match (self.url, self.public_id) {
            (Some(remote_url), Some(asset_id)) => Ok(UploadResult {
                remote_url,
                asset_id,
                format: self.format,
                width: self.width,
                height: self.height,
            }),
            _ => Err(AppError::upload(
                "Proxy reported success without url or publicId",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyDeleteRequest {
    pub public_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyDeleteResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConnectionResponse {
    pub success: bool,
    #[serde(default)]
    pub cloud_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl From<ProxyConnectionResponse> for ConnectionReport {
    fn from(response: ProxyConnectionResponse) -> Self {
        let detail = if response.success {
            format!(
                "{} (cloud {})",
                response
                    .message
                    .or(response.status)
                    .unwrap_or_else(|| "connected".to_string()),
                response.cloud_name.as_deref().unwrap_or("unknown")
            )
        } else {
            response
                .error
                .unwrap_or_else(|| "Proxy reported failure".to_string())
        };
        ConnectionReport {
            reachable: response.success,
            detail,
        }
    }
}

#[derive(Serialize)]
struct CallRequest<'a, T> {
    data: &'a T,
}

#[derive(Deserialize)]
struct CallResponse<T> {
    #[serde(alias = "data")]
    result: T,
}

#[derive(Deserialize)]
struct CallErrorBody {
    error: CallErrorMessage,
}

#[derive(Deserialize)]
struct CallErrorMessage {
    message: String,
}

/// Unwrap a callable-function response body
pub fn parse_call_response<T: DeserializeOwned>(status: u16, body: &str) -> ProxyResult<T> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<CallErrorBody>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        return Err(ProxyError {
            status: Some(status),
            message,
        });
    }

    serde_json::from_str::<CallResponse<T>>(body)
        .map(|r| r.result)
        .map_err(|e| ProxyError {
            status: Some(status),
            message: format!("Malformed proxy response: {}", e),
        })
}

/// HTTP client for the proxy's callable functions
pub struct CallableProxy {
    http: HttpClient,
    base_url: String,
    token: Option<String>,
}

impl CallableProxy {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = HttpClient::builder()
            .timeout(remote::REQUEST_TIMEOUT)
            .user_agent(concat!("camera-upload/", env!("GIT_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.proxy_url.trim_end_matches('/').to_string(),
            token: config.proxy_token.clone(),
        })
    }

    pub fn function_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    async fn call<Req, Resp>(&self, name: &str, data: &Req) -> ProxyResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        debug!(function = name, "Calling proxy function");

        let mut request = self
            .http
            .post(self.function_url(name))
            .json(&CallRequest { data });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| ProxyError {
            status: None,
            message: format!("Network error calling {}: {}", name, e),
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| ProxyError {
            status: Some(status),
            message: format!("Failed to read {} response: {}", name, e),
        })?;

        parse_call_response(status, &body)
    }
}

#[async_trait]
impl TrustedProxy for CallableProxy {
    async fn upload_image(&self, request: ProxyUploadRequest) -> ProxyResult<ProxyUploadResponse> {
        info!(
            folder = request.folder.as_deref().unwrap_or(""),
            size = request.base64_image.len(),
            "Uploading through proxy"
        );
        self.call(functions::UPLOAD, &request).await
    }

    async fn delete_image(&self, request: ProxyDeleteRequest) -> ProxyResult<ProxyDeleteResponse> {
        info!(public_id = %request.public_id, "Deleting through proxy");
        self.call(functions::DELETE, &request).await
    }

    async fn test_connection(&self) -> ProxyResult<ProxyConnectionResponse> {
        let response = self
            .call(functions::TEST_CONNECTION, &serde_json::json!({}))
            .await;
        if let Err(e) = &response {
            warn!(error = %e, "Proxy connection test failed");
        }
        response
    }
}
