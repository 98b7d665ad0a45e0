// SPDX-License-Identifier: GPL-3.0-only

//! Deletion gate
//!
//! Deleting needs the privileged credential only the trusted proxy holds, so
//! every deletion goes through the proxy, whichever strategy uploaded the
//! asset. The gate is deliberately built without an image store.

use crate::backends::proxy::{ProxyDeleteRequest, TrustedProxy};
use crate::errors::{AppError, AppResult};
use std::sync::Arc;
use tracing::{info, warn};

pub struct DeletionGate {
    proxy: Arc<dyn TrustedProxy>,
}

impl DeletionGate {
    pub fn new(proxy: Arc<dyn TrustedProxy>) -> Self {
        Self { proxy }
    }

    /// Remove a previously uploaded asset
    ///
    /// # Returns
    /// * `Ok(())` - The proxy confirmed deletion
    /// * `Err(AppError::InvalidArgument)` - Empty identifier; nothing attempted
    /// * `Err(AppError::DeletionFailed)` - Proxy unreachable or refused; carries the id for retry
    pub async fn delete_asset(&self, asset_id: &str) -> AppResult<()> {
        let asset_id = asset_id.trim();
        if asset_id.is_empty() {
            return Err(AppError::InvalidArgument(
                "Cannot delete an asset without an identifier".to_string(),
            ));
        }

        let request = ProxyDeleteRequest {
            public_id: asset_id.to_string(),
        };
        let failed = |message: String| {
            warn!(asset_id, error = %message, "Asset deletion failed");
            AppError::DeletionFailed {
                asset_id: asset_id.to_string(),
                message,
            }
        };

        let response = self
            .proxy
            .delete_image(request)
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.success {
            return Err(failed(
                response
                    .error
                    .unwrap_or_else(|| "Server delete failed".to_string()),
            ));
        }

        info!(
            asset_id,
            message = response.message.as_deref().unwrap_or(""),
            "Asset deleted"
        );
        Ok(())
    }
}
