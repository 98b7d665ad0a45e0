// SPDX-License-Identifier: GPL-3.0-only

//! Account identifiers and feature flags
//!
//! Configuration is a plain value handed to the pipeline and controller at
//! construction or call time. Nothing in the crate reads it from a global.

use crate::constants::remote;
use crate::errors::{AppError, AppResult};
use crate::pipelines::upload::UploadStrategy;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Runtime toggles supplied by the feature-flag collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureFlags {
    /// Upload straight to the image store instead of through the proxy
    pub use_direct_upload: bool,
    /// Resize/compress stills before upload
    pub image_optimization: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_direct_upload: false, // Proxy by default, it never exposes a credential
            image_optimization: true,
        }
    }
}

impl FeatureFlags {
    /// Strategy selected by the flags
    pub fn upload_strategy(&self) -> UploadStrategy {
        if self.use_direct_upload {
            UploadStrategy::Direct
        } else {
            UploadStrategy::Proxied
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Image store account; required for direct uploads and the direct probe
    pub cloud_name: Option<String>,
    /// Unsigned upload preset used by direct uploads
    pub upload_preset: String,
    /// Upload API base, `{api_base}/{cloud_name}/upload`
    pub api_base: String,
    /// Public delivery base used by the reachability probe
    pub delivery_base: String,
    /// Base URL of the trusted proxy's callable functions
    pub proxy_url: String,
    /// Bearer token obtained by the auth collaborator, if any
    pub proxy_token: Option<String>,
    pub flags: FeatureFlags,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cloud_name: None,
            upload_preset: remote::DEFAULT_UPLOAD_PRESET.to_string(),
            api_base: remote::DEFAULT_API_BASE.to_string(),
            delivery_base: remote::DEFAULT_DELIVERY_BASE.to_string(),
            proxy_url: remote::DEFAULT_PROXY_URL.to_string(),
            proxy_token: None,
            flags: FeatureFlags::default(),
        }
    }
}

impl Config {
    /// Load configuration from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let flags = FeatureFlags {
            use_direct_upload: parse_flag(
                "USE_DIRECT_CLOUDINARY",
                get("USE_DIRECT_CLOUDINARY"),
                defaults.flags.use_direct_upload,
            ),
            image_optimization: parse_flag(
                "IMAGE_OPTIMIZATION",
                get("IMAGE_OPTIMIZATION"),
                defaults.flags.image_optimization,
            ),
        };

        Self {
            cloud_name: get("CLOUDINARY_CLOUD_NAME"),
            upload_preset: get("CLOUDINARY_UPLOAD_PRESET").unwrap_or(defaults.upload_preset),
            api_base: get("CLOUDINARY_API_BASE").unwrap_or(defaults.api_base),
            delivery_base: get("CLOUDINARY_DELIVERY_BASE").unwrap_or(defaults.delivery_base),
            proxy_url: get("UPLOAD_PROXY_URL").unwrap_or(defaults.proxy_url),
            proxy_token: get("UPLOAD_PROXY_TOKEN"),
            flags,
        }
    }

    /// Cloud name, or a configuration error naming the missing variable
    pub fn require_cloud_name(&self) -> AppResult<&str> {
        self.cloud_name
            .as_deref()
            .ok_or_else(|| AppError::Config("CLOUDINARY_CLOUD_NAME is not set".to_string()))
    }
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };

    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        other => {
            warn!(key, value = other, default, "Unrecognized flag value, using default");
            default
        }
    }
}
