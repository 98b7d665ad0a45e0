// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Capture resolutions requested from the device layer
pub mod capture {
    /// Ideal width for phones and tablets
    pub const MOBILE_WIDTH: u32 = 640;
    /// Ideal height for phones and tablets
    pub const MOBILE_HEIGHT: u32 = 480;
    /// Ideal width for laptops and desktops
    pub const DESKTOP_WIDTH: u32 = 1280;
    /// Ideal height for laptops and desktops
    pub const DESKTOP_HEIGHT: u32 = 720;

    /// JPEG quality of a captured still
    pub const STILL_JPEG_QUALITY: u8 = 92;

    /// User agent tokens identifying mobile-class browsers
    pub const MOBILE_UA_TOKENS: [&str; 8] = [
        "android",
        "webos",
        "iphone",
        "ipad",
        "ipod",
        "blackberry",
        "iemobile",
        "opera mini",
    ];
}

/// Synthetic progress for uploads whose transport hides byte counts
pub mod progress {
    use super::Duration;

    /// Value reported as soon as the call is issued
    pub const SYNTHETIC_START: u8 = 10;
    /// Increment applied on every tick
    pub const SYNTHETIC_STEP: u8 = 5;
    /// Highest value reached before the call resolves
    pub const SYNTHETIC_CAP: u8 = 95;
    /// Tick interval
    pub const SYNTHETIC_INTERVAL: Duration = Duration::from_millis(300);
    /// Terminal value, only ever reported on success
    pub const COMPLETE: u8 = 100;
}

/// Pre-upload resize/compress defaults
pub mod optimize {
    pub const MAX_WIDTH: u32 = 1600;
    pub const MAX_HEIGHT: u32 = 1600;
    pub const JPEG_QUALITY: u8 = 85;
}

/// Remote endpoints and request settings
pub mod remote {
    use super::Duration;

    pub const DEFAULT_API_BASE: &str = "https://api.cloudinary.com/v1_1";
    pub const DEFAULT_DELIVERY_BASE: &str = "https://res.cloudinary.com";
    pub const DEFAULT_UPLOAD_PRESET: &str = "gardenlog";
    pub const DEFAULT_PROXY_URL: &str = "http://localhost:5001/blng-beda9/us-central1";
    pub const DEFAULT_FOLDER: &str = "uploads";

    /// Public asset probed by the direct reachability check
    pub const PROBE_ASSET: &str = "image/upload/sample.jpg";

    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Chunk size used when streaming a blob so transfer progress can be observed
    pub const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

    /// Callable function names exposed by the trusted proxy
    pub mod functions {
        pub const UPLOAD: &str = "uploadToCloudinary";
        pub const DELETE: &str = "deleteFromCloudinary";
        pub const TEST_CONNECTION: &str = "testCloudinaryConnection";
    }
}
