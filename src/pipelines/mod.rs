// SPDX-License-Identifier: MPL-2.0

//! Processing pipelines for captured photos
//!
//! Heavy work (JPEG encoding, resizing, base64) runs on blocking tasks so the
//! live preview keeps rendering while a photo is processed or uploaded.
//!
//! # Pipeline Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────────┐     ┌──────────────────┐
//! │ Still Frame  │ ──▶ │  Photo Pipeline   │ ──▶ │  Upload Pipeline │
//! │   (RGBA)     │     │  - JPEG encoding  │     │  - DIRECT        │
//! │              │     │  - data URI       │     │  - PROXIED       │
//! │              │     │  - optimize       │     │  - deletion gate │
//! └──────────────┘     └───────────────────┘     └──────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`photo`]: Still encoding, preview data URI and pre-upload optimization
//! - [`upload`]: Upload jobs, progress reporting and asset deletion

pub mod photo;
pub mod upload;
