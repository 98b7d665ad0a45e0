// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for the camera and the remote image services
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              Session Controller             │
//! └────────────────────┬────────────────────────┘
//!                      │
//! ┌────────────────────┴────────────────────────┐
//! │              Backend Layer                  │
//! │  ┌─────────────┐  ┌─────────┐  ┌─────────┐  │
//! │  │   Camera    │  │  Store  │  │  Proxy  │  │
//! │  │ (device)    │  │ (HTTP)  │  │ (HTTP)  │  │
//! │  └─────────────┘  └─────────┘  └─────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Media device contract and the capture session that owns it
//! - [`store`]: Public, unsigned upload endpoint of the image store
//! - [`proxy`]: Trusted backend holding the signing credential

pub mod camera;
pub mod proxy;
pub mod store;
