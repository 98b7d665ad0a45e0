// SPDX-License-Identifier: GPL-3.0-only

//! Session controller and the state it exposes to presentation code

pub mod controller;
pub mod state;

pub use controller::SessionController;
pub use state::{ControllerSnapshot, ControllerState};
