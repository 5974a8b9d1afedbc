//! Trine engine crate.
//!
//! Draws one white triangle through a handle-based graphics device on top of
//! wgpu, with winit providing the window and event pump.

pub mod core;
pub mod device;
pub mod diagnostics;
pub mod driver;
pub mod logging;
pub mod scene;
pub mod shader;
pub mod time;
pub mod window;
