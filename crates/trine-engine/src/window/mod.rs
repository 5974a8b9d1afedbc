//! Window + event pumping.
//!
//! Owns the `winit` EventLoop and hands windows and wgpu contexts to the
//! driver through [`Platform`](crate::core::Platform).

mod platform;

pub use platform::{WinitPlatform, WinitWindow};
