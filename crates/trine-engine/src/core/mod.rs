//! Core engine-facing contracts.
//!
//! The two external collaborators the driver talks to, the window/context
//! provider and the graphics device, are expressed here as traits so the
//! driver never names winit or wgpu directly.

mod device;
mod error;
mod handles;
mod platform;

pub use device::{
    AttribFormat, AttribLayout, BufferTarget, ClearColor, ClearMask, DeviceResult,
    GraphicsDevice, IndexFormat, PresentOutcome,
};
pub use error::DeviceError;
pub use handles::{BufferId, HandleAllocator, ProgramId, ShaderId, VertexArrayId};
pub use platform::{Platform, WindowConfig};
