//! Handle device over wgpu.
//!
//! This module is responsible for:
//! - object bookkeeping and draw validation ([`Device`])
//! - creating the wgpu Instance/Adapter/Device/Queue and the Surface
//! - turning a recorded frame into one render pass and presenting it

mod backend;
mod context;
mod error;
mod frame;
mod gpu;
mod init;
mod state;
mod surface;

pub use backend::{Backend, ProgramSources};
pub use context::WgpuContext;
pub use error::SurfaceErrorAction;
pub use frame::{DrawCall, FrameCommands, VertexInput};
pub use gpu::{WgpuBackend, WgpuDevice};
pub use init::GpuInit;
pub use state::Device;
