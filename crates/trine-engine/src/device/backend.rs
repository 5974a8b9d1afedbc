use anyhow::Result;

use crate::core::{BufferId, BufferTarget, DeviceResult, PresentOutcome, ProgramId};
use crate::shader::ProgramInterface;

use super::frame::FrameCommands;

/// Stage sources of a freshly linked program.
#[derive(Debug, Clone, Copy)]
pub struct ProgramSources<'a> {
    pub vertex: &'a str,
    pub fragment: &'a str,
    pub interface: &'a ProgramInterface,
}

/// GPU-side half of a [`Device`](super::Device).
///
/// The device front keeps object bookkeeping and validation; a backend only
/// owns the GPU resources behind the handles and executes validated frames.
pub trait Backend {
    fn upload_buffer(&mut self, id: BufferId, target: BufferTarget, contents: &[u8]) -> Result<()>;
    fn release_buffer(&mut self, id: BufferId);

    /// Builds GPU shader modules for a program that linked successfully.
    fn prepare_program(&mut self, id: ProgramId, sources: ProgramSources<'_>) -> Result<()>;
    fn release_program(&mut self, id: ProgramId);

    /// Executes and presents one frame.
    fn submit(&mut self, frame: FrameCommands) -> DeviceResult<PresentOutcome>;
}
