use crate::core::{AttribLayout, BufferId, ClearColor, IndexFormat, ProgramId, VertexArrayId};

/// One vertex attribute fed from a buffer, resolved at draw time.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexInput {
    pub location: u32,
    pub buffer: BufferId,
    pub layout: AttribLayout,
}

/// A validated indexed draw.
///
/// Everything the backend needs is captured here, so later binding changes do
/// not affect draws already recorded in the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: ProgramId,
    pub vertex_array: VertexArrayId,
    /// Sorted by location.
    pub inputs: Vec<VertexInput>,
    pub index_buffer: BufferId,
    pub index_format: IndexFormat,
    pub count: u32,
}

/// Commands recorded for the frame currently being built.
///
/// Short-lived: taken and handed to the backend on present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameCommands {
    /// Color to clear to before the first draw; `None` keeps the previous contents.
    pub clear: Option<ClearColor>,
    pub clear_depth: bool,
    pub draws: Vec<DrawCall>,
}

impl FrameCommands {
    pub fn is_empty(&self) -> bool {
        self.clear.is_none() && !self.clear_depth && self.draws.is_empty()
    }
}
