use std::ops::BitOr;

use crate::shader::ShaderStage;

use super::error::DeviceError;
use super::handles::{BufferId, ProgramId, ShaderId, VertexArrayId};

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Binding point a buffer object is created for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

/// Element format of a vertex attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttribFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl AttribFormat {
    pub const fn components(self) -> u32 {
        match self {
            AttribFormat::Float32 => 1,
            AttribFormat::Float32x2 => 2,
            AttribFormat::Float32x3 => 3,
            AttribFormat::Float32x4 => 4,
        }
    }

    /// Size of one element in bytes.
    pub const fn size(self) -> u64 {
        self.components() as u64 * 4
    }
}

/// Layout of one vertex attribute inside its source buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct AttribLayout {
    pub format: AttribFormat,
    /// Byte distance between consecutive elements. `0` means tightly packed.
    pub stride: u64,
    pub offset: u64,
}

impl AttribLayout {
    pub const fn packed(format: AttribFormat) -> Self {
        Self { format, stride: 0, offset: 0 }
    }

    pub const fn effective_stride(&self) -> u64 {
        if self.stride == 0 { self.format.size() } else { self.stride }
    }
}

/// Index element type.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    Uint16,
    Uint32,
}

impl IndexFormat {
    pub const fn size(self) -> u64 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

/// Which buffers a clear affects.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct ClearMask {
    pub color: bool,
    pub depth: bool,
}

impl ClearMask {
    pub const COLOR: Self = Self { color: true, depth: false };
    pub const DEPTH: Self = Self { color: false, depth: true };
}

impl BitOr for ClearMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            color: self.color || rhs.color,
            depth: self.depth || rhs.depth,
        }
    }
}

/// Straight-alpha clear color.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const TRANSPARENT: Self = Self { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// What happened to a frame handed to [`GraphicsDevice::present`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PresentOutcome {
    Presented,
    /// Surface was reconfigured; the frame was dropped.
    Reconfigured,
    /// Transient acquisition failure; the frame was dropped.
    Skipped,
}

/// Handle-based graphics device.
///
/// Objects are named by opaque handles and live until deleted. Vertex
/// attribute and index-buffer bindings apply to the bound vertex array;
/// draws use the active program. `clear` and `draw_elements` record into the
/// pending frame, which `present` submits and shows.
pub trait GraphicsDevice {
    fn create_vertex_array(&mut self) -> DeviceResult<VertexArrayId>;
    fn bind_vertex_array(&mut self, vao: Option<VertexArrayId>) -> DeviceResult<()>;

    /// Creates a buffer and uploads `contents` into it. Contents are immutable
    /// afterwards.
    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> DeviceResult<BufferId>;

    /// Binds an index buffer to the bound vertex array.
    fn bind_index_buffer(&mut self, buffer: BufferId, format: IndexFormat) -> DeviceResult<()>;

    fn create_shader(&mut self, stage: ShaderStage) -> DeviceResult<ShaderId>;
    fn shader_source(&mut self, shader: ShaderId, source: &str) -> DeviceResult<()>;

    /// Compiles the shader's current source. Returns the compile status.
    fn compile_shader(&mut self, shader: ShaderId) -> DeviceResult<bool>;

    /// Length in bytes of the shader's info log.
    fn shader_info_log_len(&self, shader: ShaderId) -> DeviceResult<usize>;

    /// Copies as much of the info log as fits into `buf`; returns bytes written.
    fn shader_info_log(&self, shader: ShaderId, buf: &mut [u8]) -> DeviceResult<usize>;

    fn create_program(&mut self) -> DeviceResult<ProgramId>;
    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> DeviceResult<()>;

    /// Routes the named fragment output to color slot `slot`. Takes effect at
    /// the next link.
    fn bind_frag_data_location(
        &mut self,
        program: ProgramId,
        slot: u32,
        name: &str,
    ) -> DeviceResult<()>;

    /// Links the attached stages. Returns the link status.
    fn link_program(&mut self, program: ProgramId) -> DeviceResult<bool>;
    fn program_info_log_len(&self, program: ProgramId) -> DeviceResult<usize>;
    fn program_info_log(&self, program: ProgramId, buf: &mut [u8]) -> DeviceResult<usize>;

    fn use_program(&mut self, program: Option<ProgramId>) -> DeviceResult<()>;

    /// Location of a vertex attribute of a linked program.
    fn attrib_location(&self, program: ProgramId, name: &str) -> DeviceResult<Option<u32>>;

    fn enable_vertex_attrib(&mut self, location: u32) -> DeviceResult<()>;
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        buffer: BufferId,
        layout: AttribLayout,
    ) -> DeviceResult<()>;

    fn clear(&mut self, mask: ClearMask, color: ClearColor);

    /// Records an indexed triangle-list draw of `count` indices.
    fn draw_elements(&mut self, count: u32) -> DeviceResult<()>;

    fn present(&mut self) -> DeviceResult<PresentOutcome>;

    fn delete_program(&mut self, program: ProgramId) -> DeviceResult<()>;
    fn delete_shader(&mut self, shader: ShaderId) -> DeviceResult<()>;
    fn delete_buffer(&mut self, buffer: BufferId) -> DeviceResult<()>;
    fn delete_vertex_array(&mut self, vao: VertexArrayId) -> DeviceResult<()>;

    /// Number of objects created and not yet deleted.
    fn live_objects(&self) -> usize;
}
