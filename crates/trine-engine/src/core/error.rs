use std::fmt;

use super::device::BufferTarget;
use super::handles::{BufferId, ProgramId, VertexArrayId};

/// Failure of a [`GraphicsDevice`](super::GraphicsDevice) call.
#[derive(Debug)]
pub enum DeviceError {
    /// The handle was never created or was already deleted.
    UnknownHandle { kind: &'static str, id: u32 },
    /// A buffer was used at a binding point it was not created for.
    WrongBufferTarget { buffer: BufferId, expected: BufferTarget },
    /// The program has not been linked successfully.
    ProgramNotLinked(ProgramId),
    NoActiveProgram,
    NoVertexArrayBound,
    /// The active program reads an attribute the vertex array does not feed.
    AttributeNotEnabled { vao: VertexArrayId, location: u32 },
    MissingIndexBuffer(VertexArrayId),
    /// The draw reads past the end of the index buffer.
    IndexRangeOutOfBounds { buffer: BufferId, count: u32 },
    /// Every object name has been handed out.
    HandlesExhausted,
    /// The surface can no longer be presented to.
    SurfaceLost,
    /// Backend failure not covered above.
    Backend(anyhow::Error),
}

impl DeviceError {
    pub(crate) fn unknown(kind: &'static str, id: u32) -> Self {
        DeviceError::UnknownHandle { kind, id }
    }

    /// Whether the device can no longer render at all.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DeviceError::SurfaceLost)
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::UnknownHandle { kind, id } => write!(f, "unknown {kind} #{id}"),
            DeviceError::WrongBufferTarget { buffer, expected } => {
                write!(f, "{buffer} is not a {expected:?} buffer")
            }
            DeviceError::ProgramNotLinked(p) => write!(f, "{p} is not linked"),
            DeviceError::NoActiveProgram => f.write_str("no program in use"),
            DeviceError::NoVertexArrayBound => f.write_str("no vertex array bound"),
            DeviceError::AttributeNotEnabled { vao, location } => {
                write!(f, "attribute {location} is not enabled on {vao}")
            }
            DeviceError::MissingIndexBuffer(vao) => write!(f, "{vao} has no index buffer"),
            DeviceError::IndexRangeOutOfBounds { buffer, count } => {
                write!(f, "drawing {count} indices overruns {buffer}")
            }
            DeviceError::HandlesExhausted => f.write_str("out of object names"),
            DeviceError::SurfaceLost => f.write_str("surface lost"),
            DeviceError::Backend(e) => write!(f, "backend error: {e:#}"),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Backend(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for DeviceError {
    fn from(e: anyhow::Error) -> Self {
        DeviceError::Backend(e)
    }
}
