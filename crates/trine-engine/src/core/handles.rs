use std::fmt;
use std::num::NonZeroU32;

macro_rules! object_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
        pub struct $name(NonZeroU32);

        impl $name {
            /// Object kind, used in diagnostics.
            pub const KIND: &'static str = $kind;

            #[inline]
            pub const fn new(raw: NonZeroU32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} #{}", $kind, self.0)
            }
        }
    };
}

object_handle!(
    /// Buffer object name.
    BufferId,
    "buffer"
);
object_handle!(
    /// Shader stage object name.
    ShaderId,
    "shader"
);
object_handle!(
    /// Program object name.
    ProgramId,
    "program"
);
object_handle!(
    /// Vertex-array object name.
    VertexArrayId,
    "vertex array"
);

/// Sequential name allocator.
///
/// Names start at 1 and are never reused within one device, so a stale handle
/// can not alias a newer object.
#[derive(Debug, Clone)]
pub struct HandleAllocator {
    /// `None` once every name has been handed out.
    next: Option<NonZeroU32>,
}

impl HandleAllocator {
    pub const fn new() -> Self {
        Self { next: Some(NonZeroU32::MIN) }
    }

    #[cfg(test)]
    pub(crate) const fn starting_at(next: NonZeroU32) -> Self {
        Self { next: Some(next) }
    }

    /// Next unused name, or `None` when the name space is exhausted.
    pub fn allocate(&mut self) -> Option<NonZeroU32> {
        let raw = self.next?;
        self.next = raw.checked_add(1);
        Some(raw)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
