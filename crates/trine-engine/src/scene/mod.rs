//! Embedded triangle resources.
//!
//! Everything the driver uploads or compiles lives here as named constants so
//! tests can substitute any piece through [`TriangleScene`].

use bytemuck::{Pod, Zeroable};

/// Vertex stage: passes the 2D position through to clip space.
pub const VERTEX_SHADER_SOURCE: &str = r#"
@vertex
fn main(@location(0) position: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(position, 0.0, 1.0);
}
"#;

/// Fragment stage: constant white, written through the `outColor` output.
pub const FRAGMENT_SHADER_SOURCE: &str = r#"
struct FragmentOutput {
    @location(0) outColor: vec4<f32>,
}

@fragment
fn main() -> FragmentOutput {
    var frag: FragmentOutput;
    frag.outColor = vec4<f32>(1.0, 1.0, 1.0, 1.0);
    return frag;
}
"#;

/// Name of the vertex attribute fed from the vertex buffer.
pub const POSITION_ATTRIBUTE: &str = "position";

/// Name of the fragment output routed to color slot 0.
pub const COLOR_OUTPUT: &str = "outColor";

/// One 2D position.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
}

pub const TRIANGLE_VERTICES: [Vertex; 3] = [
    Vertex { position: [0.0, 0.5] },
    Vertex { position: [0.5, -0.5] },
    Vertex { position: [-0.5, -0.5] },
];

pub const TRIANGLE_INDICES: [u32; 3] = [0, 1, 2];

/// The set of resources the driver draws.
#[derive(Debug, Copy, Clone)]
pub struct TriangleScene {
    pub vertex_shader: &'static str,
    pub fragment_shader: &'static str,
    pub vertices: &'static [Vertex],
    pub indices: &'static [u32],
}

impl TriangleScene {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.indices)
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

impl Default for TriangleScene {
    fn default() -> Self {
        Self {
            vertex_shader: VERTEX_SHADER_SOURCE,
            fragment_shader: FRAGMENT_SHADER_SOURCE,
            vertices: &TRIANGLE_VERTICES,
            indices: &TRIANGLE_INDICES,
        }
    }
}
