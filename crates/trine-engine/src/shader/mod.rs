//! Shader compiler front-end.
//!
//! Compiles WGSL stage sources and links stage pairs without touching the GPU.
//! `naga` does the parsing and validation; this module turns its results into
//! a compile status, a human-readable info log and the reflected stage
//! interface (located inputs and outputs) that the device needs to wire
//! vertex attributes and color targets.

mod compile;
mod link;

pub use compile::{compile, CompiledShader, ShaderStage, ShaderVariable, StageInterface};
pub use link::{link, FragDataBinding, LinkedProgram, ProgramInterface};
