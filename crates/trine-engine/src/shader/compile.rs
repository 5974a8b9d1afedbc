use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};

/// Programmable pipeline stage a shader object compiles for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    fn to_naga(self) -> naga::ShaderStage {
        match self {
            ShaderStage::Vertex => naga::ShaderStage::Vertex,
            ShaderStage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// A located stage input or output (`@location(n) name`).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ShaderVariable {
    pub name: String,
    pub location: u32,
}

/// Reflected entry point of a successfully compiled stage.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StageInterface {
    pub entry_point: String,
    /// Located inputs, sorted by location.
    pub inputs: Vec<ShaderVariable>,
    /// Located outputs, sorted by location.
    pub outputs: Vec<ShaderVariable>,
}

/// Result of compiling one stage.
///
/// The info log is empty on success and carries the rendered diagnostic on
/// failure.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    stage: ShaderStage,
    log: String,
    interface: Option<StageInterface>,
}

impl CompiledShader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn is_compiled(&self) -> bool {
        self.interface.is_some()
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn interface(&self) -> Option<&StageInterface> {
        self.interface.as_ref()
    }

    /// State of a shader object before its first compile.
    pub(crate) fn pending(stage: ShaderStage) -> Self {
        Self::failed(stage, String::new())
    }

    fn failed(stage: ShaderStage, log: String) -> Self {
        Self { stage, log, interface: None }
    }
}

/// Compiles `source` as the given stage.
///
/// The source must contain an entry point for `stage`; other entry points are
/// ignored. Never panics on bad input: every failure becomes a log.
pub fn compile(stage: ShaderStage, source: &str) -> CompiledShader {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(err) => return CompiledShader::failed(stage, err.emit_to_string(source)),
    };

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::default());
    if let Err(err) = validator.validate(&module) {
        return CompiledShader::failed(stage, err.emit_to_string(source));
    }

    let Some(entry) = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage.to_naga())
    else {
        return CompiledShader::failed(
            stage,
            format!("error: no {stage} entry point found in shader source\n"),
        );
    };

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_located(&module, arg.name.as_deref(), arg.ty, arg.binding.as_ref(), &mut inputs);
    }

    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_located(&module, None, result.ty, result.binding.as_ref(), &mut outputs);
    }

    inputs.sort_by_key(|v| v.location);
    outputs.sort_by_key(|v| v.location);

    log::debug!(
        "compiled {stage} entry point `{}` ({} inputs, {} outputs)",
        entry.name,
        inputs.len(),
        outputs.len()
    );

    CompiledShader {
        stage,
        log: String::new(),
        interface: Some(StageInterface {
            entry_point: entry.name.clone(),
            inputs,
            outputs,
        }),
    }
}

/// Collects `@location` bindings from an argument/result, descending into
/// struct members (the WGSL idiom for multiple outputs).
fn collect_located(
    module: &naga::Module,
    name: Option<&str>,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<ShaderVariable>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => out.push(ShaderVariable {
            name: name.unwrap_or_default().to_string(),
            location: *location,
        }),
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_located(
                        module,
                        member.name.as_deref(),
                        member.ty,
                        member.binding.as_ref(),
                        out,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{FRAGMENT_SHADER_SOURCE, VERTEX_SHADER_SOURCE};

    #[test]
    fn vertex_stage_reflects_position_input() {
        let shader = compile(ShaderStage::Vertex, VERTEX_SHADER_SOURCE);
        assert!(shader.is_compiled(), "log: {}", shader.log());
        assert!(shader.log().is_empty());

        let iface = shader.interface().unwrap();
        assert_eq!(iface.entry_point, "main");
        assert_eq!(
            iface.inputs,
            vec![ShaderVariable { name: "position".into(), location: 0 }]
        );
        // The clip-space position is a builtin, not a located output.
        assert!(iface.outputs.is_empty());
    }

    #[test]
    fn fragment_stage_reflects_struct_output() {
        let shader = compile(ShaderStage::Fragment, FRAGMENT_SHADER_SOURCE);
        assert!(shader.is_compiled(), "log: {}", shader.log());
        let iface = shader.interface().unwrap();
        assert_eq!(
            iface.outputs,
            vec![ShaderVariable { name: "outColor".into(), location: 0 }]
        );
    }

    #[test]
    fn syntax_error_produces_log() {
        let shader = compile(ShaderStage::Vertex, "@vertex fn main( -> {");
        assert!(!shader.is_compiled());
        assert!(!shader.log().is_empty());
        assert!(shader.interface().is_none());
    }

    #[test]
    fn type_error_produces_log() {
        let src = "@vertex fn main() -> @builtin(position) vec4<f32> { return 1.0; }";
        let shader = compile(ShaderStage::Vertex, src);
        assert!(!shader.is_compiled());
        assert!(!shader.log().is_empty());
    }

    #[test]
    fn wrong_stage_is_a_compile_error() {
        let shader = compile(ShaderStage::Fragment, VERTEX_SHADER_SOURCE);
        assert!(!shader.is_compiled());
        assert!(shader.log().contains("no fragment entry point"));
    }
}
