use std::fmt::Write as _;

use super::compile::{CompiledShader, ShaderStage, ShaderVariable};

/// A request to route a named fragment output to a color slot.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FragDataBinding {
    pub slot: u32,
    pub name: String,
}

/// Interface of a linked program.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ProgramInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    /// Vertex attributes, sorted by location.
    pub attributes: Vec<ShaderVariable>,
    /// Fragment color outputs, sorted by slot.
    pub color_outputs: Vec<ShaderVariable>,
}

/// Link result. A linked program may still carry warnings in its log.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    log: String,
    interface: Option<ProgramInterface>,
}

impl LinkedProgram {
    pub fn is_linked(&self) -> bool {
        self.interface.is_some()
    }

    pub fn log(&self) -> &str {
        &self.log
    }

    pub fn interface(&self) -> Option<&ProgramInterface> {
        self.interface.as_ref()
    }

    /// Location of the named vertex attribute, if the program is linked and
    /// declares it.
    pub fn attrib_location(&self, name: &str) -> Option<u32> {
        self.interface
            .as_ref()?
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.location)
    }

    pub(crate) fn failed(log: String) -> Self {
        Self { log, interface: None }
    }
}

/// Links the attached stages into a program.
///
/// Exactly one compiled vertex stage and one compiled fragment stage are
/// required. Every fragment input must be fed by a vertex output at the same
/// location. A frag-data binding that names an output declared at another
/// location fails the link; one that names no output is only a warning.
pub fn link(stages: &[&CompiledShader], bindings: &[FragDataBinding]) -> LinkedProgram {
    let vertex = match single_stage(stages, ShaderStage::Vertex) {
        Ok(s) => s,
        Err(log) => return LinkedProgram::failed(log),
    };
    let fragment = match single_stage(stages, ShaderStage::Fragment) {
        Ok(s) => s,
        Err(log) => return LinkedProgram::failed(log),
    };

    let (Some(vs), Some(fs)) = (vertex.interface(), fragment.interface()) else {
        return LinkedProgram::failed(
            "error: attached shaders must be compiled successfully before linking\n".to_string(),
        );
    };

    let mut errors = String::new();
    let mut warnings = String::new();

    for input in &fs.inputs {
        if !vs.outputs.iter().any(|o| o.location == input.location) {
            let _ = writeln!(
                errors,
                "error: fragment input `{}` at location {} is not written by the vertex stage",
                input.name, input.location
            );
        }
    }

    for binding in bindings {
        match fs.outputs.iter().find(|o| o.name == binding.name) {
            Some(out) if out.location != binding.slot => {
                let _ = writeln!(
                    errors,
                    "error: fragment output `{}` is declared at location {} but bound to slot {}",
                    out.name, out.location, binding.slot
                );
            }
            Some(_) => {}
            None => {
                let _ = writeln!(
                    warnings,
                    "warning: frag data binding `{}` does not name a fragment output",
                    binding.name
                );
            }
        }
    }

    if !errors.is_empty() {
        errors.push_str(&warnings);
        return LinkedProgram::failed(errors);
    }

    LinkedProgram {
        log: warnings,
        interface: Some(ProgramInterface {
            vertex_entry: vs.entry_point.clone(),
            fragment_entry: fs.entry_point.clone(),
            attributes: vs.inputs.clone(),
            color_outputs: fs.outputs.clone(),
        }),
    }
}

fn single_stage<'a>(
    stages: &[&'a CompiledShader],
    stage: ShaderStage,
) -> Result<&'a CompiledShader, String> {
    let mut found = stages.iter().copied().filter(|s| s.stage() == stage);
    match (found.next(), found.next()) {
        (Some(s), None) => Ok(s),
        (None, _) => Err(format!("error: no {stage} shader attached\n")),
        (Some(_), Some(_)) => Err(format!("error: more than one {stage} shader attached\n")),
    }
}
