//! WGSL front end shared by every backend.
//!
//! A stage is compiled by parsing and validating it with naga and then
//! reflecting its entry point interface and uniform globals. Linking checks
//! that the reflected vertex and fragment interfaces agree.

use std::collections::BTreeMap;
use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::renderer::backend::ScalarType;

use super::source::StageKind;
use super::uniform::UniformType;

/// Type of one entry point input/output location.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct IoType {
    pub scalar: ScalarType,
    pub components: u32,
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scalar = match self.scalar {
            ScalarType::Float32 => "f32",
            ScalarType::Int32 => "i32",
        };
        match self.components {
            1 => f.write_str(scalar),
            n => write!(f, "vec{n}<{scalar}>"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct IoSlot {
    pub location: u32,
    pub ty: IoType,
}

/// A `var<uniform>` global.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct UniformDecl {
    pub name: String,
    pub ty: UniformType,
    pub group: u32,
    pub binding: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CompiledStage {
    pub kind: StageKind,
    pub source: String,
    pub entry_point: String,
    pub inputs: Vec<IoSlot>,
    pub outputs: Vec<IoSlot>,
    pub uniforms: Vec<UniformDecl>,
}

/// A vertex/fragment pair whose interfaces agree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LinkedProgram {
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    /// Union of both stages' uniforms, ordered by `(group, binding)`.
    pub uniforms: Vec<UniformDecl>,
}

impl LinkedProgram {
    pub fn uniform_index(&self, name: &str) -> Option<usize> {
        self.uniforms.iter().position(|u| u.name == name)
    }

    pub fn vertex_inputs(&self) -> &[IoSlot] {
        &self.vertex.inputs
    }
}

/// Compiles one WGSL stage. The error is a human-readable compiler log.
pub(crate) fn compile_stage(kind: StageKind, source: &str) -> Result<CompiledStage, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    let wanted = match kind {
        StageKind::Vertex => naga::ShaderStage::Vertex,
        StageKind::Fragment => naga::ShaderStage::Fragment,
    };
    let entry = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == wanted)
        .ok_or_else(|| format!("no @{kind} entry point"))?;

    let mut inputs = Vec::new();
    for arg in &entry.function.arguments {
        collect_io(&module, arg.ty, arg.binding.as_ref(), &mut inputs)?;
    }

    let mut outputs = Vec::new();
    if let Some(result) = &entry.function.result {
        collect_io(&module, result.ty, result.binding.as_ref(), &mut outputs)?;
    }

    let mut uniforms = Vec::new();
    for (_, global) in module.global_variables.iter() {
        let Some(binding) = &global.binding else {
            continue;
        };
        let name = global.name.clone().unwrap_or_default();
        if global.space != naga::AddressSpace::Uniform {
            return Err(format!(
                "`{name}` at @group({}) @binding({}): only uniform bindings are supported",
                binding.group, binding.binding
            ));
        }
        let ty = uniform_type(&module, global.ty)
            .ok_or_else(|| format!("uniform `{name}` has an unsupported type"))?;
        uniforms.push(UniformDecl {
            name,
            ty,
            group: binding.group,
            binding: binding.binding,
        });
    }

    Ok(CompiledStage {
        kind,
        source: source.to_owned(),
        entry_point: entry.name.clone(),
        inputs,
        outputs,
        uniforms,
    })
}

/// Links one vertex and one fragment stage. The error is a linker log.
pub(crate) fn link_stages(stages: &[&CompiledStage]) -> Result<LinkedProgram, String> {
    let find = |kind: StageKind| stages.iter().find(|s| s.kind == kind).copied();

    let vertex = find(StageKind::Vertex).ok_or("no vertex stage attached")?;
    let fragment = find(StageKind::Fragment).ok_or("no fragment stage attached")?;

    let mut log = Vec::new();

    for input in &fragment.inputs {
        match vertex.outputs.iter().find(|o| o.location == input.location) {
            None => log.push(format!(
                "fragment input @location({}) is not written by the vertex stage",
                input.location
            )),
            Some(output) if output.ty != input.ty => log.push(format!(
                "@location({}) is {} in the vertex stage but {} in the fragment stage",
                input.location, output.ty, input.ty
            )),
            Some(_) => {}
        }
    }

    let mut merged: BTreeMap<(u32, u32), UniformDecl> = BTreeMap::new();
    for decl in vertex.uniforms.iter().chain(&fragment.uniforms) {
        match merged.get(&(decl.group, decl.binding)) {
            None => {
                merged.insert((decl.group, decl.binding), decl.clone());
            }
            Some(existing) if existing.name != decl.name || existing.ty != decl.ty => {
                log.push(format!(
                    "@group({}) @binding({}) is `{}: {}` in one stage and `{}: {}` in the other",
                    decl.group, decl.binding, existing.name, existing.ty, decl.name, decl.ty
                ));
            }
            Some(_) => {}
        }
    }

    let uniforms: Vec<UniformDecl> = merged.into_values().collect();
    for (i, decl) in uniforms.iter().enumerate() {
        if uniforms[..i].iter().any(|u| u.name == decl.name) {
            log.push(format!("uniform `{}` is bound at more than one location", decl.name));
        }
    }

    if !log.is_empty() {
        return Err(log.join("\n"));
    }

    Ok(LinkedProgram {
        vertex: vertex.clone(),
        fragment: fragment.clone(),
        uniforms,
    })
}

fn collect_io(
    module: &naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut Vec<IoSlot>,
) -> Result<(), String> {
    match binding {
        Some(naga::Binding::BuiltIn(_)) => Ok(()),
        Some(naga::Binding::Location { location, .. }) => {
            let ty = io_type(module, ty)
                .ok_or_else(|| format!("@location({location}) has an unsupported type"))?;
            out.push(IoSlot {
                location: *location,
                ty,
            });
            Ok(())
        }
        None => match &module.types[ty].inner {
            naga::TypeInner::Struct { members, .. } => {
                for member in members {
                    collect_io(module, member.ty, member.binding.as_ref(), out)?;
                }
                Ok(())
            }
            _ => Err("entry point argument without a binding".to_owned()),
        },
    }
}

fn scalar_type(scalar: naga::Scalar) -> Option<ScalarType> {
    match (scalar.kind, scalar.width) {
        (naga::ScalarKind::Float, 4) => Some(ScalarType::Float32),
        (naga::ScalarKind::Sint, 4) => Some(ScalarType::Int32),
        _ => None,
    }
}

fn io_type(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Option<IoType> {
    match module.types[ty].inner {
        naga::TypeInner::Scalar(scalar) => Some(IoType {
            scalar: scalar_type(scalar)?,
            components: 1,
        }),
        naga::TypeInner::Vector { size, scalar } => Some(IoType {
            scalar: scalar_type(scalar)?,
            components: size as u32,
        }),
        _ => None,
    }
}

fn uniform_type(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Option<UniformType> {
    use naga::VectorSize::{Bi, Quad, Tri};

    match module.types[ty].inner {
        naga::TypeInner::Scalar(scalar) => match scalar_type(scalar)? {
            ScalarType::Float32 => Some(UniformType::Float),
            ScalarType::Int32 => Some(UniformType::Int),
        },
        naga::TypeInner::Vector { size, scalar } if scalar_type(scalar)? == ScalarType::Float32 => {
            match size {
                Bi => Some(UniformType::Float2),
                Tri => Some(UniformType::Float3),
                Quad => Some(UniformType::Float4),
            }
        }
        naga::TypeInner::Matrix {
            columns: Tri,
            rows: Tri,
            scalar,
        } if scalar_type(scalar)? == ScalarType::Float32 => Some(UniformType::Mat3),
        naga::TypeInner::Matrix {
            columns: Quad,
            rows: Quad,
            scalar,
        } if scalar_type(scalar)? == ScalarType::Float32 => Some(UniformType::Mat4),
        _ => None,
    }
}
