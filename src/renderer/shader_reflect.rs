//! WGSL compilation, program linking and interface reflection.
//!
//! Compilation parses and validates one stage with naga. Linking checks the
//! two stages against each other and extracts the active attributes (vertex
//! inputs) and active uniforms (`var<uniform>` globals in group 0).

use std::collections::BTreeMap;

use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{AddressSpace, Binding, EntryPoint, Handle, Module, ScalarKind, Type, TypeInner, VectorSize};

use crate::renderer::device::{ActiveVariable, ShaderStage, VariableKind};
use crate::renderer::objects::ShaderObject;

/// Everything a backend needs from a successfully linked program.
#[derive(Debug, Clone)]
pub(crate) struct LinkedProgram {
    pub vertex_source: String,
    pub fragment_source: String,
    pub vertex_entry: String,
    pub fragment_entry: String,
    /// Sorted by location.
    pub attributes: Vec<ActiveVariable>,
    /// Sorted by binding.
    pub uniforms: Vec<ActiveVariable>,
}

struct IoVariable {
    name: String,
    location: u32,
    kind: Option<VariableKind>,
}

fn naga_stage(stage: ShaderStage) -> naga::ShaderStage {
    match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    }
}

fn entry_point(module: &Module, stage: ShaderStage) -> Option<&EntryPoint> {
    let wanted = naga_stage(stage);
    module.entry_points.iter().find(|ep| ep.stage == wanted)
}

/// Parses and validates `source`, which must declare an entry point for `stage`.
/// Only the features enabled by `capabilities` may be used.
///
/// The error is the diagnostic log.
pub(crate) fn compile(stage: ShaderStage, source: &str, capabilities: Capabilities) -> Result<Module, String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    Validator::new(ValidationFlags::all(), capabilities)
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    if entry_point(&module, stage).is_none() {
        let attr = match stage {
            ShaderStage::Vertex => "@vertex",
            ShaderStage::Fragment => "@fragment",
        };
        return Err(format!("error: no {attr} entry point declared"));
    }
    Ok(module)
}

fn variable_kind(module: &Module, ty: Handle<Type>) -> Option<VariableKind> {
    match &module.types[ty].inner {
        TypeInner::Scalar(scalar) => match (scalar.kind, scalar.width) {
            (ScalarKind::Float, 4) => Some(VariableKind::Float),
            (ScalarKind::Sint, 4) => Some(VariableKind::Int),
            _ => None,
        },
        TypeInner::Vector { size, scalar } if scalar.kind == ScalarKind::Float && scalar.width == 4 => {
            Some(match size {
                VectorSize::Bi => VariableKind::Vec2,
                VectorSize::Tri => VariableKind::Vec3,
                VectorSize::Quad => VariableKind::Vec4,
            })
        }
        TypeInner::Matrix {
            columns: VectorSize::Quad,
            rows: VectorSize::Quad,
            scalar,
        } if scalar.width == 4 => Some(VariableKind::Mat4),
        _ => None,
    }
}

/// Flattens entry point arguments or results into located variables,
/// descending into structs.
fn collect_io(
    module: &Module,
    name: Option<&String>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<IoVariable>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(IoVariable {
            name: name.cloned().unwrap_or_default(),
            location: *location,
            kind: variable_kind(module, ty),
        }),
        Some(_) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_io(module, member.name.as_ref(), member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn inputs(module: &Module, ep: &EntryPoint) -> Vec<IoVariable> {
    let mut out = Vec::new();
    for arg in &ep.function.arguments {
        collect_io(module, arg.name.as_ref(), arg.ty, arg.binding.as_ref(), &mut out);
    }
    out
}

fn outputs(module: &Module, ep: &EntryPoint) -> Vec<IoVariable> {
    let mut out = Vec::new();
    if let Some(result) = &ep.function.result {
        collect_io(module, None, result.ty, result.binding.as_ref(), &mut out);
    }
    out
}

fn collect_uniforms(
    module: &Module,
    stage: &str,
    uniforms: &mut BTreeMap<u32, ActiveVariable>,
    errors: &mut Vec<String>,
) {
    for (_, var) in module.global_variables.iter() {
        let name = var.name.clone().unwrap_or_default();
        match var.space {
            AddressSpace::Uniform => {}
            AddressSpace::Function | AddressSpace::Private | AddressSpace::WorkGroup => continue,
            _ => {
                errors.push(format!("{stage}: resource `{name}` is not a supported uniform"));
                continue;
            }
        }
        let Some(binding) = &var.binding else {
            errors.push(format!("{stage}: uniform `{name}` has no @binding"));
            continue;
        };
        if binding.group != 0 {
            errors.push(format!(
                "{stage}: uniform `{name}` is in @group({}), only group 0 is supported",
                binding.group
            ));
            continue;
        }
        let Some(kind) = variable_kind(module, var.ty).filter(|k| k.is_uniform_kind()) else {
            errors.push(format!(
                "{stage}: uniform `{name}` must be f32, i32, vec3<f32> or mat4x4<f32>"
            ));
            continue;
        };

        match uniforms.get(&binding.binding) {
            Some(existing) if existing.name != name || existing.kind != kind => {
                errors.push(format!(
                    "uniform binding {} declared as `{}: {}` and `{name}: {}`",
                    binding.binding,
                    existing.name,
                    existing.kind.wgsl_name(),
                    kind.wgsl_name()
                ));
            }
            Some(_) => {}
            None => {
                if let Some(other) = uniforms.values().find(|u| u.name == name) {
                    errors.push(format!(
                        "uniform `{name}` declared at bindings {} and {}",
                        other.location, binding.binding
                    ));
                    continue;
                }
                uniforms.insert(
                    binding.binding,
                    ActiveVariable {
                        name,
                        location: binding.binding,
                        kind,
                    },
                );
            }
        }
    }
}

/// Links a compiled vertex and fragment shader. The error is the link log.
///
/// Every uniform takes one dynamic-offset binding, so at most `max_uniforms`
/// may be declared across both stages.
pub(crate) fn link(
    vertex: &ShaderObject,
    fragment: &ShaderObject,
    max_uniforms: u32,
) -> Result<LinkedProgram, String> {
    if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
        return Err("error: program needs one vertex and one fragment shader".to_string());
    }
    let (Some(vs), Some(fs)) = (vertex.module.as_ref(), fragment.module.as_ref()) else {
        return Err("error: attached shaders must be compiled successfully before linking".to_string());
    };
    let (Some(vs_entry), Some(fs_entry)) = (
        entry_point(vs, ShaderStage::Vertex),
        entry_point(fs, ShaderStage::Fragment),
    ) else {
        return Err("error: missing vertex or fragment entry point".to_string());
    };

    let mut errors = Vec::new();

    let mut attributes = Vec::new();
    for input in inputs(vs, vs_entry) {
        match input.kind.filter(|k| k.is_attribute_kind()) {
            Some(kind) => attributes.push(ActiveVariable {
                name: input.name,
                location: input.location,
                kind,
            }),
            None => errors.push(format!(
                "vertex: attribute `{}` at location {} must be a float scalar or vector",
                input.name, input.location
            )),
        }
    }
    attributes.sort_by_key(|a| a.location);

    let varyings = outputs(vs, vs_entry);
    for input in inputs(fs, fs_entry) {
        match varyings.iter().find(|v| v.location == input.location) {
            None => errors.push(format!(
                "fragment: input `{}` at location {} is not written by the vertex stage",
                input.name, input.location
            )),
            Some(v) if v.kind != input.kind => errors.push(format!(
                "fragment: input `{}` at location {} does not match the type of vertex output `{}`",
                input.name, input.location, v.name
            )),
            Some(_) => {}
        }
    }

    if !outputs(fs, fs_entry).iter().any(|o| o.location == 0) {
        errors.push("fragment: no color output at location 0".to_string());
    }

    let mut uniforms = BTreeMap::new();
    collect_uniforms(vs, "vertex", &mut uniforms, &mut errors);
    collect_uniforms(fs, "fragment", &mut uniforms, &mut errors);
    if uniforms.len() > max_uniforms as usize {
        errors.push(format!(
            "program declares {} uniforms, the device allows at most {max_uniforms}",
            uniforms.len()
        ));
    }

    if !errors.is_empty() {
        return Err(errors.join("\n"));
    }

    Ok(LinkedProgram {
        vertex_source: vertex.source.clone(),
        fragment_source: fragment.source.clone(),
        vertex_entry: vs_entry.name.clone(),
        fragment_entry: fs_entry.name.clone(),
        attributes,
        uniforms: uniforms.into_values().collect(),
    })
}
