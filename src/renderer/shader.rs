//! Shader programs and the names the engine binds in them.
//!
//! Both programs are checked against a fixed contract before any pipeline is
//! built: technique names and stages, parameter bindings, resource kinds and
//! uniform member offsets. A program that would not fit the engine's bind
//! group layouts is reported as a [`LightingError`] instead of a device panic.

use std::borrow::Cow;
use std::mem::{offset_of, size_of};

use super::composite::CompositeParams;
use super::light::{FrameParams, LightParams};
use crate::error::{LightingError, Result};

pub const LIGHT_SHADER: &str = include_str!("light_map.wgsl");
pub const COMPOSITE_SHADER: &str = include_str!("composite.wgsl");

/// Vertex entry point shared by every full-screen quad draw.
pub const VERTEX_ENTRY: &str = "vs_screen_quad";
pub const COMPOSITE_TECHNIQUE: &str = "deferred_light_effect";

/// Fragment technique used for one light.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Technique {
    PointLight,
    SpotLight,
}

impl Technique {
    pub fn entry_point(self) -> &'static str {
        match self {
            Technique::PointLight => "deferred_point_light",
            Technique::SpotLight => "deferred_spot_light",
        }
    }
}

/// A uniform struct member the engine writes at a fixed byte offset.
#[derive(Debug)]
pub struct Member {
    pub name: &'static str,
    pub offset: u32,
}

const fn member(name: &'static str, offset: usize) -> Member {
    Member { name, offset: offset as u32 }
}

/// What the engine's bind group layout puts at a binding.
#[derive(Debug)]
pub enum ResourceKind {
    /// `var<uniform>` struct of exactly `size` bytes.
    Uniform { size: u32, members: &'static [Member] },
    /// `texture_2d<f32>`
    Texture,
    /// Non-comparison `sampler`.
    Sampler,
}

impl ResourceKind {
    fn describe(&self) -> String {
        match self {
            ResourceKind::Uniform { size, .. } => format!("a {} byte uniform struct", size),
            ResourceKind::Texture => "texture_2d<f32>".to_string(),
            ResourceKind::Sampler => "sampler".to_string(),
        }
    }
}

/// A resource the engine binds by name.
#[derive(Debug)]
pub struct Parameter {
    pub name: &'static str,
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
}

#[derive(Debug)]
pub struct EntryPoint {
    pub name: &'static str,
    pub stage: naga::ShaderStage,
}

#[derive(Debug)]
pub struct ShaderContract {
    pub name: &'static str,
    pub techniques: &'static [EntryPoint],
    pub parameters: &'static [Parameter],
}

const VERTEX: EntryPoint = EntryPoint { name: VERTEX_ENTRY, stage: naga::ShaderStage::Vertex };

pub const LIGHT_CONTRACT: ShaderContract = ShaderContract {
    name: "light",
    techniques: &[
        VERTEX,
        EntryPoint { name: "deferred_point_light", stage: naga::ShaderStage::Fragment },
        EntryPoint { name: "deferred_spot_light", stage: naga::ShaderStage::Fragment },
    ],
    parameters: &[
        Parameter {
            name: "frame",
            group: 0,
            binding: 0,
            kind: ResourceKind::Uniform {
                size: size_of::<FrameParams>() as u32,
                members: &[
                    member("ambient_color", offset_of!(FrameParams, ambient_color)),
                    member("screen_width", offset_of!(FrameParams, screen_width)),
                    member("screen_height", offset_of!(FrameParams, screen_height)),
                    member("invert_y", offset_of!(FrameParams, invert_y)),
                ],
            },
        },
        Parameter { name: "color_map", group: 0, binding: 1, kind: ResourceKind::Texture },
        Parameter { name: "normal_map", group: 0, binding: 2, kind: ResourceKind::Texture },
        Parameter { name: "map_sampler", group: 0, binding: 3, kind: ResourceKind::Sampler },
        Parameter {
            name: "light",
            group: 1,
            binding: 0,
            kind: ResourceKind::Uniform {
                size: size_of::<LightParams>() as u32,
                members: &[
                    member("light_color", offset_of!(LightParams, light_color)),
                    member("light_position", offset_of!(LightParams, light_position)),
                    member("light_strength", offset_of!(LightParams, light_strength)),
                    member("cone_direction", offset_of!(LightParams, cone_direction)),
                    member("light_decay", offset_of!(LightParams, light_decay)),
                    member("specular_strength", offset_of!(LightParams, specular_strength)),
                    member("cone_decay", offset_of!(LightParams, cone_decay)),
                ],
            },
        },
    ],
};

pub const COMPOSITE_CONTRACT: ShaderContract = ShaderContract {
    name: "composite",
    techniques: &[
        VERTEX,
        EntryPoint { name: COMPOSITE_TECHNIQUE, stage: naga::ShaderStage::Fragment },
    ],
    parameters: &[
        Parameter {
            name: "composite",
            group: 0,
            binding: 0,
            kind: ResourceKind::Uniform {
                size: size_of::<CompositeParams>() as u32,
                members: &[
                    member("ambient_color", offset_of!(CompositeParams, ambient_color)),
                    member("ambient", offset_of!(CompositeParams, ambient)),
                    member("light_ambient", offset_of!(CompositeParams, light_ambient)),
                ],
            },
        },
        Parameter { name: "color_map", group: 0, binding: 1, kind: ResourceKind::Texture },
        Parameter { name: "normal_map", group: 0, binding: 2, kind: ResourceKind::Texture },
        Parameter { name: "shading_map", group: 0, binding: 3, kind: ResourceKind::Texture },
        Parameter { name: "map_sampler", group: 0, binding: 4, kind: ResourceKind::Sampler },
    ],
};

/// WGSL sources for the two lighting programs.
#[derive(Clone, Debug)]
pub struct LightingShaders {
    pub light: Cow<'static, str>,
    pub composite: Cow<'static, str>,
}

impl Default for LightingShaders {
    fn default() -> Self {
        Self {
            light: Cow::Borrowed(LIGHT_SHADER),
            composite: Cow::Borrowed(COMPOSITE_SHADER),
        }
    }
}

impl LightingShaders {
    pub fn validate(&self) -> Result<()> {
        validate(&self.light, &LIGHT_CONTRACT)?;
        validate(&self.composite, &COMPOSITE_CONTRACT)
    }
}

fn describe_global(var: &naga::GlobalVariable, inner: &naga::TypeInner) -> String {
    match inner {
        naga::TypeInner::Image { dim, arrayed, class } => {
            format!("a {:?}{} {:?} texture", dim, if *arrayed { " array" } else { "" }, class)
        }
        naga::TypeInner::Sampler { comparison: true } => "a comparison sampler".to_string(),
        naga::TypeInner::Sampler { comparison: false } => "a sampler".to_string(),
        naga::TypeInner::Struct { span, .. } => format!("a {} byte {:?} struct", span, var.space),
        _ => format!("a {:?} value", var.space),
    }
}

fn check_kind(module: &naga::Module, contract: &ShaderContract, parameter: &Parameter, var: &naga::GlobalVariable) -> Result<()> {
    let inner = &module.types[var.ty].inner;
    let mismatch = || LightingError::ParameterLayout {
        shader: contract.name,
        parameter: parameter.name.to_string(),
        expected: parameter.kind.describe(),
        found: describe_global(var, inner),
    };

    match (&parameter.kind, inner) {
        (ResourceKind::Uniform { size, members: expected }, naga::TypeInner::Struct { members, span })
            if var.space == naga::AddressSpace::Uniform =>
        {
            for wanted in expected.iter() {
                let found = members
                    .iter()
                    .find(|m| m.name.as_deref() == Some(wanted.name))
                    .ok_or_else(|| LightingError::MissingParameter {
                        shader: contract.name,
                        parameter: format!("{}.{}", parameter.name, wanted.name),
                    })?;
                if found.offset != wanted.offset {
                    return Err(LightingError::ParameterLayout {
                        shader: contract.name,
                        parameter: format!("{}.{}", parameter.name, wanted.name),
                        expected: format!("byte offset {}", wanted.offset),
                        found: format!("byte offset {}", found.offset),
                    });
                }
            }
            if span != size {
                return Err(mismatch());
            }
            Ok(())
        }
        (
            ResourceKind::Texture,
            naga::TypeInner::Image {
                dim: naga::ImageDimension::D2,
                arrayed: false,
                class: naga::ImageClass::Sampled { kind: naga::ScalarKind::Float, multi: false },
            },
        ) => Ok(()),
        (ResourceKind::Sampler, naga::TypeInner::Sampler { comparison: false }) => Ok(()),
        _ => Err(mismatch()),
    }
}

/// Parses and validates `source`, then checks it against `contract`.
pub fn validate(source: &str, contract: &ShaderContract) -> Result<()> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| LightingError::ShaderParse {
        shader: contract.name,
        message: e.emit_to_string(source),
    })?;

    naga::valid::Validator::new(naga::valid::ValidationFlags::all(), naga::valid::Capabilities::empty())
        .validate(&module)
        .map_err(|e| LightingError::ShaderValidation {
            shader: contract.name,
            message: format!("{:?}", e),
        })?;

    for technique in contract.techniques {
        let entry_point = module
            .entry_points
            .iter()
            .find(|ep| ep.name == technique.name)
            .ok_or(LightingError::MissingTechnique { shader: contract.name, technique: technique.name })?;
        if entry_point.stage != technique.stage {
            return Err(LightingError::TechniqueStage {
                shader: contract.name,
                technique: technique.name,
                expected: technique.stage,
                found: entry_point.stage,
            });
        }
    }

    for parameter in contract.parameters {
        let var = module
            .global_variables
            .iter()
            .map(|(_, var)| var)
            .find(|var| var.name.as_deref() == Some(parameter.name))
            .ok_or_else(|| LightingError::MissingParameter {
                shader: contract.name,
                parameter: parameter.name.to_string(),
            })?;

        let (found_group, found_binding) = var
            .binding
            .as_ref()
            .map(|b| (b.group, b.binding))
            .unwrap_or((u32::MAX, u32::MAX));
        if (found_group, found_binding) != (parameter.group, parameter.binding) {
            return Err(LightingError::ParameterBinding {
                shader: contract.name,
                parameter: parameter.name,
                group: parameter.group,
                binding: parameter.binding,
                found_group,
                found_binding,
            });
        }

        check_kind(&module, contract, parameter, var)?;
    }

    Ok(())
}

pub fn create_module(device: &wgpu::Device, source: &str, label: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_shaders_are_valid() {
        LightingShaders::default().validate().unwrap();
    }

    #[test]
    fn test_blit_shader_parses() {
        let module = naga::front::wgsl::parse_str(include_str!("blit.wgsl")).unwrap();
        assert!(module.entry_points.iter().any(|ep| ep.name == "fs_blit"));
    }

    #[test]
    fn test_missing_technique() {
        let source = LIGHT_SHADER.replace("fn deferred_spot_light", "fn spot_light_renamed");
        match validate(&source, &LIGHT_CONTRACT) {
            Err(LightingError::MissingTechnique { shader, technique }) => {
                assert_eq!(shader, "light");
                assert_eq!(technique, "deferred_spot_light");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_missing_uniform_member() {
        let source = COMPOSITE_SHADER.replace("light_ambient", "light_boost");
        match validate(&source, &COMPOSITE_CONTRACT) {
            Err(LightingError::MissingParameter { parameter, .. }) => {
                assert_eq!(parameter, "composite.light_ambient");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_missing_texture() {
        let source = COMPOSITE_SHADER.replace("shading_map", "light_map");
        match validate(&source, &COMPOSITE_CONTRACT) {
            Err(LightingError::MissingParameter { parameter, .. }) => assert_eq!(parameter, "shading_map"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_misbound_parameter() {
        let source = LIGHT_SHADER.replace(
            "@group(1) @binding(0) var<uniform> light",
            "@group(1) @binding(5) var<uniform> light",
        );
        match validate(&source, &LIGHT_CONTRACT) {
            Err(LightingError::ParameterBinding { parameter, found_group, found_binding, .. }) => {
                assert_eq!(parameter, "light");
                assert_eq!((found_group, found_binding), (1, 5));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_reordered_members_are_rejected() {
        let source = LIGHT_SHADER.replace(
            "    light_strength: f32,\n    cone_direction: vec3<f32>,\n    light_decay: f32,",
            "    light_decay: f32,\n    cone_direction: vec3<f32>,\n    light_strength: f32,",
        );
        assert_ne!(source, LIGHT_SHADER);
        match validate(&source, &LIGHT_CONTRACT) {
            Err(LightingError::ParameterLayout { parameter, expected, found, .. }) => {
                assert_eq!(parameter, "light.light_strength");
                assert_eq!(expected, "byte offset 28");
                assert_eq!(found, "byte offset 44");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_oversized_uniform_is_rejected() {
        let source = LIGHT_SHADER.replace("    padding: vec2<f32>,\n}", "    padding: vec2<f32>,\n    extra: vec4<f32>,\n}");
        assert_ne!(source, LIGHT_SHADER);
        match validate(&source, &LIGHT_CONTRACT) {
            Err(LightingError::ParameterLayout { parameter, found, .. }) => {
                assert_eq!(parameter, "light");
                assert_eq!(found, "a 80 byte Uniform struct");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_storage_buffer_is_not_a_uniform() {
        let source = LIGHT_SHADER.replace("var<uniform> frame", "var<storage, read> frame");
        assert_ne!(source, LIGHT_SHADER);
        match validate(&source, &LIGHT_CONTRACT) {
            Err(LightingError::ParameterLayout { parameter, expected, .. }) => {
                assert_eq!(parameter, "frame");
                assert_eq!(expected, "a 32 byte uniform struct");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_texture_kind_is_checked() {
        for replacement in ["var normal_map: texture_2d<u32>", "var normal_map: sampler"] {
            let source = COMPOSITE_SHADER.replace("var normal_map: texture_2d<f32>", replacement);
            assert_ne!(source, COMPOSITE_SHADER);
            match validate(&source, &COMPOSITE_CONTRACT) {
                Err(LightingError::ParameterLayout { parameter, expected, .. }) => {
                    assert_eq!(parameter, "normal_map");
                    assert_eq!(expected, "texture_2d<f32>");
                }
                other => panic!("unexpected result {:?} for {}", other, replacement),
            }
        }
    }

    #[test]
    fn test_technique_stage_is_checked() {
        let source = COMPOSITE_SHADER.replace("fn deferred_light_effect(", "fn lit_effect(")
            + "\n@compute @workgroup_size(1)\nfn deferred_light_effect() {}\n";
        match validate(&source, &COMPOSITE_CONTRACT) {
            Err(LightingError::TechniqueStage { technique, expected, found, .. }) => {
                assert_eq!(technique, COMPOSITE_TECHNIQUE);
                assert_eq!(expected, naga::ShaderStage::Fragment);
                assert_eq!(found, naga::ShaderStage::Compute);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            validate("fn broken(", &LIGHT_CONTRACT),
            Err(LightingError::ShaderParse { shader: "light", .. })
        ));
    }
}
