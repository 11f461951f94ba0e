//! CPU rendition of the light and composite shaders, pixel by pixel.
//!
//! Useful for probing what the GPU passes produce at a given point without a
//! readback, and for checking lighting behavior in plain unit tests.

use glam::{Vec2, Vec3, Vec4, Vec4Swizzles};

use super::config::{LightingConfig, LIGHT_AMBIENT};
use super::light::LightParams;
use super::light_map::collect_light_draws;
use super::registry::LightRegistry;
use super::shader::Technique;
use super::viewport::Rect;

const SPECULAR_POWER: f32 = 32.0;
const EPSILON: f32 = 1e-4;

/// What the color and normal maps hold at one pixel.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceSample {
    pub color: Vec4,
    /// Normal as stored in the normal map, each channel in `0..=1`.
    pub encoded_normal: Vec3,
}

impl SurfaceSample {
    /// A surface of `color` facing the viewer.
    pub fn flat(color: Vec4) -> Self {
        Self {
            color,
            encoded_normal: Vec3::new(0.5, 0.5, 1.0),
        }
    }
}

pub fn decode_normal(encoded: Vec3, invert_y: bool) -> Vec3 {
    let mut normal = encoded * 2.0 - Vec3::ONE;
    if invert_y {
        normal.y = -normal.y;
    }
    let len = normal.length();
    if len <= 0.0 {
        Vec3::Z
    } else {
        normal / len.max(EPSILON)
    }
}

/// Light map contribution of one light at `pixel` (target space).
pub fn light_contribution(params: &LightParams, technique: Technique, pixel: Vec2, surface: &SurfaceSample, invert_y: bool) -> Vec4 {
    let normal = decode_normal(surface.encoded_normal, invert_y);
    let to_light = Vec3::from(params.light_position) - pixel.extend(0.0);
    let dist = to_light.length();
    let to_light_dir = to_light / dist.max(EPSILON);

    let attenuation = (1.0 - dist / params.light_decay.max(EPSILON)).clamp(0.0, 1.0);
    let diffuse = normal.dot(to_light_dir).max(0.0);
    let half_dir = (to_light_dir + Vec3::Z).normalize();
    let specular = normal.dot(half_dir).max(0.0).powf(SPECULAR_POWER) * params.specular_strength;

    let cone = match technique {
        Technique::PointLight => 1.0,
        Technique::SpotLight => {
            let along = (-to_light_dir).dot(Vec3::from(params.cone_direction).normalize());
            if along > 0.0 {
                along.max(EPSILON).powf(params.cone_decay)
            } else {
                0.0
            }
        }
    };

    let intensity = attenuation * cone * params.light_strength;
    let color = Vec3::from_slice(&params.light_color[..3]);
    let rgb = color * intensity * (diffuse + specular) * surface.color.w;
    rgb.extend(intensity.clamp(0.0, 1.0))
}

/// Final color for a surface given the accumulated light at that pixel.
pub fn composite(color: Vec4, light: Vec3, config: &LightingConfig) -> Vec4 {
    let ambient = config.ambient_color.xyz() * config.ambient_power;
    let rgb = (color.xyz() * (ambient + light * LIGHT_AMBIENT)).clamp(Vec3::ZERO, Vec3::ONE);
    rgb.extend(color.w)
}

/// Sum of every drawn light at `pixel`, as the accumulation pass would
/// leave it in the light map.
pub fn accumulate(lights: &LightRegistry, config: &LightingConfig, viewport: Option<Rect>, pixel: Vec2, surface: &SurfaceSample) -> Vec4 {
    let (draws, _) = collect_light_draws(lights, viewport, config.specular_strength);
    draws.iter().fold(Vec4::ZERO, |sum, draw| {
        let contribution = light_contribution(&draw.params, draw.technique, pixel, surface, config.invert_y_normal);
        // Color adds one to one, alpha is weighted by itself.
        (sum.xyz() + contribution.xyz()).extend(sum.w + contribution.w * contribution.w)
    })
}

/// The composited color one pixel would receive from a full draw.
pub fn shade_pixel(lights: &LightRegistry, config: &LightingConfig, viewport: Option<Rect>, pixel: Vec2, surface: &SurfaceSample) -> Vec4 {
    let light = accumulate(lights, config, viewport, pixel, surface);
    composite(surface.color, light.xyz(), config)
}
