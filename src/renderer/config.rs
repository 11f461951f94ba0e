use glam::Vec4;

/// Multiplier applied to the light map when compositing.
pub const LIGHT_AMBIENT: f32 = 2.0;

/// Destination clear color of [`LightingEngine::draw`](super::LightingEngine::draw).
pub const BACKGROUND_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Blending used to sum lights into the light map:
/// color `src + dst`, alpha `src.a * src.a + dst.a`.
pub const ACCUMULATION_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// Engine-wide lighting settings, read on every draw.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightingConfig {
    pub ambient_color: Vec4,
    pub ambient_power: f32,
    pub specular_strength: f32,
    /// Most normal maps are authored with green pointing up, screen space
    /// points down.
    pub invert_y_normal: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_color: Vec4::ONE,
            ambient_power: 0.1,
            specular_strength: 1.5,
            invert_y_normal: true,
        }
    }
}
