mod composite;
mod debug;
mod light_map;
mod registry;
mod targets;
mod texture;
pub mod config;
pub mod light;
pub mod shader;
pub mod shading;
pub mod viewport;

use glam::UVec2;

use composite::CompositeRenderer;
use debug::DebugTargetsRenderer;
use light_map::LightMapRenderer;
use targets::{RenderTargets, ScreenQuad};

use crate::error::Result;

pub use config::LightingConfig;
pub use debug::debug_tiles;
pub use light::{Light, LightKind, SharedLight, SpotCone};
pub use light_map::{collect_light_draws, DrawStats, LightDraw};
pub use registry::LightRegistry;
pub use shader::{LightingShaders, Technique};
pub use targets::{LIGHT_MAP_FORMAT, MAP_FORMAT};
pub use texture::Texture;
pub use viewport::Rect;

/// Deferred 2D lighting over a color map and a normal map.
///
/// The host renders its scene into [`color_map`](Self::color_map) and
/// [`normal_map`](Self::normal_map), registers lights, then calls
/// [`draw`](Self::draw) once per frame.
pub struct LightingEngine {
    pub config: LightingConfig,
    lights: LightRegistry,
    targets: RenderTargets,
    screen_quad: ScreenQuad,
    light_map_renderer: LightMapRenderer,
    composite_renderer: CompositeRenderer,
    debug_renderer: DebugTargetsRenderer,
}

impl LightingEngine {
    pub fn new(device: &wgpu::Device, size: UVec2, output_format: wgpu::TextureFormat, shaders: &LightingShaders) -> Result<Self> {
        shaders.validate()?;

        let targets = RenderTargets::new(size, device)?;
        let screen_quad = ScreenQuad::new(device);
        let light_map_renderer = LightMapRenderer::new(device, &shaders.light, &targets);
        let composite_renderer = CompositeRenderer::new(device, &shaders.composite, &targets, output_format);
        let debug_renderer = DebugTargetsRenderer::new(device, &targets, output_format);
        log::info!("lighting engine ready, output format {:?}", output_format);

        return Ok(Self {
            config: LightingConfig::default(),
            lights: LightRegistry::new(),
            targets,
            screen_quad,
            light_map_renderer,
            composite_renderer,
            debug_renderer,
        });
    }

    pub fn add_light(&mut self, light: SharedLight) {
        self.lights.add(light);
    }

    /// Removes the first registration of `light`. Returns false if it was
    /// not registered.
    pub fn remove_light(&mut self, light: &SharedLight) -> bool {
        self.lights.remove(light)
    }

    pub fn clear_lights(&mut self) {
        self.lights.clear();
    }

    pub fn light_at(&self, index: usize) -> Result<SharedLight> {
        self.lights.get(index).map(|light| light.clone())
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn lights(&self) -> &LightRegistry {
        &self.lights
    }

    pub fn color_map(&self) -> &Texture {
        &self.targets.color
    }

    pub fn normal_map(&self) -> &Texture {
        &self.targets.normal
    }

    pub fn light_map(&self) -> &Texture {
        &self.targets.light_map
    }

    pub fn size(&self) -> UVec2 {
        self.targets.size()
    }

    /// Recreates the targets at `size`. Previously returned target views are
    /// stale afterwards.
    pub fn resize(&mut self, device: &wgpu::Device, size: UVec2) -> Result<()> {
        if size == self.size() {
            return Ok(());
        }
        self.targets = RenderTargets::new(size, device)?;
        self.light_map_renderer.resize(device, &self.targets);
        self.composite_renderer.resize(device, &self.targets);
        self.debug_renderer.resize(device, &self.targets);
        Ok(())
    }

    /// Accumulates every enabled light into the light map. With a viewport,
    /// lights outside it are culled and positions are made viewport-relative.
    pub fn generate_light_map(&mut self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, viewport: Option<Rect>) -> DrawStats {
        self.light_map_renderer.render(device, encoder, &self.targets, &self.screen_quad, &self.lights, &self.config, viewport)
    }

    /// Blends the lit color map over whatever `output` already holds.
    pub fn draw_combined_maps(&self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        self.composite_renderer.render(device, encoder, &self.screen_quad, &self.config, output, wgpu::LoadOp::Load);
    }

    /// Light map pass, then the composite onto `output` cleared to black.
    pub fn draw(&mut self, device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView, viewport: Option<Rect>) -> DrawStats {
        let stats = self.generate_light_map(device, encoder, viewport);
        self.composite_renderer.render(device, encoder, &self.screen_quad, &self.config, output, wgpu::LoadOp::Clear(config::BACKGROUND_COLOR));
        stats
    }

    /// Shows the color, normal and light maps at a third of their size along
    /// the bottom edge of `output`.
    pub fn draw_debug_targets(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView, output_size: UVec2) {
        self.debug_renderer.render(encoder, &self.screen_quad, self.size(), output, output_size);
    }
}
