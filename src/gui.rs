use std::f32::consts::{FRAC_PI_2, TAU};
use std::sync::Arc;

use egui_wgpu::ScreenDescriptor;
use glam::Vec4;
use winit::window::Window;

use deferred_lights::renderer::DrawStats;

pub struct GUI {
    window: Arc<Window>,
    context: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
    light_hue: f32,
    light_saturation: f32,
    pub light_height: f32,
    pub light_power: f32,
    pub light_decay: f32,
    pub spot_rotation: f32,
    pub spot_exponent: f32,
    pub spot_direction_z: f32,
    pub specular_strength: f32,
    pub ambient_power: f32,
    pub spot_mode: bool,
    pub show_targets: bool,
    v_sync: bool,
    fps_str: String,
    lights_str: String,
    cursor_str: String,
}

impl GUI {
    pub fn new(window: Arc<Window>, device: &wgpu::Device, surface_format: wgpu::TextureFormat) -> Self {
        let context = egui::Context::default();
        let state = egui_winit::State::new(
            context.clone(),
            egui::ViewportId::ROOT,
            &*window,
            Some(window.scale_factor() as f32),
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1);

        return Self {
            window,
            context,
            state,
            renderer,
            light_hue: 0.0,
            light_saturation: 0.0,
            light_height: 30.0,
            light_power: 0.5,
            light_decay: 100.0,
            spot_rotation: FRAC_PI_2,
            spot_exponent: 9.0,
            spot_direction_z: -0.25,
            specular_strength: 1.5,
            ambient_power: 0.1,
            spot_mode: false,
            show_targets: false,
            v_sync: true,
            fps_str: format!("FPS: -"),
            lights_str: format!("LIGHTS: -"),
            cursor_str: format!("CURSOR: -"),
        }
    }

    pub fn input(&mut self, event: &winit::event::WindowEvent) -> bool {
        return self.state.on_window_event(&self.window, event).consumed;
    }

    pub fn update_fps(&mut self, fps: f32) {
        self.fps_str = format!("FPS: {:.1}", fps);
    }

    pub fn update_lights(&mut self, num_lights: usize, stats: DrawStats) {
        self.lights_str = format!("LIGHTS: {} ({} drawn, {} culled)", num_lights, stats.drawn, stats.culled);
    }

    pub fn update_cursor(&mut self, lit: Vec4) {
        self.cursor_str = format!("LIT AT CURSOR: {:.2} {:.2} {:.2}", lit.x, lit.y, lit.z);
    }

    fn ui(&mut self, ctx: &egui::Context) {
        egui::Window::new("Stats")
        .resizable(false)
        .title_bar(false)
        .anchor(egui::Align2::LEFT_TOP, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.add(egui::Checkbox::new(&mut self.v_sync, "VSync"));
                ui.label(self.fps_str.as_str());
                ui.label(self.lights_str.as_str());
            });
            ui.label(self.cursor_str.as_str());
        });

        egui::Window::new("Lights")
        .resizable(false)
        .anchor(egui::Align2::RIGHT_TOP, egui::Vec2::ZERO)
        .show(ctx, |ui| {
            ui.add(egui::Checkbox::new(&mut self.spot_mode, "spot light (right click)"));
            ui.add(egui::Checkbox::new(&mut self.show_targets, "show targets (F1)"));
            ui.add(egui::Slider::new(&mut self.light_hue, 0.0..=1.0).text("light hue"));
            ui.add(egui::Slider::new(&mut self.light_saturation, 0.0..=1.0).text("light saturation"));
            ui.add(egui::Slider::new(&mut self.light_height, 1.0..=200.0).text("light height"));
            ui.add(egui::Slider::new(&mut self.light_power, 0.001..=1.5).text("power"));
            ui.add(egui::Slider::new(&mut self.light_decay, 1.0..=600.0).text("decay"));
            ui.add(egui::Slider::new(&mut self.spot_rotation, 0.0..=TAU).text("spot rotation"));
            ui.add(egui::Slider::new(&mut self.spot_exponent, 0.1..=40.0).text("spot beam exponent"));
            ui.add(egui::Slider::new(&mut self.spot_direction_z, -1.0..=1.0).text("spot direction z"));
            ui.separator();
            ui.add(egui::Slider::new(&mut self.specular_strength, 0.0..=4.0).text("specular"));
            ui.add(egui::Slider::new(&mut self.ambient_power, 0.0..=1.0).text("ambient"));
        });
    }

    /// Draws the tool windows over `view`. The returned command buffers must
    /// be submitted before `encoder`.
    pub fn render(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) -> Vec<wgpu::CommandBuffer> {
        let raw_input = self.state.take_egui_input(&self.window);
        let ctx = self.context.clone();
        let output = ctx.run(raw_input, |ctx| self.ui(ctx));
        self.state.handle_platform_output(&self.window, output.platform_output);

        let paint_jobs = self.context.tessellate(output.shapes, output.pixels_per_point);
        let size = self.window.inner_size();
        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: [size.width, size.height],
            pixels_per_point: output.pixels_per_point,
        };

        for (id, image_delta) in &output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }
        let command_buffers = self.renderer.update_buffers(device, queue, encoder, &paint_jobs, &screen_descriptor);

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("GUI pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.renderer.render(&mut render_pass, &paint_jobs, &screen_descriptor);
        }

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
        command_buffers
    }

    pub fn light_color(&self) -> Vec4 {
        let rgb = ecolor::Hsva::new(self.light_hue, self.light_saturation, 1.0, 1.0).to_rgb();
        return Vec4::new(rgb[0], rgb[1], rgb[2], 1.0);
    }

    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.v_sync {
            wgpu::PresentMode::Fifo
        } else {
            wgpu::PresentMode::Immediate
        }
    }
}

/// Color of the `index`th light added by clicking, spread around the hue wheel.
pub fn added_light_color(index: usize) -> Vec4 {
    let hue = (index as f32 * 0.618_034).fract();
    let rgba = ecolor::Rgba::from(ecolor::Hsva::new(hue, 0.8, 1.0, 1.0));
    Vec4::new(rgba.r(), rgba.g(), rgba.b(), 1.0)
}
