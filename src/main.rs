mod gui;
mod scene;

use std::sync::Arc;
use std::time::Instant;

use glam::{UVec2, Vec2, Vec3, Vec4};
use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowBuilder},
};

use deferred_lights::renderer::shading;
use deferred_lights::{Light, LightingEngine, LightingShaders, Rect, SharedLight};

const WINDOW_SIZE: winit::dpi::PhysicalSize<u32> = winit::dpi::PhysicalSize::new(640, 480);
const SCENE_SIZE: UVec2 = UVec2::new(640, 480);
const ORANGE: Vec4 = Vec4::new(1.0, 0.647, 0.0, 1.0);

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    gui: gui::GUI,
    scene: scene::Scene,
    engine: LightingEngine,
    point_light: SharedLight,
    spot_light: SharedLight,
    floating_light: SharedLight,
    floating_angle: f32,
    added_lights: usize,
    mouse_pos: Vec2,
    add_light_pressed: bool,
}

impl State {
    async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone()).expect("Unable to create a surface for the window!");
        let adapter = instance.request_adapter(
            &wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            },
        ).await.expect("No suitable GPU adapters found on the system!");

        let (device, queue) = adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        ).await.expect("Unable to find a suitable GPU adapter!");

        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps.formats.iter().copied().find(|f| !f.is_srgb()).unwrap_or(caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let gui = gui::GUI::new(window.clone(), &device, surface_format);
        let scene = scene::Scene::new(&device, &queue, SCENE_SIZE);

        let mut engine = LightingEngine::new(&device, UVec2::new(size.width, size.height), surface_format, &LightingShaders::default())
            .expect("Unable to create the lighting engine!");

        let spot_light = Light::spot()
            .with_enabled(false)
            .with_power(0.5)
            .with_decay(100.0)
            .with_position(Vec3::new(100.0, 100.0, 20.0))
            .shared();
        let point_light = Light::point()
            .with_power(0.5)
            .with_decay(300.0)
            .with_position(Vec3::new(20.0, 20.0, 20.0))
            .shared();
        let floating_light = Light::point()
            .with_color(ORANGE)
            .with_power(0.5)
            .with_decay(100.0)
            .with_position(Vec3::new(20.0, 20.0, 20.0))
            .shared();
        engine.add_light(spot_light.clone());
        engine.add_light(point_light.clone());
        engine.add_light(floating_light.clone());

        Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            gui,
            scene,
            engine,
            point_light,
            spot_light,
            floating_light,
            floating_angle: 0.0,
            added_lights: 0,
            mouse_pos: Vec2::ZERO,
            add_light_pressed: false,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            if let Err(e) = self.engine.resize(&self.device, UVec2::new(new_size.width, new_size.height)) {
                log::error!("{}", e);
            }
        }
    }

    fn input(&mut self, event: &WindowEvent, gui_captured: bool) -> bool {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_pos = Vec2::new(position.x as f32, position.y as f32);
                false
            }
            WindowEvent::MouseInput { state: ElementState::Pressed, button, .. } if !gui_captured => {
                match *button {
                    MouseButton::Left => self.add_light_pressed = true,
                    MouseButton::Right => self.gui.spot_mode = !self.gui.spot_mode,
                    _ => (),
                }
                true
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    state: ElementState::Pressed,
                    physical_key: PhysicalKey::Code(KeyCode::F1),
                    repeat: false,
                    ..
                },
                ..
            } => {
                self.gui.show_targets = !self.gui.show_targets;
                true
            }
            _ => false,
        }
    }

    fn update(&mut self, frame_time: f32) {
        self.floating_angle += 0.5 * frame_time;
        self.floating_light.borrow_mut().position = Vec3::new(
            320.0 + self.floating_angle.cos() * 200.0,
            240.0 + (2.0 * self.floating_angle).sin() * 125.0,
            20.0,
        );

        let cursor = self.mouse_pos.extend(self.gui.light_height);
        let color = self.gui.light_color();
        {
            let mut point = self.point_light.borrow_mut();
            point.position = cursor;
            point.color = color;
            point.power = self.gui.light_power;
            point.decay = self.gui.light_decay;
            point.enabled = !self.gui.spot_mode;
        }
        {
            let mut spot = self.spot_light.borrow_mut();
            spot.position = cursor;
            spot.color = color;
            spot.power = self.gui.light_power;
            spot.decay = self.gui.light_decay;
            spot.enabled = self.gui.spot_mode;
            if let Some(cone) = spot.spot_cone_mut() {
                cone.set_rotation(self.gui.spot_rotation);
                cone.set_direction_z(self.gui.spot_direction_z);
                cone.cone_exponent = self.gui.spot_exponent;
            }
        }

        if self.add_light_pressed {
            self.add_light_pressed = false;
            let spread = (self.added_lights as f32 * 0.754_877).fract();
            self.engine.add_light(
                Light::point()
                    .with_color(gui::added_light_color(self.added_lights))
                    .with_power(0.5 + 0.5 * spread)
                    .with_decay(100.0 + 100.0 * spread)
                    .with_position(self.mouse_pos.extend(20.0))
                    .shared()
            );
            self.added_lights += 1;
        }

        self.engine.config.specular_strength = self.gui.specular_strength;
        self.engine.config.ambient_power = self.gui.ambient_power;

        let surface = self.scene.surface_at(self.mouse_pos);
        let lit = shading::shade_pixel(self.engine.lights(), &self.engine.config, Some(self.viewport()), self.mouse_pos, &surface);
        self.gui.update_cursor(lit);
    }

    fn viewport(&self) -> Rect {
        Rect::new(0, 0, self.size.width as i32, self.size.height as i32)
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let present_mode = self.gui.present_mode();
        if present_mode != self.config.present_mode {
            self.config.present_mode = present_mode;
            self.surface.configure(&self.device, &self.config);
        }
        let frame = self.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        self.scene.render(&mut encoder, &self.engine);
        let viewport = self.viewport();
        let stats = self.engine.draw(&self.device, &mut encoder, &view, Some(viewport));
        if self.gui.show_targets {
            self.engine.draw_debug_targets(&mut encoder, &view, UVec2::new(self.size.width, self.size.height));
        }
        self.gui.update_lights(self.engine.light_count(), stats);

        let gui_commands = self.gui.render(&self.device, &self.queue, &mut encoder, &view);

        self.queue.submit(gui_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();

        Ok(())
    }
}

fn main() {
    env_logger::init();
    let event_loop = EventLoop::new().expect("Unable to create the event loop!");
    let window = Arc::new(
        WindowBuilder::new()
        .with_title("Deferred lights")
        .with_inner_size(WINDOW_SIZE)
        .build(&event_loop)
        .expect("Unable to create the window!")
    );

    let mut state = pollster::block_on(State::new(window.clone()));
    let mut last_frame_inst = Instant::now();
    let (mut frame_count, mut accum_time) = (0, 0.0);

    event_loop.run(move |winit_event, elwt| {
        match winit_event {
            Event::WindowEvent {
                ref event,
                window_id,
            } if window_id == state.window.id() => {
                let gui_captured = state.gui.input(event);
                if state.input(event, gui_captured) {
                    return;
                }
                match event {
                    WindowEvent::CloseRequested
                    | WindowEvent::KeyboardInput {
                        event: KeyEvent {
                            state: ElementState::Pressed,
                            physical_key: PhysicalKey::Code(KeyCode::Escape),
                            ..
                        },
                        ..
                    } => elwt.exit(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                    }
                    WindowEvent::RedrawRequested => {
                        let frame_time = last_frame_inst.elapsed().as_secs_f32();
                        accum_time += frame_time;
                        last_frame_inst = Instant::now();
                        frame_count += 1;
                        if frame_count == 60 {
                            state.gui.update_fps(frame_count as f32 / accum_time);
                            accum_time = 0.0;
                            frame_count = 0;
                        }

                        state.update(frame_time);
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => state.resize(state.size),
                            Err(e) => log::error!("{:?}", e),
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    }).expect("Event loop terminated with an error!");
}
