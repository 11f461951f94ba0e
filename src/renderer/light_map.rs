use std::num::NonZeroU64;

use glam::Vec3;
use wgpu::util::DeviceExt;

use super::config::{LightingConfig, ACCUMULATION_BLEND};
use super::light::{FrameParams, LightKind, LightParams};
use super::registry::LightRegistry;
use super::shader::{self, Technique};
use super::targets::{RenderTargets, ScreenQuad, LIGHT_MAP_FORMAT};
use super::viewport::{self, Rect};

/// What one accumulation pass did with the registered lights.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub drawn: usize,
    pub disabled: usize,
    pub culled: usize,
}

/// One quad draw into the light map.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightDraw {
    pub technique: Technique,
    pub params: LightParams,
}

/// Selects and parameterises the lights of one pass, in registry order.
///
/// Disabled lights are skipped. With a viewport, lights whose bounds miss it
/// are culled and the rest are shifted into viewport space.
pub fn collect_light_draws(lights: &LightRegistry, viewport: Option<Rect>, specular_strength: f32) -> (Vec<LightDraw>, DrawStats) {
    let mut stats = DrawStats::default();
    let offset = viewport.map(|v| v.offset()).unwrap_or(Vec3::ZERO);

    let mut draws = Vec::with_capacity(lights.len());
    for shared in lights {
        let light = match shared.try_borrow() {
            Ok(light) => light,
            Err(_) => {
                log::warn!("skipping a light that is mutably borrowed during draw");
                continue;
            }
        };
        if !light.enabled {
            stats.disabled += 1;
            continue;
        }
        if let Some(viewport) = &viewport {
            if !viewport::is_visible(&light, viewport) {
                stats.culled += 1;
                continue;
            }
        }
        let technique = match light.kind() {
            LightKind::Point => Technique::PointLight,
            LightKind::Spot(_) => Technique::SpotLight,
        };
        draws.push(LightDraw {
            technique,
            params: LightParams::new(&light, offset, specular_strength),
        });
    }
    stats.drawn = draws.len();
    (draws, stats)
}

/// Records a copy of `contents` into `buffer` at the current point of
/// `encoder`, so consecutive passes in one submission each see their own data.
pub(crate) fn record_upload(device: &wgpu::Device, encoder: &mut wgpu::CommandEncoder, buffer: &wgpu::Buffer, contents: &[u8]) {
    let staging = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Uniform staging"),
        contents,
        usage: wgpu::BufferUsages::COPY_SRC,
    });
    encoder.copy_buffer_to_buffer(&staging, 0, buffer, 0, contents.len() as u64);
}

fn align_to(value: u64, alignment: u64) -> u64 {
    (value + alignment - 1) / alignment * alignment
}

pub struct LightMapRenderer {
    frame_buffer: wgpu::Buffer,
    maps_bind_group_layout: wgpu::BindGroupLayout,
    maps_bind_group: wgpu::BindGroup,
    map_sampler: wgpu::Sampler,
    light_buffer: wgpu::Buffer,
    light_capacity: usize,
    light_stride: u64,
    light_bind_group_layout: wgpu::BindGroupLayout,
    light_bind_group: wgpu::BindGroup,
    point_pipeline: wgpu::RenderPipeline,
    spot_pipeline: wgpu::RenderPipeline,
}

const INITIAL_LIGHT_CAPACITY: usize = 64;

impl LightMapRenderer {
    pub fn new(device: &wgpu::Device, shader_source: &str, targets: &RenderTargets) -> Self {
        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light frame uniforms"),
            size: std::mem::size_of::<FrameParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let map_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: None,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let maps_bind_group_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
                label: Some("light_maps_bind_group_layout"),
            }
        );

        let maps_bind_group = Self::create_maps_bind_group(device, &maps_bind_group_layout, &frame_buffer, targets, &map_sampler);

        let light_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("light_params_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    count: None,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: NonZeroU64::new(std::mem::size_of::<LightParams>() as u64),
                    },
                },
            ]
        });

        let light_stride = align_to(
            std::mem::size_of::<LightParams>() as u64,
            device.limits().min_uniform_buffer_offset_alignment as u64,
        );
        let light_buffer = Self::create_light_buffer(device, light_stride, INITIAL_LIGHT_CAPACITY);
        let light_bind_group = Self::create_light_bind_group(device, &light_bind_group_layout, &light_buffer);

        let light_shader = shader::create_module(device, shader_source, "Light shader");

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Light Map Pipeline Layout"),
                bind_group_layouts: &[&maps_bind_group_layout, &light_bind_group_layout],
                push_constant_ranges: &[],
            });

        let point_pipeline = Self::create_pipeline(device, &pipeline_layout, &light_shader, Technique::PointLight, ACCUMULATION_BLEND);
        let spot_pipeline = Self::create_pipeline(device, &pipeline_layout, &light_shader, Technique::SpotLight, ACCUMULATION_BLEND);

        return Self {
            frame_buffer,
            maps_bind_group_layout,
            maps_bind_group,
            map_sampler,
            light_buffer,
            light_capacity: INITIAL_LIGHT_CAPACITY,
            light_stride,
            light_bind_group_layout,
            light_bind_group,
            point_pipeline,
            spot_pipeline,
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        module: &wgpu::ShaderModule,
        technique: Technique,
        blend: wgpu::BlendState,
    ) -> wgpu::RenderPipeline {
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(technique.entry_point()),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: shader::VERTEX_ENTRY,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[ScreenQuad::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: technique.entry_point(),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: LIGHT_MAP_FORMAT,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: ScreenQuad::primitive(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        })
    }

    fn create_maps_bind_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, frame_buffer: &wgpu::Buffer, targets: &RenderTargets, sampler: &wgpu::Sampler) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&targets.color.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&targets.normal.view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("light_maps_bind_group"),
        })
    }

    fn create_light_buffer(device: &wgpu::Device, stride: u64, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Light uniforms"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_light_bind_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, buffer: &wgpu::Buffer) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer,
                        offset: 0,
                        size: NonZeroU64::new(std::mem::size_of::<LightParams>() as u64),
                    }),
                },
            ],
            label: Some("light_params_bind_group"),
        })
    }

    /// Rebinds the color and normal maps after the targets were recreated.
    pub fn resize(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.maps_bind_group = Self::create_maps_bind_group(device, &self.maps_bind_group_layout, &self.frame_buffer, targets, &self.map_sampler);
    }

    fn reserve(&mut self, device: &wgpu::Device, count: usize) {
        if count <= self.light_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        log::debug!("growing light uniform buffer to {} slots", capacity);
        self.light_buffer = Self::create_light_buffer(device, self.light_stride, capacity);
        self.light_bind_group = Self::create_light_bind_group(device, &self.light_bind_group_layout, &self.light_buffer);
        self.light_capacity = capacity;
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        screen_quad: &ScreenQuad,
        lights: &LightRegistry,
        config: &LightingConfig,
        viewport: Option<Rect>,
    ) -> DrawStats {
        let size = targets.size();
        let frame = FrameParams {
            ambient_color: config.ambient_color.to_array(),
            screen_width: size.x as f32,
            screen_height: size.y as f32,
            invert_y: config.invert_y_normal as u32,
            padding: 0,
        };
        record_upload(device, encoder, &self.frame_buffer, bytemuck::bytes_of(&frame));

        let (draws, stats) = collect_light_draws(lights, viewport, config.specular_strength);
        if !draws.is_empty() {
            self.reserve(device, draws.len());
            let stride = self.light_stride as usize;
            let mut staging = vec![0u8; stride * draws.len()];
            for (i, draw) in draws.iter().enumerate() {
                let bytes = bytemuck::bytes_of(&draw.params);
                staging[i * stride..i * stride + bytes.len()].copy_from_slice(bytes);
            }
            record_upload(device, encoder, &self.light_buffer, &staging);
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Light map pass"),
                color_attachments: &[
                    Some(wgpu::RenderPassColorAttachment {
                        view: &targets.light_map.view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                            store: wgpu::StoreOp::Store,
                        }
                    })
                ],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_vertex_buffer(0, screen_quad.vertex_buffer.slice(..));
            render_pass.set_bind_group(0, &self.maps_bind_group, &[]);
            for (i, draw) in draws.iter().enumerate() {
                let pipeline = match draw.technique {
                    Technique::PointLight => &self.point_pipeline,
                    Technique::SpotLight => &self.spot_pipeline,
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(1, &self.light_bind_group, &[(i as u64 * self.light_stride) as u32]);
                render_pass.draw(0..ScreenQuad::vertex_count(), 0..1);
            }
        }

        log::trace!("light map: {} drawn, {} disabled, {} culled", stats.drawn, stats.disabled, stats.culled);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::light::{Light, SharedLight};

    fn registry(lights: &[SharedLight]) -> LightRegistry {
        let mut registry = LightRegistry::new();
        for light in lights {
            registry.add(light.clone());
        }
        registry
    }

    #[test]
    fn test_disabled_lights_are_skipped() {
        let lights = [
            Light::point().with_enabled(false).shared(),
            Light::point().shared(),
            Light::spot().with_enabled(false).shared(),
        ];
        let (draws, stats) = collect_light_draws(&registry(&lights), None, 1.5);
        assert_eq!(draws.len(), 1);
        assert_eq!(stats, DrawStats { drawn: 1, disabled: 2, culled: 0 });
    }

    #[test]
    fn test_technique_follows_variant_in_registry_order() {
        let lights = [Light::spot().shared(), Light::point().shared(), Light::spot().shared()];
        let (draws, _) = collect_light_draws(&registry(&lights), None, 1.5);
        let techniques: Vec<Technique> = draws.iter().map(|d| d.technique).collect();
        assert_eq!(techniques, vec![Technique::SpotLight, Technique::PointLight, Technique::SpotLight]);
    }

    #[test]
    fn test_viewport_culls_and_offsets() {
        let visible = Light::point().with_position(Vec3::new(150.0, 120.0, 20.0)).with_decay(50.0).shared();
        let hidden = Light::point().with_position(Vec3::new(1000.0, 120.0, 20.0)).with_decay(50.0).shared();
        let viewport = Rect::new(100, 100, 640, 480);
        let (draws, stats) = collect_light_draws(&registry(&[visible, hidden]), Some(viewport), 1.5);
        assert_eq!(stats, DrawStats { drawn: 1, disabled: 0, culled: 1 });
        assert_eq!(draws[0].params.light_position, [50.0, 20.0, 20.0]);
    }

    #[test]
    fn test_no_viewport_means_no_culling() {
        let far = Light::point().with_position(Vec3::new(-5000.0, -5000.0, 0.0)).with_decay(1.0).shared();
        let (draws, stats) = collect_light_draws(&registry(&[far]), None, 1.5);
        assert_eq!(stats.culled, 0);
        assert_eq!(draws[0].params.light_position, [-5000.0, -5000.0, 0.0]);
    }

    #[test]
    fn test_specular_strength_is_engine_wide() {
        let lights = [Light::point().shared(), Light::spot().shared()];
        let (draws, _) = collect_light_draws(&registry(&lights), None, 0.25);
        assert!(draws.iter().all(|d| d.params.specular_strength == 0.25));
    }

    #[test]
    fn test_borrowed_light_is_skipped() {
        let busy = Light::point().shared();
        let lights = registry(&[busy.clone(), Light::point().shared()]);
        let _guard = busy.borrow_mut();
        let (draws, stats) = collect_light_draws(&lights, None, 1.5);
        assert_eq!(draws.len(), 1);
        assert_eq!(stats.drawn, 1);
    }

    #[test]
    fn test_align_to() {
        assert_eq!(align_to(64, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }
}
