use super::config::{LightingConfig, LIGHT_AMBIENT};
use super::light_map::record_upload;
use super::shader;
use super::targets::{RenderTargets, ScreenQuad};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Zeroable, bytemuck::Pod)]
pub struct CompositeParams {
    pub ambient_color: [f32; 4],
    pub ambient: f32,
    pub light_ambient: f32,
    pub padding: [f32; 2],
}

impl CompositeParams {
    pub fn new(config: &LightingConfig) -> Self {
        Self {
            ambient_color: config.ambient_color.to_array(),
            ambient: config.ambient_power,
            light_ambient: LIGHT_AMBIENT,
            padding: [0.0; 2],
        }
    }
}

/// Draws the color map lit by ambient light and the light map.
pub struct CompositeRenderer {
    uniform_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    pipeline: wgpu::RenderPipeline,
}

impl CompositeRenderer {
    pub fn new(device: &wgpu::Device, shader_source: &str, targets: &RenderTargets, output_format: wgpu::TextureFormat) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite uniforms"),
            size: std::mem::size_of::<CompositeParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: None,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("composite_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    count: None,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                },
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ]
        });

        let bind_group = Self::create_bind_group(device, &bind_group_layout, &uniform_buffer, targets, &sampler);

        let composite_shader = shader::create_module(device, shader_source, "Composite shader");

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Composite Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Composite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &composite_shader,
                entry_point: shader::VERTEX_ENTRY,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[ScreenQuad::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &composite_shader,
                entry_point: shader::COMPOSITE_TECHNIQUE,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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
        });

        return Self {
            uniform_buffer,
            bind_group_layout,
            bind_group,
            sampler,
            pipeline,
        }
    }

    fn create_bind_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, uniform_buffer: &wgpu::Buffer, targets: &RenderTargets, sampler: &wgpu::Sampler) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
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
                    resource: wgpu::BindingResource::TextureView(&targets.light_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("composite_bind_group"),
        })
    }

    pub fn resize(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bind_group = Self::create_bind_group(device, &self.bind_group_layout, &self.uniform_buffer, targets, &self.sampler);
    }

    /// Composites into `output`. `load` decides whether the destination is
    /// cleared first or blended over.
    pub fn render(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        screen_quad: &ScreenQuad,
        config: &LightingConfig,
        output: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
    ) {
        record_upload(device, encoder, &self.uniform_buffer, bytemuck::bytes_of(&CompositeParams::new(config)));

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: output,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    }
                })
            ],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.set_vertex_buffer(0, screen_quad.vertex_buffer.slice(..));
        render_pass.draw(0..ScreenQuad::vertex_count(), 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn test_params_follow_config() {
        let config = LightingConfig {
            ambient_color: Vec4::new(0.5, 0.25, 1.0, 1.0),
            ambient_power: 0.3,
            ..LightingConfig::default()
        };
        let params = CompositeParams::new(&config);
        assert_eq!(params.ambient_color, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(params.ambient, 0.3);
        assert_eq!(params.light_ambient, 2.0);
        assert_eq!(std::mem::size_of::<CompositeParams>(), 32);
    }
}
