use glam::UVec2;

use super::targets::{RenderTargets, ScreenQuad};
use super::viewport::Rect;

/// Bottom-of-screen tiles for the color, normal and light maps, each a third
/// of the target size.
pub fn debug_tiles(target_size: UVec2, output_height: u32) -> [Rect; 3] {
    let width = (target_size.x / 3) as i32;
    let height = (target_size.y / 3) as i32;
    let y = output_height as i32 - height;
    [
        Rect::new(0, y, width, height),
        Rect::new(width, y, width, height),
        Rect::new(2 * width, y, width, height),
    ]
}

fn fits(tile: &Rect, output_size: UVec2) -> bool {
    tile.width > 0
        && tile.height > 0
        && tile.x >= 0
        && tile.y >= 0
        && tile.right() <= output_size.x as i32
        && tile.bottom() <= output_size.y as i32
}

/// Blits the internal targets onto the output for inspection.
pub struct DebugTargetsRenderer {
    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_groups: [wgpu::BindGroup; 3],
    pipeline: wgpu::RenderPipeline,
}

impl DebugTargetsRenderer {
    pub fn new(device: &wgpu::Device, targets: &RenderTargets, output_format: wgpu::TextureFormat) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: None,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
                label: Some("debug_blit_bind_group_layout"),
            }
        );

        let bind_groups = Self::create_bind_groups(device, &bind_group_layout, targets, &sampler);

        let blit_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blit.wgsl").into()),
        });

        let pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Debug Blit Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Debug Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &blit_shader,
                entry_point: "vs_screen_quad",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[ScreenQuad::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &blit_shader,
                entry_point: "fs_blit",
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: Some(wgpu::BlendState::REPLACE),
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

        Self {
            sampler,
            bind_group_layout,
            bind_groups,
            pipeline,
        }
    }

    fn create_bind_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, view: &wgpu::TextureView, sampler: &wgpu::Sampler) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: None,
        })
    }

    fn create_bind_groups(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, targets: &RenderTargets, sampler: &wgpu::Sampler) -> [wgpu::BindGroup; 3] {
        [
            Self::create_bind_group(device, layout, &targets.color.view, sampler),
            Self::create_bind_group(device, layout, &targets.normal.view, sampler),
            Self::create_bind_group(device, layout, &targets.light_map.view, sampler),
        ]
    }

    pub fn resize(&mut self, device: &wgpu::Device, targets: &RenderTargets) {
        self.bind_groups = Self::create_bind_groups(device, &self.bind_group_layout, targets, &self.sampler);
    }

    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, screen_quad: &ScreenQuad, target_size: UVec2, output: &wgpu::TextureView, output_size: UVec2) {
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Debug targets pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: output,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }
                })
            ],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_vertex_buffer(0, screen_quad.vertex_buffer.slice(..));

        for (tile, bind_group) in debug_tiles(target_size, output_size.y).iter().zip(self.bind_groups.iter()) {
            if !fits(tile, output_size) {
                log::warn!("debug tile {:?} does not fit a {}x{} output", tile, output_size.x, output_size.y);
                continue;
            }
            render_pass.set_viewport(tile.x as f32, tile.y as f32, tile.width as f32, tile.height as f32, 0.0, 1.0);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.draw(0..ScreenQuad::vertex_count(), 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiles_run_along_the_bottom() {
        let tiles = debug_tiles(UVec2::new(640, 480), 480);
        assert_eq!(tiles[0], Rect::new(0, 320, 213, 160));
        assert_eq!(tiles[1], Rect::new(213, 320, 213, 160));
        assert_eq!(tiles[2], Rect::new(426, 320, 213, 160));
        assert!(tiles.iter().all(|t| fits(t, UVec2::new(640, 480))));
    }

    #[test]
    fn test_tiles_outside_output_are_rejected() {
        let tiles = debug_tiles(UVec2::new(1920, 1080), 240);
        assert!(tiles.iter().all(|t| !fits(t, UVec2::new(320, 240))));
    }
}
