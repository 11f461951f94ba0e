use glam::UVec2;
use wgpu::util::DeviceExt;

use super::texture;
use crate::error::{LightingError, Result};

/// Format of the host-written color and normal maps.
pub const MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
/// Float so that overlapping lights are not clamped before compositing.
pub const LIGHT_MAP_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// The three offscreen buffers of the deferred pipeline.
pub struct RenderTargets {
    pub color: texture::Texture,
    pub normal: texture::Texture,
    pub light_map: texture::Texture,
}

fn check_size(size: UVec2, device: &wgpu::Device) -> Result<()> {
    let max = device.limits().max_texture_dimension_2d;
    if size.x == 0 || size.y == 0 || size.x > max || size.y > max {
        return Err(LightingError::InvalidTargetSize { width: size.x, height: size.y });
    }
    Ok(())
}

impl RenderTargets {
    pub fn new(size: UVec2, device: &wgpu::Device) -> Result<Self> {
        check_size(size, device)?;
        log::info!("creating {}x{} lighting targets", size.x, size.y);

        // Hosts fill the maps by rendering or by copying textures in.
        let map_usage = wgpu::TextureUsages::COPY_DST | wgpu::TextureUsages::COPY_SRC;
        return Ok(Self {
            color: texture::Texture::new_render_target(device, size, MAP_FORMAT, map_usage, Some("Color map")),
            normal: texture::Texture::new_render_target(device, size, MAP_FORMAT, map_usage, Some("Normal map")),
            light_map: texture::Texture::new_render_target(device, size, LIGHT_MAP_FORMAT, wgpu::TextureUsages::COPY_SRC, Some("Light map")),
        });
    }

    pub fn size(&self) -> UVec2 {
        self.color.resolution()
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Zeroable, bytemuck::Pod)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Triangle strip covering clip space, uv origin in the top left corner.
pub const SCREEN_QUAD: [QuadVertex; 4] = [
    QuadVertex { position: [-1.0, 1.0], uv: [0.0, 0.0] },
    QuadVertex { position: [1.0, 1.0], uv: [1.0, 0.0] },
    QuadVertex { position: [-1.0, -1.0], uv: [0.0, 1.0] },
    QuadVertex { position: [1.0, -1.0], uv: [1.0, 1.0] },
];

const QUAD_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2];

pub struct ScreenQuad {
    pub vertex_buffer: wgpu::Buffer,
}

impl ScreenQuad {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Screen quad"),
            contents: bytemuck::cast_slice(&SCREEN_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { vertex_buffer }
    }

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<QuadVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &QUAD_ATTRIBUTES,
        }
    }

    pub fn vertex_count() -> u32 {
        SCREEN_QUAD.len() as u32
    }

    pub fn primitive() -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        }
    }
}
