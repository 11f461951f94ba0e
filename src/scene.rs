use glam::{UVec2, Vec2, Vec3, Vec4};
use image::{Rgba, RgbaImage};

use deferred_lights::renderer::shading::SurfaceSample;
use deferred_lights::renderer::{LightingEngine, Texture};

const BRICK_SIZE: UVec2 = UVec2::new(64, 32);
const MORTAR: u32 = 4;
const BEVEL: u32 = 4;
const MORTAR_COLOR: Rgba<u8> = Rgba([92, 88, 82, 255]);
const FLAT_NORMAL: Rgba<u8> = Rgba([128, 128, 255, 255]);

const COLOR_CLEAR: wgpu::Color = wgpu::Color::BLACK;
const NORMAL_CLEAR: wgpu::Color = wgpu::Color { r: 0.5, g: 0.5, b: 1.0, a: 1.0 };

/// Brick index and position on the brick face, `None` in the mortar.
fn brick_at(x: u32, y: u32) -> Option<(UVec2, UVec2)> {
    let row = y / BRICK_SIZE.y;
    let shifted = if row % 2 == 1 { x + BRICK_SIZE.x / 2 } else { x };
    let local = UVec2::new(shifted % BRICK_SIZE.x, y % BRICK_SIZE.y);
    if local.x < MORTAR || local.y < MORTAR {
        return None;
    }
    Some((UVec2::new(shifted / BRICK_SIZE.x, row), local - UVec2::splat(MORTAR)))
}

fn brick_color(brick: UVec2, x: u32, y: u32) -> Rgba<u8> {
    let tint = (brick.x.wrapping_mul(73_856_093) ^ brick.y.wrapping_mul(19_349_663)) % 48;
    let grain = (x * 7 + y * 13) % 11;
    Rgba([
        (150 + tint + grain) as u8,
        (62 + tint / 2 + grain) as u8,
        (44 + grain) as u8,
        255,
    ])
}

/// Green points up, the usual authoring convention.
fn brick_normal(face: UVec2) -> Rgba<u8> {
    let face_size = BRICK_SIZE - UVec2::splat(MORTAR);
    let mut normal = Vec3::Z;
    if face.x < BEVEL {
        normal.x -= 1.0;
    } else if face.x >= face_size.x - BEVEL {
        normal.x += 1.0;
    }
    if face.y < BEVEL {
        normal.y += 1.0;
    } else if face.y >= face_size.y - BEVEL {
        normal.y -= 1.0;
    }
    let encoded = (normal.normalize() * 0.5 + Vec3::splat(0.5)) * 255.0;
    Rgba([encoded.x.round() as u8, encoded.y.round() as u8, encoded.z.round() as u8, 255])
}

pub fn brick_wall(size: UVec2) -> (RgbaImage, RgbaImage) {
    let diffuse = RgbaImage::from_fn(size.x, size.y, |x, y| match brick_at(x, y) {
        Some((brick, _)) => brick_color(brick, x, y),
        None => MORTAR_COLOR,
    });
    let normal = RgbaImage::from_fn(size.x, size.y, |x, y| match brick_at(x, y) {
        Some((_, face)) => brick_normal(face),
        None => FLAT_NORMAL,
    });
    (diffuse, normal)
}

fn to_unit(pixel: &Rgba<u8>) -> Vec4 {
    Vec4::new(pixel[0] as f32, pixel[1] as f32, pixel[2] as f32, pixel[3] as f32) / 255.0
}

/// A brick wall copied into the engine maps every frame.
pub struct Scene {
    diffuse_image: RgbaImage,
    normal_image: RgbaImage,
    diffuse: Texture,
    normal: Texture,
}

impl Scene {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, size: UVec2) -> Self {
        let (diffuse_image, normal_image) = brick_wall(size);
        let diffuse = Texture::from_image(device, queue, &diffuse_image, Some("Brick diffuse"));
        let normal = Texture::from_image(device, queue, &normal_image, Some("Brick normal"));
        Self {
            diffuse_image,
            normal_image,
            diffuse,
            normal,
        }
    }

    fn clear(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, color: wgpu::Color) {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Clear map pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
    }

    fn copy(encoder: &mut wgpu::CommandEncoder, source: &Texture, destination: &Texture) {
        let size = source.resolution().min(destination.resolution());
        encoder.copy_texture_to_texture(
            wgpu::ImageCopyTexture {
                texture: &source.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyTexture {
                texture: &destination.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: size.x,
                height: size.y,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Fills the engine color and normal maps.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, engine: &LightingEngine) {
        Self::clear(encoder, &engine.color_map().view, COLOR_CLEAR);
        Self::clear(encoder, &engine.normal_map().view, NORMAL_CLEAR);
        Self::copy(encoder, &self.diffuse, engine.color_map());
        Self::copy(encoder, &self.normal, engine.normal_map());
    }

    /// What the maps hold at `pixel`, matching the cleared values outside the wall.
    pub fn surface_at(&self, pixel: Vec2) -> SurfaceSample {
        let (width, height) = self.diffuse_image.dimensions();
        if pixel.x < 0.0 || pixel.y < 0.0 || pixel.x >= width as f32 || pixel.y >= height as f32 {
            return SurfaceSample::flat(Vec4::new(0.0, 0.0, 0.0, 1.0));
        }
        let (x, y) = (pixel.x as u32, pixel.y as u32);
        SurfaceSample {
            color: to_unit(self.diffuse_image.get_pixel(x, y)),
            encoded_normal: to_unit(self.normal_image.get_pixel(x, y)).truncate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mortar_is_flat() {
        let (diffuse, normal) = brick_wall(UVec2::new(128, 64));
        assert_eq!(*diffuse.get_pixel(0, 0), MORTAR_COLOR);
        assert_eq!(*normal.get_pixel(0, 0), FLAT_NORMAL);
        assert_eq!(*normal.get_pixel(10, 33), FLAT_NORMAL);
    }

    #[test]
    fn test_brick_centre_faces_viewer() {
        let (_, normal) = brick_wall(UVec2::new(128, 64));
        assert_eq!(*normal.get_pixel(34, 18), FLAT_NORMAL);
    }

    #[test]
    fn test_bevels_lean_outwards() {
        let (_, normal) = brick_wall(UVec2::new(128, 64));
        let top_left = normal.get_pixel(MORTAR, MORTAR);
        assert!(top_left[0] < 128);
        assert!(top_left[1] > 128);
        let bottom_right = normal.get_pixel(BRICK_SIZE.x - 1, BRICK_SIZE.y - 1);
        assert!(bottom_right[0] > 128);
        assert!(bottom_right[1] < 128);
    }

    #[test]
    fn test_odd_rows_are_staggered() {
        assert!(brick_at(0, 4).is_none());
        assert!(brick_at(0, 36).is_some());
        assert!(brick_at(32, 36).is_none());
    }
}
