use glam::Vec3;

use crate::renderer::light::{Light, LightKind};

/// Integer screen rectangle, used for the visible region and light bounds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Strict overlap; rectangles sharing only an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        other.x < self.right() && self.x < other.right() && other.y < self.bottom() && self.y < other.bottom()
    }

    /// Translation that moves world positions into this rectangle's space.
    pub fn offset(&self) -> Vec3 {
        Vec3::new(-(self.x as f32), -(self.y as f32), 0.0)
    }
}

/// Conservative screen bounds of the area a light can reach.
///
/// Spot lights get twice the reach of point lights since the cone itself is
/// not modelled.
pub fn light_bounds(light: &Light) -> Rect {
    let reach = match light.kind() {
        LightKind::Point => light.decay,
        LightKind::Spot(_) => 2.0 * light.decay,
    };
    Rect::new(
        (light.position.x - reach) as i32,
        (light.position.y - reach) as i32,
        (2.0 * reach) as i32,
        (2.0 * reach) as i32,
    )
}

pub fn is_visible(light: &Light, viewport: &Rect) -> bool {
    light_bounds(light).intersects(viewport)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEW: Rect = Rect::new(0, 0, 640, 480);

    fn point_at(x: f32, y: f32, decay: f32) -> Light {
        Light::point().with_position(Vec3::new(x, y, 20.0)).with_decay(decay)
    }

    fn spot_at(x: f32, y: f32, decay: f32) -> Light {
        Light::spot().with_position(Vec3::new(x, y, 20.0)).with_decay(decay)
    }

    #[test]
    fn test_intersects() {
        assert!(VIEW.intersects(&Rect::new(600, 400, 100, 100)));
        assert!(VIEW.intersects(&Rect::new(-10, -10, 20, 20)));
        assert!(VIEW.intersects(&Rect::new(10, 10, 5, 5)));
        assert!(!VIEW.intersects(&Rect::new(640, 0, 10, 10)));
        assert!(!VIEW.intersects(&Rect::new(-10, 0, 10, 10)));
        assert!(!VIEW.intersects(&Rect::new(0, 480, 10, 10)));
    }

    #[test]
    fn test_point_bounds() {
        assert_eq!(light_bounds(&point_at(320.0, 240.0, 300.0)), Rect::new(20, -60, 600, 600));
        // Truncation toward zero, as integer rectangles do.
        assert_eq!(light_bounds(&point_at(10.7, 10.7, 5.5)), Rect::new(5, 5, 11, 11));
    }

    #[test]
    fn test_spot_bounds_are_doubled() {
        assert_eq!(light_bounds(&spot_at(320.0, 240.0, 100.0)), Rect::new(120, 40, 400, 400));
    }

    #[test]
    fn test_point_culling() {
        assert!(is_visible(&point_at(320.0, 240.0, 10.0), &VIEW));
        assert!(is_visible(&point_at(-50.0, 240.0, 60.0), &VIEW));
        assert!(!is_visible(&point_at(-50.0, 240.0, 40.0), &VIEW));
        // Box ends exactly on the viewport edge.
        assert!(!is_visible(&point_at(-50.0, 240.0, 50.0), &VIEW));
        assert!(!is_visible(&point_at(800.0, 240.0, 100.0), &VIEW));
    }

    #[test]
    fn test_spot_reaches_further_than_point() {
        let viewport = Rect::new(0, 0, 640, 480);
        assert!(!is_visible(&point_at(-150.0, 240.0, 100.0), &viewport));
        assert!(is_visible(&spot_at(-150.0, 240.0, 100.0), &viewport));
        assert!(!is_visible(&spot_at(-250.0, 240.0, 100.0), &viewport));
    }

    #[test]
    fn test_offset() {
        assert_eq!(Rect::new(100, -20, 640, 480).offset(), Vec3::new(-100.0, 20.0, 0.0));
        assert_eq!(Rect::new(i32::MIN, i32::MIN, 1, 1).offset(), Vec3::new(2_147_483_648.0, 2_147_483_648.0, 0.0));
    }
}
