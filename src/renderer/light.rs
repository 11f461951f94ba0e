use std::cell::RefCell;
use std::rc::Rc;

use glam::{Vec3, Vec4};

/// A light handle shared between the host and the engine's registry.
pub type SharedLight = Rc<RefCell<Light>>;

/// Cone data carried by spot lights.
///
/// The direction is always derived from `rotation` and `direction_z`, so the
/// fields are private and only reachable through the setters.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpotCone {
    rotation: f32,
    direction: Vec3,
    /// Beam narrowness. 0 lights the whole half plane in front of the spot,
    /// 6 to 9 gives a soft beam.
    pub cone_exponent: f32,
}

impl Default for SpotCone {
    fn default() -> Self {
        Self {
            rotation: 0.0,
            direction: Vec3::X,
            cone_exponent: 0.0,
        }
    }
}

impl SpotCone {
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Sets the beam angle in radians. Keeps the current `direction_z`.
    pub fn set_rotation(&mut self, rotation: f32) {
        self.rotation = rotation;
        self.direction = Vec3::new(rotation.cos(), rotation.sin(), self.direction.z);
    }

    pub fn direction_z(&self) -> f32 {
        self.direction.z
    }

    /// Tilts the beam towards (negative) or away from the surface.
    pub fn set_direction_z(&mut self, z: f32) {
        self.direction.z = z;
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum LightKind {
    Point,
    Spot(SpotCone),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    /// x and y in screen pixels, z is the height above the surface.
    pub position: Vec3,
    pub color: Vec4,
    pub power: f32,
    /// Distance at which the light no longer contributes.
    pub decay: f32,
    pub enabled: bool,
    kind: LightKind,
}

impl Light {
    fn new(kind: LightKind) -> Self {
        Self {
            position: Vec3::ZERO,
            color: Vec4::ONE,
            power: 1.0,
            decay: 100.0,
            enabled: true,
            kind,
        }
    }

    pub fn point() -> Self {
        Self::new(LightKind::Point)
    }

    pub fn spot() -> Self {
        Self::new(LightKind::Spot(SpotCone::default()))
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    pub fn with_power(mut self, power: f32) -> Self {
        self.power = power;
        self
    }

    pub fn with_decay(mut self, decay: f32) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Wraps the light in a handle that can be registered with the engine.
    pub fn shared(self) -> SharedLight {
        Rc::new(RefCell::new(self))
    }

    pub fn kind(&self) -> &LightKind {
        &self.kind
    }

    pub fn is_spot(&self) -> bool {
        matches!(self.kind, LightKind::Spot(_))
    }

    pub fn spot_cone(&self) -> Option<&SpotCone> {
        match &self.kind {
            LightKind::Spot(cone) => Some(cone),
            LightKind::Point => None,
        }
    }

    pub fn spot_cone_mut(&mut self) -> Option<&mut SpotCone> {
        match &mut self.kind {
            LightKind::Spot(cone) => Some(cone),
            LightKind::Point => None,
        }
    }
}

/// Per-light parameters, one dynamic uniform slot per drawn light.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Zeroable, bytemuck::Pod)]
pub struct LightParams {
    pub light_color: [f32; 4],
    pub light_position: [f32; 3],
    pub light_strength: f32,
    pub cone_direction: [f32; 3],
    pub light_decay: f32,
    pub specular_strength: f32,
    pub cone_decay: f32,
    pub padding: [f32; 2],
}

impl Default for LightParams {
    fn default() -> Self {
        Self {
            light_color: [1.0, 1.0, 1.0, 1.0],
            light_position: [0.0, 0.0, 0.0],
            light_strength: 0.0,
            cone_direction: [1.0, 0.0, 0.0],
            light_decay: 1.0,
            specular_strength: 0.0,
            cone_decay: 0.0,
            padding: [0.0; 2],
        }
    }
}

impl LightParams {
    pub fn new(light: &Light, offset: Vec3, specular_strength: f32) -> Self {
        let mut params = Self {
            light_color: light.color.to_array(),
            light_position: (light.position + offset).to_array(),
            light_strength: light.power,
            light_decay: light.decay,
            specular_strength,
            ..Self::default()
        };
        if let LightKind::Spot(cone) = light.kind() {
            params.cone_direction = cone.direction().to_array();
            params.cone_decay = cone.cone_exponent;
        }
        params
    }
}

/// Parameters shared by every light drawn in one accumulation pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Zeroable, bytemuck::Pod)]
pub struct FrameParams {
    pub ambient_color: [f32; 4],
    pub screen_width: f32,
    pub screen_height: f32,
    pub invert_y: u32,
    pub padding: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn assert_vec3_eq(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-6), "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_rotation_derives_direction() {
        let mut cone = SpotCone::default();
        cone.set_direction_z(-0.25);
        cone.set_rotation(FRAC_PI_2);
        assert_vec3_eq(cone.direction(), Vec3::new(FRAC_PI_2.cos(), FRAC_PI_2.sin(), -0.25));
        assert_eq!(cone.rotation(), FRAC_PI_2);

        cone.set_rotation(1.0);
        assert_vec3_eq(cone.direction(), Vec3::new(1.0f32.cos(), 1.0f32.sin(), -0.25));
    }

    #[test]
    fn test_direction_z_keeps_xy() {
        let mut cone = SpotCone::default();
        cone.set_rotation(0.5);
        cone.set_direction_z(-1.0);
        assert_vec3_eq(cone.direction(), Vec3::new(0.5f32.cos(), 0.5f32.sin(), -1.0));
        assert_eq!(cone.direction_z(), -1.0);
    }

    #[test]
    fn test_point_light_has_no_cone() {
        let mut light = Light::point();
        assert!(!light.is_spot());
        assert!(light.spot_cone().is_none());
        assert!(light.spot_cone_mut().is_none());
        assert!(light.enabled);
    }

    #[test]
    fn test_params_apply_offset_and_cone() {
        let mut light = Light::spot()
            .with_position(Vec3::new(100.0, 50.0, 20.0))
            .with_power(0.5)
            .with_decay(300.0);
        {
            let cone = light.spot_cone_mut().unwrap();
            cone.set_rotation(0.0);
            cone.set_direction_z(-0.5);
            cone.cone_exponent = 9.0;
        }
        let params = LightParams::new(&light, Vec3::new(-10.0, -20.0, 0.0), 1.5);
        assert_eq!(params.light_position, [90.0, 30.0, 20.0]);
        assert_eq!(params.light_strength, 0.5);
        assert_eq!(params.light_decay, 300.0);
        assert_eq!(params.specular_strength, 1.5);
        assert_eq!(params.cone_decay, 9.0);
        assert_eq!(params.cone_direction, [1.0, 0.0, -0.5]);
    }

    #[test]
    fn test_uniform_layouts_match_wgsl() {
        assert_eq!(std::mem::size_of::<LightParams>(), 64);
        assert_eq!(std::mem::size_of::<FrameParams>(), 32);
    }
}
