//! Light sources and the per-frame lighting environment

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Vec3;
use crate::spatial::Aabb;

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightType {
    /// Directional light (like sunlight); accumulated full-screen
    Directional,
    /// Point light; accumulated within its bounding volume
    Point,
    /// Spot light; accumulated within its bounding volume
    Spot,
}

/// Light source
#[derive(Debug, Clone)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// Light position (for point/spot lights)
    pub position: Vec3,
    /// Light direction (for directional/spot lights)
    pub direction: Vec3,
    /// Light color
    pub color: Vec3,
    /// Light intensity
    pub intensity: f32,
    /// Light range (for point/spot lights)
    pub range: f32,
    /// Outer cone angle for spot lights (in radians)
    pub outer_cone_angle: f32,
}

impl Light {
    /// Create a directional light
    pub fn directional(direction: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            position: Vec3::zeros(),
            direction: direction.normalize(),
            color,
            intensity,
            range: 0.0,
            outer_cone_angle: 0.0,
        }
    }

    /// Create a point light
    pub fn point(position: Vec3, color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            position,
            direction: Vec3::zeros(),
            color,
            intensity,
            range,
            outer_cone_angle: 0.0,
        }
    }

    /// Create a spot light
    pub fn spot(
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        range: f32,
        outer_cone_angle: f32,
    ) -> Self {
        Self {
            light_type: LightType::Spot,
            position,
            direction: direction.normalize(),
            color,
            intensity,
            range,
            outer_cone_angle,
        }
    }

    /// World-space bounds of the light's influence
    ///
    /// Directional lights affect the whole screen and have no bounds.
    pub fn bounds(&self) -> Option<Aabb> {
        match self.light_type {
            LightType::Directional => None,
            LightType::Point | LightType::Spot => Some(Aabb::from_center_extents(
                self.position,
                Vec3::new(self.range, self.range, self.range),
            )),
        }
    }

    /// Pack into the GPU uniform layout
    pub fn to_gpu(&self) -> GpuLight {
        let kind = match self.light_type {
            LightType::Directional => 0.0,
            LightType::Point => 1.0,
            LightType::Spot => 2.0,
        };
        GpuLight {
            position_range: [self.position.x, self.position.y, self.position.z, self.range],
            direction_angle: [
                self.direction.x,
                self.direction.y,
                self.direction.z,
                self.outer_cone_angle,
            ],
            color_intensity: [self.color.x, self.color.y, self.color.z, self.intensity],
            params: [kind, 0.0, 0.0, 0.0],
        }
    }
}

/// GPU-side light uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GpuLight {
    /// xyz position, w range
    pub position_range: [f32; 4],
    /// xyz direction, w outer cone angle
    pub direction_angle: [f32; 4],
    /// rgb color, w intensity
    pub color_intensity: [f32; 4],
    /// x light kind (0 directional, 1 point, 2 spot)
    pub params: [f32; 4],
}

/// Lighting environment gathered for one frame
#[derive(Debug, Clone)]
pub struct LightingEnvironment {
    /// Active lights in the scene
    pub lights: Vec<Light>,
    /// Ambient light color
    pub ambient_color: Vec3,
    /// Ambient light intensity
    pub ambient_intensity: f32,
}

impl Default for LightingEnvironment {
    fn default() -> Self {
        Self {
            lights: Vec::new(),
            ambient_color: Vec3::new(1.0, 1.0, 1.0),
            ambient_intensity: 0.1,
        }
    }
}

impl LightingEnvironment {
    /// Create an environment with no lights and default ambient
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all lights but keep the ambient term
    pub fn clear(&mut self) {
        self.lights.clear();
    }

    /// Number of active lights
    pub fn len(&self) -> usize {
        self.lights.len()
    }

    /// Whether no lights are active
    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directional_light_has_no_bounds() {
        let light = Light::directional(Vec3::new(0.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 1.0), 1.0);
        assert!(light.bounds().is_none());
    }

    #[test]
    fn test_point_light_bounds_cover_range() {
        let light = Light::point(Vec3::new(5.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0), 2.0, 10.0);
        let bounds = light.bounds().unwrap();

        assert!(bounds.contains_point(Vec3::new(14.0, 0.0, 0.0)));
        assert!(!bounds.contains_point(Vec3::new(16.0, 0.0, 0.0)));
    }

    #[test]
    fn test_gpu_light_layout() {
        let light = Light::point(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.5, 0.5, 0.5), 2.0, 8.0);
        let gpu = light.to_gpu();

        assert_eq!(std::mem::size_of::<GpuLight>(), 64);
        assert_eq!(gpu.position_range, [1.0, 2.0, 3.0, 8.0]);
        assert_eq!(gpu.params[0], 1.0);
    }
}
