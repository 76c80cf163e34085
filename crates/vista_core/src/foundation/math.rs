//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics, re-exported from nalgebra
//! behind short aliases.

pub use nalgebra::{Matrix3, Matrix4, Quaternion, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Combine this transform with a child transform (parent * child)
    pub fn combine(&self, child: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * self.scale.component_mul(&child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale.component_mul(&child.scale),
        }
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }
}

/// Math utility functions
pub mod utils {
    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }
}

/// Extension trait for Mat4 with additional convenience methods
pub trait Mat4Ext {
    /// Create a perspective projection matrix mapping depth to [0, 1]
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a look-at view matrix (right-handed, camera looks down -Z)
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Intermediate coordinate flip applied between the look-at matrix and the
    /// projection so that view-space depth increases into the screen
    fn depth_coordinate_transform() -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut result = Mat4::zeros();

        // P = [a⁻¹/tan(φ/2)    0              0                    0           ]
        //     [0               1/tan(φ/2)     0                    0           ]
        //     [0               0              f/(f-n)              -nf/(f-n)   ]
        //     [0               0              1                    0           ]
        result[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        result[(1, 1)] = 1.0 / tan_half_fovy;
        result[(2, 2)] = far / (far - near);
        result[(2, 3)] = -(near * far) / (far - near);
        result[(3, 2)] = 1.0;

        result
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }

    fn depth_coordinate_transform() -> Mat4 {
        // Flips Y and Z so that view-space +Z points into the screen and the
        // projection above can treat depth as positive distance.
        Mat4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.0, 0.0, -1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_combine_translation() {
        let parent = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        let child = Transform::from_position(Vec3::new(0.0, 2.0, 0.0));

        let world = parent.combine(&child);
        assert_relative_eq!(world.position.x, 1.0);
        assert_relative_eq!(world.position.y, 2.0);
    }

    #[test]
    fn test_transform_matrix_translation() {
        let t = Transform::from_position(Vec3::new(3.0, -1.0, 2.0));
        let p = t.to_matrix().transform_point(&Point3::origin());

        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, -1.0);
        assert_relative_eq!(p.z, 2.0);
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Mat4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);

        // A point on the near plane maps to depth 0, the far plane to depth 1.
        let near = proj * Vec4::new(0.0, 0.0, 1.0, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, 100.0, 1.0);

        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }
}
