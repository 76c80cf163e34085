//! Camera with derived view frustum

use serde::{Deserialize, Serialize};

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::scene::LayerMask;
use crate::spatial::Frustum;

/// Perspective projection parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Projection {
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width / height ratio of the output surface
    pub aspect: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            fov_y: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Camera with cached matrices and culling frustum
///
/// [`Camera::refresh`] recomputes the matrices and frustum; the frame driver
/// calls it exactly once per frame, before any spatial queries, so the whole
/// frame culls against one consistent frustum.
#[derive(Debug, Clone)]
pub struct Camera {
    eye: Vec3,
    target: Vec3,
    up: Vec3,
    projection: Projection,
    /// Layers this camera renders
    pub mask: LayerMask,
    view: Mat4,
    proj: Mat4,
    view_proj: Mat4,
    frustum: Frustum,
}

impl Camera {
    /// Create a perspective camera at the origin looking down +Z
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            eye: Vec3::zeros(),
            target: Vec3::new(0.0, 0.0, 1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            projection: Projection {
                fov_y,
                aspect,
                near,
                far,
            },
            mask: LayerMask::ALL,
            view: Mat4::identity(),
            proj: Mat4::identity(),
            view_proj: Mat4::identity(),
            frustum: Frustum::from_matrix(&Mat4::identity()),
        };
        camera.refresh();
        camera
    }

    /// Position and orient the camera
    ///
    /// `target` must not coincide with `eye`, and the view direction must not
    /// be parallel to `up`.
    pub fn set_pose(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.eye = eye;
        self.target = target;
        self.up = up;
    }

    /// Replace the projection parameters
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    /// Update only the aspect ratio, typically after a viewport resize
    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection.aspect = aspect;
    }

    /// Recompute matrices and the derived frustum from the current pose
    pub fn refresh(&mut self) {
        self.view =
            Mat4::depth_coordinate_transform() * Mat4::look_at(self.eye, self.target, self.up);
        self.proj = Mat4::perspective(
            self.projection.fov_y,
            self.projection.aspect,
            self.projection.near,
            self.projection.far,
        );
        self.view_proj = self.proj * self.view;
        self.frustum = Frustum::from_matrix(&self.view_proj);
    }

    /// Camera position
    pub fn position(&self) -> Vec3 {
        self.eye
    }

    /// Current projection parameters
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// View matrix from the last refresh
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// Projection matrix from the last refresh
    pub fn projection_matrix(&self) -> Mat4 {
        self.proj
    }

    /// Combined view-projection matrix from the last refresh
    pub fn view_projection(&self) -> Mat4 {
        self.view_proj
    }

    /// Culling frustum from the last refresh
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Aabb;

    #[test]
    fn test_frustum_follows_pose() {
        let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);

        let ahead = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 10.0), Vec3::new(1.0, 1.0, 1.0));
        assert!(camera.frustum().intersects_aabb(&ahead));

        // Turn around; the same volume is now behind the camera
        camera.set_pose(Vec3::zeros(), Vec3::new(0.0, 0.0, -10.0), Vec3::new(0.0, 1.0, 0.0));
        camera.refresh();
        assert!(!camera.frustum().intersects_aabb(&ahead));
    }

    #[test]
    fn test_stale_frustum_until_refresh() {
        let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let ahead = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 10.0), Vec3::new(1.0, 1.0, 1.0));

        camera.set_pose(Vec3::zeros(), Vec3::new(0.0, 0.0, -10.0), Vec3::new(0.0, 1.0, 0.0));
        // No refresh yet: the cached frustum still faces +Z
        assert!(camera.frustum().intersects_aabb(&ahead));
    }
}
