//! Bounding volumes and the view frustum

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half-extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the half-extents of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Whether the volume has strictly positive, finite extents
    pub fn is_valid(&self) -> bool {
        let finite = self.min.iter().all(|c| c.is_finite()) && self.max.iter().all(|c| c.is_finite());
        finite && self.max.x > self.min.x && self.max.y > self.min.y && self.max.z > self.min.z
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x
            && point.y >= self.min.y && point.y <= self.max.y
            && point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB fully contains another AABB
    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        self.min.x <= other.min.x && self.max.x >= other.max.x
            && self.min.y <= other.min.y && self.max.y >= other.max.y
            && self.min.z <= other.min.z && self.max.z >= other.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x
            && self.min.y <= other.max.y && self.max.y >= other.min.y
            && self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Squared distance from a point to the closest point on this AABB
    pub fn distance_squared_to_point(&self, point: Vec3) -> f32 {
        let closest = Vec3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        );
        (closest - point).magnitude_squared()
    }

    /// Test ray intersection using the slab method
    ///
    /// Returns the distance to the entry point if the ray intersects, None otherwise.
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv_dir = Vec3::new(
            if ray_dir.x != 0.0 { 1.0 / ray_dir.x } else { f32::INFINITY },
            if ray_dir.y != 0.0 { 1.0 / ray_dir.y } else { f32::INFINITY },
            if ray_dir.z != 0.0 { 1.0 / ray_dir.z } else { f32::INFINITY },
        );

        let t1 = (self.min.x - ray_origin.x) * inv_dir.x;
        let t2 = (self.max.x - ray_origin.x) * inv_dir.x;
        let t3 = (self.min.y - ray_origin.y) * inv_dir.y;
        let t4 = (self.max.y - ray_origin.y) * inv_dir.y;
        let t5 = (self.min.z - ray_origin.z) * inv_dir.z;
        let t6 = (self.max.z - ray_origin.z) * inv_dir.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }

    /// World-space bounds of this volume after applying a transform matrix
    ///
    /// Transforms all eight corners and re-fits an axis-aligned box.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let mut min = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        let mut max = -min;

        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 != 0 { self.max.x } else { self.min.x },
                if i & 2 != 0 { self.max.y } else { self.min.y },
                if i & 4 != 0 { self.max.z } else { self.min.z },
            );
            let world = matrix * Vec4::new(corner.x, corner.y, corner.z, 1.0);
            min.x = min.x.min(world.x);
            min.y = min.y.min(world.y);
            min.z = min.z.min(world.z);
            max.x = max.x.max(world.x);
            max.y = max.y.max(world.y);
            max.z = max.z.max(world.z);
        }

        Aabb::new(min, max)
    }
}

/// Plane defined by normal and distance from origin
///
/// Points with `normal · p + distance >= 0` are on the inside.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Normal vector (should be normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self {
            normal: normal.normalize(),
            distance,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// View frustum for visibility culling
///
/// Six half-spaces; a volume is visible when it is not fully outside any plane.
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Six planes (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// Gribb-Hartmann extraction for a projection mapping depth to [0, 1].
    pub fn from_matrix(vp: &Mat4) -> Self {
        let row = |i: usize| Vec4::new(vp[(i, 0)], vp[(i, 1)], vp[(i, 2)], vp[(i, 3)]);

        let r0 = row(0);
        let r1 = row(1);
        let r2 = row(2);
        let r3 = row(3);

        let planes = [
            Self::plane_from_row(r3 + r0), // left
            Self::plane_from_row(r3 - r0), // right
            Self::plane_from_row(r3 + r1), // bottom
            Self::plane_from_row(r3 - r1), // top
            Self::plane_from_row(r2),      // near (z >= 0)
            Self::plane_from_row(r3 - r2), // far
        ];

        Self { planes }
    }

    /// Axis-aligned box frustum covering a world region
    ///
    /// Useful for region queries where a projective frustum is overkill.
    pub fn from_box(region: &Aabb) -> Self {
        let planes = [
            Plane { normal: Vec3::new(1.0, 0.0, 0.0), distance: -region.min.x },
            Plane { normal: Vec3::new(-1.0, 0.0, 0.0), distance: region.max.x },
            Plane { normal: Vec3::new(0.0, 1.0, 0.0), distance: -region.min.y },
            Plane { normal: Vec3::new(0.0, -1.0, 0.0), distance: region.max.y },
            Plane { normal: Vec3::new(0.0, 0.0, 1.0), distance: -region.min.z },
            Plane { normal: Vec3::new(0.0, 0.0, -1.0), distance: region.max.z },
        ];

        Self { planes }
    }

    fn plane_from_row(row: Vec4) -> Plane {
        let normal = Vec3::new(row.x, row.y, row.z);
        let len = normal.magnitude();
        if len > f32::EPSILON {
            Plane {
                normal: normal / len,
                distance: row.w / len,
            }
        } else {
            // Degenerate row: accept everything on this plane
            Plane {
                normal: Vec3::zeros(),
                distance: 0.0,
            }
        }
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // Positive vertex: the corner farthest along the plane normal
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; }

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }

        true
    }

    /// Check if an AABB is fully inside the frustum
    pub fn contains_aabb(&self, aabb: &Aabb) -> bool {
        for plane in &self.planes {
            // Negative vertex: the corner closest against the plane normal
            let mut n = aabb.max;
            if plane.normal.x >= 0.0 { n.x = aabb.min.x; }
            if plane.normal.y >= 0.0 { n.y = aabb.min.y; }
            if plane.normal.z >= 0.0 { n.z = aabb.min.z; }

            if plane.distance_to_point(n) < 0.0 {
                return false;
            }
        }

        true
    }

    /// Check if a point is inside the frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.distance_to_point(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_contains_point() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));

        assert!(aabb.contains_point(Vec3::zeros()));
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_intersects() {
        let a = Aabb::new(Vec3::zeros(), Vec3::new(2.0, 2.0, 2.0));
        let b = Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0));
        let c = Aabb::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(7.0, 7.0, 7.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_aabb_validity() {
        assert!(Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)).is_valid());
        // Zero extent on one axis is degenerate
        assert!(!Aabb::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 1.0)).is_valid());
        // Inverted bounds are degenerate
        assert!(!Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::zeros()).is_valid());
        assert!(!Aabb::new(Vec3::new(f32::NAN, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0)).is_valid());
    }

    #[test]
    fn test_aabb_ray_intersection() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0));

        let hit = aabb.intersect_ray(Vec3::zeros(), Vec3::new(0.0, 0.0, 1.0));
        assert!(hit.is_some());
        assert!((hit.unwrap() - 4.0).abs() < 1e-5);

        let miss = aabb.intersect_ray(Vec3::zeros(), Vec3::new(0.0, 1.0, 0.0));
        assert!(miss.is_none());
    }

    #[test]
    fn test_box_frustum_classification() {
        let region = Aabb::new(Vec3::zeros(), Vec3::new(10.0, 10.0, 10.0));
        let frustum = Frustum::from_box(&region);

        let inside = Aabb::from_center_extents(Vec3::new(5.0, 5.0, 5.0), Vec3::new(1.0, 1.0, 1.0));
        let straddling =
            Aabb::from_center_extents(Vec3::new(10.0, 5.0, 5.0), Vec3::new(2.0, 2.0, 2.0));
        let outside =
            Aabb::from_center_extents(Vec3::new(20.0, 5.0, 5.0), Vec3::new(1.0, 1.0, 1.0));

        assert!(frustum.contains_aabb(&inside));
        assert!(frustum.intersects_aabb(&inside));

        assert!(frustum.intersects_aabb(&straddling));
        assert!(!frustum.contains_aabb(&straddling));

        assert!(!frustum.intersects_aabb(&outside));
    }

    #[test]
    fn test_frustum_from_projection_matrix() {
        use crate::foundation::math::Mat4Ext;

        // Camera at origin looking down +Z (world), 90 degree vertical fov.
        let view = Mat4::depth_coordinate_transform()
            * Mat4::look_at(Vec3::zeros(), Vec3::new(0.0, 0.0, 10.0), Vec3::new(0.0, 1.0, 0.0));
        let proj = Mat4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);
        let frustum = Frustum::from_matrix(&(proj * view));

        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, 5.0)));
        assert!(frustum.contains_point(Vec3::new(0.0, 3.0, 5.0)));
        // Behind the camera
        assert!(!frustum.contains_point(Vec3::new(0.0, 0.0, -5.0)));
        // Outside the 45 degree half-angle
        assert!(!frustum.contains_point(Vec3::new(0.0, 8.0, 5.0)));
    }
}
