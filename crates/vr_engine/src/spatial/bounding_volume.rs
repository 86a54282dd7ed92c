//! Bounding volume for culling and picking
//!
//! A sphere (center, radius) paired with an axis-aligned box, kept mutually
//! consistent: every mutation recomputes both representations together.
//! `radius == 0` is the canonical empty/reset state; the corners start at
//! +/- infinity so the first expansion establishes them.

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Sphere + axis-aligned box culling primitive
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingVolume {
    center: Vec3,
    radius: f32,
    min_corner: Vec3,
    max_corner: Vec3,
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingVolume {
    /// Create an empty volume
    pub fn new() -> Self {
        let mut bv = Self {
            center: Vec3::zeros(),
            radius: 0.0,
            min_corner: Vec3::zeros(),
            max_corner: Vec3::zeros(),
        };
        bv.reset();
        bv
    }

    /// Reset to the empty state
    pub fn reset(&mut self) {
        self.center = Vec3::zeros();
        self.radius = 0.0;
        self.min_corner = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
        self.max_corner = Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    }

    /// Sphere center
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Sphere radius; zero means the volume is empty
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Minimum corner of the box
    pub fn min_corner(&self) -> Vec3 {
        self.min_corner
    }

    /// Maximum corner of the box
    pub fn max_corner(&self) -> Vec3 {
        self.max_corner
    }

    /// Expand the current volume by the given point
    pub fn expand_point(&mut self, point: Vec3) {
        for i in 0..3 {
            if self.min_corner[i] > point[i] {
                self.min_corner[i] = point[i];
            }
            if self.max_corner[i] < point[i] {
                self.max_corner[i] = point[i];
            }
        }
        self.update_center_and_radius();
    }

    fn update_center_and_radius(&mut self) {
        self.center = (self.min_corner + self.max_corner) * 0.5;
        if self.min_corner == self.max_corner {
            self.radius = 0.0;
        } else {
            self.radius = (self.max_corner - self.min_corner).norm() * 0.5;
        }
    }

    /// Expand the volume by an incoming sphere.
    ///
    /// Center and radius are merged first; the box is then recomputed as the
    /// cube inscribed in the merged sphere (`side = sqrt(r^2 / 3)` per axis),
    /// trading tightness for O(1) recomputation.
    pub fn expand_sphere(&mut self, in_center: Vec3, in_radius: f32) {
        let center_distance = in_center - self.center;
        let length = center_distance.norm();

        // 1. If the original volume is reset, adopt the incoming sphere wholesale
        if self.radius == 0.0 {
            self.radius = in_radius;
            self.center = in_center;
        }
        // 2. Same center and a bigger incoming radius: grow the radius only
        else if length == 0.0 && in_radius > self.radius {
            self.radius = in_radius;
        }
        // 3. Incoming sphere not completely inside: the new center is the
        // midpoint of the two outermost points along the line connecting the
        // centers, the new radius half the distance between them.
        else if (length + in_radius) > self.radius {
            let dir = center_distance / length;
            let c1 = in_center + dir * in_radius;
            let c0 = self.center - dir * self.radius;
            self.center = (c0 + c1) * 0.5;
            self.radius = (c1 - c0).norm() * 0.5;
        }
        // 4. Incoming sphere fully contained: no change to the sphere.

        // Define the bounding box inscribed in the sphere:
        //   r^2 = s^2 + s^2 + s^2  =>  s = sqrt(r^2 / 3)
        let side = (self.radius * self.radius / 3.0).sqrt();
        self.min_corner = Vec3::new(
            self.center[0] - side,
            self.center[1] - side,
            self.center[2] - side,
        );
        self.max_corner = Vec3::new(
            self.center[0] + side,
            self.center[1] + side,
            self.center[2] + side,
        );
    }

    /// Expand the volume by another volume's box corners
    pub fn expand_volume(&mut self, volume: &BoundingVolume) {
        self.expand_point(volume.min_corner());
        self.expand_point(volume.max_corner());
    }

    /// Replace this volume with `in_volume` transformed by `matrix`.
    ///
    /// Uses the component-wise-absolute-matrix technique to produce a
    /// conservative axis-aligned bound under arbitrary affine transforms,
    /// including non-uniform scale and rotation. The result may be loose but
    /// is always a superset of the transformed input.
    pub fn transform(&mut self, in_volume: &BoundingVolume, matrix: &Mat4) {
        self.reset();

        let center = (in_volume.min_corner() + in_volume.max_corner()) / 2.0;
        let extent = (in_volume.max_corner() - in_volume.min_corner()) / 2.0;

        let mut abs_matrix = Mat4::identity();
        for i in 0..3 {
            for j in 0..3 {
                abs_matrix[(i, j)] = matrix[(i, j)].abs();
            }
        }

        let new_center = matrix * Vec4::new(center.x, center.y, center.z, 1.0);
        let new_extent = abs_matrix * Vec4::new(extent.x, extent.y, extent.z, 0.0);

        let bb_min = new_center - new_extent;
        let bb_max = new_center + new_extent;

        self.expand_point(Vec3::new(bb_min.x, bb_min.y, bb_min.z));
        self.expand_point(Vec3::new(bb_max.x, bb_max.y, bb_max.z));
        self.update_center_and_radius();
    }

    /// Slab-method ray/box test against this volume's corners.
    ///
    /// Returns the near intersection point, or `None` both when the box is
    /// entirely behind the ray origin and when the entry time exceeds the
    /// exit time.
    pub fn intersect(&self, ray_start: Vec3, ray_dir: Vec3) -> Option<Vec3> {
        Self::intersect_aabb(ray_start, ray_dir, self.min_corner, self.max_corner)
    }

    /// Slab-method ray test against an arbitrary axis-aligned box
    pub fn intersect_aabb(
        ray_start: Vec3,
        ray_dir: Vec3,
        min_corner: Vec3,
        max_corner: Vec3,
    ) -> Option<Vec3> {
        let direction = ray_dir.normalize();
        let dirfrac = Vec3::new(1.0 / direction.x, 1.0 / direction.y, 1.0 / direction.z);

        let t1 = (min_corner.x - ray_start.x) * dirfrac.x;
        let t2 = (max_corner.x - ray_start.x) * dirfrac.x;
        let t3 = (min_corner.y - ray_start.y) * dirfrac.y;
        let t4 = (max_corner.y - ray_start.y) * dirfrac.y;
        let t5 = (min_corner.z - ray_start.z) * dirfrac.z;
        let t6 = (max_corner.z - ray_start.z) * dirfrac.z;

        let tmin = t1.min(t2).max(t3.min(t4)).max(t5.min(t6));
        let tmax = t1.max(t2).min(t3.max(t4)).min(t5.max(t6));

        // Whole box behind the ray origin
        if tmax < 0.0 {
            return None;
        }
        // No intersection
        if tmin > tmax {
            return None;
        }
        Some(ray_start + direction * tmin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_volume_is_empty() {
        let bv = BoundingVolume::new();
        assert_eq!(bv.radius(), 0.0);
        assert!(bv.min_corner().x.is_infinite());
        assert!(bv.max_corner().x.is_infinite());
    }

    #[test]
    fn test_expand_two_points() {
        // Scenario: expand by (0,0,0) and (2,2,2)
        let mut bv = BoundingVolume::new();
        bv.expand_point(Vec3::new(0.0, 0.0, 0.0));
        bv.expand_point(Vec3::new(2.0, 2.0, 2.0));

        assert_relative_eq!(bv.center(), Vec3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(bv.radius(), 12.0_f32.sqrt() * 0.5, epsilon = 1e-6);
        assert_relative_eq!(bv.min_corner(), Vec3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(bv.max_corner(), Vec3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn test_expand_is_idempotent_for_interior_points() {
        let mut bv = BoundingVolume::new();
        bv.expand_point(Vec3::new(-1.0, -1.0, -1.0));
        bv.expand_point(Vec3::new(1.0, 1.0, 1.0));

        let before = bv.clone();
        bv.expand_point(Vec3::new(0.5, 0.0, -0.5));
        assert_eq!(bv, before);
    }

    #[test]
    fn test_expand_is_monotonic() {
        let mut bv = BoundingVolume::new();
        bv.expand_point(Vec3::new(0.0, 0.0, 0.0));
        let mut prev_radius = bv.radius();
        let mut prev_span = bv.max_corner() - bv.min_corner();

        for p in [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-2.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 5.0),
            Vec3::new(0.1, 0.1, 0.1),
        ] {
            bv.expand_point(p);
            let span = bv.max_corner() - bv.min_corner();
            assert!(bv.radius() >= prev_radius);
            for i in 0..3 {
                assert!(span[i] >= prev_span[i]);
            }
            prev_radius = bv.radius();
            prev_span = span;
        }
    }

    #[test]
    fn test_sphere_merge_adopts_incoming_when_empty() {
        let mut bv = BoundingVolume::new();
        bv.expand_sphere(Vec3::new(1.0, 2.0, 3.0), 2.0);
        assert_relative_eq!(bv.center(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bv.radius(), 2.0);
    }

    #[test]
    fn test_sphere_merge_box_is_inscribed_cube() {
        let mut bv = BoundingVolume::new();
        bv.expand_sphere(Vec3::zeros(), 3.0);
        bv.expand_sphere(Vec3::new(4.0, 0.0, 0.0), 1.0);

        let side = (bv.radius() * bv.radius() / 3.0).sqrt();
        let span = bv.max_corner() - bv.min_corner();
        for i in 0..3 {
            assert_relative_eq!(span[i], 2.0 * side, epsilon = 1e-5);
        }
        assert_relative_eq!(
            (bv.min_corner() + bv.max_corner()) * 0.5,
            bv.center(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_sphere_merge_contained_sphere_is_noop_for_sphere() {
        let mut bv = BoundingVolume::new();
        bv.expand_sphere(Vec3::zeros(), 10.0);
        let (center, radius) = (bv.center(), bv.radius());

        bv.expand_sphere(Vec3::new(1.0, 0.0, 0.0), 1.0);
        assert_relative_eq!(bv.center(), center);
        assert_eq!(bv.radius(), radius);
    }

    #[test]
    fn test_sphere_merge_same_center_larger_radius() {
        let mut bv = BoundingVolume::new();
        bv.expand_sphere(Vec3::new(1.0, 1.0, 1.0), 1.0);
        bv.expand_sphere(Vec3::new(1.0, 1.0, 1.0), 4.0);
        assert_relative_eq!(bv.center(), Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(bv.radius(), 4.0);
    }

    #[test]
    fn test_sphere_merge_overlapping_spheres() {
        let mut bv = BoundingVolume::new();
        bv.expand_sphere(Vec3::zeros(), 1.0);
        bv.expand_sphere(Vec3::new(4.0, 0.0, 0.0), 1.0);

        // Outermost points are (-1,0,0) and (5,0,0)
        assert_relative_eq!(bv.center(), Vec3::new(2.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(bv.radius(), 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_transform_translation() {
        let mut src = BoundingVolume::new();
        src.expand_point(Vec3::new(-1.0, -1.0, -1.0));
        src.expand_point(Vec3::new(1.0, 1.0, 1.0));

        let m = Mat4::new_translation(&Vec3::new(10.0, 0.0, 0.0));
        let mut dst = BoundingVolume::new();
        dst.transform(&src, &m);

        assert_relative_eq!(dst.center(), Vec3::new(10.0, 0.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(dst.min_corner(), Vec3::new(9.0, -1.0, -1.0), epsilon = 1e-6);
        assert_relative_eq!(dst.max_corner(), Vec3::new(11.0, 1.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_transform_is_conservative_under_rotation() {
        let mut src = BoundingVolume::new();
        src.expand_point(Vec3::new(-1.0, -2.0, -3.0));
        src.expand_point(Vec3::new(1.0, 2.0, 3.0));

        // 90 degrees around Z
        let m = Mat4::from_axis_angle(
            &nalgebra::Unit::new_normalize(Vec3::z()),
            std::f32::consts::FRAC_PI_2,
        );
        let mut dst = BoundingVolume::new();
        dst.transform(&src, &m);

        // The rotated extents swap X and Y; the bound must cover them
        assert!(dst.max_corner().x >= 2.0 - 1e-4);
        assert!(dst.max_corner().y >= 1.0 - 1e-4);
        assert!(dst.max_corner().z >= 3.0 - 1e-4);
    }

    #[test]
    fn test_intersect_hit_returns_near_point() {
        let mut bv = BoundingVolume::new();
        bv.expand_point(Vec3::new(-1.0, -1.0, -1.0));
        bv.expand_point(Vec3::new(1.0, 1.0, 1.0));

        let hit = bv
            .intersect(Vec3::new(0.0, 0.0, -5.0), Vec3::new(0.0, 0.0, 1.0))
            .expect("ray through the box center must hit");
        assert_relative_eq!(hit, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_intersect_miss() {
        let mut bv = BoundingVolume::new();
        bv.expand_point(Vec3::new(-1.0, -1.0, -1.0));
        bv.expand_point(Vec3::new(1.0, 1.0, 1.0));

        assert!(bv
            .intersect(Vec3::new(5.0, 5.0, -5.0), Vec3::new(0.0, 0.0, 1.0))
            .is_none());
    }

    #[test]
    fn test_intersect_box_behind_ray() {
        let mut bv = BoundingVolume::new();
        bv.expand_point(Vec3::new(-1.0, -1.0, -1.0));
        bv.expand_point(Vec3::new(1.0, 1.0, 1.0));

        assert!(bv
            .intersect(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 1.0))
            .is_none());
    }
}
