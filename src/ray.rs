//! A ray in 3D space.

use glam::{vec3a, Affine3A, Vec3A};

/// Computes the inverse of `x` avoiding division by zero.
pub fn safe_inverse(x: f32) -> f32 {
    if x.abs() <= f32::EPSILON {
        x.signum() / f32::EPSILON
    } else {
        1.0 / x
    }
}

/// A struct representing a ray in 3D space.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct Ray {
    /// The starting point of the ray.
    pub origin: Vec3A,
    /// The direction vector of the ray. Not required to be normalized, `t` is measured in multiples of it.
    pub direction: Vec3A,
    /// The inverse of the direction vector components.
    /// Used to avoid division in the leaf slab test.
    pub inv_direction: Vec3A,
    /// The minimum `t` (distance) value for intersection tests.
    pub tmin: f32,
    /// The maximum `t` (distance) value for intersection tests. Shrinks as closer hits are recorded.
    pub tmax: f32,
}

impl Ray {
    /// Creates a new `Ray` with the given origin, direction, and `t` (distance) range.
    pub fn new(origin: Vec3A, direction: Vec3A, min: f32, max: f32) -> Self {
        let ray = Ray {
            origin,
            direction,
            inv_direction: vec3a(
                safe_inverse(direction.x),
                safe_inverse(direction.y),
                safe_inverse(direction.z),
            ),
            tmin: min,
            tmax: max,
        };

        debug_assert!(ray.inv_direction.is_finite());
        debug_assert!(ray.direction.is_finite());
        debug_assert!(origin.is_finite());

        ray
    }

    /// Creates a new infinite `Ray` with the given origin, direction.
    pub fn new_inf(origin: Vec3A, direction: Vec3A) -> Self {
        Self::new(origin, direction, 0.0, f32::INFINITY)
    }

    /// Returns the point at distance `t` along the ray.
    #[inline(always)]
    pub fn at(&self, t: f32) -> Vec3A {
        self.origin + self.direction * t
    }

    /// Maps the ray into another frame. The direction is not renormalized so `t` values are preserved.
    #[inline(always)]
    pub fn transformed(&self, space: &Affine3A) -> Self {
        Self::new(
            space.transform_point3a(self.origin),
            space.transform_vector3a(self.direction),
            self.tmin,
            self.tmax,
        )
    }
}

/// A struct representing a hit record in ray tracing.
/// A `Hit` record contains the IDs of the primitive and geometry that
/// were hit, the `t` (distance) value at which the hit occurred and the curve surface data
/// needed for shading.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct RayHit {
    pub primitive_id: u32,
    pub geometry_id: u32,
    pub t: f32,
    /// Parameter along the curve, 0 at the first control point.
    pub u: f32,
    /// Parameter across the curve. Only meaningful for flat curves.
    pub v: f32,
    /// Unnormalized geometric normal.
    pub ng: Vec3A,
}

pub const INVALID_ID: u32 = u32::MAX;

impl RayHit {
    /// Creates a new `RayHit` instance representing no hit.
    pub fn none() -> Self {
        Self {
            primitive_id: INVALID_ID,
            geometry_id: INVALID_ID,
            t: f32::INFINITY,
            u: 0.0,
            v: 0.0,
            ng: Vec3A::ZERO,
        }
    }

    /// Returns true if a hit was recorded.
    #[inline(always)]
    pub fn is_hit(&self) -> bool {
        self.geometry_id != INVALID_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn safe_inverse_avoids_infinity() {
        assert_eq!(safe_inverse(2.0), 0.5);
        assert!(safe_inverse(0.0).is_finite());
        assert!(safe_inverse(-0.0) < 0.0);
    }

    #[test]
    fn transformed_ray_preserves_distances() {
        let ray = Ray::new(vec3a(1.0, 2.0, 3.0), vec3a(0.0, 0.0, -2.0), 0.5, 10.0);
        let space = Affine3A::from_scale_rotation_translation(
            Vec3::splat(3.0),
            Quat::from_rotation_y(0.7),
            Vec3::new(-4.0, 1.0, 2.0),
        );
        let local = ray.transformed(&space);
        assert_eq!(local.tmin, 0.5);
        assert_eq!(local.tmax, 10.0);
        let world_point = space.transform_point3a(ray.at(1.7));
        assert!(world_point.abs_diff_eq(local.at(1.7), 1e-4));
    }

    #[test]
    fn none_is_not_a_hit() {
        assert!(!RayHit::none().is_hit());
    }
}
