//! An Axis-Aligned Bounding Box (AABB) represented by its minimum and maximum points.

use std::ops::BitAnd;

use glam::{Affine3A, Vec3A};

use crate::{ray::Ray, Boundable};

/// An Axis-Aligned Bounding Box (AABB) represented by its minimum and maximum points.
#[derive(Default, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
pub struct Aabb {
    pub min: Vec3A,
    pub max: Vec3A,
}

impl Aabb {
    /// An invalid (empty) AABB with min set to the maximum possible value
    /// and max set to the minimum possible value.
    pub const INVALID: Self = Self {
        min: Vec3A::splat(f32::MAX),
        max: Vec3A::splat(f32::MIN),
    };

    /// Creates a new AABB with the given minimum and maximum points.
    #[inline(always)]
    pub fn new(min: Vec3A, max: Vec3A) -> Self {
        Self { min, max }
    }

    /// Creates a new AABB with both min and max set to the given point.
    #[inline(always)]
    pub fn from_point(point: Vec3A) -> Self {
        Self {
            min: point,
            max: point,
        }
    }

    /// Creates an AABB that bounds the given set of points.
    #[inline(always)]
    pub fn from_points(points: &[Vec3A]) -> Self {
        points
            .iter()
            .fold(Self::INVALID, |aabb, point| aabb.union(&Self::from_point(*point)))
    }

    /// Checks if the AABB contains the given point.
    #[inline(always)]
    pub fn contains_point(&self, point: Vec3A) -> bool {
        (point.cmpge(self.min).bitand(point.cmple(self.max))).all()
    }

    /// Extends the AABB to include the given point.
    #[inline(always)]
    pub fn extend(&mut self, point: Vec3A) -> &mut Self {
        *self = self.union(&Self::from_point(point));
        self
    }

    /// Returns the union of this AABB and another AABB.
    #[inline(always)]
    pub fn union(&self, other: &Self) -> Self {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns the AABB expanded by `amount` on every side.
    #[inline(always)]
    pub fn grow(&self, amount: f32) -> Self {
        Aabb {
            min: self.min - amount,
            max: self.max + amount,
        }
    }

    /// Returns the diagonal vector of the AABB.
    #[inline(always)]
    pub fn diagonal(&self) -> Vec3A {
        self.max - self.min
    }

    /// Returns the center point of the AABB.
    #[inline(always)]
    pub fn center(&self) -> Vec3A {
        (self.max + self.min) * 0.5
    }

    /// Checks if the AABB is valid (i.e., min <= max on all axes).
    pub fn valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Returns the AABB of this box after applying `space` to all 8 corners.
    pub fn transformed(&self, space: &Affine3A) -> Self {
        let mut aabb = Self::INVALID;
        for i in 0..8 {
            let corner = Vec3A::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            aabb.extend(space.transform_point3a(corner));
        }
        aabb
    }

    /// Checks if this AABB intersects with a ray and returns the distance to the intersection point.
    /// Returns `f32::INFINITY` if there is no intersection within `[ray.tmin, ray.tmax]`.
    #[inline(always)]
    pub fn intersect_ray(&self, ray: &Ray) -> f32 {
        let t1 = (self.min - ray.origin) * ray.inv_direction;
        let t2 = (self.max - ray.origin) * ray.inv_direction;

        let tmin = t1.min(t2);
        let tmax = t1.max(t2);

        let tmin_n = tmin.max_element().max(ray.tmin);
        let tmax_n = tmax.min_element().min(ray.tmax);

        if tmax_n >= tmin_n {
            tmin_n
        } else {
            f32::INFINITY
        }
    }
}

impl Boundable for Aabb {
    #[inline(always)]
    fn aabb(&self) -> Aabb {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    #[test]
    fn test_from_points() {
        let points = vec![Vec3A::ZERO, Vec3A::ONE, Vec3A::splat(2.0)];
        let aabb = Aabb::from_points(&points);
        assert_eq!(aabb.min, Vec3A::ZERO);
        assert_eq!(aabb.max, Vec3A::splat(2.0));
    }

    #[test]
    fn test_from_no_points_is_invalid() {
        assert!(!Aabb::from_points(&[]).valid());
    }

    #[test]
    fn test_extend() {
        let mut aabb = Aabb::from_point(Vec3A::ZERO);
        aabb.extend(Vec3A::ONE);
        assert_eq!(aabb.min, Vec3A::ZERO);
        assert_eq!(aabb.max, Vec3A::ONE);
    }

    #[test]
    fn test_grow() {
        let aabb = Aabb::new(Vec3A::ZERO, Vec3A::ONE).grow(0.5);
        assert_eq!(aabb.min, Vec3A::splat(-0.5));
        assert_eq!(aabb.max, Vec3A::splat(1.5));
        assert_eq!(aabb.center(), Vec3A::splat(0.5));
        assert_eq!(aabb.diagonal(), Vec3A::splat(2.0));
    }

    #[test]
    fn test_transformed_contains_corners() {
        let aabb = Aabb::new(Vec3A::ZERO, Vec3A::ONE);
        let space = Affine3A::from_rotation_translation(
            Quat::from_rotation_z(0.6),
            Vec3::new(1.0, -2.0, 0.5),
        );
        let moved = aabb.transformed(&space);
        assert!(moved.valid());
        assert!(moved.grow(1e-5).contains_point(space.transform_point3a(Vec3A::ONE)));
        assert!(moved.grow(1e-5).contains_point(space.transform_point3a(Vec3A::ZERO)));
    }

    #[test]
    fn test_intersect_ray() {
        let aabb = Aabb::new(Vec3A::ZERO, Vec3A::ONE);
        let ray = Ray::new(Vec3A::splat(-1.0), Vec3A::ONE, 0.0, f32::MAX);
        assert_eq!(aabb.intersect_ray(&ray), 1.0);
        let ray_no_intersect = Ray::new(Vec3A::splat(2.0), Vec3A::ONE, 0.0, f32::MAX);
        assert_eq!(aabb.intersect_ray(&ray_no_intersect), f32::INFINITY);
        let ray_too_short = Ray::new(Vec3A::splat(-1.0), Vec3A::ONE, 0.0, 0.5);
        assert_eq!(aabb.intersect_ray(&ray_too_short), f32::INFINITY);
    }
}
