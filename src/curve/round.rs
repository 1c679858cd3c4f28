//! Round curve intersection. The segment is recursively split until each piece is flat enough to be treated as a
//! cylinder around its chord.

use std::f32::consts::SQRT_2;

use glam::{Vec3A, Vec4, Vec4Swizzles};

use crate::{
    aabb::Aabb,
    curve::{BezierCurve, RaySpace},
    epilogue::{CurveHit, Epilogue},
    ray::Ray,
    scope,
};

pub const MAX_SUBDIVISION_DEPTH: u32 = 10;

/// Per ray precalculation for round curves.
#[derive(Clone, Copy, Debug)]
pub struct RoundCurveIntersector {
    space: RaySpace,
}

impl RoundCurveIntersector {
    pub fn new(ray: &Ray) -> Self {
        Self {
            space: RaySpace::new(ray),
        }
    }

    /// Intersects the ray this was built from with the round curve `cp` and reports the closest root through
    /// `epilogue`. Returns true if the epilogue accepted it.
    pub fn intersect(&self, cp: &[Vec4; 4], epilogue: &mut Epilogue) -> bool {
        scope!("round_intersect");
        let curve = self.space.to_ray_space(&BezierCurve::new(*cp));
        let max_radius = curve.max_radius();
        if max_radius <= 0.0 {
            return false;
        }

        let (z_min, z_max) = self.space.depth_range(epilogue.ray());
        if !overlaps_ray(&curve.bounds(), z_min, z_max) {
            return false;
        }

        let mut closest = Closest {
            z_min,
            z_far: z_max,
            hit: None,
        };
        self.recursive_intersect(
            &curve,
            0.0,
            1.0,
            subdivision_depth(&curve, max_radius),
            &mut closest,
        );

        match closest.hit {
            Some(hit) => epilogue.record(hit),
            None => false,
        }
    }

    fn recursive_intersect(
        &self,
        curve: &BezierCurve,
        u0: f32,
        u1: f32,
        depth: u32,
        closest: &mut Closest,
    ) {
        if depth > 0 {
            let (a, b) = curve.split();
            let u_mid = (u0 + u1) * 0.5;
            for (half, lo, hi) in [(a, u0, u_mid), (b, u_mid, u1)] {
                if overlaps_ray(&half.bounds(), closest.z_min, closest.z_far) {
                    self.recursive_intersect(&half, lo, hi, depth - 1, closest);
                }
            }
            return;
        }

        if let Some((z, s, normal)) =
            intersect_cylinder(curve.cp[0], curve.cp[3], closest.z_min, closest.z_far)
        {
            closest.z_far = z;
            closest.hit = Some(CurveHit {
                t: z * self.space.depth_scale,
                u: u0 + (u1 - u0) * s,
                v: 0.0,
                ng: self.space.to_world_vector(normal),
            });
        }
    }
}

struct Closest {
    z_min: f32,
    z_far: f32,
    hit: Option<CurveHit>,
}

/// Does the ray space bounding box touch the +z axis within `[z_min, z_max]`?
#[inline(always)]
fn overlaps_ray(bounds: &Aabb, z_min: f32, z_max: f32) -> bool {
    bounds.min.x <= 0.0
        && bounds.max.x >= 0.0
        && bounds.min.y <= 0.0
        && bounds.max.y >= 0.0
        && bounds.max.z >= z_min
        && bounds.min.z <= z_max
}

/// Number of halvings needed before the chord of each piece stays within a tenth of the radius of the curve.
// Based on the refinement depth in pbrt-v3 curve.cpp
pub fn subdivision_depth(curve: &BezierCurve, max_radius: f32) -> u32 {
    let cp = &curve.cp;
    let l0 = (0..2).fold(0.0f32, |l, i| {
        let v = (cp[i] - 2.0 * cp[i + 1] + cp[i + 2]).xyz().abs();
        l.max(v.max_element())
    });
    let eps = max_radius * 0.1;
    if eps <= 0.0 {
        return 0;
    }
    let ratio = SQRT_2 * 6.0 * l0 / (8.0 * eps);
    if ratio <= 1.0 {
        0
    } else {
        // log base 4
        ((ratio.log2().floor() as u32) / 2).min(MAX_SUBDIVISION_DEPTH)
    }
}

/// Intersects the ray space ray (origin 0, direction +z) with the cylinder around `p0 -> p1` whose radius is the
/// mean of the end radii. Returns the depth, the parameter along the chord and the unnormalized outward normal.
#[inline(always)]
fn intersect_cylinder(p0: Vec4, p1: Vec4, z_min: f32, z_max: f32) -> Option<(f32, f32, Vec3A)> {
    let base = Vec3A::from(p0.xyz());
    let a = Vec3A::from(p1.xyz()) - base;
    let len2 = a.length_squared();
    let radius = (p0.w + p1.w) * 0.5;
    if len2 <= 0.0 || radius <= 0.0 {
        return None;
    }
    let axis = a / len2.sqrt();

    let w = -base;
    let d_perp = Vec3A::Z - axis * axis.z;
    let w_perp = w - axis * w.dot(axis);

    let qa = d_perp.length_squared();
    if qa <= f32::EPSILON {
        // Looking straight down the chord
        return None;
    }
    let qb = 2.0 * d_perp.dot(w_perp);
    let qc = w_perp.length_squared() - radius * radius;
    let disc = qb * qb - 4.0 * qa * qc;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let inv = 0.5 / qa;

    for z in [(-qb - sq) * inv, (-qb + sq) * inv] {
        if z < z_min || z > z_max {
            continue;
        }
        let s = (Vec3A::Z * z - base).dot(a) / len2;
        if !(0.0..=1.0).contains(&s) {
            continue;
        }
        let normal = Vec3A::Z * z - (base + a * s);
        return Some((z, s, normal));
    }
    None
}
