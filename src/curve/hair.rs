//! Flat curve intersection: the curve is treated as a ribbon that always faces the ray and is tessellated into
//! `tessellation_rate` linear pieces.

use glam::{Vec3A, Vec4, Vec4Swizzles};

use crate::{
    curve::{BezierCurve, RaySpace},
    epilogue::{CurveHit, Epilogue},
    ray::Ray,
    scope,
};

/// Upper bound on the per-geometry tessellation rate.
pub const MAX_TESSELLATION: u32 = 32;

/// Per ray precalculation for flat curves.
#[derive(Clone, Copy, Debug)]
pub struct HairIntersector {
    space: RaySpace,
    ng: Vec3A,
}

impl HairIntersector {
    pub fn new(ray: &Ray) -> Self {
        Self {
            space: RaySpace::new(ray),
            ng: -ray.direction,
        }
    }

    /// Intersects the ray this was built from with the flat curve `cp` and reports every root through `epilogue`.
    /// Returns true if the epilogue accepted a root.
    pub fn intersect(
        &self,
        cp: &[Vec4; 4],
        tessellation_rate: u32,
        epilogue: &mut Epilogue,
    ) -> bool {
        scope!("hair_intersect");
        let curve = self.space.to_ray_space(&BezierCurve::new(*cp));
        let (z_min, z_max) = self.space.depth_range(epilogue.ray());

        // In ray space the ray is the +z axis so the hull must straddle x = 0 & y = 0.
        let bounds = curve.bounds();
        if bounds.min.x > 0.0
            || bounds.max.x < 0.0
            || bounds.min.y > 0.0
            || bounds.max.y < 0.0
            || bounds.max.z < z_min
            || bounds.min.z > z_max
        {
            return false;
        }

        let segments = tessellation_rate.clamp(1, MAX_TESSELLATION);
        let step = 1.0 / segments as f32;
        let mut candidates = [CurveHit::default(); MAX_TESSELLATION as usize];
        let mut count = 0;

        let mut p0 = curve.eval(0.0);
        for i in 0..segments {
            let p1 = curve.eval((i + 1) as f32 * step);
            if let Some((s, p)) = closest_to_ray(p0, p1) {
                if p.z >= z_min && p.z <= z_max {
                    candidates[count] = self.surface(p, p1 - p0, (i as f32 + s) * step);
                    count += 1;
                }
            }
            p0 = p1;
        }

        count > 0 && epilogue.record_nearest(&mut candidates[..count])
    }

    #[inline(always)]
    fn surface(&self, p: Vec4, tangent: Vec4, u: f32) -> CurveHit {
        let dist = p.xy().length();
        // Which side of the center line the ray passes on.
        let side = tangent.xy().perp_dot(-p.xy());
        let offset = dist / (2.0 * p.w);
        CurveHit {
            t: p.z * self.space.depth_scale,
            u,
            v: if side > 0.0 { 0.5 + offset } else { 0.5 - offset },
            ng: self.ng,
        }
    }
}

/// Point of the linear piece `p0 -> p1` closest to the ray in projection, if the ray passes within its radius.
/// Returns the parameter along the piece and the interpolated point & radius.
#[inline(always)]
fn closest_to_ray(p0: Vec4, p1: Vec4) -> Option<(f32, Vec4)> {
    let d = p1.xy() - p0.xy();
    let len2 = d.length_squared();
    let s = if len2 > 0.0 {
        ((-p0.xy()).dot(d) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let p = p0.lerp(p1, s);
    let radius = p.w;
    if radius > 0.0 && p.xy().length_squared() <= radius * radius {
        Some((s, p))
    } else {
        None
    }
}
