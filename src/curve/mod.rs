//! Cubic Bézier curve segments and the ray-space precalculation shared by the curve intersectors.

pub mod hair;
pub mod round;

use glam::{vec3a, Affine3A, Mat3A, Mat4, Vec3A, Vec4, Vec4Swizzles};

use crate::{aabb::Aabb, ray::Ray, Boundable, Transformable};

/// A cubic Bézier segment. `xyz` of each control point is the position, `w` the radius.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BezierCurve {
    pub cp: [Vec4; 4],
}

impl BezierCurve {
    #[inline(always)]
    pub fn new(cp: [Vec4; 4]) -> Self {
        Self { cp }
    }

    /// Evaluates position and radius at `u` with de Casteljau's algorithm.
    #[inline(always)]
    pub fn eval(&self, u: f32) -> Vec4 {
        let [p0, p1, p2, p3] = self.cp;
        let a0 = p0.lerp(p1, u);
        let a1 = p1.lerp(p2, u);
        let a2 = p2.lerp(p3, u);
        let b0 = a0.lerp(a1, u);
        let b1 = a1.lerp(a2, u);
        b0.lerp(b1, u)
    }

    /// Derivative with respect to `u`.
    /// If the first three (or last three) control points coincide the true tangent vanishes at the end point, in
    /// that case the chord `p3 - p0` is returned instead.
    #[inline(always)]
    pub fn derivative(&self, u: f32) -> Vec4 {
        let [p0, p1, p2, p3] = self.cp;
        let a0 = p0.lerp(p1, u);
        let a1 = p1.lerp(p2, u);
        let a2 = p2.lerp(p3, u);
        let d = a1.lerp(a2, u) - a0.lerp(a1, u);
        if d.xyz().length_squared() > 0.0 {
            3.0 * d
        } else {
            p3 - p0
        }
    }

    /// Splits the segment at `u = 0.5`.
    #[inline(always)]
    pub fn split(&self) -> (BezierCurve, BezierCurve) {
        let [p0, p1, p2, p3] = self.cp;
        let a0 = (p0 + p1) * 0.5;
        let a1 = (p1 + p2) * 0.5;
        let a2 = (p2 + p3) * 0.5;
        let b0 = (a0 + a1) * 0.5;
        let b1 = (a1 + a2) * 0.5;
        let mid = (b0 + b1) * 0.5;
        (
            BezierCurve::new([p0, a0, b0, mid]),
            BezierCurve::new([mid, b1, a2, p3]),
        )
    }

    #[inline(always)]
    pub fn max_radius(&self) -> f32 {
        self.cp[0]
            .w
            .max(self.cp[1].w)
            .max(self.cp[2].w.max(self.cp[3].w))
    }

    /// Bounds of the control point hull grown by the largest radius.
    /// The curve lies in the convex hull of its control points so this is conservative.
    #[inline(always)]
    pub fn bounds(&self) -> Aabb {
        let points = self.cp.map(|p| Vec3A::from(p.xyz()));
        Aabb::from_points(&points).grow(self.max_radius())
    }

    /// Applies `space` to the positions. Radii are left untouched.
    #[inline(always)]
    pub fn transformed(&self, space: &Affine3A) -> Self {
        Self::new(self.cp.map(|p| {
            space
                .transform_point3a(Vec3A::from(p.xyz()))
                .extend(p.w)
        }))
    }
}

impl Boundable for BezierCurve {
    fn aabb(&self) -> Aabb {
        self.bounds()
    }
}

impl Transformable for BezierCurve {
    fn transform(&mut self, matrix: &Mat4) {
        for p in self.cp.iter_mut() {
            *p = matrix.transform_point3(p.xyz()).extend(p.w);
        }
    }
}

// https://jcgt.org/published/0006/01/01/paper.pdf
/// Rotation taking world vectors into a frame whose `z` axis is `n`. `n` must be normalized.
#[inline(always)]
pub fn frame_from_direction(n: Vec3A) -> Mat3A {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;
    Mat3A::from_cols(
        vec3a(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x),
        vec3a(b, sign + n.y * n.y * a, -n.y),
        n,
    )
    .transpose()
}

/// Ray space: the ray origin moved to 0 and the normalized ray direction rotated onto `+z`.
/// `z` in ray space is distance along the normalized direction, `t = z * depth_scale`.
#[derive(Clone, Copy, Debug)]
pub struct RaySpace {
    pub origin: Vec3A,
    pub rotation: Mat3A,
    pub depth_scale: f32,
    pub direction_length: f32,
}

impl RaySpace {
    pub fn new(ray: &Ray) -> Self {
        let direction_length = ray.direction.length();
        let rotation = if direction_length > 0.0 {
            frame_from_direction(ray.direction / direction_length)
        } else {
            Mat3A::IDENTITY
        };
        Self {
            origin: ray.origin,
            rotation,
            depth_scale: if direction_length > 0.0 {
                1.0 / direction_length
            } else {
                0.0
            },
            direction_length,
        }
    }

    #[inline(always)]
    pub fn to_ray_space(&self, curve: &BezierCurve) -> BezierCurve {
        BezierCurve::new(curve.cp.map(|p| {
            (self.rotation * (Vec3A::from(p.xyz()) - self.origin)).extend(p.w)
        }))
    }

    /// Rotates a ray space vector back into world space.
    #[inline(always)]
    pub fn to_world_vector(&self, v: Vec3A) -> Vec3A {
        self.rotation.transpose() * v
    }

    /// The ray's current valid `t` range expressed as ray space depth.
    #[inline(always)]
    pub fn depth_range(&self, ray: &Ray) -> (f32, f32) {
        (
            ray.tmin * self.direction_length,
            ray.tmax * self.direction_length,
        )
    }
}
