//! Curve leaves: up to [`LANES`] Bézier segment bounding boxes that share one local frame.

pub mod builder;
pub mod morton;
pub mod select;

#[cfg(all(
    any(target_arch = "x86", target_arch = "x86_64"),
    target_feature = "sse2"
))]
pub mod simd;

use std::fmt::{self, Debug, Formatter};

use bytemuck::{Pod, Zeroable};
use glam::{Affine3A, Vec3, Vec3A};

use crate::{aabb::Aabb, ray::Ray};
use select::NearestLanes;

/// Number of curve boxes per leaf. Must be a multiple of 4 (the simd path works on groups of 4) and at most 32.
pub const LANES: usize = 8;

const _: () = assert!(LANES % 4 == 0 && LANES <= 32);

/// A curve leaf. repr(C), Pod, 308 bytes with 8 lanes.
///
/// Box bounds are stored per axis & side as struct-of-arrays so all lanes can be slab tested together.
/// Lanes at index `n` or above are unused. Their contents are meaningless, they are masked out by index
/// rather than by their bounds.
#[derive(Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct CurveLeaf {
    /// World to leaf transform: the 3 columns of the linear part then the translation.
    pub space: [Vec3; 4],

    /// Number of active lanes.
    pub n: u32,

    pub lower_x: [f32; LANES],
    pub upper_x: [f32; LANES],
    pub lower_y: [f32; LANES],
    pub upper_y: [f32; LANES],
    pub lower_z: [f32; LANES],
    pub upper_z: [f32; LANES],

    pub geometry_ids: [u32; LANES],
    pub primitive_ids: [u32; LANES],
}

impl Debug for CurveLeaf {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let n = self.len();
        f.debug_struct("CurveLeaf")
            .field("space", &self.space())
            .field("n", &self.n)
            .field(
                "bounds",
                &(0..n).map(|lane| self.lane_bounds(lane)).collect::<Vec<_>>(),
            )
            .field("geometry_ids", &&self.geometry_ids[..n])
            .field("primitive_ids", &&self.primitive_ids[..n])
            .finish()
    }
}

impl CurveLeaf {
    #[inline(always)]
    pub fn space(&self) -> Affine3A {
        let [x, y, z, w] = self.space;
        Affine3A::from_cols(x.into(), y.into(), z.into(), w.into())
    }

    #[inline(always)]
    pub fn set_space(&mut self, space: Affine3A) {
        self.space = [
            space.matrix3.x_axis.into(),
            space.matrix3.y_axis.into(),
            space.matrix3.z_axis.into(),
            space.translation.into(),
        ];
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        (self.n as usize).min(LANES)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Bounds of `lane` in the leaf frame.
    #[inline(always)]
    pub fn lane_bounds(&self, lane: usize) -> Aabb {
        Aabb::new(
            Vec3A::new(self.lower_x[lane], self.lower_y[lane], self.lower_z[lane]),
            Vec3A::new(self.upper_x[lane], self.upper_y[lane], self.upper_z[lane]),
        )
    }

    #[inline(always)]
    pub fn set_lane(&mut self, lane: usize, geometry_id: u32, primitive_id: u32, bounds: &Aabb) {
        self.lower_x[lane] = bounds.min.x;
        self.upper_x[lane] = bounds.max.x;
        self.lower_y[lane] = bounds.min.y;
        self.upper_y[lane] = bounds.max.y;
        self.lower_z[lane] = bounds.min.z;
        self.upper_z[lane] = bounds.max.z;
        self.geometry_ids[lane] = geometry_id;
        self.primitive_ids[lane] = primitive_id;
    }

    /// Slab tests the world space `ray` against every lane.
    /// The ray's `[tmin, tmax]` is read once here, narrowing it afterwards does not update the result.
    #[inline(always)]
    pub fn intersect_lanes(&self, ray: &Ray) -> LaneHits {
        let local_ray = ray.transformed(&self.space());

        #[cfg(all(
            any(target_arch = "x86", target_arch = "x86_64"),
            target_feature = "sse2"
        ))]
        {
            self.intersect_lanes_simd(&local_ray)
        }

        #[cfg(not(all(
            any(target_arch = "x86", target_arch = "x86_64"),
            target_feature = "sse2"
        )))]
        {
            self.intersect_lanes_basic(&local_ray)
        }
    }

    /// Scalar slab test of a ray already in the leaf frame. Exists for reference & compatibility, gives the same
    /// results as [`CurveLeaf::intersect_lanes_simd`].
    #[inline(always)]
    pub fn intersect_lanes_basic(&self, local_ray: &Ray) -> LaneHits {
        let mut hits = LaneHits::default();

        let o = local_ray.origin;
        let inv = local_ray.inv_direction;
        let rdx = inv.x < 0.0;
        let rdy = inv.y < 0.0;
        let rdz = inv.z < 0.0;

        for lane in 0..LANES {
            let (lo_x, hi_x) = (self.lower_x[lane], self.upper_x[lane]);
            let (lo_y, hi_y) = (self.lower_y[lane], self.upper_y[lane]);
            let (lo_z, hi_z) = (self.lower_z[lane], self.upper_z[lane]);

            let x_min = if rdx { hi_x } else { lo_x };
            let x_max = if rdx { lo_x } else { hi_x };
            let y_min = if rdy { hi_y } else { lo_y };
            let y_max = if rdy { lo_y } else { hi_y };
            let z_min = if rdz { hi_z } else { lo_z };
            let z_max = if rdz { lo_z } else { hi_z };

            let tmin_x = (x_min - o.x) * inv.x;
            let tmax_x = (x_max - o.x) * inv.x;
            let tmin_y = (y_min - o.y) * inv.y;
            let tmax_y = (y_max - o.y) * inv.y;
            let tmin_z = (z_min - o.z) * inv.z;
            let tmax_z = (z_max - o.z) * inv.z;

            let tmin = tmin_x.max(tmin_y).max(tmin_z).max(local_ray.tmin);
            let tmax = tmax_x.min(tmax_y).min(tmax_z).min(local_ray.tmax);

            hits.t_near[lane] = tmin;
            hits.t_far[lane] = tmax;
            if (lane as u32) < self.n && tmin <= tmax {
                hits.mask |= 1 << lane;
            }
        }

        hits
    }
}

/// Result of the slab test for every lane of a leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneHits {
    /// Entry distance per lane, floored at the ray's `tmin`.
    pub t_near: [f32; LANES],
    /// Exit distance per lane, capped at the ray's `tmax`.
    pub t_far: [f32; LANES],
    /// Bit `i` is set if lane `i` is active and its box overlaps the ray.
    pub mask: u32,
}

impl Default for LaneHits {
    fn default() -> Self {
        Self {
            t_near: [f32::INFINITY; LANES],
            t_far: [-f32::INFINITY; LANES],
            mask: 0,
        }
    }
}

impl LaneHits {
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.mask.count_ones() as usize
    }

    #[inline(always)]
    pub fn is_valid(&self, lane: usize) -> bool {
        self.mask & (1 << lane) != 0
    }

    /// Valid lanes, nearest entry distance first.
    #[inline(always)]
    pub fn nearest(&self) -> NearestLanes {
        NearestLanes::new(self.mask, self.t_near)
    }
}
