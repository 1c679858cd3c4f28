//! Hit acceptance. Curve intersectors hand their roots to an [`Epilogue`], which decides whether a root becomes the
//! ray's new closest hit.

use glam::Vec3A;

use crate::{
    ray::{Ray, RayHit},
    scene::CurveScene,
};

/// A root found by one of the curve intersectors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CurveHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
    pub ng: Vec3A,
}

/// Whether the intersector reports one root per curve or a batch of candidate roots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpilogueKind {
    SingleRoot,
    MultiRoot,
}

/// Counters accumulated over every leaf visited with the same context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Lanes that survived the slab test and had their curve fetched.
    pub lanes_visited: u32,
    pub hits_accepted: u32,
    /// Roots at or beyond the ray's `tmax`.
    pub hits_rejected: u32,
    /// Roots vetoed by the context filter.
    pub hits_filtered: u32,
}

/// User callback run on every root that would otherwise be accepted. Receives `(hit, geometry_id, primitive_id)`,
/// returning false discards the root.
pub type HitFilter<'a> = &'a dyn Fn(&CurveHit, u32, u32) -> bool;

/// Per-ray state threaded through leaf visits.
pub struct IntersectContext<'a, S: CurveScene + ?Sized> {
    pub scene: &'a S,
    pub filter: Option<HitFilter<'a>>,
    pub stats: TraversalStats,
}

impl<'a, S: CurveScene + ?Sized> IntersectContext<'a, S> {
    pub fn new(scene: &'a S) -> Self {
        Self {
            scene,
            filter: None,
            stats: TraversalStats::default(),
        }
    }

    pub fn with_filter(mut self, filter: HitFilter<'a>) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Records roots for one curve primitive.
pub struct Epilogue<'a> {
    ray: &'a mut Ray,
    hit: &'a mut RayHit,
    filter: Option<HitFilter<'a>>,
    stats: &'a mut TraversalStats,
    geometry_id: u32,
    primitive_id: u32,
    kind: EpilogueKind,
}

impl<'a> Epilogue<'a> {
    pub fn new(
        ray: &'a mut Ray,
        hit: &'a mut RayHit,
        filter: Option<HitFilter<'a>>,
        stats: &'a mut TraversalStats,
        geometry_id: u32,
        primitive_id: u32,
        kind: EpilogueKind,
    ) -> Self {
        Self {
            ray,
            hit,
            filter,
            stats,
            geometry_id,
            primitive_id,
            kind,
        }
    }

    /// The ray being narrowed. Intersectors read its current `[tmin, tmax]` from here.
    #[inline(always)]
    pub fn ray(&self) -> &Ray {
        self.ray
    }

    /// Accepts `candidate` if it is strictly closer than the ray's current `tmax` and passes the filter.
    /// On acceptance `tmax` and the hit record are overwritten, otherwise nothing is mutated.
    #[inline]
    pub fn record(&mut self, candidate: CurveHit) -> bool {
        if !(candidate.t < self.ray.tmax) {
            self.stats.hits_rejected += 1;
            return false;
        }

        if let Some(filter) = self.filter {
            if !filter(&candidate, self.geometry_id, self.primitive_id) {
                self.stats.hits_filtered += 1;
                return false;
            }
        }

        self.ray.tmax = candidate.t;
        self.hit.t = candidate.t;
        self.hit.u = candidate.u;
        self.hit.v = candidate.v;
        self.hit.ng = candidate.ng;
        self.hit.geometry_id = self.geometry_id;
        self.hit.primitive_id = self.primitive_id;
        self.stats.hits_accepted += 1;
        true
    }

    /// Multi-root recording: offers candidates nearest first until one is accepted.
    /// Candidates are reordered in place.
    pub fn record_nearest(&mut self, candidates: &mut [CurveHit]) -> bool {
        debug_assert_eq!(self.kind, EpilogueKind::MultiRoot);
        candidates.sort_unstable_by(|a, b| a.t.total_cmp(&b.t));
        for candidate in candidates.iter() {
            if !(candidate.t < self.ray.tmax) {
                // Sorted, so every remaining candidate is rejected too.
                self.stats.hits_rejected += 1;
                break;
            }
            if self.record(*candidate) {
                return true;
            }
        }
        false
    }
}
