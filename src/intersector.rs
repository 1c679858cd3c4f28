//! Leaf intersection: slab test a [`CurveLeaf`], then visit the overlapping lanes nearest first and hand each curve to
//! the intersector for its geometry's [`CurveSubtype`].

use crate::{
    curve::{hair::HairIntersector, round::RoundCurveIntersector},
    epilogue::{Epilogue, EpilogueKind, IntersectContext},
    leaf::CurveLeaf,
    ray::{Ray, RayHit},
    scene::{CurveScene, CurveSubtype},
    scope,
};

/// Per ray state for both curve intersectors. Build once per ray and reuse it for every leaf the ray visits.
#[derive(Clone, Copy, Debug)]
pub struct Precalculations {
    pub hair: HairIntersector,
    pub curve: RoundCurveIntersector,
}

impl Precalculations {
    pub fn new(ray: &Ray) -> Self {
        Self {
            hair: HairIntersector::new(ray),
            curve: RoundCurveIntersector::new(ray),
        }
    }
}

/// Finds the closest curve hit in `leaf` along `ray`, narrowing `ray.tmax` and overwriting `hit` for every accepted
/// root. `ray.tmax` never grows.
///
/// Lanes are chosen by the slab test against the ray range on entry. Lanes are then visited in order of entry
/// distance, even those whose box starts beyond a hit found in an earlier lane. The curve intersectors reject those
/// against the narrowed range themselves.
pub fn intersect<S: CurveScene + ?Sized>(
    pre: &Precalculations,
    ray: &mut Ray,
    hit: &mut RayHit,
    context: &mut IntersectContext<S>,
    leaf: &CurveLeaf,
) {
    scope!("intersect_leaf");

    let lanes = leaf.intersect_lanes(ray);
    for lane in lanes.nearest() {
        context.stats.lanes_visited += 1;

        let geometry_id = leaf.geometry_ids[lane];
        let primitive_id = leaf.primitive_ids[lane];
        let curve = context.scene.fetch(geometry_id, primitive_id);

        match curve.subtype {
            CurveSubtype::Flat => {
                let mut epilogue = Epilogue::new(
                    ray,
                    hit,
                    context.filter,
                    &mut context.stats,
                    geometry_id,
                    primitive_id,
                    EpilogueKind::MultiRoot,
                );
                pre.hair
                    .intersect(&curve.control_points, curve.tessellation_rate, &mut epilogue);
            }
            CurveSubtype::Round => {
                let mut epilogue = Epilogue::new(
                    ray,
                    hit,
                    context.filter,
                    &mut context.stats,
                    geometry_id,
                    primitive_id,
                    EpilogueKind::SingleRoot,
                );
                pre.curve.intersect(&curve.control_points, &mut epilogue);
            }
        }
    }
}

/// Any-hit query for shadow rays.
///
/// Not implemented for curve leaves yet: always reports the ray as unoccluded and leaves `ray` untouched.
/// Callers needing curve shadows have to use [`intersect`] and check [`RayHit::is_hit`].
pub fn occluded<S: CurveScene + ?Sized>(
    _pre: &Precalculations,
    _ray: &mut Ray,
    _context: &mut IntersectContext<S>,
    _leaf: &CurveLeaf,
) -> bool {
    false
}
