//! Packing curve segments into [`CurveLeaf`]s.

use std::time::{Duration, Instant};

use bytemuck::Zeroable;
use glam::{Affine3A, Mat3A, Vec3A, Vec4, Vec4Swizzles};

#[cfg(feature = "parallel")]
use rayon::{iter::ParallelIterator, slice::ParallelSlice};

use crate::{
    aabb::Aabb,
    curve::{frame_from_direction, BezierCurve},
    leaf::{morton::morton_order, CurveLeaf, LANES},
    scene::CurveScene,
    scope, timeit, Boundable,
};

impl CurveLeaf {
    /// A leaf with no active lanes and the identity frame.
    pub fn empty() -> Self {
        let mut leaf = Self::zeroed();
        leaf.set_space(Affine3A::IDENTITY);
        leaf
    }

    /// World to leaf frame that puts `cp[0]` at the origin and aligns local z with the chord `cp[3] - cp[0]`.
    /// Hair in one leaf tends to run in the same direction, so boxes in this frame are much tighter than world
    /// aligned ones.
    pub fn aligned_space(cp: &[Vec4; 4]) -> Affine3A {
        let p0 = Vec3A::from(cp[0].xyz());
        let chord = Vec3A::from(cp[3].xyz()) - p0;
        let rotation = if chord.length_squared() > 0.0 {
            frame_from_direction(chord.normalize())
        } else {
            Mat3A::IDENTITY
        };
        Affine3A {
            matrix3: rotation,
            translation: -(rotation * p0),
        }
    }

    /// Builds a leaf holding `prims` (`(geometry_id, primitive_id)` pairs) with boxes in the given world to leaf
    /// frame. Panics if there are more than [`LANES`] primitives.
    pub fn fill<S: CurveScene + ?Sized>(scene: &S, space: Affine3A, prims: &[(u32, u32)]) -> Self {
        assert!(
            prims.len() <= LANES,
            "a curve leaf holds at most {LANES} primitives, got {}",
            prims.len()
        );

        let mut leaf = Self::zeroed();
        leaf.set_space(space);
        leaf.n = prims.len() as u32;

        // Radii are world space lengths, scale them by the largest stretch of the frame.
        let radius_scale = space
            .matrix3
            .x_axis
            .length()
            .max(space.matrix3.y_axis.length())
            .max(space.matrix3.z_axis.length());

        for (lane, &(geometry_id, primitive_id)) in prims.iter().enumerate() {
            let curve = BezierCurve::new(scene.fetch(geometry_id, primitive_id).control_points);
            let local = curve.transformed(&space);
            let points = local.cp.map(|p| Vec3A::from(p.xyz()));
            let bounds = Aabb::from_points(&points).grow(curve.max_radius() * radius_scale);
            leaf.set_lane(lane, geometry_id, primitive_id, &bounds);
        }

        leaf
    }

    /// Panics if the leaf is malformed.
    pub fn validate(&self) {
        assert!(
            self.n as usize <= LANES,
            "active lane count {} exceeds {LANES}",
            self.n
        );
        for lane in 0..self.len() {
            assert!(
                self.lane_bounds(lane).valid(),
                "lane {lane} has inverted bounds {:?}",
                self.lane_bounds(lane)
            );
        }
        assert!(self.space().is_finite());
    }
}

/// Packs every `(geometry_id, primitive_id)` in `prims` into leaves of up to [`LANES`] segments.
/// Primitives are ordered along a morton curve of their bounds centers first so each leaf holds nearby segments.
/// Each leaf uses the [`CurveLeaf::aligned_space`] of its first segment.
/// Just a helper function / example, feel free to reimplement for your specific use case.
///
/// # Arguments
/// * `scene` - Where the control points are fetched from.
/// * `prims` - Primitives to pack.
/// * `core_build_time` - Time spent ordering & filling, not including gathering the initial bounds.
pub fn build_leaves<S: CurveScene + ?Sized>(
    scene: &S,
    prims: &[(u32, u32)],
    core_build_time: &mut Duration,
) -> Vec<CurveLeaf> {
    scope!("build_leaves");

    let centers: Vec<Vec3A> = prims
        .iter()
        .map(|&(geometry_id, primitive_id)| {
            BezierCurve::new(scene.fetch(geometry_id, primitive_id).control_points)
                .aabb()
                .center()
        })
        .collect();

    let start_time = Instant::now();

    timeit!["morton order",
        let ordered: Vec<(u32, u32)> = morton_order(&centers)
            .iter()
            .map(|i| prims[*i as usize])
            .collect();
    ];

    timeit!["fill leaves",
        let leaves = fill_chunks(scene, &ordered);
    ];

    *core_build_time += start_time.elapsed();

    #[cfg(debug_assertions)]
    for leaf in &leaves {
        leaf.validate();
    }

    leaves
}

#[inline(always)]
fn fill_chunk<S: CurveScene + ?Sized>(scene: &S, chunk: &[(u32, u32)]) -> CurveLeaf {
    let (geometry_id, primitive_id) = chunk[0];
    let space = CurveLeaf::aligned_space(&scene.fetch(geometry_id, primitive_id).control_points);
    CurveLeaf::fill(scene, space, chunk)
}

#[cfg(feature = "parallel")]
fn fill_chunks<S: CurveScene + ?Sized>(scene: &S, ordered: &[(u32, u32)]) -> Vec<CurveLeaf> {
    ordered
        .par_chunks(LANES)
        .map(|chunk| fill_chunk(scene, chunk))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn fill_chunks<S: CurveScene + ?Sized>(scene: &S, ordered: &[(u32, u32)]) -> Vec<CurveLeaf> {
    ordered
        .chunks(LANES)
        .map(|chunk| fill_chunk(scene, chunk))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ray::Ray,
        scene::{CurveGeometry, CurveSubtype, Scene},
        test_util::geometry::hair_patch,
    };
    use glam::{vec3a, vec4};

    #[test]
    fn aligned_space_maps_chord_onto_z() {
        let cp = [
            vec4(1.0, 1.0, 1.0, 0.1),
            vec4(2.0, 1.5, 1.0, 0.1),
            vec4(3.0, 1.5, 1.0, 0.1),
            vec4(4.0, 1.0, 1.0, 0.1),
        ];
        let space = CurveLeaf::aligned_space(&cp);
        assert!(space
            .transform_point3a(vec3a(1.0, 1.0, 1.0))
            .abs_diff_eq(Vec3A::ZERO, 1e-5));
        assert!(space
            .transform_point3a(vec3a(4.0, 1.0, 1.0))
            .abs_diff_eq(vec3a(0.0, 0.0, 3.0), 1e-5));
    }

    #[test]
    fn fill_bounds_contain_curves() {
        let mut scene = Scene::default();
        scene.add(hair_patch(2, 2, 2, 0.05, CurveSubtype::Round, 4));
        let prims = scene.primitives();
        let space = CurveLeaf::aligned_space(&scene.fetch(0, 0).control_points);
        let leaf = CurveLeaf::fill(&scene, space, &prims);
        leaf.validate();
        assert_eq!(leaf.len(), prims.len());
        for (lane, &(g, p)) in prims.iter().enumerate() {
            assert_eq!(leaf.geometry_ids[lane], g);
            assert_eq!(leaf.primitive_ids[lane], p);
            let curve = scene.get(g).bezier(p);
            let local = curve.transformed(&space);
            let bounds = leaf.lane_bounds(lane).grow(1e-4);
            let world_bounds = bounds.transformed(&space.inverse()).grow(1e-4);
            for i in 0..=16 {
                let u = i as f32 / 16.0;
                assert!(bounds.contains_point(Vec3A::from(local.eval(u).xyz())));
                assert!(world_bounds.contains_point(Vec3A::from(curve.eval(u).xyz())));
            }
        }
    }

    #[test]
    #[should_panic]
    fn fill_rejects_overfull() {
        let mut scene = Scene::default();
        scene.add(hair_patch(3, 3, 1, 0.05, CurveSubtype::Flat, 4));
        CurveLeaf::fill(&scene, Affine3A::IDENTITY, &scene.primitives());
    }

    #[test]
    fn build_covers_every_primitive_once() {
        let mut scene = Scene::default();
        scene.add(hair_patch(5, 3, 3, 0.02, CurveSubtype::Flat, 4));
        scene.add(hair_patch(2, 2, 2, 0.04, CurveSubtype::Round, 1));
        let prims = scene.primitives();
        let leaves = build_leaves(&scene, &prims, &mut Duration::default());
        assert_eq!(leaves.len(), prims.len().div_ceil(LANES));
        let mut packed: Vec<(u32, u32)> = leaves
            .iter()
            .flat_map(|leaf| (0..leaf.len()).map(|i| (leaf.geometry_ids[i], leaf.primitive_ids[i])))
            .collect();
        packed.sort();
        assert_eq!(packed, prims);
    }

    #[test]
    fn build_nothing() {
        let scene = Scene {
            geometries: vec![CurveGeometry::default()],
        };
        assert!(build_leaves(&scene, &[], &mut Duration::default()).is_empty());
    }

    #[test]
    fn empty_leaf_hits_nothing() {
        let leaf = CurveLeaf::empty();
        assert!(leaf.is_empty());
        let ray = Ray::new_inf(Vec3A::ZERO, Vec3A::X);
        assert_eq!(leaf.intersect_lanes(&ray).mask, 0);
    }
}
