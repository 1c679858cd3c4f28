#[cfg(test)]
mod tests {

    use std::time::Duration;

    use glam::*;
    use obvhs_curves::{
        epilogue::{Epilogue, EpilogueKind, IntersectContext, TraversalStats},
        intersector::{intersect, occluded, Precalculations},
        leaf::{builder::build_leaves, CurveLeaf, LANES},
        ray::{Ray, RayHit},
        scene::{CurveScene, CurveSubtype, Scene},
        test_util::{
            geometry::hair_patch,
            sampling::{hash_noise, uniform_sample_sphere},
        },
    };

    fn patch_scene() -> Scene {
        let mut scene = Scene::default();
        scene.add(hair_patch(6, 6, 3, 0.05, CurveSubtype::Flat, 8));
        scene.add(hair_patch(3, 3, 2, 0.08, CurveSubtype::Round, 1));
        scene
    }

    /// Intersects every curve of the scene directly, no leaves involved.
    fn brute_force(scene: &Scene, ray: &mut Ray) -> RayHit {
        let pre = Precalculations::new(ray);
        let mut hit = RayHit::none();
        let mut stats = TraversalStats::default();
        for (geometry_id, primitive_id) in scene.primitives() {
            let curve = scene.fetch(geometry_id, primitive_id);
            match curve.subtype {
                CurveSubtype::Flat => {
                    let mut epilogue = Epilogue::new(
                        ray,
                        &mut hit,
                        None,
                        &mut stats,
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
                        &mut hit,
                        None,
                        &mut stats,
                        geometry_id,
                        primitive_id,
                        EpilogueKind::SingleRoot,
                    );
                    pre.curve.intersect(&curve.control_points, &mut epilogue);
                }
            }
        }
        hit
    }

    /// Visits every leaf with the same ray. Stands in for an upper BVH that fails to cull anything.
    fn through_leaves(
        scene: &Scene,
        leaves: &[CurveLeaf],
        ray: &mut Ray,
        stats: &mut TraversalStats,
    ) -> RayHit {
        let pre = Precalculations::new(ray);
        let mut hit = RayHit::none();
        let mut context = IntersectContext::new(scene);
        for leaf in leaves {
            intersect(&pre, ray, &mut hit, &mut context, leaf);
        }
        stats.lanes_visited += context.stats.lanes_visited;
        stats.hits_accepted += context.stats.hits_accepted;
        hit
    }

    pub fn eval_render<F>(
        mut eval: F,
        width: u32,
        height: u32,
        fov: f32,
        eye: Vec3A,
        look_at: Vec3A,
        up: Vec3A,
    ) where
        F: FnMut(u32, u32, Ray),
    {
        let target_size = Vec2::new(width as f32, height as f32);

        // Compute camera projection & view matrices
        let aspect_ratio = target_size.x / target_size.y;
        let proj_inv = Mat4::perspective_infinite_reverse_rh(fov, aspect_ratio, 0.01).inverse();
        let view_inv = Mat4::look_at_rh(eye.into(), look_at.into(), up.into()).inverse();

        for x in 0..width {
            for y in 0..height {
                let frag_coord = uvec2(x, y);
                let mut screen_uv = frag_coord.as_vec2() / target_size;
                screen_uv.y = 1.0 - screen_uv.y;
                let ndc = screen_uv * 2.0 - Vec2::ONE;
                let clip_pos = vec4(ndc.x, ndc.y, 1.0, 1.0);

                let mut vs = proj_inv * clip_pos;
                vs /= vs.w;
                let direction = (Vec3A::from((view_inv * vs).xyz()) - eye).normalize();
                eval(x, y, Ray::new(eye, direction, 0.0, f32::MAX));
            }
        }
    }

    #[test]
    pub fn leaves_match_brute_force() {
        let scene = patch_scene();
        let leaves = build_leaves(&scene, &scene.primitives(), &mut Duration::default());

        let mut hit_count = 0;
        let mut mismatches = 0;
        let mut stats = TraversalStats::default();
        eval_render(
            |_x, _y, ray| {
                let (mut ray_a, mut ray_b) = (ray, ray);
                let reference = brute_force(&scene, &mut ray_a);
                let hit = through_leaves(&scene, &leaves, &mut ray_b, &mut stats);
                if reference.is_hit() {
                    hit_count += 1;
                }
                let agree = match (reference.is_hit(), hit.is_hit()) {
                    (true, true) => (reference.t - hit.t).abs() <= 1e-4 * reference.t.max(1.0),
                    (false, false) => true,
                    _ => false,
                };
                if !agree {
                    mismatches += 1;
                }
            },
            64,
            64,
            60.0f32.to_radians(),
            vec3a(0.0, 0.5, 3.0),
            vec3a(0.0, 0.5, 0.0),
            Vec3A::Y,
        );

        assert!(hit_count > 64, "only {hit_count} pixels hit the patch");
        // Rays grazing the very edge of a tube may land either side of a box boundary.
        assert!(mismatches <= 4, "{mismatches} pixels differ");
        assert!(stats.hits_accepted as usize >= hit_count - mismatches);
    }

    #[test]
    pub fn leaves_cull_most_lanes() {
        let scene = patch_scene();
        let prims = scene.primitives();
        let leaves = build_leaves(&scene, &prims, &mut Duration::default());

        let mut stats = TraversalStats::default();
        let mut rays = 0;
        eval_render(
            |_x, _y, mut ray| {
                through_leaves(&scene, &leaves, &mut ray, &mut stats);
                rays += 1;
            },
            32,
            32,
            60.0f32.to_radians(),
            vec3a(2.0, 1.5, 2.0),
            vec3a(0.0, 0.5, 0.0),
            Vec3A::Y,
        );

        // Without boxes every ray would fetch every curve.
        assert!((stats.lanes_visited as usize) < rays * prims.len() / 2);
    }

    #[test]
    pub fn random_rays_are_deterministic() {
        let scene = patch_scene();
        let leaves = build_leaves(&scene, &scene.primitives(), &mut Duration::default());

        for i in 0..256 {
            let origin = uniform_sample_sphere(vec2(
                hash_noise(uvec2(0, 0), i),
                hash_noise(uvec2(0, 1), i),
            )) * 3.0
                + vec3a(0.0, 0.5, 0.0);
            let target = vec3a(
                hash_noise(uvec2(1, 0), i) * 2.0 - 1.0,
                hash_noise(uvec2(1, 1), i),
                hash_noise(uvec2(1, 2), i) * 2.0 - 1.0,
            );
            let ray = Ray::new(origin, (target - origin).normalize(), 0.0, 100.0);

            let mut stats_a = TraversalStats::default();
            let mut stats_b = TraversalStats::default();
            let mut ray_a = ray;
            let mut ray_b = ray;
            let a = through_leaves(&scene, &leaves, &mut ray_a, &mut stats_a);
            let b = through_leaves(&scene, &leaves, &mut ray_b, &mut stats_b);

            assert_eq!(a.t.to_bits(), b.t.to_bits());
            assert_eq!(a.geometry_id, b.geometry_id);
            assert_eq!(a.primitive_id, b.primitive_id);
            assert_eq!(stats_a, stats_b);
            if a.is_hit() {
                assert_eq!(ray_a.tmax, a.t);
            } else {
                assert_eq!(ray_a.tmax, 100.0);
            }
        }
    }

    #[test]
    pub fn leaves_are_full_but_last() {
        let scene = patch_scene();
        let prims = scene.primitives();
        let leaves = build_leaves(&scene, &prims, &mut Duration::default());
        let (last, rest) = leaves.split_last().unwrap();
        assert!(rest.iter().all(|leaf| leaf.len() == LANES));
        assert_eq!(rest.len() * LANES + last.len(), prims.len());
    }

    #[test]
    pub fn build_with_nothing() {
        let scene = Scene::default();
        let leaves = build_leaves(&scene, &scene.primitives(), &mut Duration::default());
        assert!(leaves.is_empty());
    }

    #[test]
    pub fn occluded_never_reports_hits() {
        let scene = patch_scene();
        let leaves = build_leaves(&scene, &scene.primitives(), &mut Duration::default());
        let mut ray = Ray::new_inf(vec3a(0.0, 0.5, 3.0), -Vec3A::Z);
        let pre = Precalculations::new(&ray);
        let mut context = IntersectContext::new(&scene);
        for leaf in &leaves {
            assert!(!occluded(&pre, &mut ray, &mut context, leaf));
        }
        assert_eq!(ray.tmax, f32::INFINITY);
    }
}
