#[cfg(target_arch = "x86")]
use std::arch::x86::*;
#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use crate::{
    leaf::{CurveLeaf, LaneHits, LANES},
    ray::Ray,
};

impl CurveLeaf {
    /// Slab tests a ray already in the leaf frame against 4 lanes at a time.
    #[inline(always)]
    pub fn intersect_lanes_simd(&self, local_ray: &Ray) -> LaneHits {
        let mut hits = LaneHits::default();

        let rdx = local_ray.inv_direction.x < 0.0;
        let rdy = local_ray.inv_direction.y < 0.0;
        let rdz = local_ray.inv_direction.z < 0.0;

        #[inline(always)]
        fn load(v: &[f32; LANES], i: usize) -> __m128 {
            unsafe { _mm_loadu_ps(v.as_ptr().add(i * 4)) }
        }

        unsafe {
            let org_x = _mm_set1_ps(local_ray.origin.x);
            let org_y = _mm_set1_ps(local_ray.origin.y);
            let org_z = _mm_set1_ps(local_ray.origin.z);

            let inv_x = _mm_set1_ps(local_ray.inv_direction.x);
            let inv_y = _mm_set1_ps(local_ray.inv_direction.y);
            let inv_z = _mm_set1_ps(local_ray.inv_direction.z);

            let ray_tmin = _mm_set1_ps(local_ray.tmin);
            let ray_tmax = _mm_set1_ps(local_ray.tmax);
            let active_count = _mm_set1_epi32(self.n as i32);

            for i in 0..LANES / 4 {
                let lo_x = load(&self.lower_x, i);
                let hi_x = load(&self.upper_x, i);
                let x_min = if rdx { hi_x } else { lo_x };
                let x_max = if rdx { lo_x } else { hi_x };
                let tmin_x = _mm_mul_ps(_mm_sub_ps(x_min, org_x), inv_x);
                let tmax_x = _mm_mul_ps(_mm_sub_ps(x_max, org_x), inv_x);

                let lo_y = load(&self.lower_y, i);
                let hi_y = load(&self.upper_y, i);
                let y_min = if rdy { hi_y } else { lo_y };
                let y_max = if rdy { lo_y } else { hi_y };
                let tmin_y = _mm_mul_ps(_mm_sub_ps(y_min, org_y), inv_y);
                let tmax_y = _mm_mul_ps(_mm_sub_ps(y_max, org_y), inv_y);

                let lo_z = load(&self.lower_z, i);
                let hi_z = load(&self.upper_z, i);
                let z_min = if rdz { hi_z } else { lo_z };
                let z_max = if rdz { lo_z } else { hi_z };
                let tmin_z = _mm_mul_ps(_mm_sub_ps(z_min, org_z), inv_z);
                let tmax_z = _mm_mul_ps(_mm_sub_ps(z_max, org_z), inv_z);

                let tmin = _mm_max_ps(_mm_max_ps(_mm_max_ps(tmin_x, tmin_y), tmin_z), ray_tmin);
                let tmax = _mm_min_ps(_mm_min_ps(_mm_min_ps(tmax_x, tmax_y), tmax_z), ray_tmax);

                // Lanes at or past n are masked by index, whatever their bounds hold.
                let base = (i * 4) as i32;
                let lane_index = _mm_setr_epi32(base, base + 1, base + 2, base + 3);
                let active = _mm_castsi128_ps(_mm_cmplt_epi32(lane_index, active_count));
                let valid = _mm_and_ps(_mm_cmple_ps(tmin, tmax), active);

                hits.mask |= (_mm_movemask_ps(valid) as u32) << (i * 4);
                _mm_storeu_ps(hits.t_near.as_mut_ptr().add(i * 4), tmin);
                _mm_storeu_ps(hits.t_far.as_mut_ptr().add(i * 4), tmax);
            }
        }

        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aabb::Aabb,
        test_util::sampling::{hash_noise, uniform_sample_sphere},
    };
    use glam::{uvec2, vec2, vec3a, Affine3A, Quat, Vec3, Vec3A};

    #[test]
    fn simd_matches_basic() {
        for seed in 0..64u32 {
            let mut leaf = CurveLeaf::empty();
            leaf.set_space(Affine3A::from_rotation_translation(
                Quat::from_rotation_y(seed as f32 * 0.37),
                Vec3::new(seed as f32 * 0.1, -1.0, 0.5),
            ));
            for lane in 0..LANES {
                let r = |k: u32| hash_noise(uvec2(seed, lane as u32), k) * 4.0 - 2.0;
                let min = vec3a(r(0), r(1), r(2));
                let size = vec3a(r(3), r(4), r(5)).abs() * 0.5;
                leaf.set_lane(lane, 0, lane as u32, &Aabb::new(min, min + size));
            }
            leaf.n = seed % (LANES as u32 + 1);

            let dir = uniform_sample_sphere(vec2(
                hash_noise(uvec2(seed, 100), 0),
                hash_noise(uvec2(seed, 100), 1),
            ));
            // Axis aligned directions on every 4th seed to cover the zero component path.
            let dir = if seed % 4 == 0 { Vec3A::Y } else { dir };
            let ray = Ray::new(vec3a(0.0, 0.0, -5.0), dir, 0.1, 50.0).transformed(&leaf.space());

            let basic = leaf.intersect_lanes_basic(&ray);
            let simd = leaf.intersect_lanes_simd(&ray);
            assert_eq!(basic.mask, simd.mask, "seed {seed}");
            for lane in 0..LANES {
                assert_eq!(basic.t_near[lane], simd.t_near[lane], "seed {seed} lane {lane}");
                assert_eq!(basic.t_far[lane], simd.t_far[lane], "seed {seed} lane {lane}");
            }
        }
    }
}
