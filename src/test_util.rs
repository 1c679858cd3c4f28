//! Generators, sampling functions, etc.. for basic testing & examples.

pub mod sampling {
    use std::f32::consts::TAU;

    use glam::*;

    #[inline(always)]
    pub fn uhash(x: u32) -> u32 {
        // from https://nullprogram.com/blog/2018/07/31/
        let mut x = x ^ (x >> 16);
        x = x.overflowing_mul(0x7feb352d).0;
        x = x ^ (x >> 15);
        x = x.overflowing_mul(0x846ca68b).0;
        x = x ^ (x >> 16);
        x
    }

    #[inline(always)]
    pub fn uhash2(a: u32, b: u32) -> u32 {
        uhash((a.overflowing_mul(1597334673).0) ^ (b.overflowing_mul(3812015801).0))
    }

    #[inline(always)]
    pub fn unormf(n: u32) -> f32 {
        n as f32 * (1.0 / 0xffffffffu32 as f32)
    }

    #[inline(always)]
    pub fn hash_noise(coord: UVec2, frame: u32) -> f32 {
        let urnd = uhash2(coord.x, (coord.y << 11) + frame);
        unormf(urnd)
    }

    #[inline(always)]
    pub fn uniform_sample_sphere(urand: Vec2) -> Vec3A {
        let z = 1.0 - 2.0 * urand.x;
        let r = (1.0 - z * z).sqrt();
        let theta = urand.y * TAU;
        vec3a(r * theta.cos(), r * theta.sin(), z)
    }

    // By Tomasz Stachowiak
    pub fn somewhat_boring_display_transform(col: Vec3A) -> Vec3A {
        fn rgb_to_ycbcr(col: Vec3A) -> Vec3A {
            Mat3A {
                x_axis: vec3a(0.2126, -0.1146, 0.5),
                y_axis: vec3a(0.7152, -0.3854, -0.4542),
                z_axis: vec3a(0.0722, 0.5, -0.0458),
            } * col
        }

        fn tonemap_curve(v: f32) -> f32 {
            1.0 - (-v).exp()
        }

        fn tonemap_curve3(v: Vec3A) -> Vec3A {
            1.0 - (-v).exp()
        }

        fn tonemapping_luminance(col: Vec3A) -> f32 {
            col.dot(vec3a(0.2126, 0.7152, 0.0722))
        }

        let mut col = col;
        let ycbcr = rgb_to_ycbcr(col);

        let bt = tonemap_curve(ycbcr.yz().length() * 2.4);
        let mut desat = (bt - 0.7) * 0.8;
        desat *= desat;

        let desat_col = col.lerp(ycbcr.xxx(), desat);

        let tm_luma = tonemap_curve(ycbcr.x);
        let tm0 = col * tm_luma / tonemapping_luminance(col).max(1e-5);
        let final_mult = 0.97;
        let tm1 = tonemap_curve3(desat_col);

        col = tm0.lerp(tm1, bt * bt);

        col * final_mult
    }
}

pub mod geometry {
    use std::f32::consts::TAU;

    use crate::{
        scene::{CurveGeometry, CurveSubtype},
        test_util::sampling::hash_noise,
    };
    use glam::*;

    /// One strand from `root` along `+y` with `3 * segments + 1` control points over `length`.
    /// Sways in x & z by up to `sway` with a per strand phase taken from `seed`. Radius tapers to half at the tip.
    pub fn wavy_strand(
        root: Vec3,
        length: f32,
        sway: f32,
        segments: u32,
        radius: f32,
        seed: UVec2,
    ) -> Vec<Vec4> {
        let phase_x = hash_noise(seed, 0) * TAU;
        let phase_z = hash_noise(seed, 1) * TAU;
        let count = 3 * segments.max(1) + 1;
        (0..count)
            .map(|i| {
                let s = i as f32 / (count - 1) as f32;
                let bend = sway * s;
                vec4(
                    root.x + bend * (s * TAU + phase_x).sin(),
                    root.y + length * s,
                    root.z + bend * (s * TAU + phase_z).cos(),
                    radius * (1.0 - 0.5 * s),
                )
            })
            .collect()
    }

    /// `nx` by `nz` grid of wavy strands rooted on the y = 0 plane over x & z in [-1, 1], each 1 unit tall and made
    /// of `segments` cubic segments.
    pub fn hair_patch(
        nx: u32,
        nz: u32,
        segments: u32,
        radius: f32,
        subtype: CurveSubtype,
        tessellation_rate: u32,
    ) -> CurveGeometry {
        let cell = |i: u32, n: u32| {
            if n > 1 {
                i as f32 / (n - 1) as f32 * 2.0 - 1.0
            } else {
                0.0
            }
        };
        let strands: Vec<Vec<Vec4>> = (0..nz)
            .flat_map(|z| (0..nx).map(move |x| (x, z)))
            .map(|(x, z)| {
                wavy_strand(
                    vec3(cell(x, nx), 0.0, cell(z, nz)),
                    1.0,
                    0.15,
                    segments,
                    radius,
                    uvec2(x, z),
                )
            })
            .collect();
        CurveGeometry::from_strands(subtype, tessellation_rate, &strands)
    }
}

#[cfg(test)]
mod tests {
    use super::{geometry::*, sampling::*};
    use crate::scene::CurveSubtype;
    use glam::*;

    #[test]
    fn noise_is_unorm() {
        for i in 0..256 {
            let n = hash_noise(uvec2(i, i * 7), i);
            assert!((0.0..=1.0).contains(&n));
        }
    }

    #[test]
    fn sphere_samples_are_unit() {
        for i in 0..64 {
            let d = uniform_sample_sphere(vec2(
                hash_noise(uvec2(i, 0), 0),
                hash_noise(uvec2(i, 1), 0),
            ));
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn patch_layout() {
        let patch = hair_patch(3, 2, 4, 0.02, CurveSubtype::Round, 8);
        assert_eq!(patch.len(), 3 * 2 * 4);
        assert_eq!(patch.vertices.len(), 3 * 2 * 13);
        assert_eq!(patch.subtype, CurveSubtype::Round);
        // Segments of a strand share end points.
        assert_eq!(patch.gather(0)[3], patch.gather(1)[0]);
        for p in &patch.vertices {
            assert!(p.y >= 0.0 && p.y <= 1.0 + 1e-5);
            assert!(p.w > 0.0 && p.w <= 0.02);
        }
    }
}
