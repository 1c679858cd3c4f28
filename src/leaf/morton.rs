// http://www.graphics.stanford.edu/~seander/bithacks.html#InterleaveBMN

//---------------------------------------------------
// --- 21 bit resolution per channel morton curve ---
//---------------------------------------------------

use bytemuck::{Pod, Zeroable};
use glam::{DVec3, Vec3A};
use rdst::{RadixKey, RadixSort};

use crate::aabb::Aabb;

const MORTON_MAX: f64 = ((1u32 << 21) - 1) as f64;

#[inline]
pub fn split_by_3_u64(a: u32) -> u64 {
    let mut x = a as u64 & 0x1fffff; // we only look at the first 21 bits
    x = (x | x << 32) & 0x1f00000000ffff;
    x = (x | x << 16) & 0x1f0000ff0000ff;
    x = (x | x << 8) & 0x100f00f00f00f00f;
    x = (x | x << 4) & 0x10c30c30c30c30c3;
    x = (x | x << 2) & 0x1249249249249249;
    x
}

#[inline]
/// Encode x,y,z position into a u64 morton value.
/// Input should be 0..2u32.pow(21) (or 1u32 << 21)
pub fn morton_encode_u64(x: u32, y: u32, z: u32) -> u64 {
    split_by_3_u64(x) | split_by_3_u64(y) << 1 | split_by_3_u64(z) << 2
}

#[inline]
/// Encode a DVec3 position into a u64 morton value.
/// Input is clamped to 0.0..=1.0
pub fn morton_encode_u64_unorm(p: DVec3) -> u64 {
    let p = p.clamp(DVec3::ZERO, DVec3::ONE) * MORTON_MAX;
    morton_encode_u64(p.x as u32, p.y as u32, p.z as u32)
}

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct Morton64 {
    code: u64,
    index: u64,
}

impl RadixKey for Morton64 {
    const LEVELS: usize = 8;

    #[inline(always)]
    fn get_level(&self, level: usize) -> u8 {
        self.code.get_level(level)
    }
}

/// Returns the indices of `centers` ordered along a morton curve spanning their bounds.
pub fn morton_order(centers: &[Vec3A]) -> Vec<u32> {
    if centers.is_empty() {
        return Vec::new();
    }
    let bounds = Aabb::from_points(centers);
    let offset = bounds.min.as_dvec3();
    // Flat axes map to 0 instead of dividing by 0.
    let extent = bounds.diagonal().as_dvec3();
    let inv = |d: f64| if d > 0.0 { 1.0 / d } else { 0.0 };
    let scale = DVec3::new(inv(extent.x), inv(extent.y), inv(extent.z));

    let mut mortons: Vec<Morton64> = centers
        .iter()
        .enumerate()
        .map(|(index, center)| Morton64 {
            code: morton_encode_u64_unorm((center.as_dvec3() - offset) * scale),
            index: index as u64,
        })
        .collect();
    mortons.radix_sort_unstable();
    mortons.iter().map(|m| m.index as u32).collect()
}
