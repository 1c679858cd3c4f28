//! Nearest-first iteration over the lanes that survived the slab test.

use std::iter::FusedIterator;

use crate::leaf::LANES;

/// Yields valid lanes in order of increasing entry distance, clearing each from the mask as it goes.
/// Equal entry distances are yielded lowest lane first.
#[derive(Clone, Copy, Debug)]
pub struct NearestLanes {
    mask: u32,
    t_near: [f32; LANES],
}

impl NearestLanes {
    #[inline(always)]
    pub fn new(mask: u32, t_near: [f32; LANES]) -> Self {
        debug_assert!(LANES == 32 || mask >> LANES == 0);
        Self { mask, t_near }
    }

    /// Lanes not yet yielded.
    #[inline(always)]
    pub fn remaining(&self) -> u32 {
        self.mask
    }
}

/// Index of the set bit of `mask` with the smallest `t_near`. `mask` must be non zero.
#[inline(always)]
pub fn select_min(mask: u32, t_near: &[f32; LANES]) -> usize {
    debug_assert_ne!(mask, 0);
    let mut best = mask.trailing_zeros() as usize;
    let mut rest = mask & (mask - 1);
    while rest != 0 {
        let lane = rest.trailing_zeros() as usize;
        rest &= rest - 1;
        if t_near[lane] < t_near[best] {
            best = lane;
        }
    }
    best
}

impl Iterator for NearestLanes {
    type Item = usize;

    #[inline(always)]
    fn next(&mut self) -> Option<usize> {
        if self.mask == 0 {
            return None;
        }
        let lane = select_min(self.mask, &self.t_near);
        self.mask &= !(1u32 << lane);
        Some(lane)
    }

    #[inline(always)]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let count = self.mask.count_ones() as usize;
        (count, Some(count))
    }
}

impl ExactSizeIterator for NearestLanes {}

impl FusedIterator for NearestLanes {}
