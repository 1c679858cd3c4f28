//! Curve geometry storage and the lookup used by the leaf intersector to fetch control points.

use glam::{Mat4, Vec4, Vec4Swizzles};

use crate::{aabb::Aabb, curve::BezierCurve, Transformable};

/// Selects which root solver a geometry's curves are intersected with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CurveSubtype {
    /// Ray-facing flat ribbon, tessellated into linear pieces. Used for hair & fur.
    #[default]
    Flat,
    /// Round tube of varying radius.
    Round,
}

/// What a leaf lane resolves to once its curve is fetched from the scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FetchedCurve {
    /// World space position in `xyz`, radius in `w`.
    pub control_points: [Vec4; 4],
    pub subtype: CurveSubtype,
    /// Number of linear pieces flat curves are tessellated into. Ignored for round curves.
    pub tessellation_rate: u32,
}

/// Looks up curve segments by `(geometry_id, primitive_id)`.
/// Implementations may be arbitrarily slow (decompression, paging), the leaf intersector calls this once per visited
/// lane and never caches the result.
#[cfg(feature = "parallel")]
pub trait CurveScene: Sync {
    fn fetch(&self, geometry_id: u32, primitive_id: u32) -> FetchedCurve;
}

/// Looks up curve segments by `(geometry_id, primitive_id)`.
/// Implementations may be arbitrarily slow (decompression, paging), the leaf intersector calls this once per visited
/// lane and never caches the result.
#[cfg(not(feature = "parallel"))]
pub trait CurveScene {
    fn fetch(&self, geometry_id: u32, primitive_id: u32) -> FetchedCurve;
}

/// A set of cubic Bézier segments sharing one vertex buffer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurveGeometry {
    pub subtype: CurveSubtype,
    pub tessellation_rate: u32,
    /// Position in `xyz`, radius in `w`.
    pub vertices: Vec<Vec4>,
    /// Index of the first of the 4 consecutive vertices of each segment.
    /// Consecutive segments of a strand typically share an end point: `[0, 3, 6, ..]`.
    pub curves: Vec<u32>,
}

impl CurveGeometry {
    pub fn new(
        subtype: CurveSubtype,
        tessellation_rate: u32,
        vertices: Vec<Vec4>,
        curves: Vec<u32>,
    ) -> Self {
        debug_assert!(curves
            .iter()
            .all(|first| *first as usize + 3 < vertices.len()));
        Self {
            subtype,
            tessellation_rate,
            vertices,
            curves,
        }
    }

    /// Builds a geometry from one contiguous strand per entry, each with `3 * segments + 1` vertices.
    pub fn from_strands(
        subtype: CurveSubtype,
        tessellation_rate: u32,
        strands: &[Vec<Vec4>],
    ) -> Self {
        let mut vertices = Vec::new();
        let mut curves = Vec::new();
        for strand in strands {
            assert!(
                strand.len() >= 4 && (strand.len() - 1) % 3 == 0,
                "strand needs 3 * segments + 1 vertices, got {}",
                strand.len()
            );
            let base = vertices.len() as u32;
            for segment in 0..(strand.len() - 1) / 3 {
                curves.push(base + segment as u32 * 3);
            }
            vertices.extend_from_slice(strand);
        }
        Self::new(subtype, tessellation_rate, vertices, curves)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// The 4 control points of `primitive_id`.
    #[inline(always)]
    pub fn gather(&self, primitive_id: u32) -> [Vec4; 4] {
        let first = self.curves[primitive_id as usize] as usize;
        let v = &self.vertices[first..first + 4];
        [v[0], v[1], v[2], v[3]]
    }

    #[inline(always)]
    pub fn bezier(&self, primitive_id: u32) -> BezierCurve {
        BezierCurve::new(self.gather(primitive_id))
    }

    pub fn bounds(&self, primitive_id: u32) -> Aabb {
        self.bezier(primitive_id).bounds()
    }
}

impl Transformable for CurveGeometry {
    /// Moves the control points. Radii are left as is.
    fn transform(&mut self, matrix: &Mat4) {
        for v in self.vertices.iter_mut() {
            *v = matrix.transform_point3(v.xyz()).extend(v.w);
        }
    }
}

/// All curve geometries, indexed by geometry id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub geometries: Vec<CurveGeometry>,
}

impl Scene {
    /// Adds a geometry and returns its geometry id.
    pub fn add(&mut self, geometry: CurveGeometry) -> u32 {
        self.geometries.push(geometry);
        (self.geometries.len() - 1) as u32
    }

    #[inline(always)]
    pub fn get(&self, geometry_id: u32) -> &CurveGeometry {
        &self.geometries[geometry_id as usize]
    }

    /// Every `(geometry_id, primitive_id)` in the scene.
    pub fn primitives(&self) -> Vec<(u32, u32)> {
        self.geometries
            .iter()
            .enumerate()
            .flat_map(|(geometry_id, geometry)| {
                (0..geometry.len() as u32)
                    .map(move |primitive_id| (geometry_id as u32, primitive_id))
            })
            .collect()
    }
}

impl CurveScene for Scene {
    #[inline(always)]
    fn fetch(&self, geometry_id: u32, primitive_id: u32) -> FetchedCurve {
        let geometry = self.get(geometry_id);
        FetchedCurve {
            control_points: geometry.gather(primitive_id),
            subtype: geometry.subtype,
            tessellation_rate: geometry.tessellation_rate,
        }
    }
}
