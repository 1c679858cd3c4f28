//! # BVH Leaf Intersection for Clustered Curves
//!
//! - Eight-wide curve leaves: up to [`leaf::LANES`] Bézier segment bounding boxes stored as a `repr(C)`, `Pod`
//!   struct-of-arrays that shares one local frame per leaf.
//! - SIMD slab test over all lanes at once (SSE, with a scalar fallback), then nearest-first visitation of the
//!   lanes that overlap the ray.
//! - Per-geometry dispatch to a ray-facing flat ("hair") intersector or a round tube intersector, with hits
//!   recorded through an epilogue that narrows the ray.
//!
//! Upper BVH traversal is left to the caller: hand each leaf the caller reaches to [`intersector::intersect`].
//!
//! OBVHS-curves optionally uses [rayon](https://github.com/rayon-rs/rayon) to parallelize leaf packing.
//!
//! ## Example
//!
//! ```
//! use glam::*;
//! use obvhs_curves::{
//!     epilogue::IntersectContext,
//!     intersector::{intersect, Precalculations},
//!     leaf::builder::build_leaves,
//!     ray::{Ray, RayHit},
//!     scene::{CurveGeometry, CurveSubtype, Scene},
//!     test_util::geometry::hair_patch,
//! };
//! use std::time::Duration;
//!
//! // A 4x4 patch of wavy hair strands standing along +y, 3 segments each.
//! let mut scene = Scene::default();
//! scene.add(hair_patch(4, 4, 3, 0.02, CurveSubtype::Flat, 8));
//!
//! // Pack the curves into leaves of up to 8 segments.
//! let leaves = build_leaves(&scene, &scene.primitives(), &mut Duration::default());
//!
//! let mut ray = Ray::new_inf(vec3a(0.0, 0.5, 4.0), vec3a(0.0, 0.0, -1.0));
//! let pre = Precalculations::new(&ray);
//! let mut hit = RayHit::none();
//! let mut context = IntersectContext::new(&scene);
//!
//! // Without an upper BVH every leaf is visited. The ray still ends up with the closest hit.
//! for leaf in &leaves {
//!     intersect(&pre, &mut ray, &mut hit, &mut context, leaf);
//! }
//!
//! if hit.t < f32::INFINITY {
//!     println!("Hit curve {} of geometry {} at {}", hit.primitive_id, hit.geometry_id, hit.t);
//! } else {
//!     println!("Miss");
//! }
//! ```

use std::time::Duration;

use aabb::Aabb;
use glam::Mat4;

pub mod aabb;
pub mod curve;
pub mod epilogue;
pub mod intersector;
pub mod leaf;
pub mod ray;
pub mod scene;
pub mod test_util;

/// A trait for types that can be bounded by an axis-aligned bounding box (AABB). Used in leaf packing & validation.
#[cfg(feature = "parallel")]
pub trait Boundable: Send + Sync {
    fn aabb(&self) -> Aabb;
}

/// A trait for types that can be bounded by an axis-aligned bounding box (AABB). Used in leaf packing & validation.
#[cfg(not(feature = "parallel"))]
pub trait Boundable {
    fn aabb(&self) -> Aabb;
}

/// A trait for types that can have a matrix transform applied. Primarily for testing/examples.
pub trait Transformable {
    fn transform(&mut self, matrix: &Mat4);
}

/// A macro to measure and print the execution time of a block of code.
///
/// # Arguments
/// * `$label` - A string label to identify the code block being timed.
/// * `$($code:tt)*` - The code block whose execution time is to be measured.
///
/// # Usage
/// ```rust
/// use obvhs_curves::timeit;
/// timeit!["example",
///     // code to measure
/// ];
/// ```
///
/// # Note
/// The macro purposefully doesn't include a scope so variables don't need to
/// be passed out of it. This allows it to be trivially added to existing code.
///
/// This macro only measures time when the `timeit` feature is enabled.
#[macro_export]
#[doc(hidden)]
macro_rules! timeit {
    [$label:expr, $($code:tt)*] => {
        #[cfg(feature = "timeit")]
        let timeit_start = std::time::Instant::now();
        $($code)*
        #[cfg(feature = "timeit")]
        println!("{:>8} {}", format!("{}", $crate::PrettyDuration(timeit_start.elapsed())), $label);
    };
}

/// A wrapper struct for `std::time::Duration` to provide pretty-printing of durations.
#[doc(hidden)]
pub struct PrettyDuration(pub Duration);

impl std::fmt::Display for PrettyDuration {
    /// Durations are formatted as follows:
    /// - If the duration is greater than or equal to 1 second, it is formatted in seconds (s).
    /// - If the duration is greater than or equal to 1 millisecond but less than 1 second, it is formatted in milliseconds (ms).
    /// - If the duration is less than 1 millisecond, it is formatted in microseconds (µs).
    ///   In the case of seconds & milliseconds, the duration is always printed with a precision of two decimal places.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let duration = self.0;
        if duration.as_secs() > 0 {
            let seconds =
                duration.as_secs() as f64 + f64::from(duration.subsec_nanos()) / 1_000_000_000.0;
            write!(f, "{seconds:.2}s ")
        } else if duration.subsec_millis() > 0 {
            let milliseconds =
                duration.as_millis() as f64 + f64::from(duration.subsec_micros() % 1_000) / 1_000.0;
            write!(f, "{milliseconds:.2}ms")
        } else {
            let microseconds = duration.as_micros();
            write!(f, "{microseconds}µs")
        }
    }
}

/// Add profile scope. Nesting the macro allows us to make the profiling crate optional.
#[doc(hidden)]
#[macro_export]
macro_rules! scope {
    [$label:expr] => {
        #[cfg(feature = "profile")]
        profiling::scope!($label);
    };
}
