//! # sweeptri
//!
//! A [constrained Delaunay triangulation](https://en.wikipedia.org/wiki/Constrained_Delaunay_triangulation)
//! for simple polygons with holes and interior Steiner points, built with an
//! incremental sweep line over an advancing front.
//!
//! Given a closed outline, optional hole outlines and optional interior
//! points, [ConstrainedTriangulation] produces a set of non-overlapping CCW
//! triangles whose union equals the polygon-minus-holes region. Every input
//! edge is preserved in the output, and the mesh is Delaunay wherever the
//! constraints permit.
//!
//! # Example
//!
//! ```
//! use sweeptri::{ConstrainedTriangulation, Point2};
//! # fn try_main() -> Result<(), sweeptri::TriangulationError> {
//! let mut cdt = ConstrainedTriangulation::new(&[
//!     Point2::new(0.0, 0.0),
//!     Point2::new(2.0, 0.0),
//!     Point2::new(2.0, 1.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(1.0, 2.0),
//!     Point2::new(0.0, 2.0),
//! ]);
//! cdt.triangulate()?;
//! assert_eq!(cdt.num_triangles(), 4);
//! # Ok(()) }
//! # fn main() { try_main().unwrap() }
//! ```
//!
//! # Robustness
//!
//! The `exact-predicates` feature (enabled by default) evaluates the
//! orientation and in-circle predicates with adaptive precision arithmetic
//! from the [robust](https://docs.rs/robust) crate. Disabling it switches to
//! epsilon-tolerant floating point determinants, which are faster but can
//! misjudge near-degenerate input.
//!
//! Degenerate input - self-intersecting outlines, constraint edges running
//! through a third point, points outside the outline - is reported as a
//! categorical [TriangulationError] rather than resolved.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cdt;
mod point;
mod sweep_core;

#[cfg(test)]
mod test_utilities;

pub use cdt::{ConstrainedTriangulation, MeshTriangles, TriangleHandle, Triangles};
pub use point::{Point2, SweepNum};
pub use sweep_core::math::{in_circle, in_scan_area, orient2d, Orientation};
pub use sweep_core::{PointId, TriangleId, TriangulationError};
