use crate::sweep_core::SweepContext;
use crate::{Point2, PointId, SweepNum, TriangleId, TriangulationError};

/// A two-dimensional
/// [constrained Delaunay triangulation](https://en.wikipedia.org/wiki/Constrained_Delaunay_triangulation)
/// of a simple polygon, built with an incremental sweep line.
///
/// The triangulation is defined by one closed outline, any number of hole
/// outlines and any number of interior Steiner points. Every outline edge is
/// kept as an edge of the result (a _constraint edge_), the produced
/// triangles exactly cover the outline region minus the holes, and the mesh
/// is Delaunay wherever the constraints permit.
///
/// # Example
///
/// ```
/// use sweeptri::{ConstrainedTriangulation, Point2};
/// # fn try_main() -> Result<(), sweeptri::TriangulationError> {
/// let mut cdt = ConstrainedTriangulation::new(&[
///     Point2::new(0.0, 0.0),
///     Point2::new(4.0, 0.0),
///     Point2::new(4.0, 4.0),
///     Point2::new(0.0, 4.0),
/// ]);
/// cdt.add_hole(&[
///     Point2::new(1.0, 1.0),
///     Point2::new(3.0, 1.0),
///     Point2::new(3.0, 3.0),
///     Point2::new(1.0, 3.0),
/// ]);
/// cdt.triangulate()?;
/// assert_eq!(cdt.num_triangles(), 8);
/// for triangle in cdt.triangles() {
///     let [a, b, c] = triangle.positions();
///     println!("({:?}, {:?}, {:?})", a, b, c);
/// }
/// # Ok(()) }
/// # fn main() { try_main().unwrap() }
/// ```
///
/// # Input requirements
///
/// Outlines must be closed, non-self-intersecting rings given without a
/// repeated closing point; the edge from the last point back to the first
/// is implicit. Holes must lie strictly inside the outline and Steiner
/// points strictly inside the remaining region. All points must be distinct
/// by coordinate and all coordinates finite. A constraint edge must not run
/// through a third input point unless that point lies exactly on it.
///
/// Violations are either caught as a [TriangulationError] or, for repeated
/// points, rejected with a panic at registration.
///
/// A triangulation is single-shot: after [triangulate](Self::triangulate)
/// returned (and in particular after it failed), the instance only serves
/// as a read-only view of the result and must not be triangulated again.
#[doc(alias = "CDT")]
pub struct ConstrainedTriangulation<S: SweepNum = f64> {
    context: SweepContext<S>,
    triangulated: bool,
}

impl<S: SweepNum> ConstrainedTriangulation<S> {
    /// Creates a triangulation of the given outline polygon.
    ///
    /// Consecutive points become constraint edges, including the implicit
    /// closing edge from the last point back to the first. The outline's
    /// points receive the point ids `0..outline.len()` in input order.
    ///
    /// # Panics
    ///
    /// Panics if the outline has fewer than 3 points or contains two
    /// consecutive points with equal coordinates.
    pub fn new(outline: &[Point2<S>]) -> Self {
        assert!(
            outline.len() >= 3,
            "an outline needs at least 3 points, got {}",
            outline.len()
        );
        let mut context = SweepContext::new();
        context.add_polyline(outline);
        ConstrainedTriangulation {
            context,
            triangulated: false,
        }
    }

    /// Registers a hole to be excluded from the triangulated region.
    ///
    /// The ring is closed implicitly, like the outline. Its points receive
    /// the next free point ids in input order.
    ///
    /// # Panics
    ///
    /// Panics if the hole has fewer than 3 points, contains two consecutive
    /// points with equal coordinates, or the triangulation already ran.
    pub fn add_hole(&mut self, hole: &[Point2<S>]) {
        assert!(!self.triangulated, "the triangulation already ran");
        assert!(
            hole.len() >= 3,
            "a hole needs at least 3 points, got {}",
            hole.len()
        );
        self.context.add_polyline(hole);
    }

    /// Registers an interior point that carries no constraint edges.
    ///
    /// Returns the id assigned to the point.
    ///
    /// # Panics
    ///
    /// Panics if the triangulation already ran.
    pub fn add_steiner_point(&mut self, point: Point2<S>) -> PointId {
        assert!(!self.triangulated, "the triangulation already ran");
        self.context.add_point(point)
    }

    /// Runs the sweep.
    ///
    /// On success, [triangles](Self::triangles) yields the interior
    /// triangulation. On failure the mesh is left in an indeterminate state
    /// and only the input accessors remain meaningful.
    ///
    /// # Panics
    ///
    /// Panics if called a second time.
    pub fn triangulate(&mut self) -> Result<(), TriangulationError> {
        assert!(
            !self.triangulated,
            "triangulate may only be called once per instance"
        );
        self.triangulated = true;
        self.context.triangulate()
    }

    /// The interior triangles covering the outline region minus the holes.
    ///
    /// Empty before [triangulate](Self::triangulate) has run successfully.
    pub fn triangles(&self) -> Triangles<'_, S> {
        Triangles {
            context: &self.context,
            ids: self.context.interior_triangles().iter(),
        }
    }

    /// All triangles of the underlying mesh, including the outer shell
    /// connecting the outline to the artificial bootstrap points and any
    /// triangles inside holes. Mostly useful for debugging.
    pub fn mesh(&self) -> MeshTriangles<'_, S> {
        MeshTriangles {
            context: &self.context,
            range: 0..self.context.triangle_count(),
        }
    }

    /// The number of interior triangles.
    pub fn num_triangles(&self) -> usize {
        self.context.interior_triangles().len()
    }

    /// The number of registered input points.
    pub fn num_points(&self) -> usize {
        self.context.input_point_count()
    }

    /// The number of registered holes.
    pub fn num_holes(&self) -> usize {
        self.context.rings().len() - 1
    }

    /// The position of an input point.
    ///
    /// # Panics
    ///
    /// Panics if `point` is not a handle of this triangulation.
    pub fn position(&self, point: PointId) -> Point2<S> {
        assert!(
            point.index() < self.context.input_point_count(),
            "{:?} is not a point of this triangulation",
            point
        );
        self.context.point(point)
    }

    /// Asserts the output invariants: CCW orientation, neighbor and
    /// constrained-flag symmetry, constraint preservation, the local
    /// Delaunay property across unconstrained edges, the Euler
    /// characteristic and area coverage.
    #[cfg(test)]
    pub(crate) fn sanity_check(&self) {
        use crate::sweep_core::math::{self, Orientation};
        use approx::assert_relative_eq;
        use std::collections::HashSet;

        let context = &self.context;
        let interior = context.interior_triangles();
        assert!(!interior.is_empty(), "triangulation produced no triangles");

        for &id in interior {
            let [a, b, c] = context.tri(id).points();
            assert_eq!(
                math::orient2d(context.point(a), context.point(b), context.point(c)),
                Orientation::Ccw,
                "triangle {:?} is not CCW",
                id
            );
        }

        for index in 0..context.triangle_count() {
            let t = TriangleId::new(index);
            for i in 0..3 {
                let neighbor = match context.tri(t).neighbor(i) {
                    Some(neighbor) => neighbor,
                    None => continue,
                };
                let p1 = context.tri(t).point((i + 1) % 3);
                let p2 = context.tri(t).point((i + 2) % 3);
                let j = context
                    .tri(neighbor)
                    .edge_index(p1, p2)
                    .expect("neighbors must share an edge");
                assert_eq!(context.tri(neighbor).neighbor(j), Some(t));
                assert_eq!(
                    context.tri(neighbor).constrained_edge(j),
                    context.tri(t).constrained_edge(i),
                    "asymmetric constrained flag between {:?} and {:?}",
                    t,
                    neighbor
                );
            }
        }

        let mut mesh_edges: HashSet<(usize, usize)> = HashSet::new();
        for &id in interior {
            let points = context.tri(id).points();
            for i in 0..3 {
                let a = points[i].index();
                let b = points[(i + 1) % 3].index();
                mesh_edges.insert((a.min(b), a.max(b)));
            }
        }
        for ring in context.rings() {
            for i in ring.clone() {
                let j = if i + 1 == ring.end { ring.start } else { i + 1 };
                assert!(
                    mesh_edges.contains(&(i.min(j), i.max(j))),
                    "constraint edge ({}, {}) missing from the mesh",
                    i,
                    j
                );
            }
        }

        for &id in interior {
            for i in 0..3 {
                if context.tri(id).constrained_edge(i) {
                    continue;
                }
                let neighbor = match context.tri(id).neighbor(i) {
                    Some(neighbor) => neighbor,
                    None => continue,
                };
                if !context.tri(neighbor).is_interior() {
                    continue;
                }
                let p = context.tri(id).point(i);
                let p_ccw = context.tri(id).point_ccw(p).unwrap();
                let p_cw = context.tri(id).point_cw(p).unwrap();
                let op = context
                    .tri(neighbor)
                    .opposite_point(context.tri(id), p)
                    .unwrap();
                assert!(
                    !math::in_circle(
                        context.point(p),
                        context.point(p_ccw),
                        context.point(p_cw),
                        context.point(op),
                    ),
                    "unconstrained edge of {:?} violates the Delaunay property",
                    id
                );
            }
        }

        let mut vertices: HashSet<usize> = HashSet::new();
        for &id in interior {
            for point in context.tri(id).points() {
                vertices.insert(point.index());
            }
        }
        let v = vertices.len() as i64;
        let e = mesh_edges.len() as i64;
        // One face per triangle and hole, plus the outer face.
        let f = interior.len() as i64 + context.rings().len() as i64;
        assert_eq!(v - e + f, 2, "Euler characteristic violated");

        let ring_area = |range: core::ops::Range<usize>| -> f64 {
            let mut doubled = 0.0;
            for i in range.clone() {
                let j = if i + 1 == range.end { range.start } else { i + 1 };
                let a = context.point(PointId::new(i)).to_f64();
                let b = context.point(PointId::new(j)).to_f64();
                doubled += a.x * b.y - b.x * a.y;
            }
            (doubled / 2.0).abs()
        };
        let mut expected_area = 0.0;
        for (i, ring) in context.rings().iter().enumerate() {
            if i == 0 {
                expected_area += ring_area(ring.clone());
            } else {
                expected_area -= ring_area(ring.clone());
            }
        }
        let mut covered_area = 0.0;
        for &id in interior {
            let [a, b, c] = context.tri(id).points();
            let a = context.point(a).to_f64();
            let b = context.point(b).to_f64();
            let c = context.point(c).to_f64();
            covered_area += ((b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)) / 2.0;
        }
        assert_relative_eq!(expected_area, covered_area, max_relative = 1e-9);
    }
}

/// A borrowed view of one triangle of a [ConstrainedTriangulation].
#[derive(Clone, Copy)]
pub struct TriangleHandle<'a, S: SweepNum> {
    context: &'a SweepContext<S>,
    id: TriangleId,
}

impl<'a, S: SweepNum> TriangleHandle<'a, S> {
    /// The triangle's id in the mesh.
    pub fn id(&self) -> TriangleId {
        self.id
    }

    /// The triangle's corner points, in CCW order.
    pub fn points(&self) -> [PointId; 3] {
        self.context.tri(self.id).points()
    }

    /// The triangle's corner positions, in CCW order.
    pub fn positions(&self) -> [Point2<S>; 3] {
        self.points().map(|point| self.context.point(point))
    }
}

impl<'a, S: SweepNum> core::fmt::Debug for TriangleHandle<'a, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TriangleHandle")
            .field("id", &self.id)
            .field("points", &self.points())
            .finish()
    }
}

/// Iterator over the interior triangles of a triangulation.
///
/// Created by [ConstrainedTriangulation::triangles].
pub struct Triangles<'a, S: SweepNum> {
    context: &'a SweepContext<S>,
    ids: core::slice::Iter<'a, TriangleId>,
}

impl<'a, S: SweepNum> Iterator for Triangles<'a, S> {
    type Item = TriangleHandle<'a, S>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.ids.next()?;
        Some(TriangleHandle {
            context: self.context,
            id,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

/// Iterator over all mesh triangles, including the outer shell.
///
/// Created by [ConstrainedTriangulation::mesh].
pub struct MeshTriangles<'a, S: SweepNum> {
    context: &'a SweepContext<S>,
    range: core::ops::Range<usize>,
}

impl<'a, S: SweepNum> Iterator for MeshTriangles<'a, S> {
    type Item = TriangleHandle<'a, S>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.range.next()?;
        Some(TriangleHandle {
            context: self.context,
            id: TriangleId::new(index),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

#[cfg(test)]
mod test {
    use super::ConstrainedTriangulation;
    use crate::test_utilities::{random_points_in_range, SEED};
    use crate::{Point2, TriangulationError};
    use std::collections::HashSet;

    fn unit_square() -> Vec<Point2<f64>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]
    }

    fn edge_set(cdt: &ConstrainedTriangulation<f64>) -> HashSet<(usize, usize)> {
        let mut edges = HashSet::new();
        for triangle in cdt.triangles() {
            let points = triangle.points();
            for i in 0..3 {
                let a = points[i].index();
                let b = points[(i + 1) % 3].index();
                edges.insert((a.min(b), a.max(b)));
            }
        }
        edges
    }

    #[test]
    fn test_single_triangle() -> Result<(), TriangulationError> {
        let mut cdt = ConstrainedTriangulation::new(&[
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ]);
        cdt.triangulate()?;
        assert_eq!(cdt.num_triangles(), 1);
        let triangle = cdt.triangles().next().unwrap();
        let mut indices: Vec<_> = triangle.points().iter().map(|p| p.index()).collect();
        indices.sort_unstable();
        assert_eq!(indices, [0, 1, 2]);
        cdt.sanity_check();
        Ok(())
    }

    #[test]
    fn test_unit_square() -> Result<(), TriangulationError> {
        let mut cdt = ConstrainedTriangulation::new(&unit_square());
        cdt.triangulate()?;
        assert_eq!(cdt.num_triangles(), 2);
        // The two triangles share one diagonal; either diagonal is fine.
        let edges = edge_set(&cdt);
        assert_eq!(edges.len(), 5);
        assert!(edges.contains(&(0, 2)) ^ edges.contains(&(1, 3)));
        cdt.sanity_check();
        Ok(())
    }

    #[test]
    fn test_square_with_centered_hole() -> Result<(), TriangulationError> {
        let mut cdt = ConstrainedTriangulation::new(&[
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(4.0, 4.0),
            Point2::new(0.0, 4.0),
        ]);
        cdt.add_hole(&[
            Point2::new(1.0, 1.0),
            Point2::new(3.0, 1.0),
            Point2::new(3.0, 3.0),
            Point2::new(1.0, 3.0),
        ]);
        cdt.triangulate()?;
        assert_eq!(cdt.num_triangles(), 8);
        // No triangle reaches into the hole.
        for triangle in cdt.triangles() {
            let [a, b, c] = triangle.positions();
            let cx = (a.x + b.x + c.x) / 3.0;
            let cy = (a.y + b.y + c.y) / 3.0;
            assert!(
                !(cx > 1.0 && cx < 3.0 && cy > 1.0 && cy < 3.0),
                "triangle centroid ({}, {}) lies inside the hole",
                cx,
                cy
            );
        }
        cdt.sanity_check();
        Ok(())
    }

    #[test]
    fn test_steiner_point_at_center() -> Result<(), TriangulationError> {
        let mut cdt = ConstrainedTriangulation::new(&unit_square());
        let center = cdt.add_steiner_point(Point2::new(0.5, 0.5));
        cdt.triangulate()?;
        assert_eq!(cdt.num_triangles(), 4);
        for triangle in cdt.triangles() {
            assert!(
                triangle.points().contains(&center),
                "{:?} is not incident on the Steiner point",
                triangle
            );
        }
        cdt.sanity_check();
        Ok(())
    }

    #[test]
    fn test_concave_l_shape() -> Result<(), TriangulationError> {
        let mut cdt = ConstrainedTriangulation::new(&[
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(0.0, 2.0),
        ]);
        cdt.triangulate()?;
        assert_eq!(cdt.num_triangles(), 4);
        cdt.sanity_check();
        Ok(())
    }

    #[test]
    fn test_near_collinear_outline() {
        // A quad squashed almost flat at one corner: this must either
        // triangulate or report the collinearity, but never corrupt memory
        // or hang.
        let mut cdt = ConstrainedTriangulation::new(&[
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0e-12),
            Point2::new(0.0, 1.0),
        ]);
        match cdt.triangulate() {
            Ok(()) => {
                assert_eq!(cdt.num_triangles(), 2);
                cdt.sanity_check();
            }
            Err(TriangulationError::CollinearPoints) => {}
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_convex_polygon_is_deterministic() -> Result<(), TriangulationError> {
        let hexagon = vec![
            Point2::new(2.0, 0.0),
            Point2::new(4.0, 1.0),
            Point2::new(4.0, 3.0),
            Point2::new(2.0, 4.0),
            Point2::new(0.0, 3.0),
            Point2::new(0.0, 1.0),
        ];
        let mut first = ConstrainedTriangulation::new(&hexagon);
        first.triangulate()?;
        first.sanity_check();
        assert_eq!(first.num_triangles(), 4);

        let mut second = ConstrainedTriangulation::new(&hexagon);
        second.triangulate()?;
        assert_eq!(edge_set(&first), edge_set(&second));
        Ok(())
    }

    #[test]
    fn test_mesh_includes_outer_shell() -> Result<(), TriangulationError> {
        let mut cdt = ConstrainedTriangulation::new(&unit_square());
        cdt.triangulate()?;
        // The debug view also carries the triangles spanning the artificial
        // points below the input.
        assert!(cdt.mesh().count() > cdt.triangles().count());
        Ok(())
    }

    #[test]
    fn test_point_accessors() {
        let mut cdt = ConstrainedTriangulation::new(&unit_square());
        assert_eq!(cdt.num_points(), 4);
        assert_eq!(cdt.num_holes(), 0);
        let steiner = cdt.add_steiner_point(Point2::new(0.25, 0.25));
        assert_eq!(cdt.num_points(), 5);
        assert_eq!(cdt.position(steiner), Point2::new(0.25, 0.25));
    }

    #[test]
    #[should_panic]
    fn test_triangulate_twice_panics() {
        let mut cdt = ConstrainedTriangulation::new(&unit_square());
        cdt.triangulate().unwrap();
        let _ = cdt.triangulate();
    }

    #[test]
    #[should_panic]
    fn test_degenerate_outline_panics() {
        ConstrainedTriangulation::new(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
    }

    #[test]
    fn test_random_steiner_points() -> Result<(), TriangulationError> {
        let mut cdt = ConstrainedTriangulation::new(&unit_square());
        // Strictly interior, seeded, and (for this seed) collision free.
        for point in random_points_in_range(0.45, 100, SEED) {
            cdt.add_steiner_point(Point2::new(point.x + 0.5, point.y + 0.5));
        }
        cdt.triangulate()?;
        // Every interior Steiner point adds two triangles.
        assert_eq!(cdt.num_triangles(), 202);
        cdt.sanity_check();
        Ok(())
    }

    #[test]
    fn test_f32_coordinates() -> Result<(), TriangulationError> {
        let mut cdt = ConstrainedTriangulation::new(&[
            Point2::new(0.0f32, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]);
        cdt.triangulate()?;
        assert_eq!(cdt.num_triangles(), 2);
        Ok(())
    }
}
