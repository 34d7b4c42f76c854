use core::cmp::Ordering;
use core::ops::Range;

use num_traits::NumCast;
use smallvec::SmallVec;

use crate::sweep_core::advancing_front::AdvancingFront;
use crate::sweep_core::handles::{EdgeId, NodeId, PointId, TriangleId};
use crate::sweep_core::shape::{Edge, Triangle};
use crate::{Point2, SweepNum};

/// Margin factor for the artificial bootstrap points relative to the
/// input's bounding box extent.
const ALPHA: f64 = 0.3;

/// Scratch state describing the basin currently being filled.
#[derive(Default)]
pub(crate) struct Basin {
    pub left_node: Option<NodeId>,
    pub bottom_node: Option<NodeId>,
    pub right_node: Option<NodeId>,
    pub width: f64,
    pub left_highest: bool,
}

/// Scratch state of the constraint edge currently being inserted.
#[derive(Default)]
pub(crate) struct EdgeEventState {
    pub constrained_edge: Option<EdgeId>,
    pub right: bool,
}

/// Shared state of one triangulation run: the registered points and
/// constraint edges, the triangle registry, the advancing front and the
/// sweep's scratch areas.
pub(crate) struct SweepContext<S: SweepNum> {
    points: Vec<Point2<S>>,
    edge_lists: Vec<SmallVec<[EdgeId; 2]>>,
    rings: Vec<Range<usize>>,
    pub(crate) edges: Vec<Edge>,
    triangles: Vec<Triangle>,
    interior: Vec<TriangleId>,
    sorted: Vec<PointId>,
    pub(crate) front: AdvancingFront<S>,
    head: Option<PointId>,
    tail: Option<PointId>,
    pub(crate) basin: Basin,
    pub(crate) edge_event: EdgeEventState,
}

impl<S: SweepNum> SweepContext<S> {
    pub(crate) fn new() -> Self {
        SweepContext {
            points: Vec::new(),
            edge_lists: Vec::new(),
            rings: Vec::new(),
            edges: Vec::new(),
            triangles: Vec::new(),
            interior: Vec::new(),
            sorted: Vec::new(),
            front: AdvancingFront::empty(),
            head: None,
            tail: None,
            basin: Basin::default(),
            edge_event: EdgeEventState::default(),
        }
    }

    /// Registers a closed polyline (outline or hole). Each consecutive pair
    /// becomes a constraint edge, as does the implicit closing pair.
    pub(crate) fn add_polyline(&mut self, polyline: &[Point2<S>]) {
        let first = self.points.len();
        for &point in polyline {
            self.add_point(point);
        }
        let ring = first..self.points.len();
        for i in ring.clone() {
            let j = if i + 1 == ring.end { ring.start } else { i + 1 };
            self.new_edge(PointId::new(i), PointId::new(j));
        }
        self.rings.push(ring);
    }

    /// Registers a single point without constraint edges.
    pub(crate) fn add_point(&mut self, point: Point2<S>) -> PointId {
        debug_assert!(
            point.x.is_finite() && point.y.is_finite(),
            "coordinates must be finite: {:?}",
            point
        );
        let id = PointId::new(self.points.len());
        self.points.push(point);
        self.edge_lists.push(SmallVec::new());
        id
    }

    /// Creates a constraint edge and attaches it to the upper endpoint's
    /// edge list.
    fn new_edge(&mut self, p1: PointId, p2: PointId) -> EdgeId {
        let edge = Edge::new(p1, self.point(p1), p2, self.point(p2));
        let id = EdgeId::new(self.edges.len());
        self.edge_lists[edge.q.index()].push(id);
        self.edges.push(edge);
        id
    }

    pub(crate) fn point(&self, id: PointId) -> Point2<S> {
        self.points[id.index()]
    }

    pub(crate) fn point_count(&self) -> usize {
        self.sorted.len()
    }

    /// The number of registered input points, excluding the artificial
    /// bootstrap points.
    pub(crate) fn input_point_count(&self) -> usize {
        if self.sorted.is_empty() {
            self.points.len()
        } else {
            self.sorted.len()
        }
    }

    pub(crate) fn sorted_point(&self, i: usize) -> PointId {
        self.sorted[i]
    }

    pub(crate) fn edge_list(&self, point: PointId) -> &SmallVec<[EdgeId; 2]> {
        &self.edge_lists[point.index()]
    }

    pub(crate) fn rings(&self) -> &[Range<usize>] {
        &self.rings
    }

    pub(crate) fn tri(&self, id: TriangleId) -> &Triangle {
        &self.triangles[id.index()]
    }

    pub(crate) fn tri_mut(&mut self, id: TriangleId) -> &mut Triangle {
        &mut self.triangles[id.index()]
    }

    pub(crate) fn add_triangle(&mut self, triangle: Triangle) -> TriangleId {
        let id = TriangleId::new(self.triangles.len());
        self.triangles.push(triangle);
        id
    }

    pub(crate) fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub(crate) fn interior_triangles(&self) -> &[TriangleId] {
        &self.interior
    }

    /// Sorts the input along the sweep direction and creates the two
    /// artificial points bracketing the input's bounding box from below.
    pub(crate) fn init_triangulation(&mut self) {
        let real_points = self.points.len();
        debug_assert!(real_points >= 3, "a triangulation needs at least 3 points");

        let mut xmin = self.points[0].x;
        let mut xmax = xmin;
        let mut ymin = self.points[0].y;
        let mut ymax = ymin;
        for point in &self.points {
            if point.x > xmax {
                xmax = point.x;
            }
            if point.x < xmin {
                xmin = point.x;
            }
            if point.y > ymax {
                ymax = point.y;
            }
            if point.y < ymin {
                ymin = point.y;
            }
        }

        let (xmin, xmax): (f64, f64) = (xmin.into(), xmax.into());
        let (ymin, ymax): (f64, f64) = (ymin.into(), ymax.into());
        let dx = ALPHA * (xmax - xmin);
        let dy = ALPHA * (ymax - ymin);
        let head = Point2::new(cast(xmax + dx), cast(ymin - dy));
        let tail = Point2::new(cast(xmin - dx), cast(ymin - dy));
        self.head = Some(self.add_point(head));
        self.tail = Some(self.add_point(tail));

        self.sorted = (0..real_points).map(PointId::new).collect();
        let points = &self.points;
        self.sorted.sort_by(|&a, &b| {
            let a = points[a.index()];
            let b = points[b.index()];
            match a.y.partial_cmp(&b.y) {
                Some(Ordering::Equal) | None => {
                    a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal)
                }
                Some(ordering) => ordering,
            }
        });
    }

    /// Builds the bootstrap triangle spanning the bottom-most input point
    /// and the two artificial points, and the initial three-node front.
    pub(crate) fn create_advancing_front(&mut self) {
        let first = self.sorted[0];
        let head = self.head.expect("init_triangulation runs first");
        let tail = self.tail.expect("init_triangulation runs first");

        let triangle = self.add_triangle(Triangle::new(first, tail, head));
        self.front = AdvancingFront::new(
            (tail, self.point(tail).x),
            (first, self.point(first).x),
            (head, self.point(head).x),
            triangle,
        );
    }

    /// Wires `a` and `b` as mutual neighbors along their shared edge.
    pub(crate) fn mark_neighbor_pair(&mut self, a: TriangleId, b: TriangleId) {
        let slots = {
            let ta = self.tri(a);
            let tb = self.tri(b);
            let mut found = None;
            for i in 0..3 {
                let p1 = ta.point((i + 1) % 3);
                let p2 = ta.point((i + 2) % 3);
                if let Some(j) = tb.edge_index(p1, p2) {
                    found = Some((i, j));
                    break;
                }
            }
            found
        };
        match slots {
            Some((i, j)) => {
                self.triangles[a.index()].set_neighbor(i, Some(b));
                self.triangles[b.index()].set_neighbor(j, Some(a));
            }
            None => debug_assert!(false, "triangles do not share an edge"),
        }
    }

    /// Points every front node whose front edge borders `t` at `t`.
    ///
    /// A mesh edge without a neighbor is part of the front; the node
    /// carrying its CW endpoint is the one whose `triangle` must track it.
    pub(crate) fn map_triangle_to_nodes(&mut self, t: TriangleId) {
        for i in 0..3 {
            if self.tri(t).neighbor(i).is_some() {
                continue;
            }
            let cw_point = self.tri(t).point((i + 2) % 3);
            let x = self.point(cw_point).x;
            if let Some(node) = self.front.locate_point(cw_point, x) {
                self.front.node_mut(node).triangle = Some(t);
            }
        }
    }

    /// The extraction pass: flood-fills from `seed`, marking triangles
    /// interior and collecting them, without ever crossing a constrained
    /// edge.
    pub(crate) fn mesh_clean(&mut self, seed: TriangleId) {
        let mut pending: SmallVec<[TriangleId; 16]> = SmallVec::new();
        pending.push(seed);
        while let Some(id) = pending.pop() {
            if self.tri(id).is_interior() {
                continue;
            }
            self.triangles[id.index()].set_interior(true);
            self.interior.push(id);
            let triangle = self.tri(id);
            for i in 0..3 {
                if !triangle.constrained_edge(i) {
                    if let Some(neighbor) = triangle.neighbor(i) {
                        pending.push(neighbor);
                    }
                }
            }
        }
    }
}

fn cast<S: SweepNum>(value: f64) -> S {
    NumCast::from(value).expect("coordinate out of range for the scalar type")
}

#[cfg(test)]
mod test {
    use super::SweepContext;
    use crate::sweep_core::handles::PointId;
    use crate::Point2;
    use approx::assert_relative_eq;

    fn square_context() -> SweepContext<f64> {
        let mut context = SweepContext::new();
        context.add_polyline(&[
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ]);
        context
    }

    #[test]
    fn test_edges_attach_to_upper_endpoint() {
        let context = square_context();
        assert_eq!(context.edges.len(), 4);
        // (0,0)-(1,0): upper endpoint is (1,0) by the x tiebreak.
        assert_eq!(context.edge_list(PointId::new(0)).len(), 0);
        assert_eq!(context.edge_list(PointId::new(1)).len(), 1);
        // (1,1) is upper for (1,0)-(1,1) and, by the x tiebreak, for
        // (1,1)-(0,1); the closing edge (0,1)-(0,0) hangs off (0,1).
        assert_eq!(context.edge_list(PointId::new(2)).len(), 2);
        assert_eq!(context.edge_list(PointId::new(3)).len(), 1);
    }

    #[test]
    fn test_init_sorts_by_y_then_x() {
        let mut context = SweepContext::new();
        context.add_polyline(&[
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
            Point2::new(0.5, 0.0),
        ]);
        context.init_triangulation();
        assert_eq!(context.point_count(), 3);
        assert_eq!(context.sorted_point(0), PointId::new(2));
        assert_eq!(context.sorted_point(1), PointId::new(1));
        assert_eq!(context.sorted_point(2), PointId::new(0));
    }

    #[test]
    fn test_artificial_points_bracket_the_input() {
        let mut context = square_context();
        context.init_triangulation();
        // Two artificial points past the real ones.
        let head = context.point(PointId::new(4));
        let tail = context.point(PointId::new(5));
        assert_relative_eq!(head.x, 1.3);
        assert_relative_eq!(head.y, -0.3);
        assert_relative_eq!(tail.x, -0.3);
        assert_relative_eq!(tail.y, -0.3);
        // They carry no constraint edges and are excluded from the sweep.
        assert_eq!(context.edge_list(PointId::new(4)).len(), 0);
        assert_eq!(context.point_count(), 4);
    }

    #[test]
    fn test_bootstrap_front() {
        let mut context = square_context();
        context.init_triangulation();
        context.create_advancing_front();
        assert_eq!(context.triangle_count(), 1);
        let head = context.front.head();
        let middle = context.front.next_of(head).unwrap();
        let tail = context.front.next_of(middle).unwrap();
        // Left to right: left artificial, bottom-most input, right artificial.
        assert_eq!(context.front.node(head).point, PointId::new(5));
        assert_eq!(context.front.node(middle).point, PointId::new(0));
        assert_eq!(context.front.node(tail).point, PointId::new(4));
        assert!(context.front.node(middle).triangle.is_some());
        assert!(context.front.node(tail).triangle.is_none());
    }
}
