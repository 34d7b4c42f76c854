//! The sweep engine.
//!
//! Points are visited in ascending `(y, x)` order. Each point fires a point
//! event that stitches it onto the advancing front, followed by one edge
//! event per constraint edge ending at that point. Fills and basin fills
//! keep the front convex-ish as it advances; legalization restores the
//! Delaunay property after every mesh change, and flip events force
//! constraint edges through the existing mesh.

use smallvec::SmallVec;

use crate::sweep_core::handles::{EdgeId, NodeId, PointId, TriangleId};
use crate::sweep_core::math::{self, Orientation};
use crate::sweep_core::shape::Triangle;
use crate::sweep_core::sweep_context::SweepContext;
use crate::{Point2, SweepNum, TriangulationError};

/// Upper bound on the depth of legalization cascades and flip recursion.
///
/// Acts as a runaway guard for adversarial input; well formed polygons stay
/// far below it.
const RECURSION_LIMIT: usize = 4096;

impl<S: SweepNum> SweepContext<S> {
    /// Runs the full sweep: initialization, point and edge events in sorted
    /// order, then the interior extraction pass.
    pub(crate) fn triangulate(&mut self) -> Result<(), TriangulationError> {
        self.init_triangulation();
        self.create_advancing_front();
        self.sweep_points()?;
        self.finalize_polygon()
    }

    fn sweep_points(&mut self) -> Result<(), TriangulationError> {
        for i in 1..self.point_count() {
            let point = self.sorted_point(i);
            let node = self.point_event(point)?;
            let edges: SmallVec<[EdgeId; 2]> = self.edge_list(point).clone();
            for edge in edges {
                self.edge_event(edge, node)?;
            }
        }
        Ok(())
    }

    /// Finds the seed triangle for the extraction pass: starting at the
    /// first real front node, pivot CCW around its point until the edge
    /// toward the point is constrained. That triangle lies inside the
    /// outline.
    fn finalize_polygon(&mut self) -> Result<(), TriangulationError> {
        let first = self.node_next(self.front.head())?;
        let point = self.front.node(first).point;
        let mut triangle = self.front.node(first).triangle;
        while let Some(t) = triangle {
            if self.tri(t).constrained_edge_cw(point) {
                break;
            }
            triangle = self.tri(t).neighbor_ccw(point);
        }
        if let Some(t) = triangle {
            self.mesh_clean(t);
        }
        Ok(())
    }

    /// Stitches `point` onto the front: a new triangle against the front
    /// edge below it, a new node, and any fills the new configuration
    /// allows.
    fn point_event(&mut self, point: PointId) -> Result<NodeId, TriangulationError> {
        let x = self.point(point).x;
        let node = self
            .front
            .locate_node(x)
            .ok_or(TriangulationError::NullNode)?;
        let new_node = self.new_front_triangle(point, node)?;

        // Only a +epsilon check is needed: the point can never have a
        // smaller x value than its locate result.
        let px: f64 = x.into();
        let nx: f64 = self.node_pos(node).x.into();
        if px <= nx + math::EPSILON {
            self.fill(node)?;
        }

        self.fill_advancing_front(new_node)?;
        Ok(new_node)
    }

    fn new_front_triangle(
        &mut self,
        point: PointId,
        node: NodeId,
    ) -> Result<NodeId, TriangulationError> {
        let next = self.node_next(node)?;
        let node_point = self.front.node(node).point;
        let next_point = self.front.node(next).point;

        let triangle = self.add_triangle(Triangle::new(point, node_point, next_point));
        let below = self.node_triangle(node)?;
        self.mark_neighbor_pair(triangle, below);

        let new_node = self.front.create_node(point, self.point(point).x);
        self.front.node_mut(new_node).triangle = Some(triangle);
        self.front.insert_after(node, new_node);

        if !self.legalize(0, triangle)? {
            self.map_triangle_to_nodes(triangle);
        }

        Ok(new_node)
    }

    /// Closes the wedge at `node` with the triangle `(prev, node, next)`
    /// and splices `node` out of the front.
    fn fill(&mut self, node: NodeId) -> Result<(), TriangulationError> {
        let prev = self.node_prev(node)?;
        let next = self.node_next(node)?;
        let prev_point = self.front.node(prev).point;
        let node_point = self.front.node(node).point;
        let next_point = self.front.node(next).point;

        let triangle = self.add_triangle(Triangle::new(prev_point, node_point, next_point));
        let left = self.node_triangle(prev)?;
        let right = self.node_triangle(node)?;
        self.mark_neighbor_pair(triangle, left);
        self.mark_neighbor_pair(triangle, right);

        self.front.remove(node);

        if !self.legalize(0, triangle)? {
            self.map_triangle_to_nodes(triangle);
        }
        Ok(())
    }

    /// Greedily closes holes to both sides of the just-inserted node, then
    /// fills a basin to its right if the front dips steeply enough.
    fn fill_advancing_front(&mut self, n: NodeId) -> Result<(), TriangulationError> {
        // Fill right holes
        let mut node = self.front.next_of(n);
        while let Some(current) = node {
            if self.front.next_of(current).is_none() {
                break;
            }
            if self.large_hole_dont_fill(current) {
                break;
            }
            self.fill(current)?;
            node = self.front.next_of(current);
        }

        // Fill left holes
        let mut node = self.front.prev_of(n);
        while let Some(current) = node {
            if self.front.prev_of(current).is_none() {
                break;
            }
            if self.large_hole_dont_fill(current) {
                break;
            }
            self.fill(current)?;
            node = self.front.prev_of(current);
        }

        // Fill right basins
        if let Some(angle) = self.basin_angle(n) {
            if angle < math::PI_3_DIV_4 {
                self.fill_basin(n)?;
            }
        }
        Ok(())
    }

    /// Decides whether the wedge at `node` is too open to fill.
    ///
    /// The wedge is kept when the interior angle at `node` exceeds 90
    /// degrees - unless a one-step lookahead to either side shows a shallow
    /// continuation worth closing. A negative angle (the fill triangle
    /// would be inverted and pierce the front) always keeps the wedge, and
    /// must be checked before any lookahead.
    fn large_hole_dont_fill(&self, node: NodeId) -> bool {
        let (next, prev) = match (self.front.next_of(node), self.front.prev_of(node)) {
            (Some(next), Some(prev)) => (next, prev),
            _ => return true,
        };
        let origin = self.node_pos(node);
        let next_pos = self.node_pos(next);
        let prev_pos = self.node_pos(prev);

        if !math::angle_exceeds_90_degrees(origin, next_pos, prev_pos) {
            return false;
        }
        if math::angle_is_negative(origin, next_pos, prev_pos) {
            return true;
        }

        // Check additional points on the front. Positive-side angles only:
        // the lookahead must stay on the same side as the point being added.
        if let Some(next2) = self.front.next_of(next) {
            let next2_pos = self.node_pos(next2);
            if !math::angle_exceeds_plus_90_degrees_or_is_negative(origin, next2_pos, prev_pos) {
                return false;
            }
        }
        if let Some(prev2) = self.front.prev_of(prev) {
            let prev2_pos = self.node_pos(prev2);
            if !math::angle_exceeds_plus_90_degrees_or_is_negative(origin, next_pos, prev2_pos) {
                return false;
            }
        }
        true
    }

    /// The downward slope of the chord from `node` two steps to the right,
    /// or `None` if the front ends before that.
    fn basin_angle(&self, node: NodeId) -> Option<f64> {
        let next = self.front.next_of(node)?;
        let next2 = self.front.next_of(next)?;
        let a = self.node_pos(node).to_f64();
        let b = self.node_pos(next2).to_f64();
        Some((a.y - b.y).atan2(a.x - b.x))
    }

    /// Detects a basin to the right of `node` and fills it bottom-up.
    fn fill_basin(&mut self, node: NodeId) -> Result<(), TriangulationError> {
        // node
        //    \                     right
        //   left                  /
        //      \    ___          /
        //       \__/   \        /
        //               \______/
        //                 bottom
        let next = self.node_next(node)?;
        let next2 = self.node_next(next)?;
        let left = if math::orient2d(
            self.node_pos(node),
            self.node_pos(next),
            self.node_pos(next2),
        ) == Orientation::Ccw
        {
            next2
        } else {
            next
        };

        // Descend to the bottom, then climb to the right rim.
        let mut bottom = left;
        while let Some(next) = self.front.next_of(bottom) {
            if self.node_pos(bottom).y >= self.node_pos(next).y {
                bottom = next;
            } else {
                break;
            }
        }
        if bottom == left {
            return Ok(());
        }

        let mut right = bottom;
        while let Some(next) = self.front.next_of(right) {
            if self.node_pos(right).y < self.node_pos(next).y {
                right = next;
            } else {
                break;
            }
        }
        if right == bottom {
            return Ok(());
        }

        let right_x: f64 = self.node_pos(right).x.into();
        let left_x: f64 = self.node_pos(left).x.into();
        self.basin.left_node = Some(left);
        self.basin.bottom_node = Some(bottom);
        self.basin.right_node = Some(right);
        self.basin.width = right_x - left_x;
        self.basin.left_highest = self.node_pos(left).y > self.node_pos(right).y;

        self.fill_basin_req(bottom)
    }

    /// Fills the basin bottom-up until it becomes wider than it is deep.
    fn fill_basin_req(&mut self, node: NodeId) -> Result<(), TriangulationError> {
        let mut node = node;
        loop {
            if self.is_shallow(node) {
                return Ok(());
            }
            self.fill(node)?;

            // The filled node keeps its historic links; walk out of it.
            let prev = self.front.prev_of(node);
            let next = self.front.next_of(node);
            if prev == self.basin.left_node && next == self.basin.right_node {
                return Ok(());
            } else if prev == self.basin.left_node {
                let next = next.ok_or(TriangulationError::NullNode)?;
                let next2 = self.node_next(next)?;
                if math::orient2d(
                    self.node_pos(node),
                    self.node_pos(next),
                    self.node_pos(next2),
                ) == Orientation::Cw
                {
                    return Ok(());
                }
                node = next;
            } else if next == self.basin.right_node {
                let prev = prev.ok_or(TriangulationError::NullNode)?;
                let prev2 = self.node_prev(prev)?;
                if math::orient2d(
                    self.node_pos(node),
                    self.node_pos(prev),
                    self.node_pos(prev2),
                ) == Orientation::Ccw
                {
                    return Ok(());
                }
                node = prev;
            } else {
                // Continue with the neighbor node with lowest y value.
                let prev = prev.ok_or(TriangulationError::NullNode)?;
                let next = next.ok_or(TriangulationError::NullNode)?;
                node = if self.node_pos(prev).y < self.node_pos(next).y {
                    prev
                } else {
                    next
                };
            }
        }
    }

    fn is_shallow(&self, node: NodeId) -> bool {
        let reference = if self.basin.left_highest {
            self.basin.left_node
        } else {
            self.basin.right_node
        };
        let reference = match reference {
            Some(reference) => reference,
            None => {
                debug_assert!(false, "basin scratch is not initialized");
                return true;
            }
        };
        let reference_y: f64 = self.node_pos(reference).y.into();
        let node_y: f64 = self.node_pos(node).y.into();
        self.basin.width > reference_y - node_y
    }

    /// Inserts the constraint `edge` ending at the point of `node`.
    fn edge_event(&mut self, edge: EdgeId, node: NodeId) -> Result<(), TriangulationError> {
        let ep = self.edges[edge.index()].p;
        let eq = self.edges[edge.index()].q;
        self.edge_event.constrained_edge = Some(edge);
        self.edge_event.right = self.point(ep).x > self.point(eq).x;

        let triangle = self.node_triangle(node)?;
        if self.is_edge_side_of_triangle(triangle, ep, eq) {
            return Ok(());
        }

        // Fill everything above the edge first, then force the edge through
        // the interior. Doing all the filling up front avoids configurations
        // that need both flips and fills at once.
        self.fill_edge_event(edge, node)?;
        let triangle = self.node_triangle(node)?;
        self.interior_edge_event(0, ep, eq, triangle, eq)
    }

    /// If `(ep, eq)` coincides with an edge of `triangle`, marks both sides
    /// constrained.
    fn is_edge_side_of_triangle(&mut self, triangle: TriangleId, ep: PointId, eq: PointId) -> bool {
        if let Some(i) = self.tri(triangle).edge_index(ep, eq) {
            self.tri_mut(triangle).set_constrained_edge(i, true);
            if let Some(neighbor) = self.tri(triangle).neighbor(i) {
                self.tri_mut(neighbor).mark_constrained_edge(ep, eq);
            }
            true
        } else {
            false
        }
    }

    /// Walks the constraint through the triangles it crosses, starting from
    /// the pivot `p` (initially `eq`).
    ///
    /// Each iteration either terminates (edge found), splits the constraint
    /// at an exactly collinear vertex, rotates to a neighbor that actually
    /// crosses the constraint, or hands over to the flip machinery.
    fn interior_edge_event(
        &mut self,
        depth: usize,
        ep: PointId,
        mut eq: PointId,
        triangle: TriangleId,
        mut p: PointId,
    ) -> Result<(), TriangulationError> {
        self.check_depth(depth)?;
        let mut triangle = triangle;
        let mut guard = self.scan_guard();
        loop {
            if self.is_edge_side_of_triangle(triangle, ep, eq) {
                return Ok(());
            }

            let p1 = self
                .tri(triangle)
                .point_ccw(p)
                .ok_or(TriangulationError::DegenerateTriangle)?;
            let o1 = math::orient2d(self.point(eq), self.point(p1), self.point(ep));
            if o1 == Orientation::Collinear {
                if let Some(i) = self.tri(triangle).edge_index(eq, p1) {
                    self.tri_mut(triangle).set_constrained_edge(i, true);
                    // The constraint runs through p1; shorten it and carry
                    // on with the lower part.
                    let edge = self
                        .edge_event
                        .constrained_edge
                        .expect("edge event scratch is set during edge events");
                    self.edges[edge.index()].q = p1;
                    triangle = self
                        .tri(triangle)
                        .neighbor_across(p)
                        .ok_or(TriangulationError::NullTriangle)?;
                    eq = p1;
                    p = p1;
                    continue;
                }
                return Err(TriangulationError::CollinearPoints);
            }

            let p2 = self
                .tri(triangle)
                .point_cw(p)
                .ok_or(TriangulationError::DegenerateTriangle)?;
            let o2 = math::orient2d(self.point(eq), self.point(p2), self.point(ep));
            if o2 == Orientation::Collinear {
                if let Some(i) = self.tri(triangle).edge_index(eq, p2) {
                    self.tri_mut(triangle).set_constrained_edge(i, true);
                    let edge = self
                        .edge_event
                        .constrained_edge
                        .expect("edge event scratch is set during edge events");
                    self.edges[edge.index()].q = p2;
                    triangle = self
                        .tri(triangle)
                        .neighbor_across(p)
                        .ok_or(TriangulationError::NullTriangle)?;
                    eq = p2;
                    p = p2;
                    continue;
                }
                return Err(TriangulationError::CollinearPoints);
            }

            if o1 == o2 {
                // Both endpoints of the far edge lie on the same side: the
                // constraint leaves through a side edge. Rotate toward it.
                triangle = if o1 == Orientation::Cw {
                    self.tri(triangle).neighbor_ccw(p)
                } else {
                    self.tri(triangle).neighbor_cw(p)
                }
                .ok_or(TriangulationError::NullTriangle)?;
            } else {
                // This triangle crosses the constraint; start flipping.
                return self.flip_edge_event(depth + 1, ep, eq, triangle, p);
            }

            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
    }

    /// Rotates the diagonal of the quadrilateral formed by `t` and its
    /// neighbor across `p` until the constraint `(ep, eq)` stops being
    /// crossed, legalizing the freed triangles as it goes.
    fn flip_edge_event(
        &mut self,
        depth: usize,
        ep: PointId,
        eq: PointId,
        t: TriangleId,
        p: PointId,
    ) -> Result<(), TriangulationError> {
        self.check_depth(depth)?;
        let mut t = t;
        let mut guard = self.scan_guard();
        loop {
            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
            let ot = self
                .tri(t)
                .neighbor_across(p)
                .ok_or(TriangulationError::NullTriangle)?;
            let op = self
                .tri(ot)
                .opposite_point(self.tri(t), p)
                .ok_or(TriangulationError::DegenerateTriangle)?;
            let p_ccw = self
                .tri(t)
                .point_ccw(p)
                .ok_or(TriangulationError::DegenerateTriangle)?;
            let p_cw = self
                .tri(t)
                .point_cw(p)
                .ok_or(TriangulationError::DegenerateTriangle)?;

            if math::in_scan_area(
                self.point(p),
                self.point(p_ccw),
                self.point(p_cw),
                self.point(op),
            ) {
                self.rotate_triangle_pair(t, p, ot, op);
                self.map_triangle_to_nodes(t);
                self.map_triangle_to_nodes(ot);

                if p == eq && op == ep {
                    let edge = self
                        .edge_event
                        .constrained_edge
                        .expect("edge event scratch is set during edge events");
                    if eq == self.edges[edge.index()].q && ep == self.edges[edge.index()].p {
                        self.tri_mut(t).mark_constrained_edge(ep, eq);
                        self.tri_mut(ot).mark_constrained_edge(ep, eq);
                        self.legalize(depth + 1, t)?;
                        self.legalize(depth + 1, ot)?;
                    }
                    // A flipped edge matching a partially split constraint
                    // in the opposite order needs no marking here; the
                    // ongoing edge event re-establishes it.
                    return Ok(());
                }

                let o = math::orient2d(self.point(eq), self.point(op), self.point(ep));
                t = self.next_flip_triangle(depth, o, t, ot, p, op)?;
            } else {
                let new_p = self.next_flip_point(ep, eq, ot, op)?;
                self.flip_scan_edge_event(depth + 1, ep, eq, t, ot, new_p)?;
                return self.interior_edge_event(depth + 1, ep, eq, t, p);
            }
        }
    }

    /// After a flip, picks the triangle of the pair that still crosses the
    /// constraint; the other one is legalized and released.
    ///
    /// A collinear orientation means the opposite point lies exactly on the
    /// constraint line - the same degenerate configuration
    /// `next_flip_point` rejects.
    fn next_flip_triangle(
        &mut self,
        depth: usize,
        o: Orientation,
        t: TriangleId,
        ot: TriangleId,
        p: PointId,
        op: PointId,
    ) -> Result<TriangleId, TriangulationError> {
        match o {
            Orientation::Ccw => {
                // ot is not crossing the constraint after the flip.
                let i = self
                    .tri(ot)
                    .edge_index(p, op)
                    .ok_or(TriangulationError::DegenerateTriangle)?;
                self.tri_mut(ot).set_delaunay_edge(i, true);
                self.legalize(depth + 1, ot)?;
                self.tri_mut(ot).clear_delaunay_edges();
                Ok(t)
            }
            Orientation::Cw => {
                // t is not crossing the constraint after the flip.
                let i = self
                    .tri(t)
                    .edge_index(p, op)
                    .ok_or(TriangulationError::DegenerateTriangle)?;
                self.tri_mut(t).set_delaunay_edge(i, true);
                self.legalize(depth + 1, t)?;
                self.tri_mut(t).clear_delaunay_edges();
                Ok(ot)
            }
            Orientation::Collinear => Err(TriangulationError::CollinearPoints),
        }
    }

    /// The vertex of `ot` on the side of `(eq, ep)` that the scan should
    /// proceed through.
    fn next_flip_point(
        &self,
        ep: PointId,
        eq: PointId,
        ot: TriangleId,
        op: PointId,
    ) -> Result<PointId, TriangulationError> {
        match math::orient2d(self.point(eq), self.point(op), self.point(ep)) {
            Orientation::Cw => self
                .tri(ot)
                .point_ccw(op)
                .ok_or(TriangulationError::DegenerateTriangle),
            Orientation::Ccw => self
                .tri(ot)
                .point_cw(op)
                .ok_or(TriangulationError::DegenerateTriangle),
            // The opposite point sits exactly on the constrained edge.
            Orientation::Collinear => Err(TriangulationError::CollinearPoints),
        }
    }

    /// Walks past non-convex quadrilaterals until a flippable triangle is
    /// found, then flips it and lets the edge event machinery resume.
    fn flip_scan_edge_event(
        &mut self,
        depth: usize,
        ep: PointId,
        eq: PointId,
        flip_triangle: TriangleId,
        t: TriangleId,
        p: PointId,
    ) -> Result<(), TriangulationError> {
        self.check_depth(depth)?;
        let mut t = t;
        let mut p = p;
        let mut guard = self.scan_guard();
        loop {
            let ot = self
                .tri(t)
                .neighbor_across(p)
                .ok_or(TriangulationError::NullTriangle)?;
            let op = self
                .tri(ot)
                .opposite_point(self.tri(t), p)
                .ok_or(TriangulationError::DegenerateTriangle)?;
            let p1 = self
                .tri(flip_triangle)
                .point_ccw(eq)
                .ok_or(TriangulationError::DegenerateTriangle)?;
            let p2 = self
                .tri(flip_triangle)
                .point_cw(eq)
                .ok_or(TriangulationError::DegenerateTriangle)?;

            if math::in_scan_area(
                self.point(eq),
                self.point(p1),
                self.point(p2),
                self.point(op),
            ) {
                // Flip with the new edge op -> eq.
                return self.flip_edge_event(depth + 1, eq, op, ot, op);
            }
            p = self.next_flip_point(ep, eq, ot, op)?;
            t = ot;

            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
    }

    fn fill_edge_event(&mut self, edge: EdgeId, node: NodeId) -> Result<(), TriangulationError> {
        if self.edge_event.right {
            self.fill_right_above_edge_event(edge, node)
        } else {
            self.fill_left_above_edge_event(edge, node)
        }
    }

    fn fill_right_above_edge_event(
        &mut self,
        edge: EdgeId,
        node: NodeId,
    ) -> Result<(), TriangulationError> {
        let ep = self.edges[edge.index()].p;
        let eq = self.edges[edge.index()].q;
        let mut node = node;
        let mut guard = self.scan_guard();
        loop {
            let next = self.node_next(node)?;
            if !(self.node_pos(next).x < self.point(ep).x) {
                break;
            }
            // Is the next node below the constraint?
            if math::orient2d(self.point(eq), self.node_pos(next), self.point(ep))
                == Orientation::Ccw
            {
                self.fill_right_below_edge_event(edge, node)?;
            } else {
                node = next;
            }
            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
        Ok(())
    }

    fn fill_right_below_edge_event(
        &mut self,
        edge: EdgeId,
        node: NodeId,
    ) -> Result<(), TriangulationError> {
        let ep = self.edges[edge.index()].p;
        let mut guard = self.scan_guard();
        while self.node_pos(node).x < self.point(ep).x {
            let next = self.node_next(node)?;
            let next2 = self.node_next(next)?;
            if math::orient2d(
                self.node_pos(node),
                self.node_pos(next),
                self.node_pos(next2),
            ) == Orientation::Ccw
            {
                // Concave
                return self.fill_right_concave_edge_event(edge, node);
            }
            // Convex
            self.fill_right_convex_edge_event(edge, node)?;
            // Retry this node with the updated front.
            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
        Ok(())
    }

    fn fill_right_concave_edge_event(
        &mut self,
        edge: EdgeId,
        node: NodeId,
    ) -> Result<(), TriangulationError> {
        let ep = self.edges[edge.index()].p;
        let eq = self.edges[edge.index()].q;
        let mut guard = self.scan_guard();
        loop {
            let next = self.node_next(node)?;
            self.fill(next)?;
            let next = self.node_next(node)?;
            if self.front.node(next).point == ep {
                break;
            }
            // Below the constraint?
            if math::orient2d(self.point(eq), self.node_pos(next), self.point(ep))
                != Orientation::Ccw
            {
                break;
            }
            // Still concave?
            let next2 = self.node_next(next)?;
            if math::orient2d(
                self.node_pos(node),
                self.node_pos(next),
                self.node_pos(next2),
            ) != Orientation::Ccw
            {
                break;
            }
            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
        Ok(())
    }

    fn fill_right_convex_edge_event(
        &mut self,
        edge: EdgeId,
        node: NodeId,
    ) -> Result<(), TriangulationError> {
        let ep = self.edges[edge.index()].p;
        let eq = self.edges[edge.index()].q;
        let mut node = node;
        let mut guard = self.scan_guard();
        loop {
            let next = self.node_next(node)?;
            let next2 = self.node_next(next)?;
            let next3 = self.node_next(next2)?;
            // Is the next wedge concave or convex?
            if math::orient2d(
                self.node_pos(next),
                self.node_pos(next2),
                self.node_pos(next3),
            ) == Orientation::Ccw
            {
                // Concave
                return self.fill_right_concave_edge_event(edge, next);
            }
            // Convex. Above or below the constraint?
            if math::orient2d(self.point(eq), self.node_pos(next2), self.point(ep))
                == Orientation::Ccw
            {
                // Below
                node = next;
            } else {
                // Above
                return Ok(());
            }
            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
    }

    fn fill_left_above_edge_event(
        &mut self,
        edge: EdgeId,
        node: NodeId,
    ) -> Result<(), TriangulationError> {
        let ep = self.edges[edge.index()].p;
        let eq = self.edges[edge.index()].q;
        let mut node = node;
        let mut guard = self.scan_guard();
        loop {
            let prev = self.node_prev(node)?;
            if !(self.node_pos(prev).x > self.point(ep).x) {
                break;
            }
            // Is the previous node below the constraint?
            if math::orient2d(self.point(eq), self.node_pos(prev), self.point(ep))
                == Orientation::Cw
            {
                self.fill_left_below_edge_event(edge, node)?;
            } else {
                node = prev;
            }
            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
        Ok(())
    }

    fn fill_left_below_edge_event(
        &mut self,
        edge: EdgeId,
        node: NodeId,
    ) -> Result<(), TriangulationError> {
        let ep = self.edges[edge.index()].p;
        let mut guard = self.scan_guard();
        while self.node_pos(node).x > self.point(ep).x {
            let prev = self.node_prev(node)?;
            let prev2 = self.node_prev(prev)?;
            if math::orient2d(
                self.node_pos(node),
                self.node_pos(prev),
                self.node_pos(prev2),
            ) == Orientation::Cw
            {
                // Concave
                return self.fill_left_concave_edge_event(edge, node);
            }
            // Convex
            self.fill_left_convex_edge_event(edge, node)?;
            // Retry this node with the updated front.
            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
        Ok(())
    }

    fn fill_left_concave_edge_event(
        &mut self,
        edge: EdgeId,
        node: NodeId,
    ) -> Result<(), TriangulationError> {
        let ep = self.edges[edge.index()].p;
        let eq = self.edges[edge.index()].q;
        let mut guard = self.scan_guard();
        loop {
            let prev = self.node_prev(node)?;
            self.fill(prev)?;
            let prev = self.node_prev(node)?;
            if self.front.node(prev).point == ep {
                break;
            }
            // Below the constraint?
            if math::orient2d(self.point(eq), self.node_pos(prev), self.point(ep))
                != Orientation::Cw
            {
                break;
            }
            // Still concave?
            let prev2 = self.node_prev(prev)?;
            if math::orient2d(
                self.node_pos(node),
                self.node_pos(prev),
                self.node_pos(prev2),
            ) != Orientation::Cw
            {
                break;
            }
            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
        Ok(())
    }

    fn fill_left_convex_edge_event(
        &mut self,
        edge: EdgeId,
        node: NodeId,
    ) -> Result<(), TriangulationError> {
        let ep = self.edges[edge.index()].p;
        let eq = self.edges[edge.index()].q;
        let mut node = node;
        let mut guard = self.scan_guard();
        loop {
            let prev = self.node_prev(node)?;
            let prev2 = self.node_prev(prev)?;
            let prev3 = self.node_prev(prev2)?;
            // Is the next wedge concave or convex?
            if math::orient2d(
                self.node_pos(prev),
                self.node_pos(prev2),
                self.node_pos(prev3),
            ) == Orientation::Cw
            {
                // Concave
                return self.fill_left_concave_edge_event(edge, prev);
            }
            // Convex. Above or below the constraint?
            if math::orient2d(self.point(eq), self.node_pos(prev2), self.point(ep))
                == Orientation::Cw
            {
                // Below
                node = prev;
            } else {
                // Above
                return Ok(());
            }
            guard -= 1;
            if guard == 0 {
                return Err(TriangulationError::RecursionLimit);
            }
        }
    }

    /// Restores the local Delaunay property around `t` by recursive edge
    /// flips.
    ///
    /// Constrained edges and edges already marked delaunay are skipped; the
    /// marks set on a flipped edge keep the recursion from revisiting it
    /// and are cleared once both sides have settled. Returns `true` if any
    /// flip happened - the caller then skips its own triangle-to-node
    /// mapping because the recursion already mapped the final triangles.
    fn legalize(&mut self, depth: usize, t: TriangleId) -> Result<bool, TriangulationError> {
        self.check_depth(depth)?;
        for i in 0..3 {
            if self.tri(t).delaunay_edge(i) {
                continue;
            }
            let ot = match self.tri(t).neighbor(i) {
                Some(ot) => ot,
                None => continue,
            };

            let p = self.tri(t).point(i);
            let op = self
                .tri(ot)
                .opposite_point(self.tri(t), p)
                .ok_or(TriangulationError::DegenerateTriangle)?;
            let oi = self
                .tri(ot)
                .index_of(op)
                .ok_or(TriangulationError::DegenerateTriangle)?;

            // Constrained edges are never flipped; delaunay-marked edges
            // are already settled by an outer recursion level. Either way
            // the constrained flag is carried over.
            if self.tri(ot).constrained_edge(oi) || self.tri(ot).delaunay_edge(oi) {
                let constrained = self.tri(ot).constrained_edge(oi);
                self.tri_mut(t).set_constrained_edge(i, constrained);
                continue;
            }

            let p_ccw = self
                .tri(t)
                .point_ccw(p)
                .ok_or(TriangulationError::DegenerateTriangle)?;
            let p_cw = self
                .tri(t)
                .point_cw(p)
                .ok_or(TriangulationError::DegenerateTriangle)?;
            let inside = math::in_circle(
                self.point(p),
                self.point(p_ccw),
                self.point(p_cw),
                self.point(op),
            );
            if !inside {
                continue;
            }

            self.tri_mut(t).set_delaunay_edge(i, true);
            self.tri_mut(ot).set_delaunay_edge(oi, true);

            // Rotate the shared edge one vertex CW to legalize it. The
            // rotation moves the marks set above onto the new shared edge.
            self.rotate_triangle_pair(t, p, ot, op);

            // The flip exposes four edges to re-check; make sure the
            // triangle-to-node mapping runs exactly once per triangle.
            if !self.legalize(depth + 1, t)? {
                self.map_triangle_to_nodes(t);
            }
            if !self.legalize(depth + 1, ot)? {
                self.map_triangle_to_nodes(ot);
            }

            // The delaunay marks only protect the shared edge until both
            // sides have settled.
            self.tri_mut(t).set_delaunay_edge(i, false);
            self.tri_mut(ot).set_delaunay_edge(oi, false);

            // The recursion handled the remaining edges.
            return Ok(true);
        }
        Ok(false)
    }

    /// The two-triangle edge flip.
    ///
    /// The four outer neighbors and their constrained/delaunay flags are
    /// captured before the in-place re-vertexing and rewired afterwards,
    /// swapped across the flip axis.
    fn rotate_triangle_pair(&mut self, t: TriangleId, p: PointId, ot: TriangleId, op: PointId) {
        //      p                    p
        //     / | \                / \
        //   n1  |  n2            n1   n2
        //   /   |   \            /     \
        //  / t  | ot \    =>    /   t   \
        // x     |     op       x ------- op
        //  \    |    /          \   ot  /
        //   n3  |  n4            n3   n4
        //     \ | /                \ /
        //      cw                  cw
        let (n1, n2, n3, n4) = {
            let tt = self.tri(t);
            let to = self.tri(ot);
            (
                tt.neighbor_ccw(p),
                tt.neighbor_cw(p),
                to.neighbor_ccw(op),
                to.neighbor_cw(op),
            )
        };
        let (ce1, ce2, ce3, ce4) = {
            let tt = self.tri(t);
            let to = self.tri(ot);
            (
                tt.constrained_edge_ccw(p),
                tt.constrained_edge_cw(p),
                to.constrained_edge_ccw(op),
                to.constrained_edge_cw(op),
            )
        };
        let (de1, de2, de3, de4) = {
            let tt = self.tri(t);
            let to = self.tri(ot);
            (
                tt.delaunay_edge_ccw(p),
                tt.delaunay_edge_cw(p),
                to.delaunay_edge_ccw(op),
                to.delaunay_edge_cw(op),
            )
        };

        self.tri_mut(t).rotate_cw_about(p, op);
        self.tri_mut(ot).rotate_cw_about(op, p);

        {
            let to = self.tri_mut(ot);
            to.set_delaunay_edge_ccw(p, de1);
            to.set_delaunay_edge_cw(op, de4);
            to.set_constrained_edge_ccw(p, ce1);
            to.set_constrained_edge_cw(op, ce4);
        }
        {
            let tt = self.tri_mut(t);
            tt.set_delaunay_edge_cw(p, de2);
            tt.set_delaunay_edge_ccw(op, de3);
            tt.set_constrained_edge_cw(p, ce2);
            tt.set_constrained_edge_ccw(op, ce3);
        }

        self.tri_mut(t).clear_neighbors();
        self.tri_mut(ot).clear_neighbors();
        if let Some(n1) = n1 {
            self.mark_neighbor_pair(ot, n1);
        }
        if let Some(n2) = n2 {
            self.mark_neighbor_pair(t, n2);
        }
        if let Some(n3) = n3 {
            self.mark_neighbor_pair(t, n3);
        }
        if let Some(n4) = n4 {
            self.mark_neighbor_pair(ot, n4);
        }
        self.mark_neighbor_pair(t, ot);
    }

    fn check_depth(&self, depth: usize) -> Result<(), TriangulationError> {
        if depth > RECURSION_LIMIT {
            Err(TriangulationError::RecursionLimit)
        } else {
            Ok(())
        }
    }

    /// Iteration bound for the front scan loops, proportional to the mesh
    /// size.
    fn scan_guard(&self) -> usize {
        3 * self.triangle_count() + 64
    }

    fn node_pos(&self, node: NodeId) -> Point2<S> {
        self.point(self.front.node(node).point)
    }

    fn node_next(&self, node: NodeId) -> Result<NodeId, TriangulationError> {
        self.front.next_of(node).ok_or(TriangulationError::NullNode)
    }

    fn node_prev(&self, node: NodeId) -> Result<NodeId, TriangulationError> {
        self.front.prev_of(node).ok_or(TriangulationError::NullNode)
    }

    fn node_triangle(&self, node: NodeId) -> Result<TriangleId, TriangulationError> {
        self.front
            .node(node)
            .triangle
            .ok_or(TriangulationError::NullTriangle)
    }
}

#[cfg(test)]
mod test {
    use crate::sweep_core::math::Orientation;
    use crate::sweep_core::shape::Triangle;
    use crate::sweep_core::sweep_context::SweepContext;
    use crate::{Point2, TriangulationError};

    #[test]
    fn test_rotate_triangle_pair() {
        let mut context = SweepContext::<f64>::new();
        let a = context.add_point(Point2::new(0.0, 0.0));
        let b = context.add_point(Point2::new(1.0, 0.0));
        let c = context.add_point(Point2::new(1.0, 1.0));
        let d = context.add_point(Point2::new(0.0, 1.0));

        let t = context.add_triangle(Triangle::new(a, b, d));
        let ot = context.add_triangle(Triangle::new(b, c, d));
        context.mark_neighbor_pair(t, ot);
        assert_eq!(context.tri(t).neighbor_across(a), Some(ot));

        context.rotate_triangle_pair(t, a, ot, c);

        // The shared diagonal is now (a, c).
        assert_eq!(context.tri(t).points(), [d, a, c]);
        assert_eq!(context.tri(ot).points(), [a, b, c]);
        assert_eq!(context.tri(t).neighbor_across(d), Some(ot));
        assert_eq!(context.tri(ot).neighbor_across(b), Some(t));
        for i in 0..3 {
            assert!(!context.tri(t).constrained_edge(i));
            assert!(!context.tri(ot).constrained_edge(i));
        }
    }

    #[test]
    fn test_rotate_triangle_pair_carries_flags() {
        let mut context = SweepContext::<f64>::new();
        let a = context.add_point(Point2::new(0.0, 0.0));
        let b = context.add_point(Point2::new(1.0, 0.0));
        let c = context.add_point(Point2::new(1.0, 1.0));
        let d = context.add_point(Point2::new(0.0, 1.0));

        let t = context.add_triangle(Triangle::new(a, b, d));
        let ot = context.add_triangle(Triangle::new(b, c, d));
        context.mark_neighbor_pair(t, ot);
        // Constrain the outer edge (a, b) and check it survives the flip.
        context.tri_mut(t).mark_constrained_edge(a, b);

        context.rotate_triangle_pair(t, a, ot, c);

        let i = context.tri(ot).edge_index(a, b).unwrap();
        assert!(context.tri(ot).constrained_edge(i));
        let j = context.tri(t).edge_index(a, d).unwrap();
        assert!(!context.tri(t).constrained_edge(j));
    }

    #[test]
    fn test_next_flip_triangle_picks_the_crossing_side() {
        let mut context = SweepContext::<f64>::new();
        let a = context.add_point(Point2::new(0.0, 0.0));
        let b = context.add_point(Point2::new(1.0, 0.0));
        let c = context.add_point(Point2::new(1.0, 1.0));
        let d = context.add_point(Point2::new(0.0, 1.0));

        // A freshly flipped pair sharing the diagonal (a, c).
        let t = context.add_triangle(Triangle::new(d, a, c));
        let ot = context.add_triangle(Triangle::new(a, b, c));
        context.mark_neighbor_pair(t, ot);

        let next = context
            .next_flip_triangle(0, Orientation::Ccw, t, ot, a, c)
            .unwrap();
        assert_eq!(next, t);
        // The released triangle has its scratch marks cleared again.
        for i in 0..3 {
            assert!(!context.tri(ot).delaunay_edge(i));
        }

        let next = context
            .next_flip_triangle(0, Orientation::Cw, t, ot, a, c)
            .unwrap();
        assert_eq!(next, ot);
    }

    #[test]
    fn test_next_flip_triangle_rejects_collinear() {
        let mut context = SweepContext::<f64>::new();
        let a = context.add_point(Point2::new(0.0, 0.0));
        let b = context.add_point(Point2::new(1.0, 0.0));
        let c = context.add_point(Point2::new(1.0, 1.0));
        let d = context.add_point(Point2::new(0.0, 1.0));

        let t = context.add_triangle(Triangle::new(d, a, c));
        let ot = context.add_triangle(Triangle::new(a, b, c));
        context.mark_neighbor_pair(t, ot);

        assert_eq!(
            context.next_flip_triangle(0, Orientation::Collinear, t, ot, a, c),
            Err(TriangulationError::CollinearPoints)
        );
    }

    #[test]
    fn test_next_flip_point() {
        let mut context = SweepContext::<f64>::new();
        let a = context.add_point(Point2::new(0.0, 0.0));
        let b = context.add_point(Point2::new(2.0, 0.0));
        let c = context.add_point(Point2::new(1.5, 1.0));
        let eq = context.add_point(Point2::new(1.0, 3.0));
        let ep = context.add_point(Point2::new(1.0, -3.0));
        let on_line = context.add_point(Point2::new(1.0, 0.5));

        let ot = context.add_triangle(Triangle::new(a, b, c));
        // c lies right of the downward constraint (eq -> ep): scan CCW.
        assert_eq!(context.next_flip_point(ep, eq, ot, c), Ok(a));

        let degenerate = context.add_triangle(Triangle::new(a, b, on_line));
        assert_eq!(
            context.next_flip_point(ep, eq, degenerate, on_line),
            Err(TriangulationError::CollinearPoints)
        );
    }
}
