use crate::sweep_core::handles::{NodeId, PointId, TriangleId};
use crate::SweepNum;

/// A node of the advancing front.
///
/// `triangle` is the mesh triangle behind the front edge leaving `point` to
/// the right; it is kept current by the registry's triangle-to-node mapping.
///
/// Nodes are stored in an arena and only ever unlinked, never destroyed. An
/// unlinked node keeps its last `prev`/`next` values - the fill heuristics
/// walk out of a just-removed node through exactly these links.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Node<S> {
    pub point: PointId,
    pub x: S,
    pub triangle: Option<TriangleId>,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
}

/// The advancing front: an x-ordered doubly linked chain of nodes above the
/// sweep line, bracketed by two sentinel nodes carrying the artificial
/// bootstrap points.
///
/// Locate queries start from the node returned by the previous query (a
/// last-used hint, sub-linear amortised for the coherent access pattern of
/// the sweep) and walk the chain.
pub(crate) struct AdvancingFront<S> {
    nodes: Vec<Node<S>>,
    head: NodeId,
    tail: NodeId,
    search_node: NodeId,
}

impl<S: SweepNum> AdvancingFront<S> {
    /// A placeholder front; replaced when the bootstrap triangle is built.
    pub(crate) fn empty() -> Self {
        AdvancingFront {
            nodes: Vec::new(),
            head: NodeId::new(0),
            tail: NodeId::new(0),
            search_node: NodeId::new(0),
        }
    }

    /// Builds the three-node bootstrap front `head - middle - tail`.
    ///
    /// `head` and `tail` carry the artificial points bracketing the input's
    /// x range; `middle` carries the bottom-most input point. `triangle` is
    /// the bootstrap triangle spanning all three.
    pub(crate) fn new(
        head: (PointId, S),
        middle: (PointId, S),
        tail: (PointId, S),
        triangle: TriangleId,
    ) -> Self {
        let head_id = NodeId::new(0);
        let middle_id = NodeId::new(1);
        let tail_id = NodeId::new(2);
        let nodes = vec![
            Node {
                point: head.0,
                x: head.1,
                triangle: Some(triangle),
                prev: None,
                next: Some(middle_id),
            },
            Node {
                point: middle.0,
                x: middle.1,
                triangle: Some(triangle),
                prev: Some(head_id),
                next: Some(tail_id),
            },
            Node {
                point: tail.0,
                x: tail.1,
                triangle: None,
                prev: Some(middle_id),
                next: None,
            },
        ];
        AdvancingFront {
            nodes,
            head: head_id,
            tail: tail_id,
            search_node: head_id,
        }
    }

    pub(crate) fn head(&self) -> NodeId {
        self.head
    }

    #[cfg(test)]
    pub(crate) fn tail(&self) -> NodeId {
        self.tail
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<S> {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<S> {
        &mut self.nodes[id.index()]
    }

    pub(crate) fn next_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].next
    }

    pub(crate) fn prev_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].prev
    }

    /// Creates an unlinked node; `insert_after` splices it into the chain.
    pub(crate) fn create_node(&mut self, point: PointId, x: S) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node {
            point,
            x,
            triangle: None,
            prev: None,
            next: None,
        });
        id
    }

    /// Splices `new` between `node` and its successor.
    pub(crate) fn insert_after(&mut self, node: NodeId, new: NodeId) {
        let next = self.nodes[node.index()].next;
        self.nodes[new.index()].prev = Some(node);
        self.nodes[new.index()].next = next;
        if let Some(next) = next {
            self.nodes[next.index()].prev = Some(new);
        }
        self.nodes[node.index()].next = Some(new);
    }

    /// Unlinks `node` from the chain.
    ///
    /// The removed node's own links stay untouched (callers walk out of
    /// removed nodes), but the search hint is repaired so a locate never
    /// starts from an unlinked node.
    pub(crate) fn remove(&mut self, node: NodeId) {
        let Node { prev, next, .. } = self.nodes[node.index()];
        if let Some(prev) = prev {
            self.nodes[prev.index()].next = next;
        }
        if let Some(next) = next {
            self.nodes[next.index()].prev = prev;
        }
        if self.search_node == node {
            self.search_node = prev.unwrap_or(self.head);
        }
    }

    /// Finds the node `n` with `n.x <= x < n.next.x`.
    ///
    /// Returns `None` when `x` lies outside the front's span, which means
    /// the queried point escaped the bootstrap region.
    pub(crate) fn locate_node(&mut self, x: S) -> Option<NodeId> {
        let mut node = self.search_node;
        if x < self.nodes[node.index()].x {
            while let Some(prev) = self.nodes[node.index()].prev {
                node = prev;
                if x >= self.nodes[node.index()].x {
                    self.search_node = node;
                    return Some(node);
                }
            }
            None
        } else {
            while let Some(next) = self.nodes[node.index()].next {
                if x < self.nodes[next.index()].x {
                    self.search_node = node;
                    return Some(node);
                }
                node = next;
            }
            None
        }
    }

    /// Finds the chain node carrying `point`, using its x value to steer
    /// the walk from the search hint.
    pub(crate) fn locate_point(&mut self, point: PointId, x: S) -> Option<NodeId> {
        let mut node = self.search_node;
        let nx = self.nodes[node.index()].x;
        if x == nx {
            if self.nodes[node.index()].point != point {
                // The chain can briefly hold two nodes with the same x
                // value; the wanted one is then a direct neighbor.
                if self.prev_point(node) == Some(point) {
                    node = self.nodes[node.index()].prev?;
                } else if self.next_point(node) == Some(point) {
                    node = self.nodes[node.index()].next?;
                } else {
                    return None;
                }
            }
        } else if x < nx {
            loop {
                node = self.nodes[node.index()].prev?;
                if self.nodes[node.index()].point == point {
                    break;
                }
            }
        } else {
            loop {
                node = self.nodes[node.index()].next?;
                if self.nodes[node.index()].point == point {
                    break;
                }
            }
        }
        self.search_node = node;
        Some(node)
    }

    fn prev_point(&self, node: NodeId) -> Option<PointId> {
        self.nodes[node.index()]
            .prev
            .map(|prev| self.nodes[prev.index()].point)
    }

    fn next_point(&self, node: NodeId) -> Option<PointId> {
        self.nodes[node.index()]
            .next
            .map(|next| self.nodes[next.index()].point)
    }
}

#[cfg(test)]
mod test {
    use super::AdvancingFront;
    use crate::sweep_core::handles::{PointId, TriangleId};

    fn front() -> AdvancingFront<f64> {
        AdvancingFront::new(
            (PointId::new(0), -1.0),
            (PointId::new(1), 0.5),
            (PointId::new(2), 2.0),
            TriangleId::new(0),
        )
    }

    #[test]
    fn test_bootstrap_chain() {
        let front = front();
        let head = front.head();
        let middle = front.next_of(head).unwrap();
        let tail = front.next_of(middle).unwrap();
        assert_eq!(front.next_of(tail), None);
        assert_eq!(front.prev_of(middle), Some(head));
        assert_eq!(front.prev_of(head), None);
        assert_eq!(tail, front.tail());
        assert_eq!(front.node(head).triangle, Some(TriangleId::new(0)));
        assert_eq!(front.node(tail).triangle, None);
    }

    #[test]
    fn test_locate_node() {
        let mut front = front();
        let head = front.head();
        let middle = front.next_of(head).unwrap();

        assert_eq!(front.locate_node(0.0), Some(head));
        assert_eq!(front.locate_node(1.0), Some(middle));
        // Exact hit on a node's x belongs to that node.
        assert_eq!(front.locate_node(0.5), Some(middle));
        // Out of range on either side.
        assert_eq!(front.locate_node(-5.0), None);
        assert_eq!(front.locate_node(5.0), None);
    }

    #[test]
    fn test_locate_node_walks_from_hint_in_both_directions() {
        let mut front = front();
        let head = front.head();
        let middle = front.next_of(head).unwrap();
        // Move the hint to the right end, then query the left end.
        assert_eq!(front.locate_node(1.9), Some(middle));
        assert_eq!(front.locate_node(-0.5), Some(head));
        assert_eq!(front.locate_node(1.0), Some(middle));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut front = front();
        let head = front.head();
        let middle = front.next_of(head).unwrap();

        let new = front.create_node(PointId::new(3), 1.5);
        front.insert_after(middle, new);
        assert_eq!(front.next_of(middle), Some(new));
        assert_eq!(front.prev_of(front.tail()), Some(new));
        assert_eq!(front.locate_node(1.7), Some(new));

        front.remove(new);
        assert_eq!(front.next_of(middle), Some(front.tail()));
        assert_eq!(front.prev_of(front.tail()), Some(middle));
        // The removed node keeps its historic links.
        assert_eq!(front.prev_of(new), Some(middle));
        assert_eq!(front.next_of(new), Some(front.tail()));
        // The hint pointed at the removed node and was repaired.
        assert_eq!(front.locate_node(1.7), Some(middle));
    }

    #[test]
    fn test_locate_point() {
        let mut front = front();
        let head = front.head();
        let middle = front.next_of(head).unwrap();
        assert_eq!(front.locate_point(PointId::new(1), 0.5), Some(middle));
        assert_eq!(front.locate_point(PointId::new(0), -1.0), Some(head));
        assert_eq!(front.locate_point(PointId::new(2), 2.0), Some(front.tail()));
        assert_eq!(front.locate_point(PointId::new(9), 9.0), None);
    }
}
