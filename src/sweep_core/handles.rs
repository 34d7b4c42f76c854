use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A handle referring to one of the input points of a triangulation.
///
/// Point handles are assigned in registration order: the outline's points
/// receive the first indices, followed by the points of each hole and any
/// Steiner points, in the order they were added.
///
/// Two points with equal coordinates but different handles are distinct -
/// the triangulation compares points by handle, never by coordinate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointId {
    index: u32,
}

impl PointId {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index: index
                .try_into()
                .expect("Index too big - at most 2^32 elements supported"),
        }
    }

    /// Returns the internal index of this point.
    ///
    /// Indices are unique per point and lie in `0 .. number_of_points`.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointId({})", self.index)
    }
}

/// A handle referring to a triangle of the triangulation's mesh.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriangleId {
    index: u32,
}

impl TriangleId {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index: index
                .try_into()
                .expect("Index too big - at most 2^32 elements supported"),
        }
    }

    /// Returns the internal index of this triangle.
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for TriangleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TriangleId({})", self.index)
    }
}

/// Index of a node in the advancing front's node arena.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId {
    index: u32,
}

impl NodeId {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index: index
                .try_into()
                .expect("Index too big - at most 2^32 elements supported"),
        }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.index)
    }
}

/// Index of a constraint edge in the sweep context's edge list.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct EdgeId {
    index: u32,
}

impl EdgeId {
    pub(crate) fn new(index: usize) -> Self {
        Self {
            index: index
                .try_into()
                .expect("Index too big - at most 2^32 elements supported"),
        }
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.index)
    }
}
