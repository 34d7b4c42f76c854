use std::{error::Error, fmt::Display};

/// The error type reported by a failed triangulation run.
///
/// All variants are fatal to the current
/// [triangulate](crate::ConstrainedTriangulation::triangulate) call: the
/// triangulation is left in an indeterminate state and must be discarded.
/// There is no local recovery - callers should validate their input and
/// retry with corrected geometry.
#[derive(Copy, Clone, PartialOrd, Ord, PartialEq, Eq, Debug, Hash)]
pub enum TriangulationError {
    /// A mesh traversal required a neighboring triangle that did not exist.
    ///
    /// This usually indicates self-intersecting input or a constraint edge
    /// leaving the bootstrap region.
    NullTriangle,

    /// Locating a point on the advancing front failed because its x
    /// coordinate was outside the front's span.
    NullNode,

    /// A constraint edge is collinear with a third existing point that it
    /// does not contain.
    ///
    /// The sweep refuses such degenerate configurations rather than trying
    /// to resolve them; nudge the offending point or split the constraint.
    CollinearPoints,

    /// A triangle was missing a required CW or CCW vertex relative to a
    /// pivot point, meaning the mesh invariants were violated.
    DegenerateTriangle,

    /// A legalization or flip cascade exceeded the recursion safety bound.
    ///
    /// This acts as a runaway guard for adversarial inputs; well formed
    /// polygons stay far below the limit.
    RecursionLimit,
}

impl Display for TriangulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let description = match self {
            TriangulationError::NullTriangle => "required neighbor triangle is missing",
            TriangulationError::NullNode => "advancing front locate failed",
            TriangulationError::CollinearPoints => {
                "constraint edge is collinear with a third point"
            }
            TriangulationError::DegenerateTriangle => "triangle is missing a CW or CCW vertex",
            TriangulationError::RecursionLimit => "flip recursion exceeded the safety bound",
        };
        f.write_str(description)
    }
}

impl Error for TriangulationError {}

#[cfg(test)]
mod test {
    use super::TriangulationError;

    #[test]
    fn test_error_kinds_are_distinct() {
        use TriangulationError::*;
        let kinds = [
            NullTriangle,
            NullNode,
            CollinearPoints,
            DegenerateTriangle,
            RecursionLimit,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for (j, b) in kinds.iter().enumerate() {
                assert_eq!(i == j, a == b);
            }
            assert!(!a.to_string().is_empty());
        }
    }
}
