//! Geometric predicates and angle helpers.
//!
//! The orientation, in-circle and scan-area predicates exist in two
//! renditions: adaptive precision versions built on the `robust` crate
//! (feature `exact-predicates`, the default) and epsilon-tolerant floating
//! determinants. Both share one sign convention, documented per function.

use crate::{Point2, SweepNum};

/// Tolerance used by the epsilon variants of the predicates and by the
/// flat-wedge check of the point event.
pub(crate) const EPSILON: f64 = 1e-12;

pub(crate) const PI_DIV_2: f64 = core::f64::consts::FRAC_PI_2;
pub(crate) const PI_3_DIV_4: f64 = 3.0 * core::f64::consts::FRAC_PI_4;

/// The sign of the signed area of a point triple.
///
/// `Ccw` corresponds to a positive determinant
/// `(b.x - a.x)(c.y - a.y) - (b.y - a.y)(c.x - a.x)`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Orientation {
    /// The triple winds clockwise (negative signed area).
    Cw,
    /// The triple winds counterclockwise (positive signed area).
    Ccw,
    /// The three points lie on a common line.
    Collinear,
}

#[cfg(feature = "exact-predicates")]
fn to_robust_coord<S: SweepNum>(point: Point2<S>) -> robust::Coord<S> {
    robust::Coord {
        x: point.x,
        y: point.y,
    }
}

/// Orientation of the triple `(a, b, c)`.
///
/// With the `exact-predicates` feature (the default) this uses adaptive
/// precision arithmetic and `Collinear` means exactly collinear. Without it,
/// a floating determinant within `EPSILON` (`1e-12`) of zero maps to
/// `Collinear`.
#[cfg(feature = "exact-predicates")]
pub fn orient2d<S: SweepNum>(a: Point2<S>, b: Point2<S>, c: Point2<S>) -> Orientation {
    let det = robust::orient2d(to_robust_coord(a), to_robust_coord(b), to_robust_coord(c));
    if det > 0.0 {
        Orientation::Ccw
    } else if det < 0.0 {
        Orientation::Cw
    } else {
        Orientation::Collinear
    }
}

/// Orientation of the triple `(a, b, c)`.
///
/// With the `exact-predicates` feature (the default) this uses adaptive
/// precision arithmetic and `Collinear` means exactly collinear. Without it,
/// a floating determinant within `EPSILON` (`1e-12`) of zero maps to
/// `Collinear`.
#[cfg(not(feature = "exact-predicates"))]
pub fn orient2d<S: SweepNum>(a: Point2<S>, b: Point2<S>, c: Point2<S>) -> Orientation {
    let (a, b, c) = (a.to_f64(), b.to_f64(), c.to_f64());
    let det_left = (a.x - c.x) * (b.y - c.y);
    let det_right = (a.y - c.y) * (b.x - c.x);
    let val = det_left - det_right;
    if val > -EPSILON && val < EPSILON {
        Orientation::Collinear
    } else if val > 0.0 {
        Orientation::Ccw
    } else {
        Orientation::Cw
    }
}

/// Returns `true` iff `d` lies strictly inside the circumscribed circle of
/// the CCW triangle `(a, b, c)`.
///
/// The predicate first requires `d` to be on the inner side of the edges
/// `(a, b)` and `(c, a)`; configurations outside that fan report `false`
/// without evaluating the lifted determinant.
#[cfg(feature = "exact-predicates")]
pub fn in_circle<S: SweepNum>(a: Point2<S>, b: Point2<S>, c: Point2<S>, d: Point2<S>) -> bool {
    let (ra, rb, rc, rd) = (
        to_robust_coord(a),
        to_robust_coord(b),
        to_robust_coord(c),
        to_robust_coord(d),
    );
    if robust::orient2d(ra, rb, rd) <= 0.0 {
        return false;
    }
    if robust::orient2d(rc, ra, rd) <= 0.0 {
        return false;
    }
    // incircle is positive for a point inside the circle through a CCW
    // ordered triple.
    robust::incircle(ra, rb, rc, rd) > 0.0
}

/// Returns `true` iff `d` lies strictly inside the circumscribed circle of
/// the CCW triangle `(a, b, c)`.
///
/// The predicate first requires `d` to be on the inner side of the edges
/// `(a, b)` and `(c, a)`; configurations outside that fan report `false`
/// without evaluating the lifted determinant.
#[cfg(not(feature = "exact-predicates"))]
pub fn in_circle<S: SweepNum>(a: Point2<S>, b: Point2<S>, c: Point2<S>, d: Point2<S>) -> bool {
    let (a, b, c, d) = (a.to_f64(), b.to_f64(), c.to_f64(), d.to_f64());
    let adx = a.x - d.x;
    let ady = a.y - d.y;
    let bdx = b.x - d.x;
    let bdy = b.y - d.y;

    let oabd = adx * bdy - bdx * ady;
    if oabd <= 0.0 {
        return false;
    }

    let cdx = c.x - d.x;
    let cdy = c.y - d.y;

    let ocad = cdx * ady - adx * cdy;
    if ocad <= 0.0 {
        return false;
    }

    let bdxcdy = bdx * cdy;
    let cdxbdy = cdx * bdy;

    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;

    let det = alift * (bdxcdy - cdxbdy) + blift * ocad + clift * oabd;
    det > 0.0
}

/// Returns `true` iff `d` lies strictly inside the quadrilateral scan area
/// spanned by `a` opposite the edge `(b, c)`, i.e. strictly right of the
/// directed line `b -> a` and strictly left of `c -> a`.
///
/// Used to guard edge flips: only a `d` inside the scan area forms a convex
/// quadrilateral with `(a, b, c)` that can be rotated safely.
#[cfg(feature = "exact-predicates")]
pub fn in_scan_area<S: SweepNum>(a: Point2<S>, b: Point2<S>, c: Point2<S>, d: Point2<S>) -> bool {
    let (ra, rb, rc, rd) = (
        to_robust_coord(a),
        to_robust_coord(b),
        to_robust_coord(c),
        to_robust_coord(d),
    );
    if robust::orient2d(rb, ra, rd) >= 0.0 {
        return false;
    }
    if robust::orient2d(rc, ra, rd) <= 0.0 {
        return false;
    }
    true
}

/// Returns `true` iff `d` lies strictly inside the quadrilateral scan area
/// spanned by `a` opposite the edge `(b, c)`, i.e. strictly right of the
/// directed line `b -> a` and strictly left of `c -> a`.
///
/// Used to guard edge flips: only a `d` inside the scan area forms a convex
/// quadrilateral with `(a, b, c)` that can be rotated safely.
#[cfg(not(feature = "exact-predicates"))]
pub fn in_scan_area<S: SweepNum>(a: Point2<S>, b: Point2<S>, c: Point2<S>, d: Point2<S>) -> bool {
    let (a, b, c, d) = (a.to_f64(), b.to_f64(), c.to_f64(), d.to_f64());
    let oadb = (a.x - b.x) * (d.y - b.y) - (d.x - b.x) * (a.y - b.y);
    if oadb >= -EPSILON {
        return false;
    }
    let oadc = (a.x - c.x) * (d.y - c.y) - (d.x - c.x) * (a.y - c.y);
    if oadc <= EPSILON {
        return false;
    }
    true
}

/// The angle between the rays `origin -> a` and `origin -> b`.
///
/// Computed as `atan2(cross, dot)` of the two direction vectors, so the
/// result is signed and lies in `(-pi, pi]`.
pub(crate) fn angle<S: SweepNum>(origin: Point2<S>, a: Point2<S>, b: Point2<S>) -> f64 {
    let origin = origin.to_f64();
    let a = a.to_f64();
    let b = b.to_f64();
    let ax = a.x - origin.x;
    let ay = a.y - origin.y;
    let bx = b.x - origin.x;
    let by = b.y - origin.y;
    let cross = ax * by - ay * bx;
    let dot = ax * bx + ay * by;
    cross.atan2(dot)
}

pub(crate) fn angle_is_negative<S: SweepNum>(
    origin: Point2<S>,
    a: Point2<S>,
    b: Point2<S>,
) -> bool {
    angle(origin, a, b) < 0.0
}

pub(crate) fn angle_exceeds_90_degrees<S: SweepNum>(
    origin: Point2<S>,
    a: Point2<S>,
    b: Point2<S>,
) -> bool {
    let angle = angle(origin, a, b);
    angle > PI_DIV_2 || angle < -PI_DIV_2
}

pub(crate) fn angle_exceeds_plus_90_degrees_or_is_negative<S: SweepNum>(
    origin: Point2<S>,
    a: Point2<S>,
    b: Point2<S>,
) -> bool {
    let angle = angle(origin, a, b);
    angle > PI_DIV_2 || angle < 0.0
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Point2;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    #[test]
    fn test_orient2d() {
        assert_eq!(
            orient2d(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)),
            Orientation::Ccw
        );
        assert_eq!(
            orient2d(p(0.0, 0.0), p(0.0, 1.0), p(1.0, 0.0)),
            Orientation::Cw
        );
        assert_eq!(
            orient2d(p(0.0, 0.0), p(1.0, 1.0), p(2.0, 2.0)),
            Orientation::Collinear
        );
    }

    #[test]
    fn test_orient2d_is_invariant_under_cyclic_rotation() {
        let (a, b, c) = (p(0.2, 0.1), p(3.4, 0.3), p(1.1, 2.2));
        let expected = orient2d(a, b, c);
        assert_eq!(orient2d(b, c, a), expected);
        assert_eq!(orient2d(c, a, b), expected);
    }

    #[test]
    fn test_in_circle() {
        let a = p(0.0, 0.0);
        let b = p(2.0, 0.0);
        let c = p(0.0, 2.0);
        // Circumcircle through the right triangle has center (1, 1).
        assert!(in_circle(a, b, c, p(1.0, 1.0)));
        assert!(!in_circle(a, b, c, p(3.0, 3.0)));
        // A point on the circle is not strictly inside.
        assert!(!in_circle(a, b, c, p(2.0, 2.0)));
        // The early out rejects points behind the a-b edge.
        assert!(!in_circle(a, b, c, p(0.5, -0.1)));
    }

    #[test]
    fn test_in_scan_area() {
        let a = p(0.0, 2.0);
        let b = p(-1.0, 0.0);
        let c = p(1.0, 0.0);
        assert!(in_scan_area(a, b, c, p(0.0, -1.0)));
        assert!(!in_scan_area(a, b, c, p(-2.0, -1.0)));
        assert!(!in_scan_area(a, b, c, p(2.0, -1.0)));
    }

    #[test]
    fn test_angle() {
        use approx::assert_relative_eq;
        let origin = p(0.0, 0.0);
        assert_relative_eq!(angle(origin, p(1.0, 0.0), p(1.0, 0.0)), 0.0);
        assert_relative_eq!(angle(origin, p(1.0, 0.0), p(0.0, 1.0)), PI_DIV_2);
        assert_relative_eq!(angle(origin, p(0.0, 1.0), p(1.0, 0.0)), -PI_DIV_2);
        assert!(angle_exceeds_90_degrees(origin, p(1.0, 0.0), p(-1.0, 0.1)));
        assert!(!angle_exceeds_90_degrees(origin, p(1.0, 0.0), p(0.9, 1.0)));
    }
}
