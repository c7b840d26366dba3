//! Tolerant point-in-face and point-in-cell tests on raw point data.
//!
//! Both tests use closed-set semantics: points within the tolerance band of
//! an edge or a face count as inside, so neighbouring cells never leave a gap
//! in a conservative sum.

use crate::geom::EPS;
use crate::{Point, Vector};

/// Checks if a point lies inside a planar (or slightly warped) face.
///
/// `pts` is the ordered face loop, `centre` its centre and `unit_normal` the
/// normal that agrees with the loop orientation. The point must lie within
/// `tol` of the face plane. The face is split into a triangle fan around
/// `centre` and the point is tested against each triangle, so any
/// star-shaped face is handled.
pub fn point_in_face(ptest: Point, pts: &[Point], centre: Point, unit_normal: Vector, tol: f64) -> bool {
    if pts.len() < 3 {
        return false;
    }
    if (ptest - centre).dot(unit_normal).abs() > tol {
        return false;
    }
    let n = pts.len();
    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        if (b - a).length() < EPS {
            continue;
        }
        if is_point_inside_triangle(ptest, centre, a, b, unit_normal, tol) {
            return true;
        }
    }
    false
}

/// Checks whether a point projected on the triangle plane lies inside the
/// triangle `p1 p2 p3` oriented counter-clockwise about `unit_normal`.
fn is_point_inside_triangle(
    ptest: Point,
    p1: Point,
    p2: Point,
    p3: Point,
    unit_normal: Vector,
    tol: f64,
) -> bool {
    for (pa, pb) in [(p1, p2), (p2, p3), (p3, p1)] {
        let edge = pb - pa;
        let len = edge.length();
        if len < EPS {
            // Degenerate edge of a sliver triangle adds no area
            continue;
        }
        // Signed in-plane distance of ptest to the edge line, positive inside
        let side = edge.cross(ptest - pa).dot(unit_normal) / len;
        if side < -tol {
            return false;
        }
    }
    true
}

/// Checks if a point lies inside a convex cell.
///
/// `faces` holds one `(centre, outward unit normal)` pair per bounding face.
/// The point is inside if it is on the interior side of every face plane,
/// allowing `tol` of overshoot.
pub fn point_in_cell(ptest: Point, faces: &[(Point, Vector)], tol: f64) -> bool {
    if faces.is_empty() {
        return false;
    }
    faces
        .iter()
        .all(|(centre, normal)| (ptest - *centre).dot(*normal) <= tol)
}
