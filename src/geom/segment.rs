//! Line segment vs face intersection.

use crate::geom::EPS;
use crate::geom::containment::point_in_face;
use crate::{Point, Vector};

/// Finds the point where a segment crosses a face.
///
/// The face is given by its ordered loop `pts`, its `centre` and the
/// `unit_normal` matching the loop orientation. Returns `None` if the segment
/// stays on one side of the face plane, lies in (or parallel to) the plane,
/// or crosses the plane outside the face extent. `tol` is an absolute
/// distance tolerance.
pub fn segment_face_intersection(
    segment: [Point; 2],
    pts: &[Point],
    centre: Point,
    unit_normal: Vector,
    tol: f64,
) -> Option<Point> {
    let [seg_start, seg_end] = segment;

    // Signed distances from segment endpoints to the face plane
    let dist_start = (seg_start - centre).dot(unit_normal);
    let dist_end = (seg_end - centre).dot(unit_normal);

    // Segment entirely on one side of the plane
    if (dist_start > tol && dist_end > tol) || (dist_start < -tol && dist_end < -tol) {
        return None;
    }

    // Parallel to the plane, either in it or beside it
    let denom = dist_start - dist_end;
    if denom.abs() < EPS.max(tol) {
        return None;
    }

    // Parametric form: P = seg_start + t * (seg_end - seg_start)
    let t = (dist_start / denom).clamp(0., 1.);
    let intersection = seg_start + (seg_end - seg_start) * t;

    if point_in_face(intersection, pts, centre, unit_normal, tol) {
        Some(intersection)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> (Vec<Point>, Point, Vector) {
        let pts = vec![
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(1., 1., 0.),
            Point::new(0., 1., 0.),
        ];
        (pts, Point::new(0.5, 0.5, 0.), Vector::new(0., 0., 1.))
    }

    #[test]
    fn test_segment_crosses_face() {
        let (pts, c, n) = square();
        let seg = [Point::new(0.25, 0.5, -1.), Point::new(0.25, 0.5, 3.)];
        let pt = segment_face_intersection(seg, &pts, c, n, 1e-9).unwrap();
        assert!(pt.is_close(&Point::new(0.25, 0.5, 0.)));
    }

    #[test]
    fn test_segment_misses_face() {
        let (pts, c, n) = square();
        // Crosses the plane outside the face
        let seg = [Point::new(2., 0.5, -1.), Point::new(2., 0.5, 1.)];
        assert!(segment_face_intersection(seg, &pts, c, n, 1e-9).is_none());
        // Does not reach the plane
        let seg = [Point::new(0.5, 0.5, 0.1), Point::new(0.5, 0.5, 1.)];
        assert!(segment_face_intersection(seg, &pts, c, n, 1e-9).is_none());
    }

    #[test]
    fn test_segment_in_plane_is_ignored() {
        let (pts, c, n) = square();
        let seg = [Point::new(-1., 0.5, 0.), Point::new(2., 0.5, 0.)];
        assert!(segment_face_intersection(seg, &pts, c, n, 1e-9).is_none());
    }

    #[test]
    fn test_segment_ending_on_face_edge() {
        let (pts, c, n) = square();
        let seg = [Point::new(1., 1., 0.), Point::new(1., 1., 2.)];
        let pt = segment_face_intersection(seg, &pts, c, n, 1e-9).unwrap();
        assert!(pt.is_close(&Point::new(1., 1., 0.)));
    }

    #[test]
    fn test_tolerance_scales_with_geometry() {
        // The same configuration scaled down by 1e-6 must behave the same
        // when the tolerance is scaled with it.
        let s = 1e-6;
        let pts: Vec<Point> = square().0.iter().map(|p| p.scale(s)).collect();
        let c = Point::new(0.5 * s, 0.5 * s, 0.);
        let n = Vector::new(0., 0., 1.);
        let seg = [Point::new(0.25 * s, 0.5 * s, -s), Point::new(0.25 * s, 0.5 * s, s)];
        assert!(segment_face_intersection(seg, &pts, c, n, 1e-9 * s).is_some());
        let seg = [Point::new(1.5 * s, 0.5 * s, -s), Point::new(1.5 * s, 0.5 * s, s)];
        assert!(segment_face_intersection(seg, &pts, c, n, 1e-9 * s).is_none());
    }
}
