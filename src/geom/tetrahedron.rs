use crate::Point;

/// Signed tetrahedron volume.
///
/// Positive when `pt1`, `pt2`, `pt3` wind counter-clockwise seen from the
/// side opposite to `pt0`.
pub fn tetrahedron_signed_volume(pt0: Point, pt1: Point, pt2: Point, pt3: Point) -> f64 {
    let a = pt1 - pt0;
    let b = pt2 - pt0;
    let c = pt3 - pt0;
    a.dot(b.cross(c)) / 6.
}

/// Returns tetrahedron centroid (i.e. average of each vertices)
pub fn tetrahedron_centroid(pt0: Point, pt1: Point, pt2: Point, pt3: Point) -> Point {
    let x = (pt0.x + pt1.x + pt2.x + pt3.x) / 4.;
    let y = (pt0.y + pt1.y + pt2.y + pt3.y) / 4.;
    let z = (pt0.z + pt1.z + pt2.z + pt3.z) / 4.;
    Point::new(x, y, z)
}

/// Faces of a tetrahedron with positive signed volume, each wound
/// counter-clockwise seen from outside.
pub fn tetrahedron_faces(tet: &[Point; 4]) -> [[Point; 3]; 4] {
    let [p0, p1, p2, p3] = *tet;
    [[p1, p2, p3], [p0, p2, p1], [p0, p1, p3], [p0, p3, p2]]
}
