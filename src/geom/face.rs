//! Polygonal face geometry and face-loop editing.

use crate::geom::EPS;
use crate::{Point, Vector};
use anyhow::{Result, anyhow};

/// Returns the area-weighted centre and the area vector of a polygonal face.
///
/// Faces with more than 3 points are split into a triangle fan around the
/// average point, so slightly warped faces still get a consistent normal.
/// The area vector follows the right-hand rule of the point order.
pub fn face_centre_and_area(pts: &[Point]) -> (Point, Vector) {
    match pts.len() {
        0 => (Point::default(), Vector::zero()),
        1 | 2 => (Point::mean(pts), Vector::zero()),
        3 => {
            let area = (pts[1] - pts[0]).cross(pts[2] - pts[0]) * 0.5;
            (Point::mean(pts), area)
        }
        n => {
            let pavg = Point::mean(pts);
            let mut sum_n = Vector::zero();
            let mut sum_a = 0.;
            let mut sum_ac = Vector::zero();
            for i in 0..n {
                let p = pts[i];
                let q = pts[(i + 1) % n];
                let c = p.to_vector() + q.to_vector() + pavg.to_vector();
                let tri_n = (q - p).cross(pavg - p);
                let a = tri_n.length();
                sum_n = sum_n + tri_n;
                sum_a += a;
                sum_ac = sum_ac + c * a;
            }
            let centre = if sum_a < EPS * EPS {
                pavg
            } else {
                Point::default() + sum_ac * (1. / (3. * sum_a))
            };
            (centre, sum_n * 0.5)
        }
    }
}

/// Splits a face loop into triangles around its average point.
///
/// The triangles keep the loop orientation, so their area vectors sum to the
/// one of [`face_centre_and_area`]. Triangular faces are returned as is.
pub fn fan_triangles(pts: &[Point]) -> Vec<[Point; 3]> {
    match pts.len() {
        0..=2 => Vec::new(),
        3 => vec![[pts[0], pts[1], pts[2]]],
        n => {
            let pavg = Point::mean(pts);
            (0..n).map(|i| [pavg, pts[i], pts[(i + 1) % n]]).collect()
        }
    }
}

/// Centroid and unit normal of a triangle, `None` if it has no area.
pub fn triangle_plane(tri: &[Point; 3]) -> Option<(Point, Vector)> {
    let [a, b, c] = *tri;
    let normal = (b - a).cross(c - a).normalize()?;
    Some((Point::mean(tri), normal))
}

/// Inserts `new_label` between the consecutive labels `label_a` and `label_b`
/// of the cyclic loop `list`.
///
/// Works for either order of `label_a`/`label_b`. Fails if they are not
/// adjacent in the loop.
pub fn insert_label(new_label: usize, label_a: usize, label_b: usize, list: &mut Vec<usize>) -> Result<()> {
    let n = list.len();
    for i in 0..n {
        let j = (i + 1) % n;
        let (ci, cj) = (list[i], list[j]);
        if (ci == label_a && cj == label_b) || (ci == label_b && cj == label_a) {
            // Inserting after the last element closes the loop
            list.insert(i + 1, new_label);
            return Ok(());
        }
    }
    Err(anyhow!(
        "Labels {} and {} are not adjacent in loop {:?}",
        label_a,
        label_b,
        list
    ))
}
