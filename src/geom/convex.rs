//! Volume and centroid of a convex point set.
//!
//! The hull faces are recovered directly from the point cloud: every point
//! triple spanning a plane that leaves all other points on one side is a
//! hull face. Each face loop is grown point by point (a planar incremental
//! hull) and fanned into tetrahedra from the cloud average.
//!
//! Tetrahedron pairs are intersected by collecting the overlap point set
//! and passing it through the same hull.

use crate::geom::bboxes::BoundBox;
use crate::geom::containment::point_in_cell;
use crate::geom::face::{insert_label, triangle_plane};
use crate::geom::segment::segment_face_intersection;
use crate::geom::tetrahedron::{tetrahedron_centroid, tetrahedron_faces, tetrahedron_signed_volume};
use crate::{Point, Vector};
use thiserror::Error;

/// Thickness, relative to the set span, below which a set is flat up to
/// round-off.
const FLAT_FRACTION: f64 = 1e3 * f64::EPSILON;

const TET_EDGES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

#[derive(Debug, Error)]
pub enum ConvexSetError {
    #[error("convex set has negative volume {0:e}")]
    NegativeVolume(f64),
    /// Thinner than the tolerance but not flat, so its volume is unresolved.
    #[error("convex set is a sliver of thickness {0:e}")]
    Sliver(f64),
    #[error(transparent)]
    FaceLoop(#[from] anyhow::Error),
}

/// Volume and centroid of a convex polyhedron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvexVolume {
    pub volume: f64,
    pub centre: Point,
}

/// Computes volume and centroid of the convex hull of `cvx_set`.
///
/// `tol_fraction` is relative to the bounding-box span of the set. It is
/// used to merge coincident points, to decide coplanarity and to drop
/// tetrahedra whose volume is negligible.
///
/// Returns `Ok(None)` if the set has no volume (fewer than 4 distinct
/// points, or all points coplanar up to round-off). A set that is thinner
/// than the tolerance without being flat is a [`ConvexSetError::Sliver`].
pub fn convex_set_volume(cvx_set: &[Point], tol_fraction: f64) -> Result<Option<ConvexVolume>, ConvexSetError> {
    if cvx_set.len() < 4 {
        return Ok(None);
    }
    let span = BoundBox::from_points(cvx_set).span();
    if !(span > 0.) {
        return Ok(None);
    }
    let tol = tol_fraction * span;
    let tol_volume = tol_fraction * span.powi(3);

    match plane_thickness(cvx_set, tol) {
        None => return Ok(None),
        Some(t) if t <= FLAT_FRACTION * span => return Ok(None),
        Some(t) if t <= tol => return Err(ConvexSetError::Sliver(t)),
        Some(_) => {}
    }

    let pts = merge_points(cvx_set, tol);
    let n = pts.len();
    if n < 4 {
        return Ok(None);
    }
    let xref = Point::mean(&pts);

    // Point membership of each hull face found so far
    let mut faces_found: Vec<Vec<bool>> = Vec::new();
    let mut volume = 0.;
    let mut moment = Vector::zero();

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if faces_found.iter().any(|f| f[i] && f[j] && f[k]) {
                    continue;
                }
                let normal = (pts[j] - pts[i]).cross(pts[k] - pts[i]);
                let len = normal.length();
                if len <= tol * span {
                    // Collinear triple
                    continue;
                }
                let unit = normal * (1. / len);

                let dist: Vec<f64> = pts.iter().map(|p| (*p - pts[i]).dot(unit)).collect();
                let above = dist.iter().any(|d| *d > tol);
                let below = dist.iter().any(|d| *d < -tol);
                if above && below {
                    continue;
                }
                if !above && !below {
                    let thickness = dist.iter().fold(0., |acc: f64, d| acc.max(d.abs()));
                    return Err(ConvexSetError::Sliver(thickness));
                }
                let outward = if above { -unit } else { unit };

                let on_plane: Vec<bool> = dist.iter().map(|d| d.abs() <= tol).collect();
                let members: Vec<usize> = (0..n).filter(|m| on_plane[*m]).collect();
                let face = build_face_loop(&pts, &members, [i, j, k], outward, tol)?;
                faces_found.push(on_plane);

                // Fan the face into tetrahedra with apex at the reference point
                for m in 1..face.len() - 1 {
                    let a = pts[face[0]];
                    let b = pts[face[m]];
                    let c = pts[face[m + 1]];
                    let tet_volume = tetrahedron_signed_volume(xref, a, b, c);
                    if tet_volume.abs() < tol_volume {
                        continue;
                    }
                    volume += tet_volume;
                    moment = moment + tetrahedron_centroid(xref, a, b, c).to_vector() * tet_volume;
                }
            }
        }
    }

    if volume < -tol_volume {
        return Err(ConvexSetError::NegativeVolume(volume));
    }
    if volume <= tol_volume {
        return Ok(None);
    }
    Ok(Some(ConvexVolume {
        volume,
        centre: Point::default() + moment * (1. / volume),
    }))
}

/// Volume and centroid of the overlap of two tetrahedra.
///
/// The overlap point set holds the vertices of each tetrahedron lying in the
/// other and the points where edges of one cross faces of the other. `tol`
/// is the absolute distance tolerance of these tests and `tol_fraction` is
/// passed on to [`convex_set_volume`]. Flat tetrahedra have no overlap.
pub fn tetrahedra_intersection(
    a: &[Point; 4],
    b: &[Point; 4],
    tol: f64,
    tol_fraction: f64,
) -> Result<Option<ConvexVolume>, ConvexSetError> {
    let (Some(a), Some(b)) = (positive_tet(a), positive_tet(b)) else {
        return Ok(None);
    };
    if !BoundBox::from_points(&a).overlaps(&BoundBox::from_points(&b), tol) {
        return Ok(None);
    }
    let (Some(faces_a), Some(faces_b)) = (tet_planes(&a), tet_planes(&b)) else {
        return Ok(None);
    };
    let planes_a: Vec<(Point, Vector)> = faces_a.iter().map(|(_, c, n)| (*c, *n)).collect();
    let planes_b: Vec<(Point, Vector)> = faces_b.iter().map(|(_, c, n)| (*c, *n)).collect();

    let a_in_b = a.map(|p| point_in_cell(p, &planes_b, tol));
    if a_in_b.iter().all(|x| *x) {
        return Ok(Some(tet_volume(&a)));
    }
    let b_in_a = b.map(|p| point_in_cell(p, &planes_a, tol));
    if b_in_a.iter().all(|x| *x) {
        return Ok(Some(tet_volume(&b)));
    }

    let mut cvx_set: Vec<Point> = Vec::new();
    cvx_set.extend(a.iter().zip(&a_in_b).filter(|(_, inside)| **inside).map(|(p, _)| *p));
    cvx_set.extend(b.iter().zip(&b_in_a).filter(|(_, inside)| **inside).map(|(p, _)| *p));
    push_crossings(&a, &a_in_b, &faces_b, tol, &mut cvx_set);
    push_crossings(&b, &b_in_a, &faces_a, tol, &mut cvx_set);

    // Points gathered around a shared vertex or edge
    if cvx_set.len() < 4 || BoundBox::from_points(&cvx_set).span() <= tol {
        return Ok(None);
    }
    convex_set_volume(&cvx_set, tol_fraction)
}

/// Reorders an inverted tetrahedron, `None` if it is flat.
fn positive_tet(tet: &[Point; 4]) -> Option<[Point; 4]> {
    let [p0, p1, p2, p3] = *tet;
    let volume = tetrahedron_signed_volume(p0, p1, p2, p3);
    if volume > 0. {
        Some(*tet)
    } else if volume < 0. {
        Some([p0, p2, p1, p3])
    } else {
        None
    }
}

/// Outward faces of a tetrahedron with their centroids and unit normals.
fn tet_planes(tet: &[Point; 4]) -> Option<Vec<([Point; 3], Point, Vector)>> {
    tetrahedron_faces(tet)
        .into_iter()
        .map(|tri| {
            let (centre, normal) = triangle_plane(&tri)?;
            Some((tri, centre, normal))
        })
        .collect()
}

fn tet_volume(tet: &[Point; 4]) -> ConvexVolume {
    let [p0, p1, p2, p3] = *tet;
    ConvexVolume {
        volume: tetrahedron_signed_volume(p0, p1, p2, p3),
        centre: tetrahedron_centroid(p0, p1, p2, p3),
    }
}

/// Pushes the points where edges of `tet` cross `other_faces`.
///
/// Edges with both ends inside the other tetrahedron cannot cross it.
fn push_crossings(
    tet: &[Point; 4],
    inside: &[bool; 4],
    other_faces: &[([Point; 3], Point, Vector)],
    tol: f64,
    cvx_set: &mut Vec<Point>,
) {
    for [i, j] in TET_EDGES {
        if inside[i] && inside[j] {
            continue;
        }
        for (tri, centre, normal) in other_faces {
            if let Some(p) = segment_face_intersection([tet[i], tet[j]], tri, *centre, *normal, tol) {
                cvx_set.push(p);
            }
        }
    }
}

/// Largest distance of `pts` from the plane through three well spread
/// points of the set. `None` if all points lie within `tol` of a line.
fn plane_thickness(pts: &[Point], tol: f64) -> Option<f64> {
    let p0 = *pts.first()?;
    let p1 = pts
        .iter()
        .copied()
        .max_by(|a, b| (*a - p0).length().total_cmp(&(*b - p0).length()))?;
    let axis = (p1 - p0).normalize()?;
    let off_axis = |p: &Point| (*p - p0).cross(axis).length();
    let p2 = pts
        .iter()
        .copied()
        .max_by(|a, b| off_axis(a).total_cmp(&off_axis(b)))?;
    if off_axis(&p2) <= tol {
        return None;
    }
    let normal = axis.cross(p2 - p0).normalize()?;
    Some(pts.iter().fold(0., |acc: f64, p| acc.max((*p - p0).dot(normal).abs())))
}

/// Drops points closer than `tol` to an earlier point.
fn merge_points(pts: &[Point], tol: f64) -> Vec<Point> {
    let mut merged: Vec<Point> = Vec::with_capacity(pts.len());
    for p in pts {
        if !merged.iter().any(|q| q.is_within(p, tol)) {
            merged.push(*p);
        }
    }
    merged
}

/// Orders the coplanar points `members` into a convex loop, counter-clockwise
/// about `normal`, starting from the triangle `seed`.
///
/// Points inside the current loop or on its edges are skipped; a point
/// outside replaces the chain of edges it can see.
fn build_face_loop(
    pts: &[Point],
    members: &[usize],
    seed: [usize; 3],
    normal: Vector,
    tol: f64,
) -> anyhow::Result<Vec<usize>> {
    let [i, j, k] = seed;
    let mut face = if (pts[j] - pts[i]).cross(pts[k] - pts[i]).dot(normal) > 0. {
        vec![i, j, k]
    } else {
        vec![i, k, j]
    };

    for &m in members {
        if face.contains(&m) {
            continue;
        }
        let p = pts[m];
        let nf = face.len();
        let visible: Vec<bool> = (0..nf)
            .map(|e| {
                let a = pts[face[e]];
                let b = pts[face[(e + 1) % nf]];
                let edge = b - a;
                edge.cross(p - a).dot(normal) / edge.length() < -tol
            })
            .collect();

        let num_visible = visible.iter().filter(|v| **v).count();
        if num_visible == 0 || num_visible == nf {
            continue;
        }
        // Rotate so that the visible chain starts at edge 0
        let start = (0..nf)
            .find(|e| visible[*e] && !visible[(e + nf - 1) % nf])
            .unwrap_or(0);
        let run = (0..nf).take_while(|e| visible[(start + e) % nf]).count();
        face.rotate_left(start);
        // Vertices strictly inside the visible chain leave the hull
        face.drain(1..run);
        let (a, b) = (face[0], face[1 % face.len()]);
        insert_label(m, a, b, &mut face)?;
    }
    Ok(face)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_corners(size: f64) -> Vec<Point> {
        let mut pts = Vec::new();
        for x in [0., size] {
            for y in [0., size] {
                for z in [0., size] {
                    pts.push(Point::new(x, y, z));
                }
            }
        }
        pts
    }

    #[test]
    fn test_unit_cube() {
        let res = convex_set_volume(&cube_corners(1.), 1e-8).unwrap().unwrap();
        assert!((res.volume - 1.).abs() < 1e-12, "volume={}", res.volume);
        assert!(res.centre.is_close(&Point::new(0.5, 0.5, 0.5)));
    }

    #[test]
    fn test_cube_with_redundant_points() {
        let mut pts = cube_corners(2.);
        // Duplicates, edge midpoints, face centres and an interior point
        pts.push(Point::new(2., 2., 2.));
        pts.push(Point::new(1., 0., 0.));
        pts.push(Point::new(2., 1., 2.));
        pts.push(Point::new(1., 1., 0.));
        pts.push(Point::new(0., 1., 1.));
        pts.push(Point::new(1., 1., 1.));
        pts.push(Point::new(2. + 1e-12, 0., 0.));
        pts.reverse();
        let res = convex_set_volume(&pts, 1e-8).unwrap().unwrap();
        assert!((res.volume - 8.).abs() < 1e-10, "volume={}", res.volume);
        assert!(res.centre.is_within(&Point::new(1., 1., 1.), 1e-10));
    }

    #[test]
    fn test_tetrahedron() {
        let pts = vec![
            Point::new(0., 0., 0.),
            Point::new(0., 0., 1.),
            Point::new(1., 0., 0.),
            Point::new(0., 1., 0.),
        ];
        let res = convex_set_volume(&pts, 1e-8).unwrap().unwrap();
        assert!((res.volume - 1. / 6.).abs() < 1e-14);
        assert!(res.centre.is_close(&Point::new(0.25, 0.25, 0.25)));
    }

    #[test]
    fn test_octahedron() {
        let pts = vec![
            Point::new(1., 0., 0.),
            Point::new(-1., 0., 0.),
            Point::new(0., 1., 0.),
            Point::new(0., -1., 0.),
            Point::new(0., 0., 1.),
            Point::new(0., 0., -1.),
        ];
        let res = convex_set_volume(&pts, 1e-8).unwrap().unwrap();
        assert!((res.volume - 4. / 3.).abs() < 1e-12, "volume={}", res.volume);
        assert!(res.centre.is_within(&Point::new(0., 0., 0.), 1e-12));
    }

    #[test]
    fn test_small_scale_cube() {
        let s = 1e-5;
        let res = convex_set_volume(&cube_corners(s), 1e-8).unwrap().unwrap();
        assert!((res.volume / s.powi(3) - 1.).abs() < 1e-10);
    }

    #[test]
    fn test_flat_set_has_no_volume() {
        let pts = vec![
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(1., 1., 0.),
            Point::new(0., 1., 0.),
            Point::new(0.5, 0.5, 0.),
        ];
        assert!(convex_set_volume(&pts, 1e-8).unwrap().is_none());
        assert!(convex_set_volume(&pts[..3], 1e-8).unwrap().is_none());
        assert!(convex_set_volume(&[], 1e-8).unwrap().is_none());
    }

    #[test]
    fn test_prism() {
        // Triangular prism, volume = 0.5 * 1 * 1 * 3
        let mut pts = Vec::new();
        for z in [0., 3.] {
            pts.push(Point::new(0., 0., z));
            pts.push(Point::new(1., 0., z));
            pts.push(Point::new(0., 1., z));
        }
        let res = convex_set_volume(&pts, 1e-8).unwrap().unwrap();
        assert!((res.volume - 1.5).abs() < 1e-12);
        assert!(res.centre.is_within(&Point::new(1. / 3., 1. / 3., 1.5), 1e-12));
    }

    #[test]
    fn test_sliver_set() {
        let mut pts = cube_corners(1.);
        for p in pts.iter_mut() {
            p.z *= 1e-10;
        }
        match convex_set_volume(&pts, 1e-8) {
            Err(ConvexSetError::Sliver(t)) => assert!((t - 1e-10).abs() < 1e-12),
            other => panic!("expected a sliver, got {:?}", other),
        }
    }

    fn unit_tet(shift: Vector) -> [Point; 4] {
        [
            Point::new(0., 0., 0.) + shift,
            Point::new(1., 0., 0.) + shift,
            Point::new(0., 1., 0.) + shift,
            Point::new(0., 0., 1.) + shift,
        ]
    }

    #[test]
    fn test_tetrahedra_intersection() {
        let a = unit_tet(Vector::zero());

        // Identical and inverted copies
        let same = tetrahedra_intersection(&a, &a, 1e-9, 1e-8).unwrap().unwrap();
        assert!((same.volume - 1. / 6.).abs() < 1e-14);
        let inverted = [a[0], a[2], a[1], a[3]];
        let same = tetrahedra_intersection(&a, &inverted, 1e-9, 1e-8).unwrap().unwrap();
        assert!((same.volume - 1. / 6.).abs() < 1e-14);

        // Shifted by half along x: the overlap is the corner tet scaled by 1/2
        let b = unit_tet(Vector::new(0.5, 0., 0.));
        let v = tetrahedra_intersection(&a, &b, 1e-9, 1e-8).unwrap().unwrap();
        assert!((v.volume - 1. / 48.).abs() < 1e-12, "volume={}", v.volume);
        assert!(v.centre.is_within(&Point::new(0.625, 0.125, 0.125), 1e-12));

        // Sharing only a face, and far apart
        let mirrored = [a[0], a[2], a[1], Point::new(0., 0., -1.)];
        assert!(tetrahedra_intersection(&a, &mirrored, 1e-9, 1e-8).unwrap().is_none());
        let far = unit_tet(Vector::new(3., 0., 0.));
        assert!(tetrahedra_intersection(&a, &far, 1e-9, 1e-8).unwrap().is_none());
    }
}
