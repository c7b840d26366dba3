//! Mesh-indexed geometric predicates and the volume of two overlapping cells.
//!
//! Cells are handled as the tetrahedra of their face fans, the same
//! decomposition that gives their volume, so warped faces are followed
//! exactly.

use log::debug;

use super::{MeshPair, RemapError, Side};
use crate::geom::containment::{point_in_cell, point_in_face};
use crate::geom::convex::{ConvexSetError, ConvexVolume, tetrahedra_intersection};
use crate::geom::face::triangle_plane;
use crate::geom::segment::segment_face_intersection;
use crate::geom::tetrahedron::{tetrahedron_centroid, tetrahedron_signed_volume};
use crate::{Point, Vector};

impl MeshPair<'_> {
    /// Checks whether `pt` lies in `cell` of the chosen mesh (closed test).
    pub fn point_in_cell(&self, cell: usize, pt: Point, side: Side) -> bool {
        let mesh = self.mesh(side);
        let tol = self.config.tol_factor * mesh.cell_length(cell);
        point_in_cell(pt, &mesh.cell_planes(cell), tol)
    }

    /// Checks whether `pt` lies on `face` of the chosen mesh.
    pub fn point_in_face(&self, face: usize, pt: Point, side: Side) -> bool {
        let mesh = self.mesh(side);
        let tol = self.config.tol_factor * mesh.face_area(face).length().sqrt();
        mesh.face_triangles(face)
            .iter()
            .any(|tri| triangle_plane(tri).is_some_and(|(c, n)| point_in_face(pt, tri, c, n, tol)))
    }

    /// Crossing point of `segment` with `face` of the chosen mesh.
    ///
    /// `tol_factor` is relative to the square root of the face area.
    pub fn segment_face_intersection(
        &self,
        segment: [Point; 2],
        face: usize,
        tol_factor: f64,
        side: Side,
    ) -> Option<Point> {
        let mesh = self.mesh(side);
        let tol = tol_factor * mesh.face_area(face).length().sqrt();
        mesh.face_triangles(face).iter().find_map(|tri| {
            let (c, n) = triangle_plane(tri)?;
            segment_face_intersection(segment, tri, c, n, tol)
        })
    }

    /// Volume and centroid of the overlap of `new_cell` with `old_cell`.
    ///
    /// Returns `Ok(None)` if the cells do not overlap or only touch. An
    /// overlap with a failed hull, or one that is only a sliver thinner than
    /// the tolerance, is reported as [`RemapError::GeometryDegenerate`].
    pub fn cell_intersection(&self, new_cell: usize, old_cell: usize) -> Result<Option<ConvexVolume>, RemapError> {
        let (old, new) = (self.old, self.new);
        let tol_factor = self.config.tol_factor;
        let new_len = new.cell_length(new_cell);
        let old_len = old.cell_length(old_cell);

        let bb_tol = tol_factor * new_len.max(old_len);
        if !new.cell_bounds(new_cell).overlaps(&old.cell_bounds(old_cell), bb_tol) {
            return Ok(None);
        }

        let new_planes = new.cell_planes(new_cell);
        let old_planes = old.cell_planes(old_cell);
        let new_tol = tol_factor * new_len;
        let old_tol = tol_factor * old_len;

        let new_pts: Vec<Point> = new.cell_points(new_cell).iter().map(|&p| new.points()[p]).collect();
        if new_pts.iter().all(|&p| point_in_cell(p, &old_planes, old_tol)) {
            return Ok(Some(ConvexVolume {
                volume: new.cell_volume(new_cell),
                centre: new.cell_centre(new_cell),
            }));
        }
        let old_pts: Vec<Point> = old.cell_points(old_cell).iter().map(|&p| old.points()[p]).collect();
        if old_pts.iter().all(|&p| point_in_cell(p, &new_planes, new_tol)) {
            return Ok(Some(ConvexVolume {
                volume: old.cell_volume(old_cell),
                centre: old.cell_centre(old_cell),
            }));
        }

        let degenerate = |volume: f64| RemapError::GeometryDegenerate {
            new_cell,
            old_cell,
            volume,
        };
        let tet_tol = tol_factor * new_len.min(old_len);
        let new_tets = new.cell_tets(new_cell);
        let mut volume = 0.;
        let mut moment = Vector::zero();
        let mut sliver: Option<f64> = None;

        for [p0, p1, p2, p3] in old.cell_tets(old_cell) {
            if [p0, p1, p2, p3].iter().all(|&p| point_in_cell(p, &new_planes, new_tol)) {
                let tet_volume = tetrahedron_signed_volume(p0, p1, p2, p3);
                volume += tet_volume;
                moment = moment + tetrahedron_centroid(p0, p1, p2, p3).to_vector() * tet_volume;
                continue;
            }
            for new_tet in &new_tets {
                match tetrahedra_intersection(&[p0, p1, p2, p3], new_tet, tet_tol, self.config.tol_fraction) {
                    Ok(Some(v)) => {
                        volume += v.volume;
                        moment = moment + v.centre.to_vector() * v.volume;
                    }
                    Ok(None) => {}
                    Err(ConvexSetError::Sliver(thickness)) => {
                        sliver = Some(sliver.map_or(thickness, |t| t.max(thickness)));
                    }
                    Err(ConvexSetError::NegativeVolume(v)) => return Err(degenerate(v)),
                    Err(ConvexSetError::FaceLoop(_)) => return Err(degenerate(f64::NAN)),
                }
            }
        }

        if volume > 0. {
            return Ok(Some(ConvexVolume {
                volume,
                centre: Point::default() + moment * (1. / volume),
            }));
        }
        match sliver {
            Some(thickness) => {
                debug!(
                    "New cell {} and old cell {} meet in a sliver of thickness {:e}",
                    new_cell, old_cell, thickness
                );
                Err(degenerate(volume))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PolyMesh;
    use crate::remap::RemapConfig;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_point_predicates() {
        let old = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let new = PolyMesh::block(2, 2, 2, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let config = RemapConfig::new();
        let pair = MeshPair::new(&old, &new, &config);

        assert!(pair.point_in_cell(0, Point::new(0.5, 0.5, 0.5), Side::Old));
        assert!(pair.point_in_cell(0, Point::new(1., 1., 1.), Side::Old));
        assert!(!pair.point_in_cell(0, Point::new(1.1, 0.5, 0.5), Side::Old));
        assert!(pair.point_in_cell(7, Point::new(0.75, 0.75, 0.75), Side::New));
        assert!(!pair.point_in_cell(0, Point::new(0.75, 0.75, 0.75), Side::New));

        let face = old.cell_faces(0)[0];
        let c = old.face_centre(face);
        assert!(pair.point_in_face(face, c, Side::Old));
        let off = c + old.face_area(face) * 0.5;
        assert!(!pair.point_in_face(face, off, Side::Old));
    }

    #[test]
    fn test_segment_crosses_mesh_face() {
        let old = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let config = RemapConfig::new();
        let pair = MeshPair::new(&old, &old, &config);

        let segment = [Point::new(0.5, 0.5, 0.5), Point::new(0.5, 0.5, 2.)];
        let hits: Vec<Point> = old
            .cell_faces(0)
            .iter()
            .filter_map(|&f| pair.segment_face_intersection(segment, f, config.tol_factor, Side::Old))
            .collect();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].is_close(&Point::new(0.5, 0.5, 1.)));
    }

    #[test]
    fn test_contained_cell_shortcut() {
        let old = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let new = PolyMesh::block(2, 2, 2, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let config = RemapConfig::new();
        let pair = MeshPair::new(&old, &new, &config);

        for cell in 0..8 {
            let v = pair.cell_intersection(cell, 0).unwrap().unwrap();
            assert!(close(v.volume, 0.125));
            assert!(v.centre.is_close(&new.cell_centre(cell)));
        }

        // Reverse direction: the old cell is inside the new one
        let pair = MeshPair::new(&new, &old, &config);
        let v = pair.cell_intersection(0, 3).unwrap().unwrap();
        assert!(close(v.volume, 0.125));
        assert!(v.centre.is_close(&new.cell_centre(3)));
    }

    #[test]
    fn test_shifted_cubes_overlap() {
        let old = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let new = PolyMesh::block(1, 1, 1, Point::new(0.5, 0.25, 0.), Point::new(1.5, 1.25, 1.)).unwrap();
        let config = RemapConfig::new();
        let pair = MeshPair::new(&old, &new, &config);

        let v = pair.cell_intersection(0, 0).unwrap().unwrap();
        // Overlap is [0.5, 1] x [0.25, 1] x [0, 1]
        assert!(close(v.volume, 0.375));
        assert!(close(v.centre.x, 0.75));
        assert!(close(v.centre.y, 0.625));
        assert!(close(v.centre.z, 0.5));
    }

    #[test]
    fn test_touching_and_disjoint_cells() {
        let old = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let touching = PolyMesh::block(1, 1, 1, Point::new(1., 0., 0.), Point::new(2., 1., 1.)).unwrap();
        let far = PolyMesh::block(1, 1, 1, Point::new(3., 0., 0.), Point::new(4., 1., 1.)).unwrap();
        let config = RemapConfig::new();

        let pair = MeshPair::new(&old, &touching, &config);
        assert_eq!(pair.cell_intersection(0, 0).unwrap(), None);
        let pair = MeshPair::new(&old, &far, &config);
        assert_eq!(pair.cell_intersection(0, 0).unwrap(), None);
    }

    #[test]
    fn test_tet_in_hex_overlap() {
        // Tets of the Kuhn split against a half-size hex
        let old = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(0.5, 1., 1.)).unwrap();
        let new = PolyMesh::block_tets(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let config = RemapConfig::new();
        let pair = MeshPair::new(&old, &new, &config);

        let total: f64 = (0..new.n_cells())
            .map(|c| pair.cell_intersection(c, 0).unwrap().map_or(0., |v| v.volume))
            .sum();
        assert!(close(total, 0.5));
    }

    fn warped_block() -> PolyMesh {
        let mut mesh = PolyMesh::block(2, 2, 2, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let mut pts = mesh.points().to_vec();
        // Centre point and two mid-face points, so every cell has warped faces
        pts[13] = Point::new(0.53, 0.46, 0.52);
        pts[4] = Point::new(0.47, 0.55, 0.);
        pts[22] = Point::new(0.5, 0.54, 1.);
        mesh.move_points(pts).unwrap();
        mesh
    }

    #[test]
    fn test_warped_cell_overlaps_itself() {
        let mesh = warped_block();
        let config = RemapConfig::new();
        let pair = MeshPair::new(&mesh, &mesh, &config);

        for cell in 0..mesh.n_cells() {
            let v = pair.cell_intersection(cell, cell).unwrap().unwrap();
            assert!(close(v.volume, mesh.cell_volume(cell)), "cell {}: {}", cell, v.volume);
            let neighbours: f64 = mesh
                .cell_cells(cell)
                .iter()
                .map(|&other| pair.cell_intersection(cell, other).unwrap().map_or(0., |v| v.volume))
                .sum();
            assert!(neighbours < 1e-12, "cell {} overlaps its neighbours by {}", cell, neighbours);
        }
    }

    #[test]
    fn test_warped_cells_against_regular_block() {
        let old = warped_block();
        let new = PolyMesh::block(3, 3, 3, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let config = RemapConfig::new();
        let pair = MeshPair::new(&old, &new, &config);

        for new_cell in [0, 13, 26] {
            let total: f64 = (0..old.n_cells())
                .map(|c| pair.cell_intersection(new_cell, c).unwrap().map_or(0., |v| v.volume))
                .sum();
            assert!((total - new.cell_volume(new_cell)).abs() < 1e-8, "cell {}: {}", new_cell, total);
        }
    }

    #[test]
    fn test_sliver_overlap_is_degenerate() {
        let old = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let new = PolyMesh::block(1, 1, 1, Point::new(1. - 1e-10, 0., 0.), Point::new(2., 1., 1.)).unwrap();
        let config = RemapConfig::new();
        let pair = MeshPair::new(&old, &new, &config);

        match pair.cell_intersection(0, 0) {
            Err(RemapError::GeometryDegenerate { new_cell, old_cell, .. }) => {
                assert_eq!((new_cell, old_cell), (0, 0));
            }
            other => panic!("expected a degenerate overlap, got {:?}", other),
        }
    }
}
