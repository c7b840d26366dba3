//! Polyhedral finite-volume mesh.
//!
//! Faces are ordered point loops whose right-hand normal points out of the
//! owner cell. Internal faces also have a neighbour cell. Everything derived
//! from this description (cell connectivity and geometry) is computed on
//! first access and cached until the mesh is changed through `&mut self`.

pub mod builder;
pub mod cell_grid;

use crate::geom::bboxes::BoundBox;
use crate::geom::face::{face_centre_and_area, fan_triangles, triangle_plane};
use crate::geom::tetrahedron::{tetrahedron_centroid, tetrahedron_signed_volume};
use crate::{Point, Vector};
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

pub use cell_grid::CellGrid;

/// Size signature of a mesh, used to key persisted addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeshSignature {
    pub n_points: usize,
    pub n_faces: usize,
    pub n_cells: usize,
}

#[derive(Debug, Clone)]
struct CellTopology {
    cell_faces: Vec<Vec<usize>>,
    cell_points: Vec<Vec<usize>>,
    cell_edges: Vec<Vec<[usize; 2]>>,
    cell_cells: Vec<Vec<usize>>,
}

#[derive(Debug, Clone)]
struct MeshGeometry {
    face_centres: Vec<Point>,
    face_areas: Vec<Vector>,
    cell_centres: Vec<Point>,
    cell_volumes: Vec<f64>,
    cell_bounds: Vec<BoundBox>,
}

#[derive(Debug, Clone)]
pub struct PolyMesh {
    points: Vec<Point>,
    faces: Vec<Vec<usize>>,
    owner: Vec<usize>,
    neighbour: Vec<Option<usize>>,
    n_cells: usize,
    changed: bool,
    topology: OnceLock<CellTopology>,
    geometry: OnceLock<MeshGeometry>,
}

impl PolyMesh {
    /// Creates a mesh from points, face loops and face-cell addressing.
    ///
    /// The number of cells is one more than the largest cell index used.
    pub fn new(
        points: Vec<Point>,
        faces: Vec<Vec<usize>>,
        owner: Vec<usize>,
        neighbour: Vec<Option<usize>>,
    ) -> Result<Self> {
        if faces.len() != owner.len() || faces.len() != neighbour.len() {
            return Err(anyhow!(
                "Face count mismatch: {} faces, {} owners, {} neighbours",
                faces.len(),
                owner.len(),
                neighbour.len()
            ));
        }
        for (i, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(anyhow!("Face {} has fewer than 3 points", i));
            }
            if let Some(&p) = face.iter().find(|p| **p >= points.len()) {
                return Err(anyhow!("Face {} refers to missing point {}", i, p));
            }
            if neighbour[i] == Some(owner[i]) {
                return Err(anyhow!("Face {} has the same owner and neighbour", i));
            }
        }
        let n_cells = owner
            .iter()
            .copied()
            .chain(neighbour.iter().flatten().copied())
            .max()
            .map_or(0, |c| c + 1);

        Ok(Self {
            points,
            faces,
            owner,
            neighbour,
            n_cells,
            changed: false,
            topology: OnceLock::new(),
            geometry: OnceLock::new(),
        })
    }

    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    pub fn signature(&self) -> MeshSignature {
        MeshSignature {
            n_points: self.n_points(),
            n_faces: self.n_faces(),
            n_cells: self.n_cells(),
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn face(&self, face: usize) -> &[usize] {
        &self.faces[face]
    }

    pub fn face_points(&self, face: usize) -> Vec<Point> {
        self.faces[face].iter().map(|p| self.points[*p]).collect()
    }

    pub fn owner(&self, face: usize) -> usize {
        self.owner[face]
    }

    pub fn neighbour(&self, face: usize) -> Option<usize> {
        self.neighbour[face]
    }

    /// True if the mesh was moved or flagged as changed by the host.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    pub fn set_changed(&mut self, changed: bool) {
        self.changed = changed;
    }

    /// Replaces point positions. Topology caches survive, geometry is recomputed.
    pub fn move_points(&mut self, points: Vec<Point>) -> Result<()> {
        if points.len() != self.points.len() {
            return Err(anyhow!(
                "Expected {} points, got {}",
                self.points.len(),
                points.len()
            ));
        }
        self.points = points;
        self.geometry = OnceLock::new();
        self.changed = true;
        Ok(())
    }

    /// Drops all cached connectivity and geometry.
    pub fn clear_out(&mut self) {
        self.topology = OnceLock::new();
        self.geometry = OnceLock::new();
    }

    pub fn cell_faces(&self, cell: usize) -> &[usize] {
        &self.topology().cell_faces[cell]
    }

    /// Unique points of a cell, in order of first appearance.
    pub fn cell_points(&self, cell: usize) -> &[usize] {
        &self.topology().cell_points[cell]
    }

    /// Unique edges of a cell as sorted point pairs.
    pub fn cell_edges(&self, cell: usize) -> &[[usize; 2]] {
        &self.topology().cell_edges[cell]
    }

    /// Cells sharing a face with `cell`.
    pub fn cell_cells(&self, cell: usize) -> &[usize] {
        &self.topology().cell_cells[cell]
    }

    pub fn face_centre(&self, face: usize) -> Point {
        self.geometry().face_centres[face]
    }

    /// Area vector of a face, pointing out of the owner.
    pub fn face_area(&self, face: usize) -> Vector {
        self.geometry().face_areas[face]
    }

    pub fn cell_centre(&self, cell: usize) -> Point {
        self.geometry().cell_centres[cell]
    }

    pub fn cell_volume(&self, cell: usize) -> f64 {
        self.geometry().cell_volumes[cell]
    }

    pub fn cell_volumes(&self) -> &[f64] {
        &self.geometry().cell_volumes
    }

    pub fn cell_bounds(&self, cell: usize) -> BoundBox {
        self.geometry().cell_bounds[cell]
    }

    /// Length scale of a cell (cube root of its volume).
    pub fn cell_length(&self, cell: usize) -> f64 {
        self.cell_volume(cell).abs().cbrt()
    }

    /// Triangle fan of `face` around the average of its points, following
    /// the face loop orientation.
    pub fn face_triangles(&self, face: usize) -> Vec<[Point; 3]> {
        fan_triangles(&self.face_points(face))
    }

    /// Tetrahedra filling `cell`: one per face-fan triangle, with the mean of
    /// the face centres as the shared first vertex.
    ///
    /// Their signed volumes sum to [`PolyMesh::cell_volume`] and are positive
    /// on a valid cell, also when faces are warped.
    pub fn cell_tets(&self, cell: usize) -> Vec<[Point; 4]> {
        self.fan_tets(cell, &self.geometry().face_centres)
    }

    /// Outward planes of the face-fan triangles of `cell` as
    /// `(triangle centre, unit normal)` pairs.
    ///
    /// A point on the inner side of every plane lies in the cell.
    /// Degenerate triangles are skipped.
    pub fn cell_planes(&self, cell: usize) -> Vec<(Point, Vector)> {
        self.cell_tets(cell)
            .iter()
            .filter_map(|&[_, a, b, c]| triangle_plane(&[a, b, c]))
            .collect()
    }

    fn fan_tets(&self, cell: usize, face_centres: &[Point]) -> Vec<[Point; 4]> {
        let faces = &self.topology().cell_faces[cell];
        let fc: Vec<Point> = faces.iter().map(|f| face_centres[*f]).collect();
        let apex = Point::mean(&fc);

        let mut tets = Vec::new();
        for &f in faces {
            let outward = self.owner[f] == cell;
            for [a, b, c] in fan_triangles(&self.face_points(f)) {
                tets.push(if outward { [apex, a, b, c] } else { [apex, a, c, b] });
            }
        }
        tets
    }

    fn topology(&self) -> &CellTopology {
        self.topology.get_or_init(|| self.calc_topology())
    }

    fn geometry(&self) -> &MeshGeometry {
        self.geometry.get_or_init(|| self.calc_geometry())
    }

    fn calc_topology(&self) -> CellTopology {
        let mut cell_faces: Vec<Vec<usize>> = vec![Vec::new(); self.n_cells];
        for (f, &own) in self.owner.iter().enumerate() {
            cell_faces[own].push(f);
            if let Some(nei) = self.neighbour[f] {
                cell_faces[nei].push(f);
            }
        }

        let mut cell_points = Vec::with_capacity(self.n_cells);
        let mut cell_edges = Vec::with_capacity(self.n_cells);
        let mut cell_cells = Vec::with_capacity(self.n_cells);

        for (cell, faces) in cell_faces.iter().enumerate() {
            let mut seen: HashSet<usize> = HashSet::new();
            let mut pts: Vec<usize> = Vec::new();
            let mut seen_edges: HashSet<[usize; 2]> = HashSet::new();
            let mut edges: Vec<[usize; 2]> = Vec::new();
            let mut nbrs: Vec<usize> = Vec::new();

            for &f in faces {
                let face = &self.faces[f];
                for (i, &p) in face.iter().enumerate() {
                    if seen.insert(p) {
                        pts.push(p);
                    }
                    let q = face[(i + 1) % face.len()];
                    let edge = if p < q { [p, q] } else { [q, p] };
                    if seen_edges.insert(edge) {
                        edges.push(edge);
                    }
                }
                let other = if self.owner[f] == cell {
                    self.neighbour[f]
                } else {
                    Some(self.owner[f])
                };
                if let Some(c) = other {
                    if !nbrs.contains(&c) {
                        nbrs.push(c);
                    }
                }
            }
            cell_points.push(pts);
            cell_edges.push(edges);
            cell_cells.push(nbrs);
        }

        CellTopology {
            cell_faces,
            cell_points,
            cell_edges,
            cell_cells,
        }
    }

    fn calc_geometry(&self) -> MeshGeometry {
        let (face_centres, face_areas): (Vec<Point>, Vec<Vector>) = (0..self.n_faces())
            .map(|f| face_centre_and_area(&self.face_points(f)))
            .unzip();

        let topo = self.topology();
        let mut cell_centres = Vec::with_capacity(self.n_cells);
        let mut cell_volumes = Vec::with_capacity(self.n_cells);
        let mut cell_bounds = Vec::with_capacity(self.n_cells);

        for cell in 0..self.n_cells {
            let pts: Vec<Point> = topo.cell_points[cell]
                .iter()
                .map(|p| self.points[*p])
                .collect();

            // Face-fan tetrahedra about the mean face centre
            let mut volume = 0.;
            let mut moment = Vector::zero();
            for [a, b, c, d] in self.fan_tets(cell, &face_centres) {
                let tet_volume = tetrahedron_signed_volume(a, b, c, d);
                volume += tet_volume;
                moment = moment + tetrahedron_centroid(a, b, c, d).to_vector() * tet_volume;
            }
            let centre = if volume.abs() > f64::MIN_POSITIVE {
                Point::default() + moment * (1. / volume)
            } else {
                Point::mean(&pts)
            };
            cell_centres.push(centre);
            cell_volumes.push(volume);

            cell_bounds.push(BoundBox::from_points(&pts));
        }

        MeshGeometry {
            face_centres,
            face_areas,
            cell_centres,
            cell_volumes,
            cell_bounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cube_cell() {
        let mesh = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        assert_eq!(mesh.n_cells(), 1);
        assert_eq!(mesh.n_faces(), 6);
        assert_eq!(mesh.n_points(), 8);
        assert!((mesh.cell_volume(0) - 1.).abs() < 1e-14);
        assert!(mesh.cell_centre(0).is_close(&Point::new(0.5, 0.5, 0.5)));
        assert_eq!(mesh.cell_points(0).len(), 8);
        assert_eq!(mesh.cell_edges(0).len(), 12);
        assert!(mesh.cell_cells(0).is_empty());
        assert_eq!(mesh.cell_planes(0).len(), 24);
        assert_eq!(mesh.cell_tets(0).len(), 24);
    }

    #[test]
    fn test_outward_normals() {
        let mesh = PolyMesh::block(2, 1, 1, Point::new(0., 0., 0.), Point::new(2., 1., 1.)).unwrap();
        for cell in 0..mesh.n_cells() {
            let c = mesh.cell_centre(cell);
            for (fc, n) in mesh.cell_planes(cell) {
                assert!((fc - c).dot(n) > 0., "inward normal on cell {cell}");
            }
        }
        assert_eq!(mesh.cell_cells(0), &[1]);
        assert_eq!(mesh.cell_cells(1), &[0]);
    }

    #[test]
    fn test_warped_cell_tets() {
        let mut mesh = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let mut pts = mesh.points().to_vec();
        pts[7] = Point::new(1.1, 0.95, 1.05);
        pts[2] = Point::new(0.02, 1.03, -0.04);
        mesh.move_points(pts).unwrap();

        let tets = mesh.cell_tets(0);
        assert_eq!(tets.len(), 24);
        let mut total = 0.;
        for &[a, b, c, d] in &tets {
            let v = tetrahedron_signed_volume(a, b, c, d);
            assert!(v > 0.);
            total += v;
        }
        assert!((total - mesh.cell_volume(0)).abs() < 1e-14);

        let c = mesh.cell_centre(0);
        for (pc, n) in mesh.cell_planes(0) {
            assert!((c - pc).dot(n) < 0.);
        }
    }

    #[test]
    fn test_new_rejects_bad_faces() {
        let pts = vec![
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(0., 1., 0.),
        ];
        assert!(PolyMesh::new(pts.clone(), vec![vec![0, 1]], vec![0], vec![None]).is_err());
        assert!(PolyMesh::new(pts.clone(), vec![vec![0, 1, 5]], vec![0], vec![None]).is_err());
        assert!(PolyMesh::new(pts.clone(), vec![vec![0, 1, 2]], vec![0], vec![Some(0)]).is_err());
        assert!(PolyMesh::new(pts, vec![vec![0, 1, 2]], vec![0, 1], vec![None]).is_err());
    }

    #[test]
    fn test_move_points_invalidates_geometry() {
        let mut mesh = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        assert!((mesh.cell_volume(0) - 1.).abs() < 1e-14);
        assert!(!mesh.is_changed());

        let scaled: Vec<Point> = mesh.points().iter().map(|p| p.scale(2.)).collect();
        mesh.move_points(scaled).unwrap();
        assert!((mesh.cell_volume(0) - 8.).abs() < 1e-12);
        assert!(mesh.is_changed());
        assert!(mesh.move_points(vec![]).is_err());

        mesh.set_changed(false);
        mesh.clear_out();
        assert!(!mesh.is_changed());
        assert_eq!(mesh.cell_faces(0).len(), 6);
    }

    #[test]
    fn test_signature() {
        let mesh = PolyMesh::block(2, 2, 2, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let sig = mesh.signature();
        assert_eq!(sig.n_cells, 8);
        assert_eq!(sig.n_points, 27);
        assert_eq!(sig.n_faces, 36);
    }
}
