//! Mesh construction from cell descriptions.

use super::PolyMesh;
use crate::Point;
use crate::geom::tetrahedron::tetrahedron_signed_volume;
use anyhow::{Result, anyhow};
use std::collections::HashMap;

impl PolyMesh {
    /// Builds a mesh from cells given as lists of face loops.
    ///
    /// Each face loop must be ordered so that its normal points out of the
    /// cell. A face shared by two cells is stored once, owned by the cell
    /// with the lower index. Faces shared by more than two cells are rejected.
    pub fn from_cells(points: Vec<Point>, cells: &[Vec<Vec<usize>>]) -> Result<Self> {
        let mut faces: Vec<Vec<usize>> = Vec::new();
        let mut owner: Vec<usize> = Vec::new();
        let mut neighbour: Vec<Option<usize>> = Vec::new();
        let mut pending: HashMap<Vec<usize>, usize> = HashMap::new();

        for (cell_idx, cell) in cells.iter().enumerate() {
            if cell.len() < 4 {
                return Err(anyhow!("Cell {} has fewer than 4 faces", cell_idx));
            }
            for face in cell {
                let key = sorted_face_key(face);
                match pending.get(&key) {
                    Some(&f) => {
                        if neighbour[f].is_some() || owner[f] == cell_idx {
                            return Err(anyhow!(
                                "Non-manifold mesh: face {:?} is shared by more than 2 cells",
                                key
                            ));
                        }
                        neighbour[f] = Some(cell_idx);
                    }
                    None => {
                        pending.insert(key, faces.len());
                        faces.push(face.clone());
                        owner.push(cell_idx);
                        neighbour.push(None);
                    }
                }
            }
        }

        Self::new(points, faces, owner, neighbour)
    }

    /// Hexahedral block mesh of `nx * ny * nz` cells spanning `min`..`max`.
    ///
    /// Cells are numbered with `x` varying fastest.
    pub fn block(nx: usize, ny: usize, nz: usize, min: Point, max: Point) -> Result<Self> {
        let (points, hexes) = block_points_and_hexes(nx, ny, nz, min, max)?;
        let cells: Vec<Vec<Vec<usize>>> = hexes.iter().map(hex_faces).collect();
        Self::from_cells(points, &cells)
    }

    /// The block mesh of [`PolyMesh::block`] with every hexahedron split
    /// into six tetrahedra around its main diagonal.
    pub fn block_tets(nx: usize, ny: usize, nz: usize, min: Point, max: Point) -> Result<Self> {
        let (points, hexes) = block_points_and_hexes(nx, ny, nz, min, max)?;
        let mut cells: Vec<Vec<Vec<usize>>> = Vec::with_capacity(6 * hexes.len());
        for h in &hexes {
            let tets = [
                [h[0], h[1], h[2], h[6]],
                [h[0], h[2], h[3], h[6]],
                [h[0], h[3], h[7], h[6]],
                [h[0], h[7], h[4], h[6]],
                [h[0], h[4], h[5], h[6]],
                [h[0], h[5], h[1], h[6]],
            ];
            for tet in tets {
                cells.push(tet_faces(tet, &points));
            }
        }
        Self::from_cells(points, &cells)
    }
}

fn block_points_and_hexes(
    nx: usize,
    ny: usize,
    nz: usize,
    min: Point,
    max: Point,
) -> Result<(Vec<Point>, Vec<[usize; 8]>)> {
    if nx == 0 || ny == 0 || nz == 0 {
        return Err(anyhow!("Block needs at least one cell per direction"));
    }
    if !(max.x > min.x && max.y > min.y && max.z > min.z) {
        return Err(anyhow!("Block max corner {} must exceed min corner {}", max, min));
    }

    let mut points = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                points.push(Point::new(
                    min.x + (max.x - min.x) * i as f64 / nx as f64,
                    min.y + (max.y - min.y) * j as f64 / ny as f64,
                    min.z + (max.z - min.z) * k as f64 / nz as f64,
                ));
            }
        }
    }

    let pid = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);
    let mut hexes = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                hexes.push([
                    pid(i, j, k),
                    pid(i + 1, j, k),
                    pid(i + 1, j + 1, k),
                    pid(i, j + 1, k),
                    pid(i, j, k + 1),
                    pid(i + 1, j, k + 1),
                    pid(i + 1, j + 1, k + 1),
                    pid(i, j + 1, k + 1),
                ]);
            }
        }
    }
    Ok((points, hexes))
}

/// Outward face loops of a hexahedron with corners ordered bottom then top,
/// counter-clockwise seen from above.
fn hex_faces(h: &[usize; 8]) -> Vec<Vec<usize>> {
    vec![
        vec![h[0], h[3], h[2], h[1]], // bottom
        vec![h[0], h[1], h[5], h[4]], // ymin
        vec![h[1], h[2], h[6], h[5]], // xmax
        vec![h[3], h[7], h[6], h[2]], // ymax
        vec![h[0], h[4], h[7], h[3]], // xmin
        vec![h[4], h[5], h[6], h[7]], // top
    ]
}

/// Outward face loops of a tetrahedron, whatever its vertex order.
fn tet_faces(t: [usize; 4], points: &[Point]) -> Vec<Vec<usize>> {
    let [a, b, c, d] = t;
    let positive = tetrahedron_signed_volume(points[a], points[b], points[c], points[d]) > 0.;
    let (b, c) = if positive { (b, c) } else { (c, b) };
    vec![vec![a, c, b], vec![a, b, d], vec![a, d, c], vec![b, c, d]]
}

fn sorted_face_key(face: &[usize]) -> Vec<usize> {
    let mut key = face.to_vec();
    key.sort_unstable();
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_volumes() {
        let mesh = PolyMesh::block(3, 2, 1, Point::new(0., 0., 0.), Point::new(3., 1., 0.5)).unwrap();
        assert_eq!(mesh.n_cells(), 6);
        let total: f64 = mesh.cell_volumes().iter().sum();
        assert!((total - 1.5).abs() < 1e-12);
        for v in mesh.cell_volumes() {
            assert!((v - 0.25).abs() < 1e-12);
        }
        // Cell 1 is the second along x
        assert!(mesh.cell_centre(1).is_close(&Point::new(1.5, 0.25, 0.25)));
    }

    #[test]
    fn test_block_tets_volumes() {
        let mesh = PolyMesh::block_tets(2, 2, 2, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        assert_eq!(mesh.n_cells(), 48);
        let total: f64 = mesh.cell_volumes().iter().sum();
        assert!((total - 1.).abs() < 1e-12);
        for v in mesh.cell_volumes() {
            assert!((v - 1. / 48.).abs() < 1e-12, "volume={v}");
        }
        // Conforming split: every face is shared by at most 2 tets and every
        // tet is connected to at least one other
        for cell in 0..mesh.n_cells() {
            assert_eq!(mesh.cell_faces(cell).len(), 4);
            assert!(!mesh.cell_cells(cell).is_empty());
        }
    }

    #[test]
    fn test_from_cells_rejects_non_manifold() {
        let points = vec![
            Point::new(0., 0., 0.),
            Point::new(1., 0., 0.),
            Point::new(0., 1., 0.),
            Point::new(0., 0., 1.),
            Point::new(0., 0., -1.),
            Point::new(0., 0., 2.),
        ];
        let cells: Vec<Vec<Vec<usize>>> = [[0, 1, 2, 3], [0, 1, 2, 4], [0, 1, 2, 5]]
            .into_iter()
            .map(|t| tet_faces(t, &points))
            .collect();
        let err = PolyMesh::from_cells(points, &cells).unwrap_err();
        assert!(err.to_string().contains("Non-manifold"));
    }

    #[test]
    fn test_block_rejects_bad_input() {
        let o = Point::new(0., 0., 0.);
        assert!(PolyMesh::block(0, 1, 1, o, Point::new(1., 1., 1.)).is_err());
        assert!(PolyMesh::block(1, 1, 1, o, Point::new(1., 0., 1.)).is_err());
    }
}
