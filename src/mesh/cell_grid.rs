use std::collections::HashMap;

use super::PolyMesh;
use crate::Point;

/// Uniform bins of cell centres for nearest-cell queries.
pub struct CellGrid {
    grid: HashMap<(i64, i64, i64), Vec<usize>>,
    centres: Vec<Point>,
    step: f64,
}

impl CellGrid {
    /// Bins the cell centres of `mesh`. The bin size is the mean cell length.
    pub fn new(mesh: &PolyMesh) -> Self {
        let n_cells = mesh.n_cells();
        let centres: Vec<Point> = (0..n_cells).map(|c| mesh.cell_centre(c)).collect();
        let total: f64 = mesh.cell_volumes().iter().map(|v| v.abs()).sum();
        let step = if n_cells > 0 && total > 0. {
            (total / n_cells as f64).cbrt()
        } else {
            1.
        };

        let mut grid: HashMap<(i64, i64, i64), Vec<usize>> = HashMap::new();
        for (cell, c) in centres.iter().enumerate() {
            grid.entry(Self::key(*c, step)).or_default().push(cell);
        }

        Self {
            grid,
            centres,
            step,
        }
    }

    fn key(pos: Point, step: f64) -> (i64, i64, i64) {
        (
            (pos.x / step).floor() as i64,
            (pos.y / step).floor() as i64,
            (pos.z / step).floor() as i64,
        )
    }

    /// Returns the cell whose centre is nearest to `pos`.
    ///
    /// Looks in the bin containing `pos` plus its 26 neighbours first and
    /// falls back to a full scan if those are empty. Ties go to the lower
    /// cell index. Returns `None` for an empty mesh.
    pub fn find_nearest(&self, pos: Point) -> Option<usize> {
        let (ci, cj, ck) = Self::key(pos, self.step);
        let mut best: Option<(f64, usize)> = None;

        for di in -1..=1 {
            for dj in -1..=1 {
                for dk in -1..=1 {
                    if let Some(cells) = self.grid.get(&(ci + di, cj + dj, ck + dk)) {
                        for &cell in cells {
                            best = Self::closer(best, (self.centres[cell] - pos).length(), cell);
                        }
                    }
                }
            }
        }

        if best.is_none() {
            for (cell, c) in self.centres.iter().enumerate() {
                best = Self::closer(best, (*c - pos).length(), cell);
            }
        }
        best.map(|(_, cell)| cell)
    }

    fn closer(best: Option<(f64, usize)>, dist: f64, cell: usize) -> Option<(f64, usize)> {
        match best {
            Some((d, c)) if d < dist || (d == dist && c < cell) => Some((d, c)),
            _ => Some((dist, cell)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_nearest_inside() {
        let mesh = PolyMesh::block(4, 4, 4, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let grid = CellGrid::new(&mesh);
        // Cell (1, 2, 3) in x-fastest numbering
        let expected = 1 + 4 * (2 + 4 * 3);
        let found = grid.find_nearest(Point::new(0.3, 0.6, 0.8)).unwrap();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_find_nearest_far_point() {
        let mesh = PolyMesh::block(2, 2, 2, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
        let grid = CellGrid::new(&mesh);
        // Far away: the bins around the point are empty, full scan kicks in
        let found = grid.find_nearest(Point::new(100., 100., 100.)).unwrap();
        assert_eq!(found, 7);
    }
}
