//! Neighbourhood search for old cells that may overlap a new cell.

use std::collections::{HashSet, VecDeque};

use log::debug;

use super::{MeshPair, RemapError};
use crate::geom::bboxes::BoundBox;

impl MeshPair<'_> {
    /// Collects old cells whose bounding box, scaled by `search_factor`,
    /// overlaps the bounding box of `new_cell`.
    ///
    /// The search starts at `old_candidate` and walks face neighbours
    /// breadth-first through every cell passing the test. If the seed itself
    /// fails, the factor grows by `search_growth` up to `max_search_growths`
    /// times before the search gives up.
    pub fn cell_parents(
        &self,
        new_cell: usize,
        search_factor: f64,
        old_candidate: usize,
    ) -> Result<Vec<usize>, RemapError> {
        if old_candidate >= self.old.n_cells() {
            return Err(RemapError::SearchExhausted { cell: new_cell });
        }
        let new_bb = self.new.cell_bounds(new_cell);
        let tol = self.config.tol_factor * self.new.cell_length(new_cell);

        let mut factor = search_factor;
        for growth in 0..=self.config.max_search_growths {
            if self.passes(old_candidate, &new_bb, factor, tol) {
                return Ok(self.expand(old_candidate, &new_bb, factor, tol));
            }
            debug!(
                "Seed {} misses new cell {} at search factor {} (growth {})",
                old_candidate, new_cell, factor, growth
            );
            factor *= self.config.search_growth;
        }
        Err(RemapError::SearchExhausted { cell: new_cell })
    }

    fn passes(&self, old_cell: usize, new_bb: &BoundBox, factor: f64, tol: f64) -> bool {
        self.old.cell_bounds(old_cell).scaled(factor).overlaps(new_bb, tol)
    }

    fn expand(&self, seed: usize, new_bb: &BoundBox, factor: f64, tol: f64) -> Vec<usize> {
        let mut parents = vec![seed];
        let mut visited: HashSet<usize> = HashSet::from([seed]);
        let mut queue: VecDeque<usize> = VecDeque::from([seed]);

        while let Some(cell) = queue.pop_front() {
            for &nbr in self.old.cell_cells(cell) {
                if !visited.insert(nbr) {
                    continue;
                }
                if self.passes(nbr, new_bb, factor, tol) {
                    parents.push(nbr);
                    queue.push_back(nbr);
                }
            }
        }
        parents
    }
}
