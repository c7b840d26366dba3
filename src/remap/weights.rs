//! Per-cell overlap weights and the addressing tables built from them.

use anyhow::{Result, anyhow};
use log::debug;
use serde::{Deserialize, Serialize};

use super::{MeshPair, RemapError};
use crate::Point;
use crate::vecutils::relative_error;

/// Overlaps of one new cell with its parent old cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellWeights {
    pub parents: Vec<usize>,
    /// Overlap volume with each parent.
    pub weights: Vec<f64>,
    /// Overlap centroid with each parent.
    pub centres: Vec<Point>,
}

impl CellWeights {
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    fn push(&mut self, parent: usize, weight: f64, centre: Point) {
        self.parents.push(parent);
        self.weights.push(weight);
        self.centres.push(centre);
    }

    /// Orders the entries by parent index.
    fn sort_by_parent(&mut self) {
        let mut order: Vec<usize> = (0..self.parents.len()).collect();
        order.sort_by_key(|&i| self.parents[i]);
        self.parents = order.iter().map(|&i| self.parents[i]).collect();
        self.weights = order.iter().map(|&i| self.weights[i]).collect();
        self.centres = order.iter().map(|&i| self.centres[i]).collect();
    }
}

/// Result of weighting a single new cell.
#[derive(Debug, Clone, Default)]
pub struct WeightOutcome {
    pub weights: CellWeights,
    /// Overlaps dropped as [`RemapError::GeometryDegenerate`].
    pub degenerate: Vec<RemapError>,
    /// Search or conservation failure of the cell.
    pub failure: Option<RemapError>,
}

impl MeshPair<'_> {
    /// Finds the parents of `new_cell` and their overlap volumes and centroids.
    ///
    /// Parents are ordered by old-cell index. The weight sum is checked
    /// against `new_volume`; a relative difference of `conservation_tol` or
    /// more is reported in [`WeightOutcome::failure`] together with the
    /// weights found so far.
    pub fn compute_cell_weights(
        &self,
        new_cell: usize,
        new_volume: f64,
        old_candidate: usize,
        search_factor: f64,
    ) -> WeightOutcome {
        let mut outcome = WeightOutcome::default();

        let candidates = match self.cell_parents(new_cell, search_factor, old_candidate) {
            Ok(candidates) => candidates,
            Err(e) => {
                outcome.failure = Some(e);
                return outcome;
            }
        };

        for old_cell in candidates {
            match self.cell_intersection(new_cell, old_cell) {
                Ok(Some(v)) if v.volume > 0. => outcome.weights.push(old_cell, v.volume, v.centre),
                Ok(_) => {}
                Err(e) => {
                    debug!("Dropping overlap: {}", e);
                    outcome.degenerate.push(e);
                }
            }
        }
        outcome.weights.sort_by_parent();

        if outcome.weights.is_empty() {
            outcome.failure = Some(RemapError::SearchExhausted { cell: new_cell });
            return outcome;
        }

        let actual = outcome.weights.total();
        let rel_error = relative_error(actual, new_volume);
        if !(rel_error < self.config.conservation_tol) {
            outcome.failure = Some(RemapError::ConservationMismatch {
                cell: new_cell,
                expected: new_volume,
                actual,
                rel_error,
            });
        }
        outcome
    }
}

/// Parent addressing, overlap volumes and overlap centroids of every new cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressingTables {
    pub addressing: Vec<Vec<usize>>,
    pub weights: Vec<Vec<f64>>,
    pub centres: Vec<Vec<Point>>,
}

impl AddressingTables {
    /// Empty entries for `n_cells` new cells.
    pub fn with_cells(n_cells: usize) -> Self {
        Self {
            addressing: vec![Vec::new(); n_cells],
            weights: vec![Vec::new(); n_cells],
            centres: vec![Vec::new(); n_cells],
        }
    }

    pub fn n_cells(&self) -> usize {
        self.addressing.len()
    }

    pub fn cell(&self, new_cell: usize) -> CellWeights {
        CellWeights {
            parents: self.addressing[new_cell].clone(),
            weights: self.weights[new_cell].clone(),
            centres: self.centres[new_cell].clone(),
        }
    }

    pub fn set_cell(&mut self, new_cell: usize, cell: CellWeights) {
        self.addressing[new_cell] = cell.parents;
        self.weights[new_cell] = cell.weights;
        self.centres[new_cell] = cell.centres;
    }

    /// Sum of the weights of `new_cell`.
    pub fn total_weight(&self, new_cell: usize) -> f64 {
        self.weights[new_cell].iter().sum()
    }

    /// Checks the tables against the sizes of the meshes they should address.
    pub fn validate(&self, n_old_cells: usize, n_new_cells: usize) -> Result<()> {
        let n = self.n_cells();
        if n != n_new_cells || self.weights.len() != n || self.centres.len() != n {
            return Err(anyhow!(
                "Addressing tables sized {}/{}/{} do not match {} new cells",
                n,
                self.weights.len(),
                self.centres.len(),
                n_new_cells
            ));
        }
        for cell in 0..n {
            let n_parents = self.addressing[cell].len();
            if self.weights[cell].len() != n_parents || self.centres[cell].len() != n_parents {
                return Err(anyhow!("Ragged addressing entry for new cell {}", cell));
            }
            if let Some(&p) = self.addressing[cell].iter().find(|&&p| p >= n_old_cells) {
                return Err(anyhow!("New cell {} refers to missing old cell {}", cell, p));
            }
            if self.weights[cell].iter().any(|w| !(*w >= 0.)) {
                return Err(anyhow!("New cell {} has a negative weight", cell));
            }
        }
        Ok(())
    }
}
