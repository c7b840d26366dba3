//! Parallel assembly of the addressing tables.
//!
//! New cells are split into `num_threads` contiguous ranges. Each range is
//! processed by one task of a dedicated rayon pool and writes only to its own
//! slice of the tables, so no locking is needed. Parents of every cell are
//! sorted by old-cell index, which makes the result independent of the
//! thread count.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rayon::prelude::*;

use super::weights::WeightOutcome;
use super::{AddressingTables, MeshPair, RemapError};
use crate::Point;
use crate::mesh::CellGrid;
use crate::vecutils;

/// Diagnostics collected while assembling the addressing tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyReport {
    /// New cells left without parents.
    pub search_exhausted: Vec<usize>,
    /// Cells whose weights still missed their volume after all retries.
    pub conservation: Vec<RemapError>,
    /// Cell pairs whose overlap was dropped as degenerate.
    pub degenerate: Vec<RemapError>,
}

impl AssemblyReport {
    pub fn is_clean(&self) -> bool {
        self.search_exhausted.is_empty() && self.conservation.is_empty() && self.degenerate.is_empty()
    }

    /// Largest relative conservation error among the reported cells.
    pub fn max_conservation_error(&self) -> f64 {
        let errors: Vec<f64> = self
            .conservation
            .iter()
            .filter_map(|e| match e {
                RemapError::ConservationMismatch { rel_error, .. } => Some(*rel_error),
                _ => None,
            })
            .collect();
        if errors.is_empty() { 0. } else { vecutils::max(&errors) }
    }

    fn merge(&mut self, other: AssemblyReport) {
        self.search_exhausted.extend(other.search_exhausted);
        self.conservation.extend(other.conservation);
        self.degenerate.extend(other.degenerate);
    }
}

/// Computes parents, weights and centroids of every new cell.
pub fn assemble(pair: &MeshPair) -> Result<(AddressingTables, AssemblyReport)> {
    let n_cells = pair.new.n_cells();
    let num_threads = pair.config.num_threads.max(1);
    info!(
        "Assembling conservative addressing: {} old cells, {} new cells, {} threads",
        pair.old.n_cells(),
        n_cells,
        num_threads
    );

    let mut tables = AddressingTables::with_cells(n_cells);
    if n_cells == 0 {
        return Ok((tables, AssemblyReport::default()));
    }

    // Fill the lazy geometry before the workers share the meshes
    pair.old.cell_volumes();
    pair.new.cell_volumes();
    let grid = CellGrid::new(pair.old);

    let chunk = n_cells.div_ceil(num_threads);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .context("Failed to build the assembly thread pool")?;

    let reports: Vec<AssemblyReport> = pool.install(|| {
        tables
            .addressing
            .par_chunks_mut(chunk)
            .zip(tables.weights.par_chunks_mut(chunk))
            .zip(tables.centres.par_chunks_mut(chunk))
            .enumerate()
            .map(|(i, ((addressing, weights), centres))| {
                calc_range(pair, &grid, i * chunk, addressing, weights, centres)
            })
            .collect()
    });

    let mut report = AssemblyReport::default();
    for r in reports {
        report.merge(r);
    }

    if !report.search_exhausted.is_empty() {
        warn!(
            "{} new cells have no overlapping old cells",
            report.search_exhausted.len()
        );
    }
    for e in &report.conservation {
        warn!("{}", e);
    }
    if !report.degenerate.is_empty() {
        warn!("Dropped {} degenerate cell overlaps", report.degenerate.len());
    }
    info!("Finished conservative addressing of {} new cells", n_cells);

    Ok((tables, report))
}

/// Fills the entries of new cells `start..start + addressing.len()`.
fn calc_range(
    pair: &MeshPair,
    grid: &CellGrid,
    start: usize,
    addressing: &mut [Vec<usize>],
    weights: &mut [Vec<f64>],
    centres: &mut [Vec<Point>],
) -> AssemblyReport {
    let mut report = AssemblyReport::default();

    for local in 0..addressing.len() {
        let cell = start + local;
        let seed = choose_seed(pair, grid, cell, start, addressing);
        let outcome = weigh_with_retries(pair, cell, seed);

        report.degenerate.extend(outcome.degenerate);
        match outcome.failure {
            Some(RemapError::SearchExhausted { cell }) => report.search_exhausted.push(cell),
            Some(e) => report.conservation.push(e),
            None => {}
        }
        addressing[local] = outcome.weights.parents;
        weights[local] = outcome.weights.weights;
        centres[local] = outcome.weights.centres;
    }
    report
}

/// Picks the old cell the candidate search starts from.
///
/// Prefers a parent of an already processed face neighbour in the same range
/// whose box touches the new cell. Otherwise takes the old cell with the
/// nearest centre.
fn choose_seed(pair: &MeshPair, grid: &CellGrid, cell: usize, start: usize, done: &[Vec<usize>]) -> usize {
    let new_bb = pair.new.cell_bounds(cell);
    let tol = pair.config.tol_factor * pair.new.cell_length(cell);

    for &nbr in pair.new.cell_cells(cell) {
        if nbr < start || nbr >= cell {
            continue;
        }
        for &parent in &done[nbr - start] {
            if pair.old.cell_bounds(parent).overlaps(&new_bb, tol) {
                return parent;
            }
        }
    }
    grid.find_nearest(pair.new.cell_centre(cell)).unwrap_or(0)
}

/// Weighs a cell, widening the search after each conservation mismatch.
///
/// The last attempt is kept even if it still misses.
fn weigh_with_retries(pair: &MeshPair, cell: usize, seed: usize) -> WeightOutcome {
    let volume = pair.new.cell_volume(cell);
    let mut factor = pair.config.search_factor;
    let mut outcome = pair.compute_cell_weights(cell, volume, seed, factor);

    for retry in 1..=pair.config.max_weight_retries {
        if !matches!(outcome.failure, Some(RemapError::ConservationMismatch { .. })) {
            break;
        }
        factor *= pair.config.search_growth;
        debug!(
            "Retrying new cell {} with search factor {} (attempt {})",
            cell, factor, retry
        );
        outcome = pair.compute_cell_weights(cell, volume, seed, factor);
    }
    outcome
}
