//! Conservative cell-to-cell interpolation between two polyhedral meshes.
//!
//! # Architecture
//!
//! ```text
//! new cell ──► cell_parents() ──► candidates ──► cell_intersection() ──► tetrahedra_intersection()
//!                                                      │
//!                     compute_cell_weights() ◄─────────┘
//!                              │
//!        assemble() (static ranges on a rayon pool) ──► AddressingTables ──► interpolate()
//! ```
//!
//! The tables are computed once per mesh pair and can be persisted through
//! an [`AddressingStore`](crate::io::AddressingStore).

pub mod assembly;
pub mod candidates;
pub mod config;
pub mod error;
pub mod field;
pub mod interpolate;
pub mod intersection;
pub mod weights;

pub use assembly::{AssemblyReport, assemble};
pub use config::RemapConfig;
pub use error::RemapError;
pub use field::{FieldValue, PatchMapper, Tensor, VolField};
pub use interpolate::ConservativeInterpolator;
pub use weights::{AddressingTables, CellWeights, WeightOutcome};

use crate::PolyMesh;

/// Which of the two meshes an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

/// Read-only view of the old/new mesh pair shared by all workers.
#[derive(Debug, Clone, Copy)]
pub struct MeshPair<'a> {
    pub old: &'a PolyMesh,
    pub new: &'a PolyMesh,
    pub config: &'a RemapConfig,
}

impl<'a> MeshPair<'a> {
    pub fn new(old: &'a PolyMesh, new: &'a PolyMesh, config: &'a RemapConfig) -> Self {
        Self { old, new, config }
    }

    pub fn mesh(&self, side: Side) -> &'a PolyMesh {
        match side {
            Side::Old => self.old,
            Side::New => self.new,
        }
    }
}
