//! Conservative interpolation engine.
//!
//! A [`ConservativeInterpolator`] owns the addressing tables of one mesh pair
//! and maps cell fields from the old mesh to the new one. For every new cell
//! `i` the mapped value is the overlap-weighted average
//!
//! ```text
//! new[i] = sum_j w[i][j] * old[parent[i][j]] / V[i]
//! ```
//!
//! which preserves the volume integral of the field wherever the old mesh
//! covers the new one.

use anyhow::Result;
use log::{info, warn};

use super::{AddressingTables, AssemblyReport, FieldValue, MeshPair, PatchMapper, RemapConfig, RemapError, VolField};
use crate::io::{AddressingKey, AddressingStore};
use crate::vecutils::{max, relative_error};
use crate::{PolyMesh, Vector};

pub struct ConservativeInterpolator<'a> {
    old: &'a PolyMesh,
    new: &'a PolyMesh,
    config: RemapConfig,
    tables: AddressingTables,
    report: AssemblyReport,
    from_cache: bool,
}

impl<'a> ConservativeInterpolator<'a> {
    /// Assembles the addressing tables of `old` and `new`.
    pub fn new(old: &'a PolyMesh, new: &'a PolyMesh, config: RemapConfig) -> Result<Self> {
        Self::build(old, new, config, None)
    }

    /// Like [`new`](Self::new), but reuses tables held by `store` when they
    /// were computed for the same mesh pair.
    ///
    /// Stored tables are ignored if either mesh is flagged as changed or if
    /// `force_recalculation` is set. Tables that cannot be read or do not fit
    /// the meshes are recomputed with a warning. Freshly assembled tables are saved when
    /// `write_addressing` is set.
    pub fn with_store(
        old: &'a PolyMesh,
        new: &'a PolyMesh,
        config: RemapConfig,
        store: &dyn AddressingStore,
    ) -> Result<Self> {
        Self::build(old, new, config, Some(store))
    }

    fn build(
        old: &'a PolyMesh,
        new: &'a PolyMesh,
        config: RemapConfig,
        store: Option<&dyn AddressingStore>,
    ) -> Result<Self> {
        config.validate()?;
        let key = AddressingKey::new(old, new);

        if let Some(store) = store {
            if let Some(tables) = Self::load_valid(old, new, &config, store, &key) {
                info!("Reusing stored addressing for {} new cells", tables.n_cells());
                return Ok(Self {
                    old,
                    new,
                    config,
                    tables,
                    report: AssemblyReport::default(),
                    from_cache: true,
                });
            }
        }

        let (tables, report) = super::assemble(&MeshPair::new(old, new, &config))?;

        if config.write_addressing {
            match store {
                Some(store) => store.save(&key, &tables)?,
                None => warn!("write_addressing is set but no addressing store was given"),
            }
        }

        Ok(Self {
            old,
            new,
            config,
            tables,
            report,
            from_cache: false,
        })
    }

    fn load_valid(
        old: &PolyMesh,
        new: &PolyMesh,
        config: &RemapConfig,
        store: &dyn AddressingStore,
        key: &AddressingKey,
    ) -> Option<AddressingTables> {
        if config.force_recalculation {
            info!("Recalculating addressing on request");
            return None;
        }
        if old.is_changed() || new.is_changed() {
            info!("Mesh changed, stored addressing is out of date");
            return None;
        }
        let tables = match store.load(key) {
            Ok(tables) => tables?,
            Err(e) => {
                warn!("Ignoring unreadable stored addressing: {:#}", e);
                return None;
            }
        };
        if let Err(e) = tables.validate(old.n_cells(), new.n_cells()) {
            warn!("Ignoring stored addressing: {}", e);
            return None;
        }
        Some(tables)
    }

    pub fn old_mesh(&self) -> &PolyMesh {
        self.old
    }

    pub fn new_mesh(&self) -> &PolyMesh {
        self.new
    }

    pub fn config(&self) -> &RemapConfig {
        &self.config
    }

    pub fn tables(&self) -> &AddressingTables {
        &self.tables
    }

    /// Diagnostics of the assembly. Empty when the tables came from a store.
    pub fn report(&self) -> &AssemblyReport {
        &self.report
    }

    pub fn loaded_from_cache(&self) -> bool {
        self.from_cache
    }

    pub fn patch_mapper(&self) -> PatchMapper {
        self.config.patch_mapper
    }

    pub fn total_weight(&self, new_cell: usize) -> f64 {
        self.tables.total_weight(new_cell)
    }

    /// Largest relative difference between a cell volume and its weight
    /// sum, over the new cells that have parents.
    pub fn conservation_error(&self) -> f64 {
        let errors: Vec<f64> = (0..self.tables.n_cells())
            .filter(|&cell| !self.tables.addressing[cell].is_empty())
            .map(|cell| relative_error(self.total_weight(cell), self.new.cell_volume(cell)))
            .collect();
        if errors.is_empty() { 0. } else { max(&errors) }
    }

    /// Maps the cell values of `from` into `to`.
    ///
    /// New cells without parents get zero.
    pub fn interpolate_internal_field<T: FieldValue>(&self, to: &mut [T], from: &VolField<T>) -> Result<(), RemapError> {
        self.check_size(&from.name, from.values.len(), self.old.n_cells())?;
        self.check_size(&from.name, to.len(), self.new.n_cells())?;

        let volumes = self.new.cell_volumes();
        for (cell, value) in to.iter_mut().enumerate() {
            let sum = self.tables.addressing[cell]
                .iter()
                .zip(&self.tables.weights[cell])
                .fold(T::zero(), |acc, (&parent, &w)| acc + from.values[parent] * w);
            *value = if self.tables.addressing[cell].is_empty() {
                T::zero()
            } else {
                sum * (1. / volumes[cell])
            };
        }
        Ok(())
    }

    /// Maps `from` into the cell values of `to`. Patch values of `to` are
    /// left untouched.
    pub fn interpolate_into<T: FieldValue>(&self, to: &mut VolField<T>, from: &VolField<T>) -> Result<(), RemapError> {
        self.interpolate_internal_field(&mut to.values, from)
    }

    /// Same as [`interpolate_into`](Self::interpolate_into), consuming a
    /// temporary source field.
    pub fn interpolate_into_owned<T: FieldValue>(&self, to: &mut VolField<T>, from: VolField<T>) -> Result<(), RemapError> {
        self.interpolate_into(to, &from)
    }

    /// Returns `from` mapped onto the new mesh.
    ///
    /// Boundary patches go through the configured [`PatchMapper`].
    pub fn interpolate<T: FieldValue>(&self, from: &VolField<T>) -> Result<VolField<T>, RemapError> {
        let mut values = vec![T::zero(); self.new.n_cells()];
        self.interpolate_internal_field(&mut values, from)?;
        let mapper = self.patch_mapper();
        Ok(VolField {
            name: from.name.clone(),
            values,
            patches: from.patches.iter().map(|p| mapper.map_patch(p)).collect(),
        })
    }

    /// Same as [`interpolate`](Self::interpolate), consuming a temporary
    /// source field.
    pub fn interpolate_owned<T: FieldValue>(&self, from: VolField<T>) -> Result<VolField<T>, RemapError> {
        self.interpolate(&from)
    }

    /// Maps a scalar field using its cell gradients on the old mesh.
    ///
    /// Each overlap contributes the old value extrapolated to the overlap
    /// centroid. The integral is preserved for fully covered old cells.
    pub fn interpolate_scalar_linear(
        &self,
        from: &VolField<f64>,
        gradients: &[Vector],
    ) -> Result<VolField<f64>, RemapError> {
        let n_old = self.old.n_cells();
        self.check_size(&from.name, from.values.len(), n_old)?;
        self.check_size(&format!("grad({})", from.name), gradients.len(), n_old)?;

        let volumes = self.new.cell_volumes();
        let values = (0..self.new.n_cells())
            .map(|cell| {
                if self.tables.addressing[cell].is_empty() {
                    return 0.;
                }
                let sum: f64 = self.tables.addressing[cell]
                    .iter()
                    .zip(&self.tables.weights[cell])
                    .zip(&self.tables.centres[cell])
                    .map(|((&parent, &w), &c)| {
                        let offset = c - self.old.cell_centre(parent);
                        w * (from.values[parent] + gradients[parent].dot(offset))
                    })
                    .sum();
                sum / volumes[cell]
            })
            .collect();

        Ok(VolField::new(&from.name, values))
    }

    fn check_size(&self, field: &str, actual: usize, expected: usize) -> Result<(), RemapError> {
        if actual != expected {
            return Err(RemapError::SizeMismatch {
                field: field.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}
