use anyhow::{Result, anyhow};

use crate::remap::field::PatchMapper;

/// Settings of the conservative interpolation engine.
#[derive(Debug, Clone)]
pub struct RemapConfig {
    // Assembly
    /// Worker threads used to assemble the addressing tables.
    pub num_threads: usize,
    /// Ignore persisted addressing even when it matches the meshes.
    pub force_recalculation: bool,
    /// Persist the addressing tables after assembly.
    pub write_addressing: bool,

    // Tolerances
    /// Relative tolerance of the convex-set volume routine (point merging,
    /// coplanarity and negligible tetrahedra), scaled by the set size.
    pub tol_fraction: f64,
    /// Relative tolerance of point-in-cell, point-in-face and segment-face
    /// tests, scaled by the length of the cell or face being tested.
    pub tol_factor: f64,
    /// Accepted relative error between a cell volume and its weight sum.
    pub conservation_tol: f64,

    // Candidate search
    /// Initial scale of old-cell bounding boxes in the candidate search.
    pub search_factor: f64,
    /// Multiplier applied to the search factor when the seed cell fails.
    pub search_growth: f64,
    /// How many times the search factor may grow before giving up.
    pub max_search_growths: usize,
    /// Retries with an enlarged search factor after a conservation mismatch.
    pub max_weight_retries: usize,

    // Boundary
    pub patch_mapper: PatchMapper,
}

impl RemapConfig {
    pub fn new() -> Self {
        Self {
            num_threads: 1,
            force_recalculation: false,
            write_addressing: false,
            tol_fraction: 1e-8,
            tol_factor: 1e-8,
            conservation_tol: 1e-6,
            search_factor: 1.0,
            search_growth: 2.0,
            max_search_growths: 6,
            max_weight_retries: 2,
            patch_mapper: PatchMapper::Null,
        }
    }

    /// Checks that the settings can drive an assembly.
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(anyhow!("num_threads must be at least 1"));
        }
        for (name, value) in [
            ("tol_fraction", self.tol_fraction),
            ("tol_factor", self.tol_factor),
            ("conservation_tol", self.conservation_tol),
        ] {
            if !(value > 0.) {
                return Err(anyhow!("{} must be positive, got {}", name, value));
            }
        }
        if !(self.search_factor >= 1.) {
            return Err(anyhow!(
                "search_factor must be at least 1, got {}",
                self.search_factor
            ));
        }
        if !(self.search_growth > 1.) {
            return Err(anyhow!(
                "search_growth must exceed 1, got {}",
                self.search_growth
            ));
        }
        Ok(())
    }
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RemapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_threads, 1);
        assert!(!config.force_recalculation);
        assert!(!config.write_addressing);
    }

    #[test]
    fn test_invalid_settings() {
        let mut config = RemapConfig::new();
        config.num_threads = 0;
        assert!(config.validate().is_err());

        let mut config = RemapConfig::new();
        config.tol_factor = 0.;
        assert!(config.validate().is_err());

        let mut config = RemapConfig::new();
        config.conservation_tol = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = RemapConfig::new();
        config.search_factor = 0.5;
        assert!(config.validate().is_err());

        let mut config = RemapConfig::new();
        config.search_growth = 1.;
        assert!(config.validate().is_err());
    }
}
