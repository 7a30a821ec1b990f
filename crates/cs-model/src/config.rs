//! Model configuration: year range, size bins, fleet names, seasonal timing,
//! weight-at-size, penalty weights and verbosity.
//!
//! All of this is supplied by external file-parsing collaborators and is
//! immutable once the model is built.

use crate::arrays::{XmszArray, XmzArray};
use cs_core::dims::{N_MATURITY, N_SEXES};
use cs_core::{Error, ModelDims, Result, SizeGrid};

/// Verbosity switches for the calculators. Replaces the per-class static
/// debug levels of older assessment codebases; passed by reference, never
/// global.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbosity {
    /// Trace process-rate calculators.
    pub rates: bool,
    /// Trace the population projector.
    pub projection: bool,
    /// Trace likelihood assembly.
    pub likelihood: bool,
}

/// Weights for the always-on penalty terms.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyWeights {
    /// Squared-second-difference smoothness penalty on maturity logits.
    pub smoothness: f64,
    /// One-sided non-decreasing penalty on maturity logits.
    pub non_decreasing: f64,
    /// Quadratic regularization on fishery capture-rate deviations.
    pub capture_devs: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self { smoothness: 1.0, non_decreasing: 1.0, capture_devs: 1.0 }
    }
}

/// Initial numbers-at-size for the first model year.
#[derive(Debug, Clone)]
pub enum InitialState {
    /// Empty population; the stock builds up from recruitment.
    Zero,
    /// Fixed numbers-at-size supplied by configuration.
    Fixed(XmszArray<f64>),
}

/// Static model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// First model year.
    pub min_year: i32,
    /// Last advanced model year.
    pub max_year: i32,
    /// Size-bin cut points.
    pub size_cuts: Vec<f64>,
    /// Fishery names, in fishery-index order.
    pub fisheries: Vec<String>,
    /// Survey names, in survey-index order.
    pub surveys: Vec<String>,
    /// Fraction of the year elapsed at the fishing pulse, per model year.
    pub dt_fishery: Vec<f64>,
    /// Fraction of the year elapsed at mating, per model year.
    pub dt_mating: Vec<f64>,
    /// Weight-at-size (kg) by sex, maturity and size bin.
    pub weight_at_size: XmzArray<f64>,
    /// Initial numbers-at-size.
    pub initial: InitialState,
    /// Penalty weights.
    pub penalties: PenaltyWeights,
    /// Calculator verbosity.
    pub verbosity: Verbosity,
}

impl ModelConfig {
    /// Derive and validate the fixed model dimensions.
    pub fn dims(&self) -> Result<ModelDims> {
        let sizes = SizeGrid::new(self.size_cuts.clone())?;
        let dims = ModelDims::new(
            self.min_year,
            self.max_year,
            sizes,
            self.fisheries.len(),
            self.surveys.len(),
        )?;
        let ny = dims.n_years();
        if self.dt_fishery.len() != ny || self.dt_mating.len() != ny {
            return Err(Error::Config(format!(
                "seasonal timing vectors must have one entry per model year ({ny}), got {} and {}",
                self.dt_fishery.len(),
                self.dt_mating.len()
            )));
        }
        for (label, v) in [("dt_fishery", &self.dt_fishery), ("dt_mating", &self.dt_mating)] {
            if let Some(bad) = v.iter().find(|t| !(0.0..=1.0).contains(*t)) {
                return Err(Error::Config(format!(
                    "{label} entries must lie in [0,1], got {bad}"
                )));
            }
        }
        if self.weight_at_size.n_bins() != dims.n_bins() {
            return Err(Error::Config(format!(
                "weight-at-size has {} bins, model has {}",
                self.weight_at_size.n_bins(),
                dims.n_bins()
            )));
        }
        if let InitialState::Fixed(n0) = &self.initial {
            if n0.n_bins() != dims.n_bins() {
                return Err(Error::Config(format!(
                    "initial numbers-at-size has {} bins, model has {}",
                    n0.n_bins(),
                    dims.n_bins()
                )));
            }
        }
        Ok(dims)
    }

    /// Uniform weight-at-size helper (all cells `w`), mostly for tests and
    /// abundance-only configurations.
    pub fn uniform_weight(n_bins: usize, w: f64) -> XmzArray<f64> {
        let mut arr = XmzArray::zeros(n_bins);
        for x in 0..N_SEXES {
            for m in 0..N_MATURITY {
                for z in 0..n_bins {
                    arr.set(x, m, z, w);
                }
            }
        }
        arr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ModelConfig {
        ModelConfig {
            min_year: 2000,
            max_year: 2002,
            size_cuts: vec![25.0, 50.0, 75.0, 100.0],
            fisheries: vec!["pot".into()],
            surveys: vec!["trawl".into()],
            dt_fishery: vec![0.5; 3],
            dt_mating: vec![0.6; 3],
            weight_at_size: ModelConfig::uniform_weight(3, 1.0),
            initial: InitialState::Zero,
            penalties: PenaltyWeights::default(),
            verbosity: Verbosity::default(),
        }
    }

    #[test]
    fn test_dims_from_config() {
        let dims = base_config().dims().unwrap();
        assert_eq!(dims.n_years(), 3);
        assert_eq!(dims.n_bins(), 3);
        assert_eq!(dims.n_fisheries, 1);
    }

    #[test]
    fn test_rejects_bad_timing_length() {
        let mut cfg = base_config();
        cfg.dt_fishery = vec![0.5; 2];
        assert!(cfg.dims().is_err());
    }

    #[test]
    fn test_rejects_timing_outside_unit_interval() {
        let mut cfg = base_config();
        cfg.dt_mating[1] = 1.5;
        assert!(cfg.dims().is_err());
    }
}
