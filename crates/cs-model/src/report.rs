//! Structured model report: intermediate arrays, numbers-at-size and the
//! objective breakdown in a nested, serializable form. The serialization
//! format itself (JSON, R list, ...) is the caller's concern.

use crate::likelihood::{CompDiagnostic, NllComponent};
use crate::model::Assessment;
use cs_core::dims::{
    maturity_label, sex_label, shell_label, N_MATURITY, N_SEXES, N_SHELL,
};
use cs_core::{Error, Result};
use serde::Serialize;

/// Model dimensions as reported.
#[derive(Debug, Clone, Serialize)]
pub struct DimsReport {
    /// First model year.
    pub min_year: i32,
    /// Last advanced model year.
    pub max_year: i32,
    /// Size-bin midpoints.
    pub size_mids: Vec<f64>,
    /// Fishery names.
    pub fisheries: Vec<String>,
    /// Survey names.
    pub surveys: Vec<String>,
}

/// One labeled numbers-at-size slice, flattened by category.
#[derive(Debug, Clone, Serialize)]
pub struct StateReport {
    /// Model year of the slice.
    pub year: i32,
    /// Cells as (sex, maturity, shell, values-by-size).
    pub cells: Vec<CellReport>,
}

/// One (sex, maturity, shell) row of a state slice.
#[derive(Debug, Clone, Serialize)]
pub struct CellReport {
    /// Sex label.
    pub sex: String,
    /// Maturity label.
    pub maturity: String,
    /// Shell-condition label.
    pub shell: String,
    /// Values by size bin.
    pub values: Vec<f64>,
}

/// The full report.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    /// Dimensions.
    pub dims: DimsReport,
    /// Total objective value.
    pub objective: f64,
    /// Objective breakdown.
    pub components: Vec<NllComponent>,
    /// Composition-fit diagnostics.
    pub diagnostics: Vec<CompDiagnostic>,
    /// Numbers-at-size per slice.
    pub numbers: Vec<StateReport>,
    /// Spawning (mature) biomass at mating, per year and sex.
    pub mating_biomass: Vec<Vec<f64>>,
    /// Natural mortality `[year][sex][maturity][size]`.
    pub natural_mortality: Vec<Vec<Vec<Vec<f64>>>>,
    /// Maturity ogives `[year][sex][size]`.
    pub maturity: Vec<Vec<Vec<f64>>>,
    /// Selectivity curves `[function][year][size]`.
    pub selectivity: Vec<Vec<Vec<f64>>>,
    /// Retained-mortality numbers `[fishery][year]` (totals over categories).
    pub retained_catch: Vec<Vec<f64>>,
    /// Discard-mortality numbers `[fishery][year]` (totals).
    pub discard_catch: Vec<Vec<f64>>,
    /// Survey-observable totals `[survey][year]`.
    pub survey_totals: Vec<Vec<f64>>,
}

impl ModelReport {
    /// Render as a JSON value; callers pick the final serialization target.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| Error::Evaluation(format!("report serialization failed: {e}")))
    }
}

impl Assessment {
    /// Build the full report for one parameter vector.
    pub fn report(&self, params: &[f64]) -> Result<ModelReport> {
        let run = self.run::<f64>(params)?;
        let objective = self.evaluate_full(params)?;
        let dims = &self.dims;
        let nb = dims.n_bins();

        let numbers = run
            .projection
            .numbers
            .iter()
            .enumerate()
            .map(|(yi, slice)| StateReport {
                year: dims.min_year + yi as i32,
                cells: (0..N_SEXES)
                    .flat_map(|x| {
                        (0..N_MATURITY).flat_map(move |m| {
                            (0..N_SHELL).map(move |s| (x, m, s))
                        })
                    })
                    .map(|(x, m, s)| CellReport {
                        sex: sex_label(x).to_string(),
                        maturity: maturity_label(m).to_string(),
                        shell: shell_label(s).to_string(),
                        values: (0..nb).map(|z| slice.get(x, m, s, z)).collect(),
                    })
                    .collect(),
            })
            .collect();

        let natural_mortality: Vec<Vec<Vec<Vec<f64>>>> = run
            .rates
            .natural_mortality
            .iter()
            .map(|arr| {
                (0..N_SEXES)
                    .map(|x| {
                        (0..N_MATURITY)
                            .map(|m| (0..nb).map(|z| arr.get(x, m, z)).collect())
                            .collect()
                    })
                    .collect()
            })
            .collect();

        Ok(ModelReport {
            dims: DimsReport {
                min_year: dims.min_year,
                max_year: dims.max_year,
                size_mids: dims.sizes.mids().to_vec(),
                fisheries: self.config.fisheries.clone(),
                surveys: self.config.surveys.clone(),
            },
            objective: objective.total,
            components: objective.components,
            diagnostics: objective.diagnostics,
            numbers,
            mating_biomass: run
                .projection
                .mating_biomass
                .iter()
                .map(|b| b.to_vec())
                .collect(),
            natural_mortality,
            maturity: run.rates.maturity.clone(),
            selectivity: run.rates.selectivity.clone(),
            retained_catch: run
                .projection
                .retained
                .iter()
                .map(|per_year| per_year.iter().map(|a| a.total()).collect())
                .collect(),
            discard_catch: run
                .projection
                .discarded
                .iter()
                .map(|per_year| per_year.iter().map(|a| a.total()).collect())
                .collect(),
            survey_totals: run
                .samples
                .numbers
                .iter()
                .map(|per_year| per_year.iter().map(|a| a.total()).collect())
                .collect(),
        })
    }
}
