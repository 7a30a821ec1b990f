//! Observed datasets: catch, effort and survey series.
//!
//! Read-only to the core during fitting; only the self-test simulation path
//! overwrites them. Each series carries its likelihood family, fit type and
//! weight; aggregate rows carry an uncertainty with a scale type, and
//! size-composition rows carry an input (effective) sample size.

use crate::arrays::XmszArray;
use crate::units::{weight_conversion, ScaleType, WeightUnits};
use cs_core::dims::{N_MATURITY, N_SEXES, N_SHELL};
use cs_core::{Error, IndexBlock, Result};
use serde::Serialize;

/// Likelihood families for observed-vs-modeled comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LikelihoodFamily {
    /// Not fit: zero contribution.
    None,
    /// `0.5 Σ (obs − mod)²`, no σ weighting and no `ln σ` term.
    Norm2,
    /// `0.5 Σ ((obs − mod)/σ)²`, standardized residuals only.
    Normal,
    /// `0.5 Σ ((ln(obs+ε) − ln(mod+ε))/σ)²`.
    Lognormal,
    /// `−N_eff Σ obs (ln(mod+ε) − ln(obs+ε))` on renormalized compositions.
    Multinomial,
}

impl LikelihoodFamily {
    /// Parse a likelihood keyword.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "NONE" => Ok(Self::None),
            "NORM2" => Ok(Self::Norm2),
            "NORMAL" => Ok(Self::Normal),
            "LOGNORMAL" => Ok(Self::Lognormal),
            "MULTINOMIAL" => Ok(Self::Multinomial),
            _ => Err(Error::Config(format!("unrecognized likelihood type '{s}'"))),
        }
    }

    /// Keyword for this family.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Norm2 => "NORM2",
            Self::Normal => "NORMAL",
            Self::Lognormal => "LOGNORMAL",
            Self::Multinomial => "MULTINOMIAL",
        }
    }
}

/// Which (sex, maturity, shell) marginal a comparison is made on.
///
/// Each label gets a distinct variant; the original code reused one integer
/// for the last three, which is treated here as a defect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FitType {
    /// Not fit.
    None,
    /// Sum over everything.
    ByTotal,
    /// One comparison per sex.
    BySex,
    /// Size axis block-concatenated over sexes (compositions only).
    BySexExtended,
    /// One comparison per (sex, maturity).
    BySexMaturity,
    /// Size axis concatenated over (sex, maturity) (compositions only).
    BySexMaturityExtended,
    /// One comparison per (sex, shell).
    BySexShell,
    /// One comparison per (sex, maturity, shell).
    BySexMaturityShell,
}

impl FitType {
    /// Parse a fit-type keyword.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "NONE" => Ok(Self::None),
            "BY_TOTAL" => Ok(Self::ByTotal),
            "BY_SEX" => Ok(Self::BySex),
            "BY_SEX_EXTENDED" => Ok(Self::BySexExtended),
            "BY_SEX_MATURITY" => Ok(Self::BySexMaturity),
            "BY_SEX_MATURITY_EXTENDED" => Ok(Self::BySexMaturityExtended),
            "BY_SEX_SHELL_CONDITION" => Ok(Self::BySexShell),
            "BY_SEX_MATURITY_SHELL_CONDITION" => Ok(Self::BySexMaturityShell),
            _ => Err(Error::Config(format!("unrecognized fit type '{s}'"))),
        }
    }

    /// Keyword for this fit type.
    pub fn label(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::ByTotal => "BY_TOTAL",
            Self::BySex => "BY_SEX",
            Self::BySexExtended => "BY_SEX_EXTENDED",
            Self::BySexMaturity => "BY_SEX_MATURITY",
            Self::BySexMaturityExtended => "BY_SEX_MATURITY_EXTENDED",
            Self::BySexShell => "BY_SEX_SHELL_CONDITION",
            Self::BySexMaturityShell => "BY_SEX_MATURITY_SHELL_CONDITION",
        }
    }

    /// Whether this is one of the block-concatenated composition fit types.
    pub fn is_extended(&self) -> bool {
        matches!(self, Self::BySexExtended | Self::BySexMaturityExtended)
    }
}

/// Observed values at full categorical resolution for one year.
pub type CellTable = [[[f64; N_SHELL]; N_MATURITY]; N_SEXES];

/// One row of an aggregate (abundance or biomass) series.
#[derive(Debug, Clone)]
pub struct AggRow {
    /// Observation year.
    pub year: i32,
    /// Observed values by (sex, maturity, shell).
    pub values: CellTable,
    /// Uncertainty value (interpreted through `scale`).
    pub uncertainty: f64,
    /// How `uncertainty` is expressed.
    pub scale: ScaleType,
}

/// An aggregate abundance or biomass series.
#[derive(Debug, Clone)]
pub struct AggregateSeries {
    /// Fit type.
    pub fit: FitType,
    /// Likelihood family.
    pub likelihood: LikelihoodFamily,
    /// Multiplicative likelihood weight.
    pub weight: f64,
    /// Observation rows.
    pub rows: Vec<AggRow>,
}

impl AggregateSeries {
    /// Rescale every observed value (unit conversion at load time).
    pub fn rescale(&mut self, factor: f64) {
        for row in &mut self.rows {
            for plane in &mut row.values {
                for line in plane.iter_mut() {
                    for v in line.iter_mut() {
                        *v *= factor;
                    }
                }
            }
        }
    }

    /// Convert a biomass series into model units (kilograms).
    pub fn convert_weight_units(&mut self, from: WeightUnits) {
        self.rescale(weight_conversion(from, WeightUnits::Kilograms));
    }
}

/// One row of a size-composition series.
#[derive(Debug, Clone)]
pub struct SizeCompRow {
    /// Observation year.
    pub year: i32,
    /// Input (effective) sample size for the multinomial weight.
    pub sample_size: f64,
    /// Observed compositions by (sex, maturity, shell, size).
    pub comps: XmszArray<f64>,
}

/// A size-frequency series.
#[derive(Debug, Clone)]
pub struct SizeCompSeries {
    /// Fit type.
    pub fit: FitType,
    /// Likelihood family.
    pub likelihood: LikelihoodFamily,
    /// Multiplicative likelihood weight.
    pub weight: f64,
    /// Observation rows.
    pub rows: Vec<SizeCompRow>,
}

/// Observed abundance/biomass/size-frequency attached to one catch or survey
/// quantity. Any component may be absent.
#[derive(Debug, Clone, Default)]
pub struct CatchSeries {
    /// Numbers series.
    pub abundance: Option<AggregateSeries>,
    /// Biomass series (model units: kilograms).
    pub biomass: Option<AggregateSeries>,
    /// Size-frequency series.
    pub size_comps: Option<SizeCompSeries>,
}

/// Observed fishing effort for one fishery, with the reference interval used
/// for effort-ratio capture-rate averaging.
#[derive(Debug, Clone)]
pub struct EffortSeries {
    /// Interval over which to average capture rate / effort.
    pub avg_years: IndexBlock,
    rows: Vec<(i32, f64)>,
}

impl EffortSeries {
    /// New series from (year, effort) rows.
    pub fn new(avg_years: IndexBlock, rows: Vec<(i32, f64)>) -> Self {
        Self { avg_years, rows }
    }

    /// Effort for `year`, if observed.
    pub fn value(&self, year: i32) -> Option<f64> {
        self.rows.iter().find(|(y, _)| *y == year).map(|(_, e)| *e)
    }

    /// All rows.
    pub fn rows(&self) -> &[(i32, f64)] {
        &self.rows
    }
}

/// All observed data for one fishery.
#[derive(Debug, Clone)]
pub struct FisheryData {
    /// Fishery name (matches the configuration's fishery list).
    pub name: String,
    /// Effort series.
    pub effort: Option<EffortSeries>,
    /// Retained catch.
    pub retained: Option<CatchSeries>,
    /// Discard (dead) catch.
    pub discarded: Option<CatchSeries>,
    /// Total captured catch.
    pub total: Option<CatchSeries>,
}

/// All observed data for one survey.
#[derive(Debug, Clone)]
pub struct SurveyData {
    /// Survey name (matches the configuration's survey list).
    pub name: String,
    /// Observed series.
    pub series: CatchSeries,
}

/// The complete observed-data bundle.
#[derive(Debug, Clone, Default)]
pub struct ObservedData {
    /// Per-fishery data, in fishery-index order.
    pub fisheries: Vec<FisheryData>,
    /// Per-survey data, in survey-index order.
    pub surveys: Vec<SurveyData>,
}

/// Sum a [`CellTable`] over everything.
pub fn cell_total(t: &CellTable) -> f64 {
    t.iter().flatten().flatten().sum()
}
