//! Model dimensions: sexes, maturity states, shell conditions, years, sizes.
//!
//! The categorical dimensions are fixed at two levels each; aggregates
//! ("all sexes", "all shell conditions") are handled by the fit-type
//! marginalization in the likelihood assembler, not by extra index levels.

use crate::error::{Error, Result};

/// Number of model sexes.
pub const N_SEXES: usize = 2;
/// Index of males.
pub const MALE: usize = 0;
/// Index of females.
pub const FEMALE: usize = 1;

/// Number of maturity states.
pub const N_MATURITY: usize = 2;
/// Index of the immature state.
pub const IMMATURE: usize = 0;
/// Index of the mature state.
pub const MATURE: usize = 1;

/// Number of shell conditions.
pub const N_SHELL: usize = 2;
/// Index of new-shell condition.
pub const NEW_SHELL: usize = 0;
/// Index of old-shell condition.
pub const OLD_SHELL: usize = 1;

/// Label for a sex index.
pub fn sex_label(x: usize) -> &'static str {
    match x {
        MALE => "MALE",
        FEMALE => "FEMALE",
        _ => "ALL_SEX",
    }
}

/// Label for a maturity-state index.
pub fn maturity_label(m: usize) -> &'static str {
    match m {
        IMMATURE => "IMMATURE",
        MATURE => "MATURE",
        _ => "ALL_MATURITY",
    }
}

/// Label for a shell-condition index.
pub fn shell_label(s: usize) -> &'static str {
    match s {
        NEW_SHELL => "NEW_SHELL",
        OLD_SHELL => "OLD_SHELL",
        _ => "ALL_SHELL",
    }
}

/// Parse a sex label.
pub fn parse_sex(s: &str) -> Result<usize> {
    match s {
        "MALE" => Ok(MALE),
        "FEMALE" => Ok(FEMALE),
        _ => Err(Error::Config(format!("unrecognized sex label '{s}'"))),
    }
}

/// Parse a maturity-state label.
pub fn parse_maturity(s: &str) -> Result<usize> {
    match s {
        "IMMATURE" => Ok(IMMATURE),
        "MATURE" => Ok(MATURE),
        _ => Err(Error::Config(format!("unrecognized maturity label '{s}'"))),
    }
}

/// Parse a shell-condition label.
pub fn parse_shell(s: &str) -> Result<usize> {
    match s {
        "NEW_SHELL" => Ok(NEW_SHELL),
        "OLD_SHELL" => Ok(OLD_SHELL),
        _ => Err(Error::Config(format!("unrecognized shell label '{s}'"))),
    }
}

/// The size-bin partition: cut points along the continuous size axis, with
/// midpoints used as representative sizes.
#[derive(Debug, Clone)]
pub struct SizeGrid {
    cuts: Vec<f64>,
    mids: Vec<f64>,
}

impl SizeGrid {
    /// Build a grid from strictly increasing cut points (at least two).
    pub fn new(cuts: Vec<f64>) -> Result<Self> {
        if cuts.len() < 2 {
            return Err(Error::Config(format!(
                "size grid needs at least 2 cut points, got {}",
                cuts.len()
            )));
        }
        if cuts.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::Config("size cut points must be strictly increasing".into()));
        }
        let mids = cuts.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
        Ok(Self { cuts, mids })
    }

    /// Number of size bins.
    pub fn n_bins(&self) -> usize {
        self.mids.len()
    }

    /// Midpoint of bin `z`.
    #[inline]
    pub fn mid(&self, z: usize) -> f64 {
        self.mids[z]
    }

    /// All bin midpoints.
    pub fn mids(&self) -> &[f64] {
        &self.mids
    }

    /// All cut points.
    pub fn cuts(&self) -> &[f64] {
        &self.cuts
    }

    /// Lower edge of the first bin (the offset the recruitment size
    /// distribution is measured from).
    pub fn origin(&self) -> f64 {
        self.cuts[0]
    }

    /// Width of bin `z`.
    pub fn width(&self, z: usize) -> f64 {
        self.cuts[z + 1] - self.cuts[z]
    }
}

/// Fixed model dimensions: year range, size grid, fleet counts.
#[derive(Debug, Clone)]
pub struct ModelDims {
    /// First model year.
    pub min_year: i32,
    /// Last advanced model year; `max_year + 1` is the terminal slice.
    pub max_year: i32,
    /// Size-bin partition.
    pub sizes: SizeGrid,
    /// Number of fisheries.
    pub n_fisheries: usize,
    /// Number of surveys.
    pub n_surveys: usize,
}

impl ModelDims {
    /// Construct and validate dimensions.
    pub fn new(
        min_year: i32,
        max_year: i32,
        sizes: SizeGrid,
        n_fisheries: usize,
        n_surveys: usize,
    ) -> Result<Self> {
        if max_year < min_year {
            return Err(Error::Config(format!(
                "model year range is empty: {min_year}..{max_year}"
            )));
        }
        Ok(Self { min_year, max_year, sizes, n_fisheries, n_surveys })
    }

    /// Number of advanced model years (`min_year..=max_year`).
    pub fn n_years(&self) -> usize {
        (self.max_year - self.min_year + 1) as usize
    }

    /// Number of population slices (`min_year..=max_year+1`).
    pub fn n_slices(&self) -> usize {
        self.n_years() + 1
    }

    /// Number of size bins.
    pub fn n_bins(&self) -> usize {
        self.sizes.n_bins()
    }

    /// Zero-based index of a year within `min_year..=max_year+1`, or None.
    pub fn year_index(&self, year: i32) -> Option<usize> {
        if year < self.min_year || year > self.max_year + 1 {
            None
        } else {
            Some((year - self.min_year) as usize)
        }
    }

    /// Iterate the advanced model years.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.min_year..=self.max_year
    }
}
