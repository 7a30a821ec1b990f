//! Parameter table, parameter references and deviation vectors.
//!
//! A process owns an ordered list of parameter combinations; each combination
//! binds [`ParamRef`]s (indices into the flat parameter vector) to the subset
//! of model indices it applies to. Resolution walks combinations in
//! definition order and keeps the last match; build-time coverage validation
//! guarantees every required model index resolves to exactly one combination.

use cs_ad::Scalar;
use cs_core::{Error, IndexBlock, Result};

/// Reference to one entry of the flat parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRef(pub usize);

/// Metadata for one estimable parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    /// Parameter name.
    pub name: String,
    /// Initial value.
    pub init: f64,
    /// Bounds (min, max).
    pub bounds: (f64, f64),
    /// Estimation stage at which the parameter becomes active (0 = always).
    pub stage: u32,
}

/// Ordered table of parameter specs; the optimizer's parameter vector is
/// indexed positionally against this table.
#[derive(Debug, Clone, Default)]
pub struct ParamTable {
    specs: Vec<ParamSpec>,
}

impl ParamTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter; returns its reference.
    pub fn add(&mut self, name: &str, init: f64, lo: f64, hi: f64) -> ParamRef {
        self.add_staged(name, init, lo, hi, 0)
    }

    /// Append a parameter that activates at `stage`.
    pub fn add_staged(&mut self, name: &str, init: f64, lo: f64, hi: f64, stage: u32) -> ParamRef {
        let r = ParamRef(self.specs.len());
        self.specs.push(ParamSpec { name: name.to_string(), init, bounds: (lo, hi), stage });
        r
    }

    /// Append a deviation vector: one parameter per index in `block`,
    /// named `name[i]`.
    pub fn add_devs(&mut self, name: &str, block: IndexBlock, lo: f64, hi: f64) -> DevVector {
        let first = self.specs.len();
        for idx in block.indices() {
            self.specs.push(ParamSpec {
                name: format!("{name}[{idx}]"),
                init: 0.0,
                bounds: (lo, hi),
                stage: 0,
            });
        }
        DevVector { name: name.to_string(), first, len: block.len(), block }
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// All specs.
    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    /// Spec behind a reference.
    pub fn spec(&self, r: ParamRef) -> &ParamSpec {
        &self.specs[r.0]
    }

    /// Initial parameter vector.
    pub fn init_values(&self) -> Vec<f64> {
        self.specs.iter().map(|s| s.init).collect()
    }

    /// Bounds vector.
    pub fn bounds(&self) -> Vec<(f64, f64)> {
        self.specs.iter().map(|s| s.bounds).collect()
    }

    /// Look a parameter up by name.
    pub fn find(&self, name: &str) -> Option<ParamRef> {
        self.specs.iter().position(|s| s.name == name).map(ParamRef)
    }
}

/// A year-indexed vector of additive offsets around a fixed mean parameter,
/// stored as a contiguous slice of the parameter vector and indexed through
/// an [`IndexBlock`] reverse lookup.
#[derive(Debug, Clone)]
pub struct DevVector {
    /// Name (for error messages and reports).
    pub name: String,
    /// First parameter index of the slice.
    pub first: usize,
    /// Number of entries.
    pub len: usize,
    /// Year-to-position map.
    pub block: IndexBlock,
}

impl DevVector {
    /// Deviation value for `year`. A year the block does not cover is a
    /// fatal configuration error.
    pub fn value_at<T: Scalar>(&self, params: &[T], year: i32) -> Result<T> {
        let pos = self.block.position(year).ok_or_else(|| {
            Error::Config(format!(
                "deviation vector '{}' does not cover year {year}",
                self.name
            ))
        })?;
        params.get(self.first + pos).copied().ok_or_else(|| {
            Error::Validation(format!(
                "deviation vector '{}' runs past the parameter vector ({} >= {})",
                self.name,
                self.first + pos,
                params.len()
            ))
        })
    }

    /// The full slice of deviation values.
    pub fn values<'a, T: Scalar>(&self, params: &'a [T]) -> &'a [T] {
        &params[self.first..self.first + self.len]
    }

    /// Largest parameter index used by the vector.
    pub fn max_index(&self) -> usize {
        self.first + self.len.saturating_sub(1)
    }
}

/// Selector over one categorical dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimSel {
    /// Applies to every level.
    All,
    /// Applies to a single level.
    One(usize),
}

impl DimSel {
    /// Whether the selector covers level `i`.
    pub fn contains(&self, i: usize) -> bool {
        match self {
            DimSel::All => true,
            DimSel::One(j) => *j == i,
        }
    }
}

/// Build-time check that every year in `[min, max]` is covered by at least
/// one of the given blocks. A gap is fatal and names the first missing year.
pub fn validate_year_coverage<'a>(
    process: &str,
    blocks: impl Iterator<Item = &'a IndexBlock>,
    min: i32,
    max: i32,
) -> Result<()> {
    let blocks: Vec<&IndexBlock> = blocks.collect();
    for y in min..=max {
        if !blocks.iter().any(|b| b.contains(y)) {
            return Err(Error::Config(format!(
                "process '{process}': no parameter combination covers year {y}"
            )));
        }
    }
    Ok(())
}

/// Resolve the applicable combination for one model index: walk in definition
/// order, skip combinations not covering the index, keep the last match.
pub fn resolve_last<'a, C>(
    combos: &'a [C],
    covers: impl Fn(&C) -> bool,
    what: &str,
) -> Result<&'a C> {
    combos.iter().filter(|c| covers(c)).last().ok_or_else(|| {
        Error::Evaluation(format!("no parameter combination applies for {what}"))
    })
}
