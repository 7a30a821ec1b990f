//! Size-selectivity and retention curves.
//!
//! A library of shape functions keyed by function id, evaluated over the
//! size grid from up to 6 shape parameters. An optional fully-selected
//! reference size renormalizes the curve to 1 at that size. Per-year
//! additive deviations are applied to selected shape parameters *before*
//! re-evaluating the shape, never as a post-hoc rescale of the base curve.

use crate::params::{DevVector, ParamRef};
use cs_ad::Scalar;
use cs_core::{Error, ModelDims, Result};

/// Selectivity shape functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelShape {
    /// Flat 1 at every size (0 parameters).
    Constant,
    /// Ascending logistic: z50, slope width (2 parameters).
    Logistic,
    /// Dome-shaped normal: mode, width (2 parameters).
    Normal,
    /// Double logistic: ascending z50/width, descending z50/width (4 parameters).
    DoubleLogistic,
}

impl SelShape {
    /// Parse a shape keyword.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "CONSTANT" => Ok(Self::Constant),
            "LOGISTIC" => Ok(Self::Logistic),
            "NORMAL" => Ok(Self::Normal),
            "DOUBLE_LOGISTIC" => Ok(Self::DoubleLogistic),
            _ => Err(Error::Config(format!("unrecognized selectivity shape '{s}'"))),
        }
    }

    /// Keyword for this shape.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Constant => "CONSTANT",
            Self::Logistic => "LOGISTIC",
            Self::Normal => "NORMAL",
            Self::DoubleLogistic => "DOUBLE_LOGISTIC",
        }
    }

    /// Number of shape parameters.
    pub fn n_params(&self) -> usize {
        match self {
            Self::Constant => 0,
            Self::Logistic | Self::Normal => 2,
            Self::DoubleLogistic => 4,
        }
    }
}

/// Per-year additive deviations on shape parameters.
#[derive(Debug, Clone)]
pub struct SelDevs {
    /// The deviation vector (year-indexed).
    pub dev: DevVector,
    /// Which of the shape parameters the deviation is added to.
    pub targets: Vec<usize>,
}

/// One selectivity/retention function.
#[derive(Debug, Clone)]
pub struct SelFunction {
    /// Function name (for reports).
    pub name: String,
    /// Shape.
    pub shape: SelShape,
    /// Shape parameters (length must match the shape's arity, at most 6).
    pub params: Vec<ParamRef>,
    /// Fully-selected reference size; the curve is renormalized to 1 there.
    pub z_full: Option<f64>,
    /// Optional per-year parameter deviations.
    pub devs: Option<SelDevs>,
}

fn shape_value<T: Scalar>(shape: SelShape, p: &[T], z: f64) -> T {
    let zt = T::from_f64(z);
    match shape {
        SelShape::Constant => T::one(),
        SelShape::Logistic => {
            // 1 / (1 + exp(-(z - z50)/width))
            T::one() / (T::one() + (-(zt - p[0]) / p[1]).exp())
        }
        SelShape::Normal => {
            let d = (zt - p[0]) / p[1];
            (-(d * d) * T::from_f64(0.5)).exp()
        }
        SelShape::DoubleLogistic => {
            let asc = T::one() / (T::one() + (-(zt - p[0]) / p[1]).exp());
            let dsc = T::one() / (T::one() + (-(zt - p[2]) / p[3]).exp());
            asc * (T::one() - dsc)
        }
    }
}

fn eval_curve<T: Scalar>(
    f: &SelFunction,
    p: &[T],
    dims: &ModelDims,
) -> Vec<T> {
    let nb = dims.n_bins();
    let mut curve: Vec<T> = (0..nb)
        .map(|z| shape_value(f.shape, p, dims.sizes.mid(z)))
        .collect();
    if let Some(zf) = f.z_full {
        let at_full = shape_value(f.shape, p, zf);
        for v in &mut curve {
            *v = *v / at_full;
        }
    }
    curve
}

/// Evaluate every selectivity function for every year in
/// `[min_year, max_year + 1]` (the terminal year is needed by the surveys).
pub fn selectivity_curves<T: Scalar>(
    params: &[T],
    fns: &[SelFunction],
    dims: &ModelDims,
) -> Result<Vec<Vec<Vec<T>>>> {
    let n_slices = dims.n_slices();
    let mut out = Vec::with_capacity(fns.len());
    for f in fns {
        if f.params.len() != f.shape.n_params() {
            return Err(Error::Config(format!(
                "selectivity function '{}' ({}) takes {} parameters, got {}",
                f.name,
                f.shape.label(),
                f.shape.n_params(),
                f.params.len()
            )));
        }
        if let Some(devs) = &f.devs {
            if let Some(&bad) = devs.targets.iter().find(|&&k| k >= f.params.len()) {
                return Err(Error::Config(format!(
                    "selectivity function '{}': deviation target {bad} out of range",
                    f.name
                )));
            }
        }
        let base: Vec<T> = f.params.iter().map(|r| params[r.0]).collect();
        let base_curve = eval_curve(f, &base, dims);
        let mut per_year = Vec::with_capacity(n_slices);
        for yi in 0..n_slices {
            let y = dims.min_year + yi as i32;
            let curve = match &f.devs {
                Some(devs) if devs.dev.block.contains(y) => {
                    let d = devs.dev.value_at(params, y)?;
                    let mut shifted = base.clone();
                    for &k in &devs.targets {
                        shifted[k] = shifted[k] + d;
                    }
                    eval_curve(f, &shifted, dims)
                }
                // Years outside the deviation block use the base curve.
                _ => base_curve.clone(),
            };
            per_year.push(curve);
        }
        out.push(per_year);
    }
    Ok(out)
}
