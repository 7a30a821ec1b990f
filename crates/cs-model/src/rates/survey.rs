//! Survey catchability.
//!
//! Same log-linear additive structure as natural mortality (no deviations),
//! multiplied by a selectivity curve, valid through the terminal year so the
//! post-projection survey can be sampled.

use crate::arrays::XmszArray;
use crate::params::ParamRef;
use crate::rates::LogLinearOffsets;
use cs_ad::Scalar;
use cs_core::dims::{N_MATURITY, N_SEXES, N_SHELL};
use cs_core::{Error, IndexBlock, ModelDims, Result};

/// One survey-catchability parameter combination.
#[derive(Debug, Clone)]
pub struct SurveyCombo {
    /// Survey index.
    pub survey: usize,
    /// Years this combination applies to (may include the terminal year).
    pub years: IndexBlock,
    /// Log-scale fully-selected catchability.
    pub ln_q: ParamRef,
    /// Optional additive offsets.
    pub offsets: LogLinearOffsets,
    /// Selectivity function id.
    pub sel_fn: usize,
}

/// Compute catchability `[survey][y]` for every year in
/// `[min_year, max_year + 1]`.
pub fn catchability<T: Scalar>(
    params: &[T],
    combos: &[SurveyCombo],
    selectivity: &[Vec<Vec<T>>],
    dims: &ModelDims,
) -> Result<Vec<Vec<XmszArray<T>>>> {
    let nb = dims.n_bins();
    let mut out: Vec<Vec<XmszArray<T>>> = (0..dims.n_surveys)
        .map(|_| (0..dims.n_slices()).map(|_| XmszArray::zeros(nb)).collect())
        .collect();
    for v in 0..dims.n_surveys {
        for yi in 0..dims.n_slices() {
            let y = dims.min_year + yi as i32;
            let combo = combos
                .iter()
                .filter(|c| c.survey == v && c.years.contains(y))
                .last()
                .ok_or_else(|| {
                    Error::Evaluation(format!(
                        "no catchability combination covers survey {v}, year {y}"
                    ))
                })?;
            let sel = &selectivity[combo.sel_fn][yi];
            let arr = &mut out[v][yi];
            for x in 0..N_SEXES {
                for m in 0..N_MATURITY {
                    let q = (params[combo.ln_q.0] + combo.offsets.ln_sum(params, x, m)).exp();
                    for s in 0..N_SHELL {
                        for z in 0..nb {
                            arr.set(x, m, s, z, q * sel[z]);
                        }
                    }
                }
            }
        }
    }
    Ok(out)
}
