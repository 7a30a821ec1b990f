//! Natural mortality rates.

use crate::arrays::XmzArray;
use crate::config::Verbosity;
use crate::params::{resolve_last, ParamRef};
use crate::rates::LogLinearOffsets;
use cs_ad::Scalar;
use cs_core::dims::{N_MATURITY, N_SEXES};
use cs_core::{IndexBlock, ModelDims, Result};

/// Optional power-law size scaling `(z_ref / size)`, included only once the
/// configured estimation stage has been reached.
#[derive(Debug, Clone, Copy)]
pub struct ZScaling {
    /// Reference size parameter.
    pub z_ref: ParamRef,
    /// Stage at which the scaling activates.
    pub stage: u32,
}

/// One natural-mortality parameter combination: a log-linear additive model
/// `exp(base + temporal + sex + immature + immature×sex)`.
#[derive(Debug, Clone)]
pub struct NaturalMortalityCombo {
    /// Years this combination applies to.
    pub years: IndexBlock,
    /// Log-scale base rate.
    pub ln_m: ParamRef,
    /// Optional additive offsets.
    pub offsets: LogLinearOffsets,
    /// Optional size scaling.
    pub size_scaling: Option<ZScaling>,
}

/// Compute `M[y][sex][maturity][size]` for every advanced model year.
pub fn natural_mortality<T: Scalar>(
    params: &[T],
    combos: &[NaturalMortalityCombo],
    dims: &ModelDims,
    stage: u32,
    verbosity: &Verbosity,
) -> Result<Vec<XmzArray<T>>> {
    let nb = dims.n_bins();
    let mut out = Vec::with_capacity(dims.n_years());
    for y in dims.years() {
        let combo = resolve_last(
            combos,
            |c: &NaturalMortalityCombo| c.years.contains(y),
            &format!("natural mortality year {y}"),
        )?;
        let mut arr = XmzArray::zeros(nb);
        for x in 0..N_SEXES {
            for m in 0..N_MATURITY {
                let ln_rate = params[combo.ln_m.0] + combo.offsets.ln_sum(params, x, m);
                let base = ln_rate.exp();
                for z in 0..nb {
                    let mut rate = base;
                    if let Some(sc) = &combo.size_scaling {
                        if stage >= sc.stage {
                            rate = rate * params[sc.z_ref.0]
                                / T::from_f64(dims.sizes.mid(z));
                        }
                    }
                    arr.set(x, m, z, rate);
                }
            }
        }
        if verbosity.rates {
            log::debug!("natural mortality year {y}: base {}", arr.get(0, 0, 0).value());
        }
        out.push(arr);
    }
    Ok(out)
}
