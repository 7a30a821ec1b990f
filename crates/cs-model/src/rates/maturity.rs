//! Maturity ogives (probability of maturing at molt, by size).

use crate::params::{DimSel, ParamRef};
use cs_ad::scalar::inv_logit;
use cs_ad::Scalar;
use cs_core::dims::N_SEXES;
use cs_core::{Error, IndexBlock, ModelDims, Result};

/// One maturity-ogive parameter combination: a logit-scale vector over the
/// leading size bins. Sizes past the end of the vector mature with
/// probability 1 exactly.
#[derive(Debug, Clone)]
pub struct MaturityCombo {
    /// Years this combination applies to.
    pub years: IndexBlock,
    /// Sexes this combination applies to.
    pub sexes: DimSel,
    /// Logit-scale parameters, one per leading size bin.
    pub logits: Vec<ParamRef>,
}

/// Compute maturity ogives `[y][sex][size]` for every advanced model year.
pub fn maturity_ogives<T: Scalar>(
    params: &[T],
    combos: &[MaturityCombo],
    dims: &ModelDims,
) -> Result<Vec<Vec<Vec<T>>>> {
    let nb = dims.n_bins();
    let mut out = Vec::with_capacity(dims.n_years());
    for y in dims.years() {
        let mut per_sex = Vec::with_capacity(N_SEXES);
        for x in 0..N_SEXES {
            let combo = combos
                .iter()
                .filter(|c| c.years.contains(y) && c.sexes.contains(x))
                .last()
                .ok_or_else(|| {
                    Error::Evaluation(format!(
                        "no maturity combination covers year {y}, sex {x}"
                    ))
                })?;
            let mut ogive = Vec::with_capacity(nb);
            for z in 0..nb {
                match combo.logits.get(z) {
                    Some(p) => ogive.push(inv_logit(params[p.0])),
                    None => ogive.push(T::one()),
                }
            }
            per_sex.push(ogive);
        }
        out.push(per_sex);
    }
    Ok(out)
}
