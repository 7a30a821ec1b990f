//! Molt-increment growth transition matrices.
//!
//! Mean post-molt size is `a·z^b`; the realized increment follows an offset
//! gamma with shape `(mean − z)/β` and scale `β`, truncated to a fixed
//! forward window and normalized per source-size row. The stored matrix is
//! column-stochastic: `n_post = T · n_pre`.

use crate::params::{DimSel, ParamRef};
use cs_ad::Scalar;
use cs_core::dims::{N_MATURITY, N_SEXES};
use cs_core::{Error, ModelDims, Result};

/// Number of size bins an animal can grow through in one molt.
pub const GROWTH_WINDOW: usize = 10;

/// One growth parameter combination, selected by sex and maturity state.
#[derive(Debug, Clone)]
pub struct GrowthCombo {
    /// Sexes this combination applies to.
    pub sexes: DimSel,
    /// Maturity states this combination applies to.
    pub maturities: DimSel,
    /// Log-scale `a` of the mean post-molt size `a·z^b`.
    pub ln_a: ParamRef,
    /// Log-scale `b` of the mean post-molt size.
    pub ln_b: ParamRef,
    /// Log-scale gamma scale parameter `β`.
    pub ln_beta: ParamRef,
}

/// Growth transition matrices per (sex, maturity), stored flat as
/// `[to * n_bins + from]`, column-stochastic and upper-triangular (no
/// shrinking).
#[derive(Debug, Clone)]
pub struct GrowthMatrices<T> {
    mats: Vec<Vec<T>>,
    n_bins: usize,
}

impl<T: Scalar> GrowthMatrices<T> {
    /// Transition probability from bin `from` to bin `to`.
    #[inline]
    pub fn get(&self, x: usize, m: usize, to: usize, from: usize) -> T {
        self.mats[x * N_MATURITY + m][to * self.n_bins + from]
    }

    /// Apply the (sex, maturity) matrix to a pre-molt size vector.
    pub fn apply(&self, x: usize, m: usize, pre: &[T]) -> Vec<T> {
        let nb = self.n_bins;
        let mat = &self.mats[x * N_MATURITY + m];
        let mut post = vec![T::zero(); nb];
        for (from, &v) in pre.iter().enumerate() {
            if v.value() == 0.0 {
                continue;
            }
            for (to, slot) in post.iter_mut().enumerate() {
                *slot = *slot + mat[to * nb + from] * v;
            }
        }
        post
    }

    /// Number of size bins.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }
}

/// Compute the growth transition matrices for every (sex, maturity).
pub fn growth_matrices<T: Scalar>(
    params: &[T],
    combos: &[GrowthCombo],
    dims: &ModelDims,
) -> Result<GrowthMatrices<T>> {
    let nb = dims.n_bins();
    let mut mats = Vec::with_capacity(N_SEXES * N_MATURITY);
    for x in 0..N_SEXES {
        for m in 0..N_MATURITY {
            let combo = combos
                .iter()
                .filter(|c| c.sexes.contains(x) && c.maturities.contains(m))
                .last()
                .ok_or_else(|| {
                    Error::Config(format!(
                        "no growth combination covers sex {x}, maturity {m}"
                    ))
                })?;
            mats.push(one_matrix(params, combo, dims));
        }
    }
    Ok(GrowthMatrices { mats, n_bins: nb })
}

fn one_matrix<T: Scalar>(params: &[T], combo: &GrowthCombo, dims: &ModelDims) -> Vec<T> {
    let nb = dims.n_bins();
    let a = params[combo.ln_a.0];
    let b = params[combo.ln_b.0];
    let beta = params[combo.ln_beta.0].exp();
    let mut mat = vec![T::zero(); nb * nb];
    for from in 0..nb {
        let z = dims.sizes.mid(from);
        // mean post-molt size a * z^b on the log scale
        let mean = (a + b * T::from_f64(z.ln())).exp();
        // gamma shape (mean - z)/beta, floored smoothly above zero
        let alpha = ((mean - T::from_f64(z)) / beta).max_s(T::from_f64(1e-4));
        let hi = (from + GROWTH_WINDOW).min(nb);
        // increment from the source midpoint, offset half a bin so the
        // stay-in-bin mass is evaluated at a positive increment
        let mut lns = Vec::with_capacity(hi - from);
        for to in from..hi {
            let dz = dims.sizes.mid(to) - z + 0.5 * dims.sizes.width(from);
            lns.push((alpha - T::one()) * T::from_f64(dz.ln()) - T::from_f64(dz) / beta);
        }
        let mut ln_max = lns[0];
        for &l in &lns[1..] {
            ln_max = ln_max.max_s(l);
        }
        let probs: Vec<T> = lns.iter().map(|&l| (l - ln_max).exp()).collect();
        let sum: T = probs.iter().copied().sum();
        for (k, p) in probs.iter().enumerate() {
            let to = from + k;
            mat[to * nb + from] = *p / sum;
        }
    }
    mat
}
