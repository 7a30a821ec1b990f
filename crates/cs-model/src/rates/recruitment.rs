//! Recruitment: yearly totals, sex split and size distribution.

use crate::config::Verbosity;
use crate::params::{DevVector, ParamRef};
use cs_ad::scalar::inv_logit;
use cs_ad::Scalar;
use cs_core::dims::MALE;
use cs_core::{Error, IndexBlock, ModelDims, Result};

/// One recruitment parameter combination.
#[derive(Debug, Clone)]
pub struct RecruitmentCombo {
    /// Years this combination applies to.
    pub years: IndexBlock,
    /// Log-scale mean recruitment.
    pub ln_r: ParamRef,
    /// Optional yearly log-scale deviations.
    pub devs: Option<DevVector>,
    /// Logit of the male fraction of recruits.
    pub logit_male: ParamRef,
    /// Log of the gamma size-distribution parameter `a`.
    pub ln_shape_a: ParamRef,
    /// Log of the gamma size-distribution parameter `b`.
    pub ln_scale_b: ParamRef,
    /// Recruitment CV (drives the deviation standardization).
    pub cv: ParamRef,
}

/// Standardized deviation residuals for one combination, consumed by the
/// likelihood assembler (`0.5 Σ z² + Σ ln σ`).
#[derive(Debug, Clone)]
pub struct RecruitmentDevNll<T> {
    /// Index of the owning combination.
    pub combo: usize,
    /// Standardized residuals `dev / σ`.
    pub zscores: Vec<T>,
    /// Lognormal-consistent standard deviation `sqrt(ln(1 + cv²))`.
    pub sigma: T,
}

/// Recruitment rates for one evaluation.
#[derive(Debug, Clone)]
pub struct Recruitment<T> {
    /// Total recruits per model year.
    pub total: Vec<T>,
    /// Male fraction per model year.
    pub male_frac: Vec<T>,
    /// Size distribution per model year (sums to 1 over bins).
    pub size_dist: Vec<Vec<T>>,
    /// Deviation-residual inputs, one per combination with deviations.
    pub dev_nll: Vec<RecruitmentDevNll<T>>,
}

impl<T: Scalar> Recruitment<T> {
    /// Recruits entering (sex, bin) at the end of year index `yi`.
    pub fn at(&self, yi: usize, x: usize, z: usize) -> T {
        let frac =
            if x == MALE { self.male_frac[yi] } else { T::one() - self.male_frac[yi] };
        self.total[yi] * frac * self.size_dist[yi][z]
    }
}

/// Gamma-shaped size distribution `pr(z) ∝ x^(a/b − 1) · exp(−x/b)` with
/// `x` the bin midpoint offset from the lower edge of the first bin,
/// normalized to sum to 1. Evaluated in log space with max-subtraction so an
/// extremely concentrated distribution degrades to exact point mass rather
/// than 0/0.
fn gamma_size_dist<T: Scalar>(a: T, b: T, dims: &ModelDims) -> Vec<T> {
    let nb = dims.n_bins();
    let origin = dims.sizes.origin();
    let shape = a / b;
    let mut lns = Vec::with_capacity(nb);
    for z in 0..nb {
        let x = dims.sizes.mid(z) - origin;
        let ln_x = T::from_f64(x.ln());
        lns.push((shape - T::one()) * ln_x - T::from_f64(x) / b);
    }
    let mut ln_max = lns[0];
    for &l in &lns[1..] {
        ln_max = ln_max.max_s(l);
    }
    let unnorm: Vec<T> = lns.iter().map(|&l| (l - ln_max).exp()).collect();
    let sum: T = unnorm.iter().copied().sum();
    unnorm.into_iter().map(|u| u / sum).collect()
}

/// Compute recruitment for every model year.
pub fn recruitment<T: Scalar>(
    params: &[T],
    combos: &[RecruitmentCombo],
    dims: &ModelDims,
    verbosity: &Verbosity,
) -> Result<Recruitment<T>> {
    let ny = dims.n_years();
    let mut total = Vec::with_capacity(ny);
    let mut male_frac = Vec::with_capacity(ny);
    let mut size_dist = Vec::with_capacity(ny);

    // Per-combination size distributions are year-invariant; compute once.
    let dists: Vec<Vec<T>> = combos
        .iter()
        .map(|c| {
            let a = params[c.ln_shape_a.0].exp();
            let b = params[c.ln_scale_b.0].exp();
            gamma_size_dist(a, b, dims)
        })
        .collect();

    for y in dims.years() {
        let (ci, combo) = combos
            .iter()
            .enumerate()
            .filter(|(_, c)| c.years.contains(y))
            .last()
            .ok_or_else(|| {
                Error::Evaluation(format!(
                    "no parameter combination applies for recruitment year {y}"
                ))
            })?;
        let mut ln_r = params[combo.ln_r.0];
        if let Some(devs) = &combo.devs {
            ln_r = ln_r + devs.value_at(params, y)?;
        }
        let r = ln_r.exp();
        if verbosity.rates {
            log::debug!("recruitment year {y}: total {}", r.value());
        }
        total.push(r);
        male_frac.push(inv_logit(params[combo.logit_male.0]));
        size_dist.push(dists[ci].clone());
    }

    let mut dev_nll = Vec::new();
    for (ci, combo) in combos.iter().enumerate() {
        if let Some(devs) = &combo.devs {
            let cv = params[combo.cv.0];
            let sigma = (T::one() + cv * cv).ln().sqrt();
            let zscores =
                devs.values(params).iter().map(|&d| d / sigma).collect::<Vec<T>>();
            dev_nll.push(RecruitmentDevNll { combo: ci, zscores, sigma });
        }
    }

    Ok(Recruitment { total, male_frac, size_dist, dev_nll })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamTable;
    use approx::assert_relative_eq;
    use cs_core::dims::FEMALE;
    use cs_core::SizeGrid;

    fn dims(n_bins: usize) -> ModelDims {
        let cuts: Vec<f64> = (0..=n_bins).map(|i| 25.0 + 5.0 * i as f64).collect();
        ModelDims::new(2000, 2002, SizeGrid::new(cuts).unwrap(), 1, 1).unwrap()
    }

    fn simple_combo(t: &mut ParamTable, devs: Option<DevVector>) -> RecruitmentCombo {
        RecruitmentCombo {
            years: IndexBlock::parse("[-1:-1]", 2000, 2002).unwrap(),
            ln_r: t.add("pLnR", (100.0_f64).ln(), -5.0, 20.0),
            devs,
            logit_male: t.add("pLgtMale", 0.0, -5.0, 5.0),
            ln_shape_a: t.add("pLnRa", (10.0_f64).ln(), -5.0, 10.0),
            ln_scale_b: t.add("pLnRb", (2.0_f64).ln(), -5.0, 10.0),
            cv: t.add("pRCV", 0.5, 0.01, 2.0),
        }
    }

    #[test]
    fn test_size_distribution_sums_to_one() {
        let mut t = ParamTable::new();
        let combo = simple_combo(&mut t, None);
        let d = dims(8);
        let out =
            recruitment(&t.init_values(), &[combo], &d, &Verbosity::default()).unwrap();
        for yi in 0..d.n_years() {
            let sum: f64 = out.size_dist[yi].iter().sum();
            assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
            assert!(out.size_dist[yi].iter().all(|&p| p >= 0.0));
        }
    }

    #[test]
    fn test_even_sex_split_at_zero_logit() {
        let mut t = ParamTable::new();
        let combo = simple_combo(&mut t, None);
        let d = dims(5);
        let out =
            recruitment(&t.init_values(), &[combo], &d, &Verbosity::default()).unwrap();
        assert_relative_eq!(out.male_frac[0], 0.5);
        let male = out.at(0, MALE, 0);
        let female = out.at(0, FEMALE, 0);
        assert_relative_eq!(male, female, epsilon = 1e-12);
    }

    #[test]
    fn test_deviations_shift_totals_and_standardize() {
        let mut t = ParamTable::new();
        let block = IndexBlock::parse("[2000:2002]", 2000, 2002).unwrap();
        let devs = t.add_devs("pDevsR", block, -5.0, 5.0);
        let combo = simple_combo(&mut t, Some(devs));
        let mut params = t.init_values();
        params[1] = 0.5; // pDevsR[2001] (devs allocated first)
        let d = dims(5);
        let out = recruitment(&params, &[combo], &d, &Verbosity::default()).unwrap();
        assert_relative_eq!(out.total[1], 100.0 * 0.5_f64.exp(), epsilon = 1e-9);

        let sigma = (1.0 + 0.25_f64).ln().sqrt();
        assert_eq!(out.dev_nll.len(), 1);
        assert_relative_eq!(out.dev_nll[0].sigma, sigma, epsilon = 1e-12);
        assert_relative_eq!(out.dev_nll[0].zscores[1], 0.5 / sigma, epsilon = 1e-12);
    }

    #[test]
    fn test_uncovered_year_is_error() {
        let mut t = ParamTable::new();
        let mut combo = simple_combo(&mut t, None);
        combo.years = IndexBlock::parse("[2000:2001]", 2000, 2002).unwrap();
        let err =
            recruitment(&t.init_values(), &[combo], &dims(5), &Verbosity::default())
                .unwrap_err();
        assert!(err.to_string().contains("2002"));
    }
}
