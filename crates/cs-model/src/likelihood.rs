//! Likelihood and penalty assembly.
//!
//! Aggregates observed-vs-modeled comparisons under the configured
//! likelihood families and fit types, always-on smoothness/monotonicity
//! penalties on the maturity logits, and the deviation-vector NLLs, into one
//! scalar objective. The scalar accumulator is reset at the start of every
//! evaluation; a per-component `f64` breakdown is kept for reporting.

use crate::arrays::{XmszArray, XmzArray};
use crate::config::{ModelConfig, PenaltyWeights};
use crate::data::{
    cell_total, AggregateSeries, CatchSeries, CellTable, FitType, LikelihoodFamily,
    ObservedData, SizeCompSeries,
};
use crate::project::Projection;
use crate::rates::{MaturityCombo, ModelRates};
use crate::sampler::SurveySamples;
use crate::units::{to_lognormal_sigma, to_std_dev};
use cs_ad::scalar::smooth_neg_part;
use cs_ad::Scalar;
use cs_core::dims::{N_MATURITY, N_SEXES, N_SHELL};
use cs_core::{Error, ModelDims, Result};
use serde::Serialize;

/// Additive floor against `log(0)` in the lognormal and multinomial families.
pub const LOG_FLOOR: f64 = 1e-10;
/// Smoothing constant of the one-sided non-decreasing penalty.
pub const SMOOTH_EPS: f64 = 1e-8;

/// One named objective-function component.
#[derive(Debug, Clone, Serialize)]
pub struct NllComponent {
    /// Component name, e.g. `fishery/pot/retained/abundance`.
    pub name: String,
    /// Multiplicative weight applied in the total.
    pub weight: f64,
    /// Unweighted component value.
    pub value: f64,
}

/// Multinomial fit diagnostics for one composition row.
#[derive(Debug, Clone, Serialize)]
pub struct CompDiagnostic {
    /// Series name.
    pub series: String,
    /// Observation year.
    pub year: i32,
    /// McAllister-Ianelli effective sample size.
    pub effective_n: f64,
    /// Largest absolute Pearson residual.
    pub max_pearson: f64,
}

/// The assembled objective: total plus breakdown.
#[derive(Debug, Clone)]
pub struct ObjectiveValue<T> {
    /// Weighted total (the quantity the optimizer minimizes).
    pub total: T,
    /// Per-component breakdown (unweighted values).
    pub components: Vec<NllComponent>,
    /// Composition diagnostics.
    pub diagnostics: Vec<CompDiagnostic>,
}

struct Acc<T> {
    total: T,
    components: Vec<NllComponent>,
    diagnostics: Vec<CompDiagnostic>,
}

impl<T: Scalar> Acc<T> {
    fn new() -> Self {
        Self { total: T::zero(), components: Vec::new(), diagnostics: Vec::new() }
    }

    fn add(&mut self, name: String, weight: f64, v: T) {
        self.total = self.total + v * T::from_f64(weight);
        self.components.push(NllComponent { name, weight, value: v.value() });
    }
}

/// Smoothness and non-decreasing penalties on the maturity-ogive logit
/// parameters, one pair of values per parameter combination.
pub fn maturity_penalties<T: Scalar>(
    params: &[T],
    combos: &[MaturityCombo],
) -> Vec<(T, T)> {
    combos
        .iter()
        .map(|combo| {
            let x: Vec<T> = combo.logits.iter().map(|r| params[r.0]).collect();
            let mut smooth = T::zero();
            for w in x.windows(3) {
                let d2 = w[2] - T::from_f64(2.0) * w[1] + w[0];
                smooth = smooth + d2 * d2;
            }
            let mut mono = T::zero();
            for w in x.windows(2) {
                let barrier = smooth_neg_part(w[1] - w[0], SMOOTH_EPS);
                mono = mono + barrier * barrier;
            }
            (smooth, mono)
        })
        .collect()
}

/// Assemble the full objective for one evaluation.
#[allow(clippy::too_many_arguments)]
pub fn assemble_objective<T: Scalar>(
    cfg: &ModelConfig,
    dims: &ModelDims,
    params: &[T],
    maturity_combos: &[MaturityCombo],
    rates: &ModelRates<T>,
    projection: &Projection<T>,
    samples: &SurveySamples<T>,
    data: &ObservedData,
) -> Result<ObjectiveValue<T>> {
    let mut acc = Acc::new();
    add_penalties(&mut acc, params, maturity_combos, rates, &cfg.penalties);

    for (f, fd) in data.fisheries.iter().enumerate() {
        let kinds: [(&str, &Option<CatchSeries>, &Vec<Vec<XmszArray<T>>>); 3] = [
            ("retained", &fd.retained, &projection.retained),
            ("discarded", &fd.discarded, &projection.discarded),
            ("total", &fd.total, &projection.captured),
        ];
        for (kind, series, model) in kinds {
            if let Some(series) = series {
                let prefix = format!("fishery/{}/{kind}", fd.name);
                add_catch_series(
                    &mut acc,
                    &prefix,
                    series,
                    |y| {
                        dims.year_index(y)
                            .filter(|&yi| yi < dims.n_years())
                            .map(|yi| &model[f][yi])
                    },
                    &cfg.weight_at_size,
                    dims,
                )?;
            }
        }
    }

    for (v, sd) in data.surveys.iter().enumerate() {
        let prefix = format!("survey/{}", sd.name);
        add_catch_series(
            &mut acc,
            &prefix,
            &sd.series,
            |y| dims.year_index(y).map(|yi| &samples.numbers[v][yi]),
            &cfg.weight_at_size,
            dims,
        )?;
        if cfg.verbosity.likelihood {
            log::debug!("survey {}: objective so far {}", sd.name, acc.total.value());
        }
    }

    Ok(ObjectiveValue {
        total: acc.total,
        components: acc.components,
        diagnostics: acc.diagnostics,
    })
}

fn add_penalties<T: Scalar>(
    acc: &mut Acc<T>,
    params: &[T],
    maturity_combos: &[MaturityCombo],
    rates: &ModelRates<T>,
    weights: &PenaltyWeights,
) {
    for (i, (smooth, mono)) in
        maturity_penalties(params, maturity_combos).into_iter().enumerate()
    {
        acc.add(format!("penalty/maturity[{}]/smoothness", i + 1), weights.smoothness, smooth);
        acc.add(
            format!("penalty/maturity[{}]/non_decreasing", i + 1),
            weights.non_decreasing,
            mono,
        );
    }

    // Recruitment deviations keep the ln σ term: this is the source
    // distribution's density, not a residual-only diagnostic.
    for dev in &rates.recruitment.dev_nll {
        let half = T::from_f64(0.5);
        let mut v = T::zero();
        for &z in &dev.zscores {
            v = v + half * z * z;
        }
        v = v + T::from_f64(dev.zscores.len() as f64) * dev.sigma.ln();
        acc.add(format!("recruitment/devs[{}]", dev.combo + 1), 1.0, v);
    }

    for (i, devs) in rates.fishing.capture_devs.iter().enumerate() {
        let mut v = T::zero();
        for &d in devs {
            v = v + T::from_f64(0.5) * d * d;
        }
        acc.add(format!("penalty/capture_devs[{}]", i + 1), weights.capture_devs, v);
    }
}

/// Compare every component of one catch/survey series against the modeled
/// quantity. `model_at` maps an observation year to the modeled
/// numbers-at-size, or `None` when the year is outside the projected range
/// (skipped, not erred: retrospective truncation is supported).
fn add_catch_series<'a, T: Scalar + 'a>(
    acc: &mut Acc<T>,
    prefix: &str,
    series: &CatchSeries,
    model_at: impl Fn(i32) -> Option<&'a XmszArray<T>>,
    weight: &XmzArray<f64>,
    dims: &ModelDims,
) -> Result<()> {
    if let Some(agg) = &series.abundance {
        add_aggregate(acc, &format!("{prefix}/abundance"), agg, |y| {
            model_at(y).map(|n| n.clone())
        })?;
    }
    if let Some(agg) = &series.biomass {
        add_aggregate(acc, &format!("{prefix}/biomass"), agg, |y| {
            model_at(y).map(|n| weighted_numbers(n, weight))
        })?;
    }
    if let Some(comps) = &series.size_comps {
        add_size_comps(acc, &format!("{prefix}/size_comps"), comps, &model_at, dims)?;
    }
    Ok(())
}

/// Numbers scaled elementwise by weight-at-size (biomass cells).
fn weighted_numbers<T: Scalar>(n: &XmszArray<T>, w: &XmzArray<f64>) -> XmszArray<T> {
    let mut out = XmszArray::zeros(n.n_bins());
    for (x, m, s, z, v) in n.cells() {
        out.set(x, m, s, z, v * T::from_f64(w.get(x, m, z)));
    }
    out
}

fn add_aggregate<T: Scalar>(
    acc: &mut Acc<T>,
    name: &str,
    series: &AggregateSeries,
    model_at: impl Fn(i32) -> Option<XmszArray<T>>,
) -> Result<()> {
    if series.likelihood == LikelihoodFamily::None || series.fit == FitType::None {
        return Ok(());
    }
    if series.fit.is_extended() {
        return Err(Error::Config(format!(
            "{name}: extended fit types apply only to size compositions"
        )));
    }
    let mut nll = T::zero();
    for row in &series.rows {
        let Some(model) = model_at(row.year) else {
            continue;
        };
        for (obs, modeled) in aggregate_pairs(series.fit, &model, &row.values)? {
            nll = nll
                + aggregate_nll(
                    series.likelihood,
                    obs,
                    modeled,
                    row.uncertainty,
                    row.scale,
                    name,
                )?;
        }
    }
    acc.add(name.to_string(), series.weight, nll);
    Ok(())
}

/// Marginal (observed, modeled) pairs for one aggregate comparison.
fn aggregate_pairs<T: Scalar>(
    fit: FitType,
    model: &XmszArray<T>,
    obs: &CellTable,
) -> Result<Vec<(f64, T)>> {
    let sum_model = |pick: &dyn Fn(usize, usize, usize) -> bool| -> T {
        let mut v = T::zero();
        for (x, m, s, _, cell) in model.cells() {
            if pick(x, m, s) {
                v = v + cell;
            }
        }
        v
    };
    let sum_obs = |pick: &dyn Fn(usize, usize, usize) -> bool| -> f64 {
        let mut v = 0.0;
        for (x, plane) in obs.iter().enumerate() {
            for (m, line) in plane.iter().enumerate() {
                for (s, &cell) in line.iter().enumerate() {
                    if pick(x, m, s) {
                        v += cell;
                    }
                }
            }
        }
        v
    };

    let mut out = Vec::new();
    match fit {
        FitType::None => {}
        FitType::ByTotal => {
            out.push((cell_total(obs), sum_model(&|_, _, _| true)));
        }
        FitType::BySex => {
            for x in 0..N_SEXES {
                out.push((sum_obs(&|xx, _, _| xx == x), sum_model(&|xx, _, _| xx == x)));
            }
        }
        FitType::BySexMaturity => {
            for x in 0..N_SEXES {
                for m in 0..N_MATURITY {
                    let pick = |xx: usize, mm: usize, _: usize| xx == x && mm == m;
                    out.push((sum_obs(&pick), sum_model(&pick)));
                }
            }
        }
        FitType::BySexShell => {
            for x in 0..N_SEXES {
                for s in 0..N_SHELL {
                    let pick = |xx: usize, _: usize, ss: usize| xx == x && ss == s;
                    out.push((sum_obs(&pick), sum_model(&pick)));
                }
            }
        }
        FitType::BySexMaturityShell => {
            for x in 0..N_SEXES {
                for m in 0..N_MATURITY {
                    for s in 0..N_SHELL {
                        let pick =
                            |xx: usize, mm: usize, ss: usize| xx == x && mm == m && ss == s;
                        out.push((sum_obs(&pick), sum_model(&pick)));
                    }
                }
            }
        }
        FitType::BySexExtended | FitType::BySexMaturityExtended => {
            return Err(Error::Config(
                "extended fit types apply only to size compositions".into(),
            ));
        }
    }
    Ok(out)
}

fn aggregate_nll<T: Scalar>(
    family: LikelihoodFamily,
    obs: f64,
    modeled: T,
    uncertainty: f64,
    scale: crate::units::ScaleType,
    name: &str,
) -> Result<T> {
    match family {
        LikelihoodFamily::None => Ok(T::zero()),
        LikelihoodFamily::Norm2 => {
            let r = T::from_f64(obs) - modeled;
            Ok(T::from_f64(0.5) * r * r)
        }
        LikelihoodFamily::Normal => {
            let sigma = to_std_dev(scale, uncertainty, obs);
            let r = (T::from_f64(obs) - modeled) / T::from_f64(sigma);
            Ok(T::from_f64(0.5) * r * r)
        }
        LikelihoodFamily::Lognormal => {
            let sigma = to_lognormal_sigma(scale, uncertainty, obs);
            let r = (T::from_f64((obs + LOG_FLOOR).ln())
                - (modeled + T::from_f64(LOG_FLOOR)).ln())
                / T::from_f64(sigma);
            Ok(T::from_f64(0.5) * r * r)
        }
        LikelihoodFamily::Multinomial => Err(Error::Config(format!(
            "{name}: MULTINOMIAL applies only to size compositions"
        ))),
    }
}

fn add_size_comps<'a, T: Scalar + 'a>(
    acc: &mut Acc<T>,
    name: &str,
    series: &SizeCompSeries,
    model_at: &impl Fn(i32) -> Option<&'a XmszArray<T>>,
    dims: &ModelDims,
) -> Result<()> {
    if series.likelihood == LikelihoodFamily::None || series.fit == FitType::None {
        return Ok(());
    }
    let mut nll = T::zero();
    for row in &series.rows {
        if row.comps.n_bins() != dims.n_bins() {
            return Err(Error::Validation(format!(
                "{name}: composition row for year {} has {} bins, model has {}",
                row.year,
                row.comps.n_bins(),
                dims.n_bins()
            )));
        }
        let Some(model) = model_at(row.year) else {
            continue;
        };
        let mut worst_pearson = 0.0_f64;
        let mut eff_n_sum = 0.0_f64;
        let mut n_vectors = 0usize;
        for (obs_vec, mod_vec) in comp_vectors(series.fit, model, &row.comps) {
            match series.likelihood {
                LikelihoodFamily::Multinomial => {
                    let (v, eff_n, pearson) =
                        multinomial_nll(&obs_vec, &mod_vec, row.sample_size);
                    nll = nll + v;
                    worst_pearson = worst_pearson.max(pearson);
                    eff_n_sum += eff_n;
                    n_vectors += 1;
                }
                LikelihoodFamily::Norm2 => {
                    let (obs_p, mod_p) = normalize_pair(&obs_vec, &mod_vec);
                    for (o, m) in obs_p.iter().zip(mod_p.iter()) {
                        let r = T::from_f64(*o) - *m;
                        nll = nll + T::from_f64(0.5) * r * r;
                    }
                }
                other => {
                    return Err(Error::Config(format!(
                        "{name}: likelihood {} is not supported for size compositions",
                        other.label()
                    )));
                }
            }
        }
        if n_vectors > 0 {
            acc.diagnostics.push(CompDiagnostic {
                series: name.to_string(),
                year: row.year,
                effective_n: eff_n_sum / n_vectors as f64,
                max_pearson: worst_pearson,
            });
        }
    }
    acc.add(name.to_string(), series.weight, nll);
    Ok(())
}

/// Composition vectors to compare for one row, per the fit type. Extended
/// variants block-concatenate the size axis instead of adding comparisons.
fn comp_vectors<T: Scalar>(
    fit: FitType,
    model: &XmszArray<T>,
    obs: &XmszArray<f64>,
) -> Vec<(Vec<f64>, Vec<T>)> {
    let nb = model.n_bins();
    let collect = |pick: &dyn Fn(usize, usize, usize) -> bool| -> (Vec<f64>, Vec<T>) {
        let mut o = vec![0.0; nb];
        let mut m = vec![T::zero(); nb];
        for (x, mm, s, z, cell) in model.cells() {
            if pick(x, mm, s) {
                m[z] = m[z] + cell;
            }
        }
        for (x, mm, s, z, cell) in obs.cells() {
            if pick(x, mm, s) {
                o[z] += cell;
            }
        }
        (o, m)
    };

    let by_sex = || -> Vec<(Vec<f64>, Vec<T>)> {
        (0..N_SEXES).map(|x| collect(&|xx: usize, _: usize, _: usize| xx == x)).collect()
    };
    let by_sex_maturity = || -> Vec<(Vec<f64>, Vec<T>)> {
        let mut v = Vec::new();
        for x in 0..N_SEXES {
            for m in 0..N_MATURITY {
                v.push(collect(&|xx: usize, mm: usize, _: usize| xx == x && mm == m));
            }
        }
        v
    };

    let concat = |parts: Vec<(Vec<f64>, Vec<T>)>| -> Vec<(Vec<f64>, Vec<T>)> {
        let mut o = Vec::new();
        let mut m = Vec::new();
        for (po, pm) in parts {
            o.extend(po);
            m.extend(pm);
        }
        vec![(o, m)]
    };

    let vectors = match fit {
        FitType::None => Vec::new(),
        FitType::ByTotal => vec![collect(&|_, _, _| true)],
        FitType::BySex => by_sex(),
        FitType::BySexExtended => concat(by_sex()),
        FitType::BySexMaturity => by_sex_maturity(),
        FitType::BySexMaturityExtended => concat(by_sex_maturity()),
        FitType::BySexShell => {
            let mut v = Vec::new();
            for x in 0..N_SEXES {
                for s in 0..N_SHELL {
                    v.push(collect(&|xx: usize, _: usize, ss: usize| xx == x && ss == s));
                }
            }
            v
        }
        FitType::BySexMaturityShell => {
            let mut v = Vec::new();
            for x in 0..N_SEXES {
                for m in 0..N_MATURITY {
                    for s in 0..N_SHELL {
                        v.push(collect(
                            &|xx: usize, mm: usize, ss: usize| xx == x && mm == m && ss == s,
                        ));
                    }
                }
            }
            v
        }
    };
    // a marginal with no observations contributes nothing
    vectors.into_iter().filter(|(o, _)| o.iter().sum::<f64>() > 0.0).collect()
}

/// Renormalize an observed/modeled vector pair to proportions.
fn normalize_pair<T: Scalar>(obs: &[f64], model: &[T]) -> (Vec<f64>, Vec<T>) {
    let obs_sum: f64 = obs.iter().sum();
    let mod_sum: T = model.iter().copied().sum();
    let mod_sum = mod_sum.max_s(T::from_f64(LOG_FLOOR));
    (
        obs.iter().map(|&o| o / obs_sum).collect(),
        model.iter().map(|&m| m / mod_sum).collect(),
    )
}

/// Multinomial NLL on renormalized proportions, with Pearson-residual and
/// effective-N diagnostics computed on the primal values.
fn multinomial_nll<T: Scalar>(obs: &[f64], model: &[T], n_eff: f64) -> (T, f64, f64) {
    let (obs_p, mod_p) = normalize_pair(obs, model);
    let mut nll = T::zero();
    for (&o, &m) in obs_p.iter().zip(mod_p.iter()) {
        let diff = (m + T::from_f64(LOG_FLOOR)).ln() - T::from_f64((o + LOG_FLOOR).ln());
        nll = nll - T::from_f64(n_eff * o) * diff;
    }

    let mut max_pearson = 0.0_f64;
    let mut var_sum = 0.0_f64;
    let mut sq_sum = 0.0_f64;
    for (&o, m) in obs_p.iter().zip(mod_p.iter()) {
        let mv = m.value();
        let var = (mv * (1.0 - mv)).max(LOG_FLOOR);
        max_pearson = max_pearson.max((o - mv).abs() / (var / n_eff).sqrt());
        var_sum += mv * (1.0 - mv);
        sq_sum += (o - mv) * (o - mv);
    }
    let eff_n = if sq_sum > 0.0 { var_sum / sq_sum } else { f64::INFINITY };
    (nll, eff_n, max_pearson)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DimSel, ParamTable};
    use approx::assert_relative_eq;
    use cs_core::dims::{FEMALE, MALE, MATURE, NEW_SHELL};
    use cs_core::IndexBlock;

    #[test]
    fn test_residual_families_are_nonnegative() {
        for family in [
            LikelihoodFamily::Norm2,
            LikelihoodFamily::Normal,
            LikelihoodFamily::Lognormal,
        ] {
            for (obs, modeled) in [(10.0, 12.0), (5.0, 0.001), (100.0, 100.0)] {
                let v: f64 = aggregate_nll(
                    family,
                    obs,
                    modeled,
                    0.2,
                    crate::units::ScaleType::Cv,
                    "test",
                )
                .unwrap();
                assert!(v >= 0.0, "{family:?} gave {v} for obs={obs}, mod={modeled}");
            }
        }
    }

    #[test]
    fn test_multinomial_zero_at_perfect_fit() {
        // proportions exactly representable in binary, summing to exactly 1
        let obs = vec![25.0, 25.0, 50.0];
        let model = vec![0.25, 0.25, 0.5];
        let (nll, eff_n, pearson) = multinomial_nll(&obs, &model, 50.0);
        assert_relative_eq!(nll, 0.0, epsilon = 1e-12);
        assert!(eff_n.is_infinite());
        assert!(pearson < 1e-9);
    }

    #[test]
    fn test_multinomial_positive_off_fit() {
        let obs = vec![10.0, 30.0, 60.0];
        let model = vec![0.3, 0.3, 0.4];
        let (nll, eff_n, _) = multinomial_nll(&obs, &model, 50.0);
        assert!(nll > 0.0);
        assert!(eff_n.is_finite() && eff_n > 0.0);
    }

    #[test]
    fn test_maturity_penalties_zero_for_linear_nondecreasing() {
        let mut t = ParamTable::new();
        let logits: Vec<_> = (0..4)
            .map(|i| t.add(&format!("pLgt[{i}]"), -2.0 + i as f64, -15.0, 15.0))
            .collect();
        let combo = MaturityCombo {
            years: IndexBlock::parse("[2000]", 2000, 2000).unwrap(),
            sexes: DimSel::All,
            logits,
        };
        let pens = maturity_penalties(&t.init_values(), &[combo]);
        let (smooth, mono) = pens[0];
        assert_relative_eq!(smooth, 0.0, epsilon = 1e-12);
        assert!(mono < 1e-7); // smoothed barrier is ~0 on an increasing vector
    }

    #[test]
    fn test_maturity_penalty_flags_decreasing_segment() {
        let mut t = ParamTable::new();
        let vals = [0.0, 1.0, -1.0];
        let logits: Vec<_> = vals
            .iter()
            .enumerate()
            .map(|(i, &v)| t.add(&format!("pLgt[{i}]"), v, -15.0, 15.0))
            .collect();
        let combo = MaturityCombo {
            years: IndexBlock::parse("[2000]", 2000, 2000).unwrap(),
            sexes: DimSel::All,
            logits,
        };
        let pens = maturity_penalties(&t.init_values(), &[combo]);
        let (smooth, mono) = pens[0];
        assert!(smooth > 0.0);
        assert_relative_eq!(mono, 4.0, epsilon = 1e-4); // smoothed max(0, 2)^2
    }

    #[test]
    fn test_aggregate_pairs_by_sex() {
        let mut model = XmszArray::<f64>::zeros(2);
        model.set(MALE, MATURE, NEW_SHELL, 0, 3.0);
        model.set(FEMALE, MATURE, NEW_SHELL, 1, 7.0);
        let mut obs: CellTable = Default::default();
        obs[MALE][MATURE][NEW_SHELL] = 4.0;
        obs[FEMALE][MATURE][NEW_SHELL] = 6.0;

        let pairs = aggregate_pairs(FitType::BySex, &model, &obs).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_relative_eq!(pairs[0].0, 4.0);
        assert_relative_eq!(pairs[0].1, 3.0);
        assert_relative_eq!(pairs[1].0, 6.0);
        assert_relative_eq!(pairs[1].1, 7.0);

        let total = aggregate_pairs(FitType::ByTotal, &model, &obs).unwrap();
        assert_relative_eq!(total[0].0, 10.0);
        assert_relative_eq!(total[0].1, 10.0);
    }

    #[test]
    fn test_extended_fit_rejected_for_aggregates() {
        let model = XmszArray::<f64>::zeros(2);
        let obs: CellTable = Default::default();
        assert!(aggregate_pairs(FitType::BySexExtended, &model, &obs).is_err());
    }

    #[test]
    fn test_comp_vectors_extended_concatenates() {
        let mut model = XmszArray::<f64>::zeros(2);
        let mut obs = XmszArray::<f64>::zeros(2);
        model.set(MALE, MATURE, NEW_SHELL, 0, 1.0);
        model.set(FEMALE, MATURE, NEW_SHELL, 1, 2.0);
        obs.set(MALE, MATURE, NEW_SHELL, 0, 5.0);
        obs.set(FEMALE, MATURE, NEW_SHELL, 1, 5.0);

        let plain = comp_vectors(FitType::BySex, &model, &obs);
        assert_eq!(plain.len(), 2);
        assert_eq!(plain[0].0.len(), 2);

        let ext = comp_vectors(FitType::BySexExtended, &model, &obs);
        assert_eq!(ext.len(), 1);
        assert_eq!(ext[0].0.len(), 4); // block-concatenated per sex
        assert_relative_eq!(ext[0].1[1 + 2], 2.0); // female block, bin 1
    }
}
