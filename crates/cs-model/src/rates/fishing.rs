//! Fishery capture rates, with the retained / discard-mortality split.
//!
//! Two mutually exclusive calculation modes per combination:
//!
//! - **parametric**: a log-linear additive model (base + temporal + sex +
//!   immature + interaction offsets, each optional) with optional per-year
//!   deviations, exponentiated and multiplied by the year's selectivity curve;
//! - **effort-ratio**: the fully-selected rate is back-calculated from the
//!   observed effort times a precomputed ratio (average fully-selected rate
//!   over the effort series' reference period divided by the average effort
//!   over that period), under one of three averaging conventions.

use crate::arrays::XmszArray;
use crate::config::Verbosity;
use crate::data::EffortSeries;
use crate::params::{DevVector, ParamRef};
use crate::rates::LogLinearOffsets;
use cs_ad::Scalar;
use cs_core::dims::{N_MATURITY, N_SEXES, N_SHELL};
use cs_core::{Error, IndexBlock, ModelDims, Result};

/// Convention for turning the reference-period ratio and a year's effort
/// into a capture rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffortAveraging {
    /// `F = ratio · effort`.
    Linear,
    /// `F = 1 − exp(−ratio · effort)`.
    OneMinusExp,
    /// Size-specific ratios averaged over the reference period.
    MeanSizeSpecific,
}

impl EffortAveraging {
    /// Parse an averaging keyword.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "LINEAR" => Ok(Self::Linear),
            "ONE_MINUS_EXP" => Ok(Self::OneMinusExp),
            "MEAN_SIZE_SPECIFIC" => Ok(Self::MeanSizeSpecific),
            _ => Err(Error::Config(format!(
                "unrecognized effort-averaging option '{s}'"
            ))),
        }
    }
}

/// Capture-rate calculation mode.
#[derive(Debug, Clone)]
pub enum CaptureSpec {
    /// Log-linear additive model with optional yearly deviations.
    Parametric {
        /// Log-scale fully-selected capture rate.
        ln_c: ParamRef,
        /// Optional additive offsets.
        offsets: LogLinearOffsets,
        /// Optional yearly deviations.
        devs: Option<DevVector>,
    },
    /// Back-calculation from observed effort over the series' reference period.
    EffortRatio {
        /// Averaging convention.
        averaging: EffortAveraging,
    },
}

/// One fishery parameter combination.
#[derive(Debug, Clone)]
pub struct FisheryCombo {
    /// Fishery index.
    pub fishery: usize,
    /// Years this combination applies to.
    pub years: IndexBlock,
    /// Capture-rate mode.
    pub capture: CaptureSpec,
    /// Selectivity function id.
    pub sel_fn: usize,
    /// Retention function id; `None` means a discard-only fishery.
    pub ret_fn: Option<usize>,
    /// Fraction of discarded animals that die.
    pub handling_mortality: f64,
}

/// Fishery rates for one evaluation, all `[fishery][year]`.
#[derive(Debug, Clone)]
pub struct FishingRates<T> {
    /// Capture rate (includes animals returned alive).
    pub capture: Vec<Vec<XmszArray<T>>>,
    /// Retained-mortality rate.
    pub retained: Vec<Vec<XmszArray<T>>>,
    /// Discard-mortality rate.
    pub discard: Vec<Vec<XmszArray<T>>>,
    /// Deviation values per combination with deviations (for regularization).
    pub capture_devs: Vec<Vec<T>>,
}

impl<T: Scalar> FishingRates<T> {
    fn zeros(dims: &ModelDims) -> Self {
        let blank = || {
            (0..dims.n_fisheries)
                .map(|_| (0..dims.n_years()).map(|_| XmszArray::zeros(dims.n_bins())).collect())
                .collect()
        };
        Self { capture: blank(), retained: blank(), discard: blank(), capture_devs: Vec::new() }
    }

    /// Total fishing mortality rate (retained + discard) for a cell, summed
    /// over fisheries.
    pub fn total_mortality(&self, yi: usize, x: usize, m: usize, s: usize, z: usize) -> T {
        let mut tot = T::zero();
        for f in 0..self.retained.len() {
            tot = tot + self.retained[f][yi].get(x, m, s, z) + self.discard[f][yi].get(x, m, s, z);
        }
        tot
    }
}

/// Fill capture/retained/discard rates for one (fishery, year) from the
/// fully-selected rate and the year's selectivity/retention curves.
#[allow(clippy::too_many_arguments)]
fn fill_year<T: Scalar>(
    rates: &mut FishingRates<T>,
    combo: &FisheryCombo,
    yi: usize,
    x: usize,
    m: usize,
    fully_selected: T,
    sel: &[T],
    ret: Option<&[T]>,
) {
    let f = combo.fishery;
    let hm = T::from_f64(combo.handling_mortality);
    let nb = sel.len();
    for z in 0..nb {
        let cap = fully_selected * sel[z];
        let (kept, dead_discard) = match ret {
            Some(ret) => {
                let kept = cap * ret[z];
                (kept, cap * hm * (T::one() - ret[z]))
            }
            None => (T::zero(), cap * hm),
        };
        for s in 0..N_SHELL {
            rates.capture[f][yi].set(x, m, s, z, cap);
            rates.retained[f][yi].set(x, m, s, z, kept);
            rates.discard[f][yi].set(x, m, s, z, dead_discard);
        }
    }
}

/// Compute all fishery rates. `selectivity` is indexed `[function][yi][z]`;
/// `effort` holds one optional series per fishery.
pub fn fishing_rates<T: Scalar>(
    params: &[T],
    combos: &[FisheryCombo],
    selectivity: &[Vec<Vec<T>>],
    effort: &[Option<&EffortSeries>],
    dims: &ModelDims,
    verbosity: &Verbosity,
) -> Result<FishingRates<T>> {
    let mut rates = FishingRates::zeros(dims);
    // Fully-selected parametric rates per (fishery, year, sex, maturity),
    // kept for the effort-ratio reference periods.
    let mut fsc: Vec<Vec<Option<[[T; N_MATURITY]; N_SEXES]>>> =
        vec![vec![None; dims.n_years()]; dims.n_fisheries];

    // First pass: parametric combinations, in definition order (later
    // combinations overwrite earlier ones on overlapping years).
    for combo in combos {
        let CaptureSpec::Parametric { ln_c, offsets, devs } = &combo.capture else {
            continue;
        };
        let ret = combo.ret_fn.map(|r| &selectivity[r]);
        for &y in combo.years.indices() {
            let Some(yi) = dims.year_index(y) else {
                continue; // outside the model range: skipped, not erred
            };
            if yi >= dims.n_years() {
                continue; // no fishing in the terminal slice
            }
            let mut fs_cell = [[T::zero(); N_MATURITY]; N_SEXES];
            for x in 0..N_SEXES {
                for m in 0..N_MATURITY {
                    let mut ln = params[ln_c.0] + offsets.ln_sum(params, x, m);
                    if let Some(devs) = devs {
                        ln = ln + devs.value_at(params, y)?;
                    }
                    let fs = ln.exp();
                    fs_cell[x][m] = fs;
                    fill_year(
                        &mut rates,
                        combo,
                        yi,
                        x,
                        m,
                        fs,
                        &selectivity[combo.sel_fn][yi],
                        ret.map(|r| r[yi].as_slice()),
                    );
                }
            }
            fsc[combo.fishery][yi] = Some(fs_cell);
        }
        if let Some(devs) = devs {
            rates.capture_devs.push(devs.values(params).to_vec());
        }
    }

    // Second pass: effort-ratio combinations.
    for combo in combos {
        let CaptureSpec::EffortRatio { averaging } = &combo.capture else {
            continue;
        };
        let f = combo.fishery;
        let series = effort[f].ok_or_else(|| {
            Error::Config(format!(
                "fishery {f} uses effort-ratio capture rates but has no effort data"
            ))
        })?;
        let ratio = reference_ratio(&fsc[f], &rates, series, f, *averaging, dims)?;
        if verbosity.rates {
            log::debug!("fishery {f}: effort-ratio reference computed");
        }
        let ret = combo.ret_fn.map(|r| &selectivity[r]);
        for &y in combo.years.indices() {
            let Some(yi) = dims.year_index(y) else {
                continue;
            };
            if yi >= dims.n_years() {
                continue;
            }
            let eff = series.value(y).ok_or_else(|| {
                Error::Config(format!("fishery {f}: no effort observation for year {y}"))
            })?;
            for x in 0..N_SEXES {
                for m in 0..N_MATURITY {
                    match &ratio {
                        ReferenceRatio::FullySelected(r) => {
                            let fs = match averaging {
                                EffortAveraging::Linear => r[x][m] * T::from_f64(eff),
                                EffortAveraging::OneMinusExp => {
                                    T::one() - (-r[x][m] * T::from_f64(eff)).exp()
                                }
                                EffortAveraging::MeanSizeSpecific => unreachable!(),
                            };
                            fill_year(
                                &mut rates,
                                combo,
                                yi,
                                x,
                                m,
                                fs,
                                &selectivity[combo.sel_fn][yi],
                                ret.map(|r| r[yi].as_slice()),
                            );
                        }
                        ReferenceRatio::SizeSpecific(rz) => {
                            // capture rate per size is ratio_z * effort; the
                            // size structure is carried by the ratio itself
                            let curve: Vec<T> = rz[x][m]
                                .iter()
                                .map(|&r| r * T::from_f64(eff))
                                .collect();
                            fill_year(
                                &mut rates,
                                combo,
                                yi,
                                x,
                                m,
                                T::one(),
                                &curve,
                                ret.map(|r| r[yi].as_slice()),
                            );
                        }
                    }
                }
            }
        }
    }

    Ok(rates)
}

enum ReferenceRatio<T> {
    FullySelected([[T; N_MATURITY]; N_SEXES]),
    SizeSpecific([[Vec<T>; N_MATURITY]; N_SEXES]),
}

/// Average fully-selected rate (or size-specific rate) over the reference
/// period, divided by the average effort over the same years. Only years
/// with both a parametric rate and an effort observation contribute.
fn reference_ratio<T: Scalar>(
    fsc: &[Option<[[T; N_MATURITY]; N_SEXES]>],
    rates: &FishingRates<T>,
    series: &EffortSeries,
    fishery: usize,
    averaging: EffortAveraging,
    dims: &ModelDims,
) -> Result<ReferenceRatio<T>> {
    let nb = dims.n_bins();
    let mut years = Vec::new();
    for &y in series.avg_years.indices() {
        if let Some(yi) = dims.year_index(y) {
            if yi < dims.n_years() && fsc[yi].is_some() && series.value(y).is_some() {
                years.push((y, yi));
            }
        }
    }
    if years.is_empty() {
        return Err(Error::Config(format!(
            "fishery {fishery}: effort reference period has no years with both \
             a parametric capture rate and an effort observation"
        )));
    }
    let n = T::from_f64(years.len() as f64);
    let mean_eff = T::from_f64(
        years.iter().map(|&(y, _)| series.value(y).unwrap_or(0.0)).sum::<f64>()
            / years.len() as f64,
    );

    if averaging == EffortAveraging::MeanSizeSpecific {
        let mut rz: [[Vec<T>; N_MATURITY]; N_SEXES] =
            std::array::from_fn(|_| std::array::from_fn(|_| vec![T::zero(); nb]));
        for &(y, yi) in &years {
            let eff = T::from_f64(series.value(y).unwrap_or(0.0));
            for (x, row) in rz.iter_mut().enumerate() {
                for (m, col) in row.iter_mut().enumerate() {
                    for (z, slot) in col.iter_mut().enumerate() {
                        let cap = rates.capture[fishery][yi].get(x, m, 0, z);
                        *slot = *slot + cap / eff;
                    }
                }
            }
        }
        for row in rz.iter_mut() {
            for col in row.iter_mut() {
                for slot in col.iter_mut() {
                    *slot = *slot / n;
                }
            }
        }
        return Ok(ReferenceRatio::SizeSpecific(rz));
    }

    let mut mean_fs = [[T::zero(); N_MATURITY]; N_SEXES];
    for &(_, yi) in &years {
        if let Some(cell) = fsc[yi].as_ref() {
            for (x, row) in cell.iter().enumerate() {
                for (m, &v) in row.iter().enumerate() {
                    mean_fs[x][m] = mean_fs[x][m] + v;
                }
            }
        }
    }
    for row in mean_fs.iter_mut() {
        for v in row.iter_mut() {
            *v = *v / n / mean_eff;
        }
    }
    Ok(ReferenceRatio::FullySelected(mean_fs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamTable;
    use approx::assert_relative_eq;
    use cs_core::dims::{MALE, MATURE, NEW_SHELL};
    use cs_core::SizeGrid;

    fn dims() -> ModelDims {
        ModelDims::new(2000, 2003, SizeGrid::new(vec![25.0, 75.0, 125.0]).unwrap(), 1, 1)
            .unwrap()
    }

    fn flat_sel(dims: &ModelDims, n_fns: usize) -> Vec<Vec<Vec<f64>>> {
        vec![vec![vec![1.0; dims.n_bins()]; dims.n_slices()]; n_fns]
    }

    fn parametric_combo(t: &mut ParamTable, years: &str, ret_fn: Option<usize>) -> FisheryCombo {
        FisheryCombo {
            fishery: 0,
            years: IndexBlock::parse(years, 2000, 2003).unwrap(),
            capture: CaptureSpec::Parametric {
                ln_c: t.add("pLnC", (0.4_f64).ln(), -10.0, 5.0),
                offsets: LogLinearOffsets::none(),
                devs: None,
            },
            sel_fn: 0,
            ret_fn,
            handling_mortality: 0.3,
        }
    }

    #[test]
    fn test_discard_only_fishery() {
        let mut t = ParamTable::new();
        let combo = parametric_combo(&mut t, "[-1:-1]", None);
        let d = dims();
        let sel = flat_sel(&d, 1);
        let r = fishing_rates(
            &t.init_values(),
            &[combo],
            &sel,
            &[None],
            &d,
            &Verbosity::default(),
        )
        .unwrap();
        let cap = r.capture[0][0].get(MALE, MATURE, NEW_SHELL, 0);
        assert_relative_eq!(cap, 0.4, epsilon = 1e-12);
        assert_eq!(r.retained[0][0].get(MALE, MATURE, NEW_SHELL, 0), 0.0);
        assert_relative_eq!(
            r.discard[0][0].get(MALE, MATURE, NEW_SHELL, 0),
            0.4 * 0.3,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_retention_split() {
        let mut t = ParamTable::new();
        let combo = parametric_combo(&mut t, "[-1:-1]", Some(1));
        let d = dims();
        let mut sel = flat_sel(&d, 2);
        // retention = 0.75 everywhere
        for year in sel[1].iter_mut() {
            for v in year.iter_mut() {
                *v = 0.75;
            }
        }
        let r = fishing_rates(
            &t.init_values(),
            &[combo],
            &sel,
            &[None],
            &d,
            &Verbosity::default(),
        )
        .unwrap();
        let kept = r.retained[0][0].get(MALE, MATURE, NEW_SHELL, 0);
        let dead = r.discard[0][0].get(MALE, MATURE, NEW_SHELL, 0);
        assert_relative_eq!(kept, 0.4 * 0.75, epsilon = 1e-12);
        assert_relative_eq!(dead, 0.4 * 0.3 * 0.25, epsilon = 1e-12);
        assert_relative_eq!(
            r.total_mortality(0, MALE, MATURE, NEW_SHELL, 0),
            kept + dead,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_effort_ratio_linear() {
        let mut t = ParamTable::new();
        // parametric over 2000:2001, effort-ratio over 2002:2003
        let para = parametric_combo(&mut t, "[2000:2001]", None);
        let eff_combo = FisheryCombo {
            fishery: 0,
            years: IndexBlock::parse("[2002:2003]", 2000, 2003).unwrap(),
            capture: CaptureSpec::EffortRatio { averaging: EffortAveraging::Linear },
            sel_fn: 0,
            ret_fn: None,
            handling_mortality: 0.3,
        };
        let series = EffortSeries::new(
            IndexBlock::parse("[2000:2001]", 2000, 2003).unwrap(),
            vec![(2000, 100.0), (2001, 100.0), (2002, 50.0), (2003, 200.0)],
        );
        let d = dims();
        let sel = flat_sel(&d, 1);
        let r = fishing_rates(
            &t.init_values(),
            &[para, eff_combo],
            &sel,
            &[Some(&series)],
            &d,
            &Verbosity::default(),
        )
        .unwrap();
        // ratio = 0.4 / 100; 2002: F = ratio * 50 = 0.2; 2003: F = 0.8
        assert_relative_eq!(
            r.capture[0][2].get(MALE, MATURE, NEW_SHELL, 0),
            0.2,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            r.capture[0][3].get(MALE, MATURE, NEW_SHELL, 1),
            0.8,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_effort_ratio_requires_effort_data() {
        let t = ParamTable::new();
        let combo = FisheryCombo {
            fishery: 0,
            years: IndexBlock::parse("[-1:-1]", 2000, 2003).unwrap(),
            capture: CaptureSpec::EffortRatio { averaging: EffortAveraging::Linear },
            sel_fn: 0,
            ret_fn: None,
            handling_mortality: 0.3,
        };
        let d = dims();
        let sel = flat_sel(&d, 1);
        let err = fishing_rates(
            &t.init_values(),
            &[combo],
            &sel,
            &[None],
            &d,
            &Verbosity::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("effort"));
    }

    #[test]
    fn test_unknown_averaging_keyword() {
        assert!(EffortAveraging::parse("GEOMETRIC").is_err());
        assert_eq!(EffortAveraging::parse("LINEAR").unwrap(), EffortAveraging::Linear);
    }
}
