//! Population projector: the year-stepping state machine.
//!
//! Each model year applies natural mortality, fishing mortality and
//! molt/growth/maturation in the seasonal order set by the year's timing
//! fractions, records spawning (mature) biomass at mating, and injects
//! recruits into immature/new-shell at year end. The `max_year + 1` slice is
//! the terminal output: sampled by the surveys but never advanced.

use crate::arrays::{XmszArray, XmzArray};
use crate::config::{InitialState, ModelConfig};
use crate::rates::ModelRates;
use cs_ad::Scalar;
use cs_core::dims::{
    IMMATURE, MATURE, NEW_SHELL, N_MATURITY, N_SEXES, N_SHELL, OLD_SHELL,
};
use cs_core::{ModelDims, Result};

/// Full projection output for one evaluation.
#[derive(Debug, Clone)]
pub struct Projection<T> {
    /// Numbers-at-size per slice, `min_year..=max_year+1`.
    pub numbers: Vec<XmszArray<T>>,
    /// Spawning (mature) biomass per sex at mating time, per advanced year.
    pub mating_biomass: Vec<[T; N_SEXES]>,
    /// Numbers lost to natural mortality, per advanced year.
    pub natural_loss: Vec<XmszArray<T>>,
    /// Numbers lost to all causes, per advanced year.
    pub total_loss: Vec<XmszArray<T>>,
    /// Captured numbers (including releases) `[fishery][year]`.
    pub captured: Vec<Vec<XmszArray<T>>>,
    /// Retained-mortality numbers `[fishery][year]`.
    pub retained: Vec<Vec<XmszArray<T>>>,
    /// Discard-mortality numbers `[fishery][year]`.
    pub discarded: Vec<Vec<XmszArray<T>>>,
}

/// Mature biomass per sex for a state (both shell conditions).
pub fn mature_biomass<T: Scalar>(
    state: &XmszArray<T>,
    weight: &XmzArray<f64>,
) -> [T; N_SEXES] {
    let mut out = [T::zero(); N_SEXES];
    for (x, slot) in out.iter_mut().enumerate() {
        let mut b = T::zero();
        for s in 0..N_SHELL {
            for z in 0..state.n_bins() {
                b = b + state.get(x, MATURE, s, z) * T::from_f64(weight.get(x, MATURE, z));
            }
        }
        *slot = b;
    }
    out
}

/// Run the projection.
pub fn project<T: Scalar>(
    cfg: &ModelConfig,
    dims: &ModelDims,
    rates: &ModelRates<T>,
) -> Result<Projection<T>> {
    let nb = dims.n_bins();
    let ny = dims.n_years();
    let nf = dims.n_fisheries;

    let initial = match &cfg.initial {
        InitialState::Zero => XmszArray::zeros(nb),
        InitialState::Fixed(n0) => n0.map(T::from_f64),
    };

    let per_fishery_year =
        || -> Vec<Vec<XmszArray<T>>> {
            (0..nf).map(|_| (0..ny).map(|_| XmszArray::zeros(nb)).collect()).collect()
        };

    let mut out = Projection {
        numbers: Vec::with_capacity(dims.n_slices()),
        mating_biomass: Vec::with_capacity(ny),
        natural_loss: (0..ny).map(|_| XmszArray::zeros(nb)).collect(),
        total_loss: (0..ny).map(|_| XmszArray::zeros(nb)).collect(),
        captured: per_fishery_year(),
        retained: per_fishery_year(),
        discarded: per_fishery_year(),
    };
    out.numbers.push(initial);

    for yi in 0..ny {
        let mut state = out.numbers[yi].clone();
        let dtf = cfg.dt_fishery[yi];
        let dtm = cfg.dt_mating[yi];

        if dtf <= dtm {
            natural_step(&mut state, rates, yi, dtf, &mut out);
            fishing_step(&mut state, rates, yi, &mut out);
            if dtm > dtf {
                natural_step(&mut state, rates, yi, dtm - dtf, &mut out);
            }
            out.mating_biomass.push(mature_biomass(&state, &cfg.weight_at_size));
            molt_step(&mut state, rates, yi);
            if dtm < 1.0 {
                natural_step(&mut state, rates, yi, 1.0 - dtm, &mut out);
            }
        } else {
            natural_step(&mut state, rates, yi, dtm, &mut out);
            out.mating_biomass.push(mature_biomass(&state, &cfg.weight_at_size));
            molt_step(&mut state, rates, yi);
            natural_step(&mut state, rates, yi, dtf - dtm, &mut out);
            fishing_step(&mut state, rates, yi, &mut out);
            if dtf < 1.0 {
                natural_step(&mut state, rates, yi, 1.0 - dtf, &mut out);
            }
        }

        // recruitment enters immature/new-shell at year end
        for x in 0..N_SEXES {
            for z in 0..nb {
                state.add(x, IMMATURE, NEW_SHELL, z, rates.recruitment.at(yi, x, z));
            }
        }

        if cfg.verbosity.projection {
            log::debug!(
                "year {}: total abundance {}",
                dims.min_year + yi as i32 + 1,
                state.total().value()
            );
        }
        out.numbers.push(state);
    }

    Ok(out)
}

/// Exponential natural-mortality survival over `dt` of the year.
fn natural_step<T: Scalar>(
    state: &mut XmszArray<T>,
    rates: &ModelRates<T>,
    yi: usize,
    dt: f64,
    out: &mut Projection<T>,
) {
    let m_arr = &rates.natural_mortality[yi];
    for x in 0..N_SEXES {
        for m in 0..N_MATURITY {
            for s in 0..N_SHELL {
                for z in 0..state.n_bins() {
                    let n = state.get(x, m, s, z);
                    let surv = n * (-m_arr.get(x, m, z) * T::from_f64(dt)).exp();
                    let lost = n - surv;
                    state.set(x, m, s, z, surv);
                    out.natural_loss[yi].add(x, m, s, z, lost);
                    out.total_loss[yi].add(x, m, s, z, lost);
                }
            }
        }
    }
}

/// Simultaneous fishing pulse: survivors under total F, removals apportioned
/// to each fishery/disposition in proportion to its rate share, with a
/// neutral ratio of 1 wherever total F is exactly zero.
fn fishing_step<T: Scalar>(
    state: &mut XmszArray<T>,
    rates: &ModelRates<T>,
    yi: usize,
    out: &mut Projection<T>,
) {
    let nf = out.captured.len();
    for x in 0..N_SEXES {
        for m in 0..N_MATURITY {
            for s in 0..N_SHELL {
                for z in 0..state.n_bins() {
                    let tot_f = rates.fishing.total_mortality(yi, x, m, s, z);
                    let n = state.get(x, m, s, z);
                    let surv = n * (-tot_f).exp();
                    let removed = n - surv;
                    state.set(x, m, s, z, surv);
                    out.total_loss[yi].add(x, m, s, z, removed);

                    let zero_f = tot_f.value() == 0.0;
                    for f in 0..nf {
                        let ret = rates.fishing.retained[f][yi].get(x, m, s, z);
                        let dsc = rates.fishing.discard[f][yi].get(x, m, s, z);
                        let cap = rates.fishing.capture[f][yi].get(x, m, s, z);
                        let (rr, dr, cr) = if zero_f {
                            (T::one(), T::one(), T::one())
                        } else {
                            (ret / tot_f, dsc / tot_f, cap / tot_f)
                        };
                        out.retained[f][yi].add(x, m, s, z, removed * rr);
                        out.discarded[f][yi].add(x, m, s, z, removed * dr);
                        out.captured[f][yi].add(x, m, s, z, removed * cr);
                    }
                }
            }
        }
    }
}

/// Molt/growth/maturation. All immature new-shell animals molt; a
/// size-specific fraction matures at molt (terminal molt). Mature animals do
/// not molt again: mature new-shell joins mature old-shell. Immature
/// old-shell is not a modeled category and stays identically zero.
fn molt_step<T: Scalar>(state: &mut XmszArray<T>, rates: &ModelRates<T>, yi: usize) {
    let nb = state.n_bins();
    for x in 0..N_SEXES {
        let ogive = &rates.maturity[yi][x];
        let mut staying = Vec::with_capacity(nb);
        let mut maturing = Vec::with_capacity(nb);
        for z in 0..nb {
            let n = state.get(x, IMMATURE, NEW_SHELL, z);
            staying.push((T::one() - ogive[z]) * n);
            maturing.push(ogive[z] * n);
        }
        let new_imm = rates.growth.apply(x, IMMATURE, &staying);
        let new_mat = rates.growth.apply(x, MATURE, &maturing);
        for z in 0..nb {
            let accumulated =
                state.get(x, MATURE, NEW_SHELL, z) + state.get(x, MATURE, OLD_SHELL, z);
            state.set(x, IMMATURE, NEW_SHELL, z, new_imm[z]);
            state.set(x, IMMATURE, OLD_SHELL, z, T::zero());
            state.set(x, MATURE, NEW_SHELL, z, new_mat[z]);
            state.set(x, MATURE, OLD_SHELL, z, accumulated);
        }
    }
}
