//! Self-test simulation: overwrite the observed datasets with the model's
//! own output, optionally with stochastic noise, for model-recovery testing.
//!
//! This is the one code path allowed to mutate the observed data.

use crate::arrays::XmszArray;
use crate::data::{AggregateSeries, CatchSeries, SizeCompSeries};
use crate::model::Assessment;
use cs_core::dims::{N_MATURITY, N_SEXES, N_SHELL};
use cs_core::Result;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Normal;

/// Noise applied to the simulated observations.
#[derive(Debug, Clone, Copy)]
pub struct SimNoise {
    /// Lognormal CV on aggregate series (0 = exact).
    pub aggregate_cv: f64,
    /// Resample compositions multinomially at each row's sample size.
    pub resample_comps: bool,
}

impl Assessment {
    /// Replace every observed series with the corresponding modeled quantity
    /// at `params`. With `noise`, aggregates get mean-preserving lognormal
    /// error and compositions are redrawn multinomially.
    pub fn simulate_observations(
        &mut self,
        params: &[f64],
        seed: u64,
        noise: Option<SimNoise>,
    ) -> Result<()> {
        let run = self.run::<f64>(params)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let dims = self.dims.clone();
        let weight = self.config.weight_at_size.clone();

        let mut fisheries = std::mem::take(&mut self.data.fisheries);
        for (f, fd) in fisheries.iter_mut().enumerate() {
            let kinds: [(&mut Option<CatchSeries>, &Vec<Vec<XmszArray<f64>>>); 3] = [
                (&mut fd.retained, &run.projection.retained),
                (&mut fd.discarded, &run.projection.discarded),
                (&mut fd.total, &run.projection.captured),
            ];
            for (series, model) in kinds {
                if let Some(series) = series {
                    overwrite_series(
                        series,
                        |y| {
                            dims.year_index(y)
                                .filter(|&yi| yi < dims.n_years())
                                .map(|yi| &model[f][yi])
                        },
                        &weight,
                        noise,
                        &mut rng,
                    );
                }
            }
        }
        self.data.fisheries = fisheries;

        let mut surveys = std::mem::take(&mut self.data.surveys);
        for (v, sd) in surveys.iter_mut().enumerate() {
            overwrite_series(
                &mut sd.series,
                |y| dims.year_index(y).map(|yi| &run.samples.numbers[v][yi]),
                &weight,
                noise,
                &mut rng,
            );
        }
        self.data.surveys = surveys;

        Ok(())
    }
}

fn overwrite_series<'a>(
    series: &mut CatchSeries,
    model_at: impl Fn(i32) -> Option<&'a XmszArray<f64>>,
    weight: &crate::arrays::XmzArray<f64>,
    noise: Option<SimNoise>,
    rng: &mut StdRng,
) {
    if let Some(agg) = &mut series.abundance {
        overwrite_aggregate(agg, &model_at, None, noise, rng);
    }
    if let Some(agg) = &mut series.biomass {
        overwrite_aggregate(agg, &model_at, Some(weight), noise, rng);
    }
    if let Some(comps) = &mut series.size_comps {
        overwrite_comps(comps, &model_at, noise, rng);
    }
}

fn overwrite_aggregate<'a>(
    series: &mut AggregateSeries,
    model_at: &impl Fn(i32) -> Option<&'a XmszArray<f64>>,
    weight: Option<&crate::arrays::XmzArray<f64>>,
    noise: Option<SimNoise>,
    rng: &mut StdRng,
) {
    for row in &mut series.rows {
        let Some(model) = model_at(row.year) else {
            continue;
        };
        for x in 0..N_SEXES {
            for m in 0..N_MATURITY {
                for s in 0..N_SHELL {
                    let mut v = 0.0;
                    for z in 0..model.n_bins() {
                        let w = weight.map_or(1.0, |w| w.get(x, m, z));
                        v += model.get(x, m, s, z) * w;
                    }
                    row.values[x][m][s] = v;
                }
            }
        }
        if let Some(noise) = noise {
            if noise.aggregate_cv > 0.0 {
                let sigma = (1.0 + noise.aggregate_cv.powi(2)).ln().sqrt();
                if let Ok(normal) = Normal::new(0.0, sigma) {
                    // mean-preserving lognormal multiplier
                    let mult = (normal.sample(rng) - 0.5 * sigma * sigma).exp();
                    for plane in &mut row.values {
                        for line in plane.iter_mut() {
                            for v in line.iter_mut() {
                                *v *= mult;
                            }
                        }
                    }
                }
            }
        }
    }
}

fn overwrite_comps<'a>(
    series: &mut SizeCompSeries,
    model_at: &impl Fn(i32) -> Option<&'a XmszArray<f64>>,
    noise: Option<SimNoise>,
    rng: &mut StdRng,
) {
    for row in &mut series.rows {
        let Some(model) = model_at(row.year) else {
            continue;
        };
        let total = model.total().max(f64::MIN_POSITIVE);
        row.comps = model.map(|v| v / total);

        let resample = noise.map(|n| n.resample_comps).unwrap_or(false);
        if resample && row.sample_size >= 1.0 {
            let probs: Vec<f64> = row.comps.values().to_vec();
            if let Ok(index) = WeightedIndex::new(&probs) {
                let n = row.sample_size.round() as usize;
                let mut counts = vec![0.0; probs.len()];
                for _ in 0..n {
                    counts[index.sample(rng)] += 1.0;
                }
                // cells() enumerates in flat order, matching `counts`
                let source = row.comps.clone();
                let mut drawn = XmszArray::zeros(source.n_bins());
                for (i, (x, m, s, z, _)) in source.cells().enumerate() {
                    drawn.set(x, m, s, z, counts[i] / n as f64);
                }
                row.comps = drawn;
            }
        }
    }
}
