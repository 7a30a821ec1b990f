//! Staged fitting driver.
//!
//! Runs the optimizer through a schedule of estimation stages. Raising the
//! model's stage counter activates stage-gated terms (the explicit
//! replacement for optimizer-phase scheduling); each stage re-optimizes from
//! the previous stage's solution. Covariance comes from a finite-difference
//! Hessian of the exact gradient at the final solution.

use crate::objective::{AssessmentObjective, ObjectiveFunction};
use crate::optimizer::{LbfgsOptimizer, OptimizerConfig};
use cs_core::{Error, FitResult, Result};
use cs_model::Assessment;
use nalgebra::DMatrix;

/// One estimation stage.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Stage counter value (activates parameters with `stage <=` this).
    pub stage: u32,
    /// Optimizer settings for this stage.
    pub optimizer: OptimizerConfig,
}

/// Staged maximum-likelihood fitter.
#[derive(Debug, Clone)]
pub struct Fitter {
    stages: Vec<StageConfig>,
    /// Compute the covariance matrix at the solution.
    pub with_covariance: bool,
}

impl Fitter {
    /// Single-stage fitter with default optimizer settings.
    pub fn new() -> Self {
        Self {
            stages: vec![StageConfig { stage: 0, optimizer: OptimizerConfig::default() }],
            with_covariance: true,
        }
    }

    /// Fitter with an explicit stage schedule.
    pub fn with_stages(stages: Vec<StageConfig>) -> Result<Self> {
        if stages.is_empty() {
            return Err(Error::Config("fit schedule needs at least one stage".into()));
        }
        Ok(Self { stages, with_covariance: true })
    }

    /// Fit the model, mutating its stage counter as the schedule advances.
    pub fn fit(&self, model: &mut Assessment) -> Result<FitResult> {
        let mut params = model.params.init_values();
        let bounds = model.params.bounds();
        let mut fval = f64::NAN;
        let mut converged = false;
        let mut n_evaluations = 0;

        for stage in &self.stages {
            model.stage = stage.stage;
            let objective = AssessmentObjective::new(model);
            let optimizer = LbfgsOptimizer::new(stage.optimizer.clone());
            let result = optimizer.minimize(&objective, &params, &bounds)?;
            log::info!(
                "stage {}: {} after {} iterations",
                stage.stage,
                result.fval,
                result.n_iter
            );
            params = result.parameters;
            fval = result.fval;
            converged = result.converged;
            n_evaluations += result.n_fev;
        }

        let n = params.len();
        let (uncertainties, covariance) = if self.with_covariance {
            let objective = AssessmentObjective::new(model);
            let hessian = fd_hessian(&objective, &params)?;
            match invert(&hessian, n) {
                Some(cov) => {
                    let mut sd = Vec::with_capacity(n);
                    let mut ok = true;
                    for i in 0..n {
                        let var = cov[(i, i)];
                        if var.is_finite() && var > 0.0 {
                            sd.push(var.sqrt());
                        } else {
                            ok = false;
                            sd.push(diagonal_uncertainty(&hessian, i));
                        }
                    }
                    if ok {
                        (sd, Some(cov.iter().copied().collect::<Vec<f64>>()))
                    } else {
                        log::warn!("Invalid covariance diagonal; omitting covariance matrix");
                        (sd, None)
                    }
                }
                None => {
                    log::warn!("Hessian inversion failed, using diagonal approximation");
                    let sd = (0..n).map(|i| diagonal_uncertainty(&hessian, i)).collect();
                    (sd, None)
                }
            }
        } else {
            (vec![f64::NAN; n], None)
        };

        let mut fit = FitResult::new(params, uncertainties, fval, converged, n_evaluations);
        if let Some(cov) = covariance {
            fit = fit.with_covariance(cov);
        }
        Ok(fit)
    }
}

impl Default for Fitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Finite-difference Hessian from the (exact) gradient, symmetrized.
fn fd_hessian(objective: &dyn ObjectiveFunction, params: &[f64]) -> Result<DMatrix<f64>> {
    let n = params.len();
    let mut h = DMatrix::zeros(n, n);
    for j in 0..n {
        let eps = 1e-6 * params[j].abs().max(1.0);
        let mut plus = params.to_vec();
        plus[j] += eps;
        let g_plus = objective.gradient(&plus)?;
        let mut minus = params.to_vec();
        minus[j] -= eps;
        let g_minus = objective.gradient(&minus)?;
        for i in 0..n {
            h[(i, j)] = (g_plus[i] - g_minus[i]) / (2.0 * eps);
        }
    }
    // symmetrize
    for i in 0..n {
        for j in (i + 1)..n {
            let avg = 0.5 * (h[(i, j)] + h[(j, i)]);
            h[(i, j)] = avg;
            h[(j, i)] = avg;
        }
    }
    Ok(h)
}

fn invert(h: &DMatrix<f64>, n: usize) -> Option<DMatrix<f64>> {
    if n == 0 {
        return None;
    }
    h.clone().try_inverse()
}

fn diagonal_uncertainty(h: &DMatrix<f64>, i: usize) -> f64 {
    let d = h[(i, i)];
    if d > 0.0 {
        (1.0 / d).sqrt()
    } else {
        f64::NAN
    }
}
