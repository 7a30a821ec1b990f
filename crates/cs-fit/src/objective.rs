//! Objective-function trait and the assessment adapter.

use cs_core::Result;
use cs_model::Assessment;

/// Objective function trait for optimization
pub trait ObjectiveFunction: Send + Sync {
    /// Evaluate function at given parameters
    fn eval(&self, params: &[f64]) -> Result<f64>;

    /// Compute gradient at given parameters (numerical if not overridden)
    fn gradient(&self, params: &[f64]) -> Result<Vec<f64>> {
        // Default: central differences with adaptive step size
        let n = params.len();
        let mut grad = vec![0.0; n];

        for i in 0..n {
            let eps = 1e-8 * params[i].abs().max(1.0);

            let mut params_plus = params.to_vec();
            params_plus[i] += eps;
            let f_plus = self.eval(&params_plus)?;

            let mut params_minus = params.to_vec();
            params_minus[i] -= eps;
            let f_minus = self.eval(&params_minus)?;

            grad[i] = (f_plus - f_minus) / (2.0 * eps);
        }

        Ok(grad)
    }
}

/// The assessment model as an optimizable objective: values from the plain
/// `f64` path, gradients from exact forward-mode AD.
pub struct AssessmentObjective<'a> {
    model: &'a Assessment,
}

impl<'a> AssessmentObjective<'a> {
    /// Wrap a model.
    pub fn new(model: &'a Assessment) -> Self {
        Self { model }
    }
}

impl ObjectiveFunction for AssessmentObjective<'_> {
    fn eval(&self, params: &[f64]) -> Result<f64> {
        self.model.evaluate(params)
    }

    fn gradient(&self, params: &[f64]) -> Result<Vec<f64>> {
        Ok(self.model.objective(params)?.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct Rosenbrock;

    impl ObjectiveFunction for Rosenbrock {
        fn eval(&self, p: &[f64]) -> Result<f64> {
            Ok((1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2))
        }
    }

    #[test]
    fn test_default_gradient_matches_analytic() {
        let f = Rosenbrock;
        let p = [0.5, -0.3];
        let g = f.gradient(&p).unwrap();
        let gx = -2.0 * (1.0 - p[0]) - 400.0 * p[0] * (p[1] - p[0] * p[0]);
        let gy = 200.0 * (p[1] - p[0] * p[0]);
        assert_relative_eq!(g[0], gx, epsilon = 1e-4);
        assert_relative_eq!(g[1], gy, epsilon = 1e-4);
    }
}
