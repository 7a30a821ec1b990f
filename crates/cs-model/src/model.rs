//! The assessment model: configuration + parameter combinations + observed
//! data, with the objective-function entry points.
//!
//! `evaluate` is a pure function of the parameter vector: all rate arrays,
//! the projection, the survey samples and the likelihood are recomputed from
//! scratch on every call, so repeated evaluation with an unchanged vector is
//! bit-identical and no state is carried between evaluations.

use crate::config::ModelConfig;
use crate::data::ObservedData;
use crate::likelihood::{assemble_objective, ObjectiveValue};
use crate::params::{validate_year_coverage, ParamTable};
use crate::project::{project, Projection};
use crate::rates::fishing::fishing_rates;
use crate::rates::growth::growth_matrices;
use crate::rates::maturity::maturity_ogives;
use crate::rates::mortality::natural_mortality;
use crate::rates::recruitment::recruitment;
use crate::rates::selectivity::selectivity_curves;
use crate::rates::survey::catchability;
use crate::rates::{
    CaptureSpec, FisheryCombo, GrowthCombo, MaturityCombo, ModelRates,
    NaturalMortalityCombo, RecruitmentCombo, SelFunction, SurveyCombo,
};
use crate::sampler::{sample_surveys, SurveySamples};
use cs_ad::{Dual, Scalar};
use cs_core::{Error, ModelDims, Result};

/// The complete assessment model.
#[derive(Debug, Clone)]
pub struct Assessment {
    /// Static configuration.
    pub config: ModelConfig,
    /// Derived dimensions.
    pub dims: ModelDims,
    /// Parameter table (defines the optimizer's parameter vector).
    pub params: ParamTable,
    /// Recruitment combinations.
    pub recruitment: Vec<RecruitmentCombo>,
    /// Natural-mortality combinations.
    pub natural_mortality: Vec<NaturalMortalityCombo>,
    /// Growth combinations.
    pub growth: Vec<GrowthCombo>,
    /// Maturity-ogive combinations.
    pub maturity: Vec<MaturityCombo>,
    /// Selectivity/retention function library.
    pub selectivity: Vec<SelFunction>,
    /// Fishery combinations.
    pub fisheries: Vec<FisheryCombo>,
    /// Survey-catchability combinations.
    pub surveys: Vec<SurveyCombo>,
    /// Observed datasets.
    pub data: ObservedData,
    /// Current estimation stage (drives parameter activation).
    pub stage: u32,
}

/// Everything computed for one parameter vector.
#[derive(Debug, Clone)]
pub struct ModelRun<T> {
    /// Process rates.
    pub rates: ModelRates<T>,
    /// Population projection.
    pub projection: Projection<T>,
    /// Survey-observable states.
    pub samples: SurveySamples<T>,
}

impl Assessment {
    /// Build an assessment, deriving dimensions and validating the whole
    /// configuration (fatal on the defects of the error-handling contract).
    pub fn new(
        config: ModelConfig,
        params: ParamTable,
        recruitment: Vec<RecruitmentCombo>,
        natural_mortality: Vec<NaturalMortalityCombo>,
        growth: Vec<GrowthCombo>,
        maturity: Vec<MaturityCombo>,
        selectivity: Vec<SelFunction>,
        fisheries: Vec<FisheryCombo>,
        surveys: Vec<SurveyCombo>,
        data: ObservedData,
    ) -> Result<Self> {
        let dims = config.dims()?;
        let model = Self {
            config,
            dims,
            params,
            recruitment,
            natural_mortality,
            growth,
            maturity,
            selectivity,
            fisheries,
            surveys,
            data,
            stage: 0,
        };
        model.validate()?;
        Ok(model)
    }

    /// Number of parameters.
    pub fn n_parameters(&self) -> usize {
        self.params.len()
    }

    /// Validate coverage, index bounds and data shapes.
    pub fn validate(&self) -> Result<()> {
        let dims = &self.dims;

        validate_year_coverage(
            "recruitment",
            self.recruitment.iter().map(|c| &c.years),
            dims.min_year,
            dims.max_year,
        )?;
        validate_year_coverage(
            "natural mortality",
            self.natural_mortality.iter().map(|c| &c.years),
            dims.min_year,
            dims.max_year,
        )?;
        for x in 0..cs_core::dims::N_SEXES {
            validate_year_coverage(
                &format!("maturity ({})", cs_core::dims::sex_label(x)),
                self.maturity.iter().filter(|c| c.sexes.contains(x)).map(|c| &c.years),
                dims.min_year,
                dims.max_year,
            )?;
            for m in 0..cs_core::dims::N_MATURITY {
                if !self
                    .growth
                    .iter()
                    .any(|c| c.sexes.contains(x) && c.maturities.contains(m))
                {
                    return Err(Error::Config(format!(
                        "no growth combination covers sex {x}, maturity {m}"
                    )));
                }
            }
        }
        for v in 0..dims.n_surveys {
            validate_year_coverage(
                &format!("catchability (survey {v})"),
                self.surveys.iter().filter(|c| c.survey == v).map(|c| &c.years),
                dims.min_year,
                dims.max_year + 1,
            )?;
        }

        let n_sel = self.selectivity.len();
        for combo in &self.fisheries {
            if combo.fishery >= dims.n_fisheries {
                return Err(Error::Config(format!(
                    "fishery combination references fishery {} of {}",
                    combo.fishery, dims.n_fisheries
                )));
            }
            if combo.sel_fn >= n_sel || combo.ret_fn.is_some_and(|r| r >= n_sel) {
                return Err(Error::Config(format!(
                    "fishery {} references an unknown selectivity function",
                    combo.fishery
                )));
            }
        }
        for combo in &self.surveys {
            if combo.survey >= dims.n_surveys {
                return Err(Error::Config(format!(
                    "catchability combination references survey {} of {}",
                    combo.survey, dims.n_surveys
                )));
            }
            if combo.sel_fn >= n_sel {
                return Err(Error::Config(format!(
                    "survey {} references an unknown selectivity function",
                    combo.survey
                )));
            }
        }

        self.validate_param_refs()?;

        if self.data.fisheries.len() != dims.n_fisheries {
            return Err(Error::Config(format!(
                "observed data covers {} fisheries, configuration names {}",
                self.data.fisheries.len(),
                dims.n_fisheries
            )));
        }
        if self.data.surveys.len() != dims.n_surveys {
            return Err(Error::Config(format!(
                "observed data covers {} surveys, configuration names {}",
                self.data.surveys.len(),
                dims.n_surveys
            )));
        }
        Ok(())
    }

    fn validate_param_refs(&self) -> Result<()> {
        let n = self.params.len();
        let mut refs: Vec<usize> = Vec::new();
        for c in &self.recruitment {
            refs.extend([c.ln_r.0, c.logit_male.0, c.ln_shape_a.0, c.ln_scale_b.0, c.cv.0]);
            if let Some(d) = &c.devs {
                refs.push(d.max_index());
            }
        }
        for c in &self.natural_mortality {
            refs.push(c.ln_m.0);
            refs.extend(c.offsets.refs().map(|r| r.0));
            if let Some(sc) = &c.size_scaling {
                refs.push(sc.z_ref.0);
            }
        }
        for c in &self.growth {
            refs.extend([c.ln_a.0, c.ln_b.0, c.ln_beta.0]);
        }
        for c in &self.maturity {
            refs.extend(c.logits.iter().map(|r| r.0));
        }
        for f in &self.selectivity {
            refs.extend(f.params.iter().map(|r| r.0));
            if let Some(d) = &f.devs {
                refs.push(d.dev.max_index());
            }
        }
        for c in &self.fisheries {
            if let CaptureSpec::Parametric { ln_c, offsets, devs } = &c.capture {
                refs.push(ln_c.0);
                refs.extend(offsets.refs().map(|r| r.0));
                if let Some(d) = devs {
                    refs.push(d.max_index());
                }
            }
        }
        for c in &self.surveys {
            refs.push(c.ln_q.0);
            refs.extend(c.offsets.refs().map(|r| r.0));
        }
        if let Some(&bad) = refs.iter().find(|&&r| r >= n) {
            return Err(Error::Validation(format!(
                "parameter reference {bad} out of range (table has {n} parameters)"
            )));
        }
        Ok(())
    }

    /// Recompute every process-rate array from the parameter vector.
    pub fn compute_rates<T: Scalar>(&self, params: &[T]) -> Result<ModelRates<T>> {
        self.check_params_len(params.len())?;
        let verbosity = &self.config.verbosity;
        let selectivity = selectivity_curves(params, &self.selectivity, &self.dims)?;
        let effort: Vec<_> =
            self.data.fisheries.iter().map(|f| f.effort.as_ref()).collect();
        let fishing = fishing_rates(
            params,
            &self.fisheries,
            &selectivity,
            &effort,
            &self.dims,
            verbosity,
        )?;
        let catchability = catchability(params, &self.surveys, &selectivity, &self.dims)?;
        Ok(ModelRates {
            recruitment: recruitment(params, &self.recruitment, &self.dims, verbosity)?,
            natural_mortality: natural_mortality(
                params,
                &self.natural_mortality,
                &self.dims,
                self.stage,
                verbosity,
            )?,
            growth: growth_matrices(params, &self.growth, &self.dims)?,
            maturity: maturity_ogives(params, &self.maturity, &self.dims)?,
            selectivity,
            fishing,
            catchability,
        })
    }

    /// Rates, projection and survey samples for one parameter vector.
    pub fn run<T: Scalar>(&self, params: &[T]) -> Result<ModelRun<T>> {
        let rates = self.compute_rates(params)?;
        let projection = project(&self.config, &self.dims, &rates)?;
        let samples = sample_surveys(
            &rates.catchability,
            &projection.numbers,
            &self.config.weight_at_size,
        );
        Ok(ModelRun { rates, projection, samples })
    }

    /// The penalized negative log-likelihood, generic over the scalar type.
    pub fn evaluate<T: Scalar>(&self, params: &[T]) -> Result<T> {
        Ok(self.evaluate_full(params)?.total)
    }

    /// Objective with the per-component breakdown and diagnostics.
    pub fn evaluate_full<T: Scalar>(&self, params: &[T]) -> Result<ObjectiveValue<T>> {
        let run = self.run(params)?;
        assemble_objective(
            &self.config,
            &self.dims,
            params,
            &self.maturity,
            &run.rates,
            &run.projection,
            &run.samples,
            &self.data,
        )
    }

    /// Objective value and exact gradient (one forward-mode pass per
    /// parameter).
    pub fn objective(&self, params: &[f64]) -> Result<(f64, Vec<f64>)> {
        let value = self.evaluate(params)?;
        let mut gradient = Vec::with_capacity(params.len());
        let mut duals: Vec<Dual> = params.iter().map(|&v| Dual::constant(v)).collect();
        for i in 0..params.len() {
            duals[i] = Dual::var(params[i]);
            gradient.push(self.evaluate(&duals)?.dot);
            duals[i] = Dual::constant(params[i]);
        }
        Ok((value, gradient))
    }

    fn check_params_len(&self, got: usize) -> Result<()> {
        let expected = self.params.len();
        if got != expected {
            return Err(Error::Validation(format!(
                "Parameter length mismatch: expected {expected}, got {got}"
            )));
        }
        Ok(())
    }
}
