//! # cs-model
//!
//! The CrabStat population-dynamics and objective-function engine.
//!
//! A size-structured crustacean stock is projected year by year under
//! natural mortality, fishing mortality, molting/growth/maturation and
//! recruitment, and compared to observed catch, effort and size-composition
//! data through a penalized negative log-likelihood. The whole engine is
//! generic over [`cs_ad::Scalar`], so one code path yields both objective
//! values and exact forward-mode gradients.
//!
//! Structure, leaf first:
//! - [`arrays`]: dense state/rate arrays over the categorical dimensions
//! - [`params`]: parameter table, combinations, deviation vectors
//! - [`units`]: uncertainty scales and unit conversions
//! - [`rates`]: the process-rate calculators
//! - [`project`]: the year-stepping population projector
//! - [`sampler`]: survey-observable states
//! - [`data`]: observed datasets (read-only during fitting)
//! - [`likelihood`]: NLL families, fit aggregations, penalties
//! - [`model`]: the [`Assessment`] facade
//! - [`report`]: serializable report of intermediate arrays
//! - [`sim`]: self-test simulation of observations

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arrays;
pub mod config;
pub mod data;
pub mod likelihood;
pub mod model;
pub mod params;
pub mod project;
pub mod rates;
pub mod report;
pub mod sampler;
pub mod sim;
pub mod units;

pub use config::{InitialState, ModelConfig, PenaltyWeights, Verbosity};
pub use data::{
    AggregateSeries, AggRow, CatchSeries, EffortSeries, FisheryData, FitType,
    LikelihoodFamily, ObservedData, SizeCompRow, SizeCompSeries, SurveyData,
};
pub use likelihood::{NllComponent, ObjectiveValue};
pub use model::{Assessment, ModelRun};
pub use params::{DevVector, DimSel, ParamRef, ParamSpec, ParamTable};
pub use report::ModelReport;
pub use sim::SimNoise;
