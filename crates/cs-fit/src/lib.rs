//! # cs-fit
//!
//! Gradient-based fitting for CrabStat: a generic objective-function trait,
//! an L-BFGS wrapper with box constraints, and the staged fitting driver
//! that replaces optimizer-phase scheduling with explicit activation stages.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Staged maximum-likelihood fitting driver.
pub mod fit;
/// Objective-function trait and the assessment adapter.
pub mod objective;
/// Generic numerical optimizer (L-BFGS backend).
pub mod optimizer;

pub use fit::{Fitter, StageConfig};
pub use objective::{AssessmentObjective, ObjectiveFunction};
pub use optimizer::{LbfgsOptimizer, OptimizationResult, OptimizerConfig};
