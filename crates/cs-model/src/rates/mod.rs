//! Process-rate calculators.
//!
//! Each calculator is a pure function from (parameter vector, parameter
//! combinations, dimensions) to a dense rate array, recomputed in full at
//! every objective evaluation. All calculators are generic over
//! [`Scalar`](cs_ad::Scalar) so the same code produces values and gradients.

pub mod fishing;
pub mod growth;
pub mod maturity;
pub mod mortality;
pub mod recruitment;
pub mod selectivity;
pub mod survey;

use crate::arrays::{XmszArray, XmzArray};
use crate::params::ParamRef;
use cs_ad::Scalar;
use cs_core::dims::{FEMALE, IMMATURE};

pub use fishing::{CaptureSpec, EffortAveraging, FisheryCombo, FishingRates};
pub use growth::{GrowthCombo, GrowthMatrices};
pub use maturity::MaturityCombo;
pub use mortality::{NaturalMortalityCombo, ZScaling};
pub use recruitment::{Recruitment, RecruitmentCombo, RecruitmentDevNll};
pub use selectivity::{SelDevs, SelFunction, SelShape};
pub use survey::SurveyCombo;

/// Optional offsets of a log-linear additive rate model. Each term
/// contributes 0 when its parameter reference is absent.
#[derive(Debug, Clone, Default)]
pub struct LogLinearOffsets {
    /// Temporal offset (applies over the owning combination's year block).
    pub temporal: Option<ParamRef>,
    /// Female offset.
    pub female: Option<ParamRef>,
    /// Immature offset.
    pub immature: Option<ParamRef>,
    /// Female-by-immature interaction offset.
    pub female_immature: Option<ParamRef>,
}

impl LogLinearOffsets {
    /// No offsets.
    pub fn none() -> Self {
        Self::default()
    }

    /// Sum of the active offsets for (sex, maturity) on the log scale.
    pub fn ln_sum<T: Scalar>(&self, params: &[T], x: usize, m: usize) -> T {
        let mut v = T::zero();
        if let Some(p) = self.temporal {
            v = v + params[p.0];
        }
        if x == FEMALE {
            if let Some(p) = self.female {
                v = v + params[p.0];
            }
        }
        if m == IMMATURE {
            if let Some(p) = self.immature {
                v = v + params[p.0];
            }
        }
        if x == FEMALE && m == IMMATURE {
            if let Some(p) = self.female_immature {
                v = v + params[p.0];
            }
        }
        v
    }

    /// Parameter references in use.
    pub fn refs(&self) -> impl Iterator<Item = ParamRef> + '_ {
        [self.temporal, self.female, self.immature, self.female_immature]
            .into_iter()
            .flatten()
    }
}

/// All process rates for one objective evaluation.
#[derive(Debug, Clone)]
pub struct ModelRates<T> {
    /// Recruitment totals, sex split, size distribution and deviation NLL inputs.
    pub recruitment: Recruitment<T>,
    /// Natural mortality `M[y][sex][maturity][size]`, `y` over the advanced years.
    pub natural_mortality: Vec<XmzArray<T>>,
    /// Growth transition matrices per (sex, maturity).
    pub growth: GrowthMatrices<T>,
    /// Maturity ogives `[y][sex][size]` over the advanced years.
    pub maturity: Vec<Vec<Vec<T>>>,
    /// Selectivity curves `[function][y][size]`, `y` through the terminal year.
    pub selectivity: Vec<Vec<Vec<T>>>,
    /// Fishery capture/retained/discard mortality rates.
    pub fishing: FishingRates<T>,
    /// Survey catchability `[survey][y]`, `y` through the terminal year.
    pub catchability: Vec<Vec<XmszArray<T>>>,
}
