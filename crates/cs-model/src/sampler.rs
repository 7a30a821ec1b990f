//! Survey sampler: catchability applied to the population state.

use crate::arrays::{XmszArray, XmzArray};
use crate::project::mature_biomass;
use cs_ad::Scalar;
use cs_core::dims::N_SEXES;

/// Survey-observable states, `[survey][slice]` over
/// `min_year..=max_year+1` (the terminal slice is sampled, uniquely, without
/// being projected further).
#[derive(Debug, Clone)]
pub struct SurveySamples<T> {
    /// Survey-observable numbers-at-size.
    pub numbers: Vec<Vec<XmszArray<T>>>,
    /// Mature biomass per sex of the survey-adjusted numbers.
    pub mature_biomass: Vec<Vec<[T; N_SEXES]>>,
}

/// Apply catchability elementwise to every population slice.
pub fn sample_surveys<T: Scalar>(
    catchability: &[Vec<XmszArray<T>>],
    numbers: &[XmszArray<T>],
    weight: &XmzArray<f64>,
) -> SurveySamples<T> {
    let mut out = SurveySamples { numbers: Vec::new(), mature_biomass: Vec::new() };
    for q_slices in catchability {
        let mut obs_slices = Vec::with_capacity(numbers.len());
        let mut mb_slices = Vec::with_capacity(numbers.len());
        for (yi, n) in numbers.iter().enumerate() {
            let q = &q_slices[yi];
            let mut obs = XmszArray::zeros(n.n_bins());
            for (x, m, s, z, v) in n.cells() {
                obs.set(x, m, s, z, q.get(x, m, s, z) * v);
            }
            mb_slices.push(mature_biomass(&obs, weight));
            obs_slices.push(obs);
        }
        out.numbers.push(obs_slices);
        out.mature_biomass.push(mb_slices);
    }
    out
}
