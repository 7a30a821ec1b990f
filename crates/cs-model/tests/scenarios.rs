//! End-to-end projection and objective scenarios on a small model:
//! one fishery, one survey, three years, two sexes, five size bins.

use approx::assert_relative_eq;
use cs_core::dims::{FEMALE, IMMATURE, MALE, MATURE, NEW_SHELL, N_SEXES, OLD_SHELL};
use cs_core::IndexBlock;
use cs_model::arrays::XmszArray;
use cs_model::rates::{
    CaptureSpec, FisheryCombo, GrowthCombo, LogLinearOffsets, MaturityCombo,
    NaturalMortalityCombo, RecruitmentCombo, SelFunction, SelShape, SurveyCombo,
};
use cs_model::{
    Assessment, CatchSeries, DimSel, FisheryData, FitType, InitialState,
    LikelihoodFamily, ModelConfig, ObservedData, ParamTable, PenaltyWeights,
    SizeCompRow, SizeCompSeries, SurveyData, Verbosity,
};

const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2002;
const N_BINS: usize = 5;

struct Setup {
    /// (ln fully-selected capture rate, handling mortality, retention on)
    fisheries: Vec<(f64, f64, bool)>,
    initial: InitialState,
    ln_m: f64,
    data: ObservedData,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            fisheries: Vec::new(),
            initial: InitialState::Zero,
            ln_m: -300.0, // natural mortality numerically zero
            data: empty_data(),
        }
    }
}

fn empty_data() -> ObservedData {
    ObservedData {
        fisheries: vec![FisheryData {
            name: "pot".into(),
            effort: None,
            retained: None,
            discarded: None,
            total: None,
        }],
        surveys: vec![SurveyData { name: "trawl".into(), series: CatchSeries::default() }],
    }
}

fn all_years() -> IndexBlock {
    IndexBlock::parse("[-1:-1]", MIN_YEAR, MAX_YEAR).unwrap()
}

/// One fishery, one survey, 3 years, 2 sexes, 5 size bins; recruitment
/// 100/yr split 50/50 into bin 1 only; selectivity 1 everywhere.
fn build(setup: Setup) -> Assessment {
    let config = ModelConfig {
        min_year: MIN_YEAR,
        max_year: MAX_YEAR,
        size_cuts: vec![25.0, 30.0, 35.0, 40.0, 45.0, 50.0],
        fisheries: vec!["pot".into()],
        surveys: vec!["trawl".into()],
        dt_fishery: vec![0.5; 3],
        dt_mating: vec![0.5; 3],
        weight_at_size: ModelConfig::uniform_weight(N_BINS, 1.0),
        initial: setup.initial,
        penalties: PenaltyWeights::default(),
        verbosity: Verbosity::default(),
    };

    let mut t = ParamTable::new();

    let recruitment = vec![RecruitmentCombo {
        years: all_years(),
        ln_r: t.add("pLnR", (100.0_f64).ln(), -5.0, 20.0),
        devs: None,
        logit_male: t.add("pLgtMale", 0.0, -5.0, 5.0),
        // a == b tiny: the gamma collapses onto the first bin exactly
        ln_shape_a: t.add("pLnRa", -7.0, -10.0, 10.0),
        ln_scale_b: t.add("pLnRb", -7.0, -10.0, 10.0),
        cv: t.add("pRCV", 0.5, 0.01, 2.0),
    }];

    let natural_mortality = vec![NaturalMortalityCombo {
        years: all_years(),
        ln_m: t.add("pLnM", setup.ln_m, -400.0, 2.0),
        offsets: LogLinearOffsets::none(),
        size_scaling: None,
    }];

    let growth = vec![GrowthCombo {
        sexes: DimSel::All,
        maturities: DimSel::All,
        ln_a: t.add("pGrA", (1.2_f64).ln(), -2.0, 2.0),
        ln_b: t.add("pGrB", 1.0, 0.5, 1.5),
        ln_beta: t.add("pGrBeta", 0.0, -2.0, 3.0),
    }];

    let maturity = vec![MaturityCombo {
        years: all_years(),
        sexes: DimSel::All,
        logits: (0..N_BINS).map(|z| t.add(&format!("pLgtMat[{z}]"), -40.0, -50.0, 50.0)).collect(),
    }];

    // function 0: selectivity = 1 everywhere; doubles as full retention
    let selectivity = vec![SelFunction {
        name: "selFlat".into(),
        shape: SelShape::Constant,
        params: vec![],
        z_full: None,
        devs: None,
    }];

    let fisheries = setup
        .fisheries
        .iter()
        .enumerate()
        .map(|(i, &(ln_c, hm, retained))| FisheryCombo {
            fishery: 0,
            years: all_years(),
            capture: CaptureSpec::Parametric {
                ln_c: t.add(&format!("pLnC[{i}]"), ln_c, -15.0, 15.0),
                offsets: LogLinearOffsets::none(),
                devs: None,
            },
            sel_fn: 0,
            ret_fn: retained.then_some(0),
            handling_mortality: hm,
        })
        .collect();

    let surveys = vec![SurveyCombo {
        survey: 0,
        years: IndexBlock::parse("[-1:-1]", MIN_YEAR, MAX_YEAR + 1).unwrap(),
        ln_q: t.add("pLnQ", 0.0, -10.0, 3.0),
        offsets: LogLinearOffsets::none(),
        sel_fn: 0,
    }];

    Assessment::new(
        config,
        t,
        recruitment,
        natural_mortality,
        growth,
        maturity,
        selectivity,
        fisheries,
        surveys,
        setup.data,
    )
    .unwrap()
}

fn seeded_initial() -> XmszArray<f64> {
    let mut n0 = XmszArray::zeros(N_BINS);
    for x in 0..N_SEXES {
        for z in 0..N_BINS {
            n0.set(x, IMMATURE, NEW_SHELL, z, 20.0 + z as f64);
            n0.set(x, MATURE, OLD_SHELL, z, 5.0);
        }
    }
    n0
}

#[test]
fn scenario_unfished_recruitment_arrives_in_first_bin() {
    let model = build(Setup::default());
    let params = model.params.init_values();
    let run = model.run::<f64>(&params).unwrap();

    // After year 1 (no fishing, M = 0): exactly the 50/50 recruits in bin 1.
    let n = &run.projection.numbers[1];
    for x in [MALE, FEMALE] {
        assert_relative_eq!(n.get(x, IMMATURE, NEW_SHELL, 0), 50.0, epsilon = 1e-9);
    }
    for (x, m, s, z, v) in n.cells() {
        if !(m == IMMATURE && s == NEW_SHELL && z == 0) {
            assert_eq!(v, 0.0, "cell ({x},{m},{s},{z}) expected empty");
        }
    }
}

#[test]
fn scenario_full_exploitation_removes_everything() {
    let model = build(Setup {
        fisheries: vec![(10.0, 0.3, true)], // F ~ e^10: 100% capture, full retention
        initial: InitialState::Fixed(seeded_initial()),
        ..Setup::default()
    });
    let params = model.params.init_values();
    let run = model.run::<f64>(&params).unwrap();

    // retained mortality in year 1 equals the initial numbers elementwise
    let n0 = seeded_initial();
    for (x, m, s, z, v) in run.projection.retained[0][0].cells() {
        assert_relative_eq!(v, n0.get(x, m, s, z), epsilon = 1e-12);
    }

    // year-2 state holds only the freshly injected recruits
    let n = &run.projection.numbers[1];
    for x in [MALE, FEMALE] {
        assert_relative_eq!(n.get(x, IMMATURE, NEW_SHELL, 0), 50.0, epsilon = 1e-9);
    }
    for (_, m, s, z, v) in n.cells() {
        if !(m == IMMATURE && s == NEW_SHELL && z == 0) {
            assert_relative_eq!(v, 0.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn fishing_apportionment_partitions_total_removals() {
    let model = build(Setup {
        fisheries: vec![((0.4_f64).ln(), 1.0, false)],
        initial: InitialState::Fixed(seeded_initial()),
        ..Setup::default()
    });
    let params = model.params.init_values();
    let run = model.run::<f64>(&params).unwrap();

    // with M = 0 and the fishing pulse at mid-year, removals in year 1 are
    // N0 * (1 - exp(-F)); the per-disposition removals must partition them
    let n0 = seeded_initial();
    let f: f64 = 0.4;
    for (x, m, s, z, kept) in run.projection.retained[0][0].cells() {
        let dead_discard = run.projection.discarded[0][0].get(x, m, s, z);
        let expected = n0.get(x, m, s, z) * (1.0 - (-f).exp());
        assert_relative_eq!(kept + dead_discard, expected, epsilon = 1e-10);
    }

    // captured numbers equal the removals too (hm = 1: all discards die)
    for (x, m, s, z, cap) in run.projection.captured[0][0].cells() {
        let kept = run.projection.retained[0][0].get(x, m, s, z);
        let dead = run.projection.discarded[0][0].get(x, m, s, z);
        assert_relative_eq!(cap, kept + dead, epsilon = 1e-10);
    }
}

#[test]
fn numbers_stay_nonnegative_under_all_steps() {
    let model = build(Setup {
        fisheries: vec![((0.7_f64).ln(), 0.5, true)],
        initial: InitialState::Fixed(seeded_initial()),
        ln_m: (0.23_f64).ln(),
        ..Setup::default()
    });
    let params = model.params.init_values();
    let run = model.run::<f64>(&params).unwrap();
    for (yi, slice) in run.projection.numbers.iter().enumerate() {
        for (x, m, s, z, v) in slice.cells() {
            assert!(v >= 0.0, "negative numbers at slice {yi}, cell ({x},{m},{s},{z})");
        }
    }
    for b in &run.projection.mating_biomass {
        assert!(b[MALE] >= 0.0 && b[FEMALE] >= 0.0);
    }
}

#[test]
fn scenario_perfect_composition_fit_has_zero_nll() {
    let mut data = empty_data();
    data.surveys[0].series.size_comps = Some(SizeCompSeries {
        fit: FitType::ByTotal,
        likelihood: LikelihoodFamily::Multinomial,
        weight: 1.0,
        rows: vec![
            SizeCompRow { year: 2001, sample_size: 100.0, comps: XmszArray::zeros(N_BINS) },
            SizeCompRow { year: 2002, sample_size: 50.0, comps: XmszArray::zeros(N_BINS) },
        ],
    });
    let mut model = build(Setup {
        fisheries: vec![((0.3_f64).ln(), 0.3, true)],
        initial: InitialState::Fixed(seeded_initial()),
        ln_m: (0.23_f64).ln(),
        data,
        ..Setup::default()
    });
    let params = model.params.init_values();

    // observed := modeled, exactly
    model.simulate_observations(&params, 42, None).unwrap();

    let objective = model.evaluate_full(&params).unwrap();
    let comps = objective
        .components
        .iter()
        .find(|c| c.name == "survey/trawl/size_comps")
        .expect("composition component present");
    assert_relative_eq!(comps.value, 0.0, epsilon = 1e-8);
}

#[test]
fn objective_is_idempotent_bit_for_bit() {
    let mut data = empty_data();
    data.surveys[0].series.size_comps = Some(SizeCompSeries {
        fit: FitType::BySex,
        likelihood: LikelihoodFamily::Multinomial,
        weight: 1.0,
        rows: vec![SizeCompRow {
            year: 2001,
            sample_size: 80.0,
            comps: XmszArray::zeros(N_BINS),
        }],
    });
    let mut model = build(Setup {
        fisheries: vec![((0.3_f64).ln(), 0.3, true)],
        initial: InitialState::Fixed(seeded_initial()),
        ln_m: (0.23_f64).ln(),
        data,
        ..Setup::default()
    });
    let params = model.params.init_values();
    model.simulate_observations(&params, 7, None).unwrap();

    let (v1, g1) = model.objective(&params).unwrap();
    let (v2, g2) = model.objective(&params).unwrap();
    assert_eq!(v1.to_bits(), v2.to_bits());
    assert_eq!(g1.len(), g2.len());
    for (a, b) in g1.iter().zip(g2.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn gradient_matches_finite_differences() {
    let mut data = empty_data();
    data.surveys[0].series.size_comps = Some(SizeCompSeries {
        fit: FitType::ByTotal,
        likelihood: LikelihoodFamily::Multinomial,
        weight: 1.0,
        rows: vec![SizeCompRow {
            year: 2001,
            sample_size: 100.0,
            comps: XmszArray::zeros(N_BINS),
        }],
    });
    let mut model = build(Setup {
        fisheries: vec![((0.3_f64).ln(), 0.3, true)],
        initial: InitialState::Fixed(seeded_initial()),
        ln_m: (0.23_f64).ln(),
        data,
        ..Setup::default()
    });
    let mut params = model.params.init_values();
    model.simulate_observations(&params, 11, None).unwrap();
    // move off the simulated optimum so the gradient is nonzero
    params[0] += 0.2;

    let (_, grad) = model.objective(&params).unwrap();
    for i in [0usize, 1, 5] {
        let eps = 1e-6;
        let mut plus = params.clone();
        plus[i] += eps;
        let mut minus = params.clone();
        minus[i] -= eps;
        let fd = (model.evaluate::<f64>(&plus).unwrap()
            - model.evaluate::<f64>(&minus).unwrap())
            / (2.0 * eps);
        assert_relative_eq!(grad[i], fd, epsilon = 1e-5, max_relative = 1e-4);
    }
}

#[test]
fn terminal_slice_is_sampled_but_not_advanced() {
    let model = build(Setup::default());
    let params = model.params.init_values();
    let run = model.run::<f64>(&params).unwrap();
    // slices: 2000..=2003
    assert_eq!(run.projection.numbers.len(), 4);
    // the survey sees the terminal slice (q = 1, sel = 1: identical numbers)
    let terminal = &run.projection.numbers[3];
    let seen = &run.samples.numbers[0][3];
    for (x, m, s, z, v) in terminal.cells() {
        assert_relative_eq!(seen.get(x, m, s, z), v, epsilon = 1e-12);
    }
}

#[test]
fn uncovered_interior_year_is_a_fatal_config_error() {
    // rebuild the default model but with natural mortality missing 2001
    let setup = Setup::default();
    let mut model = build(setup);
    model.natural_mortality[0].years =
        IndexBlock::parse("[2000;2002]", MIN_YEAR, MAX_YEAR).unwrap();
    let err = model.validate().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("2001"), "error should name the missing year, got: {msg}");
    assert!(msg.contains("natural mortality"));
}

#[test]
fn simulated_aggregate_series_fit_perfectly() {
    use cs_model::units::ScaleType;
    use cs_model::AggRow;
    use cs_model::AggregateSeries;

    let mut data = empty_data();
    data.surveys[0].series.abundance = Some(AggregateSeries {
        fit: FitType::BySex,
        likelihood: LikelihoodFamily::Lognormal,
        weight: 1.0,
        rows: (2000..=2003)
            .map(|year| AggRow {
                year,
                values: Default::default(),
                uncertainty: 0.2,
                scale: ScaleType::Cv,
            })
            .collect(),
    });
    data.fisheries[0].retained = Some(CatchSeries {
        abundance: Some(AggregateSeries {
            fit: FitType::ByTotal,
            likelihood: LikelihoodFamily::Norm2,
            weight: 1.0,
            rows: vec![AggRow {
                year: 2001,
                values: Default::default(),
                uncertainty: 0.2,
                scale: ScaleType::Cv,
            }],
        }),
        biomass: None,
        size_comps: None,
    });

    let mut model = build(Setup {
        fisheries: vec![((0.3_f64).ln(), 0.3, true)],
        initial: InitialState::Fixed(seeded_initial()),
        ln_m: (0.23_f64).ln(),
        data,
        ..Setup::default()
    });
    let params = model.params.init_values();
    model.simulate_observations(&params, 3, None).unwrap();

    let objective = model.evaluate_full(&params).unwrap();
    for name in ["survey/trawl/abundance", "fishery/pot/retained/abundance"] {
        let c = objective
            .components
            .iter()
            .find(|c| c.name == name)
            .unwrap_or_else(|| panic!("missing component {name}"));
        assert_relative_eq!(c.value, 0.0, epsilon = 1e-10);
    }

    // a year outside the projected range is skipped, not an error
    if let Some(series) = &mut model.data.surveys[0].series.abundance {
        series.rows.push(AggRow {
            year: 2050,
            values: Default::default(),
            uncertainty: 0.2,
            scale: ScaleType::Cv,
        });
    }
    assert!(model.evaluate::<f64>(&params).is_ok());
}

#[test]
fn report_serializes_with_breakdown() {
    let model = build(Setup {
        fisheries: vec![((0.3_f64).ln(), 0.3, true)],
        initial: InitialState::Fixed(seeded_initial()),
        ln_m: (0.23_f64).ln(),
        ..Setup::default()
    });
    let params = model.params.init_values();
    let report = model.report(&params).unwrap();
    assert_eq!(report.dims.min_year, MIN_YEAR);
    assert_eq!(report.numbers.len(), 4);
    assert_eq!(report.retained_catch[0].len(), 3);
    assert!(report.components.iter().any(|c| c.name.starts_with("penalty/maturity")));

    let json = report.to_json().unwrap();
    assert_eq!(json["dims"]["max_year"], MAX_YEAR);
    assert!(json["numbers"][0]["cells"].as_array().unwrap().len() == 8);
}

#[test]
fn noisy_simulation_keeps_compositions_normalized() {
    use cs_model::SimNoise;

    let mut data = empty_data();
    data.surveys[0].series.size_comps = Some(SizeCompSeries {
        fit: FitType::ByTotal,
        likelihood: LikelihoodFamily::Multinomial,
        weight: 1.0,
        rows: vec![SizeCompRow {
            year: 2001,
            sample_size: 500.0,
            comps: XmszArray::zeros(N_BINS),
        }],
    });
    let mut model = build(Setup {
        fisheries: vec![((0.3_f64).ln(), 0.3, true)],
        initial: InitialState::Fixed(seeded_initial()),
        ln_m: (0.23_f64).ln(),
        data,
        ..Setup::default()
    });
    let params = model.params.init_values();
    model
        .simulate_observations(
            &params,
            1234,
            Some(SimNoise { aggregate_cv: 0.2, resample_comps: true }),
        )
        .unwrap();

    let comps = model.data.surveys[0].series.size_comps.as_ref().unwrap();
    let total: f64 = comps.rows[0].comps.values().iter().sum();
    assert_relative_eq!(total, 1.0, epsilon = 1e-9);

    // resampled data still evaluates to a finite objective
    let v = model.evaluate::<f64>(&params).unwrap();
    assert!(v.is_finite() && v > -1e-6);
}
