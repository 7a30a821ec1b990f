//! Uncertainty scale types and unit conversions for observed datasets.

use cs_core::{Error, Result};

/// Multiplier from kg to lbs.
pub const KG_TO_LBS: f64 = 2.204_622_62;

/// How a row's uncertainty value is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleType {
    /// Arithmetic variance.
    Variance,
    /// Arithmetic standard deviation.
    StdDev,
    /// Coefficient of variation.
    Cv,
}

impl ScaleType {
    /// Parse a scale-type keyword.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "VARIANCE" => Ok(Self::Variance),
            "STD_DEV" => Ok(Self::StdDev),
            "CV" => Ok(Self::Cv),
            _ => Err(Error::Config(format!("unrecognized scale type '{s}'"))),
        }
    }

    /// Keyword for this scale type.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Variance => "VARIANCE",
            Self::StdDev => "STD_DEV",
            Self::Cv => "CV",
        }
    }
}

/// Arithmetic-scale standard deviation from an uncertainty value and the mean
/// it refers to.
pub fn to_std_dev(scale: ScaleType, value: f64, mean: f64) -> f64 {
    match scale {
        ScaleType::Variance => value.sqrt(),
        ScaleType::StdDev => value,
        ScaleType::Cv => value * mean,
    }
}

/// Lognormal-consistent standard deviation `sqrt(ln(1 + cv^2))` from an
/// uncertainty value and the mean it refers to.
pub fn to_lognormal_sigma(scale: ScaleType, value: f64, mean: f64) -> f64 {
    let cv = match scale {
        ScaleType::Variance => value.sqrt() / mean,
        ScaleType::StdDev => value / mean,
        ScaleType::Cv => value,
    };
    (1.0 + cv * cv).ln().sqrt()
}

/// Weight units for biomass series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightUnits {
    /// Grams.
    Grams,
    /// Kilograms (the model's internal unit).
    Kilograms,
    /// Metric tons.
    MetricTons,
    /// Thousands of metric tons.
    ThousandsMt,
    /// Pounds.
    Lbs,
    /// Millions of pounds.
    MillionsLbs,
}

impl WeightUnits {
    /// Parse a weight-units keyword.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "GM" => Ok(Self::Grams),
            "KG" => Ok(Self::Kilograms),
            "MT" => Ok(Self::MetricTons),
            "THOUSANDS_MT" => Ok(Self::ThousandsMt),
            "LBS" => Ok(Self::Lbs),
            "MILLIONS_LBS" => Ok(Self::MillionsLbs),
            _ => Err(Error::Config(format!("unrecognized weight units '{s}'"))),
        }
    }

    fn to_kg(self) -> f64 {
        match self {
            Self::Grams => 1e-3,
            Self::Kilograms => 1.0,
            Self::MetricTons => 1e3,
            Self::ThousandsMt => 1e6,
            Self::Lbs => 1.0 / KG_TO_LBS,
            Self::MillionsLbs => 1e6 / KG_TO_LBS,
        }
    }
}

/// Multiplicative conversion factor: `to_units = factor * from_units`.
pub fn weight_conversion(from: WeightUnits, to: WeightUnits) -> f64 {
    from.to_kg() / to.to_kg()
}

/// Abundance units for numbers series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbundanceUnits {
    /// Individual animals (the model's internal unit).
    Ones,
    /// Thousands of animals.
    Thousands,
    /// Millions of animals.
    Millions,
    /// Billions of animals.
    Billions,
}

impl AbundanceUnits {
    /// Parse an abundance-units keyword.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "ONES" => Ok(Self::Ones),
            "THOUSANDS" => Ok(Self::Thousands),
            "MILLIONS" => Ok(Self::Millions),
            "BILLIONS" => Ok(Self::Billions),
            _ => Err(Error::Config(format!("unrecognized abundance units '{s}'"))),
        }
    }

    fn to_ones(self) -> f64 {
        match self {
            Self::Ones => 1.0,
            Self::Thousands => 1e3,
            Self::Millions => 1e6,
            Self::Billions => 1e9,
        }
    }
}

/// Multiplicative conversion factor: `to_units = factor * from_units`.
pub fn abundance_conversion(from: AbundanceUnits, to: AbundanceUnits) -> f64 {
    from.to_ones() / to.to_ones()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_std_dev_conversions() {
        assert_relative_eq!(to_std_dev(ScaleType::Variance, 4.0, 10.0), 2.0);
        assert_relative_eq!(to_std_dev(ScaleType::StdDev, 2.0, 10.0), 2.0);
        assert_relative_eq!(to_std_dev(ScaleType::Cv, 0.2, 10.0), 2.0);
    }

    #[test]
    fn test_lognormal_sigma_agrees_across_scales() {
        // variance 4 at mean 10 == sd 2 at mean 10 == cv 0.2
        let a = to_lognormal_sigma(ScaleType::Variance, 4.0, 10.0);
        let b = to_lognormal_sigma(ScaleType::StdDev, 2.0, 10.0);
        let c = to_lognormal_sigma(ScaleType::Cv, 0.2, 10.0);
        assert_relative_eq!(a, b, epsilon = 1e-12);
        assert_relative_eq!(b, c, epsilon = 1e-12);
        assert_relative_eq!(c, (1.04_f64).ln().sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_weight_conversion() {
        assert_relative_eq!(weight_conversion(WeightUnits::MetricTons, WeightUnits::Kilograms), 1e3);
        assert_relative_eq!(
            weight_conversion(WeightUnits::Lbs, WeightUnits::Kilograms),
            1.0 / KG_TO_LBS
        );
        assert_relative_eq!(
            weight_conversion(WeightUnits::Kilograms, WeightUnits::Kilograms),
            1.0
        );
    }

    #[test]
    fn test_abundance_conversion_and_parse_errors() {
        assert_relative_eq!(
            abundance_conversion(AbundanceUnits::Millions, AbundanceUnits::Thousands),
            1e3
        );
        assert!(WeightUnits::parse("STONES").is_err());
        assert!(ScaleType::parse("SD").is_err());
    }
}
