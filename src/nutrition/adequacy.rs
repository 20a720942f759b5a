//! Adequacy percentage and classification
//!
//! Thresholds are identical for every nutrient.

use crate::models::{AdequacyClass, NutrientAdequacy};

/// Upper bound (inclusive) of the optimal band
pub const OPTIMAL_MAX_PCT: f64 = 35.0;
/// Upper bound (inclusive) of the acceptable band
pub const ACCEPTABLE_MAX_PCT: f64 = 70.0;

/// Clamp a user-supplied percentage into [0, 100]. NaN becomes 0.
pub fn clamp_percent(pct: f64) -> f64 {
    if pct.is_nan() {
        return 0.0;
    }
    pct.clamp(0.0, 100.0)
}

/// Percentage of the requirement covered by `total`, clamped to [0, 100].
///
/// A missing, zero or negative requirement yields 0 instead of a non-finite value.
pub fn adequacy_percentage(total: f64, requirement: f64) -> f64 {
    if !(requirement > 0.0) || !requirement.is_finite() || !total.is_finite() {
        return 0.0;
    }
    clamp_percent(total / requirement * 100.0)
}

pub fn classify(pct: f64) -> AdequacyClass {
    if pct <= OPTIMAL_MAX_PCT {
        AdequacyClass::Optimal
    } else if pct <= ACCEPTABLE_MAX_PCT {
        AdequacyClass::Acceptable
    } else {
        AdequacyClass::High
    }
}

/// Percentage and class for one nutrient total
pub fn assess(total: f64, requirement: Option<f64>) -> NutrientAdequacy {
    let percentage = requirement
        .map(|r| adequacy_percentage(total, r))
        .unwrap_or(0.0);
    NutrientAdequacy {
        percentage,
        class: classify(percentage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(classify(0.0), AdequacyClass::Optimal);
        assert_eq!(classify(35.0), AdequacyClass::Optimal);
        assert_eq!(classify(35.1), AdequacyClass::Acceptable);
        assert_eq!(classify(70.0), AdequacyClass::Acceptable);
        assert_eq!(classify(70.1), AdequacyClass::High);
        assert_eq!(classify(100.0), AdequacyClass::High);
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(150.0), 100.0);
        assert_eq!(clamp_percent(-10.0), 0.0);
        assert_eq!(clamp_percent(42.5), 42.5);
        assert_eq!(clamp_percent(f64::NAN), 0.0);
    }

    #[test]
    fn test_percentage_clamped_to_hundred() {
        assert_eq!(adequacy_percentage(300.0, 200.0), 100.0);
        assert_eq!(adequacy_percentage(150.0, 200.0), 75.0);
    }

    #[test]
    fn test_percentage_guards_missing_requirement() {
        assert_eq!(adequacy_percentage(150.0, 0.0), 0.0);
        assert_eq!(adequacy_percentage(150.0, -5.0), 0.0);
        assert_eq!(adequacy_percentage(150.0, f64::NAN), 0.0);
        let a = assess(150.0, None);
        assert_eq!(a.percentage, 0.0);
        assert_eq!(a.class, AdequacyClass::Optimal);
    }
}
