//! Level recalculation
//!
//! Forward direction: row weights -> totals -> adequacy.
//! Inverse direction: desired adequacy for one nutrient -> proportionally rescaled weights.

use serde::Serialize;

use crate::models::{Level, LevelTotals, Nutrient, NutrientVector};

use super::adequacy::{assess, clamp_percent};

/// Rows at or below this amount per 100 g do not count as contributors of a nutrient
pub const CONTRIBUTOR_MIN_PER_100G: f64 = 0.1;

/// Target differences below this are considered already satisfied
pub const RESCALE_EPSILON: f64 = 0.01;

/// Result of a rescale request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RescaleOutcome {
    Applied {
        scale_factor: f64,
        target_value: f64,
        rows_rescaled: usize,
    },
    /// Requirement for the nutrient is missing or zero
    MissingRequirement,
    /// No row carries the nutrient above the contributor threshold
    NoContributors,
    /// Current total already matches the target
    AlreadySatisfied { current_value: f64 },
    /// Contributors exist but all have zero weight, so no factor can reach the target
    ZeroContribution,
}

impl RescaleOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, RescaleOutcome::Applied { .. })
    }
}

/// Recompute every row's derived values, then the level totals and adequacy.
///
/// Totals are always rebuilt from the row model, so calling this twice without
/// mutating rows yields identical results.
pub fn recompute_level_totals(level: &mut Level) {
    for row in level.rows.iter_mut() {
        row.refresh_derived();
    }

    let nutrients: NutrientVector = level.rows.iter().map(|r| r.values).sum();
    let net_weight = level.rows.iter().map(|r| r.net_weight).sum();
    let gross_weight = level.rows.iter().map(|r| r.gross_weight).sum();

    level.totals = LevelTotals {
        nutrients,
        net_weight,
        gross_weight,
    };

    if level.requirement.is_none() {
        tracing::debug!(level_id = level.id, "No requirement loaded; adequacy reported as 0%");
    }

    for n in Nutrient::ALL {
        let adequacy = assess(nutrients.get(n), level.requirement_for(n));
        level.adequacy.set(n, adequacy);
    }
}

/// Rescale the net weight of every row contributing `nutrient` so the level total matches
/// `desired_pct` percent of the requirement.
///
/// All contributors share one scale factor; rows that do not carry the nutrient keep their
/// weight. The whole level is recomputed once at the end because every other nutrient carried
/// by the rescaled rows moves too.
pub fn rescale_from_adequacy(
    level: &mut Level,
    nutrient: Nutrient,
    desired_pct: f64,
) -> RescaleOutcome {
    let requirement = match level.requirement_for(nutrient) {
        Some(r) if r > 0.0 && r.is_finite() => r,
        _ => {
            tracing::warn!(
                level_id = level.id,
                nutrient = %nutrient,
                "Rescale skipped: requirement missing or zero"
            );
            return RescaleOutcome::MissingRequirement;
        }
    };

    let desired_pct = clamp_percent(desired_pct);
    let target_value = desired_pct / 100.0 * requirement;

    let contributors: Vec<usize> = level
        .rows
        .iter()
        .enumerate()
        .filter(|(_, r)| r.per_100g.get(nutrient) > CONTRIBUTOR_MIN_PER_100G)
        .map(|(i, _)| i)
        .collect();

    if contributors.is_empty() {
        tracing::info!(
            level_id = level.id,
            nutrient = %nutrient,
            "Rescale skipped: no ingredient contributes this nutrient"
        );
        return RescaleOutcome::NoContributors;
    }

    let current_value: f64 = contributors
        .iter()
        .map(|&i| level.rows[i].contribution(nutrient))
        .sum();

    if (target_value - current_value).abs() < RESCALE_EPSILON {
        return RescaleOutcome::AlreadySatisfied { current_value };
    }

    if !(current_value > 0.0) {
        tracing::info!(
            level_id = level.id,
            nutrient = %nutrient,
            "Rescale skipped: contributing ingredients have zero weight"
        );
        return RescaleOutcome::ZeroContribution;
    }

    let scale_factor = target_value / current_value;
    if !scale_factor.is_finite() {
        return RescaleOutcome::ZeroContribution;
    }

    for &i in &contributors {
        let row = &mut level.rows[i];
        let new_weight = (row.net_weight * scale_factor).max(0.0);
        row.set_net_weight(new_weight);
    }

    recompute_level_totals(level);

    tracing::info!(
        level_id = level.id,
        nutrient = %nutrient,
        desired_pct,
        scale_factor,
        rows = contributors.len(),
        "Rescaled ingredient weights"
    );

    RescaleOutcome::Applied {
        scale_factor,
        target_value,
        rows_rescaled: contributors.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdequacyClass, IngredientRow};

    fn primaria() -> Level {
        let requirement = NutrientVector {
            calories: 200.0,
            protein: 20.0,
            fat: 10.0,
            carbohydrate: 50.0,
            calcium: 300.0,
            iron: 4.0,
            sodium: 500.0,
        };
        let mut level = Level::new(1, "Primaria", Some(requirement));
        level.rows.push(IngredientRow::new(
            1,
            10,
            "Leche",
            100.0,
            100.0,
            NutrientVector {
                calories: 50.0,
                calcium: 120.0,
                protein: 3.0,
                ..Default::default()
            },
        ));
        level.rows.push(IngredientRow::new(
            2,
            10,
            "Pan",
            50.0,
            80.0,
            NutrientVector {
                calories: 200.0,
                carbohydrate: 40.0,
                sodium: 400.0,
                ..Default::default()
            },
        ));
        level.rows.push(IngredientRow::new(
            3,
            11,
            "Sal",
            1.0,
            100.0,
            NutrientVector {
                sodium: 38_000.0,
                ..Default::default()
            },
        ));
        recompute_level_totals(&mut level);
        level
    }

    #[test]
    fn test_end_to_end_primaria() {
        let requirement = NutrientVector {
            calories: 200.0,
            ..Default::default()
        };
        let mut level = Level::new(1, "Primaria", Some(requirement));
        level.rows.push(IngredientRow::new(
            1,
            10,
            "A",
            100.0,
            100.0,
            NutrientVector {
                calories: 50.0,
                ..Default::default()
            },
        ));
        level.rows.push(IngredientRow::new(
            2,
            10,
            "B",
            50.0,
            80.0,
            NutrientVector {
                calories: 200.0,
                ..Default::default()
            },
        ));
        recompute_level_totals(&mut level);

        assert!((level.totals.nutrients.calories - 150.0).abs() < 1e-9);
        assert!((level.adequacy.calories.percentage - 75.0).abs() < 1e-9);
        assert_eq!(level.adequacy.calories.class, AdequacyClass::High);
        assert!((level.rows[1].gross_weight - 62.5).abs() < 1e-9);

        let outcome = rescale_from_adequacy(&mut level, Nutrient::Calories, 50.0);
        assert!(outcome.is_applied());
        assert!((level.rows[0].net_weight - 66.667).abs() < 0.01);
        assert!((level.rows[1].net_weight - 33.333).abs() < 0.01);
        assert!((level.totals.nutrients.calories - 100.0).abs() < 0.01);
        assert!((level.adequacy.calories.percentage - 50.0).abs() < 0.01);
        assert_eq!(level.adequacy.calories.class, AdequacyClass::Acceptable);
    }

    #[test]
    fn test_end_to_end_reaches_optimal_band() {
        let requirement = NutrientVector {
            calories: 200.0,
            ..Default::default()
        };
        let mut level = Level::new(1, "Primaria", Some(requirement));
        level.rows.push(IngredientRow::new(
            1,
            10,
            "A",
            100.0,
            100.0,
            NutrientVector {
                calories: 50.0,
                ..Default::default()
            },
        ));
        recompute_level_totals(&mut level);

        rescale_from_adequacy(&mut level, Nutrient::Calories, 30.0);
        assert!((level.totals.nutrients.calories - 60.0).abs() < 0.01);
        assert_eq!(level.adequacy.calories.class, AdequacyClass::Optimal);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut level = primaria();
        let first = (level.totals, level.adequacy);
        recompute_level_totals(&mut level);
        assert_eq!(first, (level.totals, level.adequacy));
    }

    #[test]
    fn test_totals_sum_rows() {
        let level = primaria();
        assert!((level.totals.net_weight - 151.0).abs() < 1e-9);
        assert!((level.totals.gross_weight - (100.0 + 62.5 + 1.0)).abs() < 1e-9);
        assert!((level.totals.nutrients.sodium - (200.0 + 380.0)).abs() < 1e-9);
        assert!((level.totals.nutrients.calcium - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_conserves_target_and_leaves_non_contributors() {
        let mut level = primaria();
        let salt_before = level.rows[2].net_weight;

        let outcome = rescale_from_adequacy(&mut level, Nutrient::Calories, 40.0);
        assert!(outcome.is_applied());
        assert!((level.totals.nutrients.calories - 80.0).abs() < 0.01);
        assert_eq!(level.rows[2].net_weight, salt_before);
    }

    #[test]
    fn test_rescale_updates_other_nutrients() {
        let mut level = primaria();
        let calcium_before = level.totals.nutrients.calcium;
        rescale_from_adequacy(&mut level, Nutrient::Calories, 50.0);
        // Leche carries calcium, so the shared calorie factor moves calcium too
        let factor = level.rows[0].net_weight / 100.0;
        assert!((level.totals.nutrients.calcium - calcium_before * factor).abs() < 1e-6);
        let expected_gross = level.rows[1].net_weight * 100.0 / 80.0;
        assert!((level.rows[1].gross_weight - expected_gross).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_clamps_desired_percent() {
        let mut level = primaria();
        rescale_from_adequacy(&mut level, Nutrient::Calories, 150.0);
        assert!((level.totals.nutrients.calories - 200.0).abs() < 0.01);

        let outcome = rescale_from_adequacy(&mut level, Nutrient::Calories, -10.0);
        assert!(outcome.is_applied());
        assert!(level.totals.nutrients.calories.abs() < 0.01);
        assert_eq!(level.rows[0].net_weight, 0.0);
    }

    #[test]
    fn test_rescale_no_contributors_is_noop() {
        let mut level = primaria();
        let before = level.clone();
        let outcome = rescale_from_adequacy(&mut level, Nutrient::Iron, 50.0);
        assert_eq!(outcome, RescaleOutcome::NoContributors);
        assert_eq!(level, before);
    }

    #[test]
    fn test_rescale_missing_requirement_is_noop() {
        let mut level = primaria();
        level.requirement = None;
        recompute_level_totals(&mut level);
        let before = level.clone();
        assert_eq!(
            rescale_from_adequacy(&mut level, Nutrient::Calories, 50.0),
            RescaleOutcome::MissingRequirement
        );
        assert_eq!(level, before);

        let mut level = primaria();
        level.requirement = Some(NutrientVector {
            calories: 0.0,
            ..Default::default()
        });
        assert_eq!(
            rescale_from_adequacy(&mut level, Nutrient::Calories, 50.0),
            RescaleOutcome::MissingRequirement
        );
    }

    #[test]
    fn test_rescale_already_satisfied() {
        let mut level = primaria();
        // 50 + 100 kcal = 75% of 200
        let before = level.clone();
        let outcome = rescale_from_adequacy(&mut level, Nutrient::Calories, 75.0);
        assert!(matches!(outcome, RescaleOutcome::AlreadySatisfied { .. }));
        assert_eq!(level, before);
    }

    #[test]
    fn test_rescale_zero_weight_contributors_do_not_produce_nan() {
        let mut level = primaria();
        level.rows[0].set_net_weight(0.0);
        level.rows[1].set_net_weight(0.0);
        recompute_level_totals(&mut level);

        let outcome = rescale_from_adequacy(&mut level, Nutrient::Calories, 50.0);
        assert_eq!(outcome, RescaleOutcome::ZeroContribution);
        assert!(level.rows.iter().all(|r| r.net_weight.is_finite()));
        assert_eq!(level.rows[0].net_weight, 0.0);
    }

    #[test]
    fn test_rescale_twice_is_stable_for_target_nutrient() {
        let mut level = primaria();
        rescale_from_adequacy(&mut level, Nutrient::Calories, 60.0);
        let weights: Vec<f64> = level.rows.iter().map(|r| r.net_weight).collect();
        let outcome = rescale_from_adequacy(&mut level, Nutrient::Calories, 60.0);
        assert!(matches!(outcome, RescaleOutcome::AlreadySatisfied { .. }));
        let after: Vec<f64> = level.rows.iter().map(|r| r.net_weight).collect();
        assert_eq!(weights, after);
    }
}
