//! Ingredient row model
//!
//! One ingredient of one preparation at one school level, with its editable net weight and the
//! values derived from it.

use serde::{Deserialize, Serialize};

use super::NutrientVector;

/// An ingredient row inside a level's analysis table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientRow {
    pub id: i64,
    pub preparation_id: i64,
    pub ingredient_name: String,
    /// Net weight in grams (user-editable)
    pub net_weight: f64,
    /// Edible portion percentage (fixed per ingredient)
    pub edible_portion_pct: f64,
    /// Nutrient content per 100 g of edible portion
    pub per_100g: NutrientVector,
    /// Derived: net weight × 100 / edible portion %
    #[serde(default)]
    pub gross_weight: f64,
    /// Derived: per_100g × net weight / 100
    #[serde(default)]
    pub values: NutrientVector,
}

impl IngredientRow {
    /// Build a row and compute its derived fields
    pub fn new(
        id: i64,
        preparation_id: i64,
        ingredient_name: impl Into<String>,
        net_weight: f64,
        edible_portion_pct: f64,
        per_100g: NutrientVector,
    ) -> Self {
        let mut row = Self {
            id,
            preparation_id,
            ingredient_name: ingredient_name.into(),
            net_weight: sanitize_weight(net_weight),
            edible_portion_pct,
            per_100g: per_100g.sanitized(),
            gross_weight: 0.0,
            values: NutrientVector::zero(),
        };
        row.refresh_derived();
        row
    }

    /// Gross weight for a given net weight.
    ///
    /// A missing or non-positive edible portion is treated as fully edible.
    pub fn gross_weight_for(&self, net_weight: f64) -> f64 {
        if self.edible_portion_pct > 0.0 && self.edible_portion_pct.is_finite() {
            net_weight * 100.0 / self.edible_portion_pct
        } else {
            net_weight
        }
    }

    /// Contribution of this row to one nutrient at its current net weight
    pub fn contribution(&self, nutrient: super::Nutrient) -> f64 {
        self.per_100g.get(nutrient) * self.net_weight / 100.0
    }

    /// Recompute gross weight and per-row nutrient values from the net weight
    pub fn refresh_derived(&mut self) {
        self.gross_weight = self.gross_weight_for(self.net_weight);
        self.values = self.per_100g.scale(self.net_weight / 100.0);
    }

    /// Set the net weight, clamping invalid input to zero.
    ///
    /// Callers owning the level must recompute its totals afterwards.
    pub fn set_net_weight(&mut self, grams: f64) {
        self.net_weight = sanitize_weight(grams);
        self.refresh_derived();
    }
}

fn sanitize_weight(grams: f64) -> f64 {
    if grams.is_finite() {
        grams.max(0.0)
    } else {
        0.0
    }
}
