//! School level model
//!
//! A level groups the ingredient rows of a menu for one school level together with its
//! requirement vector and the derived totals and adequacy.

use serde::{Deserialize, Serialize};

use super::{IngredientRow, Nutrient, NutrientVector};

/// Three-tier adequacy classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AdequacyClass {
    #[default]
    Optimal,
    Acceptable,
    High,
}

impl AdequacyClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdequacyClass::Optimal => "optimal",
            AdequacyClass::Acceptable => "acceptable",
            AdequacyClass::High => "high",
        }
    }
}

/// Adequacy of one nutrient at one level
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutrientAdequacy {
    pub percentage: f64,
    pub class: AdequacyClass,
}

/// Adequacy of every nutrient at one level
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdequacyReport {
    #[serde(rename = "calorias")]
    pub calories: NutrientAdequacy,
    #[serde(rename = "proteinas")]
    pub protein: NutrientAdequacy,
    #[serde(rename = "grasas")]
    pub fat: NutrientAdequacy,
    #[serde(rename = "carbohidratos")]
    pub carbohydrate: NutrientAdequacy,
    #[serde(rename = "calcio")]
    pub calcium: NutrientAdequacy,
    #[serde(rename = "hierro")]
    pub iron: NutrientAdequacy,
    #[serde(rename = "sodio")]
    pub sodium: NutrientAdequacy,
}

impl AdequacyReport {
    pub fn get(&self, nutrient: Nutrient) -> NutrientAdequacy {
        match nutrient {
            Nutrient::Calories => self.calories,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Carbohydrate => self.carbohydrate,
            Nutrient::Calcium => self.calcium,
            Nutrient::Iron => self.iron,
            Nutrient::Sodium => self.sodium,
        }
    }

    pub fn set(&mut self, nutrient: Nutrient, value: NutrientAdequacy) {
        match nutrient {
            Nutrient::Calories => self.calories = value,
            Nutrient::Protein => self.protein = value,
            Nutrient::Fat => self.fat = value,
            Nutrient::Carbohydrate => self.carbohydrate = value,
            Nutrient::Calcium => self.calcium = value,
            Nutrient::Iron => self.iron = value,
            Nutrient::Sodium => self.sodium = value,
        }
    }

    /// Percentages only, keyed like a nutrient vector
    pub fn percentages(&self) -> NutrientVector {
        let mut out = NutrientVector::zero();
        for n in Nutrient::ALL {
            out.set(n, self.get(n).percentage);
        }
        out
    }
}

/// Summed values of every row at a level
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelTotals {
    pub nutrients: NutrientVector,
    pub net_weight: f64,
    pub gross_weight: f64,
}

/// A preparation (dish) grouping ingredient rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preparation {
    pub id: i64,
    pub name: String,
}

/// One school level of a menu analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: i64,
    pub name: String,
    /// Daily allowance supplied by the server; `None` until loaded
    pub requirement: Option<NutrientVector>,
    #[serde(default)]
    pub preparations: Vec<Preparation>,
    #[serde(default)]
    pub rows: Vec<IngredientRow>,
    #[serde(default)]
    pub totals: LevelTotals,
    #[serde(default)]
    pub adequacy: AdequacyReport,
}

impl Level {
    /// Create an empty level. Totals stay zero until rows are added and recomputed.
    pub fn new(id: i64, name: impl Into<String>, requirement: Option<NutrientVector>) -> Self {
        Self {
            id,
            name: name.into(),
            requirement,
            preparations: Vec::new(),
            rows: Vec::new(),
            totals: LevelTotals::default(),
            adequacy: AdequacyReport::default(),
        }
    }

    /// Requirement for one nutrient, if loaded
    pub fn requirement_for(&self, nutrient: Nutrient) -> Option<f64> {
        self.requirement.map(|r| r.get(nutrient))
    }

    pub fn row(&self, row_id: i64) -> Option<&IngredientRow> {
        self.rows.iter().find(|r| r.id == row_id)
    }

    pub fn row_mut(&mut self, row_id: i64) -> Option<&mut IngredientRow> {
        self.rows.iter_mut().find(|r| r.id == row_id)
    }

    /// Rows belonging to one preparation
    pub fn rows_for_preparation(
        &self,
        preparation_id: i64,
    ) -> impl Iterator<Item = &IngredientRow> {
        self.rows.iter().filter(move |r| r.preparation_id == preparation_id)
    }
}
