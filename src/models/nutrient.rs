//! Nutrient identifiers and the seven-nutrient vector
//!
//! Shared by ingredient rows, level totals and requirements.

use serde::{Deserialize, Deserializer, Serialize};

/// One of the nutrients tracked by the menu analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Calories,
    Protein,
    Fat,
    Carbohydrate,
    Calcium,
    Iron,
    Sodium,
}

impl Nutrient {
    pub const ALL: [Nutrient; 7] = [
        Nutrient::Calories,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Carbohydrate,
        Nutrient::Calcium,
        Nutrient::Iron,
        Nutrient::Sodium,
    ];

    /// Key used by the menu analysis endpoints
    pub fn as_str(&self) -> &'static str {
        match self {
            Nutrient::Calories => "calorias",
            Nutrient::Protein => "proteinas",
            Nutrient::Fat => "grasas",
            Nutrient::Carbohydrate => "carbohidratos",
            Nutrient::Calcium => "calcio",
            Nutrient::Iron => "hierro",
            Nutrient::Sodium => "sodio",
        }
    }

    /// Parse a server key or an English name
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "calorias" | "calories" | "kcal" | "energia" => Some(Nutrient::Calories),
            "proteinas" | "proteina" | "protein" => Some(Nutrient::Protein),
            "grasas" | "grasa" | "fat" => Some(Nutrient::Fat),
            "carbohidratos" | "cho" | "carbohydrate" | "carbs" => Some(Nutrient::Carbohydrate),
            "calcio" | "calcium" => Some(Nutrient::Calcium),
            "hierro" | "iron" => Some(Nutrient::Iron),
            "sodio" | "sodium" => Some(Nutrient::Sodium),
            _ => None,
        }
    }

    /// Display unit for amounts of this nutrient
    pub fn unit(&self) -> &'static str {
        match self {
            Nutrient::Calories => "kcal",
            Nutrient::Protein | Nutrient::Fat | Nutrient::Carbohydrate => "g",
            Nutrient::Calcium | Nutrient::Iron | Nutrient::Sodium => "mg",
        }
    }
}

impl std::fmt::Display for Nutrient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amounts of every tracked nutrient
///
/// Missing keys deserialize as zero so that incomplete reference data never blocks a recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NutrientVector {
    #[serde(rename = "calorias", alias = "calories", deserialize_with = "lenient_f64")]
    pub calories: f64,
    #[serde(rename = "proteinas", alias = "protein", deserialize_with = "lenient_f64")]
    pub protein: f64,
    #[serde(rename = "grasas", alias = "fat", deserialize_with = "lenient_f64")]
    pub fat: f64,
    #[serde(rename = "carbohidratos", alias = "carbohydrate", deserialize_with = "lenient_f64")]
    pub carbohydrate: f64,
    #[serde(rename = "calcio", alias = "calcium", deserialize_with = "lenient_f64")]
    pub calcium: f64,
    #[serde(rename = "hierro", alias = "iron", deserialize_with = "lenient_f64")]
    pub iron: f64,
    #[serde(rename = "sodio", alias = "sodium", deserialize_with = "lenient_f64")]
    pub sodium: f64,
}

impl NutrientVector {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn get(&self, nutrient: Nutrient) -> f64 {
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

    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        let slot = match nutrient {
            Nutrient::Calories => &mut self.calories,
            Nutrient::Protein => &mut self.protein,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Carbohydrate => &mut self.carbohydrate,
            Nutrient::Calcium => &mut self.calcium,
            Nutrient::Iron => &mut self.iron,
            Nutrient::Sodium => &mut self.sodium,
        };
        *slot = value;
    }

    /// Scale every value by a multiplier
    pub fn scale(&self, multiplier: f64) -> Self {
        let mut out = Self::zero();
        for n in Nutrient::ALL {
            out.set(n, self.get(n) * multiplier);
        }
        out
    }

    pub fn add(&self, other: &NutrientVector) -> Self {
        let mut out = Self::zero();
        for n in Nutrient::ALL {
            out.set(n, self.get(n) + other.get(n));
        }
        out
    }

    /// Replace non-finite values with zero
    pub fn sanitized(&self) -> Self {
        let mut out = *self;
        for n in Nutrient::ALL {
            if !out.get(n).is_finite() {
                out.set(n, 0.0);
            }
        }
        out
    }
}

impl std::ops::Add for NutrientVector {
    type Output = NutrientVector;

    fn add(self, other: NutrientVector) -> NutrientVector {
        NutrientVector::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for NutrientVector {
    type Output = NutrientVector;

    fn mul(self, multiplier: f64) -> NutrientVector {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for NutrientVector {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(NutrientVector::zero(), |acc, n| acc + n)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Accept JSON numbers, numeric strings (Django serializes decimals as text) and null.
///
/// A decimal comma is accepted; null and blank text read as zero.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        Some(NumberOrText::Number(n)) => Ok(n),
        Some(NumberOrText::Text(s)) => {
            let normalized = s.trim().replace(',', ".");
            if normalized.is_empty() {
                return Ok(0.0);
            }
            normalized.parse::<f64>().map_err(serde::de::Error::custom)
        }
        None => Ok(0.0),
    }
}
