//! Wire shapes of the menu analysis endpoints
//!
//! Field names follow the server's JSON keys. Conversion into the typed model happens here so
//! the rest of the crate never sees wire types.

use serde::{Deserialize, Serialize};

use crate::models::{
    lenient_f64, AnalysisSession, IngredientRow, Level, NutrientVector, Preparation,
};

/// Status fields any endpoint body may carry, checked ahead of the payload.
/// A rejection looks like `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEnvelope {
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ServerEnvelope {
    /// The server's reason, when the body reports a failure
    pub fn rejection(&self) -> Option<String> {
        if self.success {
            return None;
        }
        Some(
            self.error
                .clone()
                .or_else(|| self.message.clone())
                .unwrap_or_else(|| "Request rejected".to_string()),
        )
    }

    /// Reason carried by an error-status body, whatever its `success` field says
    pub fn reason(&self) -> Option<String> {
        self.error.clone().or_else(|| self.message.clone())
    }
}

/// Payload of the per-menu analysis endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResponse {
    pub menu_id: i64,
    #[serde(default)]
    pub menu_nombre: Option<String>,
    #[serde(default)]
    pub niveles: Vec<WireLevel>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireLevel {
    pub id: i64,
    pub nombre: String,
    /// Absent or null while the reference table has no entry for the level
    #[serde(default)]
    pub requerimientos: Option<NutrientVector>,
    #[serde(default)]
    pub preparaciones: Vec<WirePreparation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WirePreparation {
    pub id: i64,
    pub nombre: String,
    #[serde(default)]
    pub ingredientes: Vec<WireIngredient>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WireIngredient {
    pub id: i64,
    pub nombre: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub peso_neto: f64,
    #[serde(default = "full_edible_portion", deserialize_with = "lenient_f64")]
    pub parte_comestible: f64,
    #[serde(default)]
    pub valores_100g: NutrientVector,
}

fn full_edible_portion() -> f64 {
    100.0
}

impl AnalysisResponse {
    /// Convert into a session with every level's totals already recomputed
    pub fn into_session(self) -> AnalysisSession {
        let levels = self.niveles.into_iter().map(WireLevel::into_level).collect();
        AnalysisSession::new(self.menu_id, self.menu_nombre, levels)
    }
}

impl WireLevel {
    fn into_level(self) -> Level {
        let requirement = self.requerimientos.map(|r| r.sanitized());
        let mut level = Level::new(self.id, self.nombre, requirement);
        for prep in self.preparaciones {
            for ing in prep.ingredientes {
                level.rows.push(IngredientRow::new(
                    ing.id,
                    prep.id,
                    ing.nombre,
                    ing.peso_neto,
                    ing.parte_comestible,
                    ing.valores_100g,
                ));
            }
            level.preparations.push(Preparation {
                id: prep.id,
                name: prep.nombre,
            });
        }
        level
    }
}

/// Body of the per-level save endpoint. The server persists these values as computed here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveLevelRequest {
    pub nivel_id: i64,
    pub totales: WireTotals,
    pub porcentajes: NutrientVector,
    pub ingredientes: Vec<WireSavedIngredient>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireTotals {
    #[serde(flatten)]
    pub nutrientes: NutrientVector,
    pub peso_neto_total: f64,
    pub peso_bruto_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireSavedIngredient {
    pub id: i64,
    pub preparacion_id: i64,
    pub peso_neto: f64,
    pub peso_bruto: f64,
    pub valores: NutrientVector,
}

impl SaveLevelRequest {
    /// Build from a level whose totals are current
    pub fn from_level(level: &Level) -> Self {
        Self {
            nivel_id: level.id,
            totales: WireTotals {
                nutrientes: level.totals.nutrients,
                peso_neto_total: level.totals.net_weight,
                peso_bruto_total: level.totals.gross_weight,
            },
            porcentajes: level.adequacy.percentages(),
            ingredientes: level
                .rows
                .iter()
                .map(|r| WireSavedIngredient {
                    id: r.id,
                    preparacion_id: r.preparation_id,
                    peso_neto: r.net_weight,
                    peso_bruto: r.gross_weight,
                    valores: r.values,
                })
                .collect(),
        }
    }
}

/// Reply of mutating endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct SaveLevelResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SaveLevelResponse {
    /// Human-readable notification text
    pub fn notification(&self) -> String {
        match (&self.message, &self.error) {
            (Some(m), _) if self.success => m.clone(),
            (_, Some(e)) if !self.success => e.clone(),
            (Some(m), _) => m.clone(),
            _ if self.success => "Analysis saved".to_string(),
            _ => "Save failed".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Nutrient;

    const ANALYSIS: &str = r#"{
        "success": true,
        "menu_id": 12,
        "menu_nombre": "Menu Semana 3",
        "niveles": [
            {
                "id": 1,
                "nombre": "Primaria",
                "requerimientos": {"calorias": 200, "proteinas": "20.0"},
                "preparaciones": [
                    {
                        "id": 10,
                        "nombre": "Colada",
                        "ingredientes": [
                            {
                                "id": 1, "nombre": "A", "peso_neto": "100.00",
                                "parte_comestible": 100, "valores_100g": {"calorias": 50}
                            },
                            {
                                "id": 2, "nombre": "B", "peso_neto": 50,
                                "parte_comestible": "80", "valores_100g": {"calorias": 200}
                            }
                        ]
                    }
                ]
            },
            {"id": 2, "nombre": "Secundaria", "requerimientos": null}
        ]
    }"#;

    #[test]
    fn test_analysis_into_session() {
        let response: AnalysisResponse = serde_json::from_str(ANALYSIS).unwrap();
        let session = response.into_session();

        assert_eq!(session.menu_id, 12);
        assert_eq!(session.menu_name.as_deref(), Some("Menu Semana 3"));

        let primaria = session.level(1).unwrap();
        assert_eq!(primaria.preparations.len(), 1);
        assert_eq!(primaria.rows.len(), 2);
        assert!((primaria.totals.nutrients.calories - 150.0).abs() < 1e-9);
        assert!((primaria.adequacy.get(Nutrient::Calories).percentage - 75.0).abs() < 1e-9);
        assert!((primaria.rows[1].gross_weight - 62.5).abs() < 1e-9);

        let secundaria = session.level(2).unwrap();
        assert!(secundaria.requirement.is_none());
        assert!(secundaria.rows.is_empty());
    }

    #[test]
    fn test_envelope_of_successful_payload() {
        let envelope: ServerEnvelope = serde_json::from_str(ANALYSIS).unwrap();
        assert!(envelope.success);
        assert_eq!(envelope.rejection(), None);

        let bare: ServerEnvelope = serde_json::from_str(r#"{"menu_id": 3}"#).unwrap();
        assert_eq!(bare.rejection(), None);
    }

    #[test]
    fn test_rejection_body_decodes_without_payload() {
        let body = r#"{"success": false, "error": "Menu no encontrado"}"#;
        let envelope: ServerEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.rejection().as_deref(), Some("Menu no encontrado"));

        let body = r#"{"success": false, "message": "Sin permiso"}"#;
        let envelope: ServerEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.rejection().as_deref(), Some("Sin permiso"));

        let envelope: ServerEnvelope = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert_eq!(envelope.rejection().as_deref(), Some("Request rejected"));
    }

    #[test]
    fn test_missing_edible_portion_defaults_to_full() {
        let ing: WireIngredient =
            serde_json::from_str(r#"{"id": 3, "nombre": "Agua", "peso_neto": 10}"#).unwrap();
        assert_eq!(ing.parte_comestible, 100.0);
        assert_eq!(ing.valores_100g, NutrientVector::zero());
    }

    #[test]
    fn test_save_request_shape() {
        let response: AnalysisResponse = serde_json::from_str(ANALYSIS).unwrap();
        let session = response.into_session();
        let request = SaveLevelRequest::from_level(session.level(1).unwrap());
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["nivel_id"], 1);
        assert_eq!(json["totales"]["calorias"], 150.0);
        assert_eq!(json["totales"]["peso_neto_total"], 150.0);
        assert_eq!(json["totales"]["peso_bruto_total"], 162.5);
        assert_eq!(json["porcentajes"]["calorias"], 75.0);
        assert_eq!(json["ingredientes"][1]["peso_bruto"], 62.5);
        assert_eq!(json["ingredientes"][1]["preparacion_id"], 10);
        assert_eq!(json["ingredientes"][1]["valores"]["calorias"], 100.0);
    }

    #[test]
    fn test_save_response_notification() {
        let ok: SaveLevelResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert_eq!(ok.notification(), "Analysis saved");
        let failed: SaveLevelResponse =
            serde_json::from_str(r#"{"success": false, "error": "Nivel no encontrado"}"#).unwrap();
        assert_eq!(failed.notification(), "Nivel no encontrado");
    }
}
