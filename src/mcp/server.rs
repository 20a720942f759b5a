//! Menu Adequacy MCP Server Implementation
//!
//! Exposes the analysis tools over MCP. The tool surface plays the role of the analysis view:
//! every response is a projection of the stored working copy.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::client::ApiClient;
use crate::config::Config;
use crate::db::Database;
use crate::models::Nutrient;
use crate::tools::analysis;
use crate::tools::debounce::Debouncer;
use crate::tools::status::StatusTracker;

type EditKey = (i64, i64, Nutrient);

/// Menu Adequacy MCP Service
#[derive(Clone)]
pub struct AdequacyService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    client: ApiClient,
    debouncer: Arc<Debouncer<EditKey>>,
    autosave: bool,
    tool_router: ToolRouter<AdequacyService>,
}

impl AdequacyService {
    pub fn new(config: &Config, database: Database, client: ApiClient) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(
                config.database_path.clone(),
                config.client.base_url.clone(),
            ))),
            database,
            client,
            debouncer: Arc::new(Debouncer::new(config.debounce)),
            autosave: config.autosave,
            tool_router: Self::tool_router(),
        }
    }

    /// Save a level in the background. The outcome is journaled; nothing is retried.
    fn spawn_autosave(&self, menu_id: i64, level_id: i64) {
        let database = self.database.clone();
        let client = self.client.clone();
        tokio::spawn(async move {
            match analysis::save_level(&database, &client, menu_id, level_id).await {
                Ok(result) if result.success => {
                    tracing::info!(menu_id, level_id, "Autosave completed");
                }
                Ok(result) => {
                    tracing::warn!(
                        menu_id,
                        level_id,
                        notification = %result.notification,
                        "Autosave failed"
                    );
                }
                Err(e) => {
                    tracing::warn!(menu_id, level_id, error = %e, "Autosave could not run");
                }
            }
        });
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MenuParams {
    /// Menu ID on the ERP server
    pub menu_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LevelParams {
    /// Menu ID
    pub menu_id: i64,
    /// School level ID
    pub level_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetIngredientWeightParams {
    /// Menu ID
    pub menu_id: i64,
    /// School level ID
    pub level_id: i64,
    /// Ingredient row ID
    pub row_id: i64,
    /// New net weight in grams (negative values become 0)
    pub net_weight: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RescaleToAdequacyParams {
    /// Menu ID
    pub menu_id: i64,
    /// School level ID
    pub level_id: i64,
    /// Nutrient: calorias, proteinas, grasas, carbohidratos, calcio, hierro, sodio
    pub nutrient: String,
    /// Desired adequacy percentage (clamped to 0-100)
    pub desired_pct: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RemoveIngredientParams {
    /// Menu ID
    pub menu_id: i64,
    /// School level ID
    pub level_id: i64,
    /// Ingredient row ID
    pub row_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListSaveAttemptsParams {
    /// Menu ID
    pub menu_id: i64,
    /// Maximum results (default 20)
    #[serde(default = "default_attempt_limit")]
    pub limit: i64,
}

fn default_attempt_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
struct SupersededResponse {
    superseded: bool,
    menu_id: i64,
    level_id: i64,
    nutrient: Nutrient,
    desired_pct: f64,
    message: &'static str,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl AdequacyService {
    // --- Status ---

    #[tool(description = "Get the current status of the menu adequacy service including build info, server URL, database status, and process information")]
    async fn service_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        to_json(&tracker.get_status())
    }

    #[tool(description = "Get step-by-step instructions for analysing and adjusting menu adequacy. Call this before editing a menu analysis.")]
    fn analysis_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::ANALYSIS_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(ANALYSIS_INSTRUCTIONS)]))
    }

    // --- Sessions ---

    #[tool(description = "Fetch a menu's nutritional analysis from the ERP server and make it the local working copy (discards unsaved edits)")]
    async fn load_menu_analysis(
        &self,
        Parameters(p): Parameters<MenuParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = analysis::load_menu_analysis(&self.database, &self.client, p.menu_id)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List menus with a local working copy and whether they have unsaved edits")]
    fn list_sessions(&self) -> Result<CallToolResult, McpError> {
        let result =
            analysis::list_sessions(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Discard the local working copy of a menu")]
    fn discard_session(
        &self,
        Parameters(p): Parameters<MenuParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = analysis::discard_session(&self.database, p.menu_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Levels ---

    #[tool(description = "Get a school level's ingredient rows grouped by preparation, with totals, requirement and adequacy classification")]
    fn get_level_analysis(
        &self,
        Parameters(p): Parameters<LevelParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = analysis::get_level_analysis(&self.database, p.menu_id, p.level_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Set an ingredient's net weight in grams. Gross weight, nutrient values, level totals and adequacy are recomputed.")]
    fn set_ingredient_weight(
        &self,
        Parameters(p): Parameters<SetIngredientWeightParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = analysis::set_ingredient_weight(
            &self.database,
            p.menu_id,
            p.level_id,
            p.row_id,
            p.net_weight,
        )
        .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Set the desired adequacy percentage for one nutrient at a level. All ingredients carrying that nutrient are scaled by one shared factor; rapid repeated calls for the same nutrient are coalesced and only the last is applied.")]
    async fn rescale_to_adequacy(
        &self,
        Parameters(p): Parameters<RescaleToAdequacyParams>,
    ) -> Result<CallToolResult, McpError> {
        let nutrient = Nutrient::from_str(&p.nutrient).ok_or_else(|| {
            McpError::invalid_params(format!("Unknown nutrient '{}'", p.nutrient), None)
        })?;

        if !self.debouncer.settle((p.menu_id, p.level_id, nutrient)).await {
            return to_json(&SupersededResponse {
                superseded: true,
                menu_id: p.menu_id,
                level_id: p.level_id,
                nutrient,
                desired_pct: p.desired_pct,
                message: "A newer adequacy edit for this nutrient replaced this one",
            });
        }

        let result = analysis::rescale_level(
            &self.database,
            p.menu_id,
            p.level_id,
            nutrient.as_str(),
            p.desired_pct,
        )
        .map_err(|e| McpError::internal_error(e, None))?;

        if self.autosave && result.result.is_applied() {
            self.spawn_autosave(p.menu_id, p.level_id);
        }
        to_json(&result)
    }

    #[tool(description = "Remove an ingredient row from a level after the ingredient was deleted from its preparation")]
    fn remove_ingredient(
        &self,
        Parameters(p): Parameters<RemoveIngredientParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = analysis::remove_ingredient(&self.database, p.menu_id, p.level_id, p.row_id)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Saving ---

    #[tool(description = "Save a level's computed totals, percentages and ingredient weights to the ERP server. Failures are reported and not retried.")]
    async fn save_level_analysis(
        &self,
        Parameters(p): Parameters<LevelParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = analysis::save_level(&self.database, &self.client, p.menu_id, p.level_id)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List recent save attempts for a menu, newest first")]
    fn list_save_attempts(
        &self,
        Parameters(p): Parameters<ListSaveAttemptsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = analysis::list_save_attempts(&self.database, p.menu_id, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for AdequacyService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "menu-adequacy".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Menu Adequacy Engine".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Menu Adequacy Engine - nutritional adequacy of school menus per level. \
                 Call analysis_instructions first. \
                 Sessions: load_menu_analysis/list_sessions/discard_session. \
                 Levels: get_level_analysis, set_ingredient_weight, rescale_to_adequacy, remove_ingredient. \
                 Saving: save_level_analysis, list_save_attempts."
                    .into(),
            ),
        }
    }
}
