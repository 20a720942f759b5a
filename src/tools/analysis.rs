//! Menu analysis tools
//!
//! Operations on a menu's working copy. Each call loads the stored session, applies one
//! mutation through `AnalysisSession` (which recomputes the level) and stores it back.

use rusqlite::TransactionBehavior;
use serde::Serialize;

use crate::client::ApiClient;
use crate::db::Database;
use crate::models::{
    AdequacyReport, AnalysisSession, IngredientRow, Level, LevelTotals, Nutrient, NutrientVector,
    SaveAttempt, StoredSession, StoredSessionSummary,
};
use crate::nutrition::{clamp_percent, RescaleOutcome};

/// Per-level overview
#[derive(Debug, Serialize)]
pub struct LevelSummary {
    pub level_id: i64,
    pub name: String,
    pub has_requirement: bool,
    pub preparation_count: usize,
    pub row_count: usize,
    pub totals: LevelTotals,
    pub adequacy: AdequacyReport,
}

impl From<&Level> for LevelSummary {
    fn from(level: &Level) -> Self {
        Self {
            level_id: level.id,
            name: level.name.clone(),
            has_requirement: level.requirement.is_some(),
            preparation_count: level.preparations.len(),
            row_count: level.rows.len(),
            totals: level.totals,
            adequacy: level.adequacy,
        }
    }
}

/// Response for load_menu_analysis
#[derive(Debug, Serialize)]
pub struct LoadAnalysisResponse {
    pub menu_id: i64,
    pub menu_name: Option<String>,
    pub levels: Vec<LevelSummary>,
    pub loaded_at: String,
}

/// Rows of one preparation
#[derive(Debug, Serialize)]
pub struct PreparationDetail {
    pub id: i64,
    pub name: String,
    pub rows: Vec<IngredientRow>,
}

/// Full level detail
#[derive(Debug, Serialize)]
pub struct LevelDetail {
    pub menu_id: i64,
    pub level_id: i64,
    pub name: String,
    pub requirement: Option<NutrientVector>,
    pub preparations: Vec<PreparationDetail>,
    pub totals: LevelTotals,
    pub adequacy: AdequacyReport,
    pub dirty: bool,
}

/// Response for list_sessions
#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<StoredSessionSummary>,
    pub count: usize,
}

/// Response for set_ingredient_weight
#[derive(Debug, Serialize)]
pub struct WeightEditResponse {
    pub menu_id: i64,
    pub row_id: i64,
    pub net_weight: f64,
    pub gross_weight: f64,
    pub level: LevelSummary,
}

/// Response for rescale_level
#[derive(Debug, Serialize)]
pub struct RescaleResponse {
    pub menu_id: i64,
    pub nutrient: Nutrient,
    pub requested_pct: f64,
    pub applied_pct: f64,
    pub result: RescaleOutcome,
    pub level: LevelSummary,
}

/// Response for remove_ingredient
#[derive(Debug, Serialize)]
pub struct RemoveIngredientResponse {
    pub menu_id: i64,
    pub removed_row_id: i64,
    pub ingredient_name: String,
    pub level: LevelSummary,
}

/// Response for save_level. A failed save is a notification, not a tool error.
#[derive(Debug, Serialize)]
pub struct SaveLevelResult {
    pub menu_id: i64,
    pub level_id: i64,
    pub success: bool,
    pub notification: String,
    pub attempt_id: i64,
}

/// Response for list_save_attempts
#[derive(Debug, Serialize)]
pub struct ListSaveAttemptsResponse {
    pub attempts: Vec<SaveAttempt>,
    pub count: usize,
}

/// Response for discard_session
#[derive(Debug, Serialize)]
pub struct DiscardSessionResponse {
    pub success: bool,
    pub menu_id: i64,
}

// ============================================================================
// Working copy helpers
// ============================================================================

fn db_error(e: impl std::fmt::Display) -> String {
    format!("Database error: {}", e)
}

fn missing_copy(menu_id: i64) -> String {
    format!(
        "No analysis loaded for menu {}; call load_menu_analysis first",
        menu_id
    )
}

fn load_stored(db: &Database, menu_id: i64) -> Result<StoredSession, String> {
    let conn = db.get_conn().map_err(db_error)?;
    StoredSession::get_by_menu(&conn, menu_id)
        .map_err(|e| format!("Failed to load working copy: {}", e))?
        .ok_or_else(|| missing_copy(menu_id))
}

/// Load, mutate and store a menu's working copy inside one immediate transaction, so edits
/// of the same menu from concurrent tool calls apply one after another.
///
/// `edit` returns its response and whether the level changed; unchanged copies are not stored.
fn edit_working_copy<T>(
    db: &Database,
    menu_id: i64,
    level_id: i64,
    edit: impl FnOnce(&mut AnalysisSession) -> Result<(T, bool), String>,
) -> Result<T, String> {
    let mut conn = db.get_conn().map_err(db_error)?;
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(db_error)?;

    let mut session = StoredSession::get_by_menu(&tx, menu_id)
        .map_err(|e| format!("Failed to load working copy: {}", e))?
        .ok_or_else(|| missing_copy(menu_id))?
        .session;

    let (response, changed) = edit(&mut session)?;
    if changed {
        StoredSession::store_level_edit(&tx, &session, level_id)
            .map_err(|e| format!("Failed to store edit: {}", e))?;
    }
    tx.commit().map_err(db_error)?;
    Ok(response)
}

/// Replace the working copy with a freshly loaded session
pub fn store_loaded_session(
    db: &Database,
    session: &AnalysisSession,
) -> Result<LoadAnalysisResponse, String> {
    let conn = db.get_conn().map_err(db_error)?;
    let stored = StoredSession::replace_loaded(&conn, session)
        .map_err(|e| format!("Failed to store analysis: {}", e))?;

    Ok(LoadAnalysisResponse {
        menu_id: stored.menu_id,
        menu_name: stored.menu_name,
        levels: stored.session.levels.iter().map(LevelSummary::from).collect(),
        loaded_at: stored.loaded_at,
    })
}

// ============================================================================
// Tools
// ============================================================================

/// Fetch a menu's analysis from the server and make it the working copy
pub async fn load_menu_analysis(
    db: &Database,
    client: &ApiClient,
    menu_id: i64,
) -> Result<LoadAnalysisResponse, String> {
    let session = client
        .fetch_analysis(menu_id)
        .await
        .map_err(|e| format!("Failed to fetch analysis for menu {}: {}", menu_id, e))?;
    store_loaded_session(db, &session)
}

pub fn get_level_analysis(
    db: &Database,
    menu_id: i64,
    level_id: i64,
) -> Result<LevelDetail, String> {
    let stored = load_stored(db, menu_id)?;
    let level = stored.session.level(level_id).map_err(|e| e.to_string())?;

    let preparations = level
        .preparations
        .iter()
        .map(|p| PreparationDetail {
            id: p.id,
            name: p.name.clone(),
            rows: level.rows_for_preparation(p.id).cloned().collect(),
        })
        .collect();

    Ok(LevelDetail {
        menu_id,
        level_id: level.id,
        name: level.name.clone(),
        requirement: level.requirement,
        preparations,
        totals: level.totals,
        adequacy: level.adequacy,
        dirty: stored.is_level_dirty(level_id),
    })
}

pub fn list_sessions(db: &Database) -> Result<ListSessionsResponse, String> {
    let conn = db.get_conn().map_err(db_error)?;
    let sessions =
        StoredSession::list(&conn).map_err(|e| format!("Failed to list sessions: {}", e))?;
    let count = sessions.len();
    Ok(ListSessionsResponse { sessions, count })
}

/// Change one row's net weight and recompute its level
pub fn set_ingredient_weight(
    db: &Database,
    menu_id: i64,
    level_id: i64,
    row_id: i64,
    grams: f64,
) -> Result<WeightEditResponse, String> {
    edit_working_copy(db, menu_id, level_id, |session| {
        let level = session
            .set_row_net_weight(level_id, row_id, grams)
            .map_err(|e| e.to_string())?;
        let row = level
            .row(row_id)
            .ok_or_else(|| format!("Ingredient row {} vanished", row_id))?;

        let response = WeightEditResponse {
            menu_id,
            row_id,
            net_weight: row.net_weight,
            gross_weight: row.gross_weight,
            level: LevelSummary::from(level),
        };
        Ok((response, true))
    })
}

/// Rescale contributing ingredients so `nutrient` reaches `desired_pct` of the requirement
pub fn rescale_level(
    db: &Database,
    menu_id: i64,
    level_id: i64,
    nutrient: &str,
    desired_pct: f64,
) -> Result<RescaleResponse, String> {
    let nutrient = Nutrient::from_str(nutrient).ok_or_else(|| {
        format!(
            "Unknown nutrient '{}'. Use one of: {}",
            nutrient,
            Nutrient::ALL
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })?;

    edit_working_copy(db, menu_id, level_id, |session| {
        let outcome = session
            .rescale_from_adequacy(level_id, nutrient, desired_pct)
            .map_err(|e| e.to_string())?;
        let applied = outcome.is_applied();

        let level = session.level(level_id).map_err(|e| e.to_string())?;
        let response = RescaleResponse {
            menu_id,
            nutrient,
            requested_pct: desired_pct,
            applied_pct: clamp_percent(desired_pct),
            result: outcome,
            level: LevelSummary::from(level),
        };
        Ok((response, applied))
    })
}

/// Drop a row from a level (ingredient deleted from its preparation)
pub fn remove_ingredient(
    db: &Database,
    menu_id: i64,
    level_id: i64,
    row_id: i64,
) -> Result<RemoveIngredientResponse, String> {
    edit_working_copy(db, menu_id, level_id, |session| {
        let removed = session
            .remove_row(level_id, row_id)
            .map_err(|e| e.to_string())?;

        let level = session.level(level_id).map_err(|e| e.to_string())?;
        let response = RemoveIngredientResponse {
            menu_id,
            removed_row_id: removed.id,
            ingredient_name: removed.ingredient_name,
            level: LevelSummary::from(level),
        };
        Ok((response, true))
    })
}

/// Post one level to the server. Network or server failures are recorded and returned as an
/// unsuccessful result; they are never retried.
pub async fn save_level(
    db: &Database,
    client: &ApiClient,
    menu_id: i64,
    level_id: i64,
) -> Result<SaveLevelResult, String> {
    let stored = load_stored(db, menu_id)?;
    stored.session.level(level_id).map_err(|e| e.to_string())?;

    let (success, notification) = match client.save_level(&stored.session, level_id).await {
        Ok(reply) => (true, reply.notification()),
        Err(e) => {
            tracing::warn!(menu_id, level_id, error = %e, "Level save failed");
            (false, e.to_string())
        }
    };

    record_save(db, menu_id, level_id, stored.revision, success, &notification)
}

/// Journal a save result. On success the level is marked clean, unless it was edited after
/// `saved_revision` (the copy that was sent).
pub fn record_save(
    db: &Database,
    menu_id: i64,
    level_id: i64,
    saved_revision: i64,
    success: bool,
    notification: &str,
) -> Result<SaveLevelResult, String> {
    let attempt = db
        .with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let attempt = SaveAttempt::record(&tx, menu_id, level_id, success, notification)?;
            if success
                && !StoredSession::mark_level_saved(&tx, menu_id, level_id, saved_revision)?
            {
                tracing::debug!(menu_id, level_id, "Level dirty mark left unchanged");
            }
            tx.commit()?;
            Ok(attempt)
        })
        .map_err(|e| format!("Failed to record save attempt: {}", e))?;

    Ok(SaveLevelResult {
        menu_id,
        level_id,
        success,
        notification: notification.to_string(),
        attempt_id: attempt.id,
    })
}

pub fn list_save_attempts(
    db: &Database,
    menu_id: i64,
    limit: i64,
) -> Result<ListSaveAttemptsResponse, String> {
    let limit = limit.clamp(1, 200);
    let conn = db.get_conn().map_err(db_error)?;
    let attempts = SaveAttempt::list_for_menu(&conn, menu_id, limit)
        .map_err(|e| format!("Failed to list save attempts: {}", e))?;
    let count = attempts.len();
    Ok(ListSaveAttemptsResponse { attempts, count })
}

pub fn discard_session(db: &Database, menu_id: i64) -> Result<DiscardSessionResponse, String> {
    let conn = db.get_conn().map_err(db_error)?;
    let success =
        StoredSession::delete(&conn, menu_id).map_err(|e| format!("Failed to discard: {}", e))?;
    Ok(DiscardSessionResponse { success, menu_id })
}
