//! Analysis session
//!
//! The context object for one open menu analysis. Every mutation goes through here so that a
//! level's totals are recomputed before the mutation is considered settled.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::nutrition::{recompute_level_totals, rescale_from_adequacy, RescaleOutcome};
use super::{IngredientRow, Level, Nutrient};

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Level {0} is not part of this analysis")]
    UnknownLevel(i64),

    #[error("Ingredient row {row_id} not found in level {level_id}")]
    UnknownRow { level_id: i64, row_id: i64 },

    #[error("Ingredient row {row_id} already exists in level {level_id}")]
    DuplicateRow { level_id: i64, row_id: i64 },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// One menu's analysis, scoped to a single editing session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSession {
    pub menu_id: i64,
    #[serde(default)]
    pub menu_name: Option<String>,
    pub levels: Vec<Level>,
}

impl AnalysisSession {
    /// Build a session and bring every level's totals up to date
    pub fn new(menu_id: i64, menu_name: Option<String>, levels: Vec<Level>) -> Self {
        let mut session = Self { menu_id, menu_name, levels };
        session.recompute_all();
        session
    }

    pub fn level(&self, level_id: i64) -> SessionResult<&Level> {
        self.levels
            .iter()
            .find(|l| l.id == level_id)
            .ok_or(SessionError::UnknownLevel(level_id))
    }

    pub fn level_mut(&mut self, level_id: i64) -> SessionResult<&mut Level> {
        self.levels
            .iter_mut()
            .find(|l| l.id == level_id)
            .ok_or(SessionError::UnknownLevel(level_id))
    }

    pub fn recompute_level(&mut self, level_id: i64) -> SessionResult<&Level> {
        let level = self.level_mut(level_id)?;
        recompute_level_totals(level);
        Ok(level)
    }

    pub fn recompute_all(&mut self) {
        for level in self.levels.iter_mut() {
            recompute_level_totals(level);
        }
    }

    /// Edit one row's net weight. Negative input is clamped to zero.
    pub fn set_row_net_weight(
        &mut self,
        level_id: i64,
        row_id: i64,
        grams: f64,
    ) -> SessionResult<&Level> {
        let level = self.level_mut(level_id)?;
        level
            .row_mut(row_id)
            .ok_or(SessionError::UnknownRow { level_id, row_id })?
            .set_net_weight(grams);
        recompute_level_totals(level);
        Ok(level)
    }

    pub fn add_row(&mut self, level_id: i64, row: IngredientRow) -> SessionResult<&Level> {
        let level = self.level_mut(level_id)?;
        if level.row(row.id).is_some() {
            return Err(SessionError::DuplicateRow { level_id, row_id: row.id });
        }
        level.rows.push(row);
        recompute_level_totals(level);
        Ok(level)
    }

    /// Drop a row after its ingredient was deleted from the preparation
    pub fn remove_row(&mut self, level_id: i64, row_id: i64) -> SessionResult<IngredientRow> {
        let level = self.level_mut(level_id)?;
        let idx = level
            .rows
            .iter()
            .position(|r| r.id == row_id)
            .ok_or(SessionError::UnknownRow { level_id, row_id })?;
        let removed = level.rows.remove(idx);
        recompute_level_totals(level);
        Ok(removed)
    }

    pub fn rescale_from_adequacy(
        &mut self,
        level_id: i64,
        nutrient: Nutrient,
        desired_pct: f64,
    ) -> SessionResult<RescaleOutcome> {
        let level = self.level_mut(level_id)?;
        Ok(rescale_from_adequacy(level, nutrient, desired_pct))
    }
}
