//! Save attempt model
//!
//! Journal of per-level save calls. A failed save is recorded and reported, never retried.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAttempt {
    pub id: i64,
    pub menu_id: i64,
    pub level_id: i64,
    pub success: bool,
    pub message: String,
    pub attempted_at: String,
}

impl SaveAttempt {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            menu_id: row.get("menu_id")?,
            level_id: row.get("level_id")?,
            success: row.get::<_, i32>("success")? != 0,
            message: row.get("message")?,
            attempted_at: row.get("attempted_at")?,
        })
    }

    pub fn record(
        conn: &Connection,
        menu_id: i64,
        level_id: i64,
        success: bool,
        message: &str,
    ) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO save_attempts (menu_id, level_id, success, message)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![menu_id, level_id, success as i32, message],
        )?;
        let id = conn.last_insert_rowid();
        let attempt = conn.query_row(
            "SELECT * FROM save_attempts WHERE id = ?1",
            [id],
            Self::from_row,
        )?;
        Ok(attempt)
    }

    /// Most recent attempts first
    pub fn list_for_menu(conn: &Connection, menu_id: i64, limit: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM save_attempts WHERE menu_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let attempts = stmt
            .query_map(params![menu_id, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(attempts)
    }
}
