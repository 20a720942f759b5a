//! Stored session model
//!
//! Persists the working copy of a menu analysis between tool calls and restarts.
//! Unsaved edits are tracked per level, each stamped with the revision of its latest edit.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::{DbError, DbResult};
use super::AnalysisSession;

/// A stored working copy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: i64,
    pub menu_id: i64,
    pub menu_name: Option<String>,
    pub session: AnalysisSession,
    /// Bumped by every load and every stored edit
    pub revision: i64,
    /// Level id -> revision of its latest unsaved edit
    pub dirty_levels: BTreeMap<i64, i64>,
    pub loaded_at: String,
    pub updated_at: String,
}

/// Lightweight listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSessionSummary {
    pub menu_id: i64,
    pub menu_name: Option<String>,
    /// Levels with edits not yet saved to the server
    pub dirty_levels: Vec<i64>,
    pub updated_at: String,
}

fn json_column<T: DeserializeOwned>(row: &Row, column: &str) -> rusqlite::Result<T> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Current revision and dirty map of a menu's working copy
fn dirty_state(conn: &Connection, menu_id: i64) -> DbResult<Option<(i64, BTreeMap<i64, i64>)>> {
    let state: Option<(i64, BTreeMap<i64, i64>)> = conn
        .query_row(
            "SELECT revision, dirty_levels FROM analysis_sessions WHERE menu_id = ?1",
            [menu_id],
            |row| Ok((row.get("revision")?, json_column(row, "dirty_levels")?)),
        )
        .optional()?;
    Ok(state)
}

impl StoredSession {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            menu_id: row.get("menu_id")?,
            menu_name: row.get("menu_name")?,
            session: json_column(row, "payload")?,
            revision: row.get("revision")?,
            dirty_levels: json_column(row, "dirty_levels")?,
            loaded_at: row.get("loaded_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty_levels.is_empty()
    }

    pub fn is_level_dirty(&self, level_id: i64) -> bool {
        self.dirty_levels.contains_key(&level_id)
    }

    /// Replace the working copy with a freshly loaded analysis (no level left dirty).
    /// The revision keeps counting so saves started before the reload cannot match later edits.
    pub fn replace_loaded(conn: &Connection, session: &AnalysisSession) -> DbResult<Self> {
        let payload = serde_json::to_string(session)?;
        conn.execute(
            r#"
            INSERT INTO analysis_sessions (menu_id, menu_name, payload, revision, dirty_levels)
            VALUES (?1, ?2, ?3, 1, '{}')
            ON CONFLICT(menu_id) DO UPDATE SET
                menu_name = excluded.menu_name,
                payload = excluded.payload,
                revision = analysis_sessions.revision + 1,
                dirty_levels = '{}',
                loaded_at = datetime('now'),
                updated_at = datetime('now')
            "#,
            params![session.menu_id, session.menu_name, payload],
        )?;

        Self::get_by_menu(conn, session.menu_id)?
            .ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Store an edit of one level and mark that level dirty.
    /// Returns false if no working copy exists for the menu.
    pub fn store_level_edit(
        conn: &Connection,
        session: &AnalysisSession,
        level_id: i64,
    ) -> DbResult<bool> {
        let Some((revision, mut dirty_levels)) = dirty_state(conn, session.menu_id)? else {
            return Ok(false);
        };
        let revision = revision + 1;
        dirty_levels.insert(level_id, revision);

        let payload = serde_json::to_string(session)?;
        let dirty = serde_json::to_string(&dirty_levels)?;
        conn.execute(
            r#"
            UPDATE analysis_sessions
            SET payload = ?1, revision = ?2, dirty_levels = ?3, updated_at = datetime('now')
            WHERE menu_id = ?4
            "#,
            params![payload, revision, dirty, session.menu_id],
        )?;
        Ok(true)
    }

    /// Clear a level's dirty mark after a save of the copy taken at `saved_revision`.
    /// A level edited after that snapshot stays dirty. Returns true if the mark was cleared.
    pub fn mark_level_saved(
        conn: &Connection,
        menu_id: i64,
        level_id: i64,
        saved_revision: i64,
    ) -> DbResult<bool> {
        let Some((_, mut dirty_levels)) = dirty_state(conn, menu_id)? else {
            return Ok(false);
        };
        match dirty_levels.get(&level_id) {
            Some(&edited) if edited <= saved_revision => {
                dirty_levels.remove(&level_id);
            }
            _ => return Ok(false),
        }

        conn.execute(
            "UPDATE analysis_sessions SET dirty_levels = ?1 WHERE menu_id = ?2",
            params![serde_json::to_string(&dirty_levels)?, menu_id],
        )?;
        Ok(true)
    }

    pub fn get_by_menu(conn: &Connection, menu_id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM analysis_sessions WHERE menu_id = ?1")?;

        let result = stmt.query_row([menu_id], Self::from_row);
        match result {
            Ok(stored) => Ok(Some(stored)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<StoredSessionSummary>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT menu_id, menu_name, dirty_levels, updated_at
            FROM analysis_sessions
            ORDER BY updated_at DESC, menu_id
            "#,
        )?;
        let sessions = stmt
            .query_map([], |row| {
                let dirty_levels: BTreeMap<i64, i64> = json_column(row, "dirty_levels")?;
                Ok(StoredSessionSummary {
                    menu_id: row.get("menu_id")?,
                    menu_name: row.get("menu_name")?,
                    dirty_levels: dirty_levels.into_keys().collect(),
                    updated_at: row.get("updated_at")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    /// Discard a working copy
    pub fn delete(conn: &Connection, menu_id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM analysis_sessions WHERE menu_id = ?1", [menu_id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::{IngredientRow, Level, NutrientVector};

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn level(id: i64, row_id: i64) -> Level {
        let mut level = Level::new(
            id,
            format!("Nivel {}", id),
            Some(NutrientVector {
                calories: 300.0,
                ..Default::default()
            }),
        );
        level.rows.push(IngredientRow::new(
            row_id,
            1,
            "Avena",
            30.0,
            100.0,
            NutrientVector {
                calories: 380.0,
                iron: 4.0,
                ..Default::default()
            },
        ));
        level
    }

    fn session() -> AnalysisSession {
        AnalysisSession::new(5, Some("Semana 1".to_string()), vec![level(3, 7), level(4, 8)])
    }

    #[test]
    fn test_replace_then_edit_marks_level_dirty() {
        let conn = conn();
        let mut s = session();
        let stored = StoredSession::replace_loaded(&conn, &s).unwrap();
        assert!(!stored.is_dirty());
        assert_eq!(stored.session, s);

        s.set_row_net_weight(3, 7, 60.0).unwrap();
        assert!(StoredSession::store_level_edit(&conn, &s, 3).unwrap());
        let stored = StoredSession::get_by_menu(&conn, 5).unwrap().unwrap();
        assert!(stored.is_level_dirty(3));
        assert!(!stored.is_level_dirty(4));
        assert_eq!(stored.session.level(3).unwrap().rows[0].net_weight, 60.0);

        assert!(StoredSession::mark_level_saved(&conn, 5, 3, stored.revision).unwrap());
        assert!(!StoredSession::get_by_menu(&conn, 5).unwrap().unwrap().is_dirty());
    }

    #[test]
    fn test_saving_one_level_keeps_other_levels_dirty() {
        let conn = conn();
        let mut s = session();
        StoredSession::replace_loaded(&conn, &s).unwrap();

        s.set_row_net_weight(3, 7, 60.0).unwrap();
        StoredSession::store_level_edit(&conn, &s, 3).unwrap();
        s.set_row_net_weight(4, 8, 10.0).unwrap();
        StoredSession::store_level_edit(&conn, &s, 4).unwrap();

        let revision = StoredSession::get_by_menu(&conn, 5).unwrap().unwrap().revision;
        StoredSession::mark_level_saved(&conn, 5, 3, revision).unwrap();

        let stored = StoredSession::get_by_menu(&conn, 5).unwrap().unwrap();
        assert!(!stored.is_level_dirty(3));
        assert!(stored.is_level_dirty(4));
        assert_eq!(StoredSession::list(&conn).unwrap()[0].dirty_levels, vec![4]);
    }

    #[test]
    fn test_edit_after_save_snapshot_stays_dirty() {
        let conn = conn();
        let mut s = session();
        StoredSession::replace_loaded(&conn, &s).unwrap();
        s.set_row_net_weight(3, 7, 60.0).unwrap();
        StoredSession::store_level_edit(&conn, &s, 3).unwrap();

        // Save starts from this snapshot, then another edit of the same level lands
        let snapshot = StoredSession::get_by_menu(&conn, 5).unwrap().unwrap().revision;
        s.set_row_net_weight(3, 7, 45.0).unwrap();
        StoredSession::store_level_edit(&conn, &s, 3).unwrap();

        assert!(!StoredSession::mark_level_saved(&conn, 5, 3, snapshot).unwrap());
        assert!(StoredSession::get_by_menu(&conn, 5).unwrap().unwrap().is_level_dirty(3));
    }

    #[test]
    fn test_reload_advances_revision_and_clears_dirty() {
        let conn = conn();
        let mut s = session();
        let first = StoredSession::replace_loaded(&conn, &s).unwrap();
        s.set_row_net_weight(3, 7, 60.0).unwrap();
        StoredSession::store_level_edit(&conn, &s, 3).unwrap();

        let reloaded = StoredSession::replace_loaded(&conn, &session()).unwrap();
        assert!(!reloaded.is_dirty());
        assert!(reloaded.revision > first.revision + 1);
    }

    #[test]
    fn test_store_edit_without_working_copy() {
        let conn = conn();
        assert!(!StoredSession::store_level_edit(&conn, &session(), 3).unwrap());
        assert!(!StoredSession::mark_level_saved(&conn, 5, 3, 10).unwrap());
    }

    #[test]
    fn test_list_and_delete() {
        let conn = conn();
        StoredSession::replace_loaded(&conn, &session()).unwrap();
        let list = StoredSession::list(&conn).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].menu_name.as_deref(), Some("Semana 1"));
        assert!(list[0].dirty_levels.is_empty());
        assert!(StoredSession::delete(&conn, 5).unwrap());
        assert!(StoredSession::get_by_menu(&conn, 5).unwrap().is_none());
    }
}
