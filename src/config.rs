//! Runtime configuration
//!
//! Everything is read from `MENU_ADEQUACY_*` environment variables with working defaults.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_ANALYSIS_PATH: &str = "/nutricion/api/menus/{menu_id}/analisis-nutricional/";
pub const DEFAULT_SAVE_PATH: &str = "/nutricion/api/menus/{menu_id}/guardar-analisis-nivel/";
pub const DEFAULT_CSRF_PAGE_PATH: &str = "/nutricion/";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Connection settings for the menu analysis endpoints
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Django `sessionid` cookie of an authenticated user
    pub session_id: Option<String>,
    /// Pre-acquired CSRF token; otherwise it is read from the cookie jar or a form page
    pub csrf_token: Option<String>,
    pub timeout: Duration,
    /// Path templates; `{menu_id}` is substituted
    pub analysis_path: String,
    pub save_path: String,
    /// Page fetched to obtain a CSRF cookie or form field
    pub csrf_page_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_id: None,
            csrf_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            analysis_path: DEFAULT_ANALYSIS_PATH.to_string(),
            save_path: DEFAULT_SAVE_PATH.to_string(),
            csrf_page_path: DEFAULT_CSRF_PAGE_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client: ClientConfig,
    pub database_path: PathBuf,
    /// Quiet period before a burst of adequacy edits is applied
    pub debounce: Duration,
    /// Save a level right after a successful rescale
    pub autosave: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = ClientConfig::default();

        let timeout_secs = get("MENU_ADEQUACY_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let debounce_ms = get("MENU_ADEQUACY_DEBOUNCE_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_DEBOUNCE_MS);
        let autosave = get("MENU_ADEQUACY_AUTOSAVE")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);

        Self {
            client: ClientConfig {
                base_url: get("MENU_ADEQUACY_BASE_URL").unwrap_or(defaults.base_url),
                session_id: get("MENU_ADEQUACY_SESSION_ID"),
                csrf_token: get("MENU_ADEQUACY_CSRF_TOKEN"),
                timeout: Duration::from_secs(timeout_secs),
                analysis_path: get("MENU_ADEQUACY_ANALYSIS_PATH").unwrap_or(defaults.analysis_path),
                save_path: get("MENU_ADEQUACY_SAVE_PATH").unwrap_or(defaults.save_path),
                csrf_page_path: get("MENU_ADEQUACY_CSRF_PAGE_PATH")
                    .unwrap_or(defaults.csrf_page_path),
            },
            database_path: get("MENU_ADEQUACY_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(default_database_path),
            debounce: Duration::from_millis(debounce_ms),
            autosave,
        }
    }
}

/// `<project>/data/menu_adequacy.db`, resolved from the executable location
pub fn default_database_path() -> PathBuf {
    let mut path = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // Go up from target/release or target/debug to project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(grandparent) = path.parent().and_then(|p| p.parent()) {
            path = grandparent.to_path_buf();
        }
    }

    path.push("data");
    path.push("menu_adequacy.db");
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.debounce, Duration::from_millis(DEFAULT_DEBOUNCE_MS));
        assert!(!config.autosave);
        assert!(config.database_path.ends_with("data/menu_adequacy.db"));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("MENU_ADEQUACY_BASE_URL", "https://erp.example.org"),
            ("MENU_ADEQUACY_SESSION_ID", "abc123"),
            ("MENU_ADEQUACY_TIMEOUT_SECS", "5"),
            ("MENU_ADEQUACY_DEBOUNCE_MS", "50"),
            ("MENU_ADEQUACY_AUTOSAVE", "true"),
            ("MENU_ADEQUACY_DATABASE_PATH", "/tmp/x.db"),
        ]);
        assert_eq!(config.client.base_url, "https://erp.example.org");
        assert_eq!(config.client.session_id.as_deref(), Some("abc123"));
        assert_eq!(config.client.timeout, Duration::from_secs(5));
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert!(config.autosave);
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn test_blank_and_invalid_values_fall_back() {
        let config = config_from(&[
            ("MENU_ADEQUACY_SESSION_ID", "  "),
            ("MENU_ADEQUACY_TIMEOUT_SECS", "soon"),
        ]);
        assert!(config.client.session_id.is_none());
        assert_eq!(config.client.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
