//! Status Tool
//!
//! Runtime status and usage instructions for the menu adequacy service.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Usage instructions for AI assistants driving the analysis tools
pub const ANALYSIS_INSTRUCTIONS: &str = r#"
# Menu Adequacy Instructions

Each menu is analysed per school level. A level holds ingredient rows (net weight, edible
portion %, nutrients per 100 g) and a requirement vector. Totals and adequacy percentages are
always derived from the rows.

## Workflow

1. `load_menu_analysis` with the menu id. This fetches the analysis from the ERP server and
   stores a local working copy. Loading again discards local edits.
2. `get_level_analysis` to see rows grouped by preparation, totals and adequacy.
3. Edit:
   - `set_ingredient_weight` changes one row's net weight (negative values become 0).
   - `rescale_to_adequacy` sets a desired adequacy % for one nutrient. Every ingredient carrying
     that nutrient (more than 0.1 per 100 g) is scaled by the same factor; other ingredients keep
     their weight. Other nutrients move with the rescaled ingredients.
   - `remove_ingredient` drops a row after the ingredient was deleted from the preparation.
4. `save_level_analysis` posts the level to the server. A failed save is reported, not retried.

## Nutrients

calorias, proteinas, grasas, carbohidratos, calcio, hierro, sodio
(English names calories, protein, fat, carbohydrate, calcium, iron, sodium also work)

## Classification

| adequacy        | class      |
|-----------------|------------|
| 0 to 35 %       | optimal    |
| above 35 to 70% | acceptable |
| above 70 %      | high       |

Percentages are clamped to 0-100. A level without requirements reports 0 % and cannot be
rescaled.
"#;

/// Runtime status of the service
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    pub server_base_url: String,
    pub database_path: String,
    pub database_size_bytes: Option<u64>,

    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
    server_base_url: String,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, server_base_url: String) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
            server_base_url,
        }
    }

    pub fn get_status(&self) -> ServiceStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        ServiceStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            server_base_url: self.server_base_url.clone(),
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_for_missing_database() {
        let tracker = StatusTracker::new(
            PathBuf::from("/nonexistent/menu_adequacy.db"),
            "http://x".to_string(),
        );
        let status = tracker.get_status();
        assert!(status.database_size_bytes.is_none());
        assert_eq!(status.process_id, std::process::id());
        assert_eq!(status.server_base_url, "http://x");
    }
}
