use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::persist::{read_json, write_json, PersistError};

const SETTINGS_VERSION: u32 = 1;

fn default_log_filter() -> String {
    "market_rpc=info".to_string()
}

/// Operator settings stored in the config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcSettings {
    pub version: u32,
    /// Where the market snapshot lives. `None` keeps markets in memory only.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Append one JSONL audit record per dispatched command.
    #[serde(default)]
    pub audit_enabled: bool,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            data_dir: None,
            audit_enabled: false,
            log_filter: default_log_filter(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to load settings from {path}: {source}")]
    Load { path: PathBuf, source: PersistError },
    #[error("Failed to save settings: {0}")]
    Save(#[from] PersistError),
}

/// Load settings from the config directory. A missing file yields defaults;
/// an unreadable one is an error rather than a silent reset.
pub fn load_settings(config_dir: &Path) -> Result<RpcSettings, SettingsError> {
    let path = crate::paths::settings_path(config_dir);
    if !path.exists() {
        return Ok(RpcSettings::default());
    }
    read_json::<RpcSettings>(&path).map_err(|source| SettingsError::Load { path, source })
}

pub fn save_settings(config_dir: &Path, settings: &RpcSettings) -> Result<(), SettingsError> {
    write_json(&crate::paths::settings_path(config_dir), settings)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_round_trip() {
        let dir = std::env::temp_dir().join("market_rpc_test_settings");
        let _ = std::fs::remove_dir_all(&dir);

        let settings = RpcSettings {
            data_dir: Some(PathBuf::from("/some/data/dir")),
            audit_enabled: true,
            ..RpcSettings::default()
        };
        save_settings(&dir, &settings).unwrap();
        assert_eq!(load_settings(&dir).unwrap(), settings);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_sparse_file_fills_defaults() {
        let dir = std::env::temp_dir().join("market_rpc_test_settings_sparse");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(crate::paths::settings_path(&dir), r#"{ "version": 1 }"#).unwrap();

        let loaded = load_settings(&dir).unwrap();
        assert_eq!(loaded.log_filter, "market_rpc=info");
        assert!(!loaded.audit_enabled);
        assert_eq!(loaded.data_dir, None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_missing_returns_defaults() {
        let dir = std::env::temp_dir().join("market_rpc_test_no_settings");
        let _ = std::fs::remove_dir_all(&dir);
        assert_eq!(load_settings(&dir).unwrap(), RpcSettings::default());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = std::env::temp_dir().join("market_rpc_test_bad_settings");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(crate::paths::settings_path(&dir), "{ not json").unwrap();

        assert!(matches!(load_settings(&dir), Err(SettingsError::Load { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
