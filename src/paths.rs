//! Centralized path definitions for settings, audit logs and the market snapshot.
//!
//! No other module should hard-code these names.

use std::path::{Path, PathBuf};

// ── Application identity ─────────────────────────────────────────

pub const APP_ID: &str = "market-rpc";

// ── Leaf filenames ───────────────────────────────────────────────

pub const SETTINGS_FILE: &str = "settings.json";
pub const MARKETS_FILE: &str = "markets.json";

// ── Directory names ──────────────────────────────────────────────

pub const AUDIT_LOGS_DIR: &str = "audit-logs";

// ── Config-dir functions (take config_dir) ───────────────────────

/// `$XDG_CONFIG_HOME/market-rpc`, falling back to `~/.config/market-rpc`,
/// then to a directory under the system temp dir.
pub fn default_config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(dir).join(APP_ID);
    }
    if let Some(home) = std::env::var_os("HOME").filter(|d| !d.is_empty()) {
        return PathBuf::from(home).join(".config").join(APP_ID);
    }
    std::env::temp_dir().join(APP_ID)
}

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_FILE)
}

pub fn audit_logs_dir(config_dir: &Path) -> PathBuf {
    config_dir.join(AUDIT_LOGS_DIR)
}

// ── Data-dir functions (take data_dir) ───────────────────────────

pub fn markets_path(data_dir: &Path) -> PathBuf {
    data_dir.join(MARKETS_FILE)
}
