//! JSONL audit trail for dispatched commands.
//!
//! Every dispatch is logged as one line in
//! `{config_dir}/audit-logs/YYYY-MM-DD.jsonl`. Best-effort: write failures are
//! reported through `tracing` and never fail the caller.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::RpcError;
use crate::registry::CommandOutput;

#[derive(Serialize)]
struct DispatchAuditEntry<'a> {
    ts: DateTime<Utc>,
    command: &'a str,
    params: &'a [Value],
    ok: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a RpcError>,
    duration_ms: u64,
}

/// Append one dispatch record to today's audit file.
pub fn log_dispatch(
    config_dir: &Path,
    command: &str,
    params: &[Value],
    result: Result<&CommandOutput, &RpcError>,
    duration: Duration,
) {
    let now = Utc::now();

    let (ok, message, error) = match result {
        Ok(output) => (true, output.message.clone(), None),
        Err(e) => (false, e.to_string(), Some(e)),
    };

    let entry = DispatchAuditEntry {
        ts: now,
        command,
        params,
        ok,
        message,
        error,
        duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
    };

    let path = crate::paths::audit_logs_dir(config_dir).join(audit_file_name(now));
    if let Err(e) = append_line(&path, &entry) {
        tracing::warn!(path = %path.display(), error = %e, "audit write failed");
    }
}

fn append_line(path: &Path, entry: &DispatchAuditEntry<'_>) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string(entry)?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{json}")
}

/// One file per UTC day: `YYYY-MM-DD.jsonl`.
fn audit_file_name(at: DateTime<Utc>) -> String {
    format!("{}.jsonl", at.format("%Y-%m-%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::registry::CommandResult;
    use chrono::TimeZone;

    #[test]
    fn test_audit_file_name_is_utc_day() {
        let at = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 59).unwrap();
        assert_eq!(audit_file_name(at), "2024-02-29.jsonl");
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        assert_eq!(audit_file_name(epoch), "1970-01-01.jsonl");
    }

    #[test]
    fn test_log_dispatch_appends_lines() {
        let dir = std::env::temp_dir().join("market_rpc_test_audit");
        let _ = fs::remove_dir_all(&dir);

        let params = vec![serde_json::json!(42), serde_json::json!("mymarket")];
        let output = CommandOutput::new("done", CommandResult::MarketList(Vec::new()));
        log_dispatch(&dir, "market_list", &params, Ok(&output), Duration::from_millis(3));
        let err = RpcError::missing("type");
        log_dispatch(&dir, "market_add", &params, Err(&err), Duration::from_millis(1));

        let logs: Vec<_> = fs::read_dir(crate::paths::audit_logs_dir(&dir))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(logs.len(), 1);
        let contents = fs::read_to_string(&logs[0]).unwrap();
        let lines: Vec<Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["ok"], true);
        assert_eq!(lines[0]["command"], "market_list");
        assert_eq!(lines[1]["ok"], false);
        assert_eq!(lines[1]["error"]["code"], "MissingParameter");
        assert_eq!(lines[1]["params"][1], "mymarket");
        assert!(lines[0]["ts"].is_string());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_log_dispatch_unwritable_dir_is_silent() {
        // A regular file where the config dir should be: create_dir_all fails.
        let file = std::env::temp_dir().join("market_rpc_test_audit_blocker");
        fs::write(&file, b"x").unwrap();
        let output = CommandOutput::new("done", CommandResult::MarketList(Vec::new()));
        log_dispatch(&file, "market_list", &[], Ok(&output), Duration::ZERO);
        let _ = fs::remove_file(&file);
    }
}
