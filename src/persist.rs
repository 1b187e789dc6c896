//! JSON file helpers shared by settings and the market snapshot.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Per-file mutex map so concurrent writers to one path never share a `.tmp` file.
static FILE_LOCKS: LazyLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Write bytes to `path` via a fsynced `.tmp` sibling and a rename, so readers
/// only ever observe the old or the new contents.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<(), PersistError> {
    let lock = FILE_LOCKS
        .lock()
        .entry(path.to_path_buf())
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone();
    let _guard = lock.lock();

    let mut tmp_name = OsString::from(path.file_name().unwrap_or_default());
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(&tmp_name);

    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_json() {
        let dir = std::env::temp_dir().join("market_rpc_test_persist");
        let _ = fs::remove_dir_all(&dir);

        let path = dir.join("nested").join("value.json");
        write_json(&path, &serde_json::json!({ "a": [1, 2, 3] })).unwrap();
        let loaded: serde_json::Value = read_json(&path).unwrap();
        assert_eq!(loaded["a"][2], 3);
        assert!(!path.with_file_name("value.json.tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_read_missing_is_io_error() {
        let path = std::env::temp_dir().join("market_rpc_test_persist_missing.json");
        let _ = fs::remove_file(&path);
        let err = read_json::<serde_json::Value>(&path).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }
}
