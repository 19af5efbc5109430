//! Key-value persistence trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Trait for single-key string persistence backends.
///
/// Every operation is atomic at the key level: one string key holding one
/// serialized value, nothing transactional across keys.
pub trait KvStorage: Send + Sync {
  /// Read the value stored under `key`, if any.
  fn get(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// In-memory storage backend. Used in tests and when running with
/// persistence disabled; contents are lost on exit.
#[derive(Default)]
pub struct MemoryKv {
  entries: Mutex<std::collections::HashMap<String, String>>,
}

impl MemoryKv {
  pub fn new() -> Self {
    Self::default()
  }
}

impl KvStorage for MemoryKv {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(entries.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let mut entries = self
      .entries
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// SQLite-based key-value storage.
pub struct SqliteKv {
  conn: Mutex<Connection>,
}

/// Schema for the key-value table.
const KV_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteKv {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open or create the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create data directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("scadenze").join("scadenze.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(KV_SCHEMA)
      .map_err(|e| eyre!("Failed to run kv migrations: {}", e))?;

    Ok(())
  }
}

impl KvStorage for SqliteKv {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let value = conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read key {}: {}", key, e))?;

    Ok(value)
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write key {}: {}", key, e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_memory_kv_roundtrip() {
    let kv = MemoryKv::new();
    assert_eq!(kv.get("missing").unwrap(), None);

    kv.set("k", "v1").unwrap();
    assert_eq!(kv.get("k").unwrap().as_deref(), Some("v1"));

    kv.set("k", "v2").unwrap();
    assert_eq!(kv.get("k").unwrap().as_deref(), Some("v2"));
  }

  #[test]
  fn test_sqlite_kv_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kv.db");

    let kv = SqliteKv::open_at(&path).unwrap();
    kv.set("family-documents-v1", "[]").unwrap();
    assert_eq!(
      kv.get("family-documents-v1").unwrap().as_deref(),
      Some("[]")
    );

    // Reopen and confirm the value survived
    drop(kv);
    let kv = SqliteKv::open_at(&path).unwrap();
    assert_eq!(
      kv.get("family-documents-v1").unwrap().as_deref(),
      Some("[]")
    );
  }

  #[test]
  fn test_sqlite_kv_replaces_value() {
    let dir = tempfile::tempdir().unwrap();
    let kv = SqliteKv::open_at(&dir.path().join("kv.db")).unwrap();

    kv.set("k", "first").unwrap();
    kv.set("k", "second").unwrap();
    assert_eq!(kv.get("k").unwrap().as_deref(), Some("second"));
  }
}
