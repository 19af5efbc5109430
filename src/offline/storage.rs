//! Asset cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// A cached shell asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
  /// Request path the asset was cached under (e.g. `./style.css`).
  pub path: String,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

/// Trait for asset cache backends.
///
/// Assets live inside named caches; purging a whole cache by name is the
/// only bulk operation, matching the version-bump invalidation model.
pub trait AssetStorage: Send + Sync {
  /// Get an asset from a named cache.
  fn get(&self, cache: &str, path: &str) -> Result<Option<CachedAsset>>;

  /// Store an asset into a named cache, replacing any previous entry.
  fn put(&self, cache: &str, asset: &CachedAsset) -> Result<()>;

  /// All cache names currently holding at least one asset.
  fn cache_names(&self) -> Result<Vec<String>>;

  /// Drop a named cache and everything in it.
  fn delete_cache(&self, cache: &str) -> Result<()>;
}

/// In-memory asset storage for tests.
#[derive(Default)]
pub struct MemoryAssetStorage {
  assets: Mutex<HashMap<(String, String), CachedAsset>>,
}

impl MemoryAssetStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl AssetStorage for MemoryAssetStorage {
  fn get(&self, cache: &str, path: &str) -> Result<Option<CachedAsset>> {
    let assets = self
      .assets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(assets.get(&(cache.to_string(), path.to_string())).cloned())
  }

  fn put(&self, cache: &str, asset: &CachedAsset) -> Result<()> {
    let mut assets = self
      .assets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    assets.insert((cache.to_string(), asset.path.clone()), asset.clone());
    Ok(())
  }

  fn cache_names(&self) -> Result<Vec<String>> {
    let assets = self
      .assets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut names: Vec<String> = assets.keys().map(|(cache, _)| cache.clone()).collect();
    names.sort();
    names.dedup();
    Ok(names)
  }

  fn delete_cache(&self, cache: &str) -> Result<()> {
    let mut assets = self
      .assets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    assets.retain(|(name, _), _| name != cache);
    Ok(())
  }
}

/// SQLite-based asset cache storage.
pub struct SqliteAssetStorage {
  conn: Mutex<Connection>,
}

/// Schema for the asset cache table.
const ASSET_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS asset_cache (
    cache_name TEXT NOT NULL,
    path TEXT NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, path)
);

CREATE INDEX IF NOT EXISTS idx_asset_cache_name ON asset_cache(cache_name);
"#;

impl SqliteAssetStorage {
  /// Open or create the asset cache at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open or create the asset cache at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open asset cache at {}: {}", path.display(), e))?;

    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("scadenze").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(ASSET_SCHEMA)
      .map_err(|e| eyre!("Failed to run asset cache migrations: {}", e))?;

    Ok(())
  }

  /// When the asset was cached, if present.
  #[allow(dead_code)]
  pub fn cached_at(&self, cache: &str, path: &str) -> Result<Option<DateTime<Utc>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let raw: Option<String> = conn
      .query_row(
        "SELECT cached_at FROM asset_cache WHERE cache_name = ? AND path = ?",
        params![cache, path],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cached_at: {}", e))?;

    raw
      .map(|s| {
        chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S")
          .map(|dt| dt.and_utc())
          .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
      })
      .transpose()
  }
}

impl AssetStorage for SqliteAssetStorage {
  fn get(&self, cache: &str, path: &str) -> Result<Option<CachedAsset>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let asset = conn
      .query_row(
        "SELECT path, content_type, body FROM asset_cache
         WHERE cache_name = ? AND path = ?",
        params![cache, path],
        |row| {
          Ok(CachedAsset {
            path: row.get(0)?,
            content_type: row.get(1)?,
            body: row.get(2)?,
          })
        },
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cached asset {}: {}", path, e))?;

    Ok(asset)
  }

  fn put(&self, cache: &str, asset: &CachedAsset) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO asset_cache (cache_name, path, content_type, body, cached_at)
         VALUES (?, ?, ?, ?, datetime('now'))",
        params![cache, asset.path, asset.content_type, asset.body],
      )
      .map_err(|e| eyre!("Failed to store asset {}: {}", asset.path, e))?;

    Ok(())
  }

  fn cache_names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT DISTINCT cache_name FROM asset_cache ORDER BY cache_name")
      .map_err(|e| eyre!("Failed to prepare cache name query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list cache names: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }

  fn delete_cache(&self, cache: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM asset_cache WHERE cache_name = ?",
        params![cache],
      )
      .map_err(|e| eyre!("Failed to delete cache {}: {}", cache, e))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn asset(path: &str, body: &str) -> CachedAsset {
    CachedAsset {
      path: path.to_string(),
      content_type: Some("text/plain".to_string()),
      body: body.as_bytes().to_vec(),
    }
  }

  #[test]
  fn test_sqlite_put_get_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteAssetStorage::open_at(&dir.path().join("cache.db")).unwrap();

    assert_eq!(storage.get("v1", "./style.css").unwrap(), None);

    storage.put("v1", &asset("./style.css", "body{}")).unwrap();
    let got = storage.get("v1", "./style.css").unwrap().unwrap();
    assert_eq!(got.body, b"body{}");
    assert_eq!(got.content_type.as_deref(), Some("text/plain"));
  }

  #[test]
  fn test_sqlite_caches_are_isolated_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteAssetStorage::open_at(&dir.path().join("cache.db")).unwrap();

    storage.put("v1", &asset("./app.js", "old")).unwrap();
    storage.put("v2", &asset("./app.js", "new")).unwrap();

    assert_eq!(storage.cache_names().unwrap(), vec!["v1", "v2"]);

    storage.delete_cache("v1").unwrap();
    assert_eq!(storage.get("v1", "./app.js").unwrap(), None);
    assert_eq!(storage.get("v2", "./app.js").unwrap().unwrap().body, b"new");
  }
}
