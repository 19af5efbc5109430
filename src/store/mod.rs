//! Record store: in-memory collection with local persistence and an
//! optional remote mirror.
//!
//! The store owns the ordered record collection for the session. Every
//! mutation is written back to local storage; mutations that originate
//! locally are additionally pushed to the remote mirror when one is
//! configured. Replacements arriving *from* the mirror are persisted
//! locally only, so remote updates never echo back out.

mod kv;

pub use kv::{KvStorage, MemoryKv, SqliteKv};

use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::warn;

use crate::model::DocumentRecord;
use crate::sync::RemoteMirror;

/// Storage key for the serialized record array.
pub const STORAGE_KEY: &str = "family-documents-v1";

/// Storage key for the reminder gate timestamp.
pub const ALERT_KEY: &str = "family-documents-last-monthly-check";

/// The session's document collection.
///
/// Concurrent edits between this process and the remote mirror resolve as
/// last-write-wins; there is no merge or conflict detection.
pub struct DocumentStore<S: KvStorage> {
  storage: Arc<S>,
  mirror: Option<Arc<dyn RemoteMirror>>,
  records: Vec<DocumentRecord>,
}

impl<S: KvStorage> DocumentStore<S> {
  /// Load the store from local storage.
  ///
  /// A missing or malformed persisted value loads as the empty collection.
  pub fn load(storage: Arc<S>) -> Result<Self> {
    let records = match storage.get(STORAGE_KEY)? {
      Some(raw) => match serde_json::from_str(&raw) {
        Ok(records) => records,
        Err(e) => {
          warn!("discarding malformed persisted records: {}", e);
          Vec::new()
        }
      },
      None => Vec::new(),
    };

    Ok(Self {
      storage,
      mirror: None,
      records,
    })
  }

  /// Attach a remote mirror that receives every local mutation.
  pub fn with_mirror(mut self, mirror: Arc<dyn RemoteMirror>) -> Self {
    self.mirror = Some(mirror);
    self
  }

  /// All records, in insertion order.
  pub fn records(&self) -> &[DocumentRecord] {
    &self.records
  }

  /// Look up a record by id.
  pub fn get(&self, id: &str) -> Option<&DocumentRecord> {
    self.records.iter().find(|r| r.id == id)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  /// Insert or replace a record by id.
  pub fn upsert(&mut self, record: DocumentRecord) -> Result<()> {
    match self.records.iter_mut().find(|r| r.id == record.id) {
      Some(existing) => *existing = record,
      None => self.records.push(record),
    }
    self.persist(true)
  }

  /// Remove a record by id. Removing an absent id is a no-op.
  pub fn delete(&mut self, id: &str) -> Result<()> {
    self.records.retain(|r| r.id != id);
    self.persist(true)
  }

  /// Replace the whole collection (import path).
  pub fn replace_all(&mut self, records: Vec<DocumentRecord>) -> Result<()> {
    self.records = records;
    self.persist(true)
  }

  /// Replace the whole collection from the remote mirror.
  ///
  /// Persists locally but does not push back to the mirror.
  pub fn apply_remote(&mut self, records: Vec<DocumentRecord>) -> Result<()> {
    self.records = records;
    self.persist(false)
  }

  fn persist(&self, push_mirror: bool) -> Result<()> {
    let raw = serde_json::to_string(&self.records)
      .map_err(|e| eyre!("Failed to serialize records: {}", e))?;
    self.storage.set(STORAGE_KEY, &raw)?;

    if push_mirror {
      if let Some(mirror) = &self.mirror {
        mirror.push(self.records.clone());
      }
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::NaiveDate;
  use std::sync::Mutex;

  fn record(id: &str, person: &str) -> DocumentRecord {
    DocumentRecord {
      id: id.to_string(),
      person: person.to_string(),
      doc_type: "Passaporto".to_string(),
      expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
      notes: String::new(),
    }
  }

  #[derive(Default)]
  struct RecordingMirror {
    pushes: Mutex<Vec<Vec<DocumentRecord>>>,
  }

  impl RemoteMirror for RecordingMirror {
    fn push(&self, records: Vec<DocumentRecord>) {
      self.pushes.lock().unwrap().push(records);
    }
  }

  fn empty_store() -> DocumentStore<MemoryKv> {
    DocumentStore::load(Arc::new(MemoryKv::new())).unwrap()
  }

  #[test]
  fn test_upsert_inserts_then_replaces() {
    let mut store = empty_store();

    store.upsert(record("a", "Anna")).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("a").unwrap().person, "Anna");

    store.upsert(record("a", "Marco")).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("a").unwrap().person, "Marco");
  }

  #[test]
  fn test_delete_is_idempotent() {
    let mut store = empty_store();
    store.upsert(record("a", "Anna")).unwrap();

    store.delete("missing").unwrap();
    assert_eq!(store.len(), 1);

    store.delete("a").unwrap();
    assert_eq!(store.len(), 0);

    store.delete("a").unwrap();
    assert_eq!(store.len(), 0);
  }

  #[test]
  fn test_replace_all() {
    let mut store = empty_store();
    store.upsert(record("a", "Anna")).unwrap();

    store
      .replace_all(vec![record("b", "Marco"), record("c", "Luca")])
      .unwrap();
    assert_eq!(store.len(), 2);
    assert!(store.get("a").is_none());
  }

  #[test]
  fn test_mutations_survive_reload() {
    let storage = Arc::new(MemoryKv::new());

    let mut store = DocumentStore::load(Arc::clone(&storage)).unwrap();
    store.upsert(record("a", "Anna")).unwrap();
    store.upsert(record("b", "Marco")).unwrap();
    store.delete("a").unwrap();

    let reloaded = DocumentStore::load(storage).unwrap();
    assert_eq!(reloaded.len(), 1);
    assert_eq!(reloaded.get("b").unwrap().person, "Marco");
  }

  #[test]
  fn test_malformed_persisted_value_loads_empty() {
    let storage = Arc::new(MemoryKv::new());
    storage.set(STORAGE_KEY, "{not json").unwrap();

    let store = DocumentStore::load(storage).unwrap();
    assert!(store.is_empty());
  }

  #[test]
  fn test_local_mutations_push_to_mirror() {
    let mirror = Arc::new(RecordingMirror::default());
    let mut store = empty_store().with_mirror(Arc::clone(&mirror) as Arc<dyn RemoteMirror>);

    store.upsert(record("a", "Anna")).unwrap();
    store.delete("a").unwrap();

    assert_eq!(mirror.pushes.lock().unwrap().len(), 2);
  }

  #[test]
  fn test_remote_apply_does_not_echo() {
    let mirror = Arc::new(RecordingMirror::default());
    let storage = Arc::new(MemoryKv::new());
    let mut store = DocumentStore::load(Arc::clone(&storage))
      .unwrap()
      .with_mirror(Arc::clone(&mirror) as Arc<dyn RemoteMirror>);

    store.apply_remote(vec![record("a", "Anna")]).unwrap();

    assert!(mirror.pushes.lock().unwrap().is_empty());
    // but the remote snapshot was persisted locally
    let reloaded = DocumentStore::load(storage).unwrap();
    assert_eq!(reloaded.len(), 1);
  }
}
