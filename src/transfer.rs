//! JSON import and export of the record collection.
//!
//! Export is a faithful pretty-printed dump of the store. Import accepts
//! arbitrary JSON and is deliberately lenient: the top level must be an
//! array, every entry that carries a usable `person`, `docType` and
//! `expiryDate` survives (fields coerced to strings, ids generated when
//! missing), and everything else is silently dropped.

use chrono::NaiveDate;
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::model::{generate_id, DocumentRecord};

/// Parse import text into records.
///
/// Fails with an "invalid file" error when the text is not JSON or the top
/// level is not an array. Entries missing required fields are dropped
/// without a report.
pub fn parse_import(raw: &str) -> Result<Vec<DocumentRecord>> {
  let value: Value =
    serde_json::from_str(raw).map_err(|e| eyre!("invalid file: not JSON ({})", e))?;

  let Value::Array(entries) = value else {
    return Err(eyre!("invalid file: expected a top-level array"));
  };

  Ok(entries.iter().filter_map(entry_to_record).collect())
}

/// Read and parse an import file.
pub fn import_file(path: &Path) -> Result<Vec<DocumentRecord>> {
  let raw = std::fs::read_to_string(path)
    .map_err(|e| eyre!("invalid file: cannot read {}: {}", path.display(), e))?;
  parse_import(&raw)
}

/// Export filename for a given day, e.g. `scadenze-famiglia-2026-08-07.json`.
pub fn export_filename(today: NaiveDate) -> String {
  format!("scadenze-famiglia-{}.json", today.format("%Y-%m-%d"))
}

/// Write the full collection, pretty-printed, into `dir`.
///
/// Returns the path of the written file.
pub fn write_export(records: &[DocumentRecord], dir: &Path, today: NaiveDate) -> Result<PathBuf> {
  let json = serde_json::to_string_pretty(records)
    .map_err(|e| eyre!("Failed to serialize records: {}", e))?;

  let path = dir.join(export_filename(today));
  std::fs::write(&path, json)
    .map_err(|e| eyre!("Failed to write export {}: {}", path.display(), e))?;

  Ok(path)
}

fn entry_to_record(entry: &Value) -> Option<DocumentRecord> {
  let person = coerce_string(&entry["person"])?;
  let doc_type = coerce_string(&entry["docType"])?;
  let expiry_raw = coerce_string(&entry["expiryDate"])?;
  let expiry_date = NaiveDate::parse_from_str(&expiry_raw, "%Y-%m-%d").ok()?;

  let id = coerce_string(&entry["id"]).unwrap_or_else(generate_id);
  let notes = coerce_string(&entry["notes"]).unwrap_or_default();

  Some(DocumentRecord {
    id,
    person,
    doc_type,
    expiry_date,
    notes,
  })
}

/// Coerce a JSON value to a non-empty string, treating falsy values
/// (null, empty string, 0, false) as absent.
fn coerce_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) if !s.is_empty() => Some(s.clone()),
    Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
    Value::Bool(true) => Some("true".to_string()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_import_minimal_entry_generates_id_and_notes() {
    let records =
      parse_import(r#"[{"person":"A","docType":"ID","expiryDate":"2030-01-01"}]"#).unwrap();

    assert_eq!(records.len(), 1);
    assert!(!records[0].id.is_empty());
    assert_eq!(records[0].person, "A");
    assert_eq!(records[0].doc_type, "ID");
    assert_eq!(records[0].notes, "");
  }

  #[test]
  fn test_import_preserves_existing_id() {
    let records = parse_import(
      r#"[{"id":"keep-me","person":"A","docType":"ID","expiryDate":"2030-01-01"}]"#,
    )
    .unwrap();
    assert_eq!(records[0].id, "keep-me");
  }

  #[test]
  fn test_import_drops_entries_missing_required_fields() {
    let records = parse_import(r#"[{"person":"A"}]"#).unwrap();
    assert!(records.is_empty());

    let records = parse_import(
      r#"[
        {"person":"A","docType":"ID","expiryDate":"2030-01-01"},
        {"person":"","docType":"ID","expiryDate":"2030-01-01"},
        {"docType":"ID","expiryDate":"2030-01-01"},
        {"person":"B","docType":"ID","expiryDate":"soon"}
      ]"#,
    )
    .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].person, "A");
  }

  #[test]
  fn test_import_coerces_field_types() {
    let records =
      parse_import(r#"[{"person":42,"docType":true,"expiryDate":"2030-01-01"}]"#).unwrap();
    assert_eq!(records[0].person, "42");
    assert_eq!(records[0].doc_type, "true");
  }

  #[test]
  fn test_import_rejects_non_array() {
    assert!(parse_import("{}").is_err());
    assert!(parse_import("\"hi\"").is_err());
    assert!(parse_import("not json at all").is_err());
  }

  #[test]
  fn test_export_filename_carries_date() {
    let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
    assert_eq!(export_filename(today), "scadenze-famiglia-2026-08-07.json");
  }

  #[test]
  fn test_export_then_import_is_stable() {
    let records = vec![
      DocumentRecord {
        id: "a".to_string(),
        person: "Anna".to_string(),
        doc_type: "Passaporto".to_string(),
        expiry_date: NaiveDate::from_ymd_opt(2027, 6, 1).unwrap(),
        notes: "rinnovo in questura".to_string(),
      },
      DocumentRecord {
        id: "b".to_string(),
        person: "Marco".to_string(),
        doc_type: "Carta identità".to_string(),
        expiry_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        notes: String::new(),
      },
    ];

    let dir = tempfile::tempdir().unwrap();
    let today = NaiveDate::from_ymd_opt(2026, 8, 7).unwrap();
    let path = write_export(&records, dir.path(), today).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    // pretty-printed, not a single line
    assert!(raw.contains('\n'));

    let back = import_file(&path).unwrap();
    assert_eq!(back, records);
  }
}
