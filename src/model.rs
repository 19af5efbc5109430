//! Core record types and the expiry status classifier.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Warning window before expiry, as a fixed duration.
///
/// Six months approximated as 30-day months (180 days), deliberately not
/// calendar-month arithmetic: the window must classify the same dates the
/// same way on every machine that shares the data.
pub const WARNING_WINDOW_DAYS: u64 = 30 * 6;

/// A single tracked document: who owns it, what it is, when it expires.
///
/// Field names on the wire (`docType`, `expiryDate`) are kept stable so
/// exports remain interchangeable with previously saved data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
  /// Stable unique identity within the store.
  pub id: String,
  pub person: String,
  #[serde(rename = "docType")]
  pub doc_type: String,
  #[serde(rename = "expiryDate")]
  pub expiry_date: NaiveDate,
  #[serde(default)]
  pub notes: String,
}

impl DocumentRecord {
  /// Create a record with a freshly generated id.
  pub fn new(person: &str, doc_type: &str, expiry_date: NaiveDate, notes: &str) -> Self {
    Self {
      id: generate_id(),
      person: person.trim().to_string(),
      doc_type: doc_type.trim().to_string(),
      expiry_date,
      notes: notes.trim().to_string(),
    }
  }
}

/// Generate a unique record id.
pub fn generate_id() -> String {
  Uuid::new_v4().to_string()
}

/// Derived expiry classification. Never stored, always recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  /// Expiry date is in the past.
  Expired,
  /// Expires within the warning window.
  Warning,
  /// Expires beyond the warning window.
  Valid,
}

impl Status {
  /// Priority ordering used for reminder filtering: lower is more urgent.
  pub fn priority(&self) -> u8 {
    match self {
      Status::Expired => 0,
      Status::Warning => 1,
      Status::Valid => 2,
    }
  }

  /// Short display label for list rows.
  pub fn label(&self) -> &'static str {
    match self {
      Status::Expired => "SCADUTO",
      Status::Warning => "IN SCADENZA",
      Status::Valid => "VALIDO",
    }
  }
}

/// Classify an expiry date relative to `today`.
///
/// Dates carry no time-of-day component, so plain date comparison is
/// already midnight-normalized. Total over any pair of dates.
pub fn classify(expiry: NaiveDate, today: NaiveDate) -> Status {
  if expiry < today {
    return Status::Expired;
  }
  let window_end = today
    .checked_add_days(Days::new(WARNING_WINDOW_DAYS))
    .unwrap_or(NaiveDate::MAX);
  if expiry <= window_end {
    Status::Warning
  } else {
    Status::Valid
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_expired_before_today() {
    let today = date(2026, 3, 15);
    assert_eq!(classify(date(2026, 3, 14), today), Status::Expired);
    assert_eq!(classify(date(2020, 1, 1), today), Status::Expired);
  }

  #[test]
  fn test_today_is_warning_not_expired() {
    let today = date(2026, 3, 15);
    assert_eq!(classify(today, today), Status::Warning);
  }

  #[test]
  fn test_window_boundary_is_warning() {
    let today = date(2026, 3, 15);
    let boundary = today + chrono::Duration::days(180);
    assert_eq!(classify(boundary, today), Status::Warning);
  }

  #[test]
  fn test_past_window_is_valid() {
    let today = date(2026, 3, 15);
    let past_boundary = today + chrono::Duration::days(181);
    assert_eq!(classify(past_boundary, today), Status::Valid);
    assert_eq!(classify(date(2030, 1, 1), today), Status::Valid);
  }

  #[test]
  fn test_priority_ordering() {
    assert!(Status::Expired.priority() < Status::Warning.priority());
    assert!(Status::Warning.priority() < Status::Valid.priority());
  }

  #[test]
  fn test_record_serde_wire_names() {
    let record = DocumentRecord {
      id: "abc".to_string(),
      person: "Anna".to_string(),
      doc_type: "Passaporto".to_string(),
      expiry_date: date(2030, 1, 1),
      notes: String::new(),
    };

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["docType"], "Passaporto");
    assert_eq!(json["expiryDate"], "2030-01-01");

    let back: DocumentRecord = serde_json::from_value(json).unwrap();
    assert_eq!(back, record);
  }

  #[test]
  fn test_notes_default_when_missing() {
    let record: DocumentRecord = serde_json::from_str(
      r#"{"id":"x","person":"A","docType":"ID","expiryDate":"2030-01-01"}"#,
    )
    .unwrap();
    assert_eq!(record.notes, "");
  }

  #[test]
  fn test_new_generates_unique_ids() {
    let a = DocumentRecord::new("A", "ID", date(2030, 1, 1), "");
    let b = DocumentRecord::new("A", "ID", date(2030, 1, 1), "");
    assert_ne!(a.id, b.id);
  }
}
