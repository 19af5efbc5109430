//! Monthly reminder gate for soon-to-expire documents.
//!
//! A coarse, best-effort nag: at most once every 30 days, surface the
//! records that are already expired or inside the warning window. The gate
//! may under- or over-fire near the boundary; it is not a scheduler.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use std::sync::Arc;
use tracing::warn;

use crate::model::{classify, DocumentRecord, Status};
use crate::store::{KvStorage, ALERT_KEY};

/// Minimum spacing between two reminder checks.
pub const REMINDER_INTERVAL_MS: i64 = 1000 * 60 * 60 * 24 * 30;

/// Upper bound on surfaced records per check.
pub const MAX_REMINDERS: usize = 5;

pub struct ReminderGate<S: KvStorage> {
  storage: Arc<S>,
}

impl<S: KvStorage> ReminderGate<S> {
  pub fn new(storage: Arc<S>) -> Self {
    Self { storage }
  }

  /// Run the gate once, at session start.
  ///
  /// When the last check is less than 30 days old this returns nothing and
  /// leaves the timestamp alone. Otherwise it re-stamps the timestamp and
  /// returns up to [`MAX_REMINDERS`] records that are expired or expiring,
  /// soonest first.
  pub fn check(&self, records: &[DocumentRecord], now: DateTime<Utc>) -> Result<Vec<DocumentRecord>> {
    let now_ms = now.timestamp_millis();

    if let Some(last_ms) = self.last_checked()? {
      if now_ms - last_ms < REMINDER_INTERVAL_MS {
        return Ok(Vec::new());
      }
    }

    self.storage.set(ALERT_KEY, &now_ms.to_string())?;

    let today = now.date_naive();
    let mut due: Vec<DocumentRecord> = records
      .iter()
      .filter(|r| classify(r.expiry_date, today).priority() < Status::Valid.priority())
      .cloned()
      .collect();
    due.sort_by_key(|r| r.expiry_date);
    due.truncate(MAX_REMINDERS);

    Ok(due)
  }

  fn last_checked(&self) -> Result<Option<i64>> {
    let Some(raw) = self.storage.get(ALERT_KEY)? else {
      return Ok(None);
    };

    match raw.parse() {
      Ok(ms) => Ok(Some(ms)),
      Err(_) => {
        warn!("discarding malformed reminder timestamp: {:?}", raw);
        Ok(None)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryKv;
  use chrono::{Duration, NaiveDate, TimeZone};

  fn record(id: &str, expiry: NaiveDate) -> DocumentRecord {
    DocumentRecord {
      id: id.to_string(),
      person: "Anna".to_string(),
      doc_type: "Passaporto".to_string(),
      expiry_date: expiry,
      notes: String::new(),
    }
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
  }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_first_check_fires_and_filters_valid() {
    let gate = ReminderGate::new(Arc::new(MemoryKv::new()));
    let records = vec![
      record("valid", date(2030, 1, 1)),
      record("expired", date(2026, 1, 1)),
      record("warning", date(2026, 5, 1)),
    ];

    let due = gate.check(&records, now()).unwrap();

    let ids: Vec<&str> = due.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["expired", "warning"]);
  }

  #[test]
  fn test_second_check_within_window_is_silent() {
    let gate = ReminderGate::new(Arc::new(MemoryKv::new()));
    let records = vec![record("expired", date(2026, 1, 1))];

    assert_eq!(gate.check(&records, now()).unwrap().len(), 1);

    let later = now() + Duration::days(29);
    assert!(gate.check(&records, later).unwrap().is_empty());
  }

  #[test]
  fn test_check_after_window_fires_again() {
    let gate = ReminderGate::new(Arc::new(MemoryKv::new()));
    let records = vec![record("expired", date(2026, 1, 1))];

    assert_eq!(gate.check(&records, now()).unwrap().len(), 1);

    let later = now() + Duration::days(31);
    assert_eq!(gate.check(&records, later).unwrap().len(), 1);
  }

  #[test]
  fn test_caps_at_five_soonest_first() {
    let gate = ReminderGate::new(Arc::new(MemoryKv::new()));
    let records: Vec<DocumentRecord> = (1..=7)
      .map(|d| record(&format!("r{}", d), date(2026, 4, d)))
      .collect();

    let due = gate.check(&records, now()).unwrap();

    assert_eq!(due.len(), MAX_REMINDERS);
    assert_eq!(due[0].id, "r1");
    assert_eq!(due[4].id, "r5");
  }

  #[test]
  fn test_empty_result_still_stamps() {
    let storage = Arc::new(MemoryKv::new());
    let gate = ReminderGate::new(Arc::clone(&storage));

    assert!(gate.check(&[], now()).unwrap().is_empty());
    assert!(storage.get(ALERT_KEY).unwrap().is_some());
  }

  #[test]
  fn test_malformed_timestamp_is_treated_as_never_checked() {
    let storage = Arc::new(MemoryKv::new());
    storage.set(ALERT_KEY, "not-a-number").unwrap();

    let gate = ReminderGate::new(storage);
    let records = vec![record("expired", date(2026, 1, 1))];
    assert_eq!(gate.check(&records, now()).unwrap().len(), 1);
  }
}
