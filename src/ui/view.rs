//! Pure projection of the record collection into a list view model.
//!
//! No ratatui types here: the projection is plain data so ordering, counts
//! and status derivation are testable without a terminal.

use chrono::NaiveDate;

use crate::model::{classify, DocumentRecord, Status};

/// One rendered list row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
  pub id: String,
  pub person: String,
  pub doc_type: String,
  /// Expiry in the display format the household reads (dd/mm/yyyy)
  pub expiry_display: String,
  pub status: Status,
  /// Negative once expired
  pub days_left: i64,
  pub notes: String,
}

/// The whole list view: rows sorted by expiry, count line, empty flag.
#[derive(Debug, Clone)]
pub struct ListViewModel {
  pub rows: Vec<DocumentRow>,
  pub count_label: String,
  pub is_empty: bool,
}

/// Project records into the list view model.
///
/// Rows are sorted ascending by expiry date; ties keep insertion order.
pub fn project(records: &[DocumentRecord], today: NaiveDate) -> ListViewModel {
  let mut sorted: Vec<&DocumentRecord> = records.iter().collect();
  sorted.sort_by_key(|r| r.expiry_date);

  let rows = sorted
    .into_iter()
    .map(|r| DocumentRow {
      id: r.id.clone(),
      person: r.person.clone(),
      doc_type: r.doc_type.clone(),
      expiry_display: format_expiry(r.expiry_date),
      status: classify(r.expiry_date, today),
      days_left: (r.expiry_date - today).num_days(),
      notes: r.notes.clone(),
    })
    .collect::<Vec<_>>();

  ListViewModel {
    is_empty: rows.is_empty(),
    count_label: format!("{} elementi", rows.len()),
    rows,
  }
}

/// Display format for expiry dates.
pub fn format_expiry(date: NaiveDate) -> String {
  date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(id: &str, expiry: NaiveDate) -> DocumentRecord {
    DocumentRecord {
      id: id.to_string(),
      person: "Anna".to_string(),
      doc_type: "Passaporto".to_string(),
      expiry_date: expiry,
      notes: String::new(),
    }
  }

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn test_rows_sorted_by_expiry_ascending() {
    let records = vec![
      record("late", date(2030, 1, 1)),
      record("soon", date(2026, 4, 1)),
      record("mid", date(2027, 1, 1)),
    ];

    let vm = project(&records, date(2026, 3, 15));
    let ids: Vec<&str> = vm.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["soon", "mid", "late"]);
  }

  #[test]
  fn test_expiry_ties_keep_insertion_order() {
    let same_day = date(2027, 1, 1);
    let records = vec![
      record("first", same_day),
      record("second", same_day),
      record("third", same_day),
    ];

    let vm = project(&records, date(2026, 3, 15));
    let ids: Vec<&str> = vm.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);
  }

  #[test]
  fn test_count_label_and_empty_state() {
    let vm = project(&[], date(2026, 3, 15));
    assert!(vm.is_empty);
    assert_eq!(vm.count_label, "0 elementi");

    let vm = project(&[record("a", date(2027, 1, 1))], date(2026, 3, 15));
    assert!(!vm.is_empty);
    assert_eq!(vm.count_label, "1 elementi");
  }

  #[test]
  fn test_row_status_and_days_left() {
    let today = date(2026, 3, 15);
    let records = vec![
      record("gone", date(2026, 3, 10)),
      record("close", date(2026, 3, 20)),
      record("far", date(2030, 1, 1)),
    ];

    let vm = project(&records, today);
    assert_eq!(vm.rows[0].status, Status::Expired);
    assert_eq!(vm.rows[0].days_left, -5);
    assert_eq!(vm.rows[1].status, Status::Warning);
    assert_eq!(vm.rows[1].days_left, 5);
    assert_eq!(vm.rows[2].status, Status::Valid);
  }

  #[test]
  fn test_expiry_display_format() {
    assert_eq!(format_expiry(date(2027, 6, 1)), "01/06/2027");
  }
}
