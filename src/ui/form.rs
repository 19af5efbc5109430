//! The add/edit form: four fields, focus cycling, submit validation.

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::{generate_id, DocumentRecord};

/// Form fields in focus-cycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
  Person,
  DocType,
  ExpiryDate,
  Notes,
}

impl FormField {
  pub const ALL: [FormField; 4] = [
    FormField::Person,
    FormField::DocType,
    FormField::ExpiryDate,
    FormField::Notes,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      FormField::Person => "Persona",
      FormField::DocType => "Documento",
      FormField::ExpiryDate => "Scadenza (AAAA-MM-GG)",
      FormField::Notes => "Note",
    }
  }
}

/// Result of handling a key in form mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormResult {
  /// Key handled, stay in the form
  Consumed,
  /// Enter on a valid form: here's the record to upsert
  Submitted(DocumentRecord),
  /// Escape pressed, form abandoned
  Cancelled,
}

/// Single-line editable field
#[derive(Debug, Clone, Default)]
struct FieldInput {
  buffer: String,
  cursor: usize,
}

impl FieldInput {
  fn with_value(value: &str) -> Self {
    Self {
      buffer: value.to_string(),
      cursor: value.len(),
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.move_left();
          self.buffer.remove(self.cursor);
        }
      }
      KeyCode::Delete => {
        if self.cursor < self.buffer.len() {
          self.buffer.remove(self.cursor);
        }
      }
      KeyCode::Left => self.move_left(),
      KeyCode::Right => self.move_right(),
      KeyCode::Home => self.cursor = 0,
      KeyCode::End => self.cursor = self.buffer.len(),
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.buffer = self.buffer[self.cursor..].to_string();
        self.cursor = 0;
      }
      KeyCode::Char(c) => {
        self.buffer.insert(self.cursor, c);
        self.cursor += c.len_utf8();
      }
      _ => {}
    }
  }

  // The cursor is a byte offset and must stay on a char boundary
  fn move_left(&mut self) {
    if let Some(c) = self.buffer[..self.cursor].chars().next_back() {
      self.cursor -= c.len_utf8();
    }
  }

  fn move_right(&mut self) {
    if let Some(c) = self.buffer[self.cursor..].chars().next() {
      self.cursor += c.len_utf8();
    }
  }
}

/// The add/edit document form
#[derive(Debug, Default)]
pub struct DocumentForm {
  editing_id: Option<String>,
  person: FieldInput,
  doc_type: FieldInput,
  expiry_date: FieldInput,
  notes: FieldInput,
  focus: usize,
  error: Option<String>,
}

impl DocumentForm {
  /// Empty form for a new record
  pub fn blank() -> Self {
    Self::default()
  }

  /// Form pre-filled from an existing record; submit keeps its id
  pub fn editing(record: &DocumentRecord) -> Self {
    Self {
      editing_id: Some(record.id.clone()),
      person: FieldInput::with_value(&record.person),
      doc_type: FieldInput::with_value(&record.doc_type),
      expiry_date: FieldInput::with_value(&record.expiry_date.format("%Y-%m-%d").to_string()),
      notes: FieldInput::with_value(&record.notes),
      focus: 0,
      error: None,
    }
  }

  pub fn is_editing(&self) -> bool {
    self.editing_id.is_some()
  }

  pub fn title(&self) -> &'static str {
    if self.is_editing() {
      "Modifica documento"
    } else {
      "Nuovo documento"
    }
  }

  pub fn focused(&self) -> FormField {
    FormField::ALL[self.focus]
  }

  pub fn value(&self, field: FormField) -> &str {
    &self.field(field).buffer
  }

  /// Cursor column in the focused field, for rendering
  pub fn cursor(&self) -> usize {
    let field = self.field(self.focused());
    field.buffer[..field.cursor].chars().count()
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> FormResult {
    match key.code {
      KeyCode::Esc => FormResult::Cancelled,
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % FormField::ALL.len();
        FormResult::Consumed
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = (self.focus + FormField::ALL.len() - 1) % FormField::ALL.len();
        FormResult::Consumed
      }
      KeyCode::Enter => match self.submit() {
        Some(record) => FormResult::Submitted(record),
        None => FormResult::Consumed,
      },
      _ => {
        self.field_mut(self.focused()).handle_key(key);
        self.error = None;
        FormResult::Consumed
      }
    }
  }

  fn submit(&mut self) -> Option<DocumentRecord> {
    let person = self.person.buffer.trim();
    let doc_type = self.doc_type.buffer.trim();
    let expiry_raw = self.expiry_date.buffer.trim();

    if person.is_empty() || doc_type.is_empty() || expiry_raw.is_empty() {
      self.error = Some("Compila persona, documento e scadenza".to_string());
      return None;
    }

    let expiry_date = match NaiveDate::parse_from_str(expiry_raw, "%Y-%m-%d") {
      Ok(date) => date,
      Err(_) => {
        self.error = Some("Data non valida, usa AAAA-MM-GG".to_string());
        return None;
      }
    };

    Some(DocumentRecord {
      id: self.editing_id.clone().unwrap_or_else(generate_id),
      person: person.to_string(),
      doc_type: doc_type.to_string(),
      expiry_date,
      notes: self.notes.buffer.trim().to_string(),
    })
  }

  fn field(&self, field: FormField) -> &FieldInput {
    match field {
      FormField::Person => &self.person,
      FormField::DocType => &self.doc_type,
      FormField::ExpiryDate => &self.expiry_date,
      FormField::Notes => &self.notes,
    }
  }

  fn field_mut(&mut self, field: FormField) -> &mut FieldInput {
    match field {
      FormField::Person => &mut self.person,
      FormField::DocType => &mut self.doc_type,
      FormField::ExpiryDate => &mut self.expiry_date,
      FormField::Notes => &mut self.notes,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn type_text(form: &mut DocumentForm, text: &str) {
    for c in text.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  fn fill_valid(form: &mut DocumentForm) {
    type_text(form, "Anna");
    form.handle_key(key(KeyCode::Tab));
    type_text(form, "Passaporto");
    form.handle_key(key(KeyCode::Tab));
    type_text(form, "2030-01-01");
  }

  #[test]
  fn test_submit_new_record_generates_id() {
    let mut form = DocumentForm::blank();
    fill_valid(&mut form);

    let result = form.handle_key(key(KeyCode::Enter));
    let FormResult::Submitted(record) = result else {
      panic!("expected submit, got {:?}", result);
    };
    assert!(!record.id.is_empty());
    assert_eq!(record.person, "Anna");
    assert_eq!(record.doc_type, "Passaporto");
    assert_eq!(record.notes, "");
  }

  #[test]
  fn test_editing_keeps_id() {
    let original = DocumentRecord {
      id: "keep-me".to_string(),
      person: "Anna".to_string(),
      doc_type: "Passaporto".to_string(),
      expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
      notes: String::new(),
    };

    let mut form = DocumentForm::editing(&original);
    assert!(form.is_editing());

    let result = form.handle_key(key(KeyCode::Enter));
    let FormResult::Submitted(record) = result else {
      panic!("expected submit");
    };
    assert_eq!(record.id, "keep-me");
  }

  #[test]
  fn test_missing_required_fields_blocks_submit() {
    let mut form = DocumentForm::blank();
    type_text(&mut form, "Anna");

    let result = form.handle_key(key(KeyCode::Enter));
    assert_eq!(result, FormResult::Consumed);
    assert!(form.error().is_some());
  }

  #[test]
  fn test_invalid_date_blocks_submit() {
    let mut form = DocumentForm::blank();
    type_text(&mut form, "Anna");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "Passaporto");
    form.handle_key(key(KeyCode::Tab));
    type_text(&mut form, "gennaio 2030");

    let result = form.handle_key(key(KeyCode::Enter));
    assert_eq!(result, FormResult::Consumed);
    assert!(form.error().unwrap().contains("Data non valida"));
  }

  #[test]
  fn test_error_clears_on_next_edit() {
    let mut form = DocumentForm::blank();
    form.handle_key(key(KeyCode::Enter));
    assert!(form.error().is_some());

    form.handle_key(key(KeyCode::Char('A')));
    assert!(form.error().is_none());
  }

  #[test]
  fn test_tab_cycles_focus() {
    let mut form = DocumentForm::blank();
    assert_eq!(form.focused(), FormField::Person);

    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.focused(), FormField::DocType);

    form.handle_key(key(KeyCode::BackTab));
    assert_eq!(form.focused(), FormField::Person);

    form.handle_key(key(KeyCode::BackTab));
    assert_eq!(form.focused(), FormField::Notes);
  }

  #[test]
  fn test_escape_cancels() {
    let mut form = DocumentForm::blank();
    assert_eq!(form.handle_key(key(KeyCode::Esc)), FormResult::Cancelled);
  }

  #[test]
  fn test_field_editing_with_cursor() {
    let mut form = DocumentForm::blank();
    type_text(&mut form, "Ana");
    form.handle_key(key(KeyCode::Left));
    form.handle_key(key(KeyCode::Char('n')));
    assert_eq!(form.value(FormField::Person), "Anna");
  }
}
