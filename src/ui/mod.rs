mod form;
mod view;

pub use form::{DocumentForm, FormField, FormResult};
pub use view::{project, DocumentRow, ListViewModel};

use crate::app::{App, Mode};
use crate::commands;
use crate::model::Status;
use ratatui::layout::Position;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Document list
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  let vm = app.view_model();

  draw_header(frame, chunks[0], app.title(), &vm.count_label);
  draw_list(frame, chunks[1], &vm, app.selected());
  draw_status_bar(frame, chunks[2], app);

  match app.mode() {
    Mode::Form => draw_form(frame, app.form()),
    Mode::ConfirmDelete => {
      if let Some(label) = app.confirm_label() {
        draw_confirm(frame, &label);
      }
    }
    Mode::Reminder => draw_reminder(frame, &app.reminder_rows()),
    Mode::Command => draw_suggestions(frame, chunks[1], app),
    Mode::Normal => {}
  }
}

fn draw_header(frame: &mut Frame, area: Rect, title: &str, count_label: &str) {
  let line = Line::from(vec![
    Span::styled(
      format!(" {} ", title),
      Style::default().fg(Color::Black).bg(Color::Blue),
    ),
    Span::raw(" "),
    Span::styled(count_label.to_string(), Style::default().fg(Color::DarkGray)),
  ]);
  frame.render_widget(Paragraph::new(line), area);
}

fn draw_list(frame: &mut Frame, area: Rect, vm: &ListViewModel, selected: usize) {
  let block = Block::default()
    .title(" Documenti ")
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if vm.is_empty {
    let paragraph = Paragraph::new("Nessun documento. Premi 'a' per aggiungerne uno.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = vm
    .rows
    .iter()
    .map(|row| {
      let color = status_color(row.status);
      let line = Line::from(vec![
        Span::styled(
          format!("{:<16}", truncate(&row.person, 16)),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::raw(format!("{:<20}", truncate(&row.doc_type, 20))),
        Span::raw(" "),
        Span::styled(format!("{:<10}", row.expiry_display), Style::default().fg(color)),
        Span::raw(" "),
        Span::styled(format!("{:<12}", row.status.label()), Style::default().fg(color)),
        Span::raw(" "),
        Span::styled(
          truncate(&row.notes, 30),
          Style::default().fg(Color::DarkGray),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected.min(vm.rows.len().saturating_sub(1))));

  frame.render_stateful_widget(list, area, &mut state);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match app.mode() {
    Mode::Normal => match app.status_message() {
      Some(message) => (message.to_string(), Style::default().fg(Color::Green)),
      None => (
        " a:nuovo  e:modifica  d:elimina  :comando  j/k:naviga  q:esci".to_string(),
        Style::default().fg(Color::DarkGray),
      ),
    },
    Mode::Command => {
      let cmd = format!(":{}", app.command_input());
      (cmd, Style::default().fg(Color::Yellow))
    }
    Mode::Form => (
      " Invio:salva  Tab:campo  Esc:annulla".to_string(),
      Style::default().fg(Color::DarkGray),
    ),
    Mode::ConfirmDelete => (
      " y/Invio:elimina  n/Esc:annulla".to_string(),
      Style::default().fg(Color::Red),
    ),
    Mode::Reminder => (
      " un tasto qualsiasi per chiudere".to_string(),
      Style::default().fg(Color::DarkGray),
    ),
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}

fn draw_form(frame: &mut Frame, form: &DocumentForm) {
  let area = centered_rect(54, 16, frame.area());
  frame.render_widget(Clear, area);

  let block = Block::default()
    .title(format!(" {} ", form.title()))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Yellow));
  let inner = block.inner(area);
  frame.render_widget(block, area);

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(3), // Person
      Constraint::Length(3), // DocType
      Constraint::Length(3), // ExpiryDate
      Constraint::Length(3), // Notes
      Constraint::Length(1), // Error line
    ])
    .split(inner);

  for (i, field) in FormField::ALL.iter().enumerate() {
    let focused = form.focused() == *field;
    let border = if focused {
      Style::default().fg(Color::Yellow)
    } else {
      Style::default().fg(Color::DarkGray)
    };

    let input = Paragraph::new(form.value(*field)).block(
      Block::default()
        .title(field.label())
        .borders(Borders::ALL)
        .border_style(border),
    );
    frame.render_widget(input, rows[i]);

    if focused {
      frame.set_cursor_position(Position::new(
        rows[i].x + 1 + form.cursor() as u16,
        rows[i].y + 1,
      ));
    }
  }

  if let Some(error) = form.error() {
    let paragraph = Paragraph::new(error).style(Style::default().fg(Color::Red));
    frame.render_widget(paragraph, rows[4]);
  }
}

fn draw_confirm(frame: &mut Frame, label: &str) {
  let area = centered_rect(44, 5, frame.area());
  frame.render_widget(Clear, area);

  let block = Block::default()
    .title(" Eliminare documento? ")
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Red));

  let paragraph = Paragraph::new(vec![
    Line::from(label.to_string()),
    Line::from(Span::styled(
      "y: elimina   n: annulla",
      Style::default().fg(Color::DarkGray),
    )),
  ])
  .alignment(Alignment::Center)
  .block(block);

  frame.render_widget(paragraph, area);
}

fn draw_reminder(frame: &mut Frame, rows: &[DocumentRow]) {
  let height = rows.len() as u16 + 3;
  let area = centered_rect(56, height, frame.area());
  frame.render_widget(Clear, area);

  let block = Block::default()
    .title(" Documenti in scadenza ")
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Yellow));

  let lines: Vec<Line> = rows
    .iter()
    .map(|row| {
      let color = status_color(row.status);
      Line::from(vec![
        Span::styled(format!("{:<12}", row.status.label()), Style::default().fg(color)),
        Span::raw(format!(
          " {} — {} — {}",
          truncate(&row.person, 14),
          truncate(&row.doc_type, 16),
          row.expiry_display
        )),
      ])
    })
    .collect();

  frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_suggestions(frame: &mut Frame, area: Rect, app: &App) {
  let suggestions = commands::get_suggestions(app.command_input());
  if suggestions.is_empty() {
    return;
  }

  let height = (suggestions.len() as u16).min(6) + 2;
  let popup = Rect {
    x: area.x,
    y: area.bottom().saturating_sub(height),
    width: area.width.min(50),
    height,
  };
  frame.render_widget(Clear, popup);

  let items: Vec<ListItem> = suggestions
    .iter()
    .map(|cmd| {
      ListItem::new(Line::from(vec![
        Span::styled(format!("{:<8}", cmd.name), Style::default().fg(Color::Yellow)),
        Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
      ]))
    })
    .collect();

  let list = List::new(items)
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Yellow)))
    .highlight_style(Style::default().bg(Color::DarkGray));

  let mut state = ListState::default();
  state.select(Some(app.selected_suggestion().min(suggestions.len() - 1)));

  frame.render_stateful_widget(list, popup, &mut state);
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
  }
}

/// Display color for an expiry status
pub fn status_color(status: Status) -> Color {
  match status {
    Status::Expired => Color::Red,
    Status::Warning => Color::Yellow,
    Status::Valid => Color::Green,
  }
}

/// Pop-up rectangle centered in `r`, clamped to its size
fn centered_rect(width: u16, height: u16, r: Rect) -> Rect {
  let width = width.min(r.width);
  let height = height.min(r.height);
  Rect {
    x: r.x + (r.width - width) / 2,
    y: r.y + (r.height - height) / 2,
    width,
    height,
  }
}
