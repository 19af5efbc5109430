use crate::commands;
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::model::DocumentRecord;
use crate::offline::{HttpAssetFetcher, OfflineWorker, SqliteAssetStorage};
use crate::reminder::ReminderGate;
use crate::store::{DocumentStore, SqliteKv};
use crate::sync::{RemoteMirror, RtdbMirror};
use crate::transfer;
use crate::ui::{self, DocumentForm, DocumentRow, FormResult, ListViewModel};
use chrono::{Local, Utc};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Form,
  ConfirmDelete,
  Command,
  Reminder,
}

/// Main application state
pub struct App {
  /// The record collection, persisted locally and mirrored when configured
  store: DocumentStore<SqliteKv>,

  /// Current input mode
  mode: Mode,

  /// Selected row in the sorted list view
  selected: usize,

  /// Add/edit form state (only meaningful in Form mode)
  form: DocumentForm,

  /// Record id awaiting delete confirmation
  confirm_delete: Option<String>,

  /// Records surfaced by the reminder gate at startup
  reminder_due: Vec<DocumentRecord>,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Transient status line message
  status_message: Option<String>,

  /// Application configuration
  config: Config,

  /// Remote mirror, when configured
  mirror: Option<Arc<RtdbMirror>>,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let storage = Arc::new(match &config.data_dir {
      Some(dir) => SqliteKv::open_at(&dir.join("scadenze.db"))?,
      None => SqliteKv::open()?,
    });

    let mirror = match &config.remote {
      Some(remote) => Some(Arc::new(RtdbMirror::new(remote)?)),
      None => None,
    };

    let mut store = DocumentStore::load(Arc::clone(&storage))?;
    if let Some(mirror) = &mirror {
      store = store.with_mirror(Arc::clone(mirror) as Arc<dyn RemoteMirror>);
    }

    // Monthly reminder gate, evaluated once per session start
    let gate = ReminderGate::new(storage);
    let reminder_due = match gate.check(store.records(), Utc::now()) {
      Ok(due) => due,
      Err(e) => {
        warn!("reminder check failed: {}", e);
        Vec::new()
      }
    };

    let mode = if reminder_due.is_empty() {
      Mode::Normal
    } else {
      Mode::Reminder
    };

    let (tx, _rx) = mpsc::unbounded_channel();

    Ok(Self {
      store,
      mode,
      selected: 0,
      form: DocumentForm::blank(),
      confirm_delete: None,
      reminder_due,
      command_input: String::new(),
      selected_suggestion: 0,
      status_message: None,
      config,
      mirror,
      event_tx: tx,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    // Subscribe to remote changes
    if let Some(mirror) = &self.mirror {
      Arc::clone(mirror).spawn_listener(self.event_tx.clone());
    }

    // Main loop
    while !self.should_quit {
      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Handle events
      if let Some(event) = events.next().await {
        self.handle_event(event)?;
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  // Accessors used by the rendering layer

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn title(&self) -> &str {
    self.config.title()
  }

  pub fn selected(&self) -> usize {
    self.selected
  }

  pub fn form(&self) -> &DocumentForm {
    &self.form
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }

  pub fn status_message(&self) -> Option<&str> {
    self.status_message.as_deref()
  }

  /// Sorted list projection for the current day
  pub fn view_model(&self) -> ListViewModel {
    ui::project(self.store.records(), Local::now().date_naive())
  }

  /// Rows for the reminder popup
  pub fn reminder_rows(&self) -> Vec<DocumentRow> {
    ui::project(&self.reminder_due, Local::now().date_naive()).rows
  }

  /// Display label of the record awaiting delete confirmation
  pub fn confirm_label(&self) -> Option<String> {
    let id = self.confirm_delete.as_ref()?;
    let record = self.store.get(id)?;
    Some(format!("{} — {}", record.person, record.doc_type))
  }

  fn handle_event(&mut self, event: Event) -> Result<()> {
    match event {
      Event::Key(key) => self.handle_key(key)?,
      Event::Tick => {} // UI refresh happens automatically
      Event::Remote(records) => {
        info!("remote replaced collection with {} records", records.len());
        self.store.apply_remote(records)?;
        self.clamp_selection();
      }
      Event::Status(message) => self.status_message = Some(message),
      Event::Error(message) => {
        warn!("{}", message);
        self.status_message = Some(format!("Errore: {}", message));
      }
    }
    Ok(())
  }

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) -> Result<()> {
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key)?,
      Mode::Form => self.handle_form_mode_key(key)?,
      Mode::ConfirmDelete => self.handle_confirm_mode_key(key)?,
      Mode::Command => self.handle_command_mode_key(key)?,
      Mode::Reminder => {
        // Any key dismisses the popup
        self.mode = Mode::Normal;
      }
    }
    Ok(())
  }

  fn handle_normal_mode_key(&mut self, key: crossterm::event::KeyEvent) -> Result<()> {
    self.status_message = None;

    match key.code {
      // Quit
      KeyCode::Char('q') => {
        self.should_quit = true;
      }
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),

      // Record lifecycle
      KeyCode::Char('a') => {
        self.form = DocumentForm::blank();
        self.mode = Mode::Form;
      }
      KeyCode::Char('e') | KeyCode::Enter => {
        if let Some(id) = self.selected_id() {
          if let Some(record) = self.store.get(&id) {
            self.form = DocumentForm::editing(record);
            self.mode = Mode::Form;
          }
        }
      }
      KeyCode::Char('d') => {
        if let Some(id) = self.selected_id() {
          self.confirm_delete = Some(id);
          self.mode = Mode::ConfirmDelete;
        }
      }

      // Mode switches
      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }

      _ => {}
    }
    Ok(())
  }

  fn handle_form_mode_key(&mut self, key: crossterm::event::KeyEvent) -> Result<()> {
    match self.form.handle_key(key) {
      FormResult::Submitted(record) => {
        let editing = self.form.is_editing();
        self.store.upsert(record)?;
        self.mode = Mode::Normal;
        self.status_message = Some(if editing {
          "Documento aggiornato".to_string()
        } else {
          "Documento salvato".to_string()
        });
        self.clamp_selection();
      }
      FormResult::Cancelled => {
        self.mode = Mode::Normal;
      }
      FormResult::Consumed => {}
    }
    Ok(())
  }

  fn handle_confirm_mode_key(&mut self, key: crossterm::event::KeyEvent) -> Result<()> {
    match key.code {
      KeyCode::Char('y') | KeyCode::Enter => {
        if let Some(id) = self.confirm_delete.take() {
          self.store.delete(&id)?;
          self.status_message = Some("Documento eliminato".to_string());
          self.clamp_selection();
        }
        self.mode = Mode::Normal;
      }
      KeyCode::Char('n') | KeyCode::Esc => {
        self.confirm_delete = None;
        self.mode = Mode::Normal;
      }
      _ => {}
    }
    Ok(())
  }

  fn handle_command_mode_key(&mut self, key: crossterm::event::KeyEvent) -> Result<()> {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command()?;
        if self.mode == Mode::Command {
          self.mode = Mode::Normal;
        }
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0;
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0;
      }
      _ => {}
    }
    Ok(())
  }

  fn execute_command(&mut self) -> Result<()> {
    let input = self.command_input.trim().to_string();
    self.command_input.clear();

    let mut words = input.splitn(2, char::is_whitespace);
    let first = words.next().unwrap_or_default();
    let arg = words.next().map(|rest| rest.trim().to_string()).filter(|rest| !rest.is_empty());

    // An exact name or alias wins; otherwise take the highlighted suggestion
    let command = commands::resolve(first).or_else(|| {
      commands::get_suggestions(first)
        .into_iter()
        .nth(self.selected_suggestion)
    });

    let Some(command) = command else {
      self.status_message = Some(format!("Comando sconosciuto: {}", first));
      return Ok(());
    };

    match command.name {
      "add" => {
        self.form = DocumentForm::blank();
        self.mode = Mode::Form;
      }
      "export" => self.run_export(arg)?,
      "import" => self.run_import(arg)?,
      "sync" => self.run_sync(),
      "cache" => self.run_cache_refresh(),
      "quit" => self.should_quit = true,
      _ => {}
    }
    Ok(())
  }

  fn run_export(&mut self, dir: Option<String>) -> Result<()> {
    let dir = dir.map(PathBuf::from).unwrap_or_else(|| self.config.export_dir());
    match transfer::write_export(
      self.store.records(),
      &dir,
      Local::now().date_naive(),
    ) {
      Ok(path) => {
        info!("exported {} records to {}", self.store.len(), path.display());
        self.status_message = Some(format!("Esportato in {}", path.display()));
      }
      Err(e) => self.status_message = Some(format!("Errore: {}", e)),
    }
    Ok(())
  }

  fn run_import(&mut self, path: Option<String>) -> Result<()> {
    let Some(path) = path else {
      self.status_message = Some("Uso: import <file.json>".to_string());
      return Ok(());
    };

    match transfer::import_file(Path::new(&path)) {
      Ok(records) => {
        let count = records.len();
        self.store.replace_all(records)?;
        self.clamp_selection();
        info!("imported {} records from {}", count, path);
        self.status_message = Some(format!("Importati {} documenti", count));
      }
      Err(e) => {
        warn!("import failed: {}", e);
        self.status_message = Some("File non valido".to_string());
      }
    }
    Ok(())
  }

  fn run_sync(&mut self) {
    let Some(mirror) = &self.mirror else {
      self.status_message = Some("Nessun database remoto configurato".to_string());
      return;
    };

    let mirror = Arc::clone(mirror);
    let tx = self.event_tx.clone();
    tokio::spawn(async move {
      match mirror.fetch_all().await {
        Ok(records) => {
          let _ = tx.send(Event::Remote(records));
        }
        Err(e) => {
          let _ = tx.send(Event::Error(e.to_string()));
        }
      }
    });
  }

  fn run_cache_refresh(&mut self) {
    let Some(assets) = self.config.assets.clone() else {
      self.status_message = Some("Nessuna risorsa web configurata".to_string());
      return;
    };

    let data_dir = self.config.data_dir.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let result = async {
        let storage = match &data_dir {
          Some(dir) => SqliteAssetStorage::open_at(&dir.join("cache.db"))?,
          None => SqliteAssetStorage::open()?,
        };

        let fetcher = HttpAssetFetcher::new(&assets.base_url)?;
        let worker = OfflineWorker::new(storage);

        let count = worker
          .install(|request| {
            let fetcher = fetcher.clone();
            async move { fetcher.fetch(request).await }
          })
          .await?;
        worker.activate()?;

        Ok::<usize, color_eyre::Report>(count)
      }
      .await;

      match result {
        Ok(count) => {
          let _ = tx.send(Event::Status(format!(
            "Cache offline aggiornata ({} risorse)",
            count
          )));
        }
        Err(e) => {
          let _ = tx.send(Event::Error(format!("cache refresh failed: {}", e)));
        }
      }
    });
  }

  /// Id of the record under the cursor, in sorted view order
  fn selected_id(&self) -> Option<String> {
    let vm = self.view_model();
    vm.rows.get(self.selected).map(|row| row.id.clone())
  }

  fn move_selection(&mut self, delta: i64) {
    let len = self.store.len();
    if len == 0 {
      self.selected = 0;
      return;
    }
    let current = self.selected as i64;
    self.selected = (current + delta).clamp(0, len as i64 - 1) as usize;
  }

  fn clamp_selection(&mut self) {
    let len = self.store.len();
    if len == 0 {
      self.selected = 0;
    } else if self.selected >= len {
      self.selected = len - 1;
    }
  }
}
