use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  /// Custom title for the header (defaults to "Scadenze famiglia")
  pub title: Option<String>,
  /// Directory for the local databases (defaults to the platform data dir)
  pub data_dir: Option<PathBuf>,
  /// Directory export files are written into (defaults to the platform
  /// download dir, falling back to the current directory)
  pub export_dir: Option<PathBuf>,
  /// Optional realtime mirror; when absent the app runs local-only
  pub remote: Option<RemoteConfig>,
  /// Optional hosted shell to keep cached for offline use
  pub assets: Option<AssetsConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
  /// Realtime database base url, e.g.
  /// "https://scadenze-famiglia-default-rtdb.europe-west1.firebasedatabase.app"
  pub database_url: String,
  /// Tree the record map lives under
  #[serde(default = "default_tree")]
  pub tree: String,
}

fn default_tree() -> String {
  "documenti".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
  /// Base url the shell assets are hosted at
  pub base_url: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./scadenze.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/scadenze/config.yaml
  /// 4. ~/.config/scadenze/config.yaml
  ///
  /// No config file at all is fine: the app runs local-only with defaults.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("scadenze.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("scadenze").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Header title for the list view.
  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("Scadenze famiglia")
  }

  /// Where export files go.
  pub fn export_dir(&self) -> PathBuf {
    self
      .export_dir
      .clone()
      .or_else(dirs::download_dir)
      .unwrap_or_else(|| PathBuf::from("."))
  }
}

impl RemoteConfig {
  /// Optional database auth token from the environment.
  ///
  /// Checks SCADENZE_RTDB_TOKEN; absent means the tree allows
  /// unauthenticated access.
  pub fn get_auth_token() -> Option<String> {
    std::env::var("SCADENZE_RTDB_TOKEN").ok()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_full_config() {
    let config: Config = serde_yaml::from_str(
      r#"
title: Documenti di casa
export_dir: /tmp/exports
remote:
  database_url: https://example.firebasedatabase.app
assets:
  base_url: https://example.github.io/scadenze
"#,
    )
    .unwrap();

    assert_eq!(config.title(), "Documenti di casa");
    assert_eq!(config.export_dir(), PathBuf::from("/tmp/exports"));
    let remote = config.remote.unwrap();
    assert_eq!(remote.tree, "documenti");
    assert!(config.assets.is_some());
  }

  #[test]
  fn test_defaults_without_file_sections() {
    let config: Config = serde_yaml::from_str("{}").unwrap();
    assert_eq!(config.title(), "Scadenze famiglia");
    assert!(config.remote.is_none());
    assert!(config.assets.is_none());
  }

  #[test]
  fn test_missing_explicit_path_errors() {
    assert!(Config::load(Some(Path::new("/definitely/not/here.yaml"))).is_err());
  }
}
