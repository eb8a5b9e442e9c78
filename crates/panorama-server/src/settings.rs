//! Runtime configuration, layered from an optional TOML file and
//! `PANORAMA__*` environment variables.

use std::path::{Path, PathBuf};

use panorama_core::config::{Collections, RebuildSettings};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub host:        String,
  pub port:        u16,
  pub store_path:  PathBuf,
  pub collections: Collections,
  pub rebuild:     RebuildSettings,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      host:        "127.0.0.1".into(),
      port:        8360,
      store_path:  PathBuf::from("~/.local/share/panorama/panorama.db"),
      collections: Collections::default(),
      rebuild:     RebuildSettings::default(),
    }
  }
}

impl Settings {
  /// Read `path` (if it exists), then apply environment overrides such as
  /// `PANORAMA__PORT` or `PANORAMA__COLLECTIONS__WORKER_360`.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("PANORAMA")
          .prefix_separator("__")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  /// The store path with a leading `~` expanded to the home directory.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let settings = Settings::load(Path::new("/nonexistent/panorama.toml")).unwrap();
    assert_eq!(settings.port, 8360);
    assert_eq!(settings.collections, Collections::default());
    assert!(settings.rebuild.stamp_refresh);
  }

  #[test]
  fn file_overrides_nested_sections() {
    let path = std::env::temp_dir().join(format!("panorama-settings-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      "port = 9000\n\n[collections]\nworker_360 = \"360_Worker_v2\"\n\n[rebuild]\nstamp_refresh = false\n",
    )
    .unwrap();

    let settings = Settings::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(settings.port, 9000);
    assert_eq!(settings.collections.worker_360, "360_Worker_v2");
    assert_eq!(settings.collections.client_360, "360_Client_v1");
    assert!(!settings.rebuild.stamp_refresh);
    assert_eq!(settings.rebuild.refresh_field, "refreshedAt");
  }

  #[test]
  fn tilde_is_expanded_against_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.db")), PathBuf::from(home).join("x.db"));
    assert_eq!(expand_tilde(Path::new("/abs/x.db")), PathBuf::from("/abs/x.db"));
  }
}
