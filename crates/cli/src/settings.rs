use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "tally.toml";
const DATABASE_FILE: &str = "tally.db";

/// Contents of `tally.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Defaults to `tally.db` in the platform data directory.
    pub database_path: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
    pub link_max_day_span: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: None,
            log_filter: "info".to_string(),
            link_max_day_span: 7,
        }
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "tally", "Tally")
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse settings")
    }

    /// Reads settings from `path`, or from the platform config directory when
    /// no path is given. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match project_dirs() {
                Some(dirs) => dirs.config_dir().join(CONFIG_FILE),
                None => return Ok(Self::default()),
            },
        };

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::from_toml(&content)
                .with_context(|| format!("Invalid settings file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }
        let dirs = project_dirs().context("Failed to determine the data directory")?;
        Ok(dirs.data_dir().join(DATABASE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(Settings::from_toml("").unwrap(), Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let s = Settings::from_toml("link_max_day_span = 3\n").unwrap();
        assert_eq!(s.link_max_day_span, 3);
        assert_eq!(s.log_filter, "info");
        assert_eq!(s.database_path, None);
    }

    #[test]
    fn explicit_database_path_wins() {
        let s = Settings::from_toml("database_path = \"/tmp/ledger.db\"\n").unwrap();
        assert_eq!(s.database_path().unwrap(), PathBuf::from("/tmp/ledger.db"));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tally.toml");
        std::fs::write(&path, "link_max_day_span = \"soon\"").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }
}
