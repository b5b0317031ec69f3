use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, anyhow};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::ValidationError;
use crate::model::{ListId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn storage_value(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_value())
    }
}

impl FromStr for Theme {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" | "day" => Ok(Theme::Light),
            "dark" | "night" => Ok(Theme::Dark),
            _ => Err(ValidationError::InvalidTheme(s.trim().to_string())),
        }
    }
}

/// Persisted session context: who is signed in, which list they were
/// looking at, and the theme preference. One small file per value inside the
/// data directory.
#[derive(Debug)]
pub struct Session {
    pub data_dir: PathBuf,
    pub user_path: PathBuf,
    pub active_list_path: PathBuf,
    pub theme_path: PathBuf,
}

impl Session {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let session = Self {
            user_path: data_dir.join("session.data"),
            active_list_path: data_dir.join("active_list.data"),
            theme_path: data_dir.join("theme.data"),
            data_dir,
        };

        info!(
            data_dir = %session.data_dir.display(),
            user = %session.user_path.display(),
            active_list = %session.active_list_path.display(),
            theme = %session.theme_path.display(),
            "opened session store"
        );

        Ok(session)
    }

    #[tracing::instrument(skip(self))]
    pub fn load_user_id(&self) -> anyhow::Result<Option<UserId>> {
        read_id(&self.user_path)
    }

    #[tracing::instrument(skip(self))]
    pub fn save_user_id(&self, user_id: UserId) -> anyhow::Result<()> {
        write_atomic(&self.user_path, &user_id.to_string())
            .context("failed to save session.data")?;
        info!(user_id, "saved session user");
        Ok(())
    }

    /// Signs out: forgets the user and their active list. The theme
    /// preference survives.
    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<()> {
        remove_if_present(&self.user_path)?;
        remove_if_present(&self.active_list_path)?;
        info!("cleared session");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn load_active_list(&self) -> anyhow::Result<Option<ListId>> {
        read_id(&self.active_list_path)
    }

    #[tracing::instrument(skip(self))]
    pub fn save_active_list(&self, list_id: Option<ListId>) -> anyhow::Result<()> {
        match list_id {
            Some(id) => write_atomic(&self.active_list_path, &id.to_string())
                .context("failed to save active_list.data"),
            None => remove_if_present(&self.active_list_path),
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn load_theme(&self) -> anyhow::Result<Theme> {
        let Some(raw) = read_trimmed(&self.theme_path)? else {
            return Ok(Theme::default());
        };
        match raw.parse::<Theme>() {
            Ok(theme) => Ok(theme),
            Err(err) => {
                warn!(error = %err, "ignoring unreadable theme preference");
                Ok(Theme::default())
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn save_theme(&self, theme: Theme) -> anyhow::Result<()> {
        write_atomic(&self.theme_path, theme.storage_value()).context("failed to save theme.data")
    }
}

fn read_trimmed(path: &Path) -> anyhow::Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn read_id(path: &Path) -> anyhow::Result<Option<u64>> {
    let Some(raw) = read_trimmed(path)? else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(id) => Ok(Some(id)),
        Err(err) => {
            warn!(file = %path.display(), value = %raw, error = %err, "ignoring malformed stored id");
            Ok(None)
        }
    }
}

fn write_atomic(path: &Path, payload: &str) -> anyhow::Result<()> {
    debug!(file = %path.display(), "writing atomically");
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    write!(temp, "{payload}")?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
    Ok(())
}

fn remove_if_present(path: &Path) -> anyhow::Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("failed removing {}", path.display()))?;
    }
    Ok(())
}
