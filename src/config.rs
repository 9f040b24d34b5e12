use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use crate::store::{self, SaveMode};

const APP_NAME: &str = "mission-checklist";
const CONFIG_FILE: &str = "config.json";

pub const DIR_ENV: &str = "MISSION_CHECKLIST_DIR";
pub const SCOPE_ENV: &str = "MISSION_CHECKLIST_SCOPE";
pub const DEFAULT_SCOPE: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding mission files. Falls back to the platform data directory.
    pub missions_dir: Option<PathBuf>,
    /// Scope missions are saved under and listed from.
    pub scope: String,
    /// What `save` does when a mission file with the same name exists.
    pub on_collision: SaveMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            missions_dir: None,
            scope: DEFAULT_SCOPE.to_string(),
            on_collision: SaveMode::default(),
        }
    }
}

impl Settings {
    /// Load configuration from the user's config directory and apply the
    /// environment overrides. Returns defaults if the file doesn't exist or
    /// fails to parse.
    pub fn load() -> Self {
        let settings = match Self::try_load() {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Failed to load settings, using defaults: {:#}", e);
                Self::default()
            }
        };
        settings.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn try_load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read settings file")?;

        let settings = serde_json::from_str(&content).context("Failed to parse settings file")?;

        Ok(settings)
    }

    /// Save the current settings to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(path, content).context("Failed to write settings file")?;

        Ok(())
    }

    /// Override fields from `lookup` ([`DIR_ENV`], [`SCOPE_ENV`]). Blank values
    /// are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(dir) = non_blank(DIR_ENV) {
            self.missions_dir = Some(PathBuf::from(dir));
        }
        if let Some(scope) = non_blank(SCOPE_ENV) {
            self.scope = scope.trim().to_string();
        }
        self
    }

    pub fn missions_dir(&self) -> Result<PathBuf> {
        match &self.missions_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(store::default_dir()?),
        }
    }
}

fn get_config_path() -> Result<PathBuf> {
    let mut path =
        config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
