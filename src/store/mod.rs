//! File-backed mission storage.
//!
//! Each mission lives in its own text file named `<scope>__<name>.mission`,
//! where the scope groups missions per owner (a save game, a player, ...).
//! Underscores in the scope are written as `_-`, so the first `__` in a file
//! name always separates scope from name.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::codec::{self, ConfigNode, MISSION_NODE, STEPS_NODE, STEP_NODE};
use crate::models::Mission;

pub const MISSION_EXTENSION: &str = "mission";
const SCOPE_SEPARATOR: &str = "__";
const SCOPE_UNDERSCORE: &str = "_-";
const ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Mission file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Not a mission file: {0}")]
    NotAMission(PathBuf),

    #[error("Mission not found: {0}")]
    NotFound(String),

    #[error("Could not determine data directory")]
    NoDataDir,
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// What to do when the target file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    Overwrite,
    /// Save under `<name> (n)` with the first free `n`.
    #[default]
    KeepBoth,
    Fail,
}

/// Summary of a stored mission, read without decoding the step records.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionListing {
    pub scope: String,
    pub name: String,
    pub path: PathBuf,
    pub saved_at: Option<DateTime<Utc>>,
    /// Titles of the root steps, from the cached step titles.
    pub root_titles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MissionStore {
    root: PathBuf,
}

impl MissionStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a mission would be saved to, ignoring collisions.
    pub fn path_for(&self, scope: &str, name: &str) -> PathBuf {
        self.root.join(file_name(scope, name))
    }

    /// Write `mission` under `scope`. On success `saved_at` is stamped and, with
    /// [`SaveMode::KeepBoth`], `name` may gain a ` (n)` suffix. On failure the
    /// mission is left untouched.
    pub fn save(&self, scope: &str, mission: &mut Mission, mode: SaveMode) -> Result<PathBuf> {
        let mut name = mission.name.clone();
        let mut path = self.path_for(scope, &name);
        if path.exists() {
            match mode {
                SaveMode::Overwrite => {}
                SaveMode::Fail => return Err(StoreError::AlreadyExists(path)),
                SaveMode::KeepBoth => {
                    let mut n = 1;
                    loop {
                        name = format!("{} ({})", mission.name, n);
                        path = self.path_for(scope, &name);
                        if !path.exists() {
                            break;
                        }
                        n += 1;
                    }
                }
            }
        }

        let saved_at = write_mission(&path, mission, &name)?;
        mission.name = name;
        mission.saved_at = Some(saved_at);
        Ok(path)
    }

    /// Write `mission` to an explicit file, replacing it if present.
    pub fn save_to_path(&self, path: &Path, mission: &mut Mission) -> Result<()> {
        let saved_at = write_mission(path, mission, &mission.name)?;
        mission.saved_at = Some(saved_at);
        Ok(())
    }

    pub fn load(&self, path: &Path) -> Result<Mission> {
        let node = read_mission_node(path)?;
        let mission = codec::mission_from_node(&node);
        tracing::debug!(path = %path.display(), steps = mission.steps.len(), "Loaded mission");
        Ok(mission)
    }

    pub fn load_named(&self, scope: &str, name: &str) -> Result<Mission> {
        let path = self.path_for(scope, name);
        if !path.exists() {
            return Err(StoreError::NotFound(name.to_string()));
        }
        self.load(&path)
    }

    pub fn delete(&self, scope: &str, name: &str) -> Result<bool> {
        let path = self.path_for(scope, name);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        tracing::info!(path = %path.display(), "Deleted mission");
        Ok(true)
    }

    /// Missions in `scope` (or every scope), ordered by file name. Unreadable
    /// files are skipped with a warning.
    pub fn list(&self, scope: Option<&str>) -> Result<Vec<MissionListing>> {
        let prefix = scope.map(|s| format!("{}{}", scope_part(s), SCOPE_SEPARATOR));
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MISSION_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if prefix.as_deref().is_some_and(|p| !stem.starts_with(p)) {
                continue;
            }
            paths.push(path);
        }
        paths.sort();

        let mut listings = Vec::with_capacity(paths.len());
        for path in paths {
            match read_mission_node(&path) {
                Ok(node) => listings.push(listing(&path, &node)),
                Err(e) => tracing::warn!(path = %path.display(), "Skipping mission file: {}", e),
            }
        }
        Ok(listings)
    }
}

/// Default missions directory from the platform's data directory.
pub fn default_dir() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "mission-checklist")
        .ok_or(StoreError::NoDataDir)?;
    Ok(dirs.data_dir().join("missions"))
}

/// `<scope>__<name>.mission` with both parts sanitized and the scope escaped.
pub fn file_name(scope: &str, name: &str) -> String {
    format!(
        "{}{}{}.{}",
        scope_part(scope),
        SCOPE_SEPARATOR,
        sanitize(name),
        MISSION_EXTENSION
    )
}

/// Replace characters that are illegal in file names and strip trailing dots
/// and spaces. Never returns an empty string.
pub fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_control() || ILLEGAL_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim().trim_end_matches(['.', ' ']);
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

fn scope_part(scope: &str) -> String {
    sanitize(scope).replace('_', SCOPE_UNDERSCORE)
}

fn read_mission_node(path: &Path) -> Result<ConfigNode> {
    let text = fs::read_to_string(path)?;
    ConfigNode::parse(&text)
        .node(MISSION_NODE)
        .cloned()
        .ok_or_else(|| StoreError::NotAMission(path.to_path_buf()))
}

fn listing(path: &Path, node: &ConfigNode) -> MissionListing {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let scope = stem
        .split_once(SCOPE_SEPARATOR)
        .map(|(scope, _)| scope.replace(SCOPE_UNDERSCORE, "_"))
        .unwrap_or_default();
    MissionListing {
        scope,
        name: node.value("name").unwrap_or(stem).to_string(),
        path: path.to_path_buf(),
        saved_at: node
            .value("saved")
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        root_titles: node
            .node(STEPS_NODE)
            .map(|steps| {
                steps
                    .nodes_named(STEP_NODE)
                    .map(|s| s.value("title").unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn write_mission(path: &Path, mission: &Mission, name: &str) -> Result<DateTime<Utc>> {
    let saved_at = Utc::now();
    let mut node = codec::mission_to_node(mission);
    node.set_value("name", name);
    node.set_value("saved", saved_at.to_rfc3339());
    write_atomically(path, &node.to_text())?;
    tracing::info!(path = %path.display(), "Saved mission");
    Ok(saved_at)
}

/// Write through a temp file in the target's directory that is renamed over
/// the target. The temp file is removed if anything fails.
fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
