//! Hand-off of a finished forest to whoever stores it
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use strum::Display;
use tracing::{debug, info};

use crate::core::models::Forest;

/// Where a save request should land
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SaveTarget {
    /// Save as default filter
    #[default]
    Default,
    /// Save as custom preset
    Preset,
    /// Save for current session
    Session,
    /// Apply to all similar columns
    AllColumns,
}

impl SaveTarget {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Default => "Save as default filter",
            Self::Preset => "Save as custom preset",
            Self::Session => "Save for current session",
            Self::AllColumns => "Apply to all similar columns",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{self}.json")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("filter file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("filter encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Receives the forest on a successful save, unchanged
pub trait FilterSink {
    fn persist(&mut self, forest: &Forest, target: SaveTarget) -> Result<(), PersistError>;
}

/// Keeps every hand-off in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    saved: Vec<(SaveTarget, Forest)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> &[(SaveTarget, Forest)] {
        &self.saved
    }

    pub fn last(&self) -> Option<&(SaveTarget, Forest)> {
        self.saved.last()
    }
}

impl FilterSink for MemorySink {
    fn persist(&mut self, forest: &Forest, target: SaveTarget) -> Result<(), PersistError> {
        self.saved.push((target, forest.clone()));
        Ok(())
    }
}

/// Writes one pretty-printed JSON file per save target into a directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, target: SaveTarget) -> PathBuf {
        self.dir.join(target.file_name())
    }

    /// Read back a previously saved forest; `None` if that target was never saved
    pub fn load(&self, target: SaveTarget) -> Result<Option<Forest>, PersistError> {
        let path = self.path_for(target);
        if !path.exists() {
            return Ok(None);
        }
        load_forest(&path).map(Some)
    }
}

impl FilterSink for JsonFileSink {
    fn persist(&mut self, forest: &Forest, target: SaveTarget) -> Result<(), PersistError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(target);
        save_forest(&path, forest)?;
        info!("Saved filter ({}) to {}", target, path.display());
        Ok(())
    }
}

/// Save a forest to a file as JSON
pub fn save_forest(path: &Path, forest: &Forest) -> Result<(), PersistError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, forest)?;
    Ok(())
}

/// Load a forest from a JSON file
pub fn load_forest(path: &Path) -> Result<Forest, PersistError> {
    let file = File::open(path)?;
    let forest: Forest = serde_json::from_reader(file)?;
    debug!("Loaded filter with {} groups from {}", forest.groups().len(), path.display());
    Ok(forest)
}
