use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rng::RngState;
use crate::systems::{
    chronology::ChronologySave, deliveries::DeliveriesSave, disease::DiseaseSave,
    milestones::MilestonesSave,
};
use crate::world::WorldSave;

pub const SAVE_GAME_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("{section} save data carries no version tag")]
    MissingVersion { section: &'static str },
    #[error("{section} save version {found} is not supported (expected {expected})")]
    UnsupportedVersion {
        section: &'static str,
        found: u32,
        expected: u32,
    },
    #[error("invalid {section} save data: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
    #[error("malformed save json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("save io error: {0}")]
    Io(#[from] std::io::Error),
}

pub fn check_version(
    section: &'static str,
    found: Option<u32>,
    expected: u32,
) -> Result<(), SaveError> {
    match found {
        None => Err(SaveError::MissingVersion { section }),
        Some(found) if found != expected => Err(SaveError::UnsupportedVersion {
            section,
            found,
            expected,
        }),
        Some(_) => Ok(()),
    }
}

/// Everything needed to resume a session on the exact same random stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGame {
    #[serde(default)]
    pub version: Option<u32>,
    pub saved_at: DateTime<Utc>,
    pub scenario: String,
    pub rng: RngState,
    pub plan_year: u32,
    pub chronology: ChronologySave,
    pub deliveries: DeliveriesSave,
    pub disease: DiseaseSave,
    pub milestones: MilestonesSave,
    pub world: WorldSave,
}

impl SaveGame {
    pub fn total_ticks(&self) -> u64 {
        self.chronology.clock.total_ticks
    }

    pub fn to_json(&self) -> Result<String, SaveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(data: &str) -> Result<Self, SaveError> {
        let save: SaveGame = serde_json::from_str(data)?;
        check_version("save", save.version, SAVE_GAME_VERSION)?;
        Ok(save)
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SaveError> {
        let data = fs::read_to_string(path)?;
        Self::from_json(&data)
    }
}

/// Periodic autosave under `<dir>/<scenario>/tick_NNNNNN.json`.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn is_due(&self, tick: u64) -> bool {
        self.interval > 0 && tick > 0 && tick % self.interval == 0
    }

    pub fn path_for(&self, scenario: &str, tick: u64) -> PathBuf {
        self.dir.join(scenario).join(format!("tick_{tick:06}.json"))
    }

    pub fn maybe_write(&self, save: &SaveGame) -> Result<Option<PathBuf>, SaveError> {
        let tick = save.total_ticks();
        if !self.is_due(tick) {
            return Ok(None);
        }
        let path = self.path_for(&save.scenario, tick);
        save.write_to(&path)?;
        tracing::info!(tick, path = %path.display(), "autosave written");
        Ok(Some(path))
    }
}
