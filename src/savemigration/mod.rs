//! Versioned creature saves.
//!
//! A save is `{ "version": N, "creature": <CreatureRecord> }`. Older
//! versions are migrated forward step by step on the raw JSON before the
//! record is deserialized; saves from a newer build are refused.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use crate::creature::{Creature, CreatureRecord};
use crate::engine::CombatConfig;
use crate::error::{CoreError, CoreResult};

pub const CURRENT_SAVE_VERSION: u32 = 2;

pub const MIN_SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum MigrationError {
    #[error("save version {save_version} is newer than supported {max_supported}")]
    FutureVersion { save_version: u32, max_supported: u32 },
    #[error("save version {save_version} is older than supported {min_supported}")]
    TooOldVersion { save_version: u32, min_supported: u32 },
    #[error("invalid save: {detail}")]
    InvalidFormat { detail: String },
    #[error("migration from v{from_version} failed: {detail}")]
    MigrationStepFailed { from_version: u32, detail: String },
}

impl From<MigrationError> for CoreError {
    fn from(err: MigrationError) -> Self {
        CoreError::Migration(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    pub original_version: u32,
    pub final_version: u32,
    pub steps_applied: Vec<String>,
    pub data: Value,
}

/// Current-version save envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveFile {
    pub version: u32,
    pub creature: CreatureRecord,
    /// Tuning table the creature was created under
    #[serde(default)]
    pub config: CombatConfig,
}

impl SaveFile {
    pub fn new(creature: &Creature) -> Self {
        Self {
            version: CURRENT_SAVE_VERSION,
            creature: creature.export(),
            config: CombatConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CombatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a save of any supported version
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let migrated = migrate_save(json)?;
        Ok(serde_json::from_value(migrated.data)?)
    }
}

/// Bring a save up to `CURRENT_SAVE_VERSION`
pub fn migrate_save(json: &str) -> Result<MigrationResult, MigrationError> {
    let mut data: Value = serde_json::from_str(json).map_err(|e| MigrationError::InvalidFormat {
        detail: e.to_string(),
    })?;

    let version = data
        .get("version")
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .ok_or_else(|| MigrationError::InvalidFormat {
            detail: "missing or invalid 'version' field".to_string(),
        })?;

    if version > CURRENT_SAVE_VERSION {
        warn!(version, "save from a newer build");
        return Err(MigrationError::FutureVersion {
            save_version: version,
            max_supported: CURRENT_SAVE_VERSION,
        });
    }
    if version < MIN_SUPPORTED_VERSION {
        return Err(MigrationError::TooOldVersion {
            save_version: version,
            min_supported: MIN_SUPPORTED_VERSION,
        });
    }

    let mut current = version;
    let mut steps = Vec::new();
    while current < CURRENT_SAVE_VERSION {
        let step = apply_migration_step(&mut data, current).map_err(|detail| {
            MigrationError::MigrationStepFailed {
                from_version: current,
                detail,
            }
        })?;
        steps.push(step);
        current += 1;
        data["version"] = serde_json::json!(current);
    }
    if !steps.is_empty() {
        info!(from = version, to = current, "save migrated");
    }

    Ok(MigrationResult {
        original_version: version,
        final_version: current,
        steps_applied: steps,
        data,
    })
}

fn apply_migration_step(data: &mut Value, from_version: u32) -> Result<String, String> {
    match from_version {
        1 => migrate_v1_to_v2(data),
        _ => Err(format!("no migration path from version {from_version}")),
    }
}

/// v1 → v2:
/// - stat records spelled their layers `incrs` / `mults`
/// - creatures had no `ability_points`
fn migrate_v1_to_v2(data: &mut Value) -> Result<String, String> {
    let creature = data
        .get_mut("creature")
        .and_then(Value::as_object_mut)
        .ok_or("save has no creature object")?;

    if !creature.contains_key("ability_points") {
        let level = creature.get("level").and_then(Value::as_u64).unwrap_or(1);
        creature.insert(
            "ability_points".to_string(),
            serde_json::json!(level.saturating_sub(1)),
        );
    }

    let stats = creature
        .get_mut("stats")
        .and_then(Value::as_object_mut)
        .ok_or("creature has no stats object")?;
    let mut renamed = 0;
    for entry in stats.values_mut() {
        renamed += rename_layers(entry);
    }

    Ok(format!("v1→v2: renamed {renamed} layer lists, added ability_points"))
}

fn rename_layers(value: &mut Value) -> usize {
    let Some(obj) = value.as_object_mut() else {
        return 0;
    };
    let mut renamed = 0;
    for (old, new) in [("incrs", "increases"), ("mults", "multipliers")] {
        if let Some(list) = obj.remove(old) {
            obj.insert(new.to_string(), list);
            renamed += 1;
        }
    }
    for child in obj.values_mut() {
        renamed += rename_layers(child);
    }
    renamed
}

pub fn get_save_version(json: &str) -> Option<u32> {
    let data: Value = serde_json::from_str(json).ok()?;
    data.get("version")?.as_u64().map(|v| v as u32)
}

/// True if `json` is a save at the current version
pub fn validate_save(json: &str) -> bool {
    get_save_version(json) == Some(CURRENT_SAVE_VERSION)
}

pub fn save_to_path(creature: &Creature, path: &Path) -> CoreResult<()> {
    std::fs::write(path, SaveFile::new(creature).to_json()?)?;
    Ok(())
}

pub fn load_from_path(path: &Path) -> CoreResult<Creature> {
    let text = std::fs::read_to_string(path)?;
    Creature::import(SaveFile::from_json(&text)?.creature)
}
