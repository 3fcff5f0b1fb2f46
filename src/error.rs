//! Error types for the combat core.
//!
//! Configuration faults (an affliction routed to a stat the creature does
//! not carry, an unknown key in authored data) are reported through
//! `CoreError`. Rejected equips hand the item back inside `EquipRejection`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::equipment::{GearSlot, Item};
use crate::flags::StatKey;

/// Failures of the combat core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An affliction or damage path references a stat the creature lacks
    #[error("creature '{creature}' has no stat '{key}'")]
    MissingStat {
        /// Creature name
        creature: String,
        /// Missing key
        key: StatKey,
    },
    /// A string did not name any stat key, element or flag
    #[error("unknown stat key or flag: '{0}'")]
    UnknownStatKey(String),
    /// A record referenced an affliction index outside its affliction list
    #[error("affliction index {index} out of range ({len} afflictions)")]
    DanglingAffliction {
        /// Referenced index
        index: usize,
        /// Length of the exported affliction list
        len: usize,
    },
    /// Configuration failed validation
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("ron: {0}")]
    RonWrite(#[from] ron::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("save migration failed: {0}")]
    Migration(String),
}

/// Result alias used across the crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// Why an item could not be equipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Item lacks the `gear` marker
    NotGear,
    /// Item's category does not fit the slot
    WrongSlot,
    /// An affix targets a stat the wearer does not carry
    MissingStat(StatKey),
}

/// A refused equip. Carries the item back to the caller untouched.
#[derive(Debug, Error)]
#[error("cannot equip '{}' in {slot:?}: {reason:?}", item.name)]
pub struct EquipRejection {
    pub item: Item,
    pub slot: GearSlot,
    pub reason: RejectReason,
}
