//! Combat Core Library
//!
//! Deterministic combat resolution and stat modifiers for action RPGs:
//! - Layered stats (flat, increase, multiplier) with caps and level scaling
//! - Afflictions: timed, stackable modifiers with optional damage payloads
//! - Ressource pools (life, mana) with regeneration
//! - Damage resolution: mitigation, dodge, block, resistances, crits
//! - Creatures, gear and attribute-derived bonuses
//! - Versioned saves, enemy templates and duel balance simulation
//! - FFI bridge for engine hosts
//!
//! A `Creature` is single-owner and not synchronized; run one simulation
//! per `SimContext` and move whole creatures between threads.

pub mod balance;
pub mod bridge;
pub mod constants;
pub mod creature;
pub mod engine;
pub mod equipment;
pub mod error;
pub mod flags;
pub mod logging;
pub mod numerics;
pub mod savemigration;
pub mod templates;

pub use creature::{Creature, CreatureId, HitOutcome};
pub use engine::{CombatConfig, SimContext};
pub use error::{CoreError, CoreResult};
pub use flags::{Element, Flag, StatKey};
pub use numerics::{Affliction, Damage, RangeStat, Ressource, Stat};
