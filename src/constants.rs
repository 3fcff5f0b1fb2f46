//! Centralized numeric constants for the combat core.
//!
//! Defaults for `CombatConfig` live here so tests, templates and the bridge
//! agree on the same numbers. Per-stat defaults (base life, base crit) stay
//! in `creature::block` next to the stat block they describe.

// =====================================================
// Simulation
// =====================================================

/// Fixed logical timestep, in time units per tick
pub const TICK_DT: f64 = 0.016;

/// Remaining time below this counts as zero
pub const TIME_EPSILON: f64 = 1e-9;

/// Duration value marking an affliction that never expires
pub const INFINITE_DURATION: f64 = -1.0;

/// Default rounding precision of a stat's computed value
pub const DEFAULT_PRECISION: u8 = 2;

// =====================================================
// Mitigation curves
// =====================================================

/// Steepness of the logistic armor/dodge curve
pub const CURVE_STEEPNESS: f64 = 0.0004;

/// Rating at which the logistic curve reaches its midpoint
pub const CURVE_MIDPOINT: f64 = 7000.0;

/// Asymptotic height of the curve, in percent
pub const CURVE_SCALE: f64 = 90.0;

/// Maximum fraction of damage absorbed by armor
pub const ARMOR_CAP: f64 = 0.9;

/// Maximum dodge chance coming from dodge rating
pub const DODGE_CAP: f64 = 0.95;

// =====================================================
// Hit resolution
// =====================================================

/// Share of post-mitigation damage taken from life under the split flag
pub const SPLIT_LIFE_SHARE: f64 = 0.65;

/// Share of post-mitigation damage taken from mana under the split flag
pub const SPLIT_MANA_SHARE: f64 = 0.35;

/// Default lower bound of the per-element damage roll
pub const DEFAULT_VARIANCE_LOW: f64 = 0.9;

/// Default upper bound of the per-element damage roll
pub const DEFAULT_VARIANCE_HIGH: f64 = 1.1;

/// Critical multiplier of a damage source before caster stats are applied
pub const DEFAULT_CRIT_MULT: f64 = 1.5;

/// Interval between damage-over-time payload hits
pub const DEFAULT_DOT_TICK: f64 = 1.0;

/// Shortest accepted payload interval
pub const MIN_DOT_TICK: f64 = 0.001;

// =====================================================
// Progression
// =====================================================

/// Experience needed for the first level up
pub const BASE_EXP_TO_NEXT: u64 = 100;

/// Growth of `exp_to_next` on every level up
pub const EXP_GROWTH: f64 = 1.68;

// =====================================================
// Derived attribute bonuses (per attribute point)
// =====================================================

/// Flat maximum life per point of strength
pub const STR_LIFE_PER_POINT: f64 = 0.5;

/// Increased melee damage per point of strength
pub const STR_MELEE_PER_POINT: f64 = 0.002;

/// Flat maximum mana per point of intelligence
pub const INT_MANA_PER_POINT: f64 = 0.5;

/// Increased spell damage per point of intelligence
pub const INT_SPELL_PER_POINT: f64 = 0.002;

/// Increased critical chance per point of dexterity
pub const DEX_CRIT_PER_POINT: f64 = 0.002;

/// Increased ranged damage per point of dexterity
pub const DEX_RANGED_PER_POINT: f64 = 0.002;
