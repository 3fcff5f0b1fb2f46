//! Afflictions (timed buffs and debuffs) and the arena that owns them.
//!
//! An affliction is held by exactly one `AfflictionArena`. The creature's
//! buff list and every stat it modifies store only an `AfflictionId`, so a
//! single removal from the arena invalidates every holder at once and the
//! duration is decremented in one place.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DOT_TICK, INFINITE_DURATION, TIME_EPSILON};
use crate::flags::Flag;
use crate::numerics::damage::Damage;

fn default_true() -> bool {
    true
}

fn default_dot_tick() -> f64 {
    DEFAULT_DOT_TICK
}

/// A named, time-boxed modifier.
///
/// Two afflictions are equal when their names match; value and remaining
/// duration play no part. Reapplying a non-stackable affliction under an
/// existing name therefore replaces the stored instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affliction {
    pub name: String,
    pub value: f64,
    /// Remaining time; negative means infinite
    pub duration: f64,
    #[serde(default)]
    pub flags: Vec<Flag>,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default = "default_true")]
    pub refreshable: bool,
    /// Interval between payload hits
    #[serde(default = "default_dot_tick")]
    pub dot_tick: f64,
    /// Time accumulated toward the next payload hit
    #[serde(default)]
    pub dot_timer: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Damage>,
}

impl Affliction {
    pub fn new(name: impl Into<String>, value: f64, duration: f64, flags: Vec<Flag>) -> Self {
        Self {
            name: name.into(),
            value,
            duration,
            flags,
            stackable: false,
            refreshable: true,
            dot_tick: DEFAULT_DOT_TICK,
            dot_timer: 0.0,
            payload: None,
        }
    }

    /// Affliction that never expires (gear, derived bonuses)
    pub fn permanent(name: impl Into<String>, value: f64, flags: Vec<Flag>) -> Self {
        Self::new(name, value, INFINITE_DURATION, flags)
    }

    pub fn stackable(mut self) -> Self {
        self.stackable = true;
        self
    }

    pub fn with_refresh(mut self, refreshable: bool) -> Self {
        self.refreshable = refreshable;
        self
    }

    /// Attach a damage payload fired every `interval` time units
    pub fn with_payload(mut self, damage: Damage, interval: f64) -> Self {
        self.payload = Some(damage);
        self.dot_tick = interval;
        self
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_infinite(&self) -> bool {
        self.duration < 0.0
    }

    pub fn is_expired(&self) -> bool {
        !self.is_infinite() && self.duration <= 0.0
    }

    /// Advance by `dt`. Returns how many payload hits fell due.
    ///
    /// Only the owning creature calls this, once per logical frame.
    pub fn tick(&mut self, dt: f64) -> u32 {
        if !self.is_infinite() {
            self.duration -= dt;
            if self.duration < TIME_EPSILON {
                self.duration = 0.0;
            }
        }
        if self.payload.is_none() || self.dot_tick <= 0.0 {
            return 0;
        }
        self.dot_timer += dt;
        let mut fired = 0;
        while self.dot_timer + TIME_EPSILON >= self.dot_tick {
            self.dot_timer -= self.dot_tick;
            fired += 1;
        }
        fired
    }
}

impl PartialEq for Affliction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Affliction {}

// =====================================================
// Arena
// =====================================================

/// Stable handle to an affliction stored in an `AfflictionArena`.
///
/// A handle whose slot has been freed (and possibly reused) is stale:
/// lookups through it return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AfflictionId {
    index: u32,
    generation: u32,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    entry: Option<Affliction>,
}

/// Generational slot storage for afflictions
#[derive(Debug, Clone, Default)]
pub struct AfflictionArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl AfflictionArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, affliction: Affliction) -> AfflictionId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(affliction);
            return AfflictionId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            entry: Some(affliction),
        });
        AfflictionId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: AfflictionId) -> Option<&Affliction> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    pub fn get_mut(&mut self, id: AfflictionId) -> Option<&mut Affliction> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_mut())
    }

    pub fn contains(&self, id: AfflictionId) -> bool {
        self.get(id).is_some()
    }

    /// Free the slot, invalidating every copy of `id`
    pub fn remove(&mut self, id: AfflictionId) -> Option<Affliction> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let removed = slot.entry.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (AfflictionId, &Affliction)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry.as_ref().map(|a| {
                (
                    AfflictionId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    a,
                )
            })
        })
    }
}
