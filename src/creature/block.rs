//! Default stat block every creature starts from.

use std::collections::BTreeMap;

use crate::flags::StatKey;
use crate::numerics::{AfflictionArena, AfflictionId, RangeStat, Ressource, Stat};

const BASE_LIFE: f64 = 100.0;
const BASE_MANA: f64 = 50.0;
const BASE_MANA_REGEN: f64 = 2.0;
const BASE_ATTRIBUTE: f64 = 10.0;
const BASE_CRIT_RATE: f64 = 0.05;
const BASE_CRIT_DAMAGE: f64 = 1.5;
const RESISTANCE_CAP: f64 = 0.9;
const DODGE_STAT_CAP: f64 = 0.95;
const BLOCK_CAP: f64 = 0.75;

/// One slot of a stat block
#[derive(Debug, Clone, PartialEq)]
pub enum StatEntry {
    Plain(Stat),
    Pool(Ressource),
    Range(RangeStat),
}

impl StatEntry {
    /// Computed value. Pools report their maximum, ranges their midpoint.
    pub fn value(&self, arena: &AfflictionArena) -> f64 {
        match self {
            StatEntry::Plain(stat) => stat.get_value(arena),
            StatEntry::Pool(pool) => pool.max(arena),
            StatEntry::Range(range) => {
                let (lo, hi) = range.get_value(arena);
                (lo + hi) / 2.0
            }
        }
    }

    pub fn afflict(&mut self, id: AfflictionId, arena: &mut AfflictionArena) {
        match self {
            StatEntry::Plain(stat) => stat.afflict(id, arena),
            StatEntry::Pool(pool) => pool.afflict(id, arena),
            StatEntry::Range(range) => range.afflict(id, arena),
        }
    }

    pub fn remove_affliction(&mut self, name: &str, arena: &AfflictionArena) {
        match self {
            StatEntry::Plain(stat) => stat.remove_affliction(name, arena),
            StatEntry::Pool(pool) => pool.remove_affliction(name, arena),
            StatEntry::Range(range) => range.remove_affliction(name, arena),
        }
    }

    pub fn remove_id(&mut self, id: AfflictionId, arena: &AfflictionArena) {
        match self {
            StatEntry::Plain(stat) => stat.remove_id(id),
            StatEntry::Pool(pool) => pool.remove_id(id, arena),
            StatEntry::Range(range) => range.remove_id(id),
        }
    }

    pub fn contains(&self, id: AfflictionId) -> bool {
        match self {
            StatEntry::Plain(stat) => stat.contains(id),
            StatEntry::Pool(pool) => pool.contains(id),
            StatEntry::Range(range) => range.contains(id),
        }
    }

    pub fn prune(&mut self, arena: &AfflictionArena) {
        match self {
            StatEntry::Plain(stat) => stat.prune(arena),
            StatEntry::Pool(pool) => pool.prune(arena),
            StatEntry::Range(range) => range.prune(arena),
        }
    }

    pub fn scale(&mut self, level: u32) {
        match self {
            StatEntry::Plain(stat) => stat.scale(level),
            StatEntry::Pool(pool) => pool.stat.scale(level),
            StatEntry::Range(range) => range.scale(level),
        }
    }

    pub fn gather_afflictions(&self) -> Vec<AfflictionId> {
        match self {
            StatEntry::Plain(stat) => stat.gather_afflictions(),
            StatEntry::Pool(pool) => pool.gather_afflictions(),
            StatEntry::Range(range) => range.gather_afflictions(),
        }
    }

    /// Main `Stat` of the entry (lower bound for ranges)
    pub fn stat_mut(&mut self) -> &mut Stat {
        match self {
            StatEntry::Plain(stat) => stat,
            StatEntry::Pool(pool) => &mut pool.stat,
            StatEntry::Range(range) => &mut range.lower,
        }
    }
}

/// Base stat block. Regeneration keys live inside the life and mana pools.
pub fn default_block() -> BTreeMap<StatKey, StatEntry> {
    StatKey::all()
        .filter_map(|key| default_entry(key).map(|entry| (key, entry)))
        .collect()
}

fn default_entry(key: StatKey) -> Option<StatEntry> {
    let name = key.as_key();
    let plain = |base: f64| StatEntry::Plain(Stat::new(name.clone(), base));
    let entry = match key {
        StatKey::Life => StatEntry::Pool(Ressource::new(name.clone(), BASE_LIFE, 0.0)),
        StatKey::Mana => StatEntry::Pool(Ressource::new(name.clone(), BASE_MANA, BASE_MANA_REGEN)),
        StatKey::LifeRegen | StatKey::ManaRegen => return None,
        StatKey::Strength | StatKey::Dexterity | StatKey::Intelligence => plain(BASE_ATTRIBUTE),
        StatKey::CritRate => StatEntry::Plain(
            Stat::new(name.clone(), BASE_CRIT_RATE).with_cap(Some(0.0), Some(1.0)),
        ),
        StatKey::CritDamage => plain(BASE_CRIT_DAMAGE),
        StatKey::ExpMult
        | StatKey::HealFactor
        | StatKey::Speed
        | StatKey::CastSpeed
        | StatKey::MeleeDamage
        | StatKey::RangedDamage
        | StatKey::SpellDamage
        | StatKey::DamagePct(_) => plain(1.0),
        StatKey::Resistance(_) => {
            StatEntry::Plain(Stat::new(name.clone(), 0.0).with_cap(None, Some(RESISTANCE_CAP)))
        }
        StatKey::Dodge => StatEntry::Plain(
            Stat::new(name.clone(), 0.0).with_cap(Some(0.0), Some(DODGE_STAT_CAP)),
        ),
        StatKey::Block => {
            StatEntry::Plain(Stat::new(name.clone(), 0.0).with_cap(Some(0.0), Some(BLOCK_CAP)))
        }
        StatKey::CritResistance => {
            StatEntry::Plain(Stat::new(name.clone(), 0.0).with_cap(None, Some(1.0)))
        }
        StatKey::FlatDamage(_) => StatEntry::Range(RangeStat::new(name.clone(), 0.0, 0.0)),
        StatKey::Defense
        | StatKey::Mitigation
        | StatKey::AbsDefense
        | StatKey::DodgeRating
        | StatKey::Precision
        | StatKey::ItemQuantity
        | StatKey::ItemRarity
        | StatKey::Penetration(_) => plain(0.0),
    };
    Some(entry)
}
