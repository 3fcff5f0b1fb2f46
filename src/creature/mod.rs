//! Creature: the aggregate every combat operation goes through.
//!
//! A creature owns its stat block, its affliction arena, its active buff
//! list and its worn gear. Afflictions live once in the arena; the buff
//! list and every stat they modify hold ids. Durations are decremented
//! exactly once per tick, here, and expired ids are pruned from every
//! holder in the same pass.
//!
//! Not thread-safe to share: a creature is mutated synchronously inside a
//! simulation step and nothing else may touch it during that step.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, trace};

use crate::constants::MIN_DOT_TICK;
use crate::engine::{CombatConfig, DerivedBonusConfig, SimContext};
use crate::error::{CoreError, CoreResult};
use crate::flags::{Flag, StatKey};
use crate::numerics::range_stat::RangeStatRecord;
use crate::numerics::ressource::RessourceRecord;
use crate::numerics::stat::StatRecord;
use crate::numerics::{
    import_afflictions, resolve_indices, Affliction, AfflictionArena, AfflictionId, ExportTable,
    RangeStat, Ressource, Stat,
};

pub mod block;
pub mod combat;
pub mod gear;

pub use block::StatEntry;
pub use combat::HitOutcome;
pub use gear::Equipped;

use crate::equipment::{GearSlot, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatureId(pub u32);

/// Per-creature copy of the progression rules it was built with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreatureRules {
    pub derived: DerivedBonusConfig,
    pub exp_growth: f64,
}

impl From<&CombatConfig> for CreatureRules {
    fn from(config: &CombatConfig) -> Self {
        Self {
            derived: config.derived,
            exp_growth: config.exp_growth,
        }
    }
}

impl Default for CreatureRules {
    fn default() -> Self {
        Self::from(&CombatConfig::default())
    }
}

pub(crate) fn missing(creature: &str, key: StatKey) -> CoreError {
    CoreError::MissingStat {
        creature: creature.to_string(),
        key,
    }
}

#[derive(Debug, Clone)]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    pub level: u32,
    pub exp: u64,
    pub exp_to_next: u64,
    pub ability_points: u32,
    stats: BTreeMap<StatKey, StatEntry>,
    buffs: Vec<AfflictionId>,
    arena: AfflictionArena,
    gear: BTreeMap<GearSlot, Equipped>,
    rules: CreatureRules,
}

impl Creature {
    /// New level-1 creature with the default stat block, at full life and mana
    pub fn new(name: impl Into<String>, ctx: &mut SimContext) -> Self {
        let id = ctx.next_creature_id();
        Self::with_id(id, name, &ctx.config)
    }

    pub fn with_id(id: CreatureId, name: impl Into<String>, config: &CombatConfig) -> Self {
        let mut creature = Self {
            id,
            name: name.into(),
            level: 1,
            exp: 0,
            exp_to_next: config.base_exp_to_next,
            ability_points: 0,
            stats: block::default_block(),
            buffs: Vec::new(),
            arena: AfflictionArena::new(),
            gear: BTreeMap::new(),
            rules: CreatureRules::from(config),
        };
        creature.apply_derived_bonuses();
        creature.refill();
        creature
    }

    // =====================================================
    // Stat access
    // =====================================================

    pub fn has_key(&self, key: StatKey) -> bool {
        match key.regen_of() {
            Some(pool) => matches!(self.stats.get(&pool), Some(StatEntry::Pool(_))),
            None => self.stats.contains_key(&key),
        }
    }

    /// Computed value of `key`. Pools report their maximum.
    pub fn stat_value(&self, key: StatKey) -> CoreResult<f64> {
        if let Some(pool_key) = key.regen_of() {
            return match self.stats.get(&pool_key) {
                Some(StatEntry::Pool(pool)) => Ok(pool.regen.get_value(&self.arena)),
                _ => Err(missing(&self.name, key)),
            };
        }
        self.stats
            .get(&key)
            .map(|entry| entry.value(&self.arena))
            .ok_or_else(|| missing(&self.name, key))
    }

    pub fn entry(&self, key: StatKey) -> Option<&StatEntry> {
        self.stats.get(&key)
    }

    pub(crate) fn entry_mut(&mut self, key: StatKey) -> Option<&mut StatEntry> {
        self.stats.get_mut(&key)
    }

    pub fn stats(&self) -> impl Iterator<Item = (&StatKey, &StatEntry)> {
        self.stats.iter()
    }

    pub fn pool(&self, key: StatKey) -> CoreResult<&Ressource> {
        match self.stats.get(&key) {
            Some(StatEntry::Pool(pool)) => Ok(pool),
            _ => Err(missing(&self.name, key)),
        }
    }

    pub(crate) fn pool_mut(&mut self, key: StatKey) -> CoreResult<(&mut Ressource, &AfflictionArena)> {
        match self.stats.get_mut(&key) {
            Some(StatEntry::Pool(pool)) => Ok((pool, &self.arena)),
            _ => Err(missing(&self.name, key)),
        }
    }

    pub(crate) fn range(&self, key: StatKey) -> CoreResult<&RangeStat> {
        match self.stats.get(&key) {
            Some(StatEntry::Range(range)) => Ok(range),
            _ => Err(missing(&self.name, key)),
        }
    }

    /// Base `Stat` behind `key`, for authoring (templates, scaling)
    pub fn base_stat_mut(&mut self, key: StatKey) -> CoreResult<&mut Stat> {
        if let Some(pool_key) = key.regen_of() {
            return match self.stats.get_mut(&pool_key) {
                Some(StatEntry::Pool(pool)) => Ok(&mut pool.regen),
                _ => Err(missing(&self.name, key)),
            };
        }
        match self.stats.get_mut(&key) {
            Some(entry) => Ok(entry.stat_mut()),
            None => Err(missing(&self.name, key)),
        }
    }

    pub fn life(&self) -> f64 {
        self.pool(StatKey::Life).map_or(0.0, |p| p.current())
    }

    pub fn mana(&self) -> f64 {
        self.pool(StatKey::Mana).map_or(0.0, |p| p.current())
    }

    pub fn is_alive(&self) -> bool {
        self.life() > 0.0
    }

    pub fn arena(&self) -> &AfflictionArena {
        &self.arena
    }

    pub fn rules(&self) -> &CreatureRules {
        &self.rules
    }

    /// Active buff ids, in application order
    pub fn buffs(&self) -> &[AfflictionId] {
        &self.buffs
    }

    pub fn active_afflictions(&self) -> impl Iterator<Item = &Affliction> {
        self.buffs.iter().filter_map(|id| self.arena.get(*id))
    }

    pub fn affliction(&self, name: &str) -> Option<&Affliction> {
        self.active_afflictions().find(|a| a.name == name)
    }

    /// Refill every pool to its maximum
    pub fn refill(&mut self) {
        for entry in self.stats.values_mut() {
            if let StatEntry::Pool(pool) = entry {
                pool.refill(&self.arena);
            }
        }
    }

    // =====================================================
    // Afflictions
    // =====================================================

    fn targets_of(affliction: &Affliction) -> Vec<StatKey> {
        let mut targets = Vec::new();
        for key in affliction.flags.iter().flat_map(|f| f.targets()) {
            if !targets.contains(key) {
                targets.push(*key);
            }
        }
        targets
    }

    /// Fail if any stat `affliction` targets is missing from the block
    pub(crate) fn check_targets(&self, affliction: &Affliction) -> CoreResult<()> {
        for key in Self::targets_of(affliction) {
            if !self.has_key(key) {
                error!(
                    creature = %self.name,
                    affliction = %affliction.name,
                    key = %key,
                    "affliction targets a stat this creature does not have"
                );
                return Err(missing(&self.name, key));
            }
        }
        Ok(())
    }

    /// Apply `affliction` to every stat its flags select and record it in
    /// the buff list.
    ///
    /// Targets are validated first: on error the creature is unchanged.
    /// A payload firing more often than `MIN_DOT_TICK` is refused.
    pub fn afflict(&mut self, affliction: Affliction) -> CoreResult<AfflictionId> {
        check_payload(&affliction)?;
        self.check_targets(&affliction)?;
        Ok(self.afflict_checked(affliction))
    }

    pub(crate) fn afflict_checked(&mut self, mut affliction: Affliction) -> AfflictionId {
        if !affliction.stackable && !affliction.refreshable {
            if let Some(stored) = self.affliction(&affliction.name) {
                affliction.duration = stored.duration;
            }
        }
        let targets = Self::targets_of(&affliction);
        let name = affliction.name.clone();
        let duration = affliction.duration;
        let stackable = affliction.stackable;
        let refreshable = affliction.refreshable;

        let id = self.arena.insert(affliction);
        for key in targets {
            self.route(key, id);
        }

        if stackable {
            self.buffs.push(id);
            if refreshable {
                for other in &self.buffs {
                    if let Some(a) = self.arena.get_mut(*other).filter(|a| a.name == name) {
                        a.duration = duration;
                    }
                }
            }
            trace!(creature = %self.name, affliction = %name, "affliction stacked");
            return id;
        }

        let existing = self
            .buffs
            .iter()
            .position(|other| self.arena.get(*other).is_some_and(|a| a.name == name));
        match existing {
            Some(pos) => {
                let old = std::mem::replace(&mut self.buffs[pos], id);
                self.detach(old);
                trace!(creature = %self.name, affliction = %name, "affliction replaced");
            }
            None => {
                self.buffs.push(id);
                trace!(creature = %self.name, affliction = %name, "affliction applied");
            }
        }
        id
    }

    fn route(&mut self, key: StatKey, id: AfflictionId) {
        if let Some(pool_key) = key.regen_of() {
            if let Some(StatEntry::Pool(pool)) = self.stats.get_mut(&pool_key) {
                pool.regen.afflict(id, &mut self.arena);
            }
            return;
        }
        if let Some(entry) = self.stats.get_mut(&key) {
            entry.afflict(id, &mut self.arena);
        }
    }

    /// Drop `id` from every stat and free it. The buff list is left alone.
    fn detach(&mut self, id: AfflictionId) {
        for entry in self.stats.values_mut() {
            entry.remove_id(id, &self.arena);
        }
        self.arena.remove(id);
        for entry in self.stats.values_mut() {
            if let StatEntry::Pool(pool) = entry {
                pool.clamp_current(&self.arena);
            }
        }
    }

    /// Remove one affliction instance from the buff list and every stat
    pub(crate) fn remove_id(&mut self, id: AfflictionId) {
        self.buffs.retain(|x| *x != id);
        self.detach(id);
    }

    /// Remove every affliction named `name`. Returns how many were removed.
    pub fn remove_affliction(&mut self, name: &str) -> usize {
        let doomed: Vec<AfflictionId> = self
            .buffs
            .iter()
            .copied()
            .filter(|id| self.arena.get(*id).is_some_and(|a| a.name == name))
            .collect();
        self.buffs.retain(|id| !doomed.contains(id));
        for entry in self.stats.values_mut() {
            entry.remove_affliction(name, &self.arena);
        }
        for id in &doomed {
            self.arena.remove(*id);
        }
        if !doomed.is_empty() {
            trace!(creature = %self.name, affliction = %name, count = doomed.len(), "affliction removed");
        }
        doomed.len()
    }

    /// Semantic flags carried by active buffs
    pub fn gather_flags(&self) -> BTreeSet<Flag> {
        self.active_afflictions()
            .flat_map(|a| a.flags.iter().copied())
            .collect()
    }

    pub fn can_act(&self) -> bool {
        !self.active_afflictions().any(|a| a.has_flag(Flag::Stunned))
    }

    // =====================================================
    // Tick
    // =====================================================

    /// Advance one logical frame.
    ///
    /// Decrements each buff once, runs pool regeneration and per-tick
    /// effects, resolves damage payloads that fell due (never dodged or
    /// blocked), then prunes expired afflictions from every holder.
    pub fn tick(&mut self, ctx: &mut SimContext) -> CoreResult<Vec<HitOutcome>> {
        let dt = ctx.config.tick_dt;
        let mut payloads = Vec::new();
        for id in &self.buffs {
            if let Some(a) = self.arena.get_mut(*id) {
                let fired = a.tick(dt);
                if let Some(payload) = &a.payload {
                    payloads.extend(std::iter::repeat(payload.clone()).take(fired as usize));
                }
            }
        }

        for entry in self.stats.values_mut() {
            if let StatEntry::Pool(pool) = entry {
                pool.tick(dt, &self.arena);
            }
        }

        let mut outcomes = Vec::with_capacity(payloads.len());
        for mut payload in payloads {
            payload.ignore_dodge = true;
            payload.ignore_block = true;
            outcomes.push(self.damage(&payload, ctx)?);
        }

        self.prune_expired();
        Ok(outcomes)
    }

    fn prune_expired(&mut self) {
        let expired: Vec<AfflictionId> = self
            .buffs
            .iter()
            .copied()
            .filter(|id| self.arena.get(*id).map_or(true, |a| a.is_expired()))
            .collect();
        if expired.is_empty() {
            return;
        }
        self.buffs.retain(|id| !expired.contains(id));
        for entry in self.stats.values_mut() {
            entry.prune(&self.arena);
        }
        for id in expired {
            if let Some(a) = self.arena.remove(id) {
                trace!(creature = %self.name, affliction = %a.name, "affliction expired");
            }
        }
    }

    // =====================================================
    // Progression
    // =====================================================

    /// Grant experience scaled by `exp_mult`. Returns levels gained.
    pub fn gain_exp(&mut self, amount: u64) -> u32 {
        let mult = self.stat_value(StatKey::ExpMult).unwrap_or(1.0);
        let gained = (amount as f64 * mult).round().max(0.0) as u64;
        self.exp += gained;
        let mut levels = 0;
        while self.exp >= self.exp_to_next {
            self.exp -= self.exp_to_next;
            self.level_up();
            levels += 1;
        }
        levels
    }

    fn level_up(&mut self) {
        self.level += 1;
        self.ability_points += 1;
        let next = (self.exp_to_next as f64 * self.rules.exp_growth).round() as u64;
        self.exp_to_next = next.max(1);
        self.apply_derived_bonuses();
        info!(creature = %self.name, level = self.level, "level up");
    }

    /// Apply every stat's level scaling for `level`, then recompute bonuses
    pub fn scale(&mut self, level: u32) {
        for entry in self.stats.values_mut() {
            entry.scale(level);
            if let StatEntry::Pool(pool) = entry {
                pool.regen.scale(level);
            }
        }
        self.level = level.max(1);
        self.apply_derived_bonuses();
        self.refill();
        debug!(creature = %self.name, level, "creature scaled");
    }

    // =====================================================
    // Export / import
    // =====================================================

    pub fn export(&self) -> CreatureRecord {
        let mut table = ExportTable::new(&self.arena);
        let buffs = table.indices(&self.buffs);
        let stats = self
            .stats
            .iter()
            .map(|(key, entry)| {
                let record = match entry {
                    StatEntry::Plain(stat) => StatEntryRecord::Plain(stat.to_record(&mut table)),
                    StatEntry::Pool(pool) => StatEntryRecord::Pool(pool.to_record(&mut table)),
                    StatEntry::Range(range) => StatEntryRecord::Range(range.to_record(&mut table)),
                };
                (*key, record)
            })
            .collect();
        let gear = self
            .gear
            .iter()
            .map(|(slot, equipped)| {
                let record = EquippedRecord {
                    item: equipped.item.clone(),
                    afflictions: table.indices(&equipped.afflictions),
                };
                (*slot, record)
            })
            .collect();
        CreatureRecord {
            id: self.id,
            name: self.name.clone(),
            level: self.level,
            exp: self.exp,
            exp_to_next: self.exp_to_next,
            ability_points: self.ability_points,
            rules: self.rules,
            afflictions: table.into_afflictions(),
            buffs,
            stats,
            gear,
        }
    }

    pub fn import(record: CreatureRecord) -> CoreResult<Self> {
        record.afflictions.iter().try_for_each(check_payload)?;
        let mut arena = AfflictionArena::new();
        let ids = import_afflictions(record.afflictions, &mut arena);
        let mut stats = BTreeMap::new();
        for (key, entry) in record.stats {
            let entry = match entry {
                StatEntryRecord::Plain(r) => StatEntry::Plain(Stat::from_record(r, &ids)?),
                StatEntryRecord::Pool(r) => StatEntry::Pool(Ressource::from_record(r, &ids)?),
                StatEntryRecord::Range(r) => StatEntry::Range(RangeStat::from_record(r, &ids)?),
            };
            stats.insert(key, entry);
        }
        let mut gear = BTreeMap::new();
        for (slot, equipped) in record.gear {
            gear.insert(
                slot,
                Equipped {
                    item: equipped.item,
                    afflictions: resolve_indices(&equipped.afflictions, &ids)?,
                },
            );
        }
        let mut creature = Self {
            id: record.id,
            name: record.name,
            level: record.level,
            exp: record.exp,
            exp_to_next: record.exp_to_next,
            ability_points: record.ability_points,
            buffs: resolve_indices(&record.buffs, &ids)?,
            stats,
            arena,
            gear,
            rules: record.rules,
        };
        for entry in creature.stats.values_mut() {
            if let StatEntry::Pool(pool) = entry {
                pool.clamp_current(&creature.arena);
            }
        }
        Ok(creature)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string(&self.export())?)
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        Self::import(serde_json::from_str(json)?)
    }

    pub(crate) fn gear_map(&self) -> &BTreeMap<GearSlot, Equipped> {
        &self.gear
    }

    pub(crate) fn gear_map_mut(&mut self) -> &mut BTreeMap<GearSlot, Equipped> {
        &mut self.gear
    }

    pub fn equipped(&self, slot: GearSlot) -> Option<&Item> {
        self.gear.get(&slot).map(|e| &e.item)
    }
}

/// Serialized stat slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatEntryRecord {
    Plain(StatRecord),
    Pool(RessourceRecord),
    Range(RangeStatRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquippedRecord {
    pub item: Item,
    pub afflictions: Vec<usize>,
}

fn check_payload(affliction: &Affliction) -> CoreResult<()> {
    if affliction.payload.is_some() && !(affliction.dot_tick >= MIN_DOT_TICK) {
        return Err(CoreError::InvalidConfig(format!(
            "affliction '{}' fires its payload every {}, below {MIN_DOT_TICK}",
            affliction.name, affliction.dot_tick
        )));
    }
    Ok(())
}

/// Save-file form of a creature. Every modifier list refers to
/// `afflictions` by index; buff-list entries come first, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureRecord {
    pub id: CreatureId,
    pub name: String,
    pub level: u32,
    pub exp: u64,
    pub exp_to_next: u64,
    pub ability_points: u32,
    #[serde(default)]
    pub rules: CreatureRules,
    pub afflictions: Vec<Affliction>,
    pub buffs: Vec<usize>,
    pub stats: BTreeMap<StatKey, StatEntryRecord>,
    #[serde(default)]
    pub gear: BTreeMap<GearSlot, EquippedRecord>,
}
