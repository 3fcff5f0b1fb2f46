//! Spendable, regenerating stat (life, mana).

use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::flags::Flag;
use crate::numerics::stat::{place, StatRecord};
use crate::numerics::{
    import_afflictions, resolve_indices, AfflictionArena, AfflictionId, ExportTable, Snapshot, Stat,
};

/// A `Stat` whose computed value is the maximum of a separately tracked
/// `current`. `0 <= current <= max` holds after every public call.
#[derive(Debug, Clone, PartialEq)]
pub struct Ressource {
    pub stat: Stat,
    current: f64,
    /// Amount restored per time unit
    pub regen: Stat,
    /// Additive per-tick effects (`Dot` / `Hot`)
    buffs: Vec<AfflictionId>,
    /// Per-tick effects proportional to `current` (`MultDot` / `MultHot`)
    buffs_multi: Vec<AfflictionId>,
}

impl Ressource {
    /// Starts full
    pub fn new(name: impl Into<String>, max: f64, regen_rate: f64) -> Self {
        let name = name.into();
        let regen = Stat::new(format!("{name}_regen"), regen_rate);
        Self {
            stat: Stat::new(name, max),
            current: max.max(0.0),
            regen,
            buffs: Vec::new(),
            buffs_multi: Vec::new(),
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn max(&self, arena: &AfflictionArena) -> f64 {
        self.stat.get_value(arena)
    }

    fn clamp(&mut self, arena: &AfflictionArena) {
        let max = self.max(arena).max(0.0);
        self.current = self.current.min(max).max(0.0);
    }

    /// Add `delta` to `current`, clamped. Returns the change actually applied.
    pub fn modify(&mut self, delta: f64, arena: &AfflictionArena) -> f64 {
        let before = self.current;
        self.current += delta;
        self.clamp(arena);
        self.current - before
    }

    pub fn refill(&mut self, arena: &AfflictionArena) {
        self.current = self.max(arena).max(0.0);
    }

    /// Spend `cost` if enough is available
    pub fn try_spend(&mut self, cost: f64, arena: &AfflictionArena) -> bool {
        if cost > self.current {
            return false;
        }
        self.modify(-cost, arena);
        true
    }

    /// Regeneration then per-tick buffs, clamped once at the end
    pub fn tick(&mut self, dt: f64, arena: &AfflictionArena) {
        self.current += self.regen.get_value(arena) * dt;
        for buff in self.buffs.iter().filter_map(|id| arena.get(*id)) {
            self.current += buff.value;
        }
        for buff in self.buffs_multi.iter().filter_map(|id| arena.get(*id)) {
            self.current += buff.value * self.current;
        }
        self.clamp(arena);
    }

    pub fn afflict(&mut self, id: AfflictionId, arena: &mut AfflictionArena) {
        self.stat.afflict(id, arena);
        let Some(affliction) = arena.get(id) else {
            return;
        };
        let additive = affliction.has_flag(Flag::Dot) || affliction.has_flag(Flag::Hot);
        let proportional = affliction.has_flag(Flag::MultDot) || affliction.has_flag(Flag::MultHot);
        if additive {
            place(&mut self.buffs, id, arena);
        }
        if proportional {
            place(&mut self.buffs_multi, id, arena);
        }
        self.clamp(arena);
    }

    pub fn remove_affliction(&mut self, name: &str, arena: &AfflictionArena) {
        self.stat.remove_affliction(name, arena);
        self.regen.remove_affliction(name, arena);
        let keep = |id: &AfflictionId| arena.get(*id).is_some_and(|a| a.name != name);
        self.buffs.retain(keep);
        self.buffs_multi.retain(keep);
        self.clamp(arena);
    }

    pub fn remove_id(&mut self, id: AfflictionId, arena: &AfflictionArena) {
        self.stat.remove_id(id);
        self.regen.remove_id(id);
        self.buffs.retain(|x| *x != id);
        self.buffs_multi.retain(|x| *x != id);
        self.clamp(arena);
    }

    pub fn contains(&self, id: AfflictionId) -> bool {
        self.stat.contains(id)
            || self.regen.contains(id)
            || self.buffs.contains(&id) || self.buffs_multi.contains(&id)
    }

    pub fn prune(&mut self, arena: &AfflictionArena) {
        self.stat.prune(arena);
        self.regen.prune(arena);
        let keep = |id: &AfflictionId| arena.get(*id).is_some_and(|a| !a.is_expired());
        self.buffs.retain(keep);
        self.buffs_multi.retain(keep);
        self.clamp(arena);
    }

    pub fn reset(&mut self, arena: &AfflictionArena) {
        self.stat.reset();
        self.regen.reset();
        self.buffs.clear();
        self.buffs_multi.clear();
        self.clamp(arena);
    }

    pub fn gather_afflictions(&self) -> Vec<AfflictionId> {
        let mut all = self.stat.gather_afflictions();
        all.extend(self.regen.gather_afflictions());
        all.extend(&self.buffs);
        all.extend(&self.buffs_multi);
        all
    }

    pub fn buffs(&self) -> &[AfflictionId] {
        &self.buffs
    }

    pub fn buffs_multi(&self) -> &[AfflictionId] {
        &self.buffs_multi
    }

    pub(crate) fn to_record(&self, table: &mut ExportTable<'_>) -> RessourceRecord {
        RessourceRecord {
            stat: self.stat.to_record(table),
            current: self.current,
            regen: self.regen.to_record(table),
            buffs: table.indices(&self.buffs),
            buffs_multi: table.indices(&self.buffs_multi),
        }
    }

    /// `current` is restored verbatim; callers clamp once every holder is rebuilt
    pub(crate) fn from_record(record: RessourceRecord, ids: &[AfflictionId]) -> CoreResult<Self> {
        Ok(Self {
            stat: Stat::from_record(record.stat, ids)?,
            current: record.current,
            regen: Stat::from_record(record.regen, ids)?,
            buffs: resolve_indices(&record.buffs, ids)?,
            buffs_multi: resolve_indices(&record.buffs_multi, ids)?,
        })
    }

    pub fn export(&self, arena: &AfflictionArena) -> Snapshot<RessourceRecord> {
        let mut table = ExportTable::new(arena);
        let record = self.to_record(&mut table);
        Snapshot {
            afflictions: table.into_afflictions(),
            record,
        }
    }

    pub fn import(
        snapshot: Snapshot<RessourceRecord>,
        arena: &mut AfflictionArena,
    ) -> CoreResult<Self> {
        let ids = import_afflictions(snapshot.afflictions, arena);
        let mut ressource = Self::from_record(snapshot.record, &ids)?;
        ressource.clamp(arena);
        Ok(ressource)
    }

    pub(crate) fn clamp_current(&mut self, arena: &AfflictionArena) {
        self.clamp(arena);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RessourceRecord {
    pub stat: StatRecord,
    pub current: f64,
    pub regen: StatRecord,
    #[serde(default)]
    pub buffs: Vec<usize>,
    #[serde(default)]
    pub buffs_multi: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::Affliction;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_modify_clamps() {
        let arena = AfflictionArena::new();
        let mut life = Ressource::new("life", 100.0, 0.0);
        assert_eq!(life.modify(-30.0, &arena), -30.0);
        assert_eq!(life.current(), 70.0);
        assert_eq!(life.modify(500.0, &arena), 30.0);
        assert_eq!(life.current(), 100.0);
        life.modify(-1000.0, &arena);
        assert_eq!(life.current(), 0.0);
    }

    #[test]
    fn test_regen_uses_dt() {
        let arena = AfflictionArena::new();
        let mut mana = Ressource::new("mana", 50.0, 2.0);
        mana.modify(-10.0, &arena);
        mana.tick(0.5, &arena);
        assert!((mana.current() - 41.0).abs() < EPSILON);
    }

    #[test]
    fn test_additive_and_proportional_buffs() {
        let mut arena = AfflictionArena::new();
        let mut life = Ressource::new("life", 100.0, 0.0);
        life.modify(-50.0, &arena);

        let hot = arena.insert(Affliction::new("mend", 5.0, 2.0, vec![Flag::Hot]));
        life.afflict(hot, &mut arena);
        life.tick(0.016, &arena);
        assert!((life.current() - 55.0).abs() < EPSILON);

        let mdot = arena.insert(Affliction::new("rot", -0.1, 2.0, vec![Flag::MultDot]));
        life.afflict(mdot, &mut arena);
        life.tick(0.016, &arena);
        // +5 then -10% of 60
        assert!((life.current() - 54.0).abs() < EPSILON);
        assert_eq!(life.buffs(), &[hot]);
        assert_eq!(life.buffs_multi(), &[mdot]);
    }

    #[test]
    fn test_max_reduction_reclamps() {
        let mut arena = AfflictionArena::new();
        let mut life = Ressource::new("life", 100.0, 0.0);
        let curse = arena.insert(Affliction::new("wither", 0.5, 2.0, vec![Flag::Curse]));
        life.afflict(curse, &mut arena);
        assert_eq!(life.max(&arena), 50.0);
        assert_eq!(life.current(), 50.0);
    }

    #[test]
    fn test_try_spend() {
        let arena = AfflictionArena::new();
        let mut mana = Ressource::new("mana", 20.0, 0.0);
        assert!(mana.try_spend(15.0, &arena));
        assert!(!mana.try_spend(15.0, &arena));
        assert_eq!(mana.current(), 5.0);
    }

    #[test]
    fn test_export_import() {
        let mut arena = AfflictionArena::new();
        let mut life = Ressource::new("life", 80.0, 1.5);
        let id = arena.insert(Affliction::new("vigor", 20.0, -1.0, vec![Flag::Flat]));
        life.afflict(id, &mut arena);
        life.modify(-33.25, &arena);

        let snapshot = life.export(&arena);
        let mut other = AfflictionArena::new();
        let restored = Ressource::import(snapshot, &mut other).unwrap();
        assert_eq!(restored.current(), life.current());
        assert_eq!(restored.max(&other), 100.0);
        assert_eq!(restored.regen.get_value(&other), 1.5);
    }
}
