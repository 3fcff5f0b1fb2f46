//! Stat pair with a lower and an upper bound, rolled uniformly.
//!
//! Afflictions named `*_min` modify the lower bound, `*_max` the upper
//! bound, anything else both.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::numerics::stat::StatRecord;
use crate::numerics::{import_afflictions, AfflictionArena, AfflictionId, ExportTable, Snapshot, Stat};

#[derive(Debug, Clone, PartialEq)]
pub struct RangeStat {
    pub name: String,
    pub lower: Stat,
    pub upper: Stat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Lower,
    Upper,
    Both,
}

impl Bound {
    fn of(name: &str) -> Self {
        if name.ends_with("_min") {
            Bound::Lower
        } else if name.ends_with("_max") {
            Bound::Upper
        } else {
            Bound::Both
        }
    }
}

impl RangeStat {
    pub fn new(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        let name = name.into();
        Self {
            lower: Stat::new(format!("{name}_lower"), lower),
            upper: Stat::new(format!("{name}_upper"), upper),
            name,
        }
    }

    /// (lower, upper)
    pub fn get_value(&self, arena: &AfflictionArena) -> (f64, f64) {
        (self.lower.get_value(arena), self.upper.get_value(arena))
    }

    /// Uniform draw between the bounds, whichever order they end up in
    pub fn roll<R: Rng>(&self, arena: &AfflictionArena, rng: &mut R) -> f64 {
        let (a, b) = self.get_value(arena);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        if lo == hi {
            return lo;
        }
        rng.gen_range(lo..=hi)
    }

    pub fn afflict(&mut self, id: AfflictionId, arena: &mut AfflictionArena) {
        let Some(affliction) = arena.get(id) else {
            return;
        };
        match Bound::of(&affliction.name) {
            Bound::Lower => self.lower.afflict(id, arena),
            Bound::Upper => self.upper.afflict(id, arena),
            Bound::Both => {
                self.lower.afflict(id, arena);
                self.upper.afflict(id, arena);
            }
        }
    }

    pub fn remove_affliction(&mut self, name: &str, arena: &AfflictionArena) {
        self.lower.remove_affliction(name, arena);
        self.upper.remove_affliction(name, arena);
    }

    pub fn remove_id(&mut self, id: AfflictionId) {
        self.lower.remove_id(id);
        self.upper.remove_id(id);
    }

    pub fn contains(&self, id: AfflictionId) -> bool {
        self.lower.contains(id) || self.upper.contains(id)
    }

    pub fn prune(&mut self, arena: &AfflictionArena) {
        self.lower.prune(arena);
        self.upper.prune(arena);
    }

    pub fn scale(&mut self, level: u32) {
        self.lower.scale(level);
        self.upper.scale(level);
    }

    pub fn reset(&mut self) {
        self.lower.reset();
        self.upper.reset();
    }

    pub fn gather_afflictions(&self) -> Vec<AfflictionId> {
        let mut all = self.lower.gather_afflictions();
        all.extend(self.upper.gather_afflictions());
        all
    }

    pub(crate) fn to_record(&self, table: &mut ExportTable<'_>) -> RangeStatRecord {
        RangeStatRecord {
            name: self.name.clone(),
            lower: self.lower.to_record(table),
            upper: self.upper.to_record(table),
        }
    }

    pub(crate) fn from_record(record: RangeStatRecord, ids: &[AfflictionId]) -> CoreResult<Self> {
        Ok(Self {
            name: record.name,
            lower: Stat::from_record(record.lower, ids)?,
            upper: Stat::from_record(record.upper, ids)?,
        })
    }

    pub fn export(&self, arena: &AfflictionArena) -> Snapshot<RangeStatRecord> {
        let mut table = ExportTable::new(arena);
        let record = self.to_record(&mut table);
        Snapshot {
            afflictions: table.into_afflictions(),
            record,
        }
    }

    pub fn import(
        snapshot: Snapshot<RangeStatRecord>,
        arena: &mut AfflictionArena,
    ) -> CoreResult<Self> {
        let ids = import_afflictions(snapshot.afflictions, arena);
        Self::from_record(snapshot.record, &ids)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeStatRecord {
    pub name: String,
    pub lower: StatRecord,
    pub upper: StatRecord,
}
