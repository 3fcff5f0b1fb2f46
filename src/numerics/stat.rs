//! Layered numeric attribute.
//!
//! value = clamp(round((base + Σflat) · (1 + Σincrease) · Π(1 + mult), precision), min, max)
//!
//! Increase and multiplier entries tagged `Hex` / `Curse` count negatively.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_PRECISION;
use crate::error::CoreResult;
use crate::flags::Flag;
use crate::numerics::{
    resolve_indices, round_to, Affliction, AfflictionArena, AfflictionId, ExportTable, Snapshot,
};

/// Optional lower and upper bound of a computed value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cap {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

impl Cap {
    pub fn clamp(&self, value: f64) -> f64 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }
}

/// Modifier layer an affliction lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Flat,
    Increase,
    Multiplier,
}

impl Layer {
    fn of(affliction: &Affliction) -> impl Iterator<Item = Layer> + '_ {
        [
            (Layer::Increase, Flag::Hex, Flag::Boon),
            (Layer::Multiplier, Flag::Curse, Flag::Bless),
            (Layer::Flat, Flag::Flat, Flag::Flat),
        ]
        .into_iter()
        .filter(|(_, a, b)| affliction.has_flag(*a) || affliction.has_flag(*b))
        .map(|(layer, _, _)| layer)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stat {
    pub name: String,
    pub base: f64,
    flats: Vec<AfflictionId>,
    increases: Vec<AfflictionId>,
    multipliers: Vec<AfflictionId>,
    pub cap: Cap,
    pub precision: u8,
    /// Added to (or multiplied into) `base` per level by `scale`
    pub scaling_value: f64,
    pub multiplicative_scaling: bool,
}

impl Stat {
    pub fn new(name: impl Into<String>, base: f64) -> Self {
        Self {
            name: name.into(),
            base,
            flats: Vec::new(),
            increases: Vec::new(),
            multipliers: Vec::new(),
            cap: Cap::default(),
            precision: DEFAULT_PRECISION,
            scaling_value: 0.0,
            multiplicative_scaling: false,
        }
    }

    pub fn with_cap(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.cap = Cap { min, max };
        self
    }

    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_scaling(mut self, value: f64, multiplicative: bool) -> Self {
        self.scaling_value = value;
        self.multiplicative_scaling = multiplicative;
        self
    }

    fn live<'a>(
        ids: &'a [AfflictionId],
        arena: &'a AfflictionArena,
    ) -> impl Iterator<Item = &'a Affliction> + 'a {
        ids.iter().filter_map(move |id| arena.get(*id))
    }

    fn signed(affliction: &Affliction, malus: Flag) -> f64 {
        if affliction.has_flag(malus) {
            -affliction.value
        } else {
            affliction.value
        }
    }

    pub fn flat_total(&self, arena: &AfflictionArena) -> f64 {
        Self::live(&self.flats, arena).map(|a| a.value).sum()
    }

    pub fn increase_total(&self, arena: &AfflictionArena) -> f64 {
        Self::live(&self.increases, arena)
            .map(|a| Self::signed(a, Flag::Hex))
            .sum()
    }

    /// Product of every multiplier entry, in insertion order
    pub fn multiplier_product(&self, arena: &AfflictionArena) -> f64 {
        Self::live(&self.multipliers, arena)
            .fold(1.0, |acc, a| acc * (1.0 + Self::signed(a, Flag::Curse)))
    }

    pub fn get_value(&self, arena: &AfflictionArena) -> f64 {
        let raw = (self.base + self.flat_total(arena))
            * (1.0 + self.increase_total(arena))
            * self.multiplier_product(arena);
        self.cap.clamp(round_to(raw, self.precision))
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut Vec<AfflictionId> {
        match layer {
            Layer::Flat => &mut self.flats,
            Layer::Increase => &mut self.increases,
            Layer::Multiplier => &mut self.multipliers,
        }
    }

    /// Route `id` into the layers its flags select.
    pub fn afflict(&mut self, id: AfflictionId, arena: &mut AfflictionArena) {
        let Some(affliction) = arena.get(id) else {
            return;
        };
        let layers: Vec<Layer> = Layer::of(affliction).collect();
        for layer in layers {
            place(self.layer_mut(layer), id, arena);
        }
    }

    /// Remove every entry named `name`, plus any stale ids
    pub fn remove_affliction(&mut self, name: &str, arena: &AfflictionArena) {
        let keep = |id: &AfflictionId| arena.get(*id).is_some_and(|a| a.name != name);
        self.flats.retain(keep);
        self.increases.retain(keep);
        self.multipliers.retain(keep);
    }

    pub fn remove_id(&mut self, id: AfflictionId) {
        self.flats.retain(|x| *x != id);
        self.increases.retain(|x| *x != id);
        self.multipliers.retain(|x| *x != id);
    }

    pub fn contains(&self, id: AfflictionId) -> bool {
        self.flats.contains(&id) || self.increases.contains(&id) || self.multipliers.contains(&id)
    }

    /// Drop entries that are expired or no longer in the arena.
    /// Durations are never decremented here.
    pub fn prune(&mut self, arena: &AfflictionArena) {
        let keep = |id: &AfflictionId| arena.get(*id).is_some_and(|a| !a.is_expired());
        self.flats.retain(keep);
        self.increases.retain(keep);
        self.multipliers.retain(keep);
    }

    pub fn scale(&mut self, level: u32) {
        if self.multiplicative_scaling {
            self.base *= self.scaling_value * level as f64;
        } else {
            self.base += self.scaling_value * level as f64;
        }
    }

    pub fn reset(&mut self) {
        self.flats.clear();
        self.increases.clear();
        self.multipliers.clear();
    }

    /// All modifier ids: flats, then increases, then multipliers
    pub fn gather_afflictions(&self) -> Vec<AfflictionId> {
        let mut all = self.flats.clone();
        all.extend(&self.increases);
        all.extend(&self.multipliers);
        all
    }

    pub fn flats(&self) -> &[AfflictionId] {
        &self.flats
    }

    pub fn increases(&self) -> &[AfflictionId] {
        &self.increases
    }

    pub fn multipliers(&self) -> &[AfflictionId] {
        &self.multipliers
    }

    // =====================================================
    // Export / import
    // =====================================================

    pub(crate) fn to_record(&self, table: &mut ExportTable<'_>) -> StatRecord {
        StatRecord {
            name: self.name.clone(),
            base: self.base,
            flats: table.indices(&self.flats),
            increases: table.indices(&self.increases),
            multipliers: table.indices(&self.multipliers),
            cap: self.cap,
            precision: self.precision,
            scaling_value: self.scaling_value,
            multiplicative_scaling: self.multiplicative_scaling,
        }
    }

    pub(crate) fn from_record(record: StatRecord, ids: &[AfflictionId]) -> CoreResult<Self> {
        Ok(Self {
            flats: resolve_indices(&record.flats, ids)?,
            increases: resolve_indices(&record.increases, ids)?,
            multipliers: resolve_indices(&record.multipliers, ids)?,
            name: record.name,
            base: record.base,
            cap: record.cap,
            precision: record.precision,
            scaling_value: record.scaling_value,
            multiplicative_scaling: record.multiplicative_scaling,
        })
    }

    pub fn export(&self, arena: &AfflictionArena) -> Snapshot<StatRecord> {
        let mut table = ExportTable::new(arena);
        let record = self.to_record(&mut table);
        Snapshot {
            afflictions: table.into_afflictions(),
            record,
        }
    }

    /// Rebuild a stat, inserting its afflictions into `arena`
    pub fn import(snapshot: Snapshot<StatRecord>, arena: &mut AfflictionArena) -> CoreResult<Self> {
        let ids = crate::numerics::import_afflictions(snapshot.afflictions, arena);
        Self::from_record(snapshot.record, &ids)
    }
}

/// Insert `id` into one modifier list.
///
/// A non-stackable affliction replaces a same-named entry in place. A
/// stackable one is appended, and when refreshable every same-named entry
/// of the list takes its duration.
pub(crate) fn place(list: &mut Vec<AfflictionId>, id: AfflictionId, arena: &mut AfflictionArena) {
    let Some(affliction) = arena.get(id) else {
        return;
    };
    let name = affliction.name.clone();
    let duration = affliction.duration;

    if affliction.stackable {
        let refreshable = affliction.refreshable;
        if !list.contains(&id) {
            list.push(id);
        }
        if refreshable {
            for other in list.iter() {
                if let Some(a) = arena.get_mut(*other).filter(|a| a.name == name) {
                    a.duration = duration;
                }
            }
        }
        return;
    }

    let existing = list
        .iter()
        .position(|other| arena.get(*other).is_some_and(|a| a.name == name));
    match existing {
        Some(pos) => list[pos] = id,
        None => list.push(id),
    }
}

/// Serialized form of a `Stat`; modifier entries are affliction indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub name: String,
    pub base: f64,
    #[serde(default)]
    pub flats: Vec<usize>,
    #[serde(default)]
    pub increases: Vec<usize>,
    #[serde(default)]
    pub multipliers: Vec<usize>,
    #[serde(default)]
    pub cap: Cap,
    #[serde(default = "default_precision")]
    pub precision: u8,
    #[serde(default)]
    pub scaling_value: f64,
    #[serde(default)]
    pub multiplicative_scaling: bool,
}

fn default_precision() -> u8 {
    DEFAULT_PRECISION
}
