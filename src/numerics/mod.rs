//! Numeric building blocks: afflictions, stats, ressources, damage.
//!
//! Stats never own afflictions. They hold `AfflictionId`s into an
//! `AfflictionArena` supplied by the caller (normally the creature that
//! owns both). Exported records replace ids with indices into a flat
//! affliction list so a shared affliction is written once.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};

pub mod affliction;
pub mod damage;
pub mod range_stat;
pub mod ressource;
pub mod stat;

pub use affliction::{Affliction, AfflictionArena, AfflictionId};
pub use damage::{Damage, ElementValues};
pub use range_stat::RangeStat;
pub use ressource::Ressource;
pub use stat::{Cap, Stat};

/// Round half away from zero to `precision` decimals
pub fn round_to(value: f64, precision: u8) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}

/// A record plus the afflictions its indices point into
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<R> {
    pub afflictions: Vec<Affliction>,
    pub record: R,
}

/// Assigns export indices to live affliction ids, first come first served.
pub(crate) struct ExportTable<'a> {
    arena: &'a AfflictionArena,
    order: Vec<AfflictionId>,
    index: HashMap<AfflictionId, usize>,
}

impl<'a> ExportTable<'a> {
    pub(crate) fn new(arena: &'a AfflictionArena) -> Self {
        Self {
            arena,
            order: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Index of `id` in the exported list; `None` for stale ids
    pub(crate) fn index_of(&mut self, id: AfflictionId) -> Option<usize> {
        if let Some(&i) = self.index.get(&id) {
            return Some(i);
        }
        self.arena.get(id)?;
        let i = self.order.len();
        self.order.push(id);
        self.index.insert(id, i);
        Some(i)
    }

    pub(crate) fn indices(&mut self, ids: &[AfflictionId]) -> Vec<usize> {
        ids.iter().filter_map(|id| self.index_of(*id)).collect()
    }

    pub(crate) fn into_afflictions(self) -> Vec<Affliction> {
        self.order
            .iter()
            .filter_map(|id| self.arena.get(*id).cloned())
            .collect()
    }
}

/// Insert exported afflictions into `arena`, returning their new ids in order
pub(crate) fn import_afflictions(
    afflictions: Vec<Affliction>,
    arena: &mut AfflictionArena,
) -> Vec<AfflictionId> {
    afflictions.into_iter().map(|a| arena.insert(a)).collect()
}

pub(crate) fn resolve_indices(indices: &[usize], ids: &[AfflictionId]) -> CoreResult<Vec<AfflictionId>> {
    indices
        .iter()
        .map(|&index| {
            ids.get(index).copied().ok_or(CoreError::DanglingAffliction {
                index,
                len: ids.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.235, 0), 1.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(22.0000001, 2), 22.0);
    }

    #[test]
    fn test_export_table_dedups() {
        let mut arena = AfflictionArena::new();
        let a = arena.insert(Affliction::new("a", 1.0, 1.0, vec![]));
        let b = arena.insert(Affliction::new("b", 2.0, 1.0, vec![]));
        let mut table = ExportTable::new(&arena);
        assert_eq!(table.indices(&[b, a, b]), vec![0, 1, 0]);
        let list = table.into_afflictions();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "b");
    }

    #[test]
    fn test_dangling_index_rejected() {
        let err = resolve_indices(&[0, 3], &[]).unwrap_err();
        assert!(matches!(err, CoreError::DanglingAffliction { index: 0, len: 0 }));
    }
}
