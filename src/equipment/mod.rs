//! Items, affixes and gear slots.
//!
//! An item is inert data. Equipping turns each affix and implicit into an
//! infinite, gear-tagged affliction named after the slot, so two items in
//! different slots never replace each other's modifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::flags::Flag;
use crate::numerics::Affliction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GearSlot {
    Helm,
    Armor,
    Gloves,
    Belt,
    Boots,
    Weapon,
    Offhand,
    Relic,
    Amulet,
    RingLeft,
    RingRight,
}

impl GearSlot {
    pub const ALL: [GearSlot; 11] = [
        GearSlot::Helm,
        GearSlot::Armor,
        GearSlot::Gloves,
        GearSlot::Belt,
        GearSlot::Boots,
        GearSlot::Weapon,
        GearSlot::Offhand,
        GearSlot::Relic,
        GearSlot::Amulet,
        GearSlot::RingLeft,
        GearSlot::RingRight,
    ];

    /// Item category flag this slot accepts
    pub fn category(&self) -> Flag {
        match self {
            GearSlot::Helm => Flag::Helm,
            GearSlot::Armor => Flag::Armor,
            GearSlot::Gloves => Flag::Gloves,
            GearSlot::Belt => Flag::Belt,
            GearSlot::Boots => Flag::Boots,
            GearSlot::Weapon => Flag::Weapon,
            GearSlot::Offhand => Flag::Offhand,
            GearSlot::Relic => Flag::Relic,
            GearSlot::Amulet => Flag::Amulet,
            GearSlot::RingLeft | GearSlot::RingRight => Flag::Ring,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GearSlot::Helm => "helm",
            GearSlot::Armor => "armor",
            GearSlot::Gloves => "gloves",
            GearSlot::Belt => "belt",
            GearSlot::Boots => "boots",
            GearSlot::Weapon => "weapon",
            GearSlot::Offhand => "offhand",
            GearSlot::Relic => "relic",
            GearSlot::Amulet => "amulet",
            GearSlot::RingLeft => "ring_left",
            GearSlot::RingRight => "ring_right",
        }
    }
}

impl fmt::Display for GearSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single number, or a `(min, max)` pair feeding a ranged stat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AffixValue {
    Single(f64),
    Range(f64, f64),
}

/// One modifier line on an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Affix {
    pub name: String,
    pub flags: Vec<Flag>,
    pub value: AffixValue,
}

impl Affix {
    pub fn single(name: impl Into<String>, value: f64, flags: Vec<Flag>) -> Self {
        Self {
            name: name.into(),
            flags,
            value: AffixValue::Single(value),
        }
    }

    pub fn range(name: impl Into<String>, min: f64, max: f64, flags: Vec<Flag>) -> Self {
        Self {
            name: name.into(),
            flags,
            value: AffixValue::Range(min, max),
        }
    }

    /// Afflictions this affix grants while worn in `slot`.
    ///
    /// `Single` yields `<slot>_<name>_effect`; `Range` yields a stackable
    /// `..._effect_min` / `..._effect_max` pair for the two bounds.
    pub fn as_afflictions(&self, slot: GearSlot) -> Vec<Affliction> {
        let mut flags = self.flags.clone();
        if !flags.contains(&Flag::Gear) {
            flags.push(Flag::Gear);
        }
        let stem = format!("{slot}_{}_effect", self.name);
        match self.value {
            AffixValue::Single(value) => vec![Affliction::permanent(stem, value, flags)],
            AffixValue::Range(min, max) => vec![
                Affliction::permanent(format!("{stem}_min"), min, flags.clone()).stackable(),
                Affliction::permanent(format!("{stem}_max"), max, flags).stackable(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    /// Base type, e.g. "iron_helm"
    pub base: String,
    #[serde(default)]
    pub rarity: u8,
    #[serde(default)]
    pub flags: Vec<Flag>,
    #[serde(default)]
    pub affixes: Vec<Affix>,
    /// Modifiers inherent to the base type
    #[serde(default)]
    pub implicits: Vec<Affix>,
}

impl Item {
    pub fn new(name: impl Into<String>, base: impl Into<String>, flags: Vec<Flag>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            rarity: 0,
            flags,
            affixes: Vec::new(),
            implicits: Vec::new(),
        }
    }

    pub fn with_affix(mut self, affix: Affix) -> Self {
        self.affixes.push(affix);
        self
    }

    pub fn with_implicit(mut self, affix: Affix) -> Self {
        self.implicits.push(affix);
        self
    }

    pub fn is_gear(&self) -> bool {
        self.flags.contains(&Flag::Gear)
    }

    pub fn fits(&self, slot: GearSlot) -> bool {
        self.flags.contains(&slot.category())
    }

    /// Every affliction the item grants in `slot`: implicits first, then affixes
    pub fn afflictions_for(&self, slot: GearSlot) -> Vec<Affliction> {
        let implicits = self.implicits.iter().flat_map(|affix| {
            let mut list = affix.as_afflictions(slot);
            for a in &mut list {
                a.name = a.name.replacen("_effect", "_implicit_effect", 1);
            }
            list
        });
        implicits
            .chain(self.affixes.iter().flat_map(|affix| affix.as_afflictions(slot)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{Element, StatKey};

    fn ring() -> Item {
        Item::new("Band of Embers", "gold_ring", vec![Flag::Gear, Flag::Ring])
            .with_affix(Affix::single(
                "life",
                15.0,
                vec![Flag::Flat, Flag::Target(StatKey::Life)],
            ))
            .with_affix(Affix::range(
                "fire_flat",
                2.0,
                6.0,
                vec![Flag::Flat, Flag::Target(StatKey::FlatDamage(Element::Fire))],
            ))
    }

    #[test]
    fn test_affix_naming() {
        let list = ring().afflictions_for(GearSlot::RingLeft);
        let names: Vec<_> = list.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ring_left_life_effect",
                "ring_left_fire_flat_effect_min",
                "ring_left_fire_flat_effect_max",
            ]
        );
        assert!(list.iter().all(|a| a.is_infinite() && a.has_flag(Flag::Gear)));
        assert!(list[1].stackable && list[2].stackable);
        assert!(!list[0].stackable);
    }

    #[test]
    fn test_implicits_named_apart() {
        let item = Item::new("Cap", "leather_cap", vec![Flag::Gear, Flag::Helm])
            .with_implicit(Affix::single("def", 5.0, vec![Flag::Flat]))
            .with_affix(Affix::single("def", 9.0, vec![Flag::Flat]));
        let list = item.afflictions_for(GearSlot::Helm);
        assert_eq!(list[0].name, "helm_def_implicit_effect");
        assert_eq!(list[1].name, "helm_def_effect");
    }

    #[test]
    fn test_slot_fit() {
        let item = ring();
        assert!(item.is_gear());
        assert!(item.fits(GearSlot::RingLeft));
        assert!(item.fits(GearSlot::RingRight));
        assert!(!item.fits(GearSlot::Helm));
    }

    #[test]
    fn test_affix_value_serde() {
        let single: AffixValue = serde_json::from_str("3.5").unwrap();
        assert_eq!(single, AffixValue::Single(3.5));
        let range: AffixValue = serde_json::from_str("[1.0, 4.0]").unwrap();
        assert_eq!(range, AffixValue::Range(1.0, 4.0));
    }
}
