//! Semantic flags carried by afflictions, damage sources and items.
//!
//! `Flag` is a closed set: every flag is either a stat target (routed to
//! one or several `StatKey`s through a static fan-out table), a modifier
//! layer tag, a tick behaviour, or a marker consumed elsewhere. Routing is
//! an exhaustive match, so adding a flag forces a routing decision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

pub mod keys;

pub use keys::{Element, StatKey, SCALAR_KEYS};

const ALL_RESISTANCES: [StatKey; 7] = [
    StatKey::Resistance(Element::Phys),
    StatKey::Resistance(Element::Fire),
    StatKey::Resistance(Element::Ice),
    StatKey::Resistance(Element::Elec),
    StatKey::Resistance(Element::Energy),
    StatKey::Resistance(Element::Light),
    StatKey::Resistance(Element::Dark),
];

const ELEMENTAL_RESISTANCES: [StatKey; 3] = [
    StatKey::Resistance(Element::Fire),
    StatKey::Resistance(Element::Ice),
    StatKey::Resistance(Element::Elec),
];

const ALL_DAMAGE: [StatKey; 7] = [
    StatKey::DamagePct(Element::Phys),
    StatKey::DamagePct(Element::Fire),
    StatKey::DamagePct(Element::Ice),
    StatKey::DamagePct(Element::Elec),
    StatKey::DamagePct(Element::Energy),
    StatKey::DamagePct(Element::Light),
    StatKey::DamagePct(Element::Dark),
];

const ELEMENTAL_DAMAGE: [StatKey; 3] = [
    StatKey::DamagePct(Element::Fire),
    StatKey::DamagePct(Element::Ice),
    StatKey::DamagePct(Element::Elec),
];

/// Closed set of semantic tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Flag {
    // Modifier layers
    Flat,
    Hex,
    Boon,
    Curse,
    Bless,

    // Per-tick ressource effects
    Hot,
    Dot,
    MultHot,
    MultDot,

    /// Direct stat target
    Target(StatKey),

    // Aggregate targets
    AllResistances,
    ElementalResistances,
    AllDamage,
    ElementalDamage,

    // Damage delivery, scaled by the caster's melee/ranged/spell stat
    Melee,
    Ranged,
    Spell,

    // Behaviour markers
    /// Incoming damage is split between life and mana
    MindOverMatter,
    Stunned,
    CannotBeBlocked,
    CannotBeDodged,

    // Item markers
    Gear,
    Consumable,
    Helm,
    Armor,
    Gloves,
    Belt,
    Boots,
    Weapon,
    Offhand,
    Relic,
    Amulet,
    Ring,
}

impl Flag {
    const NAMED: [Flag; 32] = [
        Flag::Flat,
        Flag::Hex,
        Flag::Boon,
        Flag::Curse,
        Flag::Bless,
        Flag::Hot,
        Flag::Dot,
        Flag::MultHot,
        Flag::MultDot,
        Flag::AllResistances,
        Flag::ElementalResistances,
        Flag::AllDamage,
        Flag::ElementalDamage,
        Flag::Melee,
        Flag::Ranged,
        Flag::Spell,
        Flag::MindOverMatter,
        Flag::Stunned,
        Flag::CannotBeBlocked,
        Flag::CannotBeDodged,
        Flag::Gear,
        Flag::Consumable,
        Flag::Helm,
        Flag::Armor,
        Flag::Gloves,
        Flag::Belt,
        Flag::Boots,
        Flag::Weapon,
        Flag::Offhand,
        Flag::Relic,
        Flag::Amulet,
        Flag::Ring,
    ];

    /// Stat keys this flag forwards an affliction to
    pub fn targets(&self) -> &[StatKey] {
        match self {
            Flag::Target(key) => std::slice::from_ref(key),
            Flag::AllResistances => &ALL_RESISTANCES,
            Flag::ElementalResistances => &ELEMENTAL_RESISTANCES,
            Flag::AllDamage => &ALL_DAMAGE,
            Flag::ElementalDamage => &ELEMENTAL_DAMAGE,
            Flag::Flat
            | Flag::Hex
            | Flag::Boon
            | Flag::Curse
            | Flag::Bless
            | Flag::Hot
            | Flag::Dot
            | Flag::MultHot
            | Flag::MultDot
            | Flag::Melee
            | Flag::Ranged
            | Flag::Spell
            | Flag::MindOverMatter
            | Flag::Stunned
            | Flag::CannotBeBlocked
            | Flag::CannotBeDodged
            | Flag::Gear
            | Flag::Consumable
            | Flag::Helm
            | Flag::Armor
            | Flag::Gloves
            | Flag::Belt
            | Flag::Boots
            | Flag::Weapon
            | Flag::Offhand
            | Flag::Relic
            | Flag::Amulet
            | Flag::Ring => &[],
        }
    }

    pub fn as_key(&self) -> String {
        match self {
            Flag::Target(key) => key.as_key(),
            named => named.named_str().to_string(),
        }
    }

    fn named_str(&self) -> &'static str {
        match self {
            Flag::Flat => "flat",
            Flag::Hex => "hex",
            Flag::Boon => "boon",
            Flag::Curse => "curse",
            Flag::Bless => "blessing",
            Flag::Hot => "heal_over_time",
            Flag::Dot => "damage_over_time",
            Flag::MultHot => "multiplicative_heal_over_time",
            Flag::MultDot => "multiplicative_damage_over_time",
            Flag::AllResistances => "all_resistances",
            Flag::ElementalResistances => "elemental_resistances",
            Flag::AllDamage => "all_damage",
            Flag::ElementalDamage => "elemental_damage",
            Flag::Melee => "melee",
            Flag::Ranged => "ranged",
            Flag::Spell => "spell",
            Flag::MindOverMatter => "armor_mind_over_matter",
            Flag::Stunned => "stunned",
            Flag::CannotBeBlocked => "cant_be_blocked",
            Flag::CannotBeDodged => "cant_be_dodged",
            Flag::Gear => "gear",
            Flag::Consumable => "consumable",
            Flag::Helm => "helms",
            Flag::Armor => "armors",
            Flag::Gloves => "gloves",
            Flag::Belt => "belts",
            Flag::Boots => "boots",
            Flag::Weapon => "weapons",
            Flag::Offhand => "offhand",
            Flag::Relic => "relics",
            Flag::Amulet => "amulets",
            Flag::Ring => "rings",
            Flag::Target(_) => unreachable!("target flags are named by their stat key"),
        }
    }
}

impl From<StatKey> for Flag {
    fn from(key: StatKey) -> Self {
        Flag::Target(key)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl FromStr for Flag {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(flag) = Flag::NAMED.into_iter().find(|f| f.named_str() == s) {
            return Ok(flag);
        }
        s.parse::<StatKey>().map(Flag::Target)
    }
}

impl TryFrom<String> for Flag {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Flag> for String {
    fn from(flag: Flag) -> Self {
        flag.as_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_fan_out() {
        assert_eq!(Flag::AllResistances.targets().len(), 7);
        assert_eq!(Flag::ElementalResistances.targets().len(), 3);
        assert_eq!(Flag::AllDamage.targets().len(), 7);
        assert!(Flag::AllResistances
            .targets()
            .contains(&StatKey::Resistance(Element::Dark)));
    }

    #[test]
    fn test_direct_target() {
        let flag = Flag::Target(StatKey::Strength);
        assert_eq!(flag.targets(), &[StatKey::Strength]);
    }

    #[test]
    fn test_meta_flags_route_nowhere() {
        for flag in [Flag::Boon, Flag::Dot, Flag::Gear, Flag::MindOverMatter] {
            assert!(flag.targets().is_empty(), "{flag} should not target stats");
        }
    }

    #[test]
    fn test_flag_string_roundtrip() {
        for flag in Flag::NAMED {
            assert_eq!(flag.as_key().parse::<Flag>().unwrap(), flag);
        }
        assert_eq!("fire_pen".parse::<Flag>().unwrap(), Flag::Target(StatKey::Penetration(Element::Fire)));
        assert!("heal_over_tim".parse::<Flag>().is_err());
    }
}
