//! Stat keys and damage elements.
//!
//! `StatKey` is the closed set of attributes a creature can carry. Keys
//! serialize as the short strings used by authored data (`"life"`,
//! `"fire"`, `"fire_dmg"`, `"fire_flat"`, `"fire_pen"`), and an unknown
//! string is rejected at parse time rather than mapped to a default.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Damage elements, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Phys,
    Fire,
    Ice,
    Elec,
    Energy,
    Light,
    Dark,
}

impl Element {
    pub const ALL: [Element; 7] = [
        Element::Phys,
        Element::Fire,
        Element::Ice,
        Element::Elec,
        Element::Energy,
        Element::Light,
        Element::Dark,
    ];

    /// Fire, ice and lightning
    pub const ELEMENTAL: [Element; 3] = [Element::Fire, Element::Ice, Element::Elec];

    pub fn as_str(&self) -> &'static str {
        match self {
            Element::Phys => "phys",
            Element::Fire => "fire",
            Element::Ice => "ice",
            Element::Elec => "elec",
            Element::Energy => "energy",
            Element::Light => "light",
            Element::Dark => "dark",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Element {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Element::ALL
            .into_iter()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| CoreError::UnknownStatKey(s.to_string()))
    }
}

/// Every attribute a creature's stat block may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatKey {
    Life,
    Mana,
    LifeRegen,
    ManaRegen,
    Strength,
    Dexterity,
    Intelligence,
    /// Armor rating fed into the mitigation curve
    Defense,
    /// Flat mitigation fraction added on top of the armor curve
    Mitigation,
    /// Flat amount subtracted from every hit
    AbsDefense,
    ExpMult,
    HealFactor,
    CritRate,
    CritDamage,
    CritResistance,
    Dodge,
    DodgeRating,
    Precision,
    Block,
    ItemQuantity,
    ItemRarity,
    Speed,
    CastSpeed,
    MeleeDamage,
    RangedDamage,
    SpellDamage,
    Resistance(Element),
    DamagePct(Element),
    FlatDamage(Element),
    Penetration(Element),
}

/// Keys with a single scalar value and no element parameter
pub const SCALAR_KEYS: [StatKey; 26] = [
    StatKey::Life,
    StatKey::Mana,
    StatKey::LifeRegen,
    StatKey::ManaRegen,
    StatKey::Strength,
    StatKey::Dexterity,
    StatKey::Intelligence,
    StatKey::Defense,
    StatKey::Mitigation,
    StatKey::AbsDefense,
    StatKey::ExpMult,
    StatKey::HealFactor,
    StatKey::CritRate,
    StatKey::CritDamage,
    StatKey::CritResistance,
    StatKey::Dodge,
    StatKey::DodgeRating,
    StatKey::Precision,
    StatKey::Block,
    StatKey::ItemQuantity,
    StatKey::ItemRarity,
    StatKey::Speed,
    StatKey::CastSpeed,
    StatKey::MeleeDamage,
    StatKey::RangedDamage,
    StatKey::SpellDamage,
];

impl StatKey {
    /// Every key, scalar keys first, then the four per-element families
    pub fn all() -> impl Iterator<Item = StatKey> {
        SCALAR_KEYS.into_iter().chain(Element::ALL.into_iter().flat_map(|e| {
            [
                StatKey::Resistance(e),
                StatKey::DamagePct(e),
                StatKey::FlatDamage(e),
                StatKey::Penetration(e),
            ]
        }))
    }

    pub fn as_key(&self) -> String {
        match self {
            StatKey::Resistance(e) => e.as_str().to_string(),
            StatKey::DamagePct(e) => format!("{e}_dmg"),
            StatKey::FlatDamage(e) => format!("{e}_flat"),
            StatKey::Penetration(e) => format!("{e}_pen"),
            scalar => scalar.scalar_str().to_string(),
        }
    }

    fn scalar_str(&self) -> &'static str {
        match self {
            StatKey::Life => "life",
            StatKey::Mana => "mana",
            StatKey::LifeRegen => "life_regen",
            StatKey::ManaRegen => "mana_regen",
            StatKey::Strength => "str",
            StatKey::Dexterity => "dex",
            StatKey::Intelligence => "int",
            StatKey::Defense => "def",
            StatKey::Mitigation => "mitigation",
            StatKey::AbsDefense => "abs_def",
            StatKey::ExpMult => "exp_mult",
            StatKey::HealFactor => "heal_factor",
            StatKey::CritRate => "crit_rate",
            StatKey::CritDamage => "crit_dmg",
            StatKey::CritResistance => "crit_res",
            StatKey::Dodge => "dodge",
            StatKey::DodgeRating => "dodge_rating",
            StatKey::Precision => "precision",
            StatKey::Block => "block",
            StatKey::ItemQuantity => "item_quant",
            StatKey::ItemRarity => "item_qual",
            StatKey::Speed => "speed",
            StatKey::CastSpeed => "cast_speed",
            StatKey::MeleeDamage => "melee_dmg",
            StatKey::RangedDamage => "ranged_dmg",
            StatKey::SpellDamage => "spell_dmg",
            StatKey::Resistance(_)
            | StatKey::DamagePct(_)
            | StatKey::FlatDamage(_)
            | StatKey::Penetration(_) => unreachable!("element keys have no static name"),
        }
    }

    /// The ressource whose regeneration this key drives, if any
    pub fn regen_of(&self) -> Option<StatKey> {
        match self {
            StatKey::LifeRegen => Some(StatKey::Life),
            StatKey::ManaRegen => Some(StatKey::Mana),
            _ => None,
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl FromStr for StatKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(key) = SCALAR_KEYS.into_iter().find(|k| k.scalar_str() == s) {
            return Ok(key);
        }
        let (element, family) = match s.split_once('_') {
            Some((element, family)) => (element, Some(family)),
            None => (s, None),
        };
        let element: Element = element.parse()?;
        match family {
            None => Ok(StatKey::Resistance(element)),
            Some("dmg") => Ok(StatKey::DamagePct(element)),
            Some("flat") => Ok(StatKey::FlatDamage(element)),
            Some("pen") => Ok(StatKey::Penetration(element)),
            Some(_) => Err(CoreError::UnknownStatKey(s.to_string())),
        }
    }
}

impl TryFrom<String> for StatKey {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatKey> for String {
    fn from(key: StatKey) -> Self {
        key.as_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_parses_back() {
        for key in StatKey::all() {
            let parsed: StatKey = key.as_key().parse().unwrap();
            assert_eq!(parsed, key);
        }
        assert_eq!(StatKey::all().count(), 26 + 28);
    }

    #[test]
    fn test_element_families() {
        assert_eq!(StatKey::Resistance(Element::Fire).as_key(), "fire");
        assert_eq!(StatKey::DamagePct(Element::Dark).as_key(), "dark_dmg");
        assert_eq!(StatKey::FlatDamage(Element::Phys).as_key(), "phys_flat");
        assert_eq!(StatKey::Penetration(Element::Energy).as_key(), "energy_pen");
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!("fyre".parse::<StatKey>().is_err());
        assert!("fire_resist".parse::<StatKey>().is_err());
        assert!("".parse::<StatKey>().is_err());
    }

    #[test]
    fn test_serde_uses_string_form() {
        let json = serde_json::to_string(&StatKey::CritDamage).unwrap();
        assert_eq!(json, "\"crit_dmg\"");
        let key: StatKey = serde_json::from_str("\"ice_pen\"").unwrap();
        assert_eq!(key, StatKey::Penetration(Element::Ice));
        assert!(serde_json::from_str::<StatKey>("\"water\"").is_err());
    }
}
