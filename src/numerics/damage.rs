//! Damage descriptors.
//!
//! A `Damage` is a pure value: per-element multipliers, penetration, crit
//! parameters and the variance band. `Creature::recalculate_damage` turns
//! an authored source into the caster-bound value that is actually resolved.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use crate::constants::{DEFAULT_CRIT_MULT, DEFAULT_VARIANCE_HIGH, DEFAULT_VARIANCE_LOW};
use crate::creature::CreatureId;
use crate::flags::{Element, Flag};

/// One number per damage element.
///
/// Unknown element names in serialized data are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ElementValues {
    pub phys: f64,
    pub fire: f64,
    pub ice: f64,
    pub elec: f64,
    pub energy: f64,
    pub light: f64,
    pub dark: f64,
}

impl ElementValues {
    pub fn from_fn(mut f: impl FnMut(Element) -> f64) -> Self {
        let mut values = Self::default();
        for element in Element::ALL {
            values[element] = f(element);
        }
        values
    }

    pub fn iter(&self) -> impl Iterator<Item = (Element, f64)> + '_ {
        Element::ALL.into_iter().map(move |e| (e, self[e]))
    }

    pub fn total(&self) -> f64 {
        self.iter().map(|(_, v)| v).sum()
    }
}

impl Index<Element> for ElementValues {
    type Output = f64;

    fn index(&self, element: Element) -> &f64 {
        match element {
            Element::Phys => &self.phys,
            Element::Fire => &self.fire,
            Element::Ice => &self.ice,
            Element::Elec => &self.elec,
            Element::Energy => &self.energy,
            Element::Light => &self.light,
            Element::Dark => &self.dark,
        }
    }
}

impl IndexMut<Element> for ElementValues {
    fn index_mut(&mut self, element: Element) -> &mut f64 {
        match element {
            Element::Phys => &mut self.phys,
            Element::Fire => &mut self.fire,
            Element::Ice => &mut self.ice,
            Element::Elec => &mut self.elec,
            Element::Energy => &mut self.energy,
            Element::Light => &mut self.light,
            Element::Dark => &mut self.dark,
        }
    }
}

fn default_crit_mult() -> f64 {
    DEFAULT_CRIT_MULT
}

fn default_variance() -> (f64, f64) {
    (DEFAULT_VARIANCE_LOW, DEFAULT_VARIANCE_HIGH)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Damage {
    /// Overall power of the source
    pub coeff: f64,
    #[serde(default)]
    pub per_element: ElementValues,
    /// Subtracted from the target's resistance, per element
    #[serde(default)]
    pub penetration: ElementValues,
    #[serde(default)]
    pub is_crit: bool,
    #[serde(default = "default_crit_mult")]
    pub crit_mult: f64,
    #[serde(default)]
    pub flags: Vec<Flag>,
    #[serde(default)]
    pub ignore_dodge: bool,
    #[serde(default)]
    pub ignore_block: bool,
    /// Caster this value is bound to
    #[serde(default)]
    pub origin: Option<CreatureId>,
    /// Caster precision, opposed to the target's dodge rating
    #[serde(default)]
    pub precision: f64,
    /// Uniform roll band applied per element
    #[serde(default = "default_variance")]
    pub variance: (f64, f64),
}

impl Default for Damage {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Damage {
    pub fn new(coeff: f64) -> Self {
        Self {
            coeff,
            per_element: ElementValues::default(),
            penetration: ElementValues::default(),
            is_crit: false,
            crit_mult: DEFAULT_CRIT_MULT,
            flags: Vec::new(),
            ignore_dodge: false,
            ignore_block: false,
            origin: None,
            precision: 0.0,
            variance: default_variance(),
        }
    }

    pub fn with_element(mut self, element: Element, value: f64) -> Self {
        self.per_element[element] = value;
        self
    }

    pub fn with_penetration(mut self, element: Element, value: f64) -> Self {
        self.penetration[element] = value;
        self
    }

    pub fn with_flags(mut self, flags: Vec<Flag>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_variance(mut self, low: f64, high: f64) -> Self {
        self.variance = (low, high);
        self
    }

    pub fn unavoidable(mut self) -> Self {
        self.ignore_dodge = true;
        self.ignore_block = true;
        self
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn ignores_dodge(&self) -> bool {
        self.ignore_dodge || self.has_flag(Flag::CannotBeDodged)
    }

    pub fn ignores_block(&self) -> bool {
        self.ignore_block || self.has_flag(Flag::CannotBeBlocked)
    }

    /// Roll every element independently within the variance band.
    ///
    /// Returns `(damage, penetration)`. Always draws seven values so the
    /// random stream advances the same way whatever the element mix.
    pub fn get_damage<R: Rng>(&self, rng: &mut R) -> (ElementValues, ElementValues) {
        let (a, b) = self.variance;
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let rolled = ElementValues::from_fn(|element| {
            let roll = rng.gen_range(low..=high);
            self.coeff * self.per_element[element] * roll
        });
        (rolled, self.penetration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_rolls_stay_in_band() {
        let dmg = Damage::new(2.0)
            .with_element(Element::Fire, 10.0)
            .with_element(Element::Phys, 5.0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        for _ in 0..100 {
            let (rolled, _) = dmg.get_damage(&mut rng);
            assert!(rolled.fire >= 18.0 - 1e-9 && rolled.fire <= 22.0 + 1e-9);
            assert!(rolled.phys >= 9.0 - 1e-9 && rolled.phys <= 11.0 + 1e-9);
            assert_eq!(rolled.ice, 0.0);
        }
    }

    #[test]
    fn test_rolls_are_independent_per_element() {
        let dmg = Damage::new(1.0)
            .with_element(Element::Fire, 1.0)
            .with_element(Element::Ice, 1.0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let differs = (0..50).any(|_| {
            let (rolled, _) = dmg.get_damage(&mut rng);
            (rolled.fire - rolled.ice).abs() > 1e-12
        });
        assert!(differs);
    }

    #[test]
    fn test_fixed_variance_is_exact() {
        let dmg = Damage::new(1.2)
            .with_element(Element::Dark, 10.0)
            .with_variance(1.0, 1.0);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let (rolled, _) = dmg.get_damage(&mut rng);
        assert!((rolled.dark - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_pierce_flags() {
        let dmg = Damage::new(1.0).with_flags(vec![Flag::CannotBeDodged]);
        assert!(dmg.ignores_dodge());
        assert!(!dmg.ignores_block());
        assert!(Damage::new(1.0).unavoidable().ignores_block());
    }

    #[test]
    fn test_unknown_element_rejected() {
        let bad = r#"{"coeff": 1.0, "per_element": {"water": 3.0}}"#;
        assert!(serde_json::from_str::<Damage>(bad).is_err());
        let good = r#"{"coeff": 1.0, "per_element": {"light": 3.0}}"#;
        let dmg: Damage = serde_json::from_str(good).unwrap();
        assert_eq!(dmg.per_element.light, 3.0);
        assert_eq!(dmg.variance, (0.9, 1.1));
    }
}
