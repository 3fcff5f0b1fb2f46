//! Equipping items and the attribute-derived bonuses.

use tracing::{info, warn};

use crate::creature::Creature;
use crate::equipment::{GearSlot, Item};
use crate::error::{CoreError, EquipRejection, RejectReason};
use crate::flags::{Flag, StatKey};
use crate::numerics::{Affliction, AfflictionId};

/// An item in a slot plus the affliction instances it granted
#[derive(Debug, Clone, PartialEq)]
pub struct Equipped {
    pub item: Item,
    pub(crate) afflictions: Vec<AfflictionId>,
}

impl Equipped {
    pub fn afflictions(&self) -> &[AfflictionId] {
        &self.afflictions
    }
}

pub const STR_LIFE_BONUS: &str = "str_life_bonus";
pub const STR_MELEE_BONUS: &str = "str_melee_bonus";
pub const INT_MANA_BONUS: &str = "int_mana_bonus";
pub const INT_SPELL_BONUS: &str = "int_spell_bonus";
pub const DEX_CRIT_BONUS: &str = "dex_crit_bonus";
pub const DEX_RANGED_BONUS: &str = "dex_ranged_bonus";

impl Creature {
    /// Wear `item` in `slot`, returning whatever was there before.
    ///
    /// A rejected item comes back inside the error and the creature is
    /// left as it was.
    pub fn equip(&mut self, slot: GearSlot, item: Item) -> Result<Option<Item>, EquipRejection> {
        let reject = |item: Item, reason: RejectReason| {
            warn!(item = %item.name, %slot, ?reason, "equip rejected");
            Err(EquipRejection { item, slot, reason })
        };
        if !item.is_gear() {
            return reject(item, RejectReason::NotGear);
        }
        if !item.fits(slot) {
            return reject(item, RejectReason::WrongSlot);
        }
        let granted = item.afflictions_for(slot);
        for affliction in &granted {
            if let Err(CoreError::MissingStat { key, .. }) = self.check_targets(affliction) {
                return reject(item, RejectReason::MissingStat(key));
            }
        }

        let previous = self.take_slot(slot);
        let afflictions = granted
            .into_iter()
            .map(|a| self.afflict_checked(a))
            .collect();
        info!(creature = %self.name, item = %item.name, %slot, "item equipped");
        self.gear_map_mut().insert(slot, Equipped { item, afflictions });
        self.apply_derived_bonuses();
        Ok(previous)
    }

    pub fn unequip(&mut self, slot: GearSlot) -> Option<Item> {
        let item = self.take_slot(slot)?;
        info!(creature = %self.name, item = %item.name, %slot, "item unequipped");
        self.apply_derived_bonuses();
        Some(item)
    }

    fn take_slot(&mut self, slot: GearSlot) -> Option<Item> {
        let equipped = self.gear_map_mut().remove(&slot)?;
        for id in equipped.afflictions {
            self.remove_id(id);
        }
        Some(equipped.item)
    }

    pub fn gear(&self) -> impl Iterator<Item = (&GearSlot, &Equipped)> {
        self.gear_map().iter()
    }

    /// Recompute the six attribute-derived afflictions from current
    /// strength, intelligence and dexterity. Same-name reapplication
    /// replaces in place, so calling this repeatedly is harmless.
    pub fn apply_derived_bonuses(&mut self) {
        let rules = self.rules().derived;
        let attr = |c: &Creature, key| c.stat_value(key).unwrap_or(0.0);
        let strength = attr(self, StatKey::Strength);
        let intelligence = attr(self, StatKey::Intelligence);
        let dexterity = attr(self, StatKey::Dexterity);

        let bonuses = [
            (STR_LIFE_BONUS, Flag::Flat, StatKey::Life, strength * rules.str_life),
            (STR_MELEE_BONUS, Flag::Boon, StatKey::MeleeDamage, strength * rules.str_melee),
            (INT_MANA_BONUS, Flag::Flat, StatKey::Mana, intelligence * rules.int_mana),
            (INT_SPELL_BONUS, Flag::Boon, StatKey::SpellDamage, intelligence * rules.int_spell),
            (DEX_CRIT_BONUS, Flag::Boon, StatKey::CritRate, dexterity * rules.dex_crit),
            (DEX_RANGED_BONUS, Flag::Boon, StatKey::RangedDamage, dexterity * rules.dex_ranged),
        ];
        for (name, layer, key, value) in bonuses {
            if self.has_key(key) {
                self.afflict_checked(Affliction::permanent(name, value, vec![layer, Flag::Target(key)]));
            }
        }
    }
}
