//! Hit resolution.
//!
//! `damage` takes an already caster-bound `Damage` (see
//! `recalculate_damage`) through variance, armor, dodge, block,
//! resistance, crit and absolute defense, then splits the result between
//! life and mana.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::creature::Creature;
use crate::engine::{CombatConfig, SimContext, SimRng};
use crate::error::CoreResult;
use crate::flags::{Element, Flag, StatKey};
use crate::numerics::{round_to, Damage};

/// What became of one incoming hit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HitOutcome {
    Hit { amount: f64, crit: bool },
    Dodged,
    Blocked,
}

impl HitOutcome {
    /// Damage dealt, zero when avoided
    pub fn amount(&self) -> f64 {
        match self {
            HitOutcome::Hit { amount, .. } => *amount,
            HitOutcome::Dodged | HitOutcome::Blocked => 0.0,
        }
    }

    pub fn landed(&self) -> bool {
        matches!(self, HitOutcome::Hit { .. })
    }
}

impl Creature {
    /// Fraction of incoming damage stopped by armor, capped
    pub fn armor_mitigation(&self, config: &CombatConfig) -> CoreResult<f64> {
        let defense = self.stat_value(StatKey::Defense)?.abs();
        let value = config.armor.eval(defense) + self.stat_value(StatKey::Mitigation)?;
        Ok(value.min(config.armor.cap))
    }

    /// Chance to dodge a hit thrown with `precision`.
    ///
    /// Rating above precision climbs the curve; the flat dodge stat adds
    /// on top of the capped curve.
    pub fn dodge_chance(&self, precision: f64, config: &CombatConfig) -> CoreResult<f64> {
        let x = self.stat_value(StatKey::DodgeRating)? - precision;
        let curve = config.dodge.eval(x).clamp(0.0, config.dodge.cap);
        Ok(curve + self.stat_value(StatKey::Dodge)?)
    }

    /// Resolve one incoming hit against this creature
    pub fn damage(&mut self, source: &Damage, ctx: &mut SimContext) -> CoreResult<HitOutcome> {
        let flags = self.gather_flags();
        let (rolled, penetration) = source.get_damage(&mut ctx.rng);
        let mitigation = 1.0 - self.armor_mitigation(&ctx.config)?;

        if !source.ignores_dodge() {
            let roll: f64 = ctx.rng.gen();
            let chance = self.dodge_chance(source.precision, &ctx.config)?;
            if chance > 0.0 && roll <= chance {
                debug!(creature = %self.name, chance, "hit dodged");
                return Ok(HitOutcome::Dodged);
            }
        }
        if !source.ignores_block() {
            let roll: f64 = ctx.rng.gen();
            let chance = self.stat_value(StatKey::Block)?;
            if chance > 0.0 && roll <= chance {
                debug!(creature = %self.name, chance, "hit blocked");
                return Ok(HitOutcome::Blocked);
            }
        }

        let mut total = 0.0;
        for element in Element::ALL {
            let resistance = self.stat_value(StatKey::Resistance(element))?;
            total += rolled[element] * mitigation * (1.0 - (resistance - penetration[element]));
        }

        if source.is_crit {
            let factor = source.crit_mult * (1.0 - self.stat_value(StatKey::CritResistance)?);
            if factor > 0.0 {
                total *= factor;
            }
        }

        total = (total - self.stat_value(StatKey::AbsDefense)?).max(0.0);

        let mut life_part = total;
        if flags.contains(&Flag::MindOverMatter) {
            life_part = total * ctx.config.split_life_share;
            let mana_part = total * ctx.config.split_mana_share;
            let (mana, arena) = self.pool_mut(StatKey::Mana)?;
            let absorbed = -mana.modify(-mana_part, arena);
            life_part += mana_part - absorbed;
        }
        let (life, arena) = self.pool_mut(StatKey::Life)?;
        life.modify(-life_part, arena);

        let amount = round_to(total, 2);
        trace!(
            creature = %self.name,
            amount,
            crit = source.is_crit,
            origin = ?source.origin,
            "hit landed"
        );
        Ok(HitOutcome::Hit {
            amount,
            crit: source.is_crit,
        })
    }

    /// Restore life, scaled by `heal_factor`. Returns the amount applied.
    pub fn heal(&mut self, amount: f64) -> CoreResult<f64> {
        let value = amount * self.stat_value(StatKey::HealFactor)?;
        let (life, arena) = self.pool_mut(StatKey::Life)?;
        Ok(life.modify(value, arena))
    }

    pub fn restore_mana(&mut self, amount: f64) -> CoreResult<f64> {
        let (mana, arena) = self.pool_mut(StatKey::Mana)?;
        Ok(mana.modify(amount, arena))
    }

    /// Pay `cost` mana if available
    pub fn try_spend_mana(&mut self, cost: f64) -> CoreResult<bool> {
        let (mana, arena) = self.pool_mut(StatKey::Mana)?;
        Ok(mana.try_spend(cost, arena))
    }

    /// Bind an authored damage source to this creature as caster.
    ///
    /// Rolls crit against `crit_rate`, scales the coefficient by the
    /// delivery stats the source is flagged with, adds rolled flat damage
    /// and penetration per element, and copies crit damage and precision.
    pub fn recalculate_damage(&self, source: &Damage, rng: &mut SimRng) -> CoreResult<Damage> {
        let mut out = source.clone();
        let crit_roll: f64 = rng.gen();
        out.is_crit = crit_roll < self.stat_value(StatKey::CritRate)?;

        for (flag, key) in [
            (Flag::Melee, StatKey::MeleeDamage),
            (Flag::Ranged, StatKey::RangedDamage),
            (Flag::Spell, StatKey::SpellDamage),
        ] {
            if source.has_flag(flag) {
                out.coeff *= self.stat_value(key)?;
            }
        }

        for element in Element::ALL {
            let flat = self
                .range(StatKey::FlatDamage(element))?
                .roll(self.arena(), rng);
            let pct = self.stat_value(StatKey::DamagePct(element))?;
            out.per_element[element] = (source.per_element[element] + flat) * pct;
            out.penetration[element] =
                source.penetration[element] + self.stat_value(StatKey::Penetration(element))?;
        }

        out.crit_mult = self.stat_value(StatKey::CritDamage)?;
        out.origin = Some(self.id);
        out.precision = self.stat_value(StatKey::Precision)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerics::Affliction;

    const EPSILON: f64 = 1e-9;

    fn setup() -> (SimContext, Creature) {
        let mut ctx = SimContext::with_seed(7);
        let c = Creature::new("target", &mut ctx);
        (ctx, c)
    }

    fn fixed(coeff: f64, element: Element, value: f64) -> Damage {
        Damage::new(coeff)
            .with_element(element, value)
            .with_variance(1.0, 1.0)
            .unavoidable()
    }

    #[test]
    fn test_plain_hit_reduces_life_exactly() {
        let (mut ctx, mut c) = setup();
        let max = c.life();
        let out = c.damage(&fixed(1.2, Element::Phys, 10.0), &mut ctx).unwrap();
        assert_eq!(out, HitOutcome::Hit { amount: 12.0, crit: false });
        assert!((c.life() - (max - 12.0)).abs() < EPSILON);
        c.heal(12.0).unwrap();
        assert!((c.life() - max).abs() < EPSILON);
    }

    #[test]
    fn test_resistance_and_penetration() {
        let (mut ctx, mut c) = setup();
        c.afflict(Affliction::permanent("ward", 0.5, vec![Flag::Flat, Flag::Target(StatKey::Resistance(Element::Fire))]))
            .unwrap();
        let hit = c.damage(&fixed(1.0, Element::Fire, 20.0), &mut ctx).unwrap();
        assert_eq!(hit.amount(), 10.0);
        let pierce = fixed(1.0, Element::Fire, 20.0).with_penetration(Element::Fire, 0.25);
        assert_eq!(c.damage(&pierce, &mut ctx).unwrap().amount(), 15.0);
    }

    #[test]
    fn test_crit_and_crit_resistance() {
        let (mut ctx, mut c) = setup();
        let mut crit = fixed(1.0, Element::Ice, 10.0);
        crit.is_crit = true;
        crit.crit_mult = 2.0;
        assert_eq!(c.damage(&crit, &mut ctx).unwrap().amount(), 20.0);

        c.afflict(Affliction::permanent("stone", 0.5, vec![Flag::Flat, Flag::Target(StatKey::CritResistance)]))
            .unwrap();
        assert_eq!(c.damage(&crit, &mut ctx).unwrap().amount(), 10.0);

        // a non-positive factor leaves the hit uncritted
        c.afflict(Affliction::permanent("stone", 1.5, vec![Flag::Flat, Flag::Target(StatKey::CritResistance)]))
            .unwrap();
        assert_eq!(c.damage(&crit, &mut ctx).unwrap().amount(), 10.0);
    }

    #[test]
    fn test_absolute_defense_floors_at_zero() {
        let (mut ctx, mut c) = setup();
        c.afflict(Affliction::permanent("plate", 25.0, vec![Flag::Flat, Flag::Target(StatKey::AbsDefense)]))
            .unwrap();
        let before = c.life();
        assert_eq!(c.damage(&fixed(1.0, Element::Phys, 20.0), &mut ctx).unwrap().amount(), 0.0);
        assert_eq!(c.life(), before);
    }

    #[test]
    fn test_armor_curve() {
        let (ctx, mut c) = setup();
        assert_eq!(c.armor_mitigation(&ctx.config).unwrap(), 0.0);
        c.afflict(Affliction::permanent("plate", 7000.0, vec![Flag::Flat, Flag::Target(StatKey::Defense)]))
            .unwrap();
        // (45 - 90 / (1 + e^2.8)) percent
        assert_eq!(c.armor_mitigation(&ctx.config).unwrap(), 0.4);
        c.afflict(Affliction::permanent("bulwark", 0.8, vec![Flag::Flat, Flag::Target(StatKey::Mitigation)]))
            .unwrap();
        assert_eq!(c.armor_mitigation(&ctx.config).unwrap(), 0.9);
    }

    #[test]
    fn test_full_dodge_and_block() {
        let (mut ctx, mut c) = setup();
        c.afflict(Affliction::permanent("blur", 0.95, vec![Flag::Flat, Flag::Target(StatKey::Dodge)]))
            .unwrap();
        let swing = Damage::new(1.0).with_element(Element::Phys, 10.0);
        let dodged = (0..50)
            .filter(|_| c.damage(&swing, &mut ctx).unwrap() == HitOutcome::Dodged)
            .count();
        assert!(dodged > 35);

        c.remove_affliction("blur");
        c.afflict(Affliction::permanent("shield", 0.75, vec![Flag::Flat, Flag::Target(StatKey::Block)]))
            .unwrap();
        let undodgeable = swing.clone().with_flags(vec![Flag::CannotBeDodged]);
        let blocked = (0..50)
            .filter(|_| c.damage(&undodgeable, &mut ctx).unwrap() == HitOutcome::Blocked)
            .count();
        assert!(blocked > 25);

        let piercing = swing.with_flags(vec![Flag::CannotBeDodged, Flag::CannotBeBlocked]);
        assert!(c.damage(&piercing, &mut ctx).unwrap().landed());
    }

    #[test]
    fn test_mind_over_matter_split() {
        let (mut ctx, mut c) = setup();
        c.afflict(Affliction::permanent("mom", 0.0, vec![Flag::MindOverMatter])).unwrap();
        let life = c.life();
        let mana = c.mana();
        c.damage(&fixed(1.0, Element::Dark, 20.0), &mut ctx).unwrap();
        assert!((c.life() - (life - 13.0)).abs() < EPSILON);
        assert!((c.mana() - (mana - 7.0)).abs() < EPSILON);

        // mana runs dry, the rest lands on life
        c.damage(&fixed(1.0, Element::Dark, 200.0), &mut ctx).unwrap();
        assert_eq!(c.mana(), 0.0);
        let expected = life - 13.0 - 130.0 - (70.0 - (mana - 7.0));
        assert!((c.life() - expected.max(0.0)).abs() < EPSILON);
    }

    #[test]
    fn test_recalculate_binds_caster() {
        let (mut ctx, mut caster) = setup();
        caster
            .afflict(Affliction::permanent("ember", 2.0, vec![Flag::Flat, Flag::Target(StatKey::FlatDamage(Element::Fire))]))
            .unwrap();
        caster
            .afflict(Affliction::permanent("zeal", 0.5, vec![Flag::Boon, Flag::Target(StatKey::DamagePct(Element::Fire))]))
            .unwrap();
        caster
            .afflict(Affliction::permanent("keen", 30.0, vec![Flag::Flat, Flag::Target(StatKey::Precision)]))
            .unwrap();
        let source = Damage::new(2.0)
            .with_element(Element::Fire, 4.0)
            .with_flags(vec![Flag::Melee]);
        let bound = caster.recalculate_damage(&source, &mut ctx.rng).unwrap();
        // (4 + 2) * 1.5
        assert!((bound.per_element.fire - 9.0).abs() < EPSILON);
        // 2 * (1 + 10 str * 0.002)
        assert!((bound.coeff - 2.04).abs() < EPSILON);
        assert_eq!(bound.origin, Some(caster.id));
        assert_eq!(bound.precision, 30.0);
        assert_eq!(bound.crit_mult, 1.5);
        assert_eq!(source.coeff, 2.0);
    }

    #[test]
    fn test_try_spend_mana_all_or_nothing() {
        let (_, mut c) = setup();
        let full = c.mana();
        assert!(c.try_spend_mana(30.0).unwrap());
        assert!((c.mana() - (full - 30.0)).abs() < EPSILON);
        assert!(!c.try_spend_mana(full).unwrap());
        assert!((c.mana() - (full - 30.0)).abs() < EPSILON);
    }

    #[test]
    fn test_restore_mana_clamps_to_max() {
        let (_, mut c) = setup();
        let full = c.mana();
        c.try_spend_mana(20.0).unwrap();
        let applied = c.restore_mana(100.0).unwrap();
        assert!((applied - 20.0).abs() < EPSILON);
        assert!((c.mana() - full).abs() < EPSILON);
    }
}
