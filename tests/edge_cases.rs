//! Edge case & boundary tests
//!
//! Tests behavior at system boundaries:
//! - Null pointer inputs → null return, never a crash
//! - Empty / malformed JSON → null return
//! - Zero and infinite durations, caps, empty stat blocks
//! - Configuration errors (missing stat keys, bad tuning tables)

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use combat_core::bridge::*;
use combat_core::constants::MIN_DOT_TICK;
use combat_core::engine::CombatConfig;
use combat_core::error::RejectReason;
use combat_core::equipment::{Affix, GearSlot, Item};
use combat_core::numerics::{AfflictionArena, Ressource};
use combat_core::{Affliction, CoreError, Creature, Damage, Element, Flag, SimContext, Stat, StatKey};

// ============================================================
// Helpers
// ============================================================

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn is_valid_json(ptr: *mut c_char) -> bool {
    if ptr.is_null() {
        return false;
    }
    let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_owned() };
    free_string(ptr);
    serde_json::from_str::<serde_json::Value>(&s).is_ok()
}

fn fresh_save() -> CString {
    let req = cstr(r#"{"name":"edge"}"#);
    let ptr = creature_create(req.as_ptr());
    assert!(!ptr.is_null());
    let s = unsafe { CStr::from_ptr(ptr).to_str().unwrap().to_owned() };
    free_string(ptr);
    cstr(&s)
}

// ============================================================
// 1. Null pointer safety
// ============================================================

#[test]
fn null_inputs_return_null() {
    let save = fresh_save();
    let null = std::ptr::null();
    assert!(creature_create(null).is_null());
    assert!(creature_damage(null, null, 0).is_null());
    assert!(creature_damage(save.as_ptr(), null, 0).is_null());
    assert!(creature_heal(null, 5.0).is_null());
    assert!(creature_afflict(save.as_ptr(), null).is_null());
    assert!(creature_tick(null, 10, 0).is_null());
    assert!(creature_equip(save.as_ptr(), null, null).is_null());
    assert!(creature_summary(null).is_null());
    assert!(migrate_save(null).is_null());
    assert!(balance_run(null).is_null());
}

#[test]
fn free_string_null_is_noop() {
    free_string(std::ptr::null_mut());
}

#[test]
fn logging_init_accepts_null_and_garbage() {
    logging_init(std::ptr::null());
    let garbage = cstr("{{{");
    logging_init(garbage.as_ptr());
}

// ============================================================
// 2. Malformed JSON
// ============================================================

#[test]
fn malformed_json_returns_null() {
    let save = fresh_save();
    for bad in ["", "not json", "{", "[]", r#"{"version":2}"#, r#"{"version":99,"creature":{}}"#] {
        let input = cstr(bad);
        assert!(creature_summary(input.as_ptr()).is_null(), "summary accepted {bad:?}");
        assert!(creature_heal(input.as_ptr(), 1.0).is_null());
    }
    for bad in ["", "[]", r#"{"creature":{}}"#, r#"{"version":99,"creature":{}}"#] {
        let input = cstr(bad);
        assert!(migrate_save(input.as_ptr()).is_null(), "migrated {bad:?}");
    }
    let bad_damage = cstr(r#"{"coeff":1.0,"per_element":{"water":3.0}}"#);
    assert!(creature_damage(save.as_ptr(), bad_damage.as_ptr(), 0).is_null());
    let bad_flag = cstr(r#"{"name":"x","value":1.0,"duration":1.0,"flags":["sparkly"]}"#);
    assert!(creature_afflict(save.as_ptr(), bad_flag.as_ptr()).is_null());
}

#[test]
fn bad_config_rejected_by_create() {
    let req = cstr(r#"{"name":"x","config":{"tick_dt":0.0}}"#);
    assert!(creature_create(req.as_ptr()).is_null());
    let sim = cstr(r#"{"duel_count":1,"attacker":"nobody"}"#);
    assert!(balance_run(sim.as_ptr()).is_null());
}

#[test]
fn valid_calls_return_json() {
    let save = fresh_save();
    assert!(is_valid_json(creature_summary(save.as_ptr())));
    assert!(is_valid_json(creature_tick(save.as_ptr(), 0, 0)));
    let sim = cstr(r#"{"duel_count":4,"attacker":"voidling","defender":"voidling","level":1}"#);
    assert!(is_valid_json(balance_run(sim.as_ptr())));
}

// ============================================================
// 3. Durations and caps
// ============================================================

#[test]
fn zero_duration_affliction_expires_on_first_tick() {
    let mut ctx = SimContext::with_seed(0);
    let mut c = Creature::new("edge", &mut ctx);
    let before = c.stat_value(StatKey::Defense).unwrap();
    c.afflict(Affliction::new("flash", 50.0, 0.0, vec![Flag::Flat, Flag::Target(StatKey::Defense)]))
        .unwrap();
    assert_eq!(c.stat_value(StatKey::Defense).unwrap(), before + 50.0);
    ctx.advance();
    c.tick(&mut ctx).unwrap();
    assert_eq!(c.stat_value(StatKey::Defense).unwrap(), before);
    assert!(c.affliction("flash").is_none());
}

#[test]
fn infinite_affliction_survives_long_runs() {
    let mut ctx = SimContext::with_seed(0);
    let mut c = Creature::new("edge", &mut ctx);
    c.afflict(Affliction::permanent("aura", 3.0, vec![Flag::Flat, Flag::Target(StatKey::AbsDefense)]))
        .unwrap();
    for _ in 0..10_000 {
        ctx.advance();
        c.tick(&mut ctx).unwrap();
    }
    assert_eq!(c.stat_value(StatKey::AbsDefense).unwrap(), 3.0);
}

#[test]
fn resistance_and_crit_rate_caps_hold() {
    let mut ctx = SimContext::with_seed(0);
    let mut c = Creature::new("edge", &mut ctx);
    c.afflict(Affliction::permanent("immune", 5.0, vec![Flag::Flat, Flag::AllResistances]))
        .unwrap();
    c.afflict(Affliction::permanent("lucky", 9.0, vec![Flag::Flat, Flag::Target(StatKey::CritRate)]))
        .unwrap();
    for element in Element::ALL {
        assert!(c.stat_value(StatKey::Resistance(element)).unwrap() < 1.0);
    }
    assert_eq!(c.stat_value(StatKey::CritRate).unwrap(), 1.0);

    // capped resistance still lets a fraction through
    let hit = Damage::new(1.0)
        .with_element(Element::Fire, 100.0)
        .with_variance(1.0, 1.0)
        .unavoidable();
    assert!(c.damage(&hit, &mut ctx).unwrap().amount() > 0.0);
}

#[test]
fn huge_values_stay_finite() {
    let mut arena = AfflictionArena::new();
    let mut pool = Ressource::new("life", 1e300, 0.0);
    let id = arena.insert(Affliction::permanent("giant", 1e300, vec![Flag::Flat]));
    pool.afflict(id, &mut arena);
    pool.modify(f64::MAX, &arena);
    assert!(pool.current().is_finite());
    pool.modify(f64::MIN, &arena);
    assert_eq!(pool.current(), 0.0);
}

#[test]
fn empty_stat_is_its_base() {
    let arena = AfflictionArena::new();
    let stat = Stat::new("empty", 7.25);
    assert_eq!(stat.get_value(&arena), 7.25);
    assert!(stat.gather_afflictions().is_empty());
}

// ============================================================
// 4. Configuration errors
// ============================================================

#[test]
fn missing_stat_is_a_hard_error() {
    let mut ctx = SimContext::with_seed(0);
    let mut c = Creature::new("edge", &mut ctx);
    // a block imported without its dodge entry
    let mut record = c.export();
    record.stats.remove(&StatKey::Dodge);
    let mut stripped = Creature::import(record).unwrap();
    let err = stripped
        .afflict(Affliction::permanent("blur", 0.2, vec![Flag::Flat, Flag::Target(StatKey::Dodge)]))
        .unwrap_err();
    assert!(matches!(err, CoreError::MissingStat { key: StatKey::Dodge, .. }));
    assert!(stripped.affliction("blur").is_none());

    // untouched creature still accepts it
    assert!(c
        .afflict(Affliction::permanent("blur", 0.2, vec![Flag::Flat, Flag::Target(StatKey::Dodge)]))
        .is_ok());
}

#[test]
fn equip_rejections_leave_creature_unchanged() {
    let mut ctx = SimContext::with_seed(0);
    let mut c = Creature::new("edge", &mut ctx);
    let snapshot = c.export();

    let potion = Item {
        name: "Potion".to_string(),
        base: "flask".to_string(),
        rarity: 0,
        flags: vec![Flag::Consumable],
        affixes: vec![Affix::single("life", 50.0, vec![Flag::Flat, Flag::Target(StatKey::Life)])],
        implicits: vec![],
    };
    let rejection = c.equip(GearSlot::Amulet, potion.clone()).unwrap_err();
    assert_eq!(rejection.reason, RejectReason::NotGear);
    assert_eq!(rejection.item, potion);
    assert_eq!(c.export(), snapshot);
    assert!(c.equipped(GearSlot::Amulet).is_none());
}

#[test]
fn payload_interval_below_minimum_is_refused() {
    let mut ctx = SimContext::with_seed(0);
    let mut c = Creature::new("edge", &mut ctx);
    let burn = Damage::new(1.0).with_element(Element::Fire, 1.0);
    let err = c
        .afflict(Affliction::new("swarm", 0.0, 1.0, vec![]).with_payload(burn.clone(), 1e-10))
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidConfig(_)));
    assert!(c.affliction("swarm").is_none());

    // the minimum itself is accepted and fires a bounded number of hits
    c.afflict(Affliction::new("swarm", 0.0, 1.0, vec![]).with_payload(burn, MIN_DOT_TICK))
        .unwrap();
    ctx.advance();
    let hits = c.tick(&mut ctx).unwrap();
    assert!(hits.len() <= (ctx.config.tick_dt / MIN_DOT_TICK).round() as usize + 1);
}

#[test]
fn combat_config_validation() {
    assert!(CombatConfig::default().validate().is_ok());
    let mut config = CombatConfig::default();
    config.variance = (1.2, 0.8);
    assert!(config.validate().is_err());
    assert!(CombatConfig::from_json(r#"{"tick_dt":-1.0}"#).is_err());
    assert!(CombatConfig::from_json(r#"{"dot_tick":1e-9}"#).is_err());
}
