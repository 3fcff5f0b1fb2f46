//! C-ABI bridge for engine hosts.
//!
//! Stateless: every call takes a creature save (any supported version) as
//! JSON and answers with JSON holding the updated save at the current
//! version. Returned strings are heap-allocated by Rust and must be
//! released with `free_string`. Null pointers, malformed JSON and
//! configuration errors all produce a null return.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use tracing::warn;

use crate::balance::{self, SimConfig};
use crate::creature::{Creature, HitOutcome};
use crate::engine::{CombatConfig, SimContext};
use crate::equipment::{GearSlot, Item};
use crate::error::{CoreResult, RejectReason};
use crate::flags::{Flag, StatKey};
use crate::logging::{self, TracingConfig};
use crate::numerics::{Affliction, Damage};
use crate::savemigration::{self, SaveFile};
use crate::templates::CreatureTemplate;

// ========================
// Data transfer types
// ========================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    /// Built-in template to spawn from; plain default block when absent
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub config: Option<CombatConfig>,
}

fn default_level() -> u32 {
    1
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DamageResponse {
    pub creature: SaveFile,
    pub outcome: HitOutcome,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealResponse {
    pub creature: SaveFile,
    pub applied: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TickResponse {
    pub creature: SaveFile,
    /// Damage payloads resolved during the ticks
    pub hits: Vec<HitOutcome>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EquipResponse {
    pub creature: SaveFile,
    pub previous: Option<Item>,
    pub rejected: Option<RejectReason>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AfflictionView {
    pub name: String,
    pub value: f64,
    pub duration: f64,
    pub flags: Vec<Flag>,
}

/// Read-only view for display
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatureSummary {
    pub name: String,
    pub level: u32,
    pub exp: u64,
    pub exp_to_next: u64,
    pub ability_points: u32,
    pub life: f64,
    pub max_life: f64,
    pub mana: f64,
    pub max_mana: f64,
    pub can_act: bool,
    pub stats: BTreeMap<StatKey, f64>,
    pub afflictions: Vec<AfflictionView>,
    pub gear: BTreeMap<GearSlot, String>,
}

impl CreatureSummary {
    pub fn capture(creature: &Creature) -> CoreResult<Self> {
        let mut stats = BTreeMap::new();
        for key in StatKey::all().filter(|k| creature.has_key(*k)) {
            stats.insert(key, creature.stat_value(key)?);
        }
        Ok(Self {
            name: creature.name.clone(),
            level: creature.level,
            exp: creature.exp,
            exp_to_next: creature.exp_to_next,
            ability_points: creature.ability_points,
            life: creature.life(),
            max_life: creature.stat_value(StatKey::Life)?,
            mana: creature.mana(),
            max_mana: creature.stat_value(StatKey::Mana)?,
            can_act: creature.can_act(),
            stats,
            afflictions: creature
                .active_afflictions()
                .map(|a| AfflictionView {
                    name: a.name.clone(),
                    value: a.value,
                    duration: a.duration,
                    flags: a.flags.clone(),
                })
                .collect(),
            gear: creature
                .gear()
                .map(|(slot, e)| (*slot, e.item.name.clone()))
                .collect(),
        })
    }
}

// ========================
// Helpers
// ========================

fn json_to_cstring<T: Serialize>(value: &T) -> *mut c_char {
    match serde_json::to_string(value) {
        Ok(json) => CString::new(json).map_or(std::ptr::null_mut(), CString::into_raw),
        Err(_) => std::ptr::null_mut(),
    }
}

fn parse_cstr(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_owned()) }
}

fn parse_json<T: for<'de> Deserialize<'de>>(ptr: *const c_char, what: &str) -> Option<T> {
    let text = parse_cstr(ptr)?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(%err, what, "malformed bridge payload");
            None
        }
    }
}

/// Parse a save of any version into a live creature and the tuning table
/// it runs under
fn load_creature(ptr: *const c_char) -> Option<(Creature, CombatConfig)> {
    let text = parse_cstr(ptr)?;
    let loaded = SaveFile::from_json(&text).and_then(|save| {
        save.config.validate()?;
        Ok((Creature::import(save.creature)?, save.config))
    });
    match loaded {
        Ok(pair) => Some(pair),
        Err(err) => {
            warn!(%err, "bridge could not load creature");
            None
        }
    }
}

/// Unwrap a core result, logging and yielding null on error
fn respond<T: Serialize>(result: CoreResult<T>) -> *mut c_char {
    match result {
        Ok(value) => json_to_cstring(&value),
        Err(err) => {
            warn!(%err, "bridge call failed");
            std::ptr::null_mut()
        }
    }
}

// ========================
// C-ABI: Core
// ========================

#[no_mangle]
pub extern "C" fn get_version() -> *mut c_char {
    CString::new(env!("CARGO_PKG_VERSION")).map_or(std::ptr::null_mut(), CString::into_raw)
}

/// Free a string allocated by Rust.
/// `ptr` must come from a prior call into this library, or be null.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        unsafe {
            drop(CString::from_raw(ptr));
        }
    }
}

/// Install the tracing subscriber from a JSON `TracingConfig` (null for defaults)
#[no_mangle]
pub extern "C" fn logging_init(config_json: *const c_char) {
    let config = parse_cstr(config_json)
        .and_then(|json| TracingConfig::from_json(&json))
        .unwrap_or_default();
    logging::init_tracing(&config);
}

// ========================
// C-ABI: Creatures
// ========================

/// Build a creature from a `CreateRequest`; returns its save
#[no_mangle]
pub extern "C" fn creature_create(request_json: *const c_char) -> *mut c_char {
    let Some(request) = parse_json::<CreateRequest>(request_json, "create request") else {
        return std::ptr::null_mut();
    };
    respond(create(request))
}

fn create(request: CreateRequest) -> CoreResult<SaveFile> {
    let config = request.config.unwrap_or_default();
    config.validate()?;
    let mut ctx = SimContext::new(request.seed, config);
    let mut creature = match &request.template {
        Some(name) => CreatureTemplate::builtin(name)?.spawn(request.level, &mut ctx)?,
        None => Creature::new(request.name.clone(), &mut ctx),
    };
    creature.name = request.name;
    Ok(SaveFile::new(&creature).with_config(ctx.config))
}

/// Resolve a caster-bound `Damage` against the creature
#[no_mangle]
pub extern "C" fn creature_damage(
    creature_json: *const c_char,
    damage_json: *const c_char,
    seed: u64,
) -> *mut c_char {
    let (Some((mut creature, config)), Some(damage)) = (
        load_creature(creature_json),
        parse_json::<Damage>(damage_json, "damage"),
    ) else {
        return std::ptr::null_mut();
    };
    let mut ctx = SimContext::new(seed, config);
    respond(creature.damage(&damage, &mut ctx).map(|outcome| DamageResponse {
        creature: SaveFile::new(&creature).with_config(ctx.config),
        outcome,
    }))
}

#[no_mangle]
pub extern "C" fn creature_heal(creature_json: *const c_char, amount: f64) -> *mut c_char {
    let Some((mut creature, config)) = load_creature(creature_json) else {
        return std::ptr::null_mut();
    };
    respond(creature.heal(amount).map(|applied| HealResponse {
        creature: SaveFile::new(&creature).with_config(config),
        applied,
    }))
}

/// Apply an `Affliction`; null when it targets a stat the creature lacks
#[no_mangle]
pub extern "C" fn creature_afflict(
    creature_json: *const c_char,
    affliction_json: *const c_char,
) -> *mut c_char {
    let (Some((mut creature, config)), Some(affliction)) = (
        load_creature(creature_json),
        parse_json::<Affliction>(affliction_json, "affliction"),
    ) else {
        return std::ptr::null_mut();
    };
    respond(creature.afflict(affliction).map(|_| SaveFile::new(&creature).with_config(config)))
}

/// Advance the creature `ticks` logical frames
#[no_mangle]
pub extern "C" fn creature_tick(creature_json: *const c_char, ticks: u32, seed: u64) -> *mut c_char {
    let Some((creature, config)) = load_creature(creature_json) else {
        return std::ptr::null_mut();
    };
    respond(run_ticks(creature, SimContext::new(seed, config), ticks))
}

fn run_ticks(mut creature: Creature, mut ctx: SimContext, ticks: u32) -> CoreResult<TickResponse> {
    let mut hits = Vec::new();
    for _ in 0..ticks {
        ctx.advance();
        hits.extend(creature.tick(&mut ctx)?);
    }
    Ok(TickResponse {
        creature: SaveFile::new(&creature).with_config(ctx.config),
        hits,
    })
}

/// Equip an item in `slot` (e.g. `"ring_left"`). A refused item is
/// reported in `rejected` and the creature comes back unchanged.
#[no_mangle]
pub extern "C" fn creature_equip(
    creature_json: *const c_char,
    slot: *const c_char,
    item_json: *const c_char,
) -> *mut c_char {
    let slot = parse_cstr(slot).map(serde_json::Value::String);
    let (Some((mut creature, config)), Some(slot), Some(item)) = (
        load_creature(creature_json),
        slot.and_then(|s| serde_json::from_value::<GearSlot>(s).ok()),
        parse_json::<Item>(item_json, "item"),
    ) else {
        return std::ptr::null_mut();
    };
    let (previous, rejected) = match creature.equip(slot, item) {
        Ok(previous) => (previous, None),
        Err(rejection) => (None, Some(rejection.reason)),
    };
    json_to_cstring(&EquipResponse {
        creature: SaveFile::new(&creature).with_config(config),
        previous,
        rejected,
    })
}

#[no_mangle]
pub extern "C" fn creature_summary(creature_json: *const c_char) -> *mut c_char {
    let Some((creature, _)) = load_creature(creature_json) else {
        return std::ptr::null_mut();
    };
    respond(CreatureSummary::capture(&creature))
}

// ========================
// C-ABI: Saves and balance
// ========================

/// Migrate a save to the current version; returns the migrated save
#[no_mangle]
pub extern "C" fn migrate_save(save_json: *const c_char) -> *mut c_char {
    let Some(text) = parse_cstr(save_json) else {
        return std::ptr::null_mut();
    };
    match savemigration::migrate_save(&text) {
        Ok(result) => json_to_cstring(&result),
        Err(err) => {
            warn!(%err, "save migration failed");
            std::ptr::null_mut()
        }
    }
}

#[no_mangle]
pub extern "C" fn get_current_save_version() -> u32 {
    savemigration::CURRENT_SAVE_VERSION
}

/// Run a duel simulation from a JSON `SimConfig`; returns the report
#[no_mangle]
pub extern "C" fn balance_run(config_json: *const c_char) -> *mut c_char {
    let Some(config) = parse_json::<SimConfig>(config_json, "sim config") else {
        return std::ptr::null_mut();
    };
    respond(balance::run_balance_simulation(&config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }
        let out = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
        free_string(ptr);
        Some(out)
    }

    fn cs(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    fn new_save() -> String {
        let req = cs(r#"{"name":"hero","seed":9}"#);
        call(creature_create(req.as_ptr())).unwrap()
    }

    #[test]
    fn test_version() {
        assert_eq!(call(get_version()).unwrap(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_create_from_template() {
        let req = cs(r#"{"name":"grunt","template":"voidling","level":3}"#);
        let save: SaveFile = serde_json::from_str(&call(creature_create(req.as_ptr())).unwrap()).unwrap();
        assert_eq!(save.creature.name, "grunt");
        assert_eq!(save.creature.level, 3);

        let bad = cs(r#"{"name":"x","template":"dragon"}"#);
        assert!(creature_create(bad.as_ptr()).is_null());
    }

    #[test]
    fn test_damage_then_heal() {
        let save = cs(&new_save());
        let dmg = cs(r#"{"coeff":1.2,"per_element":{"phys":10.0},"variance":[1.0,1.0],"ignore_dodge":true,"ignore_block":true}"#);
        let out: DamageResponse =
            serde_json::from_str(&call(creature_damage(save.as_ptr(), dmg.as_ptr(), 1)).unwrap()).unwrap();
        assert_eq!(out.outcome, HitOutcome::Hit { amount: 12.0, crit: false });

        let hurt = cs(&serde_json::to_string(&out.creature).unwrap());
        let healed: HealResponse =
            serde_json::from_str(&call(creature_heal(hurt.as_ptr(), 50.0)).unwrap()).unwrap();
        assert_eq!(healed.applied, 12.0);
    }

    #[test]
    fn test_afflict_tick_summary() {
        let save = cs(&new_save());
        let aff = cs(r#"{"name":"haste","value":0.5,"duration":0.032,"flags":["boon","speed"]}"#);
        let afflicted = cs(&call(creature_afflict(save.as_ptr(), aff.as_ptr())).unwrap());

        let summary: CreatureSummary =
            serde_json::from_str(&call(creature_summary(afflicted.as_ptr())).unwrap()).unwrap();
        assert_eq!(summary.stats[&StatKey::Speed], 1.5);
        assert!(summary.afflictions.iter().any(|a| a.name == "haste"));

        let ticked: TickResponse =
            serde_json::from_str(&call(creature_tick(afflicted.as_ptr(), 3, 0)).unwrap()).unwrap();
        let after = cs(&serde_json::to_string(&ticked.creature).unwrap());
        let summary: CreatureSummary =
            serde_json::from_str(&call(creature_summary(after.as_ptr())).unwrap()).unwrap();
        assert_eq!(summary.stats[&StatKey::Speed], 1.0);
    }

    #[test]
    fn test_equip_rejection_reported() {
        let save = cs(&new_save());
        let slot = cs("boots");
        let item = cs(r#"{"name":"Cap","base":"leather_cap","flags":["gear","helms"]}"#);
        let out: EquipResponse =
            serde_json::from_str(&call(creature_equip(save.as_ptr(), slot.as_ptr(), item.as_ptr())).unwrap()).unwrap();
        assert_eq!(out.rejected, Some(RejectReason::WrongSlot));

        let helm = cs("helm");
        let out: EquipResponse =
            serde_json::from_str(&call(creature_equip(save.as_ptr(), helm.as_ptr(), item.as_ptr())).unwrap()).unwrap();
        assert!(out.rejected.is_none());
        assert_eq!(out.creature.creature.gear.len(), 1);

        let nowhere = cs("pocket");
        assert!(creature_equip(save.as_ptr(), nowhere.as_ptr(), item.as_ptr()).is_null());
    }

    #[test]
    fn test_created_config_drives_later_ticks() {
        let req = cs(r#"{"name":"slow","config":{"tick_dt":0.5}}"#);
        let save = cs(&call(creature_create(req.as_ptr())).unwrap());
        let aff = cs(r#"{"name":"haste","value":0.5,"duration":2.0,"flags":["boon","speed"]}"#);
        let afflicted = cs(&call(creature_afflict(save.as_ptr(), aff.as_ptr())).unwrap());

        let ticked: TickResponse =
            serde_json::from_str(&call(creature_tick(afflicted.as_ptr(), 1, 0)).unwrap()).unwrap();
        assert_eq!(ticked.creature.config.tick_dt, 0.5);
        let haste = ticked
            .creature
            .creature
            .afflictions
            .iter()
            .find(|a| a.name == "haste")
            .unwrap();
        assert!((haste.duration - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_fast_payload_refused() {
        let save = cs(&new_save());
        let swarm = cs(
            r#"{"name":"swarm","value":0.0,"duration":1.0,"dot_tick":1e-10,"payload":{"coeff":1.0,"per_element":{"fire":1.0}}}"#,
        );
        assert!(creature_afflict(save.as_ptr(), swarm.as_ptr()).is_null());
    }
}
