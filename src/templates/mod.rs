//! Creature templates (enemy statblocks).
//!
//! A template overrides a handful of entries of the default stat block,
//! names an attack and carries per-level scaling. Built-in archetypes are
//! embedded from `data/templates/bestiary.ron`; extra ones load from RON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::creature::{Creature, StatEntry};
use crate::engine::SimContext;
use crate::error::{CoreError, CoreResult};
use crate::flags::StatKey;
use crate::numerics::{Damage, Stat};

const BESTIARY: &str = include_str!("../../data/templates/bestiary.ron");

/// Replacement for one stat of the default block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatOverride {
    pub base: f64,
    /// Upper cap on the computed value
    #[serde(default)]
    pub cap: Option<f64>,
    /// Per-level scaling value
    #[serde(default)]
    pub scaling: f64,
    #[serde(default)]
    pub multiplicative: bool,
}

impl StatOverride {
    fn apply(&self, stat: &mut Stat) {
        stat.base = self.base;
        if let Some(max) = self.cap {
            stat.cap.max = Some(max);
        }
        stat.scaling_value = self.scaling;
        stat.multiplicative_scaling = self.multiplicative;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatureTemplate {
    pub name: String,
    #[serde(default)]
    pub stats: BTreeMap<StatKey, StatOverride>,
    /// Authored attack, bound to the spawned creature on use
    pub attack: Damage,
    /// Time between attacks
    pub cooldown: f64,
    #[serde(default)]
    pub exp_reward: u64,
}

impl CreatureTemplate {
    pub fn from_ron_str(text: &str) -> CoreResult<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Built-in archetype by name
    pub fn builtin(name: &str) -> CoreResult<Self> {
        builtins()?
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CoreError::InvalidConfig(format!("no built-in template '{name}'")))
    }

    /// Build a creature from this template at `level`.
    ///
    /// Overrides land on the default block, then every stat scales to
    /// `level` and pools are refilled.
    pub fn spawn(&self, level: u32, ctx: &mut SimContext) -> CoreResult<Creature> {
        let mut creature = Creature::new(self.name.clone(), ctx);
        for (key, value) in &self.stats {
            match creature.entry_mut(*key) {
                Some(StatEntry::Range(range)) => {
                    value.apply(&mut range.lower);
                    value.apply(&mut range.upper);
                }
                _ => value.apply(creature.base_stat_mut(*key)?),
            }
        }
        creature.scale(level);
        debug!(template = %self.name, level, id = creature.id.0, "creature spawned");
        Ok(creature)
    }

    /// The template attack bound to `caster`, rolled with the configured variance
    pub fn attack_from(&self, caster: &Creature, ctx: &mut SimContext) -> CoreResult<Damage> {
        let mut source = self.attack.clone();
        source.variance = ctx.config.variance;
        caster.recalculate_damage(&source, &mut ctx.rng)
    }
}

/// Every built-in template
pub fn builtins() -> CoreResult<Vec<CreatureTemplate>> {
    Ok(ron::from_str(BESTIARY)?)
}

/// Templates from a RON file holding a list of them
pub fn load(path: &Path) -> CoreResult<Vec<CreatureTemplate>> {
    let text = std::fs::read_to_string(path)?;
    Ok(ron::from_str(&text)?)
}
