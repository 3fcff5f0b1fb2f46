//! Monte-Carlo duel simulation.
//!
//! Pits two creature templates against each other over many seeds and
//! reports win rates, time-to-kill spread and how often hits were dodged,
//! blocked or critical. Each duel owns its own `SimContext`, so duels run
//! in parallel with rayon and the report is identical for a given base
//! seed regardless of thread count.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::info;

use crate::creature::{Creature, HitOutcome};
use crate::engine::{CombatConfig, SimContext};
use crate::error::CoreResult;
use crate::logging::TimingSpan;
use crate::templates::CreatureTemplate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub duel_count: u64,
    pub attacker: String,
    pub defender: String,
    pub level: u32,
    pub base_seed: u64,
    /// Duels still running after this much logical time are draws
    pub max_time: f64,
    pub combat: CombatConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duel_count: 1_000,
            attacker: "voidling".to_string(),
            defender: "void_sniper".to_string(),
            level: 5,
            base_seed: 42,
            max_time: 120.0,
            combat: CombatConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Attacker,
    Defender,
}

/// Swing tallies for one side of a duel
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SwingTally {
    pub swings: u64,
    pub hits: u64,
    pub dodged: u64,
    pub blocked: u64,
    pub crits: u64,
    pub damage: f64,
}

impl SwingTally {
    fn record(&mut self, outcome: HitOutcome) {
        self.swings += 1;
        match outcome {
            HitOutcome::Hit { amount, crit } => {
                self.hits += 1;
                self.damage += amount;
                if crit {
                    self.crits += 1;
                }
            }
            HitOutcome::Dodged => self.dodged += 1,
            HitOutcome::Blocked => self.blocked += 1,
        }
    }

    fn merge(mut self, other: &SwingTally) -> Self {
        self.swings += other.swings;
        self.hits += other.hits;
        self.dodged += other.dodged;
        self.blocked += other.blocked;
        self.crits += other.crits;
        self.damage += other.damage;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuelOutcome {
    pub seed: u64,
    pub winner: Option<Side>,
    /// Logical time at the killing blow, or `max_time` on a draw
    pub time: f64,
    pub attacker: SwingTally,
    pub defender: SwingTally,
}

/// Per-side rates over every swing of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SideRates {
    pub swings: u64,
    pub dodge_rate: f64,
    pub block_rate: f64,
    pub crit_rate: f64,
    pub mean_damage: f64,
}

impl From<&SwingTally> for SideRates {
    fn from(tally: &SwingTally) -> Self {
        let per = |n: u64, of: u64| if of == 0 { 0.0 } else { n as f64 / of as f64 };
        Self {
            swings: tally.swings,
            dodge_rate: per(tally.dodged, tally.swings),
            block_rate: per(tally.blocked, tally.swings),
            crit_rate: per(tally.crits, tally.hits),
            mean_damage: if tally.hits == 0 {
                0.0
            } else {
                tally.damage / tally.hits as f64
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalanceGrade {
    /// win rate within 5% of even
    Excellent,
    Good,
    Fair,
    Poor,
    /// one side wins almost always
    Critical,
}

impl BalanceGrade {
    fn from_win_rate(rate: f64) -> Self {
        match (rate - 0.5).abs() {
            d if d < 0.05 => BalanceGrade::Excellent,
            d if d < 0.1 => BalanceGrade::Good,
            d if d < 0.2 => BalanceGrade::Fair,
            d if d < 0.35 => BalanceGrade::Poor,
            _ => BalanceGrade::Critical,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReport {
    pub duel_count: u64,
    pub attacker: String,
    pub defender: String,
    pub attacker_wins: u64,
    pub defender_wins: u64,
    pub draws: u64,
    /// Attacker wins over decided duels
    pub attacker_win_rate: f64,
    pub mean_ttk: f64,
    pub std_ttk: f64,
    pub min_ttk: f64,
    pub max_ttk: f64,
    pub attacker_rates: SideRates,
    pub defender_rates: SideRates,
    pub grade: BalanceGrade,
}

/// Seed of duel `index`, derived from the run's base seed
pub fn duel_seed(base_seed: u64, index: u64) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(index.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

fn swing(
    template: &CreatureTemplate,
    caster: &Creature,
    target: &mut Creature,
    ctx: &mut SimContext,
) -> CoreResult<HitOutcome> {
    let hit = template.attack_from(caster, ctx)?;
    target.damage(&hit, ctx)
}

/// One duel to the death or to `max_time`. The attacker swings first.
pub fn simulate_duel(
    attacker: &CreatureTemplate,
    defender: &CreatureTemplate,
    config: &SimConfig,
    seed: u64,
) -> CoreResult<DuelOutcome> {
    let mut ctx = SimContext::new(seed, config.combat.clone());
    let mut a = attacker.spawn(config.level, &mut ctx)?;
    let mut d = defender.spawn(config.level, &mut ctx)?;
    let mut outcome = DuelOutcome {
        seed,
        winner: None,
        time: config.max_time,
        attacker: SwingTally::default(),
        defender: SwingTally::default(),
    };
    let (mut wait_a, mut wait_d) = (0.0, 0.0);

    while ctx.elapsed() < config.max_time {
        let dt = ctx.advance();
        a.tick(&mut ctx)?;
        d.tick(&mut ctx)?;
        wait_a -= dt;
        wait_d -= dt;

        if wait_a <= 0.0 && a.can_act() {
            outcome.attacker.record(swing(attacker, &a, &mut d, &mut ctx)?);
            wait_a += attacker.cooldown;
        }
        if !d.is_alive() {
            outcome.winner = Some(Side::Attacker);
            outcome.time = ctx.elapsed();
            break;
        }
        if wait_d <= 0.0 && d.can_act() {
            outcome.defender.record(swing(defender, &d, &mut a, &mut ctx)?);
            wait_d += defender.cooldown;
        }
        if !a.is_alive() {
            outcome.winner = Some(Side::Defender);
            outcome.time = ctx.elapsed();
            break;
        }
    }
    Ok(outcome)
}

/// Run `config.duel_count` duels in parallel and summarise them
pub fn run_balance_simulation(config: &SimConfig) -> CoreResult<BalanceReport> {
    let _span = TimingSpan::new("balance_simulation");
    config.combat.validate()?;
    let attacker = CreatureTemplate::builtin(&config.attacker)?;
    let defender = CreatureTemplate::builtin(&config.defender)?;
    run_with_templates(&attacker, &defender, config)
}

pub fn run_with_templates(
    attacker: &CreatureTemplate,
    defender: &CreatureTemplate,
    config: &SimConfig,
) -> CoreResult<BalanceReport> {
    let seeds: Vec<u64> = (0..config.duel_count)
        .map(|i| duel_seed(config.base_seed, i))
        .collect();
    let duels: Vec<DuelOutcome> = seeds
        .par_iter()
        .map(|seed| simulate_duel(attacker, defender, config, *seed))
        .collect::<CoreResult<_>>()?;

    let report = analyze(&duels, attacker, defender);
    info!(
        attacker = %report.attacker,
        defender = %report.defender,
        duels = report.duel_count,
        win_rate = report.attacker_win_rate,
        grade = ?report.grade,
        "balance simulation finished"
    );
    Ok(report)
}

fn analyze(
    duels: &[DuelOutcome],
    attacker: &CreatureTemplate,
    defender: &CreatureTemplate,
) -> BalanceReport {
    let wins = |side: Side| duels.iter().filter(|d| d.winner == Some(side)).count() as u64;
    let attacker_wins = wins(Side::Attacker);
    let defender_wins = wins(Side::Defender);
    let decided = attacker_wins + defender_wins;
    let attacker_win_rate = if decided == 0 {
        0.5
    } else {
        attacker_wins as f64 / decided as f64
    };

    let ttk: Vec<f64> = duels
        .iter()
        .filter(|d| d.winner.is_some())
        .map(|d| d.time)
        .collect();
    let (mean, std, min, max) = if ttk.is_empty() {
        (0.0, 0.0, 0.0, 0.0)
    } else {
        let n = ttk.len() as f64;
        let mean = ttk.iter().sum::<f64>() / n;
        let var = ttk.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / n;
        let min = ttk.iter().copied().fold(f64::INFINITY, f64::min);
        let max = ttk.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (mean, var.sqrt(), min, max)
    };

    let total_a = duels
        .iter()
        .fold(SwingTally::default(), |acc, d| acc.merge(&d.attacker));
    let total_d = duels
        .iter()
        .fold(SwingTally::default(), |acc, d| acc.merge(&d.defender));

    BalanceReport {
        duel_count: duels.len() as u64,
        attacker: attacker.name.clone(),
        defender: defender.name.clone(),
        attacker_wins,
        defender_wins,
        draws: duels.len() as u64 - decided,
        attacker_win_rate,
        mean_ttk: mean,
        std_ttk: std,
        min_ttk: min,
        max_ttk: max,
        attacker_rates: SideRates::from(&total_a),
        defender_rates: SideRates::from(&total_d),
        grade: BalanceGrade::from_win_rate(attacker_win_rate),
    }
}
