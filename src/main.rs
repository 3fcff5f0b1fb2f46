use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use combat_core::balance::{self, SimConfig};
use combat_core::engine::CombatConfig;
use combat_core::logging::{self, LogLevel, TracingConfig};
use combat_core::templates::{self, CreatureTemplate};

#[derive(Parser, Debug)]
#[command(name = "combat-sim")]
#[command(about = "Run Monte-Carlo duels between creature templates")]
struct Args {
    /// Attacking template (swings first)
    #[arg(short, long, default_value = "voidling")]
    attacker: String,

    /// Defending template
    #[arg(short, long, default_value = "void_sniper")]
    defender: String,

    /// Number of duels
    #[arg(short = 'n', long, default_value = "1000")]
    duels: u64,

    /// Level both sides spawn at
    #[arg(short, long, default_value = "5")]
    level: u32,

    /// Base seed for per-duel seeds
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Logical seconds before a duel is called a draw
    #[arg(long, default_value = "120")]
    max_time: f64,

    /// Combat tuning table (.ron or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra templates (RON list), searched before the built-ins
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Default log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

fn find_template(name: &str, extra: &[CreatureTemplate]) -> Result<CreatureTemplate> {
    if let Some(template) = extra.iter().find(|t| t.name == name) {
        return Ok(template.clone());
    }
    CreatureTemplate::builtin(name).with_context(|| format!("unknown template '{name}'"))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level: LogLevel = args.log_level.parse()?;
    logging::init_tracing(&TracingConfig::default().with_level(level));

    if args.duels == 0 {
        bail!("--duels must be at least 1");
    }

    let combat = match &args.config {
        Some(path) => CombatConfig::load(path)
            .with_context(|| format!("loading combat config {}", path.display()))?,
        None => CombatConfig::default(),
    };
    let extra = match &args.templates {
        Some(path) => templates::load(path)
            .with_context(|| format!("loading templates {}", path.display()))?,
        None => Vec::new(),
    };

    let config = SimConfig {
        duel_count: args.duels,
        attacker: args.attacker.clone(),
        defender: args.defender.clone(),
        level: args.level,
        base_seed: args.seed,
        max_time: args.max_time,
        combat,
    };
    config.combat.validate()?;

    let attacker = find_template(&args.attacker, &extra)?;
    let defender = find_template(&args.defender, &extra)?;
    let report = balance::run_with_templates(&attacker, &defender, &config)?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{json}");
    Ok(())
}
