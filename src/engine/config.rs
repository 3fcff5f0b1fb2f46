//! Combat tuning table.
//!
//! Every number that shapes hit resolution or progression and is not an
//! authored stat lives here. Loaded from RON (authored files) or JSON
//! (bridge payloads) and checked with `validate` before use.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::*;
use crate::error::{CoreError, CoreResult};

/// Logistic curve `scale / (1 + e^(-k(x - midpoint)))`, shifted to pass
/// through zero at `x = 0` and expressed as a fraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveConfig {
    pub steepness: f64,
    pub midpoint: f64,
    /// Asymptote, in percent
    pub scale: f64,
    pub cap: f64,
}

impl CurveConfig {
    /// Curve value at `x`, rounded to two decimals, uncapped
    pub fn eval(&self, x: f64) -> f64 {
        let offset = self.scale / (1.0 + (self.steepness * self.midpoint).exp());
        let raw = self.scale / (1.0 + (-self.steepness * (x - self.midpoint)).exp());
        crate::numerics::round_to((raw - offset) / 100.0, 2)
    }
}

/// Per-attribute-point bonuses re-applied whenever attributes change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivedBonusConfig {
    pub str_life: f64,
    pub str_melee: f64,
    pub int_mana: f64,
    pub int_spell: f64,
    pub dex_crit: f64,
    pub dex_ranged: f64,
}

impl Default for DerivedBonusConfig {
    fn default() -> Self {
        Self {
            str_life: STR_LIFE_PER_POINT,
            str_melee: STR_MELEE_PER_POINT,
            int_mana: INT_MANA_PER_POINT,
            int_spell: INT_SPELL_PER_POINT,
            dex_crit: DEX_CRIT_PER_POINT,
            dex_ranged: DEX_RANGED_PER_POINT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    pub tick_dt: f64,
    pub armor: CurveConfig,
    pub dodge: CurveConfig,
    pub split_life_share: f64,
    pub split_mana_share: f64,
    /// Variance band given to template attacks
    pub variance: (f64, f64),
    pub dot_tick: f64,
    pub base_exp_to_next: u64,
    pub exp_growth: f64,
    pub derived: DerivedBonusConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        let curve = |cap| CurveConfig {
            steepness: CURVE_STEEPNESS,
            midpoint: CURVE_MIDPOINT,
            scale: CURVE_SCALE,
            cap,
        };
        Self {
            tick_dt: TICK_DT,
            armor: curve(ARMOR_CAP),
            dodge: curve(DODGE_CAP),
            split_life_share: SPLIT_LIFE_SHARE,
            split_mana_share: SPLIT_MANA_SHARE,
            variance: (DEFAULT_VARIANCE_LOW, DEFAULT_VARIANCE_HIGH),
            dot_tick: DEFAULT_DOT_TICK,
            base_exp_to_next: BASE_EXP_TO_NEXT,
            exp_growth: EXP_GROWTH,
            derived: DerivedBonusConfig::default(),
        }
    }
}

impl CombatConfig {
    pub fn validate(&self) -> CoreResult<()> {
        let fail = |msg: String| Err(CoreError::InvalidConfig(msg));
        if !(self.tick_dt > 0.0) {
            return fail(format!("tick_dt must be positive, got {}", self.tick_dt));
        }
        for (name, curve) in [("armor", &self.armor), ("dodge", &self.dodge)] {
            if !(0.0..=1.0).contains(&curve.cap) {
                return fail(format!("{name} cap {} outside [0, 1]", curve.cap));
            }
            if !(curve.steepness > 0.0) {
                return fail(format!("{name} steepness must be positive"));
            }
        }
        let shares = [self.split_life_share, self.split_mana_share];
        if shares.iter().any(|s| !(0.0..=1.0).contains(s))
            || (shares[0] + shares[1] - 1.0).abs() > 1e-9
        {
            return fail(format!("split shares {shares:?} must be fractions summing to 1"));
        }
        if self.variance.0 > self.variance.1 || self.variance.0 < 0.0 {
            return fail(format!("variance band {:?} is inverted or negative", self.variance));
        }
        if !(self.dot_tick >= MIN_DOT_TICK) {
            return fail(format!("dot_tick must be at least {MIN_DOT_TICK}, got {}", self.dot_tick));
        }
        if self.exp_growth < 1.0 || self.base_exp_to_next == 0 {
            return fail("experience curve must be non-decreasing and start above zero".into());
        }
        Ok(())
    }

    pub fn from_ron_str(s: &str) -> CoreResult<Self> {
        let config: Self = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_ron_string(&self) -> CoreResult<String> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }

    pub fn to_json(&self) -> CoreResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load from a `.ron` or `.json` file, by extension
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_ron_str(&content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CombatConfig::default().validate().is_ok());
    }

    #[test]
    fn test_curve_origin_and_shape() {
        let config = CombatConfig::default();
        assert_eq!(config.armor.eval(0.0), 0.0);
        let mid = config.armor.eval(7000.0);
        assert!(mid > 0.3 && mid < 0.45, "midpoint value {mid}");
        assert!(config.armor.eval(20000.0) > config.armor.eval(10000.0));
        assert!(config.armor.eval(1_000_000.0) <= 0.9);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = CombatConfig::default();
        config.tick_dt = 0.0;
        assert!(config.validate().is_err());

        let mut config = CombatConfig::default();
        config.armor.cap = 1.5;
        assert!(config.validate().is_err());

        let mut config = CombatConfig::default();
        config.variance = (1.2, 0.8);
        assert!(config.validate().is_err());

        let mut config = CombatConfig::default();
        config.split_mana_share = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ron_roundtrip_and_partial() {
        let config = CombatConfig::default();
        let ron = config.to_ron_string().unwrap();
        assert_eq!(CombatConfig::from_ron_str(&ron).unwrap(), config);

        let partial = CombatConfig::from_ron_str("(tick_dt: 0.02)").unwrap();
        assert_eq!(partial.tick_dt, 0.02);
        assert_eq!(partial.exp_growth, EXP_GROWTH);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("combat.json");
        std::fs::write(&path, r#"{"exp_growth": 2.0}"#).unwrap();
        let config = CombatConfig::load(&path).unwrap();
        assert_eq!(config.exp_growth, 2.0);

        let bad = dir.path().join("bad.ron");
        std::fs::write(&bad, "(tick_dt: -1.0)").unwrap();
        assert!(matches!(CombatConfig::load(&bad), Err(CoreError::InvalidConfig(_))));
    }
}
