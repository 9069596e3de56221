//! Combat tuning.
//!
//! Every numeric constant the formulas and the round loop use lives in
//! `CombatConfig`. The defaults are the live game values; a JSON document
//! can override any subset of them.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// How the attacking stat is chosen for a class id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainSkillMatching {
    /// Resolve the class id to its lineage root first, so advanced
    /// classes attack with their base class's stat.
    #[default]
    Lineage,
    /// Compare the lower-cased class id against "mage" and "archer" only.
    /// Advanced classes always fall through to strength.
    Literal,
}

/// Inclusive-exclusive range `[low, high)` a uniform roll is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Map a roll in `[0, 1)` into the band.
    pub fn lerp(self, roll: f64) -> f64 {
        self.low + roll * (self.high - self.low)
    }

    fn validate(self, name: &'static str) -> Result<(), ConfigError> {
        let finite = self.low.is_finite() && self.high.is_finite();
        if !finite || self.low < 0.0 || self.high < self.low {
            return Err(ConfigError::InvalidBand {
                name,
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }
}

/// Combat constants.
///
/// # Examples
///
/// ```rust
/// use duelcore::{CombatConfig, MainSkillMatching};
///
/// let config = CombatConfig::from_json(r#"{ "max_rounds": 10, "main_skill": "literal" }"#).unwrap();
/// assert_eq!(config.max_rounds, 10);
/// assert_eq!(config.main_skill, MainSkillMatching::Literal);
/// assert_eq!(config.crit_multiplier, 1.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Round cap of the duel loop.
    pub max_rounds: u32,
    /// Starting hit points when effective hp resolves to 0.
    pub fallback_hp: i64,
    pub hit_base: f64,
    pub hit_span: f64,
    pub crit_base: f64,
    pub crit_span: f64,
    pub crit_multiplier: f64,
    /// Minimum damage of a successful hit before the crit multiplier.
    pub min_damage: f64,
    pub damage_band: Band,
    pub defense_band: Band,
    /// Raw damage boost while the attacker has an active damage potion.
    pub potion_damage_bonus: f64,
    /// Defense roll reduction while the defender has an active defense potion.
    pub potion_defense_reduction: f64,
    pub main_skill: MainSkillMatching,
    /// Rows kept when a battle log is trimmed for display.
    pub display_rows: usize,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            max_rounds: 20,
            fallback_hp: 100,
            hit_base: 0.3,
            hit_span: 0.6,
            crit_base: 0.1,
            crit_span: 0.4,
            crit_multiplier: 1.5,
            min_damage: 1.0,
            damage_band: Band::new(0.8, 1.2),
            defense_band: Band::new(0.2, 0.4),
            potion_damage_bonus: 0.1,
            potion_defense_reduction: 0.1,
            main_skill: MainSkillMatching::Lineage,
            display_rows: 20,
        }
    }
}

impl CombatConfig {
    /// Parse a config document; absent fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed JSON, an empty round cap, or a band
    /// whose bounds are negative or reversed.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CombatConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds == 0 {
            return Err(ConfigError::ZeroRounds);
        }
        self.damage_band.validate("damage")?;
        self.defense_band.validate("defense")?;
        Ok(())
    }
}
