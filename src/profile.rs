//! Character combat profile.
//!
//! A `CombatProfile` is the read view the combat engine works on: base
//! stats, class, resolved equipment and active effects. It is assembled
//! fresh for every duel and never cached between duels.

use crate::effects::ActiveEffects;
use crate::registry::ClassId;
use crate::stat::StatKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest display name written to a battle log row.
pub const LOG_NAME_LEN: usize = 14;

/// Raw attribute values of a character.
///
/// Stats absent from the map read as 0.
///
/// # Examples
///
/// ```rust
/// use duelcore::{BaseStats, StatKey};
///
/// let stats = BaseStats::default();
/// assert_eq!(stats.get(StatKey::Hp), 100.0);
/// assert_eq!(stats.get(StatKey::Accuracy), 10.0);
///
/// let empty = BaseStats::empty();
/// assert_eq!(empty.get(StatKey::Strength), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseStats(BTreeMap<StatKey, f64>);

impl Default for BaseStats {
    fn default() -> Self {
        Self(
            StatKey::ALL
                .into_iter()
                .map(|key| (key, key.default_base()))
                .collect(),
        )
    }
}

impl BaseStats {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, key: StatKey) -> f64 {
        self.0.get(&key).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: StatKey, value: f64) {
        self.0.insert(key, value);
    }

    /// Builder-style `set`.
    pub fn with(mut self, key: StatKey, value: f64) -> Self {
        self.set(key, value);
        self
    }

    pub fn add(&mut self, key: StatKey, amount: f64) {
        let value = self.get(key) + amount;
        self.set(key, value);
    }
}

/// Percentage bonuses carried by a weapon. All values are fractions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeaponStats {
    pub damage_percent_bonus: f64,
    pub accuracy_bonus: f64,
    pub crit_chance_bonus: f64,
}

/// An equipped weapon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weapon {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stats: WeaponStats,
    #[serde(default)]
    pub enhance: u32,
}

impl Weapon {
    pub fn new(id: impl Into<String>, stats: WeaponStats) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            stats,
            enhance: 0,
        }
    }
}

/// Percentage bonuses carried by armor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArmorStats {
    pub defense_percent_bonus: f64,
}

/// Equipped armor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Armor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stats: ArmorStats,
    #[serde(default)]
    pub enhance: u32,
}

impl Armor {
    pub fn new(id: impl Into<String>, defense_percent_bonus: f64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            stats: ArmorStats {
                defense_percent_bonus,
            },
            enhance: 0,
        }
    }
}

/// Everything the combat engine reads about one duelist.
///
/// # Examples
///
/// ```rust
/// use duelcore::{CombatProfile, StatKey};
///
/// let profile = CombatProfile::new("1234", "warrior")
///     .with_display_name("Весьма Длинное Имя Игрока")
///     .with_stat(StatKey::Strength, 20.0);
/// assert_eq!(profile.log_name().chars().count(), 14);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub class_id: ClassId,
    #[serde(default)]
    pub base_stats: BaseStats,
    #[serde(default)]
    pub weapon: Option<Weapon>,
    #[serde(default)]
    pub armor: Option<Armor>,
    #[serde(default)]
    pub active_effects: ActiveEffects,
}

impl CombatProfile {
    /// Profile with default stats and no equipment.
    pub fn new(id: impl Into<String>, class_id: impl Into<ClassId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            class_id: class_id.into(),
            base_stats: BaseStats::default(),
            weapon: None,
            armor: None,
            active_effects: ActiveEffects::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_stats(mut self, stats: BaseStats) -> Self {
        self.base_stats = stats;
        self
    }

    pub fn with_stat(mut self, key: StatKey, value: f64) -> Self {
        self.base_stats.set(key, value);
        self
    }

    pub fn with_weapon(mut self, weapon: Weapon) -> Self {
        self.weapon = Some(weapon);
        self
    }

    pub fn with_armor(mut self, armor: Armor) -> Self {
        self.armor = Some(armor);
        self
    }

    pub fn with_effect(mut self, effect: &str, remaining: i32) -> Self {
        self.active_effects.insert(effect, remaining);
        self
    }

    /// Name written to battle log rows: the display name, or the id when
    /// there is none, cut to [`LOG_NAME_LEN`] characters.
    pub fn log_name(&self) -> String {
        self.display_name
            .as_deref()
            .unwrap_or(&self.id)
            .chars()
            .take(LOG_NAME_LEN)
            .collect()
    }
}
