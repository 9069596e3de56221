//! Persisted character and progression.
//!
//! A `Character` is the stored record of one player. The combat engine never
//! sees it directly; [`Character::combat_profile`] assembles a fresh
//! [`CombatProfile`] snapshot for every duel.

use crate::effects::{ActiveEffects, POTION_DURATION};
use crate::error::CharacterError;
use crate::profile::{Armor, BaseStats, CombatProfile, Weapon};
use crate::registry::{ClassId, ClassRegistry};
use crate::stat::StatKey;
use serde::{Deserialize, Serialize};

/// Unspent points of a freshly created character.
pub const STARTING_POINTS: u32 = 5;

/// Points granted per level gained.
pub const POINTS_PER_LEVEL: u32 = 5;

/// Base hp granted per level gained.
pub const HP_PER_LEVEL: f64 = 10.0;

/// Base defense granted per level gained.
pub const DEFENSE_PER_LEVEL: f64 = 2.0;

/// Experience needed to leave `level`.
pub fn xp_threshold(level: u32) -> u64 {
    500 * u64::from(level)
}

/// Base stats of a character at `level` that never invested a point: the
/// defaults plus the hp and defense granted by each level gained.
pub fn level_baseline(level: u32) -> BaseStats {
    let gained = f64::from(level.saturating_sub(1));
    let mut stats = BaseStats::default();
    stats.add(StatKey::Hp, HP_PER_LEVEL * gained);
    stats.add(StatKey::Defense, DEFENSE_PER_LEVEL * gained);
    stats
}

/// Duel record shown on the profile card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLoss {
    pub wins: u32,
    pub losses: u32,
}

impl WinLoss {
    pub fn total(&self) -> u32 {
        self.wins + self.losses
    }
}

/// Summary of an [`Character::award_xp`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelProgress {
    pub levels_gained: u32,
    pub level: u32,
    pub xp: u64,
    pub points_gained: u32,
}

impl LevelProgress {
    pub fn leveled_up(&self) -> bool {
        self.levels_gained > 0
    }
}

/// Stored character record.
///
/// # Examples
///
/// ```rust
/// use duelcore::{Character, StatKey};
///
/// let mut hero = Character::new("42", "warrior");
/// hero.invest_points(StatKey::Hp, 2).unwrap();
/// assert_eq!(hero.stats.get(StatKey::Hp), 120.0);
///
/// let progress = hero.award_xp(600);
/// assert_eq!(progress.level, 2);
/// assert_eq!(hero.xp, 100);
/// assert_eq!(hero.unspent_points, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub id: String,
    #[serde(default)]
    pub nickname: Option<String>,
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub unspent_points: u32,
    #[serde(default)]
    pub stats: BaseStats,
    pub class_id: ClassId,
    #[serde(default)]
    pub weapon: Option<Weapon>,
    #[serde(default)]
    pub armor: Option<Armor>,
    #[serde(default)]
    pub active_effects: ActiveEffects,
    #[serde(default)]
    pub record: WinLoss,
    #[serde(default)]
    pub bonuses: u64,
}

impl Character {
    /// Level 1 character with default stats and starting points.
    pub fn new(id: impl Into<String>, class_id: impl Into<ClassId>) -> Self {
        Self {
            id: id.into(),
            nickname: None,
            level: 1,
            xp: 0,
            unspent_points: STARTING_POINTS,
            stats: BaseStats::default(),
            class_id: class_id.into(),
            weapon: None,
            armor: None,
            active_effects: ActiveEffects::new(),
            record: WinLoss::default(),
            bonuses: 0,
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_bonuses(mut self, bonuses: u64) -> Self {
        self.bonuses = bonuses;
        self
    }

    /// Snapshot the combat-relevant fields.
    pub fn combat_profile(&self) -> CombatProfile {
        CombatProfile {
            id: self.id.clone(),
            display_name: self.nickname.clone(),
            class_id: self.class_id.clone(),
            base_stats: self.stats.clone(),
            weapon: self.weapon.clone(),
            armor: self.armor.clone(),
            active_effects: self.active_effects.clone(),
        }
    }

    pub fn xp_threshold(&self) -> u64 {
        xp_threshold(self.level)
    }

    /// Add experience and apply every level-up it pays for.
    pub fn award_xp(&mut self, amount: u64) -> LevelProgress {
        self.xp += amount;
        let mut levels_gained = 0;
        while self.xp >= self.xp_threshold() {
            self.xp -= self.xp_threshold();
            self.level += 1;
            self.unspent_points += POINTS_PER_LEVEL;
            self.stats.add(StatKey::Hp, HP_PER_LEVEL);
            self.stats.add(StatKey::Defense, DEFENSE_PER_LEVEL);
            levels_gained += 1;
        }

        if levels_gained > 0 {
            tracing::info!(character = %self.id, level = self.level, levels_gained, "Level up");
        }

        LevelProgress {
            levels_gained,
            level: self.level,
            xp: self.xp,
            points_gained: levels_gained * POINTS_PER_LEVEL,
        }
    }

    /// Spend unspent points on a stat. Returns the new base value.
    ///
    /// # Errors
    ///
    /// Fails when `points` is 0 or exceeds the unspent points.
    pub fn invest_points(&mut self, stat: StatKey, points: u32) -> Result<f64, CharacterError> {
        if points == 0 {
            return Err(CharacterError::InvalidPointAmount);
        }
        if points > self.unspent_points {
            return Err(CharacterError::NotEnoughPoints {
                requested: points,
                available: self.unspent_points,
            });
        }

        self.unspent_points -= points;
        self.stats
            .add(stat, stat.points_per_investment() * f64::from(points));
        Ok(self.stats.get(stat))
    }

    /// Return every invested point and put the stats back to
    /// [`level_baseline`]. Returns the points refunded.
    ///
    /// Each stat refunds its surplus over the baseline divided by
    /// [`StatKey::points_per_investment`], so 10 hp give back one point.
    /// Stats below the baseline are raised to it without a refund.
    pub fn reset_build(&mut self) -> u32 {
        let baseline = level_baseline(self.level);
        let refunded: u32 = StatKey::ALL
            .into_iter()
            .map(|key| {
                let surplus = (self.stats.get(key) - baseline.get(key)).max(0.0);
                (surplus / key.points_per_investment()).floor() as u32
            })
            .sum();

        self.stats = baseline;
        self.unspent_points += refunded;
        tracing::info!(character = %self.id, refunded, "Build reset");
        refunded
    }

    /// Switch to an advanced class of the character's lineage.
    ///
    /// The target must be offered at the character's level by the tier of
    /// its lineage root. Returns the previous class id.
    ///
    /// # Errors
    ///
    /// - [`CharacterError::NoLineage`] when the current class is unknown
    /// - [`CharacterError::AdvancementLocked`] when no tier is reached yet
    /// - [`CharacterError::ClassNotOffered`] when the target is not offered
    pub fn change_class(
        &mut self,
        registry: &ClassRegistry,
        target: &str,
    ) -> Result<ClassId, CharacterError> {
        let base = registry
            .lineage(self.class_id.as_str())
            .ok_or_else(|| CharacterError::NoLineage(self.class_id.clone()))?;

        let options = registry.advancement_options(base.as_str(), self.level);
        if options.is_empty() {
            return Err(CharacterError::AdvancementLocked {
                base: base.clone(),
                level: self.level,
                next_threshold: registry.next_threshold(base.as_str(), self.level),
            });
        }

        let chosen = options
            .iter()
            .find(|def| def.id.as_str() == target)
            .ok_or_else(|| CharacterError::ClassNotOffered(ClassId::from(target)))?;

        let previous = std::mem::replace(&mut self.class_id, chosen.id.clone());
        tracing::info!(
            character = %self.id,
            from = %previous,
            to = %self.class_id,
            "Class changed"
        );
        Ok(previous)
    }

    /// Activate a potion for [`POTION_DURATION`] duels.
    pub fn use_potion(&mut self, effect: &str) -> Result<(), CharacterError> {
        self.active_effects.activate(effect, POTION_DURATION)
    }

    /// Wins over total duels, 0 before the first duel.
    pub fn win_rate(&self) -> f64 {
        match self.record.total() {
            0 => 0.0,
            total => f64::from(self.record.wins) / f64::from(total),
        }
    }
}
