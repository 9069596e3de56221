//! Combat formula set.
//!
//! Pure functions from a profile to hit chance, crit chance, weapon damage
//! and defense. Everything is re-derived on each call since equipment and
//! active effects may change between duels.

use crate::config::{CombatConfig, MainSkillMatching};
use crate::effects::{POTION_DAMAGE, POTION_DEFENSE};
use crate::profile::CombatProfile;
use crate::registry::ClassRegistry;
use crate::resolver::StatResolver;
use crate::stat::StatKey;

/// Formula set bound to a resolver and a config.
///
/// # Examples
///
/// ```rust
/// use duelcore::{ClassRegistry, CombatConfig, CombatFormulas, CombatProfile, StatKey};
///
/// let registry = ClassRegistry::builtin();
/// let config = CombatConfig::default();
/// let formulas = CombatFormulas::new(&registry, &config);
///
/// let profile = CombatProfile::new("1", "warrior")
///     .with_stat(StatKey::Strength, 20.0)
///     .with_stat(StatKey::Accuracy, 10.0);
/// // 0.3 + 0.6 * (10 / 20)
/// assert!((formulas.hit_chance(&profile) - 0.6).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CombatFormulas<'a> {
    resolver: StatResolver<'a>,
    config: &'a CombatConfig,
}

impl<'a> CombatFormulas<'a> {
    pub fn new(registry: &'a ClassRegistry, config: &'a CombatConfig) -> Self {
        Self {
            resolver: StatResolver::new(registry),
            config,
        }
    }

    pub fn resolver(&self) -> StatResolver<'a> {
        self.resolver
    }

    pub fn config(&self) -> &'a CombatConfig {
        self.config
    }

    /// Stat that drives the profile's attacks.
    pub fn main_skill_key(&self, profile: &CombatProfile) -> StatKey {
        let class = profile.class_id.as_str().to_lowercase();
        let lineage = match self.config.main_skill {
            MainSkillMatching::Literal => class.as_str(),
            MainSkillMatching::Lineage => self
                .resolver
                .registry()
                .lineage(&class)
                .map(|id| id.as_str())
                .unwrap_or(class.as_str()),
        };
        match lineage {
            "mage" => StatKey::Intelligence,
            "archer" => StatKey::Agility,
            _ => StatKey::Strength,
        }
    }

    /// Effective value of the main skill.
    pub fn main_skill(&self, profile: &CombatProfile) -> f64 {
        self.resolver
            .effective_stat(profile, self.main_skill_key(profile))
    }

    /// Effective accuracy over main skill, clamped to 1; 0 when the main
    /// skill is 0.
    pub fn accuracy_ratio(&self, profile: &CombatProfile) -> f64 {
        let main = self.main_skill(profile);
        if main > 0.0 {
            let accuracy = self.resolver.effective_stat(profile, StatKey::Accuracy);
            (accuracy / main).min(1.0)
        } else {
            0.0
        }
    }

    /// Chance that an attack lands, within `[hit_base, hit_base + hit_span]`.
    pub fn hit_chance(&self, attacker: &CombatProfile) -> f64 {
        self.config.hit_base + self.config.hit_span * self.accuracy_ratio(attacker)
    }

    /// Chance that a landed attack crits. Not clamped: weapon bonuses can
    /// push it past 1, which makes every hit a crit.
    pub fn crit_chance(&self, attacker: &CombatProfile) -> f64 {
        let base = self.config.crit_base + self.config.crit_span * self.accuracy_ratio(attacker);
        let bonus = attacker
            .weapon
            .as_ref()
            .map(|w| w.stats.crit_chance_bonus)
            .unwrap_or(0.0);
        base + bonus
    }

    /// Main skill scaled by the weapon's damage bonus.
    pub fn weapon_damage(&self, attacker: &CombatProfile) -> f64 {
        let bonus = attacker
            .weapon
            .as_ref()
            .map(|w| w.stats.damage_percent_bonus)
            .unwrap_or(0.0);
        self.main_skill(attacker) * (1.0 + bonus)
    }

    pub fn total_defense(&self, defender: &CombatProfile) -> f64 {
        self.resolver.effective_stat(defender, StatKey::Defense)
    }

    /// Raw damage boost from an active damage potion, or 0.
    pub fn attack_potion_bonus(&self, attacker: &CombatProfile) -> f64 {
        if attacker.active_effects.is_active(POTION_DAMAGE) {
            self.config.potion_damage_bonus
        } else {
            0.0
        }
    }

    /// Defense roll reduction from an active defense potion, or 0.
    pub fn defense_potion_reduction(&self, defender: &CombatProfile) -> f64 {
        if defender.active_effects.is_active(POTION_DEFENSE) {
            self.config.potion_defense_reduction
        } else {
            0.0
        }
    }

    /// Starting hit points, falling back when effective hp is not positive.
    ///
    /// Damage is whole, so a fractional hp rounds up: any positive hp
    /// survives until the first hit, the same as the raw value would.
    pub fn starting_hp(&self, profile: &CombatProfile) -> i64 {
        let hp = self.resolver.effective_stat(profile, StatKey::Hp);
        if hp > 0.0 {
            hp.ceil() as i64
        } else {
            self.config.fallback_hp
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{BaseStats, Weapon, WeaponStats};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_main_skill_by_lineage() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let formulas = CombatFormulas::new(&registry, &config);

        let key = |class: &str| formulas.main_skill_key(&CombatProfile::new("1", class));
        assert_eq!(key("mage"), StatKey::Intelligence);
        assert_eq!(key("Mage"), StatKey::Intelligence);
        assert_eq!(key("archmage"), StatKey::Intelligence);
        assert_eq!(key("archer"), StatKey::Agility);
        assert_eq!(key("storm_archer"), StatKey::Agility);
        assert_eq!(key("titan"), StatKey::Strength);
        assert_eq!(key("novice"), StatKey::Strength);
    }

    #[test]
    fn test_main_skill_literal() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig {
            main_skill: MainSkillMatching::Literal,
            ..CombatConfig::default()
        };
        let formulas = CombatFormulas::new(&registry, &config);

        let key = |class: &str| formulas.main_skill_key(&CombatProfile::new("1", class));
        assert_eq!(key("MAGE"), StatKey::Intelligence);
        assert_eq!(key("archer"), StatKey::Agility);
        assert_eq!(key("archmage"), StatKey::Strength);
        assert_eq!(key("marksman"), StatKey::Strength);
    }

    #[test]
    fn test_hit_chance_clamps_ratio() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let formulas = CombatFormulas::new(&registry, &config);
        let profile = CombatProfile::new("1", "warrior").with_stat(StatKey::Accuracy, 500.0);
        assert!(approx(formulas.accuracy_ratio(&profile), 1.0));
        assert!(approx(formulas.hit_chance(&profile), 0.9));
    }

    #[test]
    fn test_zero_main_skill_guards_division() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let formulas = CombatFormulas::new(&registry, &config);
        let profile = CombatProfile::new("1", "warrior").with_stats(BaseStats::empty());
        assert_eq!(formulas.accuracy_ratio(&profile), 0.0);
        assert!(approx(formulas.hit_chance(&profile), 0.3));
        assert!(approx(formulas.crit_chance(&profile), 0.1));
        assert_eq!(formulas.weapon_damage(&profile), 0.0);
        assert_eq!(formulas.starting_hp(&profile), 100);
    }

    #[test]
    fn test_starting_hp_keeps_fractional_hp() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let formulas = CombatFormulas::new(&registry, &config);

        let frail = CombatProfile::new("1", "warrior").with_stat(StatKey::Hp, 0.5);
        assert_eq!(formulas.starting_hp(&frail), 1);
        let sturdy = CombatProfile::new("1", "warrior").with_stat(StatKey::Hp, 120.25);
        assert_eq!(formulas.starting_hp(&sturdy), 121);
        let dead = CombatProfile::new("1", "warrior").with_stat(StatKey::Hp, 0.0);
        assert_eq!(formulas.starting_hp(&dead), 100);
    }

    #[test]
    fn test_crit_chance_not_clamped() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let formulas = CombatFormulas::new(&registry, &config);
        let weapon = Weapon::new(
            "weapon_dagger",
            WeaponStats {
                crit_chance_bonus: 0.8,
                ..WeaponStats::default()
            },
        );
        let profile = CombatProfile::new("1", "warrior")
            .with_stat(StatKey::Accuracy, 10.0)
            .with_weapon(weapon);
        // 0.1 + 0.4 * 1.0 + 0.8
        assert!(approx(formulas.crit_chance(&profile), 1.3));
    }

    #[test]
    fn test_weapon_damage_and_potions() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let formulas = CombatFormulas::new(&registry, &config);
        let weapon = Weapon::new(
            "weapon_axe",
            WeaponStats {
                damage_percent_bonus: 0.5,
                ..WeaponStats::default()
            },
        );
        let profile = CombatProfile::new("1", "warrior")
            .with_stat(StatKey::Strength, 20.0)
            .with_weapon(weapon)
            .with_effect(POTION_DAMAGE, 2)
            .with_effect(POTION_DEFENSE, 0);
        assert!(approx(formulas.weapon_damage(&profile), 30.0));
        assert!(approx(formulas.attack_potion_bonus(&profile), 0.1));
        assert_eq!(formulas.defense_potion_reduction(&profile), 0.0);
        assert_eq!(formulas.total_defense(&profile), 10.0);
    }
}
