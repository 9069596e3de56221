//! Stat resolver module.
//!
//! Turns a profile's raw attributes into effective values:
//!
//! ```text
//! effective = base + floor(base * class_multiplier)
//! accuracy += floor(effective * weapon.accuracy_bonus)
//! defense  += floor(effective * armor.defense_percent_bonus)
//! ```
//!
//! Equipment bonuses compound on the class-adjusted value, not the raw
//! base. Nothing is cached: effective values are recomputed on every call.

use crate::profile::CombatProfile;
use crate::registry::ClassRegistry;
use crate::resolved::ResolvedStat;
use crate::stat::StatKey;
use std::collections::BTreeMap;

/// Computes effective stats against a class registry.
///
/// # Examples
///
/// ```rust
/// use duelcore::{ClassRegistry, CombatProfile, StatKey, StatResolver};
///
/// let registry = ClassRegistry::builtin();
/// let resolver = StatResolver::new(&registry);
///
/// let profile = CombatProfile::new("1", "gladiator").with_stat(StatKey::Strength, 20.0);
/// // 20 + floor(20 * 1.3)
/// assert_eq!(resolver.effective_stat(&profile, StatKey::Strength), 46.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct StatResolver<'a> {
    registry: &'a ClassRegistry,
}

impl<'a> StatResolver<'a> {
    pub fn new(registry: &'a ClassRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a ClassRegistry {
        self.registry
    }

    /// Effective value of one stat.
    pub fn effective_stat(&self, profile: &CombatProfile, key: StatKey) -> f64 {
        self.resolve(profile, key).value
    }

    /// Effective value of one stat with its breakdown.
    pub fn resolve(&self, profile: &CombatProfile, key: StatKey) -> ResolvedStat {
        let base = profile.base_stats.get(key);
        let mut resolved = ResolvedStat::new(key, base);

        let class = self
            .registry
            .resolve_class_definition(profile.class_id.as_str());
        if class.id != profile.class_id {
            tracing::debug!(
                character = %profile.id,
                class = %profile.class_id,
                "Unknown class, using neutral multipliers"
            );
        }
        let mult = class.stat_multipliers.get(key);
        if mult != 0.0 {
            resolved.push_step(format!("{} x{}", class.id, mult), (base * mult).floor());
        }

        match key {
            StatKey::Accuracy => {
                if let Some(weapon) = &profile.weapon {
                    let bonus = weapon.stats.accuracy_bonus;
                    if bonus != 0.0 {
                        let added = (resolved.value * bonus).floor();
                        resolved.push_step(
                            format!("{} accuracy {:+}%", weapon.id, bonus * 100.0),
                            added,
                        );
                    }
                }
            }
            StatKey::Defense => {
                if let Some(armor) = &profile.armor {
                    let bonus = armor.stats.defense_percent_bonus;
                    if bonus != 0.0 {
                        let added = (resolved.value * bonus).floor();
                        resolved.push_step(
                            format!("{} defense {:+}%", armor.id, bonus * 100.0),
                            added,
                        );
                    }
                }
            }
            _ => {}
        }

        resolved
    }

    /// Effective values of all six stats.
    pub fn effective_stats(&self, profile: &CombatProfile) -> BTreeMap<StatKey, f64> {
        StatKey::ALL
            .into_iter()
            .map(|key| (key, self.effective_stat(profile, key)))
            .collect()
    }
}
