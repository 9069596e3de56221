//! Transient consumable effects.
//!
//! An active effect is a remaining-uses counter keyed by effect id. Every
//! completed duel consumes one use from each active effect; effects whose
//! counter reaches zero are removed.

use crate::error::CharacterError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Effect id of the damage potion.
pub const POTION_DAMAGE: &str = "potion_damage";

/// Effect id of the defense potion.
pub const POTION_DEFENSE: &str = "potion_defense";

/// Duels a freshly used potion lasts.
pub const POTION_DURATION: i32 = 5;

/// Remaining uses of one effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectState {
    pub remaining: i32,
}

/// Active effects of a character, keyed by effect id.
///
/// # Examples
///
/// ```rust
/// use duelcore::ActiveEffects;
///
/// let mut effects = ActiveEffects::new();
/// effects.insert("potion_damage", 1);
/// effects.insert("potion_defense", 3);
///
/// let expired = effects.decay();
/// assert_eq!(expired, vec!["potion_damage".to_string()]);
/// assert_eq!(effects.remaining("potion_defense"), 2);
/// assert!(!effects.is_active("potion_damage"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveEffects(BTreeMap<String, EffectState>);

impl ActiveEffects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the remaining uses of an effect, replacing any previous counter.
    pub fn insert(&mut self, effect: impl Into<String>, remaining: i32) {
        self.0.insert(effect.into(), EffectState { remaining });
    }

    /// Remaining uses of an effect; 0 when absent.
    pub fn remaining(&self, effect: &str) -> i32 {
        self.0.get(effect).map(|state| state.remaining).unwrap_or(0)
    }

    pub fn is_active(&self, effect: &str) -> bool {
        self.remaining(effect) > 0
    }

    /// Start an effect for `uses` duels.
    ///
    /// # Errors
    ///
    /// Returns [`CharacterError::EffectAlreadyActive`] while the effect still
    /// has uses left.
    pub fn activate(&mut self, effect: &str, uses: i32) -> Result<(), CharacterError> {
        if self.is_active(effect) {
            return Err(CharacterError::EffectAlreadyActive(effect.to_string()));
        }
        self.insert(effect, uses);
        Ok(())
    }

    /// Consume one use of every effect and drop the exhausted ones.
    ///
    /// Returns the ids of the removed effects.
    pub fn decay(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        self.0.retain(|id, state| {
            if state.remaining > 0 {
                state.remaining -= 1;
            }
            if state.remaining <= 0 {
                expired.push(id.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(id, state)| (id.as_str(), state.remaining))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
