//! Resolved stat results module.
//!
//! Contains the `ResolvedStat` type: an effective stat value together with
//! the steps that produced it, for profile cards and debugging.

use crate::stat::StatKey;
use serde::{Deserialize, Serialize};

/// One step of an effective stat computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveStep {
    /// Human-readable description of the step.
    pub description: String,
    /// Amount the step added (floored).
    pub bonus: f64,
    /// Running value after the step.
    pub value: f64,
}

/// An effective stat value with its breakdown.
///
/// # Examples
///
/// ```rust
/// use duelcore::{ResolvedStat, StatKey};
///
/// let mut resolved = ResolvedStat::new(StatKey::Defense, 10.0);
/// resolved.push_step("Class multiplier 1.3x", 13.0);
/// resolved.push_step("Armor +10%", 2.0);
///
/// assert_eq!(resolved.value, 25.0);
/// assert_eq!(resolved.steps.len(), 2);
/// assert_eq!(resolved.steps[0].value, 23.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStat {
    pub stat: StatKey,

    /// Raw base value read from the profile.
    pub base: f64,

    /// The final effective value.
    pub value: f64,

    /// Steps in the order they were applied.
    pub steps: Vec<ResolveStep>,
}

impl ResolvedStat {
    /// Start a resolution from the base value.
    pub fn new(stat: StatKey, base: f64) -> Self {
        Self {
            stat,
            base,
            value: base,
            steps: Vec::new(),
        }
    }

    /// Add `bonus` to the running value and record the step.
    pub fn push_step(&mut self, description: impl Into<String>, bonus: f64) {
        self.value += bonus;
        self.steps.push(ResolveStep {
            description: description.into(),
            bonus,
            value: self.value,
        });
    }

    /// Total added on top of the base value.
    pub fn total_bonus(&self) -> f64 {
        self.value - self.base
    }
}

impl std::fmt::Display for ResolvedStat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.stat, self.value)?;
        if !self.steps.is_empty() {
            write!(f, " (base {}", self.base)?;
            for step in &self.steps {
                write!(f, ", {} {:+}", step.description, step.bonus)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
