//! Stat key module.
//!
//! Provides the `StatKey` type naming the six character attributes the
//! duel engine understands. Keys serialize as their lower-case names so
//! they match the field names stored in character documents.

use crate::error::StatKeyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A character attribute.
///
/// # Examples
///
/// ```rust
/// use duelcore::StatKey;
///
/// let key: StatKey = "accuracy".parse().unwrap();
/// assert_eq!(key, StatKey::Accuracy);
/// assert_eq!(key.as_str(), "accuracy");
/// ```
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKey {
    Strength,
    Agility,
    Intelligence,
    Accuracy,
    Hp,
    Defense,
}

impl StatKey {
    /// All keys in display order.
    pub const ALL: [StatKey; 6] = [
        StatKey::Strength,
        StatKey::Agility,
        StatKey::Intelligence,
        StatKey::Accuracy,
        StatKey::Hp,
        StatKey::Defense,
    ];

    /// Get the lower-case name of this key.
    pub fn as_str(self) -> &'static str {
        match self {
            StatKey::Strength => "strength",
            StatKey::Agility => "agility",
            StatKey::Intelligence => "intelligence",
            StatKey::Accuracy => "accuracy",
            StatKey::Hp => "hp",
            StatKey::Defense => "defense",
        }
    }

    /// Starting value of this stat for a freshly created character.
    pub fn default_base(self) -> f64 {
        match self {
            StatKey::Hp => 100.0,
            _ => 10.0,
        }
    }

    /// How much one invested point raises this stat.
    pub fn points_per_investment(self) -> f64 {
        match self {
            StatKey::Hp => 10.0,
            _ => 1.0,
        }
    }
}

impl FromStr for StatKey {
    type Err = StatKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| StatKeyError::UnknownStat(s.to_string()))
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
