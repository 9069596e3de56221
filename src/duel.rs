//! Duel records.
//!
//! A duel is created `Pending`, moves to `InProgress` exactly once when an
//! acceptor wins the compare-and-swap, and ends `Completed`. Pending duels
//! that nobody accepts end `Expired` or `Cancelled`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest bet a challenge may carry.
pub const MAX_BET: u64 = 1000;

/// Seconds a pending duel stays open.
pub const PENDING_TTL_SECS: i64 = 300;

/// Experience granted to the winner of a duel.
pub const WINNER_XP: u64 = 100;

/// Experience granted to the loser of a duel.
pub const LOSER_XP: u64 = 30;

/// Store key of a duel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DuelId(String);

impl DuelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DuelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DuelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DuelId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    Pending,
    InProgress,
    Completed,
    Expired,
    Cancelled,
}

impl DuelStatus {
    /// No further transition is possible.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            DuelStatus::Completed | DuelStatus::Expired | DuelStatus::Cancelled
        )
    }
}

/// Stored duel.
///
/// # Examples
///
/// ```rust
/// use chrono::{Duration, TimeZone, Utc};
/// use duelcore::{DuelRecord, DuelStatus};
///
/// let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
/// let duel = DuelRecord::new("d1", "alice", None, 50, now);
/// assert_eq!(duel.status, DuelStatus::Pending);
/// assert!(duel.is_open());
/// assert!(!duel.is_expired(now + Duration::minutes(4)));
/// assert!(duel.is_expired(now + Duration::minutes(5)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuelRecord {
    pub id: DuelId,
    pub challenger_id: String,
    /// `None` for an open challenge anyone may accept.
    pub opponent_id: Option<String>,
    pub bet: u64,
    #[serde(default)]
    pub weapon_id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    pub status: DuelStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub winner_id: Option<String>,
    #[serde(default)]
    pub battle_log: Vec<String>,
}

impl DuelRecord {
    pub fn new(
        id: impl Into<DuelId>,
        challenger_id: impl Into<String>,
        opponent_id: Option<String>,
        bet: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            challenger_id: challenger_id.into(),
            opponent_id,
            bet,
            weapon_id: None,
            message_id: None,
            status: DuelStatus::Pending,
            created_at: now,
            expires_at: now + Duration::seconds(PENDING_TTL_SECS),
            completed_at: None,
            winner_id: None,
            battle_log: Vec::new(),
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_weapon_id(mut self, weapon_id: Option<String>) -> Self {
        self.weapon_id = weapon_id;
        self
    }

    pub fn is_open(&self) -> bool {
        self.opponent_id.is_none()
    }

    pub fn is_pending(&self) -> bool {
        self.status == DuelStatus::Pending
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Challenger or named opponent.
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.challenger_id == user_id || self.opponent_id.as_deref() == Some(user_id)
    }

    /// Record the result of a finished fight.
    pub fn complete(
        &mut self,
        winner_id: impl Into<String>,
        battle_log: Vec<String>,
        now: DateTime<Utc>,
    ) {
        self.status = DuelStatus::Completed;
        self.winner_id = Some(winner_id.into());
        self.battle_log = battle_log;
        self.completed_at = Some(now);
    }
}
