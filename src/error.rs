//! Error types.
//!
//! The combat core itself never fails: missing stats read as zero and
//! unknown classes degrade to a neutral definition. Errors only come from
//! loading data, character progression and the duel lifecycle.

use crate::duel::DuelId;
use crate::registry::ClassId;
use crate::stat::StatKey;
use thiserror::Error;

/// A stat name that is not one of the six known keys.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StatKeyError {
    #[error("Unknown stat: {0}")]
    UnknownStat(String),
}

/// Errors raised while loading a class registry document.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid registry document: {0}")]
    Json(#[from] serde_json::Error),

    /// Class ids must be unique across every base class and tier.
    #[error("Duplicate class id: {0}")]
    DuplicateClass(ClassId),

    #[error("Invalid tier level '{level}' under class {class}")]
    InvalidTier { class: ClassId, level: String },

    #[error("Negative multiplier for {stat} on class {class}")]
    NegativeMultiplier { class: ClassId, stat: StatKey },
}

/// Errors raised while loading combat tuning.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid combat config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid {name} band: [{low}, {high}]")]
    InvalidBand {
        name: &'static str,
        low: f64,
        high: f64,
    },

    #[error("Round cap must be at least 1")]
    ZeroRounds,
}

/// Errors from character progression and item use.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CharacterError {
    #[error("Point amount must be at least 1")]
    InvalidPointAmount,

    #[error("Not enough unspent points: requested {requested}, available {available}")]
    NotEnoughPoints { requested: u32, available: u32 },

    /// No advancement tier is unlocked yet for the character's lineage.
    #[error("Class {base} has no advancement at level {level}{}", .next_threshold.map(|t| format!(" (next at level {t})")).unwrap_or_default())]
    AdvancementLocked {
        base: ClassId,
        level: u32,
        next_threshold: Option<u32>,
    },

    #[error("Class {0} is not offered at the current level")]
    ClassNotOffered(ClassId),

    #[error("Class {0} has no advancement lineage")]
    NoLineage(ClassId),

    #[error("Effect {0} is already active")]
    EffectAlreadyActive(String),
}

/// Errors from a character or duel store.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Duel not found: {0}")]
    DuelNotFound(DuelId),

    /// Failure reported by a persistent backend.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Errors from the duel lifecycle.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DuelError {
    #[error("Bet {bet} exceeds the maximum of {max}")]
    BetTooLarge { bet: u64, max: u64 },

    #[error("A user cannot challenge themselves")]
    SelfChallenge,

    #[error("User {0} has no character")]
    NoCharacter(String),

    #[error("User {0} is already in a duel")]
    AlreadyInDuel(String),

    #[error("Duel not found: {0}")]
    NotFound(DuelId),

    #[error("Duel {0} is no longer pending")]
    NotPending(DuelId),

    #[error("Duel {0} has expired")]
    Expired(DuelId),

    #[error("A challenger cannot accept their own duel")]
    OwnDuel,

    #[error("Only the named opponent can accept this duel")]
    NotTheOpponent,

    #[error("Not enough bonuses: have {have}, need {need}")]
    InsufficientBonuses { have: u64, need: u64 },

    #[error("User {0} is not a participant of this duel")]
    NotParticipant(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
