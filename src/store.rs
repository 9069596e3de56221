//! Character and duel stores.
//!
//! The traits describe what the duel service needs from persistence. The
//! in-memory implementations back tests and local runs; a document-store
//! adapter implements the same traits outside this crate.

use crate::character::Character;
use crate::duel::{DuelId, DuelRecord, DuelStatus};
use crate::effects::ActiveEffects;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence for character records.
pub trait CharacterStore: Send + Sync {
    fn load(&self, id: &str) -> Result<Option<Character>>;

    fn save(&self, character: &Character) -> Result<()>;

    /// Write several effect maps in one batch. Unknown ids are skipped.
    fn save_effects(&self, updates: &[(&str, &ActiveEffects)]) -> Result<()>;
}

/// Persistence for duel records.
pub trait DuelStore: Send + Sync {
    fn insert(&self, duel: DuelRecord) -> Result<()>;

    fn get(&self, id: &DuelId) -> Result<Option<DuelRecord>>;

    /// A pending duel the user takes part in, as challenger or named
    /// opponent.
    fn find_pending_for(&self, user_id: &str) -> Result<Option<DuelRecord>>;

    /// Atomically move a duel from `from` to `to`.
    ///
    /// Returns `Ok(false)` when the duel was no longer in `from`.
    fn transition(&self, id: &DuelId, from: DuelStatus, to: DuelStatus) -> Result<bool>;

    /// Overwrite an existing duel.
    fn update(&self, duel: &DuelRecord) -> Result<()>;

    /// Mark every pending duel past its expiry as expired. Returns the ids
    /// that changed.
    fn expire_stale(&self, now: DateTime<Utc>) -> Result<Vec<DuelId>>;

    /// Claim a pending duel for `acceptor_id` and move it to `InProgress`.
    ///
    /// Only one caller ever sees [`Claim::Claimed`] for a given duel, and a
    /// user is never a participant of two claimed duels at once: the claim
    /// is refused with [`Claim::Busy`] while either side takes part in
    /// another pending or in-progress duel.
    fn begin(&self, id: &DuelId, acceptor_id: &str) -> Result<Claim>;
}

/// Result of [`DuelStore::begin`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Claimed,
    /// Another caller claimed, cancelled or expired the duel first.
    NotPending,
    /// The user takes part in another active duel.
    Busy(String),
}

/// In-memory character store.
#[derive(Debug, Default)]
pub struct InMemoryCharacterStore {
    characters: RwLock<HashMap<String, Character>>,
}

impl InMemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with the given characters.
    pub fn with_characters(characters: impl IntoIterator<Item = Character>) -> Self {
        let characters = characters
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        Self {
            characters: RwLock::new(characters),
        }
    }
}

impl CharacterStore for InMemoryCharacterStore {
    fn load(&self, id: &str) -> Result<Option<Character>> {
        let characters = self
            .characters
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(characters.get(id).cloned())
    }

    fn save(&self, character: &Character) -> Result<()> {
        let mut characters = self
            .characters
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        characters.insert(character.id.clone(), character.clone());
        Ok(())
    }

    fn save_effects(&self, updates: &[(&str, &ActiveEffects)]) -> Result<()> {
        let mut characters = self
            .characters
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        for (id, effects) in updates {
            if let Some(character) = characters.get_mut(*id) {
                character.active_effects = (*effects).clone();
            }
        }
        Ok(())
    }
}

/// In-memory duel store.
#[derive(Debug, Default)]
pub struct InMemoryDuelStore {
    duels: RwLock<HashMap<DuelId, DuelRecord>>,
}

impl InMemoryDuelStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DuelStore for InMemoryDuelStore {
    fn insert(&self, duel: DuelRecord) -> Result<()> {
        let mut duels = self.duels.write().map_err(|_| StoreError::LockPoisoned)?;
        duels.insert(duel.id.clone(), duel);
        Ok(())
    }

    fn get(&self, id: &DuelId) -> Result<Option<DuelRecord>> {
        let duels = self.duels.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(duels.get(id).cloned())
    }

    fn find_pending_for(&self, user_id: &str) -> Result<Option<DuelRecord>> {
        let duels = self.duels.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(duels
            .values()
            .find(|duel| duel.is_pending() && duel.is_participant(user_id))
            .cloned())
    }

    fn transition(&self, id: &DuelId, from: DuelStatus, to: DuelStatus) -> Result<bool> {
        let mut duels = self.duels.write().map_err(|_| StoreError::LockPoisoned)?;
        let duel = duels
            .get_mut(id)
            .ok_or_else(|| StoreError::DuelNotFound(id.clone()))?;
        if duel.status != from {
            tracing::warn!(
                duel = %id,
                status = ?duel.status,
                expected = ?from,
                "Rejected transition"
            );
            return Ok(false);
        }
        duel.status = to;
        Ok(true)
    }

    fn begin(&self, id: &DuelId, acceptor_id: &str) -> Result<Claim> {
        let mut duels = self.duels.write().map_err(|_| StoreError::LockPoisoned)?;
        let challenger_id = match duels.get(id) {
            Some(duel) if duel.is_pending() => duel.challenger_id.clone(),
            Some(duel) => {
                tracing::warn!(duel = %id, status = ?duel.status, "Rejected claim");
                return Ok(Claim::NotPending);
            }
            None => return Err(StoreError::DuelNotFound(id.clone())),
        };

        for user in [challenger_id.as_str(), acceptor_id] {
            let busy = duels.values().any(|other| {
                other.id != *id
                    && matches!(other.status, DuelStatus::Pending | DuelStatus::InProgress)
                    && other.is_participant(user)
            });
            if busy {
                tracing::warn!(duel = %id, user, "Participant busy in another duel");
                return Ok(Claim::Busy(user.to_string()));
            }
        }

        let duel = duels
            .get_mut(id)
            .ok_or_else(|| StoreError::DuelNotFound(id.clone()))?;
        duel.status = DuelStatus::InProgress;
        duel.opponent_id = Some(acceptor_id.to_string());
        Ok(Claim::Claimed)
    }

    fn update(&self, duel: &DuelRecord) -> Result<()> {
        let mut duels = self.duels.write().map_err(|_| StoreError::LockPoisoned)?;
        let slot = duels
            .get_mut(&duel.id)
            .ok_or_else(|| StoreError::DuelNotFound(duel.id.clone()))?;
        *slot = duel.clone();
        Ok(())
    }

    fn expire_stale(&self, now: DateTime<Utc>) -> Result<Vec<DuelId>> {
        let mut duels = self.duels.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut expired: Vec<DuelId> = duels
            .values_mut()
            .filter(|duel| duel.is_pending() && duel.is_expired(now))
            .map(|duel| {
                duel.status = DuelStatus::Expired;
                duel.id.clone()
            })
            .collect();
        expired.sort_unstable();
        for id in &expired {
            tracing::warn!(duel = %id, "Duel expired");
        }
        Ok(expired)
    }
}
