//! Duel lifecycle.
//!
//! `DuelService` validates challenges and acceptances, claims a duel
//! through the store's compare-and-swap, runs the simulator and applies the
//! outcome to both characters. It holds no global state: stores, registry
//! and config are handed in at construction.

use crate::character::{Character, LevelProgress};
use crate::config::CombatConfig;
use crate::duel::{DuelId, DuelRecord, DuelStatus, LOSER_XP, MAX_BET, WINNER_XP};
use crate::error::DuelError;
use crate::registry::ClassRegistry;
use crate::rng::CombatRng;
use crate::simulator::{DuelOutcome, DuelSimulator, Side};
use crate::store::{CharacterStore, Claim, DuelStore};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Everything an accepted duel produced.
#[derive(Debug, Clone)]
pub struct DuelResolution {
    /// The completed duel record as stored.
    pub duel: DuelRecord,
    pub outcome: DuelOutcome,
    pub settlement: Settlement,
    /// Trimmed battle log ready for posting.
    pub report: String,
}

/// What [`settle`] moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Bonuses taken from the loser and credited to the winner.
    pub paid: u64,
    pub winner_progress: LevelProgress,
    pub loser_progress: LevelProgress,
}

/// Move the bet and hand out the duel record and experience.
///
/// The winner receives only what the loser can pay, so the combined
/// bonuses of both characters never change.
pub fn settle(winner: &mut Character, loser: &mut Character, bet: u64) -> Settlement {
    let paid = bet.min(loser.bonuses);
    loser.bonuses -= paid;
    winner.bonuses += paid;
    winner.record.wins += 1;
    loser.record.losses += 1;
    Settlement {
        paid,
        winner_progress: winner.award_xp(WINNER_XP),
        loser_progress: loser.award_xp(LOSER_XP),
    }
}

pub struct DuelService {
    characters: Arc<dyn CharacterStore>,
    duels: Arc<dyn DuelStore>,
    registry: ClassRegistry,
    config: CombatConfig,
    sequence: AtomicU64,
}

impl DuelService {
    pub fn new(
        characters: Arc<dyn CharacterStore>,
        duels: Arc<dyn DuelStore>,
        registry: ClassRegistry,
        config: CombatConfig,
    ) -> Self {
        Self {
            characters,
            duels,
            registry,
            config,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CombatConfig {
        &self.config
    }

    /// Open a duel.
    ///
    /// `opponent_id` of `None` creates an open challenge anyone with enough
    /// bonuses may accept.
    ///
    /// # Errors
    ///
    /// Fails when the bet exceeds [`MAX_BET`] or the challenger's bonuses,
    /// when the challenger names themselves or has no character, and when
    /// either side already has a pending duel.
    pub fn challenge(
        &self,
        challenger_id: &str,
        opponent_id: Option<&str>,
        bet: u64,
        message_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<DuelRecord, DuelError> {
        if bet > MAX_BET {
            return Err(DuelError::BetTooLarge { bet, max: MAX_BET });
        }
        if opponent_id == Some(challenger_id) {
            return Err(DuelError::SelfChallenge);
        }
        let challenger = self
            .characters
            .load(challenger_id)?
            .ok_or_else(|| DuelError::NoCharacter(challenger_id.to_string()))?;
        if challenger.bonuses < bet {
            return Err(DuelError::InsufficientBonuses {
                have: challenger.bonuses,
                need: bet,
            });
        }

        self.duels.expire_stale(now)?;
        for user in std::iter::once(challenger_id).chain(opponent_id) {
            if self.duels.find_pending_for(user)?.is_some() {
                return Err(DuelError::AlreadyInDuel(user.to_string()));
            }
        }

        let id = DuelId::new(format!(
            "duel-{}-{}",
            now.timestamp_millis(),
            self.sequence.fetch_add(1, Ordering::Relaxed)
        ));
        let mut duel = DuelRecord::new(
            id,
            challenger_id,
            opponent_id.map(str::to_string),
            bet,
            now,
        )
        .with_weapon_id(challenger.weapon.as_ref().map(|w| w.id.clone()));
        if let Some(message_id) = message_id {
            duel = duel.with_message_id(message_id);
        }

        self.duels.insert(duel.clone())?;
        tracing::info!(
            duel = %duel.id,
            challenger = challenger_id,
            opponent = ?opponent_id,
            bet,
            "Duel created"
        );
        Ok(duel)
    }

    /// Accept a pending duel and resolve it.
    ///
    /// The duel is claimed before either character is loaded, so both
    /// records are read after any earlier duel of theirs was settled. When a
    /// store write fails after the claim, both characters are restored and
    /// the duel goes back to `Pending`.
    ///
    /// # Errors
    ///
    /// Fails when the duel is missing, no longer pending or expired, when
    /// the acceptor is the challenger or not the named opponent, when either
    /// side has no character, when the acceptor cannot cover the bet, or
    /// when either side is busy in another duel. Losing the claim to a
    /// concurrent acceptor yields [`DuelError::NotPending`].
    pub fn accept<R>(
        &self,
        duel_id: &DuelId,
        acceptor_id: &str,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<DuelResolution, DuelError>
    where
        R: CombatRng + ?Sized,
    {
        let pending = self
            .duels
            .get(duel_id)?
            .ok_or_else(|| DuelError::NotFound(duel_id.clone()))?;

        if !pending.is_pending() {
            return Err(DuelError::NotPending(duel_id.clone()));
        }
        if pending.is_expired(now) {
            if self
                .duels
                .transition(duel_id, DuelStatus::Pending, DuelStatus::Expired)?
            {
                tracing::warn!(duel = %duel_id, "Accepted after expiry");
            }
            return Err(DuelError::Expired(duel_id.clone()));
        }
        if pending.challenger_id == acceptor_id {
            return Err(DuelError::OwnDuel);
        }
        if let Some(opponent) = &pending.opponent_id {
            if opponent != acceptor_id {
                return Err(DuelError::NotTheOpponent);
            }
        }

        let acceptor = self
            .characters
            .load(acceptor_id)?
            .ok_or_else(|| DuelError::NoCharacter(acceptor_id.to_string()))?;
        if acceptor.bonuses < pending.bet {
            return Err(DuelError::InsufficientBonuses {
                have: acceptor.bonuses,
                need: pending.bet,
            });
        }

        match self.duels.begin(duel_id, acceptor_id)? {
            Claim::Claimed => {}
            Claim::NotPending => return Err(DuelError::NotPending(duel_id.clone())),
            Claim::Busy(user) => return Err(DuelError::AlreadyInDuel(user)),
        }

        let (challenger, opponent) = match self.load_pair(&pending.challenger_id, acceptor_id) {
            Ok(pair) => pair,
            Err(err) => return Err(self.release(&pending, &[], err)),
        };

        let mut duel = pending.clone();
        duel.status = DuelStatus::InProgress;
        duel.opponent_id = Some(acceptor_id.to_string());
        match self.resolve(&mut duel, &challenger, &opponent, now, rng) {
            Ok((outcome, settlement)) => {
                tracing::info!(
                    duel = %duel.id,
                    winner = %outcome.winner_id,
                    loser = %outcome.loser_id,
                    paid = settlement.paid,
                    "Duel completed"
                );
                let report = outcome.battle_log.to_markdown_block(self.config.display_rows);
                Ok(DuelResolution {
                    duel,
                    outcome,
                    settlement,
                    report,
                })
            }
            Err(err) => Err(self.release(&pending, &[&challenger, &opponent], err)),
        }
    }

    fn load_pair(
        &self,
        challenger_id: &str,
        opponent_id: &str,
    ) -> Result<(Character, Character), DuelError> {
        let load = |id: &str| -> Result<Character, DuelError> {
            self.characters
                .load(id)?
                .ok_or_else(|| DuelError::NoCharacter(id.to_string()))
        };
        Ok((load(challenger_id)?, load(opponent_id)?))
    }

    /// Simulate a claimed duel and write its results. Characters are saved
    /// before the duel is marked completed.
    fn resolve<R>(
        &self,
        duel: &mut DuelRecord,
        challenger: &Character,
        opponent: &Character,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<(DuelOutcome, Settlement), DuelError>
    where
        R: CombatRng + ?Sized,
    {
        let mut challenger = challenger.clone();
        let mut opponent = opponent.clone();

        let simulator = DuelSimulator::new(&self.registry, &self.config);
        let mut challenger_profile = challenger.combat_profile();
        let mut opponent_profile = opponent.combat_profile();
        let outcome = simulator.simulate(&mut challenger_profile, &mut opponent_profile, rng);

        self.characters.save_effects(&[
            (challenger.id.as_str(), &challenger_profile.active_effects),
            (opponent.id.as_str(), &opponent_profile.active_effects),
        ])?;
        challenger.active_effects = challenger_profile.active_effects;
        opponent.active_effects = opponent_profile.active_effects;

        let (winner, loser) = match outcome.winner {
            Side::Challenger => (&mut challenger, &mut opponent),
            Side::Opponent => (&mut opponent, &mut challenger),
        };
        let settlement = settle(winner, loser, duel.bet);
        self.characters.save(winner)?;
        self.characters.save(loser)?;

        duel.complete(outcome.winner_id.clone(), outcome.log_lines(), now);
        self.duels.update(duel)?;
        Ok((outcome, settlement))
    }

    /// Undo a claimed duel after a failed write: put the loaded characters
    /// back and return the duel to `Pending`. Returns `err` unchanged.
    fn release(
        &self,
        pending: &DuelRecord,
        characters: &[&Character],
        err: DuelError,
    ) -> DuelError {
        tracing::error!(duel = %pending.id, error = %err, "Duel resolution failed, releasing");
        for character in characters {
            if let Err(restore) = self.characters.save(character) {
                tracing::error!(
                    duel = %pending.id,
                    character = %character.id,
                    error = %restore,
                    "Failed to restore character"
                );
            }
        }
        if let Err(restore) = self.duels.update(pending) {
            tracing::error!(duel = %pending.id, error = %restore, "Failed to release duel");
        }
        err
    }

    /// Withdraw a pending duel. Only its participants may cancel it.
    pub fn cancel(&self, duel_id: &DuelId, user_id: &str) -> Result<DuelRecord, DuelError> {
        let mut duel = self
            .duels
            .get(duel_id)?
            .ok_or_else(|| DuelError::NotFound(duel_id.clone()))?;
        if !duel.is_participant(user_id) {
            return Err(DuelError::NotParticipant(user_id.to_string()));
        }
        if !self
            .duels
            .transition(duel_id, DuelStatus::Pending, DuelStatus::Cancelled)?
        {
            return Err(DuelError::NotPending(duel_id.clone()));
        }
        duel.status = DuelStatus::Cancelled;
        tracing::info!(duel = %duel_id, user = user_id, "Duel cancelled");
        Ok(duel)
    }

    /// Expire every pending duel past its deadline.
    pub fn expire_stale(&self, now: DateTime<Utc>) -> Result<Vec<DuelId>, DuelError> {
        Ok(self.duels.expire_stale(now)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_moves_bet() {
        let mut winner = Character::new("a", "warrior").with_bonuses(100);
        let mut loser = Character::new("b", "mage").with_bonuses(80);
        let settlement = settle(&mut winner, &mut loser, 50);

        assert_eq!(settlement.paid, 50);
        assert_eq!(winner.bonuses, 150);
        assert_eq!(loser.bonuses, 30);
        assert_eq!(winner.record.wins, 1);
        assert_eq!(loser.record.losses, 1);
        assert_eq!(settlement.winner_progress.xp, 100);
        assert_eq!(settlement.loser_progress.xp, 30);
    }

    #[test]
    fn test_settle_pays_only_what_loser_has() {
        let mut winner = Character::new("a", "warrior").with_bonuses(100);
        let mut loser = Character::new("b", "mage").with_bonuses(30);
        let settlement = settle(&mut winner, &mut loser, 50);

        assert_eq!(settlement.paid, 30);
        assert_eq!(loser.bonuses, 0);
        assert_eq!(winner.bonuses + loser.bonuses, 130);
    }

    #[test]
    fn test_settle_levels_up_winner() {
        let mut winner = Character::new("a", "warrior");
        winner.xp = 450;
        let mut loser = Character::new("b", "mage");
        let settlement = settle(&mut winner, &mut loser, 0);
        assert!(settlement.winner_progress.leveled_up());
        assert_eq!(winner.level, 2);
        assert_eq!(winner.xp, 50);
    }
}
