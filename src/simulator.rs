//! Duel simulator.
//!
//! Runs a bounded round loop between two profiles. Sides alternate by
//! round parity after a single coin flip; the loop stops as soon as one
//! side is at 0 hit points or the round cap is reached. Active effects of
//! both profiles are decayed in place once the loop ends.
//!
//! Per round the rolls are drawn in a fixed order: hit, then on a hit the
//! damage spread, the defense spread and the critical roll.

use crate::battle_log::{BattleLog, RoundEntry};
use crate::config::CombatConfig;
use crate::formula::CombatFormulas;
use crate::profile::CombatProfile;
use crate::registry::ClassRegistry;
use crate::rng::{CombatRng, Roll};
use serde::{Deserialize, Serialize};

/// One side of a duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Challenger,
    Opponent,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Challenger => Side::Opponent,
            Side::Opponent => Side::Challenger,
        }
    }

    fn index(self) -> usize {
        match self {
            Side::Challenger => 0,
            Side::Opponent => 1,
        }
    }
}

/// Result of a single attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    pub hit: bool,
    pub critical: bool,
    pub damage: i64,
}

impl Strike {
    pub const MISS: Strike = Strike {
        hit: false,
        critical: false,
        damage: 0,
    };
}

/// Everything a finished duel produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelOutcome {
    pub winner_id: String,
    pub loser_id: String,
    pub winner: Side,
    pub battle_log: BattleLog,
    pub challenger_hp: i64,
    pub opponent_hp: i64,
    /// Effects removed from the challenger by post-duel decay.
    pub challenger_expired: Vec<String>,
    /// Effects removed from the opponent by post-duel decay.
    pub opponent_expired: Vec<String>,
}

impl DuelOutcome {
    pub fn rounds(&self) -> usize {
        self.battle_log.rounds()
    }

    /// Full log: header, rule and one row per round.
    pub fn log_lines(&self) -> Vec<String> {
        self.battle_log.lines()
    }

    /// True when the duel hit the round cap with both sides standing.
    pub fn went_the_distance(&self) -> bool {
        self.challenger_hp > 0 && self.opponent_hp > 0
    }
}

/// Round-based duel engine.
///
/// # Examples
///
/// ```rust
/// use duelcore::rng::ScriptedRolls;
/// use duelcore::{ClassRegistry, CombatConfig, CombatProfile, DuelSimulator, StatKey};
///
/// let registry = ClassRegistry::builtin();
/// let config = CombatConfig::default();
/// let simulator = DuelSimulator::new(&registry, &config);
///
/// let mut challenger = CombatProfile::new("a", "warrior").with_stat(StatKey::Strength, 20.0);
/// let mut opponent = CombatProfile::new("b", "warrior").with_stat(StatKey::Hp, 1.0);
///
/// let mut rolls = ScriptedRolls::always_hit();
/// let outcome = simulator.simulate(&mut challenger, &mut opponent, &mut rolls);
/// assert_eq!(outcome.winner_id, "a");
/// assert_eq!(outcome.log_lines().len(), 3);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DuelSimulator<'a> {
    formulas: CombatFormulas<'a>,
}

impl<'a> DuelSimulator<'a> {
    pub fn new(registry: &'a ClassRegistry, config: &'a CombatConfig) -> Self {
        Self {
            formulas: CombatFormulas::new(registry, config),
        }
    }

    pub fn formulas(&self) -> CombatFormulas<'a> {
        self.formulas
    }

    /// Resolve a duel.
    ///
    /// The winner is the side with strictly more hit points left. A tie can
    /// only happen at the round cap and goes to the side that defended in
    /// the final round.
    pub fn simulate<R>(
        &self,
        challenger: &mut CombatProfile,
        opponent: &mut CombatProfile,
        rng: &mut R,
    ) -> DuelOutcome
    where
        R: CombatRng + ?Sized,
    {
        let config = self.formulas.config();
        let mut hp = [
            self.formulas.starting_hp(challenger),
            self.formulas.starting_hp(opponent),
        ];
        let names = [challenger.log_name(), opponent.log_name()];
        let challenger_first = rng.roll(Roll::FirstStrike) < 0.5;

        let mut log = BattleLog::new();
        let mut last_defender = Side::Opponent;
        let mut round = 1;

        while hp[0] > 0 && hp[1] > 0 && round <= config.max_rounds {
            let odd = round % 2 == 1;
            let attacker_side = if odd == challenger_first {
                Side::Challenger
            } else {
                Side::Opponent
            };
            let defender_side = attacker_side.other();
            let (attacker, defender) = match attacker_side {
                Side::Challenger => (&*challenger, &*opponent),
                Side::Opponent => (&*opponent, &*challenger),
            };

            let strike = self.strike(attacker, defender, rng);
            let target = &mut hp[defender_side.index()];
            *target = (*target - strike.damage).max(0);

            tracing::debug!(
                round,
                attacker = %attacker.id,
                defender = %defender.id,
                damage = strike.damage,
                critical = strike.critical,
                defender_hp = *target,
                "Duel round"
            );

            log.push(RoundEntry {
                round,
                attacker: names[attacker_side.index()].clone(),
                damage: strike.damage,
                defender: names[defender_side.index()].clone(),
                defender_hp: *target,
                critical: strike.critical,
            });
            last_defender = defender_side;
            round += 1;
        }

        let challenger_expired = challenger.active_effects.decay();
        let opponent_expired = opponent.active_effects.decay();

        let winner = if hp[0] > hp[1] {
            Side::Challenger
        } else if hp[1] > hp[0] {
            Side::Opponent
        } else {
            last_defender
        };
        let (winner_id, loser_id) = match winner {
            Side::Challenger => (challenger.id.clone(), opponent.id.clone()),
            Side::Opponent => (opponent.id.clone(), challenger.id.clone()),
        };

        tracing::info!(
            winner = %winner_id,
            loser = %loser_id,
            rounds = log.rounds(),
            challenger_hp = hp[0],
            opponent_hp = hp[1],
            "Duel resolved"
        );

        DuelOutcome {
            winner_id,
            loser_id,
            winner,
            battle_log: log,
            challenger_hp: hp[0],
            opponent_hp: hp[1],
            challenger_expired,
            opponent_expired,
        }
    }

    /// Roll one attack of `attacker` against `defender`.
    pub fn strike<R>(
        &self,
        attacker: &CombatProfile,
        defender: &CombatProfile,
        rng: &mut R,
    ) -> Strike
    where
        R: CombatRng + ?Sized,
    {
        let f = &self.formulas;
        let config = f.config();

        if rng.roll(Roll::Hit) > f.hit_chance(attacker) {
            return Strike::MISS;
        }

        let raw = f.weapon_damage(attacker)
            * config.damage_band.lerp(rng.roll(Roll::DamageSpread))
            * (1.0 + f.attack_potion_bonus(attacker));
        let defense = f.total_defense(defender)
            * config.defense_band.lerp(rng.roll(Roll::DefenseSpread))
            * (1.0 - f.defense_potion_reduction(defender));

        let mut damage = (raw - defense).max(config.min_damage);
        let critical = rng.roll(Roll::Critical) < f.crit_chance(attacker);
        if critical {
            damage *= config.crit_multiplier;
        }

        Strike {
            hit: true,
            critical,
            damage: damage.floor() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::{POTION_DAMAGE, POTION_DEFENSE};
    use crate::rng::ScriptedRolls;
    use crate::stat::StatKey;

    fn fighter(id: &str) -> CombatProfile {
        CombatProfile::new(id, "warrior")
            .with_stat(StatKey::Strength, 20.0)
            .with_stat(StatKey::Accuracy, 20.0)
    }

    #[test]
    fn test_strike_damage_mid_band() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let simulator = DuelSimulator::new(&registry, &config);

        // raw = 20 * 1.0; defense = 10 * 0.3 = 3 -> 17
        let mut rolls = ScriptedRolls::always_hit();
        let strike = simulator.strike(&fighter("a"), &fighter("b"), &mut rolls);
        assert_eq!(
            strike,
            Strike {
                hit: true,
                critical: false,
                damage: 17
            }
        );
    }

    #[test]
    fn test_strike_band_endpoints() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let simulator = DuelSimulator::new(&registry, &config);

        // raw = 20 * {0.8, 1.2}; defense = 10 * {0.2, 0.4}
        for (damage_spread, defense_spread, expected) in [
            (0.0, 0.0, 14),
            (0.0, 1.0, 12),
            (1.0, 0.0, 22),
            (1.0, 1.0, 20),
        ] {
            let mut rolls = ScriptedRolls::always_hit().with_spreads(damage_spread, defense_spread);
            let strike = simulator.strike(&fighter("a"), &fighter("b"), &mut rolls);
            assert_eq!(strike.damage, expected, "{damage_spread}/{defense_spread}");
        }
    }

    #[test]
    fn test_strike_critical() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let simulator = DuelSimulator::new(&registry, &config);

        let mut rolls = ScriptedRolls::always_hit().with_critical(0.0);
        let strike = simulator.strike(&fighter("a"), &fighter("b"), &mut rolls);
        assert!(strike.critical);
        // floor(17 * 1.5)
        assert_eq!(strike.damage, 25);
    }

    #[test]
    fn test_strike_potions() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let simulator = DuelSimulator::new(&registry, &config);

        let attacker = fighter("a").with_effect(POTION_DAMAGE, 3);
        let defender = fighter("b").with_effect(POTION_DEFENSE, 3);
        // raw = 20 * 1.0 * 1.1 = 22; defense = 10 * 0.3 * 0.9 = 2.7 -> floor(19.3)
        let strike = simulator.strike(&attacker, &defender, &mut ScriptedRolls::always_hit());
        assert_eq!(strike.damage, 19);
    }

    #[test]
    fn test_strike_minimum_damage() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let simulator = DuelSimulator::new(&registry, &config);

        let weak = CombatProfile::new("a", "warrior").with_stat(StatKey::Strength, 0.0);
        let tank = fighter("b").with_stat(StatKey::Defense, 500.0);
        let strike = simulator.strike(&weak, &tank, &mut ScriptedRolls::always_hit());
        assert_eq!(strike.damage, 1);
    }

    #[test]
    fn test_strike_miss() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let simulator = DuelSimulator::new(&registry, &config);
        let mut rolls = ScriptedRolls::always_miss();
        let strike = simulator.strike(&fighter("a"), &fighter("b"), &mut rolls);
        assert_eq!(strike, Strike::MISS);
    }

    #[test]
    fn test_opponent_first_attacks_round_one() {
        let registry = ClassRegistry::builtin();
        let config = CombatConfig::default();
        let simulator = DuelSimulator::new(&registry, &config);

        let mut a = fighter("a").with_display_name("Alpha");
        let mut b = fighter("b").with_display_name("Beta");
        let mut rolls = ScriptedRolls::always_hit().opponent_first();
        let outcome = simulator.simulate(&mut a, &mut b, &mut rolls);

        let entries = outcome.battle_log.entries();
        assert_eq!(entries[0].attacker, "Beta");
        assert_eq!(entries[1].attacker, "Alpha");
        // Beta strikes first with equal damage, so Alpha falls first.
        assert_eq!(outcome.winner, Side::Opponent);
        assert_eq!(outcome.winner_id, "b");
        assert_eq!(outcome.challenger_hp, 0);
    }

    #[test]
    fn test_side_other() {
        assert_eq!(Side::Challenger.other(), Side::Opponent);
        assert_eq!(Side::Opponent.other(), Side::Challenger);
    }
}
