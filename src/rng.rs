//! Randomness source for duels.
//!
//! The simulator draws every random number through [`CombatRng`]. Each
//! draw is tagged with the [`Roll`] it feeds so test doubles can pin
//! individual rolls; real generators ignore the tag.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Purpose of a random draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Roll {
    /// Coin flip deciding who attacks on odd rounds.
    FirstStrike,
    /// Hit check, compared with `<=` against the hit chance.
    Hit,
    /// Spread applied to raw weapon damage.
    DamageSpread,
    /// Spread applied to the defender's defense.
    DefenseSpread,
    /// Critical check, compared with `<` against the crit chance.
    Critical,
}

/// Uniform `[0, 1)` generator used by the duel simulator.
pub trait CombatRng {
    fn roll(&mut self, kind: Roll) -> f64;
}

impl<T: CombatRng + ?Sized> CombatRng for &mut T {
    fn roll(&mut self, kind: Roll) -> f64 {
        (**self).roll(kind)
    }
}

/// Adapter over any `rand` generator.
///
/// # Examples
///
/// ```rust
/// use duelcore::rng::{CombatRng, RandRolls, Roll};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut rng = RandRolls::new(StdRng::seed_from_u64(7));
/// let value = rng.roll(Roll::Hit);
/// assert!((0.0..1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct RandRolls<R> {
    rng: R,
}

impl<R: Rng> RandRolls<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn into_inner(self) -> R {
        self.rng
    }
}

impl RandRolls<StdRng> {
    /// Non-reproducible generator seeded from system entropy.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    /// Reproducible generator for replays.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> CombatRng for RandRolls<R> {
    fn roll(&mut self, _kind: Roll) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Fixed value per roll kind.
///
/// # Examples
///
/// ```rust
/// use duelcore::rng::{CombatRng, Roll, ScriptedRolls};
///
/// let mut rolls = ScriptedRolls::always_hit();
/// assert_eq!(rolls.roll(Roll::Hit), 0.0);
/// assert!(rolls.roll(Roll::Critical) > 0.99);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptedRolls {
    pub first_strike: f64,
    pub hit: f64,
    pub damage_spread: f64,
    pub defense_spread: f64,
    pub critical: f64,
}

/// Largest `f64` below 1.0.
const ALMOST_ONE: f64 = 1.0 - f64::EPSILON;

impl ScriptedRolls {
    /// Challenger strikes first, every attack hits, no crits, both spreads
    /// at the middle of their bands.
    pub fn always_hit() -> Self {
        Self {
            first_strike: 0.0,
            hit: 0.0,
            damage_spread: 0.5,
            defense_spread: 0.5,
            critical: ALMOST_ONE,
        }
    }

    /// Challenger strikes first and every attack misses.
    pub fn always_miss() -> Self {
        Self {
            hit: ALMOST_ONE,
            ..Self::always_hit()
        }
    }

    /// Opponent strikes on odd rounds instead.
    pub fn opponent_first(self) -> Self {
        Self {
            first_strike: ALMOST_ONE,
            ..self
        }
    }

    pub fn with_critical(self, critical: f64) -> Self {
        Self { critical, ..self }
    }

    pub fn with_spreads(self, damage_spread: f64, defense_spread: f64) -> Self {
        Self {
            damage_spread,
            defense_spread,
            ..self
        }
    }
}

impl CombatRng for ScriptedRolls {
    fn roll(&mut self, kind: Roll) -> f64 {
        match kind {
            Roll::FirstStrike => self.first_strike,
            Roll::Hit => self.hit,
            Roll::DamageSpread => self.damage_spread,
            Roll::DefenseSpread => self.defense_spread,
            Roll::Critical => self.critical,
        }
    }
}
