//! # duelcore - Round-Based PvP Duel Engine
//!
//! A combat core for chat-driven RPG duels that provides:
//! - **Class-driven** stat derivation (base value plus a per-class multiplier)
//! - **Bounded** duel simulation (at most 20 rounds, always a winner)
//! - **Injectable** randomness, so every duel can be replayed from a seed
//! - **Serializable** records for characters, duels and battle logs
//!
//! ## Core Concepts
//!
//! ### Stat Pipeline
//!
//! Effective stats are derived fresh for every duel:
//!
//! ```text
//! [BaseStats] → [class multiplier] → [equipment bonus] → effective value
//! ```
//!
//! 1. **Base stats** come from the character record
//! 2. **Class multipliers** add `floor(base * multiplier)`
//! 3. **Equipment** scales accuracy (weapon) and defense (armor)
//!
//! ### Duel Flow
//!
//! A challenge creates a pending [`DuelRecord`]. Accepting it claims the
//! duel through a compare-and-swap, runs the [`DuelSimulator`] and applies
//! the outcome to both characters.
//!
//! ## Example
//!
//! ```rust
//! use duelcore::rng::RandRolls;
//! use duelcore::*;
//!
//! let registry = ClassRegistry::builtin();
//! let config = CombatConfig::default();
//!
//! let mut alice = Character::new("alice", "mage");
//! alice.invest_points(StatKey::Intelligence, 5).unwrap();
//! let bob = Character::new("bob", "warrior");
//!
//! let simulator = DuelSimulator::new(&registry, &config);
//! let mut rng = RandRolls::seeded(42);
//! let outcome = simulator.simulate(
//!     &mut alice.combat_profile(),
//!     &mut bob.combat_profile(),
//!     &mut rng,
//! );
//!
//! assert!(outcome.rounds() <= 20);
//! assert_ne!(outcome.winner_id, outcome.loser_id);
//! ```
//!
//! ## Modules
//!
//! - [`stat`] - Stat keys
//! - [`registry`] - Class definitions and advancement tiers
//! - [`profile`] - Combat profile, base stats and equipment
//! - [`effects`] - Timed potion effects
//! - [`resolver`] - Effective stat derivation
//! - [`resolved`] - Resolved stat with breakdown
//! - [`formula`] - Hit, crit, damage and defense formulas
//! - [`rng`] - Randomness injection
//! - [`config`] - Combat constants
//! - [`simulator`] - Duel round loop
//! - [`battle_log`] - Fixed-width battle log
//! - [`character`] - Stored character and progression
//! - [`duel`] - Duel records
//! - [`store`] - Character and duel stores
//! - [`service`] - Duel lifecycle
//! - [`error`] - Error types

pub mod battle_log;
pub mod character;
pub mod config;
pub mod duel;
pub mod effects;
pub mod error;
pub mod formula;
pub mod profile;
pub mod registry;
pub mod resolved;
pub mod resolver;
pub mod rng;
pub mod service;
pub mod simulator;
pub mod stat;
pub mod store;

// Re-export main types for convenience
pub use battle_log::{BattleLog, RoundEntry};
pub use character::{Character, LevelProgress, WinLoss};
pub use config::{Band, CombatConfig, MainSkillMatching};
pub use duel::{DuelId, DuelRecord, DuelStatus};
pub use effects::{ActiveEffects, EffectState};
pub use error::{CharacterError, ConfigError, DuelError, RegistryError, StatKeyError, StoreError};
pub use formula::CombatFormulas;
pub use profile::{Armor, ArmorStats, BaseStats, CombatProfile, Weapon, WeaponStats};
pub use registry::{BaseClass, ClassDefinition, ClassId, ClassRegistry, StatMultipliers};
pub use resolved::{ResolveStep, ResolvedStat};
pub use resolver::StatResolver;
pub use service::{DuelResolution, DuelService, Settlement};
pub use simulator::{DuelOutcome, DuelSimulator, Side, Strike};
pub use stat::StatKey;

// Re-export stores and randomness sources
pub use rng::{CombatRng, RandRolls, Roll, ScriptedRolls};
pub use store::{CharacterStore, Claim, DuelStore, InMemoryCharacterStore, InMemoryDuelStore};
