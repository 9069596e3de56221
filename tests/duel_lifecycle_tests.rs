use chrono::{DateTime, Duration, TimeZone, Utc};
use duelcore::effects::POTION_DAMAGE;
use duelcore::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use duelcore::effects::ActiveEffects;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

struct Fixture {
    characters: Arc<InMemoryCharacterStore>,
    duels: Arc<InMemoryDuelStore>,
    service: DuelService,
}

fn fixture(characters: impl IntoIterator<Item = Character>) -> Fixture {
    let characters = Arc::new(InMemoryCharacterStore::with_characters(characters));
    let duels = Arc::new(InMemoryDuelStore::new());
    let service = DuelService::new(
        characters.clone(),
        duels.clone(),
        ClassRegistry::builtin(),
        CombatConfig::default(),
    );
    Fixture {
        characters,
        duels,
        service,
    }
}

fn brute(id: &str) -> Character {
    let mut character = Character::new(id, "warrior");
    character.stats.set(StatKey::Strength, 40.0);
    character.stats.set(StatKey::Accuracy, 40.0);
    character
}

fn novice(id: &str) -> Character {
    Character::new(id, "warrior").with_bonuses(200)
}

/// Test a named duel from challenge to settled characters.
#[test]
fn test_named_duel_full_flow() {
    let mut alice = brute("alice").with_bonuses(50);
    alice.active_effects.insert(POTION_DAMAGE, 1);
    let f = fixture([alice, novice("bob")]);

    let duel = f
        .service
        .challenge("alice", Some("bob"), 50, Some("msg-1"), now())
        .unwrap();
    assert_eq!(duel.status, DuelStatus::Pending);
    assert_eq!(duel.message_id.as_deref(), Some("msg-1"));
    assert_eq!(duel.expires_at, now() + Duration::minutes(5));

    let later = now() + Duration::minutes(1);
    let resolution = f
        .service
        .accept(&duel.id, "bob", later, &mut ScriptedRolls::always_hit())
        .unwrap();

    // Alice deals 41 per hit with the potion, bob 7; bob falls in round 5.
    assert_eq!(resolution.outcome.winner_id, "alice");
    assert_eq!(resolution.outcome.rounds(), 5);
    assert_eq!(resolution.settlement.paid, 50);
    assert!(resolution.report.starts_with("```md\n"));

    let stored = f.duels.get(&duel.id).unwrap().unwrap();
    assert_eq!(stored.status, DuelStatus::Completed);
    assert_eq!(stored.winner_id.as_deref(), Some("alice"));
    assert_eq!(stored.completed_at, Some(later));
    assert_eq!(stored.battle_log.len(), 7);
    assert_eq!(stored, resolution.duel);

    let alice = f.characters.load("alice").unwrap().unwrap();
    let bob = f.characters.load("bob").unwrap().unwrap();
    assert_eq!(alice.bonuses, 100);
    assert_eq!(bob.bonuses, 150);
    assert_eq!(alice.record, WinLoss { wins: 1, losses: 0 });
    assert_eq!(bob.record, WinLoss { wins: 0, losses: 1 });
    assert_eq!(alice.xp, 100);
    assert_eq!(bob.xp, 30);
    assert!(!alice.active_effects.is_active(POTION_DAMAGE));
}

/// Test challenge validation.
#[test]
fn test_challenge_rejections() {
    let f = fixture([
        novice("alice"),
        novice("bob"),
        novice("carol"),
        Character::new("broke", "mage"),
    ]);

    assert_eq!(
        f.service.challenge("alice", Some("bob"), 1001, None, now()),
        Err(DuelError::BetTooLarge {
            bet: 1001,
            max: 1000
        })
    );
    assert_eq!(
        f.service.challenge("alice", Some("alice"), 10, None, now()),
        Err(DuelError::SelfChallenge)
    );
    assert_eq!(
        f.service.challenge("ghost", None, 10, None, now()),
        Err(DuelError::NoCharacter("ghost".to_string()))
    );

    assert_eq!(
        f.service.challenge("broke", Some("bob"), 500, None, now()),
        Err(DuelError::InsufficientBonuses { have: 0, need: 500 })
    );
    assert_eq!(
        f.service.challenge("alice", Some("bob"), 201, None, now()),
        Err(DuelError::InsufficientBonuses { have: 200, need: 201 })
    );

    f.service
        .challenge("alice", Some("bob"), 200, None, now())
        .unwrap();
    assert_eq!(
        f.service.challenge("alice", None, 10, None, now()),
        Err(DuelError::AlreadyInDuel("alice".to_string()))
    );
    assert_eq!(
        f.service.challenge("carol", Some("bob"), 10, None, now()),
        Err(DuelError::AlreadyInDuel("bob".to_string()))
    );
}

/// Test that a stale pending duel does not block a new challenge.
#[test]
fn test_expired_duel_frees_participants() {
    let f = fixture([novice("alice"), novice("bob")]);
    let first = f
        .service
        .challenge("alice", Some("bob"), 10, None, now())
        .unwrap();

    let later = now() + Duration::minutes(6);
    let second = f
        .service
        .challenge("alice", Some("bob"), 10, None, later)
        .unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(
        f.duels.get(&first.id).unwrap().unwrap().status,
        DuelStatus::Expired
    );
}

/// Test acceptance validation.
#[test]
fn test_accept_rejections() {
    let poor = Character::new("poor", "mage");
    let f = fixture([
        novice("alice"),
        novice("bob"),
        novice("carol"),
        novice("dave"),
        poor,
    ]);
    let mut rolls = ScriptedRolls::always_hit();

    let missing = DuelId::from("missing");
    assert_eq!(
        f.service.accept(&missing, "bob", now(), &mut rolls).unwrap_err(),
        DuelError::NotFound(missing)
    );

    let named = f
        .service
        .challenge("alice", Some("bob"), 10, None, now())
        .unwrap();
    assert_eq!(
        f.service.accept(&named.id, "alice", now(), &mut rolls).unwrap_err(),
        DuelError::OwnDuel
    );
    assert_eq!(
        f.service.accept(&named.id, "carol", now(), &mut rolls).unwrap_err(),
        DuelError::NotTheOpponent
    );

    let open = f.service.challenge("carol", None, 100, None, now()).unwrap();
    assert_eq!(
        f.service.accept(&open.id, "poor", now(), &mut rolls).unwrap_err(),
        DuelError::InsufficientBonuses { have: 0, need: 100 }
    );
    assert_eq!(
        f.service.accept(&open.id, "ghost", now(), &mut rolls).unwrap_err(),
        DuelError::NoCharacter("ghost".to_string())
    );

    // A named opponent must cover the bet as well.
    let named_poor = f
        .service
        .challenge("dave", Some("poor"), 50, None, now())
        .unwrap();
    assert_eq!(
        f.service
            .accept(&named_poor.id, "poor", now(), &mut rolls)
            .unwrap_err(),
        DuelError::InsufficientBonuses { have: 0, need: 50 }
    );

    // Failed acceptances leave the duels pending.
    assert!(f.duels.get(&open.id).unwrap().unwrap().is_pending());
    assert!(f.duels.get(&named_poor.id).unwrap().unwrap().is_pending());
}

/// Test that an expired duel cannot be accepted and is marked expired.
#[test]
fn test_accept_expired() {
    let f = fixture([novice("alice"), novice("bob")]);
    let duel = f.service.challenge("alice", None, 10, None, now()).unwrap();
    let late = now() + Duration::minutes(5);

    assert_eq!(
        f.service
            .accept(&duel.id, "bob", late, &mut ScriptedRolls::always_hit())
            .unwrap_err(),
        DuelError::Expired(duel.id.clone())
    );
    assert_eq!(
        f.duels.get(&duel.id).unwrap().unwrap().status,
        DuelStatus::Expired
    );
    assert_eq!(
        f.service
            .accept(&duel.id, "bob", now(), &mut ScriptedRolls::always_hit())
            .unwrap_err(),
        DuelError::NotPending(duel.id)
    );
}

/// Test that an open duel is taken by its acceptor.
#[test]
fn test_open_duel_records_acceptor() {
    let f = fixture([novice("alice"), brute("bob").with_bonuses(10)]);
    let duel = f.service.challenge("alice", None, 10, None, now()).unwrap();

    let mut rolls = RandRolls::new(ChaCha8Rng::seed_from_u64(1));
    let resolution = f.service.accept(&duel.id, "bob", now(), &mut rolls).unwrap();
    assert_eq!(resolution.duel.opponent_id.as_deref(), Some("bob"));

    let (winner, loser) = (&resolution.outcome.winner_id, &resolution.outcome.loser_id);
    let winner = f.characters.load(winner).unwrap().unwrap();
    let loser = f.characters.load(loser).unwrap().unwrap();
    assert_eq!(winner.record.wins, 1);
    assert_eq!(loser.record.losses, 1);
    assert_eq!(winner.bonuses + loser.bonuses, 210);
}

/// Test that concurrent acceptances resolve a duel exactly once.
#[test]
fn test_concurrent_accept_single_winner() {
    let acceptors: Vec<String> = (0..6).map(|i| format!("user{i}")).collect();
    let f = fixture(
        std::iter::once(novice("alice")).chain(acceptors.iter().map(|id| novice(id))),
    );
    let duel = f.service.challenge("alice", None, 20, None, now()).unwrap();

    let results: Vec<Result<DuelResolution, DuelError>> = thread::scope(|scope| {
        let handles: Vec<_> = acceptors
            .iter()
            .enumerate()
            .map(|(i, id)| {
                let service = &f.service;
                let duel_id = &duel.id;
                scope.spawn(move || {
                    let mut rolls = RandRolls::new(ChaCha8Rng::seed_from_u64(i as u64));
                    service.accept(duel_id, id, now(), &mut rolls)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);
    for result in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(result, &DuelError::NotPending(duel.id.clone()));
    }
    assert_eq!(
        f.duels.get(&duel.id).unwrap().unwrap().status,
        DuelStatus::Completed
    );
}

/// Test cancellation rules.
#[test]
fn test_cancel() {
    let f = fixture([novice("alice"), novice("bob"), novice("carol")]);
    let duel = f
        .service
        .challenge("alice", Some("bob"), 10, None, now())
        .unwrap();

    assert_eq!(
        f.service.cancel(&duel.id, "carol"),
        Err(DuelError::NotParticipant("carol".to_string()))
    );
    let cancelled = f.service.cancel(&duel.id, "bob").unwrap();
    assert_eq!(cancelled.status, DuelStatus::Cancelled);
    assert_eq!(
        f.service.cancel(&duel.id, "alice"),
        Err(DuelError::NotPending(duel.id.clone()))
    );
    assert_eq!(
        f.service
            .accept(&duel.id, "bob", now(), &mut ScriptedRolls::always_hit())
            .unwrap_err(),
        DuelError::NotPending(duel.id)
    );

    // Both sides are free again.
    f.service.challenge("bob", Some("alice"), 10, None, now()).unwrap();
}

/// Test bulk expiry.
#[test]
fn test_expire_stale() {
    let f = fixture([novice("alice"), novice("bob"), novice("carol")]);
    let old = f.service.challenge("alice", None, 10, None, now()).unwrap();
    let fresh = f
        .service
        .challenge("bob", None, 10, None, now() + Duration::minutes(4))
        .unwrap();

    let expired = f
        .service
        .expire_stale(now() + Duration::minutes(5))
        .unwrap();
    assert_eq!(expired, vec![old.id]);
    assert!(f.duels.get(&fresh.id).unwrap().unwrap().is_pending());
}

/// Test that a duel moves bonuses without creating any.
#[test]
fn test_bonuses_are_conserved() {
    let f = fixture([novice("alice").with_bonuses(100), brute("bob").with_bonuses(100)]);
    let duel = f
        .service
        .challenge("alice", Some("bob"), 100, None, now())
        .unwrap();

    // Alice spends most of her stake before the duel is accepted.
    let mut alice = f.characters.load("alice").unwrap().unwrap();
    alice.bonuses = 40;
    f.characters.save(&alice).unwrap();

    let resolution = f
        .service
        .accept(&duel.id, "bob", now(), &mut ScriptedRolls::always_hit())
        .unwrap();
    assert_eq!(resolution.outcome.winner_id, "bob");
    assert_eq!(resolution.settlement.paid, 40);

    let alice = f.characters.load("alice").unwrap().unwrap();
    let bob = f.characters.load("bob").unwrap().unwrap();
    assert_eq!(alice.bonuses, 0);
    assert_eq!(bob.bonuses, 140);
    assert_eq!(alice.bonuses + bob.bonuses, 140);
}

/// Test that one user accepting two duels at once never loses a result.
#[test]
fn test_parallel_accepts_by_one_user() {
    for run in 0..50u64 {
        let f = fixture([novice("a"), novice("b"), novice("x")]);
        let first = f.service.challenge("a", None, 10, None, now()).unwrap();
        let second = f.service.challenge("b", None, 10, None, now()).unwrap();
        let barrier = Barrier::new(2);

        let results: Vec<Result<DuelResolution, DuelError>> = thread::scope(|scope| {
            let handles: Vec<_> = [&first.id, &second.id]
                .into_iter()
                .enumerate()
                .map(|(i, duel_id)| {
                    let service = &f.service;
                    let barrier = &barrier;
                    scope.spawn(move || {
                        let seed = run * 2 + i as u64;
                        let mut rolls = RandRolls::new(ChaCha8Rng::seed_from_u64(seed));
                        barrier.wait();
                        service.accept(duel_id, "x", now(), &mut rolls)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let accepted = results.iter().filter(|r| r.is_ok()).count() as u32;
        assert!(accepted >= 1, "run {run}");
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err, &DuelError::AlreadyInDuel("x".to_string()), "run {run}");
        }

        let load = |id: &str| f.characters.load(id).unwrap().unwrap();
        let (a, b, x) = (load("a"), load("b"), load("x"));
        assert_eq!(x.record.total(), accepted, "run {run}");
        assert_eq!(a.record.total() + b.record.total(), accepted, "run {run}");
        assert_eq!(a.bonuses + b.bonuses + x.bonuses, 600, "run {run}");
    }
}

/// Character store whose next `save` calls fail.
struct FailingSaves {
    inner: InMemoryCharacterStore,
    failures: AtomicU32,
}

impl FailingSaves {
    fn new(characters: impl IntoIterator<Item = Character>) -> Self {
        Self {
            inner: InMemoryCharacterStore::with_characters(characters),
            failures: AtomicU32::new(0),
        }
    }

    fn fail_next_saves(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }
}

impl CharacterStore for FailingSaves {
    fn load(&self, id: &str) -> Result<Option<Character>, StoreError> {
        self.inner.load(id)
    }

    fn save(&self, character: &Character) -> Result<(), StoreError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Backend("write rejected".to_string()));
        }
        self.inner.save(character)
    }

    fn save_effects(&self, updates: &[(&str, &ActiveEffects)]) -> Result<(), StoreError> {
        self.inner.save_effects(updates)
    }
}

/// Test that a failed write after the claim releases the duel untouched.
#[test]
fn test_failed_settlement_releases_duel() {
    let mut alice = novice("alice");
    alice.active_effects.insert(POTION_DAMAGE, 2);
    let bob = novice("bob");
    let characters = Arc::new(FailingSaves::new([alice.clone(), bob.clone()]));
    let duels = Arc::new(InMemoryDuelStore::new());
    let service = DuelService::new(
        characters.clone(),
        duels.clone(),
        ClassRegistry::builtin(),
        CombatConfig::default(),
    );

    let duel = service.challenge("alice", None, 50, None, now()).unwrap();
    characters.fail_next_saves(1);
    let err = service
        .accept(&duel.id, "bob", now(), &mut ScriptedRolls::always_hit())
        .unwrap_err();
    assert_eq!(
        err,
        DuelError::Store(StoreError::Backend("write rejected".to_string()))
    );

    // Nothing of the failed duel sticks.
    let stored = duels.get(&duel.id).unwrap().unwrap();
    assert_eq!(stored.status, DuelStatus::Pending);
    assert_eq!(stored.opponent_id, None);
    assert!(stored.battle_log.is_empty());
    assert_eq!(characters.load("alice").unwrap().unwrap(), alice);
    assert_eq!(characters.load("bob").unwrap().unwrap(), bob);

    // The released duel can still be accepted.
    let resolution = service
        .accept(&duel.id, "bob", now(), &mut ScriptedRolls::always_hit())
        .unwrap();
    assert_eq!(resolution.duel.status, DuelStatus::Completed);
    let alice = characters.load("alice").unwrap().unwrap();
    let bob = characters.load("bob").unwrap().unwrap();
    assert_eq!(alice.record.total() + bob.record.total(), 2);
    assert_eq!(alice.bonuses + bob.bonuses, 400);
}
