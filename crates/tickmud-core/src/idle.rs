//! Idle behavior scheduling and charm state
//!
//! Mobs with no player input still act: each round a fraction of them (set
//! by their activity level) get an idle callback, and mobs left alone too
//! long accumulate boredom until the fallback despawns them. Charmed mobs
//! are exempt from both.

use crate::identity::ActorId;
use crate::rng::GameRng;
use crate::time::Round;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Consecutive displaced rounds before a charmed mob teleports to its master
pub const CHARM_TELEPORT_AFTER: u8 = 3;

/// Cooldown entries older than this many rounds are discarded
const COOLDOWN_STALE_ROUNDS: u64 = 100;

/// Charm state attached to a mob
///
/// A charmed mob follows its master, skips idle behavior and is never
/// despawned for boredom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Charm {
    /// The actor this mob is bound to
    pub master: ActorId,
    /// Rounds until the charm wears off; None means permanent
    pub rounds_remaining: Option<u64>,
    /// Consecutive rounds spent in a different room than the master
    pub displaced_rounds: u8,
}

impl Charm {
    /// Charm a mob for a fixed number of rounds
    pub fn for_rounds(master: ActorId, rounds: u64) -> Self {
        Self {
            master,
            rounds_remaining: Some(rounds),
            displaced_rounds: 0,
        }
    }

    /// Charm a mob permanently
    pub fn permanent(master: ActorId) -> Self {
        Self {
            master,
            rounds_remaining: None,
            displaced_rounds: 0,
        }
    }

    /// Advance one round; returns true when the charm has worn off
    pub fn tick(&mut self) -> bool {
        match self.rounds_remaining.as_mut() {
            Some(0) => true,
            Some(r) => {
                *r -= 1;
                *r == 0
            }
            None => false,
        }
    }

    /// Record whether the mob shared a room with its master this round
    ///
    /// Returns true when the mob has been displaced long enough to warrant
    /// a teleport back to the master.
    pub fn note_displacement(&mut self, with_master: bool) -> bool {
        if with_master {
            self.displaced_rounds = 0;
            false
        } else {
            self.displaced_rounds += 1;
            if self.displaced_rounds >= CHARM_TELEPORT_AFTER {
                self.displaced_rounds = 0;
                true
            } else {
                false
            }
        }
    }
}

/// Per-entity idle bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdleEntry {
    /// Last round this entity received an idle callback
    pub last_idle_round: Round,
    /// Rounds of accumulated boredom since the last player contact
    pub boredom: u32,
}

/// Tracks which entities are eligible for idle callbacks
///
/// Keyed by whatever identifies the entity; mobs and rooms each get their
/// own registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleRegistry<K: std::hash::Hash + Eq + Copy> {
    entries: IndexMap<K, IdleEntry>,
}

impl<K: std::hash::Hash + Eq + Copy> Default for IdleRegistry<K> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

/// Outcome of an idle eligibility check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleDecision {
    /// Not this round
    Skip,
    /// Run the mob's idle callback
    Act,
    /// Boredom exceeded the limit; despawn the mob
    Despawn,
}

impl<K: std::hash::Hash + Eq + Copy> IdleRegistry<K> {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an entity
    pub fn track(&mut self, key: K, round: Round) {
        self.entries.entry(key).or_insert(IdleEntry {
            last_idle_round: round,
            boredom: 0,
        });
    }

    /// Stop tracking an entity (despawned or removed)
    pub fn forget(&mut self, key: K) {
        self.entries.shift_remove(&key);
    }

    /// Reset an entity's boredom (a player interacted with it)
    pub fn reset_boredom(&mut self, key: K) {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.boredom = 0;
        }
    }

    /// Entities currently tracked, in tracking order
    pub fn tracked(&self) -> Vec<K> {
        self.entries.keys().copied().collect()
    }

    /// Decide whether an entity acts this round
    ///
    /// `activity_level` is the percent chance the entity acts on any given
    /// round. `max_boredom` of None disables the despawn fallback.
    pub fn decide(
        &mut self,
        key: K,
        round: Round,
        activity_level: u8,
        max_boredom: Option<u32>,
        rng: &mut GameRng,
    ) -> IdleDecision {
        let entry = match self.entries.get_mut(&key) {
            Some(entry) => entry,
            None => return IdleDecision::Skip,
        };

        entry.boredom += 1;
        if let Some(max) = max_boredom {
            if entry.boredom > max {
                return IdleDecision::Despawn;
            }
        }

        if rng.chance_percent(activity_level) {
            entry.last_idle_round = round;
            IdleDecision::Act
        } else {
            IdleDecision::Skip
        }
    }
}

/// Named cooldown ledger for idle scripts
///
/// Scripts use this to rate-limit their own behaviors ("only howl every 20
/// rounds"). Stale entries are pruned lazily on access so an abandoned key
/// never leaks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdleCooldowns {
    entries: IndexMap<String, Round>,
}

impl IdleCooldowns {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to start the named cooldown
    ///
    /// Returns true and records the round if the key is off cooldown, false
    /// if it is still within `cooldown_rounds` of the last start.
    pub fn try_start(&mut self, key: &str, round: Round, cooldown_rounds: u64) -> bool {
        self.prune_stale(round);
        match self.entries.get(key) {
            Some(last) if round.saturating_sub(*last) < cooldown_rounds => false,
            _ => {
                self.entries.insert(key.to_string(), round);
                true
            }
        }
    }

    /// Check the named cooldown without starting it
    pub fn ready(&self, key: &str, round: Round, cooldown_rounds: u64) -> bool {
        match self.entries.get(key) {
            Some(last) => round.saturating_sub(*last) >= cooldown_rounds,
            None => true,
        }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune_stale(&mut self, round: Round) {
        self.entries
            .retain(|_, last| round.saturating_sub(*last) <= COOLDOWN_STALE_ROUNDS);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charm_tick_expiry() {
        let mut charm = Charm::for_rounds(ActorId::new(1), 2);
        assert!(!charm.tick());
        assert!(charm.tick());

        let mut permanent = Charm::permanent(ActorId::new(1));
        for _ in 0..100 {
            assert!(!permanent.tick());
        }
    }

    #[test]
    fn test_charm_displacement_teleport() {
        let mut charm = Charm::permanent(ActorId::new(1));
        assert!(!charm.note_displacement(false));
        assert!(!charm.note_displacement(false));
        assert!(charm.note_displacement(false));
        // Counter reset after teleport
        assert!(!charm.note_displacement(false));
    }

    #[test]
    fn test_charm_displacement_resets_when_together() {
        let mut charm = Charm::permanent(ActorId::new(1));
        charm.note_displacement(false);
        charm.note_displacement(false);
        charm.note_displacement(true);
        assert!(!charm.note_displacement(false));
        assert!(!charm.note_displacement(false));
        assert!(charm.note_displacement(false));
    }

    #[test]
    fn test_idle_activity_level_extremes() {
        let mut registry = IdleRegistry::new();
        let mut rng = GameRng::new(42);
        let mob = ActorId::new(1);
        registry.track(mob, 0);

        // 0 percent never acts, 100 percent always acts
        for round in 1..=50 {
            assert_eq!(registry.decide(mob, round, 0, None, &mut rng), IdleDecision::Skip);
        }
        for round in 51..=100 {
            assert_eq!(registry.decide(mob, round, 100, None, &mut rng), IdleDecision::Act);
        }
    }

    #[test]
    fn test_idle_despawn_past_max_boredom() {
        let mut registry = IdleRegistry::new();
        let mut rng = GameRng::new(42);
        let mob = ActorId::new(1);
        registry.track(mob, 0);

        let mut despawned_at = None;
        for round in 1..=10 {
            if registry.decide(mob, round, 0, Some(3), &mut rng) == IdleDecision::Despawn {
                despawned_at = Some(round);
                break;
            }
        }
        assert_eq!(despawned_at, Some(4));
    }

    #[test]
    fn test_idle_boredom_reset() {
        let mut registry = IdleRegistry::new();
        let mut rng = GameRng::new(42);
        let mob = ActorId::new(1);
        registry.track(mob, 0);

        for round in 1..=3 {
            registry.decide(mob, round, 0, Some(3), &mut rng);
        }
        registry.reset_boredom(mob);
        assert_ne!(registry.decide(mob, 4, 0, Some(3), &mut rng), IdleDecision::Despawn);
    }

    #[test]
    fn test_untracked_mob_skipped() {
        let mut registry = IdleRegistry::new();
        let mut rng = GameRng::new(42);
        assert_eq!(
            registry.decide(ActorId::new(99), 1, 100, None, &mut rng),
            IdleDecision::Skip
        );
    }

    #[test]
    fn test_cooldowns_gate_and_release() {
        let mut cooldowns = IdleCooldowns::new();
        assert!(cooldowns.try_start("howl", 10, 20));
        assert!(!cooldowns.try_start("howl", 15, 20));
        assert!(!cooldowns.ready("howl", 29, 20));
        assert!(cooldowns.try_start("howl", 30, 20));
    }

    #[test]
    fn test_cooldowns_prune_stale_entries() {
        let mut cooldowns = IdleCooldowns::new();
        cooldowns.try_start("howl", 10, 5);
        cooldowns.try_start("pace", 10, 5);
        assert_eq!(cooldowns.len(), 2);

        // 100+ rounds later the old keys are gone
        cooldowns.try_start("sniff", 200, 5);
        assert_eq!(cooldowns.len(), 1);
    }
}
