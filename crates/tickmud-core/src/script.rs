//! Script callback contract and the context facade
//!
//! Scripts are trait objects with narrow, optional entry points; every
//! method has a no-op default so a script implements only what it cares
//! about. All world access goes through [`ScriptCtx`]: reads are immediate,
//! structural mutations (applying effects, despawning) are queued and
//! applied by the runtime between callbacks, so a callback never observes a
//! half-applied change and never invalidates the pass that invoked it.

use crate::event::EventDetails;
use crate::identity::{ActorId, EffectId, Flag, QuestToken, RoomId};
use crate::idle::IdleCooldowns;
use crate::rng::GameRng;
use crate::time::Round;
use crate::value::Value;
use crate::world::{TemporaryExit, World};
use indexmap::IndexMap;
use thiserror::Error;

/// Whether a handler consumed the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Handled {
    /// The event was consumed; stop dispatching
    Yes,
    /// Not handled; try the next handler
    #[default]
    No,
}

impl Handled {
    /// Check if the event was consumed
    pub fn is_yes(&self) -> bool {
        matches!(self, Handled::Yes)
    }
}

/// A failure raised by a script callback
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// The callback exceeded its execution budget
    #[error("script exceeded its execution budget in {0}")]
    Timeout(String),
    /// The callback hit an unrecoverable condition
    #[error("script fault: {0}")]
    Fault(String),
}

/// Result type for script callbacks
pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

/// A world mutation queued by a script, applied after the callback returns
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOp {
    /// Apply an effect to an actor
    QueueEffect {
        /// Target actor
        actor: ActorId,
        /// Effect to apply
        effect: EffectId,
    },
    /// Cancel one effect on an actor
    RemoveEffect {
        /// Target actor
        actor: ActorId,
        /// Effect to cancel
        effect: EffectId,
    },
    /// Cancel every effect on an actor carrying a flag
    CancelFlag {
        /// Target actor
        actor: ActorId,
        /// Flag to match
        flag: Flag,
    },
    /// Remove a mob from the world
    Despawn {
        /// Target actor
        actor: ActorId,
    },
    /// Run a command as an actor on a later drain
    Command {
        /// Acting actor
        actor: ActorId,
        /// Full command line
        text: String,
    },
}

/// The facade scripts use to observe and mutate the world
///
/// Borrowed for the duration of a single callback.
pub struct ScriptCtx<'a> {
    world: &'a mut World,
    rng: &'a mut GameRng,
    pending: &'a mut Vec<PendingOp>,
    cooldowns: &'a mut IndexMap<ActorId, IdleCooldowns>,
    round: Round,
}

impl<'a> ScriptCtx<'a> {
    /// Assemble a context for one callback
    pub fn new(
        world: &'a mut World,
        rng: &'a mut GameRng,
        pending: &'a mut Vec<PendingOp>,
        cooldowns: &'a mut IndexMap<ActorId, IdleCooldowns>,
        round: Round,
    ) -> Self {
        Self {
            world,
            rng,
            pending,
            cooldowns,
            round,
        }
    }

    /// The current round number
    pub fn round(&self) -> Round {
        self.round
    }

    // --- messaging ---

    /// Send a message to one actor
    pub fn send_to_actor(&mut self, actor: ActorId, text: impl Into<String>) {
        self.world.send_to_actor(actor, text);
    }

    /// Send a message to everyone in a room
    pub fn send_to_room(&mut self, room: RoomId, text: impl Into<String>) {
        self.world.send_to_room(room, text, None);
    }

    /// Send a message to everyone in a room except one actor
    pub fn send_to_room_except(&mut self, room: RoomId, text: impl Into<String>, exclude: ActorId) {
        self.world.send_to_room(room, text, Some(exclude));
    }

    // --- actor reads ---

    /// An actor's display name, if it exists
    pub fn actor_name(&self, actor: ActorId) -> Option<String> {
        self.world.actor(actor).map(|a| a.name.clone())
    }

    /// The room an actor is in, if it exists
    pub fn actor_room(&self, actor: ActorId) -> Option<RoomId> {
        self.world.actor(actor).map(|a| a.room)
    }

    /// Check whether an actor still exists
    pub fn actor_exists(&self, actor: ActorId) -> bool {
        self.world.contains_actor(actor)
    }

    /// Check if an actor holds a quest token
    pub fn has_quest(&self, actor: ActorId, token: &QuestToken) -> bool {
        self.world
            .actor(actor)
            .map(|a| a.has_quest(token))
            .unwrap_or(false)
    }

    /// Check if an actor has an effect active
    pub fn has_effect(&self, actor: ActorId, effect: EffectId) -> bool {
        self.world
            .actor(actor)
            .map(|a| a.effects.has_effect(effect))
            .unwrap_or(false)
    }

    /// An actor's gold on hand
    pub fn gold(&self, actor: ActorId) -> u64 {
        self.world.actor(actor).map(|a| a.gold).unwrap_or(0)
    }

    /// Mobs sharing a room, in spawn order
    pub fn mobs_in_room(&self, room: RoomId) -> Vec<ActorId> {
        self.world.mobs_in_room(room)
    }

    /// Players in a room, in spawn order
    pub fn players_in_room(&self, room: RoomId) -> Vec<ActorId> {
        self.world.players_in_room(room)
    }

    // --- actor writes (immediate, non-structural) ---

    /// Adjust an actor's health, clamped to its bounds
    pub fn adjust_health(&mut self, actor: ActorId, delta: i64) -> Option<i64> {
        self.world.actor_mut(actor).map(|a| a.adjust_health(delta))
    }

    /// Adjust an actor's mana, clamped to its bounds
    pub fn adjust_mana(&mut self, actor: ActorId, delta: i64) -> Option<i64> {
        self.world.actor_mut(actor).map(|a| a.adjust_mana(delta))
    }

    /// Grant a quest token; returns false if already held or actor missing
    pub fn give_quest(&mut self, actor: ActorId, token: QuestToken) -> bool {
        self.world
            .actor_mut(actor)
            .map(|a| a.give_quest(token))
            .unwrap_or(false)
    }

    /// Put an item in an actor's inventory
    pub fn give_item(&mut self, actor: ActorId, item: crate::identity::ItemId) -> bool {
        match self.world.actor_mut(actor) {
            Some(a) => {
                a.inventory.push(item);
                true
            }
            None => false,
        }
    }

    /// Adjust an actor's gold, saturating at zero
    pub fn adjust_gold(&mut self, actor: ActorId, delta: i64) -> Option<u64> {
        self.world.actor_mut(actor).map(|a| {
            a.gold = if delta < 0 {
                a.gold.saturating_sub(delta.unsigned_abs())
            } else {
                a.gold.saturating_add(delta as u64)
            };
            a.gold
        })
    }

    // --- script data ---

    /// Read a transient value scoped to an actor
    pub fn actor_temp(&self, actor: ActorId, key: &str) -> Option<Value> {
        self.world.actor_temp(actor, key).cloned()
    }

    /// Write a transient value scoped to an actor
    pub fn set_actor_temp(&mut self, actor: ActorId, key: impl Into<String>, value: Value) {
        self.world.set_actor_temp(actor, key, value);
    }

    /// Read a persistent value scoped to an actor
    pub fn actor_misc(&self, actor: ActorId, key: &str) -> Option<Value> {
        self.world.actor(actor).and_then(|a| a.misc.get(key)).cloned()
    }

    /// Write a persistent value scoped to an actor
    pub fn set_actor_misc(&mut self, actor: ActorId, key: impl Into<String>, value: Value) {
        if let Some(a) = self.world.actor_mut(actor) {
            a.misc.insert(key.into(), value);
        }
    }

    /// Read a transient value scoped to a room
    pub fn room_temp(&self, room: RoomId, key: &str) -> Option<Value> {
        self.world.room(room).and_then(|r| r.temp.get(key)).cloned()
    }

    /// Write a transient value scoped to a room
    pub fn set_room_temp(&mut self, room: RoomId, key: impl Into<String>, value: Value) {
        if let Some(r) = self.world.room_mut(room) {
            r.temp.insert(key.into(), value);
        }
    }

    // --- rooms ---

    /// Add a temporary exit that the round loop sweeps after `lifetime_rounds`
    pub fn add_temporary_exit(
        &mut self,
        room: RoomId,
        name: impl Into<String>,
        destination: RoomId,
        lifetime_rounds: u64,
    ) -> bool {
        self.world.add_temporary_exit(
            room,
            TemporaryExit {
                name: name.into(),
                style: None,
                destination,
                expires_at: self.round + lifetime_rounds,
            },
        )
    }

    /// Check a room mutator flag
    pub fn room_has_mutator(&self, room: RoomId, mutator: &str) -> bool {
        self.world
            .room(room)
            .map(|r| r.has_mutator(mutator))
            .unwrap_or(false)
    }

    /// Set a room mutator flag
    pub fn add_room_mutator(&mut self, room: RoomId, mutator: impl Into<String>) {
        if let Some(r) = self.world.room_mut(room) {
            r.add_mutator(mutator);
        }
    }

    /// Clear a room mutator flag
    pub fn remove_room_mutator(&mut self, room: RoomId, mutator: &str) {
        if let Some(r) = self.world.room_mut(room) {
            r.remove_mutator(mutator);
        }
    }

    /// Move an actor directly to a room; returns false on unknown targets
    pub fn teleport(&mut self, actor: ActorId, to: RoomId) -> bool {
        self.world.move_actor(actor, to).is_some()
    }

    // --- randomness ---

    /// Roll dice against the deterministic session generator
    pub fn dice_roll(&mut self, count: u32, sides: u32) -> i64 {
        self.rng.dice_roll(count, sides)
    }

    /// Random check with the given percent chance of success
    pub fn chance_percent(&mut self, percent: u8) -> bool {
        self.rng.chance_percent(percent)
    }

    // --- cooldowns ---

    /// Try to start a named cooldown scoped to an actor
    ///
    /// Returns true and records the round when the key is off cooldown.
    pub fn try_cooldown(&mut self, actor: ActorId, key: &str, cooldown_rounds: u64) -> bool {
        self.cooldowns
            .entry(actor)
            .or_default()
            .try_start(key, self.round, cooldown_rounds)
    }

    // --- deferred structural ops ---

    /// Queue an effect application; runs after this callback returns
    pub fn queue_effect(&mut self, actor: ActorId, effect: EffectId) {
        self.pending.push(PendingOp::QueueEffect { actor, effect });
    }

    /// Queue cancellation of one effect
    pub fn remove_effect(&mut self, actor: ActorId, effect: EffectId) {
        self.pending.push(PendingOp::RemoveEffect { actor, effect });
    }

    /// Queue cancellation of every effect carrying a flag
    pub fn cancel_flag(&mut self, actor: ActorId, flag: impl Into<Flag>) {
        self.pending.push(PendingOp::CancelFlag {
            actor,
            flag: flag.into(),
        });
    }

    /// Queue removal of a mob from the world
    pub fn despawn(&mut self, actor: ActorId) {
        self.pending.push(PendingOp::Despawn { actor });
    }

    /// Queue a command to run as an actor on the next command drain
    pub fn command(&mut self, actor: ActorId, text: impl Into<String>) {
        self.pending.push(PendingOp::Command {
            actor,
            text: text.into(),
        });
    }
}

/// Lifecycle callbacks for an effect definition
///
/// All methods default to no-ops; an effect with no script is legal.
pub trait EffectScript: Send + Sync {
    /// The effect was newly applied (not called on refresh)
    fn on_start(&self, ctx: &mut ScriptCtx<'_>, actor: ActorId, effect: EffectId) -> ScriptResult<()> {
        let _ = (ctx, actor, effect);
        Ok(())
    }

    /// One trigger charge was consumed this round
    fn on_trigger(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        effect: EffectId,
        triggers_left: u32,
    ) -> ScriptResult<()> {
        let _ = (ctx, actor, effect, triggers_left);
        Ok(())
    }

    /// The instance expired naturally and is being removed
    fn on_end(&self, ctx: &mut ScriptCtx<'_>, actor: ActorId, effect: EffectId) -> ScriptResult<()> {
        let _ = (ctx, actor, effect);
        Ok(())
    }
}

/// Callbacks attached to a room
pub trait RoomScript: Send + Sync {
    /// The script was attached to its room
    fn on_load(&self, ctx: &mut ScriptCtx<'_>, room: RoomId) -> ScriptResult<()> {
        let _ = (ctx, room);
        Ok(())
    }

    /// The idle scheduler picked this room this round
    fn on_idle(&self, ctx: &mut ScriptCtx<'_>, room: RoomId) -> ScriptResult<Handled> {
        let _ = (ctx, room);
        Ok(Handled::No)
    }

    /// An actor entered the room
    fn on_enter(&self, ctx: &mut ScriptCtx<'_>, actor: ActorId, room: RoomId) -> ScriptResult<()> {
        let _ = (ctx, actor, room);
        Ok(())
    }

    /// An actor is leaving; `Handled::Yes` suppresses the move
    fn on_exit(&self, ctx: &mut ScriptCtx<'_>, actor: ActorId, room: RoomId) -> ScriptResult<Handled> {
        let _ = (ctx, actor, room);
        Ok(Handled::No)
    }

    /// Verb-specific hook, consulted before the generic command hook
    fn on_specific_command(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        room: RoomId,
        verb: &str,
        rest: &str,
    ) -> ScriptResult<Handled> {
        let _ = (ctx, actor, room, verb, rest);
        Ok(Handled::No)
    }

    /// Generic command hook, consulted when no verb-specific hook consumed it
    fn on_command(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        room: RoomId,
        verb: &str,
        rest: &str,
    ) -> ScriptResult<Handled> {
        let _ = (ctx, actor, room, verb, rest);
        Ok(Handled::No)
    }
}

/// Callbacks attached to a mob template
pub trait MobScript: Send + Sync {
    /// The script was attached to a freshly spawned mob
    fn on_load(&self, ctx: &mut ScriptCtx<'_>, mob: ActorId) -> ScriptResult<()> {
        let _ = (ctx, mob);
        Ok(())
    }

    /// The idle scheduler picked this mob this round
    ///
    /// Return `Handled::Yes` when the mob acted; an unhandled idle feeds the
    /// boredom fallback.
    fn on_idle(&self, ctx: &mut ScriptCtx<'_>, mob: ActorId) -> ScriptResult<Handled> {
        let _ = (ctx, mob);
        Ok(Handled::No)
    }

    /// A typed interaction (ask, give, show, converse) reached this mob
    fn on_event(
        &self,
        ctx: &mut ScriptCtx<'_>,
        mob: ActorId,
        details: &EventDetails,
    ) -> ScriptResult<Handled> {
        let _ = (ctx, mob, details);
        Ok(Handled::No)
    }

    /// Verb-specific command hook, consulted before the generic hook
    fn on_specific_command(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        mob: ActorId,
        verb: &str,
        rest: &str,
    ) -> ScriptResult<Handled> {
        let _ = (ctx, actor, mob, verb, rest);
        Ok(Handled::No)
    }

    /// Generic command hook
    fn on_command(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        mob: ActorId,
        verb: &str,
        rest: &str,
    ) -> ScriptResult<Handled> {
        let _ = (ctx, actor, mob, verb, rest);
        Ok(Handled::No)
    }

    /// The mob was removed from the world
    fn on_despawn(&self, ctx: &mut ScriptCtx<'_>, mob: ActorId) -> ScriptResult<()> {
        let _ = (ctx, mob);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Room;

    fn ctx_fixture() -> (World, GameRng, Vec<PendingOp>, IndexMap<ActorId, IdleCooldowns>) {
        let mut world = World::new();
        world.add_room(Room::new(RoomId::new(1), "Gate"));
        (world, GameRng::new(42), Vec::new(), IndexMap::new())
    }

    #[test]
    fn test_deferred_ops_are_queued_not_applied() {
        let (mut world, mut rng, mut pending, mut cooldowns) = ctx_fixture();
        let mob = world.spawn_mob("guard", RoomId::new(1));

        let mut ctx = ScriptCtx::new(&mut world, &mut rng, &mut pending, &mut cooldowns, 5);
        ctx.queue_effect(mob, EffectId::new(3));
        ctx.despawn(mob);

        assert_eq!(pending.len(), 2);
        assert!(world.contains_actor(mob));
        assert!(!world.actor(mob).unwrap().effects.has_effect(EffectId::new(3)));
    }

    #[test]
    fn test_ctx_messaging_and_reads() {
        let (mut world, mut rng, mut pending, mut cooldowns) = ctx_fixture();
        let mob = world.spawn_mob("guard", RoomId::new(1));

        let mut ctx = ScriptCtx::new(&mut world, &mut rng, &mut pending, &mut cooldowns, 5);
        assert_eq!(ctx.actor_name(mob).as_deref(), Some("guard"));
        assert_eq!(ctx.actor_room(mob), Some(RoomId::new(1)));
        ctx.send_to_room(RoomId::new(1), "The guard yawns.");

        assert_eq!(world.drain_outbox().len(), 1);
    }

    #[test]
    fn test_ctx_cooldown_scoped_per_actor() {
        let (mut world, mut rng, mut pending, mut cooldowns) = ctx_fixture();
        let a = world.spawn_mob("guard", RoomId::new(1));
        let b = world.spawn_mob("dog", RoomId::new(1));

        let mut ctx = ScriptCtx::new(&mut world, &mut rng, &mut pending, &mut cooldowns, 5);
        assert!(ctx.try_cooldown(a, "howl", 10));
        assert!(!ctx.try_cooldown(a, "howl", 10));
        assert!(ctx.try_cooldown(b, "howl", 10));
    }

    #[test]
    fn test_ctx_gold_saturates() {
        let (mut world, mut rng, mut pending, mut cooldowns) = ctx_fixture();
        let mob = world.spawn_mob("guard", RoomId::new(1));

        let mut ctx = ScriptCtx::new(&mut world, &mut rng, &mut pending, &mut cooldowns, 5);
        assert_eq!(ctx.adjust_gold(mob, 50), Some(50));
        assert_eq!(ctx.adjust_gold(mob, -80), Some(0));
    }

    #[test]
    fn test_default_trait_impls_are_noops() {
        struct Silent;
        impl MobScript for Silent {}

        let (mut world, mut rng, mut pending, mut cooldowns) = ctx_fixture();
        let mob = world.spawn_mob("guard", RoomId::new(1));
        let mut ctx = ScriptCtx::new(&mut world, &mut rng, &mut pending, &mut cooldowns, 5);

        let script = Silent;
        assert_eq!(script.on_idle(&mut ctx, mob).unwrap(), Handled::No);
    }
}
