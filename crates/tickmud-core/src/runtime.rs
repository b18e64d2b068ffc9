//! The round loop and the operations hosts call between rounds
//!
//! One `Runtime` owns the clock, the world, the effect registry and every
//! script binding. Each call to [`Runtime::round`] runs the fixed pass
//! order:
//!
//! 1. advance the clock
//! 2. sweep expired temporary exits
//! 3. effect trigger pass
//! 4. effect prune pass (end callbacks, world removals)
//! 5. charm upkeep
//! 6. idle scheduling
//! 7. drain queued commands
//!
//! Script faults are contained per entity: a failing callback is recorded
//! in the round report and the pass moves on.

use crate::dispatch::{find_match_in, parse_command, MatchMode};
use crate::effect::{EffectDefinition, EffectRegistry, ExpiryKind};
use crate::error::{Error, Result};
use crate::event::{AskDetails, ConverseDetails, EventDetails, GiveDetails, ShowDetails, Source};
use crate::identity::{ActorId, EffectId, Flag, ItemId, RoomId};
use crate::idle::{Charm, IdleCooldowns, IdleDecision, IdleRegistry};
use crate::rng::GameRng;
use crate::script::{
    EffectScript, Handled, MobScript, PendingOp, RoomScript, ScriptCtx, ScriptError,
};
use crate::time::{Round, RoundClock, DEFAULT_SECONDS_PER_ROUND};
use crate::world::{Message, World};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Instant;

/// Deferred-op cascades deeper than this are cut off and reported
const MAX_PENDING_PASSES: usize = 32;

/// Tuning knobs for a runtime instance
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Real-time seconds represented by one round
    pub seconds_per_round: u32,
    /// Seed for the session's deterministic generator
    pub seed: u64,
    /// Rounds a mob may sit alone before the despawn fallback fires;
    /// None disables the fallback
    pub max_boredom: Option<u32>,
    /// Advisory per-callback execution budget in milliseconds; callbacks
    /// that run longer are recorded as timeouts. Zero disables the check.
    pub script_budget_ms: u64,
    /// Upper bound on commands drained in one round
    pub max_commands_per_round: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seconds_per_round: DEFAULT_SECONDS_PER_ROUND,
            seed: 12345,
            max_boredom: Some(20),
            script_budget_ms: 100,
            max_commands_per_round: 100,
        }
    }
}

/// A contained script failure, attributed to its entry point
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptFault {
    /// Which callback failed ("on_trigger actor:3 effect:5")
    pub entry_point: String,
    /// The failure itself
    pub error: ScriptError,
}

/// What happened during one round
#[derive(Debug, Clone, Default)]
pub struct RoundReport {
    /// The round that was processed
    pub round: Round,
    /// Trigger callbacks fired
    pub triggers_fired: usize,
    /// Effects newly started
    pub effects_started: usize,
    /// Effects that expired or were cancelled
    pub effects_ended: usize,
    /// Temporary exits swept
    pub exits_swept: usize,
    /// Commands drained from the queue
    pub commands_handled: usize,
    /// Actors removed from the world this round
    pub despawned: Vec<ActorId>,
    /// Contained script failures
    pub faults: Vec<ScriptFault>,
    /// Messages produced this round, in emission order
    pub messages: Vec<Message>,
}

/// The simulation core
pub struct Runtime {
    config: RuntimeConfig,
    clock: RoundClock,
    world: World,
    rng: GameRng,
    effects: EffectRegistry,
    effect_scripts: IndexMap<EffectId, Arc<dyn EffectScript>>,
    room_scripts: IndexMap<RoomId, Arc<dyn RoomScript>>,
    mob_scripts: IndexMap<ActorId, Arc<dyn MobScript>>,
    idle: IdleRegistry<ActorId>,
    room_idle: IdleRegistry<RoomId>,
    room_activity: IndexMap<RoomId, u8>,
    cooldowns: IndexMap<ActorId, IdleCooldowns>,
    pending: Vec<PendingOp>,
    queued_commands: Vec<(ActorId, String)>,
    report: RoundReport,
    applying: bool,
}

impl Runtime {
    /// Create a runtime with the given configuration
    pub fn new(config: RuntimeConfig) -> Self {
        let clock = RoundClock::with_seconds_per_round(config.seconds_per_round);
        let rng = GameRng::new(config.seed);
        Self {
            config,
            clock,
            world: World::new(),
            rng,
            effects: EffectRegistry::new(),
            effect_scripts: IndexMap::new(),
            room_scripts: IndexMap::new(),
            mob_scripts: IndexMap::new(),
            idle: IdleRegistry::new(),
            room_idle: IdleRegistry::new(),
            room_activity: IndexMap::new(),
            cooldowns: IndexMap::new(),
            pending: Vec::new(),
            queued_commands: Vec::new(),
            report: RoundReport::default(),
            applying: false,
        }
    }

    /// The round clock
    pub fn clock(&self) -> &RoundClock {
        &self.clock
    }

    /// The round clock, mutable (pacing changes)
    pub fn clock_mut(&mut self) -> &mut RoundClock {
        &mut self.clock
    }

    /// The world arena
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The world arena, mutable (host-side setup)
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The effect definition registry
    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    // --- registration ---

    /// Register an effect definition
    pub fn register_effect(&mut self, def: EffectDefinition) -> Result<()> {
        self.effects.register(def)
    }

    /// Attach a script to a registered effect definition
    pub fn attach_effect_script(
        &mut self,
        effect: EffectId,
        script: Arc<dyn EffectScript>,
    ) -> Result<()> {
        if !self.effects.contains(effect) {
            return Err(Error::InvalidEffectDefinition(effect));
        }
        self.effect_scripts.insert(effect, script);
        Ok(())
    }

    /// Attach a script to a room; fires its load callback
    pub fn attach_room_script(&mut self, room: RoomId, script: Arc<dyn RoomScript>) -> Result<()> {
        if self.world.room(room).is_none() {
            return Err(Error::UnknownRoom(room));
        }
        self.room_scripts.insert(room, script.clone());
        self.invoke(format!("on_load room:{}", room.raw()), |ctx| {
            script.on_load(ctx, room)
        });
        self.apply_pending();
        Ok(())
    }

    /// Schedule a room for idle callbacks at the given activity level
    pub fn register_room_idle(&mut self, room: RoomId, activity_level: u8) -> Result<()> {
        if self.world.room(room).is_none() {
            return Err(Error::UnknownRoom(room));
        }
        self.room_activity.insert(room, activity_level);
        self.room_idle.track(room, self.clock.now());
        Ok(())
    }

    /// Spawn a mob and start tracking it for idle scheduling
    pub fn spawn_mob(&mut self, name: impl Into<String>, room: RoomId, activity_level: u8) -> Result<ActorId> {
        if self.world.room(room).is_none() {
            return Err(Error::UnknownRoom(room));
        }
        let id = self.world.spawn_mob(name, room);
        if let Some(actor) = self.world.actor_mut(id) {
            actor.activity_level = activity_level;
        }
        self.idle.track(id, self.clock.now());
        Ok(id)
    }

    /// Spawn a mob with a behavior script attached; fires its load callback
    pub fn spawn_scripted_mob(
        &mut self,
        name: impl Into<String>,
        room: RoomId,
        activity_level: u8,
        script: Arc<dyn MobScript>,
    ) -> Result<ActorId> {
        let id = self.spawn_mob(name, room, activity_level)?;
        self.mob_scripts.insert(id, script.clone());
        self.invoke(format!("on_load {}", id), |ctx| script.on_load(ctx, id));
        self.apply_pending();
        Ok(id)
    }

    /// Spawn a player
    pub fn spawn_player(&mut self, name: impl Into<String>, room: RoomId) -> Result<ActorId> {
        if self.world.room(room).is_none() {
            return Err(Error::UnknownRoom(room));
        }
        Ok(self.world.spawn_player(name, room))
    }

    // --- effect operations ---

    /// Apply an effect to an actor
    ///
    /// Returns true when a new instance was created. Re-applying an active
    /// effect refreshes its remaining charges without a second start
    /// callback. Definitions marked `trigger_now` fire their first trigger
    /// immediately.
    pub fn apply_effect(&mut self, actor: ActorId, effect: EffectId) -> Result<bool> {
        let def = self
            .effects
            .get(effect)
            .cloned()
            .ok_or(Error::InvalidEffectDefinition(effect))?;
        let round = self.clock.now();
        let target = self.world.actor_mut(actor).ok_or(Error::UnknownActor(actor))?;
        let is_new = target.effects.apply(&def, round);

        if is_new {
            self.report.effects_started += 1;
            let mut faulted = false;
            if let Some(script) = self.effect_scripts.get(&effect).cloned() {
                faulted = self
                    .invoke_checked(format!("on_start {} {}", actor, effect), |ctx| {
                        script.on_start(ctx, actor, effect)
                    })
                    .is_err();
            }
            self.apply_pending();

            if faulted {
                self.force_expire(actor, effect);
            } else if def.trigger_now {
                self.fire_immediate_trigger(actor, effect);
            }
        }
        Ok(is_new)
    }

    fn fire_immediate_trigger(&mut self, actor: ActorId, effect: EffectId) {
        let left = match self
            .world
            .actor_mut(actor)
            .and_then(|a| a.effects.get_mut(effect))
        {
            Some(inst) => {
                if !inst.consume_trigger() {
                    return;
                }
                inst.triggers_left
            }
            None => return,
        };
        self.report.triggers_fired += 1;
        if let Some(script) = self.effect_scripts.get(&effect).cloned() {
            let faulted = self
                .invoke_checked(format!("on_trigger {} {}", actor, effect), |ctx| {
                    script.on_trigger(ctx, actor, effect, left)
                })
                .is_err();
            if faulted {
                self.force_expire(actor, effect);
            }
        }
        self.apply_pending();
        self.finish_expired_for(actor);
        self.apply_pending();
    }

    /// Forcibly end an instance whose script faulted
    ///
    /// The instance is cancelled so a broken script cannot keep firing
    /// round after round; the end callback still gets one chance to run.
    fn force_expire(&mut self, actor: ActorId, effect: EffectId) {
        let cancelled = self
            .world
            .actor_mut(actor)
            .map(|a| a.effects.cancel(effect))
            .unwrap_or(false);
        if cancelled {
            self.finish_expired_for(actor);
            self.apply_pending();
        }
    }

    /// Cancel one effect on an actor
    ///
    /// The end callback fires immediately. Removing the world-removal
    /// effect this way expires it normally, so the actor despawns; only
    /// flag cancellation discards it silently.
    pub fn remove_effect(&mut self, actor: ActorId, effect: EffectId) -> Result<bool> {
        if !self.world.contains_actor(actor) {
            return Err(Error::UnknownActor(actor));
        }
        let cancelled = self.cancel_one(actor, effect);
        if cancelled {
            self.finish_expired_for(actor);
            self.apply_pending();
        }
        Ok(cancelled)
    }

    /// Drop one effect instance, marking it cancelled except for the
    /// world-removal effect, which expires as if its charges ran out.
    fn cancel_one(&mut self, actor: ActorId, effect: EffectId) -> bool {
        self.world
            .actor_mut(actor)
            .map(|a| {
                if effect.is_world_removal() {
                    a.effects.expire(effect)
                } else {
                    a.effects.cancel(effect)
                }
            })
            .unwrap_or(false)
    }

    /// Cancel every effect on an actor that carries a flag
    pub fn cancel_flag(&mut self, actor: ActorId, flag: impl Into<Flag>) -> Result<Vec<EffectId>> {
        if !self.world.contains_actor(actor) {
            return Err(Error::UnknownActor(actor));
        }
        let flag = flag.into();
        let cancelled = self
            .world
            .actor_mut(actor)
            .map(|a| a.effects.cancel_with_flag(&self.effects, &flag))
            .unwrap_or_default();
        if !cancelled.is_empty() {
            self.finish_expired_for(actor);
            self.apply_pending();
        }
        Ok(cancelled)
    }

    // --- charm operations ---

    /// Charm a mob to a master; None duration means permanent
    pub fn charm_mob(&mut self, mob: ActorId, master: ActorId, rounds: Option<u64>) -> Result<()> {
        if !self.world.contains_actor(master) {
            return Err(Error::UnknownActor(master));
        }
        let actor = self.world.actor_mut(mob).ok_or(Error::UnknownActor(mob))?;
        actor.charm = Some(match rounds {
            Some(r) => Charm::for_rounds(master, r),
            None => Charm::permanent(master),
        });
        Ok(())
    }

    /// Remove a mob's charm state
    pub fn uncharm(&mut self, mob: ActorId) -> Result<()> {
        let actor = self.world.actor_mut(mob).ok_or(Error::UnknownActor(mob))?;
        actor.charm = None;
        Ok(())
    }

    // --- interaction operations ---

    /// Ask a mob a question
    pub fn ask(&mut self, source: Source, mob: ActorId, text: impl Into<String>) -> Result<Handled> {
        let details = EventDetails::Ask(AskDetails {
            source,
            text: text.into(),
        });
        self.deliver_event(mob, details)
    }

    /// Hand a mob gold or an item
    ///
    /// Gold is clamped to what the source actually has; an item the source
    /// does not carry makes the give a no-op. An item the mob's script does
    /// not claim is handed straight back.
    pub fn give(
        &mut self,
        source: Source,
        mob: ActorId,
        gold: u64,
        item: Option<ItemId>,
    ) -> Result<Handled> {
        if !self.world.contains_actor(mob) {
            return Err(Error::MissingTarget);
        }
        let giver = self
            .world
            .actor_mut(source.id)
            .ok_or(Error::UnknownActor(source.id))?;

        let gold = gold.min(giver.gold);
        if let Some(item) = item {
            if !giver.take_item(item) {
                return Ok(Handled::No);
            }
        }
        giver.gold -= gold;

        if let Some(receiver) = self.world.actor_mut(mob) {
            receiver.gold += gold;
            if let Some(item) = item {
                receiver.inventory.push(item);
            }
        }

        let details = EventDetails::Give(GiveDetails { source, gold, item });
        let handled = self.deliver_event(mob, details)?;

        if !handled.is_yes() {
            if let Some(item) = item {
                let returned = self
                    .world
                    .actor_mut(mob)
                    .map(|m| m.take_item(item))
                    .unwrap_or(false);
                if returned {
                    if let Some(giver) = self.world.actor_mut(source.id) {
                        giver.inventory.push(item);
                    }
                }
            }
        }
        Ok(handled)
    }

    /// Show a mob an item without handing it over
    pub fn show(&mut self, source: Source, mob: ActorId, item: ItemId) -> Result<Handled> {
        let details = EventDetails::Show(ShowDetails { source, item });
        self.deliver_event(mob, details)
    }

    /// Deliver mob-to-mob speech
    pub fn converse(&mut self, source_mob: ActorId, mob: ActorId, message: impl Into<String>) -> Result<Handled> {
        let details = EventDetails::Converse(ConverseDetails {
            source_mob,
            message: message.into(),
        });
        self.deliver_event(mob, details)
    }

    fn deliver_event(&mut self, mob: ActorId, details: EventDetails) -> Result<Handled> {
        let target = self.world.actor(mob).ok_or(Error::MissingTarget)?;
        if !target.is_mob() {
            return Err(Error::MissingTarget);
        }
        self.idle.reset_boredom(mob);

        let handled = match self.mob_scripts.get(&mob).cloned() {
            Some(script) => self.invoke(format!("on_event {}", mob), |ctx| {
                script.on_event(ctx, mob, &details)
            }),
            None => Handled::No,
        };
        self.apply_pending();
        Ok(handled)
    }

    // --- commands and movement ---

    /// Queue a command to run at this round's drain point
    pub fn queue_command(&mut self, actor: ActorId, text: impl Into<String>) {
        self.queued_commands.push((actor, text.into()));
    }

    /// Dispatch a command immediately
    ///
    /// Order: room verb-specific hook, room generic hook, then each mob in
    /// the room in spawn order (verb-specific before generic). The first
    /// handler returning `Handled::Yes` stops the chain. "go <exit>" is
    /// resolved as movement.
    pub fn dispatch_command(&mut self, actor: ActorId, input: &str) -> Result<Handled> {
        let source = self.world.actor(actor).ok_or(Error::UnknownActor(actor))?;
        let room = source.room;
        let cmd = match parse_command(input) {
            Some(cmd) => cmd,
            None => return Ok(Handled::No),
        };

        if cmd.verb == "go" {
            return self.try_move(actor, &cmd.rest).map(|moved| {
                if moved {
                    Handled::Yes
                } else {
                    Handled::No
                }
            });
        }

        if let Some(script) = self.room_scripts.get(&room).cloned() {
            let handled = self.invoke(format!("on_specific_command room:{}", room.raw()), |ctx| {
                script.on_specific_command(ctx, actor, room, &cmd.verb, &cmd.rest)
            });
            self.apply_pending();
            if handled.is_yes() {
                return Ok(Handled::Yes);
            }
            let handled = self.invoke(format!("on_command room:{}", room.raw()), |ctx| {
                script.on_command(ctx, actor, room, &cmd.verb, &cmd.rest)
            });
            self.apply_pending();
            if handled.is_yes() {
                return Ok(Handled::Yes);
            }
        }

        for mob in self.world.mobs_in_room(room) {
            if mob == actor {
                continue;
            }
            let script = match self.mob_scripts.get(&mob).cloned() {
                Some(script) => script,
                None => continue,
            };
            let handled = self.invoke(format!("on_specific_command {}", mob), |ctx| {
                script.on_specific_command(ctx, actor, mob, &cmd.verb, &cmd.rest)
            });
            self.apply_pending();
            if handled.is_yes() {
                self.idle.reset_boredom(mob);
                return Ok(Handled::Yes);
            }
            let handled = self.invoke(format!("on_command {}", mob), |ctx| {
                script.on_command(ctx, actor, mob, &cmd.verb, &cmd.rest)
            });
            self.apply_pending();
            if handled.is_yes() {
                self.idle.reset_boredom(mob);
                return Ok(Handled::Yes);
            }
        }

        Ok(Handled::No)
    }

    /// Move an actor through a named exit
    ///
    /// The origin room's exit hook may suppress the move; the destination's
    /// enter hook fires after it. Returns whether the actor moved.
    pub fn try_move(&mut self, actor: ActorId, exit_name: &str) -> Result<bool> {
        let source = self.world.actor(actor).ok_or(Error::UnknownActor(actor))?;
        let from = source.room;
        let dest = match self.world.room(from).and_then(|r| r.exit(exit_name)) {
            Some(dest) => dest,
            None => return Ok(false),
        };

        if let Some(script) = self.room_scripts.get(&from).cloned() {
            let blocked = self.invoke(format!("on_exit room:{}", from.raw()), |ctx| {
                script.on_exit(ctx, actor, from)
            });
            self.apply_pending();
            if blocked.is_yes() {
                return Ok(false);
            }
        }

        if self.world.move_actor(actor, dest).is_none() {
            return Ok(false);
        }
        self.fire_on_enter(actor, dest);
        Ok(true)
    }

    fn fire_on_enter(&mut self, actor: ActorId, room: RoomId) {
        if let Some(script) = self.room_scripts.get(&room).cloned() {
            self.invoke(format!("on_enter room:{}", room.raw()), |ctx| {
                script.on_enter(ctx, actor, room)
            });
            self.apply_pending();
        }
    }

    /// Find a mob in a room by name
    pub fn find_mob_in_room(&self, room: RoomId, query: &str, mode: MatchMode) -> Option<ActorId> {
        let mobs = self.world.mobs_in_room(room);
        let names: Vec<String> = mobs
            .iter()
            .filter_map(|id| self.world.actor(*id).map(|a| a.name.clone()))
            .collect();
        find_match_in(query, &names, mode)
            .best()
            .map(|i| mobs[i])
    }

    // --- the round loop ---

    /// Run one round and report what happened
    pub fn round(&mut self) -> RoundReport {
        let round = self.clock.advance();

        self.sweep_exits(round);
        self.trigger_pass();
        self.prune_pass();
        self.charm_pass(round);
        self.idle_pass(round);
        self.drain_commands();

        let mut report = std::mem::take(&mut self.report);
        report.round = round;
        report.messages = self.world.drain_outbox();
        report
    }

    fn sweep_exits(&mut self, round: Round) {
        for (room, name) in self.world.sweep_expired_exits(round) {
            self.report.exits_swept += 1;
            self.world
                .send_to_room(room, format!("The {} fades away.", name), None);
        }
    }

    fn trigger_pass(&mut self) {
        // Snapshot all hits before running any callback so a script that
        // mutates effect sets cannot disturb the pass.
        let mut hits = Vec::new();
        for actor in self.world.actor_ids() {
            if let Some(a) = self.world.actor_mut(actor) {
                for hit in a.effects.tick(&self.effects) {
                    hits.push((actor, hit));
                }
            }
        }

        for (actor, hit) in hits {
            // A prior callback may have despawned the actor or cancelled
            // the instance.
            let still_live = self
                .world
                .actor(actor)
                .and_then(|a| a.effects.get(hit.effect_id))
                .map(|inst| inst.expiry_kind() != ExpiryKind::Cancelled)
                .unwrap_or(false);
            if !still_live {
                continue;
            }
            self.report.triggers_fired += 1;
            if let Some(script) = self.effect_scripts.get(&hit.effect_id).cloned() {
                let effect = hit.effect_id;
                let left = hit.triggers_left;
                let faulted = self
                    .invoke_checked(format!("on_trigger {} {}", actor, effect), |ctx| {
                        script.on_trigger(ctx, actor, effect, left)
                    })
                    .is_err();
                if faulted {
                    self.force_expire(actor, effect);
                }
            }
            self.apply_pending();
        }
    }

    fn prune_pass(&mut self) {
        for actor in self.world.actor_ids() {
            self.finish_expired_for(actor);
            self.apply_pending();
        }
    }

    /// Collect an actor's expired effect instances: end callbacks fire in
    /// apply order, and natural expiry of the world-removal effect removes
    /// the actor itself.
    fn finish_expired_for(&mut self, actor: ActorId) {
        let pruned = match self.world.actor_mut(actor) {
            Some(a) => a.effects.prune(),
            None => return,
        };
        for p in pruned {
            // Flag-cancelled world removal is discarded silently; every
            // other expiry gets its end callback.
            if p.effect_id.is_world_removal() && p.kind == ExpiryKind::Cancelled {
                continue;
            }
            self.report.effects_ended += 1;
            if let Some(script) = self.effect_scripts.get(&p.effect_id).cloned() {
                let effect = p.effect_id;
                self.invoke(format!("on_end {} {}", actor, effect), |ctx| {
                    script.on_end(ctx, actor, effect)
                });
            }
            if p.effect_id.is_world_removal() {
                self.despawn_now(actor);
            }
        }
    }

    fn charm_pass(&mut self, _round: Round) {
        for mob in self.world.actor_ids() {
            let master = match self.world.actor(mob).and_then(|a| a.charm.as_ref()) {
                Some(charm) => charm.master,
                None => continue,
            };
            let master_room = self.world.actor(master).map(|a| a.room);
            let mob_room = match self.world.actor(mob) {
                Some(a) => a.room,
                None => continue,
            };

            let Some(master_room) = master_room else {
                // Master left the world; the bond breaks.
                if let Some(a) = self.world.actor_mut(mob) {
                    a.charm = None;
                }
                continue;
            };

            let (expired, teleport) = match self.world.actor_mut(mob).and_then(|a| a.charm.as_mut()) {
                Some(charm) => {
                    let expired = charm.tick();
                    let teleport = !expired && charm.note_displacement(mob_room == master_room);
                    (expired, teleport)
                }
                None => continue,
            };

            if expired {
                if let Some(a) = self.world.actor_mut(mob) {
                    a.charm = None;
                    let name = a.name.clone();
                    self.world
                        .send_to_room(mob_room, format!("The {} shakes its head, confused.", name), None);
                }
                continue;
            }
            if teleport {
                self.world.move_actor(mob, master_room);
                self.fire_on_enter(mob, master_room);
            }
        }
    }

    fn idle_pass(&mut self, round: Round) {
        for mob in self.idle.tracked() {
            let (room, activity, charmed) = match self.world.actor(mob) {
                Some(a) => (a.room, a.activity_level, a.charm.is_some()),
                None => {
                    self.idle.forget(mob);
                    continue;
                }
            };
            if charmed {
                continue;
            }
            if !self.world.players_in_room(room).is_empty() {
                self.idle.reset_boredom(mob);
            }
            match self
                .idle
                .decide(mob, round, activity, self.config.max_boredom, &mut self.rng)
            {
                IdleDecision::Skip => {}
                IdleDecision::Despawn => {
                    if let Some(a) = self.world.actor(mob) {
                        let name = a.name.clone();
                        self.world
                            .send_to_room(room, format!("The {} wanders off.", name), None);
                    }
                    self.despawn_now(mob);
                }
                IdleDecision::Act => {
                    if let Some(script) = self.mob_scripts.get(&mob).cloned() {
                        let handled =
                            self.invoke(format!("on_idle {}", mob), |ctx| script.on_idle(ctx, mob));
                        // A handled idle counts as activity; only unhandled
                        // rounds feed the boredom fallback.
                        if handled.is_yes() {
                            self.idle.reset_boredom(mob);
                        }
                    }
                }
            }
            self.apply_pending();
        }

        // Rooms idle too, at their registered activity level; they never
        // despawn so boredom does not apply.
        for room in self.room_idle.tracked() {
            if self.world.room(room).is_none() {
                self.room_idle.forget(room);
                continue;
            }
            let activity = self.room_activity.get(&room).copied().unwrap_or(0);
            if self.room_idle.decide(room, round, activity, None, &mut self.rng) == IdleDecision::Act
            {
                if let Some(script) = self.room_scripts.get(&room).cloned() {
                    self.invoke(format!("on_idle room:{}", room.raw()), |ctx| {
                        script.on_idle(ctx, room)
                    });
                }
            }
            self.apply_pending();
        }
    }

    fn drain_commands(&mut self) {
        let mut handled = 0;
        while !self.queued_commands.is_empty() {
            if handled >= self.config.max_commands_per_round {
                self.report.faults.push(ScriptFault {
                    entry_point: "command-drain".to_string(),
                    error: ScriptError::Fault("command cascade exceeded per-round limit".to_string()),
                });
                self.queued_commands.clear();
                break;
            }
            let batch = std::mem::take(&mut self.queued_commands);
            for (actor, text) in batch {
                handled += 1;
                if !self.world.contains_actor(actor) {
                    continue;
                }
                if let Err(err) = self.dispatch_command(actor, &text) {
                    self.report.faults.push(ScriptFault {
                        entry_point: format!("command {}", actor),
                        error: ScriptError::Fault(err.to_string()),
                    });
                }
            }
        }
        self.report.commands_handled += handled;
    }

    // --- internals ---

    /// Remove an actor and every binding that points at it
    fn despawn_now(&mut self, actor: ActorId) {
        if let Some(script) = self.mob_scripts.get(&actor).cloned() {
            self.invoke(format!("on_despawn {}", actor), |ctx| {
                script.on_despawn(ctx, actor)
            });
        }
        if self.world.remove_actor(actor).is_some() {
            self.report.despawned.push(actor);
        }
        self.idle.forget(actor);
        self.mob_scripts.shift_remove(&actor);
        self.cooldowns.shift_remove(&actor);
    }

    /// Run one script callback with fault containment
    ///
    /// A failing callback is recorded and yields the default value. The
    /// execution budget is advisory: overruns are reported after the fact,
    /// the callback is never interrupted.
    fn invoke<T, F>(&mut self, entry_point: String, f: F) -> T
    where
        T: Default,
        F: FnOnce(&mut ScriptCtx<'_>) -> crate::script::ScriptResult<T>,
    {
        self.invoke_checked(entry_point, f).unwrap_or_default()
    }

    /// Like [`Runtime::invoke`] but tells the caller whether the callback
    /// faulted, for callers that apply fail-safe cleanup
    fn invoke_checked<T, F>(&mut self, entry_point: String, f: F) -> std::result::Result<T, ()>
    where
        F: FnOnce(&mut ScriptCtx<'_>) -> crate::script::ScriptResult<T>,
    {
        let start = Instant::now();
        let mut ctx = ScriptCtx::new(
            &mut self.world,
            &mut self.rng,
            &mut self.pending,
            &mut self.cooldowns,
            self.clock.now(),
        );
        let result = f(&mut ctx);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if self.config.script_budget_ms > 0 && elapsed_ms > self.config.script_budget_ms {
            self.report.faults.push(ScriptFault {
                entry_point: entry_point.clone(),
                error: ScriptError::Timeout(entry_point.clone()),
            });
        }
        match result {
            Ok(value) => Ok(value),
            Err(error) => {
                self.report.faults.push(ScriptFault { entry_point, error });
                Err(())
            }
        }
    }

    /// Drain queued script operations until the cascade settles
    fn apply_pending(&mut self) {
        if self.applying {
            return;
        }
        self.applying = true;
        let mut passes = 0;
        while !self.pending.is_empty() {
            passes += 1;
            if passes > MAX_PENDING_PASSES {
                self.report.faults.push(ScriptFault {
                    entry_point: "deferred-ops".to_string(),
                    error: ScriptError::Fault("deferred op cascade exceeded depth limit".to_string()),
                });
                self.pending.clear();
                break;
            }
            let ops = std::mem::take(&mut self.pending);
            for op in ops {
                self.apply_op(op);
            }
        }
        self.applying = false;
    }

    fn apply_op(&mut self, op: PendingOp) {
        match op {
            PendingOp::QueueEffect { actor, effect } => match self.apply_effect(actor, effect) {
                Ok(_) | Err(Error::UnknownActor(_)) => {}
                Err(err) => self.report.faults.push(ScriptFault {
                    entry_point: format!("queue_effect {} {}", actor, effect),
                    error: ScriptError::Fault(err.to_string()),
                }),
            },
            PendingOp::RemoveEffect { actor, effect } => {
                if self.world.contains_actor(actor) && self.cancel_one(actor, effect) {
                    self.finish_expired_for(actor);
                }
            }
            PendingOp::CancelFlag { actor, flag } => {
                if let Some(a) = self.world.actor_mut(actor) {
                    let cancelled = a.effects.cancel_with_flag(&self.effects, &flag);
                    if !cancelled.is_empty() {
                        self.finish_expired_for(actor);
                    }
                }
            }
            PendingOp::Despawn { actor } => {
                if self.world.contains_actor(actor) {
                    self.despawn_now(actor);
                }
            }
            PendingOp::Command { actor, text } => {
                self.queued_commands.push((actor, text));
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptResult;
    use crate::world::{Recipient, Room};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn logged(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    struct Recorder {
        tag: String,
        log: Log,
    }

    impl Recorder {
        fn note(&self, what: &str) {
            self.log.lock().unwrap().push(format!("{}:{}", self.tag, what));
        }
    }

    impl EffectScript for Recorder {
        fn on_start(&self, _ctx: &mut ScriptCtx<'_>, _actor: ActorId, _effect: EffectId) -> ScriptResult<()> {
            self.note("start");
            Ok(())
        }

        fn on_trigger(
            &self,
            _ctx: &mut ScriptCtx<'_>,
            _actor: ActorId,
            _effect: EffectId,
            triggers_left: u32,
        ) -> ScriptResult<()> {
            self.note(&format!("trigger:{}", triggers_left));
            Ok(())
        }

        fn on_end(&self, _ctx: &mut ScriptCtx<'_>, _actor: ActorId, _effect: EffectId) -> ScriptResult<()> {
            self.note("end");
            Ok(())
        }
    }

    fn runtime_with_room() -> (Runtime, RoomId) {
        let mut rt = Runtime::new(RuntimeConfig {
            max_boredom: None,
            ..RuntimeConfig::default()
        });
        let room = RoomId::new(1);
        rt.world_mut().add_room(Room::new(room, "Gate"));
        (rt, room)
    }

    #[test]
    fn test_effect_lifecycle_schedule() {
        let (mut rt, room) = runtime_with_room();
        let mob = rt.spawn_mob("guard", room, 0).unwrap();

        let log = new_log();
        let effect = EffectId::new(5);
        rt.register_effect(EffectDefinition::new(effect, "burn", 1, 3)).unwrap();
        rt.attach_effect_script(
            effect,
            Arc::new(Recorder {
                tag: "burn".to_string(),
                log: log.clone(),
            }),
        )
        .unwrap();

        for _ in 0..10 {
            rt.round();
        }
        assert_eq!(rt.clock().now(), 10);
        assert!(rt.apply_effect(mob, effect).unwrap());

        // Triggers on rounds 11, 12, 13; ends on 13 in the same round.
        for _ in 0..4 {
            rt.round();
        }
        assert_eq!(
            logged(&log),
            vec!["burn:start", "burn:trigger:2", "burn:trigger:1", "burn:trigger:0", "burn:end"]
        );
        assert!(!rt.world().actor(mob).unwrap().effects.has_effect(effect));
    }

    #[test]
    fn test_reapply_refreshes_without_second_start() {
        let (mut rt, room) = runtime_with_room();
        let mob = rt.spawn_mob("guard", room, 0).unwrap();

        let log = new_log();
        let effect = EffectId::new(5);
        rt.register_effect(EffectDefinition::new(effect, "burn", 1, 3)).unwrap();
        rt.attach_effect_script(
            effect,
            Arc::new(Recorder {
                tag: "burn".to_string(),
                log: log.clone(),
            }),
        )
        .unwrap();

        assert!(rt.apply_effect(mob, effect).unwrap());
        rt.round();
        assert!(!rt.apply_effect(mob, effect).unwrap());

        let starts = logged(&log).iter().filter(|l| l.ends_with(":start")).count();
        assert_eq!(starts, 1);
        assert_eq!(
            rt.world().actor(mob).unwrap().effects.get(effect).unwrap().triggers_left,
            3
        );
    }

    #[test]
    fn test_trigger_now_fires_at_apply() {
        let (mut rt, room) = runtime_with_room();
        let mob = rt.spawn_mob("guard", room, 0).unwrap();

        let log = new_log();
        let effect = EffectId::new(6);
        rt.register_effect(EffectDefinition::new(effect, "jolt", 1, 2).with_trigger_now())
            .unwrap();
        rt.attach_effect_script(
            effect,
            Arc::new(Recorder {
                tag: "jolt".to_string(),
                log: log.clone(),
            }),
        )
        .unwrap();

        rt.apply_effect(mob, effect).unwrap();
        assert_eq!(logged(&log), vec!["jolt:start", "jolt:trigger:1"]);
    }

    struct Canceller {
        log: Log,
        flag: &'static str,
    }

    impl EffectScript for Canceller {
        fn on_start(&self, ctx: &mut ScriptCtx<'_>, actor: ActorId, _effect: EffectId) -> ScriptResult<()> {
            self.log.lock().unwrap().push("hydrated:start".to_string());
            ctx.cancel_flag(actor, self.flag);
            Ok(())
        }

        fn on_trigger(
            &self,
            _ctx: &mut ScriptCtx<'_>,
            _actor: ActorId,
            _effect: EffectId,
            _triggers_left: u32,
        ) -> ScriptResult<()> {
            self.log.lock().unwrap().push("hydrated:trigger".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_flag_cancel_ends_before_canceller_triggers() {
        let (mut rt, room) = runtime_with_room();
        let mob = rt.spawn_mob("guard", room, 0).unwrap();

        let log = new_log();
        let thirsty = EffectId::new(10);
        let hydrated = EffectId::new(11);
        rt.register_effect(
            EffectDefinition::new(thirsty, "parched", 1, 100).with_flag("thirsty"),
        )
        .unwrap();
        rt.register_effect(EffectDefinition::new(hydrated, "hydrated", 1, 3)).unwrap();
        rt.attach_effect_script(
            thirsty,
            Arc::new(Recorder {
                tag: "thirsty".to_string(),
                log: log.clone(),
            }),
        )
        .unwrap();
        rt.attach_effect_script(
            hydrated,
            Arc::new(Canceller {
                log: log.clone(),
                flag: "thirsty",
            }),
        )
        .unwrap();

        rt.apply_effect(mob, thirsty).unwrap();
        rt.apply_effect(mob, hydrated).unwrap();
        rt.round();

        let log = logged(&log);
        let end_pos = log.iter().position(|l| l == "thirsty:end").unwrap();
        let trigger_pos = log.iter().position(|l| l == "hydrated:trigger").unwrap();
        assert!(end_pos < trigger_pos);
        assert!(!rt.world().actor(mob).unwrap().effects.has_effect(thirsty));
    }

    #[test]
    fn test_world_removal_on_natural_expiry() {
        let (mut rt, room) = runtime_with_room();
        let mob = rt.spawn_mob("wisp", room, 0).unwrap();

        let log = new_log();
        rt.register_effect(EffectDefinition::new(EffectId::WORLD_REMOVAL, "unsummon", 1, 1))
            .unwrap();
        rt.attach_effect_script(
            EffectId::WORLD_REMOVAL,
            Arc::new(Recorder {
                tag: "unsummon".to_string(),
                log: log.clone(),
            }),
        )
        .unwrap();
        rt.apply_effect(mob, EffectId::WORLD_REMOVAL).unwrap();

        let report = rt.round();
        assert_eq!(report.despawned, vec![mob]);
        assert!(!rt.world().contains_actor(mob));
        // The end callback runs before the actor leaves the world.
        assert!(logged(&log).contains(&"unsummon:end".to_string()));
    }

    #[test]
    fn test_world_removal_explicit_remove_despawns() {
        let (mut rt, room) = runtime_with_room();
        let mob = rt.spawn_mob("wisp", room, 0).unwrap();

        let log = new_log();
        rt.register_effect(EffectDefinition::new(EffectId::WORLD_REMOVAL, "unsummon", 1, 100))
            .unwrap();
        rt.attach_effect_script(
            EffectId::WORLD_REMOVAL,
            Arc::new(Recorder {
                tag: "unsummon".to_string(),
                log: log.clone(),
            }),
        )
        .unwrap();
        rt.apply_effect(mob, EffectId::WORLD_REMOVAL).unwrap();

        assert!(rt.remove_effect(mob, EffectId::WORLD_REMOVAL).unwrap());
        assert!(!rt.world().contains_actor(mob));
        assert!(logged(&log).contains(&"unsummon:end".to_string()));
    }

    #[test]
    fn test_world_removal_cancelled_is_silent() {
        let (mut rt, room) = runtime_with_room();
        let mob = rt.spawn_mob("wisp", room, 0).unwrap();

        let log = new_log();
        rt.register_effect(
            EffectDefinition::new(EffectId::WORLD_REMOVAL, "unsummon", 1, 100).with_flag("summoned"),
        )
        .unwrap();
        rt.attach_effect_script(
            EffectId::WORLD_REMOVAL,
            Arc::new(Recorder {
                tag: "unsummon".to_string(),
                log: log.clone(),
            }),
        )
        .unwrap();
        rt.apply_effect(mob, EffectId::WORLD_REMOVAL).unwrap();
        rt.cancel_flag(mob, "summoned").unwrap();

        let report = rt.round();
        assert!(report.despawned.is_empty());
        assert!(rt.world().contains_actor(mob));
        assert!(!rt.world().actor(mob).unwrap().effects.has_effect(EffectId::WORLD_REMOVAL));
        assert!(!logged(&log).iter().any(|l| l.ends_with(":end")));
    }

    struct Faulty;

    impl EffectScript for Faulty {
        fn on_trigger(
            &self,
            _ctx: &mut ScriptCtx<'_>,
            _actor: ActorId,
            _effect: EffectId,
            _triggers_left: u32,
        ) -> ScriptResult<()> {
            Err(ScriptError::Fault("boom".to_string()))
        }
    }

    #[test]
    fn test_faulting_script_is_contained() {
        let (mut rt, room) = runtime_with_room();
        let mob = rt.spawn_mob("guard", room, 0).unwrap();

        let log = new_log();
        let bad = EffectId::new(20);
        let good = EffectId::new(21);
        rt.register_effect(EffectDefinition::new(bad, "cursed", 1, 2)).unwrap();
        rt.register_effect(EffectDefinition::new(good, "blessed", 1, 2)).unwrap();
        rt.attach_effect_script(bad, Arc::new(Faulty)).unwrap();
        rt.attach_effect_script(
            good,
            Arc::new(Recorder {
                tag: "blessed".to_string(),
                log: log.clone(),
            }),
        )
        .unwrap();

        rt.apply_effect(mob, bad).unwrap();
        rt.apply_effect(mob, good).unwrap();
        let report = rt.round();

        assert_eq!(report.faults.len(), 1);
        assert!(report.faults[0].entry_point.starts_with("on_trigger"));
        assert!(logged(&log).contains(&"blessed:trigger:1".to_string()));
    }

    #[test]
    fn test_faulting_effect_is_forcibly_ended() {
        let (mut rt, room) = runtime_with_room();
        let mob = rt.spawn_mob("guard", room, 0).unwrap();

        let bad = EffectId::new(20);
        rt.register_effect(EffectDefinition::new(bad, "cursed", 1, 50)).unwrap();
        rt.attach_effect_script(bad, Arc::new(Faulty)).unwrap();
        rt.apply_effect(mob, bad).unwrap();

        let report = rt.round();
        assert_eq!(report.faults.len(), 1);
        assert!(!rt.world().actor(mob).unwrap().effects.has_effect(bad));

        // The broken instance is gone; later rounds stay clean.
        let report = rt.round();
        assert!(report.faults.is_empty());
    }

    struct DoorWarden;

    impl RoomScript for DoorWarden {
        fn on_specific_command(
            &self,
            ctx: &mut ScriptCtx<'_>,
            actor: ActorId,
            room: RoomId,
            verb: &str,
            _rest: &str,
        ) -> ScriptResult<Handled> {
            if verb == "knock" {
                ctx.send_to_room(room, "The gate creaks.");
                let _ = actor;
                return Ok(Handled::Yes);
            }
            Ok(Handled::No)
        }
    }

    struct ChattyMob {
        log: Log,
    }

    impl MobScript for ChattyMob {
        fn on_command(
            &self,
            _ctx: &mut ScriptCtx<'_>,
            _actor: ActorId,
            _mob: ActorId,
            verb: &str,
            _rest: &str,
        ) -> ScriptResult<Handled> {
            if verb == "wave" {
                self.log.lock().unwrap().push("mob:wave".to_string());
                return Ok(Handled::Yes);
            }
            Ok(Handled::No)
        }

        fn on_event(
            &self,
            ctx: &mut ScriptCtx<'_>,
            mob: ActorId,
            details: &EventDetails,
        ) -> ScriptResult<Handled> {
            if let EventDetails::Ask(ask) = details {
                self.log.lock().unwrap().push(format!("mob:asked:{}", ask.text));
                ctx.send_to_actor(ask.source.id, "Hmm.");
                let _ = mob;
                return Ok(Handled::Yes);
            }
            Ok(Handled::No)
        }
    }

    #[test]
    fn test_command_dispatch_order() {
        let (mut rt, room) = runtime_with_room();
        let player = rt.spawn_player("Aria", room).unwrap();
        let log = new_log();
        rt.attach_room_script(room, Arc::new(DoorWarden)).unwrap();
        rt.spawn_scripted_mob("guard", room, 0, Arc::new(ChattyMob { log: log.clone() }))
            .unwrap();

        // Room hook consumes "knock" before the mob sees anything
        assert!(rt.dispatch_command(player, "knock twice").unwrap().is_yes());
        assert!(logged(&log).is_empty());

        // Unclaimed verb falls through to the mob
        assert!(rt.dispatch_command(player, "wave").unwrap().is_yes());
        assert_eq!(logged(&log), vec!["mob:wave"]);

        assert!(!rt.dispatch_command(player, "dance").unwrap().is_yes());
    }

    #[test]
    fn test_ask_event_reaches_mob() {
        let (mut rt, room) = runtime_with_room();
        let player = rt.spawn_player("Aria", room).unwrap();
        let log = new_log();
        let mob = rt
            .spawn_scripted_mob("guard", room, 0, Arc::new(ChattyMob { log: log.clone() }))
            .unwrap();

        let handled = rt.ask(Source::player(player), mob, "the gate").unwrap();
        assert!(handled.is_yes());
        assert_eq!(logged(&log), vec!["mob:asked:the gate"]);

        let messages = rt.world_mut().drain_outbox();
        assert_eq!(messages[0].recipient, Recipient::Actor(player));
    }

    #[test]
    fn test_give_transfers_gold() {
        let (mut rt, room) = runtime_with_room();
        let player = rt.spawn_player("Aria", room).unwrap();
        let mob = rt.spawn_mob("beggar", room, 0).unwrap();
        rt.world_mut().actor_mut(player).unwrap().gold = 30;

        // Asked for more than on hand; clamped to 30
        rt.give(Source::player(player), mob, 50, None).unwrap();
        assert_eq!(rt.world().actor(player).unwrap().gold, 0);
        assert_eq!(rt.world().actor(mob).unwrap().gold, 30);
    }

    #[test]
    fn test_unclaimed_item_handed_back() {
        let (mut rt, room) = runtime_with_room();
        let player = rt.spawn_player("Aria", room).unwrap();
        // No script attached, so the give goes unhandled
        let mob = rt.spawn_mob("beggar", room, 0).unwrap();

        let trinket = ItemId::new(7);
        rt.world_mut().actor_mut(player).unwrap().inventory.push(trinket);

        let handled = rt.give(Source::player(player), mob, 0, Some(trinket)).unwrap();
        assert!(!handled.is_yes());
        assert!(rt.world().actor(player).unwrap().has_item(trinket));
        assert!(!rt.world().actor(mob).unwrap().has_item(trinket));
    }

    #[test]
    fn test_idle_despawn_when_alone() {
        let mut rt = Runtime::new(RuntimeConfig {
            max_boredom: Some(3),
            ..RuntimeConfig::default()
        });
        let room = RoomId::new(1);
        rt.world_mut().add_room(Room::new(room, "Gate"));
        let mob = rt.spawn_mob("rat", room, 0).unwrap();

        let mut despawn_round = None;
        for i in 1..=10 {
            let report = rt.round();
            if report.despawned.contains(&mob) {
                despawn_round = Some(i);
                break;
            }
        }
        assert_eq!(despawn_round, Some(4));
    }

    #[test]
    fn test_player_presence_resets_boredom() {
        let mut rt = Runtime::new(RuntimeConfig {
            max_boredom: Some(3),
            ..RuntimeConfig::default()
        });
        let room = RoomId::new(1);
        rt.world_mut().add_room(Room::new(room, "Gate"));
        let mob = rt.spawn_mob("rat", room, 0).unwrap();
        rt.spawn_player("Aria", room).unwrap();

        for _ in 0..10 {
            let report = rt.round();
            assert!(report.despawned.is_empty());
        }
        assert!(rt.world().contains_actor(mob));
    }

    struct IdleWatcher {
        count: Arc<Mutex<u32>>,
        handled: Handled,
    }

    impl MobScript for IdleWatcher {
        fn on_idle(&self, _ctx: &mut ScriptCtx<'_>, _mob: ActorId) -> ScriptResult<Handled> {
            *self.count.lock().unwrap() += 1;
            Ok(self.handled)
        }
    }

    #[test]
    fn test_handled_idle_suppresses_despawn_fallback() {
        let mut rt = Runtime::new(RuntimeConfig {
            max_boredom: Some(3),
            ..RuntimeConfig::default()
        });
        let room = RoomId::new(1);
        rt.world_mut().add_room(Room::new(room, "Gate"));

        let count = Arc::new(Mutex::new(0));
        let mob = rt
            .spawn_scripted_mob(
                "sentry",
                room,
                100,
                Arc::new(IdleWatcher {
                    count: count.clone(),
                    handled: Handled::Yes,
                }),
            )
            .unwrap();

        // A mob that acts every idle round never hits the boredom cap.
        for _ in 0..10 {
            let report = rt.round();
            assert!(report.despawned.is_empty());
        }
        assert!(rt.world().contains_actor(mob));
        assert_eq!(*count.lock().unwrap(), 10);
    }

    #[test]
    fn test_on_idle_at_most_once_per_round() {
        let (mut rt, room) = runtime_with_room();

        let count = Arc::new(Mutex::new(0));
        rt.spawn_scripted_mob(
            "sentry",
            room,
            100,
            Arc::new(IdleWatcher {
                count: count.clone(),
                handled: Handled::No,
            }),
        )
        .unwrap();

        // Activity 100 guarantees the idle roll passes, so the callback
        // count tracks the round count exactly.
        for round in 1..=6u32 {
            rt.round();
            assert_eq!(*count.lock().unwrap(), round);
        }
    }

    #[test]
    fn test_charmed_mob_skips_idle_and_follows() {
        let mut rt = Runtime::new(RuntimeConfig {
            max_boredom: Some(1),
            ..RuntimeConfig::default()
        });
        let gate = RoomId::new(1);
        let square = RoomId::new(2);
        rt.world_mut().add_room(Room::new(gate, "Gate"));
        rt.world_mut().add_room(Room::new(square, "Square"));

        let master = rt.spawn_player("Aria", square).unwrap();
        let mob = rt.spawn_mob("wolf", gate, 0).unwrap();
        rt.charm_mob(mob, master, None).unwrap();

        // Displaced for three rounds, then teleported to the master. Charm
        // also suppresses the boredom despawn the whole time.
        rt.round();
        rt.round();
        assert_eq!(rt.world().actor(mob).unwrap().room, gate);
        rt.round();
        assert_eq!(rt.world().actor(mob).unwrap().room, square);
        assert!(rt.world().contains_actor(mob));
    }

    #[test]
    fn test_charm_expires_after_duration() {
        let (mut rt, room) = runtime_with_room();
        let master = rt.spawn_player("Aria", room).unwrap();
        let mob = rt.spawn_mob("wolf", room, 0).unwrap();
        rt.charm_mob(mob, master, Some(2)).unwrap();

        rt.round();
        assert!(rt.world().actor(mob).unwrap().charm.is_some());
        rt.round();
        assert!(rt.world().actor(mob).unwrap().charm.is_none());
    }

    struct SealedExit;

    impl RoomScript for SealedExit {
        fn on_exit(&self, ctx: &mut ScriptCtx<'_>, actor: ActorId, room: RoomId) -> ScriptResult<Handled> {
            ctx.send_to_actor(actor, "An unseen force holds you in place.");
            let _ = room;
            Ok(Handled::Yes)
        }
    }

    #[test]
    fn test_exit_hook_blocks_movement() {
        let (mut rt, gate) = runtime_with_room();
        let square = RoomId::new(2);
        rt.world_mut().add_room(Room::new(square, "Square"));
        rt.world_mut()
            .room_mut(gate)
            .unwrap()
            .exits
            .insert("south".to_string(), square);
        rt.attach_room_script(gate, Arc::new(SealedExit)).unwrap();

        let player = rt.spawn_player("Aria", gate).unwrap();
        assert!(!rt.try_move(player, "south").unwrap());
        assert_eq!(rt.world().actor(player).unwrap().room, gate);
    }

    #[test]
    fn test_temporary_exit_swept_in_round() {
        let (mut rt, gate) = runtime_with_room();
        let square = RoomId::new(2);
        rt.world_mut().add_room(Room::new(square, "Square"));
        rt.world_mut().add_temporary_exit(
            gate,
            crate::world::TemporaryExit {
                name: "shimmering portal".to_string(),
                style: None,
                destination: square,
                expires_at: 2,
            },
        );

        let report = rt.round();
        assert_eq!(report.exits_swept, 0);
        let report = rt.round();
        assert_eq!(report.exits_swept, 1);
        assert!(report.messages.iter().any(|m| m.text.contains("fades away")));
    }

    #[test]
    fn test_queued_commands_drain_in_round() {
        let (mut rt, room) = runtime_with_room();
        let player = rt.spawn_player("Aria", room).unwrap();
        rt.attach_room_script(room, Arc::new(DoorWarden)).unwrap();

        rt.queue_command(player, "knock");
        let report = rt.round();
        assert_eq!(report.commands_handled, 1);
        assert!(report.messages.iter().any(|m| m.text.contains("creaks")));
    }

    #[test]
    fn test_find_mob_in_room_prefers_exact() {
        let (mut rt, room) = runtime_with_room();
        let captain = rt.spawn_mob("guard captain", room, 0).unwrap();
        let guard = rt.spawn_mob("guard", room, 0).unwrap();

        assert_eq!(rt.find_mob_in_room(room, "guard", MatchMode::Any), Some(guard));
        assert_eq!(rt.find_mob_in_room(room, "capt", MatchMode::Any), Some(captain));
        assert_eq!(rt.find_mob_in_room(room, "dragon", MatchMode::Any), None);
    }

    struct Brazier;

    impl RoomScript for Brazier {
        fn on_load(&self, ctx: &mut ScriptCtx<'_>, room: RoomId) -> ScriptResult<()> {
            ctx.add_room_mutator(room, "lit");
            Ok(())
        }

        fn on_idle(&self, ctx: &mut ScriptCtx<'_>, room: RoomId) -> ScriptResult<Handled> {
            ctx.send_to_room(room, "Embers crackle in the brazier.");
            Ok(Handled::Yes)
        }
    }

    #[test]
    fn test_room_script_load_and_idle() {
        let (mut rt, room) = runtime_with_room();
        rt.attach_room_script(room, Arc::new(Brazier)).unwrap();
        assert!(rt.world().room(room).unwrap().has_mutator("lit"));

        rt.register_room_idle(room, 100).unwrap();
        let report = rt.round();
        assert!(report.messages.iter().any(|m| m.text.contains("crackle")));
    }

    struct Greeter {
        log: Log,
    }

    impl MobScript for Greeter {
        fn on_load(&self, ctx: &mut ScriptCtx<'_>, mob: ActorId) -> ScriptResult<()> {
            if let Some(room) = ctx.actor_room(mob) {
                ctx.send_to_room(room, "A greeter materializes.");
            }
            self.log.lock().unwrap().push("load".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_mob_load_fires_at_spawn() {
        let (mut rt, room) = runtime_with_room();
        let log = new_log();
        rt.spawn_scripted_mob("greeter", room, 0, Arc::new(Greeter { log: log.clone() }))
            .unwrap();
        assert_eq!(logged(&log), vec!["load"]);
        let messages = rt.world_mut().drain_outbox();
        assert!(messages.iter().any(|m| m.text.contains("materializes")));
    }
}
