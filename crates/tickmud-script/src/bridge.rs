//! Bridges from declarative definitions to live script bindings
//!
//! The bridge types wrap a schema definition and implement the core script
//! traits, so a world built entirely from RON content runs through exactly
//! the same dispatch paths as hand-written scripts.

use crate::schema::{MobBehaviorDef, RoomRulesDef};
use std::sync::Arc;
use tickmud_core::{
    ActorId, EventDetails, Handled, MobScript, QuestToken, RoomId, RoomScript, Runtime, ScriptCtx,
    ScriptResult,
};

/// A mob script driven by a [`MobBehaviorDef`]
#[derive(Debug, Clone)]
pub struct DeclarativeMobScript {
    def: MobBehaviorDef,
}

impl DeclarativeMobScript {
    /// Wrap a behavior definition
    pub fn new(def: MobBehaviorDef) -> Self {
        Self { def }
    }
}

impl MobScript for DeclarativeMobScript {
    fn on_idle(&self, ctx: &mut ScriptCtx<'_>, mob: ActorId) -> ScriptResult<Handled> {
        if self.def.idle_commands.is_empty() {
            return Ok(Handled::No);
        }
        let n = self.def.idle_commands.len() as u32;
        let pick = (ctx.dice_roll(1, n) - 1) as usize;
        let idle = &self.def.idle_commands[pick];

        if idle.cooldown_rounds > 0 {
            let key = format!("idle:{}", pick);
            if !ctx.try_cooldown(mob, &key, idle.cooldown_rounds) {
                return Ok(Handled::No);
            }
        }
        ctx.command(mob, idle.command.clone());
        Ok(Handled::Yes)
    }

    fn on_event(
        &self,
        ctx: &mut ScriptCtx<'_>,
        mob: ActorId,
        details: &EventDetails,
    ) -> ScriptResult<Handled> {
        match details {
            EventDetails::Ask(ask) => {
                for subject in &self.def.ask_subjects {
                    if !subject.matches(&ask.text) {
                        continue;
                    }
                    if let Some(token) = &subject.requires_quest {
                        if !ctx.has_quest(ask.source.id, &QuestToken::new(token.clone())) {
                            continue;
                        }
                    }
                    ctx.send_to_actor(ask.source.id, subject.reply.clone());
                    if let Some(token) = &subject.gives_quest {
                        ctx.give_quest(ask.source.id, QuestToken::new(token.clone()));
                    }
                    return Ok(Handled::Yes);
                }
                Ok(Handled::No)
            }
            EventDetails::Give(give) => {
                for trade in &self.def.item_trades {
                    if !trade.matches(give.item, give.gold) {
                        continue;
                    }
                    ctx.send_to_actor(give.source.id, trade.reply.clone());
                    if let Some(item) = trade.gives_item {
                        ctx.give_item(give.source.id, item);
                    }
                    if let Some(token) = &trade.gives_quest {
                        ctx.give_quest(give.source.id, QuestToken::new(token.clone()));
                    }
                    return Ok(Handled::Yes);
                }
                Ok(Handled::No)
            }
            EventDetails::Converse(speech) => {
                let heard = speech.message.to_lowercase();
                for reply in &self.def.converse_replies {
                    if !heard.contains(&reply.contains.to_lowercase()) {
                        continue;
                    }
                    if let Some(room) = ctx.actor_room(mob) {
                        let name = ctx.actor_name(mob).unwrap_or_default();
                        ctx.send_to_room(room, format!("The {} says, \"{}\"", name, reply.reply));
                    }
                    return Ok(Handled::Yes);
                }
                Ok(Handled::No)
            }
            EventDetails::Show(_) => Ok(Handled::No),
        }
    }
}

/// A room script driven by a [`RoomRulesDef`]
#[derive(Debug, Clone)]
pub struct DeclarativeRoomScript {
    def: RoomRulesDef,
}

impl DeclarativeRoomScript {
    /// Wrap a rules definition
    pub fn new(def: RoomRulesDef) -> Self {
        Self { def }
    }

    fn run_rules(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        room: RoomId,
        verb: &str,
        rest: &str,
        specific: bool,
    ) -> Handled {
        for (i, rule) in self.def.rules.iter().enumerate() {
            if rule.is_specific() != specific || !rule.matches(verb, rest) {
                continue;
            }
            if let Some(token) = &rule.requires_quest {
                if !ctx.has_quest(actor, &QuestToken::new(token.clone())) {
                    continue;
                }
            }
            if let Some(cooldown) = rule.cooldown_rounds {
                let key = format!("rule:{}", i);
                if !ctx.try_cooldown(actor, &key, cooldown) {
                    continue;
                }
            }
            if let Some(reply) = &rule.reply {
                ctx.send_to_actor(actor, reply.clone());
            }
            if let Some(message) = &rule.room_message {
                ctx.send_to_room_except(room, message.clone(), actor);
            }
            if let Some(effect) = rule.applies_effect {
                ctx.queue_effect(actor, effect);
            }
            if let Some(token) = &rule.gives_quest {
                ctx.give_quest(actor, QuestToken::new(token.clone()));
            }
            if rule.handled {
                return Handled::Yes;
            }
        }
        Handled::No
    }
}

impl RoomScript for DeclarativeRoomScript {
    fn on_enter(&self, ctx: &mut ScriptCtx<'_>, actor: ActorId, _room: RoomId) -> ScriptResult<()> {
        if let Some(message) = &self.def.enter_message {
            ctx.send_to_actor(actor, message.clone());
        }
        Ok(())
    }

    fn on_specific_command(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        room: RoomId,
        verb: &str,
        rest: &str,
    ) -> ScriptResult<Handled> {
        Ok(self.run_rules(ctx, actor, room, verb, rest, true))
    }

    fn on_command(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        room: RoomId,
        verb: &str,
        rest: &str,
    ) -> ScriptResult<Handled> {
        Ok(self.run_rules(ctx, actor, room, verb, rest, false))
    }
}

/// Spawn a mob from a behavior definition, script attached
pub fn spawn_declarative_mob(
    rt: &mut Runtime,
    room: RoomId,
    def: &MobBehaviorDef,
) -> tickmud_core::Result<ActorId> {
    rt.spawn_scripted_mob(
        def.name.clone(),
        room,
        def.activity_level,
        Arc::new(DeclarativeMobScript::new(def.clone())),
    )
}

/// Attach room rules to their room
pub fn install_room_rules(rt: &mut Runtime, def: &RoomRulesDef) -> tickmud_core::Result<()> {
    rt.attach_room_script(def.room, Arc::new(DeclarativeRoomScript::new(def.clone())))
}
