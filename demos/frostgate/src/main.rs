//! Frostgate Demo
//!
//! A tiny two-room town exercising the full round loop: RON-loaded
//! content, a scripted guard you can question and bribe, a timed effect
//! with trigger callbacks, and the idle scheduler filling quiet rounds.

use std::sync::Arc;
use tickmud_core::{
    ActorId, EffectId, EffectScript, Room, RoomId, Runtime, RuntimeConfig, ScriptCtx, ScriptResult,
    Source,
};
use tickmud_script::{install_room_rules, spawn_declarative_mob, Loader};

const CONTENT_EFFECTS: &str = r#"(
    effects: [
        (id: EffectId(12), name: "chilled", description: "Frost creeps into your bones.",
         round_interval: 2, trigger_count: 3, stat_mods: {"speed": -2}, flags: ["cold"]),
        (id: EffectId(13), name: "warmed", round_interval: 1, trigger_count: 1,
         trigger_now: true, flags: ["warm"]),
    ],
)"#;

const CONTENT_MOBS: &str = r#"(
    mobs: [
        (name: "gate guard", activity_level: 40,
         ask_subjects: [
            (keywords: ["gate", "door"], reply: "Sealed since the frost came. The captain holds the key.",
             gives_quest: Some("frost-1")),
            (keywords: ["captain"], reply: "Try the tavern. And bring coin."),
         ],
         item_trades: [
            (gold_minimum: 10, reply: "Hah. Maybe the gate is not so sealed after all."),
         ],
         idle_commands: [
            (command: "emote stamps his feet against the cold.", cooldown_rounds: 5),
            (command: "emote scans the road north.", cooldown_rounds: 8),
         ]),
    ],
)"#;

const CONTENT_ROOMS: &str = r#"(
    rooms: [
        (room: RoomId(1), enter_message: Some("Cold air bites at your face."),
         rules: [
            (verb: Some("touch"), rest_contains: Some("brazier"), cooldown_rounds: Some(4),
             reply: Some("Warmth floods through you."), applies_effect: Some(EffectId(13))),
            (verb: Some("knock"), reply: Some("Your knock echoes off the frozen gate. No answer.")),
         ]),
    ],
)"#;

struct Chilled;

impl EffectScript for Chilled {
    fn on_start(&self, ctx: &mut ScriptCtx<'_>, actor: ActorId, _effect: EffectId) -> ScriptResult<()> {
        ctx.send_to_actor(actor, "Frost creeps into your bones.");
        Ok(())
    }

    fn on_trigger(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        _effect: EffectId,
        triggers_left: u32,
    ) -> ScriptResult<()> {
        ctx.adjust_health(actor, -3);
        ctx.send_to_actor(actor, format!("You shiver. ({} waves of cold left)", triggers_left));
        Ok(())
    }

    fn on_end(&self, ctx: &mut ScriptCtx<'_>, actor: ActorId, _effect: EffectId) -> ScriptResult<()> {
        ctx.send_to_actor(actor, "The chill finally fades.");
        Ok(())
    }
}

struct Warmed;

impl EffectScript for Warmed {
    fn on_trigger(
        &self,
        ctx: &mut ScriptCtx<'_>,
        actor: ActorId,
        _effect: EffectId,
        _triggers_left: u32,
    ) -> ScriptResult<()> {
        // Warmth cancels every cold-flagged effect on the spot
        ctx.cancel_flag(actor, "cold");
        Ok(())
    }
}

fn main() {
    println!("=== Frostgate Demo ===\n");

    let mut loader = Loader::new();
    loader.load_str(CONTENT_EFFECTS).expect("effects content");
    loader.load_str(CONTENT_MOBS).expect("mobs content");
    loader.load_str(CONTENT_ROOMS).expect("rooms content");
    let pack = loader.into_pack();

    let mut rt = Runtime::new(RuntimeConfig {
        seed: 2024,
        max_boredom: Some(30),
        ..RuntimeConfig::default()
    });

    let gate = RoomId::new(1);
    let square = RoomId::new(2);
    rt.world_mut().add_room(Room::new(gate, "North Gate"));
    rt.world_mut().add_room(Room::new(square, "Town Square"));
    rt.world_mut()
        .room_mut(gate)
        .expect("gate room")
        .exits
        .insert("south".to_string(), square);

    for def in pack.effects.values() {
        rt.register_effect(def.clone()).expect("effect definition");
    }
    rt.attach_effect_script(EffectId::new(12), Arc::new(Chilled)).expect("chilled script");
    rt.attach_effect_script(EffectId::new(13), Arc::new(Warmed)).expect("warmed script");

    for rules in pack.rooms.values() {
        install_room_rules(&mut rt, rules).expect("room rules");
    }
    let guard_def = pack.get_mob("gate guard").expect("guard definition");
    let guard = spawn_declarative_mob(&mut rt, gate, guard_def).expect("guard spawn");

    let player = rt.spawn_player("Aria", gate).expect("player spawn");
    rt.world_mut().actor_mut(player).expect("player").gold = 25;

    println!("Aria arrives at the North Gate with 25 gold.\n");

    // A few quiet rounds; the guard's idle mannerisms fire on their own
    for _ in 0..3 {
        let report = rt.round();
        print_round(&report);
    }

    println!("\n> ask guard about the gate");
    rt.ask(Source::player(player), guard, "what happened to the gate?")
        .expect("ask");

    println!("> give 10 gold to guard");
    rt.give(Source::player(player), guard, 10, None).expect("give");

    println!("> knock");
    rt.queue_command(player, "knock on the gate");

    println!("> touch brazier  (warmth cancels the chill)\n");
    rt.apply_effect(player, EffectId::new(12)).expect("chill");
    rt.queue_command(player, "touch the brazier");

    for _ in 0..4 {
        let report = rt.round();
        print_round(&report);
    }

    let aria = rt.world().actor(player).expect("player");
    println!("\nAria: {} hp, {} gold, quests: {:?}",
        aria.health,
        aria.gold,
        aria.quests.iter().map(|q| q.as_str()).collect::<Vec<_>>(),
    );
    println!("Rounds elapsed: {}", rt.clock().now());
}

fn print_round(report: &tickmud_core::RoundReport) {
    println!(
        "-- round {} ({} triggers, {} commands)",
        report.round, report.triggers_fired, report.commands_handled
    );
    for message in &report.messages {
        println!("   {}", message.text);
    }
    for fault in &report.faults {
        println!("   [fault in {}: {}]", fault.entry_point, fault.error);
    }
}
