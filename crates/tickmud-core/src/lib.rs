//! Tickmud Core - Round-driven entity lifecycle engine
//!
//! This crate provides the simulation core for a scripted MUD world:
//! - Round clock with real-time conversion (`RoundClock`, `Speed`)
//! - Effect definitions and per-actor countdown instances
//! - Script callback traits with a mediated context facade
//! - Interaction dispatch (commands, ask/give/show/converse)
//! - Idle scheduling with boredom fallback and charm handling
//! - A single-threaded round loop tying the passes together
//!
//! ## Design
//!
//! Everything advances in lockstep with the round clock; there are no
//! wall-clock timers inside the core. Scripts never hold references into
//! the world: reads go through `ScriptCtx` and structural mutations are
//! queued and applied between callbacks, so the pass order stays stable no
//! matter what a script does.

mod dispatch;
pub mod effect;
mod error;
mod event;
mod identity;
mod idle;
mod rng;
pub mod runtime;
pub mod script;
pub mod time;
mod value;
pub mod world;

pub use dispatch::{find_match_in, parse_command, MatchMode, MatchResult, ParsedCommand};
pub use effect::{
    EffectDefinition, EffectInstance, EffectRegistry, EffectSet, ExpiryKind, PrunedEffect,
    TriggerHit,
};
pub use error::{Error, Result};
pub use event::{AskDetails, ConverseDetails, EventDetails, GiveDetails, ShowDetails, Source, SourceKind};
pub use identity::{ActorId, EffectId, Flag, ItemId, QuestToken, RoomId};
pub use idle::{Charm, IdleCooldowns, IdleDecision, IdleEntry, IdleRegistry};
pub use rng::GameRng;
pub use runtime::{RoundReport, Runtime, RuntimeConfig, ScriptFault};
pub use script::{
    EffectScript, Handled, MobScript, PendingOp, RoomScript, ScriptCtx, ScriptError, ScriptResult,
};
pub use time::{Round, RoundClock, Speed, DEFAULT_SECONDS_PER_ROUND};
pub use value::{Value, ValueMap};
pub use world::{Actor, ActorKind, Message, Recipient, Room, TemporaryExit, World};
