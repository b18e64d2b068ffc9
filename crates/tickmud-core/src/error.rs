//! Error types for tickmud-core

use crate::identity::{ActorId, EffectId, RoomId};
use thiserror::Error;

/// Core error type
///
/// Failures are contained per entity per round: a misbehaving script or a
/// vanished target never halts the round loop, it is logged in the round
/// report and processing continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unknown effect definition: {0}")]
    InvalidEffectDefinition(EffectId),

    #[error("Effect {effect} already active on {actor}")]
    AlreadyActive { actor: ActorId, effect: EffectId },

    #[error("Script exceeded its execution budget in {entry_point}")]
    ScriptTimeout { entry_point: String },

    #[error("Script fault in {entry_point}: {detail}")]
    ScriptRuntimeFault { entry_point: String, detail: String },

    #[error("Referenced target no longer exists")]
    MissingTarget,

    #[error("Unknown room: {0}")]
    UnknownRoom(RoomId),

    #[error("Unknown actor: {0}")]
    UnknownActor(ActorId),

    #[error("Invalid effect definition {id}: {detail}")]
    DefinitionInvalid { id: EffectId, detail: String },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
