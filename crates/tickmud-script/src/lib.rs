//! Tickmud Script - RON content loader and declarative behaviors
//!
//! Loads world content from RON files:
//! - Effect definitions
//! - Mob behaviors (ask subjects, item trades, idle mannerisms)
//! - Room interaction rules
//!
//! The bridge types turn loaded definitions into live script bindings for
//! the tickmud-core runtime, so a content-only world needs no hand-written
//! scripts.

mod bridge;
mod error;
mod loader;
mod schema;

pub use bridge::{
    install_room_rules, spawn_declarative_mob, DeclarativeMobScript, DeclarativeRoomScript,
};
pub use error::{Error, Result};
pub use loader::{ContentPack, Loader};
pub use schema::mob::{AskSubjectDef, ConverseReplyDef, IdleCommandDef, ItemTradeDef};
pub use schema::room::InteractionRuleDef;
pub use schema::{MobBehaviorDef, RoomRulesDef};
