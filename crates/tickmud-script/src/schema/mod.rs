//! Schema definitions for RON content files

pub mod mob;
pub mod room;

pub use mob::MobBehaviorDef;
pub use room::RoomRulesDef;
