//! Typed event payloads for interaction callbacks
//!
//! The original duck-typed `eventDetails` bags become tagged variants here,
//! so handlers pattern-match instead of probing for fields.

use crate::identity::{ActorId, ItemId};
use serde::{Deserialize, Serialize};

/// What kind of entity originated an interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// A connected player
    Player,
    /// A mob instance
    Mob,
}

/// The originator of an interaction event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Originating actor
    pub id: ActorId,
    /// Player or mob
    pub kind: SourceKind,
}

impl Source {
    /// A player source
    pub fn player(id: ActorId) -> Self {
        Self {
            id,
            kind: SourceKind::Player,
        }
    }

    /// A mob source
    pub fn mob(id: ActorId) -> Self {
        Self {
            id,
            kind: SourceKind::Mob,
        }
    }
}

/// Payload for an `ask` interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskDetails {
    /// Who asked
    pub source: Source,
    /// The text that was asked
    pub text: String,
}

/// Payload for a `give` interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiveDetails {
    /// Who gave
    pub source: Source,
    /// Gold handed over (0 when an item was given)
    pub gold: u64,
    /// Item handed over, if any
    pub item: Option<ItemId>,
}

/// Payload for a `show` interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowDetails {
    /// Who showed
    pub source: Source,
    /// The item shown
    pub item: ItemId,
}

/// Payload for mob-to-mob conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverseDetails {
    /// The mob that spoke
    pub source_mob: ActorId,
    /// What was said
    pub message: String,
}

/// A tagged interaction payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventDetails {
    /// Somebody asked the target a question
    Ask(AskDetails),
    /// Somebody handed the target gold or an item
    Give(GiveDetails),
    /// Somebody showed the target an item
    Show(ShowDetails),
    /// A nearby mob spoke to the target
    Converse(ConverseDetails),
}

impl EventDetails {
    /// The originating actor, if the payload carries one
    pub fn source_id(&self) -> ActorId {
        match self {
            EventDetails::Ask(d) => d.source.id,
            EventDetails::Give(d) => d.source.id,
            EventDetails::Show(d) => d.source.id,
            EventDetails::Converse(d) => d.source_mob,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_constructors() {
        let src = Source::player(ActorId::new(1));
        assert_eq!(src.kind, SourceKind::Player);
        let src = Source::mob(ActorId::new(2));
        assert_eq!(src.kind, SourceKind::Mob);
    }

    #[test]
    fn test_event_source_id() {
        let details = EventDetails::Give(GiveDetails {
            source: Source::player(ActorId::new(7)),
            gold: 0,
            item: Some(ItemId::new(30004)),
        });
        assert_eq!(details.source_id(), ActorId::new(7));
    }
}
