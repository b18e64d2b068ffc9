//! Identity types for actors, rooms and definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an actor instance at runtime
///
/// Players and mob instances share one id space; the host engine decides
/// how ids are allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl ActorId {
    /// Create a new actor ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor:{}", self.0)
    }
}

/// Unique identifier for a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub u64);

impl RoomId {
    /// Create a new room ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room:{}", self.0)
    }
}

/// Identifier for an effect definition
///
/// Id 0 is reserved: natural expiry of effect 0 removes the owning actor
/// from the world without leaving a corpse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EffectId(pub u32);

impl EffectId {
    /// The reserved world-removal effect
    pub const WORLD_REMOVAL: EffectId = EffectId(0);

    /// Create a new effect ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Check if this is the reserved world-removal effect
    pub fn is_world_removal(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "effect:{}", self.0)
    }
}

/// Identifier for an item template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

impl ItemId {
    /// Create a new item ID
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item:{}", self.0)
    }
}

/// A quest progress token held by an actor (e.g. "3-end")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestToken(pub String);

impl QuestToken {
    /// Create a new quest token
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for QuestToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for QuestToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A lowercase effect flag ("poison", "hidden", "hydrated", ...)
///
/// Flags drive cross-effect cancellation: applying a "hydrated" effect can
/// cancel every active effect flagged "thirsty".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Flag(pub String);

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Normalize on the way in so "Fire" and "fire" compare equal
        Ok(Flag::new(String::deserialize(deserializer)?))
    }
}

impl Flag {
    /// Create a new flag, normalized to lowercase
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().to_lowercase())
    }

    /// Get the flag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Flag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Flag {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
