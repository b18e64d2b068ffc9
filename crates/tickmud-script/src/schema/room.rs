//! Room rules schema
//!
//! Room rules attach data-driven interaction handling to a room: an
//! optional greeting on entry, plus a rule list consulted when commands are
//! dispatched. Rules with a verb act as verb-specific hooks and win over
//! generic (verbless) rules.

use serde::{Deserialize, Serialize};
use tickmud_core::{EffectId, RoomId};

/// Declarative interaction rules for one room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRulesDef {
    /// The room these rules attach to
    pub room: RoomId,
    /// Message sent to an actor entering the room
    #[serde(default)]
    pub enter_message: Option<String>,
    /// Rules checked in order on each dispatched command
    #[serde(default)]
    pub rules: Vec<InteractionRuleDef>,
}

/// One data-driven command rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRuleDef {
    /// Verb this rule responds to; None makes it a generic fallback
    #[serde(default)]
    pub verb: Option<String>,
    /// Substring the command remainder must contain, case-insensitive
    #[serde(default)]
    pub rest_contains: Option<String>,
    /// Per-actor cooldown before the rule fires again
    #[serde(default)]
    pub cooldown_rounds: Option<u64>,
    /// Quest token the acting actor must already hold
    #[serde(default)]
    pub requires_quest: Option<String>,
    /// Quest token granted when the rule fires
    #[serde(default)]
    pub gives_quest: Option<String>,
    /// Reply sent to the acting actor
    #[serde(default)]
    pub reply: Option<String>,
    /// Message sent to the rest of the room
    #[serde(default)]
    pub room_message: Option<String>,
    /// Effect applied to the acting actor
    #[serde(default)]
    pub applies_effect: Option<EffectId>,
    /// Whether a match consumes the command
    #[serde(default = "default_handled")]
    pub handled: bool,
}

fn default_handled() -> bool {
    true
}

impl InteractionRuleDef {
    /// Check whether this rule matches a parsed command
    pub fn matches(&self, verb: &str, rest: &str) -> bool {
        if let Some(wanted) = &self.verb {
            if !wanted.eq_ignore_ascii_case(verb) {
                return false;
            }
        }
        if let Some(needle) = &self.rest_contains {
            if !rest.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        true
    }

    /// Whether this rule is a verb-specific hook
    pub fn is_specific(&self) -> bool {
        self.verb.is_some()
    }
}
