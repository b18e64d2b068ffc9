//! Mob behavior schema
//!
//! A mob behavior definition captures the common NPC patterns as data:
//! canned answers to questions, reactions to offered items or gold, and a
//! rotation of idle mannerisms. The bridge turns one of these into a live
//! mob script without any hand-written code.

use serde::{Deserialize, Serialize};
use tickmud_core::ItemId;

/// Declarative behavior for one mob template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobBehaviorDef {
    /// Mob display name
    pub name: String,
    /// Percent chance per round of an idle action
    #[serde(default)]
    pub activity_level: u8,
    /// Answers to `ask` interactions, checked in order
    #[serde(default)]
    pub ask_subjects: Vec<AskSubjectDef>,
    /// Reactions to `give` interactions, checked in order
    #[serde(default)]
    pub item_trades: Vec<ItemTradeDef>,
    /// Commands run when the idle scheduler picks this mob
    #[serde(default)]
    pub idle_commands: Vec<IdleCommandDef>,
    /// Reactions to nearby mob speech
    #[serde(default)]
    pub converse_replies: Vec<ConverseReplyDef>,
}

/// One subject a mob can be asked about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskSubjectDef {
    /// Keywords matched against the question, case-insensitive
    pub keywords: Vec<String>,
    /// Reply sent to the asker
    pub reply: String,
    /// Quest token the asker must already hold
    #[serde(default)]
    pub requires_quest: Option<String>,
    /// Quest token granted on a match
    #[serde(default)]
    pub gives_quest: Option<String>,
}

impl AskSubjectDef {
    /// Check if a question matches this subject
    pub fn matches(&self, question: &str) -> bool {
        let question = question.to_lowercase();
        self.keywords.iter().any(|k| question.contains(&k.to_lowercase()))
    }
}

/// A reaction to gold or an item being handed over
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemTradeDef {
    /// Item that triggers this trade; None means a gold offer
    #[serde(default)]
    pub accepts_item: Option<ItemId>,
    /// Minimum gold for a gold offer to qualify
    #[serde(default)]
    pub gold_minimum: u64,
    /// Reply sent to the giver
    pub reply: String,
    /// Item handed back
    #[serde(default)]
    pub gives_item: Option<ItemId>,
    /// Quest token granted
    #[serde(default)]
    pub gives_quest: Option<String>,
}

impl ItemTradeDef {
    /// Check if an offer of `item`/`gold` qualifies for this trade
    pub fn matches(&self, item: Option<ItemId>, gold: u64) -> bool {
        match self.accepts_item {
            Some(wanted) => item == Some(wanted),
            None => self.gold_minimum > 0 && gold >= self.gold_minimum,
        }
    }
}

/// One idle mannerism
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdleCommandDef {
    /// Command line run as the mob ("emote paces the wall")
    pub command: String,
    /// Minimum rounds between repeats; 0 disables the gate
    #[serde(default)]
    pub cooldown_rounds: u64,
}

/// A canned reaction to another mob's speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverseReplyDef {
    /// Substring matched against the speech, case-insensitive
    pub contains: String,
    /// Line said back to the room
    pub reply: String,
}
