//! World state: actors, rooms and the outbound message queue
//!
//! The world is a plain in-memory arena owned by the runtime. Scripts never
//! touch it directly; they go through the context facade, which validates
//! targets and defers structural mutation to safe points in the round.

use crate::effect::EffectSet;
use crate::identity::{ActorId, ItemId, QuestToken, RoomId};
use crate::idle::Charm;
use crate::time::Round;
use crate::value::{Value, ValueMap};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Whether an actor is a connected player or a scripted mob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    /// Driven by player commands
    Player,
    /// Driven by scripts and the idle scheduler
    Mob,
}

/// A player or mob instance in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    /// Runtime id
    pub id: ActorId,
    /// Player or mob
    pub kind: ActorKind,
    /// Display name
    pub name: String,
    /// Current location
    pub room: RoomId,
    /// Current health
    pub health: i64,
    /// Health ceiling
    pub health_max: i64,
    /// Current mana
    pub mana: i64,
    /// Mana ceiling
    pub mana_max: i64,
    /// Gold carried
    pub gold: u64,
    /// Items carried
    pub inventory: Vec<ItemId>,
    /// Quest progress tokens
    pub quests: IndexSet<QuestToken>,
    /// Persistent script data (survives as long as the actor does)
    pub misc: ValueMap,
    /// Transient script data (session scratch space)
    pub temp: ValueMap,
    /// Active effect instances
    pub effects: EffectSet,
    /// Charm state, if this mob is charmed
    pub charm: Option<Charm>,
    /// Percent chance per round that an idle callback fires (mobs only)
    pub activity_level: u8,
}

impl Actor {
    fn new(id: ActorId, kind: ActorKind, name: impl Into<String>, room: RoomId) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            room,
            health: 100,
            health_max: 100,
            mana: 100,
            mana_max: 100,
            gold: 0,
            inventory: Vec::new(),
            quests: IndexSet::new(),
            misc: ValueMap::new(),
            temp: ValueMap::new(),
            effects: EffectSet::new(),
            charm: None,
            activity_level: 0,
        }
    }

    /// Check if this actor is a player
    pub fn is_player(&self) -> bool {
        self.kind == ActorKind::Player
    }

    /// Check if this actor is a mob
    pub fn is_mob(&self) -> bool {
        self.kind == ActorKind::Mob
    }

    /// Adjust health, clamped to [0, health_max]; returns the new value
    pub fn adjust_health(&mut self, delta: i64) -> i64 {
        self.health = (self.health + delta).clamp(0, self.health_max);
        self.health
    }

    /// Adjust mana, clamped to [0, mana_max]; returns the new value
    pub fn adjust_mana(&mut self, delta: i64) -> i64 {
        self.mana = (self.mana + delta).clamp(0, self.mana_max);
        self.mana
    }

    /// Check if the actor holds a quest token
    pub fn has_quest(&self, token: &QuestToken) -> bool {
        self.quests.contains(token)
    }

    /// Grant a quest token; granting twice is a no-op
    pub fn give_quest(&mut self, token: QuestToken) -> bool {
        self.quests.insert(token)
    }

    /// Check if the actor carries an item
    pub fn has_item(&self, item: ItemId) -> bool {
        self.inventory.contains(&item)
    }

    /// Remove one copy of an item; returns true if one was removed
    pub fn take_item(&mut self, item: ItemId) -> bool {
        match self.inventory.iter().position(|i| *i == item) {
            Some(pos) => {
                self.inventory.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// An exit added at runtime with a limited lifetime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryExit {
    /// Direction or name shown to players ("shimmering portal")
    pub name: String,
    /// Presentation hint for the host ("portal", "hole"); the core never
    /// interprets it
    #[serde(default)]
    pub style: Option<String>,
    /// Destination room
    pub destination: RoomId,
    /// Round on which the exit disappears
    pub expires_at: Round,
}

/// A room in the world
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Room id
    pub id: RoomId,
    /// Display name
    pub name: String,
    /// Permanent exits by direction name
    pub exits: IndexMap<String, RoomId>,
    /// Exits added at runtime, swept by the round loop when they expire
    pub temporary_exits: Vec<TemporaryExit>,
    /// Mutator flags ("dark", "flooded") toggled by scripts
    pub mutators: IndexSet<String>,
    /// Transient script data shared by everyone in the room
    pub temp: ValueMap,
}

impl Room {
    /// Create a room with no exits
    pub fn new(id: RoomId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            exits: IndexMap::new(),
            temporary_exits: Vec::new(),
            mutators: IndexSet::new(),
            temp: ValueMap::new(),
        }
    }

    /// Resolve an exit name to a destination, checking temporary exits first
    pub fn exit(&self, name: &str) -> Option<RoomId> {
        self.temporary_exits
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.destination)
            .or_else(|| self.exits.get(name).copied())
    }

    /// Check a mutator flag
    pub fn has_mutator(&self, mutator: &str) -> bool {
        self.mutators.contains(mutator)
    }

    /// Set a mutator flag; returns false if already set
    pub fn add_mutator(&mut self, mutator: impl Into<String>) -> bool {
        self.mutators.insert(mutator.into())
    }

    /// Clear a mutator flag; returns true if it was set
    pub fn remove_mutator(&mut self, mutator: &str) -> bool {
        self.mutators.shift_remove(mutator)
    }
}

/// Who a message is delivered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// One actor
    Actor(ActorId),
    /// Everyone in a room, optionally excluding one actor
    Room {
        /// Target room
        room: RoomId,
        /// Actor to skip (usually the one who caused the message)
        exclude: Option<ActorId>,
    },
}

/// A queued outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Delivery target
    pub recipient: Recipient,
    /// Message text
    pub text: String,
}

/// The in-memory world arena
#[derive(Debug, Clone, Default)]
pub struct World {
    actors: IndexMap<ActorId, Actor>,
    rooms: IndexMap<RoomId, Room>,
    outbox: Vec<Message>,
    next_actor_id: u64,
}

impl World {
    /// Create an empty world
    pub fn new() -> Self {
        Self {
            actors: IndexMap::new(),
            rooms: IndexMap::new(),
            outbox: Vec::new(),
            next_actor_id: 1,
        }
    }

    /// Add a room; replaces any existing room with the same id
    pub fn add_room(&mut self, room: Room) {
        self.rooms.insert(room.id, room);
    }

    /// Look up a room
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// Look up a room, mutable
    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    /// Room ids in insertion order
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().copied().collect()
    }

    /// Spawn a player into a room
    pub fn spawn_player(&mut self, name: impl Into<String>, room: RoomId) -> ActorId {
        self.spawn(ActorKind::Player, name, room)
    }

    /// Spawn a mob into a room
    pub fn spawn_mob(&mut self, name: impl Into<String>, room: RoomId) -> ActorId {
        self.spawn(ActorKind::Mob, name, room)
    }

    fn spawn(&mut self, kind: ActorKind, name: impl Into<String>, room: RoomId) -> ActorId {
        let id = ActorId::new(self.next_actor_id);
        self.next_actor_id += 1;
        self.actors.insert(id, Actor::new(id, kind, name, room));
        id
    }

    /// Remove an actor from the world entirely
    pub fn remove_actor(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.shift_remove(&id)
    }

    /// Look up an actor
    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Look up an actor, mutable
    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Check whether an actor exists
    pub fn contains_actor(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    /// Actor ids in spawn order
    pub fn actor_ids(&self) -> Vec<ActorId> {
        self.actors.keys().copied().collect()
    }

    /// Number of actors
    pub fn actor_count(&self) -> usize {
        self.actors.len()
    }

    /// Actors currently in a room, in spawn order
    pub fn actors_in_room(&self, room: RoomId) -> Vec<ActorId> {
        self.actors
            .values()
            .filter(|a| a.room == room)
            .map(|a| a.id)
            .collect()
    }

    /// Mobs currently in a room, in spawn order
    pub fn mobs_in_room(&self, room: RoomId) -> Vec<ActorId> {
        self.actors
            .values()
            .filter(|a| a.room == room && a.is_mob())
            .map(|a| a.id)
            .collect()
    }

    /// Players currently in a room, in spawn order
    pub fn players_in_room(&self, room: RoomId) -> Vec<ActorId> {
        self.actors
            .values()
            .filter(|a| a.room == room && a.is_player())
            .map(|a| a.id)
            .collect()
    }

    /// Move an actor to another room; returns the room it left
    pub fn move_actor(&mut self, id: ActorId, to: RoomId) -> Option<RoomId> {
        if !self.rooms.contains_key(&to) {
            return None;
        }
        let actor = self.actors.get_mut(&id)?;
        let from = actor.room;
        actor.room = to;
        Some(from)
    }

    /// Add a temporary exit to a room
    pub fn add_temporary_exit(&mut self, room: RoomId, exit: TemporaryExit) -> bool {
        match self.rooms.get_mut(&room) {
            Some(room) => {
                // Re-adding under the same name replaces the old expiry
                room.temporary_exits.retain(|e| e.name != exit.name);
                room.temporary_exits.push(exit);
                true
            }
            None => false,
        }
    }

    /// Remove all temporary exits that have expired as of `round`
    ///
    /// Returns (room, exit name) pairs for the swept exits.
    pub fn sweep_expired_exits(&mut self, round: Round) -> Vec<(RoomId, String)> {
        let mut swept = Vec::new();
        for room in self.rooms.values_mut() {
            let room_id = room.id;
            room.temporary_exits.retain(|exit| {
                if exit.expires_at <= round {
                    swept.push((room_id, exit.name.clone()));
                    false
                } else {
                    true
                }
            });
        }
        swept
    }

    /// Queue a message to one actor
    pub fn send_to_actor(&mut self, actor: ActorId, text: impl Into<String>) {
        self.outbox.push(Message {
            recipient: Recipient::Actor(actor),
            text: text.into(),
        });
    }

    /// Queue a message to everyone in a room
    pub fn send_to_room(&mut self, room: RoomId, text: impl Into<String>, exclude: Option<ActorId>) {
        self.outbox.push(Message {
            recipient: Recipient::Room { room, exclude },
            text: text.into(),
        });
    }

    /// Drain all queued messages in the order they were produced
    pub fn drain_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    /// Read a temp value from an actor
    pub fn actor_temp(&self, id: ActorId, key: &str) -> Option<&Value> {
        self.actors.get(&id).and_then(|a| a.temp.get(key))
    }

    /// Write a temp value on an actor
    pub fn set_actor_temp(&mut self, id: ActorId, key: impl Into<String>, value: Value) -> bool {
        match self.actors.get_mut(&id) {
            Some(actor) => {
                actor.temp.insert(key.into(), value);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_world() -> (World, RoomId, RoomId) {
        let mut world = World::new();
        let gate = RoomId::new(1);
        let square = RoomId::new(2);
        let mut gate_room = Room::new(gate, "North Gate");
        gate_room.exits.insert("south".to_string(), square);
        world.add_room(gate_room);
        world.add_room(Room::new(square, "Town Square"));
        (world, gate, square)
    }

    #[test]
    fn test_spawn_and_room_membership() {
        let (mut world, gate, square) = small_world();
        let player = world.spawn_player("Aria", gate);
        let mob = world.spawn_mob("guard", gate);
        world.spawn_mob("rat", square);

        assert_eq!(world.actors_in_room(gate), vec![player, mob]);
        assert_eq!(world.mobs_in_room(gate), vec![mob]);
        assert_eq!(world.players_in_room(gate), vec![player]);
    }

    #[test]
    fn test_move_actor() {
        let (mut world, gate, square) = small_world();
        let player = world.spawn_player("Aria", gate);

        assert_eq!(world.move_actor(player, square), Some(gate));
        assert_eq!(world.actor(player).unwrap().room, square);

        // Unknown destination is rejected
        assert_eq!(world.move_actor(player, RoomId::new(99)), None);
        assert_eq!(world.actor(player).unwrap().room, square);
    }

    #[test]
    fn test_health_clamped() {
        let (mut world, gate, _) = small_world();
        let player = world.spawn_player("Aria", gate);
        let actor = world.actor_mut(player).unwrap();

        assert_eq!(actor.adjust_health(50), 100);
        assert_eq!(actor.adjust_health(-250), 0);
        assert_eq!(actor.adjust_mana(-30), 70);
    }

    #[test]
    fn test_quest_tokens_idempotent() {
        let (mut world, gate, _) = small_world();
        let player = world.spawn_player("Aria", gate);
        let actor = world.actor_mut(player).unwrap();

        assert!(actor.give_quest(QuestToken::new("3-end")));
        assert!(!actor.give_quest(QuestToken::new("3-end")));
        assert!(actor.has_quest(&QuestToken::new("3-end")));
    }

    #[test]
    fn test_temporary_exit_lifecycle() {
        let (mut world, gate, square) = small_world();
        world.add_temporary_exit(
            gate,
            TemporaryExit {
                name: "shimmering portal".to_string(),
                style: Some("portal".to_string()),
                destination: square,
                expires_at: 10,
            },
        );
        assert_eq!(world.room(gate).unwrap().exit("shimmering portal"), Some(square));

        assert!(world.sweep_expired_exits(9).is_empty());
        let swept = world.sweep_expired_exits(10);
        assert_eq!(swept, vec![(gate, "shimmering portal".to_string())]);
        assert_eq!(world.room(gate).unwrap().exit("shimmering portal"), None);
    }

    #[test]
    fn test_temporary_exit_shadows_permanent() {
        let (mut world, gate, square) = small_world();
        world.add_temporary_exit(
            gate,
            TemporaryExit {
                name: "south".to_string(),
                style: None,
                destination: gate,
                expires_at: 5,
            },
        );
        assert_eq!(world.room(gate).unwrap().exit("south"), Some(gate));
        world.sweep_expired_exits(5);
        assert_eq!(world.room(gate).unwrap().exit("south"), Some(square));
    }

    #[test]
    fn test_room_mutators() {
        let (mut world, gate, _) = small_world();
        let room = world.room_mut(gate).unwrap();

        assert!(room.add_mutator("dark"));
        assert!(!room.add_mutator("dark"));
        assert!(room.has_mutator("dark"));
        assert!(room.remove_mutator("dark"));
        assert!(!room.has_mutator("dark"));
    }

    #[test]
    fn test_outbox_order() {
        let (mut world, gate, _) = small_world();
        let player = world.spawn_player("Aria", gate);
        world.send_to_actor(player, "first");
        world.send_to_room(gate, "second", Some(player));

        let messages = world.drain_outbox();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "first");
        assert_eq!(messages[1].text, "second");
        assert!(world.drain_outbox().is_empty());
    }

    #[test]
    fn test_take_item() {
        let (mut world, gate, _) = small_world();
        let player = world.spawn_player("Aria", gate);
        let actor = world.actor_mut(player).unwrap();
        actor.inventory.push(ItemId::new(30004));

        assert!(actor.has_item(ItemId::new(30004)));
        assert!(actor.take_item(ItemId::new(30004)));
        assert!(!actor.take_item(ItemId::new(30004)));
    }
}
