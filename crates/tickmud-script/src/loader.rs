//! RON content loader

use crate::error::{Error, Result};
use crate::schema::{MobBehaviorDef, RoomRulesDef};
use indexmap::IndexMap;
use std::fs;
use std::path::Path;
use tickmud_core::{EffectDefinition, EffectId, RoomId};

/// Loaded world content
#[derive(Debug, Default)]
pub struct ContentPack {
    /// Effect definitions by id
    pub effects: IndexMap<EffectId, EffectDefinition>,
    /// Mob behavior definitions by name
    pub mobs: IndexMap<String, MobBehaviorDef>,
    /// Room rule definitions by room id
    pub rooms: IndexMap<RoomId, RoomRulesDef>,
}

impl ContentPack {
    /// Create an empty pack
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an effect definition
    pub fn get_effect(&self, id: EffectId) -> Option<&EffectDefinition> {
        self.effects.get(&id)
    }

    /// Get a mob behavior definition by name
    pub fn get_mob(&self, name: &str) -> Option<&MobBehaviorDef> {
        self.mobs.get(name)
    }

    /// Get the rules for a room
    pub fn get_room(&self, room: RoomId) -> Option<&RoomRulesDef> {
        self.rooms.get(&room)
    }
}

/// Loader for RON content files
#[derive(Debug, Default)]
pub struct Loader {
    pack: ContentPack,
}

impl Loader {
    /// Create a new loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a single RON file; sections are routed by the parsed keys
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let content = fs::read_to_string(path.as_ref())?;
        self.load_str(&content)
    }

    /// Load a RON string containing any mix of the known sections
    ///
    /// Routing is driven by the parsed top-level keys, not by the raw
    /// text, so section names inside string values are harmless.
    pub fn load_str(&mut self, content: &str) -> Result<()> {
        #[derive(serde::Deserialize)]
        struct ContentFile {
            #[serde(default)]
            effects: Vec<EffectDefinition>,
            #[serde(default)]
            mobs: Vec<MobBehaviorDef>,
            #[serde(default)]
            rooms: Vec<RoomRulesDef>,
        }

        let file: ContentFile = ron::from_str(content)?;
        if file.effects.is_empty() && file.mobs.is_empty() && file.rooms.is_empty() {
            return Err(Error::InvalidSchema(
                "expected an effects:, mobs: or rooms: section".to_string(),
            ));
        }
        for def in file.effects {
            self.add_effect(def)?;
        }
        for def in file.mobs {
            self.add_mob(def)?;
        }
        for def in file.rooms {
            self.add_room(def)?;
        }
        Ok(())
    }

    /// Load every .ron file under a directory, in sorted order
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> Result<usize> {
        let mut paths: Vec<_> = fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("ron"))
            .collect();
        paths.sort();
        let count = paths.len();
        for path in paths {
            self.load_file(&path)?;
        }
        Ok(count)
    }

    /// Load effect definitions from a RON string
    pub fn load_effects_str(&mut self, content: &str) -> Result<()> {
        #[derive(serde::Deserialize)]
        struct EffectFile {
            effects: Vec<EffectDefinition>,
        }

        let file: EffectFile = ron::from_str(content)?;
        for def in file.effects {
            self.add_effect(def)?;
        }
        Ok(())
    }

    /// Load mob behaviors from a RON string
    pub fn load_mobs_str(&mut self, content: &str) -> Result<()> {
        #[derive(serde::Deserialize)]
        struct MobFile {
            mobs: Vec<MobBehaviorDef>,
        }

        let file: MobFile = ron::from_str(content)?;
        for def in file.mobs {
            self.add_mob(def)?;
        }
        Ok(())
    }

    /// Load room rules from a RON string
    pub fn load_rooms_str(&mut self, content: &str) -> Result<()> {
        #[derive(serde::Deserialize)]
        struct RoomFile {
            rooms: Vec<RoomRulesDef>,
        }

        let file: RoomFile = ron::from_str(content)?;
        for def in file.rooms {
            self.add_room(def)?;
        }
        Ok(())
    }

    fn add_effect(&mut self, def: EffectDefinition) -> Result<()> {
        def.validate()?;
        if self.pack.effects.contains_key(&def.id) {
            return Err(Error::DuplicateDefinition(def.id.to_string()));
        }
        self.pack.effects.insert(def.id, def);
        Ok(())
    }

    fn add_mob(&mut self, def: MobBehaviorDef) -> Result<()> {
        if def.name.is_empty() {
            return Err(Error::InvalidSchema("mob name must not be empty".to_string()));
        }
        if self.pack.mobs.contains_key(&def.name) {
            return Err(Error::DuplicateDefinition(def.name));
        }
        self.pack.mobs.insert(def.name.clone(), def);
        Ok(())
    }

    fn add_room(&mut self, def: RoomRulesDef) -> Result<()> {
        if self.pack.rooms.contains_key(&def.room) {
            return Err(Error::DuplicateDefinition(def.room.to_string()));
        }
        self.pack.rooms.insert(def.room, def);
        Ok(())
    }

    /// Finish loading and take the pack
    pub fn into_pack(self) -> ContentPack {
        self.pack
    }

    /// The pack loaded so far
    pub fn pack(&self) -> &ContentPack {
        &self.pack
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_effects() {
        let mut loader = Loader::new();
        loader
            .load_str(
                r#"(
                    effects: [
                        (id: EffectId(5), name: "burning", round_interval: 1, trigger_count: 3,
                         flags: ["fire"]),
                        (id: EffectId(6), name: "regeneration", round_interval: 3, trigger_count: 10),
                    ],
                )"#,
            )
            .unwrap();

        let pack = loader.into_pack();
        assert_eq!(pack.effects.len(), 2);
        let burn = pack.get_effect(EffectId::new(5)).unwrap();
        assert_eq!(burn.trigger_count, 3);
        assert_eq!(burn.flags.len(), 1);
    }

    #[test]
    fn test_invalid_effect_rejected() {
        let mut loader = Loader::new();
        let err = loader
            .load_str(r#"(effects: [(id: EffectId(5), name: "bad", round_interval: 0, trigger_count: 3)])"#)
            .unwrap_err();
        assert!(matches!(err, Error::Core(_)));
    }

    #[test]
    fn test_duplicate_effect_rejected() {
        let mut loader = Loader::new();
        loader
            .load_str(r#"(effects: [(id: EffectId(5), name: "a", round_interval: 1, trigger_count: 1)])"#)
            .unwrap();
        let err = loader
            .load_str(r#"(effects: [(id: EffectId(5), name: "b", round_interval: 1, trigger_count: 1)])"#)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition(_)));
    }

    #[test]
    fn test_load_mobs_and_rooms() {
        let mut loader = Loader::new();
        loader
            .load_str(
                r#"(
                    mobs: [
                        (name: "gate guard", activity_level: 25,
                         ask_subjects: [(keywords: ["gate"], reply: "Sealed.")]),
                    ],
                )"#,
            )
            .unwrap();
        loader
            .load_str(
                r#"(
                    rooms: [
                        (room: RoomId(100), enter_message: Some("Cold air bites."),
                         rules: [(verb: Some("knock"), reply: Some("No answer."))]),
                    ],
                )"#,
            )
            .unwrap();

        let pack = loader.into_pack();
        assert!(pack.get_mob("gate guard").is_some());
        assert!(pack.get_room(RoomId::new(100)).is_some());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let mut loader = Loader::new();
        assert!(loader.load_str("(widgets: [])").is_err());
    }

    #[test]
    fn test_routing_ignores_section_names_inside_strings() {
        let mut loader = Loader::new();
        loader
            .load_str(
                r#"(
                    rooms: [
                        (room: RoomId(7),
                         rules: [(verb: Some("read"), reply: Some("The ledger lists effects: none."))]),
                    ],
                )"#,
            )
            .unwrap();

        let pack = loader.into_pack();
        assert!(pack.get_room(RoomId::new(7)).is_some());
        assert!(pack.effects.is_empty());
    }
}
