//! Effect definitions and per-actor effect instances
//!
//! An effect definition is static data loaded at startup; an effect instance
//! is the live countdown state attached to one actor. Instances advance in
//! lockstep with the round clock: every round each instance bumps its
//! internal counter, and when the counter lands on a multiple of the
//! definition's interval one charge is consumed. An instance whose charges
//! reach zero is collected by the prune pass in the same round.

use crate::error::{Error, Result};
use crate::identity::{EffectId, Flag};
use crate::time::Round;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Static template for an effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDefinition {
    /// Definition id (0 is reserved for world removal)
    pub id: EffectId,
    /// Short display name
    pub name: String,
    /// Longer description shown on inspection
    #[serde(default)]
    pub description: String,
    /// Hidden from the owner's status listing
    #[serde(default)]
    pub secret: bool,
    /// Fire one trigger immediately at apply time
    #[serde(default)]
    pub trigger_now: bool,
    /// Rounds between triggers (must be >= 1)
    pub round_interval: u64,
    /// Total number of triggers before expiry (must be >= 1)
    pub trigger_count: u32,
    /// Passive stat adjustments while active
    #[serde(default)]
    pub stat_mods: IndexMap<String, i64>,
    /// Category flags used for cross-effect cancellation
    #[serde(default)]
    pub flags: Vec<Flag>,
}

impl EffectDefinition {
    /// Create a minimal definition with the given countdown shape
    pub fn new(id: EffectId, name: impl Into<String>, round_interval: u64, trigger_count: u32) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            secret: false,
            trigger_now: false,
            round_interval,
            trigger_count,
            stat_mods: IndexMap::new(),
            flags: Vec::new(),
        }
    }

    /// Builder: mark as hidden from the owner
    pub fn with_secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Builder: fire the first trigger at apply time
    pub fn with_trigger_now(mut self) -> Self {
        self.trigger_now = true;
        self
    }

    /// Builder: add a category flag
    pub fn with_flag(mut self, flag: impl Into<Flag>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Builder: add a passive stat adjustment
    pub fn with_stat_mod(mut self, stat: impl Into<String>, amount: i64) -> Self {
        self.stat_mods.insert(stat.into(), amount);
        self
    }

    /// Check if this definition carries the given flag
    pub fn has_flag(&self, flag: &Flag) -> bool {
        self.flags.contains(flag)
    }

    /// Total lifetime in rounds from first countdown to final trigger
    pub fn duration_rounds(&self) -> u64 {
        self.round_interval * self.trigger_count as u64
    }

    /// Validate the countdown shape
    pub fn validate(&self) -> Result<()> {
        if self.round_interval < 1 {
            return Err(Error::DefinitionInvalid {
                id: self.id,
                detail: "round_interval must be at least 1".to_string(),
            });
        }
        if self.trigger_count < 1 {
            return Err(Error::DefinitionInvalid {
                id: self.id,
                detail: "trigger_count must be at least 1".to_string(),
            });
        }
        if self.name.is_empty() {
            return Err(Error::DefinitionInvalid {
                id: self.id,
                detail: "name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Registry of all loaded effect definitions
#[derive(Debug, Clone, Default)]
pub struct EffectRegistry {
    definitions: IndexMap<EffectId, EffectDefinition>,
}

impl EffectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, rejecting duplicates and invalid shapes
    pub fn register(&mut self, def: EffectDefinition) -> Result<()> {
        def.validate()?;
        if self.definitions.contains_key(&def.id) {
            return Err(Error::DefinitionInvalid {
                id: def.id,
                detail: "duplicate definition id".to_string(),
            });
        }
        self.definitions.insert(def.id, def);
        Ok(())
    }

    /// Look up a definition by id
    pub fn get(&self, id: EffectId) -> Option<&EffectDefinition> {
        self.definitions.get(&id)
    }

    /// Check whether a definition exists
    pub fn contains(&self, id: EffectId) -> bool {
        self.definitions.contains_key(&id)
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterate definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &EffectDefinition> {
        self.definitions.values()
    }
}

/// How an instance left the active set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryKind {
    /// Charges ran out through normal triggering
    Natural,
    /// Removed by flag cancellation or an explicit remove
    Cancelled,
}

/// Live countdown state for one effect on one actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectInstance {
    /// Which definition this instance came from
    pub effect_id: EffectId,
    /// Remaining trigger charges
    pub triggers_left: u32,
    /// Rounds elapsed since apply, compared against the interval
    pub round_counter: u64,
    /// Round the instance was applied on
    pub applied_at: Round,
    /// Set when the instance was cancelled rather than expiring naturally
    cancelled: bool,
}

impl EffectInstance {
    /// Create a fresh instance from a definition
    pub fn new(def: &EffectDefinition, applied_at: Round) -> Self {
        Self {
            effect_id: def.id,
            triggers_left: def.trigger_count,
            round_counter: 0,
            applied_at,
            cancelled: false,
        }
    }

    /// Check if all charges are spent
    pub fn expired(&self) -> bool {
        self.triggers_left == 0
    }

    /// How this instance expired, if it has
    pub fn expiry_kind(&self) -> ExpiryKind {
        if self.cancelled {
            ExpiryKind::Cancelled
        } else {
            ExpiryKind::Natural
        }
    }

    /// Reset the remaining charges back to the definition's full count
    pub fn refresh(&mut self, def: &EffectDefinition) {
        self.triggers_left = def.trigger_count;
        self.cancelled = false;
    }

    /// Advance one round; returns true if a trigger charge was consumed
    pub fn tick(&mut self, interval: u64) -> bool {
        if self.expired() {
            return false;
        }
        self.round_counter += 1;
        if interval > 0 && self.round_counter % interval == 0 {
            self.triggers_left -= 1;
            true
        } else {
            false
        }
    }

    /// Consume one charge outside the round pass (apply-time triggering)
    pub fn consume_trigger(&mut self) -> bool {
        if self.expired() {
            return false;
        }
        self.triggers_left -= 1;
        true
    }

    /// Spend all remaining charges without triggering
    pub fn cancel(&mut self) {
        self.triggers_left = 0;
        self.cancelled = true;
    }

    /// Spend all remaining charges as if they ran out naturally
    pub fn expire_now(&mut self) {
        self.triggers_left = 0;
    }
}

/// One trigger produced by a round pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerHit {
    /// The effect that fired
    pub effect_id: EffectId,
    /// Charges remaining after this trigger
    pub triggers_left: u32,
}

/// An instance collected by the prune pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrunedEffect {
    /// The effect that expired
    pub effect_id: EffectId,
    /// Whether it expired naturally or was cancelled
    pub kind: ExpiryKind,
}

/// The set of active effect instances on one actor
///
/// Instances are kept in apply order, and there is at most one instance per
/// definition id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectSet {
    instances: IndexMap<EffectId, EffectInstance>,
}

impl EffectSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an effect, or refresh it if already active
    ///
    /// Returns true when a new instance was created. Refreshing resets the
    /// remaining charges without restarting the instance, so a refresh never
    /// produces a second start callback.
    pub fn apply(&mut self, def: &EffectDefinition, round: Round) -> bool {
        match self.instances.get_mut(&def.id) {
            Some(existing) => {
                existing.refresh(def);
                false
            }
            None => {
                self.instances.insert(def.id, EffectInstance::new(def, round));
                true
            }
        }
    }

    /// Check if an effect is active (present and not yet pruned)
    pub fn has_effect(&self, id: EffectId) -> bool {
        self.instances.contains_key(&id)
    }

    /// Get the live instance for an effect
    pub fn get(&self, id: EffectId) -> Option<&EffectInstance> {
        self.instances.get(&id)
    }

    /// Get the live instance for an effect, mutable
    pub fn get_mut(&mut self, id: EffectId) -> Option<&mut EffectInstance> {
        self.instances.get_mut(&id)
    }

    /// Check if any active effect carries the given flag
    pub fn has_flag(&self, registry: &EffectRegistry, flag: &Flag) -> bool {
        self.instances.keys().any(|id| {
            registry
                .get(*id)
                .map(|def| def.has_flag(flag))
                .unwrap_or(false)
        })
    }

    /// Ids of active effects carrying the given flag, in apply order
    pub fn ids_with_flag(&self, registry: &EffectRegistry, flag: &Flag) -> Vec<EffectId> {
        self.instances
            .keys()
            .copied()
            .filter(|id| {
                registry
                    .get(*id)
                    .map(|def| def.has_flag(flag))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Sum of passive adjustments to one stat across all active effects
    pub fn stat_mod(&self, registry: &EffectRegistry, stat: &str) -> i64 {
        self.instances
            .iter()
            .filter(|(_, inst)| !inst.expired())
            .filter_map(|(id, _)| registry.get(*id))
            .filter_map(|def| def.stat_mods.get(stat))
            .sum()
    }

    /// Cancel every active effect carrying the given flag
    ///
    /// Cancelled instances are marked expired without triggering; the next
    /// prune pass collects them with `ExpiryKind::Cancelled`.
    pub fn cancel_with_flag(&mut self, registry: &EffectRegistry, flag: &Flag) -> Vec<EffectId> {
        let ids = self.ids_with_flag(registry, flag);
        for id in &ids {
            if let Some(inst) = self.instances.get_mut(id) {
                inst.cancel();
            }
        }
        ids
    }

    /// Cancel one effect by id; returns true if it was active
    pub fn cancel(&mut self, id: EffectId) -> bool {
        match self.instances.get_mut(&id) {
            Some(inst) => {
                inst.cancel();
                true
            }
            None => false,
        }
    }

    /// Force one effect to expire as if its charges ran out naturally
    pub fn expire(&mut self, id: EffectId) -> bool {
        match self.instances.get_mut(&id) {
            Some(inst) => {
                inst.expire_now();
                true
            }
            None => false,
        }
    }

    /// Advance all instances one round
    ///
    /// Returns the triggers that fired this round, in apply order. Expired
    /// instances stay in the set until the prune pass collects them.
    pub fn tick(&mut self, registry: &EffectRegistry) -> Vec<TriggerHit> {
        let mut hits = Vec::new();
        for (id, inst) in self.instances.iter_mut() {
            let interval = match registry.get(*id) {
                Some(def) => def.round_interval,
                None => continue,
            };
            if inst.tick(interval) {
                hits.push(TriggerHit {
                    effect_id: *id,
                    triggers_left: inst.triggers_left,
                });
            }
        }
        hits
    }

    /// Remove all expired instances, returning them in apply order
    pub fn prune(&mut self) -> Vec<PrunedEffect> {
        let expired: Vec<PrunedEffect> = self
            .instances
            .values()
            .filter(|inst| inst.expired())
            .map(|inst| PrunedEffect {
                effect_id: inst.effect_id,
                kind: inst.expiry_kind(),
            })
            .collect();
        self.instances.retain(|_, inst| !inst.expired());
        expired
    }

    /// Active effect ids in apply order
    pub fn ids(&self) -> Vec<EffectId> {
        self.instances.keys().copied().collect()
    }

    /// Number of active instances
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether the set has no active instances
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Iterate instances in apply order
    pub fn iter(&self) -> impl Iterator<Item = &EffectInstance> {
        self.instances.values()
    }
}
