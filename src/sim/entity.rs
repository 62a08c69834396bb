//! Plain-data entity table, keyed by entity identifier

use std::collections::HashMap;

use uuid::Uuid;

use super::command::CommandMerger;
use super::state::{CraftConfig, CraftState};
use super::vec::Vec3;

pub type EntityId = Uuid;

/// Attach-time failures. Missing configuration is a fatal precondition
/// violation: the entity cannot be simulated at all.
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    #[error("no craft config supplied at attach")]
    MissingConfig,

    #[error("entity {0} already attached")]
    AlreadyAttached(EntityId),
}

/// One simulated craft owned by the authority
#[derive(Debug)]
pub struct Entity {
    pub id: EntityId,
    pub config: CraftConfig,
    pub state: CraftState,
    /// Highest input tick applied so far
    pub last_input_tick: u64,
    pub merger: CommandMerger,
}

/// All simulated entities on one peer. The authority owns the canonical
/// table; each controlling peer holds a speculative copy of its own
/// entity only.
#[derive(Debug, Default)]
pub struct EntityTable {
    entities: HashMap<EntityId, Entity>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new entity. The config must be present; attaching
    /// without one fails rather than producing undefined movement.
    pub fn attach(
        &mut self,
        id: EntityId,
        config: Option<CraftConfig>,
        spawn: Vec3,
    ) -> Result<&mut Entity, AttachError> {
        let config = config.ok_or(AttachError::MissingConfig)?;
        if self.entities.contains_key(&id) {
            return Err(AttachError::AlreadyAttached(id));
        }

        let entity = Entity {
            id,
            state: CraftState::spawn(&config, spawn),
            config,
            last_input_tick: 0,
            merger: CommandMerger::new(),
        };
        Ok(self.entities.entry(id).or_insert(entity))
    }

    /// Detach an entity, discarding all of its state. Any buffered
    /// commands for it die with it.
    pub fn detach(&mut self, id: &EntityId) -> Option<Entity> {
        self.entities.remove(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::CraftClass;

    #[test]
    fn attach_without_config_fails_fast() {
        let mut table = EntityTable::new();
        let err = table
            .attach(Uuid::new_v4(), None, Vec3::ZERO)
            .expect_err("must reject missing config");
        assert!(matches!(err, AttachError::MissingConfig));
        assert!(table.is_empty());
    }

    #[test]
    fn attach_twice_is_rejected() {
        let mut table = EntityTable::new();
        let id = Uuid::new_v4();
        let config = CraftConfig::for_class(CraftClass::Light);

        table.attach(id, Some(config), Vec3::ZERO).unwrap();
        let err = table
            .attach(id, Some(config), Vec3::ZERO)
            .expect_err("must reject duplicate");
        assert!(matches!(err, AttachError::AlreadyAttached(dup) if dup == id));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn detach_discards_state() {
        let mut table = EntityTable::new();
        let id = Uuid::new_v4();
        let config = CraftConfig::for_class(CraftClass::Heavy);
        table
            .attach(id, Some(config), Vec3::new(5.0, 0.0, 0.0))
            .unwrap();

        let entity = table.detach(&id).expect("was attached");
        assert_eq!(entity.state.kinematics.position, Vec3::new(5.0, 0.0, 0.0));
        assert!(!table.contains(&id));
    }
}
