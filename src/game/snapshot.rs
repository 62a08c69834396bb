//! Periodic full-state snapshot building

use crate::sim::EntityTable;
use crate::ws::protocol::{CraftSnapshot, ServerMsg};

/// Builds read-only state snapshots for network transmission, at a
/// lower rate than the simulation itself
pub struct SnapshotBuilder {
    /// Tick counter since last snapshot
    ticks_since_snapshot: u32,
    /// Snapshot interval in ticks
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important transitions)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    /// Build a snapshot message from the entity table
    pub fn build(&self, tick: u64, entities: &EntityTable) -> ServerMsg {
        let crafts: Vec<CraftSnapshot> = entities
            .iter()
            .map(|e| CraftSnapshot {
                entity_id: e.id,
                position: e.state.kinematics.position,
                velocity: e.state.kinematics.velocity,
                acceleration: e.state.kinematics.acceleration,
                energy: e.state.energy.value(),
                last_input_tick: e.last_input_tick,
            })
            .collect();

        ServerMsg::Snapshot { tick, crafts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_send_fires_every_interval() {
        let mut builder = SnapshotBuilder::new(3);
        assert!(!builder.should_send());
        assert!(!builder.should_send());
        assert!(builder.should_send());
        assert!(!builder.should_send());
    }

    #[test]
    fn force_next_triggers_immediately() {
        let mut builder = SnapshotBuilder::new(10);
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn build_reflects_entity_table() {
        use crate::sim::state::{CraftClass, CraftConfig};
        use crate::sim::vec::Vec3;

        let mut entities = EntityTable::new();
        let id = uuid::Uuid::new_v4();
        entities
            .attach(
                id,
                Some(CraftConfig::for_class(CraftClass::Medium)),
                Vec3::new(1.0, 2.0, 3.0),
            )
            .unwrap();

        let builder = SnapshotBuilder::new(1);
        match builder.build(42, &entities) {
            ServerMsg::Snapshot { tick, crafts } => {
                assert_eq!(tick, 42);
                assert_eq!(crafts.len(), 1);
                assert_eq!(crafts[0].entity_id, id);
                assert_eq!(crafts[0].position, Vec3::new(1.0, 2.0, 3.0));
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
