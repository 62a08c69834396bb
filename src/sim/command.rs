//! Per-tick commands: input capture, collision reports and the merged
//! frame handed to the simulation step

use serde::{Deserialize, Serialize};

use super::vec::Vec3;

/// Player intent captured for one tick. Immutable once queued; its
/// identity is the tick number, unique per entity-tick pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub tick: u64,
    /// World-space point the pointer designates
    pub pointer_target: Vec3,
    pub thrust: bool,
    pub fire_light: bool,
    pub fire_heavy: bool,
    pub ability_a: bool,
    pub ability_b: bool,
}

/// Collision report raised by a predictive probe, carried alongside the
/// input for the same tick so resolution order is deterministic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionInput {
    pub tick: u64,
    pub detected: bool,
    pub hit_normal: Vec3,
    pub incoming_velocity: Vec3,
    pub position: Vec3,
}

/// A queued command from a controlling peer, one of two kinds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Command {
    Craft(InputRecord),
    Collision(CollisionInput),
}

impl Command {
    pub fn tick(&self) -> u64 {
        match self {
            Command::Craft(input) => input.tick,
            Command::Collision(collision) => collision.tick,
        }
    }
}

/// The complete frame for one tick: the input record plus the collision
/// report raised for the same tick, if any
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickCommand {
    pub input: InputRecord,
    pub collision: Option<CollisionInput>,
}

impl TickCommand {
    pub fn from_input(input: InputRecord) -> Self {
        Self {
            input,
            collision: None,
        }
    }

    pub fn tick(&self) -> u64 {
        self.input.tick
    }
}

/// Merges command parts into per-tick frames. A collision report is
/// staged until the craft command for the same tick arrives; a staged
/// report whose tick never matches is discarded.
#[derive(Debug, Default)]
pub struct CommandMerger {
    staged_collision: Option<CollisionInput>,
}

impl CommandMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one command, returning a complete frame once the craft
    /// command for a tick is in hand
    pub fn push(&mut self, command: Command) -> Option<TickCommand> {
        match command {
            Command::Collision(collision) => {
                self.staged_collision = Some(collision);
                None
            }
            Command::Craft(input) => {
                let collision = match self.staged_collision.take() {
                    Some(staged) if staged.tick == input.tick => Some(staged),
                    // Stale report for another tick: drop it
                    _ => None,
                };
                Some(TickCommand { input, collision })
            }
        }
    }
}

/// Raw intent sampled from the input device, before it is stamped with
/// a tick identity
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentSample {
    pub pointer_target: Vec3,
    pub thrust: bool,
    pub fire_light: bool,
    pub fire_heavy: bool,
    pub ability_a: bool,
    pub ability_b: bool,
}

/// Stamps sampled intent with a monotonically increasing tick number,
/// producing the immutable per-tick input record
#[derive(Debug)]
pub struct CommandEncoder {
    next_tick: u64,
}

impl CommandEncoder {
    pub fn new(start_tick: u64) -> Self {
        Self {
            next_tick: start_tick,
        }
    }

    pub fn next_tick(&self) -> u64 {
        self.next_tick
    }

    pub fn encode(&mut self, sample: IntentSample) -> InputRecord {
        let tick = self.next_tick;
        self.next_tick += 1;
        InputRecord {
            tick,
            pointer_target: sample.pointer_target,
            thrust: sample.thrust,
            fire_light: sample.fire_light,
            fire_heavy: sample.fire_heavy,
            ability_a: sample.ability_a,
            ability_b: sample.ability_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(tick: u64) -> InputRecord {
        InputRecord {
            tick,
            pointer_target: Vec3::ZERO,
            thrust: false,
            fire_light: false,
            fire_heavy: false,
            ability_a: false,
            ability_b: false,
        }
    }

    fn collision(tick: u64) -> CollisionInput {
        CollisionInput {
            tick,
            detected: true,
            hit_normal: Vec3::new(-1.0, 0.0, 0.0),
            incoming_velocity: Vec3::new(2.0, 0.0, 0.0),
            position: Vec3::ZERO,
        }
    }

    #[test]
    fn encoder_assigns_monotonic_ticks() {
        let mut encoder = CommandEncoder::new(7);
        let a = encoder.encode(IntentSample::default());
        let b = encoder.encode(IntentSample::default());
        let c = encoder.encode(IntentSample::default());
        assert_eq!((a.tick, b.tick, c.tick), (7, 8, 9));
        assert_eq!(encoder.next_tick(), 10);
    }

    #[test]
    fn merger_folds_collision_into_matching_frame() {
        let mut merger = CommandMerger::new();
        assert!(merger.push(Command::Collision(collision(4))).is_none());

        let frame = merger.push(Command::Craft(input(4))).unwrap();
        assert_eq!(frame.tick(), 4);
        assert!(frame.collision.is_some());
    }

    #[test]
    fn merger_discards_stale_collision() {
        let mut merger = CommandMerger::new();
        merger.push(Command::Collision(collision(3)));

        let frame = merger.push(Command::Craft(input(5))).unwrap();
        assert!(frame.collision.is_none());

        // The stale report must not leak into a later frame either
        let next = merger.push(Command::Craft(input(6))).unwrap();
        assert!(next.collision.is_none());
    }
}
