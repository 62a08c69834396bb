//! Per-entity simulation state and craft tuning

use serde::{Deserialize, Serialize};

use super::vec::Vec3;

/// Maximum stored energy for any craft
pub const ENERGY_MAX: u8 = 100;

/// Position/velocity/acceleration record, the unit of prediction and
/// reconciliation. Mutated only by the simulation step or by a
/// reconciliation reset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KinematicState {
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
}

impl KinematicState {
    pub fn at_position(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
        }
    }
}

/// Craft hull classes available in the prototype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CraftClass {
    /// Fast, low armor, small battery
    Light,
    /// Balanced stats
    Medium,
    /// Slow, heavily armored, large battery
    Heavy,
}

impl Default for CraftClass {
    fn default() -> Self {
        Self::Medium
    }
}

/// Immutable per-entity tuning, fixed at attach time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CraftConfig {
    /// Thrust responsiveness toward the pointer target
    pub speed_multiplier: f32,
    /// Magnitude cap on per-tick acceleration
    pub accel_cap: f32,
    /// Magnitude cap on per-tick velocity
    pub max_speed: f32,
    /// Battery capacity, at most [`ENERGY_MAX`]
    pub energy_capacity: u8,
    /// Hull armor rating
    pub armor: u32,
    /// Energy spent per light fire
    pub fire_cost: u8,
    /// Ticks between light fires
    pub fire_cooldown_ticks: u64,
    /// Velocity fraction retained after a bounce
    pub restitution: f32,
}

impl CraftConfig {
    pub fn for_class(class: CraftClass) -> Self {
        match class {
            CraftClass::Light => Self {
                speed_multiplier: 40.0,
                accel_cap: 2.5,
                max_speed: 6.0,
                energy_capacity: 80,
                armor: 1,
                fire_cost: 10,
                fire_cooldown_ticks: 12,
                restitution: 0.8,
            },
            CraftClass::Medium => Self {
                speed_multiplier: 30.0,
                accel_cap: 2.0,
                max_speed: 5.0,
                energy_capacity: 100,
                armor: 2,
                fire_cost: 15,
                fire_cooldown_ticks: 18,
                restitution: 0.8,
            },
            CraftClass::Heavy => Self {
                speed_multiplier: 20.0,
                accel_cap: 1.5,
                max_speed: 3.5,
                energy_capacity: 100,
                armor: 4,
                fire_cost: 20,
                fire_cooldown_ticks: 30,
                restitution: 0.8,
            },
        }
    }
}

/// Stored craft energy, always within `0..=capacity`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyState {
    value: u8,
}

impl EnergyState {
    pub fn full(capacity: u8) -> Self {
        Self {
            value: capacity.min(ENERGY_MAX),
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Per-tick regeneration: +1, capped at `capacity`
    pub fn regenerate(&mut self, capacity: u8) {
        let cap = capacity.min(ENERGY_MAX);
        if self.value < cap {
            self.value += 1;
        }
    }

    /// Whether a spend of `cost` passes the fire gate. The gate is
    /// strict: stored energy must exceed the cost.
    pub fn can_spend(&self, cost: u8) -> bool {
        self.value > cost
    }

    /// Deduct `cost`, saturating at zero
    pub fn spend(&mut self, cost: u8) {
        self.value = self.value.saturating_sub(cost);
    }
}

/// Full simulated state for one craft: kinematics plus the energy and
/// fire bookkeeping that the step evaluates alongside movement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CraftState {
    pub kinematics: KinematicState,
    pub energy: EnergyState,
    /// Tick of the last successful light fire, if any
    pub last_fire_tick: Option<u64>,
}

impl CraftState {
    pub fn spawn(config: &CraftConfig, position: Vec3) -> Self {
        Self {
            kinematics: KinematicState::at_position(position),
            energy: EnergyState::full(config.energy_capacity),
            last_fire_tick: None,
        }
    }
}
