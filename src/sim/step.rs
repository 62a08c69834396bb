//! The deterministic simulation step, run identically on the authority
//! and on predicting peers.
//!
//! Unit convention: velocity is distance-per-tick with dt folded into
//! the velocity update, so position integration is `position +=
//! velocity`. The same convention applies everywhere.

use serde::{Deserialize, Serialize};

use super::collision;
use super::command::TickCommand;
use super::state::{CraftConfig, CraftState};
use super::vec::Vec3;

/// Output of one step invocation, compared field-wise (with tolerance)
/// between predicted and authoritative copies during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub tick: u64,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
}

impl SimulationResult {
    pub fn approx_eq(&self, other: &SimulationResult, epsilon: f32) -> bool {
        self.tick == other.tick
            && self.position.approx_eq(other.position, epsilon)
            && self.velocity.approx_eq(other.velocity, epsilon)
    }
}

/// Notifications the step emits for the render/audio collaborator.
/// Fire-and-forget: nothing in the step awaits their consumption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SimEvent {
    ProjectileSpawned {
        tick: u64,
        position: Vec3,
        direction: Vec3,
    },
}

/// Result of advancing one craft by one tick
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub result: SimulationResult,
    pub state: CraftState,
    pub events: Vec<SimEvent>,
}

/// Advance one craft by one tick.
///
/// Pure function of (prior state, command frame, config, dt): no clock
/// reads, no globals. This determinism is what makes replay-based
/// reconciliation correct.
pub fn advance(
    state: &CraftState,
    command: &TickCommand,
    config: &CraftConfig,
    dt: f32,
) -> StepOutput {
    let input = &command.input;
    let mut kin = state.kinematics;
    let mut events = Vec::new();

    if input.thrust {
        let toward_pointer = (input.pointer_target - kin.position).normalized();
        kin.acceleration =
            (toward_pointer * (config.speed_multiplier * dt)).clamped_magnitude(config.accel_cap);
        kin.velocity = (kin.velocity + kin.acceleration * dt).clamped_magnitude(config.max_speed);
    } else {
        kin.acceleration = Vec3::ZERO;
    }

    // A detected collision pre-empts the thrust-derived velocity for
    // this tick, before position integration
    if let Some(report) = command.collision.filter(|c| c.detected) {
        kin.velocity = collision::reflect(
            report.hit_normal,
            report.incoming_velocity,
            config.restitution,
        );
    }

    kin.position += kin.velocity;

    let mut energy = state.energy;
    energy.regenerate(config.energy_capacity);

    let mut last_fire_tick = state.last_fire_tick;
    if input.fire_light && fire_gate_open(last_fire_tick, input.tick, config) {
        if energy.can_spend(config.fire_cost) {
            energy.spend(config.fire_cost);
            last_fire_tick = Some(input.tick);
            events.push(SimEvent::ProjectileSpawned {
                tick: input.tick,
                position: kin.position,
                direction: (input.pointer_target - kin.position).normalized(),
            });
        }
        // Insufficient energy: the fire is silently not actioned
    }

    StepOutput {
        result: SimulationResult {
            tick: input.tick,
            position: kin.position,
            velocity: kin.velocity,
            acceleration: kin.acceleration,
        },
        state: CraftState {
            kinematics: kin,
            energy,
            last_fire_tick,
        },
        events,
    }
}

fn fire_gate_open(last_fire_tick: Option<u64>, tick: u64, config: &CraftConfig) -> bool {
    match last_fire_tick {
        Some(last) => last + config.fire_cooldown_ticks <= tick,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::command::{CollisionInput, InputRecord};
    use crate::sim::state::CraftClass;

    const DT: f32 = 1.0 / 60.0;

    fn config() -> CraftConfig {
        CraftConfig::for_class(CraftClass::Medium)
    }

    fn idle_input(tick: u64) -> InputRecord {
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

    fn thrust_toward(tick: u64, target: Vec3) -> InputRecord {
        InputRecord {
            pointer_target: target,
            thrust: true,
            ..idle_input(tick)
        }
    }

    #[test]
    fn advance_is_referentially_transparent() {
        let config = config();
        let state = CraftState::spawn(&config, Vec3::new(1.0, 2.0, 3.0));
        let cmd = TickCommand::from_input(thrust_toward(3, Vec3::new(10.0, 0.0, 0.0)));

        let first = advance(&state, &cmd, &config, DT);
        let second = advance(&state, &cmd, &config, DT);
        assert_eq!(first, second);
    }

    #[test]
    fn thrust_scenario_moves_toward_target_within_caps() {
        // At rest, thrusting at (10,0,0) for 10 ticks at dt=1/60 with
        // speed_multiplier=30, accel cap 2, max speed 5
        let config = config();
        let mut state = CraftState::spawn(&config, Vec3::ZERO);
        let mut last_x = 0.0f32;

        for tick in 0..10u64 {
            let cmd = TickCommand::from_input(thrust_toward(tick, Vec3::new(10.0, 0.0, 0.0)));
            let out = advance(&state, &cmd, &config, DT);
            state = out.state;

            assert!(state.kinematics.velocity.length() <= config.max_speed);
            assert!(state.kinematics.position.x > last_x, "must move strictly +x");
            assert_eq!(state.kinematics.position.y, 0.0);
            assert_eq!(state.kinematics.position.z, 0.0);
            last_x = state.kinematics.position.x;
        }
    }

    #[test]
    fn no_thrust_holds_velocity_and_zeroes_acceleration() {
        let config = config();
        let mut state = CraftState::spawn(&config, Vec3::ZERO);
        state.kinematics.velocity = Vec3::new(0.5, 0.0, 0.0);
        state.kinematics.acceleration = Vec3::new(0.1, 0.0, 0.0);

        let out = advance(&state, &TickCommand::from_input(idle_input(0)), &config, DT);
        assert_eq!(out.state.kinematics.velocity, Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(out.state.kinematics.acceleration, Vec3::ZERO);
        assert_eq!(out.state.kinematics.position, Vec3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn collision_overrides_velocity_before_integration() {
        let config = config();
        let mut state = CraftState::spawn(&config, Vec3::ZERO);
        state.kinematics.velocity = Vec3::new(1.0, 0.0, 0.0);

        let cmd = TickCommand {
            input: thrust_toward(0, Vec3::new(10.0, 0.0, 0.0)),
            collision: Some(CollisionInput {
                tick: 0,
                detected: true,
                hit_normal: Vec3::new(-1.0, 0.0, 0.0),
                incoming_velocity: Vec3::new(1.0, 0.0, 0.0),
                position: Vec3::ZERO,
            }),
        };

        let out = advance(&state, &cmd, &config, DT);
        // Reflected velocity (-0.8, 0, 0), position integrated with it
        assert!(out
            .state
            .kinematics
            .velocity
            .approx_eq(Vec3::new(-0.8, 0.0, 0.0), 1e-5));
        assert!(out
            .state
            .kinematics
            .position
            .approx_eq(Vec3::new(-0.8, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn undetected_collision_report_is_ignored() {
        let config = config();
        let mut state = CraftState::spawn(&config, Vec3::ZERO);
        state.kinematics.velocity = Vec3::new(1.0, 0.0, 0.0);

        let cmd = TickCommand {
            input: idle_input(0),
            collision: Some(CollisionInput {
                tick: 0,
                detected: false,
                hit_normal: Vec3::new(-1.0, 0.0, 0.0),
                incoming_velocity: Vec3::new(1.0, 0.0, 0.0),
                position: Vec3::ZERO,
            }),
        };

        let out = advance(&state, &cmd, &config, DT);
        assert_eq!(out.state.kinematics.velocity, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn fire_spawns_projectile_and_spends_energy() {
        let config = config();
        let state = CraftState::spawn(&config, Vec3::ZERO);
        let cmd = TickCommand::from_input(InputRecord {
            fire_light: true,
            ..idle_input(0)
        });

        let out = advance(&state, &cmd, &config, DT);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.state.last_fire_tick, Some(0));
        // Regen happens before the gate: full battery stays at the cap,
        // then the cost comes off
        assert_eq!(
            out.state.energy.value(),
            config.energy_capacity - config.fire_cost
        );
    }

    #[test]
    fn fire_within_cooldown_is_suppressed() {
        let config = config();
        let mut state = CraftState::spawn(&config, Vec3::ZERO);

        let first = advance(
            &state,
            &TickCommand::from_input(InputRecord {
                fire_light: true,
                ..idle_input(0)
            }),
            &config,
            DT,
        );
        state = first.state;
        let energy_after_first = state.energy.value();

        // Second attempt one tick later, well inside the cooldown
        let second = advance(
            &state,
            &TickCommand::from_input(InputRecord {
                fire_light: true,
                ..idle_input(1)
            }),
            &config,
            DT,
        );

        assert!(second.events.is_empty());
        assert_eq!(second.state.last_fire_tick, Some(0));
        // Only regen applied, no cost deducted
        assert_eq!(second.state.energy.value(), energy_after_first + 1);
    }

    #[test]
    fn fire_resumes_once_cooldown_elapses() {
        let config = config();
        let mut state = CraftState::spawn(&config, Vec3::ZERO);

        let first = advance(
            &state,
            &TickCommand::from_input(InputRecord {
                fire_light: true,
                ..idle_input(0)
            }),
            &config,
            DT,
        );
        state = first.state;

        let retry_tick = config.fire_cooldown_ticks;
        let second = advance(
            &state,
            &TickCommand::from_input(InputRecord {
                fire_light: true,
                ..idle_input(retry_tick)
            }),
            &config,
            DT,
        );
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.state.last_fire_tick, Some(retry_tick));
    }

    #[test]
    fn energy_stays_in_bounds_across_long_sequences() {
        let config = config();
        let mut state = CraftState::spawn(&config, Vec3::ZERO);

        for tick in 0..2_000u64 {
            let cmd = TickCommand::from_input(InputRecord {
                fire_light: tick % 2 == 0,
                ..idle_input(tick)
            });
            state = advance(&state, &cmd, &config, DT).state;
            assert!(state.energy.value() <= config.energy_capacity);
        }
    }
}
