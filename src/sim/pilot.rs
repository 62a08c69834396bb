//! The controlling peer's side of the loop: capture intent, probe,
//! predict locally, reconcile on authoritative results

use super::collision::ObstructionField;
use super::command::{Command, CommandEncoder, IntentSample, TickCommand};
use super::reconcile::{Predictor, Reconciliation};
use super::state::{CraftConfig, CraftState};
use super::step::{SimEvent, SimulationResult};

/// Everything one local tick produces: the commands to send to the
/// authority and the speculative result already applied locally
#[derive(Debug)]
pub struct PilotOutput {
    /// Commands for the reliable-ordered channel, in send order (a
    /// collision report, if raised, precedes its craft command)
    pub commands: Vec<Command>,
    pub predicted: SimulationResult,
    pub events: Vec<SimEvent>,
}

/// Per-craft driver for a controlling peer. Each fixed tick it stamps
/// the sampled intent with a tick identity, runs the predictive
/// collision probe, advances local state immediately for
/// responsiveness, and hands back the commands to transmit.
#[derive(Debug)]
pub struct Pilot {
    encoder: CommandEncoder,
    predictor: Predictor,
    obstructions: ObstructionField,
}

impl Pilot {
    pub fn new(
        config: CraftConfig,
        initial: CraftState,
        obstructions: ObstructionField,
        dt: f32,
    ) -> Self {
        Self {
            // Tick 0 is the pre-attach sentinel on the authority
            encoder: CommandEncoder::new(1),
            predictor: Predictor::new(config, initial, dt),
            obstructions,
        }
    }

    pub fn state(&self) -> &CraftState {
        self.predictor.state()
    }

    pub fn pending_len(&self) -> usize {
        self.predictor.pending_len()
    }

    /// Run one local tick from sampled intent
    pub fn tick(&mut self, sample: IntentSample) -> PilotOutput {
        let input = self.encoder.encode(sample);
        let collision = self
            .obstructions
            .probe_report(input.tick, &self.state().kinematics);

        let frame = TickCommand { input, collision };
        let (predicted, events) = self.predictor.predict(frame);

        let mut commands = Vec::with_capacity(2);
        if let Some(report) = collision {
            commands.push(Command::Collision(report));
        }
        commands.push(Command::Craft(input));

        PilotOutput {
            commands,
            predicted,
            events,
        }
    }

    /// Apply an authoritative result received from the channel
    pub fn acknowledge(&mut self, authoritative: &SimulationResult) -> Reconciliation {
        self.predictor.acknowledge(authoritative)
    }

    /// Detach path: drop every unconfirmed command
    pub fn discard_pending(&mut self) {
        self.predictor.discard_pending();
    }
}
