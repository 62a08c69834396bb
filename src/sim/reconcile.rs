//! Client-side prediction buffer and reconciliation against
//! authoritative results

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::command::TickCommand;
use super::state::{CraftConfig, CraftState};
use super::step::{self, SimEvent, SimulationResult};

/// Commands kept while awaiting authority confirmation. Beyond this the
/// oldest entry is evicted; a later ack for an evicted tick falls back
/// to an unconditional reset.
pub const PENDING_CAPACITY: usize = 128;

/// Per-component tolerance when comparing predicted and authoritative
/// results
pub const STATE_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionMode {
    /// Applying local inputs speculatively, ahead of confirmation
    Predicting,
    /// Transient: resetting to an authoritative result and replaying
    /// buffered inputs
    Reconciling,
}

#[derive(Debug, Clone)]
struct PendingCommand {
    command: TickCommand,
    predicted: SimulationResult,
}

/// Outcome of applying one authoritative result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    /// Whether the local state was reset to the authoritative result
    pub corrected: bool,
    /// Buffered commands replayed after the reset
    pub replayed: usize,
}

impl Reconciliation {
    const CONFIRMED: Reconciliation = Reconciliation {
        corrected: false,
        replayed: 0,
    };
}

/// Drives prediction and replay for one locally controlled craft.
///
/// Each local input is applied immediately through the simulation step
/// for responsiveness and buffered until the authority confirms it.
/// When an authoritative result disagrees with what was predicted for
/// that tick, local state is reset to the authoritative copy and every
/// later buffered command is replayed through the same step, without
/// re-sending anything.
#[derive(Debug)]
pub struct Predictor {
    config: CraftConfig,
    state: CraftState,
    pending: VecDeque<PendingCommand>,
    mode: PredictionMode,
    dt: f32,
}

impl Predictor {
    pub fn new(config: CraftConfig, initial: CraftState, dt: f32) -> Self {
        Self {
            config,
            state: initial,
            pending: VecDeque::new(),
            mode: PredictionMode::Predicting,
            dt,
        }
    }

    pub fn state(&self) -> &CraftState {
        &self.state
    }

    pub fn mode(&self) -> PredictionMode {
        self.mode
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_ticks(&self) -> impl Iterator<Item = u64> + '_ {
        self.pending.iter().map(|p| p.command.tick())
    }

    /// Apply a local command speculatively and buffer it for later
    /// reconciliation. Returns the predicted result and any emitted
    /// notifications.
    pub fn predict(&mut self, command: TickCommand) -> (SimulationResult, Vec<SimEvent>) {
        let out = step::advance(&self.state, &command, &self.config, self.dt);
        self.state = out.state;

        if self.pending.len() == PENDING_CAPACITY {
            let evicted = self.pending.pop_front();
            if let Some(evicted) = evicted {
                debug!(tick = evicted.command.tick(), "pending buffer full, evicting oldest");
            }
        }
        self.pending.push_back(PendingCommand {
            command,
            predicted: out.result,
        });

        (out.result, out.events)
    }

    /// Apply an authoritative result for some tick T.
    ///
    /// Entries up to and including T are dropped from the buffer. If
    /// the prediction for T matched within tolerance nothing else
    /// happens; otherwise (or if T is unknown, e.g. after eviction) the
    /// local state is reset to the authoritative result and the
    /// remaining buffer is replayed in ascending tick order.
    pub fn acknowledge(&mut self, authoritative: &SimulationResult) -> Reconciliation {
        let tick = authoritative.tick;
        let confirmed = self
            .pending
            .iter()
            .find(|p| p.command.tick() == tick)
            .map(|p| p.predicted);

        // Truncate to entries strictly after the acknowledged tick
        self.pending.retain(|p| p.command.tick() > tick);

        match confirmed {
            Some(predicted) if predicted.approx_eq(authoritative, STATE_EPSILON) => {
                trace!(tick, "prediction confirmed");
                Reconciliation::CONFIRMED
            }
            Some(_) => {
                debug!(tick, pending = self.pending.len(), "prediction mismatch, replaying");
                self.reset_and_replay(authoritative)
            }
            None => {
                // Tick not in local history (evicted or never seen):
                // unconditional reset with an empty replay set;
                // prediction catches up on the next fresh input
                debug!(tick, dropped = self.pending.len(), "unknown tick, resetting");
                self.pending.clear();
                self.reset_and_replay(authoritative)
            }
        }
    }

    /// Disconnection/detach path: all buffered commands are discarded
    /// and no further replay occurs
    pub fn discard_pending(&mut self) {
        self.pending.clear();
        self.mode = PredictionMode::Predicting;
    }

    fn reset_and_replay(&mut self, authoritative: &SimulationResult) -> Reconciliation {
        self.mode = PredictionMode::Reconciling;

        // Reset path: the result is copied directly, the step is not
        // invoked. Energy and fire bookkeeping are deterministic from
        // the inputs and stay local.
        self.state.kinematics.position = authoritative.position;
        self.state.kinematics.velocity = authoritative.velocity;
        self.state.kinematics.acceleration = authoritative.acceleration;

        // A gap in the buffered tick sequence is a no-op tick: nothing
        // is simulated for it and state holds
        let mut replayed = 0;
        for entry in self.pending.iter_mut() {
            let out = step::advance(&self.state, &entry.command, &self.config, self.dt);
            self.state = out.state;
            entry.predicted = out.result;
            replayed += 1;
        }

        self.mode = PredictionMode::Predicting;
        Reconciliation {
            corrected: true,
            replayed,
        }
    }
}
