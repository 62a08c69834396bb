//! Arena state and the authoritative tick loop

use dashmap::DashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::sim::collision::{ObstructionField, Sphere};
use crate::sim::command::TickCommand;
use crate::sim::state::CraftClass;
use crate::sim::step::{self, SimEvent};
use crate::sim::{AttachError, Command, CraftConfig, EntityId, EntityTable, Vec3};
use crate::util::time::{tick_delta, SIMULATION_TPS, SNAPSHOT_TPS, TICK_DURATION_MICROS};
use crate::ws::protocol::{ClientMsg, PlayerInfo, ServerMsg};

use super::snapshot::SnapshotBuilder;
use super::SessionInput;

/// Arena lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaPhase {
    /// Waiting for enough players
    Waiting,
    /// Simulation running
    Running,
    /// Arena finished
    Ended,
}

/// Playfield radius the spawn ring and obstruction layout live in
const FIELD_RADIUS: f32 = 60.0;
const OBSTRUCTION_COUNT: usize = 6;

/// Arena state (owned by the arena task)
pub struct ArenaState {
    pub id: Uuid,
    pub seed: u64,
    pub phase: ArenaPhase,
    pub tick: u64,
    pub entities: EntityTable,
    pub classes: HashMap<EntityId, CraftClass>,
    pub obstructions: ObstructionField,
    pub rng: ChaCha8Rng,
    pub min_players: usize,
    pub max_players: usize,
}

impl ArenaState {
    pub fn new(id: Uuid, seed: u64, min_players: usize, max_players: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let obstructions = generate_obstructions(&mut rng);

        Self {
            id,
            seed,
            phase: ArenaPhase::Waiting,
            tick: 0,
            entities: EntityTable::new(),
            classes: HashMap::new(),
            obstructions,
            rng,
            min_players,
            max_players,
        }
    }

    /// Generate a spawn position on a ring inside the playfield
    pub fn generate_spawn_position(&mut self) -> Vec3 {
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        let distance = self.rng.gen_range(FIELD_RADIUS * 0.4..FIELD_RADIUS * 0.8);
        Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
    }

    fn roster(&self) -> Vec<PlayerInfo> {
        self.entities
            .iter()
            .map(|e| PlayerInfo {
                entity_id: e.id,
                craft_class: self.classes.get(&e.id).copied().unwrap_or_default(),
            })
            .collect()
    }
}

/// Deterministic obstruction layout derived from the arena seed, so
/// every peer derives the identical field
fn generate_obstructions(rng: &mut ChaCha8Rng) -> ObstructionField {
    let spheres = (0..OBSTRUCTION_COUNT)
        .map(|_| {
            let angle = rng.gen_range(0.0..std::f32::consts::TAU);
            let distance = rng.gen_range(FIELD_RADIUS * 0.1..FIELD_RADIUS * 0.9);
            Sphere {
                center: Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance),
                radius: rng.gen_range(2.0..6.0),
            }
        })
        .collect();
    ObstructionField::new(spheres)
}

/// Handle to a running arena
#[derive(Clone)]
pub struct ArenaHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<SessionInput>,
    pub broadcast_tx: broadcast::Sender<ServerMsg>,
    pub player_count: Arc<std::sync::atomic::AtomicUsize>,
}

impl ArenaHandle {
    pub fn player_count(&self) -> usize {
        self.player_count.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Registry of all active arenas
pub struct ArenaRegistry {
    arenas: DashMap<Uuid, ArenaHandle>,
}

impl ArenaRegistry {
    pub fn new() -> Self {
        Self {
            arenas: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<ArenaHandle> {
        self.arenas.get(id).map(|a| a.value().clone())
    }

    pub fn insert(&self, handle: ArenaHandle) {
        self.arenas.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<ArenaHandle> {
        self.arenas.remove(id).map(|(_, h)| h)
    }

    pub fn active_arenas(&self) -> usize {
        self.arenas.len()
    }

    pub fn total_players(&self) -> usize {
        self.arenas.iter().map(|a| a.value().player_count()).sum()
    }

    /// (arena id, player count) pairs for the listing endpoint
    pub fn summaries(&self) -> Vec<(Uuid, usize)> {
        self.arenas
            .iter()
            .map(|a| (a.value().id, a.value().player_count()))
            .collect()
    }

    /// Find an arena with available slots
    pub fn find_available(&self, max_players: usize) -> Option<ArenaHandle> {
        for entry in self.arenas.iter() {
            if entry.value().player_count() < max_players {
                return Some(entry.value().clone());
            }
        }
        None
    }
}

impl Default for ArenaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative arena. Runs the sole canonical copy of every
/// entity's state; peers only ever hold speculative copies of their
/// own craft.
pub struct Arena {
    state: ArenaState,
    input_rx: mpsc::Receiver<SessionInput>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    player_count: Arc<std::sync::atomic::AtomicUsize>,
}

impl Arena {
    /// Create a new arena and its handle
    pub fn new(id: Uuid, seed: u64, min_players: usize, max_players: usize) -> (Self, ArenaHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (broadcast_tx, _) = broadcast::channel(256);
        let player_count = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let handle = ArenaHandle {
            id,
            input_tx,
            broadcast_tx: broadcast_tx.clone(),
            player_count: player_count.clone(),
        };

        let snapshot_interval = SIMULATION_TPS / SNAPSHOT_TPS;
        let arena = Self {
            state: ArenaState::new(id, seed, min_players, max_players),
            input_rx,
            broadcast_tx,
            snapshot_builder: SnapshotBuilder::new(snapshot_interval),
            player_count,
        };

        (arena, handle)
    }

    /// Run the authoritative tick loop. Network arrivals are queued by
    /// the transport and applied only here, at tick boundaries.
    pub async fn run(mut self) {
        info!(arena_id = %self.state.id, seed = self.state.seed, "Arena started");

        let tick_duration = Duration::from_micros(TICK_DURATION_MICROS);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;
            self.state.tick += 1;

            self.process_inputs();

            if self.state.phase == ArenaPhase::Waiting
                && self.state.entities.len() >= self.state.min_players
            {
                self.state.phase = ArenaPhase::Running;
                self.snapshot_builder.force_next();
                let _ = self.broadcast_tx.send(ServerMsg::ArenaStarted {
                    tick: self.state.tick,
                });
                info!(arena_id = %self.state.id, "Arena running");
            }

            if self.state.phase == ArenaPhase::Running && self.snapshot_builder.should_send() {
                let snapshot = self
                    .snapshot_builder
                    .build(self.state.tick, &self.state.entities);
                let _ = self.broadcast_tx.send(snapshot);
            }

            // Everyone left after the arena got going: wind it down
            if self.state.entities.is_empty() && self.state.phase != ArenaPhase::Waiting {
                self.state.phase = ArenaPhase::Ended;
            }

            if self.state.phase == ArenaPhase::Ended {
                info!(arena_id = %self.state.id, "Arena ended");
                break;
            }
        }
    }

    /// Drain and apply all pending session messages
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            match input.msg {
                ClientMsg::Join { craft_class } => {
                    self.handle_join(input.user_id, craft_class);
                }
                ClientMsg::Command { command } => {
                    self.handle_command(input.user_id, command);
                }
                ClientMsg::Ping { t } => {
                    let _ = self.broadcast_tx.send(ServerMsg::Pong { t });
                }
                ClientMsg::Leave => {
                    self.handle_leave(input.user_id);
                }
            }
        }
    }

    /// Attach a new entity. The craft class is the attach token; its
    /// absence is a precondition violation and the join is rejected.
    fn handle_join(&mut self, user_id: Uuid, craft_class: Option<CraftClass>) {
        if self.state.entities.contains(&user_id) {
            warn!(entity_id = %user_id, "Entity already attached");
            return;
        }

        if self.state.entities.len() >= self.state.max_players {
            let _ = self.broadcast_tx.send(ServerMsg::Error {
                code: "arena_full".to_string(),
                message: "Arena is full".to_string(),
            });
            return;
        }

        let config = craft_class.map(CraftConfig::for_class);
        let spawn = self.state.generate_spawn_position();

        let config = match self.state.entities.attach(user_id, config, spawn) {
            Ok(entity) => entity.config,
            Err(e @ AttachError::MissingConfig) => {
                warn!(entity_id = %user_id, error = %e, "Join rejected");
                let _ = self.broadcast_tx.send(ServerMsg::Error {
                    code: "missing_craft_config".to_string(),
                    message: e.to_string(),
                });
                return;
            }
            Err(e) => {
                warn!(entity_id = %user_id, error = %e, "Join rejected");
                return;
            }
        };

        let craft_class = craft_class.unwrap_or_default();
        self.state.classes.insert(user_id, craft_class);
        self.player_count
            .store(self.state.entities.len(), std::sync::atomic::Ordering::Relaxed);

        let _ = self.broadcast_tx.send(ServerMsg::PlayerJoined {
            player: PlayerInfo {
                entity_id: user_id,
                craft_class,
            },
        });

        let _ = self.broadcast_tx.send(ServerMsg::Joined {
            arena_id: self.state.id,
            seed: self.state.seed,
            entity_id: user_id,
            config,
            spawn_position: spawn,
            players: self.state.roster(),
        });

        info!(
            arena_id = %self.state.id,
            entity_id = %user_id,
            player_count = self.state.entities.len(),
            "Entity attached"
        );
    }

    /// Apply one received command through the deterministic step, in
    /// arrival (= tick) order, and broadcast the tagged result. The
    /// authority never reconciles against itself.
    fn handle_command(&mut self, user_id: Uuid, command: Command) {
        let Some(entity) = self.state.entities.get_mut(&user_id) else {
            return;
        };

        let Some(frame) = entity.merger.push(command) else {
            return;
        };

        // Stale or duplicate tick: drop it. Tick 0 is reserved as the
        // pre-attach sentinel, encoders start at 1.
        if frame.tick() <= entity.last_input_tick {
            return;
        }

        // The authority re-derives the hit from its own state; under
        // determinism it agrees with the peer's probe, and when it does
        // not, reconciliation corrects the peer
        let collision = self
            .state
            .obstructions
            .probe_report(frame.tick(), &entity.state.kinematics);
        let frame = TickCommand {
            input: frame.input,
            collision,
        };

        let out = step::advance(&entity.state, &frame, &entity.config, tick_delta());
        entity.state = out.state;
        entity.last_input_tick = frame.tick();

        let _ = self.broadcast_tx.send(ServerMsg::StepResult {
            entity_id: user_id,
            result: out.result,
            energy: out.state.energy.value(),
        });

        for event in out.events {
            match event {
                SimEvent::ProjectileSpawned {
                    tick,
                    position,
                    direction,
                } => {
                    let _ = self.broadcast_tx.send(ServerMsg::Fired {
                        entity_id: user_id,
                        tick,
                        position,
                        direction,
                    });
                }
            }
        }
    }

    /// Detach an entity, discarding its state and any staged commands
    fn handle_leave(&mut self, user_id: Uuid) {
        if self.state.entities.detach(&user_id).is_some() {
            self.state.classes.remove(&user_id);
            self.player_count
                .store(self.state.entities.len(), std::sync::atomic::Ordering::Relaxed);

            let _ = self.broadcast_tx.send(ServerMsg::PlayerLeft {
                entity_id: user_id,
                reason: "disconnected".to_string(),
            });

            info!(
                arena_id = %self.state.id,
                entity_id = %user_id,
                "Entity detached"
            );
        }
    }
}
