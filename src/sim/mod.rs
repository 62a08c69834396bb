//! Deterministic simulation core, shared by the authority and by
//! predicting peers.
//!
//! Everything in here is pure and transport-free: the arena tick loop
//! and the client session layer drive it, the wire protocol serializes
//! its records.

pub mod collision;
pub mod command;
pub mod entity;
pub mod pilot;
pub mod reconcile;
pub mod state;
pub mod step;
pub mod vec;

pub use command::{Command, CommandEncoder, InputRecord, TickCommand};
pub use entity::{AttachError, EntityId, EntityTable};
pub use pilot::Pilot;
pub use reconcile::Predictor;
pub use state::{CraftClass, CraftConfig, CraftState, KinematicState};
pub use step::{SimEvent, SimulationResult};
pub use vec::Vec3;
