//! WebSocket protocol message definitions
//! These are the wire types for peer-authority communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sim::step::SimulationResult;
use crate::sim::vec::Vec3;
use crate::sim::{Command, CraftClass, CraftConfig};

/// Messages sent from a peer to the authority
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Request to join an arena. The craft class is the attach token:
    /// joining without one is rejected, the entity cannot be simulated.
    Join {
        craft_class: Option<CraftClass>,
    },

    /// A per-tick command from the controlling peer, either the input
    /// record or a predictive collision report
    Command {
        command: Command,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },

    /// Leave the current arena
    Leave,
}

/// Messages sent from the authority to peers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome {
        user_id: Uuid,
        server_time: u64,
    },

    /// Confirmation of arena join, carrying the resolved craft config
    Joined {
        arena_id: Uuid,
        /// Seed the arena geometry and spawns derive from
        seed: u64,
        entity_id: Uuid,
        config: CraftConfig,
        spawn_position: Vec3,
        /// All entities in the arena at join time
        players: Vec<PlayerInfo>,
    },

    /// Another player joined the arena
    PlayerJoined {
        player: PlayerInfo,
    },

    /// Player left the arena
    PlayerLeft {
        entity_id: Uuid,
        reason: String,
    },

    /// The arena switched to running
    ArenaStarted {
        tick: u64,
    },

    /// Authoritative result for one input tick, the peer reconciles
    /// against this
    StepResult {
        entity_id: Uuid,
        result: SimulationResult,
        energy: u8,
    },

    /// A craft fired; consumed by the render/audio collaborator
    Fired {
        entity_id: Uuid,
        tick: u64,
        position: Vec3,
        direction: Vec3,
    },

    /// Periodic full-state snapshot
    Snapshot {
        tick: u64,
        crafts: Vec<CraftSnapshot>,
    },

    /// Error message
    Error {
        code: String,
        message: String,
    },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

/// Entity info for the join roster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub entity_id: Uuid,
    pub craft_class: CraftClass,
}

/// Read-only per-entity view carried in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CraftSnapshot {
    pub entity_id: Uuid,
    pub position: Vec3,
    pub velocity: Vec3,
    pub acceleration: Vec3,
    /// Stored energy (0-100)
    pub energy: u8,
    /// Highest input tick the authority has applied
    pub last_input_tick: u64,
}
