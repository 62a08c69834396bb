//! Authority-side simulation modules

pub mod arena;
pub mod snapshot;

pub use arena::{Arena, ArenaHandle, ArenaRegistry};

use crate::ws::protocol::ClientMsg;
use uuid::Uuid;

/// A message received from a connected peer's session
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub user_id: Uuid,
    pub msg: ClientMsg,
    pub received_at: u64,
}
