//! Lobby service - routes sessions to arenas, creating them on demand

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::{Arena, ArenaHandle, ArenaRegistry, SessionInput};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Per-connection handle for routing messages
#[derive(Clone)]
pub struct PlayerConnection {
    pub user_id: Uuid,
    /// Channel the session feeds messages into
    pub input_tx: mpsc::Sender<SessionInput>,
    /// Per-player fan-out of arena broadcasts
    pub broadcast_tx: broadcast::Sender<ServerMsg>,
}

/// Lobby: assigns each connected player to an arena with free slots,
/// creating a fresh one when none has room
pub struct LobbyService {
    registry: Arc<ArenaRegistry>,
    players: DashMap<Uuid, PlayerConnection>,
    player_arenas: DashMap<Uuid, Uuid>,
    min_players: usize,
    max_players: usize,
}

impl LobbyService {
    pub fn new(registry: Arc<ArenaRegistry>, min_players: usize, max_players: usize) -> Self {
        Self {
            registry,
            players: DashMap::new(),
            player_arenas: DashMap::new(),
            min_players,
            max_players,
        }
    }

    /// Register a player connection (called when a WebSocket connects).
    /// Returns the channels the session loop reads and writes.
    pub async fn register_player(
        self: &Arc<Self>,
        user_id: Uuid,
    ) -> (mpsc::Sender<SessionInput>, broadcast::Receiver<ServerMsg>) {
        let (input_tx, mut input_rx) = mpsc::channel::<SessionInput>(64);
        let (broadcast_tx, broadcast_rx) = broadcast::channel::<ServerMsg>(256);

        self.players.insert(
            user_id,
            PlayerConnection {
                user_id,
                input_tx: input_tx.clone(),
                broadcast_tx: broadcast_tx.clone(),
            },
        );

        // Input router: session -> assigned arena. A Join picks the
        // arena first; everything else goes to the current assignment.
        let lobby = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(input) = input_rx.recv().await {
                let is_leave = matches!(input.msg, ClientMsg::Leave);

                if matches!(input.msg, ClientMsg::Join { .. })
                    && !lobby.player_arenas.contains_key(&user_id)
                {
                    let handle = lobby.assign_arena(user_id);
                    if handle.is_none() {
                        warn!(user_id = %user_id, "No arena available for join");
                        continue;
                    }
                }

                if let Some(arena_id) = lobby.player_arenas.get(&user_id).map(|r| *r) {
                    if let Some(handle) = lobby.registry.get(&arena_id) {
                        if handle.input_tx.send(input).await.is_err() {
                            warn!(user_id = %user_id, arena_id = %arena_id, "Arena input channel closed");
                            lobby.player_arenas.remove(&user_id);
                        }
                    }
                }

                if is_leave {
                    lobby.player_arenas.remove(&user_id);
                }
            }
            lobby.players.remove(&user_id);
        });

        // Broadcast router: assigned arena -> session
        let lobby = Arc::clone(self);
        let fanout_tx = broadcast_tx;
        tokio::spawn(async move {
            let mut current_rx: Option<broadcast::Receiver<ServerMsg>> = None;
            let mut current_arena: Option<Uuid> = None;

            loop {
                let assigned = lobby.player_arenas.get(&user_id).map(|r| *r);
                if assigned != current_arena {
                    current_arena = assigned;
                    current_rx = assigned
                        .and_then(|id| lobby.registry.get(&id))
                        .map(|h| h.broadcast_tx.subscribe());
                }

                if let Some(ref mut rx) = current_rx {
                    match rx.recv().await {
                        Ok(msg) => {
                            let _ = fanout_tx.send(msg);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(user_id = %user_id, lagged = n, "Broadcast receiver lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            current_rx = None;
                            current_arena = None;
                            lobby.player_arenas.remove(&user_id);
                        }
                    }
                } else {
                    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
                }

                if !lobby.players.contains_key(&user_id) {
                    break;
                }
            }
        });

        (input_tx, broadcast_rx)
    }

    /// Unregister a player (called when the WebSocket disconnects). Any
    /// commands still buffered for the entity die with the detach the
    /// session loop already sent.
    pub async fn unregister_player(&self, user_id: Uuid) {
        self.players.remove(&user_id);
        self.player_arenas.remove(&user_id);
        info!(user_id = %user_id, "Player unregistered");
    }

    /// Pick an arena with free slots for this player, creating one if
    /// every arena is full
    fn assign_arena(&self, user_id: Uuid) -> Option<ArenaHandle> {
        let handle = match self.registry.find_available(self.max_players) {
            Some(handle) => handle,
            None => self.create_arena(),
        };
        self.player_arenas.insert(user_id, handle.id);
        Some(handle)
    }

    /// Spin up a new arena task
    fn create_arena(&self) -> ArenaHandle {
        let arena_id = Uuid::new_v4();
        let seed = rand::random::<u64>();

        let (arena, handle) = Arena::new(arena_id, seed, self.min_players, self.max_players);
        self.registry.insert(handle.clone());

        info!(arena_id = %arena_id, seed, "Created new arena");

        let registry = self.registry.clone();
        tokio::spawn(async move {
            arena.run().await;
            registry.remove(&arena_id);
            info!(arena_id = %arena_id, "Arena removed from registry");
        });

        handle
    }

    pub fn connected_players(&self) -> usize {
        self.players.len()
    }

    pub fn arena_of(&self, user_id: &Uuid) -> Option<Uuid> {
        self.player_arenas.get(user_id).map(|r| *r)
    }
}
