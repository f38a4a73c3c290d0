// Use-case level commands and outputs exchanged with room tasks.

use crate::domain::{EntityId, Input, RoomSnapshot, RoomTiles, SessionId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// One tick's snapshot, shared by every recipient in the room.
pub type SnapshotFrame = Arc<RoomSnapshot>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    // The session is not draining its outbox fast enough.
    Full,
    // The session's write loop has ended.
    Closed,
}

/// Outbound side of a session, as seen by the simulation.
#[derive(Debug, Clone)]
pub struct SessionEndpoint {
    session_id: SessionId,
    tx: mpsc::Sender<SnapshotFrame>,
}

impl SessionEndpoint {
    pub fn new(session_id: SessionId, tx: mpsc::Sender<SnapshotFrame>) -> Self {
        Self { session_id, tx }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Non-blocking delivery; a slow or gone session never stalls the caller.
    pub fn try_deliver(&self, frame: SnapshotFrame) -> Result<(), DeliveryError> {
        self.tx.try_send(frame).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Everything a client needs to load the room it just joined.
#[derive(Debug, Clone)]
pub struct RoomLoad {
    pub world_id: Arc<str>,
    pub room_id: Arc<str>,
    pub tile_size: f32,
    pub tiles: Arc<RoomTiles>,
    pub snapshot: RoomSnapshot,
}

#[derive(Debug)]
pub struct SpawnAck {
    pub entity_id: EntityId,
    pub load: RoomLoad,
}

#[derive(Debug)]
pub enum RoomCommand {
    Spawn {
        endpoint: SessionEndpoint,
        reply: oneshot::Sender<SpawnAck>,
    },
    Input {
        session_id: SessionId,
        entity_id: EntityId,
        input: Input,
    },
    Despawn {
        entity_id: EntityId,
    },
}
