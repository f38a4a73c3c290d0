// Session workflow for one client, independent of the socket it arrives on.

use crate::domain::{EntityId, Input, SessionId};
use crate::use_cases::room::{RoomError, RoomHandle};
use crate::use_cases::sessions::{BindError, EntityBinding, SessionRegistry};
use crate::use_cases::types::RoomLoad;
use std::sync::Arc;
use tracing::{debug, info};

pub const INCORRECT_PROTOCOL: &str = "Incorrect protocol version!";
pub const MISSING_PROTOCOL: &str = "Missing protocol version!";

/// Identity the server advertises to clients.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub version: Arc<str>,
    pub protocol: i64,
}

#[derive(Debug)]
pub struct JoinAccepted {
    pub session_id: SessionId,
    pub entity_id: EntityId,
    pub load: RoomLoad,
}

#[derive(Debug)]
pub enum HelloOutcome {
    Joined(JoinAccepted),
    Rejected { message: &'static str },
    // The session already controls an entity; nothing changed.
    AlreadyJoined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Queued,
    NotJoined,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    UnknownSession,
    RoomUnavailable,
}

pub struct SessionService {
    sessions: Arc<SessionRegistry>,
    server: ServerInfo,
}

impl SessionService {
    pub fn new(sessions: Arc<SessionRegistry>, server: ServerInfo) -> Self {
        Self { sessions, server }
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Handles `hello`: on a protocol match, spawns and binds a player in `room`.
    pub async fn hello(
        &self,
        session_id: &SessionId,
        protocol: Option<i64>,
        room: &RoomHandle,
    ) -> Result<HelloOutcome, SessionError> {
        if self.sessions.binding(session_id).await.is_some() {
            return Ok(HelloOutcome::AlreadyJoined);
        }

        match protocol {
            None => {
                return Ok(HelloOutcome::Rejected {
                    message: MISSING_PROTOCOL,
                });
            }
            Some(p) if p != self.server.protocol => {
                info!(%session_id, client_protocol = p, "protocol mismatch");
                return Ok(HelloOutcome::Rejected {
                    message: INCORRECT_PROTOCOL,
                });
            }
            Some(_) => {}
        }

        let endpoint = self
            .sessions
            .take_endpoint(session_id)
            .await
            .ok_or(SessionError::UnknownSession)?;
        let ack = room
            .spawn_player(endpoint)
            .await
            .map_err(|_| SessionError::RoomUnavailable)?;

        let binding = EntityBinding {
            entity_id: ack.entity_id,
            room: room.clone(),
        };
        if let Err(err) = self.sessions.bind(session_id, binding).await {
            // Compensate so a failed bind never leaves an unowned player behind.
            let _ = room.despawn(ack.entity_id).await;
            return match err {
                BindError::AlreadyBound => Ok(HelloOutcome::AlreadyJoined),
                BindError::UnknownSession | BindError::EntityOwned => {
                    Err(SessionError::UnknownSession)
                }
            };
        }

        info!(%session_id, entity_id = ack.entity_id, room_id = %room.room_id, "session joined");
        Ok(HelloOutcome::Joined(JoinAccepted {
            session_id: session_id.clone(),
            entity_id: ack.entity_id,
            load: ack.load,
        }))
    }

    /// Routes a `player_tick` to the session's own entity, if it has one.
    pub async fn player_tick(&self, session_id: &SessionId, input: Input) -> TickOutcome {
        let Some(binding) = self.sessions.binding(session_id).await else {
            return TickOutcome::NotJoined;
        };

        match binding
            .room
            .send_input(session_id.clone(), binding.entity_id, input)
        {
            Ok(()) => TickOutcome::Queued,
            Err(RoomError::Busy) | Err(RoomError::Closed) => TickOutcome::Dropped,
        }
    }

    /// Tears the session down and flags its entity for removal. Safe to call repeatedly.
    pub async fn disconnect(&self, session_id: &SessionId) {
        let Some(binding) = self.sessions.remove(session_id).await else {
            return;
        };

        if let Err(err) = binding.room.despawn(binding.entity_id).await {
            debug!(%session_id, entity_id = binding.entity_id, ?err, "room gone during despawn");
        }
    }
}
