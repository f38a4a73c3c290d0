// Session registry: live sessions plus the session <-> entity ownership table.

use crate::domain::{EntityId, SessionId};
use crate::use_cases::room::RoomHandle;
use crate::use_cases::types::{SessionEndpoint, SnapshotFrame};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// The entity a session drives and the room that owns it.
#[derive(Clone)]
pub struct EntityBinding {
    pub entity_id: EntityId,
    pub room: RoomHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    UnknownSession,
    AlreadyBound,
    EntityOwned,
}

struct SessionRecord {
    session_id: SessionId,
    // Handed to the room on join; the room then holds the only sender, so the
    // outbox closes as soon as the room drops it.
    endpoint: Option<SessionEndpoint>,
    binding: Option<EntityBinding>,
}

#[derive(Default)]
struct SessionTable {
    sessions: HashMap<SessionId, SessionRecord>,
    // Authoritative ownership relation; kept in lockstep with `sessions`.
    owners: HashMap<EntityId, SessionId>,
}

/// Thread-safe registry of connected sessions.
#[derive(Default)]
pub struct SessionRegistry {
    table: RwLock<SessionTable>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session with a fresh id and returns the receiving half of its outbox.
    pub async fn register(
        &self,
        outbox_capacity: usize,
    ) -> (SessionId, mpsc::Receiver<SnapshotFrame>) {
        let session_id: SessionId = Arc::from(Uuid::new_v4().to_string());
        let (tx, rx) = mpsc::channel(outbox_capacity);
        let record = SessionRecord {
            session_id: session_id.clone(),
            endpoint: Some(SessionEndpoint::new(session_id.clone(), tx)),
            binding: None,
        };

        let mut table = self.table.write().await;
        table.sessions.insert(session_id.clone(), record);
        (session_id, rx)
    }

    /// Moves the session's outbound endpoint out of the registry. Yields it at most once.
    pub async fn take_endpoint(&self, session_id: &str) -> Option<SessionEndpoint> {
        let mut table = self.table.write().await;
        table
            .sessions
            .get_mut(session_id)
            .and_then(|r| r.endpoint.take())
    }

    /// Binds a session to exactly one entity, and the entity to exactly one session.
    pub async fn bind(&self, session_id: &str, binding: EntityBinding) -> Result<(), BindError> {
        let mut table = self.table.write().await;
        if table.owners.contains_key(&binding.entity_id) {
            return Err(BindError::EntityOwned);
        }

        let record = table
            .sessions
            .get_mut(session_id)
            .ok_or(BindError::UnknownSession)?;
        if record.binding.is_some() {
            return Err(BindError::AlreadyBound);
        }

        let owner = record.session_id.clone();
        let entity_id = binding.entity_id;
        record.binding = Some(binding);
        table.owners.insert(entity_id, owner);
        Ok(())
    }

    pub async fn binding(&self, session_id: &str) -> Option<EntityBinding> {
        let table = self.table.read().await;
        table
            .sessions
            .get(session_id)
            .and_then(|r| r.binding.clone())
    }

    pub async fn owner_of(&self, entity_id: EntityId) -> Option<SessionId> {
        let table = self.table.read().await;
        table.owners.get(&entity_id).cloned()
    }

    /// Deletes the session and its ownership row; returns the binding it held. Idempotent.
    pub async fn remove(&self, session_id: &str) -> Option<EntityBinding> {
        let mut table = self.table.write().await;
        let record = table.sessions.remove(session_id)?;
        let binding = record.binding?;
        table.owners.remove(&binding.entity_id);
        Some(binding)
    }

    pub async fn len(&self) -> usize {
        self.table.read().await.sessions.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
