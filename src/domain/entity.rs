// Simulation entities and the per-entity input/state they carry.

use crate::domain::math::Vector2;
use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

pub type EntityId = u64;

/// Opaque session identifier used as a routing key (never a pointer to the session).
pub type SessionId = Arc<str>;

/// Returns a process-unique, monotonically increasing entity identifier.
pub fn next_entity_id() -> EntityId {
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Input {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    Idle,
    Run,
    Jump,
    Fall,
}

impl Animation {
    pub fn as_str(self) -> &'static str {
        match self {
            Animation::Idle => "idle",
            Animation::Run => "run",
            Animation::Jump => "jump",
            Animation::Fall => "fall",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    pub grounded: bool,
    pub animation: Animation,
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            grounded: false,
            animation: Animation::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Player,
    Enemy,
    Placeholder,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Player => "player",
            EntityType::Enemy => "enemy",
            EntityType::Placeholder => "placeholder",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "player" => Some(EntityType::Player),
            "enemy" => Some(EntityType::Enemy),
            "placeholder" => Some(EntityType::Placeholder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub world_id: Arc<str>,
    pub room_id: Arc<str>,

    pub input: Input,
    pub position: Vector2,
    pub velocity: Vector2,
    pub size: Vector2,
    pub state: EntityState,

    pub entity_type: EntityType,
    pub entity_data: Value,

    // Session currently driving this entity (players only).
    pub owner: Option<SessionId>,
    // Static entities are reported in snapshots but never stepped.
    pub is_static: bool,

    pub dirty: bool,
    pub remove: bool,
}

impl Entity {
    pub fn new(
        world_id: Arc<str>,
        room_id: Arc<str>,
        entity_type: EntityType,
        position: Vector2,
        size: Vector2,
    ) -> Self {
        Self {
            id: next_entity_id(),
            world_id,
            room_id,
            input: Input::default(),
            position,
            velocity: Vector2::ZERO,
            size,
            state: EntityState::default(),
            entity_type,
            entity_data: Value::Null,
            owner: None,
            is_static: false,
            dirty: true,
            remove: false,
        }
    }

    /// Returns true if `session` is the bound driver of this player entity.
    pub fn is_driven_by(&self, session: &str) -> bool {
        self.entity_type == EntityType::Player
            && self.owner.as_deref().is_some_and(|owner| owner == session)
    }
}
