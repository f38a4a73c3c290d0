// World templates: the static room definitions a live world is cloned from.

use crate::domain::collision::DEFAULT_TILE_SIZE;
use crate::domain::entity::EntityType;
use crate::domain::math::Vector2;
use crate::domain::tilemap::RoomTiles;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct EntityTemplate {
    pub entity_type: EntityType,
    pub position: Vector2,
    pub size: Vector2,
    pub entity_data: Value,
    pub is_static: bool,
}

#[derive(Debug, Clone)]
pub struct RoomTemplate {
    pub id: String,
    pub tiles: RoomTiles,
    pub entities: Vec<EntityTemplate>,
    // Where new players appear.
    pub spawn_point: Vector2,
}

#[derive(Debug, Clone)]
pub struct WorldTemplate {
    pub world_type: String,
    pub spawn_room: Option<String>,
    pub tile_size: f32,
    pub rooms: BTreeMap<String, RoomTemplate>,
}

impl WorldTemplate {
    pub fn new(world_type: impl Into<String>) -> Self {
        Self {
            world_type: world_type.into(),
            spawn_room: None,
            tile_size: DEFAULT_TILE_SIZE,
            rooms: BTreeMap::new(),
        }
    }

    /// Room new players join: the configured spawn room, else the first room by name.
    pub fn spawn_room_name(&self) -> Option<&str> {
        match &self.spawn_room {
            Some(name) if self.rooms.contains_key(name) => Some(name.as_str()),
            _ => self.rooms.keys().next().map(String::as_str),
        }
    }
}
