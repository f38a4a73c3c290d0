// Room simulation state: the entity list, tiles and tick counter of one simulation cell.
//
// A Room is plain data owned by exactly one scheduler task; it has no locking of its own.

use crate::domain::collision::CollisionMap;
use crate::domain::entity::{Entity, EntityId, EntityState, EntityType, Input, SessionId};
use crate::domain::math::Vector2;
use crate::domain::physics;
use crate::domain::tilemap::RoomTiles;
use crate::domain::tuning::{PLAYER_SIZE, PhysicsTuning};
use crate::domain::world::RoomTemplate;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub owner_session_id: Option<SessionId>,
    pub input: Input,
    pub position: Vector2,
    pub velocity: Vector2,
    pub size: Vector2,
    pub state: EntityState,
    pub entity_type: EntityType,
    pub entity_data: Value,
}

#[derive(Debug, Clone)]
pub struct RoomSnapshot {
    pub server_tick: u64,
    pub world_id: Arc<str>,
    pub room_id: Arc<str>,
    pub entities: Vec<EntitySnapshot>,
}

impl From<&Entity> for EntitySnapshot {
    fn from(e: &Entity) -> Self {
        Self {
            id: e.id,
            owner_session_id: e.owner.clone(),
            input: e.input,
            position: e.position,
            velocity: e.velocity,
            size: e.size,
            state: e.state.clone(),
            entity_type: e.entity_type,
            entity_data: e.entity_data.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRejected {
    UnknownEntity,
    NotOwner,
}

pub struct Room {
    world_id: Arc<str>,
    id: Arc<str>,
    entities: Vec<Entity>,
    tiles: Arc<RoomTiles>,
    collision: CollisionMap,
    tick: u64,
    tuning: PhysicsTuning,
    spawn_point: Vector2,
}

impl Room {
    pub fn new(
        world_id: Arc<str>,
        id: Arc<str>,
        tiles: RoomTiles,
        tile_size: f32,
        tuning: PhysicsTuning,
    ) -> Self {
        let collision = CollisionMap::from_tiles(&tiles, tile_size);
        Self {
            world_id,
            id,
            entities: Vec::new(),
            tiles: Arc::new(tiles),
            collision,
            tick: 0,
            tuning,
            spawn_point: Vector2::ZERO,
        }
    }

    /// Builds a fresh room from a template; template entities get new ids.
    pub fn from_template(
        world_id: Arc<str>,
        template: &RoomTemplate,
        tile_size: f32,
        tuning: PhysicsTuning,
    ) -> Self {
        let mut room = Self::new(
            world_id,
            Arc::from(template.id.as_str()),
            template.tiles.clone(),
            tile_size,
            tuning,
        );
        room.spawn_point = template.spawn_point;

        for t in &template.entities {
            let mut e = Entity::new(
                room.world_id.clone(),
                room.id.clone(),
                t.entity_type,
                t.position,
                t.size,
            );
            e.entity_data = t.entity_data.clone();
            e.is_static = t.is_static;
            room.entities.push(e);
        }
        room
    }

    pub fn id(&self) -> &Arc<str> {
        &self.id
    }

    pub fn world_id(&self) -> &Arc<str> {
        &self.world_id
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn tiles(&self) -> &Arc<RoomTiles> {
        &self.tiles
    }

    pub fn tile_size(&self) -> f32 {
        self.collision.tile_size()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Swaps the room's tiles and rebuilds the derived collision map.
    pub fn replace_tiles(&mut self, tiles: RoomTiles, tile_size: f32) {
        self.collision = CollisionMap::from_tiles(&tiles, tile_size);
        self.tiles = Arc::new(tiles);
    }

    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        entity.world_id = self.world_id.clone();
        entity.room_id = self.id.clone();
        let id = entity.id;
        self.entities.push(entity);
        id
    }

    /// Creates a player at the spawn point, bound to `owner`.
    pub fn spawn_player(&mut self, owner: SessionId) -> EntityId {
        let mut player = Entity::new(
            self.world_id.clone(),
            self.id.clone(),
            EntityType::Player,
            self.spawn_point,
            PLAYER_SIZE,
        );
        player.owner = Some(owner);
        self.add_entity(player)
    }

    /// Overwrites a player's input; only the owning session may do this.
    pub fn apply_input(
        &mut self,
        session: &str,
        entity_id: EntityId,
        input: Input,
    ) -> Result<(), InputRejected> {
        let entity = self
            .entities
            .iter_mut()
            .find(|e| e.id == entity_id && !e.remove)
            .ok_or(InputRejected::UnknownEntity)?;

        if !entity.is_driven_by(session) {
            return Err(InputRejected::NotOwner);
        }

        entity.input = input;
        entity.dirty = true;
        Ok(())
    }

    /// Flags an entity for removal at the start of the next tick. Idempotent.
    pub fn despawn(&mut self, entity_id: EntityId) -> bool {
        match self.entities.iter_mut().find(|e| e.id == entity_id) {
            Some(e) => {
                e.owner = None;
                e.remove = true;
                true
            }
            None => false,
        }
    }

    /// Runs one scheduler iteration: reap, physics, snapshot, advance the counter.
    pub fn step(&mut self) -> RoomSnapshot {
        self.entities.retain(|e| !e.remove);

        for e in self.entities.iter_mut().filter(|e| !e.is_static) {
            physics::step_entity(e, &self.collision, &self.tuning);
        }

        let snapshot = self.snapshot();
        for e in &mut self.entities {
            e.dirty = false;
        }

        self.tick += 1;
        snapshot
    }

    /// Read-consistent projection of the live entities at the current tick.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            server_tick: self.tick,
            world_id: self.world_id.clone(),
            room_id: self.id.clone(),
            entities: self
                .entities
                .iter()
                .filter(|e| !e.remove)
                .map(EntitySnapshot::from)
                .collect(),
        }
    }
}
