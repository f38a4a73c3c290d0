// Domain layer: core simulation types and rules.

pub mod collision;
pub mod entity;
pub mod math;
pub mod physics;
pub mod room;
pub mod tilemap;
pub mod tuning;
pub mod world;

pub use collision::CollisionMap;
pub use entity::{Animation, Entity, EntityId, EntityState, EntityType, Input, SessionId};
pub use math::Vector2;
pub use room::{EntitySnapshot, InputRejected, Room, RoomSnapshot};
pub use tilemap::{RoomTiles, TileLayers, TileMap, TileMapError};
pub use world::{EntityTemplate, RoomTemplate, WorldTemplate};
