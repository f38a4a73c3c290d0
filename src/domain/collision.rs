// Derived, read-only list of solid tile rectangles used by the physics step.

use crate::domain::math::Vector2;
use crate::domain::tilemap::RoomTiles;

pub const DEFAULT_TILE_SIZE: f32 = 16.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollisionMap {
    tile_size: f32,
    // Top-left corners in world units.
    tiles: Vec<Vector2>,
}

impl CollisionMap {
    pub fn from_tiles(tiles: &RoomTiles, tile_size: f32) -> Self {
        let tiles = tiles
            .solid_cells()
            .map(|(x, y)| Vector2::new(x as f32 * tile_size, y as f32 * tile_size))
            .collect();
        Self { tile_size, tiles }
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tiles(&self) -> &[Vector2] {
        &self.tiles
    }
}
