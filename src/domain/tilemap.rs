// Tile maps as dense grids or sparse named layers.
//
// Binary layout (little-endian): i32 width, i32 height, then width*height u16 tile ids,
// row-major (index = y * width + x).

use std::collections::BTreeMap;

pub type TileId = u16;

/// Tile id that marks an empty cell; every other id is solid.
pub const EMPTY_TILE: TileId = 0;

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileMapError {
    NegativeDimension { width: i64, height: i64 },
    TooLarge { width: u64, height: u64 },
    SizeMismatch { expected: usize, actual: usize },
    Truncated { expected: usize, actual: usize },
    TrailingBytes { expected: usize, actual: usize },
}

impl std::fmt::Display for TileMapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileMapError::NegativeDimension { width, height } => {
                write!(f, "negative tile map dimensions {width}x{height}")
            }
            TileMapError::TooLarge { width, height } => {
                write!(f, "tile map {width}x{height} is too large")
            }
            TileMapError::SizeMismatch { expected, actual } => {
                write!(f, "expected {expected} tiles, found {actual}")
            }
            TileMapError::Truncated { expected, actual } => {
                write!(f, "tile map blob truncated: need {expected} bytes, have {actual}")
            }
            TileMapError::TrailingBytes { expected, actual } => {
                write!(
                    f,
                    "tile map blob has trailing data: expected {expected} bytes, have {actual}"
                )
            }
        }
    }
}

/// Dense, immutable-after-load grid of tile ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileMap {
    width: u32,
    height: u32,
    tiles: Vec<TileId>,
}

impl TileMap {
    pub fn new(width: u32, height: u32, tiles: Vec<TileId>) -> Result<Self, TileMapError> {
        let expected = cell_count(width, height)?;
        if tiles.len() != expected {
            return Err(TileMapError::SizeMismatch {
                expected,
                actual: tiles.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tiles(&self) -> &[TileId] {
        &self.tiles
    }

    pub fn get(&self, x: u32, y: u32) -> Option<TileId> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Solid cells in row-major order.
    pub fn solid_cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        let width = self.width.max(1) as usize;
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| **tile != EMPTY_TILE)
            .map(move |(i, _)| ((i % width) as i32, (i / width) as i32))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TileMapError> {
        if bytes.len() < HEADER_LEN {
            return Err(TileMapError::Truncated {
                expected: HEADER_LEN,
                actual: bytes.len(),
            });
        }

        let width = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let height = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if width < 0 || height < 0 {
            return Err(TileMapError::NegativeDimension {
                width: width.into(),
                height: height.into(),
            });
        }

        let (width, height) = (width as u32, height as u32);
        let count = cell_count(width, height)?;
        let expected = count
            .checked_mul(2)
            .and_then(|body| body.checked_add(HEADER_LEN))
            .ok_or(TileMapError::TooLarge {
                width: width.into(),
                height: height.into(),
            })?;

        if bytes.len() < expected {
            return Err(TileMapError::Truncated {
                expected,
                actual: bytes.len(),
            });
        }
        if bytes.len() > expected {
            return Err(TileMapError::TrailingBytes {
                expected,
                actual: bytes.len(),
            });
        }

        let tiles = bytes[HEADER_LEN..]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Self::new(width, height, tiles)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.tiles.len() * 2);
        // Dimensions were validated to fit an i32 at construction.
        buf.extend_from_slice(&(self.width as i32).to_le_bytes());
        buf.extend_from_slice(&(self.height as i32).to_le_bytes());
        for tile in &self.tiles {
            buf.extend_from_slice(&tile.to_le_bytes());
        }
        buf
    }
}

fn cell_count(width: u32, height: u32) -> Result<usize, TileMapError> {
    let too_large = TileMapError::TooLarge {
        width: width.into(),
        height: height.into(),
    };
    if width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(too_large);
    }
    (width as usize)
        .checked_mul(height as usize)
        .ok_or(too_large)
}

/// Sparse tile layers: every listed coordinate is a solid tile.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileLayers {
    pub layers: BTreeMap<String, Vec<(i32, i32)>>,
}

impl TileLayers {
    pub fn solid_cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.layers.values().flat_map(|cells| cells.iter().copied())
    }
}

/// Tile source of a room, in either representation used by world templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomTiles {
    Grid(TileMap),
    Layers(TileLayers),
}

impl RoomTiles {
    pub fn solid_cells(&self) -> Box<dyn Iterator<Item = (i32, i32)> + '_> {
        match self {
            RoomTiles::Grid(map) => Box::new(map.solid_cells()),
            RoomTiles::Layers(layers) => Box::new(layers.solid_cells()),
        }
    }
}

impl Default for RoomTiles {
    fn default() -> Self {
        RoomTiles::Layers(TileLayers::default())
    }
}
