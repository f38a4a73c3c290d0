// World template loading: JSON world files plus binary tile map blobs they reference.

use crate::domain::tilemap::TileMapError;
use crate::domain::tuning::PLAYER_SIZE;
use crate::domain::{
    EntityTemplate, EntityType, RoomTemplate, RoomTiles, TileLayers, TileMap, Vector2,
    WorldTemplate,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const BUILTIN_LOBBY: &str = "lobby";

#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    TileMap {
        room: String,
        source: TileMapError,
    },
    UnknownEntityType {
        room: String,
        entity_type: String,
    },
    NoRooms {
        path: PathBuf,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            LoadError::Json { path, source } => write!(f, "{}: {source}", path.display()),
            LoadError::TileMap { room, source } => write!(f, "room `{room}`: {source}"),
            LoadError::UnknownEntityType { room, entity_type } => {
                write!(f, "room `{room}`: unknown entity type `{entity_type}`")
            }
            LoadError::NoRooms { path } => write!(f, "{}: world defines no rooms", path.display()),
        }
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug, Deserialize)]
struct WorldFile {
    #[serde(rename = "type")]
    world_type: String,
    #[serde(default)]
    spawn_room: Option<String>,
    #[serde(default)]
    tile_size: Option<f32>,
    #[serde(default)]
    rooms: BTreeMap<String, RoomFile>,
}

#[derive(Debug, Deserialize)]
struct RoomFile {
    // Defaults to the room's key.
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    tile_map: Option<TileMapFile>,
    #[serde(default)]
    entities: Vec<EntityFile>,
    #[serde(default)]
    spawn_point: Option<[f32; 2]>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TileMapFile {
    Grid {
        width: i64,
        height: i64,
        tiles: Vec<u16>,
    },
    Layers {
        layers: BTreeMap<String, Vec<[i32; 2]>>,
    },
    // Binary blob, relative to the world file.
    File {
        file: PathBuf,
    },
}

#[derive(Debug, Deserialize)]
struct EntityFile {
    #[serde(rename = "type")]
    entity_type: String,
    #[serde(default)]
    position: [f32; 2],
    #[serde(default)]
    size: Option<[f32; 2]>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    is_static: bool,
}

/// Loads every `*.json` world file in `dir`, keyed by file stem, in name order.
pub fn load_worlds_dir(dir: &Path) -> Result<Vec<(String, WorldTemplate)>, LoadError> {
    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(io_err)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            load_world_file(path).map(|template| (name, template))
        })
        .collect()
}

pub fn load_world_file(path: &Path) -> Result<WorldTemplate, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_world(&text, path, base_dir)
}

/// Parses a world document; `file` tile maps resolve against `base_dir`.
pub fn parse_world(text: &str, path: &Path, base_dir: &Path) -> Result<WorldTemplate, LoadError> {
    let file: WorldFile = serde_json::from_str(text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    if file.rooms.is_empty() {
        return Err(LoadError::NoRooms {
            path: path.to_path_buf(),
        });
    }

    let mut world = WorldTemplate::new(file.world_type);
    world.spawn_room = file.spawn_room;
    if let Some(tile_size) = file.tile_size.filter(|s| *s > 0.0) {
        world.tile_size = tile_size;
    }

    for (name, room) in file.rooms {
        let template = room_template(&name, room, base_dir)?;
        world.rooms.insert(name, template);
    }
    Ok(world)
}

fn room_template(name: &str, room: RoomFile, base_dir: &Path) -> Result<RoomTemplate, LoadError> {
    let tiles = match room.tile_map {
        None => RoomTiles::default(),
        Some(map) => room_tiles(name, map, base_dir)?,
    };

    let entities = room
        .entities
        .into_iter()
        .map(|e| {
            let entity_type =
                EntityType::from_name(&e.entity_type).ok_or_else(|| LoadError::UnknownEntityType {
                    room: name.to_string(),
                    entity_type: e.entity_type.clone(),
                })?;
            Ok(EntityTemplate {
                entity_type,
                position: Vector2::new(e.position[0], e.position[1]),
                size: e.size.map_or(PLAYER_SIZE, |[w, h]| Vector2::new(w, h)),
                entity_data: e.data,
                is_static: e.is_static,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    Ok(RoomTemplate {
        id: room.id.unwrap_or_else(|| name.to_string()),
        tiles,
        entities,
        spawn_point: room
            .spawn_point
            .map_or(Vector2::ZERO, |[x, y]| Vector2::new(x, y)),
    })
}

fn room_tiles(name: &str, map: TileMapFile, base_dir: &Path) -> Result<RoomTiles, LoadError> {
    let tile_err = |source| LoadError::TileMap {
        room: name.to_string(),
        source,
    };

    match map {
        TileMapFile::Grid {
            width,
            height,
            tiles,
        } => {
            if width < 0 || height < 0 {
                return Err(tile_err(TileMapError::NegativeDimension { width, height }));
            }
            let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
                return Err(tile_err(TileMapError::TooLarge {
                    width: width as u64,
                    height: height as u64,
                }));
            };
            TileMap::new(w, h, tiles).map(RoomTiles::Grid).map_err(tile_err)
        }
        TileMapFile::Layers { layers } => Ok(RoomTiles::Layers(TileLayers {
            layers: layers
                .into_iter()
                .map(|(layer, cells)| (layer, cells.into_iter().map(|[x, y]| (x, y)).collect()))
                .collect(),
        })),
        TileMapFile::File { file } => {
            let path = base_dir.join(file);
            let bytes = fs::read(&path).map_err(|source| LoadError::Io { path, source })?;
            TileMap::from_bytes(&bytes)
                .map(RoomTiles::Grid)
                .map_err(tile_err)
        }
    }
}

/// Single-room lobby with a floor under the origin spawn point and a wall at each end.
pub fn builtin_lobby() -> WorldTemplate {
    let mut layers = TileLayers::default();
    layers
        .layers
        .insert("ground".into(), (-10..=10).map(|x| (x, 1)).collect());
    layers.layers.insert(
        "walls".into(),
        (-4..=0).flat_map(|y| [(-10, y), (10, y)]).collect(),
    );

    let mut world = WorldTemplate::new(BUILTIN_LOBBY);
    world.spawn_room = Some("main".into());
    world.rooms.insert(
        "main".into(),
        RoomTemplate {
            id: "main".into(),
            tiles: RoomTiles::Layers(layers),
            entities: Vec::new(),
            spawn_point: Vector2::ZERO,
        },
    );
    world
}
