// Wire protocol DTOs and conversions for the public WebSocket.
// Every frame is a JSON text message `{ "type": ..., "data": ... }`.

use crate::domain::{EntitySnapshot, Input, RoomSnapshot, RoomTiles, Vector2};
use crate::use_cases::{RoomLoad, ServerInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Messages the server sends to connected clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    // Identity assigned to the connection after an accepted hello.
    ClientIdAssign(ClientIdAssignDto),
    ServerInfo(ServerInfoDto),
    // Everything needed to render the joined room.
    LoadRoom(LoadRoomDto),
    JoinReject(JoinRejectDto),
    // Full room state for one tick.
    RoomSnapshot(RoomSnapshotDto),
}

/// Messages the client sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    // `None` when the field is absent or not an integer.
    Hello { protocol: Option<i64> },
    PlayerTick(InputDto),
}

#[derive(Debug)]
pub enum ProtocolError {
    // Not JSON, or not a `{type, data}` envelope.
    Json(serde_json::Error),
    UnknownType(String),
    // Known type with a payload that does not match it.
    Payload {
        kind: &'static str,
        error: serde_json::Error,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Json(e) => write!(f, "invalid envelope: {e}"),
            ProtocolError::UnknownType(kind) => write!(f, "unknown message type `{kind}`"),
            ProtocolError::Payload { kind, error } => {
                write!(f, "invalid `{kind}` payload: {error}")
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct PlayerTickPayload {
    input: InputDto,
}

/// Parses one inbound text frame: the envelope first, then the payload for its type.
pub fn parse_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(ProtocolError::Json)?;

    match envelope.kind.as_str() {
        "hello" => Ok(ClientMessage::Hello {
            protocol: envelope.data.get("protocol").and_then(Value::as_i64),
        }),
        "player_tick" => {
            let payload: PlayerTickPayload =
                serde_json::from_value(envelope.data).map_err(|error| ProtocolError::Payload {
                    kind: "player_tick",
                    error,
                })?;
            Ok(ClientMessage::PlayerTick(payload.input))
        }
        _ => Err(ProtocolError::UnknownType(envelope.kind)),
    }
}

/// Button state; missing fields read as released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputDto {
    #[serde(default)]
    pub left: bool,
    #[serde(default)]
    pub right: bool,
    #[serde(default)]
    pub jump: bool,
}

impl From<InputDto> for Input {
    fn from(input: InputDto) -> Self {
        Self {
            left: input.left,
            right: input.right,
            jump: input.jump,
        }
    }
}

impl From<Input> for InputDto {
    fn from(input: Input) -> Self {
        Self {
            left: input.left,
            right: input.right,
            jump: input.jump,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientIdAssignDto {
    pub session_id: String,
    pub entity_id: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerInfoDto {
    pub version: String,
    pub protocol: i64,
}

impl From<&ServerInfo> for ServerInfoDto {
    fn from(info: &ServerInfo) -> Self {
        Self {
            version: info.version.to_string(),
            protocol: info.protocol,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JoinRejectDto {
    pub protocol: i64,
    pub version: String,
    pub message: String,
}

impl JoinRejectDto {
    pub fn new(info: &ServerInfo, message: &str) -> Self {
        Self {
            protocol: info.protocol,
            version: info.version.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Vector2Dto {
    pub x: f32,
    pub y: f32,
}

impl From<Vector2> for Vector2Dto {
    fn from(v: Vector2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EntityStateDto {
    pub grounded: bool,
    pub animation: &'static str,
}

/// One entity record inside a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct EntityDto {
    pub id: u64,
    pub owner_session_id: Option<String>,
    pub input: InputDto,
    pub position: Vector2Dto,
    pub velocity: Vector2Dto,
    pub size: Vector2Dto,
    pub state: EntityStateDto,
    pub entity_type: &'static str,
    pub entity_data: Value,
}

impl From<&EntitySnapshot> for EntityDto {
    fn from(entity: &EntitySnapshot) -> Self {
        Self {
            id: entity.id,
            owner_session_id: entity.owner_session_id.as_deref().map(str::to_string),
            input: entity.input.into(),
            position: entity.position.into(),
            velocity: entity.velocity.into(),
            size: entity.size.into(),
            state: EntityStateDto {
                grounded: entity.state.grounded,
                animation: entity.state.animation.as_str(),
            },
            entity_type: entity.entity_type.as_str(),
            entity_data: entity.entity_data.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshotDto {
    pub version: String,
    pub protocol: i64,
    pub server_tick: u64,
    pub world_id: String,
    pub room_id: String,
    pub entities: Vec<EntityDto>,
}

impl RoomSnapshotDto {
    pub fn new(snapshot: &RoomSnapshot, info: &ServerInfo) -> Self {
        Self {
            version: info.version.to_string(),
            protocol: info.protocol,
            server_tick: snapshot.server_tick,
            world_id: snapshot.world_id.to_string(),
            room_id: snapshot.room_id.to_string(),
            entities: snapshot.entities.iter().map(EntityDto::from).collect(),
        }
    }
}

/// Tile data in the same shapes world files use.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum TilesDto {
    Grid {
        width: u32,
        height: u32,
        tiles: Vec<u16>,
    },
    Layers {
        layers: BTreeMap<String, Vec<[i32; 2]>>,
    },
}

impl From<&RoomTiles> for TilesDto {
    fn from(tiles: &RoomTiles) -> Self {
        match tiles {
            RoomTiles::Grid(map) => TilesDto::Grid {
                width: map.width(),
                height: map.height(),
                tiles: map.tiles().to_vec(),
            },
            RoomTiles::Layers(layers) => TilesDto::Layers {
                layers: layers
                    .layers
                    .iter()
                    .map(|(name, cells)| {
                        (name.clone(), cells.iter().map(|&(x, y)| [x, y]).collect())
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadRoomDto {
    pub world_id: String,
    pub room_id: String,
    pub tile_size: f32,
    pub tiles: TilesDto,
    pub snapshot: RoomSnapshotDto,
}

impl LoadRoomDto {
    pub fn new(load: &RoomLoad, info: &ServerInfo) -> Self {
        Self {
            world_id: load.world_id.to_string(),
            room_id: load.room_id.to_string(),
            tile_size: load.tile_size,
            tiles: TilesDto::from(load.tiles.as_ref()),
            snapshot: RoomSnapshotDto::new(&load.snapshot, info),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Entity, EntityType, TileMap};
    use serde_json::json;
    use std::sync::Arc;

    fn info() -> ServerInfo {
        ServerInfo {
            version: Arc::from("0.1.0"),
            protocol: 1,
        }
    }

    #[test]
    fn when_hello_has_protocol_then_it_is_parsed() {
        let msg = parse_client_message(r#"{"type":"hello","data":{"protocol":1}}"#).unwrap();
        assert_eq!(msg, ClientMessage::Hello { protocol: Some(1) });
    }

    #[test]
    fn when_hello_has_no_usable_protocol_then_it_reads_as_missing() {
        for text in [
            r#"{"type":"hello"}"#,
            r#"{"type":"hello","data":{}}"#,
            r#"{"type":"hello","data":{"protocol":"1"}}"#,
        ] {
            assert_eq!(
                parse_client_message(text).unwrap(),
                ClientMessage::Hello { protocol: None },
                "{text}"
            );
        }
    }

    #[test]
    fn when_player_tick_omits_buttons_then_they_default_to_released() {
        let msg =
            parse_client_message(r#"{"type":"player_tick","data":{"input":{"right":true}}}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::PlayerTick(InputDto {
                left: false,
                right: true,
                jump: false,
            })
        );
    }

    #[test]
    fn when_frame_is_malformed_then_error_names_the_problem() {
        assert!(matches!(
            parse_client_message("not json"),
            Err(ProtocolError::Json(_))
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"dance","data":{}}"#),
            Err(ProtocolError::UnknownType(kind)) if kind == "dance"
        ));
        assert!(matches!(
            parse_client_message(r#"{"type":"player_tick","data":{"input":5}}"#),
            Err(ProtocolError::Payload { kind: "player_tick", .. })
        ));
    }

    #[test]
    fn when_reject_is_serialized_then_envelope_is_snake_case() {
        let msg = ServerMessage::JoinReject(JoinRejectDto::new(
            &info(),
            "Incorrect protocol version!",
        ));
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "join_reject",
                "data": {
                    "protocol": 1,
                    "version": "0.1.0",
                    "message": "Incorrect protocol version!"
                }
            })
        );
    }

    #[test]
    fn when_snapshot_is_serialized_then_entity_fields_are_flattened_to_wire_names() {
        let mut entity = Entity::new(
            Arc::from("w"),
            Arc::from("main"),
            EntityType::Player,
            Vector2::new(1.0, 2.0),
            Vector2::new(16.0, 16.0),
        );
        entity.owner = Some(Arc::from("s1"));
        let snapshot = RoomSnapshot {
            server_tick: 7,
            world_id: Arc::from("w"),
            room_id: Arc::from("main"),
            entities: vec![EntitySnapshot::from(&entity)],
        };

        let msg = ServerMessage::RoomSnapshot(RoomSnapshotDto::new(&snapshot, &info()));
        let value = serde_json::to_value(msg).unwrap();
        assert_eq!(value["type"], "room_snapshot");
        let data = &value["data"];
        assert_eq!(data["server_tick"], 7);
        assert_eq!(data["protocol"], 1);
        let e = &data["entities"][0];
        assert_eq!(e["owner_session_id"], "s1");
        assert_eq!(e["entity_type"], "player");
        assert_eq!(e["position"], json!({"x": 1.0, "y": 2.0}));
        assert_eq!(e["state"]["animation"], "idle");
        assert_eq!(e["input"], json!({"left": false, "right": false, "jump": false}));
    }

    #[test]
    fn when_tiles_are_a_grid_then_wire_shape_matches_world_files() {
        let grid = RoomTiles::Grid(TileMap::new(2, 1, vec![0, 3]).unwrap());
        let value = serde_json::to_value(TilesDto::from(&grid)).unwrap();
        assert_eq!(value, json!({"width": 2, "height": 1, "tiles": [0, 3]}));
    }
}
