use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::domain::tuning::PhysicsTuning;
use crate::domain::{
    EntityTemplate, EntityType, Room, RoomTemplate, RoomTiles, TileLayers, Vector2, WorldTemplate,
};
use crate::use_cases::room::RoomHandle;
use crate::use_cases::types::{SessionEndpoint, SnapshotFrame};
use crate::use_cases::worlds::WorldSettings;

// Fast tick so scheduler tests finish quickly.
pub(crate) const TEST_TICK: Duration = Duration::from_millis(5);

const FRAME_TIMEOUT: Duration = Duration::from_secs(2);

// A single room named "main" with a floor along tile row 1, under the origin spawn point.
pub(crate) fn floor_room_template() -> RoomTemplate {
    let mut layers = TileLayers::default();
    layers
        .layers
        .insert("ground".into(), (-4..12).map(|x| (x, 1)).collect());
    RoomTemplate {
        id: "main".into(),
        tiles: RoomTiles::Layers(layers),
        entities: Vec::new(),
        spawn_point: Vector2::ZERO,
    }
}

pub(crate) fn floor_template() -> WorldTemplate {
    let mut world = WorldTemplate::new("lobby");
    world.rooms.insert("main".into(), floor_room_template());
    world
}

pub(crate) fn floor_room(world_id: &str) -> Room {
    Room::from_template(
        Arc::from(world_id),
        &floor_room_template(),
        16.0,
        PhysicsTuning::default(),
    )
}

pub(crate) fn floor_room_with_enemy(world_id: &str) -> Room {
    let mut template = floor_room_template();
    template.entities.push(EntityTemplate {
        entity_type: EntityType::Enemy,
        position: Vector2::new(96.0, 0.0),
        size: Vector2::new(16.0, 16.0),
        entity_data: serde_json::Value::Null,
        is_static: false,
    });
    Room::from_template(Arc::from(world_id), &template, 16.0, PhysicsTuning::default())
}

pub(crate) fn started_room() -> RoomHandle {
    let handle = RoomHandle::new(Arc::from("main"), floor_room("w"), 64);
    handle.start(TEST_TICK);
    handle
}

pub(crate) fn endpoint(
    session_id: &str,
    capacity: usize,
) -> (SessionEndpoint, mpsc::Receiver<SnapshotFrame>) {
    let (tx, rx) = mpsc::channel(capacity);
    (SessionEndpoint::new(Arc::from(session_id), tx), rx)
}

pub(crate) async fn next_frame(rx: &mut mpsc::Receiver<SnapshotFrame>) -> SnapshotFrame {
    tokio::time::timeout(FRAME_TIMEOUT, rx.recv())
        .await
        .expect("snapshot should arrive in time")
        .expect("outbox should stay open")
}

pub(crate) fn test_world_settings() -> WorldSettings {
    WorldSettings {
        room_command_capacity: 64,
        tick_interval: TEST_TICK,
        tuning: PhysicsTuning::default(),
    }
}
