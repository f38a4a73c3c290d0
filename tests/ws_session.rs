mod support;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(path_and_query: &str) -> Ws {
    let (ws, _) = connect_async(support::ws_url(path_and_query))
        .await
        .expect("websocket connect");
    ws
}

async fn send(ws: &mut Ws, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send frame");
}

// Next text frame as JSON, skipping control frames.
async fn next_json(ws: &mut Ws) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("frame in time")
            .expect("stream open")
            .expect("valid frame");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("json frame");
        }
    }
}

#[tokio::test]
async fn test_hello_joins_and_streams_snapshots() {
    let mut ws = connect("/ws").await;
    send(&mut ws, json!({ "type": "hello", "data": { "protocol": 1 } })).await;

    let assign = next_json(&mut ws).await;
    assert_eq!(assign["type"], "client_id_assign");
    let entity_id = assign["data"]["entity_id"].as_u64().expect("entity id");
    let session_id = assign["data"]["session_id"].as_str().expect("session id").to_string();

    let info = next_json(&mut ws).await;
    assert_eq!(info["type"], "server_info");
    assert_eq!(info["data"]["protocol"], 1);

    let load = next_json(&mut ws).await;
    assert_eq!(load["type"], "load_room");
    assert_eq!(load["data"]["room_id"], "main");
    let me = load["data"]["snapshot"]["entities"]
        .as_array()
        .expect("entities")
        .iter()
        .find(|e| e["id"].as_u64() == Some(entity_id))
        .cloned()
        .expect("own player in initial snapshot");
    assert_eq!(me["entity_type"], "player");
    assert_eq!(me["owner_session_id"], session_id.as_str());
    assert_eq!(me["position"], json!({ "x": 0.0, "y": 0.0 }));
    assert_eq!(me["velocity"], json!({ "x": 0.0, "y": 0.0 }));

    let first = next_json(&mut ws).await;
    assert_eq!(first["type"], "room_snapshot");
    let second = next_json(&mut ws).await;
    assert_eq!(
        second["data"]["server_tick"].as_u64().unwrap(),
        first["data"]["server_tick"].as_u64().unwrap() + 1
    );

    // A second hello is a no-op; snapshots keep flowing with one own player.
    send(&mut ws, json!({ "type": "hello", "data": { "protocol": 1 } })).await;
    let next = next_json(&mut ws).await;
    assert_eq!(next["type"], "room_snapshot");
    let owned = next["data"]["entities"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["owner_session_id"] == session_id.as_str())
        .count();
    assert_eq!(owned, 1);
}

#[tokio::test]
async fn test_protocol_mismatch_is_rejected() {
    let mut ws = connect("/ws").await;
    send(&mut ws, json!({ "type": "hello", "data": { "protocol": 2 } })).await;

    let reject = next_json(&mut ws).await;
    assert_eq!(reject["type"], "join_reject");
    assert_eq!(reject["data"]["protocol"], 1);
    assert_eq!(reject["data"]["message"], "Incorrect protocol version!");

    // The session stays usable and can still join with the right protocol.
    send(&mut ws, json!({ "type": "hello", "data": { "protocol": 1 } })).await;
    assert_eq!(next_json(&mut ws).await["type"], "client_id_assign");
}

#[tokio::test]
async fn test_input_moves_own_player() {
    let mut ws = connect("/ws").await;
    send(&mut ws, json!({ "type": "hello", "data": { "protocol": 1 } })).await;
    let entity_id = next_json(&mut ws).await["data"]["entity_id"]
        .as_u64()
        .expect("entity id");
    next_json(&mut ws).await;
    next_json(&mut ws).await;

    send(
        &mut ws,
        json!({ "type": "player_tick", "data": { "input": { "right": true } } }),
    )
    .await;

    for _ in 0..60 {
        let frame = next_json(&mut ws).await;
        let me = frame["data"]["entities"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["id"].as_u64() == Some(entity_id))
            .cloned()
            .expect("own player");
        if me["position"]["x"].as_f64().unwrap() > 0.0 {
            assert_eq!(me["input"]["right"], true);
            assert_eq!(me["state"]["animation"], "run");
            return;
        }
    }
    panic!("player never moved right");
}

#[tokio::test]
async fn test_malformed_input_is_ignored_and_session_survives() {
    let mut ws = connect("/ws").await;
    send(&mut ws, json!({ "type": "hello", "data": { "protocol": 1 } })).await;
    assert_eq!(next_json(&mut ws).await["type"], "client_id_assign");
    next_json(&mut ws).await;
    next_json(&mut ws).await;

    for _ in 0..12 {
        send(&mut ws, json!({ "type": "player_tick", "data": { "input": 5 } })).await;
    }

    // Drain frames queued before the bad inputs, then expect the stream to keep ticking.
    let mut last_tick = None;
    for _ in 0..10 {
        let frame = next_json(&mut ws).await;
        assert_eq!(frame["type"], "room_snapshot");
        let tick = frame["data"]["server_tick"].as_u64().expect("server tick");
        if let Some(prev) = last_tick {
            assert!(tick > prev);
        }
        last_tick = Some(tick);
    }
}

#[tokio::test]
async fn test_unknown_world_is_not_found() {
    let err = connect_async(support::ws_url("/ws?world_id=missing"))
        .await
        .expect_err("upgrade should be refused");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(res) => assert_eq!(res.status(), 404),
        other => panic!("unexpected error: {other:?}"),
    }
}
