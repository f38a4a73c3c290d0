use crate::domain::SessionId;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{
    ClientIdAssignDto, ClientMessage, InputDto, JoinRejectDto, LoadRoomDto, ProtocolError,
    RoomSnapshotDto, ServerInfoDto, ServerMessage, parse_client_message,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{
    HelloOutcome, RoomHandle, SessionError, SessionService, SnapshotFrame, TickOutcome,
};

use axum::{
    Error, Json,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, info_span, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    #[allow(dead_code)]
    Session(SessionError),
    OutboxClosed,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct JoinQuery {
    // Live world to join; the default world when omitted.
    #[serde(default)]
    world_id: Option<String>,
    // Room name inside the world; the world's spawn room when omitted.
    #[serde(default)]
    room: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<JoinQuery>,
) -> impl IntoResponse {
    let world_id = query
        .world_id
        .unwrap_or_else(|| state.default_world_id.to_string());

    let Some(room) = state
        .worlds
        .resolve_room(&world_id, query.room.as_deref())
        .await
    else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("world or room not found")),
        )
            .into_response();
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, room))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, room: RoomHandle) {
    let service = state.sessions.clone();
    let (session_id, outbox) = service.sessions().register(state.outbox_capacity).await;
    let span = info_span!(
        "conn",
        session_id = %session_id,
        world_id = %room.world_id,
        room = %room.name
    );

    async move {
        info!("client connected");
        let mut ctx = ConnCtx::new(session_id, room, service, outbox);
        if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
            warn!(error = ?e, "client loop exited with error");
        }
    }
    .instrument(span)
    .await
}

struct ConnCtx {
    session_id: SessionId,
    // Room this connection joins on hello.
    room: RoomHandle,
    service: Arc<SessionService>,
    // Snapshots pushed by the room task once a player is bound.
    outbox: mpsc::Receiver<SnapshotFrame>,

    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,

    invalid_json: u32,
    // Well-formed envelopes with a bad payload; logged, never fatal.
    invalid_payloads: u32,

    last_invalid_log: Instant,
    last_input_drop_log: Instant,

    close_frame: Option<CloseFrame>,
}

impl ConnCtx {
    fn new(
        session_id: SessionId,
        room: RoomHandle,
        service: Arc<SessionService>,
        outbox: mpsc::Receiver<SnapshotFrame>,
    ) -> Self {
        let now = Instant::now()
            .checked_sub(LOG_THROTTLE)
            .unwrap_or_else(Instant::now);
        Self {
            session_id,
            room,
            service,
            outbox,
            msgs_in: 0,
            msgs_out: 0,
            bytes_in: 0,
            bytes_out: 0,
            invalid_json: 0,
            invalid_payloads: 0,
            last_invalid_log: now,
            last_input_drop_log: now,
            close_frame: None,
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        let disconnect: bool = tokio::select! {
            // Incoming message from the client
            incoming = socket.recv() => {
                match handle_incoming_ws(socket, incoming, ctx).await {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing room snapshot
            frame = ctx.outbox.recv() => {
                match frame {
                    Some(frame) => match forward_snapshot(socket, ctx, &frame).await {
                        LoopControl::Continue => false,
                        LoopControl::Disconnect => true,
                    },
                    None => {
                        // The room dropped this session's endpoint, e.g. its world shut down.
                        ctx.close_frame = Some(CloseFrame {
                            code: close_code::AWAY,
                            reason: "room closed".into(),
                        });
                        fatal = Some(NetError::OutboxClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    disconnect_cleanup(ctx).await;

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

async fn handle_incoming_ws(
    socket: &mut WebSocket,
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match parse_client_message(&text) {
                    Ok(ClientMessage::Hello { protocol }) => {
                        handle_hello(socket, ctx, protocol).await
                    }
                    Ok(ClientMessage::PlayerTick(input)) => {
                        Ok(handle_player_tick(ctx, input).await)
                    }
                    Err(ProtocolError::UnknownType(kind)) => {
                        if should_log(&mut ctx.last_invalid_log) {
                            warn!(%kind, "unknown message type ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Err(ProtocolError::Payload { kind, error }) => {
                        ctx.invalid_payloads += 1;
                        if should_log(&mut ctx.last_invalid_log) {
                            warn!(%kind, error = %error, "malformed payload ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_log) {
                            warn!(
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn handle_hello(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    protocol: Option<i64>,
) -> Result<LoopControl, NetError> {
    let outcome = ctx.service.hello(&ctx.session_id, protocol, &ctx.room).await;
    let info = ctx.service.server_info();

    let replies = match outcome {
        Ok(HelloOutcome::Joined(joined)) => vec![
            ServerMessage::ClientIdAssign(ClientIdAssignDto {
                session_id: joined.session_id.to_string(),
                entity_id: joined.entity_id,
            }),
            ServerMessage::ServerInfo(ServerInfoDto::from(info)),
            ServerMessage::LoadRoom(LoadRoomDto::new(&joined.load, info)),
        ],
        Ok(HelloOutcome::Rejected { message }) => {
            vec![ServerMessage::JoinReject(JoinRejectDto::new(info, message))]
        }
        Ok(HelloOutcome::AlreadyJoined) => {
            if should_log(&mut ctx.last_invalid_log) {
                debug!("duplicate hello ignored");
            }
            Vec::new()
        }
        Err(e) => {
            ctx.close_frame = Some(CloseFrame {
                code: close_code::ERROR,
                reason: "room unavailable".into(),
            });
            return Err(NetError::Session(e));
        }
    };

    for msg in &replies {
        let bytes = send_message(socket, msg).await?;
        ctx.msgs_out += 1;
        ctx.bytes_out += bytes as u64;
    }
    Ok(LoopControl::Continue)
}

async fn handle_player_tick(ctx: &mut ConnCtx, input: InputDto) -> LoopControl {
    match ctx.service.player_tick(&ctx.session_id, input.into()).await {
        TickOutcome::Queued => {}
        TickOutcome::NotJoined => {
            if should_log(&mut ctx.last_invalid_log) {
                warn!("player_tick before hello ignored");
            }
        }
        TickOutcome::Dropped => {
            if should_log(&mut ctx.last_input_drop_log) {
                warn!("room command queue full; dropping input");
            }
        }
    }
    LoopControl::Continue
}

async fn forward_snapshot(
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
    frame: &SnapshotFrame,
) -> LoopControl {
    let msg = ServerMessage::RoomSnapshot(RoomSnapshotDto::new(frame, ctx.service.server_info()));
    match send_message(socket, &msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Disconnect follows immediately.
            warn!(error = ?err, "failed to send room snapshot");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) {
    ctx.service.disconnect(&ctx.session_id).await;

    debug!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        invalid_payloads = ctx.invalid_payloads,
        "connection stats"
    );
    info!("client disconnected");
}
