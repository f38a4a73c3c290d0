// Per-room scheduler: one task owns the Room and is its only writer.
//
// Other tasks talk to it through `RoomHandle`, which queues `RoomCommand`s. Each timer
// tick the task reaps removed entities, runs physics, builds a snapshot, pushes it to the
// room's player sessions and advances the tick counter.

use crate::domain::{EntityId, EntityType, Input, Room, RoomSnapshot, SessionId};
use crate::use_cases::types::{
    DeliveryError, RoomCommand, RoomLoad, SessionEndpoint, SnapshotFrame, SpawnAck,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, info, info_span, warn};

const LOG_THROTTLE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
    // The room task has stopped.
    Closed,
    // The command queue is full.
    Busy,
}

struct IdleRoom {
    room: Room,
    commands: mpsc::Receiver<RoomCommand>,
}

enum Slot {
    Idle(Box<IdleRoom>),
    Running,
    Stopped,
}

/// Cloneable access to a room's scheduler task.
#[derive(Clone)]
pub struct RoomHandle {
    /// Live world this room belongs to.
    pub world_id: Arc<str>,
    /// Room id reported in snapshots.
    pub room_id: Arc<str>,
    /// Key of the room inside its world.
    pub name: Arc<str>,
    commands: mpsc::Sender<RoomCommand>,
    slot: Arc<Mutex<Slot>>,
    shutdown: Arc<Notify>,
}

impl RoomHandle {
    /// Wraps a room in an idle scheduler; call `start` to begin ticking.
    pub fn new(name: Arc<str>, room: Room, command_capacity: usize) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(command_capacity);
        Self {
            world_id: room.world_id().clone(),
            room_id: room.id().clone(),
            name,
            commands: commands_tx,
            slot: Arc::new(Mutex::new(Slot::Idle(Box::new(IdleRoom {
                room,
                commands: commands_rx,
            })))),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn state(&self) -> SchedulerState {
        match *self.slot.lock().unwrap_or_else(PoisonError::into_inner) {
            Slot::Idle(_) => SchedulerState::Idle,
            Slot::Running => SchedulerState::Running,
            Slot::Stopped => SchedulerState::Stopped,
        }
    }

    /// Starts the scheduler loop. Returns false if it was already started or stopped.
    pub fn start(&self, tick_interval: Duration) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = match std::mem::replace(&mut *slot, Slot::Running) {
            Slot::Idle(idle) => idle,
            other => {
                *slot = other;
                return false;
            }
        };

        let IdleRoom { room, commands } = *idle;
        let span = info_span!("room", world_id = %self.world_id, room_id = %self.room_id);
        tokio::spawn(
            room_task(
                room,
                commands,
                tick_interval,
                self.shutdown.clone(),
                self.slot.clone(),
            )
            .instrument(span),
        );
        true
    }

    /// Signals the scheduler to exit at its next loop turn. Idempotent.
    pub fn stop(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match *slot {
            // Never started: drop the room right away.
            Slot::Idle(_) => *slot = Slot::Stopped,
            // Stores a permit, so the signal is not lost mid-tick.
            Slot::Running => self.shutdown.notify_one(),
            Slot::Stopped => {}
        }
    }

    /// Creates a player entity bound to the endpoint's session.
    pub async fn spawn_player(&self, endpoint: SessionEndpoint) -> Result<SpawnAck, RoomError> {
        let (reply, ack) = oneshot::channel();
        self.commands
            .send(RoomCommand::Spawn { endpoint, reply })
            .await
            .map_err(|_| RoomError::Closed)?;
        ack.await.map_err(|_| RoomError::Closed)
    }

    /// Queues an input write; drops it if the queue is full.
    pub fn send_input(
        &self,
        session_id: SessionId,
        entity_id: EntityId,
        input: Input,
    ) -> Result<(), RoomError> {
        self.commands
            .try_send(RoomCommand::Input {
                session_id,
                entity_id,
                input,
            })
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => RoomError::Busy,
                mpsc::error::TrySendError::Closed(_) => RoomError::Closed,
            })
    }

    pub async fn despawn(&self, entity_id: EntityId) -> Result<(), RoomError> {
        self.commands
            .send(RoomCommand::Despawn { entity_id })
            .await
            .map_err(|_| RoomError::Closed)
    }
}

struct RoomTask {
    room: Room,
    // Outbound endpoints of sessions that own a player in this room.
    endpoints: HashMap<SessionId, SessionEndpoint>,
    last_full_log: Instant,
    last_reject_log: Instant,
}

async fn room_task(
    room: Room,
    mut commands: mpsc::Receiver<RoomCommand>,
    tick_interval: Duration,
    shutdown: Arc<Notify>,
    slot: Arc<Mutex<Slot>>,
) {
    let now = Instant::now()
        .checked_sub(LOG_THROTTLE)
        .unwrap_or_else(Instant::now);
    let mut task = RoomTask {
        room,
        endpoints: HashMap::new(),
        last_full_log: now,
        last_reject_log: now,
    };

    // Drive the fixed-step loop at the configured tick rate.
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(tick_ms = tick_interval.as_millis() as u64, "room started");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            _ = interval.tick() => {
                let snapshot = task.room.step();
                task.deliver(snapshot);
            }
            cmd = commands.recv() => match cmd {
                Some(cmd) => task.handle_command(cmd),
                // Every handle is gone; nobody can reach this room any more.
                None => break,
            },
        }
    }

    *slot.lock().unwrap_or_else(PoisonError::into_inner) = Slot::Stopped;
    info!(
        tick = task.room.tick(),
        entities = task.room.entities().len(),
        "room stopped"
    );
}

impl RoomTask {
    fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Spawn { endpoint, reply } => {
                let session_id = endpoint.session_id().clone();
                let entity_id = self.room.spawn_player(session_id.clone());
                self.endpoints.insert(session_id.clone(), endpoint);
                info!(%session_id, entity_id, "player spawned");

                let ack = SpawnAck {
                    entity_id,
                    load: RoomLoad {
                        world_id: self.room.world_id().clone(),
                        room_id: self.room.id().clone(),
                        tile_size: self.room.tile_size(),
                        tiles: self.room.tiles().clone(),
                        snapshot: self.room.snapshot(),
                    },
                };
                if reply.send(ack).is_err() {
                    // Requester went away mid-join; undo so no orphan is left behind.
                    self.room.despawn(entity_id);
                    self.endpoints.remove(&session_id);
                    debug!(%session_id, entity_id, "spawn requester gone; despawned");
                }
            }
            RoomCommand::Input {
                session_id,
                entity_id,
                input,
            } => {
                if let Err(reason) = self.room.apply_input(&session_id, entity_id, input) {
                    if should_log(&mut self.last_reject_log) {
                        warn!(%session_id, entity_id, ?reason, "input rejected");
                    }
                }
            }
            RoomCommand::Despawn { entity_id } => {
                let owner = self.room.entity(entity_id).and_then(|e| e.owner.clone());
                if let Some(owner) = owner {
                    self.endpoints.remove(&owner);
                }
                if self.room.despawn(entity_id) {
                    info!(entity_id, "entity flagged for removal");
                }
            }
        }
    }

    // Independent attempt per recipient; one failing session never blocks the rest.
    fn deliver(&mut self, snapshot: RoomSnapshot) {
        if self.endpoints.is_empty() {
            return;
        }

        let frame: SnapshotFrame = Arc::new(snapshot);
        for entity in self.room.entities() {
            if entity.entity_type != EntityType::Player || entity.remove {
                continue;
            }
            let Some(endpoint) = entity.owner.as_ref().and_then(|o| self.endpoints.get(o)) else {
                continue;
            };

            match endpoint.try_deliver(frame.clone()) {
                Ok(()) => {}
                Err(DeliveryError::Full) => {
                    if should_log(&mut self.last_full_log) {
                        warn!(
                            session_id = %endpoint.session_id(),
                            tick = frame.server_tick,
                            "session outbox full; dropping snapshot"
                        );
                    }
                }
                Err(DeliveryError::Closed) => {
                    debug!(session_id = %endpoint.session_id(), "session outbox closed");
                }
            }
        }
    }
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}
