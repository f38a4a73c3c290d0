// Use cases layer: room scheduling, session binding and world orchestration.

pub mod room;
pub mod session;
pub mod sessions;
pub mod types;
pub mod worlds;

#[cfg(test)]
pub(crate) mod test_support;

pub use room::{RoomError, RoomHandle, SchedulerState};
pub use session::{
    HelloOutcome, JoinAccepted, ServerInfo, SessionError, SessionService, TickOutcome,
};
pub use sessions::{BindError, EntityBinding, SessionRegistry};
pub use types::{RoomLoad, SessionEndpoint, SnapshotFrame};
pub use worlds::{LiveWorld, WorldError, WorldManager, WorldSettings};
