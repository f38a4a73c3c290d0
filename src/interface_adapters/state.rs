use crate::use_cases::{SessionService, WorldManager};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    // Templates and live worlds.
    pub worlds: Arc<WorldManager>,
    // Session workflow shared by every socket.
    pub sessions: Arc<SessionService>,
    // World joined when the client does not name one.
    pub default_world_id: Arc<str>,
    pub outbox_capacity: usize,
}
