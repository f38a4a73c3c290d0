// World orchestration: template registry plus the live worlds built from it.

use crate::domain::tuning::PhysicsTuning;
use crate::domain::{Room, WorldTemplate};
use crate::use_cases::room::RoomHandle;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Shared configuration for spawning live worlds.
#[derive(Debug, Clone)]
pub struct WorldSettings {
    /// Capacity of each room's command queue.
    pub room_command_capacity: usize,
    /// Fixed tick interval for every room scheduler.
    pub tick_interval: Duration,
    /// Physics tuning applied to every room.
    pub tuning: PhysicsTuning,
}

/// Errors returned by world manager operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// A template with this name is already registered.
    TemplateExists,
    /// No template with this name is registered.
    UnknownTemplate,
    /// Templates must define at least one room.
    NoRooms,
}

/// A running instantiation of a world template.
#[derive(Clone)]
pub struct LiveWorld {
    pub world_id: Arc<str>,
    pub template: Arc<str>,
    pub world_type: Arc<str>,
    spawn_room: Option<Arc<str>>,
    rooms: Arc<BTreeMap<String, RoomHandle>>,
}

impl LiveWorld {
    pub fn room(&self, name: &str) -> Option<RoomHandle> {
        self.rooms.get(name).cloned()
    }

    pub fn rooms(&self) -> impl Iterator<Item = &RoomHandle> {
        self.rooms.values()
    }

    pub fn room_names(&self) -> Vec<String> {
        self.rooms.keys().cloned().collect()
    }

    /// Room new players join when the client does not pick one.
    pub fn spawn_room(&self) -> Option<RoomHandle> {
        self.spawn_room.as_deref().and_then(|name| self.room(name))
    }
}

/// Thread-safe registry of templates and live worlds.
pub struct WorldManager {
    /// Settings applied to newly instantiated worlds.
    settings: WorldSettings,
    templates: RwLock<HashMap<String, Arc<WorldTemplate>>>,
    worlds: RwLock<HashMap<Arc<str>, LiveWorld>>,
}

impl WorldManager {
    pub fn new(settings: WorldSettings) -> Self {
        Self {
            settings,
            templates: RwLock::new(HashMap::new()),
            worlds: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub async fn register_template(
        &self,
        name: impl Into<String>,
        template: WorldTemplate,
    ) -> Result<(), WorldError> {
        if template.rooms.is_empty() {
            return Err(WorldError::NoRooms);
        }

        let name = name.into();
        let mut templates = self.templates.write().await;
        if templates.contains_key(&name) {
            return Err(WorldError::TemplateExists);
        }
        info!(template = %name, rooms = template.rooms.len(), "world template registered");
        templates.insert(name, Arc::new(template));
        Ok(())
    }

    pub async fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.templates.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Clones a template's rooms into a new live world and starts one scheduler per room.
    pub async fn instantiate(&self, template_name: &str) -> Result<LiveWorld, WorldError> {
        let template = self
            .templates
            .read()
            .await
            .get(template_name)
            .cloned()
            .ok_or(WorldError::UnknownTemplate)?;

        let world_id: Arc<str> = Arc::from(Uuid::new_v4().to_string());
        let rooms: BTreeMap<String, RoomHandle> = template
            .rooms
            .iter()
            .map(|(name, room_template)| {
                let room = Room::from_template(
                    world_id.clone(),
                    room_template,
                    template.tile_size,
                    self.settings.tuning,
                );
                let handle = RoomHandle::new(
                    Arc::from(name.as_str()),
                    room,
                    self.settings.room_command_capacity,
                );
                (name.clone(), handle)
            })
            .collect();

        for handle in rooms.values() {
            handle.start(self.settings.tick_interval);
        }

        let world = LiveWorld {
            world_id: world_id.clone(),
            template: Arc::from(template_name),
            world_type: Arc::from(template.world_type.as_str()),
            spawn_room: template.spawn_room_name().map(Arc::from),
            rooms: Arc::new(rooms),
        };

        self.worlds
            .write()
            .await
            .insert(world_id.clone(), world.clone());
        info!(%world_id, template = template_name, "world instantiated");
        Ok(world)
    }

    pub async fn get_world(&self, world_id: &str) -> Option<LiveWorld> {
        self.worlds.read().await.get(world_id).cloned()
    }

    pub async fn get_room(&self, world_id: &str, room_name: &str) -> Option<RoomHandle> {
        self.get_world(world_id).await?.room(room_name)
    }

    /// Resolves a join target; a missing room name means the world's spawn room.
    pub async fn resolve_room(
        &self,
        world_id: &str,
        room_name: Option<&str>,
    ) -> Option<RoomHandle> {
        let world = self.get_world(world_id).await?;
        match room_name {
            Some(name) => world.room(name),
            None => world.spawn_room(),
        }
    }

    pub async fn world_count(&self) -> usize {
        self.worlds.read().await.len()
    }

    /// Stops every room of a live world and forgets it. Returns false if unknown.
    pub async fn shutdown_world(&self, world_id: &str) -> bool {
        let Some(world) = self.worlds.write().await.remove(world_id) else {
            return false;
        };
        for room in world.rooms() {
            room.stop();
        }
        info!(%world_id, "world shut down");
        true
    }

    pub async fn shutdown_all(&self) {
        let worlds: Vec<LiveWorld> = self.worlds.write().await.drain().map(|(_, w)| w).collect();
        for world in &worlds {
            for room in world.rooms() {
                room.stop();
            }
        }
        info!(count = worlds.len(), "all worlds shut down");
    }
}
