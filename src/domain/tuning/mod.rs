pub mod player;

pub use player::{PLAYER_SIZE, PhysicsTuning};
