// Frameworks layer: configuration, world loading and server bootstrap.

pub mod config;
pub mod loader;
pub mod server;
