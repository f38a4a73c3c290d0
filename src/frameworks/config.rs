use std::{env, path::PathBuf, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub const ROOM_COMMAND_CAPACITY: usize = 1024;
pub const SESSION_OUTBOX_CAPACITY: usize = 64;
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_TICK_RATE: u32 = 30;
const MIN_TICK_RATE: u32 = 1;
const MAX_TICK_RATE: u32 = 240;

pub fn http_port() -> u16 {
    env::var("SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080)
}

pub fn tick_rate() -> u32 {
    parse_tick_rate(env::var("TICK_RATE").ok().as_deref())
}

fn parse_tick_rate(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(DEFAULT_TICK_RATE)
        .clamp(MIN_TICK_RATE, MAX_TICK_RATE)
}

pub fn tick_interval() -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(tick_rate()))
}

pub fn protocol_version() -> i64 {
    env::var("PROTOCOL_VERSION")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

// Directory of `*.json` world templates; the built-in lobby is used when unset.
pub fn worlds_dir() -> Option<PathBuf> {
    env::var_os("WORLDS_DIR")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub fn default_world() -> String {
    env::var("DEFAULT_WORLD")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "lobby".to_string())
}
