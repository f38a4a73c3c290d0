// Framework bootstrap for the platformer server runtime.

use crate::domain::tuning::PhysicsTuning;
use crate::frameworks::{config, loader};
use crate::interface_adapters::net::{create_world_handler, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{ServerInfo, SessionRegistry, SessionService, WorldManager, WorldSettings};

use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;
    let worlds = state.worlds.clone();

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/worlds", post(create_world_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        });

    worlds.shutdown_all().await;
    served
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a signal handler the server runs until the process is killed.
        tracing::warn!(error = %e, "failed to install ctrl-c handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn build_state() -> Result<Arc<AppState>> {
    let tick_interval = config::tick_interval();
    let worlds = Arc::new(WorldManager::new(WorldSettings {
        room_command_capacity: config::ROOM_COMMAND_CAPACITY,
        tick_interval,
        tuning: PhysicsTuning::default(),
    }));
    tracing::debug!(
        tick_ms = tick_interval.as_millis() as u64,
        "world settings configured"
    );

    let mut templates = match config::worlds_dir() {
        Some(dir) => loader::load_worlds_dir(&dir).map_err(|e| {
            tracing::error!(dir = %dir.display(), error = %e, "failed to load world templates");
            std::io::Error::other(format!("failed to load world templates: {e}"))
        })?,
        None => Vec::new(),
    };
    if !templates.iter().any(|(name, _)| name == loader::BUILTIN_LOBBY) {
        templates.push((loader::BUILTIN_LOBBY.to_string(), loader::builtin_lobby()));
    }

    for (name, template) in templates {
        worlds
            .register_template(name.clone(), template)
            .await
            .map_err(|e| std::io::Error::other(format!("template `{name}`: {e:?}")))?;
    }

    // The default world exists for the whole process lifetime.
    let default_template = config::default_world();
    let default_world = worlds.instantiate(&default_template).await.map_err(|e| {
        std::io::Error::other(format!(
            "failed to start default world `{default_template}`: {e:?}"
        ))
    })?;

    let sessions = Arc::new(SessionService::new(
        Arc::new(SessionRegistry::new()),
        ServerInfo {
            version: Arc::from(config::SERVER_VERSION),
            protocol: config::protocol_version(),
        },
    ));

    Ok(Arc::new(AppState {
        worlds,
        sessions,
        default_world_id: default_world.world_id.clone(),
        outbox_capacity: config::SESSION_OUTBOX_CAPACITY,
    }))
}
