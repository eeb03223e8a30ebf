//! Arbiter - application entry point

use std::net::SocketAddr;

use axum::Router;
use bollard::Docker;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arbiter::{
    config::Config,
    db::{self, Store},
    handlers,
    judge::{self, SandboxRunner},
    services::lifecycle,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting arbiter v{}", env!("CARGO_PKG_VERSION"));

    tracing::info!(path = %config.database.path.display(), "Opening store");
    let store = Store::open(&config.database.path, config.database.max_connections).await?;
    db::init_schema(&store).await?;

    tracing::info!("Connecting to Docker");
    let docker = Docker::connect_with_socket_defaults()?;
    let version = docker.version().await?;
    tracing::info!(
        "Connected to Docker version: {}",
        version.version.unwrap_or_default()
    );

    let (dispatcher, job_rx) = judge::Dispatcher::new();
    let workers = config.judge.max_checks;
    let state = AppState::new(store, dispatcher, SandboxRunner::new(docker), config.clone());

    // restart recovery before anything can mutate state
    lifecycle::recover(&state).await?;

    judge::dispatcher::spawn_workers(state.clone(), job_rx, workers);
    lifecycle::spawn(state.clone());

    let app = Router::new()
        .nest("/api", handlers::routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
