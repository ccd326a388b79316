use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use courier_dispatch::config::{Config, LogFormat};
use courier_dispatch::error::AppError;
use courier_dispatch::routing::{DirectionsClient, DisabledRouting, RouteProvider};
use courier_dispatch::state::AppState;
use courier_dispatch::{api, engine};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;
    init_tracing(&config);

    let routes: Arc<dyn RouteProvider> = match config.routing.access_token.as_deref() {
        Some(token) => Arc::new(
            DirectionsClient::new(&config.routing, token)
                .map_err(|err| AppError::Config(format!("routing client: {err}")))?,
        ),
        None => {
            tracing::warn!("ROUTING_ACCESS_TOKEN not set; ETAs will use straight-line estimates");
            Arc::new(DisabledRouting)
        }
    };

    let (app_state, order_rx) = AppState::new(&config, routes);
    let shared_state = Arc::new(app_state);

    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::assignment::run_assignment_engine(
        shared_state.clone(),
        order_rx,
    ));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::new(config.log_level.clone());

    match config.log_format {
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
