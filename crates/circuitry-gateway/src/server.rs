//! Gateway server: dispatch task, broker and the WebSocket front door

use crate::broker::Broker;
use crate::router::ProtocolRouter;
use crate::service::{run_service, ServiceOptions, ServiceStatus};
use crate::ws::{handle_connection, GatewayState};
use axum::{
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use circuitry_core::ServiceConfig;
use circuitry_engine::CircuitRegistry;
use circuitry_gadgets::create_default_registry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

pub struct GatewayOptions {
    pub config: ServiceConfig,
    /// Build `config.circuits` before connecting.
    pub bootstrap: bool,
    /// Echo `print` gadget output to stdout.
    pub echo_prints: bool,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            config: ServiceConfig::default(),
            bootstrap: true,
            echo_prints: true,
        }
    }
}

/// Router over the default gadget kinds, with startup circuits applied.
pub fn build_router(options: &GatewayOptions) -> circuitry_core::Result<ProtocolRouter> {
    options.config.validate()?;
    let kinds = create_default_registry();
    info!("Registered gadget kinds: {:?}", kinds.list());

    let mut router = ProtocolRouter::new(options.config.topics(), CircuitRegistry::new(kinds))
        .with_echo_prints(options.echo_prints);
    if options.bootstrap {
        router.bootstrap(&options.config.circuits)?;
    }
    Ok(router)
}

/// Start the broker and the dispatch task. Must be called inside a runtime.
pub fn spawn_gateway(options: &GatewayOptions) -> anyhow::Result<Arc<GatewayState>> {
    let router = build_router(options)?;
    let broker = Broker::new();
    let (status_tx, status_rx) = watch::channel(ServiceStatus::default());

    tokio::spawn(run_service(
        router,
        broker.clone(),
        ServiceOptions::default(),
        status_tx,
    ));

    Ok(Arc::new(GatewayState {
        broker,
        status: status_rx,
        port: options.config.gateway.port,
        started_at: std::time::Instant::now(),
    }))
}

pub fn app(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/circuits", get(circuits_handler))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

/// Serve `app` on an already bound listener.
pub async fn serve(listener: TcpListener, state: Arc<GatewayState>) -> anyhow::Result<()> {
    axum::serve(listener, app(state)).await?;
    Ok(())
}

pub async fn start_gateway(options: GatewayOptions) -> anyhow::Result<()> {
    let state = spawn_gateway(&options)?;

    let gateway = &options.config.gateway;
    let bind_addr: SocketAddr = format!("{}:{}", gateway.bind.to_addr(), gateway.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {}", e))?;

    info!("Circuitry v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  WebSocket: ws://{}/ws", bind_addr);
    info!("  Prefix:    {}", options.config.prefix);

    let listener = TcpListener::bind(&bind_addr).await?;
    serve(listener, state).await
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let status = state.status.borrow();
    let circuits: Vec<&str> = status.circuits.iter().map(|c| c.name.as_str()).collect();
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "prefix": status.prefix,
        "connected": status.connected,
        "handled": status.handled,
        "dropped": status.dropped,
        "circuits": circuits,
        "sessions": state.broker.session_count(),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

async fn circuits_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    Json(state.status.borrow().circuits.clone())
}
