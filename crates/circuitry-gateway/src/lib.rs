//! Circuitry Gateway - pub/sub transport, protocol router, and WebSocket gateway

pub mod broker;
pub mod client;
pub mod router;
pub mod server;
pub mod service;
pub mod transport;
pub mod ws;

pub use broker::{Broker, BrokerClient};
pub use client::GatewayClient;
pub use router::ProtocolRouter;
pub use server::{app, build_router, spawn_gateway, start_gateway, GatewayOptions};
pub use service::{run_service, ServiceOptions, ServiceStatus};
pub use transport::{ConnectOptions, LastWill, Transport, TransportEvent};
pub use ws::GatewayState;
