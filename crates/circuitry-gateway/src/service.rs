//! Dispatch task: owns the router and feeds it transport events one at a time

use crate::broker::Broker;
use crate::router::ProtocolRouter;
use crate::transport::{ConnectOptions, LastWill, TransportEvent};
use circuitry_engine::CircuitSummary;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Snapshot of the dispatch task, refreshed after every event.
///
/// Counters are updated every time; circuit summaries only when the router
/// reports that a create or control message went through.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ServiceStatus {
    pub prefix: String,
    pub connected: bool,
    pub handled: u64,
    pub dropped: u64,
    pub circuits: Vec<CircuitSummary>,
    /// Router revision the summaries were taken at.
    #[serde(skip)]
    summarized: Option<u64>,
}

impl ServiceStatus {
    fn refresh(&mut self, router: &ProtocolRouter, connected: bool) {
        let (handled, dropped) = router.counters();
        self.connected = connected;
        self.handled = handled;
        self.dropped = dropped;

        if self.summarized != Some(router.revision()) {
            self.prefix = router.topics().prefix().to_string();
            self.circuits = router.summaries();
            self.summarized = Some(router.revision());
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServiceOptions {
    pub client_id: String,
    pub reconnect_delay: Duration,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            client_id: "circuitry-service".to_string(),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

/// Connect the router to the broker and serve events until the task is dropped.
///
/// Each event is handled to completion before the next one is received. When
/// the session ends the task waits `reconnect_delay` and connects again; the
/// router resubscribes everything on the new session.
pub async fn run_service(
    mut router: ProtocolRouter,
    broker: Broker,
    options: ServiceOptions,
    status: watch::Sender<ServiceStatus>,
) {
    status.send_modify(|s| s.refresh(&router, false));

    loop {
        let will = LastWill::clear_retained(router.topics().registry_topic());
        let (client, mut events) =
            broker.connect(ConnectOptions::new(options.client_id.clone()).with_last_will(will));
        let mut connected = false;

        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Connected { code } => {
                    router.on_connect(&client, code);
                    connected = true;
                }
                TransportEvent::Message { topic, payload } => {
                    router.on_message(&client, &topic, &payload);
                }
                TransportEvent::Disconnected { reason } => {
                    warn!("Disconnected: {}", reason);
                    break;
                }
            }
            status.send_modify(|s| s.refresh(&router, connected));
        }

        client.abort();
        status.send_modify(|s| s.refresh(&router, false));
        info!("Reconnecting in {:?}", options.reconnect_delay);
        tokio::time::sleep(options.reconnect_delay).await;
    }
}
