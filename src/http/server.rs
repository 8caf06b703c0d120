//! Connection server.
//!
//! # Responsibilities
//! - Accept downstream connections from the bounded listener
//! - Run one task per connection through the relay handler
//! - Attach connection/request IDs to every log line of that task
//! - Stop accepting on shutdown and drain in-flight connections
//!
//! # Design Decisions
//! - Tasks share nothing but the read-only handler
//! - A failing connection never affects the accept loop

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::net::{ConnectionPermit, ConnectionTracker, Listener};
use crate::observability::metrics;
use crate::relay::{RelayHandler, RelayOutcome};

/// Back-off after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Accept loop feeding the relay handler.
#[derive(Debug, Clone)]
pub struct RelayServer {
    handler: Arc<RelayHandler>,
    tracker: ConnectionTracker,
    shutdown_grace: Duration,
}

impl RelayServer {
    /// Create a new server with the given configuration.
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_handler(
            RelayHandler::new(config),
            Duration::from_secs(config.timeouts.shutdown_grace_secs),
        )
    }

    pub fn with_handler(handler: RelayHandler, shutdown_grace: Duration) -> Self {
        Self {
            handler: Arc::new(handler),
            tracker: ConnectionTracker::new(),
            shutdown_grace,
        }
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Serve until `shutdown` fires, then drain in-flight connections.
    pub async fn run(self, listener: Listener, mut shutdown: broadcast::Receiver<()>) {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(address = %addr, "Relay server starting");
        }

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => self.spawn_connection(stream, peer, permit),
                    Err(e) => {
                        tracing::warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        drop(listener);
        let remaining = self.tracker.drain(self.shutdown_grace).await;
        if remaining > 0 {
            tracing::warn!(remaining, "Shutdown grace elapsed with connections still open");
        }
        tracing::info!("Relay server stopped");
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        let guard = self.tracker.track();
        let handler = Arc::clone(&self.handler);
        let span = tracing::info_span!(
            "connection",
            connection_id = %guard.id(),
            request_id = %Uuid::new_v4(),
            peer = %peer,
        );

        tokio::spawn(
            async move {
                let start = Instant::now();
                let outcome = handler.handle(stream).await;
                metrics::record_request(outcome.metric_label(), start);
                log_outcome(&outcome, start);
                drop(guard);
                drop(permit);
            }
            .instrument(span),
        );
    }
}

fn log_outcome(outcome: &RelayOutcome, start: Instant) {
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match outcome {
        RelayOutcome::Relayed {
            candidate,
            content_type,
            bytes,
        } => tracing::info!(
            status = 200,
            candidate = %candidate,
            content_type = %content_type,
            bytes,
            elapsed_ms,
            "Relayed image"
        ),
        RelayOutcome::Truncated {
            candidate,
            expected,
            error,
        } => tracing::warn!(
            status = 200,
            candidate = %candidate,
            expected,
            delivered = error.delivered(),
            elapsed_ms,
            "Relay truncated"
        ),
        RelayOutcome::ClientGone { candidate, error } => tracing::info!(
            candidate = %candidate,
            error = %error,
            elapsed_ms,
            "Client disconnected"
        ),
        RelayOutcome::NotFound(reason) => tracing::info!(
            status = 404,
            reason = ?reason,
            elapsed_ms,
            "Not found"
        ),
    }
}
