//! Transport entry points: `open` a raw connection, or `submit` a call.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::error;

use crate::call::{ErrorModelResolver, NoResolution, PendingCall, PendingRegistry};
use crate::connection::Connection;
use crate::dispatch::{Dispatcher, ResponseContext};
use crate::protocol::TransportError;

/// The connection factory and public face of the transport.
///
/// Opens a fresh connection for every submitted call (no pooling, no reuse)
/// and wires its delivery path. Cloning is cheap and every clone shares the
/// same registry and resolver.
#[derive(Clone)]
pub struct Transport {
    registry: Arc<PendingRegistry>,
    resolver: Arc<dyn ErrorModelResolver>,
}

impl Transport {
    /// Creates a transport that delivers raw errors without typed
    /// resolution.
    pub fn new() -> Self {
        Self::with_resolver(Arc::new(NoResolution))
    }

    /// Creates a transport that offers every error to `resolver` before
    /// delivering it.
    pub fn with_resolver(resolver: Arc<dyn ErrorModelResolver>) -> Self {
        Self { registry: Arc::new(PendingRegistry::new()), resolver }
    }

    /// Opens a raw connection to `address`, for callers that need the
    /// transport handle directly.
    pub async fn open(&self, address: SocketAddr) -> Result<Connection, TransportError> {
        Connection::connect(address).await
    }

    /// Submits a call; never blocks the calling thread.
    ///
    /// Connects to the call's target address, registers the call under the
    /// new connection's identity, flushes the encoded request and drives the
    /// connection to delivery, all on a spawned task. A connect failure is
    /// delivered through the same dispatch path as any other terminal
    /// condition, never dropped.
    pub fn submit(&self, call: PendingCall) {
        let registry = Arc::clone(&self.registry);
        let resolver = Arc::clone(&self.resolver);

        tokio::spawn(async move {
            let address = call.address();
            match Connection::connect(address).await {
                Ok(connection) => {
                    // put strictly precedes the request flush inside drive
                    registry.put(connection.id(), call);
                    connection.drive(registry, resolver).await;
                }
                Err(e) => {
                    error!(%address, "connect failed: {e}");
                    let (mut dispatcher, _request) = Dispatcher::new(call, resolver);
                    dispatcher.dispatch(ResponseContext::failed(e));
                }
            }
        });
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}
