//! Registry of calls awaiting their connection's response.
//!
//! Keyed by connection identity. The program order per connection is strict:
//! the call is `put` after connect succeeds and taken exactly once at the
//! connection's first registration event, before the request is flushed, so a
//! take can never race ahead of its put.

use dashmap::DashMap;
use tracing::trace;

use crate::call::PendingCall;
use crate::connection::ConnectionId;

/// Concurrency-safe map from connection identity to the call awaiting that
/// connection's response.
///
/// Shared across all connection tasks; each entry is touched by exactly two
/// operations over its lifetime, one `put` and one `take_if_present`.
#[derive(Debug, Default)]
pub struct PendingRegistry {
    calls: DashMap<ConnectionId, PendingCall>,
}

impl PendingRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    /// Associates `call` with a freshly connected `id`.
    pub fn put(&self, id: ConnectionId, call: PendingCall) {
        trace!(connection = %id, "registering pending call");
        let previous = self.calls.insert(id, call);
        debug_assert!(previous.is_none(), "connection identity reused while its call was pending");
    }

    /// Removes and returns the call registered under `id`, if any.
    ///
    /// An absent entry is not fatal to the registry; the caller decides what
    /// a missing association means.
    pub fn take_if_present(&self, id: ConnectionId) -> Option<PendingCall> {
        self.calls.remove(&id).map(|(_, call)| call)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.calls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{TargetType, no_args};
    use crate::protocol::EncodedRequest;
    use bytes::Bytes;
    use http::Request;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    struct NullSerializer;

    impl crate::call::Serializer for NullSerializer {
        fn deserialize(&self, _target: TargetType, _bytes: &[u8]) -> Result<crate::call::AnyObject, crate::protocol::TransportError> {
            Ok(Box::new(()))
        }
    }

    fn sample_call() -> PendingCall {
        let address: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let head = Request::builder().method("POST").uri("/rpc/ping").body(()).unwrap();
        let request = EncodedRequest::new(head, Bytes::new());
        let (call, _handle) = PendingCall::callback(
            address,
            request,
            TargetType::of::<()>(),
            Duration::from_secs(1),
            Arc::new(NullSerializer),
            None,
            no_args(),
        );
        call
    }

    #[test]
    fn take_returns_the_registered_call() {
        let registry = PendingRegistry::new();
        let id = ConnectionId::next();

        registry.put(id, sample_call());
        assert_eq!(registry.len(), 1);

        let call = registry.take_if_present(id);
        assert!(call.is_some());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn take_is_exactly_once() {
        let registry = PendingRegistry::new();
        let id = ConnectionId::next();

        registry.put(id, sample_call());
        assert!(registry.take_if_present(id).is_some());
        assert!(registry.take_if_present(id).is_none());
    }

    #[test]
    fn unrelated_connections_do_not_interfere() {
        let registry = PendingRegistry::new();
        let first = ConnectionId::next();
        let second = ConnectionId::next();

        registry.put(first, sample_call());
        registry.put(second, sample_call());

        assert!(registry.take_if_present(second).is_some());
        assert!(registry.take_if_present(first).is_some());
    }

    #[test]
    fn take_for_unknown_identity_yields_nothing() {
        let registry = PendingRegistry::new();
        assert!(registry.take_if_present(ConnectionId::next()).is_none());
    }
}
