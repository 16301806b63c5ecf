//! Caller-side call records and the collaborator seams.
//!
//! A [`PendingCall`] describes one outstanding request: where it goes, the
//! marshaled request, what type the response deserializes into, how long to
//! wait, and how the result comes back ([`ReturnMode`]). The two delivery
//! modes are modeled as distinct payload shapes: a settable result slot
//! (blocking) and a callback-plus-arguments sink (callback).
//!
//! Serialization and typed-error resolution are not the transport's business;
//! they are consumed through the [`Serializer`] and [`ErrorModelResolver`]
//! traits.

use std::any::{Any, TypeId, type_name};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::protocol::{ResponseHead, TransportError};

mod pending;
pub use pending::CallHandle;
pub use pending::CallOutcome;
pub use pending::PendingCall;
pub use pending::ResponseHandle;
pub use pending::ReturnMode;
pub(crate) use pending::Delivery;

mod registry;
pub use registry::PendingRegistry;

/// A type-erased result object produced by a [`Serializer`] or an
/// [`ErrorModelResolver`].
pub type AnyObject = Box<dyn Any + Send>;

/// The original call arguments, passed back to a callback on delivery.
pub type CallArgs = Arc<Vec<Box<dyn Any + Send + Sync>>>;

/// Shorthand for a call without arguments to echo back.
pub fn no_args() -> CallArgs {
    Arc::new(Vec::new())
}

/// The declared result type of a call, used by the serializer and the error
/// model resolver to pick a concrete shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetType {
    id: TypeId,
    name: &'static str,
}

impl TargetType {
    pub fn of<T: Any>() -> Self {
        Self { id: TypeId::of::<T>(), name: type_name::<T>() }
    }

    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Descriptive context of a call, handed to callbacks alongside the result.
#[derive(Clone, Copy, Debug)]
pub struct CallInfo {
    pub target: TargetType,
    pub address: SocketAddr,
    pub timeout: Duration,
}

/// Deserializes response bodies into the call's declared result type.
pub trait Serializer: Send + Sync {
    /// Fails with [`TransportError::Serialization`].
    fn deserialize(&self, target: TargetType, bytes: &[u8]) -> Result<AnyObject, TransportError>;
}

/// Translates raw transport errors and non-ok responses into typed domain
/// objects.
///
/// Returning `None` leaves the raw error to be delivered as the failure.
pub trait ErrorModelResolver: Send + Sync {
    fn resolve(&self, target: TargetType, error: &TransportError, head: Option<&ResponseHead>, body: &[u8]) -> Option<AnyObject>;
}

/// Resolver that never substitutes a typed object; raw errors pass through.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResolution;

impl ErrorModelResolver for NoResolution {
    fn resolve(&self, _target: TargetType, _error: &TransportError, _head: Option<&ResponseHead>, _body: &[u8]) -> Option<AnyObject> {
        None
    }
}

/// Receives the result of a callback-mode call.
///
/// Exactly one of the two methods is invoked per call.
pub trait RpcCallback: Send + Sync {
    fn on_response(&self, call: &CallInfo, args: &CallArgs, object: AnyObject);

    fn on_failure(&self, call: &CallInfo, args: &CallArgs, error: TransportError);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_type_identity() {
        let target = TargetType::of::<String>();

        assert!(target.is::<String>());
        assert!(!target.is::<u64>());
        assert_eq!(target, TargetType::of::<String>());
        assert!(target.name().contains("String"));
    }
}
