use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::call::{AnyObject, CallArgs, RpcCallback, Serializer, TargetType};
use crate::dispatch::ResponseContext;
use crate::protocol::{EncodedRequest, TransportError};

/// How a call's result comes back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnMode {
    /// The caller waits on a result slot.
    Blocking,
    /// The result is delivered by invoking a callback.
    Callback,
}

/// The mode-specific delivery sink of a call.
///
/// Both shapes are consumed on delivery, which is what makes a second
/// delivery structurally impossible.
pub(crate) enum Delivery {
    Blocking {
        slot: oneshot::Sender<CallOutcome>,
    },
    Callback {
        callback: Option<Arc<dyn RpcCallback>>,
        args: CallArgs,
        slot: oneshot::Sender<ResponseContext>,
    },
}

impl Delivery {
    pub(crate) fn mode(&self) -> ReturnMode {
        match self {
            Delivery::Blocking { .. } => ReturnMode::Blocking,
            Delivery::Callback { .. } => ReturnMode::Callback,
        }
    }
}

/// One outstanding request, created by the caller and handed to the transport
/// via [`Transport::submit`].
///
/// [`Transport::submit`]: crate::client::Transport::submit
pub struct PendingCall {
    pub(crate) address: SocketAddr,
    pub(crate) request: EncodedRequest,
    pub(crate) target: TargetType,
    pub(crate) timeout: Duration,
    pub(crate) serializer: Arc<dyn Serializer>,
    pub(crate) delivery: Delivery,
}

impl PendingCall {
    /// Creates a blocking-mode call.
    ///
    /// The returned [`CallHandle`] is the result slot: await
    /// [`CallHandle::outcome`], or park a non-async thread on
    /// [`CallHandle::blocking_outcome`].
    pub fn blocking(
        address: SocketAddr,
        request: EncodedRequest,
        target: TargetType,
        timeout: Duration,
        serializer: Arc<dyn Serializer>,
    ) -> (Self, CallHandle) {
        let (slot, receiver) = oneshot::channel();
        let call = Self { address, request, target, timeout, serializer, delivery: Delivery::Blocking { slot } };
        (call, CallHandle { receiver })
    }

    /// Creates a callback-mode call.
    ///
    /// With a callback registered, exactly one of its methods is invoked on
    /// delivery and the returned [`ResponseHandle`] yields `None`. Without
    /// one, the handle yields the raw [`ResponseContext`] instead.
    pub fn callback(
        address: SocketAddr,
        request: EncodedRequest,
        target: TargetType,
        timeout: Duration,
        serializer: Arc<dyn Serializer>,
        callback: Option<Arc<dyn RpcCallback>>,
        args: CallArgs,
    ) -> (Self, ResponseHandle) {
        let (slot, receiver) = oneshot::channel();
        let call = Self { address, request, target, timeout, serializer, delivery: Delivery::Callback { callback, args, slot } };
        (call, ResponseHandle { receiver })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn target(&self) -> TargetType {
        self.target
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn mode(&self) -> ReturnMode {
        self.delivery.mode()
    }
}

impl fmt::Debug for PendingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCall")
            .field("address", &self.address)
            .field("target", &self.target.name())
            .field("timeout", &self.timeout)
            .field("mode", &self.mode())
            .finish_non_exhaustive()
    }
}

/// The delivered result of a blocking-mode call.
///
/// A `Value` is either the deserialized response object or a typed
/// substitute produced by the error model resolver; a `Failure` is the raw,
/// unresolved error.
pub enum CallOutcome {
    Value(AnyObject),
    Failure(TransportError),
}

impl CallOutcome {
    pub fn is_value(&self) -> bool {
        matches!(self, CallOutcome::Value(_))
    }

    pub fn into_result(self) -> Result<AnyObject, TransportError> {
        match self {
            CallOutcome::Value(object) => Ok(object),
            CallOutcome::Failure(error) => Err(error),
        }
    }
}

impl fmt::Debug for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallOutcome::Value(_) => f.write_str("CallOutcome::Value(..)"),
            CallOutcome::Failure(error) => f.debug_tuple("CallOutcome::Failure").field(error).finish(),
        }
    }
}

/// Result slot of a blocking-mode call.
#[derive(Debug)]
pub struct CallHandle {
    receiver: oneshot::Receiver<CallOutcome>,
}

impl CallHandle {
    /// Waits for delivery.
    pub async fn outcome(self) -> CallOutcome {
        self.receiver.await.unwrap_or_else(|_| CallOutcome::Failure(TransportError::closed_early("transport dropped the call")))
    }

    /// Blocks the current thread until delivery.
    ///
    /// Must not be called from an async context; use [`CallHandle::outcome`]
    /// there.
    pub fn blocking_outcome(self) -> CallOutcome {
        self.receiver
            .blocking_recv()
            .unwrap_or_else(|_| CallOutcome::Failure(TransportError::closed_early("transport dropped the call")))
    }
}

/// Retrieval handle of a callback-mode call without a registered callback.
#[derive(Debug)]
pub struct ResponseHandle {
    receiver: oneshot::Receiver<ResponseContext>,
}

impl ResponseHandle {
    /// Waits for delivery; `None` when a registered callback consumed the
    /// result instead.
    pub async fn context(self) -> Option<ResponseContext> {
        self.receiver.await.ok()
    }
}
