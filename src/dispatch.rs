//! Terminal delivery of a call's result.
//!
//! The dispatcher is a one-shot state machine: a call is awaiting its
//! response until the first terminal trigger (terminal reassembly, idle
//! timeout, or a fatal connection error) delivers it, and every later
//! trigger is a no-op. Delivery resolves the call's return mode: publish
//! into the blocking result slot, or invoke the registered callback.

use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use tracing::{error, trace};

use crate::call::{CallInfo, CallOutcome, Delivery, ErrorModelResolver, PendingCall, Serializer};
use crate::protocol::{EncodedRequest, ResponseHead, TransportError};

/// Response metadata wrapper delivered to callback-mode callers that did not
/// register a callback, and fed to the error model resolver.
///
/// Carries the parsed head (absent when the connection failed before one
/// arrived), the reassembled body bytes and the outstanding error, if any.
#[derive(Debug)]
pub struct ResponseContext {
    head: Option<ResponseHead>,
    body: Bytes,
    error: Option<TransportError>,
}

impl ResponseContext {
    pub(crate) fn new(head: Option<ResponseHead>, body: Bytes, error: Option<TransportError>) -> Self {
        Self { head, body, error }
    }

    /// Context of a call that failed before any response arrived.
    pub(crate) fn failed(error: TransportError) -> Self {
        Self { head: None, body: Bytes::new(), error: Some(error) }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.head.as_ref().map(|head| head.status())
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.head.as_ref().map(|head| head.headers())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn error(&self) -> Option<&TransportError> {
        self.error.as_ref()
    }

    pub fn into_error(self) -> Option<TransportError> {
        self.error
    }
}

/// Per-call delivery state machine.
///
/// Holds the call's delivery sink until the first dispatch consumes it;
/// `delivery` being `None` is the DELIVERED state.
pub(crate) struct Dispatcher {
    info: CallInfo,
    serializer: Arc<dyn Serializer>,
    resolver: Arc<dyn ErrorModelResolver>,
    delivery: Option<Delivery>,
}

impl Dispatcher {
    /// Splits a pending call into its dispatcher and the request to flush.
    pub(crate) fn new(call: PendingCall, resolver: Arc<dyn ErrorModelResolver>) -> (Self, EncodedRequest) {
        let PendingCall { address, request, target, timeout, serializer, delivery } = call;
        let info = CallInfo { target, address, timeout };
        (Self { info, serializer, resolver, delivery: Some(delivery) }, request)
    }

    pub(crate) fn timeout(&self) -> std::time::Duration {
        self.info.timeout
    }

    /// Delivers the call's result; a second trigger is a no-op.
    pub(crate) fn dispatch(&mut self, mut context: ResponseContext) {
        let Some(delivery) = self.delivery.take() else {
            trace!(target_type = self.info.target.name(), "call already delivered, ignoring trigger");
            return;
        };

        // a well-formed response with a status other than 200 is itself an
        // error, ranked below framing and timeout errors
        if context.error.is_none() {
            match context.status() {
                Some(StatusCode::OK) => {}
                Some(status) => context.error = Some(TransportError::non_ok_status(status)),
                None => context.error = Some(TransportError::closed_early("terminal event without response head")),
            }
        }

        match delivery {
            Delivery::Blocking { slot } => {
                let outcome = self.blocking_outcome(context);
                if slot.send(outcome).is_err() {
                    trace!(target_type = self.info.target.name(), "blocking caller gave up before delivery");
                }
            }

            Delivery::Callback { callback, args, slot } => match callback {
                Some(callback) => match context.error.take() {
                    Some(e) => callback.on_failure(&self.info, &args, e),
                    None => match self.serializer.deserialize(self.info.target, &context.body) {
                        Ok(object) => callback.on_response(&self.info, &args, object),
                        Err(e) => callback.on_failure(&self.info, &args, e),
                    },
                },
                None => {
                    if slot.send(context).is_err() {
                        trace!(target_type = self.info.target.name(), "response context receiver dropped");
                    }
                }
            },
        }
    }

    /// Resolves a blocking-mode result.
    ///
    /// Errors are offered to the error model resolver first; a typed
    /// substitute becomes the delivered value, an unresolved error is
    /// delivered as the failure. On the clean path the body deserializes
    /// into the declared target type.
    fn blocking_outcome(&self, context: ResponseContext) -> CallOutcome {
        let ResponseContext { head, body, error } = context;

        match error {
            Some(e) => match self.resolver.resolve(self.info.target, &e, head.as_ref(), &body) {
                Some(object) => CallOutcome::Value(object),
                None => {
                    error!(target_type = self.info.target.name(), "call failed: {e}");
                    CallOutcome::Failure(e)
                }
            },
            None => match self.serializer.deserialize(self.info.target, &body) {
                Ok(object) => CallOutcome::Value(object),
                Err(e) => CallOutcome::Failure(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{AnyObject, NoResolution, TargetType, no_args};
    use http::Response;
    use std::net::SocketAddr;
    use std::time::Duration;

    struct Utf8Serializer;

    impl Serializer for Utf8Serializer {
        fn deserialize(&self, _target: TargetType, bytes: &[u8]) -> Result<AnyObject, TransportError> {
            String::from_utf8(bytes.to_vec())
                .map(|value| Box::new(value) as AnyObject)
                .map_err(TransportError::serialization)
        }
    }

    struct StatusResolver;

    impl ErrorModelResolver for StatusResolver {
        fn resolve(&self, _target: TargetType, error: &TransportError, _head: Option<&ResponseHead>, body: &[u8]) -> Option<AnyObject> {
            match error {
                TransportError::NonOkStatus { .. } => Some(Box::new(format!("fault:{}", String::from_utf8_lossy(body)))),
                _ => None,
            }
        }
    }

    fn address() -> SocketAddr {
        "127.0.0.1:9999".parse().unwrap()
    }

    fn request() -> EncodedRequest {
        let head = http::Request::builder().method("POST").uri("/rpc/echo").body(()).unwrap();
        EncodedRequest::new(head, Bytes::from_static(b"ping"))
    }

    fn context(status: StatusCode, body: &'static [u8]) -> ResponseContext {
        let head = Response::builder().status(status).body(()).unwrap();
        ResponseContext::new(Some(head), Bytes::from_static(body), None)
    }

    fn blocking_call() -> (PendingCall, crate::call::CallHandle) {
        PendingCall::blocking(address(), request(), TargetType::of::<String>(), Duration::from_secs(1), Arc::new(Utf8Serializer))
    }

    #[test]
    fn ok_response_deserializes_into_target_type() {
        let (call, handle) = blocking_call();
        let (mut dispatcher, _request) = Dispatcher::new(call, Arc::new(NoResolution));

        dispatcher.dispatch(context(StatusCode::OK, b"hello"));

        let value = handle.blocking_outcome().into_result().unwrap();
        assert_eq!(*value.downcast::<String>().unwrap(), "hello");
    }

    #[test]
    fn non_ok_status_is_offered_to_the_resolver_before_deserialization() {
        let (call, handle) = blocking_call();
        let (mut dispatcher, _request) = Dispatcher::new(call, Arc::new(StatusResolver));

        dispatcher.dispatch(context(StatusCode::INTERNAL_SERVER_ERROR, b"boom"));

        let value = handle.blocking_outcome().into_result().unwrap();
        assert_eq!(*value.downcast::<String>().unwrap(), "fault:boom");
    }

    #[test]
    fn unresolved_error_is_delivered_as_failure() {
        let (call, handle) = blocking_call();
        let (mut dispatcher, _request) = Dispatcher::new(call, Arc::new(NoResolution));

        dispatcher.dispatch(context(StatusCode::INTERNAL_SERVER_ERROR, b"boom"));

        let error = handle.blocking_outcome().into_result().unwrap_err();
        assert!(matches!(error, TransportError::NonOkStatus { .. }));
    }

    #[test]
    fn deserialize_failure_surfaces_as_serialization_error() {
        let (call, handle) = blocking_call();
        let (mut dispatcher, _request) = Dispatcher::new(call, Arc::new(NoResolution));

        dispatcher.dispatch(context(StatusCode::OK, b"\xff\xfe"));

        let error = handle.blocking_outcome().into_result().unwrap_err();
        assert!(matches!(error, TransportError::Serialization { .. }));
    }

    #[test]
    fn second_trigger_is_a_no_op() {
        let (call, handle) = blocking_call();
        let (mut dispatcher, _request) = Dispatcher::new(call, Arc::new(NoResolution));

        dispatcher.dispatch(context(StatusCode::OK, b"first"));
        dispatcher.dispatch(ResponseContext::failed(TransportError::timeout(Duration::from_secs(1))));

        let value = handle.blocking_outcome().into_result().unwrap();
        assert_eq!(*value.downcast::<String>().unwrap(), "first");
    }

    #[test]
    fn timeout_reaches_the_blocking_caller() {
        let (call, handle) = blocking_call();
        let (mut dispatcher, _request) = Dispatcher::new(call, Arc::new(NoResolution));

        dispatcher.dispatch(ResponseContext::failed(TransportError::timeout(Duration::from_millis(50))));

        let error = handle.blocking_outcome().into_result().unwrap_err();
        assert!(error.is_timeout());
    }

    #[test]
    fn callback_mode_without_callback_delivers_the_context() {
        let (call, handle) = PendingCall::callback(
            address(),
            request(),
            TargetType::of::<String>(),
            Duration::from_secs(1),
            Arc::new(Utf8Serializer),
            None,
            no_args(),
        );
        let (mut dispatcher, _request) = Dispatcher::new(call, Arc::new(NoResolution));

        dispatcher.dispatch(context(StatusCode::OK, b"hello"));

        let context = futures::executor::block_on(handle.context()).unwrap();
        assert_eq!(context.status(), Some(StatusCode::OK));
        assert_eq!(context.body().as_ref(), b"hello");
        assert!(context.error().is_none());
    }
}
