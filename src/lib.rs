//! Client transport core for a lightweight HTTP/1.1 RPC framework
//!
//! This crate is the outbound half of an RPC client: it opens one HTTP/1.1
//! connection per call, correlates the in-flight request with its eventual
//! response, reassembles the streamed response body, and delivers the result
//! either by blocking the caller until the object is ready or by invoking a
//! callback.
//!
//! # Features
//!
//! - One connection per call, closed after delivery (no pooling, no reuse)
//! - Streaming HTTP/1.1 response decoding: content-length and chunked bodies
//! - Two delivery modes: a blocking result slot or a registered callback
//! - Per-connection read-idle timeout derived from the call's deadline
//! - Pluggable serialization and typed-error resolution seams
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use bytes::Bytes;
//! use http::Request;
//! use tracing::Level;
//!
//! use filament_transport::protocol::TransportError;
//! use filament_transport::{AnyObject, EncodedRequest, PendingCall, Serializer, TargetType, Transport};
//!
//! struct Utf8Serializer;
//!
//! impl Serializer for Utf8Serializer {
//!     fn deserialize(&self, _target: TargetType, bytes: &[u8]) -> Result<AnyObject, TransportError> {
//!         String::from_utf8(bytes.to_vec())
//!             .map(|value| Box::new(value) as AnyObject)
//!             .map_err(TransportError::serialization)
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt().with_max_level(Level::INFO).init();
//!
//!     let transport = Transport::new();
//!
//!     let address = "127.0.0.1:8080".parse().unwrap();
//!     let head = Request::builder().method("POST").uri("/rpc/echo").body(()).unwrap();
//!     let request = EncodedRequest::new(head, Bytes::from_static(b"ping"));
//!
//!     let (call, handle) = PendingCall::blocking(
//!         address,
//!         request,
//!         TargetType::of::<String>(),
//!         Duration::from_secs(3),
//!         Arc::new(Utf8Serializer),
//!     );
//!
//!     transport.submit(call);
//!
//!     match handle.outcome().await.into_result() {
//!         Ok(object) => println!("echo: {}", object.downcast::<String>().unwrap()),
//!         Err(error) => eprintln!("call failed: {error}"),
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`client`]: the [`Transport`] entry points, `open` and `submit`
//! - [`call`]: pending call records, delivery handles, the pending-call
//!   registry and the collaborator seams
//! - [`connection`]: connection lifecycle and the per-connection drive loop
//! - [`dispatch`]: the one-shot delivery state machine
//! - [`codec`]: streaming HTTP/1.1 request encoding and response decoding
//! - [`protocol`]: shared protocol types and the error taxonomy
//!
//! # Delivery semantics
//!
//! Each call reaches its delivered state exactly once, from whichever
//! terminal condition wins: the terminal body chunk, a framing error, the
//! idle timeout, or a connection error. Blocking callers observe a value or
//! a failure through their result slot; callback callers observe exactly one
//! of `on_response`/`on_failure`.
//!
//! # Limitations
//!
//! - HTTP/1.1 only
//! - No connection pooling or reuse, no retries, no request pipelining
//! - Maximum response head size: 8KB, maximum number of headers: 64

pub mod call;
pub mod client;
pub mod codec;
pub mod connection;
pub mod dispatch;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;

pub use call::{AnyObject, CallArgs, CallHandle, CallInfo, CallOutcome, ErrorModelResolver, NoResolution, PendingCall,
               PendingRegistry, ResponseHandle, ReturnMode, RpcCallback, Serializer, TargetType, no_args};
pub use client::Transport;
pub use connection::{Connection, ConnectionId};
pub use dispatch::ResponseContext;
pub use protocol::{EncodedRequest, RequestHead, ResponseHead, TransportError};
