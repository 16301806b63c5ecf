//! Connection lifecycle: connect, request flush, response drive loop.
//!
//! Each connection serves exactly one call. The drive loop owns every piece
//! of per-connection state (the session record, the dispatcher, the idle
//! deadline) and runs on a single task, so none of it needs locking; only
//! the [`PendingRegistry`] is shared across connections.
//!
//! [`PendingRegistry`]: crate::call::PendingRegistry

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{Instant, sleep};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{error, info, trace};

use crate::call::{ErrorModelResolver, PendingRegistry};
use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::dispatch::Dispatcher;
use crate::protocol::{DecodeError, EncodedRequest, Message, PayloadItem, PayloadSize, ResponseHead, TransportError};

mod session;
use session::ResponseAccumulator;

/// Unique, stable identity of one connection for its lifetime, used to
/// correlate the connection with its pending call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One outbound connection, serving exactly one call and then discarded.
///
/// Owns the framed halves of the stream: a streaming response decoder on the
/// read side and a request encoder on the write side.
pub struct Connection {
    id: ConnectionId,
    framed_read: FramedRead<OwnedReadHalf, ResponseDecoder>,
    framed_write: FramedWrite<OwnedWriteHalf, RequestEncoder>,
}

impl Connection {
    /// Opens a new connection to `address`.
    pub(crate) async fn connect(address: SocketAddr) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(address).await.map_err(TransportError::connect)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            id: ConnectionId::next(),
            framed_read: FramedRead::with_capacity(reader, ResponseDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, RequestEncoder::new()),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Frames and flushes a request onto the connection.
    pub async fn send_request(&mut self, request: EncodedRequest) -> Result<(), TransportError> {
        self.framed_write.send(request).await.map_err(TransportError::closed_early)
    }

    /// Reads the next protocol event, for callers driving a raw connection
    /// themselves.
    pub async fn next_event(&mut self) -> Option<Result<Message<(ResponseHead, PayloadSize)>, DecodeError>> {
        self.framed_read.next().await
    }

    /// Drives this connection's single call to delivery.
    ///
    /// Takes the pending call registered under this connection's identity,
    /// flushes the request, then consumes inbound events until a terminal
    /// condition: the terminal body chunk, a framing error, the idle deadline,
    /// or the peer closing early. Whichever comes first dispatches exactly
    /// once; the connection is closed when the loop returns.
    pub(crate) async fn drive(mut self, registry: Arc<PendingRegistry>, resolver: Arc<dyn ErrorModelResolver>) {
        let id = self.id;
        let Some(call) = registry.take_if_present(id) else {
            // structurally impossible: submit registers before driving
            error!(connection = %id, "activated connection has no pending call, closing");
            return;
        };

        let (mut dispatcher, request) = Dispatcher::new(call, resolver);
        let timeout = dispatcher.timeout();
        let mut accumulator = ResponseAccumulator::new();

        if let Err(e) = self.send_request(request).await {
            error!(connection = %id, "failed to flush request: {e}");
            dispatcher.dispatch(accumulator.finish(Some(e)));
            return;
        }
        trace!(connection = %id, "request flushed, awaiting response");

        // read-idle deadline, armed from the call's timeout and pushed out on
        // every inbound event
        let idle = sleep(timeout);
        tokio::pin!(idle);

        let terminal = loop {
            tokio::select! {
                event = self.framed_read.next() => {
                    idle.as_mut().reset(Instant::now() + timeout);
                    match event {
                        Some(Ok(Message::Header((head, payload_size)))) => {
                            trace!(connection = %id, status = %head.status(), ?payload_size, "response head received");
                            accumulator.begin(head, payload_size);
                        }
                        Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => {
                            trace!(connection = %id, len = bytes.len(), "response chunk received");
                            accumulator.append(&bytes);
                        }
                        Some(Ok(Message::Payload(PayloadItem::Eof))) => break None,
                        Some(Err(e)) => {
                            error!(connection = %id, "response decode failed: {e}");
                            accumulator.record_error(e);
                            break None;
                        }
                        None => break Some(TransportError::closed_early("connection closed before terminal chunk")),
                    }
                }

                () = &mut idle => {
                    info!(connection = %id, ?timeout, "idle timeout fired, closing connection");
                    break Some(TransportError::timeout(timeout));
                }
            }
        };

        dispatcher.dispatch(accumulator.finish(terminal));
        info!(connection = %id, "call delivered, connection shutdown");
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").field("id", &self.id).finish_non_exhaustive()
    }
}
