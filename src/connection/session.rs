//! Per-connection response reassembly.

use bytes::BytesMut;

use crate::dispatch::ResponseContext;
use crate::protocol::{DecodeError, PayloadSize, ResponseHead, TransportError};

/// Default buffer capacity when the response carries no usable
/// `Content-Length`.
const DEFAULT_CAPACITY: usize = 8192;

/// Session record of one connection, reassembling its single response.
///
/// Created when the connection starts being driven and fed the event
/// sequence in arrival order: head, then body chunks. All state lives here
/// rather than in per-phase fields, so there are no hidden ordering
/// dependencies between events. Consumed by [`ResponseAccumulator::finish`]
/// once a terminal condition is reached.
#[derive(Debug)]
pub(crate) struct ResponseAccumulator {
    head: Option<ResponseHead>,
    buffer: BytesMut,
    error: Option<TransportError>,
}

impl ResponseAccumulator {
    pub(crate) fn new() -> Self {
        Self { head: None, buffer: BytesMut::new(), error: None }
    }

    /// Records the head and sizes the content buffer: the declared
    /// `Content-Length` when present, a fixed default otherwise. The buffer
    /// grows on overflow, it never truncates.
    pub(crate) fn begin(&mut self, head: ResponseHead, size: PayloadSize) {
        let capacity = match size {
            PayloadSize::Length(length) => usize::try_from(length).unwrap_or(DEFAULT_CAPACITY),
            PayloadSize::Chunked | PayloadSize::Empty => DEFAULT_CAPACITY,
        };
        self.buffer = BytesMut::with_capacity(capacity);
        self.head = Some(head);
    }

    /// Appends one body chunk in arrival order.
    pub(crate) fn append(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Records a framing error; only the first one is kept.
    pub(crate) fn record_error(&mut self, error: DecodeError) {
        if self.error.is_none() {
            self.error = Some(TransportError::from(error));
        }
    }

    /// Consumes the session into the dispatchable response context.
    ///
    /// A framing error recorded during reassembly takes precedence over the
    /// terminal condition (timeout or connection error) passed in.
    pub(crate) fn finish(self, terminal: Option<TransportError>) -> ResponseContext {
        ResponseContext::new(self.head, self.buffer.freeze(), self.error.or(terminal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Response, StatusCode};

    fn head(status: StatusCode) -> ResponseHead {
        Response::builder().status(status).body(()).unwrap()
    }

    #[test]
    fn buffer_holds_exactly_the_announced_bytes() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator.begin(head(StatusCode::OK), PayloadSize::Length(5));
        accumulator.append(b"hello");

        let context = accumulator.finish(None);
        assert_eq!(context.body().as_ref(), b"hello");
        assert_eq!(context.body().len(), 5);
        assert!(context.error().is_none());
    }

    #[test]
    fn buffer_grows_past_default_capacity_without_corruption() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator.begin(head(StatusCode::OK), PayloadSize::Chunked);

        let chunk: Vec<u8> = (0..=255u8).cycle().take(1250).collect();
        for _ in 0..16 {
            accumulator.append(&chunk);
        }

        let context = accumulator.finish(None);
        let body = context.body();
        assert_eq!(body.len(), 20000);
        let expected: Vec<u8> = chunk.iter().copied().cycle().take(20000).collect();
        assert_eq!(body.as_ref(), &expected[..]);
    }

    #[test]
    fn first_decode_error_wins() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator.begin(head(StatusCode::OK), PayloadSize::Chunked);
        accumulator.record_error(DecodeError::invalid_body("first"));
        accumulator.record_error(DecodeError::invalid_body("second"));

        let context = accumulator.finish(None);
        match context.error() {
            Some(TransportError::Decode { source }) => assert!(source.to_string().contains("first")),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn decode_error_takes_precedence_over_terminal_error() {
        let mut accumulator = ResponseAccumulator::new();
        accumulator.begin(head(StatusCode::OK), PayloadSize::Chunked);
        accumulator.record_error(DecodeError::invalid_body("broken framing"));

        let context = accumulator.finish(Some(TransportError::closed_early("eof")));
        assert!(matches!(context.error(), Some(TransportError::Decode { .. })));
    }

    #[test]
    fn terminal_error_reported_when_no_decode_error() {
        let accumulator = ResponseAccumulator::new();
        let context = accumulator.finish(Some(TransportError::timeout(std::time::Duration::from_secs(1))));

        assert!(matches!(context.error(), Some(TransportError::Timeout { .. })));
        assert!(context.status().is_none());
    }
}
