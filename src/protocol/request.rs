//! Request-side protocol types.
//!
//! The transport never marshals arguments itself; it receives the request
//! already encoded by the marshaling layer and only frames it onto the wire.

use bytes::Bytes;
use http::Request;

/// The head of an outbound request: method, uri, version and headers, with an
/// empty body placeholder.
pub type RequestHead = Request<()>;

/// A fully marshaled request, ready to be framed onto a connection.
///
/// The body carries the serialized arguments; the encoder derives the
/// `Content-Length` header from it rather than trusting whatever the
/// marshaling layer put in the head.
#[derive(Debug)]
pub struct EncodedRequest {
    head: RequestHead,
    body: Bytes,
}

impl EncodedRequest {
    pub fn new(head: RequestHead, body: Bytes) -> Self {
        Self { head, body }
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_parts(self) -> (RequestHead, Bytes) {
        (self.head, self.body)
    }
}
