//! Streaming HTTP/1.1 codec for the client side of a connection.
//!
//! The codec layer turns raw connection bytes into the protocol events the
//! connection session consumes, and frames the marshaled request onto the
//! wire:
//!
//! - [`ResponseDecoder`]: status line and headers first, then the body as a
//!   stream of chunks ending in a terminal marker. Header parsing lives in
//!   [`header`], body framing (content-length and chunked) in [`body`].
//! - [`RequestEncoder`]: serializes an [`EncodedRequest`] head and appends the
//!   marshaled body, keeping `Content-Length` consistent with the body size.
//!
//! Both implement the `tokio_util` codec traits so a connection can drive
//! them through `FramedRead`/`FramedWrite`.
//!
//! [`EncodedRequest`]: crate::protocol::EncodedRequest

mod body;
mod header;
mod request_encoder;
mod response_decoder;

pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
