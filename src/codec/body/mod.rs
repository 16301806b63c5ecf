//! Body framing decoders.
//!
//! A response body arrives either with a known length (`Content-Length`),
//! chunked (`Transfer-Encoding: chunked`), or not at all. [`PayloadDecoder`]
//! selects the right strategy from the [`PayloadSize`] the header decoder
//! derived.
//!
//! [`PayloadSize`]: crate::protocol::PayloadSize

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;
