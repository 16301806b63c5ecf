//! Request head encoder.
//!
//! Serializes the request line and headers of an outbound HTTP/1.1 request.
//! The `Content-Length` header is always rewritten from the actual body size
//! so the framing can never disagree with the marshaled payload.

use std::io;
use std::io::{ErrorKind, Write};

use bytes::{BufMut, BytesMut};
use http::{Version, header};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::protocol::{EncodeError, PayloadSize, RequestHead};

const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for the head of an HTTP/1.1 request.
#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<(RequestHead, PayloadSize)> for HeaderEncoder {
    type Error = EncodeError;

    fn encode(&mut self, item: (RequestHead, PayloadSize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, payload_size) = item;

        dst.reserve(INIT_HEADER_SIZE);
        match head.version() {
            Version::HTTP_11 => {
                let target = head.uri().path_and_query().map_or("/", |path_and_query| path_and_query.as_str());
                write!(FastWrite(dst), "{} {} HTTP/1.1\r\n", head.method(), target)?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        // the body length is authoritative, whatever the marshaling layer set
        match payload_size {
            PayloadSize::Length(n) => {
                head.headers_mut().insert(header::CONTENT_LENGTH, n.into());
            }
            PayloadSize::Empty => {
                head.headers_mut().insert(header::CONTENT_LENGTH, 0.into());
            }
            PayloadSize::Chunked => {
                return Err(EncodeError::invalid_request("chunked request bodies are not produced by this transport"));
            }
        }

        for (header_name, header_value) in head.headers().iter() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writes into `BytesMut` without intermediate allocation; space was reserved
/// up front.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
