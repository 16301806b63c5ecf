//! Streaming encoder for one outbound request.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::codec::header::HeaderEncoder;
use crate::protocol::{EncodeError, EncodedRequest, PayloadSize};

/// Frames an [`EncodedRequest`] onto the wire: request line, headers with a
/// `Content-Length` derived from the body, then the body bytes.
#[derive(Debug)]
pub struct RequestEncoder {
    header_encoder: HeaderEncoder,
}

impl RequestEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for RequestEncoder {
    fn default() -> Self {
        Self { header_encoder: HeaderEncoder }
    }
}

impl Encoder<EncodedRequest> for RequestEncoder {
    type Error = EncodeError;

    fn encode(&mut self, item: EncodedRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, body) = item.into_parts();

        let payload_size = if body.is_empty() { PayloadSize::Empty } else { PayloadSize::Length(body.len() as u64) };
        self.header_encoder.encode((head, payload_size), dst)?;

        if !body.is_empty() {
            dst.reserve(body.len());
            dst.put_slice(&body);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Request;

    #[test]
    fn frames_head_and_body() {
        let head = Request::builder().method("POST").uri("/rpc/echo").header("host", "example").body(()).unwrap();
        let request = EncodedRequest::new(head, Bytes::from_static(b"ping"));

        let mut dst = BytesMut::new();
        RequestEncoder::new().encode(request, &mut dst).unwrap();

        assert_eq!(&dst[..], b"POST /rpc/echo HTTP/1.1\r\nhost: example\r\ncontent-length: 4\r\n\r\nping");
    }

    #[test]
    fn empty_body_is_framed_with_zero_length() {
        let head = Request::builder().method("GET").uri("/rpc/status").body(()).unwrap();
        let request = EncodedRequest::new(head, Bytes::new());

        let mut dst = BytesMut::new();
        RequestEncoder::new().encode(request, &mut dst).unwrap();

        assert_eq!(&dst[..], b"GET /rpc/status HTTP/1.1\r\ncontent-length: 0\r\n\r\n");
    }
}
