//! Response head decoder.
//!
//! Parses the status line and headers of an inbound HTTP/1.1 response with
//! `httparse`, builds a typed [`ResponseHead`] and derives how the body that
//! follows is framed.
//!
//! Header name/value bytes are not copied out of the read buffer: the parse
//! records byte ranges, the head section is split off as shared
//! [`Bytes`](bytes::Bytes) and each header value is a slice of it.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head section size: 8KB

use bytes::BytesMut;
use http::{HeaderName, HeaderValue, Response, StatusCode, Version};
use httparse::Status;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{DecodeError, PayloadSize, ResponseHead};

const MAX_HEADER_NUM: usize = 64;

const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for the head of an HTTP/1.1 response.
///
/// Produces the typed head together with the [`PayloadSize`] derived from the
/// `Content-Length` / `Transfer-Encoding` headers, which the caller uses to
/// pick the body decoder.
#[derive(Debug)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // shortest complete head: "HTTP/1.1 200\r\n\r\n"
        if src.len() < 16 {
            return Ok(None);
        }

        let mut parsed_headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut response = httparse::Response::new(&mut parsed_headers);

        let parse_result = response.parse(src).map_err(|e| match e {
            httparse::Error::TooManyHeaders => DecodeError::too_many_headers(MAX_HEADER_NUM),
            e => DecodeError::invalid_header(e.to_string()),
        });

        let (head_len, version, status, header_count, header_index) = match parse_result? {
            Status::Complete(head_len) => {
                trace!(head_len, "parsed response head");
                ensure!(head_len <= MAX_HEADER_BYTES, DecodeError::too_large_header(head_len, MAX_HEADER_BYTES));

                let version = match response.version {
                    Some(0) => Version::HTTP_10,
                    Some(1) => Version::HTTP_11,
                    version => return Err(DecodeError::InvalidVersion(version)),
                };

                let status = response
                    .code
                    .and_then(|code| StatusCode::from_u16(code).ok())
                    .ok_or(DecodeError::InvalidStatus(response.code))?;

                let header_count = response.headers.len();
                ensure!(header_count <= MAX_HEADER_NUM, DecodeError::too_many_headers(header_count));

                let mut header_index = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];
                HeaderIndex::record(src, response.headers, &mut header_index);

                (head_len, version, status, header_count, header_index)
            }

            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, DecodeError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        let mut builder = Response::builder().status(status).version(version);

        let headers = builder.headers_mut().expect("fresh response builder cannot hold an error");
        headers.reserve(header_count);

        // split the head off the read buffer; header values slice into it
        let head_bytes = src.split_to(head_len).freeze();
        for index in &header_index[..header_count] {
            let name = HeaderName::from_bytes(&head_bytes[index.name.0..index.name.1])
                .map_err(|e| DecodeError::invalid_header(e.to_string()))?;

            let value = HeaderValue::from_maybe_shared(head_bytes.slice(index.value.0..index.value.1))
                .map_err(|e| DecodeError::invalid_header(e.to_string()))?;

            headers.append(name, value);
        }

        let head = builder.body(()).map_err(|e| DecodeError::invalid_header(e.to_string()))?;
        let payload_size = parse_payload(&head)?;

        Ok(Some((head, payload_size)))
    }
}

/// Byte ranges of one header's name and value inside the head section.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        let bytes_ptr = bytes.as_ptr() as usize;
        for (header, index) in headers.iter().zip(indices.iter_mut()) {
            let name_start = header.name.as_ptr() as usize - bytes_ptr;
            index.name = (name_start, name_start + header.name.len());
            let value_start = header.value.as_ptr() as usize - bytes_ptr;
            index.value = (value_start, value_start + header.value.len());
        }
    }
}

/// Derives the body framing from the response head.
///
/// Statuses defined to carry no body (1xx, 204, 304) yield
/// [`PayloadSize::Empty`] regardless of headers. A `Transfer-Encoding` whose
/// final coding is `chunked` selects chunked framing; otherwise a parseable
/// `Content-Length` gives the exact size. Carrying both is rejected per
/// [RFC 9112 §6.1](https://www.rfc-editor.org/rfc/rfc9112.html#name-transfer-encoding).
fn parse_payload(head: &ResponseHead) -> Result<PayloadSize, DecodeError> {
    let status = head.status();
    if status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return Ok(PayloadSize::new_empty());
    }

    let te_header = head.headers().get(http::header::TRANSFER_ENCODING);
    let cl_header = head.headers().get(http::header::CONTENT_LENGTH);

    match (te_header, cl_header) {
        (None, None) => Ok(PayloadSize::new_empty()),

        (te_value @ Some(_), None) => {
            if is_chunked(te_value) {
                Ok(PayloadSize::new_chunked())
            } else {
                Ok(PayloadSize::new_empty())
            }
        }

        (None, Some(cl_value)) => {
            let cl_str = cl_value.to_str().map_err(|_| DecodeError::invalid_content_length("value can't to_str"))?;

            let length =
                cl_str.trim().parse::<u64>().map_err(|_| DecodeError::invalid_content_length(format!("value {cl_str} is not u64")))?;

            Ok(PayloadSize::new_length(length))
        }

        (Some(_), Some(_)) => Err(DecodeError::invalid_content_length("transfer-encoding and content-length both present")),
    }
}

/// Chunked must be the final coding in `Transfer-Encoding` to select chunked
/// framing.
fn is_chunked(header_value: Option<&HeaderValue>) -> bool {
    const CHUNKED: &[u8] = b"chunked";
    if let Some(value) = header_value {
        if let Some(bytes) = value.as_bytes().rsplit(|b| *b == b',').next() {
            return bytes.trim_ascii() == CHUNKED;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderMap;
    use indoc::indoc;

    fn fixture(text: &str) -> BytesMut {
        BytesMut::from(text.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn check_is_chunked() {
        {
            let headers = HeaderMap::new();
            assert!(!is_chunked(headers.get(http::header::TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "gzip, chunked".parse().unwrap());
            assert!(is_chunked(headers.get(http::header::TRANSFER_ENCODING)));
        }

        {
            let mut headers = HeaderMap::new();
            headers.insert("Transfer-Encoding", "chunked, gzip".parse().unwrap());
            assert!(!is_chunked(headers.get(http::header::TRANSFER_ENCODING)));
        }
    }

    #[test]
    fn ok_response_with_content_length() {
        let mut buf = fixture(indoc! {r##"
            HTTP/1.1 200 OK
            Server: filament-test
            Content-Length: 5

            hello"##});

        let (head, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.status(), StatusCode::OK);
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(payload_size, PayloadSize::Length(5));
        assert_eq!(head.headers().get("server"), Some(&HeaderValue::from_static("filament-test")));

        // only the body bytes remain in the read buffer
        assert_eq!(&buf[..], b"hello");
    }

    #[test]
    fn error_response_with_reason_phrase() {
        let mut buf = fixture(indoc! {r##"
            HTTP/1.1 500 Internal Server Error
            Content-Length: 4

            boom"##});

        let (head, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload_size, PayloadSize::Length(4));
    }

    #[test]
    fn chunked_response() {
        let mut buf = fixture(indoc! {r##"
            HTTP/1.1 200 OK
            Transfer-Encoding: chunked

            "##});

        let (_head, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();
        assert!(payload_size.is_chunked());
    }

    #[test]
    fn no_content_has_empty_payload() {
        let mut buf = fixture(indoc! {r##"
            HTTP/1.1 204 No Content
            Server: filament-test

            "##});

        let (head, payload_size) = HeaderDecoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(head.status(), StatusCode::NO_CONTENT);
        assert!(payload_size.is_empty());
    }

    #[test]
    fn partial_head_needs_more_data() {
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Le"[..]);

        assert!(HeaderDecoder.decode(&mut buf).unwrap().is_none());
        // nothing consumed until the head is complete
        assert_eq!(&buf[..], b"HTTP/1.1 200 OK\r\nContent-Le");
    }

    #[test]
    fn conflicting_framing_headers_rejected() {
        let mut buf = fixture(indoc! {r##"
            HTTP/1.1 200 OK
            Transfer-Encoding: chunked
            Content-Length: 5

            "##});

        let result = HeaderDecoder.decode(&mut buf);
        assert!(matches!(result, Err(DecodeError::InvalidContentLength { .. })));
    }

    #[test]
    fn invalid_status_line_rejected() {
        let mut buf = BytesMut::from(&b"NOPE/1.1 200 OK\r\n\r\n padding to pass the length gate"[..]);

        assert!(HeaderDecoder.decode(&mut buf).is_err());
    }
}
