//! Decoder for chunked transfer encoding
//! ([RFC 9112 §7.1](https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding)).
//!
//! Each chunk is a hex size line (optionally with extensions), the chunk data
//! and a CRLF; a zero-size chunk ends the body, optionally followed by
//! trailer fields.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{DecodeError, PayloadItem};

use ChunkedState::*;

/// Incremental chunked-body decoder.
///
/// Control bytes (size lines, CRLFs, extensions, trailers) are consumed one
/// at a time through a state machine; chunk data is split out of the buffer
/// in as large a slice as is available, so a single chunk may be emitted as
/// several [`PayloadItem::Chunk`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Reading the hex chunk size
    Size,
    /// Whitespace after the size
    SizeLws,
    /// Skipping a chunk extension
    Extension,
    /// Expecting LF ending the size line
    SizeLf,
    /// Reading chunk data
    Body,
    /// Expecting CR after chunk data
    BodyCr,
    /// Expecting LF after chunk data
    BodyLf,
    /// Start of a line in the trailer section
    EndCr,
    /// Skipping a trailer field
    Trailer,
    /// Expecting LF ending a trailer field
    TrailerLf,
    /// Expecting the final LF
    EndLf,
    /// Terminal state
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, remaining: 0 }
    }

    /// Consumes one control byte and returns the next state.
    fn step(&mut self, byte: u8) -> Result<ChunkedState, DecodeError> {
        match self.state {
            Size => match byte {
                b'0'..=b'9' => self.accumulate_size(byte - b'0'),
                b'a'..=b'f' => self.accumulate_size(byte - b'a' + 10),
                b'A'..=b'F' => self.accumulate_size(byte - b'A' + 10),
                b'\t' | b' ' => Ok(SizeLws),
                b';' => Ok(Extension),
                b'\r' => Ok(SizeLf),
                _ => Err(DecodeError::invalid_body("invalid chunk size line")),
            },

            SizeLws => match byte {
                b'\t' | b' ' => Ok(SizeLws),
                b';' => Ok(Extension),
                b'\r' => Ok(SizeLf),
                _ => Err(DecodeError::invalid_body("invalid character after chunk size")),
            },

            Extension => match byte {
                b'\r' => Ok(SizeLf),
                b'\n' => Err(DecodeError::invalid_body("unexpected lf in chunk extension")),
                _ => Ok(Extension),
            },

            SizeLf => match byte {
                b'\n' if self.remaining > 0 => {
                    trace!(chunk_size = self.remaining, "start reading chunk");
                    Ok(Body)
                }
                b'\n' => Ok(EndCr),
                _ => Err(DecodeError::invalid_body("expected lf after chunk size")),
            },

            BodyCr => match byte {
                b'\r' => Ok(BodyLf),
                _ => Err(DecodeError::invalid_body("expected cr after chunk data")),
            },

            BodyLf => match byte {
                b'\n' => Ok(Size),
                _ => Err(DecodeError::invalid_body("expected lf after chunk data")),
            },

            EndCr => match byte {
                b'\r' => Ok(EndLf),
                _ => Ok(Trailer),
            },

            Trailer => match byte {
                b'\r' => Ok(TrailerLf),
                _ => Ok(Trailer),
            },

            TrailerLf => match byte {
                b'\n' => Ok(EndCr),
                _ => Err(DecodeError::invalid_body("expected lf after trailer field")),
            },

            EndLf => match byte {
                b'\n' => Ok(End),
                _ => Err(DecodeError::invalid_body("expected final lf")),
            },

            // handled before stepping
            Body | End => unreachable!("no control bytes in state {:?}", self.state),
        }
    }

    fn accumulate_size(&mut self, digit: u8) -> Result<ChunkedState, DecodeError> {
        self.remaining = self
            .remaining
            .checked_mul(16)
            .and_then(|size| size.checked_add(u64::from(digit)))
            .ok_or_else(|| DecodeError::invalid_body("chunk size overflow"))?;
        Ok(Size)
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                End => {
                    trace!("finished reading chunked body");
                    return Ok(Some(PayloadItem::Eof));
                }

                Body => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let len = cmp_min(self.remaining, src.len());
                    let bytes = src.split_to(len).freeze();
                    self.remaining -= bytes.len() as u64;
                    if self.remaining == 0 {
                        self.state = BodyCr;
                    }
                    trace!(len = bytes.len(), "read chunk data");
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }

                _ => {
                    if src.is_empty() {
                        return Ok(None);
                    }
                    let byte = src.get_u8();
                    self.state = self.step(byte)?;
                }
            }
        }
    }
}

fn cmp_min(remaining: u64, available: usize) -> usize {
    std::cmp::min(remaining, available as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(decoder: &mut ChunkedDecoder, src: &mut BytesMut) -> (Vec<u8>, bool) {
        let mut body = Vec::new();
        let mut finished = false;
        while let Some(item) = decoder.decode(src).unwrap() {
            match item {
                PayloadItem::Chunk(bytes) => body.extend_from_slice(&bytes),
                PayloadItem::Eof => {
                    finished = true;
                    break;
                }
            }
        }
        (body, finished)
    }

    #[test]
    fn single_chunk() {
        let mut src = BytesMut::from(&b"5\r\nhello\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let (body, finished) = collect(&mut decoder, &mut src);
        assert_eq!(body, b"hello");
        assert!(finished);
    }

    #[test]
    fn multiple_chunks_with_uppercase_size() {
        let mut src = BytesMut::from(&b"5\r\nhello\r\nB\r\n, chunked w\r\n4\r\norld\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let (body, finished) = collect(&mut decoder, &mut src);
        assert_eq!(body, b"hello, chunked world");
        assert!(finished);
    }

    #[test]
    fn chunk_extension_is_skipped() {
        let mut src = BytesMut::from(&b"5;name=value\r\nhello\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let (body, finished) = collect(&mut decoder, &mut src);
        assert_eq!(body, b"hello");
        assert!(finished);
    }

    #[test]
    fn trailer_fields_are_skipped() {
        let mut src = BytesMut::from(&b"5\r\nhello\r\n0\r\nExpires: never\r\nX-Sum: 1\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let (body, finished) = collect(&mut decoder, &mut src);
        assert_eq!(body, b"hello");
        assert!(finished);
    }

    #[test]
    fn resumes_across_buffer_fragments() {
        let mut decoder = ChunkedDecoder::new();
        let mut body = Vec::new();

        let mut first = BytesMut::from(&b"a\r\n01234"[..]);
        while let Some(item) = decoder.decode(&mut first).unwrap() {
            body.extend_from_slice(item.as_bytes().unwrap());
        }

        let mut second = BytesMut::from(&b"56789\r\n0\r\n\r\n"[..]);
        let (rest, finished) = collect(&mut decoder, &mut second);
        body.extend_from_slice(&rest);

        assert_eq!(body, b"0123456789");
        assert!(finished);
    }

    #[test]
    fn rejects_invalid_size_line() {
        let mut src = BytesMut::from(&b"zz\r\nhello\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert!(decoder.decode(&mut src).is_err());
    }
}
