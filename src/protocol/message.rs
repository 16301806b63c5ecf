use bytes::Bytes;

/// One decoded event on a connection: either the response head or a piece of
/// the body.
///
/// The decoder guarantees the order `Header`, zero or more `Payload` chunks,
/// then exactly one `Payload(Eof)`.
#[derive(Debug)]
pub enum Message<T> {
    /// The parsed head, produced exactly once per response.
    Header(T),
    /// A body chunk or the terminal marker.
    Payload(PayloadItem),
}

/// An item in the response body stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A chunk of body bytes, in arrival order.
    Chunk(Bytes),
    /// Terminal marker: the body is complete.
    Eof,
}

/// How the response body is framed on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Body with a known length from the `Content-Length` header.
    Length(u64),
    /// Body using chunked transfer encoding.
    Chunked,
    /// No body follows the head.
    Empty,
}

impl PayloadSize {
    pub fn new_length(length: u64) -> Self {
        PayloadSize::Length(length)
    }

    pub fn new_chunked() -> Self {
        PayloadSize::Chunked
    }

    pub fn new_empty() -> Self {
        PayloadSize::Empty
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<T> Message<T> {
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }

    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }
}

impl PayloadItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Returns the chunk bytes, or `None` for the terminal marker.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
