use std::io;
use std::time::Duration;

use http::StatusCode;
use thiserror::Error;

/// The caller-visible error taxonomy of the transport.
///
/// Every failed call is delivered with exactly one of these. `Connect` and
/// `ClosedEarly` are the two faces of a connection error; `Decode` wraps a
/// framing error from the response decoder; `Timeout` means the idle timer
/// fired before the terminal body chunk; `NonOkStatus` is a well-formed
/// response with a status other than 200; `Serialization` is a deserialize
/// failure on an otherwise successful response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect failed: {source}")]
    Connect {
        source: io::Error,
    },

    #[error("connection closed prematurely: {reason}")]
    ClosedEarly {
        reason: String,
    },

    #[error("response decode error: {source}")]
    Decode {
        #[from]
        source: DecodeError,
    },

    #[error("no response within {after:?}")]
    Timeout {
        after: Duration,
    },

    #[error("non-ok response status: {status}")]
    NonOkStatus {
        status: StatusCode,
    },

    #[error("deserialize failed: {reason}")]
    Serialization {
        reason: String,
    },
}

impl TransportError {
    pub fn connect(source: io::Error) -> Self {
        Self::Connect { source }
    }

    pub fn closed_early<S: ToString>(reason: S) -> Self {
        Self::ClosedEarly { reason: reason.to_string() }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::Timeout { after }
    }

    pub fn non_ok_status(status: StatusCode) -> Self {
        Self::NonOkStatus { status }
    }

    pub fn serialization<S: ToString>(reason: S) -> Self {
        Self::Serialization { reason: reason.to_string() }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors raised while decoding a response from the wire.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid response status: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl DecodeError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised while framing a request onto the wire.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl EncodeError {
    pub fn invalid_request<S: ToString>(str: S) -> Self {
        Self::InvalidRequest { reason: str.to_string() }
    }
}
