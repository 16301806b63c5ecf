//! Core protocol abstractions shared by the codec and connection layers.
//!
//! The protocol module defines the vocabulary the rest of the crate speaks:
//!
//! - **Message flow** ([`message`]): [`Message`] is either a decoded response
//!   head or a payload item; [`PayloadItem`] carries one body chunk or the
//!   terminal marker; [`PayloadSize`] describes how the body is framed.
//!
//! - **Request side** ([`request`]): [`EncodedRequest`] is the marshaled
//!   request a call carries onto its connection.
//!
//! - **Response side** ([`response`]): [`ResponseHead`] is the parsed status
//!   line plus headers, before any body bytes are attached.
//!
//! - **Errors** ([`error`]): [`TransportError`] is the caller-visible error
//!   taxonomy; [`DecodeError`] and [`EncodeError`] are the codec-level errors
//!   that feed into it.

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::EncodedRequest;
pub use request::RequestHead;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::DecodeError;
pub use error::EncodeError;
pub use error::TransportError;
