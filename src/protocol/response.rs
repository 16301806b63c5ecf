//! Response-side protocol types.

use http::Response;

/// The parsed head of an inbound response: status line and headers, with an
/// empty body placeholder. Body bytes are accumulated separately by the
/// connection session.
pub type ResponseHead = Response<()>;
