//! Streaming decoder for one HTTP/1.1 response.
//!
//! Works in two phases, tracked by the `payload_decoder` field:
//!
//! - `None`: parsing the status line and headers via [`HeaderDecoder`]
//! - `Some(_)`: streaming body chunks via [`PayloadDecoder`] until the
//!   terminal marker
//!
//! [`HeaderDecoder`]: crate::codec::header::HeaderDecoder
//! [`PayloadDecoder`]: crate::codec::body::PayloadDecoder

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{DecodeError, Message, PayloadItem, PayloadSize, ResponseHead};

/// Decoder producing the event sequence of one response: exactly one header
/// event, zero or more chunk events, exactly one terminal event.
#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, payload_decoder: None }
    }
}

impl Decoder for ResponseDecoder {
    type Item = Message<(ResponseHead, PayloadSize)>;
    type Error = DecodeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    // response complete; a connection carries exactly one
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = match self.header_decoder.decode(src)? {
            Some((head, payload_size)) => {
                self.payload_decoder = Some(payload_size.into());
                Some(Message::Header((head, payload_size)))
            }
            None => None,
        };

        Ok(message)
    }
}
