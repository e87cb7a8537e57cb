//! NoticeResponse (`N`) — non-fatal diagnostics from the backend. Same body
//! layout as ErrorResponse.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::message::MessageField;
use crate::pg::message::error_response::{parse_message_fields, serialize_message_fields};

pub const MESSAGE_TYPE: u8 = b'N';

// -----------------------------------------------------------------------------
// ----- NoticeResponse --------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeResponse {
    pub fields: Vec<MessageField>,
}

impl NoticeResponse {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        Ok(Self {
            fields: parse_message_fields(frame.message_body())?,
        })
    }

    pub fn frame(&self) -> StandardFrame {
        StandardFrame::new(MESSAGE_TYPE, serialize_message_fields(&self.fields).as_slice())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let message = NoticeResponse {
            fields: vec![MessageField {
                field_type: b'M',
                value: "now vacuuming".to_owned(),
            }],
        };

        let frame = message.frame();
        assert_eq!(frame.message_type(), b'N');
        assert_eq!(NoticeResponse::parse(&frame).unwrap(), message);
    }

    #[test]
    fn rejects_error_response_type_byte() {
        let frame = StandardFrame::new(b'E', &[0]);

        assert!(matches!(
            NoticeResponse::parse(&frame),
            Err(Error::MalformedMessage)
        ));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
