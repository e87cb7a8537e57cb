//! ErrorResponse (`E`) — sent by the backend when an error occurs. The body
//! is a list of `(field type, value)` records closed by a zero field type.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::message::MessageField;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

pub const MESSAGE_TYPE: u8 = b'E';

// -----------------------------------------------------------------------------
// ----- ErrorResponse ---------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Zero or more fields with error info (severity, SQLSTATE, message...).
    pub fields: Vec<MessageField>,
}

impl ErrorResponse {
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
// ----- Field helpers (shared with NoticeResponse) ----------------------------

pub(crate) fn parse_message_fields(body: &[u8]) -> Result<Vec<MessageField>> {
    let mut message_data = ReadBuffer::new(body);
    let mut fields = Vec::new();

    loop {
        let field_type = message_data.read_byte().map_err(|_| Error::MalformedMessage)?;

        // Terminator — end of message
        if field_type == 0 {
            break;
        }

        let value = message_data.read_string()?;

        fields.push(MessageField { field_type, value });
    }

    Ok(fields)
}

pub(crate) fn serialize_message_fields(fields: &[MessageField]) -> WriteBuffer {
    let mut message_buffer = WriteBuffer::new();

    for field in fields {
        message_buffer.write_byte(field.field_type);
        message_buffer.write_string(&field.value);
    }

    // Terminator
    message_buffer.write_byte(0);

    message_buffer
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
