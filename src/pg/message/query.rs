//! Query (`Q`) — a simple-protocol query from the client.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

pub const MESSAGE_TYPE: u8 = b'Q';

// -----------------------------------------------------------------------------
// ----- Query -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub query: String,
}

impl Query {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        let mut message_data = ReadBuffer::new(frame.message_body());
        let query = message_data.read_string()?;

        Ok(Self { query })
    }

    pub fn frame(&self) -> StandardFrame {
        let mut message_buffer = WriteBuffer::new();
        message_buffer.write_string(&self.query);

        StandardFrame::new(MESSAGE_TYPE, message_buffer.as_slice())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
