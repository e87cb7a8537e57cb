//! Password (`p`) — the client's answer to a cleartext or MD5 password
//! request.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

pub const MESSAGE_TYPE: u8 = b'p';

// -----------------------------------------------------------------------------
// ----- Password --------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Password {
    /// The password, possibly already MD5-hashed.
    pub password: String,
}

impl Password {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        let mut message_data = ReadBuffer::new(frame.message_body());
        let password = message_data.read_string()?;

        Ok(Self { password })
    }

    pub fn frame(&self) -> StandardFrame {
        let mut message_buffer = WriteBuffer::new();
        message_buffer.write_string(&self.password);

        StandardFrame::new(MESSAGE_TYPE, message_buffer.as_slice())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
