//! CommandComplete (`C`) — sent by the backend when a SQL command finishes.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

pub const MESSAGE_TYPE: u8 = b'C';

// -----------------------------------------------------------------------------
// ----- CommandComplete -------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandComplete {
    /// The command tag, e.g. `SELECT 5` or `INSERT 0 1`.
    pub tag: String,
}

impl CommandComplete {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        let mut message_data = ReadBuffer::new(frame.message_body());
        let tag = message_data.read_string()?;

        Ok(Self { tag })
    }

    pub fn frame(&self) -> StandardFrame {
        let mut message_buffer = WriteBuffer::new();
        message_buffer.write_string(&self.tag);

        StandardFrame::new(MESSAGE_TYPE, message_buffer.as_slice())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let message = CommandComplete {
            tag: "SELECT 5".to_owned(),
        };

        let frame = message.frame();
        assert_eq!(frame.bytes(), b"C\x00\x00\x00\x0DSELECT 5\0");
        assert_eq!(CommandComplete::parse(&frame).unwrap(), message);
    }

    #[test]
    fn missing_terminator_is_malformed() {
        let frame = StandardFrame::new(b'C', b"SELECT 5");

        assert!(matches!(
            CommandComplete::parse(&frame),
            Err(Error::MalformedMessage)
        ));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
