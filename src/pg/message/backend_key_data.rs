//! BackendKeyData (`K`) — cancellation key the backend hands the client
//! right after authentication.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

pub const MESSAGE_TYPE: u8 = b'K';

// -----------------------------------------------------------------------------
// ----- BackendKeyData --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendKeyData {
    /// The process ID of this backend.
    pub process_id: i32,

    /// The secret key to use in cancellation requests.
    pub secret_key: i32,
}

impl BackendKeyData {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        let mut message_data = ReadBuffer::new(frame.message_body());

        let process_id = message_data.read_i32().map_err(|_| Error::MalformedMessage)?;
        let secret_key = message_data.read_i32().map_err(|_| Error::MalformedMessage)?;

        Ok(Self {
            process_id,
            secret_key,
        })
    }

    pub fn frame(&self) -> StandardFrame {
        let mut message_buffer = WriteBuffer::new();

        message_buffer.write_i32(self.process_id);
        message_buffer.write_i32(self.secret_key);

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
        let message = BackendKeyData {
            process_id: 31337,
            secret_key: -1,
        };

        let frame = message.frame();
        assert_eq!(
            frame.bytes(),
            &[b'K', 0, 0, 0, 12, 0x00, 0x00, 0x7A, 0x69, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(BackendKeyData::parse(&frame).unwrap(), message);
    }

    #[test]
    fn short_body_is_malformed() {
        let frame = StandardFrame::new(b'K', &[0, 0, 0, 1]);

        assert!(matches!(
            BackendKeyData::parse(&frame),
            Err(Error::MalformedMessage)
        ));
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
