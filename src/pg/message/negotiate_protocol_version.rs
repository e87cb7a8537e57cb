//! NegotiateProtocolVersion (`v`) — the backend's counter-offer when the
//! client asked for a newer minor version or unknown protocol options.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

pub const MESSAGE_TYPE: u8 = b'v';

// -----------------------------------------------------------------------------
// ----- NegotiateProtocolVersion ----------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiateProtocolVersion {
    /// Newest minor protocol version supported by the server.
    pub supported_version: i32,

    /// Protocol options the server did not recognize.
    pub unrecognized_options: Vec<String>,
}

impl NegotiateProtocolVersion {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        let mut message_data = ReadBuffer::new(frame.message_body());

        let supported_version = message_data.read_i32().map_err(|_| Error::MalformedMessage)?;
        let options_count = message_data.read_i32().map_err(|_| Error::MalformedMessage)?;

        let mut unrecognized_options = Vec::with_capacity(options_count.max(0) as usize);

        for _ in 0..options_count {
            unrecognized_options.push(message_data.read_string()?);
        }

        Ok(Self {
            supported_version,
            unrecognized_options,
        })
    }

    pub fn frame(&self) -> StandardFrame {
        let mut message_buffer = WriteBuffer::new();

        message_buffer.write_i32(self.supported_version);
        message_buffer.write_i32(self.unrecognized_options.len() as i32);

        for option in &self.unrecognized_options {
            message_buffer.write_string(option);
        }

        StandardFrame::new(MESSAGE_TYPE, message_buffer.as_slice())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
