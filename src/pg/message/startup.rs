//! StartupMessage — the first message a client sends to begin a session.
//! Carries the protocol version plus run-time parameters (user, database,
//! encoding...). Travels in a [`StartupFrame`], the one frame without a
//! type byte.

use crate::errors::Result;
use crate::pg::frame::StartupFrame;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

/// Magic protocol version a client sends to request an SSL session.
pub const SSL_REQUEST_CODE: i32 = 80877103;

/// Protocol version 3.0, the default since PostgreSQL 7.4.
pub const PROTOCOL_VERSION: i32 = 196608;

// -----------------------------------------------------------------------------
// ----- StartupParameter ------------------------------------------------------

/// A run-time parameter in a StartupMessage.
///
/// Parameters keep their wire order, so re-serializing reproduces the frame
/// byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupParameter {
    pub name: String,
    pub value: String,
}

// -----------------------------------------------------------------------------
// ----- StartupMessage --------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupMessage {
    pub protocol_version: i32,
    pub parameters: Vec<StartupParameter>,
}

impl StartupMessage {
    /// Parse a StartupMessage from a startup frame.
    pub fn parse(frame: &StartupFrame) -> Result<Self> {
        let mut message_data = ReadBuffer::new(frame.message_body());

        let protocol_version = message_data.read_i32()?;

        let mut parameters = Vec::new();

        // NB: an SSL request carries no parameter block at all.
        if !message_data.is_empty() {
            // Dictionary encoded as string pairs plus a closing NUL.
            loop {
                let name = message_data.read_string()?;

                if name.is_empty() {
                    break;
                }

                let value = message_data.read_string()?;

                parameters.push(StartupParameter { name, value });
            }
        }

        Ok(Self {
            protocol_version,
            parameters,
        })
    }

    /// Serialize the message into a startup frame.
    pub fn frame(&self) -> StartupFrame {
        let mut message_buffer = WriteBuffer::new();

        message_buffer.write_i32(self.protocol_version);

        for parameter in &self.parameters {
            message_buffer.write_string(&parameter.name);
            message_buffer.write_string(&parameter.value);
        }

        if !self.parameters.is_empty() {
            message_buffer.write_byte(0);
        }

        StartupFrame::new(message_buffer.as_slice())
    }

    /// Case-sensitive parameter lookup.
    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .map(|parameter| parameter.value.as_str())
    }

    /// True when this startup message is the SSL handshake probe.
    pub fn is_ssl_request(&self) -> bool {
        self.protocol_version == SSL_REQUEST_CODE
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
