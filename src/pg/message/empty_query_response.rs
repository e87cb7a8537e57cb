//! EmptyQueryResponse (`I`) — the backend's answer to an empty query
//! string. The body is empty.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;

pub const MESSAGE_TYPE: u8 = b'I';

// -----------------------------------------------------------------------------
// ----- EmptyQueryResponse ----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmptyQueryResponse;

impl EmptyQueryResponse {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        Ok(Self)
    }

    pub fn frame(&self) -> StandardFrame {
        StandardFrame::new(MESSAGE_TYPE, &[])
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
