//! Terminate (`X`) — the client's goodbye. The body is empty.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;

pub const MESSAGE_TYPE: u8 = b'X';

// -----------------------------------------------------------------------------
// ----- Terminate -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Terminate;

impl Terminate {
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
