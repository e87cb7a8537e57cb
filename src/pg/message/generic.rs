//! GenericMessage — raw pass-through for any message kind the proxy does
//! not model. Keeps the original type byte and body so re-framing is
//! byte-identical.

use crate::errors::Result;
use crate::pg::frame::StandardFrame;

// -----------------------------------------------------------------------------
// ----- GenericMessage --------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericMessage {
    pub message_type: u8,
    pub body: Vec<u8>,
}

impl GenericMessage {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        Ok(Self {
            message_type: frame.message_type(),
            body: frame.message_body().to_vec(),
        })
    }

    pub fn frame(&self) -> StandardFrame {
        StandardFrame::new(self.message_type, &self.body)
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
