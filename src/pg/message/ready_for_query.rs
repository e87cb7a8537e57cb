//! ReadyForQuery (`Z`) — the backend is ready for a new command cycle. The
//! single body byte reports the transaction status.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::read_buffer::ReadBuffer;

pub const MESSAGE_TYPE: u8 = b'Z';

// -----------------------------------------------------------------------------
// ----- TransactionStatus -----------------------------------------------------

/// Backend transaction status reported after each command cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Idle,
    InTransaction,
    FailedTransaction,
}

impl TransactionStatus {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            b'I' => Ok(Self::Idle),
            b'T' => Ok(Self::InTransaction),
            b'E' => Ok(Self::FailedTransaction),
            _ => Err(Error::MalformedMessage),
        }
    }

    fn as_byte(self) -> u8 {
        match self {
            Self::Idle => b'I',
            Self::InTransaction => b'T',
            Self::FailedTransaction => b'E',
        }
    }
}

// -----------------------------------------------------------------------------
// ----- ReadyForQuery ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyForQuery {
    pub transaction_status: TransactionStatus,
}

impl ReadyForQuery {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        let mut message_data = ReadBuffer::new(frame.message_body());
        let status_byte = message_data.read_byte().map_err(|_| Error::MalformedMessage)?;

        Ok(Self {
            transaction_status: TransactionStatus::from_byte(status_byte)?,
        })
    }

    pub fn frame(&self) -> StandardFrame {
        StandardFrame::new(MESSAGE_TYPE, &[self.transaction_status.as_byte()])
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
