//! DataRow (`D`) — a single row of a query result. A preceding
//! RowDescription is needed to decode the raw values.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

pub const MESSAGE_TYPE: u8 = b'D';

// -----------------------------------------------------------------------------
// ----- DataRow ---------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRow {
    /// Raw column values. `None` is SQL NULL (wire length -1), which is
    /// distinct from an empty byte string.
    pub values: Vec<Option<Vec<u8>>>,
}

impl DataRow {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        let mut message_data = ReadBuffer::new(frame.message_body());

        // Number of columns in the row (could be 0)
        let values_count = message_data.read_i16().map_err(|_| Error::MalformedMessage)?;

        let mut values = Vec::with_capacity(values_count.max(0) as usize);

        for _ in 0..values_count {
            let size = message_data.read_i32().map_err(|_| Error::MalformedMessage)?;

            // -1 is NULL; other negative lengths are nonsense
            if size == -1 {
                values.push(None);
                continue;
            }

            if size < 0 {
                return Err(Error::MalformedMessage);
            }

            let value = message_data
                .read_bytes(size as usize)
                .map_err(|_| Error::MalformedMessage)?;

            values.push(Some(value.to_vec()));
        }

        Ok(Self { values })
    }

    pub fn frame(&self) -> StandardFrame {
        let mut message_buffer = WriteBuffer::new();

        message_buffer.write_i16(self.values.len() as i16);

        for value in &self.values {
            match value {
                // -1 represents NULL
                None => message_buffer.write_i32(-1),
                Some(value) => {
                    message_buffer.write_i32(value.len() as i32);
                    message_buffer.write_bytes(value);
                }
            }
        }

        StandardFrame::new(MESSAGE_TYPE, message_buffer.as_slice())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
