//! RowDescription (`T`) — describes the fields of the rows a query will
//! return.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

pub const MESSAGE_TYPE: u8 = b'T';

// -----------------------------------------------------------------------------
// ----- DataFormat ------------------------------------------------------------

/// Wire format code for a field's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Plain text.
    Text,

    /// Binary representation.
    Binary,
}

impl DataFormat {
    fn from_i16(code: i16) -> Result<Self> {
        match code {
            0 => Ok(Self::Text),
            1 => Ok(Self::Binary),
            _ => Err(Error::MalformedMessage),
        }
    }

    fn as_i16(self) -> i16 {
        match self {
            Self::Text => 0,
            Self::Binary => 1,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- FieldDescriptor -------------------------------------------------------

/// Describes one field of a DataRow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// The field name.
    pub name: String,

    /// OID of the originating table, or zero if the field is not a plain
    /// column reference.
    pub table_oid: i32,

    /// Attribute number of the originating column, or zero.
    pub column_index: i16,

    /// OID of the field's data type.
    pub data_type_oid: i32,

    /// Data type size (see `pg_type.typlen`); negative values denote
    /// variable-width types.
    pub data_type_size: i16,

    /// Type modifier (see `pg_attribute.atttypmod`); meaning is
    /// type-specific.
    pub data_type_modifier: i32,

    /// Format the field values will arrive in.
    pub format: DataFormat,
}

// -----------------------------------------------------------------------------
// ----- RowDescription --------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDescription {
    pub fields: Vec<FieldDescriptor>,
}

impl RowDescription {
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        let mut message_data = ReadBuffer::new(frame.message_body());

        // Number of fields (could be 0)
        let fields_count = message_data.read_i16().map_err(|_| Error::MalformedMessage)?;

        let mut fields = Vec::with_capacity(fields_count.max(0) as usize);

        for _ in 0..fields_count {
            let name = message_data.read_string()?;
            let table_oid = message_data.read_i32().map_err(|_| Error::MalformedMessage)?;
            let column_index = message_data.read_i16().map_err(|_| Error::MalformedMessage)?;
            let data_type_oid = message_data.read_i32().map_err(|_| Error::MalformedMessage)?;
            let data_type_size = message_data.read_i16().map_err(|_| Error::MalformedMessage)?;
            let data_type_modifier =
                message_data.read_i32().map_err(|_| Error::MalformedMessage)?;
            let format = message_data.read_i16().map_err(|_| Error::MalformedMessage)?;

            fields.push(FieldDescriptor {
                name,
                table_oid,
                column_index,
                data_type_oid,
                data_type_size,
                data_type_modifier,
                format: DataFormat::from_i16(format)?,
            });
        }

        Ok(Self { fields })
    }

    pub fn frame(&self) -> StandardFrame {
        let mut message_buffer = WriteBuffer::new();

        message_buffer.write_i16(self.fields.len() as i16);

        for field in &self.fields {
            message_buffer.write_string(&field.name);
            message_buffer.write_i32(field.table_oid);
            message_buffer.write_i16(field.column_index);
            message_buffer.write_i32(field.data_type_oid);
            message_buffer.write_i16(field.data_type_size);
            message_buffer.write_i32(field.data_type_modifier);
            message_buffer.write_i16(field.format.as_i16());
        }

        StandardFrame::new(MESSAGE_TYPE, message_buffer.as_slice())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
