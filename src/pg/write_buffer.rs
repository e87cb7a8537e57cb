//! Append-only encoder for the PostgreSQL primitive data types. Mirrors
//! `ReadBuffer` on the write side.

use bytes::{BufMut, Bytes, BytesMut};

// -----------------------------------------------------------------------------
// ----- WriteBuffer -----------------------------------------------------------

/// A byte accumulator where every write appends; the final contents equal
/// the concatenation of all writes in order.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    bytes: BytesMut,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes.freeze()
    }
}

// -----------------------------------------------------------------------------
// ----- WriteBuffer: Writes ---------------------------------------------------

impl WriteBuffer {
    pub fn write_bytes(&mut self, v: &[u8]) {
        self.bytes.extend_from_slice(v);
    }

    pub fn write_byte(&mut self, c: u8) {
        self.bytes.put_u8(c);
    }

    pub fn write_i16(&mut self, num: i16) {
        self.bytes.put_i16(num);
    }

    pub fn write_i32(&mut self, num: i32) {
        self.bytes.put_i32(num);
    }

    /// Append the string bytes followed by the NUL terminator.
    pub fn write_string(&mut self, s: &str) {
        self.bytes.extend_from_slice(s.as_bytes());
        self.bytes.put_u8(0);
    }

    pub fn write_i16_array(&mut self, arr: &[i16]) {
        for num in arr {
            self.bytes.put_i16(*num);
        }
    }

    pub fn write_i32_array(&mut self, arr: &[i32]) {
        for num in arr {
            self.bytes.put_i32(*num);
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
