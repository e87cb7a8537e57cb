//! Length-prefixed byte containers for single protocol messages, plus the
//! async readers that pull them off a stream.
//!
//! A frame keeps the full on-wire bytes, so re-emitting a parsed frame is
//! byte-identical to what arrived.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::errors::{Error, Result};
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

// -----------------------------------------------------------------------------
// ----- Frame -----------------------------------------------------------------

/// A raw PostgreSQL message as sent over the network.
///
/// Almost every message travels in a [`StandardFrame`]; the lone exception
/// is the startup message, which for historical reasons has no type byte
/// and travels in a [`StartupFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Standard(StandardFrame),
    Startup(StartupFrame),
}

impl Frame {
    pub fn message_type(&self) -> u8 {
        match self {
            Frame::Standard(f) => f.message_type(),
            Frame::Startup(f) => f.message_type(),
        }
    }

    pub fn message_body(&self) -> &[u8] {
        match self {
            Frame::Standard(f) => f.message_body(),
            Frame::Startup(f) => f.message_body(),
        }
    }

    /// Raw bytes of the frame, ready to be sent over the network.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Frame::Standard(f) => f.bytes(),
            Frame::Startup(f) => f.bytes(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- StandardFrame ---------------------------------------------------------

/// Layout: `type(1) | length(i32 BE) | body`. The length counts itself but
/// not the type byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandardFrame(Bytes);

impl StandardFrame {
    pub fn new(message_type: u8, message_body: &[u8]) -> Self {
        let mut buffer = WriteBuffer::with_capacity(message_body.len() + 5);

        buffer.write_byte(message_type);
        buffer.write_i32(message_body.len() as i32 + 4);
        buffer.write_bytes(message_body);

        Self(buffer.into_bytes())
    }

    pub fn message_type(&self) -> u8 {
        self.0[0]
    }

    pub fn message_body(&self) -> &[u8] {
        &self.0[5..]
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

// -----------------------------------------------------------------------------
// ----- StartupFrame ----------------------------------------------------------

/// Layout: `length(i32 BE) | body`. No type byte; callers treat the type
/// as `0x00`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupFrame(Bytes);

impl StartupFrame {
    pub fn new(message_body: &[u8]) -> Self {
        let mut buffer = WriteBuffer::with_capacity(message_body.len() + 4);

        // NB: no message type, just the frame length and the message
        buffer.write_i32(message_body.len() as i32 + 4);
        buffer.write_bytes(message_body);

        Self(buffer.into_bytes())
    }

    pub fn message_type(&self) -> u8 {
        0x00
    }

    pub fn message_body(&self) -> &[u8] {
        &self.0[4..]
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

// -----------------------------------------------------------------------------
// ----- Frame readers ---------------------------------------------------------

/// Read a standard frame off the stream. A clean end-of-stream on the very
/// first byte surfaces as [`Error::Eof`], the signal that the peer closed.
pub async fn read_standard_frame<R>(stream: &mut R) -> Result<StandardFrame>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 5];
    read_leading_byte(stream, &mut header[..1]).await?;
    stream.read_exact(&mut header[1..]).await?;

    let mut frame_header = ReadBuffer::new(&header);
    let _message_type = frame_header.read_byte()?;
    let frame_length = frame_header.read_i32()?;

    let body = read_frame_body(stream, frame_length).await?;

    let mut frame = BytesMut::with_capacity(header.len() + body.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&body);

    Ok(StandardFrame(frame.freeze()))
}

/// Read a startup frame off the stream. Identical to
/// [`read_standard_frame`] except the header is four bytes and there is no
/// type byte.
pub async fn read_startup_frame<R>(stream: &mut R) -> Result<StartupFrame>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    read_leading_byte(stream, &mut header[..1]).await?;
    stream.read_exact(&mut header[1..]).await?;

    let mut frame_header = ReadBuffer::new(&header);
    let frame_length = frame_header.read_i32()?;

    let body = read_frame_body(stream, frame_length).await?;

    let mut frame = BytesMut::with_capacity(header.len() + body.len());
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&body);

    Ok(StartupFrame(frame.freeze()))
}

// -----------------------------------------------------------------------------
// ----- Private Helpers -------------------------------------------------------

/// Read the first header byte, mapping a clean EOF to [`Error::Eof`]. An
/// end-of-stream later in the frame stays an I/O error: the peer hung up
/// mid-message.
async fn read_leading_byte<R>(stream: &mut R, byte: &mut [u8]) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    match stream.read_exact(byte).await {
        Ok(_) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Err(Error::Eof),
        Err(err) => Err(err.into()),
    }
}

async fn read_frame_body<R>(stream: &mut R, frame_length: i32) -> Result<BytesMut>
where
    R: AsyncRead + Unpin,
{
    // The length field counts itself; anything smaller cannot be a frame.
    if frame_length < 4 {
        return Err(Error::MalformedMessage);
    }

    let mut body = BytesMut::zeroed(frame_length as usize - 4);
    stream.read_exact(&mut body).await?;

    Ok(body)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
