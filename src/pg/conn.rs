//! Framed message I/O over a byte stream.
//!
//! A `Conn` wraps one side of the proxy (the client socket or the upstream
//! database socket) and reads/writes whole protocol messages. It is built
//! for a known peer so received frames dispatch against the right half of
//! the protocol.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};

use crate::errors::Result;
use crate::pg::frame::{read_standard_frame, read_startup_frame};
use crate::pg::message::{Message, MessageOrigin, StartupMessage};

// -----------------------------------------------------------------------------
// ----- Conn ------------------------------------------------------------------

pub struct Conn<S> {
    stream: S,
    origin: MessageOrigin,
}

impl<S> Conn<S> {
    /// Wrap the socket a client connected on; received messages are parsed
    /// as frontend messages.
    pub fn frontend(stream: S) -> Self {
        Self {
            stream,
            origin: MessageOrigin::Frontend,
        }
    }

    /// Wrap the socket dialed to the database; received messages are parsed
    /// as backend messages.
    pub fn backend(stream: S) -> Self {
        Self {
            stream,
            origin: MessageOrigin::Backend,
        }
    }

    pub fn origin(&self) -> MessageOrigin {
        self.origin
    }
}

// -----------------------------------------------------------------------------
// ----- Conn: Receiving -------------------------------------------------------

impl<S: AsyncRead + Unpin> Conn<S> {
    /// Receive the StartupMessage that opens a session.
    pub async fn recv_startup_message(&mut self) -> Result<StartupMessage> {
        let frame = read_startup_frame(&mut self.stream).await?;

        StartupMessage::parse(&frame)
    }

    /// Receive the next message, dispatching by type byte.
    pub async fn recv_message(&mut self) -> Result<Message> {
        let frame = read_standard_frame(&mut self.stream).await?;

        Message::parse(&frame, self.origin)
    }
}

// -----------------------------------------------------------------------------
// ----- Conn: Sending ---------------------------------------------------------

impl<S: AsyncWrite + Unpin> Conn<S> {
    /// Send the given message over the network. The whole frame is written
    /// before returning.
    pub async fn send_message(&mut self, message: &Message) -> Result<()> {
        self.stream.write_all(message.frame().bytes()).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Send a single raw byte (used only for the `'N'` SSL denial).
    pub async fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.stream.write_all(&[byte]).await?;
        self.stream.flush().await?;

        Ok(())
    }

    /// Shut down the underlying stream. Dropping the `Conn` closes it too;
    /// this variant flushes and signals the peer first.
    pub async fn close(&mut self) -> Result<()> {
        self.stream.shutdown().await?;

        Ok(())
    }
}

// -----------------------------------------------------------------------------
// ----- Conn: Splitting -------------------------------------------------------

impl<S: AsyncRead + AsyncWrite + Unpin> Conn<S> {
    /// Split into independently owned read and write halves so separate
    /// tasks can pump each direction. Both halves keep the peer identity.
    pub fn into_split(self) -> (Conn<ReadHalf<S>>, Conn<WriteHalf<S>>) {
        let origin = self.origin;
        let (read_half, write_half) = tokio::io::split(self.stream);

        (
            Conn {
                stream: read_half,
                origin,
            },
            Conn {
                stream: write_half,
                origin,
            },
        )
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::pg::message::query::Query;
    use crate::pg::message::startup::{PROTOCOL_VERSION, StartupParameter};
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn startup_message_round_trip() {
        let (client, server) = tokio::io::duplex(256);
        let mut client = Conn::backend(client);
        let mut server = Conn::frontend(server);

        let startup = StartupMessage {
            protocol_version: PROTOCOL_VERSION,
            parameters: vec![StartupParameter {
                name: "user".to_owned(),
                value: "alice".to_owned(),
            }],
        };

        client
            .send_message(&Message::Startup(startup.clone()))
            .await
            .unwrap();

        let received = server.recv_startup_message().await.unwrap();
        assert_eq!(received, startup);
    }

    #[tokio::test]
    async fn typed_message_round_trip() {
        let (client, server) = tokio::io::duplex(256);
        let mut client = Conn::backend(client);
        let mut server = Conn::frontend(server);

        let query = Message::Query(Query {
            query: "SELECT 1".to_owned(),
        });

        client.send_message(&query).await.unwrap();

        let received = server.recv_message().await.unwrap();
        assert_eq!(received, query);
    }

    #[tokio::test]
    async fn unknown_message_passes_through() {
        let (mut raw, server) = tokio::io::duplex(256);
        let mut server = Conn::frontend(server);

        let frame = crate::pg::frame::StandardFrame::new(b'$', b"test test");
        raw.write_all(frame.bytes()).await.unwrap();

        let received = server.recv_message().await.unwrap();
        assert_eq!(received.frame().bytes(), frame.bytes());
    }

    #[tokio::test]
    async fn send_byte_writes_exactly_one_byte() {
        let (client, server) = tokio::io::duplex(16);
        let mut client = Conn::frontend(client);

        client.send_byte(b'N').await.unwrap();
        drop(client);

        let mut received = Vec::new();
        let mut server = server;
        tokio::io::AsyncReadExt::read_to_end(&mut server, &mut received)
            .await
            .unwrap();

        assert_eq!(received, vec![b'N']);
    }

    #[tokio::test]
    async fn recv_on_closed_stream_is_eof() {
        let (client, server) = tokio::io::duplex(16);
        drop(client);

        let mut server = Conn::frontend(server);

        assert!(matches!(server.recv_message().await, Err(Error::Eof)));
    }

    #[tokio::test]
    async fn split_halves_keep_working() {
        let (near, far) = tokio::io::duplex(256);
        let near = Conn::frontend(near);
        let (mut far_read, mut far_write) = Conn::frontend(far).into_split();

        let (mut near_read, mut near_write) = near.into_split();

        let message = Message::Query(Query {
            query: "SELECT 2".to_owned(),
        });

        near_write.send_message(&message).await.unwrap();
        assert_eq!(far_read.recv_message().await.unwrap(), message);

        far_write.send_message(&message).await.unwrap();
        assert_eq!(near_read.recv_message().await.unwrap(), message);
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
