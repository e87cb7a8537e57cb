//! PostgreSQL v3 wire codec: buffers, frames, typed messages and the framed
//! connection wrapper the proxy moves messages through.

pub mod conn;
pub mod dsn;
pub mod frame;
pub mod message;
pub mod read_buffer;
pub mod write_buffer;

pub use conn::Conn;
pub use dsn::{ConnectionSettings, parse_database_uri};
pub use frame::{Frame, StandardFrame, StartupFrame, read_standard_frame, read_startup_frame};
pub use message::{Message, MessageOrigin, StartupMessage};
pub use read_buffer::ReadBuffer;
pub use write_buffer::WriteBuffer;
