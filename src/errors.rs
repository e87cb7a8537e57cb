use std::io;

// -----------------------------------------------------------------------------
// ----- Error -----------------------------------------------------------------

/// Crate-wide error type. Protocol decoding, configuration plumbing and
/// lifecycle violations all surface through this enum so callers match on
/// one type at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The stream ended where more bytes were expected.
    #[error("pg: unexpected end of stream")]
    Eof,

    /// Frame type mismatch or decoder failure.
    #[error("pg: malformed message")]
    MalformedMessage,

    /// The backend sent an authentication request we do not model.
    #[error("pg: unsupported authentication request (status {0})")]
    UnsupportedAuthenticationRequest(i32),

    /// The client opened the session with something other than protocol 3.0.
    #[error("session: unsupported protocol version {0}")]
    UnsupportedProtocolVersion(i32),

    /// The client asked for a database other than the one being proxied.
    #[error("session: database mismatch: {requested:?} != {allowed:?}")]
    DatabaseMismatch { requested: String, allowed: String },

    /// The configured database URL could not be parsed.
    #[error("pg: invalid database URI: {0}")]
    InvalidDatabaseUri(String),

    #[error("config_distributor: distributor is closed")]
    ConfigDistributorClosed,

    #[error("server: server closed")]
    ServerClosed,

    #[error("server: server already started")]
    ServerAlreadyStarted,

    #[error("session: session closed")]
    SessionClosed,

    /// Configuration file problems (missing, unreadable, bad TOML).
    #[error("config: {0}")]
    Config(String),

    /// Metadata inspection errors from the database driver.
    #[error("pgmeta: {0}")]
    Inspection(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
