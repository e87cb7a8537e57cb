//! AuthenticationRequest (`R`) — the backend's family of authentication
//! messages. The four-byte status code at the start of the body selects the
//! concrete request kind.

use crate::errors::{Error, Result};
use crate::pg::frame::StandardFrame;
use crate::pg::read_buffer::ReadBuffer;
use crate::pg::write_buffer::WriteBuffer;

pub const MESSAGE_TYPE: u8 = b'R';

// All valid auth status codes.
const STATUS_OK: i32 = 0;
const STATUS_KERBEROS_V5: i32 = 2;
const STATUS_CLEARTEXT_PASSWORD: i32 = 3;
const STATUS_MD5_PASSWORD: i32 = 5;
const STATUS_SCM_CREDENTIAL: i32 = 6;
const STATUS_GSS: i32 = 7;
const STATUS_GSS_CONTINUE: i32 = 8;
const STATUS_SSPI: i32 = 9;

// -----------------------------------------------------------------------------
// ----- AuthenticationRequest -------------------------------------------------

/// One of the backend authentication requests, tagged by status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationRequest {
    /// Authentication was successful.
    Ok,

    /// Kerberos V5 authentication is required.
    KerberosV5,

    /// A clear-text password is required.
    CleartextPassword,

    /// An MD5-encrypted password is required; carries the salt to use.
    Md5Password { salt: [u8; 4] },

    /// An SCM credentials message is required.
    ScmCredential,

    /// GSSAPI authentication is required.
    Gss,

    /// Continuation of GSSAPI or SSPI authentication; carries opaque
    /// mechanism data.
    GssContinue { data: Vec<u8> },

    /// SSPI authentication is required.
    Sspi,
}

impl AuthenticationRequest {
    /// Parse an authentication request from a network frame.
    pub fn parse(frame: &StandardFrame) -> Result<Self> {
        if frame.message_type() != MESSAGE_TYPE {
            return Err(Error::MalformedMessage);
        }

        let mut message_data = ReadBuffer::new(frame.message_body());
        let status = message_data.read_i32().map_err(|_| Error::MalformedMessage)?;

        match status {
            STATUS_OK => Ok(Self::Ok),
            STATUS_KERBEROS_V5 => Ok(Self::KerberosV5),
            STATUS_CLEARTEXT_PASSWORD => Ok(Self::CleartextPassword),
            STATUS_MD5_PASSWORD => {
                let salt_bytes = message_data
                    .read_bytes(4)
                    .map_err(|_| Error::MalformedMessage)?;

                let mut salt = [0u8; 4];
                salt.copy_from_slice(salt_bytes);

                Ok(Self::Md5Password { salt })
            }
            STATUS_SCM_CREDENTIAL => Ok(Self::ScmCredential),
            STATUS_GSS => Ok(Self::Gss),
            STATUS_GSS_CONTINUE => {
                let data = message_data
                    .read_bytes(message_data.len())
                    .map_err(|_| Error::MalformedMessage)?
                    .to_vec();

                Ok(Self::GssContinue { data })
            }
            STATUS_SSPI => Ok(Self::Sspi),

            // Unknown status code. Probably a newer protocol?
            unknown => Err(Error::UnsupportedAuthenticationRequest(unknown)),
        }
    }

    /// Serialize the message into a network frame.
    pub fn frame(&self) -> StandardFrame {
        let mut message_buffer = WriteBuffer::new();

        match self {
            Self::Ok => message_buffer.write_i32(STATUS_OK),
            Self::KerberosV5 => message_buffer.write_i32(STATUS_KERBEROS_V5),
            Self::CleartextPassword => message_buffer.write_i32(STATUS_CLEARTEXT_PASSWORD),
            Self::Md5Password { salt } => {
                message_buffer.write_i32(STATUS_MD5_PASSWORD);
                message_buffer.write_bytes(salt);
            }
            Self::ScmCredential => message_buffer.write_i32(STATUS_SCM_CREDENTIAL),
            Self::Gss => message_buffer.write_i32(STATUS_GSS),
            Self::GssContinue { data } => {
                message_buffer.write_i32(STATUS_GSS_CONTINUE);
                message_buffer.write_bytes(data);
            }
            Self::Sspi => message_buffer.write_i32(STATUS_SSPI),
        }

        StandardFrame::new(MESSAGE_TYPE, message_buffer.as_slice())
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
