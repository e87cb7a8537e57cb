//! Typed message codecs, one module per message kind, plus the [`Message`]
//! sum type and the type-byte dispatch used when receiving frames.

pub mod authentication_request;
pub mod backend_key_data;
pub mod command_complete;
pub mod data_row;
pub mod empty_query_response;
pub mod error_response;
pub mod generic;
pub mod negotiate_protocol_version;
pub mod notice_response;
pub mod parameter_status;
pub mod password;
pub mod query;
pub mod ready_for_query;
pub mod row_description;
pub mod startup;
pub mod terminate;

pub use authentication_request::AuthenticationRequest;
pub use backend_key_data::BackendKeyData;
pub use command_complete::CommandComplete;
pub use data_row::DataRow;
pub use empty_query_response::EmptyQueryResponse;
pub use error_response::ErrorResponse;
pub use generic::GenericMessage;
pub use negotiate_protocol_version::NegotiateProtocolVersion;
pub use notice_response::NoticeResponse;
pub use parameter_status::ParameterStatus;
pub use password::Password;
pub use query::Query;
pub use ready_for_query::{ReadyForQuery, TransactionStatus};
pub use row_description::{DataFormat, FieldDescriptor, RowDescription};
pub use startup::{StartupMessage, StartupParameter};
pub use terminate::Terminate;

use crate::errors::Result;
use crate::pg::frame::{Frame, StandardFrame};

// -----------------------------------------------------------------------------
// ----- MessageOrigin ---------------------------------------------------------

/// Identifies which side of the wire protocol produced a message.
///
/// Several type bytes mean different things depending on the sender (`E` is
/// ErrorResponse from the backend but Execute from a client, `D` is DataRow
/// vs Describe, and so on), so dispatch must know whose bytes it is looking
/// at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrigin {
    /// Message sent by the client (the "frontend" in protocol docs).
    Frontend,

    /// Message sent by the PostgreSQL server (the "backend").
    Backend,
}

// -----------------------------------------------------------------------------
// ----- MessageField ----------------------------------------------------------

/// A single `(type byte, value)` record inside an ErrorResponse or
/// NoticeResponse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageField {
    pub field_type: u8,
    pub value: String,
}

// -----------------------------------------------------------------------------
// ----- Message ---------------------------------------------------------------

/// The typed, parsed content of a frame.
///
/// Message kinds the proxy does not model individually are preserved intact
/// as [`GenericMessage`] so they can be re-emitted byte-for-byte.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    AuthenticationRequest(AuthenticationRequest),
    BackendKeyData(BackendKeyData),
    CommandComplete(CommandComplete),
    DataRow(DataRow),
    EmptyQueryResponse(EmptyQueryResponse),
    ErrorResponse(ErrorResponse),
    Generic(GenericMessage),
    NegotiateProtocolVersion(NegotiateProtocolVersion),
    NoticeResponse(NoticeResponse),
    ParameterStatus(ParameterStatus),
    Password(Password),
    Query(Query),
    ReadyForQuery(ReadyForQuery),
    RowDescription(RowDescription),
    Startup(StartupMessage),
    Terminate(Terminate),
}

impl Message {
    /// Serialize the message back into a network frame.
    pub fn frame(&self) -> Frame {
        match self {
            Message::AuthenticationRequest(m) => Frame::Standard(m.frame()),
            Message::BackendKeyData(m) => Frame::Standard(m.frame()),
            Message::CommandComplete(m) => Frame::Standard(m.frame()),
            Message::DataRow(m) => Frame::Standard(m.frame()),
            Message::EmptyQueryResponse(m) => Frame::Standard(m.frame()),
            Message::ErrorResponse(m) => Frame::Standard(m.frame()),
            Message::Generic(m) => Frame::Standard(m.frame()),
            Message::NegotiateProtocolVersion(m) => Frame::Standard(m.frame()),
            Message::NoticeResponse(m) => Frame::Standard(m.frame()),
            Message::ParameterStatus(m) => Frame::Standard(m.frame()),
            Message::Password(m) => Frame::Standard(m.frame()),
            Message::Query(m) => Frame::Standard(m.frame()),
            Message::ReadyForQuery(m) => Frame::Standard(m.frame()),
            Message::RowDescription(m) => Frame::Standard(m.frame()),
            Message::Startup(m) => Frame::Startup(m.frame()),
            Message::Terminate(m) => Frame::Standard(m.frame()),
        }
    }

    /// Parse a standard frame into the message kind its type byte names,
    /// restricted to the kinds `origin` can legally send. Unrecognized type
    /// bytes pass through untouched as [`Message::Generic`].
    pub fn parse(frame: &StandardFrame, origin: MessageOrigin) -> Result<Message> {
        match origin {
            MessageOrigin::Frontend => Self::parse_frontend(frame),
            MessageOrigin::Backend => Self::parse_backend(frame),
        }
    }

    fn parse_frontend(frame: &StandardFrame) -> Result<Message> {
        match frame.message_type() {
            password::MESSAGE_TYPE => Password::parse(frame).map(Message::Password),
            query::MESSAGE_TYPE => Query::parse(frame).map(Message::Query),
            terminate::MESSAGE_TYPE => Terminate::parse(frame).map(Message::Terminate),
            _ => GenericMessage::parse(frame).map(Message::Generic),
        }
    }

    fn parse_backend(frame: &StandardFrame) -> Result<Message> {
        match frame.message_type() {
            authentication_request::MESSAGE_TYPE => {
                AuthenticationRequest::parse(frame).map(Message::AuthenticationRequest)
            }
            backend_key_data::MESSAGE_TYPE => {
                BackendKeyData::parse(frame).map(Message::BackendKeyData)
            }
            command_complete::MESSAGE_TYPE => {
                CommandComplete::parse(frame).map(Message::CommandComplete)
            }
            data_row::MESSAGE_TYPE => DataRow::parse(frame).map(Message::DataRow),
            empty_query_response::MESSAGE_TYPE => {
                EmptyQueryResponse::parse(frame).map(Message::EmptyQueryResponse)
            }
            error_response::MESSAGE_TYPE => {
                ErrorResponse::parse(frame).map(Message::ErrorResponse)
            }
            negotiate_protocol_version::MESSAGE_TYPE => {
                NegotiateProtocolVersion::parse(frame).map(Message::NegotiateProtocolVersion)
            }
            notice_response::MESSAGE_TYPE => {
                NoticeResponse::parse(frame).map(Message::NoticeResponse)
            }
            parameter_status::MESSAGE_TYPE => {
                ParameterStatus::parse(frame).map(Message::ParameterStatus)
            }
            ready_for_query::MESSAGE_TYPE => {
                ReadyForQuery::parse(frame).map(Message::ReadyForQuery)
            }
            row_description::MESSAGE_TYPE => {
                RowDescription::parse(frame).map(Message::RowDescription)
            }
            _ => GenericMessage::parse(frame).map(Message::Generic),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_dispatch_picks_typed_parser() {
        let frame = StandardFrame::new(b'Z', b"I");
        let message = Message::parse(&frame, MessageOrigin::Backend).unwrap();

        assert!(matches!(message, Message::ReadyForQuery(_)));
    }

    #[test]
    fn frontend_dispatch_ignores_backend_types() {
        // 'Z' from a client is not ReadyForQuery; it passes through raw.
        let frame = StandardFrame::new(b'Z', b"I");
        let message = Message::parse(&frame, MessageOrigin::Frontend).unwrap();

        assert!(matches!(message, Message::Generic(_)));
    }

    #[test]
    fn execute_from_client_is_not_error_response() {
        // 'E' from a client is Execute (portal name + row limit); parsing it
        // as an ErrorResponse would corrupt the stream.
        let frame = StandardFrame::new(b'E', b"\0\0\0\0\0");
        let message = Message::parse(&frame, MessageOrigin::Frontend).unwrap();

        let Message::Generic(generic) = message else {
            panic!("expected generic pass-through");
        };
        assert_eq!(generic.frame().bytes(), frame.bytes());
    }

    #[test]
    fn unknown_type_round_trips() {
        let frame = StandardFrame::new(b'$', b"test test");
        let message = Message::parse(&frame, MessageOrigin::Frontend).unwrap();

        assert_eq!(message.frame().bytes(), frame.bytes());
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
