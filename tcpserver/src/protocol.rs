//! Binary message protocol.
//!
//! Every exchange is one fixed-format request followed by one response:
//!
//! ```text
//! [type:u8][version:u8][sender_id:u16 BE][payload_len:u16 BE][payload...]
//! ```
//!
//! `payload_len` counts only the payload bytes, never the 6-byte header.
//! Payload fields are TLV encoded (`tag:u8`, `len:u8`, `value[len]`), with
//! the tag naming the wire type of the value.

use thiserror::Error;

pub mod codec;

/// Size of the fixed wire header in bytes.
pub const HEADER_LEN: usize = 6;

/// Protocol version stamped on every message this server produces.
pub const PROTOCOL_VERSION: u8 = 1;

/// Sender id used by the server itself.
pub const SERVER_ID: u16 = 0;

/// Message type tag carried in the first header byte.
///
/// Unknown wire values survive a decode/encode round trip through
/// [`MsgType::Unknown`]; whether they are serviceable is decided later, by
/// the body decoder and the dispatch tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgType {
    /// Generic success response.
    SysSuccess,
    /// Generic error response.
    SysError,
    /// Account creation request (credentials payload).
    AccCreate,
    /// Login request (credentials payload).
    AccLogin,
    /// Successful create/login response.
    AccLoginSuccess,
    /// Logout request (no payload).
    AccLogout,
    /// Chat send request.
    ChatSend,
    /// Any tag this core does not know about.
    Unknown(u8),
}

impl MsgType {
    pub fn from_wire(value: u8) -> Self {
        match value {
            0 => Self::SysSuccess,
            1 => Self::SysError,
            10 => Self::AccCreate,
            11 => Self::AccLogin,
            12 => Self::AccLoginSuccess,
            13 => Self::AccLogout,
            20 => Self::ChatSend,
            other => Self::Unknown(other),
        }
    }

    pub fn wire_value(self) -> u8 {
        match self {
            Self::SysSuccess => 0,
            Self::SysError => 1,
            Self::AccCreate => 10,
            Self::AccLogin => 11,
            Self::AccLoginSuccess => 12,
            Self::AccLogout => 13,
            Self::ChatSend => 20,
            Self::Unknown(other) => other,
        }
    }
}

/// TLV tag naming the wire type of a payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    Integer,
    Utf8String,
}

impl FieldTag {
    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0x02 => Some(Self::Integer),
            0x0c => Some(Self::Utf8String),
            _ => None,
        }
    }

    pub fn wire_value(self) -> u8 {
        match self {
            Self::Integer => 0x02,
            Self::Utf8String => 0x0c,
        }
    }
}

/// Fixed 6-byte wire header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub msg_type: MsgType,
    pub version: u8,
    pub sender_id: u16,
    pub payload_len: u16,
}

/// Decoded request payload, keyed by the header type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Username and password, byte-exact as they appeared on the wire.
    Credentials { username: Vec<u8>, password: Vec<u8> },
    /// No payload (logout, and any zero-length request).
    Empty,
}

/// Closed status enumeration carried in every response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    InvalidUserId,
    InvalidAuth,
    UserExists,
    ServerError,
    InvalidRequest,
    RequestTimeout,
}

impl StatusCode {
    pub fn code(self) -> u8 {
        match self {
            Self::Ok => 0,
            Self::InvalidUserId => 1,
            Self::InvalidAuth => 2,
            Self::UserExists => 3,
            Self::ServerError => 4,
            Self::InvalidRequest => 5,
            Self::RequestTimeout => 6,
        }
    }

    pub fn from_wire(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Ok),
            1 => Some(Self::InvalidUserId),
            2 => Some(Self::InvalidAuth),
            3 => Some(Self::UserExists),
            4 => Some(Self::ServerError),
            5 => Some(Self::InvalidRequest),
            6 => Some(Self::RequestTimeout),
            _ => None,
        }
    }

    /// Fixed human-readable message, empty for OK.
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "",
            Self::InvalidUserId => "Invalid User ID",
            Self::InvalidAuth => "Invalid Authentication Information",
            Self::UserExists => "User Already Exists",
            Self::ServerError => "Server Error",
            Self::InvalidRequest => "Invalid Request",
            Self::RequestTimeout => "Request Timeout",
        }
    }
}

/// Header fields of the response being built for the current request.
///
/// Business handlers fill this in; the respond state combines it with the
/// status envelope. Defaults describe a server-originated error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHead {
    pub msg_type: MsgType,
    pub version: u8,
    pub sender_id: u16,
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self {
            msg_type: MsgType::SysError,
            version: PROTOCOL_VERSION,
            sender_id: SERVER_ID,
        }
    }
}

/// Decode failures raised by the wire codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("truncated input: needed {needed} bytes, found {found}")]
    Truncated { needed: usize, found: usize },
    #[error("unrecognized message type {0}")]
    UnknownType(u8),
    #[error("unrecognized field tag {0:#04x}")]
    UnknownTag(u8),
}

impl CodecError {
    /// The status a failed decode reports back to the client. Malformed or
    /// unrecognized wire content is always the client's problem.
    pub fn status(&self) -> StatusCode {
        StatusCode::InvalidRequest
    }
}
