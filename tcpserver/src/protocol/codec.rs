//! Wire codec: pure byte-level encode/decode, no I/O.
//!
//! Decoding goes through a bounds-checked cursor; a short buffer is a decode
//! error, never an out-of-range access. Encoding appends through `BufMut`.

use bytes::BufMut;

use super::{
    Body, CodecError, FieldTag, Header, MsgType, ResponseHead, StatusCode, HEADER_LEN,
};

/// Bounds-checked cursor over an input buffer.
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(len).ok_or(CodecError::Truncated {
            needed: usize::MAX,
            found: self.buf.len(),
        })?;
        if end > self.buf.len() {
            return Err(CodecError::Truncated {
                needed: end,
                found: self.buf.len(),
            });
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

/// Decodes the fixed 6-byte header. Fails if fewer than 6 bytes are present;
/// the type byte is accepted verbatim, known or not.
pub fn decode_header(buf: &[u8]) -> Result<Header, CodecError> {
    if buf.len() < HEADER_LEN {
        return Err(CodecError::Truncated {
            needed: HEADER_LEN,
            found: buf.len(),
        });
    }
    let mut reader = ByteReader::new(buf);
    let msg_type = MsgType::from_wire(reader.read_u8()?);
    let version = reader.read_u8()?;
    let sender_id = reader.read_u16()?;
    let payload_len = reader.read_u16()?;
    Ok(Header {
        msg_type,
        version,
        sender_id,
        payload_len,
    })
}

/// Encodes the fixed 6-byte header, the exact inverse of [`decode_header`].
pub fn encode_header(header: &Header) -> [u8; HEADER_LEN] {
    let sender = header.sender_id.to_be_bytes();
    let len = header.payload_len.to_be_bytes();
    [
        header.msg_type.wire_value(),
        header.version,
        sender[0],
        sender[1],
        len[0],
        len[1],
    ]
}

/// Reads one TLV field, returning the value bytes exactly as declared by the
/// field's own length byte.
fn read_tlv<'a>(reader: &mut ByteReader<'a>) -> Result<&'a [u8], CodecError> {
    let tag = reader.read_u8()?;
    FieldTag::from_wire(tag).ok_or(CodecError::UnknownTag(tag))?;
    let len = reader.read_u8()? as usize;
    reader.take(len)
}

/// Decodes the payload that follows a decoded header.
///
/// `payload` must hold at least `header.payload_len` bytes; extra trailing
/// bytes beyond the declared length are ignored. Types this core does not
/// service decode to an error unless the payload is empty.
pub fn decode_body(header: &Header, payload: &[u8]) -> Result<Body, CodecError> {
    let declared = header.payload_len as usize;
    if payload.len() < declared {
        return Err(CodecError::Truncated {
            needed: declared,
            found: payload.len(),
        });
    }
    let payload = &payload[..declared];

    match header.msg_type {
        MsgType::AccCreate | MsgType::AccLogin => {
            let mut reader = ByteReader::new(payload);
            let username = read_tlv(&mut reader)?.to_vec();
            let password = read_tlv(&mut reader)?.to_vec();
            Ok(Body::Credentials { username, password })
        }
        MsgType::AccLogout => Ok(Body::Empty),
        _ if declared == 0 => Ok(Body::Empty),
        other => Err(CodecError::UnknownType(other.wire_value())),
    }
}

/// Encodes the standard status envelope.
///
/// - OK, not logout: 3-byte status TLV.
/// - OK, logout: nothing at all (logout never answers with a body).
/// - any other status: status TLV followed by the message TLV for the
///   status's fixed string.
pub fn encode_status_envelope(status: StatusCode, logout: bool) -> Vec<u8> {
    if status == StatusCode::Ok && logout {
        return Vec::new();
    }

    let message = status.message();
    let mut out = Vec::with_capacity(3 + 2 + message.len());
    out.put_u8(FieldTag::Integer.wire_value());
    out.put_u8(1);
    out.put_u8(status.code());
    if status != StatusCode::Ok {
        out.put_u8(FieldTag::Utf8String.wire_value());
        out.put_u8(message.len() as u8);
        out.put_slice(message.as_bytes());
    }
    out
}

/// Assembles a complete response: header with the computed payload length,
/// then the status envelope.
pub fn encode_response(head: &ResponseHead, status: StatusCode, logout: bool) -> Vec<u8> {
    let envelope = encode_status_envelope(status, logout);
    let header = Header {
        msg_type: head.msg_type,
        version: head.version,
        sender_id: head.sender_id,
        payload_len: envelope.len() as u16,
    };
    let mut out = Vec::with_capacity(HEADER_LEN + envelope.len());
    out.put_slice(&encode_header(&header));
    out.put_slice(&envelope);
    out
}

/// Encodes a credentials payload (username TLV then password TLV).
///
/// The inverse of the credentials arm of [`decode_body`]; used by tests and
/// by client-side callers of the protocol.
pub fn encode_credentials(username: &[u8], password: &[u8]) -> Vec<u8> {
    debug_assert!(username.len() <= u8::MAX as usize);
    debug_assert!(password.len() <= u8::MAX as usize);
    let mut out = Vec::with_capacity(4 + username.len() + password.len());
    out.put_u8(FieldTag::Utf8String.wire_value());
    out.put_u8(username.len() as u8);
    out.put_slice(username);
    out.put_u8(FieldTag::Utf8String.wire_value());
    out.put_u8(password.len() as u8);
    out.put_slice(password);
    out
}
