//! Startup handshake with the upstream manager process.
//!
//! One fixed control message announces this server (and its current user
//! count) to the manager endpoint. The caller treats failure as
//! non-fatal; a missing manager must never keep the server down.

use std::io::{self, Write};
use std::net::TcpStream;

use bytes::BufMut;

use crate::protocol::{codec, FieldTag, Header, MsgType, PROTOCOL_VERSION, SERVER_ID};

/// Announces this server to the manager at `addr`.
pub fn announce(addr: &str, user_count: u32) -> io::Result<()> {
    let mut payload = Vec::with_capacity(4);
    payload.put_u8(FieldTag::Integer.wire_value());
    payload.put_u8(2);
    payload.put_u16(user_count.min(u32::from(u16::MAX)) as u16);

    let header = Header {
        msg_type: MsgType::AccLogin,
        version: PROTOCOL_VERSION,
        sender_id: SERVER_ID,
        payload_len: payload.len() as u16,
    };

    let mut stream = TcpStream::connect(addr)?;
    stream.write_all(&codec::encode_header(&header))?;
    stream.write_all(&payload)?;
    Ok(())
}
