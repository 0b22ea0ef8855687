//! Server test modules.
//!
//! Socket-driven tests build real loopback connections and run the state
//! machine (or the whole multiplexer) against them from the test thread.

mod test_fsm;
mod test_manager;

use std::net::{TcpListener, TcpStream};

use crate::protocol::{codec, Header, MsgType, PROTOCOL_VERSION};

/// A connected loopback pair: (client side, server side).
pub fn socket_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");
    let client = TcpStream::connect(addr).expect("connect loopback client");
    let (server, _) = listener.accept().expect("accept loopback client");
    (client, server)
}

/// Serializes a complete request: header plus payload.
pub fn build_request(msg_type: MsgType, sender_id: u16, payload: &[u8]) -> Vec<u8> {
    let header = Header {
        msg_type,
        version: PROTOCOL_VERSION,
        sender_id,
        payload_len: payload.len() as u16,
    };
    let mut request = codec::encode_header(&header).to_vec();
    request.extend_from_slice(payload);
    request
}
