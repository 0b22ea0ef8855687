//! Manager handshake tests.

use std::io::Read;
use std::net::TcpListener;

use crate::protocol::{codec, MsgType, PROTOCOL_VERSION};
use crate::service::manager;

#[test]
fn announce_sends_one_fixed_control_message() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind manager listener");
    let addr = listener.local_addr().expect("listener address").to_string();

    manager::announce(&addr, 7).expect("announce");

    let (mut stream, _) = listener.accept().expect("accept handshake");
    let mut message = Vec::new();
    stream.read_to_end(&mut message).expect("read handshake");

    assert_eq!(message.len(), 10);
    let header = codec::decode_header(&message).expect("decode handshake header");
    assert_eq!(header.msg_type, MsgType::AccLogin);
    assert_eq!(header.version, PROTOCOL_VERSION);
    assert_eq!(header.sender_id, 0);
    assert_eq!(header.payload_len, 4);
    // INTEGER TLV carrying the user count, big-endian
    assert_eq!(&message[6..], &[0x02, 2, 0, 7]);
}

#[test]
fn announce_saturates_oversized_counts() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind manager listener");
    let addr = listener.local_addr().expect("listener address").to_string();

    manager::announce(&addr, 100_000).expect("announce");

    let (mut stream, _) = listener.accept().expect("accept handshake");
    let mut message = Vec::new();
    stream.read_to_end(&mut message).expect("read handshake");
    assert_eq!(&message[6..], &[0x02, 2, 0xff, 0xff]);
}

#[test]
fn announce_reports_an_unreachable_manager() {
    // Port 1 on loopback is expected to refuse the connection.
    assert!(manager::announce("127.0.0.1:1", 0).is_err());
}
