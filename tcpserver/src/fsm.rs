//! Table-driven request state machine.
//!
//! One run of this machine takes a ready connection through
//! read-header → read-body → process → respond (or the error path) and
//! always ends with the socket closed; every connection serves exactly one
//! request/response exchange.
//!
//! The legal state graph is a static edge table. Looking up an edge that is
//! not in the table is a wiring bug, not a protocol error: the run aborts,
//! the context is torn down, and nothing is written to the peer.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::handler::{self, DispatchOutcome};
use crate::protocol::{
    codec, Body, Header, MsgType, ResponseHead, StatusCode, HEADER_LEN, PROTOCOL_VERSION,
    SERVER_ID,
};

/// Protocol-handling states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    ReadHeader,
    ReadBody,
    Process,
    Respond,
    Error,
    End,
}

/// Everything one request owns while its FSM run is in flight.
///
/// The context is created fresh when a connection becomes readable and
/// dropped when the run reaches a terminal state; dropping it closes the
/// socket. Business handlers may mutate the status, the response head and
/// the session slot, but never touch the socket.
pub struct RequestContext<'a> {
    stream: TcpStream,
    pub session_id: &'a mut Option<u32>,
    pub user_count: &'a mut u32,
    buf: Vec<u8>,
    pub header: Option<Header>,
    pub body: Option<Body>,
    pub status: StatusCode,
    pub response: ResponseHead,
}

impl<'a> RequestContext<'a> {
    pub fn new(
        stream: TcpStream,
        session_id: &'a mut Option<u32>,
        user_count: &'a mut u32,
    ) -> Self {
        Self {
            stream,
            session_id,
            user_count,
            buf: Vec::new(),
            header: None,
            body: None,
            status: StatusCode::Ok,
            response: ResponseHead::default(),
        }
    }

    /// Whether the request being serviced is a logout. Logout never gets a
    /// response body, success or failure.
    fn is_logout(&self) -> bool {
        matches!(self.header, Some(h) if h.msg_type == MsgType::AccLogout)
    }

    /// Releases the owned buffers and closes the connection. The descriptor
    /// itself is reclaimed when the context drops.
    fn finish(&mut self) {
        self.buf = Vec::new();
        self.body = None;
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Internal invariant violations surfaced by the drive loop.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FsmError {
    #[error("illegal transition {from:?} -> {to:?}")]
    IllegalTransition { from: State, to: State },
}

/// Edge handler: performs the target state's work and names the next state.
pub type StateFn = fn(&mut RequestContext<'_>) -> State;

/// One legal edge of the state graph.
pub struct Transition {
    pub from: State,
    pub to: State,
    pub handler: Option<StateFn>,
}

/// The complete legal edge set, fixed at compile time. Order is irrelevant
/// here (lookup is by exact `(from, to)` pair); terminal edges into `End`
/// carry no handler because the drive loop stops before entering them.
static TRANSITIONS: &[Transition] = &[
    Transition {
        from: State::Start,
        to: State::ReadHeader,
        handler: Some(read_header),
    },
    Transition {
        from: State::ReadHeader,
        to: State::ReadBody,
        handler: Some(read_body),
    },
    Transition {
        from: State::ReadBody,
        to: State::Process,
        handler: Some(process),
    },
    Transition {
        from: State::Process,
        to: State::Respond,
        handler: Some(respond),
    },
    Transition {
        from: State::Respond,
        to: State::End,
        handler: None,
    },
    Transition {
        from: State::ReadHeader,
        to: State::Error,
        handler: Some(respond_error),
    },
    Transition {
        from: State::ReadBody,
        to: State::Error,
        handler: Some(respond_error),
    },
    Transition {
        from: State::Process,
        to: State::Error,
        handler: Some(respond_error),
    },
    Transition {
        from: State::Error,
        to: State::End,
        handler: None,
    },
];

pub(crate) fn lookup(from: State, to: State) -> Option<&'static Transition> {
    TRANSITIONS.iter().find(|t| t.from == from && t.to == to)
}

/// Drives one request to completion, consuming the context (and with it the
/// socket).
pub fn run(ctx: RequestContext<'_>) {
    if let Err(err) = drive(ctx, State::Start, State::ReadHeader) {
        error!(%err, "request aborted");
    }
}

pub(crate) fn drive(
    mut ctx: RequestContext<'_>,
    mut from: State,
    mut to: State,
) -> Result<(), FsmError> {
    while to != State::End {
        let Some(transition) = lookup(from, to) else {
            // Contract violation: tear down without invoking anything.
            return Err(FsmError::IllegalTransition { from, to });
        };
        match transition.handler {
            Some(handler) => {
                from = to;
                to = handler(&mut ctx);
            }
            None => break,
        }
    }
    Ok(())
}

fn io_error_status(err: &io::Error) -> StatusCode {
    // A peer that stops short of a full message sent a bad request; anything
    // else is a transport failure on our side of the contract.
    if err.kind() == io::ErrorKind::UnexpectedEof {
        StatusCode::InvalidRequest
    } else {
        StatusCode::ServerError
    }
}

/// ReadHeader: blocking-read exactly 6 bytes and decode them.
fn read_header(ctx: &mut RequestContext<'_>) -> State {
    ctx.buf.resize(HEADER_LEN, 0);
    if let Err(err) = ctx.stream.read_exact(&mut ctx.buf[..HEADER_LEN]) {
        debug!(%err, "header read failed");
        ctx.status = io_error_status(&err);
        return State::Error;
    }
    match codec::decode_header(&ctx.buf) {
        Ok(header) => {
            debug!(
                msg_type = header.msg_type.wire_value(),
                sender_id = header.sender_id,
                payload_len = header.payload_len,
                "header decoded"
            );
            ctx.header = Some(header);
            State::ReadBody
        }
        Err(err) => {
            debug!(%err, "header decode failed");
            ctx.status = err.status();
            State::Error
        }
    }
}

/// ReadBody: grow the buffer to the declared payload length, blocking-read
/// the remainder, decode.
fn read_body(ctx: &mut RequestContext<'_>) -> State {
    let Some(header) = ctx.header else {
        ctx.status = StatusCode::ServerError;
        return State::Error;
    };
    let payload_len = header.payload_len as usize;
    if payload_len > 0 {
        if ctx.buf.try_reserve_exact(payload_len).is_err() {
            warn!(payload_len, "failed to grow receive buffer");
            ctx.status = StatusCode::ServerError;
            return State::Error;
        }
        ctx.buf.resize(HEADER_LEN + payload_len, 0);
        let (_, payload) = ctx.buf.split_at_mut(HEADER_LEN);
        if let Err(err) = ctx.stream.read_exact(payload) {
            debug!(%err, "body read failed");
            ctx.status = io_error_status(&err);
            return State::Error;
        }
    }
    match codec::decode_body(&header, &ctx.buf[HEADER_LEN..]) {
        Ok(body) => {
            ctx.body = Some(body);
            State::Process
        }
        Err(err) => {
            debug!(%err, "body decode failed");
            ctx.status = err.status();
            State::Error
        }
    }
}

/// Process: route through the command dispatch tables.
fn process(ctx: &mut RequestContext<'_>) -> State {
    match handler::dispatch(ctx) {
        DispatchOutcome::Success => State::Respond,
        DispatchOutcome::HandledError => State::Error,
        DispatchOutcome::NotApplicable => {
            // dispatch already stamped InvalidRequest
            State::Error
        }
    }
}

/// Respond: write the response the business handler shaped, then close.
fn respond(ctx: &mut RequestContext<'_>) -> State {
    let response = codec::encode_response(&ctx.response, ctx.status, ctx.is_logout());
    if let Err(err) = ctx.stream.write_all(&response) {
        warn!(%err, "response write failed");
    }
    ctx.finish();
    State::End
}

/// Error: write the standard error envelope (suppressed for logout), then
/// close.
fn respond_error(ctx: &mut RequestContext<'_>) -> State {
    debug!(status = ctx.status.code(), "answering with error envelope");
    let response = if ctx.is_logout() {
        codec::encode_header(&Header {
            msg_type: MsgType::SysError,
            version: PROTOCOL_VERSION,
            sender_id: SERVER_ID,
            payload_len: 0,
        })
        .to_vec()
    } else {
        codec::encode_response(&ResponseHead::default(), ctx.status, false)
    };
    if let Err(err) = ctx.stream.write_all(&response) {
        warn!(%err, "error response write failed");
    }
    ctx.finish();
    State::End
}
