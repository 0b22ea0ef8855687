//! Command dispatch.
//!
//! Routing from a decoded request type to a business handler goes through
//! static ordered tables, one per domain. Account commands are consulted
//! first, chat commands second; within a table the first type match wins
//! and declared order is authoritative.

use tracing::debug;

use crate::fsm::RequestContext;
use crate::protocol::{MsgType, StatusCode};

pub mod account;
pub mod chat;

/// Tri-state result of a business handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The request was serviced; produce the normal response.
    Success,
    /// The handler rejected the request and already set the status.
    HandledError,
    /// The handler declined; keep scanning later tables.
    NotApplicable,
}

/// A registered command handler. Handlers shape the response through the
/// context; they never perform socket I/O.
pub type CommandFn = fn(&mut RequestContext<'_>) -> DispatchOutcome;

/// Account domain commands, in dispatch order.
pub static ACCOUNT_COMMANDS: &[(MsgType, CommandFn)] = &[
    (MsgType::AccCreate, account::create),
    (MsgType::AccLogin, account::login),
    (MsgType::AccLogout, account::logout),
];

/// Chat domain commands, in dispatch order.
pub static CHAT_COMMANDS: &[(MsgType, CommandFn)] = &[(MsgType::ChatSend, chat::send)];

/// Routes the decoded request to the first matching command handler.
///
/// Returns the handler's outcome; when no table matches (or every match
/// declined) the status is set to `InvalidRequest` and the caller takes the
/// error path.
pub fn dispatch(ctx: &mut RequestContext<'_>) -> DispatchOutcome {
    let Some(header) = ctx.header else {
        ctx.status = StatusCode::ServerError;
        return DispatchOutcome::HandledError;
    };

    for table in [ACCOUNT_COMMANDS, CHAT_COMMANDS] {
        for (msg_type, command) in table {
            if *msg_type == header.msg_type {
                match command(ctx) {
                    DispatchOutcome::NotApplicable => break,
                    outcome => return outcome,
                }
            }
        }
    }

    debug!(
        msg_type = header.msg_type.wire_value(),
        "no command registered for request type"
    );
    ctx.status = StatusCode::InvalidRequest;
    DispatchOutcome::NotApplicable
}
