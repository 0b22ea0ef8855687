//! Account commands: create, login, logout.
//!
//! These are the business endpoints behind the dispatch table. They only
//! mutate the request context (status, response head, session slot, user
//! counter); all socket work stays in the state machine.

use tracing::{debug, info};

use super::DispatchOutcome;
use crate::fsm::RequestContext;
use crate::protocol::{Body, MsgType, ResponseHead, StatusCode};

/// Creates an account from the credentials payload.
///
/// Bumps the aggregate user count, takes the new count as the session id
/// and answers `AccLoginSuccess`.
pub fn create(ctx: &mut RequestContext<'_>) -> DispatchOutcome {
    let Some(Body::Credentials { username, password }) = &ctx.body else {
        ctx.status = StatusCode::ServerError;
        return DispatchOutcome::HandledError;
    };
    if username.is_empty() || password.is_empty() {
        ctx.status = StatusCode::InvalidAuth;
        return DispatchOutcome::HandledError;
    }

    *ctx.user_count += 1;
    *ctx.session_id = Some(*ctx.user_count);
    ctx.response = ResponseHead {
        msg_type: MsgType::AccLoginSuccess,
        ..ResponseHead::default()
    };
    info!(
        username = %String::from_utf8_lossy(username),
        user_count = *ctx.user_count,
        "account created"
    );
    DispatchOutcome::Success
}

/// Logs an existing account in and hands out a fresh session id.
pub fn login(ctx: &mut RequestContext<'_>) -> DispatchOutcome {
    let Some(Body::Credentials { username, password }) = &ctx.body else {
        ctx.status = StatusCode::ServerError;
        return DispatchOutcome::HandledError;
    };
    if username.is_empty() || password.is_empty() {
        ctx.status = StatusCode::InvalidAuth;
        return DispatchOutcome::HandledError;
    }

    let session = rand::random::<u16>() as u32;
    *ctx.session_id = Some(session);
    ctx.response = ResponseHead {
        msg_type: MsgType::AccLoginSuccess,
        ..ResponseHead::default()
    };
    info!(
        username = %String::from_utf8_lossy(username),
        session,
        "login accepted"
    );
    DispatchOutcome::Success
}

/// Clears the session slot. Logout succeeds whether or not a session was
/// active, and its response never carries a body.
pub fn logout(ctx: &mut RequestContext<'_>) -> DispatchOutcome {
    let had_session = ctx.session_id.take().is_some();
    ctx.response = ResponseHead {
        msg_type: MsgType::SysSuccess,
        ..ResponseHead::default()
    };
    debug!(had_session, "logout");
    DispatchOutcome::Success
}
