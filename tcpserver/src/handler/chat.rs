//! Chat commands.
//!
//! Message fan-out to other sessions is outside this core; the registered
//! command acknowledges receipt so the chat table stays a real dispatch
//! target.

use tracing::debug;

use super::DispatchOutcome;
use crate::fsm::RequestContext;
use crate::protocol::{MsgType, ResponseHead};

/// Acknowledges a chat send.
pub fn send(ctx: &mut RequestContext<'_>) -> DispatchOutcome {
    let sender_id = ctx.header.map(|h| h.sender_id).unwrap_or_default();
    ctx.response = ResponseHead {
        msg_type: MsgType::SysSuccess,
        ..ResponseHead::default()
    };
    debug!(sender_id, "chat send acknowledged");
    DispatchOutcome::Success
}
