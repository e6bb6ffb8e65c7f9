//! MODE command handler.
//!
//! Handles both user modes and channel modes on top of the shared
//! `+/-letters` grammar.
//!
//! - User modes: `MODE nick [+/-modes]`
//! - Channel modes: `MODE channel [+/-modes [args...]]`

mod channel;
mod user;

use async_trait::async_trait;
use gossip_proto::Message;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::CHANTYPES;

/// Handler for MODE command.
pub struct ModeHandler;

#[async_trait]
impl Handler for ModeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let target = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let modes = msg.arg(1);
        let args = msg.params.get(2..).unwrap_or_default();

        if target.starts_with(|c| CHANTYPES.contains(c)) {
            channel::handle_channel_mode(ctx, target, modes, args)
        } else {
            user::handle_user_mode(ctx, target, modes)
        }
    }
}
