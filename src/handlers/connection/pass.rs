//! PASS command handler.

use async_trait::async_trait;
use gossip_proto::Message;
use zeroize::Zeroizing;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};

/// Handler for PASS command.
///
/// Only records the attempt; it is checked when registration completes.
pub struct PassHandler;

#[async_trait]
impl Handler for PassHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if ctx.client()?.registered {
            return Err(HandlerError::AlreadyRegistered);
        }
        let password = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        ctx.client_mut()?.pass_attempt = Some(Zeroizing::new(password.to_owned()));
        Ok(())
    }
}
