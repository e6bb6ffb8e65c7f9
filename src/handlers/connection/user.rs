//! USER command handler.

use async_trait::async_trait;
use gossip_proto::Message;

use super::welcome::try_register;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};

/// Longest username kept; longer ones are truncated.
const USER_LEN: usize = 16;

/// Handler for USER command.
///
/// `USER <username> <mode> <unused> :<realname>`
pub struct UserHandler;

#[async_trait]
impl Handler for UserHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if ctx.client()?.registered {
            return Err(HandlerError::AlreadyRegistered);
        }
        if msg.params.len() < 4 {
            return Err(HandlerError::NeedMoreParams);
        }
        let username = msg.arg(0).filter(|u| !u.is_empty()).ok_or(HandlerError::NeedMoreParams)?;
        let realname = msg.arg(3).unwrap_or_default();

        let username: String = username
            .chars()
            .filter(|c| !matches!(c, '@' | '!' | '*' | '?'))
            .take(USER_LEN)
            .collect();
        if username.is_empty() {
            return Err(HandlerError::NeedMoreParams);
        }

        let client = ctx.client_mut()?;
        client.user = Some(username);
        client.realname = realname.to_owned();
        try_register(ctx)
    }
}
