//! OPER command handler.

use async_trait::async_trait;
use gossip_proto::{Message, Response};
use tracing::{info, warn};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::UserModes;

/// Handler for OPER command.
///
/// `OPER <name> <password>`
pub struct OperHandler;

#[async_trait]
impl Handler for OperHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let (Some(name), Some(password)) = (msg.arg(0), msg.arg(1)) else {
            return Err(HandlerError::NeedMoreParams);
        };

        let verified = ctx
            .state
            .config
            .find_oper(name)
            .is_some_and(|oper| oper.verify_password(password));
        if !verified {
            warn!(client = %ctx.id, oper = %name, "Failed OPER attempt");
            return Err(HandlerError::PasswdMismatch);
        }

        let client = ctx.client_mut()?;
        let newly = !client.is_oper();
        client.modes.insert(UserModes::OPER);
        let (source, nick) = (client.source(), client.nick_or_star().to_owned());

        ctx.reply(Response::RPL_YOUREOPER, &[]);
        if newly {
            ctx.state.stats.oper_changed(true);
            ctx.send(Message::new("MODE").with_source(source).param(nick.as_str()).trailing("+o"));
            info!(client = %ctx.id, nick = %nick, oper = %name, "Operator authenticated");
        }
        Ok(())
    }
}
