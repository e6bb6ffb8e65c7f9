//! USERHOST command handler.

use async_trait::async_trait;
use gossip_proto::{Message, Response};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::Client;

/// At most this many nicks are answered per request.
const MAX_NICKS: usize = 5;

/// Handler for USERHOST command.
///
/// `USERHOST <nick>{ <nick>}`
pub struct UserhostHandler;

#[async_trait]
impl Handler for UserhostHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        if msg.params.is_empty() {
            return Err(HandlerError::NeedMoreParams);
        }
        let replies: Vec<String> = msg
            .params
            .iter()
            .take(MAX_NICKS)
            .filter_map(|nick| ctx.state.registered_by_nick(nick))
            .map(userhost_entry)
            .collect();
        ctx.reply(Response::RPL_USERHOST, &[&replies.join(" ")]);
        Ok(())
    }
}

/// `nick[*]=(+|-)user@host`
fn userhost_entry(client: &Client) -> String {
    format!(
        "{}{}={}{}@{}",
        client.nick_or_star(),
        if client.is_oper() { "*" } else { "" },
        if client.away.is_some() { '-' } else { '+' },
        client.user_or_star(),
        client.host,
    )
}
