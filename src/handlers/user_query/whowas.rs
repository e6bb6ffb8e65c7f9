//! WHOWAS command handler.

use async_trait::async_trait;
use gossip_proto::{Message, Response};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler, split_targets};

/// Handler for WHOWAS command.
///
/// `WHOWAS <nick>{,<nick>} [<count>]`
pub struct WhowasHandler;

#[async_trait]
impl Handler for WhowasHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let targets = msg
            .arg(0)
            .filter(|t| !t.is_empty())
            .ok_or(HandlerError::NoNicknameGiven)?;
        // Zero or negative counts mean "everything".
        let count = msg
            .arg(1)
            .and_then(|c| c.parse::<i64>().ok())
            .filter(|c| *c > 0)
            .and_then(|c| usize::try_from(c).ok());
        let server = ctx.server_name();

        for nick in split_targets(targets) {
            let entries = ctx.state.whowas.find(nick, count);
            if entries.is_empty() {
                ctx.reply(Response::ERR_WASNOSUCHNICK, &[&nick]);
            }
            for entry in entries {
                let left = entry.left_at.format("%a %b %d %H:%M:%S %Y").to_string();
                ctx.reply(
                    Response::RPL_WHOWASUSER,
                    &[&entry.nick, &entry.user, &entry.host, &entry.realname],
                );
                ctx.reply(Response::RPL_WHOISSERVER, &[&entry.nick, &server, &left]);
            }
            ctx.reply(Response::RPL_ENDOFWHOWAS, &[&nick]);
        }
        Ok(())
    }
}
