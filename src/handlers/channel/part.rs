//! PART command handler.

use async_trait::async_trait;
use gossip_proto::{Message, Response, casemap};
use tracing::debug;

use super::remove_membership;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler, split_targets};

/// Handler for PART command.
///
/// `PART <channel>{,<channel>} [:<reason>]`
pub struct PartHandler;

#[async_trait]
impl Handler for PartHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let targets = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let reason = msg.arg(1).filter(|r| !r.is_empty());

        for name in split_targets(targets) {
            let Some(chan) = ctx.state.channel(name) else {
                ctx.reply(Response::ERR_NOSUCHCHANNEL, &[&name]);
                continue;
            };
            if !chan.is_member(ctx.id) {
                let chan_name = chan.name.clone();
                ctx.reply(Response::ERR_NOTONCHANNEL, &[&chan_name]);
                continue;
            }
            part_channel(ctx, &casemap::fold(name), reason)?;
        }
        Ok(())
    }
}

/// Tell the channel, then drop the membership.
pub(crate) fn part_channel(ctx: &mut Context<'_>, folded: &str, reason: Option<&str>) -> HandlerResult {
    let id = ctx.id;
    let Some(chan_name) = ctx.state.channels.get(folded).map(|c| c.name.clone()) else {
        return Ok(());
    };
    let source = ctx.client()?.source();

    let mut part = Message::new("PART").with_source(source).param(chan_name.as_str());
    if let Some(reason) = reason {
        part = part.trailing(reason);
    }
    ctx.state.prepare(id, &mut part);
    ctx.state.broadcast_channel(&chan_name, &part, None);

    remove_membership(ctx.state, id, folded);
    debug!(client = %id, channel = %chan_name, "Parted channel");
    Ok(())
}
