//! KICK command handler.

use async_trait::async_trait;
use gossip_proto::{Message, casemap};
use tracing::info;

use super::remove_membership;
use crate::error::{ChannelError, HandlerError, HandlerResult};
use crate::handlers::{Context, Handler, split_targets};

/// Handler for KICK command.
///
/// `KICK <channel> <nick>{,<nick>} [:<comment>]`
pub struct KickHandler;

#[async_trait]
impl Handler for KickHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let (Some(name), Some(targets)) = (msg.arg(0), msg.arg(1)) else {
            return Err(HandlerError::NeedMoreParams);
        };
        let id = ctx.id;
        let kicker = ctx.nick();
        let comment = msg.arg(2).filter(|c| !c.is_empty()).unwrap_or(kicker.as_str()).to_owned();

        let chan = ctx
            .state
            .channel(name)
            .ok_or_else(|| HandlerError::NoSuchChannel(name.to_owned()))?;
        let chan_name = chan.name.clone();
        match chan.prefixes(id) {
            None => return Err(HandlerError::NotOnChannel(chan_name)),
            Some(p) if !p.is_op_or_higher() => return Err(HandlerError::ChanOpPrivsNeeded(chan_name)),
            Some(_) => {}
        }

        let folded = casemap::fold(name);
        let source = ctx.client()?.source();
        for nick in split_targets(targets) {
            let victim = ctx.state.find_nick(nick).filter(|victim| {
                ctx.state
                    .channels
                    .get(&folded)
                    .is_some_and(|c| c.is_member(*victim))
            });
            let Some(victim) = victim else {
                let err = ChannelError::UserNotInChannel(nick.to_owned());
                let reply = err.to_irc_reply(ctx.state.server_name(), &kicker, &chan_name);
                ctx.send(reply);
                continue;
            };
            let victim_nick = ctx
                .state
                .client(victim)
                .map(|c| c.nick_or_star().to_owned())
                .unwrap_or_else(|| nick.to_owned());

            let mut kick = Message::new("KICK")
                .with_source(source.clone())
                .param(chan_name.as_str())
                .param(victim_nick.as_str())
                .trailing(comment.as_str());
            ctx.state.prepare(id, &mut kick);
            ctx.state.broadcast_channel(&chan_name, &kick, None);
            remove_membership(ctx.state, victim, &folded);
            info!(client = %id, victim = %victim_nick, channel = %chan_name, "Kicked");
        }
        Ok(())
    }
}
