//! INVITE command handler.

use async_trait::async_trait;
use gossip_proto::{Capability, Message, Response};
use tracing::debug;

use crate::error::{ChannelError, HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::ChannelModes;

/// Handler for INVITE command.
///
/// `INVITE <nick> <channel>`
pub struct InviteHandler;

#[async_trait]
impl Handler for InviteHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let (Some(nick), Some(name)) = (msg.arg(0), msg.arg(1)) else {
            return Err(HandlerError::NeedMoreParams);
        };
        let id = ctx.id;

        let chan = ctx
            .state
            .channel(name)
            .ok_or_else(|| HandlerError::NoSuchChannel(name.to_owned()))?;
        let chan_name = chan.name.clone();
        let Some(inviter) = chan.prefixes(id) else {
            return Err(HandlerError::NotOnChannel(chan_name));
        };
        if chan.modes.contains(ChannelModes::INVITE_ONLY) && !inviter.is_op_or_higher() {
            return Err(HandlerError::ChanOpPrivsNeeded(chan_name));
        }

        let target = ctx
            .state
            .registered_by_nick(nick)
            .ok_or_else(|| HandlerError::NoSuchNick(nick.to_owned()))?;
        let (target_id, target_nick, target_away) =
            (target.id, target.nick_or_star().to_owned(), target.away.clone());

        if chan.is_member(target_id) {
            let err = ChannelError::UserOnChannel(target_nick);
            let reply = err.to_irc_reply(ctx.state.server_name(), &ctx.nick(), &chan_name);
            ctx.send(reply);
            return Ok(());
        }

        // Operators that asked for invite-notify, apart from the inviter.
        let watchers: Vec<_> = chan
            .members()
            .filter(|(member, prefixes)| *member != id && prefixes.is_op_or_higher())
            .map(|(member, _)| member)
            .collect();

        if let Some(chan) = ctx.state.channel_mut(name) {
            chan.invited.insert(target_id);
        }

        let source = ctx.client()?.source();
        let mut invite = Message::new("INVITE")
            .with_source(source)
            .param(target_nick.as_str())
            .param(chan_name.as_str());
        ctx.state.prepare(id, &mut invite);
        ctx.state.send(target_id, invite.clone());
        for watcher in watchers {
            let wants = ctx
                .state
                .client(watcher)
                .is_some_and(|c| c.has_cap(Capability::InviteNotify));
            if wants {
                ctx.state.send(watcher, invite.clone());
            }
        }

        ctx.reply(Response::RPL_INVITING, &[&target_nick, &chan_name]);
        if let Some(away) = target_away {
            ctx.reply(Response::RPL_AWAY, &[&target_nick, &away]);
        }
        debug!(client = %id, target = %target_nick, channel = %chan_name, "Invited");
        Ok(())
    }
}
