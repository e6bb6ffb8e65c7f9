//! User status handlers: AWAY and SETNAME.

use async_trait::async_trait;
use gossip_proto::{Capability, Message, Response};
use tracing::debug;

use super::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::state::UserModes;

/// Longest realname SETNAME accepts.
const REALNAME_LEN: usize = 100;

/// Handler for AWAY command.
///
/// `AWAY [:<message>]` - an empty or missing message clears away status.
pub struct AwayHandler;

#[async_trait]
impl Handler for AwayHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let id = ctx.id;
        let message = msg.arg(0).filter(|m| !m.is_empty()).map(str::to_owned);

        let client = ctx.client_mut()?;
        client.modes.set(UserModes::AWAY, message.is_some());
        client.away = message.clone();
        let source = client.source();

        let mut notify = Message::new("AWAY").with_source(source);
        match &message {
            Some(text) => {
                notify = notify.trailing(text.as_str());
                ctx.reply(Response::RPL_NOWAWAY, &[]);
            }
            None => ctx.reply(Response::RPL_UNAWAY, &[]),
        }
        ctx.state.prepare(id, &mut notify);
        ctx.state
            .broadcast_co_members(id, &notify, Some(Capability::AwayNotify));
        debug!(client = %id, away = message.is_some(), "Away status changed");
        Ok(())
    }
}

/// Handler for SETNAME command.
///
/// `SETNAME :<realname>`
pub struct SetnameHandler;

#[async_trait]
impl Handler for SetnameHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let id = ctx.id;
        let realname = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        if realname.is_empty() || realname.chars().count() > REALNAME_LEN {
            ctx.state
                .standard_reply(id, "FAIL", "SETNAME", "INVALID_REALNAME", &[], "Realname is not valid");
            return Ok(());
        }

        let client = ctx.client_mut()?;
        client.realname = realname.to_owned();
        let source = client.source();
        let echo = client.has_cap(Capability::SetName);

        let mut notify = Message::new("SETNAME").with_source(source).trailing(realname);
        ctx.state.prepare(id, &mut notify);
        ctx.state
            .broadcast_co_members(id, &notify, Some(Capability::SetName));
        if echo {
            ctx.send(notify);
        }
        Ok(())
    }
}
