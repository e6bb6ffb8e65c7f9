//! NICK command handler for registration and nick changes.

use async_trait::async_trait;
use chrono::Utc;
use gossip_proto::{Message, casemap};
use tracing::{debug, info};

use super::welcome::try_register;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::WhowasEntry;

/// Longest nickname accepted, advertised as NICKLEN.
pub(crate) const NICK_LEN: usize = 32;

/// A nickname may not start with a channel or source sigil, and may not
/// contain separators that break masks or target lists.
fn is_valid_nick(nick: &str) -> bool {
    if nick.is_empty() || nick.len() > NICK_LEN {
        return false;
    }
    if nick.starts_with(['$', ':', '#', '&']) {
        return false;
    }
    !nick.contains([' ', ',', '*', '?', '!', '@', '.', '\0', '\r', '\n'])
}

/// Handler for NICK command.
pub struct NickHandler;

#[async_trait]
impl Handler for NickHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let nick = msg
            .arg(0)
            .filter(|n| !n.is_empty())
            .ok_or(HandlerError::NoNicknameGiven)?;

        if !is_valid_nick(nick) {
            return Err(HandlerError::ErroneousNickname(nick.to_owned()));
        }

        let client = ctx.client()?;
        if client.nick.as_deref() == Some(nick) {
            return Ok(());
        }
        let registered = client.registered;
        let old_source = client.source();
        let (user, host, realname) = (
            client.user_or_star().to_owned(),
            client.host.clone(),
            client.realname.clone(),
        );

        let old = ctx.state.claim_nick(ctx.id, nick)?;
        debug!(client = %ctx.id, nick = %nick, "Nick set");

        if !registered {
            return try_register(ctx);
        }
        let Some(old) = old else {
            return Ok(());
        };

        let mut change = Message::new("NICK").with_source(old_source).param(nick);
        ctx.state.prepare(ctx.id, &mut change);
        ctx.send(change.clone());
        for peer in ctx.state.co_members(ctx.id) {
            ctx.state.send(peer, change.clone());
        }
        info!(client = %ctx.id, old = %old, new = %nick, "Nick changed");

        if casemap::eq(&old, nick) {
            return Ok(());
        }
        ctx.state.whowas.push(WhowasEntry {
            nick: old.clone(),
            user,
            host,
            realname,
            left_at: Utc::now(),
        });
        let nuh = ctx.client()?.nuh();
        ctx.state.notify_monitors(&old, false, None);
        ctx.state.notify_monitors(nick, true, Some(&nuh));
        Ok(())
    }
}
