//! CHGHOST command handler.
//!
//! Peers with the `chghost` capability see a single `CHGHOST`; everyone
//! else sees the user quit and rejoin each shared channel under the new
//! host, followed by any prefix modes it held.

use async_trait::async_trait;
use gossip_proto::{Capability, Message};
use tracing::info;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};

/// Handler for CHGHOST command.
///
/// `CHGHOST <nick> <new user> <new host>`
pub struct ChghostHandler;

#[async_trait]
impl Handler for ChghostHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        ctx.require_oper()?;
        let (Some(nick), Some(user), Some(host)) = (msg.arg(0), msg.arg(1), msg.arg(2)) else {
            return Err(HandlerError::NeedMoreParams);
        };
        if user.is_empty() || host.is_empty() || user.contains(' ') || host.contains(' ') {
            return Err(HandlerError::NeedMoreParams);
        }

        let target = ctx
            .state
            .registered_by_nick(nick)
            .map(|c| c.id)
            .ok_or_else(|| HandlerError::NoSuchNick(nick.to_owned()))?;
        let server = ctx.server_name();

        let Some(client) = ctx.state.client_mut(target) else {
            return Ok(());
        };
        let old_source = client.source();
        client.user = Some(user.to_owned());
        client.host = host.to_owned();
        let new_source = client.source();
        let target_nick = client.nick_or_star().to_owned();
        let mut channels: Vec<String> = client.channels.iter().cloned().collect();
        channels.sort();
        let self_notify = client.has_cap(Capability::ChgHost);

        let mut chghost = Message::new("CHGHOST")
            .with_source(old_source.clone())
            .param(user)
            .param(host);
        ctx.state.prepare(target, &mut chghost);

        for peer in ctx.state.co_members(target) {
            let capable = ctx
                .state
                .client(peer)
                .is_some_and(|c| c.has_cap(Capability::ChgHost));
            if capable {
                ctx.state.send(peer, chghost.clone());
                continue;
            }

            let quit = Message::new("QUIT")
                .with_source(old_source.clone())
                .trailing("Changing host");
            ctx.state.send(peer, quit);
            for folded in &channels {
                let Some(chan) = ctx.state.channels.get(folded) else {
                    continue;
                };
                if !chan.is_member(peer) {
                    continue;
                }
                let chan_name = chan.name.clone();
                let letters = chan.prefixes(target).map(|p| p.letters()).unwrap_or_default();

                let join = Message::new("JOIN").with_source(new_source.clone()).param(chan_name.as_str());
                ctx.state.send(peer, join);
                if !letters.is_empty() {
                    let mut mode = Message::new("MODE")
                        .from_server(&server)
                        .param(chan_name.as_str())
                        .param(format!("+{letters}"));
                    for _ in letters.chars() {
                        mode.push_param(target_nick.as_str());
                    }
                    ctx.state.send(peer, mode);
                }
            }
        }
        if self_notify {
            ctx.state.send(target, chghost);
        }

        info!(client = %ctx.id, target = %target_nick, user = %user, host = %host, "Host changed");
        Ok(())
    }
}
