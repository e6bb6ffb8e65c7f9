//! JOIN command handler.
//!
//! `JOIN <channel>{,<channel>} [<key>{,<key>}]` or `JOIN 0` to part every
//! channel. The first member of a new channel becomes its founder; since
//! the engine runs one command at a time, two racing JOINs can never both
//! create the channel.

use async_trait::async_trait;
use gossip_proto::{Capability, Message, Response, casemap};
use tracing::{debug, info};

use super::names::send_names;
use super::part::part_channel;
use super::topic::send_topic;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::{Channel, MemberPrefixes, is_channel_name};

/// Handler for JOIN command.
pub struct JoinHandler;

#[async_trait]
impl Handler for JoinHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let targets = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;

        if targets == "0" {
            let mut joined: Vec<String> = ctx.client()?.channels.iter().cloned().collect();
            joined.sort();
            for folded in joined {
                part_channel(ctx, &folded, None)?;
            }
            return Ok(());
        }

        let keys: Vec<&str> = msg.arg(1).map(|k| k.split(',').collect()).unwrap_or_default();
        for (i, name) in targets.split(',').enumerate() {
            if name.is_empty() {
                continue;
            }
            let key = keys.get(i).copied().filter(|k| !k.is_empty());
            join_channel(ctx, name, key)?;
        }
        Ok(())
    }
}

fn join_channel(ctx: &mut Context<'_>, name: &str, key: Option<&str>) -> HandlerResult {
    if !is_channel_name(name) {
        ctx.reply(Response::ERR_NOSUCHCHANNEL, &[&name]);
        return Ok(());
    }
    let id = ctx.id;
    let folded = casemap::fold(name);

    let client = ctx.client()?;
    if client.channels.contains(&folded) {
        return Ok(());
    }
    let folded_nuh = casemap::fold(&client.nuh());
    let source = client.source();
    let account = client.account.clone().unwrap_or_else(|| "*".to_owned());
    let realname = client.realname.clone();
    let away = client.away.clone();

    let created = match ctx.state.channels.get(&folded) {
        Some(chan) => {
            if let Err(e) = chan.admit(id, &folded_nuh, key) {
                debug!(client = %id, channel = %chan.name, error = %e, "Join refused");
                let reply = e.to_irc_reply(ctx.state.server_name(), &ctx.nick(), &chan.name);
                ctx.send(reply);
                return Ok(());
            }
            false
        }
        None => true,
    };

    let chan = ctx
        .state
        .channels
        .entry(folded.clone())
        .or_insert_with(|| Channel::new(name));
    let prefixes = if created {
        MemberPrefixes::FOUNDER
    } else {
        MemberPrefixes::empty()
    };
    chan.add_member(id, prefixes);
    let chan_name = chan.name.clone();
    let members: Vec<_> = chan.member_ids().collect();
    ctx.client_mut()?.channels.insert(folded);

    if created {
        info!(client = %id, channel = %chan_name, "Channel created");
    } else {
        debug!(client = %id, channel = %chan_name, "Joined channel");
    }

    let mut plain = Message::new("JOIN").with_source(source.clone()).param(chan_name.as_str());
    ctx.state.prepare(id, &mut plain);
    let mut extended = Message::new("JOIN")
        .with_source(source.clone())
        .param(chan_name.as_str())
        .param(account)
        .trailing(realname);
    ctx.state.prepare(id, &mut extended);
    let away_msg = away.map(|text| Message::new("AWAY").with_source(source).trailing(text));

    for member in members {
        let Some(peer) = ctx.state.client(member) else {
            continue;
        };
        let join = if peer.has_cap(Capability::ExtendedJoin) {
            extended.clone()
        } else {
            plain.clone()
        };
        let notify_away = member != id && peer.has_cap(Capability::AwayNotify);
        ctx.state.send(member, join);
        if notify_away && let Some(away) = &away_msg {
            ctx.state.send(member, away.clone());
        }
    }

    send_topic(ctx, &chan_name, false);
    send_names(ctx, &chan_name);
    Ok(())
}
