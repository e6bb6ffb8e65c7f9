//! NAMES command handler.

use async_trait::async_trait;
use gossip_proto::{Capability, Message, Response};

use crate::error::HandlerResult;
use crate::handlers::{Context, Handler, split_targets};

/// Rough budget for the nick list in one 353 line.
const NAMES_LINE_BUDGET: usize = 400;

/// Handler for NAMES command.
///
/// `NAMES [channel{,channel}]`
pub struct NamesHandler;

#[async_trait]
impl Handler for NamesHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let Some(targets) = msg.arg(0) else {
            ctx.reply(Response::RPL_ENDOFNAMES, &[&"*"]);
            return Ok(());
        };
        for name in split_targets(targets) {
            send_names(ctx, name);
        }
        Ok(())
    }
}

/// 353 lines and 366 for one channel.
///
/// A secret channel only lists for members; invisible users are hidden
/// from requesters who are not in the channel.
pub(crate) fn send_names(ctx: &mut Context<'_>, name: &str) {
    let id = ctx.id;
    let Some(requester) = ctx.state.client(id) else {
        return;
    };
    let multi_prefix = requester.has_cap(Capability::MultiPrefix);
    let userhost = requester.has_cap(Capability::UserhostInNames);

    let Some(chan) = ctx.state.channel(name) else {
        ctx.reply(Response::RPL_ENDOFNAMES, &[&name]);
        return;
    };
    let chan_name = chan.name.clone();
    let is_member = chan.is_member(id);
    if chan.is_secret() && !is_member {
        ctx.reply(Response::RPL_ENDOFNAMES, &[&chan_name]);
        return;
    }
    let symbol = if chan.is_secret() { "@" } else { "=" };

    let mut entries = Vec::new();
    for (member, prefixes) in chan.members() {
        let Some(client) = ctx.state.client(member) else {
            continue;
        };
        if !is_member && client.is_invisible() {
            continue;
        }
        let who = if userhost {
            client.nuh()
        } else {
            client.nick_or_star().to_owned()
        };
        entries.push(format!("{}{who}", prefixes.render(multi_prefix)));
    }

    for line in pack(&entries, NAMES_LINE_BUDGET) {
        ctx.reply(Response::RPL_NAMREPLY, &[&symbol, &chan_name, &line]);
    }
    ctx.reply(Response::RPL_ENDOFNAMES, &[&chan_name]);
}

/// Join entries with spaces into lines no longer than `budget` where possible.
fn pack(entries: &[String], budget: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for entry in entries {
        if !current.is_empty() && current.len() + 1 + entry.len() > budget {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(entry);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_splits_on_budget() {
        let entries: Vec<String> = ["~alice", "@bob", "carol"].iter().map(|s| s.to_string()).collect();
        assert_eq!(pack(&entries, 100), ["~alice @bob carol"]);
        assert_eq!(pack(&entries, 11), ["~alice @bob", "carol"]);
        assert!(pack(&[], 10).is_empty());
    }
}
