//! WHO command handler, with WHOX (`%fields[,token]`) support.
//!
//! `WHO <mask> [%<fields>[,<token>]]`
//!
//! A channel mask lists the channel's members; anything else is matched
//! against nicknames. Invisible users are only shown to someone sharing a
//! channel with them.

use async_trait::async_trait;
use gossip_proto::{Capability, Message, Response, casemap, wild};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::{CHANTYPES, Client, ClientId, MemberPrefixes};

/// WHOX field letters in the order they are emitted.
const WHOX_ORDER: &str = "tcuihsnfdlaor";

/// Token used when a WHOX request asks for `t` without supplying one.
const DEFAULT_TOKEN: &str = "0";

/// Parsed `%fields,token` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Whox {
    fields: String,
    token: String,
}

impl Whox {
    fn parse(arg: &str) -> Option<Self> {
        let spec = arg.strip_prefix('%')?;
        let (fields, token) = match spec.split_once(',') {
            Some((fields, token)) => (fields, token),
            None => (spec, DEFAULT_TOKEN),
        };
        // Keep only known letters, in canonical order.
        let fields = WHOX_ORDER.chars().filter(|c| fields.contains(*c)).collect();
        Some(Self {
            fields,
            token: token.chars().take(3).collect(),
        })
    }
}

/// One row of output, with everything either reply form needs.
struct Row {
    channel: String,
    user: String,
    host: String,
    nick: String,
    flags: String,
    realname: String,
    account: Option<String>,
    idle: u64,
    prefixes: Option<MemberPrefixes>,
}

impl Row {
    fn new(client: &Client, channel: &str, prefixes: Option<MemberPrefixes>, multi_prefix: bool) -> Self {
        let mut flags = String::from(if client.away.is_some() { "G" } else { "H" });
        if client.is_oper() {
            flags.push('*');
        }
        if let Some(p) = prefixes {
            flags.push_str(&p.render(multi_prefix));
        }
        Self {
            channel: channel.to_owned(),
            user: client.user_or_star().to_owned(),
            host: client.host.clone(),
            nick: client.nick_or_star().to_owned(),
            flags,
            realname: client.realname.clone(),
            account: client.account.clone(),
            idle: client.last_active.elapsed().as_secs(),
            prefixes,
        }
    }
}

/// Handler for WHO command.
pub struct WhoHandler;

#[async_trait]
impl Handler for WhoHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let mask = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let whox = msg.arg(1).and_then(Whox::parse);
        let id = ctx.id;
        let multi_prefix = ctx.client()?.has_cap(Capability::MultiPrefix);

        let rows = if mask.starts_with(|c| CHANTYPES.contains(c)) {
            channel_rows(ctx, id, mask, multi_prefix)
        } else {
            mask_rows(ctx, id, mask)
        };

        let server = ctx.server_name();
        let nick = ctx.nick();
        for row in rows {
            let reply = match &whox {
                Some(whox) => whox_reply(&server, &nick, whox, &row),
                None => Response::RPL_WHOREPLY.reply(
                    &server,
                    &nick,
                    &[&row.channel, &row.user, &row.host, &server, &row.nick, &row.flags, &0, &row.realname],
                ),
            };
            ctx.send(reply);
        }
        ctx.reply(Response::RPL_ENDOFWHO, &[&mask]);
        Ok(())
    }
}

fn channel_rows(ctx: &Context<'_>, id: ClientId, name: &str, multi_prefix: bool) -> Vec<Row> {
    let Some(chan) = ctx.state.channel(name) else {
        return Vec::new();
    };
    let is_member = chan.is_member(id);
    if chan.is_secret() && !is_member {
        return Vec::new();
    }
    let mut rows: Vec<Row> = chan
        .members()
        .filter_map(|(member, prefixes)| ctx.state.client(member).map(|c| (c, prefixes)))
        .filter(|(c, _)| is_member || !c.is_invisible())
        .map(|(c, prefixes)| Row::new(c, &chan.name, Some(prefixes), multi_prefix))
        .collect();
    rows.sort_by(|a, b| a.nick.cmp(&b.nick));
    rows
}

fn mask_rows(ctx: &Context<'_>, id: ClientId, mask: &str) -> Vec<Row> {
    let everyone = matches!(mask, "0" | "*");
    let folded = casemap::fold(mask);
    let mut rows: Vec<Row> = ctx
        .state
        .clients
        .values()
        .filter(|c| c.registered)
        .filter(|c| everyone || wild::matches(&folded, &casemap::fold(c.nick_or_star())))
        .filter(|c| c.id == id || !c.is_invisible() || ctx.state.shares_channel(id, c.id))
        .map(|c| Row::new(c, "*", None, false))
        .collect();
    rows.sort_by(|a, b| a.nick.cmp(&b.nick));
    rows
}

fn whox_reply(server: &str, nick: &str, whox: &Whox, row: &Row) -> Message {
    let mut reply = Response::RPL_WHOSPCRPL.reply(server, nick, &[]);
    for field in whox.fields.chars() {
        let value = match field {
            't' => whox.token.clone(),
            'c' => row.channel.clone(),
            'u' => row.user.clone(),
            'i' => "255.255.255.255".to_owned(),
            'h' => row.host.clone(),
            's' => server.to_owned(),
            'n' => row.nick.clone(),
            'f' => row.flags.clone(),
            'd' => "0".to_owned(),
            'l' => row.idle.to_string(),
            'a' => row.account.clone().unwrap_or_else(|| "0".to_owned()),
            'o' => match row.prefixes.and_then(|p| p.letters().chars().next()) {
                Some(letter) => letter.to_string(),
                None => "n/a".to_owned(),
            },
            // Realname may contain spaces, and it is always last.
            'r' => return reply.trailing(row.realname.as_str()),
            _ => continue,
        };
        reply.push_param(value);
    }
    reply
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whox_fields_are_reordered_and_filtered() {
        let whox = Whox::parse("%nuhtz,42").unwrap();
        assert_eq!(whox.fields, "tuhn");
        assert_eq!(whox.token, "42");
    }

    #[test]
    fn whox_without_token() {
        let whox = Whox::parse("%cnr").unwrap();
        assert_eq!(whox.fields, "cnr");
        assert_eq!(whox.token, DEFAULT_TOKEN);
        assert!(Whox::parse("cnr").is_none());
    }

    #[test]
    fn whox_realname_goes_last_as_trailing() {
        let row = Row {
            channel: "#rust".into(),
            user: "al".into(),
            host: "host".into(),
            nick: "alice".into(),
            flags: "H@".into(),
            realname: "Alice Liddell".into(),
            account: None,
            idle: 3,
            prefixes: Some(MemberPrefixes::OPERATOR),
        };
        let whox = Whox::parse("%tcnfaor,7").unwrap();
        let reply = whox_reply("irc.test", "bob", &whox, &row);
        assert_eq!(reply.command, "354");
        assert_eq!(
            reply.params,
            ["bob", "7", "#rust", "alice", "H@", "0", "o", "Alice Liddell"]
        );
        assert!(reply.trailing_set);
    }
}
