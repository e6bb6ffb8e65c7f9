//! WHOIS command handler.

use async_trait::async_trait;
use gossip_proto::{Capability, Message, Response};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler, split_targets};
use crate::state::{ClientId, UserModes};

/// Handler for WHOIS command.
///
/// `WHOIS [<server>] <nick>{,<nick>}`
pub struct WhoisHandler;

#[async_trait]
impl Handler for WhoisHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let targets = match (msg.arg(0), msg.arg(1)) {
            (_, Some(nicks)) => nicks,
            (Some(nicks), None) => nicks,
            (None, None) => return Err(HandlerError::NoNicknameGiven),
        };

        for nick in split_targets(targets) {
            match ctx.state.find_nick(nick) {
                Some(target) if ctx.state.client(target).is_some_and(|c| c.registered) => {
                    send_whois(ctx, target)?;
                }
                _ => ctx.reply(Response::ERR_NOSUCHNICK, &[&nick]),
            }
            ctx.reply(Response::RPL_ENDOFWHOIS, &[&nick]);
        }
        Ok(())
    }
}

fn send_whois(ctx: &mut Context<'_>, target: ClientId) -> HandlerResult {
    let requester = ctx.client()?;
    let multi_prefix = requester.has_cap(Capability::MultiPrefix);
    let privileged = requester.is_oper() || requester.id == target;

    let Some(client) = ctx.state.client(target) else {
        return Ok(());
    };
    let nick = client.nick_or_star().to_owned();
    let (user, host, realname) = (client.user_or_star().to_owned(), client.host.clone(), client.realname.clone());
    let (away, account, cert_fp) = (client.away.clone(), client.account.clone(), client.cert_fp.clone());
    let (oper, bot) = (client.is_oper(), client.modes.contains(UserModes::BOT));
    let idle = client.last_active.elapsed().as_secs();
    let signon = client.signon.timestamp();

    let mut channels: Vec<String> = client
        .channels
        .iter()
        .filter_map(|name| ctx.state.channels.get(name))
        .filter(|chan| !chan.is_secret() || chan.is_member(ctx.id))
        .filter_map(|chan| {
            chan.prefixes(target)
                .map(|p| format!("{}{}", p.render(multi_prefix), chan.name))
        })
        .collect();
    channels.sort();

    let server = ctx.server_name();
    let description = ctx.state.config.server.description.clone();

    ctx.reply(Response::RPL_WHOISUSER, &[&nick, &user, &host, &realname]);
    if !channels.is_empty() {
        ctx.reply(Response::RPL_WHOISCHANNELS, &[&nick, &channels.join(" ")]);
    }
    ctx.reply(Response::RPL_WHOISSERVER, &[&nick, &server, &description]);
    if let Some(away) = away {
        ctx.reply(Response::RPL_AWAY, &[&nick, &away]);
    }
    if oper {
        ctx.reply(Response::RPL_WHOISOPERATOR, &[&nick]);
    }
    if let Some(account) = account {
        ctx.reply(Response::RPL_WHOISACCOUNT, &[&nick, &account]);
    }
    if bot {
        ctx.reply(Response::RPL_WHOISBOT, &[&nick]);
    }
    if let Some(fp) = cert_fp.filter(|_| privileged) {
        ctx.reply(Response::RPL_WHOISCERTFP, &[&nick, &fp]);
    }
    ctx.reply(Response::RPL_WHOISIDLE, &[&nick, &idle, &signon]);
    Ok(())
}
