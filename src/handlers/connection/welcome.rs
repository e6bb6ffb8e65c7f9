//! Welcome burst and registration completion.

use gossip_proto::{Message, Response, casemap};
use tracing::{info, warn};

use super::nick::NICK_LEN;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::Context;
use crate::handlers::server_query::{send_lusers, send_motd};
use crate::state::{CHANNEL_LEN, CHANTYPES, MemberPrefixes, UserModes, VERSION};

/// Channel modes for RPL_MYINFO.
const CHANNEL_MODE_LETTERS: &str = "beIiklmnstqaohv";

/// Finish registration once NICK and USER are in and CAP is not holding it.
///
/// A configured connection password is checked first; a mismatch sends
/// 464 and ERROR and ends the connection.
pub(crate) fn try_register(ctx: &mut Context<'_>) -> HandlerResult {
    let client = ctx.client()?;
    if !client.ready_to_register() {
        return Ok(());
    }

    let attempt = client.pass_attempt.as_deref().map(String::as_str);
    if !ctx.state.config.server.verify_password(attempt) {
        warn!(client = %ctx.id, host = %client.host, "Bad connection password");
        let server = ctx.server_name();
        ctx.reply(Response::ERR_PASSWDMISMATCH, &[]);
        ctx.send(Message::new("ERROR").trailing(format!("Closing Link: {server} (Bad Password)")));
        return Err(HandlerError::AccessDenied);
    }

    let peak = ctx.state.stats.user_registered();
    let client = ctx.client_mut()?;
    client.mark_registered();
    if client.account.is_some() {
        client.modes.insert(UserModes::REGISTERED);
    }
    let nick = client.nick_or_star().to_owned();
    let nuh = client.nuh();
    let account = client.account.clone();

    info!(client = %ctx.id, nick = %nick, account = ?account, peak, "Client registered");

    send_welcome_burst(ctx, &nuh);
    send_lusers(ctx);
    send_motd(ctx);

    ctx.state.notify_monitors(&nick, true, Some(&nuh));
    Ok(())
}

/// 001 through 005.
fn send_welcome_burst(ctx: &mut Context<'_>, nuh: &str) {
    let config = ctx.state.config.clone();
    let server = config.server.name.as_str();
    let created = ctx.state.created.format("%Y-%m-%d %H:%M:%S UTC").to_string();

    ctx.reply(Response::RPL_WELCOME, &[&config.server.network, &nuh]);
    ctx.reply(Response::RPL_YOURHOST, &[&server, &VERSION]);
    ctx.reply(Response::RPL_CREATED, &[&created]);
    ctx.reply(
        Response::RPL_MYINFO,
        &[&server, &VERSION, &UserModes::LETTERS, &CHANNEL_MODE_LETTERS],
    );

    let mut isupport = Response::RPL_ISUPPORT.reply(server, &ctx.nick(), &[]);
    for token in isupport_tokens(&config.server.network, config.limits.monitor) {
        isupport.push_param(token);
    }
    ctx.send(isupport);
}

/// RPL_ISUPPORT tokens describing this server.
pub(crate) fn isupport_tokens(network: &str, monitor_limit: usize) -> Vec<String> {
    vec![
        format!("CASEMAPPING={}", casemap::CASEMAPPING),
        format!("CHANLIMIT={CHANTYPES}:"),
        "CHANMODES=beI,k,l,imnst".to_owned(),
        format!("CHANNELLEN={CHANNEL_LEN}"),
        format!("CHANTYPES={CHANTYPES}"),
        "ELIST=CMNTU".to_owned(),
        "EXCEPTS=e".to_owned(),
        "INVEX=I".to_owned(),
        format!("MONITOR={monitor_limit}"),
        format!("NETWORK={network}"),
        format!("NICKLEN={NICK_LEN}"),
        format!("PREFIX={}", MemberPrefixes::ISUPPORT),
        "WHOX".to_owned(),
    ]
}
