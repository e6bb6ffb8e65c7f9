//! Channel mode handling.
//!
//! Each letter is looked up in the channel letter table, which says
//! whether the change consumes an argument. Unknown letters get 472 and
//! processing continues. List queries (`MODE #c b` or `MODE #c +b`) are
//! open to anyone; every other change needs `@` or higher. Masks that are
//! not a single word are dropped.

use gossip_proto::{Message, ModeOp, ModeString, Response, casemap, mode::render_changes};
use tracing::debug;

use crate::error::{ChannelError, HandlerError, HandlerResult};
use crate::handlers::Context;
use crate::state::{AppliedMode, LetterKind, ListMode, is_valid_mask};

/// Handle channel mode query/change.
pub(super) fn handle_channel_mode(
    ctx: &mut Context<'_>,
    target: &str,
    modes: Option<&str>,
    args: &[String],
) -> HandlerResult {
    let id = ctx.id;
    let chan = ctx
        .state
        .channel(target)
        .ok_or_else(|| HandlerError::NoSuchChannel(target.to_owned()))?;
    let chan_name = chan.name.clone();
    let is_op = chan.prefixes(id).is_some_and(|p| p.is_op_or_higher());

    let Some(modes) = modes else {
        let (letters, params) = chan.mode_string(chan.is_member(id));
        let created = chan.created;
        let mut reply = Response::RPL_CHANNELMODEIS.reply(ctx.state.server_name(), &ctx.nick(), &[&chan_name, &letters]);
        for param in params {
            reply.push_param(param);
        }
        ctx.send(reply);
        ctx.reply(Response::RPL_CREATIONTIME, &[&chan_name, &created]);
        return Ok(());
    };

    // Some clients ask for lists without a sign.
    if !modes.starts_with(['+', '-']) {
        for letter in modes.chars() {
            match LetterKind::from_letter(letter) {
                Some(LetterKind::List(list)) => send_list(ctx, &chan_name, list),
                _ => debug!(client = %id, letter = %letter, "Ignoring unsigned mode letter"),
            }
        }
        return Ok(());
    }

    let client = ctx.client()?;
    let (set_by, source) = (client.nuh(), client.source());
    let server = ctx.server_name();
    let nick = ctx.nick();

    let parsed = ModeString::parse(modes);
    let mut args = args.iter();
    let mut applied: Vec<AppliedMode> = Vec::new();
    let mut errors: Vec<ChannelError> = Vec::new();
    let mut denied = false;

    for &change in parsed.changes() {
        let Some(kind) = LetterKind::from_letter(change.letter) else {
            errors.push(ChannelError::UnknownMode(change.letter));
            continue;
        };
        let param = if kind.takes_param(change.op) {
            args.next().map(String::as_str)
        } else {
            None
        };

        if let LetterKind::List(list) = kind
            && param.is_none()
        {
            send_list(ctx, &chan_name, list);
            continue;
        }
        if !is_op {
            denied = true;
            continue;
        }

        let Some(chan) = ctx.state.channel_mut(target) else {
            break;
        };
        match kind {
            LetterKind::List(list) => {
                let Some(mask) = param else { continue };
                if !is_valid_mask(mask) {
                    debug!(client = %id, mask = %mask, "Dropping malformed list mask");
                    continue;
                }
                if chan.edit_list(list, change.op, mask, &set_by) {
                    applied.push(AppliedMode {
                        change,
                        param: Some(mask.to_owned()),
                    });
                }
            }
            LetterKind::Prefix(prefix) => {
                let Some(who) = param else {
                    errors.push(ChannelError::NeedMoreParams(change.letter));
                    continue;
                };
                let member = ctx.state.find_nick(who).filter(|m| {
                    ctx.state
                        .channel(target)
                        .is_some_and(|c| c.is_member(*m))
                });
                let Some(member) = member else {
                    errors.push(ChannelError::UserNotInChannel(who.to_owned()));
                    continue;
                };
                let shown = ctx
                    .state
                    .client(member)
                    .map(|c| c.nick_or_star().to_owned())
                    .unwrap_or_else(|| who.to_owned());
                let Some(chan) = ctx.state.channel_mut(target) else {
                    break;
                };
                match chan.set_prefix(member, prefix, change.op) {
                    Ok(true) => applied.push(AppliedMode {
                        change,
                        param: Some(shown),
                    }),
                    Ok(false) => {}
                    Err(e) => errors.push(e),
                }
            }
            LetterKind::Key if change.op == ModeOp::Add && param.is_none() => {
                errors.push(ChannelError::NeedMoreParams(change.letter));
            }
            LetterKind::Limit if change.op == ModeOp::Add && param.is_none() => {
                errors.push(ChannelError::NeedMoreParams(change.letter));
            }
            LetterKind::Key | LetterKind::Limit | LetterKind::Flag(_) => {
                match chan.apply_simple(kind, change.op, param) {
                    Ok(true) => {
                        let shown = match (kind, change.op) {
                            (LetterKind::Key, ModeOp::Remove) => Some("*".to_owned()),
                            (LetterKind::Key | LetterKind::Limit, ModeOp::Add) => param.map(str::to_owned),
                            _ => None,
                        };
                        applied.push(AppliedMode { change, param: shown });
                    }
                    Ok(false) => {}
                    Err(e) => errors.push(e),
                }
            }
        }
    }

    if denied {
        errors.push(ChannelError::ChanOpPrivsNeeded);
    }
    for err in errors {
        ctx.send(err.to_irc_reply(&server, &nick, &chan_name));
    }
    if applied.is_empty() {
        return Ok(());
    }

    let changes: Vec<_> = applied.iter().map(|a| a.change).collect();
    let rendered = render_changes(&changes);
    let mut mode = Message::new("MODE")
        .with_source(source)
        .param(chan_name.as_str())
        .param(rendered.as_str());
    for param in applied.into_iter().filter_map(|a| a.param) {
        mode.push_param(param);
    }
    ctx.state.prepare(id, &mut mode);
    ctx.state.broadcast_channel(&chan_name, &mode, None);
    debug!(client = %id, channel = %chan_name, modes = %rendered, "Channel modes changed");
    Ok(())
}

/// Entries of one list mode, then its end numeric.
fn send_list(ctx: &mut Context<'_>, name: &str, list: ListMode) {
    let Some(chan) = ctx.state.channel(name) else {
        return;
    };
    let chan_name = chan.name.clone();
    let entries = chan.list(list).to_vec();
    let (item, end) = match list {
        ListMode::Ban => (Response::RPL_BANLIST, Response::RPL_ENDOFBANLIST),
        ListMode::Except => (Response::RPL_EXCEPTLIST, Response::RPL_ENDOFEXCEPTLIST),
        ListMode::Invex => (Response::RPL_INVITELIST, Response::RPL_ENDOFINVITELIST),
    };
    let server = ctx.server_name();
    let nick = ctx.nick();
    for entry in entries {
        let mut reply = item.reply(&server, &nick, &[&chan_name, &entry.mask]);
        reply.push_param(entry.set_by);
        reply.push_param(entry.set_at.to_string());
        ctx.send(reply);
    }
    ctx.reply(end, &[&chan_name]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_table_consumes_params() {
        let plus = ModeOp::Add;
        let minus = ModeOp::Remove;
        assert!(LetterKind::from_letter('o').unwrap().takes_param(minus));
        assert!(LetterKind::from_letter('k').unwrap().takes_param(minus));
        assert!(LetterKind::from_letter('l').unwrap().takes_param(plus));
        assert!(!LetterKind::from_letter('l').unwrap().takes_param(minus));
        assert!(!LetterKind::from_letter('t').unwrap().takes_param(plus));
        assert!(LetterKind::from_letter('Z').is_none());
        assert_eq!(casemap::fold("#A"), "#a");
    }
}
