//! Target resolution and fan-out shared by the messaging commands.

use std::time::Instant;

use gossip_proto::{Capability, Message, Response, Source, Tag, casemap};
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, split_targets};
use crate::state::{CHANTYPES, ClientId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    Privmsg,
    Notice,
    Tagmsg,
}

impl Kind {
    fn command(self) -> &'static str {
        match self {
            Self::Privmsg => "PRIVMSG",
            Self::Notice => "NOTICE",
            Self::Tagmsg => "TAGMSG",
        }
    }

    /// NOTICE must never trigger automatic replies.
    fn reports_errors(self) -> bool {
        self != Self::Notice
    }

    fn carries_text(self) -> bool {
        self != Self::Tagmsg
    }

    /// Whether a recipient with these capabilities gets the message at all.
    fn accepts(self, has_message_tags: bool) -> bool {
        self != Self::Tagmsg || has_message_tags
    }
}

/// Validate, then deliver `msg` to each comma-separated target.
pub(super) fn route(ctx: &mut Context<'_>, msg: &Message, kind: Kind) -> HandlerResult {
    let Some(targets) = msg.arg(0).filter(|t| !t.is_empty()) else {
        return fail(kind, HandlerError::NoRecipient);
    };
    let text = match kind.carries_text() {
        true => match msg.arg(1).filter(|t| !t.is_empty()) {
            Some(text) => Some(text),
            None => return fail(kind, HandlerError::NoTextToSend),
        },
        false => None,
    };

    let client = ctx.client_mut()?;
    if kind != Kind::Tagmsg {
        client.last_active = Instant::now();
    }
    let source = client.source();
    let folded_nuh = casemap::fold(&client.nuh());
    let echo = client.has_cap(Capability::EchoMessage);
    let client_tags: Vec<Tag> = msg.tags.iter().filter(|t| t.client_prefix).cloned().collect();

    for target in split_targets(targets) {
        let out = outgoing(kind, source.clone(), target, text, &client_tags);
        let delivered = if target.starts_with(|c| CHANTYPES.contains(c)) {
            to_channel(ctx, kind, target, &folded_nuh, out)
        } else {
            to_user(ctx, kind, target, out)
        };
        match delivered {
            Ok(Some(sent)) if echo => ctx.send(sent),
            Ok(_) => {}
            Err(e) if kind.reports_errors() => {
                let server = ctx.server_name();
                if let Some(reply) = e.to_irc_reply(&server, &ctx.nick(), kind.command()) {
                    ctx.send(reply);
                }
            }
            Err(e) => debug!(client = %ctx.id, target = %target, error = %e, "NOTICE not delivered"),
        }
    }
    Ok(())
}

fn fail(kind: Kind, err: HandlerError) -> HandlerResult {
    if kind.reports_errors() { Err(err) } else { Ok(()) }
}

/// The message as recipients see it, before per-recipient tag filtering.
fn outgoing(kind: Kind, source: Source, target: &str, text: Option<&str>, tags: &[Tag]) -> Message {
    let mut out = Message::new(kind.command()).with_source(source).param(target);
    if let Some(text) = text {
        out = out.trailing(text);
    }
    out.tags = tags.to_vec();
    out
}

/// Returns the delivered message for echo-message.
fn to_channel(
    ctx: &mut Context<'_>,
    kind: Kind,
    target: &str,
    folded_nuh: &str,
    mut out: Message,
) -> Result<Option<Message>, HandlerError> {
    let id = ctx.id;
    let chan = ctx
        .state
        .channel(target)
        .ok_or_else(|| HandlerError::NoSuchChannel(target.to_owned()))?;
    let chan_name = chan.name.clone();

    let voiced = chan.prefixes(id).is_some_and(|p| !p.is_empty());
    if !chan.can_send(id) || (!voiced && chan.is_banned(folded_nuh)) {
        if kind.reports_errors() {
            ctx.reply(Response::ERR_CANNOTSENDTOCHAN, &[&chan_name]);
        }
        return Ok(None);
    }

    let recipients: Vec<ClientId> = chan.member_ids().filter(|m| *m != id).collect();
    ctx.state.prepare(id, &mut out);
    out.set_msgid();
    for member in recipients {
        if wants(ctx, member, kind) {
            ctx.state.send(member, out.clone());
        }
    }
    Ok(Some(out))
}

fn to_user(ctx: &mut Context<'_>, kind: Kind, target: &str, mut out: Message) -> Result<Option<Message>, HandlerError> {
    let id = ctx.id;
    let recipient = ctx
        .state
        .registered_by_nick(target)
        .ok_or_else(|| HandlerError::NoSuchNick(target.to_owned()))?;
    let (to, nick, away) = (recipient.id, recipient.nick_or_star().to_owned(), recipient.away.clone());

    ctx.state.prepare(id, &mut out);
    out.set_msgid();
    if wants(ctx, to, kind) {
        ctx.state.send(to, out.clone());
    }
    if kind == Kind::Privmsg
        && let Some(away) = away
    {
        ctx.reply(Response::RPL_AWAY, &[&nick, &away]);
    }
    Ok(Some(out))
}

fn wants(ctx: &Context<'_>, to: ClientId, kind: Kind) -> bool {
    ctx.state
        .client(to)
        .is_some_and(|c| kind.accepts(c.has_cap(Capability::MessageTags)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagmsg_needs_message_tags() {
        assert!(!Kind::Tagmsg.accepts(false));
        assert!(Kind::Tagmsg.accepts(true));
        assert!(Kind::Privmsg.accepts(false));
        assert!(!Kind::Notice.reports_errors());
    }

    #[test]
    fn outgoing_keeps_client_tags_only_as_given() {
        let tags = vec![Tag::client("typing", Some("active"))];
        let out = outgoing(
            Kind::Privmsg,
            Source::user("alice", "a", "host"),
            "#chan",
            Some("hello there"),
            &tags,
        );
        assert_eq!(out.command, "PRIVMSG");
        assert_eq!(out.arg(0), Some("#chan"));
        assert_eq!(out.trailing_param(), Some("hello there"));
        assert!(out.has_tag("typing"));

        let tag = outgoing(Kind::Tagmsg, Source::user("alice", "a", "host"), "bob", None, &[]);
        assert_eq!(tag.params.len(), 1);
        assert!(!tag.trailing_set);
    }
}
