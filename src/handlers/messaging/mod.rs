//! Messaging handlers: PRIVMSG, NOTICE and TAGMSG.
//!
//! All three share one routing path in [`delivery`]; they differ only in
//! whether text is required, whether errors are reported back and which
//! recipients may receive the message.

mod delivery;

use async_trait::async_trait;
use gossip_proto::Message;

use self::delivery::{Kind, route};
use crate::error::HandlerResult;
use crate::handlers::{Context, Handler};

/// Handler for PRIVMSG command.
pub struct PrivmsgHandler;

#[async_trait]
impl Handler for PrivmsgHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        route(ctx, msg, Kind::Privmsg)
    }
}

/// Handler for NOTICE command.
///
/// Per RFC 2812, NOTICE never generates automatic replies.
pub struct NoticeHandler;

#[async_trait]
impl Handler for NoticeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        route(ctx, msg, Kind::Notice)
    }
}

/// Handler for TAGMSG command.
///
/// Tag-only messages reach only recipients that negotiated `message-tags`.
pub struct TagmsgHandler;

#[async_trait]
impl Handler for TagmsgHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        route(ctx, msg, Kind::Tagmsg)
    }
}
