//! TOPIC command handler.
//!
//! `TOPIC <channel>` queries; `TOPIC <channel> :<text>` sets, and an empty
//! trailing parameter clears the topic.

use async_trait::async_trait;
use chrono::Utc;
use gossip_proto::{Message, Response};
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::Topic;

/// Handler for TOPIC command.
pub struct TopicHandler;

#[async_trait]
impl Handler for TopicHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let name = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let id = ctx.id;

        let chan = ctx
            .state
            .channel(name)
            .ok_or_else(|| HandlerError::NoSuchChannel(name.to_owned()))?;
        let chan_name = chan.name.clone();
        let is_member = chan.is_member(id);

        let Some(text) = msg.arg(1) else {
            if chan.is_secret() && !is_member {
                return Err(HandlerError::NotOnChannel(chan_name));
            }
            send_topic(ctx, name, true);
            return Ok(());
        };

        if !is_member {
            return Err(HandlerError::NotOnChannel(chan_name));
        }
        if !chan.can_set_topic(id) {
            return Err(HandlerError::ChanOpPrivsNeeded(chan_name));
        }

        let client = ctx.client()?;
        let (nick, source) = (client.nick_or_star().to_owned(), client.source());
        let chan = ctx
            .state
            .channel_mut(name)
            .ok_or_else(|| HandlerError::NoSuchChannel(name.to_owned()))?;
        chan.topic = (!text.is_empty()).then(|| Topic {
            text: text.to_owned(),
            set_by: nick,
            set_at: Utc::now().timestamp(),
        });
        debug!(channel = %chan_name, client = %id, "Topic changed");

        let mut change = Message::new("TOPIC")
            .with_source(source)
            .param(chan_name.as_str())
            .trailing(text);
        ctx.state.prepare(id, &mut change);
        ctx.state.broadcast_channel(&chan_name, &change, None);
        Ok(())
    }
}

/// 332 and 333 for a channel with a topic; 331 otherwise when `report_none`.
pub(crate) fn send_topic(ctx: &mut Context<'_>, name: &str, report_none: bool) {
    let Some(chan) = ctx.state.channel(name) else {
        return;
    };
    let chan_name = chan.name.clone();
    match chan.topic.clone() {
        Some(topic) => {
            ctx.reply(Response::RPL_TOPIC, &[&chan_name, &topic.text]);
            ctx.reply(Response::RPL_TOPICWHOTIME, &[&chan_name, &topic.set_by, &topic.set_at]);
        }
        None if report_none => ctx.reply(Response::RPL_NOTOPIC, &[&chan_name]),
        None => {}
    }
}
