//! MOTD handler.

use async_trait::async_trait;
use gossip_proto::{Message, Response};

use crate::error::HandlerResult;
use crate::handlers::{Context, Handler};

/// Handler for MOTD command.
pub struct MotdHandler;

#[async_trait]
impl Handler for MotdHandler {
    async fn handle(&self, ctx: &mut Context<'_>, _msg: &Message) -> HandlerResult {
        send_motd(ctx);
        Ok(())
    }
}

/// 375/372/376, or 422 when there is no MOTD.
pub(crate) fn send_motd(ctx: &mut Context<'_>) {
    let config = ctx.state.config.clone();
    if config.server.motd.is_empty() {
        ctx.reply(Response::ERR_NOMOTD, &[]);
        return;
    }
    ctx.reply(Response::RPL_MOTDSTART, &[&config.server.name]);
    for line in &config.server.motd {
        ctx.reply(Response::RPL_MOTD, &[line]);
    }
    ctx.reply(Response::RPL_ENDOFMOTD, &[]);
}
