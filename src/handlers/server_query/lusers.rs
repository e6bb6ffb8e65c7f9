//! LUSERS handler.
//!
//! Returns statistics about the size of the network.

use async_trait::async_trait;
use gossip_proto::{Message, Response};

use crate::error::HandlerResult;
use crate::handlers::{Context, Handler};

/// Handler for LUSERS command.
///
/// `LUSERS [mask [target]]`, both arguments ignored on a single server.
pub struct LusersHandler;

#[async_trait]
impl Handler for LusersHandler {
    async fn handle(&self, ctx: &mut Context<'_>, _msg: &Message) -> HandlerResult {
        send_lusers(ctx);
        Ok(())
    }
}

/// 251 through 255.
pub(crate) fn send_lusers(ctx: &mut Context<'_>) {
    let stats = ctx.state.stats.clone();
    let users = stats.users();
    let invisible = stats.invisible();
    let visible = users.saturating_sub(invisible);
    let channels = ctx.state.channels.len();

    ctx.reply(Response::RPL_LUSERCLIENT, &[&visible, &invisible, &1]);
    ctx.reply(Response::RPL_LUSEROP, &[&stats.opers()]);
    ctx.reply(Response::RPL_LUSERUNKNOWN, &[&stats.unregistered()]);
    ctx.reply(Response::RPL_LUSERCHANNELS, &[&channels]);
    ctx.reply(Response::RPL_LUSERME, &[&users, &0]);
}
