//! INFO command handler.

use async_trait::async_trait;
use gossip_proto::{Message, Response};

use crate::error::HandlerResult;
use crate::handlers::{Context, Handler};
use crate::state::VERSION;

/// Handler for INFO command.
pub struct InfoHandler;

#[async_trait]
impl Handler for InfoHandler {
    async fn handle(&self, ctx: &mut Context<'_>, _msg: &Message) -> HandlerResult {
        let started = ctx.state.created.format("%Y-%m-%d %H:%M:%S UTC").to_string();
        let lines = [
            VERSION.to_owned(),
            "A single-server IRC daemon with IRCv3 extensions.".to_owned(),
            format!("Running since {started}"),
            format!(
                "{} connections accepted, peak of {} users",
                ctx.state.stats.connections_total(),
                ctx.state.stats.peak_users()
            ),
        ];
        for line in &lines {
            ctx.reply(Response::RPL_INFO, &[line]);
        }
        ctx.reply(Response::RPL_ENDOFINFO, &[]);
        Ok(())
    }
}
