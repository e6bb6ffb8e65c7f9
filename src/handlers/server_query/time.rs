//! TIME command handler.
//!
//! `TIME [target]`
//!
//! Returns the local time on the server.

use async_trait::async_trait;
use gossip_proto::{Message, Response};

use crate::error::HandlerResult;
use crate::handlers::{Context, Handler};

/// Handler for TIME command.
pub struct TimeHandler;

#[async_trait]
impl Handler for TimeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, _msg: &Message) -> HandlerResult {
        let server_name = ctx.server_name();

        // RPL_TIME (391): <server> :<string showing server's local time>
        let now = chrono::Local::now();
        let time_string = now.format("%A %B %d %Y -- %H:%M:%S %z").to_string();

        ctx.reply(Response::RPL_TIME, &[&server_name, &time_string]);
        Ok(())
    }
}
