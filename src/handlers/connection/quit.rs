//! QUIT handler for terminating client sessions.

use async_trait::async_trait;
use gossip_proto::Message;
use tracing::info;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};

/// Handler for QUIT command.
pub struct QuitHandler;

#[async_trait]
impl Handler for QuitHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let quit_msg = msg.arg(0).filter(|r| !r.is_empty()).map(str::to_owned);

        info!(
            client = %ctx.id,
            nick = %ctx.nick(),
            message = ?quit_msg,
            "Client quit"
        );

        // The engine sends ERROR and tears the client down.
        Err(HandlerError::Quit(quit_msg))
    }
}
