//! PING, PONG and client-sent ERROR.

use async_trait::async_trait;
use gossip_proto::Message;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};

/// Handler for PING command.
pub struct PingHandler;

#[async_trait]
impl Handler for PingHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let token = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let server = ctx.server_name();
        let pong = Message::new("PONG")
            .from_server(&server)
            .param(server.as_str())
            .trailing(token);
        ctx.send(pong);
        Ok(())
    }
}

/// Handler for PONG command.
///
/// Any inbound line resets the connection's idle timer, so there is
/// nothing left to do here.
pub struct PongHandler;

#[async_trait]
impl Handler for PongHandler {
    async fn handle(&self, _ctx: &mut Context<'_>, _msg: &Message) -> HandlerResult {
        Ok(())
    }
}

/// Handler for ERROR sent by a client, which is ignored.
pub struct ErrorHandler;

#[async_trait]
impl Handler for ErrorHandler {
    async fn handle(&self, _ctx: &mut Context<'_>, _msg: &Message) -> HandlerResult {
        Ok(())
    }
}
