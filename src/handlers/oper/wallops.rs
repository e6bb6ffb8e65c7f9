//! WALLOPS command handler.

use async_trait::async_trait;
use gossip_proto::Message;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::state::{ClientId, UserModes};

/// Handler for WALLOPS command.
///
/// Operators only; delivered to every client with user mode `+w`.
pub struct WallopsHandler;

#[async_trait]
impl Handler for WallopsHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        ctx.require_oper()?;
        let text = msg
            .arg(0)
            .filter(|t| !t.is_empty())
            .ok_or(HandlerError::NeedMoreParams)?;

        let mut wallops = Message::new("WALLOPS").with_source(ctx.client()?.source()).trailing(text);
        ctx.state.prepare(ctx.id, &mut wallops);

        let recipients: Vec<ClientId> = ctx
            .state
            .clients
            .values()
            .filter(|c| c.registered && c.modes.contains(UserModes::WALLOPS))
            .map(|c| c.id)
            .collect();
        for id in recipients {
            ctx.state.send(id, wallops.clone());
        }
        Ok(())
    }
}
