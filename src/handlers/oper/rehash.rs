//! REHASH command handler.

use async_trait::async_trait;
use gossip_proto::{Message, Response};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::HandlerResult;
use crate::handlers::{Context, Handler};

/// Handler for REHASH command.
///
/// Re-reads the configuration file the server was started with. The
/// listener keeps its address; everything else applies to the next command.
pub struct RehashHandler;

#[async_trait]
impl Handler for RehashHandler {
    async fn handle(&self, ctx: &mut Context<'_>, _msg: &Message) -> HandlerResult {
        ctx.require_oper()?;

        let Some(path) = ctx.state.config_path.clone() else {
            ctx.state.notice(ctx.id, "REHASH: no configuration file to reload");
            return Ok(());
        };
        let file = path.display().to_string();
        ctx.reply(Response::RPL_REHASHING, &[&file]);

        match Config::load(&path) {
            Ok(config) => {
                ctx.state.install_config(config);
                info!(client = %ctx.id, path = %file, "Configuration reloaded");
            }
            Err(e) => {
                warn!(client = %ctx.id, path = %file, error = %e, "REHASH failed");
                ctx.state.notice(ctx.id, &format!("REHASH failed: {e}"));
            }
        }
        Ok(())
    }
}
