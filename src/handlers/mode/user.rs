//! User mode handling.
//!
//! Users can only query or change their own modes.

use gossip_proto::{Message, ModeOp, ModeString, Response, casemap, mode::render_changes};
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::Context;

/// Handle user mode query/change.
pub(super) fn handle_user_mode(ctx: &mut Context<'_>, target: &str, modes: Option<&str>) -> HandlerResult {
    let nick = ctx.nick();

    if !casemap::eq(target, &nick) {
        if ctx.state.find_nick(target).is_none() {
            return Err(HandlerError::NoSuchNick(target.to_owned()));
        }
        ctx.reply(Response::ERR_USERSDONTMATCH, &[]);
        return Ok(());
    }

    let Some(modes) = modes else {
        let current = ctx.client()?.modes.to_mode_string();
        ctx.reply(Response::RPL_UMODEIS, &[&current]);
        return Ok(());
    };

    let parsed = ModeString::parse(modes);
    let client = ctx.client_mut()?;
    let (applied, unknown) = client.apply_modes(parsed.changes());
    let source = client.source();

    for change in &applied {
        match change.letter {
            'i' => ctx.state.stats.invisible_changed(change.op == ModeOp::Add),
            'o' => ctx.state.stats.oper_changed(false),
            _ => {}
        }
    }
    for _ in &unknown {
        ctx.reply(Response::ERR_UMODEUNKNOWNFLAG, &[]);
    }
    if applied.is_empty() {
        return Ok(());
    }

    let rendered = render_changes(&applied);
    debug!(client = %ctx.id, modes = %rendered, "User modes changed");
    ctx.send(Message::new("MODE").with_source(source).param(nick).trailing(rendered));
    Ok(())
}
