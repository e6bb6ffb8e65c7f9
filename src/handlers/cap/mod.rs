//! IRCv3 capability negotiation and SASL authentication.
//!
//! - `CAP LS [version]`, `CAP LIST`, `CAP REQ :caps`, `CAP END`
//! - `AUTHENTICATE` (see [`sasl`])

mod sasl;

pub use sasl::AuthenticateHandler;

use async_trait::async_trait;
use gossip_proto::{Capability, Message, Response};
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::connection::try_register;
use crate::handlers::{Context, Handler};

/// Handler for CAP command.
pub struct CapHandler;

#[async_trait]
impl Handler for CapHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let subcommand = msg
            .arg(0)
            .ok_or(HandlerError::NeedMoreParams)?
            .to_ascii_uppercase();

        match subcommand.as_str() {
            "LS" => cap_ls(ctx, msg.arg(1)),
            "LIST" => cap_list(ctx),
            "REQ" => cap_req(ctx, msg.arg(1).unwrap_or_default()),
            "END" => cap_end(ctx),
            _ => {
                ctx.reply(Response::ERR_INVALIDCAPCMD, &[&subcommand]);
                Ok(())
            }
        }
    }
}

fn cap_reply(ctx: &Context<'_>, subcommand: &str, body: &str) -> Message {
    Message::new("CAP")
        .from_server(ctx.state.server_name())
        .param(ctx.nick())
        .param(subcommand)
        .trailing(body)
}

/// Suspend registration until `CAP END`.
fn hold_registration(ctx: &mut Context<'_>) -> HandlerResult {
    let client = ctx.client_mut()?;
    if !client.registered {
        client.cap_negotiating = true;
    }
    Ok(())
}

fn cap_ls(ctx: &mut Context<'_>, version: Option<&str>) -> HandlerResult {
    hold_registration(ctx)?;
    let version = version.and_then(|v| v.parse::<u32>().ok()).unwrap_or(0);

    let client = ctx.client_mut()?;
    client.cap_version = client.cap_version.max(version);
    // 302 clients get cap-notify implicitly.
    if client.cap_version >= 302 {
        client.caps.insert(Capability::CapNotify);
    }
    let effective = client.cap_version;

    let listing = Capability::ALL
        .iter()
        .map(|cap| cap.ls_entry(effective))
        .collect::<Vec<_>>()
        .join(" ");
    let reply = cap_reply(ctx, "LS", &listing);
    ctx.send(reply);
    Ok(())
}

fn cap_list(ctx: &mut Context<'_>) -> HandlerResult {
    let mut enabled: Vec<&'static str> = ctx.client()?.caps.iter().map(|c| c.name()).collect();
    enabled.sort_unstable();
    let reply = cap_reply(ctx, "LIST", &enabled.join(" "));
    ctx.send(reply);
    Ok(())
}

/// All-or-nothing: one unknown name NAKs the whole request.
fn cap_req(ctx: &mut Context<'_>, request: &str) -> HandlerResult {
    hold_registration(ctx)?;

    let mut changes = Vec::new();
    for token in request.split_whitespace() {
        let (enable, name) = match token.strip_prefix('-') {
            Some(name) => (false, name),
            None => (true, token),
        };
        match Capability::from_name(name) {
            Some(cap) => changes.push((enable, cap)),
            None => {
                debug!(client = %ctx.id, cap = %name, "Unknown capability requested");
                let reply = cap_reply(ctx, "NAK", request);
                ctx.send(reply);
                return Ok(());
            }
        }
    }

    let client = ctx.client_mut()?;
    for (enable, cap) in changes {
        if enable {
            client.caps.insert(cap);
        } else {
            client.caps.remove(&cap);
        }
    }
    let reply = cap_reply(ctx, "ACK", request.trim());
    ctx.send(reply);
    Ok(())
}

fn cap_end(ctx: &mut Context<'_>) -> HandlerResult {
    let client = ctx.client_mut()?;
    if client.registered {
        return Ok(());
    }
    client.cap_negotiating = false;
    try_register(ctx)
}
