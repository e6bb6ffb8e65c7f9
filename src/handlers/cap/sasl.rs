//! SASL authentication handler.
//!
//! `AUTHENTICATE <mechanism>` starts a negotiation, then base64 client
//! responses arrive in chunks of at most 400 bytes; a chunk shorter than
//! 400 (or `+` for an empty one) ends the response. `AUTHENTICATE *`
//! aborts. The mechanism state lives on the client until the exchange ends.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use gossip_proto::{Capability, Message, Response};
use tracing::{debug, info};

use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::sasl::{MECHANISMS, SaslSession, Step};
use crate::state::{SASL_BUFFER_LIMIT, UserModes};

/// Largest AUTHENTICATE payload per line.
const CHUNK: usize = 400;

/// Handler for AUTHENTICATE command (SASL authentication).
pub struct AuthenticateHandler;

#[async_trait]
impl Handler for AuthenticateHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let data = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;

        if ctx.client()?.account.is_some() {
            ctx.reply(Response::ERR_SASLALREADY, &[]);
            return Ok(());
        }

        if data == "*" {
            abort(ctx)?;
            ctx.reply(Response::ERR_SASLABORTED, &[]);
            return Ok(());
        }

        if ctx.client()?.sasl.is_none() {
            return start(ctx, data);
        }

        if data.len() > CHUNK {
            abort(ctx)?;
            ctx.reply(Response::ERR_SASLTOOLONG, &[]);
            return Ok(());
        }

        let client = ctx.client_mut()?;
        if data != "+" {
            client.sasl_buffer.push_str(data);
        }
        if client.sasl_buffer.len() > SASL_BUFFER_LIMIT {
            abort(ctx)?;
            ctx.reply(Response::ERR_SASLTOOLONG, &[]);
            return Ok(());
        }
        if data.len() == CHUNK {
            // More to come.
            return Ok(());
        }

        let encoded = std::mem::take(&mut client.sasl_buffer);
        let Ok(response) = BASE64.decode(encoded.as_bytes()) else {
            debug!(client = %ctx.id, "SASL response is not valid base64");
            abort(ctx)?;
            ctx.reply(Response::ERR_SASLFAIL, &[]);
            return Ok(());
        };

        step(ctx, &response).await
    }
}

fn start(ctx: &mut Context<'_>, mechanism: &str) -> HandlerResult {
    let client = ctx.client()?;
    let session = SaslSession::start(mechanism, client.nick_or_star(), client.cert_fp.as_deref());
    let Some(session) = session else {
        debug!(client = %ctx.id, mechanism = %mechanism, "Unsupported SASL mechanism");
        ctx.reply(Response::RPL_SASLMECHS, &[&MECHANISMS]);
        ctx.reply(Response::ERR_SASLFAIL, &[]);
        return Ok(());
    };

    debug!(client = %ctx.id, mechanism = session.name(), "SASL started");
    let client = ctx.client_mut()?;
    client.sasl = Some(session);
    client.sasl_buffer.clear();
    send_challenge(ctx, &[]);
    Ok(())
}

/// Feed one complete response to the running mechanism.
async fn step(ctx: &mut Context<'_>, response: &[u8]) -> HandlerResult {
    let Some(mut session) = ctx.client_mut()?.sasl.take() else {
        return Ok(());
    };
    let store = ctx.state.store.clone();

    match session.next(store.as_ref(), response).await {
        Ok(Step::Challenge(challenge)) => {
            ctx.client_mut()?.sasl = Some(session);
            send_challenge(ctx, &challenge);
            Ok(())
        }
        Ok(Step::Done) => {
            let account = session.authn().unwrap_or_default().to_owned();
            logged_in(ctx, &account, session.name())
        }
        Err(e) => {
            debug!(client = %ctx.id, mechanism = session.name(), error = %e, "SASL failed");
            ctx.reply(Response::ERR_SASLFAIL, &[]);
            Ok(())
        }
    }
}

fn logged_in(ctx: &mut Context<'_>, account: &str, mechanism: &str) -> HandlerResult {
    let client = ctx.client_mut()?;
    client.account = Some(account.to_owned());
    if client.registered {
        client.modes.insert(UserModes::REGISTERED);
    }
    let nuh = client.nuh();
    let registered = client.registered;
    let source = client.source();

    info!(client = %ctx.id, account = %account, mechanism = %mechanism, "SASL authentication successful");
    ctx.reply(Response::RPL_LOGGEDIN, &[&nuh, &account, &account]);
    ctx.reply(Response::RPL_SASLSUCCESS, &[]);

    if registered {
        let notify = Message::new("ACCOUNT").with_source(source).param(account);
        ctx.state
            .broadcast_co_members(ctx.id, &notify, Some(Capability::AccountNotify));
    }
    Ok(())
}

fn abort(ctx: &mut Context<'_>) -> HandlerResult {
    let client = ctx.client_mut()?;
    client.sasl = None;
    client.sasl_buffer.clear();
    Ok(())
}

/// Send a server challenge base64-encoded and split into 400-byte lines.
fn send_challenge(ctx: &mut Context<'_>, challenge: &[u8]) {
    let server = ctx.server_name();
    let encoded = BASE64.encode(challenge);
    let mut chunks: Vec<&str> = encoded
        .as_bytes()
        .chunks(CHUNK)
        .filter_map(|c| std::str::from_utf8(c).ok())
        .collect();
    if chunks.last().is_none_or(|c| c.len() == CHUNK) {
        chunks.push("+");
    }
    for chunk in chunks {
        ctx.send(Message::new("AUTHENTICATE").from_server(&server).param(chunk));
    }
}
