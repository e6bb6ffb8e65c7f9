//! REGISTER command handler.
//!
//! `REGISTER PASS <password>` stores PLAIN and SCRAM-SHA-256 credentials
//! for the client's current nick; `REGISTER CERT` binds the connection's
//! certificate fingerprint for EXTERNAL. Results are standard replies.

use async_trait::async_trait;
use gossip_proto::Message;
use tracing::{info, warn};

use crate::db::StoreError;
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{Context, Handler};
use crate::sasl::{PlainCredential, ScramCredential};

/// bcrypt cost for newly registered PLAIN credentials.
const BCRYPT_COST: u32 = 10;

/// Handler for REGISTER command.
pub struct RegisterHandler;

#[async_trait]
impl Handler for RegisterHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let kind = msg
            .arg(0)
            .ok_or(HandlerError::NeedMoreParams)?
            .to_ascii_uppercase();
        let account = ctx.nick();

        let result = match kind.as_str() {
            "PASS" => {
                let password = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
                register_password(ctx, &account, password).await
            }
            "CERT" => {
                let Some(fp) = ctx.client()?.cert_fp.clone() else {
                    fail(ctx, "NEED_CERT", &account, "No client certificate was presented");
                    return Ok(());
                };
                ctx.state.store.insert_external(&account, &fp).await
            }
            _ => {
                fail(ctx, "INVALID_PARAMS", &kind, "Expected PASS or CERT");
                return Ok(());
            }
        };

        match result {
            Ok(()) => {
                info!(client = %ctx.id, account = %account, kind = %kind, "Account registered");
                let server = ctx.server_name();
                ctx.state.standard_reply(
                    ctx.id,
                    "NOTE",
                    "REGISTER",
                    "SUCCESS",
                    &[account.as_str()],
                    &format!("Account {account} registered on {server}"),
                );
            }
            Err(StoreError::AccountExists(_)) => {
                fail(ctx, "ACCOUNT_EXISTS", &account, "Account already exists");
            }
            Err(e) => {
                warn!(client = %ctx.id, account = %account, error = %e, "Account registration failed");
                fail(ctx, "TEMPORARILY_UNAVAILABLE", &account, "Could not register the account");
            }
        }
        Ok(())
    }
}

async fn register_password(ctx: &mut Context<'_>, account: &str, password: &str) -> Result<(), StoreError> {
    let plain = PlainCredential::new(account, password, BCRYPT_COST)
        .map_err(|e| StoreError::Internal(e.to_string()))?;
    let scram = ScramCredential::generate(account, password);
    ctx.state.store.insert_plain(&plain).await?;
    ctx.state.store.insert_scram(&scram).await
}

fn fail(ctx: &mut Context<'_>, code: &str, context: &str, text: &str) {
    ctx.state
        .standard_reply(ctx.id, "FAIL", "REGISTER", code, &[context], text);
}
