//! MONITOR command handler (IRCv3 monitor).
//!
//! `MONITOR + <targets>`, `MONITOR - <targets>`, `MONITOR C`, `MONITOR L`
//! and `MONITOR S`. Online/offline notifications are sent from
//! registration, nick changes and quits through
//! [`ServerState::notify_monitors`](crate::state::ServerState::notify_monitors).

use async_trait::async_trait;
use gossip_proto::{Message, Response};
use tracing::debug;

use super::{Context, Handler, split_targets};
use crate::error::{HandlerError, HandlerResult};

/// Budget for the joined target list of one 730/731/732 line.
const LINE_BUDGET: usize = 400;

/// Handler for MONITOR command.
pub struct MonitorHandler;

#[async_trait]
impl Handler for MonitorHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let sub = msg.arg(0).ok_or(HandlerError::NeedMoreParams)?;
        let id = ctx.id;

        match sub {
            "+" => {
                let targets = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
                let limit = ctx.state.config.limits.monitor;
                let nicks: Vec<&str> = split_targets(targets).collect();
                let mut added = Vec::new();
                for (i, nick) in nicks.iter().enumerate() {
                    if ctx.state.monitors.add(id, nick, limit).is_err() {
                        let rest = nicks[i..].join(",");
                        ctx.reply(Response::ERR_MONLISTFULL, &[&limit, &rest]);
                        break;
                    }
                    added.push(*nick);
                }
                send_status(ctx, &added);
            }
            "-" => {
                let targets = msg.arg(1).ok_or(HandlerError::NeedMoreParams)?;
                for nick in split_targets(targets) {
                    ctx.state.monitors.remove(id, nick);
                }
            }
            "C" | "c" => ctx.state.monitors.clear(id),
            "L" | "l" => {
                let list = ctx.state.monitors.list(id);
                for line in pack(&list) {
                    ctx.reply(Response::RPL_MONLIST, &[&line]);
                }
                ctx.reply(Response::RPL_ENDOFMONLIST, &[]);
            }
            "S" | "s" => {
                let list = ctx.state.monitors.list(id);
                let list: Vec<&str> = list.iter().map(String::as_str).collect();
                send_status(ctx, &list);
            }
            other => debug!(client = %id, subcommand = %other, "Unknown MONITOR subcommand"),
        }
        Ok(())
    }
}

/// 730 for the online nicks (as `nick!user@host`), 731 for the rest.
fn send_status(ctx: &mut Context<'_>, nicks: &[&str]) {
    let mut online = Vec::new();
    let mut offline = Vec::new();
    for nick in nicks {
        match ctx.state.registered_by_nick(nick) {
            Some(client) => online.push(client.nuh()),
            None => offline.push((*nick).to_owned()),
        }
    }
    for line in pack(&online) {
        ctx.reply(Response::RPL_MONONLINE, &[&line]);
    }
    for line in pack(&offline) {
        ctx.reply(Response::RPL_MONOFFLINE, &[&line]);
    }
}

/// Join targets with commas, starting a new line before the budget is hit.
fn pack(targets: &[String]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for target in targets {
        if !current.is_empty() && current.len() + 1 + target.len() > LINE_BUDGET {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(',');
        }
        current.push_str(target);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_splits_long_lists() {
        let targets: Vec<String> = (0..100).map(|i| format!("nickname{i:03}")).collect();
        let lines = pack(&targets);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| l.len() <= LINE_BUDGET));
        assert_eq!(lines.join(",").split(',').count(), 100);
    }

    #[test]
    fn pack_empty() {
        assert!(pack(&[]).is_empty());
        assert_eq!(pack(&["a".into(), "b".into()]), ["a,b"]);
    }
}
