//! IRC command handlers.
//!
//! Every handler runs on the engine task with exclusive access to
//! [`ServerState`](crate::state::ServerState) through its [`Context`].
//! Handlers validate parameters, mutate state and queue outbound messages;
//! failures that have a numeric are returned as [`HandlerError`]s and the
//! [`Registry`] turns them into replies.
//!
//! [`HandlerError`]: crate::error::HandlerError

mod account;
mod cap;
mod channel;
mod connection;
mod core;
mod messaging;
mod mode;
mod monitor;
mod oper;
mod server_query;
mod user_query;
mod user_status;

pub use self::core::{Context, Handler, Registry};

/// Split a comma-separated target list, skipping empty entries.
pub(crate) fn split_targets(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').filter(|t| !t.is_empty())
}
