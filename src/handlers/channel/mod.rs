//! Channel membership and metadata handlers.
//!
//! JOIN, PART, TOPIC, NAMES, LIST, INVITE and KICK.

mod invite;
mod join;
mod kick;
mod list;
mod names;
mod part;
mod topic;

pub use invite::InviteHandler;
pub use join::JoinHandler;
pub use kick::KickHandler;
pub use list::ListHandler;
pub use names::NamesHandler;
pub use part::PartHandler;
pub use topic::TopicHandler;

use crate::state::{ClientId, ServerState};

/// Drop `id` from the channel with folded name `folded`, destroying the
/// channel if it is left empty.
pub(crate) fn remove_membership(state: &mut ServerState, id: ClientId, folded: &str) {
    if let Some(client) = state.client_mut(id) {
        client.channels.remove(folded);
    }
    let now_empty = match state.channels.get_mut(folded) {
        Some(chan) => {
            chan.remove_member(id);
            chan.is_empty()
        }
        None => return,
    };
    if now_empty {
        tracing::debug!(channel = %folded, "Channel destroyed");
        state.channels.remove(folded);
    }
}
