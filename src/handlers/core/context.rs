//! Command handler context.

use std::fmt::Display;

use async_trait::async_trait;
use gossip_proto::{Message, Response};

use crate::error::{HandlerError, HandlerResult};
use crate::state::{Client, ClientId, ServerState};

/// Handler context passed to each command handler.
///
/// Borrowed from the engine for the duration of one command, so a handler
/// sees and mutates state without interleaving with any other command.
pub struct Context<'a> {
    /// The client that sent the command.
    pub id: ClientId,
    /// Engine-owned server state.
    pub state: &'a mut ServerState,
}

impl<'a> Context<'a> {
    pub fn new(id: ClientId, state: &'a mut ServerState) -> Self {
        Self { id, state }
    }

    /// The requesting client.
    pub fn client(&self) -> Result<&Client, HandlerError> {
        self.state
            .client(self.id)
            .ok_or_else(|| HandlerError::Internal(format!("client {} vanished", self.id)))
    }

    pub fn client_mut(&mut self) -> Result<&mut Client, HandlerError> {
        let id = self.id;
        self.state
            .client_mut(id)
            .ok_or_else(|| HandlerError::Internal(format!("client {id} vanished")))
    }

    /// Current nick, or `*`.
    pub fn nick(&self) -> String {
        self.state
            .client(self.id)
            .map(|c| c.nick_or_star().to_owned())
            .unwrap_or_else(|| "*".to_owned())
    }

    pub fn server_name(&self) -> String {
        self.state.server_name().to_owned()
    }

    /// Numeric reply to the requester.
    pub fn reply(&mut self, response: Response, args: &[&dyn Display]) {
        self.state.reply(self.id, response, args);
    }

    /// Any message to the requester.
    pub fn send(&mut self, msg: Message) {
        self.state.send(self.id, msg);
    }

    /// Registered operators only.
    pub fn require_oper(&self) -> HandlerResult {
        if self.client()?.is_oper() {
            Ok(())
        } else {
            Err(HandlerError::NoPrivileges)
        }
    }
}

/// A command handler.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult;
}
