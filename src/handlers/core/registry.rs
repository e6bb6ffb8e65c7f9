//! Command handler registry and dispatch.

use std::collections::HashMap;

use gossip_proto::{Message, Response};
use tracing::{Instrument, Level, debug, error, span};

use super::context::{Context, Handler};
use crate::error::{HandlerError, HandlerResult};
use crate::handlers::{
    account::RegisterHandler,
    cap::{AuthenticateHandler, CapHandler},
    channel::{
        InviteHandler, JoinHandler, KickHandler, ListHandler, NamesHandler, PartHandler,
        TopicHandler,
    },
    connection::{
        ErrorHandler, NickHandler, PassHandler, PingHandler, PongHandler, QuitHandler, UserHandler,
    },
    messaging::{NoticeHandler, PrivmsgHandler, TagmsgHandler},
    mode::ModeHandler,
    monitor::MonitorHandler,
    oper::{ChghostHandler, OperHandler, RehashHandler, WallopsHandler},
    server_query::{InfoHandler, LusersHandler, MotdHandler, TimeHandler},
    user_query::{UserhostHandler, WhoHandler, WhoisHandler, WhowasHandler},
    user_status::{AwayHandler, SetnameHandler},
};

/// Commands an unregistered connection may use. Anything else is dropped.
const PRE_REGISTRATION: &[&str] = &[
    "CAP",
    "NICK",
    "USER",
    "PASS",
    "AUTHENTICATE",
    "QUIT",
    "PING",
    "PONG",
];

/// Registry of command handlers.
pub struct Registry {
    handlers: HashMap<&'static str, Box<dyn Handler>>,
}

impl Registry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut handlers: HashMap<&'static str, Box<dyn Handler>> = HashMap::new();

        // Connection/registration handlers
        handlers.insert("PASS", Box::new(PassHandler));
        handlers.insert("NICK", Box::new(NickHandler));
        handlers.insert("USER", Box::new(UserHandler));
        handlers.insert("PING", Box::new(PingHandler));
        handlers.insert("PONG", Box::new(PongHandler));
        handlers.insert("QUIT", Box::new(QuitHandler));
        handlers.insert("ERROR", Box::new(ErrorHandler));
        handlers.insert("CAP", Box::new(CapHandler));
        handlers.insert("AUTHENTICATE", Box::new(AuthenticateHandler));
        handlers.insert("REGISTER", Box::new(RegisterHandler));

        // Channel handlers
        handlers.insert("JOIN", Box::new(JoinHandler));
        handlers.insert("PART", Box::new(PartHandler));
        handlers.insert("TOPIC", Box::new(TopicHandler));
        handlers.insert("NAMES", Box::new(NamesHandler));
        handlers.insert("LIST", Box::new(ListHandler));
        handlers.insert("INVITE", Box::new(InviteHandler));
        handlers.insert("KICK", Box::new(KickHandler));
        handlers.insert("MODE", Box::new(ModeHandler));

        // Messaging handlers
        handlers.insert("PRIVMSG", Box::new(PrivmsgHandler));
        handlers.insert("NOTICE", Box::new(NoticeHandler));
        handlers.insert("TAGMSG", Box::new(TagmsgHandler));

        // User query handlers
        handlers.insert("WHO", Box::new(WhoHandler));
        handlers.insert("WHOIS", Box::new(WhoisHandler));
        handlers.insert("WHOWAS", Box::new(WhowasHandler));
        handlers.insert("USERHOST", Box::new(UserhostHandler));

        // Server query handlers
        handlers.insert("MOTD", Box::new(MotdHandler));
        handlers.insert("LUSERS", Box::new(LusersHandler));
        handlers.insert("TIME", Box::new(TimeHandler));
        handlers.insert("INFO", Box::new(InfoHandler));

        // User status
        handlers.insert("AWAY", Box::new(AwayHandler));
        handlers.insert("SETNAME", Box::new(SetnameHandler));
        handlers.insert("MONITOR", Box::new(MonitorHandler));

        // Operator handlers
        handlers.insert("OPER", Box::new(OperHandler));
        handlers.insert("WALLOPS", Box::new(WallopsHandler));
        handlers.insert("CHGHOST", Box::new(ChghostHandler));
        handlers.insert("REHASH", Box::new(RehashHandler));

        Self { handlers }
    }

    /// Dispatch a message to the appropriate handler.
    ///
    /// Failures with a numeric are answered here. Only `Quit` and
    /// `AccessDenied` reach the caller, since both end the connection.
    pub async fn dispatch(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let cmd_name = msg.command.as_str();
        let registered = ctx.client()?.registered;

        if !registered && !PRE_REGISTRATION.contains(&cmd_name) {
            debug!(client = %ctx.id, command = %cmd_name, "Ignoring command before registration");
            return Ok(());
        }

        let Some(handler) = self.handlers.get(cmd_name) else {
            ctx.reply(Response::ERR_UNKNOWNCOMMAND, &[&cmd_name]);
            return Ok(());
        };

        let irc_span = span!(
            Level::DEBUG,
            "irc.command",
            command = %cmd_name,
            client = %ctx.id,
            channel = msg.arg(0).filter(|a| a.starts_with(['#', '&'])),
        );

        match handler.handle(ctx, msg).instrument(irc_span).await {
            Ok(()) => Ok(()),
            Err(e @ (HandlerError::Quit(_) | HandlerError::AccessDenied)) => Err(e),
            Err(e) => {
                debug!(command = %cmd_name, error = %e, code = e.error_code(), "Command error");
                let server = ctx.server_name();
                match e.to_irc_reply(&server, &ctx.nick(), cmd_name) {
                    Some(reply) => ctx.send(reply),
                    None => error!(command = %cmd_name, error = %e, "Command failed"),
                }
                Ok(())
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
