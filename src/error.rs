//! Unified error handling for gossipd.
//!
//! Handlers never reply with errors directly when a numeric exists for the
//! failure: they return a [`HandlerError`] and the engine turns it into the
//! reply addressed to the requester.

use gossip_proto::{Message, Response};
use thiserror::Error;

use crate::db::StoreError;

// ============================================================================
// Handler Errors (command processing)
// ============================================================================

/// Errors that can occur during command handling.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not enough parameters")]
    NeedMoreParams,

    #[error("no text to send")]
    NoTextToSend,

    #[error("no recipient given")]
    NoRecipient,

    #[error("no nickname given")]
    NoNicknameGiven,

    #[error("nickname in use: {0}")]
    NicknameInUse(String),

    #[error("erroneous nickname: {0}")]
    ErroneousNickname(String),

    #[error("not registered")]
    NotRegistered,

    #[error("already registered")]
    AlreadyRegistered,

    #[error("no such nick: {0}")]
    NoSuchNick(String),

    #[error("no such channel: {0}")]
    NoSuchChannel(String),

    #[error("not on channel: {0}")]
    NotOnChannel(String),

    #[error("channel operator privileges needed: {0}")]
    ChanOpPrivsNeeded(String),

    #[error("permission denied")]
    NoPrivileges,

    #[error("password incorrect")]
    PasswdMismatch,

    /// Disconnect the client silently (error message already sent)
    #[error("access denied")]
    AccessDenied,

    #[error("client quit: {0:?}")]
    Quit(Option<String>),

    #[error("credential store: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Static error code string for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NeedMoreParams => "need_more_params",
            Self::NoTextToSend => "no_text_to_send",
            Self::NoRecipient => "no_recipient",
            Self::NoNicknameGiven => "no_nickname_given",
            Self::NicknameInUse(_) => "nickname_in_use",
            Self::ErroneousNickname(_) => "erroneous_nickname",
            Self::NotRegistered => "not_registered",
            Self::AlreadyRegistered => "already_registered",
            Self::NoSuchNick(_) => "no_such_nick",
            Self::NoSuchChannel(_) => "no_such_channel",
            Self::NotOnChannel(_) => "not_on_channel",
            Self::ChanOpPrivsNeeded(_) => "chanop_privs_needed",
            Self::NoPrivileges => "no_privileges",
            Self::PasswdMismatch => "passwd_mismatch",
            Self::AccessDenied => "access_denied",
            Self::Quit(_) => "quit",
            Self::Store(_) => "store_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Convert to an IRC error reply message.
    ///
    /// Returns `None` for errors that don't warrant a client-visible reply
    /// (internal errors, store failures, quit).
    pub fn to_irc_reply(&self, server_name: &str, nick: &str, cmd_name: &str) -> Option<Message> {
        let (response, arg): (Response, Option<&str>) = match self {
            Self::NeedMoreParams => (Response::ERR_NEEDMOREPARAMS, Some(cmd_name)),
            Self::NoTextToSend => (Response::ERR_NOTEXTTOSEND, None),
            Self::NoRecipient => (Response::ERR_NORECIPIENT, Some(cmd_name)),
            Self::NoNicknameGiven => (Response::ERR_NONICKNAMEGIVEN, None),
            Self::NicknameInUse(bad) => (Response::ERR_NICKNAMEINUSE, Some(bad.as_str())),
            Self::ErroneousNickname(bad) => (Response::ERR_ERRONEUSNICKNAME, Some(bad.as_str())),
            Self::NotRegistered => (Response::ERR_NOTREGISTERED, None),
            Self::AlreadyRegistered => (Response::ERR_ALREADYREGISTERED, None),
            Self::NoSuchNick(target) => (Response::ERR_NOSUCHNICK, Some(target.as_str())),
            Self::NoSuchChannel(chan) => (Response::ERR_NOSUCHCHANNEL, Some(chan.as_str())),
            Self::NotOnChannel(chan) => (Response::ERR_NOTONCHANNEL, Some(chan.as_str())),
            Self::ChanOpPrivsNeeded(chan) => (Response::ERR_CHANOPRIVSNEEDED, Some(chan.as_str())),
            Self::NoPrivileges => (Response::ERR_NOPRIVILEGES, None),
            Self::PasswdMismatch => (Response::ERR_PASSWDMISMATCH, None),

            // These errors don't get client-visible replies
            Self::AccessDenied | Self::Quit(_) | Self::Store(_) | Self::Internal(_) => {
                return None;
            }
        };

        Some(match arg {
            Some(arg) => response.reply(server_name, nick, &[&arg]),
            None => response.reply(server_name, nick, &[]),
        })
    }
}

/// Result type for command handlers.
pub type HandlerResult = Result<(), HandlerError>;

// ============================================================================
// Channel Errors (admission and mode application)
// ============================================================================

/// Channel operation errors.
///
/// These errors represent channel-specific failures that map to numeric
/// replies naming the channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("not on channel")]
    NotOnChannel,

    #[error("you're not channel operator")]
    ChanOpPrivsNeeded,

    #[error("user {0} is not on that channel")]
    UserNotInChannel(String),

    #[error("user {0} is already on that channel")]
    UserOnChannel(String),

    #[error("cannot join channel (+b)")]
    BannedFromChan,

    #[error("cannot join channel (+i)")]
    InviteOnlyChan,

    #[error("cannot join channel (+l)")]
    ChannelIsFull,

    #[error("cannot join channel (+k)")]
    BadChannelKey,

    #[error("unknown mode char {0:?}")]
    UnknownMode(char),

    #[error("mode {0:?} needs a parameter")]
    NeedMoreParams(char),

    #[error("key is not well-formed")]
    InvalidKey,
}

impl ChannelError {
    /// Convert to an IRC error reply message.
    pub fn to_irc_reply(&self, server_name: &str, nick: &str, channel: &str) -> Message {
        match self {
            Self::NotOnChannel => Response::ERR_NOTONCHANNEL.reply(server_name, nick, &[&channel]),
            Self::ChanOpPrivsNeeded => {
                Response::ERR_CHANOPRIVSNEEDED.reply(server_name, nick, &[&channel])
            }
            Self::UserNotInChannel(target) => {
                Response::ERR_USERNOTINCHANNEL.reply(server_name, nick, &[target, &channel])
            }
            Self::UserOnChannel(target) => {
                Response::ERR_USERONCHANNEL.reply(server_name, nick, &[target, &channel])
            }
            Self::BannedFromChan => {
                Response::ERR_BANNEDFROMCHAN.reply(server_name, nick, &[&channel])
            }
            Self::InviteOnlyChan => {
                Response::ERR_INVITEONLYCHAN.reply(server_name, nick, &[&channel])
            }
            Self::ChannelIsFull => Response::ERR_CHANNELISFULL.reply(server_name, nick, &[&channel]),
            Self::BadChannelKey => Response::ERR_BADCHANNELKEY.reply(server_name, nick, &[&channel]),
            Self::UnknownMode(letter) => {
                Response::ERR_UNKNOWNMODE.reply(server_name, nick, &[letter, &channel])
            }
            Self::NeedMoreParams(_) => {
                Response::ERR_NEEDMOREPARAMS.reply(server_name, nick, &[&"MODE"])
            }
            Self::InvalidKey => Response::ERR_INVALIDKEY.reply(server_name, nick, &[&channel]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn need_more_params_names_the_command() {
        let reply = HandlerError::NeedMoreParams
            .to_irc_reply("gossip", "a", "OPER")
            .unwrap();
        assert_eq!(reply.to_string(), ":gossip 461 a OPER :Not enough parameters\r\n");
    }

    #[test]
    fn silent_errors_have_no_reply() {
        assert!(HandlerError::Quit(None).to_irc_reply("s", "n", "QUIT").is_none());
        assert!(HandlerError::AccessDenied.to_irc_reply("s", "n", "PASS").is_none());
        assert!(HandlerError::Internal("x".into()).to_irc_reply("s", "n", "X").is_none());
    }

    #[test]
    fn channel_errors_name_the_channel() {
        let reply = ChannelError::UserNotInChannel("bob".into()).to_irc_reply("s", "alice", "#c");
        assert_eq!(
            reply.to_string(),
            ":s 441 alice bob #c :They aren't on that channel\r\n"
        );
        let reply = ChannelError::UnknownMode('Z').to_irc_reply("s", "alice", "#c");
        assert_eq!(
            reply.to_string(),
            ":s 472 alice Z :is unknown mode char to me for #c\r\n"
        );
    }
}
