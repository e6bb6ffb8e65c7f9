//! Numeric replies.
//!
//! Every numeric carries a static template describing the parameters that
//! follow the recipient nick. `{}` marks a substitution point and ` :`
//! introduces the trailing parameter, so
//! `Response::ERR_NOSUCHNICK.reply("irc.example.com", "alice", &[&"bob"])`
//! produces `:irc.example.com 401 alice bob :No such nick/channel`.

#![allow(non_camel_case_types)]

use std::fmt::{self, Display};

use crate::message::Message;

macro_rules! responses {
    ($( $(#[$meta:meta])* $name:ident = $code:literal => $template:literal, )*) => {
        /// IRC numeric reply.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        #[non_exhaustive]
        pub enum Response {
            $( $(#[$meta])* $name = $code, )*
        }

        impl Response {
            /// Parameter template after the recipient nick.
            pub fn template(self) -> &'static str {
                match self {
                    $( Response::$name => $template, )*
                }
            }

            /// Look a numeric up by code.
            pub fn from_code(code: u16) -> Option<Response> {
                match code {
                    $( $code => Some(Response::$name), )*
                    _ => None,
                }
            }
        }
    };
}

responses! {
    /// 001
    RPL_WELCOME = 1 => ":Welcome to the {} IRC Network {}",
    /// 002
    RPL_YOURHOST = 2 => ":Your host is {}, running version {}",
    /// 003
    RPL_CREATED = 3 => ":This server was created {}",
    /// 004
    RPL_MYINFO = 4 => "{} {} {} {}",
    /// 005, tokens are pushed in front of the trailing text.
    RPL_ISUPPORT = 5 => ":are supported by this server",
    /// 221
    RPL_UMODEIS = 221 => "{}",
    /// 251
    RPL_LUSERCLIENT = 251 => ":There are {} users and {} invisible on {} servers",
    /// 252
    RPL_LUSEROP = 252 => "{} :operator(s) online",
    /// 253
    RPL_LUSERUNKNOWN = 253 => "{} :unknown connection(s)",
    /// 254
    RPL_LUSERCHANNELS = 254 => "{} :channels formed",
    /// 255
    RPL_LUSERME = 255 => ":I have {} clients and {} servers",
    /// 276
    RPL_WHOISCERTFP = 276 => "{} :has client certificate fingerprint {}",
    /// 301
    RPL_AWAY = 301 => "{} :{}",
    /// 302
    RPL_USERHOST = 302 => ":{}",
    /// 305
    RPL_UNAWAY = 305 => ":You are no longer marked as being away",
    /// 306
    RPL_NOWAWAY = 306 => ":You have been marked as being away",
    /// 311
    RPL_WHOISUSER = 311 => "{} {} {} * :{}",
    /// 312
    RPL_WHOISSERVER = 312 => "{} {} :{}",
    /// 313
    RPL_WHOISOPERATOR = 313 => "{} :is an IRC operator",
    /// 314
    RPL_WHOWASUSER = 314 => "{} {} {} * :{}",
    /// 315
    RPL_ENDOFWHO = 315 => "{} :End of WHO list",
    /// 317
    RPL_WHOISIDLE = 317 => "{} {} {} :seconds idle, signon time",
    /// 318
    RPL_ENDOFWHOIS = 318 => "{} :End of WHOIS list",
    /// 319
    RPL_WHOISCHANNELS = 319 => "{} :{}",
    /// 322
    RPL_LIST = 322 => "{} {} :{}",
    /// 323
    RPL_LISTEND = 323 => ":End of LIST",
    /// 324, mode arguments are appended.
    RPL_CHANNELMODEIS = 324 => "{} {}",
    /// 329
    RPL_CREATIONTIME = 329 => "{} {}",
    /// 330
    RPL_WHOISACCOUNT = 330 => "{} {} :is logged in as",
    /// 331
    RPL_NOTOPIC = 331 => "{} :No topic is set",
    /// 332
    RPL_TOPIC = 332 => "{} :{}",
    /// 333
    RPL_TOPICWHOTIME = 333 => "{} {} {}",
    /// 335
    RPL_WHOISBOT = 335 => "{} :is a bot",
    /// 341
    RPL_INVITING = 341 => "{} {}",
    /// 346
    RPL_INVITELIST = 346 => "{} {}",
    /// 347
    RPL_ENDOFINVITELIST = 347 => "{} :End of channel invite list",
    /// 348
    RPL_EXCEPTLIST = 348 => "{} {}",
    /// 349
    RPL_ENDOFEXCEPTLIST = 349 => "{} :End of channel exception list",
    /// 352
    RPL_WHOREPLY = 352 => "{} {} {} {} {} {} :{} {}",
    /// 353
    RPL_NAMREPLY = 353 => "{} {} :{}",
    /// 354, fields are pushed by the caller.
    RPL_WHOSPCRPL = 354 => "",
    /// 366
    RPL_ENDOFNAMES = 366 => "{} :End of /NAMES list",
    /// 367
    RPL_BANLIST = 367 => "{} {}",
    /// 368
    RPL_ENDOFBANLIST = 368 => "{} :End of channel ban list",
    /// 369
    RPL_ENDOFWHOWAS = 369 => "{} :End of WHOWAS",
    /// 371
    RPL_INFO = 371 => ":{}",
    /// 372
    RPL_MOTD = 372 => ":- {}",
    /// 374
    RPL_ENDOFINFO = 374 => ":End of INFO list",
    /// 375
    RPL_MOTDSTART = 375 => ":- {} Message of the day - ",
    /// 376
    RPL_ENDOFMOTD = 376 => ":End of MOTD command",
    /// 381
    RPL_YOUREOPER = 381 => ":You are now an IRC operator",
    /// 382
    RPL_REHASHING = 382 => "{} :Rehashing",
    /// 391
    RPL_TIME = 391 => "{} :{}",
    /// 401
    ERR_NOSUCHNICK = 401 => "{} :No such nick/channel",
    /// 403
    ERR_NOSUCHCHANNEL = 403 => "{} :No such channel",
    /// 404
    ERR_CANNOTSENDTOCHAN = 404 => "{} :Cannot send to channel",
    /// 406
    ERR_WASNOSUCHNICK = 406 => "{} :There was no such nickname",
    /// 410
    ERR_INVALIDCAPCMD = 410 => "{} :Invalid CAP command",
    /// 411
    ERR_NORECIPIENT = 411 => ":No recipient given ({})",
    /// 412
    ERR_NOTEXTTOSEND = 412 => ":No text to send",
    /// 417
    ERR_INPUTTOOLONG = 417 => ":Input line was too long",
    /// 421
    ERR_UNKNOWNCOMMAND = 421 => "{} :Unknown command",
    /// 422
    ERR_NOMOTD = 422 => ":MOTD File is missing",
    /// 431
    ERR_NONICKNAMEGIVEN = 431 => ":No nickname given",
    /// 432
    ERR_ERRONEUSNICKNAME = 432 => "{} :Erroneus nickname",
    /// 433
    ERR_NICKNAMEINUSE = 433 => "{} :Nickname is already in use",
    /// 441
    ERR_USERNOTINCHANNEL = 441 => "{} {} :They aren't on that channel",
    /// 442
    ERR_NOTONCHANNEL = 442 => "{} :You're not on that channel",
    /// 443
    ERR_USERONCHANNEL = 443 => "{} {} :is already on channel",
    /// 451
    ERR_NOTREGISTERED = 451 => ":You have not registered",
    /// 461
    ERR_NEEDMOREPARAMS = 461 => "{} :Not enough parameters",
    /// 462
    ERR_ALREADYREGISTERED = 462 => ":You may not reregister",
    /// 464
    ERR_PASSWDMISMATCH = 464 => ":Password incorrect",
    /// 471
    ERR_CHANNELISFULL = 471 => "{} :Cannot join channel (+l)",
    /// 472
    ERR_UNKNOWNMODE = 472 => "{} :is unknown mode char to me for {}",
    /// 473
    ERR_INVITEONLYCHAN = 473 => "{} :Cannot join channel (+i)",
    /// 474
    ERR_BANNEDFROMCHAN = 474 => "{} :Cannot join channel (+b)",
    /// 475
    ERR_BADCHANNELKEY = 475 => "{} :Cannot join channel (+k)",
    /// 481
    ERR_NOPRIVILEGES = 481 => ":Permission Denied- You're not an IRC operator",
    /// 482
    ERR_CHANOPRIVSNEEDED = 482 => "{} :You're not channel operator",
    /// 501
    ERR_UMODEUNKNOWNFLAG = 501 => ":Unknown MODE flag",
    /// 502
    ERR_USERSDONTMATCH = 502 => ":Cant change mode for other users",
    /// 525
    ERR_INVALIDKEY = 525 => "{} :Key is not well-formed",
    /// 730
    RPL_MONONLINE = 730 => ":{}",
    /// 731
    RPL_MONOFFLINE = 731 => ":{}",
    /// 732
    RPL_MONLIST = 732 => ":{}",
    /// 733
    RPL_ENDOFMONLIST = 733 => ":End of MONITOR list",
    /// 734
    ERR_MONLISTFULL = 734 => "{} {} :Monitor list is full",
    /// 900
    RPL_LOGGEDIN = 900 => "{} {} :You are now logged in as {}",
    /// 903
    RPL_SASLSUCCESS = 903 => ":SASL authentication successful",
    /// 904
    ERR_SASLFAIL = 904 => ":SASL authentication failed",
    /// 905
    ERR_SASLTOOLONG = 905 => ":SASL message too long",
    /// 906
    ERR_SASLABORTED = 906 => ":SASL authentication aborted",
    /// 907
    ERR_SASLALREADY = 907 => ":You have already authenticated using SASL",
    /// 908
    RPL_SASLMECHS = 908 => "{} :are available SASL mechanisms",
}

impl Response {
    /// The numeric code.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// True for 400-599.
    pub fn is_error(self) -> bool {
        (400..600).contains(&self.code())
    }

    /// The unformatted template as a message from `server`.
    pub fn to_template(self, server: &str) -> Message {
        Message::template(&self.to_string(), self.template()).from_server(server)
    }

    /// Build the reply addressed to `nick`.
    pub fn reply(self, server: &str, nick: &str, args: &[&dyn Display]) -> Message {
        self.to_template(server).format(nick, args)
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_zero_padded() {
        assert_eq!(Response::RPL_WELCOME.to_string(), "001");
        assert_eq!(Response::ERR_NOSUCHNICK.code(), 401);
        assert_eq!(Response::from_code(433), Some(Response::ERR_NICKNAMEINUSE));
        assert_eq!(Response::from_code(999), None);
        assert!(!Response::ERR_SASLFAIL.is_error());
        assert!(Response::ERR_NEEDMOREPARAMS.is_error());
    }

    #[test]
    fn reply_wire_format() {
        let m = Response::ERR_NEEDMOREPARAMS.reply("gossip", "a", &[&"OPER"]);
        assert_eq!(m.to_string(), ":gossip 461 a OPER :Not enough parameters\r\n");

        let m = Response::ERR_NOTREGISTERED.reply("gossip", "*", &[]);
        assert_eq!(m.to_string(), ":gossip 451 * :You have not registered\r\n");
    }

    #[test]
    fn isupport_tokens_precede_trailing() {
        let mut m = Response::RPL_ISUPPORT.reply("s", "n", &[]);
        m.push_param("CASEMAPPING=ascii");
        m.push_param("CHANTYPES=#&");
        assert_eq!(
            m.to_string(),
            ":s 005 n CASEMAPPING=ascii CHANTYPES=#& :are supported by this server\r\n"
        );
    }

    #[test]
    fn topic_whotime() {
        let m = Response::RPL_TOPICWHOTIME.reply("s", "n", &[&"#c", &"bob", &1700000000u64]);
        assert_eq!(m.to_string(), ":s 333 n #c bob 1700000000\r\n");
    }
}
