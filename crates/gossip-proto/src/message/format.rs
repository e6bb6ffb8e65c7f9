//! Placeholder interpolation for reply templates.
//!
//! A template is an ordinary [`Message`] whose parameters contain `{}`
//! markers. [`Message::format`] fills the markers left to right across all
//! parameters and prepends the recipient nick, which is how numeric
//! replies are addressed.

use std::fmt::{Display, Write};

use super::types::Message;

const PLACEHOLDER: &str = "{}";

impl Message {
    /// Build a parameter list from `"middle middle :trailing"` text.
    ///
    /// Used for static reply templates, so the input is trusted and no
    /// parsing error can occur.
    pub fn template(command: &str, params: &str) -> Message {
        let mut msg = Message::new(command);
        let (middles, trailing) = if let Some(rest) = params.strip_prefix(':') {
            ("", Some(rest))
        } else {
            match params.split_once(" :") {
                Some((middles, trailing)) => (middles, Some(trailing)),
                None => (params, None),
            }
        };
        for middle in middles.split(' ').filter(|p| !p.is_empty()) {
            msg.push_param(middle);
        }
        if let Some(trailing) = trailing {
            msg = msg.trailing(trailing);
        }
        msg
    }

    /// Instantiate a template for `nick`.
    ///
    /// Markers without a matching argument are replaced by nothing; extra
    /// arguments are ignored.
    pub fn format(&self, nick: &str, args: &[&dyn Display]) -> Message {
        let mut args = args.iter();
        let mut params = Vec::with_capacity(self.params.len() + 1);
        params.push(nick.to_owned());

        for param in &self.params {
            let mut out = String::with_capacity(param.len());
            let mut rest = param.as_str();
            while let Some(idx) = rest.find(PLACEHOLDER) {
                out.push_str(&rest[..idx]);
                if let Some(arg) = args.next() {
                    let _ = write!(out, "{arg}");
                }
                rest = &rest[idx + PLACEHOLDER.len()..];
            }
            out.push_str(rest);
            params.push(out);
        }

        Message {
            tags: self.tags.clone(),
            source: self.source.clone(),
            command: self.command.clone(),
            params,
            trailing_set: self.trailing_set,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_splits_middles_and_trailing() {
        let t = Message::template("401", "{} :No such nick/channel");
        assert_eq!(t.params, ["{}", "No such nick/channel"]);
        assert!(t.trailing_set);

        let t = Message::template("001", ":Welcome to the {} IRC Network {}");
        assert_eq!(t.params, ["Welcome to the {} IRC Network {}"]);

        let t = Message::template("333", "{} {} {}");
        assert_eq!(t.params.len(), 3);
        assert!(!t.trailing_set);
    }

    #[test]
    fn format_binds_nick_first() {
        let t = Message::template("001", ":Welcome to the {} IRC Network {}").from_server("irc.test");
        let m = t.format("alice", &[&"Gossip", &"alice!a@h"]);
        assert_eq!(
            m.to_string(),
            ":irc.test 001 alice :Welcome to the Gossip IRC Network alice!a@h\r\n"
        );
    }

    #[test]
    fn placeholders_span_parameters() {
        let t = Message::template("353", "{} {} :{}");
        let m = t.format("bob", &[&'=', &"#c", &"@bob alice"]);
        assert_eq!(m.params, ["bob", "=", "#c", "@bob alice"]);
    }

    #[test]
    fn missing_arguments_become_empty() {
        let t = Message::template("391", "{} :{}");
        let m = t.format("x", &[&"srv"]);
        assert_eq!(m.params, ["x", "srv", ""]);
        assert!(m.trailing_set);
    }

    #[test]
    fn numbers_format() {
        let t = Message::template("252", "{} :operator(s) online");
        assert_eq!(t.format("n", &[&3usize]).params[1], "3");
    }
}
