//! IRCv3 capabilities offered by the server.

use std::fmt;

/// A capability the server can negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// `ACCOUNT` broadcasts on login/logout.
    AccountNotify,
    /// `account` tag on messages.
    AccountTag,
    /// `AWAY` broadcasts.
    AwayNotify,
    /// `BATCH` grouping.
    Batch,
    /// `CAP NEW` / `CAP DEL`.
    CapNotify,
    /// `CHGHOST` broadcasts.
    ChgHost,
    /// Senders receive their own messages.
    EchoMessage,
    /// Account and realname on `JOIN`.
    ExtendedJoin,
    /// `INVITE` broadcasts to channel operators.
    InviteNotify,
    /// `label` correlation.
    LabeledResponse,
    /// Client tags and `msgid`.
    MessageTags,
    /// Every prefix in `NAMES` and `WHO`.
    MultiPrefix,
    /// `AUTHENTICATE`.
    Sasl,
    /// `time` tag on messages.
    ServerTime,
    /// `SETNAME`.
    SetName,
    /// `nick!user@host` in `NAMES`.
    UserhostInNames,
}

impl Capability {
    /// Every capability, in the order advertised by `CAP LS`.
    pub const ALL: [Capability; 16] = [
        Capability::AccountNotify,
        Capability::AccountTag,
        Capability::AwayNotify,
        Capability::Batch,
        Capability::CapNotify,
        Capability::ChgHost,
        Capability::EchoMessage,
        Capability::ExtendedJoin,
        Capability::InviteNotify,
        Capability::LabeledResponse,
        Capability::MessageTags,
        Capability::MultiPrefix,
        Capability::Sasl,
        Capability::ServerTime,
        Capability::SetName,
        Capability::UserhostInNames,
    ];

    /// Wire name.
    pub fn name(self) -> &'static str {
        match self {
            Capability::AccountNotify => "account-notify",
            Capability::AccountTag => "account-tag",
            Capability::AwayNotify => "away-notify",
            Capability::Batch => "batch",
            Capability::CapNotify => "cap-notify",
            Capability::ChgHost => "chghost",
            Capability::EchoMessage => "echo-message",
            Capability::ExtendedJoin => "extended-join",
            Capability::InviteNotify => "invite-notify",
            Capability::LabeledResponse => "labeled-response",
            Capability::MessageTags => "message-tags",
            Capability::MultiPrefix => "multi-prefix",
            Capability::Sasl => "sasl",
            Capability::ServerTime => "server-time",
            Capability::SetName => "setname",
            Capability::UserhostInNames => "userhost-in-names",
        }
    }

    /// Value advertised with `CAP LS 302`.
    pub fn value(self) -> Option<&'static str> {
        match self {
            Capability::Sasl => Some("PLAIN,EXTERNAL,SCRAM-SHA-256"),
            _ => None,
        }
    }

    /// Look up a capability by name. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Capability> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// True if `name` is a capability this server knows.
    pub fn is_recognized(name: &str) -> bool {
        Self::from_name(name).is_some()
    }

    /// `name` or `name=value` depending on the negotiated CAP version.
    pub fn ls_entry(self, version: u32) -> String {
        match self.value() {
            Some(value) if version >= 302 => format!("{}={value}", self.name()),
            _ => self.name().to_owned(),
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for cap in Capability::ALL {
            assert_eq!(Capability::from_name(cap.name()), Some(cap));
        }
        assert!(Capability::is_recognized("server-time"));
        assert!(!Capability::is_recognized("draft/unknown"));
    }

    #[test]
    fn sasl_value_only_for_302() {
        assert_eq!(Capability::Sasl.ls_entry(301), "sasl");
        assert_eq!(
            Capability::Sasl.ls_entry(302),
            "sasl=PLAIN,EXTERNAL,SCRAM-SHA-256"
        );
        assert_eq!(Capability::Batch.ls_entry(302), "batch");
    }
}
