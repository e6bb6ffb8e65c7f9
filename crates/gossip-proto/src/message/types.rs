use std::fmt;

use super::tags::{escape_tag_value, unescape_tag_value};

/// A single IRCv3 message tag.
///
/// The value is stored exactly as it appears on the wire (escaped); use
/// [`Tag::raw`] to obtain the decoded text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// True for client-only tags (`+key`).
    pub client_prefix: bool,
    /// Optional vendor segment (`example.com` in `example.com/key`).
    pub vendor: Option<String>,
    /// Key name: letters, digits and hyphens.
    pub key: String,
    /// Escaped value, if the tag carried `=`.
    pub value: Option<String>,
}

impl Tag {
    /// Build a server tag from an unescaped value.
    pub fn new(key: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            client_prefix: false,
            vendor: None,
            key: key.into(),
            value: value.map(|v| {
                let mut escaped = String::with_capacity(v.len());
                escape_tag_value(&mut escaped, v);
                escaped
            }),
        }
    }

    /// Build a client-only (`+`) tag from an unescaped value.
    pub fn client(key: impl Into<String>, value: Option<&str>) -> Self {
        Self {
            client_prefix: true,
            ..Self::new(key, value)
        }
    }

    /// The decoded value, or an empty string for value-less tags.
    pub fn raw(&self) -> String {
        self.value.as_deref().map(unescape_tag_value).unwrap_or_default()
    }

    /// Key including the vendor segment, without the client prefix.
    pub fn name(&self) -> String {
        match &self.vendor {
            Some(vendor) => format!("{vendor}/{}", self.key),
            None => self.key.clone(),
        }
    }

    /// True if this tag's name (vendor included) equals `name`.
    pub fn is(&self, name: &str) -> bool {
        match &self.vendor {
            Some(vendor) => name
                .strip_prefix(vendor.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                == Some(self.key.as_str()),
            None => self.key == name,
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.client_prefix {
            f.write_str("+")?;
        }
        if let Some(vendor) = &self.vendor {
            write!(f, "{vendor}/")?;
        }
        f.write_str(&self.key)?;
        if let Some(value) = &self.value {
            write!(f, "={value}")?;
        }
        Ok(())
    }
}

/// Message source: `nick[!user][@host]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Source {
    /// Nickname or server name.
    pub nick: String,
    /// Username, if present.
    pub user: Option<String>,
    /// Hostname, if present.
    pub host: Option<String>,
}

impl Source {
    /// A bare server-name source.
    pub fn server(name: impl Into<String>) -> Self {
        Self {
            nick: name.into(),
            user: None,
            host: None,
        }
    }

    /// A full `nick!user@host` source.
    pub fn user(
        nick: impl Into<String>,
        user: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            nick: nick.into(),
            user: Some(user.into()),
            host: Some(host.into()),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nick)?;
        if let Some(user) = &self.user {
            write!(f, "!{user}")?;
        }
        if let Some(host) = &self.host {
            write!(f, "@{host}")?;
        }
        Ok(())
    }
}

/// An owned IRC message.
///
/// `params` holds middle parameters followed by the trailing parameter
/// when `trailing_set` is true. `trailing_set` distinguishes `TOPIC #c`
/// (query) from `TOPIC #c :` (clear).
///
/// ```
/// use gossip_proto::Message;
///
/// let msg: Message = ":nick!user@host PRIVMSG #chan :hello there".parse().unwrap();
/// assert_eq!(msg.command, "PRIVMSG");
/// assert_eq!(msg.params, ["#chan", "hello there"]);
/// assert!(msg.trailing_set);
///
/// let built = Message::new("PRIVMSG").param("#chan").trailing("hello there");
/// assert_eq!(built.to_string(), "PRIVMSG #chan :hello there\r\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Message {
    /// Tags in insertion order.
    pub tags: Vec<Tag>,
    /// Optional source.
    pub source: Option<Source>,
    /// Upper-cased command or three-digit numeric.
    pub command: String,
    /// Middle parameters, then the trailing parameter if `trailing_set`.
    pub params: Vec<String>,
    /// Whether the last parameter was introduced by `:`.
    pub trailing_set: bool,
}

impl Message {
    /// Start a message for `command` (upper-cased).
    pub fn new(command: impl AsRef<str>) -> Self {
        Self {
            command: command.as_ref().to_ascii_uppercase(),
            ..Self::default()
        }
    }

    /// Set the source.
    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    /// Set a bare server-name source.
    #[must_use]
    pub fn from_server(self, name: &str) -> Self {
        self.with_source(Source::server(name))
    }

    /// Append a middle parameter.
    ///
    /// Middle parameters must be non-empty and contain no spaces and no
    /// leading colon; use [`Message::trailing`] for anything else.
    #[must_use]
    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.push_param(param);
        self
    }

    /// Append several middle parameters.
    #[must_use]
    pub fn params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for p in params {
            self.push_param(p);
        }
        self
    }

    /// Append the trailing parameter.
    #[must_use]
    pub fn trailing(mut self, text: impl Into<String>) -> Self {
        self.params.push(text.into());
        self.trailing_set = true;
        self
    }

    /// Insert a middle parameter in front of the trailing one.
    pub fn push_param(&mut self, param: impl Into<String>) {
        if self.trailing_set && !self.params.is_empty() {
            let at = self.params.len() - 1;
            self.params.insert(at, param.into());
        } else {
            self.params.push(param.into());
        }
    }

    /// Append a tag, returning the message.
    #[must_use]
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Parameter at `idx`.
    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).map(String::as_str)
    }

    /// The trailing parameter, if one was set.
    pub fn trailing_param(&self) -> Option<&str> {
        if self.trailing_set {
            self.params.last().map(String::as_str)
        } else {
            None
        }
    }

    /// Nickname part of the source.
    pub fn source_nick(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.nick.as_str())
    }

    /// The `nick!user@host` form of the source, or an empty string.
    pub fn nuh(&self) -> String {
        self.source.as_ref().map(Source::to_string).unwrap_or_default()
    }

    /// True if the command is a three-digit numeric.
    pub fn is_numeric(&self) -> bool {
        self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit())
    }
}
