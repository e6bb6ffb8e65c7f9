//! Tag escaping and tag mutation on [`Message`].

use super::types::{Message, Tag};

/// Escape a tag value for the wire.
pub fn escape_tag_value(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            ';' => out.push_str("\\:"),
            ' ' => out.push_str("\\s"),
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
}

/// Reverse [`escape_tag_value`].
///
/// An unknown escape drops the backslash and keeps the character; a
/// trailing lone backslash is dropped.
pub fn unescape_tag_value(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut iter = value.chars();
    while let Some(c) = iter.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match iter.next() {
            Some(':') => unescaped.push(';'),
            Some('s') => unescaped.push(' '),
            Some('\\') => unescaped.push('\\'),
            Some('r') => unescaped.push('\r'),
            Some('n') => unescaped.push('\n'),
            Some(other) => unescaped.push(other),
            None => break,
        }
    }
    unescaped
}

impl Message {
    /// Append a server tag with an unescaped value.
    pub fn add_tag(&mut self, key: &str, value: Option<&str>) {
        self.tags.push(Tag::new(key, value));
    }

    /// Last tag named `name`; later duplicates win.
    pub fn tag(&self, name: &str) -> Option<&Tag> {
        self.tags.iter().rev().find(|t| t.is(name))
    }

    /// True if a tag named `name` is present.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tag(name).is_some()
    }

    /// Decoded value of the last tag named `name`.
    pub fn tag_value(&self, name: &str) -> Option<String> {
        self.tag(name).map(Tag::raw)
    }

    /// Drop every tag named `name`.
    pub fn remove_tag(&mut self, name: &str) {
        self.tags.retain(|t| !t.is(name));
    }

    /// Drop all tags.
    pub fn remove_all_tags(&mut self) {
        self.tags.clear();
    }

    /// Keep only client-only (`+`) tags.
    pub fn trim_non_client_tags(&mut self) {
        self.tags.retain(|t| t.client_prefix);
    }

    /// Attach a `msgid` tag unless one already exists, and return it.
    ///
    /// Calling this twice yields the same id and a single tag.
    pub fn set_msgid(&mut self) -> String {
        if let Some(existing) = self.tag("msgid") {
            return existing.raw();
        }
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.add_tag("msgid", Some(&id));
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_restores_escaped_characters() {
        let tag = Tag {
            client_prefix: false,
            vendor: None,
            key: "a".into(),
            value: Some("raw+:=,escaped\\:\\s\\\\".into()),
        };
        assert_eq!(tag.raw(), "raw+:=,escaped; \\");
    }

    #[test]
    fn unknown_escape_drops_backslash() {
        assert_eq!(unescape_tag_value("a\\xb"), "axb");
        assert_eq!(unescape_tag_value("trailing\\"), "trailing");
        assert_eq!(unescape_tag_value("\\r\\n"), "\r\n");
    }

    #[test]
    fn escape_then_unescape_is_identity() {
        for original in ["plain", "semi;colon", "two  spaces", "back\\slash", "cr\rlf\n"] {
            let mut escaped = String::new();
            escape_tag_value(&mut escaped, original);
            assert!(!escaped.contains(' ') && !escaped.contains(';'));
            assert_eq!(unescape_tag_value(&escaped), original);
        }
    }

    #[test]
    fn set_msgid_is_idempotent() {
        let mut m = Message::new("PRIVMSG").param("#c").trailing("hi");
        let first = m.set_msgid();
        let second = m.set_msgid();
        assert_eq!(first, second);
        assert_eq!(m.tags.iter().filter(|t| t.is("msgid")).count(), 1);
    }

    #[test]
    fn lookup_prefers_last_duplicate() {
        let mut m = Message::new("TAGMSG");
        m.add_tag("k", Some("one"));
        m.add_tag("k", Some("two"));
        assert_eq!(m.tag_value("k").as_deref(), Some("two"));
    }

    #[test]
    fn trim_keeps_only_client_tags() {
        let mut m = Message::new("TAGMSG")
            .with_tag(Tag::new("time", Some("now")))
            .with_tag(Tag::client("typing", Some("active")));
        m.trim_non_client_tags();
        assert_eq!(m.tags.len(), 1);
        assert!(m.tags[0].client_prefix);
        m.remove_all_tags();
        assert!(m.tags.is_empty());
    }

    #[test]
    fn vendor_names_match() {
        let tag = Tag {
            client_prefix: true,
            vendor: Some("example.com".into()),
            key: "x".into(),
            value: None,
        };
        assert!(tag.is("example.com/x"));
        assert!(!tag.is("x"));
        assert_eq!(tag.to_string(), "+example.com/x");
    }
}
