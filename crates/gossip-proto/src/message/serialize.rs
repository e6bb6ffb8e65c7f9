use std::fmt::{self, Display, Formatter};

use super::types::Message;

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.tags.is_empty() {
            f.write_str("@")?;
            for (i, tag) in self.tags.iter().enumerate() {
                if i > 0 {
                    f.write_str(";")?;
                }
                write!(f, "{tag}")?;
            }
            f.write_str(" ")?;
        }

        if let Some(source) = &self.source {
            write!(f, ":{source} ")?;
        }

        f.write_str(&self.command)?;

        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i == last && self.trailing_set {
                write!(f, " :{param}")?;
            } else {
                write!(f, " {param}")?;
            }
        }

        f.write_str("\r\n")
    }
}

impl Message {
    /// Serialize to wire bytes, CRLF included.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Upper bound on the serialized size, used for SendQ accounting.
    pub fn estimate_size(&self) -> usize {
        let tags: usize = self
            .tags
            .iter()
            .map(|t| {
                2 + t.key.len()
                    + t.vendor.as_ref().map_or(0, |v| v.len() + 1)
                    + t.value.as_ref().map_or(0, |v| v.len() + 1)
            })
            .sum();
        let source = self.source.as_ref().map_or(0, |s| {
            2 + s.nick.len()
                + s.user.as_ref().map_or(0, |u| u.len() + 1)
                + s.host.as_ref().map_or(0, |h| h.len() + 1)
        });
        let params: usize = self.params.iter().map(|p| p.len() + 2).sum();
        tags + 1 + source + self.command.len() + params + 2
    }
}
