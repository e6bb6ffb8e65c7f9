//! LIST command handler with ELIST filters.
//!
//! `LIST [<conditions>]` or `LIST <channels> <conditions>`. Conditions are
//! comma separated and all must hold:
//! - `<n` / `>n`: fewer / more than n members
//! - `C<n` / `C>n`: created less / more than n minutes ago
//! - `T<n` / `T>n`: topic set less / more than n minutes ago
//! - `!mask`: name does not match
//! - `mask`: name matches

use async_trait::async_trait;
use chrono::Utc;
use gossip_proto::{Message, Response, casemap, wild};

use crate::error::HandlerResult;
use crate::handlers::{Context, Handler};
use crate::state::Channel;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Users { less: bool, count: usize },
    Created { less: bool, minutes: i64 },
    TopicAge { less: bool, minutes: i64 },
    NotMask(String),
    Mask(String),
}

impl Condition {
    fn parse(raw: &str) -> Option<Self> {
        fn bound(rest: &str) -> Option<(bool, &str)> {
            match rest.as_bytes().first()? {
                b'<' => Some((true, &rest[1..])),
                b'>' => Some((false, &rest[1..])),
                _ => None,
            }
        }
        if let Some((less, n)) = bound(raw) {
            return n.parse().ok().map(|count| Self::Users { less, count });
        }
        if let Some(rest) = raw.strip_prefix('C')
            && let Some((less, n)) = bound(rest)
        {
            return n.parse().ok().map(|minutes| Self::Created { less, minutes });
        }
        if let Some(rest) = raw.strip_prefix('T')
            && let Some((less, n)) = bound(rest)
        {
            return n.parse().ok().map(|minutes| Self::TopicAge { less, minutes });
        }
        if let Some(mask) = raw.strip_prefix('!') {
            return Some(Self::NotMask(casemap::fold(mask)));
        }
        (!raw.is_empty()).then(|| Self::Mask(casemap::fold(raw)))
    }

    fn holds(&self, chan: &Channel, now: i64) -> bool {
        let compare = |less: bool, value: i64, bound: i64| {
            if less { value < bound } else { value > bound }
        };
        let age_minutes = |since: i64| (now - since) / 60;
        match self {
            Self::Users { less, count } => compare(*less, chan.member_count() as i64, *count as i64),
            Self::Created { less, minutes } => compare(*less, age_minutes(chan.created), *minutes),
            Self::TopicAge { less, minutes } => {
                let set_at = chan.topic.as_ref().map_or(0, |t| t.set_at);
                compare(*less, age_minutes(set_at), *minutes)
            }
            Self::NotMask(mask) => !wild::matches(mask, &casemap::fold(&chan.name)),
            Self::Mask(mask) => wild::matches(mask, &casemap::fold(&chan.name)),
        }
    }
}

/// Handler for LIST command.
pub struct ListHandler;

#[async_trait]
impl Handler for ListHandler {
    async fn handle(&self, ctx: &mut Context<'_>, msg: &Message) -> HandlerResult {
        let (names, conditions) = match (msg.arg(0), msg.arg(1)) {
            (Some(names), Some(conditions)) => (Some(names), conditions),
            (Some(conditions), None) => (None, conditions),
            (None, _) => (None, ""),
        };
        let conditions: Vec<Condition> = conditions.split(',').filter_map(Condition::parse).collect();
        let now = Utc::now().timestamp();
        let id = ctx.id;

        let mut candidates: Vec<&Channel> = match names {
            Some(names) => names
                .split(',')
                .filter_map(|n| ctx.state.channel(n))
                .collect(),
            None => ctx.state.channels.values().collect(),
        };
        candidates.sort_by(|a, b| a.name.cmp(&b.name));

        let rows: Vec<(String, usize, String)> = candidates
            .into_iter()
            .filter(|chan| !chan.is_secret() || chan.is_member(id))
            .filter(|chan| conditions.iter().all(|c| c.holds(chan, now)))
            .map(|chan| {
                let topic = chan.topic.as_ref().map(|t| t.text.clone()).unwrap_or_default();
                (chan.name.clone(), chan.member_count(), topic)
            })
            .collect();

        for (name, count, topic) in rows {
            ctx.reply(Response::RPL_LIST, &[&name, &count, &topic]);
        }
        ctx.reply(Response::RPL_LISTEND, &[]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ClientId, MemberPrefixes, Topic};

    fn channel(name: &str, members: u64, created_ago: i64, now: i64) -> Channel {
        let mut chan = Channel::new(name);
        chan.created = now - created_ago;
        for id in 0..members {
            chan.add_member(ClientId(id + 1), MemberPrefixes::empty());
        }
        chan
    }

    #[test]
    fn parse_conditions() {
        assert_eq!(Condition::parse("<5"), Some(Condition::Users { less: true, count: 5 }));
        assert_eq!(Condition::parse(">2"), Some(Condition::Users { less: false, count: 2 }));
        assert_eq!(Condition::parse("C>10"), Some(Condition::Created { less: false, minutes: 10 }));
        assert_eq!(Condition::parse("T<3"), Some(Condition::TopicAge { less: true, minutes: 3 }));
        assert_eq!(Condition::parse("!#Foo*"), Some(Condition::NotMask("#foo*".into())));
        assert_eq!(Condition::parse("#rust"), Some(Condition::Mask("#rust".into())));
        assert_eq!(Condition::parse("<x"), None);
        assert_eq!(Condition::parse(""), None);
    }

    #[test]
    fn conditions_filter_channels() {
        let now = 1_700_000_000;
        let busy = channel("#Busy", 5, 3600, now);
        let quiet = channel("#quiet", 1, 60, now);

        let more_than_two = Condition::parse(">2").unwrap();
        assert!(more_than_two.holds(&busy, now));
        assert!(!more_than_two.holds(&quiet, now));

        let young = Condition::parse("C<30").unwrap();
        assert!(young.holds(&quiet, now));
        assert!(!young.holds(&busy, now));

        let not_busy = Condition::parse("!#busy").unwrap();
        assert!(!not_busy.holds(&busy, now));
        assert!(not_busy.holds(&quiet, now));

        assert!(Condition::parse("#q*").unwrap().holds(&quiet, now));
    }

    #[test]
    fn topic_age_without_topic_is_old() {
        let now = 1_700_000_000;
        let mut chan = channel("#t", 1, 0, now);
        let recent = Condition::parse("T<5").unwrap();
        assert!(!recent.holds(&chan, now));
        chan.topic = Some(Topic {
            text: "hi".into(),
            set_by: "a".into(),
            set_at: now - 60,
        });
        assert!(recent.holds(&chan, now));
    }
}
