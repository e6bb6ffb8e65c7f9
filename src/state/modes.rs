//! Mode bitsets for users, channels and channel members.

use bitflags::bitflags;

bitflags! {
    /// User modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct UserModes: u8 {
        /// +i, hidden from WHO/NAMES unless a channel is shared.
        const INVISIBLE = 1 << 0;
        /// +w, receives WALLOPS.
        const WALLOPS = 1 << 1;
        /// +B, marked as a bot.
        const BOT = 1 << 2;
        /// +o, IRC operator.
        const OPER = 1 << 3;
        /// +r, logged in to an account.
        const REGISTERED = 1 << 4;
        /// +a, away.
        const AWAY = 1 << 5;
    }
}

const USER_LETTERS: [(UserModes, char); 6] = [
    (UserModes::AWAY, 'a'),
    (UserModes::BOT, 'B'),
    (UserModes::INVISIBLE, 'i'),
    (UserModes::OPER, 'o'),
    (UserModes::REGISTERED, 'r'),
    (UserModes::WALLOPS, 'w'),
];

impl UserModes {
    /// Every user mode letter, for RPL_MYINFO.
    pub const LETTERS: &'static str = "aBiorw";

    /// Flag for a mode letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        USER_LETTERS
            .iter()
            .find(|(_, l)| *l == letter)
            .map(|(flag, _)| *flag)
    }

    /// `+letters` form for RPL_UMODEIS.
    pub fn to_mode_string(self) -> String {
        let mut out = String::from("+");
        out.extend(
            USER_LETTERS
                .iter()
                .filter(|(flag, _)| self.contains(*flag))
                .map(|(_, l)| *l),
        );
        out
    }
}

bitflags! {
    /// Channel flag modes that carry no parameter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelModes: u8 {
        /// +i
        const INVITE_ONLY = 1 << 0;
        /// +m
        const MODERATED = 1 << 1;
        /// +s
        const SECRET = 1 << 2;
        /// +t, only operators may change the topic.
        const PROTECTED_TOPIC = 1 << 3;
        /// +n, no messages from outside.
        const NO_EXTERNAL = 1 << 4;
    }
}

const CHANNEL_LETTERS: [(ChannelModes, char); 5] = [
    (ChannelModes::INVITE_ONLY, 'i'),
    (ChannelModes::MODERATED, 'm'),
    (ChannelModes::SECRET, 's'),
    (ChannelModes::PROTECTED_TOPIC, 't'),
    (ChannelModes::NO_EXTERNAL, 'n'),
];

impl ChannelModes {
    /// Flag for a mode letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        CHANNEL_LETTERS
            .iter()
            .find(|(_, l)| *l == letter)
            .map(|(flag, _)| *flag)
    }

    /// Letters of the set flags, in table order.
    pub fn letters(self) -> String {
        CHANNEL_LETTERS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, l)| *l)
            .collect()
    }
}

bitflags! {
    /// Per-channel membership prefixes, highest first.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MemberPrefixes: u8 {
        /// +q `~`
        const FOUNDER = 1 << 4;
        /// +a `&`
        const PROTECTED = 1 << 3;
        /// +o `@`
        const OPERATOR = 1 << 2;
        /// +h `%`
        const HALFOP = 1 << 1;
        /// +v `+`
        const VOICE = 1 << 0;
    }
}

/// (flag, mode letter, prefix symbol), highest precedence first.
const PREFIXES: [(MemberPrefixes, char, char); 5] = [
    (MemberPrefixes::FOUNDER, 'q', '~'),
    (MemberPrefixes::PROTECTED, 'a', '&'),
    (MemberPrefixes::OPERATOR, 'o', '@'),
    (MemberPrefixes::HALFOP, 'h', '%'),
    (MemberPrefixes::VOICE, 'v', '+'),
];

impl MemberPrefixes {
    /// The `PREFIX` ISUPPORT token value.
    pub const ISUPPORT: &'static str = "(qaohv)~&@%+";

    /// Flag for a membership mode letter.
    pub fn from_letter(letter: char) -> Option<Self> {
        PREFIXES
            .iter()
            .find(|(_, l, _)| *l == letter)
            .map(|(flag, _, _)| *flag)
    }

    /// The highest prefix symbol held.
    pub fn highest(self) -> Option<char> {
        PREFIXES
            .iter()
            .find(|(flag, _, _)| self.contains(*flag))
            .map(|(_, _, sym)| *sym)
    }

    /// Every prefix symbol held, highest first.
    pub fn symbols(self) -> String {
        PREFIXES
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, _, sym)| *sym)
            .collect()
    }

    /// Mode letters held, highest first.
    pub fn letters(self) -> String {
        PREFIXES
            .iter()
            .filter(|(flag, _, _)| self.contains(*flag))
            .map(|(_, l, _)| *l)
            .collect()
    }

    /// `@` or above.
    pub fn is_op_or_higher(self) -> bool {
        self.intersects(Self::FOUNDER | Self::PROTECTED | Self::OPERATOR)
    }

    /// NAMES/WHO rendering: every symbol with multi-prefix, else the highest.
    pub fn render(self, multi_prefix: bool) -> String {
        if multi_prefix {
            self.symbols()
        } else {
            self.highest().map(String::from).unwrap_or_default()
        }
    }
}
