//! Server query handlers.
//!
//! MOTD, LUSERS, TIME and INFO. The MOTD and LUSERS replies are also part
//! of the registration burst.

mod info;
mod lusers;
mod motd;
mod time;

pub use info::InfoHandler;
pub use lusers::LusersHandler;
pub(crate) use lusers::send_lusers;
pub use motd::MotdHandler;
pub(crate) use motd::send_motd;
pub use time::TimeHandler;
