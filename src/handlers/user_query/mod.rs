//! User query handlers: WHO, WHOIS, WHOWAS and USERHOST.

mod userhost;
mod who;
mod whois;
mod whowas;

pub use userhost::UserhostHandler;
pub use who::WhoHandler;
pub use whois::WhoisHandler;
pub use whowas::WhowasHandler;
