//! Connection and registration handlers.
//!
//! Handles PASS, NICK, USER, PING, PONG, QUIT and ERROR, plus the
//! registration completion shared with `CAP END`.

mod nick;
mod pass;
mod ping;
mod quit;
mod user;
mod welcome;

pub use nick::NickHandler;
pub use pass::PassHandler;
pub use ping::{ErrorHandler, PingHandler, PongHandler};
pub use quit::QuitHandler;
pub use user::UserHandler;
pub(crate) use welcome::try_register;
