//! Operator handlers: OPER, WALLOPS, CHGHOST and REHASH.

mod auth;
mod chghost;
mod rehash;
mod wallops;

pub use auth::OperHandler;
pub use chghost::ChghostHandler;
pub use rehash::RehashHandler;
pub use wallops::WallopsHandler;
