//! Network module.
//!
//! Contains the Gateway (TCP listener) and the per-connection supervisor.

mod connection;
mod gateway;

pub use connection::Connection;
pub use gateway::Gateway;
