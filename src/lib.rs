//! gossipd - a single-writer IRC daemon.
//!
//! Connections parse lines in parallel and queue them for one engine task
//! that owns every client and channel, so commands never race each other.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod network;
pub mod sasl;
pub mod server;
pub mod state;

pub use server::Server;
