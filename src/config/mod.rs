//! Configuration loading and management.
//!
//! - [`types`]: the TOML model and loader
//! - [`oper`]: operator blocks and password checks

mod oper;
mod types;

use std::sync::Arc;

use parking_lot::RwLock;

pub use oper::OperBlock;
pub use types::{
    Config, ConfigError, DatabaseConfig, LimitsConfig, ListenConfig, ParserConfig, ServerConfig,
    TimeoutsConfig,
};

/// The live configuration, swapped wholesale by REHASH.
///
/// Readers clone the inner `Arc` and never hold the lock across an await.
#[derive(Debug, Clone)]
pub struct SharedConfig(Arc<RwLock<Arc<Config>>>);

impl SharedConfig {
    pub fn new(config: Config) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(config))))
    }

    /// Snapshot of the current configuration.
    pub fn current(&self) -> Arc<Config> {
        self.0.read().clone()
    }

    /// Install a new configuration.
    pub fn replace(&self, config: Config) {
        *self.0.write() = Arc::new(config);
    }
}
