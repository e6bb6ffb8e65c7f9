//! Core configuration types and loading.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use gossip_proto::{ParseOptions, TagPolicy};

use super::oper::{OperBlock, verify_secret};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// Ping and registration timeouts.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    /// Queue and history limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Credential store configuration.
    pub database: Option<DatabaseConfig>,
    /// Operator blocks.
    #[serde(default)]
    pub oper: Vec<OperBlock>,
    /// Message parser strictness.
    #[serde(default)]
    pub parser: ParserConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// A `motd_file` is read relative to the working directory and replaces
    /// any inline `motd` lines.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        if let Some(file) = &config.server.motd_file {
            let motd = std::fs::read_to_string(file)?;
            config.server.motd = motd.lines().map(str::to_owned).collect();
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = &self.server.name;
        if name.is_empty() || name.contains(' ') {
            return Err(ConfigError::Invalid(format!(
                "server.name {name:?} must be a non-empty word"
            )));
        }
        if self.limits.sendq == 0 || self.limits.queue == 0 {
            return Err(ConfigError::Invalid(
                "limits.sendq and limits.queue must be positive".into(),
            ));
        }
        let t = &self.timeouts;
        if t.ping == 0 || t.timeout == 0 || t.registration == 0 {
            return Err(ConfigError::Invalid(
                "timeouts.ping, timeouts.timeout and timeouts.registration must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Parser options derived from `[parser]`.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            tag_policy: if self.parser.strict_tags {
                TagPolicy::Strict
            } else {
                TagPolicy::Lenient
            },
            ..ParseOptions::default()
        }
    }

    /// Look up an operator block by name.
    pub fn find_oper(&self, name: &str) -> Option<&OperBlock> {
        self.oper.iter().find(|o| o.name == name)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "irc.example.net").
    pub name: String,
    /// Network name (e.g., "Gossip").
    pub network: String,
    /// Server description, shown in WHOIS.
    #[serde(default = "default_description")]
    pub description: String,
    /// Connection password (bcrypt hash, or plaintext).
    pub password: Option<String>,
    /// Path to MOTD file (one line per MOTD line).
    pub motd_file: Option<PathBuf>,
    /// Inline MOTD lines (used when `motd_file` is not set).
    #[serde(default)]
    pub motd: Vec<String>,
}

impl ServerConfig {
    /// Check a PASS attempt against the connection password.
    ///
    /// Always true when no password is configured.
    pub fn verify_password(&self, attempt: Option<&str>) -> bool {
        match (&self.password, attempt) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(stored), Some(attempt)) => verify_secret(stored, attempt),
        }
    }
}

fn default_description() -> String {
    "gossipd".to_string()
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind (port 0 picks an ephemeral port).
    pub address: SocketAddr,
}

/// Connection keepalive configuration.
///
/// - `ping`: seconds of idle before the server sends PING (default: 90)
/// - `timeout`: seconds to wait for any traffic after PING (default: 120)
/// - `registration`: seconds allowed to finish registering (default: 60)
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    #[serde(default = "default_ping_interval")]
    pub ping: u64,
    #[serde(default = "default_ping_timeout")]
    pub timeout: u64,
    #[serde(default = "default_registration_timeout")]
    pub registration: u64,
}

impl TimeoutsConfig {
    pub fn ping(&self) -> Duration {
        Duration::from_secs(self.ping)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn registration(&self) -> Duration {
        Duration::from_secs(self.registration)
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            ping: default_ping_interval(),
            timeout: default_ping_timeout(),
            registration: default_registration_timeout(),
        }
    }
}

fn default_ping_interval() -> u64 {
    90
}

fn default_ping_timeout() -> u64 {
    120
}

fn default_registration_timeout() -> u64 {
    60
}

/// Queue and history limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Outbound messages buffered per client before it is dropped (default: 512).
    #[serde(default = "default_sendq")]
    pub sendq: usize,
    /// Engine event queue capacity (default: 4096).
    #[serde(default = "default_queue")]
    pub queue: usize,
    /// WHOWAS entries kept (default: 1000).
    #[serde(default = "default_whowas")]
    pub whowas: usize,
    /// MONITOR entries per client (default: 100).
    #[serde(default = "default_monitor")]
    pub monitor: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            sendq: default_sendq(),
            queue: default_queue(),
            whowas: default_whowas(),
            monitor: default_monitor(),
        }
    }
}

fn default_sendq() -> usize {
    512
}

fn default_queue() -> usize {
    4096
}

fn default_whowas() -> usize {
    1000
}

fn default_monitor() -> usize {
    100
}

/// Credential store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL or path, e.g. `sqlite://gossip.db`.
    pub url: String,
}

/// Message parser configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParserConfig {
    /// Drop the whole message on an ill-formed tag instead of just the tag.
    #[serde(default)]
    pub strict_tags: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[server]
name = "irc.test"
network = "TestNet"

[listen]
address = "127.0.0.1:6667"
"#;

    #[test]
    fn defaults_fill_optional_sections() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.timeouts.ping, 90);
        assert_eq!(config.timeouts.timeout, 120);
        assert_eq!(config.timeouts.registration, 60);
        assert_eq!(config.limits.sendq, 512);
        assert_eq!(config.limits.monitor, 100);
        assert!(config.database.is_none());
        assert!(config.oper.is_empty());
        assert!(!config.parser.strict_tags);
        assert_eq!(config.server.description, "gossipd");
    }

    #[test]
    fn strict_tags_maps_to_parse_options() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.parse_options().tag_policy, TagPolicy::Lenient);
        config.parser.strict_tags = true;
        assert_eq!(config.parse_options().tag_policy, TagPolicy::Strict);
    }

    #[test]
    fn load_reads_motd_file() {
        let dir = tempfile::tempdir().unwrap();
        let motd_path = dir.path().join("motd.txt");
        std::fs::write(&motd_path, "line one\nline two\n").unwrap();

        let config_path = dir.path().join("config.toml");
        let text = format!(
            "[server]\nname = \"irc.test\"\nnetwork = \"TestNet\"\nmotd_file = {:?}\n\n[listen]\naddress = \"127.0.0.1:0\"\n",
            motd_path.display().to_string()
        );
        std::fs::write(&config_path, text).unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.server.motd, ["line one", "line two"]);
    }

    #[test]
    fn invalid_server_name_is_rejected() {
        let text = MINIMAL.replace("irc.test", "bad name");
        let config: Config = toml::from_str(&text).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        for key in ["ping", "timeout", "registration"] {
            let text = format!("{MINIMAL}\n[timeouts]\n{key} = 0\n");
            let config: Config = toml::from_str(&text).unwrap();
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{key} = 0 was accepted"
            );
        }
        let text = format!("{MINIMAL}\n[timeouts]\nping = 1\ntimeout = 1\nregistration = 1\n");
        let config: Config = toml::from_str(&text).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn connection_password_check() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        assert!(config.server.verify_password(None));
        config.server.password = Some(bcrypt::hash("hunter2", 4).unwrap());
        assert!(config.server.verify_password(Some("hunter2")));
        assert!(!config.server.verify_password(Some("hunter3")));
        assert!(!config.server.verify_password(None));
    }
}
