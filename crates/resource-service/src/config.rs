//! Server configuration.
//!
//! Every setting can come from the command line or the environment.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `CRUD_SERVER_PORT` | 8000 | Server port |
//! | `CRUD_SERVER_HOST` | 127.0.0.1 | Host to bind |
//! | `CRUD_LOG_LEVEL` | info | Log level, overridden by `RUST_LOG` |
//! | `CRUD_CHANNEL_CAPACITY` | 32 | Pending requests per store |
//! | `CRUD_CALLERS` | (none) | Bearer tokens, `token=username[:staff]`, comma-separated |
//!
//! # Example
//!
//! ```rust
//! use resource_service::config::ServerConfig;
//!
//! let config = ServerConfig {
//!     port: 3000,
//!     callers: "s3cret=alice,r00t=admin:staff".to_string(),
//!     ..Default::default()
//! };
//! assert_eq!(config.socket_addr(), "127.0.0.1:3000");
//! assert_eq!(config.callers().unwrap().len(), 2);
//! ```

use clap::Parser;
use resource_framework::Caller;

/// Problems found in a [`ServerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Port cannot be 0")]
    InvalidPort,
    #[error("Channel capacity cannot be 0")]
    InvalidCapacity,
    #[error("Invalid caller entry \"{0}\", expected token=username[:staff]")]
    InvalidCaller(String),
    #[error("Token configured twice: \"{0}\"")]
    DuplicateToken(String),
}

#[derive(Debug, Clone, Parser)]
#[command(name = "resource-service")]
#[command(about = "CRUD service for products, departments, employees and polls")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(short, long, env = "CRUD_SERVER_PORT", default_value = "8000")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, env = "CRUD_SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "CRUD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Capacity of each store's request channel.
    #[arg(long, env = "CRUD_CHANNEL_CAPACITY", default_value = "32")]
    pub channel_capacity: usize,

    /// Bearer tokens, as comma-separated `token=username` or `token=username:staff`.
    #[arg(long, env = "CRUD_CALLERS", default_value = "")]
    pub callers: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            channel_capacity: 32,
            callers: String::new(),
        }
    }
}

impl ServerConfig {
    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parses the configured bearer tokens.
    pub fn callers(&self) -> Result<Vec<(String, Caller)>, ConfigError> {
        let mut parsed: Vec<(String, Caller)> = Vec::new();
        for entry in self.callers.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let invalid = || ConfigError::InvalidCaller(entry.to_string());
            let (token, principal) = entry.split_once('=').ok_or_else(invalid)?;
            let (name, elevated) = match principal.split_once(':') {
                Some((name, "staff")) => (name, true),
                Some(_) => return Err(invalid()),
                None => (principal, false),
            };
            if token.is_empty() || name.is_empty() {
                return Err(invalid());
            }
            if parsed.iter().any(|(t, _)| t == token) {
                return Err(ConfigError::DuplicateToken(token.to_string()));
            }
            let caller = if elevated {
                Caller::elevated(name)
            } else {
                Caller::ordinary(name)
            };
            parsed.push((token.to_string(), caller));
        }
        Ok(parsed)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        self.callers().map(|_| ())
    }

    /// Creates a configuration suitable for testing: ephemeral port, debug
    /// logging, ordinary callers `alice` and `bob` plus the staff caller `admin`
    /// (tokens `alice-token`, `bob-token`, `admin-token`).
    pub fn for_testing() -> Self {
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            log_level: "debug".to_string(),
            channel_capacity: 8,
            callers: "alice-token=alice,bob-token=bob,admin-token=admin:staff".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.socket_addr(), "127.0.0.1:8000");
        assert!(config.validate().is_ok());
        assert!(config.callers().unwrap().is_empty());
    }

    #[test]
    fn test_parse_callers() {
        let config = ServerConfig {
            callers: " t1=alice , t2=root:staff ".to_string(),
            ..Default::default()
        };
        let callers = config.callers().unwrap();
        assert_eq!(callers[0], ("t1".to_string(), Caller::ordinary("alice")));
        assert_eq!(callers[1], ("t2".to_string(), Caller::elevated("root")));
    }

    #[test]
    fn test_invalid_callers() {
        for callers in ["alice", "t1=", "t1=alice:admin", "=alice"] {
            let config = ServerConfig {
                callers: callers.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidCaller(_))),
                "{callers} should be rejected"
            );
        }

        let config = ServerConfig {
            callers: "t1=alice,t1=bob".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateToken("t1".to_string()))
        );
    }

    #[test]
    fn test_validate_invalid_values() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidPort));

        let config = ServerConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidCapacity));
    }

    #[test]
    fn test_for_testing() {
        let config = ServerConfig::for_testing();
        assert_eq!(config.port, 0);
        assert_eq!(config.callers().unwrap().len(), 3);
    }
}
