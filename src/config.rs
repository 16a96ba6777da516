//! Environment configuration

use crate::state::{SeededShuffler, Session, Shuffler, ThreadShuffler};
use std::net::SocketAddr;

/// Listen address used when ZAVALINKA_BIND is unset or invalid
pub const DEFAULT_BIND: &str = "0.0.0.0:6573";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address the HTTP/WebSocket server listens on
    pub bind: SocketAddr,
    /// Fixed seed for answer shuffling (None = thread RNG)
    pub shuffle_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            shuffle_seed: None,
        }
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 6573))
}

impl Config {
    /// Load config from environment variables
    /// ZAVALINKA_BIND and ZAVALINKA_SHUFFLE_SEED are both optional
    pub fn from_env() -> Self {
        let bind = match std::env::var("ZAVALINKA_BIND") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
                tracing::warn!(
                    "Invalid ZAVALINKA_BIND {:?} ({}), using {}",
                    raw,
                    e,
                    DEFAULT_BIND
                );
                default_bind()
            }),
            Err(_) => default_bind(),
        };

        let shuffle_seed = std::env::var("ZAVALINKA_SHUFFLE_SEED")
            .ok()
            .and_then(|v| match v.trim().parse::<u64>() {
                Ok(seed) => Some(seed),
                Err(_) => {
                    tracing::warn!("Ignoring non-numeric ZAVALINKA_SHUFFLE_SEED {:?}", v);
                    None
                }
            });

        tracing::info!(%bind, seeded = shuffle_seed.is_some(), "Config loaded");
        Self { bind, shuffle_seed }
    }

    /// Fresh session using the configured shuffling
    pub fn build_session(&self) -> Session {
        let shuffler: Box<dyn Shuffler + Send> = match self.shuffle_seed {
            Some(seed) => Box::new(SeededShuffler::new(seed)),
            None => Box::new(ThreadShuffler),
        };
        Session::with_shuffler(shuffler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var("ZAVALINKA_BIND");
        std::env::remove_var("ZAVALINKA_SHUFFLE_SEED");
    }

    #[test]
    #[serial]
    fn test_defaults_without_env() {
        clear_env();
        assert_eq!(Config::from_env(), Config::default());
        assert_eq!(Config::default().bind.to_string(), DEFAULT_BIND);
    }

    #[test]
    #[serial]
    fn test_reads_env() {
        clear_env();
        std::env::set_var("ZAVALINKA_BIND", "127.0.0.1:9000");
        std::env::set_var("ZAVALINKA_SHUFFLE_SEED", " 42 ");

        let config = Config::from_env();
        assert_eq!(config.bind, SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(config.shuffle_seed, Some(42));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_values_fall_back() {
        clear_env();
        std::env::set_var("ZAVALINKA_BIND", "not-an-address");
        std::env::set_var("ZAVALINKA_SHUFFLE_SEED", "lucky");

        assert_eq!(Config::from_env(), Config::default());
        clear_env();
    }
}
