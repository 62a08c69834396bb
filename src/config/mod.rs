//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origin for CORS
    pub client_origin: String,
    /// Players required before an arena starts running
    pub arena_min_players: usize,
    /// Slot cap per arena
    pub arena_max_players: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let arena_min_players = parse_count(env::var("ARENA_MIN_PLAYERS").ok(), 1)?;
        let arena_max_players = parse_count(env::var("ARENA_MAX_PLAYERS").ok(), 16)?;
        if arena_min_players > arena_max_players {
            return Err(ConfigError::InvalidArenaSize);
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            arena_min_players,
            arena_max_players,
        })
    }
}

fn parse_count(raw: Option<String>, default: usize) -> Result<usize, ConfigError> {
    match raw {
        None => Ok(default),
        Some(s) => {
            let n: usize = s.parse().map_err(|_| ConfigError::InvalidArenaSize)?;
            if n == 0 {
                return Err(ConfigError::InvalidArenaSize);
            }
            Ok(n)
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid arena player bounds")]
    InvalidArenaSize,
}
