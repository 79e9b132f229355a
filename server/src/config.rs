use crate::error::ConfigError;
use shared::{MAX_CLIENTS, MAX_COLLECTIBLES};
use std::time::Duration;

/// Runtime settings for the server, filled from command line arguments
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_clients: usize,
    /// Number of collectibles placed at startup
    pub collectibles: usize,
    /// Fixed seed for collectible placement
    pub seed: Option<u64>,
    /// Silence after which a client counts as disconnected
    pub client_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_clients: 32,
            collectibles: 10,
            seed: None,
            client_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Checks the capacity settings against the packet size limit
    ///
    /// A full snapshot carries every player and every collectible, so both
    /// counts are capped to keep it inside one receive buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 || self.max_clients > MAX_CLIENTS {
            return Err(ConfigError::MaxClients {
                requested: self.max_clients,
                limit: MAX_CLIENTS,
            });
        }
        if self.collectibles > MAX_COLLECTIBLES {
            return Err(ConfigError::Collectibles {
                requested: self.collectibles,
                limit: MAX_COLLECTIBLES,
            });
        }
        Ok(())
    }
}
