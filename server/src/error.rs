//! Error taxonomy for configuration, transport, session handling and command intake
//!
//! Only configuration errors are fatal, and only at startup. Session errors
//! are answered with a `Disconnected` packet. Command and transport errors are
//! logged and the packet dropped.

use thiserror::Error;

/// Reasons a connection cannot become an active session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Server full")]
    ServerFull,

    #[error("Session {0} already exists")]
    DuplicateSession(String),

    #[error("Protocol version mismatch (client {client}, server {server})")]
    VersionMismatch { client: u32, server: u32 },
}

/// Reasons a movement command was not applied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown direction {0:?}")]
    UnknownDirection(String),

    #[error("No active session {0}")]
    StaleSession(String),
}

/// Settings that would let a snapshot outgrow the receive buffers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_clients must be between 1 and {limit}, got {requested}")]
    MaxClients { requested: usize, limit: usize },

    #[error("collectibles must be at most {limit}, got {requested}")]
    Collectibles { requested: usize, limit: usize },
}

/// Outgoing packets the network sender refuses to put on the wire
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Packet of {size} bytes exceeds the {limit}-byte limit")]
    Oversized { size: usize, limit: usize },
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
