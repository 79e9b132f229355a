//! # Game Server Library
//!
//! This library provides the authoritative server for a small collect-the-coins
//! multiplayer game. It owns the canonical world, accepts movement commands,
//! resolves pickups and rebroadcasts the whole world to every client.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative World
//! The server holds the only writable copy of the players and collectibles.
//! Clients receive read-only snapshots and never move themselves locally.
//!
//! ### Session Lifecycle
//! Each connection goes `Connecting -> Active -> Closed`:
//! - Joining spawns a player at `(100, 100)` and sends the newcomer the full world
//! - Movement commands are validated and applied for the sender's own player
//! - Leaving (or going silent past the timeout) despawns the player and
//!   broadcasts the world to everyone left
//!
//! ### State Broadcasting
//! Every accepted move produces a full snapshot sent to all sessions, even
//! when nothing was collected.
//!
//! ## Architecture Design
//!
//! ### Single Writer
//! One task owns the world and the session table and handles events one at a
//! time. Network receive and send run as separate tasks connected through
//! unbounded channels, so no lock guards the world and outgoing packets keep
//! the order in which events were processed.
//!
//! ### UDP-Based Communication
//! Packets are bincode-encoded [`shared::Packet`] datagrams. The gateway maps
//! peer addresses to opaque session ids.
//!
//! ## Module Organization
//!
//! - `world`: players and collectibles, snapshot construction
//! - `engine`: move application, pickup resolution, snapshot fan-out
//! - `session`: per-connection state machine and command validation
//! - `network`: UDP gateway and the main event loop
//! - `config`, `error`, `utils`: settings, error taxonomy, id generation
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let mut server = Server::new(ServerConfig::default()).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod network;
pub mod session;
pub mod utils;
pub mod world;
