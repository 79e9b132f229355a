//! # Game Client Library
//!
//! A headless terminal client for the collect-the-coins server. It joins,
//! forwards direction words typed on stdin as movement commands, and logs
//! the local player's position, score and rank after every snapshot.
//!
//! The client keeps no simulation of its own: each `UpdateGameState`
//! snapshot replaces the local view entirely.
//!
//! ## Module Organization
//!
//! - `game`: latest snapshot, local player lookup and rank text
//! - `input`: parsing of typed lines into commands
//! - `network`: UDP socket, heartbeats and the main client loop

pub mod game;
pub mod input;
pub mod network;
