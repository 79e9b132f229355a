//! Per-connection session lifecycle for the multiplayer server
//!
//! This module tracks every connection from join to leave:
//! - Join spawns the player and sends the newcomer the whole world
//! - Movement commands are validated and handed to the update engine
//! - Leave despawns the player and tells everyone else
//!
//! The set of sessions and the set of players in the world are kept equal:
//! every path that adds or removes one adds or removes the other.

use crate::engine::{MoveReport, UpdateEngine};
use crate::error::{CommandError, SessionError};
use crate::world::WorldState;
use log::{debug, info};
use shared::{Direction, Packet, PROTOCOL_VERSION};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Lifecycle of a session
///
/// A session moves forward only: `Connecting` while its player is being
/// spawned, `Active` once the join snapshot is queued, `Closed` on leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Active,
    /// Terminal. No commands are accepted.
    Closed,
}

/// Server-side state bound to one client connection
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque connection id, also the id of the session's player
    pub id: String,
    /// Network address for sending responses
    pub addr: SocketAddr,
    pub state: SessionState,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Number of moves applied on behalf of this session
    pub moves_applied: u64,
}

impl Session {
    /// Creates a session in the `Connecting` state
    ///
    /// The session counts as recently seen and has applied no moves yet.
    /// It only accepts commands after [`SessionManager::connect`] activates it.
    pub fn new(id: String, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            state: SessionState::Connecting,
            last_seen: Instant::now(),
            moves_applied: 0,
        }
    }

    /// Whether the session currently accepts movement commands
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Records that the client was just heard from
    ///
    /// Any packet from the client counts, including heartbeats and
    /// commands that end up being dropped.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Checks if the client has been silent for longer than `timeout`
    ///
    /// UDP has no close event, so a silent client is treated as gone.
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Rejects clients speaking a different protocol version
///
/// Versions must match exactly. There is no backwards compatibility.
pub fn validate_version(client_version: u32) -> Result<(), SessionError> {
    if client_version == PROTOCOL_VERSION {
        Ok(())
    } else {
        Err(SessionError::VersionMismatch {
            client: client_version,
            server: PROTOCOL_VERSION,
        })
    }
}

/// Owns all live sessions and drives their transitions
///
/// The world and the engine are passed in on every call so that the caller
/// stays the single owner of the world.
pub struct SessionManager {
    sessions: HashMap<String, Session>,
    max_sessions: usize,
}

impl SessionManager {
    /// Creates an empty manager that admits at most `max_sessions` clients
    ///
    /// Joins beyond the limit are refused with [`SessionError::ServerFull`].
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            max_sessions,
        }
    }

    /// Opens a session, spawns its player and sends it the current world
    ///
    /// The client first receives `Connected` with its id, then a snapshot
    /// containing every player and collectible. Other clients are not
    /// notified until the next broadcast.
    pub fn connect(
        &mut self,
        id: String,
        addr: SocketAddr,
        world: &mut WorldState,
        engine: &UpdateEngine,
    ) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&id) {
            return Err(SessionError::DuplicateSession(id));
        }
        if self.sessions.len() >= self.max_sessions {
            return Err(SessionError::ServerFull);
        }

        let mut session = Session::new(id.clone(), addr);
        world.add_player(&id);
        engine.send_packet(
            Packet::Connected {
                player_id: id.clone(),
            },
            addr,
        );
        engine.send_world(world, addr);
        session.state = SessionState::Active;

        info!("Session {} connected from {}", id, addr);
        Ok(self.sessions.entry(id).or_insert(session))
    }

    /// Validates a movement command and applies it for the session's player
    ///
    /// Unknown directions and commands for sessions that are gone are
    /// returned as errors for the caller to drop. Neither reaches the client.
    pub fn handle_command(
        &mut self,
        id: &str,
        direction: &str,
        world: &mut WorldState,
        engine: &UpdateEngine,
    ) -> Result<MoveReport, CommandError> {
        let session = self
            .sessions
            .get_mut(id)
            .filter(|s| s.is_active())
            .ok_or_else(|| CommandError::StaleSession(id.to_string()))?;
        session.touch();

        let direction = direction
            .parse::<Direction>()
            .map_err(|e| CommandError::UnknownDirection(e.0))?;
        session.moves_applied += 1;

        let recipients = self.active_addrs();
        engine
            .apply_move(world, id, direction, recipients)
            .ok_or_else(|| CommandError::StaleSession(id.to_string()))
    }

    /// Closes a session, despawns its player and broadcasts the world
    ///
    /// Returns the closed session, or `None` if it was already gone.
    pub fn disconnect(
        &mut self,
        id: &str,
        world: &mut WorldState,
        engine: &UpdateEngine,
    ) -> Option<Session> {
        let mut session = self.sessions.remove(id)?;
        session.state = SessionState::Closed;
        world.remove_player(id);

        info!("Session {} disconnected", id);
        engine.broadcast_world(world, self.active_addrs());
        Some(session)
    }

    /// Refreshes liveness for a session, returns false for unknown ids
    pub fn touch(&mut self, id: &str) -> bool {
        match self.sessions.get_mut(id) {
            Some(session) => {
                session.touch();
                true
            }
            None => false,
        }
    }

    /// Looks up a session by id, whatever its state
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id)
    }

    /// Checks whether an id is taken
    ///
    /// Used while generating ids so a fresh one never collides with a
    /// live session.
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Finds a session id by the client's network address
    ///
    /// Packets carry no session id, so this is how every inbound packet is
    /// matched to its session.
    pub fn find_session_by_addr(&self, addr: SocketAddr) -> Option<String> {
        self.sessions
            .values()
            .find(|session| session.addr == addr)
            .map(|session| session.id.clone())
    }

    /// Ids of sessions silent for longer than `timeout`
    ///
    /// Callers close them through [`SessionManager::disconnect`] so the
    /// world and the other clients are updated too.
    pub fn timed_out(&self, timeout: Duration) -> Vec<String> {
        let timed_out: Vec<String> = self
            .sessions
            .values()
            .filter(|session| session.is_timed_out(timeout))
            .map(|session| session.id.clone())
            .collect();

        if !timed_out.is_empty() {
            debug!("{} session(s) timed out", timed_out.len());
        }
        timed_out
    }

    /// Addresses of every active session, used as broadcast recipients
    pub fn active_addrs(&self) -> Vec<SocketAddr> {
        self.sessions
            .values()
            .filter(|session| session.is_active())
            .map(|session| session.addr)
            .collect()
    }

    /// Number of sessions, which always equals the number of players
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true when no client is connected
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
