use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const PROTOCOL_VERSION: u32 = 1;
pub const PLAYER_SPEED: i32 = 5;
pub const SPAWN_X: i32 = 100;
pub const SPAWN_Y: i32 = 100;
pub const COLLECTIBLE_VALUE: u32 = 1;
pub const WORLD_WIDTH: i32 = 640;
pub const WORLD_HEIGHT: i32 = 480;

/// Length of the opaque player ids the server hands out.
pub const PLAYER_ID_LEN: usize = 20;

/// Receive buffer size on both ends. Every packet the server sends must fit.
pub const MAX_PACKET_SIZE: usize = 8192;

/// Upper bound on concurrent players and on seeded collectibles.
///
/// Together they keep a full snapshot under [`MAX_PACKET_SIZE`]: a player
/// costs 40 bytes of bincode and a seeded collectible 23.
pub const MAX_CLIENTS: usize = 128;
pub const MAX_COLLECTIBLES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
    },
    MovePlayer {
        direction: String,
    },
    Heartbeat,
    Disconnect,

    Connected {
        player_id: String,
    },
    UpdateGameState(Snapshot),
    Disconnected {
        reason: String,
    },
}

/// Full world view sent to clients after every accepted change.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub collectibles: Vec<Collectible>,
}

impl Snapshot {
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown direction {0:?}")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    // Case-sensitive, like the direction strings clients emit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(ParseDirectionError(other.to_string())),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub score: u32,
}

impl Player {
    pub fn new(id: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            score: 0,
        }
    }

    /// Moves the player by `speed` pixels. Unknown direction strings leave it in place.
    pub fn move_player(&mut self, direction: &str, speed: i32) {
        if let Ok(direction) = direction.parse::<Direction>() {
            self.step(direction, speed);
        }
    }

    /// Moves exactly one axis by `speed`.
    ///
    /// Positions are not clamped to the canvas. Coordinates wrap at the `i32`
    /// limits instead of overflowing.
    pub fn step(&mut self, direction: Direction, speed: i32) {
        match direction {
            Direction::Up => self.y = self.y.wrapping_sub(speed),
            Direction::Down => self.y = self.y.wrapping_add(speed),
            Direction::Left => self.x = self.x.wrapping_sub(speed),
            Direction::Right => self.x = self.x.wrapping_add(speed),
        }
    }

    /// Exact point equality; render sizes play no part.
    pub fn collides_with(&self, item: &Collectible) -> bool {
        self.x == item.x && self.y == item.y
    }

    /// 1-based rank by descending score, `None` if this player is not in the list.
    ///
    /// The sort is stable, so equal scores keep the order they have in `players`.
    pub fn rank_position(&self, players: &[Player]) -> Option<usize> {
        let mut sorted: Vec<&Player> = players.iter().collect();
        sorted.sort_by(|a, b| b.score.cmp(&a.score));
        sorted
            .iter()
            .position(|p| p.id == self.id)
            .map(|index| index + 1)
    }

    /// Formats the rank as `Rank: R/N`. A player missing from the list reports rank 0.
    pub fn rank(&self, players: &[Player]) -> String {
        let rank = self.rank_position(players).unwrap_or(0);
        format!("Rank: {}/{}", rank, players.len())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Collectible {
    pub id: String,
    pub x: i32,
    pub y: i32,
    /// Score granted on pickup. Not part of the wire format.
    #[serde(skip, default = "default_collectible_value")]
    pub value: u32,
}

fn default_collectible_value() -> u32 {
    COLLECTIBLE_VALUE
}

impl Collectible {
    pub fn new(id: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            value: COLLECTIBLE_VALUE,
        }
    }

    pub fn with_value(mut self, value: u32) -> Self {
        self.value = value;
        self
    }
}
