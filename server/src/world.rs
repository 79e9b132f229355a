//! Authoritative world model: every connected player and every collectible
//! still on the board.
//!
//! The world is owned by the server loop and handed to the session manager
//! and the update engine by reference. Clients only ever see [`Snapshot`]s.

use log::info;
use rand::Rng;
use shared::{
    Collectible, Player, Snapshot, PLAYER_SPEED, SPAWN_X, SPAWN_Y, WORLD_HEIGHT, WORLD_WIDTH,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct WorldState {
    // BTreeMap keeps snapshot order stable between broadcasts.
    players: BTreeMap<String, Player>,
    collectibles: BTreeMap<String, Collectible>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_collectibles(collectibles: impl IntoIterator<Item = Collectible>) -> Self {
        let mut world = Self::new();
        for item in collectibles {
            world.add_collectible(item);
        }
        world
    }

    /// Seeds `count` collectibles on the movement lattice around the spawn point
    ///
    /// Positions are multiples of the player speed away from the spawn, so a
    /// player can land exactly on each of them. Duplicate draws are skipped,
    /// which means fewer than `count` items may be placed on a tiny board.
    pub fn populate<R: Rng>(&mut self, count: usize, rng: &mut R) {
        let x_steps = lattice_range(SPAWN_X, WORLD_WIDTH);
        let y_steps = lattice_range(SPAWN_Y, WORLD_HEIGHT);

        for index in 0..count {
            let x = SPAWN_X + rng.gen_range(x_steps.0..=x_steps.1) * PLAYER_SPEED;
            let y = SPAWN_Y + rng.gen_range(y_steps.0..=y_steps.1) * PLAYER_SPEED;

            let occupied = self.collectibles.values().any(|c| c.x == x && c.y == y);
            if occupied || (x == SPAWN_X && y == SPAWN_Y) {
                continue;
            }

            self.add_collectible(Collectible::new(format!("coin-{:02}", index), x, y));
        }

        info!("World populated with {} collectibles", self.collectibles.len());
    }

    /// Spawns a fresh player at the fixed origin with score 0
    ///
    /// Re-adding an existing id resets that player.
    pub fn add_player(&mut self, id: &str) -> &Player {
        let player = Player::new(id, SPAWN_X, SPAWN_Y);
        info!("Added player {} at ({}, {})", id, player.x, player.y);
        self.players.insert(id.to_string(), player);
        &self.players[id]
    }

    pub fn remove_player(&mut self, id: &str) -> Option<Player> {
        let removed = self.players.remove(id);
        if removed.is_some() {
            info!("Removed player {}", id);
        }
        removed
    }

    pub fn get_player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn list_players(&self) -> Vec<Player> {
        self.players.values().cloned().collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn add_collectible(&mut self, item: Collectible) {
        self.collectibles.insert(item.id.clone(), item);
    }

    pub fn list_collectibles(&self) -> Vec<Collectible> {
        self.collectibles.values().cloned().collect()
    }

    pub fn remove_collectible(&mut self, id: &str) -> Option<Collectible> {
        self.collectibles.remove(id)
    }

    /// Ids of collectibles sitting exactly on the given point
    pub fn collectibles_at(&self, player: &Player) -> Vec<String> {
        self.collectibles
            .values()
            .filter(|item| player.collides_with(item))
            .map(|item| item.id.clone())
            .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            players: self.list_players(),
            collectibles: self.list_collectibles(),
        }
    }
}

/// Inclusive range of lattice steps from `origin` that stay inside `[0, limit)`
fn lattice_range(origin: i32, limit: i32) -> (i32, i32) {
    let min = -(origin / PLAYER_SPEED);
    let max = (limit - 1 - origin) / PLAYER_SPEED;
    (min, max)
}
