//! Client-side view of the world, replaced wholesale by every snapshot

use log::debug;
use shared::{Player, Snapshot};

#[derive(Debug, Default)]
pub struct ClientGameState {
    pub player_id: Option<String>,
    pub snapshot: Snapshot,
    pub snapshots_received: u64,
}

impl ClientGameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_player_id(&mut self, player_id: String) {
        self.player_id = Some(player_id);
    }

    /// The server is authoritative; the previous view is discarded
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots_received += 1;
        debug!(
            "Snapshot {}: {} players, {} collectibles",
            self.snapshots_received,
            snapshot.players.len(),
            snapshot.collectibles.len()
        );
        self.snapshot = snapshot;
    }

    pub fn local_player(&self) -> Option<&Player> {
        let id = self.player_id.as_deref()?;
        self.snapshot.player(id)
    }

    /// `Rank: R/N` for the local player, once it appears in a snapshot
    pub fn rank_text(&self) -> Option<String> {
        self.local_player()
            .map(|player| player.rank(&self.snapshot.players))
    }

    pub fn status_line(&self) -> String {
        match self.local_player() {
            Some(player) => format!(
                "({}, {}) score {} | {} | {} coins left",
                player.x,
                player.y,
                player.score,
                player.rank(&self.snapshot.players),
                self.snapshot.collectibles.len()
            ),
            None => "waiting for server...".to_string(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
