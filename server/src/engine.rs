//! Movement application, collectible pickup and snapshot fan-out
//!
//! Every accepted move is followed by a full-state broadcast, whether or not
//! it picked anything up. Outgoing packets are queued on the network sender
//! channel in the order they are produced, so all clients observe broadcasts
//! in the order the server processed the triggering events.

use crate::network::GameMessage;
use crate::world::WorldState;
use log::{debug, error, info};
use shared::{Collectible, Direction, Packet, Player, PLAYER_SPEED};
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Result of a move that was applied to the world
#[derive(Debug, Clone, PartialEq)]
pub struct MoveReport {
    /// The mover after the step and any pickups
    pub player: Player,
    /// Collectibles removed by this move
    pub collected: Vec<Collectible>,
}

/// Moves one player and resolves pickups at the new position only
///
/// Returns `None` when the player no longer exists, e.g. a command that
/// arrived after its session was torn down. Collision is not swept along the
/// path, so a speed larger than the lattice spacing can step over items.
/// Scores saturate at `u32::MAX`.
pub fn resolve_move(
    world: &mut WorldState,
    player_id: &str,
    direction: Direction,
    speed: i32,
) -> Option<MoveReport> {
    let player = world.get_player_mut(player_id)?;
    player.step(direction, speed);
    let moved = player.clone();

    let mut collected = Vec::new();
    for item_id in world.collectibles_at(&moved) {
        if let Some(item) = world.remove_collectible(&item_id) {
            collected.push(item);
        }
    }

    let player = world.get_player_mut(player_id)?;
    for item in &collected {
        player.score = player.score.saturating_add(item.value);
    }

    Some(MoveReport {
        player: player.clone(),
        collected,
    })
}

/// Applies moves to the world and pushes snapshots to the network sender
///
/// The engine never touches the socket. Everything it produces goes through
/// the sender channel, which preserves the order events were processed in.
pub struct UpdateEngine {
    game_tx: mpsc::UnboundedSender<GameMessage>,
    speed: i32,
}

impl UpdateEngine {
    /// Creates an engine that queues outgoing packets on `game_tx`
    ///
    /// Moves use the fixed [`PLAYER_SPEED`].
    pub fn new(game_tx: mpsc::UnboundedSender<GameMessage>) -> Self {
        Self {
            game_tx,
            speed: PLAYER_SPEED,
        }
    }

    /// Applies a validated move and broadcasts the resulting world to `recipients`
    ///
    /// Nothing is broadcast when the player is gone.
    pub fn apply_move(
        &self,
        world: &mut WorldState,
        player_id: &str,
        direction: Direction,
        recipients: Vec<SocketAddr>,
    ) -> Option<MoveReport> {
        let report = resolve_move(world, player_id, direction, self.speed)?;

        debug!(
            "Player {} moved {} to ({}, {})",
            player_id, direction, report.player.x, report.player.y
        );
        for item in &report.collected {
            info!(
                "Player {} collected {} (score {})",
                player_id, item.id, report.player.score
            );
        }

        self.broadcast_world(world, recipients);
        Some(report)
    }

    /// Sends the full world to every recipient
    ///
    /// An empty recipient list queues nothing. The snapshot is taken now, so
    /// later changes to the world do not leak into this broadcast.
    pub fn broadcast_world(&self, world: &WorldState, recipients: Vec<SocketAddr>) {
        if recipients.is_empty() {
            return;
        }
        let packet = Packet::UpdateGameState(world.snapshot());
        self.queue(GameMessage::BroadcastPacket { packet, recipients });
    }

    /// Sends the full world to a single client
    ///
    /// Used when a session is opened. Other clients are not notified.
    pub fn send_world(&self, world: &WorldState, addr: SocketAddr) {
        self.send_packet(Packet::UpdateGameState(world.snapshot()), addr);
    }

    /// Queues any packet for one client
    pub fn send_packet(&self, packet: Packet, addr: SocketAddr) {
        self.queue(GameMessage::SendPacket { packet, addr });
    }

    fn queue(&self, message: GameMessage) {
        if let Err(e) = self.game_tx.send(message) {
            error!("Failed to queue outgoing packet: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{}", port).parse().unwrap()
    }

    fn world_with_coin_above_spawn() -> WorldState {
        let mut world = WorldState::with_collectibles(vec![
            Collectible::new("coin-00", 100, 95),
            Collectible::new("coin-01", 300, 300),
        ]);
        world.add_player("A");
        world
    }

    #[test]
    fn test_move_without_pickup() {
        let mut world = world_with_coin_above_spawn();
        let report = resolve_move(&mut world, "A", Direction::Right, PLAYER_SPEED).unwrap();

        assert_eq!((report.player.x, report.player.y), (105, 100));
        assert!(report.collected.is_empty());
        assert_eq!(world.list_collectibles().len(), 2);
    }

    #[test]
    fn test_move_onto_collectible() {
        let mut world = world_with_coin_above_spawn();
        let report = resolve_move(&mut world, "A", Direction::Up, PLAYER_SPEED).unwrap();

        assert_eq!((report.player.x, report.player.y), (100, 95));
        assert_eq!(report.player.score, 1);
        assert_eq!(report.collected.len(), 1);
        assert_eq!(report.collected[0].id, "coin-00");
        assert!(world.list_collectibles().iter().all(|c| c.id != "coin-00"));
        assert_eq!(world.get_player("A").map(|p| p.score), Some(1));
    }

    #[test]
    fn test_pickup_uses_collectible_value() {
        let mut world = WorldState::with_collectibles(vec![
            Collectible::new("gem", 100, 105).with_value(5),
        ]);
        world.add_player("A");

        let report = resolve_move(&mut world, "A", Direction::Down, PLAYER_SPEED).unwrap();
        assert_eq!(report.player.score, 5);
    }

    #[test]
    fn test_score_saturates() {
        let mut world = WorldState::with_collectibles(vec![
            Collectible::new("gem", 100, 105).with_value(5),
        ]);
        world.add_player("A");
        world.get_player_mut("A").unwrap().score = u32::MAX - 2;

        let report = resolve_move(&mut world, "A", Direction::Down, PLAYER_SPEED).unwrap();
        assert_eq!(report.player.score, u32::MAX);
        assert!(world.list_collectibles().is_empty());
    }

    #[test]
    fn test_large_step_skips_collectible() {
        let mut world = world_with_coin_above_spawn();
        let report = resolve_move(&mut world, "A", Direction::Up, 10).unwrap();

        assert_eq!(report.player.y, 90);
        assert!(report.collected.is_empty());
        assert_eq!(world.list_collectibles().len(), 2);
    }

    #[test]
    fn test_move_for_missing_player_is_noop() {
        let mut world = world_with_coin_above_spawn();
        assert!(resolve_move(&mut world, "ghost", Direction::Up, PLAYER_SPEED).is_none());
        assert_eq!(world.list_collectibles().len(), 2);
    }

    #[test]
    fn test_apply_move_broadcasts_snapshot() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = UpdateEngine::new(tx);
        let mut world = world_with_coin_above_spawn();

        let report = engine.apply_move(&mut world, "A", Direction::Up, vec![addr(1), addr(2)]);
        assert!(report.is_some());

        match rx.try_recv().unwrap() {
            GameMessage::BroadcastPacket {
                packet: Packet::UpdateGameState(snapshot),
                recipients,
            } => {
                assert_eq!(recipients, vec![addr(1), addr(2)]);
                assert_eq!(snapshot.collectibles.len(), 1);
                assert_eq!(snapshot.player("A").map(|p| p.score), Some(1));
            }
            other => panic!("Unexpected message: {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_move_without_pickup_still_broadcasts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = UpdateEngine::new(tx);
        let mut world = world_with_coin_above_spawn();

        engine.apply_move(&mut world, "A", Direction::Left, vec![addr(1)]);
        assert!(matches!(
            rx.try_recv(),
            Ok(GameMessage::BroadcastPacket { .. })
        ));
    }

    #[test]
    fn test_stale_move_broadcasts_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = UpdateEngine::new(tx);
        let mut world = world_with_coin_above_spawn();

        assert!(engine
            .apply_move(&mut world, "ghost", Direction::Up, vec![addr(1)])
            .is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_world_targets_one_client() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = UpdateEngine::new(tx);
        let world = world_with_coin_above_spawn();

        engine.send_world(&world, addr(9));
        match rx.try_recv().unwrap() {
            GameMessage::SendPacket {
                packet: Packet::UpdateGameState(snapshot),
                addr: to,
            } => {
                assert_eq!(to, addr(9));
                assert_eq!(snapshot.players.len(), 1);
                assert_eq!(snapshot.collectibles.len(), 2);
            }
            other => panic!("Unexpected message: {:?}", other),
        }
    }
}
