//! Integration tests for the multiplayer server
//!
//! These run a real server on an ephemeral UDP port and talk to it the way
//! clients do.

use bincode::{deserialize, serialize};
use server::config::ServerConfig;
use server::network::{Server, ServerMessage};
use server::world::WorldState;
use shared::{Collectible, Packet, Snapshot, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_test::assert_ok;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct TestServer {
    addr: SocketAddr,
    shutdown: UnboundedSender<ServerMessage>,
    handle: JoinHandle<Result<(), String>>,
}

async fn start_server(world: WorldState) -> TestServer {
    let config = ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        ..ServerConfig::default()
    };
    let mut server = Server::with_world(config, world).await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();

    let handle = tokio::spawn(async move { server.run().await.map_err(|e| e.to_string()) });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

fn coin_above_spawn() -> WorldState {
    WorldState::with_collectibles(vec![
        Collectible::new("coin-00", 100, 95),
        Collectible::new("coin-01", 300, 300),
    ])
}

struct TestClient {
    socket: UdpSocket,
    server: SocketAddr,
}

impl TestClient {
    async fn new(server: SocketAddr) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        Self { socket, server }
    }

    async fn send(&self, packet: &Packet) {
        let data = serialize(packet).unwrap();
        self.socket.send_to(&data, self.server).await.unwrap();
    }

    async fn recv(&self) -> Packet {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let (len, _) = timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buf))
            .await
            .expect("timed out waiting for server")
            .unwrap();
        deserialize(&buf[..len]).unwrap()
    }

    async fn recv_snapshot(&self) -> Snapshot {
        match self.recv().await {
            Packet::UpdateGameState(snapshot) => snapshot,
            other => panic!("Expected snapshot, got {:?}", other),
        }
    }

    async fn assert_silent(&self) {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        let result = timeout(Duration::from_millis(150), self.socket.recv_from(&mut buf)).await;
        assert!(result.is_err(), "unexpected packet from server");
    }

    /// Joins and returns the assigned id together with the join snapshot
    async fn join(&self) -> (String, Snapshot) {
        self.send(&Packet::Connect {
            client_version: PROTOCOL_VERSION,
        })
        .await;

        let id = match self.recv().await {
            Packet::Connected { player_id } => player_id,
            other => panic!("Expected Connected, got {:?}", other),
        };
        (id, self.recv_snapshot().await)
    }

    async fn move_player(&self, direction: &str) {
        self.send(&Packet::MovePlayer {
            direction: direction.to_string(),
        })
        .await;
    }
}

/// SESSION LIFECYCLE TESTS
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn join_receives_full_world() {
        let server = start_server(coin_above_spawn()).await;
        let client = TestClient::new(server.addr).await;

        let (id, snapshot) = client.join().await;

        assert_eq!(snapshot.players.len(), 1);
        let player = snapshot.player(&id).unwrap();
        assert_eq!((player.x, player.y, player.score), (100, 100, 0));
        assert_eq!(snapshot.collectibles.len(), 2);
    }

    #[tokio::test]
    async fn join_is_not_broadcast_to_others() {
        let server = start_server(WorldState::new()).await;
        let a = TestClient::new(server.addr).await;
        let b = TestClient::new(server.addr).await;

        a.join().await;
        let (_, snapshot) = b.join().await;

        assert_eq!(snapshot.players.len(), 2);
        a.assert_silent().await;
    }

    #[tokio::test]
    async fn disconnect_broadcasts_without_departed_player() {
        let server = start_server(WorldState::new()).await;
        let a = TestClient::new(server.addr).await;
        let b = TestClient::new(server.addr).await;

        let (a_id, _) = a.join().await;
        let (b_id, _) = b.join().await;

        a.send(&Packet::Disconnect).await;
        let snapshot = b.recv_snapshot().await;

        assert!(snapshot.player(&a_id).is_none());
        assert!(snapshot.player(&b_id).is_some());
    }

    #[tokio::test]
    async fn version_mismatch_is_rejected() {
        let server = start_server(WorldState::new()).await;
        let client = TestClient::new(server.addr).await;

        client.send(&Packet::Connect { client_version: 0 }).await;
        match client.recv().await {
            Packet::Disconnected { reason } => assert!(reason.contains("version")),
            other => panic!("Expected Disconnected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn shutdown_stops_server() {
        let server = start_server(WorldState::new()).await;
        server.shutdown.send(ServerMessage::Shutdown).unwrap();

        let result = timeout(RECV_TIMEOUT, server.handle).await.unwrap().unwrap();
        assert_ok!(result);
    }
}

/// MOVEMENT AND BROADCAST TESTS
mod movement_tests {
    use super::*;

    #[tokio::test]
    async fn move_onto_collectible_scores_and_removes_it() {
        let server = start_server(coin_above_spawn()).await;
        let a = TestClient::new(server.addr).await;
        let b = TestClient::new(server.addr).await;

        let (a_id, _) = a.join().await;
        b.join().await;

        a.move_player("up").await;

        for client in [&a, &b] {
            let snapshot = client.recv_snapshot().await;
            let mover = snapshot.player(&a_id).unwrap();
            assert_eq!((mover.x, mover.y, mover.score), (100, 95, 1));
            assert_eq!(snapshot.collectibles.len(), 1);
            assert!(snapshot.collectibles.iter().all(|c| c.id != "coin-00"));
        }
    }

    #[tokio::test]
    async fn invalid_direction_is_silently_dropped() {
        let server = start_server(WorldState::new()).await;
        let a = TestClient::new(server.addr).await;
        let (a_id, _) = a.join().await;

        a.move_player("diagonal").await;
        a.assert_silent().await;

        a.move_player("left").await;
        let snapshot = a.recv_snapshot().await;
        let player = snapshot.player(&a_id).unwrap();
        assert_eq!((player.x, player.y), (95, 100));
    }

    #[tokio::test]
    async fn broadcasts_arrive_in_processing_order() {
        let server = start_server(WorldState::new()).await;
        let a = TestClient::new(server.addr).await;
        let b = TestClient::new(server.addr).await;

        let (a_id, _) = a.join().await;
        b.join().await;

        for _ in 0..3 {
            a.move_player("up").await;
        }

        let mut seen = Vec::new();
        for _ in 0..3 {
            let snapshot = b.recv_snapshot().await;
            seen.push(snapshot.player(&a_id).unwrap().y);
        }
        assert_eq!(seen, vec![95, 90, 85]);
    }

    #[tokio::test]
    async fn two_clients_only_move_themselves() {
        let server = start_server(WorldState::new()).await;
        let a = TestClient::new(server.addr).await;
        let b = TestClient::new(server.addr).await;

        let (a_id, _) = a.join().await;
        let (b_id, _) = b.join().await;

        a.move_player("right").await;
        b.move_player("down").await;

        a.recv_snapshot().await;
        let snapshot = a.recv_snapshot().await;

        let pa = snapshot.player(&a_id).unwrap();
        let pb = snapshot.player(&b_id).unwrap();
        assert_eq!((pa.x, pa.y, pa.score), (105, 100, 0));
        assert_eq!((pb.x, pb.y, pb.score), (100, 105, 0));
    }
}

/// CLIENT LIBRARY TESTS
mod client_tests {
    use super::*;
    use client::network::Client;

    #[tokio::test]
    async fn client_learns_its_rank() {
        let server = start_server(coin_above_spawn()).await;
        let other = TestClient::new(server.addr).await;
        other.join().await;

        let mut client = Client::new(&server.addr.to_string(), Duration::from_secs(1))
            .await
            .unwrap();
        client.connect().await.unwrap();

        assert!(client.poll(RECV_TIMEOUT).await.unwrap());
        assert!(client.poll(RECV_TIMEOUT).await.unwrap());
        assert!(client.is_connected());
        assert_eq!(client.game_state().snapshot.players.len(), 2);

        client.send_move("up").await.unwrap();
        assert!(client.poll(RECV_TIMEOUT).await.unwrap());
        assert_eq!(
            client.game_state().rank_text(),
            Some("Rank: 1/2".to_string())
        );
    }
}
