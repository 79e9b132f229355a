//! Server network layer handling UDP communications and event serialization

use crate::config::ServerConfig;
use crate::engine::UpdateEngine;
use crate::error::{BoxError, TransportError};
use crate::session::{validate_version, SessionManager};
use crate::utils::generate_session_id;
use crate::world::WorldState;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{Packet, MAX_PACKET_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// Messages sent from the server loop to the network sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    /// Recipients are resolved when the triggering event is processed
    BroadcastPacket {
        packet: Packet,
        recipients: Vec<SocketAddr>,
    },
}

/// Main server coordinating networking and the authoritative world
pub struct Server {
    socket: Arc<UdpSocket>,
    sessions: SessionManager,
    world: WorldState,
    engine: UpdateEngine,
    client_timeout: Duration,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    /// Binds the socket and seeds a fresh world as configured
    pub async fn new(config: ServerConfig) -> Result<Self, BoxError> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut world = WorldState::new();
        world.populate(config.collectibles, &mut rng);

        Self::with_world(config, world).await
    }

    /// Binds the socket and serves an already prepared world
    ///
    /// Fails before binding when the configured capacity would produce
    /// snapshots larger than [`MAX_PACKET_SIZE`].
    pub async fn with_world(config: ServerConfig, world: WorldState) -> Result<Self, BoxError> {
        config.validate()?;
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            sessions: SessionManager::new(config.max_clients),
            world,
            engine: UpdateEngine::new(game_tx),
            client_timeout: config.client_timeout,
            server_tx,
            server_rx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Handle for stopping a running server from another task
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; MAX_PACKET_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue in FIFO order
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::BroadcastPacket { packet, recipients } => {
                        let data = match encode_packet(&packet) {
                            Ok(data) => data,
                            Err(e) => {
                                error!("Dropping broadcast: {}", e);
                                continue;
                            }
                        };

                        for addr in recipients {
                            if let Err(e) = socket.send_to(&data, addr).await {
                                error!("Failed to send to {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> Result<(), BoxError> {
        let data = encode_packet(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Processes one inbound packet to completion
    fn handle_packet(&mut self, packet: Packet, addr: SocketAddr) {
        match packet {
            Packet::Connect { client_version } => {
                info!(
                    "Client connecting from {} (version: {})",
                    addr, client_version
                );

                if let Err(e) = validate_version(client_version) {
                    warn!("Rejecting {}: {}", addr, e);
                    self.engine.send_packet(
                        Packet::Disconnected {
                            reason: e.to_string(),
                        },
                        addr,
                    );
                    return;
                }

                // Remove existing connection if present
                if let Some(existing_id) = self.sessions.find_session_by_addr(addr) {
                    info!("Removing existing session {} from {}", existing_id, addr);
                    self.sessions
                        .disconnect(&existing_id, &mut self.world, &self.engine);
                }

                let mut session_id = generate_session_id();
                while self.sessions.contains(&session_id) {
                    session_id = generate_session_id();
                }

                let joined = self
                    .sessions
                    .connect(session_id, addr, &mut self.world, &self.engine);
                if let Err(e) = joined {
                    warn!("Rejecting {}: {}", addr, e);
                    self.engine.send_packet(
                        Packet::Disconnected {
                            reason: e.to_string(),
                        },
                        addr,
                    );
                }
            }

            Packet::MovePlayer { direction } => {
                let Some(session_id) = self.sessions.find_session_by_addr(addr) else {
                    debug!("Dropping move from unknown address {}", addr);
                    return;
                };

                if let Err(e) = self.sessions.handle_command(
                    &session_id,
                    &direction,
                    &mut self.world,
                    &self.engine,
                ) {
                    debug!("Dropped command from {}: {}", session_id, e);
                }
            }

            Packet::Heartbeat => {
                if let Some(session_id) = self.sessions.find_session_by_addr(addr) {
                    self.sessions.touch(&session_id);
                }
            }

            Packet::Disconnect => {
                if let Some(session_id) = self.sessions.find_session_by_addr(addr) {
                    self.sessions
                        .disconnect(&session_id, &mut self.world, &self.engine);
                }
            }

            _ => {
                warn!("Unexpected packet type from client at {}", addr);
            }
        }
    }

    /// Closes sessions that stopped talking, as if they had disconnected
    fn close_timed_out_sessions(&mut self) {
        for session_id in self.sessions.timed_out(self.client_timeout) {
            info!("Session {} timed out", session_id);
            self.sessions
                .disconnect(&session_id, &mut self.world, &self.engine);
        }
    }

    /// Main server loop: one event at a time, each run to completion
    pub async fn run(&mut self) -> Result<(), BoxError> {
        // Initialize concurrent tasks
        self.spawn_network_receiver();
        self.spawn_network_sender();

        let mut liveness = interval(Duration::from_secs(1));
        liveness.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = liveness.tick() => {
                    self.close_timed_out_sessions();
                },
            }
        }

        Ok(())
    }
}

/// Serializes a packet, refusing anything a peer could not receive whole
///
/// UDP truncates datagrams larger than the receiver's buffer, and a truncated
/// snapshot fails to decode on the client.
pub fn encode_packet(packet: &Packet) -> Result<Vec<u8>, BoxError> {
    let data = serialize(packet)?;
    if data.len() > MAX_PACKET_SIZE {
        return Err(TransportError::Oversized {
            size: data.len(),
            limit: MAX_PACKET_SIZE,
        }
        .into());
    }
    Ok(data)
}
