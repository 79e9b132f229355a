use crate::game::ClientGameState;
use crate::input::{parse_line, Command};
use bincode::{deserialize, serialize};
use log::{error, info, warn};
use shared::{Packet, MAX_PACKET_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::time::interval;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,
    connected: bool,
    heartbeat: Duration,

    game_state: ClientGameState,
}

impl Client {
    pub async fn new(server_addr: &str, heartbeat: Duration) -> Result<Self, BoxError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;

        Ok(Client {
            socket,
            server_addr,
            connected: false,
            heartbeat,
            game_state: ClientGameState::new(),
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub async fn connect(&mut self) -> Result<(), BoxError> {
        info!("Connecting to server...");

        let packet = Packet::Connect {
            client_version: PROTOCOL_VERSION,
        };
        self.send_packet(&packet).await
    }

    pub async fn send_move(&self, direction: &str) -> Result<(), BoxError> {
        if !self.connected {
            return Ok(());
        }

        let packet = Packet::MovePlayer {
            direction: direction.to_string(),
        };
        self.send_packet(&packet).await
    }

    /// Tells the server this client is leaving
    ///
    /// The local state is reset whether or not the packet could be sent,
    /// since the server drops silent clients on its own.
    pub async fn disconnect(&mut self) -> Result<(), BoxError> {
        self.connected = false;
        self.game_state.reset();
        self.send_packet(&Packet::Disconnect).await
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), BoxError> {
        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    pub fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::Connected { player_id } => {
                info!("Connected! Player ID: {}", player_id);
                self.game_state.set_player_id(player_id);
                self.connected = true;
            }

            Packet::UpdateGameState(snapshot) => {
                self.game_state.apply_snapshot(snapshot);
                info!("{}", self.game_state.status_line());
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.connected = false;
                self.game_state.reset();
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Decodes and applies one datagram, returns false if it was not a packet
    pub fn handle_datagram(&mut self, data: &[u8]) -> bool {
        match deserialize::<Packet>(data) {
            Ok(packet) => {
                self.handle_packet(packet);
                true
            }
            Err(e) => {
                warn!("Dropping undecodable packet of {} bytes: {}", data.len(), e);
                false
            }
        }
    }

    /// Receives one datagram and applies it, waiting at most `timeout`
    ///
    /// Returns `Ok(false)` when nothing arrived in time.
    pub async fn poll(&mut self, timeout: Duration) -> Result<bool, BoxError> {
        let mut buffer = [0u8; MAX_PACKET_SIZE];
        match tokio::time::timeout(timeout, self.socket.recv_from(&mut buffer)).await {
            Ok(result) => {
                let (len, _) = result?;
                let packet = deserialize::<Packet>(&buffer[0..len])?;
                self.handle_packet(packet);
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    pub async fn run(&mut self) -> Result<(), BoxError> {
        self.connect().await?;

        let mut heartbeat = interval(self.heartbeat);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut buffer = [0u8; MAX_PACKET_SIZE];

        loop {
            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            self.handle_datagram(&buffer[0..len]);
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                line = lines.next_line() => {
                    match line? {
                        Some(line) => match parse_line(&line) {
                            Command::Move(direction) => {
                                if let Err(e) = self.send_move(&direction).await {
                                    error!("Error sending move: {}", e);
                                }
                            }
                            Command::Status => info!("{}", self.game_state.status_line()),
                            Command::Quit => break,
                            Command::Empty => {}
                        },
                        None => break,
                    }
                },

                _ = heartbeat.tick() => {
                    if self.connected {
                        if let Err(e) = self.send_packet(&Packet::Heartbeat).await {
                            error!("Error sending heartbeat: {}", e);
                        }
                    }
                },
            }
        }

        if self.connected {
            if let Err(e) = self.disconnect().await {
                error!("Error sending disconnect: {}", e);
            }
        }

        Ok(())
    }
}
