//! Server network layer: TCP acceptor and the main tick loop

use crate::config::ServerConfig;
use crate::game_server::GameServer;
use crate::socket::SocketInterface;
use log::{debug, error, info, warn};
use shared::Span;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Longest step handed to the sessions after a stalled tick.
const MAX_TICK_ELAPSED: Duration = Duration::from_millis(250);
/// Time given to writer tasks to flush final kicks before the runtime stops.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    Connection { stream: TcpStream, addr: SocketAddr },
    Shutdown,
}

/// Main server coordinating the acceptor and every session
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    game_server: GameServer,
    tick_duration: Duration,

    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        let local_addr = listener.local_addr()?;
        info!("Server listening on {}", local_addr);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            game_server: GameServer::new(&config),
            tick_duration: config.tick_duration,
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sender that stops the server when sent [`ServerMessage::Shutdown`].
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    /// Spawns task that accepts connections and forwards them to the main loop
    fn spawn_acceptor(&mut self) -> Option<JoinHandle<()>> {
        let listener = self.listener.take()?;
        let server_tx = self.server_tx.clone();

        Some(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        if server_tx
                            .send(ServerMessage::Connection { stream, addr })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        }))
    }

    fn handle_connection(&mut self, stream: TcpStream, addr: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle for {}: {}", addr, e);
        }
        let interface = SocketInterface::new(stream);
        self.game_server.add_connection(Box::new(interface), Some(addr));
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let acceptor = self.spawn_acceptor().ok_or("server is already running")?;

        let mut tick_interval = interval(self.tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Connection { stream, addr }) => {
                            self.handle_connection(stream, addr);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let mut elapsed = now.duration_since(last_tick);
                    last_tick = now;

                    if elapsed > MAX_TICK_ELAPSED {
                        warn!(
                            "Large tick delta detected ({:.3}s), capping to {:.3}s",
                            elapsed.as_secs_f32(),
                            MAX_TICK_ELAPSED.as_secs_f32()
                        );
                        elapsed = MAX_TICK_ELAPSED;
                    }

                    self.game_server.tick(Span::from_duration(elapsed));
                },
            }
        }

        self.game_server.shutdown();
        acceptor.abort();
        tokio::time::sleep(SHUTDOWN_GRACE).await;
        Ok(())
    }
}
