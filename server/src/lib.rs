//! # Arena Server Library
//!
//! This library provides the authoritative server for the tile arena game.
//! It hosts any number of independent sessions, each with up to four
//! players, and is the only place where game rules are decided. Clients
//! render what the server tells them and report their intentions.
//!
//! ## Core Responsibilities
//!
//! ### Session Hosting
//! A player opens a session under a short token and becomes its host. Other
//! players join by naming the same token. Sessions live until every player
//! has left or the game has run its course.
//!
//! ### Authoritative Simulation
//! Bombs, blasts, monsters, pickups and the round clock are all advanced
//! on the server in fixed steps. Client movement is checked against the map
//! before it is accepted and broadcast.
//!
//! ### State Replication
//! Every visible change becomes a message queued during the step and sent
//! to every seated player once the step is done. A player who connects
//! later receives a full replay of the roster, the phase and the map.
//!
//! ## Architecture Design
//!
//! ### Single Tick Loop
//! One loop owns every session and every pending connection. Network tasks
//! only move bytes; they never touch game state. This keeps each session
//! deterministic for a given sequence of messages and elapsed times.
//!
//! ### TCP With Length-Prefixed Frames
//! Each connection carries a stream of frames. A frame that fails to decode
//! costs the sender their seat, while a framing failure drops the
//! connection.
//!
//! ### Fixed Session Step
//! Sessions accumulate the loop's elapsed time and advance in steps of
//! [`session::UPDATE_INTERVAL`], however irregular the loop itself is.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! TCP acceptor and the tick loop driving the [`game_server::GameServer`].
//!
//! ### Game Server Module (`game_server`)
//! Answers logins and keeps the registry of sessions by token.
//!
//! ### Client Manager Module (`client_manager`)
//! Connections that have not sent their login yet.
//!
//! ### Controller Module (`controller`)
//! Phase machine of one session: lobby, level loading, play, continue
//! prompts, game over.
//!
//! ### Animator Module (`animator`)
//! Per-step rules of a running level, with monster behaviour in `routines`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:7342".to_string(),
//!         ..ServerConfig::default()
//!     };
//!     let mut server = Server::new(config).await?;
//!
//!     // Accepts connections, answers logins and drives every session
//!     // until a shutdown message arrives.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod animator;
pub mod client_manager;
pub mod config;
pub mod controller;
pub mod executer;
pub mod game;
pub mod game_server;
pub mod interface;
pub mod network;
pub mod outbox;
pub mod routines;
pub mod session;
pub mod socket;
