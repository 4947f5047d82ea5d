//! Login handshake and the registry of running sessions.
//!
//! New connections wait in the [`ClientManager`] until their first message.
//! A `CreateGame` opens a session under the given token with the sender as
//! host; a `JoinGame` seats the sender in the session holding that token.
//! Either way the connection is answered with `EnteredGame` and handed to the
//! session, or with `DeniedGame` and closed.

use crate::client_manager::{ClientManager, PendingLogin};
use crate::config::ServerConfig;
use crate::controller::ServerController;
use crate::interface::MessageInterface;
use crate::session::Session;
use log::{error, info, warn};
use shared::protocol::{LoginPayload, MessageEvent, ReasonCode};
use shared::Span;
use std::collections::HashMap;
use std::net::SocketAddr;

pub struct GameServer {
    sessions: HashMap<String, Session>,
    logins: ClientManager,
    session_interval: Span,
}

impl GameServer {
    pub fn new(config: &ServerConfig) -> Self {
        GameServer {
            sessions: HashMap::new(),
            logins: ClientManager::new(config.max_pending_logins, config.login_timeout),
            session_interval: config.session_interval,
        }
    }

    /// Queues a new connection for its login. Returns its connection id.
    pub fn add_connection(
        &mut self,
        interface: Box<dyn MessageInterface>,
        peer: Option<SocketAddr>,
    ) -> Option<u32> {
        let id = self.logins.add_login(interface, peer);
        if id.is_none() {
            warn!("Too many pending logins, refusing connection");
        }
        id
    }

    /// Answers pending logins, then advances every session by `elapsed`.
    pub fn tick(&mut self, elapsed: Span) {
        self.handle_logins();
        self.handle_sessions(elapsed);
    }

    /// Ends every session and drops every pending connection.
    pub fn shutdown(&mut self) {
        for (token, session) in self.sessions.iter_mut() {
            info!("Shutting down session {}", token);
            session.shutdown();
        }
        self.sessions.clear();
        for id in self.logins.ids() {
            if let Some(mut login) = self.logins.remove_login(id) {
                login.interface.close();
            }
        }
    }

    pub fn session(&self, token: &str) -> Option<&Session> {
        self.sessions.get(token)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn pending_logins(&self) -> usize {
        self.logins.len()
    }

    /// Reads at most one message per pending connection.
    fn handle_logins(&mut self) {
        self.logins.check_timeouts();

        for id in self.logins.ids() {
            let Some(login) = self.logins.get_mut(id) else {
                continue;
            };
            let (payload, create) = match login.interface.receive() {
                None => continue,
                Some(Ok(MessageEvent::CreateGame(payload))) => (payload, true),
                Some(Ok(MessageEvent::JoinGame(payload))) => (payload, false),
                Some(Ok(other)) => {
                    warn!(
                        "Connection {} sent {:?} before logging in",
                        id,
                        other.message_type()
                    );
                    self.drop_login(id);
                    continue;
                }
                Some(Err(e)) => {
                    warn!("Connection {} sent a malformed login: {}", id, e);
                    self.drop_login(id);
                    continue;
                }
            };

            let Some(login) = self.logins.remove_login(id) else {
                continue;
            };
            match self.check_login(&payload, create) {
                Ok(slot) => self.accept(login, &payload, slot, create),
                Err(reason) => Self::deny(login, reason),
            }
        }
    }

    /// Slot the login would take, or why it is refused.
    fn check_login(&self, login: &LoginPayload, create: bool) -> Result<u8, ReasonCode> {
        if !login.is_compatible() {
            return Err(ReasonCode::VersionMismatch);
        }
        if !login.is_valid() {
            return Err(ReasonCode::IllegalLogin);
        }
        if create {
            return match self.sessions.contains_key(&login.token) {
                true => Err(ReasonCode::IllegalLogin),
                false => Ok(0),
            };
        }

        let status = &self
            .sessions
            .get(&login.token)
            .ok_or(ReasonCode::GameNotFound)?
            .controller()
            .game()
            .status;
        if !status.joinable() {
            return Err(ReasonCode::GameNotJoinable);
        }
        status.next_unused_player().ok_or(ReasonCode::GameFull)
    }

    fn accept(&mut self, mut login: PendingLogin, payload: &LoginPayload, slot: u8, create: bool) {
        if create {
            let controller = ServerController::new();
            let session = Session::with_interval(controller, self.session_interval);
            self.sessions.insert(payload.token.clone(), session);
            info!("Session {} created by {}", payload.token, payload.name);
        }
        let Some(session) = self.sessions.get_mut(&payload.token) else {
            return;
        };
        let controller = session.controller_mut();

        let result = controller.join(slot, &payload.name, create).and_then(|_| {
            login.interface.send(&MessageEvent::EnteredGame);
            login.interface.suspend();
            controller.replace_interface(slot as usize, login.interface)
        });
        if let Err(e) = result {
            error!(
                "Failed to seat {} in session {}: {}",
                payload.name, payload.token, e
            );
            if create {
                self.sessions.remove(&payload.token);
            }
        }
    }

    fn deny(mut login: PendingLogin, reason: ReasonCode) {
        info!("Connection {} denied: {:?}", login.id, reason);
        login.interface.send(&MessageEvent::DeniedGame(reason));
        login.interface.close();
    }

    fn drop_login(&mut self, id: u32) {
        if let Some(mut login) = self.logins.remove_login(id) {
            login.interface.close();
        }
    }

    fn handle_sessions(&mut self, elapsed: Span) {
        for session in self.sessions.values_mut() {
            session.update(elapsed);
        }
        self.sessions.retain(|token, session| {
            let ended = session.is_ended();
            if ended {
                info!("Session {} ended", token);
            }
            !ended
        });
    }
}
