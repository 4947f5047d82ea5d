//! Bookkeeping for connections that have not logged in yet
//!
//! Every accepted connection starts out here, before it belongs to any game.
//! This module handles:
//! - Assigning connection ids and enforcing the pending capacity
//! - Handing a connection over once its login has been answered
//! - Dropping connections that hang up or never send a login
//!
//! Connections only leave the manager through [`ClientManager::remove_login`]
//! or a timeout sweep, so a login is answered at most once.

use crate::interface::MessageInterface;
use log::info;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connection waiting for its login to be answered
///
/// Holds the channel itself together with enough metadata to log where the
/// connection came from and to detect stalled handshakes.
pub struct PendingLogin {
    /// Connection id assigned by the manager
    pub id: u32,
    /// Channel the login arrives on and the answer goes out on
    pub interface: Box<dyn MessageInterface>,
    /// Remote address, when the transport has one
    pub peer: Option<SocketAddr>,
    /// When the connection was accepted
    pub connected_at: Instant,
}

impl PendingLogin {
    /// Checks whether the handshake has been pending for longer than `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.connected_at.elapsed() > timeout
    }

    fn describe(&self) -> String {
        match self.peer {
            Some(addr) => addr.to_string(),
            None => "local endpoint".to_string(),
        }
    }
}

/// Manages every connection that has not joined a game yet
///
/// Logins are kept in id order so they are answered in the order the
/// connections were accepted.
pub struct ClientManager {
    /// Pending connections indexed by their id
    logins: BTreeMap<u32, PendingLogin>,
    /// Next id handed to a new connection
    next_id: u32,
    /// Maximum number of connections allowed to wait at once
    max_pending: usize,
    /// How long a connection may take to send its login
    timeout: Duration,
}

impl ClientManager {
    /// Creates an empty manager
    ///
    /// Connection ids start from 1 and increment for each new connection.
    pub fn new(max_pending: usize, timeout: Duration) -> Self {
        Self {
            logins: BTreeMap::new(),
            next_id: 1,
            max_pending,
            timeout,
        }
    }

    /// Registers a freshly accepted connection
    ///
    /// Returns Some(id) if it was queued. When the manager is full the
    /// connection is closed right away and None is returned.
    pub fn add_login(
        &mut self,
        mut interface: Box<dyn MessageInterface>,
        peer: Option<SocketAddr>,
    ) -> Option<u32> {
        if self.logins.len() >= self.max_pending {
            interface.close();
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        let login = PendingLogin {
            id,
            interface,
            peer,
            connected_at: Instant::now(),
        };
        info!("Connection {} accepted from {}", id, login.describe());
        self.logins.insert(id, login);

        Some(id)
    }

    /// Takes a connection out of the manager
    ///
    /// The caller becomes responsible for the channel. Returns None if the
    /// id is unknown or was already removed.
    pub fn remove_login(&mut self, id: u32) -> Option<PendingLogin> {
        self.logins.remove(&id)
    }

    /// Drops connections that went down or stalled
    ///
    /// Closes and removes every connection whose channel is down or whose
    /// login did not arrive within the timeout. Returns the removed ids.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let expired: Vec<u32> = self
            .logins
            .values()
            .filter(|login| !login.interface.is_up() || login.is_timed_out(self.timeout))
            .map(|login| login.id)
            .collect();

        for id in &expired {
            if let Some(mut login) = self.logins.remove(id) {
                info!("Connection {} from {} dropped before login", id, login.describe());
                login.interface.close();
            }
        }

        expired
    }

    /// Ids of every pending connection, oldest first
    pub fn ids(&self) -> Vec<u32> {
        self.logins.keys().copied().collect()
    }

    /// Gets a pending connection to poll its channel
    pub fn get_mut(&mut self, id: u32) -> Option<&mut PendingLogin> {
        self.logins.get_mut(&id)
    }

    /// Returns the number of pending connections
    pub fn len(&self) -> usize {
        self.logins.len()
    }

    /// Returns true if no connection is waiting
    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }
}
