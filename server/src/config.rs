//! Server tunables, filled from the command line.

use crate::session::UPDATE_INTERVAL;
use shared::{Span, DEFAULT_PORT};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Period of the server loop that accepts logins and drives sessions.
    pub tick_duration: Duration,
    /// Fixed step of every session.
    pub session_interval: Span,
    pub max_pending_logins: usize,
    /// Time a connection gets to send its login.
    pub login_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            tick_duration: Duration::from_secs_f64(1.0 / 60.0),
            session_interval: UPDATE_INTERVAL,
            max_pending_logins: 32,
            login_timeout: Duration::from_secs(10),
        }
    }
}
