//! Game-wide status: mode, phase, round clock and the player slots.

use crate::model::object::EntityId;
use crate::time::Span;
use thiserror::Error;

pub const MAX_PLAYERS: usize = 4;

byte_enum! {
    pub enum Mode {
        Cooperation = 0,
        Versus = 1,
    }
}

byte_enum! {
    pub enum Phase {
        Lobby = 0,
        Load = 1,
        Ready = 2,
        Ingame = 3,
        Continue = 4,
        Cleared = 5,
        GameOver = 6,
        Ended = 7,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    #[error("the game has already ended")]
    AlreadyEnded,
    #[error("mode can only change in the lobby")]
    ModeOutsideLobby,
    #[error("round can only change while loading")]
    RoundOutsideLoad,
}

/// One of the fixed player slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: u8,
    pub playing: bool,
    pub waiting: bool,
    pub game_over: bool,
    pub host: bool,
    pub local: bool,
    pub name: String,
    pub score: i32,
    pub wins: i32,
    pub stock: i32,
    /// Avatar currently controlled by this player, resolved through the map.
    pub bomberman: Option<EntityId>,
}

impl Player {
    pub const INITIAL_STOCK: i32 = 3;

    pub fn new(id: u8) -> Self {
        let mut player = Player {
            id,
            playing: false,
            waiting: false,
            game_over: false,
            host: false,
            local: false,
            name: String::new(),
            score: 0,
            wins: 0,
            stock: 0,
            bomberman: None,
        };
        player.leave();
        player
    }

    pub fn join(&mut self, name: &str, host: bool, local: bool) {
        self.playing = true;
        self.waiting = true;
        self.game_over = false;
        self.host = host;
        self.local = local;
        self.name = name.to_string();
        self.score = 0;
        self.wins = 0;
        self.stock = Self::INITIAL_STOCK;
        self.bomberman = None;
    }

    pub fn leave(&mut self) {
        self.playing = false;
        self.waiting = false;
        self.game_over = false;
        self.host = false;
        self.local = false;
        self.name.clear();
        self.score = 0;
        self.wins = 0;
        self.stock = 0;
        self.bomberman = None;
    }

    /// Accepts a continue offer: back in the game with a fresh score and stock.
    pub fn continue_game(&mut self) {
        self.waiting = true;
        self.game_over = false;
        self.score = 0;
        self.stock = Self::INITIAL_STOCK;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    mode: Mode,
    phase: Phase,
    paused: bool,
    round: i32,
    pub time_limit: Span,
    pub continuable: bool,
    pub wins_threshold: i32,
    pub players: [Player; MAX_PLAYERS],
}

impl Default for Status {
    fn default() -> Self {
        let mut status = Status {
            mode: Mode::Cooperation,
            phase: Phase::Lobby,
            paused: false,
            round: 0,
            time_limit: Span::ZERO,
            continuable: true,
            wins_threshold: 3,
            players: [0u8, 1, 2, 3].map(Player::new),
        };
        status.reset();
        status
    }
}

impl Status {
    pub fn reset(&mut self) {
        self.mode = Mode::Cooperation;
        self.phase = Phase::Lobby;
        self.paused = false;
        self.round = 0;
        self.time_limit = Span::ZERO;
        self.continuable = true;
        self.wins_threshold = 3;
        self.players.iter_mut().for_each(Player::leave);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn round(&self) -> i32 {
        self.round
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), StatusError> {
        if self.mode != mode {
            if self.phase != Phase::Lobby {
                return Err(StatusError::ModeOutsideLobby);
            }
            self.mode = mode;
        }
        Ok(())
    }

    /// Moves to `phase`. Once `Ended` is reached no further change is allowed.
    pub fn set_phase(&mut self, phase: Phase) -> Result<(), StatusError> {
        if self.phase != phase {
            if self.phase == Phase::Ended {
                return Err(StatusError::AlreadyEnded);
            }
            self.phase = phase;
        }
        Ok(())
    }

    pub fn set_round(&mut self, round: i32) -> Result<(), StatusError> {
        if self.round != round {
            if self.phase != Phase::Load {
                return Err(StatusError::RoundOutsideLoad);
            }
            self.round = round;
        }
        Ok(())
    }

    pub fn set_pause(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn player(&self, id: u8) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub fn player_mut(&mut self, id: u8) -> Option<&mut Player> {
        self.players.get_mut(id as usize)
    }

    pub fn active_players(&self) -> usize {
        self.players.iter().filter(|p| p.playing).count()
    }

    pub fn host_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.host)
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.local)
    }

    pub fn next_unused_player(&self) -> Option<u8> {
        self.players.iter().find(|p| !p.playing).map(|p| p.id)
    }

    /// Player owning the given avatar, if any.
    pub fn player_of_bomberman(&self, bomberman: EntityId) -> Option<u8> {
        self.players
            .iter()
            .find(|p| p.bomberman == Some(bomberman))
            .map(|p| p.id)
    }

    /// In Versus, the first player whose wins reached the threshold.
    pub fn winner(&self) -> Option<&Player> {
        if self.mode != Mode::Versus {
            return None;
        }
        self.players
            .iter()
            .find(|p| p.playing && p.wins >= self.wins_threshold)
    }

    pub fn startable(&self) -> bool {
        let active = self.active_players();
        self.phase == Phase::Lobby
            && ((self.mode == Mode::Cooperation && active == 1) || active > 1)
    }

    pub fn joinable(&self) -> bool {
        self.phase == Phase::Lobby
            || (self.continuable
                && matches!(
                    self.phase,
                    Phase::Load | Phase::Ready | Phase::Ingame | Phase::Continue
                ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_state() {
        let status = Status::default();
        assert_eq!(status.mode(), Mode::Cooperation);
        assert_eq!(status.phase(), Phase::Lobby);
        assert_eq!(status.round(), 0);
        assert!(status.continuable);
        assert_eq!(status.wins_threshold, 3);
        assert_eq!(status.active_players(), 0);
        assert_eq!(status.next_unused_player(), Some(0));
    }

    #[test]
    fn test_ended_is_a_sink() {
        let mut status = Status::default();
        status.set_phase(Phase::Ended).unwrap();
        assert_eq!(status.set_phase(Phase::Lobby), Err(StatusError::AlreadyEnded));
        assert!(status.set_phase(Phase::Ended).is_ok());
        assert_eq!(status.phase(), Phase::Ended);
    }

    #[test]
    fn test_mode_and_round_guards() {
        let mut status = Status::default();
        assert!(status.set_mode(Mode::Versus).is_ok());
        assert_eq!(status.set_round(2), Err(StatusError::RoundOutsideLoad));
        status.set_phase(Phase::Load).unwrap();
        assert!(status.set_round(2).is_ok());
        assert_eq!(status.set_mode(Mode::Cooperation), Err(StatusError::ModeOutsideLobby));
        assert_eq!(status.round(), 2);
    }

    #[test]
    fn test_startable_rules() {
        let mut status = Status::default();
        assert!(!status.startable());
        status.players[0].join("ann", true, false);
        assert!(status.startable());
        status.set_mode(Mode::Versus).unwrap();
        assert!(!status.startable());
        status.players[2].join("bob", false, false);
        assert!(status.startable());
        assert_eq!(status.host_player().map(|p| p.id), Some(0));
    }

    #[test]
    fn test_joinable_rules() {
        let mut status = Status::default();
        assert!(status.joinable());
        status.set_phase(Phase::Ingame).unwrap();
        assert!(status.joinable());
        status.continuable = false;
        assert!(!status.joinable());
        status.continuable = true;
        status.set_phase(Phase::GameOver).unwrap();
        assert!(!status.joinable());
    }

    #[test]
    fn test_winner_only_in_versus() {
        let mut status = Status::default();
        status.players[1].join("cy", false, false);
        status.players[1].wins = 3;
        assert!(status.winner().is_none());
        status.set_mode(Mode::Versus).unwrap();
        assert_eq!(status.winner().map(|p| p.id), Some(1));
    }

    #[test]
    fn test_player_lifecycle() {
        let mut player = Player::new(2);
        player.join("dee", false, true);
        assert!(player.playing && player.waiting && player.local);
        assert_eq!(player.stock, 3);
        player.score = 900;
        player.game_over = true;
        player.stock = 0;
        player.continue_game();
        assert!(!player.game_over);
        assert_eq!((player.score, player.stock), (0, 3));
        player.leave();
        assert!(!player.playing);
        assert!(player.name.is_empty());
        assert_eq!(player.id, 2);
    }
}
