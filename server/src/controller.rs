//! Session controller: phase machine and player slots of one game.

use crate::animator::{Animator, AnimatorError, AnimatorState};
use crate::executer;
use crate::game::Game;
use crate::interface::{EndpointEvent, MessageInterface, NullInterface};
use crate::outbox::Outbox;
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::model::{Level, MapError, Mode, Phase, StatusError, MAX_PLAYERS};
use shared::protocol::{MessageEvent, OptionsPayload, PlayerPayload, ReasonCode, SetMapPayload};
use shared::Span;
use thiserror::Error;

pub const LOAD_TIMER: Span = Span::from_millis(1500);
pub const READY_TIMER: Span = Span::from_secs(3);
pub const CONTINUE_TIMER: Span = Span::from_millis(20_900);
pub const GAME_OVER_TIMER: Span = Span::from_secs(8);
pub const CLEAR_TIMER: Span = Span::from_secs(10);
pub const MAX_CHAT_LENGTH: usize = 128;
const INITIAL_ROUND: i32 = 1;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("slot {0} does not exist")]
    SlotOutOfRange(usize),
    #[error("interface of slot {0} is still up")]
    InterfaceStillUp(usize),
    #[error("replacement interface for slot {0} is already up")]
    ReplacementUp(usize),
    #[error("the animator is still running")]
    AnimatorRunning,
    #[error(transparent)]
    Animator(#[from] AnimatorError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Runs one game: drains slot messages, advances the phase machine and
/// fans the resulting messages out to every slot.
pub struct ServerController {
    game: Game,
    animator: Animator,
    interfaces: Vec<Box<dyn MessageInterface>>,
    phase_timer: Span,
    outbox: Outbox,
    rng: StdRng,
}

impl Default for ServerController {
    fn default() -> Self {
        Self::with_parts(Animator::new(), StdRng::from_entropy())
    }
}

impl ServerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller whose level rolls and monster decisions are reproducible.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_parts(Animator::with_seed(seed), StdRng::seed_from_u64(seed))
    }

    fn with_parts(animator: Animator, rng: StdRng) -> Self {
        let interfaces = (0..MAX_PLAYERS)
            .map(|_| Box::new(NullInterface) as Box<dyn MessageInterface>)
            .collect();
        ServerController {
            game: Game::new(),
            animator,
            interfaces,
            phase_timer: Span::ZERO,
            outbox: Outbox::new(),
            rng,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn is_ended(&self) -> bool {
        self.game.status.phase() == Phase::Ended
    }

    /// Advances the session by `elapsed`. Internal failures end the session.
    pub fn update(&mut self, elapsed: Span) {
        if self.is_ended() {
            return;
        }
        if let Err(e) = self.step(elapsed) {
            error!("Session update failed: {}", e);
            self.end_game(ReasonCode::Disconnected);
        }
        self.flush();
    }

    fn step(&mut self, elapsed: Span) -> Result<(), SessionError> {
        self.handle_endpoint_events()?;
        self.handle_messages();
        if self.is_ended() {
            return Ok(());
        }

        match self.game.status.phase() {
            Phase::Lobby | Phase::Ended => {}
            Phase::Load => {
                if self.phase_timer.is_positive() {
                    self.phase_timer -= elapsed;
                } else {
                    self.game.status.set_phase(Phase::Ready)?;
                    self.phase_timer = READY_TIMER;
                    self.notify_phase();
                }
            }
            Phase::Ready => {
                if self.phase_timer.is_positive() {
                    self.phase_timer -= elapsed;
                } else {
                    self.game.status.set_phase(Phase::Ingame)?;
                    self.notify_phase();
                    self.animator.begin(&mut self.game, &mut self.outbox)?;
                }
            }
            Phase::Ingame => {
                if self.game.status.paused() {
                    return Ok(());
                }
                if self.animator.state() == AnimatorState::Playing {
                    self.animator
                        .animate(&mut self.game, &mut self.outbox, elapsed)?;
                } else {
                    self.start_next_level()?;
                }
            }
            Phase::Continue => {
                let status = &mut self.game.status;
                let pending = status.players.iter().any(|p| p.game_over && p.waiting);
                if pending && status.time_limit.is_positive() {
                    status.time_limit = status.time_limit.saturating_countdown(elapsed);
                } else {
                    // Whoever has not answered yet gives up.
                    for slot in 0..MAX_PLAYERS as u8 {
                        self.continue_game(slot, false);
                    }
                    self.start_next_level()?;
                }
            }
            Phase::Cleared => {
                if self.phase_timer.is_positive() {
                    self.phase_timer -= elapsed;
                } else {
                    self.show_game_over()?;
                }
            }
            Phase::GameOver => {
                if self.phase_timer.is_positive() {
                    self.phase_timer -= elapsed;
                } else {
                    self.end_game(ReasonCode::EndKick);
                }
            }
        }
        Ok(())
    }

    fn handle_endpoint_events(&mut self) -> Result<(), SessionError> {
        for slot in 0..MAX_PLAYERS {
            while let Some(event) = self.interfaces[slot].poll_event() {
                match event {
                    EndpointEvent::Up => self.endpoint_up(slot),
                    EndpointEvent::Down => self.endpoint_down(slot)?,
                }
                if self.is_ended() {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// Sweeps the slots round-robin until none has a pending message.
    fn handle_messages(&mut self) {
        loop {
            let mut pending = false;
            for slot in 0..MAX_PLAYERS {
                if self.is_ended() {
                    return;
                }
                if let Some(message) = self.interfaces[slot].receive() {
                    pending = true;
                    executer::execute(self, slot as u8, message);
                }
            }
            if !pending {
                break;
            }
        }
    }

    /// Seats a player who completed the login handshake and announces them.
    pub fn join(&mut self, slot: u8, name: &str, host: bool) -> Result<(), SessionError> {
        let player = self
            .game
            .status
            .player_mut(slot)
            .ok_or(SessionError::SlotOutOfRange(slot as usize))?;
        player.join(name, host, false);
        let payload = PlayerPayload::from(&*player);
        info!("Player {} joined slot {} (host: {})", name, slot, host);
        self.broadcast(MessageEvent::PlayerJoined(payload));
        self.flush();
        Ok(())
    }

    /// Hands a slot over to a new channel and brings it up.
    ///
    /// The current channel must already be down and the new one not yet up.
    /// On error the slot is left untouched.
    pub fn replace_interface(
        &mut self,
        slot: usize,
        mut interface: Box<dyn MessageInterface>,
    ) -> Result<(), SessionError> {
        let current = self
            .interfaces
            .get(slot)
            .ok_or(SessionError::SlotOutOfRange(slot))?;
        if current.is_up() {
            return Err(SessionError::InterfaceStillUp(slot));
        }
        if interface.is_up() {
            return Err(SessionError::ReplacementUp(slot));
        }
        interface.resume();
        self.interfaces[slot] = interface;
        Ok(())
    }

    pub fn kick(&mut self, slot: u8, reason: ReasonCode) {
        info!("Kicking player {}: {:?}", slot, reason);
        self.send_to(slot as usize, &MessageEvent::Kicked(reason));
        if let Some(interface) = self.interfaces.get_mut(slot as usize) {
            interface.close();
        }
    }

    /// Ends the session now, kicking every player.
    pub fn shutdown(&mut self) {
        self.end_game(ReasonCode::Disconnected);
    }

    pub(crate) fn chat(&mut self, slot: u8, text: &str) {
        let Some(player) = self.game.status.player(slot) else {
            return;
        };
        let text: String = text.chars().take(MAX_CHAT_LENGTH).collect();
        let line = format!("[{}] {}", player.name, text);
        self.broadcast(MessageEvent::Chat(line));
    }

    pub(crate) fn set_options(&mut self, options: OptionsPayload) -> Result<(), SessionError> {
        let status = &mut self.game.status;
        if status.phase() != Phase::Lobby {
            return Ok(());
        }
        status.set_mode(options.mode)?;
        status.continuable = options.continuable;
        status.wins_threshold = options.wins_threshold;
        self.notify_options();
        Ok(())
    }

    pub(crate) fn pause(&mut self, paused: bool) {
        if self.game.status.phase() == Phase::Ingame && self.game.status.paused() != paused {
            self.game.status.set_pause(paused);
            self.broadcast(MessageEvent::PauseGame(paused));
        }
    }

    pub(crate) fn start_game(&mut self) -> Result<(), SessionError> {
        if self.game.status.startable() {
            info!("Starting a {:?} game", self.game.status.mode());
            self.start_level(INITIAL_ROUND)?;
        }
        Ok(())
    }

    /// Records a player's answer to the continue prompt.
    pub(crate) fn continue_game(&mut self, slot: u8, answer: bool) {
        if self.game.status.phase() != Phase::Continue {
            return;
        }
        let Some(player) = self.game.status.player_mut(slot) else {
            return;
        };
        if !(player.game_over && player.waiting) {
            return;
        }
        if answer {
            player.continue_game();
        } else {
            player.waiting = false;
        }
        self.outbox.player_state(player);
    }

    pub(crate) fn is_host(&self, slot: u8) -> bool {
        self.game.status.player(slot).map_or(false, |p| p.host)
    }

    pub(crate) fn game_and_animator(&mut self) -> (&mut Game, &mut Animator, &mut Outbox) {
        (&mut self.game, &mut self.animator, &mut self.outbox)
    }

    fn start_level(&mut self, number: i32) -> Result<(), SessionError> {
        let mode = self.game.status.mode();
        let mut level = Level::predefined(mode, number, &mut self.rng)?;
        if level.is_none() && mode == Mode::Versus {
            level = Level::predefined(mode, INITIAL_ROUND, &mut self.rng)?;
        }

        match level {
            Some(level) if self.game.status.winner().is_none() => {
                self.game.load_level(level)?;
                self.phase_timer = LOAD_TIMER;
                self.notify_phase();
                for slot in 0..MAX_PLAYERS {
                    self.notify_map(slot);
                }
            }
            _ => {
                info!("Game cleared after round {}", self.game.status.round());
                self.game.status.set_phase(Phase::Cleared)?;
                self.phase_timer = CLEAR_TIMER;
                self.notify_phase();
            }
        }
        Ok(())
    }

    /// Picks what follows a finished round: a continue prompt, the game
    /// over screen, the next level or another try at the current one.
    fn start_next_level(&mut self) -> Result<(), SessionError> {
        let state = self.animator.state();
        if state == AnimatorState::Playing {
            return Err(SessionError::AnimatorRunning);
        }
        let status = &self.game.status;
        let round = status.round();
        if status.players.iter().any(|p| p.game_over && p.waiting) {
            self.show_continue()
        } else if !status.players.iter().any(|p| p.playing && !p.game_over) {
            self.show_game_over()
        } else if state == AnimatorState::NextLevel {
            self.start_level(round + 1)
        } else {
            self.start_level(round)
        }
    }

    fn show_continue(&mut self) -> Result<(), SessionError> {
        self.game.status.set_phase(Phase::Continue)?;
        self.game.status.time_limit = CONTINUE_TIMER;
        self.outbox.time_limit(CONTINUE_TIMER);
        self.notify_phase();
        Ok(())
    }

    fn show_game_over(&mut self) -> Result<(), SessionError> {
        self.game.status.set_phase(Phase::GameOver)?;
        self.phase_timer = GAME_OVER_TIMER;
        self.notify_phase();
        Ok(())
    }

    fn end_game(&mut self, reason: ReasonCode) {
        if self.is_ended() || self.game.status.set_phase(Phase::Ended).is_err() {
            return;
        }
        info!("Session ended: {:?}", reason);
        for slot in 0..MAX_PLAYERS as u8 {
            if self.game.status.player(slot).map_or(false, |p| p.playing) {
                self.kick(slot, reason);
            }
        }
    }

    /// Replays the whole session state to a slot that just came up.
    fn endpoint_up(&mut self, slot: usize) {
        debug!("Slot {} is up", slot);
        let roster: Vec<PlayerPayload> = self
            .game
            .status
            .players
            .iter()
            .filter(|p| p.playing)
            .map(|p| {
                let mut payload = PlayerPayload::from(p);
                payload.local = p.id as usize == slot;
                payload
            })
            .collect();
        for payload in roster {
            self.send_to(slot, &MessageEvent::PlayerJoined(payload));
        }
        let phase = self.game.status.phase();
        self.send_to(slot, &MessageEvent::ChangePhase(phase));
        self.notify_map(slot);
    }

    fn endpoint_down(&mut self, slot: usize) -> Result<(), SessionError> {
        let id = slot as u8;
        if !self.game.status.player(id).map_or(false, |p| p.playing) {
            return Ok(());
        }

        if let Some(bomberman) = self.game.bomberman_of(id).map(|c| c.id) {
            if let Some(creature) = self.game.map.creature(bomberman) {
                self.outbox.despawn_creature(creature);
            }
            self.game.remove_creature(bomberman)?;
        }
        if let Some(player) = self.game.status.player_mut(id) {
            info!("Player {} left slot {}", player.name, slot);
            player.leave();
        }
        self.broadcast(MessageEvent::PlayerLeft(id));

        let status = &self.game.status;
        if status.active_players() == 0
            || (status.host_player().is_none() && status.phase() == Phase::Lobby)
        {
            self.end_game(ReasonCode::AbortedKick);
        }
        Ok(())
    }

    /// Sends the map of the current level to one slot, from a clean slate.
    fn notify_map(&mut self, slot: usize) {
        let Some(level) = &self.game.level else {
            return;
        };
        let set_map = SetMapPayload {
            number: level.number,
            width: self.game.map.width() as i32,
            height: self.game.map.height() as i32,
            theme: self.game.map.theme(),
        };
        self.game.map.sort_creatures();

        let mut replay = Outbox::new();
        replay.push(MessageEvent::SetMap(set_map));
        for object in self.game.map.objects() {
            if let Err(e) = replay.spawn_object(object) {
                warn!("Skipping object at {:?} in map replay: {}", object.position, e);
            }
        }
        for creature in self.game.map.creatures() {
            replay.spawn_creature(creature);
        }
        replay.time_limit(self.game.status.time_limit);

        for message in &replay.take() {
            self.send_to(slot, message);
        }
    }

    fn notify_phase(&mut self) {
        let phase = self.game.status.phase();
        debug!("Phase changed to {:?}", phase);
        self.broadcast(MessageEvent::ChangePhase(phase));
    }

    fn notify_options(&mut self) {
        let status = &self.game.status;
        let options = OptionsPayload {
            mode: status.mode(),
            continuable: status.continuable,
            wins_threshold: status.wins_threshold,
        };
        self.broadcast(MessageEvent::Options(options));
    }

    fn broadcast(&mut self, message: MessageEvent) {
        self.outbox.push(message);
    }

    /// Sends to one slot after everything already queued for all.
    fn send_to(&mut self, slot: usize, message: &MessageEvent) {
        self.flush();
        if let Some(interface) = self.interfaces.get_mut(slot) {
            interface.send(message);
        }
    }

    fn flush(&mut self) {
        let messages = self.outbox.take();
        if messages.is_empty() {
            return;
        }
        for interface in self.interfaces.iter_mut() {
            for message in &messages {
                interface.send(message);
            }
        }
    }
}
