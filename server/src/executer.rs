//! Dispatch of messages received from a seated player.

use crate::animator::AnimatorError;
use crate::controller::{ServerController, SessionError};
use log::warn;
use shared::protocol::{DecodeError, MessageEvent, MessageType, ReasonCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("malformed message: {0}")]
    Decode(#[from] DecodeError),
    #[error("{0:?} is not accepted from a player")]
    Unsupported(MessageType),
    #[error(transparent)]
    Animator(#[from] AnimatorError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Runs one message from `slot`. A message that fails gets its sender kicked.
pub(crate) fn execute(
    controller: &mut ServerController,
    slot: u8,
    message: Result<MessageEvent, DecodeError>,
) {
    if let Err(e) = dispatch(controller, slot, message) {
        warn!("Rejected message from player {}: {}", slot, e);
        controller.kick(slot, ReasonCode::CheatKick);
    }
}

fn dispatch(
    controller: &mut ServerController,
    slot: u8,
    message: Result<MessageEvent, DecodeError>,
) -> Result<(), ExecuteError> {
    match message? {
        MessageEvent::Chat(text) => controller.chat(slot, &text),
        MessageEvent::Options(options) => {
            if controller.is_host(slot) {
                controller.set_options(options)?;
            }
        }
        MessageEvent::PauseGame(paused) => {
            if controller.is_host(slot) {
                controller.pause(paused);
            }
        }
        MessageEvent::StartGame => {
            if controller.is_host(slot) {
                controller.start_game()?;
            }
        }
        MessageEvent::ContinueGame(answer) => controller.continue_game(slot, answer),
        MessageEvent::PlayerPosition(payload) => {
            let (game, animator, out) = controller.game_and_animator();
            animator.move_player(game, out, slot, payload)?;
        }
        MessageEvent::PlayerBomb(kind) => {
            let (game, animator, out) = controller.game_and_animator();
            animator.place_bomb(game, out, slot, kind)?;
        }
        MessageEvent::PlayerDetonate(bomb) => {
            let (game, animator, _) = controller.game_and_animator();
            animator.detonate_bomb(game, slot, bomb)?;
        }
        other => return Err(ExecuteError::Unsupported(other.message_type())),
    }
    Ok(())
}
