//! Ordered queue of messages produced while a session is updated.
//!
//! The animator and the controller never talk to connections directly. They
//! append to an [`Outbox`], and the controller fans the queued messages out
//! to every connected slot once the current step is complete.

use shared::model::{Creature, Object, Player};
use shared::protocol::{EncodeError, MapEvent, MessageEvent, PlayerPayload};
use shared::Span;

#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<MessageEvent>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: MessageEvent) {
        self.messages.push(message);
    }

    pub fn map_event(&mut self, event: MapEvent) {
        self.push(MessageEvent::MapEvent(event));
    }

    pub fn player_state(&mut self, player: &Player) {
        self.push(MessageEvent::PlayerState(PlayerPayload::from(player)));
    }

    pub fn time_limit(&mut self, time_limit: Span) {
        self.push(MessageEvent::SetTimeLimit(time_limit));
    }

    pub fn creature_state(&mut self, creature: &Creature) {
        self.map_event(MapEvent::creature_state(creature));
    }

    pub fn creature_position(&mut self, creature: &Creature) {
        self.map_event(MapEvent::creature_position(creature));
    }

    pub fn creature_animation(&mut self, creature: &Creature) {
        self.map_event(MapEvent::creature_animation(creature));
    }

    pub fn spawn_creature(&mut self, creature: &Creature) {
        self.map_event(MapEvent::spawn_creature(creature));
    }

    pub fn despawn_creature(&mut self, creature: &Creature) {
        self.map_event(MapEvent::despawn_creature(creature));
    }

    /// Fails for objects that never exist on a client, such as spawn points.
    pub fn spawn_object(&mut self, object: &Object) -> Result<(), EncodeError> {
        self.map_event(MapEvent::spawn_object(object)?);
        Ok(())
    }

    pub fn despawn_object(&mut self, object: &Object) {
        self.map_event(MapEvent::despawn_object(object));
    }

    pub fn destroy_object(&mut self, object: &Object) {
        self.map_event(MapEvent::destroy_object(object));
    }

    pub fn picked_object(&mut self, object: &Object) {
        self.map_event(MapEvent::picked_object(object));
    }

    pub fn messages(&self) -> &[MessageEvent] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Hands out the queued messages in the order they were produced.
    pub fn take(&mut self) -> Vec<MessageEvent> {
        std::mem::take(&mut self.messages)
    }
}
