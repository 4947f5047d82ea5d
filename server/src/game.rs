//! The authoritative world of one session: live map, status and current level.

use log::info;
use shared::model::{Creature, EntityId, Level, Map, MapError, Phase, Status, StatusError};
use shared::Point;

#[derive(Debug, Default)]
pub struct Game {
    pub map: Map,
    pub status: Status,
    /// Template of the level being played, kept for its spawn points.
    pub level: Option<Level>,
}

impl Game {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters the load phase of `level`, replacing the live map with its template.
    pub fn load_level(&mut self, level: Level) -> Result<(), StatusError> {
        self.status.set_phase(Phase::Load)?;
        self.status.set_round(level.number)?;
        self.status.set_pause(false);
        self.status.time_limit = level.time_limit;
        self.map.transfer(&level.map);
        for player in self.status.players.iter_mut() {
            player.bomberman = None;
        }
        info!(
            "Loaded level {} ({}x{})",
            level.number,
            level.map.width(),
            level.map.height()
        );
        self.level = Some(level);
        Ok(())
    }

    /// Spawn points of the current level template.
    pub fn spawn_points(&self) -> Vec<Point> {
        self.level
            .as_ref()
            .map(|l| l.map.spawn_points())
            .unwrap_or_default()
    }

    /// Removes a creature and drops any player handle that pointed at it.
    pub fn remove_creature(&mut self, id: EntityId) -> Result<Creature, MapError> {
        let creature = self.map.remove_creature(id)?;
        for player in self.status.players.iter_mut() {
            if player.bomberman == Some(id) {
                player.bomberman = None;
            }
        }
        Ok(creature)
    }

    /// Live avatar of `player`, if it has one on the map.
    pub fn bomberman_of(&self, player: u8) -> Option<&Creature> {
        let id = self.status.player(player)?.bomberman?;
        self.map.creature(id)
    }
}
