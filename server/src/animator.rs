//! Authoritative per-tick rules of a running level.
//!
//! The animator owns no world state of its own besides bookkeeping: it
//! mutates the [`Game`] it is handed and records every visible change in an
//! [`Outbox`]. Removals and spawns found while iterating are queued and
//! applied in batches so the map is never modified under an iterator.

use crate::game::Game;
use crate::outbox::Outbox;
use crate::routines::MonsterRoutine;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::blast::{BlastError, BlastMapper};
use shared::model::{
    Action, Blast, Bomb, BombKind, Creature, EntityId, MapError, Mode, Object, ObjectKind, Player,
    PowerUpKind, Wall, MAX_PLAYERS,
};
use shared::mover::{tile_of, CreatureMover, MoverError};
use shared::protocol::{EncodeError, MessageEvent, PositionPayload};
use shared::{Point, Span};
use std::collections::HashMap;
use thiserror::Error;

/// Frames of the burn animation before a dead creature leaves the map.
pub const DEATH_FRAMES: i32 = 25;
/// Frames a hit monster stays frozen.
pub const HIT_FRAMES: i32 = 25;
/// Distance under which a monster touches an avatar.
pub const COLLISION_THRESHOLD: f32 = 0.5;
/// Round clock floor granted when a player respawns.
pub const MIN_TIME_LIMIT: Span = Span::from_millis(60_900);
/// Delay between an end condition and the end of the round.
pub const END_DELAY: Span = Span::from_secs(3);
pub const INVULNERABILITY_BONUS: Span = Span::from_secs(10);
pub const SPECIAL_BOMB_REFILL: i32 = 5;

const EXPIRED: Span = Span::from_ticks(-1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorState {
    Playing,
    /// Idle; the next level may start.
    NextLevel,
    /// Idle after every player ran out of lives.
    Wipeout,
}

#[derive(Debug, Error)]
pub enum AnimatorError {
    #[error("the animator is not playing")]
    NotPlaying,
    #[error("no spawn point left for player {0}")]
    NoSpawnPoint(u8),
    #[error("player {player} does not own bomb {bomb}")]
    NotBombOwner { player: u8, bomb: EntityId },
    #[error(transparent)]
    Map(#[from] MapError),
    #[error(transparent)]
    Mover(#[from] MoverError),
    #[error(transparent)]
    Blast(#[from] BlastError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

#[derive(Debug)]
pub struct Animator {
    state: AnimatorState,
    end_timer: Span,
    mover: CreatureMover,
    mapper: BlastMapper,
    routines: HashMap<EntityId, MonsterRoutine>,
    spawn_objects: Vec<Object>,
    spawn_creatures: Vec<Creature>,
    remove_objects: Vec<Point>,
    remove_creatures: Vec<EntityId>,
    rng: StdRng,
}

impl Default for Animator {
    fn default() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Animator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic animator for reproducible spawns and monster decisions.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Animator {
            state: AnimatorState::NextLevel,
            end_timer: Span::ZERO,
            mover: CreatureMover::new(),
            mapper: BlastMapper::new(),
            routines: HashMap::new(),
            spawn_objects: Vec::new(),
            spawn_creatures: Vec::new(),
            remove_objects: Vec::new(),
            remove_creatures: Vec::new(),
            rng,
        }
    }

    pub fn state(&self) -> AnimatorState {
        self.state
    }

    /// Whether the round is winding down after an end condition.
    pub fn is_ending(&self) -> bool {
        self.end_timer.is_positive()
    }

    /// Starts the loaded level by placing every active player on a spawn point.
    pub fn begin(&mut self, game: &mut Game, out: &mut Outbox) -> Result<(), AnimatorError> {
        if self.state == AnimatorState::Playing {
            return Ok(());
        }
        self.state = AnimatorState::Playing;
        self.end_timer = Span::ZERO;
        self.routines.clear();
        self.spawn_players(game, out)
    }

    pub fn animate(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
        elapsed: Span,
    ) -> Result<(), AnimatorError> {
        if self.state != AnimatorState::Playing {
            return Err(AnimatorError::NotPlaying);
        }
        let critical = self.end_timer == Span::ZERO;

        self.update_timed_objects(game, elapsed);
        self.cleanup_objects(game, out)?;
        self.spawn_pending_objects(game, out)?;

        if critical {
            self.update_time_limit(game, out, elapsed)?;
            loop {
                let next = game
                    .map
                    .objects()
                    .find(|o| o.as_bomb().map_or(false, |b| b.countdown.timer == Span::ZERO))
                    .map(|o| o.position);
                let Some(p) = next else { break };
                self.kaboom(game, out, Some(p))?;
            }
        }

        game.map.sort_creatures();
        for id in game.map.creature_ids() {
            self.update_creature(game, out, id, elapsed, critical)?;
        }
        self.cleanup_objects(game, out)?;
        self.cleanup_creatures(game, out)?;
        self.spawn_pending_creatures(game, out)?;

        if self.end_timer.is_positive() {
            self.end_timer -= elapsed;
            if !self.end_timer.is_positive() {
                self.end_timer = Span::ZERO;
                self.end_round(game, out);
            }
        } else {
            self.check_end_condition(game, out);
        }
        Ok(())
    }

    /// Applies a client-reported position. Only legal moves are broadcast.
    pub fn move_player(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
        player: u8,
        payload: PositionPayload,
    ) -> Result<(), AnimatorError> {
        let Some(id) = self.living_bomberman(game, player) else {
            return Ok(());
        };
        let Some(creature) = game.map.creature(id) else {
            return Ok(());
        };
        let mut velocity = payload.velocity();
        if !velocity.is_zero() {
            velocity = velocity.normalize().scale(creature.speed());
        }
        let destination = payload.position();

        self.mover.set_active(&game.map, creature.position);
        self.mover.move_to(&game.map, destination)?;
        let legal = self.mover.is_legal();
        if !legal {
            self.mover.rollback(&game.map)?;
        }

        if let Some(creature) = game.map.creature_mut(id) {
            creature.velocity = velocity;
            creature.update_orientation();
            if legal {
                creature.position = destination;
                out.creature_position(creature);
            }
        }
        Ok(())
    }

    /// Drops a bomb under the player's avatar if the tile, stock and cap allow it.
    pub fn place_bomb(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
        player: u8,
        kind: BombKind,
    ) -> Result<(), AnimatorError> {
        let Some(id) = self.living_bomberman(game, player) else {
            return Ok(());
        };
        let Some((tile, bombs, power, stock)) = game.map.creature(id).and_then(|c| {
            c.as_bomberman()
                .map(|b| (tile_of(c.position), b.bombs, b.power, b.stock(kind)))
        }) else {
            return Ok(());
        };
        if game.map.object(tile).is_some() || stock <= 0 {
            return Ok(());
        }
        let placed = game
            .map
            .objects()
            .filter(|o| o.as_bomb().map_or(false, |b| b.owner == id))
            .count();
        if placed >= bombs.max(0) as usize {
            return Ok(());
        }

        self.spawn_objects
            .push(Object::bomb(tile, kind, id, power, Bomb::fuse_for(kind)));
        self.spawn_pending_objects(game, out)?;

        if let Some(creature) = game.map.creature_mut(id) {
            if let Some(b) = creature.as_bomberman_mut() {
                b.use_stock(kind);
            }
            out.creature_state(creature);
        }
        Ok(())
    }

    /// Zeroes the fuse of a bomb owned by the player's avatar.
    pub fn detonate_bomb(
        &mut self,
        game: &mut Game,
        player: u8,
        bomb: EntityId,
    ) -> Result<(), AnimatorError> {
        let Some(id) = self.living_bomberman(game, player) else {
            return Ok(());
        };
        let position = shared::model::object::position_of(bomb);
        let Some(ObjectKind::Bomb(b)) = game.map.object_mut(position).map(|o| &mut o.kind) else {
            return Ok(());
        };
        if b.owner != id {
            return Err(AnimatorError::NotBombOwner { player, bomb });
        }
        b.countdown.timer = Span::ZERO;
        Ok(())
    }

    fn living_bomberman(&self, game: &Game, player: u8) -> Option<EntityId> {
        if self.state != AnimatorState::Playing {
            return None;
        }
        game.bomberman_of(player)
            .filter(|c| !c.is_dead())
            .map(|c| c.id)
    }

    fn spawn_players(&mut self, game: &mut Game, out: &mut Outbox) -> Result<(), AnimatorError> {
        let mut points = game.spawn_points();
        for slot in 0..MAX_PLAYERS as u8 {
            let eligible = game
                .status
                .player(slot)
                .map_or(false, |p| p.playing && !p.game_over);
            if !eligible {
                continue;
            }
            if points.is_empty() {
                return Err(AnimatorError::NoSpawnPoint(slot));
            }
            let point = points.remove(self.rng.gen_range(0..points.len()));
            let id = game.map.generate_id();
            if let Some(player) = game.status.player_mut(slot) {
                player.waiting = false;
                player.bomberman = Some(id);
                out.player_state(player);
            }
            debug!("Spawning player {} at ({}, {})", slot, point.x, point.y);
            self.spawn_creatures
                .push(Creature::bomberman(id, slot, point.to_vector()));
        }
        self.spawn_pending_creatures(game, out)
    }

    fn update_timed_objects(&mut self, game: &mut Game, elapsed: Span) {
        for object in game.map.objects_mut() {
            let expired = match object.countdown_mut() {
                Some(c) if c.timer.is_positive() => {
                    c.timer = c.timer.saturating_countdown(elapsed);
                    false
                }
                Some(c) => {
                    c.timer = Span::ZERO;
                    true
                }
                None => false,
            };
            if !expired {
                continue;
            }
            let position = object.position;
            match &mut object.kind {
                ObjectKind::Bonus(_) | ObjectKind::PowerUp(_) | ObjectKind::Blast(_) => {
                    self.remove_objects.push(position);
                }
                ObjectKind::Wall(wall) if wall.destroying => {
                    self.remove_objects.push(position);
                    if let Some(item) = wall.hidden_item.take() {
                        self.spawn_objects.push(*item);
                    }
                }
                _ => {}
            }
        }
    }

    fn update_time_limit(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
        elapsed: Span,
    ) -> Result<(), AnimatorError> {
        if !game.status.time_limit.is_positive() {
            return Ok(());
        }
        game.status.time_limit -= elapsed;
        if game.status.time_limit.is_positive() {
            return Ok(());
        }

        info!("Time up on round {}", game.status.round());
        game.status.time_limit = Span::ZERO;
        out.push(MessageEvent::TimeUp);
        let bombermen: Vec<EntityId> = game.map.bombermen().map(|c| c.id).collect();
        for id in bombermen {
            if let Some(c) = game.map.creature_mut(id) {
                if c.is_invulnerable() {
                    c.invulnerability = Span::ZERO;
                    out.creature_state(c);
                }
            }
        }
        self.kaboom(game, out, None)
    }

    /// Detonates the bomb at `origin`, or the whole map when there is none,
    /// resolving chain reactions before any blast is placed.
    fn kaboom(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
        origin: Option<Point>,
    ) -> Result<(), AnimatorError> {
        match origin {
            Some(p) => {
                let bomb = expire_bomb(game, p)?;
                self.remove_objects.push(p);
                self.mapper.start(&game.map, p, &bomb)?;
                if let Some(object) = game.map.object(p) {
                    out.destroy_object(object);
                }
            }
            None => self.mapper.nuke(&game.map)?,
        }

        loop {
            let chained: Vec<Point> = game
                .map
                .objects()
                .filter(|o| {
                    o.as_bomb().map_or(false, |b| !b.countdown.timer.is_negative())
                        && self.mapper.is_hit(o.position)
                })
                .map(|o| o.position)
                .collect();
            if chained.is_empty() {
                break;
            }
            for p in chained {
                let bomb = expire_bomb(game, p)?;
                self.remove_objects.push(p);
                self.mapper.add(&game.map, p, &bomb)?;
            }
        }

        for object in game.map.objects_mut() {
            if !self.mapper.is_hit(object.position) {
                continue;
            }
            match &mut object.kind {
                ObjectKind::Bonus(_) | ObjectKind::PowerUp(_) => {
                    self.remove_objects.push(object.position);
                    out.destroy_object(object);
                }
                ObjectKind::Wall(wall) if wall.destructible && !wall.destroying => {
                    wall.destroy(Wall::DESTROY_TIMER);
                    out.destroy_object(object);
                }
                _ => {}
            }
        }
        self.cleanup_objects(game, out)?;

        for p in self.mapper.hit_points() {
            if game.map.object(p).is_none() {
                self.spawn_objects
                    .push(self.mapper.make_blast(Blast::DEFAULT_TIMER, p));
            }
        }
        self.spawn_pending_objects(game, out)?;
        self.mapper.clear();
        Ok(())
    }

    fn update_creature(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
        id: EntityId,
        elapsed: Span,
        critical: bool,
    ) -> Result<(), AnimatorError> {
        let Some(creature) = game.map.creature_mut(id) else {
            return Ok(());
        };
        creature.sprite.tick();
        creature.invulnerability = creature.invulnerability.saturating_countdown(elapsed);

        if creature.is_dead() {
            if creature.sprite.frame >= DEATH_FRAMES && !self.remove_creatures.contains(&id) {
                let position = creature.position;
                self.remove_creatures.push(id);
                if game.status.mode() == Mode::Cooperation {
                    if let Some(player) = game.status.player_of_bomberman(id) {
                        self.respawn_player(game, out, player, position);
                    }
                }
            }
            return Ok(());
        }

        let tile = tile_of(creature.position);
        let is_bomberman = creature.as_bomberman().is_some();
        let blast_owner = game.map.object(tile).and_then(|o| match &o.kind {
            ObjectKind::Blast(b) => Some(b.owner),
            _ => None,
        });

        if is_bomberman {
            self.check_pickup(game, out, id, tile);
            if critical {
                self.check_hostile_collision(game, out, id);
            }
        } else {
            self.move_monster(game, out, id, elapsed)?;
        }

        if let Some(owner) = blast_owner {
            let vulnerable = game
                .map
                .creature(id)
                .map_or(false, |c| !c.is_invulnerable() && !c.is_dead());
            if vulnerable && critical {
                self.damage_creature(game, out, id, Some(owner), 1, true);
            }
        }
        Ok(())
    }

    /// Spends one life to bring the player back where they died, or ends their game.
    fn respawn_player(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
        slot: u8,
        position: shared::Vector2,
    ) {
        let continuable = game.status.continuable;
        let Some(player) = game.status.player_mut(slot) else {
            return;
        };
        player.stock = (player.stock - 1).max(0);
        if player.stock > 0 {
            out.player_state(player);
            let id = game.map.generate_id();
            player.bomberman = Some(id);
            self.spawn_creatures
                .push(Creature::bomberman(id, slot, position));

            let limit = game.status.time_limit;
            if !limit.is_negative() && limit < MIN_TIME_LIMIT {
                game.status.time_limit = MIN_TIME_LIMIT;
                out.time_limit(MIN_TIME_LIMIT);
            }
        } else {
            info!("Player {} is out of lives", slot);
            player.waiting = continuable;
            player.game_over = true;
            out.player_state(player);
        }
    }

    fn check_pickup(&mut self, game: &mut Game, out: &mut Outbox, id: EntityId, tile: Point) {
        if self.remove_objects.contains(&tile) {
            return;
        }
        let Some(object) = game.map.object(tile).cloned() else {
            return;
        };
        if !matches!(object.kind, ObjectKind::Bonus(_) | ObjectKind::PowerUp(_)) {
            return;
        }
        let Some(creature) = game.map.creature_mut(id) else {
            return;
        };
        let Some(slot) = creature.as_bomberman().map(|b| b.player) else {
            return;
        };

        if let Some(player) = game.status.player_mut(slot) {
            match &object.kind {
                ObjectKind::Bonus(bonus) => player.score += bonus.value(),
                ObjectKind::PowerUp(power_up) => apply_power_up(power_up.kind, player, creature),
                _ => {}
            }
            out.player_state(player);
            out.creature_state(creature);
        }
        self.remove_objects.push(tile);
        out.picked_object(&object);
    }

    fn check_hostile_collision(&mut self, game: &mut Game, out: &mut Outbox, id: EntityId) {
        let monsters: Vec<shared::Vector2> = game
            .map
            .monsters()
            .filter(|m| !m.is_dead())
            .map(|m| m.position)
            .collect();
        for monster in monsters {
            let touching = game.map.creature(id).map_or(false, |b| {
                !b.is_dead()
                    && !b.is_invulnerable()
                    && b.position.distance(&monster) < COLLISION_THRESHOLD
            });
            if touching {
                self.damage_creature(game, out, id, None, 1, false);
            }
        }
    }

    fn move_monster(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
        id: EntityId,
        elapsed: Span,
    ) -> Result<(), AnimatorError> {
        let Some(monster) = game.map.creature_mut(id) else {
            return Ok(());
        };
        if monster.sprite.action == Action::Hit {
            if monster.sprite.frame >= HIT_FRAMES {
                monster.sprite.begin(Action::Idle);
                out.creature_animation(monster);
            }
            return Ok(());
        }

        let mut monster = monster.clone();
        if !self.routines.contains_key(&id) {
            let seed = self.rng.gen();
            match MonsterRoutine::new(&game.map, &monster, seed) {
                Some(routine) => {
                    self.routines.insert(id, routine);
                }
                None => return Ok(()),
            }
        }
        if let Some(routine) = self.routines.get_mut(&id) {
            routine.execute(&game.map, &mut monster, elapsed, out)?;
        }
        if let Some(slot) = game.map.creature_mut(id) {
            *slot = monster;
        }
        Ok(())
    }

    /// Hurts a creature. A monster killed by a blast credits the avatar that owns it.
    fn damage_creature(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
        id: EntityId,
        cause: Option<EntityId>,
        amount: i32,
        grant_invulnerability: bool,
    ) {
        let Some(creature) = game.map.creature_mut(id) else {
            return;
        };
        creature.damage(amount, grant_invulnerability);
        out.creature_state(creature);

        let monster_value = creature
            .as_monster()
            .map(|m| m.kind.descriptor().value);
        if creature.is_dead() {
            creature.velocity = shared::Vector2::ZERO;
            out.creature_position(creature);
            creature.sprite.begin(Action::Burn);
            out.creature_animation(creature);
            debug!("{} {} died", creature.name(), id);

            if let (Some(value), Some(owner)) = (monster_value, cause) {
                if let Some(slot) = game.status.player_of_bomberman(owner) {
                    if let Some(player) = game.status.player_mut(slot) {
                        player.score += value;
                        out.player_state(player);
                    }
                }
            }
        } else if monster_value.is_some() {
            creature.velocity = shared::Vector2::ZERO;
            out.creature_position(creature);
            creature.sprite.begin(Action::Hit);
            out.creature_animation(creature);
        }
    }

    fn end_round(&mut self, game: &mut Game, out: &mut Outbox) {
        if game.status.mode() == Mode::Versus {
            self.state = AnimatorState::NextLevel;
            for slot in 0..MAX_PLAYERS as u8 {
                let alive = game.map.bomberman_of(slot).map_or(false, |b| !b.is_dead());
                if let Some(player) = game.status.player_mut(slot) {
                    if alive && player.playing {
                        player.wins += 1;
                        out.player_state(player);
                    }
                }
            }
        } else {
            let anyone_left = game
                .status
                .players
                .iter()
                .any(|p| p.playing && !p.game_over);
            self.state = if anyone_left {
                AnimatorState::NextLevel
            } else {
                AnimatorState::Wipeout
            };
        }
        info!("Round {} finished: {:?}", game.status.round(), self.state);
    }

    fn check_end_condition(&mut self, game: &mut Game, out: &mut Outbox) {
        let ended = match game.status.mode() {
            Mode::Versus => game.map.bombermen().filter(|b| !b.is_dead()).count() <= 1,
            Mode::Cooperation => {
                let players_left = game
                    .status
                    .players
                    .iter()
                    .any(|p| p.playing && !p.game_over);
                let monsters_left = game.map.monsters().any(|m| !m.is_dead());
                !players_left || !monsters_left
            }
        };
        if ended {
            self.end_timer = END_DELAY;
            game.status.time_limit = Span::from_secs(-1);
            out.time_limit(game.status.time_limit);
        }
    }

    fn cleanup_objects(&mut self, game: &mut Game, out: &mut Outbox) -> Result<(), AnimatorError> {
        for p in std::mem::take(&mut self.remove_objects) {
            if let Some(object) = game.map.object(p) {
                out.despawn_object(object);
                game.map.remove_object(p)?;
            }
        }
        Ok(())
    }

    fn cleanup_creatures(&mut self, game: &mut Game, out: &mut Outbox) -> Result<(), AnimatorError> {
        for id in std::mem::take(&mut self.remove_creatures) {
            if let Some(creature) = game.map.creature(id) {
                out.despawn_creature(creature);
                game.remove_creature(id)?;
                self.routines.remove(&id);
            }
        }
        Ok(())
    }

    fn spawn_pending_objects(&mut self, game: &mut Game, out: &mut Outbox) -> Result<(), AnimatorError> {
        for object in std::mem::take(&mut self.spawn_objects) {
            out.spawn_object(&object)?;
            game.map.add_object(object)?;
        }
        Ok(())
    }

    fn spawn_pending_creatures(
        &mut self,
        game: &mut Game,
        out: &mut Outbox,
    ) -> Result<(), AnimatorError> {
        for creature in std::mem::take(&mut self.spawn_creatures) {
            out.spawn_creature(&creature);
            game.map.add_creature(creature)?;
        }
        Ok(())
    }
}

/// Marks the bomb at `p` as detonated and returns a copy for blast mapping.
fn expire_bomb(game: &mut Game, p: Point) -> Result<Bomb, AnimatorError> {
    match game.map.object_mut(p).map(|o| &mut o.kind) {
        Some(ObjectKind::Bomb(bomb)) => {
            bomb.countdown.timer = EXPIRED;
            Ok(bomb.clone())
        }
        _ => Err(MapError::ObjectAbsent(p).into()),
    }
}

fn apply_power_up(kind: PowerUpKind, player: &mut Player, creature: &mut Creature) {
    if kind == PowerUpKind::ExtraLife {
        player.stock += 1;
        return;
    }
    if kind == PowerUpKind::Invulnerability {
        creature.invulnerability = INVULNERABILITY_BONUS;
        return;
    }
    let Some(b) = creature.as_bomberman_mut() else {
        return;
    };
    match kind {
        PowerUpKind::Bomb => b.add_bomb(),
        PowerUpKind::FullBomb => (0..3).for_each(|_| b.add_bomb()),
        PowerUpKind::Power => b.add_power(),
        PowerUpKind::FullPower => (0..3).for_each(|_| b.add_power()),
        PowerUpKind::RemoteBomb => b.refill(BombKind::Remote, SPECIAL_BOMB_REFILL),
        PowerUpKind::SplitBomb => b.refill(BombKind::Split, SPECIAL_BOMB_REFILL),
        PowerUpKind::Speed => b.add_boots(),
        PowerUpKind::FullSpeed => (0..2).for_each(|_| b.add_boots()),
        PowerUpKind::Weaken => b.nerf(),
        PowerUpKind::ExtraLife | PowerUpKind::Invulnerability => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::model::{BlastKind, Level, MonsterKind, PowerUp};
    use shared::protocol::MapAction;
    use shared::{Orientation, Vector2};

    const TICK: Span = Span::from_ticks(Span::TICKS_PER_SECOND / 30);

    /// An open level with spawn points and a zombie sealed in a corner.
    fn open_level(spawns: &[(i32, i32)]) -> Level {
        let mut level = Level::empty(1, 11, 11, 0).unwrap();
        for &(x, y) in spawns {
            level
                .map
                .add_object(Object::spawn_point(Point::new(x, y)))
                .unwrap();
        }
        level
            .map
            .add_object(Object::wall(Point::new(1, 0), false, None))
            .unwrap();
        level
            .map
            .add_object(Object::wall(Point::new(0, 1), false, None))
            .unwrap();
        let id = level.map.generate_id();
        level
            .map
            .add_creature(Creature::monster(id, MonsterKind::Zombie, Vector2::ZERO))
            .unwrap();
        level.time_limit = Level::DEFAULT_TIME_LIMIT;
        level
    }

    fn setup(mode: Mode, players: usize, spawns: &[(i32, i32)]) -> (Game, Animator, Outbox) {
        let mut game = Game::new();
        game.status.set_mode(mode).unwrap();
        for slot in 0..players {
            game.status.players[slot].join(&format!("p{}", slot), slot == 0, false);
        }
        game.load_level(open_level(spawns)).unwrap();
        let mut animator = Animator::with_seed(7);
        let mut out = Outbox::new();
        animator.begin(&mut game, &mut out).unwrap();
        (game, animator, out)
    }

    fn bomberman_id(game: &Game, slot: u8) -> EntityId {
        game.status.players[slot as usize].bomberman.unwrap()
    }

    fn make_vulnerable(game: &mut Game, slot: u8) {
        let id = bomberman_id(game, slot);
        game.map.creature_mut(id).unwrap().invulnerability = Span::ZERO;
    }

    fn kill(game: &mut Game, animator: &mut Animator, out: &mut Outbox, slot: u8) {
        let id = bomberman_id(game, slot);
        animator.damage_creature(game, out, id, None, 1, true);
        assert!(game.map.creature(id).unwrap().is_dead());
    }

    fn run(game: &mut Game, animator: &mut Animator, out: &mut Outbox, ticks: usize) {
        for _ in 0..ticks {
            if animator.state() != AnimatorState::Playing {
                break;
            }
            animator.animate(game, out, TICK).unwrap();
        }
    }

    fn blast_at(game: &Game, x: i32, y: i32) -> Option<(BlastKind, Orientation)> {
        match game.map.object(Point::new(x, y)).map(|o| &o.kind) {
            Some(ObjectKind::Blast(b)) => Some((b.kind, b.orientation)),
            _ => None,
        }
    }

    #[test]
    fn test_begin_spawns_players_on_distinct_points() {
        let (game, animator, out) = setup(Mode::Versus, 2, &[(2, 2), (8, 8)]);
        assert_eq!(animator.state(), AnimatorState::Playing);
        let a = game.map.creature(bomberman_id(&game, 0)).unwrap().position;
        let b = game.map.creature(bomberman_id(&game, 1)).unwrap().position;
        assert_ne!(a, b);
        assert!(!game.status.players[0].waiting);
        assert!(out
            .messages()
            .iter()
            .any(|m| matches!(m, MessageEvent::MapEvent(e) if e.action == MapAction::Spawn)));
    }

    #[test]
    fn test_begin_without_enough_spawn_points_fails() {
        let mut game = Game::new();
        game.status.set_mode(Mode::Versus).unwrap();
        game.status.players[0].join("a", true, false);
        game.status.players[1].join("b", false, false);
        game.load_level(open_level(&[(2, 2)])).unwrap();
        let mut animator = Animator::with_seed(1);
        let result = animator.begin(&mut game, &mut Outbox::new());
        assert!(matches!(result, Err(AnimatorError::NoSpawnPoint(_))));
    }

    #[test]
    fn test_animate_requires_playing_state() {
        let mut game = Game::new();
        let mut animator = Animator::with_seed(1);
        assert_eq!(animator.state(), AnimatorState::NextLevel);
        let result = animator.animate(&mut game, &mut Outbox::new(), TICK);
        assert!(matches!(result, Err(AnimatorError::NotPlaying)));
    }

    #[test]
    fn test_bomb_blast_reaches_power_tiles() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        animator
            .place_bomb(&mut game, &mut out, 0, BombKind::Normal)
            .unwrap();
        assert!(game.map.object(Point::new(5, 5)).unwrap().as_bomb().is_some());

        let mut ticks = 0;
        while blast_at(&game, 5, 5).is_none() {
            animator.animate(&mut game, &mut out, TICK).unwrap();
            ticks += 1;
            assert!(ticks < 200, "bomb never exploded");
        }

        assert_eq!(blast_at(&game, 5, 5), Some((BlastKind::Multiple, Orientation::Bottom)));
        assert_eq!(blast_at(&game, 4, 5).map(|b| b.0), Some(BlastKind::Horizontal));
        assert_eq!(blast_at(&game, 5, 6).map(|b| b.0), Some(BlastKind::Vertical));
        assert_eq!(blast_at(&game, 3, 5), Some((BlastKind::Edge, Orientation::Left)));
        assert_eq!(blast_at(&game, 7, 5), Some((BlastKind::Edge, Orientation::Right)));
        assert_eq!(blast_at(&game, 5, 3), Some((BlastKind::Edge, Orientation::Top)));
        assert_eq!(blast_at(&game, 5, 7), Some((BlastKind::Edge, Orientation::Bottom)));
        assert!(blast_at(&game, 2, 5).is_none());
        assert!(blast_at(&game, 6, 6).is_none());

        // The avatar was still protected by its spawn grace period.
        assert!(!game.map.creature(bomberman_id(&game, 0)).unwrap().is_dead());
    }

    #[test]
    fn test_chain_reaction_and_wall_destruction() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        game.map
            .add_object(Object::bomb(Point::new(7, 5), BombKind::Normal, 99, 1, Bomb::REMOTE_TIMER))
            .unwrap();
        let item = Object::power_up(Point::new(8, 5), PowerUpKind::Power, PowerUp::DEFAULT_TIMER);
        game.map
            .add_object(Object::wall(Point::new(8, 5), true, Some(item)))
            .unwrap();

        let id = bomberman_id(&game, 0);
        let bomb_id = shared::model::object::id_of(Point::new(5, 5));
        animator
            .place_bomb(&mut game, &mut out, 0, BombKind::Normal)
            .unwrap();
        animator.detonate_bomb(&mut game, 0, bomb_id).unwrap();
        animator.animate(&mut game, &mut out, TICK).unwrap();

        // The second bomb at (7, 5) was chained and its own blast reached (8, 5).
        assert!(game.map.object(Point::new(7, 5)).map_or(false, |o| o.as_bomb().is_none()));
        let wall = game.map.object(Point::new(8, 5)).unwrap().as_wall().unwrap();
        assert!(wall.destroying);
        assert_eq!(blast_at(&game, 6, 5).map(|b| b.0), Some(BlastKind::Horizontal));
        match game.map.object(Point::new(5, 5)).map(|o| &o.kind) {
            Some(ObjectKind::Blast(b)) => assert_eq!(b.owner, id),
            other => panic!("Unexpected object {:?}", other),
        }

        // Once the wall has crumbled its hidden item appears.
        run(&mut game, &mut animator, &mut out, 20);
        assert!(matches!(
            game.map.object(Point::new(8, 5)).map(|o| &o.kind),
            Some(ObjectKind::PowerUp(_))
        ));
    }

    #[test]
    fn test_place_bomb_respects_cap_and_stock() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        let id = bomberman_id(&game, 0);

        animator
            .place_bomb(&mut game, &mut out, 0, BombKind::Remote)
            .unwrap();
        assert!(game.map.object(Point::new(5, 5)).is_none());

        animator
            .place_bomb(&mut game, &mut out, 0, BombKind::Normal)
            .unwrap();
        game.map.creature_mut(id).unwrap().position = Vector2::new(6.0, 5.0);
        animator
            .place_bomb(&mut game, &mut out, 0, BombKind::Normal)
            .unwrap();
        assert!(game.map.object(Point::new(6, 5)).is_none());

        game.map
            .creature_mut(id)
            .unwrap()
            .as_bomberman_mut()
            .unwrap()
            .add_bomb();
        animator
            .place_bomb(&mut game, &mut out, 0, BombKind::Normal)
            .unwrap();
        let bomb = game.map.object(Point::new(6, 5)).unwrap().as_bomb().unwrap();
        assert_eq!(bomb.owner, id);
        assert_eq!(bomb.power, 2);
        assert_eq!(bomb.countdown.timer, Bomb::DEFAULT_TIMER);
    }

    #[test]
    fn test_detonate_checks_ownership() {
        let (mut game, mut animator, mut out) = setup(Mode::Versus, 2, &[(2, 2), (8, 8)]);
        animator
            .place_bomb(&mut game, &mut out, 0, BombKind::Normal)
            .unwrap();
        let p = tile_of(game.map.creature(bomberman_id(&game, 0)).unwrap().position);
        let bomb = shared::model::object::id_of(p);

        let result = animator.detonate_bomb(&mut game, 1, bomb);
        assert!(matches!(result, Err(AnimatorError::NotBombOwner { player: 1, .. })));

        // Detonating a bomb that does not exist is ignored.
        assert!(animator.detonate_bomb(&mut game, 0, bomb + 1).is_ok());

        animator.detonate_bomb(&mut game, 0, bomb).unwrap();
        let timer = game.map.object(p).unwrap().as_bomb().unwrap().countdown.timer;
        assert_eq!(timer, Span::ZERO);
    }

    #[test]
    fn test_move_player_rejects_walls() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        game.map
            .add_object(Object::wall(Point::new(6, 5), false, None))
            .unwrap();
        let id = bomberman_id(&game, 0);
        out.take();

        let blocked = PositionPayload::new(Vector2::new(6.0, 5.0), Vector2::new(1.0, 0.0));
        animator.move_player(&mut game, &mut out, 0, blocked).unwrap();
        assert_eq!(game.map.creature(id).unwrap().position, Vector2::new(5.0, 5.0));
        assert!(out.is_empty());

        let free = PositionPayload::new(Vector2::new(5.0, 5.5), Vector2::new(0.0, 3.0));
        animator.move_player(&mut game, &mut out, 0, free).unwrap();
        let creature = game.map.creature(id).unwrap();
        assert_eq!(creature.position, Vector2::new(5.0, 5.5));
        assert_eq!(creature.velocity, Vector2::new(0.0, 1.0));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_pickups_apply_effects() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        let id = bomberman_id(&game, 0);
        game.map
            .add_object(Object::power_up(Point::new(5, 5), PowerUpKind::FullPower, PowerUp::DEFAULT_TIMER))
            .unwrap();
        animator.animate(&mut game, &mut out, TICK).unwrap();
        assert_eq!(
            game.map.creature(id).unwrap().as_bomberman().unwrap().power,
            5
        );
        assert!(game.map.object(Point::new(5, 5)).is_none());
        assert!(out
            .messages()
            .iter()
            .any(|m| matches!(m, MessageEvent::MapEvent(e) if e.action == MapAction::Picked)));

        game.map
            .add_object(Object::bonus(Point::new(5, 5), 4, shared::model::Bonus::DEFAULT_TIMER))
            .unwrap();
        animator.animate(&mut game, &mut out, TICK).unwrap();
        assert_eq!(game.status.players[0].score, 1000);

        game.map
            .add_object(Object::power_up(Point::new(5, 5), PowerUpKind::ExtraLife, PowerUp::DEFAULT_TIMER))
            .unwrap();
        animator.animate(&mut game, &mut out, TICK).unwrap();
        assert_eq!(game.status.players[0].stock, Player::INITIAL_STOCK + 1);
    }

    #[test]
    fn test_monster_contact_hurts_without_grace() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        make_vulnerable(&mut game, 0);
        let id = game.map.generate_id();
        let mut mummy = Creature::monster(id, MonsterKind::Mummy, Vector2::new(5.2, 5.0));
        mummy.sprite.begin(Action::Hit);
        game.map.add_creature(mummy).unwrap();

        animator.animate(&mut game, &mut out, TICK).unwrap();
        let bomberman = game.map.creature(bomberman_id(&game, 0)).unwrap();
        assert!(bomberman.is_dead());
        assert_eq!(bomberman.sprite.action, Action::Burn);
    }

    #[test]
    fn test_blast_kill_credits_bomb_owner() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        let owner = bomberman_id(&game, 0);
        let id = game.map.generate_id();
        game.map
            .add_creature(Creature::monster(id, MonsterKind::Zombie, Vector2::new(6.0, 5.0)))
            .unwrap();
        game.map
            .add_object(Object::blast(Point::new(6, 5), BlastKind::Single, Orientation::Bottom, owner, Blast::DEFAULT_TIMER))
            .unwrap();

        animator.animate(&mut game, &mut out, TICK).unwrap();
        assert!(game.map.creature(id).unwrap().is_dead());
        assert_eq!(game.status.players[0].score, MonsterKind::Zombie.descriptor().value);
    }

    #[test]
    fn test_three_deaths_end_a_cooperation_game() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        assert_eq!(game.status.players[0].stock, 3);

        for death in 1..=3 {
            kill(&mut game, &mut animator, &mut out, 0);
            run(&mut game, &mut animator, &mut out, DEATH_FRAMES as usize + 1);
            let player = &game.status.players[0];
            if death < 3 {
                assert_eq!(player.stock, 3 - death);
                assert!(!player.game_over);
                let respawned = game.map.creature(player.bomberman.unwrap()).unwrap();
                assert_eq!(respawned.position, Vector2::new(5.0, 5.0));
                assert!(!respawned.is_dead());
            } else {
                assert_eq!(player.stock, 0);
                assert!(player.game_over);
                assert!(player.waiting);
                assert!(player.bomberman.is_none());
            }
        }
        assert_eq!(game.map.bombermen().count(), 0);

        run(&mut game, &mut animator, &mut out, 200);
        assert_eq!(animator.state(), AnimatorState::Wipeout);
    }

    #[test]
    fn test_respawn_raises_low_time_limit() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        game.status.time_limit = Span::from_secs(10);
        kill(&mut game, &mut animator, &mut out, 0);
        run(&mut game, &mut animator, &mut out, DEATH_FRAMES as usize + 1);
        assert!(game.status.time_limit > Span::from_secs(60));
    }

    #[test]
    fn test_versus_survivor_gets_the_win() {
        let (mut game, mut animator, mut out) = setup(Mode::Versus, 2, &[(2, 2), (8, 8)]);
        game.status.wins_threshold = 1;
        kill(&mut game, &mut animator, &mut out, 1);

        animator.animate(&mut game, &mut out, TICK).unwrap();
        assert!(animator.is_ending());
        assert_eq!(game.status.time_limit, Span::from_secs(-1));

        run(&mut game, &mut animator, &mut out, 200);
        assert_eq!(animator.state(), AnimatorState::NextLevel);
        assert_eq!(game.status.players[0].wins, 1);
        assert_eq!(game.status.players[1].wins, 0);
        assert_eq!(game.status.winner().map(|p| p.id), Some(0));
        // No respawn in versus.
        assert!(game.status.players[1].bomberman.is_none());
    }

    #[test]
    fn test_time_up_nukes_the_map() {
        let (mut game, mut animator, mut out) = setup(Mode::Cooperation, 1, &[(5, 5)]);
        game.status.time_limit = TICK;
        animator.animate(&mut game, &mut out, TICK).unwrap();

        assert!(out.messages().contains(&MessageEvent::TimeUp));
        assert_eq!(game.status.time_limit, Span::ZERO);
        assert!(blast_at(&game, 9, 9).is_some());
        assert!(game.map.object(Point::new(1, 0)).unwrap().is_wall());
        let bomberman = game.map.creature(bomberman_id(&game, 0)).unwrap();
        assert!(bomberman.is_dead());
    }

    #[test]
    fn test_end_delay_suspends_fuses() {
        let (mut game, mut animator, mut out) = setup(Mode::Versus, 2, &[(2, 2), (8, 8)]);
        kill(&mut game, &mut animator, &mut out, 1);
        animator
            .place_bomb(&mut game, &mut out, 0, BombKind::Normal)
            .unwrap();
        let p = tile_of(game.map.creature(bomberman_id(&game, 0)).unwrap().position);
        animator
            .detonate_bomb(&mut game, 0, shared::model::object::id_of(p))
            .unwrap();
        animator.animate(&mut game, &mut out, TICK).unwrap();
        // The first tick still detonates; the end condition is detected afterwards.
        assert!(blast_at(&game, p.x, p.y).is_some());

        let (mut game, mut animator, mut out) = setup(Mode::Versus, 2, &[(2, 2), (8, 8)]);
        kill(&mut game, &mut animator, &mut out, 1);
        animator.animate(&mut game, &mut out, TICK).unwrap();
        animator
            .place_bomb(&mut game, &mut out, 0, BombKind::Normal)
            .unwrap();
        let p = tile_of(game.map.creature(bomberman_id(&game, 0)).unwrap().position);
        animator
            .detonate_bomb(&mut game, 0, shared::model::object::id_of(p))
            .unwrap();
        animator.animate(&mut game, &mut out, TICK).unwrap();
        assert!(game.map.object(p).unwrap().as_bomb().is_some());
    }
}
