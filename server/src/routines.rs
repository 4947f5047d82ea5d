//! Monster decision policies.
//!
//! Every monster kind maps to one [`Behavior`]. A [`MonsterRoutine`] owns its
//! own movement resolver and random source and is bound to one monster for
//! that monster's lifetime. Routines only read the map; the animator hands
//! them the monster to drive and writes it back afterwards.

use crate::outbox::Outbox;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::model::{Action, Creature, EntityId, Map, MonsterKind};
use shared::mover::{tile_of, CreatureMover, MoverError, BASE_SPEED, DUMMY_THRESHOLD};
use shared::{Orientation, Point, Span, Vector2};

/// Frames a chasing monster stays dazed after running into an obstacle.
pub const STUN_FRAMES: i32 = 45;
pub const CHASE_COOLDOWN: Span = Span::from_millis(7_500);
/// Alert delay between spotting a target and charging at it.
pub const CHASE_WINDUP: Span = Span::from_millis(1_500);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FollowState {
    pub target: Option<EntityId>,
    pub allow_turn_over: bool,
    pub switch_chance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChaseState {
    pub cooldown: Span,
    pub windup: Span,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    /// Walks in random directions, turning only at tile boundaries.
    Wander,
    /// Heads for a randomly chosen, periodically re-rolled avatar.
    Follow(FollowState),
    /// Wanders until an avatar is in plain sight, then charges in a straight line.
    Chase(ChaseState),
}

impl Behavior {
    pub fn for_kind(kind: MonsterKind) -> Behavior {
        match kind {
            MonsterKind::Zombie => Behavior::Wander,
            MonsterKind::Mummy => Behavior::Follow(FollowState {
                target: None,
                allow_turn_over: false,
                switch_chance: 0.10,
            }),
            MonsterKind::Chicken => Behavior::Chase(ChaseState {
                cooldown: Span::ZERO,
                windup: Span::ZERO,
            }),
        }
    }
}

#[derive(Debug)]
pub struct MonsterRoutine {
    behavior: Behavior,
    mover: CreatureMover,
    rng: StdRng,
    direction: Orientation,
    changed_tile: bool,
}

fn is_valid_target(creature: &Creature) -> bool {
    creature.as_bomberman().is_some() && !creature.is_dead() && !creature.is_invulnerable()
}

fn manhattan(a: Point, b: Point) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

impl MonsterRoutine {
    /// Binds a routine to `monster`. Returns `None` for avatars.
    pub fn new(map: &Map, monster: &Creature, seed: u64) -> Option<Self> {
        let kind = monster.as_monster()?.kind;
        let mut mover = CreatureMover::new();
        mover.set_active(map, monster.position);
        Some(MonsterRoutine {
            behavior: Behavior::for_kind(kind),
            mover,
            rng: StdRng::seed_from_u64(seed),
            direction: Orientation::Bottom,
            changed_tile: false,
        })
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn direction(&self) -> Orientation {
        self.direction
    }

    /// Runs one step of the policy for `monster`.
    pub fn execute(
        &mut self,
        map: &Map,
        monster: &mut Creature,
        elapsed: Span,
        out: &mut Outbox,
    ) -> Result<(), MoverError> {
        match self.behavior {
            Behavior::Wander => self.wander(map, monster, elapsed, out),
            Behavior::Follow(state) => self.follow(map, monster, state, elapsed, out),
            Behavior::Chase(state) => self.chase(map, monster, state, elapsed, out),
        }
    }

    fn wander(
        &mut self,
        map: &Map,
        monster: &mut Creature,
        elapsed: Span,
        out: &mut Outbox,
    ) -> Result<(), MoverError> {
        if self.changed_tile || monster.sprite.action == Action::Idle {
            let direction = self.pick_forward();
            self.go(map, monster, direction, Action::Walk, out)?;
        }
        self.step(map, monster, elapsed, out)
    }

    fn follow(
        &mut self,
        map: &Map,
        monster: &mut Creature,
        mut state: FollowState,
        elapsed: Span,
        out: &mut Outbox,
    ) -> Result<(), MoverError> {
        if self.changed_tile || monster.sprite.action == Action::Idle {
            let valid = state
                .target
                .and_then(|id| map.creature(id))
                .map_or(false, is_valid_target);
            if !valid || self.rng.gen::<f64>() < state.switch_chance {
                let candidates: Vec<EntityId> = map.bombermen().map(|c| c.id).collect();
                state.target = if candidates.is_empty() {
                    None
                } else {
                    Some(candidates[self.rng.gen_range(0..candidates.len())])
                };
            }

            let direction = match state.target.and_then(|id| map.creature(id)) {
                Some(target) => self.pick_shortest(
                    tile_of(monster.position),
                    tile_of(target.position),
                    state.allow_turn_over,
                ),
                None => self.pick_forward(),
            };
            self.go(map, monster, direction, Action::Walk, out)?;
        }
        self.behavior = Behavior::Follow(state);
        self.step(map, monster, elapsed, out)
    }

    fn chase(
        &mut self,
        map: &Map,
        monster: &mut Creature,
        mut state: ChaseState,
        elapsed: Span,
        out: &mut Outbox,
    ) -> Result<(), MoverError> {
        state.cooldown -= elapsed;
        let result = self.chase_step(map, monster, &mut state, elapsed, out);
        self.behavior = Behavior::Chase(state);
        result
    }

    fn chase_step(
        &mut self,
        map: &Map,
        monster: &mut Creature,
        state: &mut ChaseState,
        elapsed: Span,
        out: &mut Outbox,
    ) -> Result<(), MoverError> {
        let action = monster.sprite.action;
        if action == Action::Stun && monster.sprite.frame < STUN_FRAMES {
            return Ok(());
        }

        if action == Action::Special {
            if state.windup.is_positive() {
                state.windup -= elapsed;
            } else {
                Self::start_animation(monster, Action::Run, out);
            }
            return Ok(());
        }

        if action == Action::Run {
            let next = tile_of(monster.position).offset(self.direction);
            if !self.mover.is_pathable(map, next) {
                Self::start_animation(monster, Action::Stun, out);
            }
        } else if self.changed_tile || action == Action::Stun || action == Action::Idle {
            if !state.cooldown.is_positive() {
                self.try_chase(map, monster, state, out)?;
            }
            if monster.sprite.action != Action::Special {
                let direction = self.pick_forward();
                self.go(map, monster, direction, Action::Walk, out)?;
            }
        }

        if monster.sprite.action != Action::Special {
            let factor = if monster.sprite.action == Action::Run {
                2.0
            } else {
                1.0
            };
            if let Some(m) = monster.as_monster_mut() {
                m.speed_factor = factor;
            }
            self.step(map, monster, elapsed, out)?;
        }
        Ok(())
    }

    fn try_chase(
        &mut self,
        map: &Map,
        monster: &mut Creature,
        state: &mut ChaseState,
        out: &mut Outbox,
    ) -> Result<(), MoverError> {
        let start = tile_of(monster.position);
        let sighted = map
            .bombermen()
            .filter(|b| is_valid_target(b))
            .find(|b| self.has_line_of_sight(map, start, tile_of(b.position)))
            .map(|b| b.position);

        if let Some(target) = sighted {
            state.cooldown = CHASE_COOLDOWN;
            state.windup = CHASE_WINDUP;
            let direction = Orientation::of(Vector2::new(
                target.x - monster.position.x,
                target.y - monster.position.y,
            ));
            // Tiny velocity so clients turn the sprite without moving it.
            monster.velocity = direction.offset_vector().scale(DUMMY_THRESHOLD);
            self.go(map, monster, direction, Action::Special, out)?;
            out.creature_position(monster);
        }
        Ok(())
    }

    /// Same row or column with every tile in between walkable.
    fn has_line_of_sight(&self, map: &Map, start: Point, goal: Point) -> bool {
        if start == goal || (start.x != goal.x && start.y != goal.y) {
            return false;
        }
        let (dx, dy) = ((goal.x - start.x).signum(), (goal.y - start.y).signum());
        let mut p = start;
        loop {
            if !self.mover.is_pathable(map, p) {
                return false;
            }
            if p == goal {
                return true;
            }
            p = Point::new(p.x + dx, p.y + dy);
        }
    }

    /// Advances the monster along its current direction at full speed.
    fn step(
        &mut self,
        map: &Map,
        monster: &mut Creature,
        elapsed: Span,
        out: &mut Outbox,
    ) -> Result<(), MoverError> {
        self.mover.set_active(map, monster.position);
        monster.velocity = self
            .direction
            .offset_vector()
            .scale(monster.speed() * BASE_SPEED);
        self.mover
            .move_by(map, monster.velocity.scale(elapsed.as_secs_f32()))?;
        monster.position = self.mover.position()?;
        monster.update_orientation();
        out.creature_position(monster);
        self.changed_tile = self.mover.changed_tile();
        Ok(())
    }

    /// Turns towards `direction` from the center of the current tile.
    fn go(
        &mut self,
        map: &Map,
        monster: &mut Creature,
        direction: Orientation,
        action: Action,
        out: &mut Outbox,
    ) -> Result<(), MoverError> {
        self.direction = direction;
        self.mover.set_active(map, monster.position);
        self.mover
            .move_to(map, tile_of(monster.position).to_vector())?;
        monster.position = self.mover.position()?;
        Self::start_animation(monster, action, out);
        self.changed_tile = false;
        Ok(())
    }

    fn start_animation(monster: &mut Creature, action: Action, out: &mut Outbox) {
        if monster.sprite.action != action {
            monster.sprite.begin(action);
            out.creature_animation(monster);
        }
    }

    fn pick_random(&mut self, list: &[Orientation]) -> Orientation {
        if list.is_empty() {
            self.direction
        } else {
            list[self.rng.gen_range(0..list.len())]
        }
    }

    /// Any walkable direction except straight back, unless back is the only way.
    fn pick_forward(&mut self) -> Orientation {
        let available = self.mover.available_orientations().to_vec();
        let opposite = self.direction.opposite();
        let forward: Vec<Orientation> = available
            .iter()
            .copied()
            .filter(|&o| o != opposite)
            .collect();
        if !forward.is_empty() {
            self.pick_random(&forward)
        } else if available.contains(&opposite) {
            opposite
        } else {
            self.direction
        }
    }

    /// Walkable direction whose next tile is closest to `goal`; ties are a coin flip.
    fn pick_shortest(&mut self, start: Point, goal: Point, allow_turn_over: bool) -> Orientation {
        let available = self.mover.available_orientations().to_vec();
        let allow_turn_over = allow_turn_over || available.len() == 1;
        let opposite = self.direction.opposite();
        let mut shortest = self.direction;
        let mut lowest = i32::MAX;
        for &o in &available {
            if !allow_turn_over && o == opposite {
                continue;
            }
            let distance = manhattan(start.offset(o), goal);
            if distance < lowest || (distance == lowest && self.rng.gen_bool(0.5)) {
                lowest = distance;
                shortest = o;
            }
        }
        shortest
    }
}
