//! Tile-bound objects: walls, bombs, blasts, items and spawn markers.

use crate::geometry::{Orientation, Point};
use crate::model::map::MAX_WIDTH;
use crate::time::Span;
use rand::Rng;

/// Identifier shared by objects and creatures on the wire.
pub type EntityId = u16;

/// A timer counting down to an object's expiry, plus the value it started at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub timer: Span,
    pub max_timer: Span,
}

impl Countdown {
    pub const fn new(timer: Span) -> Self {
        Countdown {
            timer,
            max_timer: timer,
        }
    }

    /// Remaining share of the timer, clamped to `0.0..=1.0`.
    pub fn progression(&self) -> f32 {
        if self.max_timer.ticks() == 0 {
            return 0.0;
        }
        (self.timer.ticks() as f64 / self.max_timer.ticks() as f64).clamp(0.0, 1.0) as f32
    }
}

byte_enum! {
    pub enum BombKind {
        Normal = 0,
        Split = 1,
        Remote = 2,
    }
}

impl BombKind {
    pub const fn slot(self) -> usize {
        self as usize
    }
}

byte_enum! {
    /// Visual classification of a blast tile.
    pub enum BlastKind {
        Multiple = 0,
        Single = 1,
        Vertical = 2,
        Horizontal = 3,
        Edge = 4,
    }
}

byte_enum! {
    pub enum PowerUpKind {
        Bomb = 0,
        FullBomb = 1,
        Power = 2,
        FullPower = 3,
        RemoteBomb = 4,
        SplitBomb = 5,
        Speed = 6,
        FullSpeed = 7,
        ExtraLife = 8,
        Invulnerability = 9,
        Weaken = 10,
    }
}

impl PowerUpKind {
    /// Weighted roll: common stat boosts first, rare specials last.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> PowerUpKind {
        const TABLE: [(f64, PowerUpKind); 10] = [
            (0.20, PowerUpKind::Bomb),
            (0.40, PowerUpKind::Power),
            (0.55, PowerUpKind::Speed),
            (0.62, PowerUpKind::FullBomb),
            (0.69, PowerUpKind::FullPower),
            (0.76, PowerUpKind::RemoteBomb),
            (0.81, PowerUpKind::SplitBomb),
            (0.86, PowerUpKind::FullSpeed),
            (0.89, PowerUpKind::ExtraLife),
            (0.94, PowerUpKind::Invulnerability),
        ];
        let roll: f64 = rng.gen();
        TABLE
            .iter()
            .find(|(threshold, _)| roll < *threshold)
            .map(|(_, kind)| *kind)
            .unwrap_or(PowerUpKind::Weaken)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wall {
    pub countdown: Countdown,
    pub destructible: bool,
    pub destroying: bool,
    pub hidden_item: Option<Box<Object>>,
}

impl Wall {
    pub const DESTROY_TIMER: Span = Span::from_millis(500);

    /// Starts the destruction animation. Only the first call has any effect.
    pub fn destroy(&mut self, timer: Span) {
        if !self.destroying {
            self.countdown = Countdown::new(timer);
            self.destroying = true;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bomb {
    pub countdown: Countdown,
    pub kind: BombKind,
    pub owner: EntityId,
    pub power: i32,
}

impl Bomb {
    pub const DEFAULT_TIMER: Span = Span::from_secs(3);
    pub const REMOTE_TIMER: Span = Span::from_secs(300);

    pub fn fuse_for(kind: BombKind) -> Span {
        match kind {
            BombKind::Remote => Self::REMOTE_TIMER,
            _ => Self::DEFAULT_TIMER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Blast {
    pub countdown: Countdown,
    pub kind: BlastKind,
    pub orientation: Orientation,
    pub owner: EntityId,
}

impl Blast {
    pub const DEFAULT_TIMER: Span = Span::from_millis(500);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bonus {
    pub countdown: Countdown,
    pub sprite_index: i32,
}

impl Bonus {
    pub const DEFAULT_TIMER: Span = Span::from_secs(15);
    pub const SHORT_TIMER: Span = Span::from_secs(9);
    const VALUES: [i32; 5] = [300, 200, 300, 500, 1000];

    pub fn value(&self) -> i32 {
        usize::try_from(self.sprite_index)
            .ok()
            .and_then(|index| Self::VALUES.get(index))
            .copied()
            .unwrap_or(0)
    }

    pub fn random_sprite<R: Rng + ?Sized>(rng: &mut R) -> i32 {
        let roll: f64 = rng.gen();
        if roll < 0.40 {
            1
        } else if roll < 0.70 {
            2
        } else if roll < 0.85 {
            3
        } else {
            4
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerUp {
    pub countdown: Countdown,
    pub kind: PowerUpKind,
}

impl PowerUp {
    pub const DEFAULT_TIMER: Span = Span::from_secs(30);
    pub const SHORT_TIMER: Span = Span::from_secs(15);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectKind {
    Wall(Wall),
    Bomb(Bomb),
    Blast(Blast),
    Bonus(Bonus),
    PowerUp(PowerUp),
    SpawnPoint,
}

/// An object pinned to one tile. Its identifier is derived from the tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub position: Point,
    pub kind: ObjectKind,
}

impl Object {
    pub fn wall(position: Point, destructible: bool, hidden_item: Option<Object>) -> Self {
        Object {
            position,
            kind: ObjectKind::Wall(Wall {
                countdown: Countdown::new(Span::ONE_TICK),
                destructible,
                destroying: false,
                hidden_item: hidden_item.map(Box::new),
            }),
        }
    }

    pub fn bomb(position: Point, kind: BombKind, owner: EntityId, power: i32, timer: Span) -> Self {
        Object {
            position,
            kind: ObjectKind::Bomb(Bomb {
                countdown: Countdown::new(timer),
                kind,
                owner,
                power,
            }),
        }
    }

    pub fn blast(
        position: Point,
        kind: BlastKind,
        orientation: Orientation,
        owner: EntityId,
        timer: Span,
    ) -> Self {
        Object {
            position,
            kind: ObjectKind::Blast(Blast {
                countdown: Countdown::new(timer),
                kind,
                orientation,
                owner,
            }),
        }
    }

    pub fn bonus(position: Point, sprite_index: i32, timer: Span) -> Self {
        Object {
            position,
            kind: ObjectKind::Bonus(Bonus {
                countdown: Countdown::new(timer),
                sprite_index,
            }),
        }
    }

    pub fn power_up(position: Point, kind: PowerUpKind, timer: Span) -> Self {
        Object {
            position,
            kind: ObjectKind::PowerUp(PowerUp {
                countdown: Countdown::new(timer),
                kind,
            }),
        }
    }

    pub fn spawn_point(position: Point) -> Self {
        Object {
            position,
            kind: ObjectKind::SpawnPoint,
        }
    }

    pub fn id(&self) -> EntityId {
        id_of(self.position)
    }

    pub fn countdown(&self) -> Option<&Countdown> {
        match &self.kind {
            ObjectKind::Wall(w) => Some(&w.countdown),
            ObjectKind::Bomb(b) => Some(&b.countdown),
            ObjectKind::Blast(b) => Some(&b.countdown),
            ObjectKind::Bonus(b) => Some(&b.countdown),
            ObjectKind::PowerUp(p) => Some(&p.countdown),
            ObjectKind::SpawnPoint => None,
        }
    }

    pub fn countdown_mut(&mut self) -> Option<&mut Countdown> {
        match &mut self.kind {
            ObjectKind::Wall(w) => Some(&mut w.countdown),
            ObjectKind::Bomb(b) => Some(&mut b.countdown),
            ObjectKind::Blast(b) => Some(&mut b.countdown),
            ObjectKind::Bonus(b) => Some(&mut b.countdown),
            ObjectKind::PowerUp(p) => Some(&mut p.countdown),
            ObjectKind::SpawnPoint => None,
        }
    }

    pub fn as_bomb(&self) -> Option<&Bomb> {
        match &self.kind {
            ObjectKind::Bomb(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_wall(&self) -> Option<&Wall> {
        match &self.kind {
            ObjectKind::Wall(w) => Some(w),
            _ => None,
        }
    }

    pub fn is_wall(&self) -> bool {
        matches!(self.kind, ObjectKind::Wall(_))
    }

    /// Walls and bombs stop creatures.
    pub fn is_obstacle(&self) -> bool {
        matches!(self.kind, ObjectKind::Wall(_) | ObjectKind::Bomb(_))
    }
}

/// Identifier of whatever object occupies `position`.
pub fn id_of(position: Point) -> EntityId {
    (position.x + position.y * MAX_WIDTH as i32) as EntityId
}

/// Inverse of [`id_of`].
pub fn position_of(id: EntityId) -> Point {
    Point::new(id as i32 % MAX_WIDTH as i32, id as i32 / MAX_WIDTH as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_object_ids_follow_position() {
        let wall = Object::wall(Point::new(3, 2), true, None);
        assert_eq!(wall.id(), 3 + 2 * 256);
        assert_eq!(position_of(wall.id()), Point::new(3, 2));
        assert_eq!(id_of(Point::new(255, 255)), u16::MAX);
    }

    #[test]
    fn test_wall_destroy_only_once() {
        let mut wall = Object::wall(Point::new(1, 1), true, None);
        let ObjectKind::Wall(w) = &mut wall.kind else {
            panic!("expected wall")
        };
        assert_eq!(w.countdown.timer, Span::ONE_TICK);
        w.destroy(Wall::DESTROY_TIMER);
        w.countdown.timer = Span::from_millis(100);
        w.destroy(Span::from_secs(5));
        assert!(w.destroying);
        assert_eq!(w.countdown.timer, Span::from_millis(100));
        assert_eq!(w.countdown.max_timer, Wall::DESTROY_TIMER);
    }

    #[test]
    fn test_bonus_values() {
        let bonus = |sprite| Bonus {
            countdown: Countdown::new(Bonus::DEFAULT_TIMER),
            sprite_index: sprite,
        };
        assert_eq!(bonus(0).value(), 300);
        assert_eq!(bonus(4).value(), 1000);
        assert_eq!(bonus(9).value(), 0);
    }

    #[test]
    fn test_random_rolls_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let sprite = Bonus::random_sprite(&mut rng);
            assert!((1..=4).contains(&sprite));
            let kind = PowerUpKind::random(&mut rng);
            assert!(PowerUpKind::ALL.contains(&kind));
        }
    }

    #[test]
    fn test_countdown_progression() {
        let mut countdown = Countdown::new(Span::from_secs(2));
        countdown.timer = Span::from_secs(1);
        assert!((countdown.progression() - 0.5).abs() < 1e-6);
        countdown.timer = Span::from_secs(-1);
        assert_eq!(countdown.progression(), 0.0);
    }
}
