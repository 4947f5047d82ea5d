//! Creatures: player avatars and monsters.

use crate::geometry::{Orientation, Vector2};
use crate::model::object::{BombKind, EntityId};
use crate::time::Span;

byte_enum! {
    /// Animation a creature's sprite is playing.
    pub enum Action {
        Idle = 0,
        Walk = 1,
        Run = 2,
        Hit = 3,
        Burn = 4,
        Stun = 5,
        Special = 6,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteState {
    pub action: Action,
    pub frame: i32,
    pub orientation: Orientation,
}

impl Default for SpriteState {
    fn default() -> Self {
        SpriteState {
            action: Action::Idle,
            frame: 0,
            orientation: Orientation::Bottom,
        }
    }
}

impl SpriteState {
    /// Switches animation, restarting the frame counter only on an actual change.
    pub fn begin(&mut self, action: Action) {
        if self.action != action {
            self.action = action;
            self.frame = 0;
        }
    }

    pub fn tick(&mut self) {
        self.frame = self.frame.saturating_add(1);
    }
}

byte_enum! {
    pub enum MonsterKind {
        Zombie = 0,
        Mummy = 1,
        Chicken = 2,
    }
}

/// Fixed properties of a monster kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonsterDescriptor {
    pub name: &'static str,
    pub value: i32,
    pub speed: f32,
    pub max_health: i32,
}

const MONSTER_TABLE: [MonsterDescriptor; 3] = [
    MonsterDescriptor {
        name: "zombie",
        value: 100,
        speed: 0.5,
        max_health: 1,
    },
    MonsterDescriptor {
        name: "mummy",
        value: 300,
        speed: 1.0,
        max_health: 2,
    },
    MonsterDescriptor {
        name: "chicken",
        value: 2500,
        speed: 1.5,
        max_health: 10,
    },
];

impl MonsterKind {
    pub fn descriptor(self) -> &'static MonsterDescriptor {
        &MONSTER_TABLE[self as usize]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bomberman {
    pub player: u8,
    pub bombs: i32,
    pub power: i32,
    pub boots: i32,
    pub bomb_stock: [i32; 3],
}

impl Bomberman {
    pub const SPAWN_INVULNERABILITY: Span = Span::from_secs(5);
    pub const MAX_BOMBS: i32 = 3;
    pub const MAX_POWER: i32 = 6;
    pub const MAX_BOOTS: i32 = 2;
    pub const MAX_SPECIAL_STOCK: i32 = 9;

    pub fn add_bomb(&mut self) {
        if self.bombs < Self::MAX_BOMBS {
            self.bombs += 1;
        }
    }

    pub fn add_power(&mut self) {
        if self.power < Self::MAX_POWER {
            self.power += 1;
        }
    }

    pub fn add_boots(&mut self) {
        if self.boots < Self::MAX_BOOTS {
            self.boots += 1;
        }
    }

    /// Drops every upgrade back to the starting loadout.
    pub fn nerf(&mut self) {
        self.bombs = 1;
        self.power = 1;
        self.boots = 0;
        self.bomb_stock[BombKind::Remote.slot()] = 0;
        self.bomb_stock[BombKind::Split.slot()] = 0;
    }

    pub fn stock(&self, kind: BombKind) -> i32 {
        self.bomb_stock[kind.slot()]
    }

    pub fn refill(&mut self, kind: BombKind, count: i32) {
        let slot = &mut self.bomb_stock[kind.slot()];
        if *slot < Self::MAX_SPECIAL_STOCK {
            *slot = (*slot + count).min(Self::MAX_SPECIAL_STOCK);
        }
    }

    pub fn use_stock(&mut self, kind: BombKind) -> bool {
        let slot = &mut self.bomb_stock[kind.slot()];
        if *slot > 0 {
            *slot -= 1;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Monster {
    pub kind: MonsterKind,
    pub speed_factor: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreatureKind {
    Bomberman(Bomberman),
    Monster(Monster),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Creature {
    pub id: EntityId,
    pub position: Vector2,
    pub velocity: Vector2,
    pub health: i32,
    pub max_health: i32,
    pub invulnerability: Span,
    pub sprite: SpriteState,
    pub kind: CreatureKind,
}

impl Creature {
    pub const DAMAGE_INVULNERABILITY: Span = Span::from_secs(3);

    pub fn bomberman(id: EntityId, player: u8, position: Vector2) -> Self {
        Creature {
            id,
            position,
            velocity: Vector2::ZERO,
            health: 1,
            max_health: 1,
            invulnerability: Bomberman::SPAWN_INVULNERABILITY,
            sprite: SpriteState::default(),
            kind: CreatureKind::Bomberman(Bomberman {
                player,
                bombs: 1,
                power: 2,
                boots: 0,
                bomb_stock: [i32::MAX, 0, 0],
            }),
        }
    }

    pub fn monster(id: EntityId, kind: MonsterKind, position: Vector2) -> Self {
        let descriptor = kind.descriptor();
        Creature {
            id,
            position,
            velocity: Vector2::ZERO,
            health: descriptor.max_health,
            max_health: descriptor.max_health,
            invulnerability: Span::ZERO,
            sprite: SpriteState::default(),
            kind: CreatureKind::Monster(Monster {
                kind,
                speed_factor: 1.0,
            }),
        }
    }

    pub fn name(&self) -> String {
        match &self.kind {
            CreatureKind::Bomberman(b) => format!("bomberman{}", b.player + 1),
            CreatureKind::Monster(m) => m.kind.descriptor().name.to_string(),
        }
    }

    /// Movement speed in tiles per second before the global base speed applies.
    pub fn speed(&self) -> f32 {
        match &self.kind {
            CreatureKind::Bomberman(b) => 1.0 + b.boots as f32 * 0.5,
            CreatureKind::Monster(m) => m.kind.descriptor().speed * m.speed_factor,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health == 0
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerability.is_positive()
    }

    /// Removes health, clamping at zero. Survivors optionally get a grace window.
    pub fn damage(&mut self, amount: i32, grant_invulnerability: bool) {
        if amount > 0 {
            self.health = (self.health - amount).max(0);
            if self.health > 0 && grant_invulnerability {
                self.invulnerability = Self::DAMAGE_INVULNERABILITY;
            }
        }
    }

    pub fn update_orientation(&mut self) {
        if !self.velocity.is_zero() {
            self.sprite.orientation = Orientation::of(self.velocity);
        }
    }

    pub fn as_bomberman(&self) -> Option<&Bomberman> {
        match &self.kind {
            CreatureKind::Bomberman(b) => Some(b),
            CreatureKind::Monster(_) => None,
        }
    }

    pub fn as_bomberman_mut(&mut self) -> Option<&mut Bomberman> {
        match &mut self.kind {
            CreatureKind::Bomberman(b) => Some(b),
            CreatureKind::Monster(_) => None,
        }
    }

    pub fn as_monster(&self) -> Option<&Monster> {
        match &self.kind {
            CreatureKind::Monster(m) => Some(m),
            CreatureKind::Bomberman(_) => None,
        }
    }

    pub fn as_monster_mut(&mut self) -> Option<&mut Monster> {
        match &mut self.kind {
            CreatureKind::Monster(m) => Some(m),
            CreatureKind::Bomberman(_) => None,
        }
    }
}
