//! Fixed-width payload records carried inside messages and map events.
//!
//! Every record here is plain data with a serde derive; field order is the
//! byte order on the wire.

use crate::geometry::{Point, Vector2};
use crate::model::{
    Blast, BlastKind, Bomb, BombKind, Bomberman, Bonus, Countdown, Creature, CreatureKind,
    EntityId, Mode, Monster, MonsterKind, Object, ObjectKind, Player, PowerUp, PowerUpKind,
    SpriteState, Wall,
};
use crate::geometry::Orientation;
use crate::time::Span;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionPayload {
    pub position: [i32; 2],
    pub velocity: [i32; 2],
}

impl PositionPayload {
    pub fn new(position: Vector2, velocity: Vector2) -> Self {
        PositionPayload {
            position: position.to_fixed(),
            velocity: velocity.to_fixed(),
        }
    }

    pub fn position(&self) -> Vector2 {
        Vector2::from_fixed(self.position)
    }

    pub fn velocity(&self) -> Vector2 {
        Vector2::from_fixed(self.velocity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMapPayload {
    pub number: i32,
    pub width: i32,
    pub height: i32,
    pub theme: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsPayload {
    pub mode: Mode,
    pub continuable: bool,
    pub wins_threshold: i32,
}

/// Login request. Strings make this variable-width, so it is coded by hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPayload {
    pub token: String,
    pub name: String,
    pub version: i32,
}

impl LoginPayload {
    pub const MAX_TOKEN_LENGTH: usize = 5;
    pub const MAX_NAME_LENGTH: usize = 10;

    pub fn new(token: &str, name: &str, version: i32) -> Self {
        LoginPayload {
            token: token.to_string(),
            name: name.to_string(),
            version,
        }
    }

    /// Token and name are both present and short enough.
    pub fn is_valid(&self) -> bool {
        let token = self.token.chars().count();
        let name = self.name.chars().count();
        (1..=Self::MAX_TOKEN_LENGTH).contains(&token) && (1..=Self::MAX_NAME_LENGTH).contains(&name)
    }

    pub fn is_compatible(&self) -> bool {
        self.version == crate::PROTOCOL_VERSION
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerPayload {
    pub id: u8,
    pub waiting: bool,
    pub game_over: bool,
    pub host: bool,
    pub local: bool,
    pub name: String,
    pub score: i32,
    pub wins: i32,
    pub stock: i32,
}

impl From<&Player> for PlayerPayload {
    fn from(player: &Player) -> Self {
        PlayerPayload {
            id: player.id,
            waiting: player.waiting,
            game_over: player.game_over,
            host: player.host,
            local: player.local,
            name: player.name.clone(),
            score: player.score,
            wins: player.wins,
            stock: player.stock,
        }
    }
}

impl PlayerPayload {
    /// Copies the transmitted fields onto a local player slot.
    pub fn apply(&self, player: &mut Player) {
        player.playing = true;
        player.waiting = self.waiting;
        player.game_over = self.game_over;
        player.host = self.host;
        player.local = self.local;
        player.name = self.name.clone();
        player.score = self.score;
        player.wins = self.wins;
        player.stock = self.stock;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectHeader {
    pub x: i32,
    pub y: i32,
    pub timer: Span,
    pub max_timer: Span,
}

impl ObjectHeader {
    fn of(position: Point, countdown: &Countdown) -> Self {
        ObjectHeader {
            x: position.x,
            y: position.y,
            timer: countdown.timer,
            max_timer: countdown.max_timer,
        }
    }

    fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    fn countdown(&self) -> Countdown {
        Countdown {
            timer: self.timer,
            max_timer: self.max_timer,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallPayload {
    pub header: ObjectHeader,
    pub destructible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BombPayload {
    pub header: ObjectHeader,
    pub kind: BombKind,
    pub owner: EntityId,
    pub power: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlastPayload {
    pub header: ObjectHeader,
    pub kind: BlastKind,
    pub orientation: Orientation,
    pub owner: EntityId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusPayload {
    pub header: ObjectHeader,
    pub sprite_index: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerUpPayload {
    pub header: ObjectHeader,
    pub kind: PowerUpKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatureHeader {
    pub id: EntityId,
    pub position: [i32; 2],
    pub velocity: [i32; 2],
    pub health: i32,
    pub max_health: i32,
    pub invulnerability: Span,
}

impl From<&Creature> for CreatureHeader {
    fn from(creature: &Creature) -> Self {
        CreatureHeader {
            id: creature.id,
            position: creature.position.to_fixed(),
            velocity: creature.velocity.to_fixed(),
            health: creature.health,
            max_health: creature.max_health,
            invulnerability: creature.invulnerability,
        }
    }
}

impl CreatureHeader {
    fn build(&self, kind: CreatureKind) -> Creature {
        Creature {
            id: self.id,
            position: Vector2::from_fixed(self.position),
            velocity: Vector2::from_fixed(self.velocity),
            health: self.health,
            max_health: self.max_health,
            invulnerability: self.invulnerability,
            sprite: SpriteState::default(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BombermanPayload {
    pub header: CreatureHeader,
    pub player: u8,
    pub bombs: i32,
    pub power: i32,
    pub boots: i32,
    pub bomb_stock: [i32; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonsterPayload {
    pub header: CreatureHeader,
    pub kind: MonsterKind,
}

/// Full object snapshot, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectPayload {
    Wall(WallPayload),
    Bomb(BombPayload),
    Blast(BlastPayload),
    Bonus(BonusPayload),
    PowerUp(PowerUpPayload),
}

impl ObjectPayload {
    /// Snapshot of `object`. Spawn points have no wire form.
    pub fn of(object: &Object) -> Option<Self> {
        let p = object.position;
        let payload = match &object.kind {
            ObjectKind::Wall(w) => ObjectPayload::Wall(WallPayload {
                header: ObjectHeader::of(p, &w.countdown),
                destructible: w.destructible,
            }),
            ObjectKind::Bomb(b) => ObjectPayload::Bomb(BombPayload {
                header: ObjectHeader::of(p, &b.countdown),
                kind: b.kind,
                owner: b.owner,
                power: b.power,
            }),
            ObjectKind::Blast(b) => ObjectPayload::Blast(BlastPayload {
                header: ObjectHeader::of(p, &b.countdown),
                kind: b.kind,
                orientation: b.orientation,
                owner: b.owner,
            }),
            ObjectKind::Bonus(b) => ObjectPayload::Bonus(BonusPayload {
                header: ObjectHeader::of(p, &b.countdown),
                sprite_index: b.sprite_index,
            }),
            ObjectKind::PowerUp(u) => ObjectPayload::PowerUp(PowerUpPayload {
                header: ObjectHeader::of(p, &u.countdown),
                kind: u.kind,
            }),
            ObjectKind::SpawnPoint => return None,
        };
        Some(payload)
    }

    /// Rebuilds the object a receiver should place on its map.
    pub fn to_object(&self) -> Object {
        match self {
            ObjectPayload::Wall(w) => Object {
                position: w.header.position(),
                kind: ObjectKind::Wall(Wall {
                    countdown: w.header.countdown(),
                    destructible: w.destructible,
                    destroying: false,
                    hidden_item: None,
                }),
            },
            ObjectPayload::Bomb(b) => Object {
                position: b.header.position(),
                kind: ObjectKind::Bomb(Bomb {
                    countdown: b.header.countdown(),
                    kind: b.kind,
                    owner: b.owner,
                    power: b.power,
                }),
            },
            ObjectPayload::Blast(b) => Object {
                position: b.header.position(),
                kind: ObjectKind::Blast(Blast {
                    countdown: b.header.countdown(),
                    kind: b.kind,
                    orientation: b.orientation,
                    owner: b.owner,
                }),
            },
            ObjectPayload::Bonus(b) => Object {
                position: b.header.position(),
                kind: ObjectKind::Bonus(Bonus {
                    countdown: b.header.countdown(),
                    sprite_index: b.sprite_index,
                }),
            },
            ObjectPayload::PowerUp(u) => Object {
                position: u.header.position(),
                kind: ObjectKind::PowerUp(PowerUp {
                    countdown: u.header.countdown(),
                    kind: u.kind,
                }),
            },
        }
    }
}

/// Full creature snapshot, tagged by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreaturePayload {
    Bomberman(BombermanPayload),
    Monster(MonsterPayload),
}

impl From<&Creature> for CreaturePayload {
    fn from(creature: &Creature) -> Self {
        let header = CreatureHeader::from(creature);
        match &creature.kind {
            CreatureKind::Bomberman(b) => CreaturePayload::Bomberman(BombermanPayload {
                header,
                player: b.player,
                bombs: b.bombs,
                power: b.power,
                boots: b.boots,
                bomb_stock: b.bomb_stock,
            }),
            CreatureKind::Monster(m) => CreaturePayload::Monster(MonsterPayload {
                header,
                kind: m.kind,
            }),
        }
    }
}

impl CreaturePayload {
    pub fn id(&self) -> EntityId {
        match self {
            CreaturePayload::Bomberman(b) => b.header.id,
            CreaturePayload::Monster(m) => m.header.id,
        }
    }

    pub fn to_creature(&self) -> Creature {
        match self {
            CreaturePayload::Bomberman(b) => b.header.build(CreatureKind::Bomberman(Bomberman {
                player: b.player,
                bombs: b.bombs,
                power: b.power,
                boots: b.boots,
                bomb_stock: b.bomb_stock,
            })),
            CreaturePayload::Monster(m) => m.header.build(CreatureKind::Monster(Monster {
                kind: m.kind,
                speed_factor: 1.0,
            })),
        }
    }
}
