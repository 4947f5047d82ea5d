//! The simulated world: tiles, objects, creatures, levels and status.

pub mod creature;
pub mod level;
pub mod map;
pub mod object;
pub mod status;

pub use creature::{Action, Bomberman, Creature, CreatureKind, Monster, MonsterKind, SpriteState};
pub use level::Level;
pub use map::{Map, MapError};
pub use object::{
    Blast, BlastKind, Bomb, BombKind, Bonus, Countdown, EntityId, Object, ObjectKind, PowerUp,
    PowerUpKind, Wall,
};
pub use status::{Mode, Phase, Player, Status, StatusError, MAX_PLAYERS};
