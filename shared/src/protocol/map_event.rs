//! World deltas broadcast while a level is running.

use super::payload::{
    BlastPayload, BombPayload, BombermanPayload, BonusPayload, CreaturePayload, MonsterPayload,
    ObjectPayload, PositionPayload, PowerUpPayload, WallPayload,
};
use super::wire::{DecodeError, EncodeError, WireReader, WireWriter};
use crate::model::{Action, Creature, EntityId, Object, ObjectKind};
use crate::time::Span;

byte_enum! {
    pub enum MapAction {
        Spawn = 0,
        Despawn = 1,
        State = 2,
        Destroy = 3,
        Picked = 4,
        Animation = 5,
        Position = 6,
    }
}

byte_enum! {
    pub enum MapTarget {
        Object = 0,
        Creature = 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapArgument {
    None,
    Timer(Span),
    Action(Action),
    Position(PositionPayload),
    Blast(BlastPayload),
    Bomb(BombPayload),
    Bonus(BonusPayload),
    PowerUp(PowerUpPayload),
    Wall(WallPayload),
    Bomberman(BombermanPayload),
    Monster(MonsterPayload),
}

impl MapArgument {
    fn tag(&self) -> u8 {
        match self {
            MapArgument::None => 0,
            MapArgument::Timer(_) => 1,
            MapArgument::Action(_) => 2,
            MapArgument::Position(_) => 3,
            MapArgument::Blast(_) => 4,
            MapArgument::Bomb(_) => 5,
            MapArgument::Bonus(_) => 6,
            MapArgument::PowerUp(_) => 7,
            MapArgument::Wall(_) => 8,
            MapArgument::Bomberman(_) => 9,
            MapArgument::Monster(_) => 10,
        }
    }

    /// Object snapshot carried by a spawn event, if this is one.
    pub fn object_payload(&self) -> Option<ObjectPayload> {
        match *self {
            MapArgument::Blast(p) => Some(ObjectPayload::Blast(p)),
            MapArgument::Bomb(p) => Some(ObjectPayload::Bomb(p)),
            MapArgument::Bonus(p) => Some(ObjectPayload::Bonus(p)),
            MapArgument::PowerUp(p) => Some(ObjectPayload::PowerUp(p)),
            MapArgument::Wall(p) => Some(ObjectPayload::Wall(p)),
            _ => None,
        }
    }

    pub fn creature_payload(&self) -> Option<CreaturePayload> {
        match *self {
            MapArgument::Bomberman(p) => Some(CreaturePayload::Bomberman(p)),
            MapArgument::Monster(p) => Some(CreaturePayload::Monster(p)),
            _ => None,
        }
    }
}

impl From<ObjectPayload> for MapArgument {
    fn from(payload: ObjectPayload) -> Self {
        match payload {
            ObjectPayload::Wall(p) => MapArgument::Wall(p),
            ObjectPayload::Bomb(p) => MapArgument::Bomb(p),
            ObjectPayload::Blast(p) => MapArgument::Blast(p),
            ObjectPayload::Bonus(p) => MapArgument::Bonus(p),
            ObjectPayload::PowerUp(p) => MapArgument::PowerUp(p),
        }
    }
}

impl From<CreaturePayload> for MapArgument {
    fn from(payload: CreaturePayload) -> Self {
        match payload {
            CreaturePayload::Bomberman(p) => MapArgument::Bomberman(p),
            CreaturePayload::Monster(p) => MapArgument::Monster(p),
        }
    }
}

/// `action | target | id | argument kind | argument`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEvent {
    pub action: MapAction,
    pub target: MapTarget,
    pub id: EntityId,
    pub argument: MapArgument,
}

impl MapEvent {
    fn object(action: MapAction, object: &Object, argument: MapArgument) -> Self {
        MapEvent {
            action,
            target: MapTarget::Object,
            id: object.id(),
            argument,
        }
    }

    fn creature(action: MapAction, creature: &Creature, argument: MapArgument) -> Self {
        MapEvent {
            action,
            target: MapTarget::Creature,
            id: creature.id,
            argument,
        }
    }

    pub fn spawn_object(object: &Object) -> Result<Self, EncodeError> {
        let payload = ObjectPayload::of(object).ok_or(EncodeError::UnsupportedObject)?;
        Ok(Self::object(MapAction::Spawn, object, payload.into()))
    }

    pub fn despawn_object(object: &Object) -> Self {
        Self::object(MapAction::Despawn, object, MapArgument::None)
    }

    /// Walls carry their destruction timer; everything else vanishes at once.
    pub fn destroy_object(object: &Object) -> Self {
        let argument = match &object.kind {
            ObjectKind::Wall(w) => MapArgument::Timer(w.countdown.timer),
            _ => MapArgument::None,
        };
        Self::object(MapAction::Destroy, object, argument)
    }

    pub fn picked_object(object: &Object) -> Self {
        Self::object(MapAction::Picked, object, MapArgument::None)
    }

    pub fn spawn_creature(creature: &Creature) -> Self {
        Self::creature(
            MapAction::Spawn,
            creature,
            CreaturePayload::from(creature).into(),
        )
    }

    pub fn despawn_creature(creature: &Creature) -> Self {
        Self::creature(MapAction::Despawn, creature, MapArgument::None)
    }

    pub fn creature_state(creature: &Creature) -> Self {
        Self::creature(
            MapAction::State,
            creature,
            CreaturePayload::from(creature).into(),
        )
    }

    pub fn creature_animation(creature: &Creature) -> Self {
        Self::creature(
            MapAction::Animation,
            creature,
            MapArgument::Action(creature.sprite.action),
        )
    }

    pub fn creature_position(creature: &Creature) -> Self {
        Self::creature(
            MapAction::Position,
            creature,
            MapArgument::Position(PositionPayload::new(creature.position, creature.velocity)),
        )
    }

    pub fn encode(&self, w: &mut WireWriter) -> Result<(), EncodeError> {
        w.u8(self.action.into());
        w.u8(self.target.into());
        w.u16(self.id);
        w.u8(self.argument.tag());
        match &self.argument {
            MapArgument::None => Ok(()),
            MapArgument::Timer(timer) => {
                w.span(*timer);
                Ok(())
            }
            MapArgument::Action(action) => {
                w.i32(u8::from(*action) as i32);
                Ok(())
            }
            MapArgument::Position(p) => w.record(p),
            MapArgument::Blast(p) => w.record(p),
            MapArgument::Bomb(p) => w.record(p),
            MapArgument::Bonus(p) => w.record(p),
            MapArgument::PowerUp(p) => w.record(p),
            MapArgument::Wall(p) => w.record(p),
            MapArgument::Bomberman(p) => w.record(p),
            MapArgument::Monster(p) => w.record(p),
        }
    }

    pub fn decode(r: &mut WireReader<'_>) -> Result<Self, DecodeError> {
        let action = MapAction::try_from(r.u8()?)?;
        let target = MapTarget::try_from(r.u8()?)?;
        let id = r.u16()?;
        let argument = match r.u8()? {
            0 => MapArgument::None,
            1 => MapArgument::Timer(r.span()?),
            2 => MapArgument::Action(Action::try_from(r.i32()?)?),
            3 => MapArgument::Position(r.record()?),
            4 => MapArgument::Blast(r.record()?),
            5 => MapArgument::Bomb(r.record()?),
            6 => MapArgument::Bonus(r.record()?),
            7 => MapArgument::PowerUp(r.record()?),
            8 => MapArgument::Wall(r.record()?),
            9 => MapArgument::Bomberman(r.record()?),
            10 => MapArgument::Monster(r.record()?),
            other => {
                return Err(crate::UnknownTag {
                    kind: "MapArgument",
                    value: other as i64,
                }
                .into())
            }
        };
        Ok(MapEvent {
            action,
            target,
            id,
            argument,
        })
    }
}
