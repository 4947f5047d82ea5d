//! Byte-level protocol spoken between the server and its clients.

pub mod map_event;
pub mod message;
pub mod payload;
pub mod wire;

pub use map_event::{MapAction, MapArgument, MapEvent, MapTarget};
pub use message::{MessageEvent, MessageType, ReasonCode};
pub use payload::{
    CreaturePayload, LoginPayload, ObjectPayload, OptionsPayload, PlayerPayload, PositionPayload,
    SetMapPayload,
};
pub use wire::{DecodeError, EncodeError, WireReader, WireWriter};
