//! Shared game model and wire protocol.
//!
//! Everything in this crate is deterministic and free of I/O: the tile grid,
//! movement and blast resolution, the level factory, the game status, and
//! the byte-level protocol spoken between server and clients. The server
//! crate drives these types from its tick loop.

/// Declares a fieldless enum that travels as a single byte.
///
/// The generated type serializes through serde as its `u8` discriminant so
/// payload records containing it keep a fixed-width layout.
macro_rules! byte_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(into = "u8", try_from = "u8")]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            /// Every variant in discriminant order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }

        impl TryFrom<u8> for $name {
            type Error = $crate::UnknownTag;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $(v if v == $value => Ok($name::$variant),)+
                    _ => Err($crate::UnknownTag {
                        kind: stringify!($name),
                        value: value as i64,
                    }),
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = $crate::UnknownTag;

            fn try_from(value: i32) -> Result<Self, Self::Error> {
                u8::try_from(value)
                    .map_err(|_| $crate::UnknownTag {
                        kind: stringify!($name),
                        value: value as i64,
                    })
                    .and_then($name::try_from)
            }
        }
    };
}

pub mod blast;
pub mod framing;
pub mod geometry;
pub mod model;
pub mod mover;
pub mod protocol;
pub mod time;

pub use geometry::{Orientation, Point, Vector2};
pub use time::Span;

/// Well-known TCP port shared by every session on a host.
pub const DEFAULT_PORT: u16 = 7342;

/// Protocol version a client must announce at login.
pub const PROTOCOL_VERSION: i32 = 3;

/// Scale applied to fractional coordinates on the wire.
pub const FIXED_POINT_SCALE: f32 = 10_000.0;

/// Frames larger than this are treated as a transport failure.
pub const MAX_FRAME_SIZE: usize = 1 << 20;

/// A tag byte or integer that does not name any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} tag {value}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: i64,
}
