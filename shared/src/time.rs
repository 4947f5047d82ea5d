//! Signed simulation time measured in 100 ns ticks.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::time::Duration;

/// A signed length of simulation time.
///
/// Timers count down through zero, so negative spans are meaningful: an
/// expired bomb is marked with `-1` tick and a disabled round clock with
/// `-1` second. On the wire a span is its raw `i64` tick count.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Span(i64);

impl Span {
    pub const TICKS_PER_MILLISECOND: i64 = 10_000;
    pub const TICKS_PER_SECOND: i64 = 10_000_000;

    pub const ZERO: Span = Span(0);
    pub const ONE_TICK: Span = Span(1);

    pub const fn from_ticks(ticks: i64) -> Self {
        Span(ticks)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Span(millis * Self::TICKS_PER_MILLISECOND)
    }

    pub const fn from_secs(secs: i64) -> Self {
        Span(secs * Self::TICKS_PER_SECOND)
    }

    pub fn from_secs_f32(secs: f32) -> Self {
        Span((secs as f64 * Self::TICKS_PER_SECOND as f64).round() as i64)
    }

    pub fn from_duration(duration: Duration) -> Self {
        Span((duration.as_nanos() / 100).min(i64::MAX as u128) as i64)
    }

    pub const fn ticks(self) -> i64 {
        self.0
    }

    pub fn as_secs_f32(self) -> f32 {
        self.0 as f32 / Self::TICKS_PER_SECOND as f32
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Subtracts `elapsed`, stopping at zero.
    pub fn saturating_countdown(self, elapsed: Span) -> Span {
        Span((self.0 - elapsed.0).max(0))
    }
}

impl Add for Span {
    type Output = Span;

    fn add(self, rhs: Span) -> Span {
        Span(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Span {
    type Output = Span;

    fn sub(self, rhs: Span) -> Span {
        Span(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Span {
    fn add_assign(&mut self, rhs: Span) {
        *self = *self + rhs;
    }
}

impl SubAssign for Span {
    fn sub_assign(&mut self, rhs: Span) {
        *self = *self - rhs;
    }
}

impl Neg for Span {
    type Output = Span;

    fn neg(self) -> Span {
        Span(-self.0)
    }
}
