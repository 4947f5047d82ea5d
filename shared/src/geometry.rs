//! Points, vectors and facing directions on the tile grid.

use crate::FIXED_POINT_SCALE;
use serde::{Deserialize, Serialize};

/// Integer tile coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }

    pub fn offset(self, orientation: Orientation) -> Point {
        let (dx, dy) = orientation.delta();
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn to_vector(self) -> Vector2 {
        Vector2::new(self.x as f32, self.y as f32)
    }
}

/// Fractional tile coordinates. Positive `y` points down the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vector2 { x, y }
    }

    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Vector2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vector2::ZERO
        } else {
            Vector2::new(self.x / mag, self.y / mag)
        }
    }

    pub fn scale(&self, scalar: f32) -> Vector2 {
        Vector2::new(self.x * scalar, self.y * scalar)
    }

    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2::new(self.x + other.x, self.y + other.y)
    }

    pub fn distance(&self, other: &Vector2) -> f32 {
        Vector2::new(self.x - other.x, self.y - other.y).magnitude()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Truncating conversion to the tile containing the vector's origin corner.
    pub fn to_point(self) -> Point {
        Point::new(self.x as i32, self.y as i32)
    }

    /// Encodes both axes as fixed-point integers.
    pub fn to_fixed(self) -> [i32; 2] {
        [
            (self.x * FIXED_POINT_SCALE) as i32,
            (self.y * FIXED_POINT_SCALE) as i32,
        ]
    }

    pub fn from_fixed(value: [i32; 2]) -> Vector2 {
        Vector2::new(
            value[0] as f32 / FIXED_POINT_SCALE,
            value[1] as f32 / FIXED_POINT_SCALE,
        )
    }
}

byte_enum! {
    /// Facing of a creature or reach direction of a blast fragment.
    pub enum Orientation {
        Bottom = 0,
        Top = 1,
        Left = 2,
        Right = 3,
    }
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Bottom
    }
}

impl Orientation {
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Orientation::Bottom => (0, 1),
            Orientation::Top => (0, -1),
            Orientation::Left => (-1, 0),
            Orientation::Right => (1, 0),
        }
    }

    pub fn offset_vector(self) -> Vector2 {
        let (dx, dy) = self.delta();
        Vector2::new(dx as f32, dy as f32)
    }

    pub const fn opposite(self) -> Orientation {
        match self {
            Orientation::Bottom => Orientation::Top,
            Orientation::Top => Orientation::Bottom,
            Orientation::Left => Orientation::Right,
            Orientation::Right => Orientation::Left,
        }
    }

    pub const fn is_vertical(self) -> bool {
        matches!(self, Orientation::Bottom | Orientation::Top)
    }

    /// Classifies a direction vector by its dominant axis.
    pub fn of(delta: Vector2) -> Orientation {
        if delta.y >= delta.x.abs() {
            Orientation::Bottom
        } else if delta.y <= -delta.x.abs() {
            Orientation::Top
        } else if delta.x <= -delta.y.abs() {
            Orientation::Left
        } else {
            Orientation::Right
        }
    }
}
