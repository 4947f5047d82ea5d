//! Continuous creature movement over the tile grid.
//!
//! A displacement is applied one axis at a time in steps that never cross
//! more than one tile boundary, so legality is re-checked whenever the
//! creature would enter a new tile. Illegal steps first try snapping the
//! other axis to a tile center, which lets creatures slide around corners,
//! and otherwise fall back to the last legal position.

use crate::geometry::{Orientation, Point, Vector2};
use crate::model::map::Map;
use crate::model::object::{position_of, EntityId};
use thiserror::Error;

/// Speed of every creature before its own speed factor applies.
pub const BASE_SPEED: f32 = 3.0;
/// Distance under which a coordinate snaps to the nearest integer.
pub const ALIGN_THRESHOLD: f32 = 0.2;
/// Remaining displacement under which a move is complete.
pub const STOP_THRESHOLD: f32 = 0.01;
/// A displacement short enough to set a facing without moving.
pub const DUMMY_THRESHOLD: f32 = 0.001;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoverError {
    #[error("no active creature set")]
    NoActiveCreature,
}

#[derive(Debug, Clone, Default)]
pub struct CreatureMover {
    position: Option<Vector2>,
    initial_position: Vector2,
    initial_collisions: Vec<EntityId>,
    collisions: Vec<EntityId>,
    available: Vec<Orientation>,
    legal: bool,
    changed_tile: bool,
}

impl CreatureMover {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a creature standing at `position`.
    ///
    /// Obstacles the creature already overlaps are remembered so it may walk
    /// off them, e.g. right after dropping a bomb.
    pub fn set_active(&mut self, map: &Map, position: Vector2) {
        self.position = Some(position);
        self.initial_position = position;
        collect_collisions(map, position, &mut self.initial_collisions);
        self.update_state(map, position);
    }

    /// Current position of the active creature.
    pub fn position(&self) -> Result<Vector2, MoverError> {
        self.position.ok_or(MoverError::NoActiveCreature)
    }

    pub fn is_legal(&self) -> bool {
        self.legal
    }

    pub fn changed_tile(&self) -> bool {
        self.changed_tile
    }

    pub fn clear_changed_tile(&mut self) {
        self.changed_tile = false;
    }

    /// Objects overlapped at the current position.
    pub fn collisions(&self) -> &[EntityId] {
        &self.collisions
    }

    /// Directions leading to a pathable tile from the current tile.
    pub fn available_orientations(&self) -> &[Orientation] {
        &self.available
    }

    pub fn move_to(&mut self, map: &Map, destination: Vector2) -> Result<(), MoverError> {
        self.position()?;
        self.position = Some(destination);
        self.update_state(map, destination);
        Ok(())
    }

    pub fn rollback(&mut self, map: &Map) -> Result<(), MoverError> {
        self.position()?;
        let initial = self.initial_position;
        self.position = Some(initial);
        self.update_state(map, initial);
        Ok(())
    }

    pub fn move_by(&mut self, map: &Map, mut delta: Vector2) -> Result<(), MoverError> {
        let mut current = self.position()?;
        let mut last_legal = current;
        let mut horizontal = delta.x.abs() > delta.y.abs();
        self.changed_tile = false;

        while delta.magnitude() > STOP_THRESHOLD {
            if horizontal {
                let movement = self.axis_movement(current.x, delta.x);
                delta.x -= movement;
                current.x += movement;
                self.update_state(map, current);
                if !self.legal {
                    current.y = align_axis(current.y, false);
                    self.update_state(map, current);
                }
            } else {
                let movement = self.axis_movement(current.y, delta.y);
                delta.y -= movement;
                current.y += movement;
                self.update_state(map, current);
                if !self.legal {
                    current.x = align_axis(current.x, false);
                    self.update_state(map, current);
                }
            }
            if !self.legal {
                current = last_legal;
                self.update_state(map, current);
            }
            if self.legal {
                last_legal = current;
            }
            horizontal = !horizontal;
        }

        self.position = Some(current);
        Ok(())
    }

    /// Whether a creature could stand on `p`, ignoring obstacles it started on.
    pub fn is_pathable(&self, map: &Map, p: Point) -> bool {
        if !map.in_boundaries(p) {
            return false;
        }
        match map.object(p) {
            Some(o) if o.is_obstacle() => self.initial_collisions.contains(&o.id()),
            _ => true,
        }
    }

    /// Portion of `delta` that stops at the next tile center along one axis.
    fn axis_movement(&mut self, current: f32, delta: f32) -> f32 {
        let next = if delta > 0.0 {
            current.floor() + 1.0
        } else if delta < 0.0 {
            current.ceil() - 1.0
        } else {
            return 0.0;
        };
        let to_next = next - current;
        if delta.abs() > to_next.abs() {
            self.changed_tile = true;
            to_next
        } else {
            delta
        }
    }

    fn update_state(&mut self, map: &Map, position: Vector2) {
        let out_of_map = collect_collisions(map, position, &mut self.collisions);

        let tile = align_position(position, true).to_point();
        self.available.clear();
        for &o in Orientation::ALL {
            if self.is_pathable(map, tile.offset(o)) {
                self.available.push(o);
            }
        }

        let blocked = self.collisions.iter().any(|id| {
            !self.initial_collisions.contains(id)
                && map
                    .object(position_of(*id))
                    .map_or(false, |o| o.is_obstacle())
        });
        self.legal = !blocked && !out_of_map;
    }
}

/// Records every object overlapped by a creature at `position`.
/// Returns whether any overlapped tile lies outside the map.
fn collect_collisions(map: &Map, position: Vector2, out: &mut Vec<EntityId>) -> bool {
    out.clear();
    let mut out_of_map = false;
    for y in position.y.floor() as i32..=position.y.ceil() as i32 {
        for x in position.x.floor() as i32..=position.x.ceil() as i32 {
            let p = Point::new(x, y);
            if !map.in_boundaries(p) {
                out_of_map = true;
            } else if let Some(o) = map.object(p) {
                out.push(o.id());
            }
        }
    }
    out_of_map
}

pub fn align_position(position: Vector2, force: bool) -> Vector2 {
    Vector2::new(align_axis(position.x, force), align_axis(position.y, force))
}

/// Snaps to the nearest integer within [`ALIGN_THRESHOLD`], or unconditionally when forced.
pub fn align_axis(value: f32, force: bool) -> f32 {
    let mut aligned = value;
    let mut best = if force { f32::INFINITY } else { ALIGN_THRESHOLD };
    for i in value.floor() as i32..=value.ceil() as i32 {
        let distance = (i as f32 - value).abs();
        if distance < best {
            best = distance;
            aligned = i as f32;
        }
    }
    aligned
}

/// Tile a creature at `position` is considered to stand on.
pub fn tile_of(position: Vector2) -> Point {
    align_position(position, true).to_point()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::object::{BombKind, Object};
    use crate::time::Span;
    use assert_approx_eq::assert_approx_eq;

    fn open_map() -> Map {
        Map::new(9, 9, 0).unwrap()
    }

    #[test]
    fn test_align_axis() {
        assert_approx_eq!(align_axis(2.15, false), 2.0);
        assert_approx_eq!(align_axis(2.5, false), 2.5);
        assert_approx_eq!(align_axis(2.5, true), 2.0);
        assert_approx_eq!(align_axis(2.6, true), 3.0);
        assert_approx_eq!(align_axis(-0.1, false), 0.0);
        assert_eq!(tile_of(Vector2::new(3.7, 1.2)), Point::new(4, 1));
    }

    #[test]
    fn test_requires_active_creature() {
        let map = open_map();
        let mut mover = CreatureMover::new();
        assert_eq!(
            mover.move_by(&map, Vector2::new(1.0, 0.0)),
            Err(MoverError::NoActiveCreature)
        );
        assert_eq!(
            mover.move_to(&map, Vector2::ZERO),
            Err(MoverError::NoActiveCreature)
        );
        assert!(mover.rollback(&map).is_err());
    }

    #[test]
    fn test_zero_move_changes_nothing() {
        let mut map = open_map();
        map.add_object(Object::wall(Point::new(3, 3), false, None)).unwrap();
        let mut mover = CreatureMover::new();
        let start = Vector2::new(2.4, 3.0);
        mover.set_active(&map, start);
        let legal = mover.is_legal();
        mover.move_by(&map, Vector2::ZERO).unwrap();
        assert_eq!(mover.position().unwrap(), start);
        assert_eq!(mover.is_legal(), legal);
        assert!(!mover.changed_tile());
    }

    #[test]
    fn test_free_move_crosses_tiles() {
        let map = open_map();
        let mut mover = CreatureMover::new();
        mover.set_active(&map, Vector2::new(1.0, 1.0));
        mover.move_by(&map, Vector2::new(2.5, 0.0)).unwrap();
        let p = mover.position().unwrap();
        assert_approx_eq!(p.x, 3.5, 1e-4);
        assert_approx_eq!(p.y, 1.0, 1e-4);
        assert!(mover.changed_tile());
        assert!(mover.is_legal());
    }

    #[test]
    fn test_walls_stop_movement() {
        let mut map = open_map();
        map.add_object(Object::wall(Point::new(4, 2), false, None)).unwrap();
        let mut mover = CreatureMover::new();
        mover.set_active(&map, Vector2::new(2.0, 2.0));
        mover.move_by(&map, Vector2::new(3.0, 0.0)).unwrap();
        let p = mover.position().unwrap();
        assert_approx_eq!(p.x, 3.0, 1e-4);
        assert_ne!(tile_of(p), Point::new(4, 2));
        assert!(p.x.ceil() < 4.0);
    }

    #[test]
    fn test_map_edges_stop_movement() {
        let map = open_map();
        let mut mover = CreatureMover::new();
        mover.set_active(&map, Vector2::new(1.0, 0.0));
        mover.move_by(&map, Vector2::new(0.0, -2.0)).unwrap();
        assert_approx_eq!(mover.position().unwrap().y, 0.0, 1e-4);
        assert!(mover.is_legal());
    }

    #[test]
    fn test_can_walk_off_own_bomb() {
        let mut map = open_map();
        map.add_object(Object::bomb(
            Point::new(2, 2),
            BombKind::Normal,
            1,
            2,
            Span::from_secs(3),
        ))
        .unwrap();
        let mut mover = CreatureMover::new();
        mover.set_active(&map, Vector2::new(2.0, 2.0));
        assert!(mover.is_legal());
        mover.move_by(&map, Vector2::new(1.0, 0.0)).unwrap();
        assert_approx_eq!(mover.position().unwrap().x, 3.0, 1e-4);

        // A fresh activation no longer tolerates the bomb.
        mover.set_active(&map, Vector2::new(3.0, 2.0));
        mover.move_by(&map, Vector2::new(-1.0, 0.0)).unwrap();
        assert_approx_eq!(mover.position().unwrap().x, 3.0, 1e-4);
    }

    #[test]
    fn test_slides_around_corners() {
        let mut map = open_map();
        map.add_object(Object::wall(Point::new(3, 1), false, None)).unwrap();
        let mut mover = CreatureMover::new();
        // Slightly below the row center: moving right snaps onto row 2.
        mover.set_active(&map, Vector2::new(2.0, 1.9));
        mover.move_by(&map, Vector2::new(1.0, 0.0)).unwrap();
        let p = mover.position().unwrap();
        assert_approx_eq!(p.x, 3.0, 1e-4);
        assert_approx_eq!(p.y, 2.0, 1e-4);
    }

    #[test]
    fn test_available_orientations() {
        let mut map = open_map();
        map.add_object(Object::wall(Point::new(1, 0), false, None)).unwrap();
        let mut mover = CreatureMover::new();
        mover.set_active(&map, Vector2::new(0.0, 0.0));
        assert_eq!(mover.available_orientations(), &[Orientation::Bottom]);
        mover.move_to(&map, Vector2::new(4.0, 4.0)).unwrap();
        assert_eq!(mover.available_orientations().len(), 4);
    }

    #[test]
    fn test_move_to_and_rollback() {
        let mut map = open_map();
        map.add_object(Object::wall(Point::new(5, 5), false, None)).unwrap();
        let mut mover = CreatureMover::new();
        mover.set_active(&map, Vector2::new(4.0, 5.0));
        mover.move_to(&map, Vector2::new(5.0, 5.0)).unwrap();
        assert!(!mover.is_legal());
        assert_eq!(mover.collisions().len(), 1);
        mover.rollback(&map).unwrap();
        assert!(mover.is_legal());
        assert_eq!(mover.position().unwrap(), Vector2::new(4.0, 5.0));
    }
}
