//! The tile grid holding objects and creatures.

use crate::geometry::Point;
use crate::model::creature::{Creature, CreatureKind};
use crate::model::object::{EntityId, Object, ObjectKind};
use thiserror::Error;

pub const MAX_WIDTH: usize = 256;
pub const MAX_HEIGHT: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map size {0}x{1} exceeds {}x{}", MAX_WIDTH, MAX_HEIGHT)]
    InvalidSize(usize, usize),
    #[error("tile ({}, {}) is outside the map", .0.x, .0.y)]
    OutOfBounds(Point),
    #[error("tile ({}, {}) is already occupied", .0.x, .0.y)]
    TileOccupied(Point),
    #[error("no object at ({}, {})", .0.x, .0.y)]
    ObjectAbsent(Point),
    #[error("creature {0} is already on the map")]
    DuplicateCreature(EntityId),
    #[error("creature {0} is not on the map")]
    CreatureAbsent(EntityId),
}

/// A fixed-size grid with at most one object per tile and any number of creatures.
///
/// Objects live directly in a row-major tile cache, so lookups by point are
/// constant time and two objects can never share a tile. Creatures are kept
/// in render order (back to front), which [`Map::sort_creatures`] restores.
#[derive(Debug, Clone, PartialEq)]
pub struct Map {
    width: usize,
    height: usize,
    theme: i32,
    tiles: Vec<Option<Object>>,
    creatures: Vec<Creature>,
    last_id: EntityId,
}

impl Default for Map {
    fn default() -> Self {
        Map {
            width: 0,
            height: 0,
            theme: 0,
            tiles: Vec::new(),
            creatures: Vec::new(),
            last_id: 0,
        }
    }
}

impl Map {
    pub fn new(width: usize, height: usize, theme: i32) -> Result<Self, MapError> {
        if width > MAX_WIDTH || height > MAX_HEIGHT {
            return Err(MapError::InvalidSize(width, height));
        }
        Ok(Map {
            width,
            height,
            theme,
            tiles: vec![None; width * height],
            creatures: Vec::new(),
            last_id: 0,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn theme(&self) -> i32 {
        self.theme
    }

    pub fn in_boundaries(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    fn index(&self, p: Point) -> Option<usize> {
        self.in_boundaries(p)
            .then(|| p.y as usize * self.width + p.x as usize)
    }

    /// Hands out the next creature identifier. The first one is 1.
    pub fn generate_id(&mut self) -> EntityId {
        self.last_id = self.last_id.wrapping_add(1);
        self.last_id
    }

    pub fn object(&self, p: Point) -> Option<&Object> {
        self.index(p).and_then(|i| self.tiles[i].as_ref())
    }

    pub fn object_mut(&mut self, p: Point) -> Option<&mut Object> {
        self.index(p).and_then(move |i| self.tiles[i].as_mut())
    }

    pub fn add_object(&mut self, object: Object) -> Result<(), MapError> {
        let p = object.position;
        let index = self.index(p).ok_or(MapError::OutOfBounds(p))?;
        let tile = &mut self.tiles[index];
        if tile.is_some() {
            return Err(MapError::TileOccupied(p));
        }
        *tile = Some(object);
        Ok(())
    }

    pub fn remove_object(&mut self, p: Point) -> Result<Object, MapError> {
        let index = self.index(p).ok_or(MapError::OutOfBounds(p))?;
        self.tiles[index].take().ok_or(MapError::ObjectAbsent(p))
    }

    /// All objects in row-major order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.tiles.iter().flatten()
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.tiles.iter_mut().flatten()
    }

    pub fn object_positions(&self) -> Vec<Point> {
        self.objects().map(|o| o.position).collect()
    }

    pub fn find_object(&self, id: EntityId) -> Option<&Object> {
        self.objects().find(|o| o.id() == id)
    }

    pub fn spawn_points(&self) -> Vec<Point> {
        self.objects()
            .filter(|o| matches!(o.kind, ObjectKind::SpawnPoint))
            .map(|o| o.position)
            .collect()
    }

    pub fn add_creature(&mut self, creature: Creature) -> Result<(), MapError> {
        if self.creature(creature.id).is_some() {
            return Err(MapError::DuplicateCreature(creature.id));
        }
        self.creatures.push(creature);
        Ok(())
    }

    pub fn remove_creature(&mut self, id: EntityId) -> Result<Creature, MapError> {
        let index = self
            .creatures
            .iter()
            .position(|c| c.id == id)
            .ok_or(MapError::CreatureAbsent(id))?;
        Ok(self.creatures.remove(index))
    }

    pub fn creature(&self, id: EntityId) -> Option<&Creature> {
        self.creatures.iter().find(|c| c.id == id)
    }

    pub fn creature_mut(&mut self, id: EntityId) -> Option<&mut Creature> {
        self.creatures.iter_mut().find(|c| c.id == id)
    }

    /// Creatures in render order.
    pub fn creatures(&self) -> &[Creature] {
        &self.creatures
    }

    pub fn creature_ids(&self) -> Vec<EntityId> {
        self.creatures.iter().map(|c| c.id).collect()
    }

    pub fn bombermen(&self) -> impl Iterator<Item = &Creature> {
        self.creatures
            .iter()
            .filter(|c| matches!(c.kind, CreatureKind::Bomberman(_)))
    }

    pub fn monsters(&self) -> impl Iterator<Item = &Creature> {
        self.creatures
            .iter()
            .filter(|c| matches!(c.kind, CreatureKind::Monster(_)))
    }

    pub fn bomberman_of(&self, player: u8) -> Option<&Creature> {
        self.bombermen()
            .find(|c| c.as_bomberman().map(|b| b.player) == Some(player))
    }

    /// Restores back-to-front order after creatures moved vertically.
    pub fn sort_creatures(&mut self) {
        self.creatures
            .sort_by(|a, b| a.position.y.total_cmp(&b.position.y));
    }

    /// Empties the map and restarts identifier generation.
    pub fn remove_all(&mut self) {
        self.tiles.iter_mut().for_each(|t| *t = None);
        self.creatures.clear();
        self.last_id = 0;
    }

    /// Replaces this map with a copy of a level template.
    ///
    /// Spawn points and bombermen stay behind; monsters and the identifier
    /// counter come along so new creatures never reuse a template id.
    pub fn transfer(&mut self, source: &Map) {
        self.width = source.width;
        self.height = source.height;
        self.theme = source.theme;
        self.last_id = source.last_id;
        self.tiles = source
            .tiles
            .iter()
            .map(|tile| match tile {
                Some(o) if matches!(o.kind, ObjectKind::SpawnPoint) => None,
                other => other.clone(),
            })
            .collect();
        self.creatures = source.monsters().cloned().collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector2;
    use crate::model::creature::MonsterKind;
    use crate::model::object::{BombKind, PowerUpKind};
    use crate::time::Span;

    fn sample_map() -> Map {
        let mut map = Map::new(9, 7, 2).unwrap();
        map.add_object(Object::wall(Point::new(1, 1), false, None)).unwrap();
        map.add_object(Object::wall(
            Point::new(2, 1),
            true,
            Some(Object::power_up(Point::new(2, 1), PowerUpKind::Power, Span::from_secs(30))),
        ))
        .unwrap();
        map.add_object(Object::spawn_point(Point::new(0, 0))).unwrap();
        let id = map.generate_id();
        map.add_creature(Creature::monster(id, MonsterKind::Zombie, Vector2::new(4.0, 4.0)))
            .unwrap();
        let id = map.generate_id();
        map.add_creature(Creature::bomberman(id, 0, Vector2::new(0.0, 0.0)))
            .unwrap();
        map
    }

    #[test]
    fn test_add_rejects_occupied_and_out_of_bounds() {
        let mut map = Map::new(5, 5, 0).unwrap();
        map.add_object(Object::wall(Point::new(2, 2), false, None)).unwrap();
        assert_eq!(
            map.add_object(Object::bomb(Point::new(2, 2), BombKind::Normal, 1, 2, Span::from_secs(3))),
            Err(MapError::TileOccupied(Point::new(2, 2)))
        );
        assert_eq!(
            map.add_object(Object::spawn_point(Point::new(5, 0))),
            Err(MapError::OutOfBounds(Point::new(5, 0)))
        );
        assert!(map.object(Point::new(2, 2)).unwrap().is_wall());
        assert_eq!(map.objects().count(), 1);
    }

    #[test]
    fn test_remove_requires_presence() {
        let mut map = Map::new(5, 5, 0).unwrap();
        assert_eq!(
            map.remove_object(Point::new(1, 1)),
            Err(MapError::ObjectAbsent(Point::new(1, 1)))
        );
        map.add_object(Object::spawn_point(Point::new(1, 1))).unwrap();
        assert!(map.remove_object(Point::new(1, 1)).is_ok());
        assert!(map.object(Point::new(1, 1)).is_none());
    }

    #[test]
    fn test_rejects_oversized_maps() {
        assert!(Map::new(257, 10, 0).is_err());
        assert!(Map::new(256, 256, 0).is_ok());
        assert!(Map::default().objects().next().is_none());
        assert!(!Map::default().in_boundaries(Point::new(0, 0)));
    }

    #[test]
    fn test_id_generator_resets() {
        let mut map = sample_map();
        assert_eq!(map.generate_id(), 3);
        map.remove_all();
        assert_eq!(map.generate_id(), 1);
        assert_eq!(map.objects().count(), 0);
        assert!(map.creatures().is_empty());
    }

    #[test]
    fn test_transfer_strips_spawn_points_and_bombermen() {
        let source = sample_map();
        let mut target = Map::new(3, 3, 0).unwrap();
        target.add_object(Object::wall(Point::new(0, 0), false, None)).unwrap();
        target.transfer(&source);

        assert_eq!(target.width(), 9);
        assert_eq!(target.height(), 7);
        assert_eq!(target.theme(), 2);
        assert!(target.spawn_points().is_empty());
        assert!(target.object(Point::new(0, 0)).is_none());
        assert_eq!(
            target.object(Point::new(2, 1)),
            source.object(Point::new(2, 1))
        );
        let source_objects: Vec<_> = source
            .objects()
            .filter(|o| !matches!(o.kind, ObjectKind::SpawnPoint))
            .collect();
        let target_objects: Vec<_> = target.objects().collect();
        assert_eq!(source_objects, target_objects);
        assert_eq!(target.bombermen().count(), 0);
        assert_eq!(
            target.monsters().collect::<Vec<_>>(),
            source.monsters().collect::<Vec<_>>()
        );
        assert_eq!(target.generate_id(), 3);
    }

    #[test]
    fn test_sort_creatures_by_y() {
        let mut map = sample_map();
        map.sort_creatures();
        let ys: Vec<f32> = map.creatures().iter().map(|c| c.position.y).collect();
        assert_eq!(ys, vec![0.0, 4.0]);
        assert_eq!(map.bomberman_of(0).map(|c| c.id), Some(2));
    }
}
