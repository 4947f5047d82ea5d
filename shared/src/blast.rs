//! Explosion reach over the tile grid.
//!
//! A bomb sends one fragment in each direction. Fragments travel tile by
//! tile, marking every tile they touch, until their power runs out or the
//! next tile is a wall or the map edge. The blocked wall tile is marked too,
//! so destructible walls can be destroyed. Split bombs additionally fork
//! into two perpendicular fragments in front of each obstacle.

use crate::geometry::{Orientation, Point};
use crate::model::map::Map;
use crate::model::object::{Bomb, BombKind, BlastKind, EntityId, Object};
use crate::time::Span;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlastError {
    #[error("blast computation already started")]
    AlreadyStarted,
    #[error("blast computation not started")]
    NotStarted,
    #[error("bomb at ({}, {}) is outside the map", .0.x, .0.y)]
    OutOfBounds(Point),
}

#[derive(Debug, Clone, Copy)]
struct Fragment {
    power: i32,
    orientation: Orientation,
    point: Point,
    split: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BlastMapper {
    width: usize,
    height: usize,
    hit: Vec<bool>,
    fragments: VecDeque<Fragment>,
    started: bool,
    owner: Option<EntityId>,
    forks: usize,
}

impl BlastMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Avatar credited with the blast, if it is still on the map.
    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    /// Number of perpendicular fragments spawned by split bombs so far.
    pub fn forks(&self) -> usize {
        self.forks
    }

    pub fn is_hit(&self, p: Point) -> bool {
        self.index(p).map_or(false, |i| self.hit[i])
    }

    /// Every tile marked so far, in row-major order.
    pub fn hit_points(&self) -> Vec<Point> {
        (0..self.height as i32)
            .flat_map(|y| (0..self.width as i32).map(move |x| Point::new(x, y)))
            .filter(|p| self.is_hit(*p))
            .collect()
    }

    pub fn clear(&mut self) {
        self.started = false;
        self.owner = None;
        self.forks = 0;
        self.fragments.clear();
        self.hit.iter_mut().for_each(|h| *h = false);
    }

    /// Begins a new computation from the bomb at `position`.
    pub fn start(&mut self, map: &Map, position: Point, bomb: &Bomb) -> Result<(), BlastError> {
        if self.started {
            return Err(BlastError::AlreadyStarted);
        }
        self.sync(map);
        self.started = true;
        self.owner = map.bombermen().find(|c| c.id == bomb.owner).map(|c| c.id);
        self.add(map, position, bomb)
    }

    /// Folds another bomb into the running computation.
    pub fn add(&mut self, map: &Map, position: Point, bomb: &Bomb) -> Result<(), BlastError> {
        if !self.started {
            return Err(BlastError::NotStarted);
        }
        if !map.in_boundaries(position) {
            return Err(BlastError::OutOfBounds(position));
        }
        self.sync(map);
        if bomb.power > 0 {
            let split = bomb.kind == BombKind::Split;
            for &orientation in Orientation::ALL {
                self.fragments.push_back(Fragment {
                    power: bomb.power,
                    orientation,
                    point: position,
                    split,
                });
            }
            self.process(map);
        }
        Ok(())
    }

    /// Marks every tile that is not a wall.
    pub fn nuke(&mut self, map: &Map) -> Result<(), BlastError> {
        if self.started {
            return Err(BlastError::AlreadyStarted);
        }
        self.sync(map);
        self.started = true;
        self.owner = None;
        let (width, height) = (self.width as i32, self.height as i32);
        for p in (0..height).flat_map(|y| (0..width).map(move |x| Point::new(x, y))) {
            if !map.object(p).map_or(false, Object::is_wall) {
                if let Some(i) = self.index(p) {
                    self.hit[i] = true;
                }
            }
        }
        Ok(())
    }

    /// Builds the blast object shown on hit tile `p`.
    pub fn make_blast(&self, timer: Span, p: Point) -> Object {
        let neighbors: Vec<Orientation> = Orientation::ALL
            .iter()
            .copied()
            .filter(|&o| self.is_hit(p.offset(o)))
            .collect();

        let (kind, orientation) = match neighbors.as_slice() {
            [] => (BlastKind::Single, Orientation::Bottom),
            [only] => (BlastKind::Edge, only.opposite()),
            [a, b] if !a.is_vertical() && !b.is_vertical() => {
                (BlastKind::Horizontal, Orientation::Bottom)
            }
            [a, b] if a.is_vertical() && b.is_vertical() => (BlastKind::Vertical, Orientation::Bottom),
            _ => (BlastKind::Multiple, Orientation::Bottom),
        };
        Object::blast(p, kind, orientation, self.owner.unwrap_or(0), timer)
    }

    fn index(&self, p: Point) -> Option<usize> {
        let inside =
            p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height;
        inside.then(|| p.y as usize * self.width + p.x as usize)
    }

    fn sync(&mut self, map: &Map) {
        if self.width != map.width() || self.height != map.height() {
            self.width = map.width();
            self.height = map.height();
            self.hit = vec![false; self.width * self.height];
        }
    }

    fn mark(&mut self, p: Point) -> bool {
        match self.index(p) {
            Some(i) => {
                self.hit[i] = true;
                true
            }
            None => false,
        }
    }

    fn process(&mut self, map: &Map) {
        while let Some(f) = self.fragments.pop_front() {
            if !self.mark(f.point) || f.power <= 0 {
                continue;
            }
            let next = f.point.offset(f.orientation);
            let blocked = !map.in_boundaries(next) || map.object(next).map_or(false, Object::is_wall);
            if !blocked {
                self.fragments.push_back(Fragment {
                    power: f.power - 1,
                    point: next,
                    ..f
                });
                continue;
            }

            if f.split {
                let sides = if f.orientation.is_vertical() {
                    [Orientation::Left, Orientation::Right]
                } else {
                    [Orientation::Top, Orientation::Bottom]
                };
                for side in sides {
                    self.fork(map, &f, side);
                }
            }
            // The obstacle itself is reached but not crossed.
            self.fragments.push_back(Fragment {
                power: 0,
                point: next,
                ..f
            });
        }
    }

    fn fork(&mut self, map: &Map, from: &Fragment, orientation: Orientation) {
        let start = from.point.offset(orientation);
        if !map.in_boundaries(start) {
            return;
        }
        let power = if map.object(start).map_or(false, Object::is_wall) {
            0
        } else {
            from.power - 1
        };
        self.forks += 1;
        self.fragments.push_back(Fragment {
            power,
            orientation,
            point: start,
            split: true,
        });
    }
}
