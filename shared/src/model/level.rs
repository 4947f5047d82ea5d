//! Predefined levels for both game modes.

use crate::geometry::{Point, Vector2};
use crate::model::creature::{Creature, MonsterKind};
use crate::model::map::{Map, MapError};
use crate::model::object::{Bonus, Object, PowerUp, PowerUpKind};
use crate::model::status::Mode;
use crate::time::Span;
use rand::Rng;

const WIDTH: usize = 17;
const HEIGHT: usize = 11;

#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub number: i32,
    pub map: Map,
    pub time_limit: Span,
}

impl Level {
    pub const DEFAULT_TIME_LIMIT: Span = Span::from_millis(120_900);

    /// Builds level `number` of `mode`, or `None` past the last level.
    pub fn predefined<R: Rng + ?Sized>(
        mode: Mode,
        number: i32,
        rng: &mut R,
    ) -> Result<Option<Level>, MapError> {
        let map = match (mode, number) {
            (Mode::Cooperation, 1) => first_map(rng)?,
            (Mode::Cooperation, 2) => second_map(rng)?,
            (Mode::Cooperation, 3) => third_map()?,
            (Mode::Versus, 1) => first_versus_map(rng)?,
            (Mode::Versus, 2) => second_versus_map(rng)?,
            _ => return Ok(None),
        };
        Ok(Some(Level {
            number,
            map,
            time_limit: Self::DEFAULT_TIME_LIMIT,
        }))
    }

    pub fn empty(number: i32, width: usize, height: usize, theme: i32) -> Result<Level, MapError> {
        Ok(Level {
            number,
            map: Map::new(width, height, theme)?,
            time_limit: Span::ZERO,
        })
    }
}

fn roll_item<R: Rng + ?Sized>(
    rng: &mut R,
    bonus_chance: f64,
    power_up_chance: f64,
    position: Point,
) -> Option<Object> {
    let roll: f64 = rng.gen();
    if roll < bonus_chance {
        Some(Object::bonus(
            position,
            Bonus::random_sprite(rng),
            Bonus::DEFAULT_TIMER,
        ))
    } else if roll < bonus_chance + power_up_chance {
        Some(Object::power_up(
            position,
            PowerUpKind::random(rng),
            PowerUp::DEFAULT_TIMER,
        ))
    } else {
        None
    }
}

fn wall(map: &mut Map, x: i32, y: i32, destructible: bool) -> Result<(), MapError> {
    map.add_object(Object::wall(Point::new(x, y), destructible, None))
}

fn item_wall<R: Rng + ?Sized>(map: &mut Map, rng: &mut R, x: i32, y: i32) -> Result<(), MapError> {
    let p = Point::new(x, y);
    let item = roll_item(rng, 0.4, 0.2, p);
    map.add_object(Object::wall(p, true, item))
}

fn monster(map: &mut Map, kind: MonsterKind, x: f32, y: f32) -> Result<(), MapError> {
    let id = map.generate_id();
    map.add_creature(Creature::monster(id, kind, Vector2::new(x, y)))
}

fn corner_spawn_points(map: &mut Map, inset: i32) -> Result<(), MapError> {
    let (right, bottom) = (WIDTH as i32 - 1 - inset, HEIGHT as i32 - 1 - inset);
    for (x, y) in [(inset, inset), (right, inset), (inset, bottom), (right, bottom)] {
        map.add_object(Object::spawn_point(Point::new(x, y)))?;
    }
    Ok(())
}

/// Indestructible pillars on every other tile of a rectangle.
fn pillar_grid(map: &mut Map, start: Point, end: Point) -> Result<(), MapError> {
    for x in (start.x..=end.x).step_by(2) {
        for y in (start.y..=end.y).step_by(2) {
            wall(map, x, y, false)?;
        }
    }
    Ok(())
}

fn first_map<R: Rng + ?Sized>(rng: &mut R) -> Result<Map, MapError> {
    let mut map = Map::new(WIDTH, HEIGHT, 0)?;
    pillar_grid(&mut map, Point::new(1, 1), Point::new(15, 10))?;

    for x in (6..11).step_by(2) {
        item_wall(&mut map, rng, x, 3)?;
        item_wall(&mut map, rng, x, 7)?;
    }
    for y in (4..7).step_by(2) {
        item_wall(&mut map, rng, 5, y)?;
        item_wall(&mut map, rng, 11, y)?;
    }
    map.add_object(Object::power_up(
        Point::new(8, 5),
        PowerUpKind::RemoteBomb,
        PowerUp::DEFAULT_TIMER,
    ))?;

    for (x, y) in [(6.0, 4.0), (10.0, 4.0), (6.0, 6.0), (10.0, 6.0)] {
        monster(&mut map, MonsterKind::Zombie, x, y)?;
    }
    corner_spawn_points(&mut map, 0)?;
    Ok(map)
}

fn second_map<R: Rng + ?Sized>(rng: &mut R) -> Result<Map, MapError> {
    const ROWS: [(i32, &[i32]); 8] = [
        (1, &[1, 3, 5, 7, 9, 11, 13, 15]),
        (2, &[0, 2, 4, 6, 8, 10, 12, 14]),
        (4, &[0, 2, 4, 6, 8, 10, 12, 14, 16]),
        (5, &[2, 3, 4, 6, 7, 8, 9, 10, 11, 13, 14, 15]),
        (6, &[1, 3, 5, 7, 9, 11, 13, 15]),
        (8, &[1, 3, 5, 7, 9, 11, 13, 15]),
        (9, &[0, 2, 4, 6, 8, 10, 12, 14]),
        (10, &[16]),
    ];
    let mut map = Map::new(WIDTH, HEIGHT, 0)?;
    for (y, xs) in ROWS {
        for &x in xs {
            wall(&mut map, x, y, false)?;
        }
    }

    for x in [8, 10, 12, 14] {
        item_wall(&mut map, rng, x, 1)?;
    }
    for (x, y) in [
        (3, 2),
        (2, 3),
        (3, 4),
        (9, 2),
        (8, 3),
        (9, 4),
        (8, 6),
        (9, 7),
        (8, 8),
        (14, 6),
        (15, 7),
        (14, 8),
    ] {
        wall(&mut map, x, y, true)?;
    }

    let boots_timer = PowerUp::DEFAULT_TIMER + PowerUp::DEFAULT_TIMER;
    map.add_object(Object::power_up(Point::new(5, 5), PowerUpKind::Speed, boots_timer))?;
    map.add_object(Object::power_up(Point::new(12, 5), PowerUpKind::Speed, boots_timer))?;

    for (x, y) in [(15.0, 2.0), (3.0, 3.0), (14.0, 7.0)] {
        monster(&mut map, MonsterKind::Mummy, x, y)?;
    }
    for (x, y) in [(2.0, 6.0), (4.0, 8.0), (6.0, 6.0)] {
        monster(&mut map, MonsterKind::Zombie, x, y)?;
    }

    for (x, y) in [(0, 0), (0, 1), (0, 10), (1, 9)] {
        map.add_object(Object::spawn_point(Point::new(x, y)))?;
    }
    Ok(map)
}

fn third_map() -> Result<Map, MapError> {
    let mut map = Map::new(WIDTH, HEIGHT, 0)?;
    pillar_grid(&mut map, Point::new(1, 0), Point::new(3, 10))?;
    pillar_grid(&mut map, Point::new(5, 1), Point::new(7, 9))?;
    pillar_grid(&mut map, Point::new(9, 0), Point::new(11, 10))?;
    pillar_grid(&mut map, Point::new(13, 1), Point::new(15, 9))?;

    monster(&mut map, MonsterKind::Chicken, 8.0, 5.0)?;
    corner_spawn_points(&mut map, 0)?;
    Ok(map)
}

fn first_versus_map<R: Rng + ?Sized>(rng: &mut R) -> Result<Map, MapError> {
    let mut map = Map::new(WIDTH, HEIGHT, 0)?;
    let is_corner_gap = |x: i32, y: i32| {
        let edge_x = x <= 1 || x >= 15;
        let edge_y = y <= 1 || y >= 9;
        edge_x && edge_y
    };

    for x in (1..17).step_by(2) {
        for y in (1..11).step_by(2) {
            wall(&mut map, x, y, false)?;
        }
    }
    for x in (0..17).step_by(2) {
        for y in (1..11).step_by(2) {
            if !is_corner_gap(x, y) {
                wall(&mut map, x, y, true)?;
            }
        }
    }
    for x in (1..17).step_by(2) {
        for y in (0..11).step_by(2) {
            if !is_corner_gap(x, y) {
                wall(&mut map, x, y, true)?;
            }
        }
    }

    let timer = PowerUp::DEFAULT_TIMER + PowerUp::DEFAULT_TIMER + PowerUp::DEFAULT_TIMER;
    for x in (2..=14).step_by(2) {
        for y in (2..=8).step_by(2) {
            let kind = PowerUpKind::random(rng);
            map.add_object(Object::power_up(Point::new(x, y), kind, timer))?;
        }
    }

    corner_spawn_points(&mut map, 0)?;
    Ok(map)
}

/// One mirrored quarter of the second versus arena, anchored at a corner.
fn versus_quarter<R: Rng + ?Sized>(
    map: &mut Map,
    rng: &mut R,
    origin: Point,
    dx: i32,
    dy: i32,
) -> Result<(), MapError> {
    let at = |ox: i32, oy: i32| Point::new(origin.x + dx * ox, origin.y + dy * oy);

    map.add_object(Object::spawn_point(at(1, 0)))?;
    for (ox, oy) in [
        (2, 0),
        (1, 1),
        (5, 4),
        (1, 3),
        (0, 4),
        (1, 4),
        (3, 2),
        (3, 3),
        (4, 3),
        (5, 1),
        (6, 1),
        (7, 2),
    ] {
        map.add_object(Object::wall(at(ox, oy), false, None))?;
    }
    for (ox, oy) in [(1, 2), (2, 3), (4, 0)] {
        map.add_object(Object::wall(at(ox, oy), true, None))?;
    }
    for (ox, oy) in [(3, 4), (4, 4)] {
        let sprite = Bonus::random_sprite(rng);
        map.add_object(Object::bonus(at(ox, oy), sprite, Bonus::DEFAULT_TIMER))?;
    }
    map.add_object(Object::power_up(
        at(7, 1),
        PowerUpKind::FullSpeed,
        PowerUp::DEFAULT_TIMER,
    ))
}

fn second_versus_map<R: Rng + ?Sized>(rng: &mut R) -> Result<Map, MapError> {
    let mut map = Map::new(WIDTH, HEIGHT, 0)?;
    versus_quarter(&mut map, rng, Point::new(0, 0), 1, 1)?;
    versus_quarter(&mut map, rng, Point::new(16, 0), -1, 1)?;
    versus_quarter(&mut map, rng, Point::new(0, 10), 1, -1)?;
    versus_quarter(&mut map, rng, Point::new(16, 10), -1, -1)?;

    for x in (0..17).filter(|x| !(6..=10).contains(x)) {
        wall(&mut map, x, 5, false)?;
    }
    for y in (0..11).filter(|y| !(3..=7).contains(y)) {
        wall(&mut map, 8, y, false)?;
    }
    map.add_object(Object::power_up(
        Point::new(8, 5),
        PowerUpKind::Invulnerability,
        PowerUp::SHORT_TIMER,
    ))?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::object::ObjectKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_every_level_builds() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for (mode, count) in [(Mode::Cooperation, 3), (Mode::Versus, 2)] {
                for number in 1..=count {
                    let level = Level::predefined(mode, number, &mut rng)
                        .unwrap()
                        .unwrap();
                    assert_eq!(level.number, number);
                    assert_eq!((level.map.width(), level.map.height()), (17, 11));
                    assert_eq!(level.time_limit, Level::DEFAULT_TIME_LIMIT);
                    assert_eq!(level.map.spawn_points().len(), 4);
                }
            }
        }
    }

    #[test]
    fn test_levels_past_the_end() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(Level::predefined(Mode::Cooperation, 4, &mut rng).unwrap().is_none());
        assert!(Level::predefined(Mode::Versus, 3, &mut rng).unwrap().is_none());
        assert!(Level::predefined(Mode::Versus, 0, &mut rng).unwrap().is_none());
    }

    #[test]
    fn test_cooperation_levels_have_monsters() {
        let mut rng = StdRng::seed_from_u64(3);
        let counts: Vec<usize> = (1..=3)
            .map(|n| {
                Level::predefined(Mode::Cooperation, n, &mut rng)
                    .unwrap()
                    .unwrap()
                    .map
                    .monsters()
                    .count()
            })
            .collect();
        assert_eq!(counts, vec![4, 6, 1]);
    }

    #[test]
    fn test_versus_corners_leave_room_to_escape() {
        let mut rng = StdRng::seed_from_u64(11);
        let level = Level::predefined(Mode::Versus, 1, &mut rng).unwrap().unwrap();
        for (x, y) in [(1, 0), (0, 1), (15, 10), (16, 9)] {
            assert!(level.map.object(Point::new(x, y)).is_none());
        }
        let destructible = level
            .map
            .objects()
            .filter(|o| matches!(&o.kind, ObjectKind::Wall(w) if w.destructible))
            .count();
        assert!(destructible > 0);
    }
}
