//! Performance benchmarks for critical game systems

use rand::rngs::StdRng;
use rand::SeedableRng;
use server::controller::ServerController;
use server::interface::{LocalInterface, MessageInterface};
use server::session::UPDATE_INTERVAL;
use shared::blast::BlastMapper;
use shared::framing::{encode_frame, FrameReader};
use shared::model::{BombKind, Level, Map, Mode, Object, Phase};
use shared::mover::CreatureMover;
use shared::protocol::{MapEvent, MessageEvent};
use shared::{Point, Span, Vector2};
use std::time::Instant;

/// Benchmarks blast shape computation on an open map
#[test]
fn benchmark_blast_mapping() {
    let mut map = Map::new(17, 11, 0).unwrap();
    let center = Point::new(8, 5);
    map.add_object(Object::bomb(center, BombKind::Normal, 1, 6, Span::ZERO))
        .unwrap();
    let bomb = map.object(center).and_then(|o| o.as_bomb()).cloned().unwrap();
    let mut mapper = BlastMapper::new();

    let iterations = 10_000;
    let start = Instant::now();

    for _ in 0..iterations {
        mapper.clear();
        mapper.start(&map, center, &bomb).unwrap();
        for p in mapper.hit_points() {
            let _ = mapper.make_blast(Span::from_millis(500), p);
        }
    }

    let duration = start.elapsed();
    println!(
        "Blast mapping: {} iterations in {:?} ({:.2} μs/iter)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Benchmarks creature movement over a generated level
#[test]
fn benchmark_creature_movement() {
    let mut rng = StdRng::seed_from_u64(7);
    let level = Level::predefined(Mode::Cooperation, 1, &mut rng)
        .unwrap()
        .unwrap();
    let origin = level.map.spawn_points()[0].to_vector();
    let mut mover = CreatureMover::new();

    let iterations = 10_000;
    let start = Instant::now();

    for i in 0..iterations {
        mover.set_active(&level.map, origin);
        let delta = match i % 4 {
            0 => Vector2::new(0.8, 0.0),
            1 => Vector2::new(-0.8, 0.0),
            2 => Vector2::new(0.0, 0.8),
            _ => Vector2::new(0.0, -0.8),
        };
        mover.move_by(&level.map, delta).unwrap();
    }

    let duration = start.elapsed();
    println!(
        "Creature movement: {} moves in {:?} ({:.2} μs/move)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 1 second
    assert!(duration.as_millis() < 1000);
}

/// Benchmarks framing and decoding of a full map replay
#[test]
fn benchmark_map_replay_framing() {
    let mut rng = StdRng::seed_from_u64(3);
    let level = Level::predefined(Mode::Cooperation, 2, &mut rng)
        .unwrap()
        .unwrap();
    let messages: Vec<MessageEvent> = level
        .map
        .objects()
        .filter_map(|o| MapEvent::spawn_object(o).ok())
        .chain(level.map.creatures().iter().map(MapEvent::spawn_creature))
        .map(MessageEvent::MapEvent)
        .collect();
    assert!(!messages.is_empty());

    let iterations = 200;
    let start = Instant::now();

    for _ in 0..iterations {
        let mut reader = FrameReader::new();
        for message in &messages {
            reader.push(&encode_frame(message).unwrap());
        }
        let mut decoded = 0;
        while let Some(message) = reader.next_message().unwrap() {
            message.unwrap();
            decoded += 1;
        }
        assert_eq!(decoded, messages.len());
    }

    let duration = start.elapsed();
    println!(
        "Map replay framing: {} replays of {} messages in {:?} ({:.2} μs/replay)",
        iterations,
        messages.len(),
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}

/// Stress tests a running session with monsters and pending bombs
#[test]
fn stress_test_session_updates() {
    let mut controller = ServerController::with_seed(21);
    controller.join(0, "ann", true).unwrap();
    let (mut server_end, mut client) = LocalInterface::pair();
    server_end.suspend();
    controller
        .replace_interface(0, Box::new(server_end))
        .unwrap();
    client.send(&MessageEvent::StartGame);

    let iterations = 3_000;
    let start = Instant::now();

    for i in 0..iterations {
        if i % 90 == 0 {
            client.send(&MessageEvent::PlayerBomb(BombKind::Normal));
        }
        controller.update(UPDATE_INTERVAL);
        while client.receive().is_some() {}
    }

    let duration = start.elapsed();
    println!(
        "Session updates: {} steps in {:?} ({:.2} μs/step), ended in {:?}",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64,
        controller.game().status.phase()
    );

    assert_ne!(controller.game().status.phase(), Phase::Lobby);
    // Should complete in under 5 seconds
    assert!(duration.as_millis() < 5000);
}

/// Benchmarks level generation with random item rolls
#[test]
fn benchmark_level_generation() {
    let mut rng = StdRng::seed_from_u64(1);
    let iterations = 1_000;
    let start = Instant::now();

    for i in 0..iterations {
        let mode = if i % 2 == 0 { Mode::Cooperation } else { Mode::Versus };
        let level = Level::predefined(mode, 1 + i % 2, &mut rng).unwrap();
        assert!(level.is_some());
    }

    let duration = start.elapsed();
    println!(
        "Level generation: {} levels in {:?} ({:.2} μs/level)",
        iterations,
        duration,
        duration.as_micros() as f64 / iterations as f64
    );

    // Should complete in under 2 seconds
    assert!(duration.as_millis() < 2000);
}
