use std::time::Duration;

use rand::rngs::mock::StepRng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use wavefarm_core::{Action, AreaInfo, KeyBinding, Settings, Timestamp, Vec2};
use wavefarm_system_movement::{plan_path, BlinkPacer, Path, PathFollower};
use wavefarm_world::{AreaContext, WalkabilityGrid};

fn never_blink() -> StepRng {
    StepRng::new(u64::MAX, 0)
}

fn always_blink() -> StepRng {
    StepRng::new(0, 0)
}

fn area(map: &str) -> AreaContext {
    AreaContext::from_grid(
        AreaInfo {
            hash: 1,
            is_hideout: false,
        },
        WalkabilityGrid::from_ascii(map),
        4,
        Timestamp::ZERO,
    )
}

#[test]
fn long_paths_time_out_after_twenty_seconds() {
    let created = Timestamp::from_secs(100);
    let path = Path::new(vec![Vec2::ZERO, Vec2::new(2500.0, 0.0)], created);

    assert_eq!(path.timeout(), Duration::from_secs(20));
    assert!(!path.is_stale(Timestamp::from_millis(119_999)));
    assert!(path.is_stale(Timestamp::from_secs(120)));
}

#[test]
fn thousand_unit_paths_time_out_after_ten_seconds() {
    let path = Path::new(vec![Vec2::ZERO, Vec2::new(1000.0, 0.0)], Timestamp::ZERO);

    assert_eq!(path.timeout(), Duration::from_secs(10));
    assert!(!path.is_stale(Timestamp::from_millis(9_999)));
    assert!(path.is_stale(Timestamp::from_secs(10)));
}

#[test]
fn short_paths_time_out_after_five_seconds() {
    let path = Path::new(vec![Vec2::ZERO, Vec2::new(30.0, 40.0)], Timestamp::ZERO);

    assert_eq!(path.initial_distance(), 50.0);
    assert_eq!(path.timeout(), Duration::from_secs(5));
    assert!(path.is_stale(Timestamp::from_secs(5)));
}

#[test]
fn mid_range_timeout_scales_with_distance() {
    let path = Path::new(vec![Vec2::ZERO, Vec2::new(0.0, 800.0)], Timestamp::ZERO);
    assert_eq!(path.timeout(), Duration::from_secs(8));
}

#[test]
fn planned_path_ends_at_exact_destination() {
    let area = area(
        "
        ..........
        ..........
        ######....
        ..........
        ",
    );
    let destination = Vec2::new(1.5, 3.7);

    let path = plan_path(&area, Vec2::new(0.2, 0.2), destination, 0.0, Timestamp::ZERO)
        .expect("route around the wall");

    assert_eq!(path.destination(), destination);
    assert_eq!(path.nodes().last(), Some(destination));
    assert_eq!(path.next(), Some(Vec2::ZERO));
    for waypoint in path.nodes() {
        assert!(area.is_walkable(waypoint));
    }
}

#[test]
fn unreachable_destinations_have_no_path() {
    let area = area(
        "
        ..#..
        ..#..
        ",
    );

    assert!(plan_path(&area, Vec2::ZERO, Vec2::new(4.0, 1.0), 0.0, Timestamp::ZERO).is_none());
    assert!(plan_path(&area, Vec2::ZERO, Vec2::new(2.0, 0.0), 0.0, Timestamp::ZERO).is_none());
}

#[test]
fn follower_moves_toward_next_waypoint_and_consumes_it_when_close() {
    let settings = Settings::default();
    let mut path = Path::new(
        vec![Vec2::ZERO, Vec2::new(50.0, 0.0), Vec2::new(50.0, 50.0)],
        Timestamp::ZERO,
    );
    let mut follower = PathFollower::new();
    let mut rng = never_blink();
    let mut actions = Vec::new();

    assert!(follower.follow(&mut path, Vec2::ZERO, Timestamp::ZERO, &mut rng, &settings, &mut actions));
    assert_eq!(
        actions,
        vec![Action::MoveToward {
            target: Vec2::ZERO,
            key: settings.movement_key.clone(),
        }]
    );
    assert_eq!(path.next(), Some(Vec2::new(50.0, 0.0)));

    actions.clear();
    assert!(follower.follow(&mut path, Vec2::ZERO, Timestamp::ZERO, &mut rng, &settings, &mut actions));
    assert_eq!(path.len(), 2);

    assert!(follower.follow(
        &mut path,
        Vec2::new(45.0, 0.0),
        Timestamp::ZERO,
        &mut rng,
        &settings,
        &mut actions
    ));
    assert_eq!(path.next(), Some(Vec2::new(50.0, 50.0)));
}

#[test]
fn exhausted_paths_emit_nothing() {
    let settings = Settings::default();
    let mut path = Path::new(Vec::new(), Timestamp::ZERO);
    let mut follower = PathFollower::new();
    let mut actions = Vec::new();

    assert!(!follower.follow(
        &mut path,
        Vec2::ZERO,
        Timestamp::ZERO,
        &mut never_blink(),
        &settings,
        &mut actions
    ));
    assert!(actions.is_empty());
}

#[test]
fn blink_substitution_respects_cooldown() {
    let settings = Settings::default();
    let mut pacer = BlinkPacer::new(Timestamp::ZERO);
    let mut rng = always_blink();

    let first = pacer.choose(Timestamp::from_millis(10), &mut rng, &settings).clone();
    assert_eq!(first, settings.blink_key);
    assert_eq!(pacer.ready_at(), Timestamp::from_millis(10 + 750 + 500));

    let during = pacer.choose(Timestamp::from_millis(1_000), &mut rng, &settings).clone();
    assert_eq!(during, settings.movement_key);

    let after = pacer.choose(Timestamp::from_millis(1_261), &mut rng, &settings).clone();
    assert_eq!(after, KeyBinding::from_static("W"));
}

#[test]
fn blink_is_never_chosen_at_the_cooldown_instant() {
    let settings = Settings::default();
    let mut pacer = BlinkPacer::new(Timestamp::from_secs(2));

    let key = pacer.choose(Timestamp::from_secs(2), &mut always_blink(), &settings).clone();
    assert_eq!(key, settings.movement_key);
}

#[test]
fn seeded_blink_rolls_are_reproducible() {
    let settings = Settings::default();
    let run = |seed: u64| {
        let mut pacer = BlinkPacer::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (1..200)
            .map(|step| {
                pacer
                    .choose(Timestamp::from_millis(step * 100), &mut rng, &settings)
                    .clone()
            })
            .collect::<Vec<_>>()
    };

    let first = run(42);
    assert_eq!(first, run(42));
    assert!(first.contains(&settings.blink_key));
    assert!(first.contains(&settings.movement_key));
}
