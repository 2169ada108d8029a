use std::time::{Duration, Instant};

use termworld::core::builtin_content;
use termworld::engine::{
    classify_motion, Motion, MotionModel, PredictionCache, PredictionKind, Session, SessionConfig,
};
use termworld::term::FrameBuffer;
use termworld::types::{Direction, InputAction, PlayerVisualState};

fn render(_: &PlayerVisualState) -> Option<(FrameBuffer, Vec<u8>)> {
    Some((FrameBuffer::new(2, 2), b"diff".to_vec()))
}

#[test]
fn probabilities_are_conserved_under_any_history() {
    let mut model = MotionModel::default();
    let path = [
        (0, 0, Direction::Down),
        (0, 1, Direction::Down),
        (0, 1, Direction::Down),
        (0, 1, Direction::Left),
        (-1, 1, Direction::Left),
        (-2, 1, Direction::Left),
        (-2, 1, Direction::Up),
    ];
    for (x, y, d) in path {
        let p = model.record(x, y, d);
        assert!((p.cont + p.stop + p.turn - 1.0).abs() < 1e-5);
        assert!(p.cont >= 0.0 && p.stop >= 0.0 && p.turn >= 0.0);
    }
}

#[test]
fn motion_classes() {
    let a = (0, 0, Direction::Right);
    assert_eq!(classify_motion(a, (1, 0, Direction::Right)), Motion::Continue);
    assert_eq!(classify_motion(a, (0, 0, Direction::Right)), Motion::Stop);
    assert_eq!(classify_motion(a, (0, 1, Direction::Down)), Motion::Turn);
}

#[test]
fn entries_expire_after_freshness_window() {
    let state = PlayerVisualState::new("me", "Me", 0, 0);
    let t0 = Instant::now();

    let mut cache = PredictionCache::new(true);
    cache.predict(&state, t0, 1, render);
    let cont = PredictionKind::Continue.apply(&state);
    assert!(cache.lookup(cont.x, cont.y, cont.direction, t0 + Duration::from_millis(499), 1).is_some());

    cache.predict(&state, t0, 1, render);
    assert!(cache.lookup(cont.x, cont.y, cont.direction, t0 + Duration::from_millis(500), 1).is_none());
    assert_eq!(cache.stats().stale, 1);
}

#[test]
fn entries_from_an_older_baseline_are_rejected() {
    let state = PlayerVisualState::new("me", "Me", 0, 0);
    let t0 = Instant::now();
    let mut cache = PredictionCache::new(true);
    cache.predict(&state, t0, 3, render);
    let turn = PredictionKind::TurnLeft.apply(&state);
    assert!(cache.lookup(turn.x, turn.y, turn.direction, t0, 4).is_none());
    assert_eq!(cache.stats().outdated, 1);
}

#[test]
fn session_serves_a_straight_walk_from_predictions() {
    let mut s = Session::with_content(
        SessionConfig {
            seed: 5,
            view_tiles_w: 5,
            view_tiles_h: 5,
            ..SessionConfig::default()
        },
        &builtin_content(&[]),
    );
    let t0 = Instant::now();
    s.render_tick(t0, &mut Vec::new()).unwrap();

    for i in 1..=6u64 {
        let me = s.local_player();
        // Turn back whenever the way ahead is blocked.
        let (nx, ny) = me.ahead();
        let dir = if s.world_mut().is_walkable(nx, ny) {
            me.direction
        } else {
            me.direction.turn_right()
        };
        s.apply_action(InputAction::Move(dir));
        let report = s.render_tick(t0 + Duration::from_millis(50 * i), &mut Vec::new()).unwrap();
        assert!(report.predicted, "move {i} missed");
    }
    let stats = s.predictions().stats();
    assert_eq!(stats.hits, 6);
    assert_eq!(stats.misses, 0);
}
