use dragsim::core::obstacles::{ObstaclePars, ObstacleSet, Ramp};
use dragsim::core::session::{GamePars, GameState, Session, SessionCommand};
use dragsim::interfaces::clock::{Clock, ManualClock};
use dragsim::interfaces::input::{InputState, Key};
use dragsim::interfaces::render::DrawList;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn racing_session(seed: u64, clock: &ManualClock) -> Session {
    let mut session = Session::new(GamePars::default(), StdRng::seed_from_u64(seed));
    let idle = InputState::new();

    session.on_key_press(Key::Space, clock.now_ms());
    session.on_key_press(Key::Space, clock.now_ms());
    while session.game_state == GameState::Countdown {
        clock.advance(16);
        session.update(clock, &idle);
    }
    session
}

#[test]
fn race_keeps_running_until_both_cars_are_through() {
    let clock = ManualClock::new(0);
    let mut session = racing_session(11, &clock);
    assert_eq!(session.game_state, GameState::Racing);

    // the human player never touches the throttle
    let idle = InputState::new();
    for _ in 0..36_000 {
        clock.advance(16);
        session.update(&clock, &idle);
        if session.opponent.finished {
            break;
        }
    }

    assert!(session.opponent.finished);
    assert!(!session.player.finished);
    assert_eq!(session.player.distance, 0.0);
    assert_eq!(session.game_state, GameState::Racing);

    let result = session.race_result();
    assert!(result.vehicles[1].race_time_s.is_some());
    assert!(result.vehicles[0].race_time_s.is_none());

    let mut frame = DrawList::new();
    session.render(&mut frame, clock.now_ms());
    assert!(!frame.is_empty());
}

#[test]
fn player_forced_onto_the_finish_line_finishes_alone() {
    let clock = ManualClock::new(0);
    let mut session = racing_session(2, &clock);
    let idle = InputState::new();

    session.player.distance = session.race_distance();
    clock.advance(16);
    session.update(&clock, &idle);

    assert!(session.player.finished);
    assert!(!session.opponent.finished);
    assert!(session.opponent.distance < session.race_distance());
    assert_eq!(session.game_state, GameState::Racing);
}

#[test]
fn menu_keys_never_move_the_state_backwards() {
    let clock = ManualClock::new(0);
    let mut session = racing_session(5, &clock);

    for key in [Key::Space, Key::T, Key::W, Key::ArrowUp] {
        assert_eq!(session.on_key_press(key, clock.now_ms()), SessionCommand::Continue);
        assert_eq!(session.game_state, GameState::Racing);
    }
    assert_eq!(session.on_key_press(Key::R, clock.now_ms()), SessionCommand::Reset);

    let session = session.reset();
    assert_eq!(session.game_state, GameState::Ready);
    assert_eq!(session.tick, 0);
    assert!(session.obstacles.oil_spills.is_empty());
}

#[test]
fn oil_is_never_placed_next_to_a_ramp() {
    let pars = ObstaclePars {
        ramps: vec![Ramp {
            position: 2000.0,
            height: 100.0,
        }],
        traffic_lights: Vec::new(),
        oil_spawn_interval: 1,
        max_oil_spills: 1,
    };
    let obstacles = ObstacleSet::new(&pars, 4000.0);

    for seed in 0..1000 {
        let mut rng = StdRng::seed_from_u64(seed);
        if let Some((position, lane)) = obstacles.sample_oil_position(&mut rng) {
            assert!((position - 2000.0).abs() >= 300.0, "oil at {}", position);
            assert!((800.0..=3200.0).contains(&position));
            assert!(lane <= 1);
        }
    }
}
