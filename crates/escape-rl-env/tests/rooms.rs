//! Scenario tests across the three rooms

use escape_rl_env::prelude::*;
use escape_rl_env::{CollectState, PlankLayout, PlankSlot, PlankState, PursuitState, StartItems};
use escape_rl_core::StepEvent;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_collect_probabilities_sum_to_one() {
    for seed in 0..5 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut room = CollectRoom::new(10).unwrap();
        room.generate_layout(&Settings::new(), &mut rng).unwrap();

        for state in room.states() {
            for &action in room.actions() {
                let outcomes = room.transitions(&state, action);
                let total: f64 = outcomes.iter().map(|o| o.probability).sum();
                assert!((total - 1.0).abs() < 1e-9, "{state:?} {action}: {total}");
                for o in &outcomes {
                    assert!(o.probability > 0.0);
                    assert!(room.state_index(&o.next_state).is_some());
                }
            }
        }
    }
}

#[test]
fn test_collect_flags_are_monotonic() {
    let mut rng = StdRng::seed_from_u64(17);
    let mut room = CollectRoom::new(8).unwrap();
    room.generate_layout(&Settings::new().with("Walls", 3), &mut rng).unwrap();
    room.set_start_items(StartItems::Bag);

    let mut state: CollectState = room.initial_state();
    assert!(state.has_bag);
    for i in 0..500 {
        let action = Action::MOVES[i % 4];
        let step = room.step(&state, action, &mut rng);
        assert!(step.state.has_bag >= state.has_bag);
        assert!(step.state.has_rope >= state.has_rope);
        state = if step.done { room.initial_state() } else { step.state };
    }
}

#[test]
fn test_transition_model_only_on_collect_room() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut pursuit = PursuitRoom::new(10).unwrap();
    pursuit.generate_layout(&Settings::new(), &mut rng).unwrap();
    let s = pursuit.initial_state();
    assert!(matches!(
        pursuit.transition_model(&s, Action::Down),
        Err(escape_rl_core::RLError::Unsupported(_))
    ));

    let mut plank = PlankRoom::new(10).unwrap();
    plank.generate_layout(&Settings::new(), &mut rng).unwrap();
    let s = plank.initial_state();
    assert!(plank.transition_model(&s, Action::PullUp).is_err());
}

#[test]
fn test_reset_state_is_idempotent() {
    let mut rng = StdRng::seed_from_u64(8);

    let mut pursuit = PursuitRoom::new(10).unwrap();
    pursuit.generate_layout(&Settings::new(), &mut rng).unwrap();
    let mut state = pursuit.initial_state();
    for i in 0..50 {
        let step = pursuit.step(&state, Action::MOVES[i % 4], &mut rng);
        if step.done {
            break;
        }
        state = step.state;
    }
    pursuit.reset_state();
    let once = pursuit.grid().clone();
    pursuit.reset_state();
    assert_eq!(pursuit.grid(), &once);
    assert_eq!(pursuit.grid(), pursuit.original_grid());

    let mut collect = CollectRoom::new(10).unwrap();
    collect.generate_layout(&Settings::new(), &mut rng).unwrap();
    collect.reset_state();
    let once = collect.grid().clone();
    collect.reset_state();
    assert_eq!(collect.grid(), &once);
}

#[test]
fn test_guard_catch_is_terminal_at_every_phase() {
    let mut rng = StdRng::seed_from_u64(4);
    let mut room = PursuitRoom::new(10).unwrap();
    let settings = Settings::new().with("Walls", 0).with("Slippery Tiles", 0);
    room.generate_layout(&settings, &mut rng).unwrap();

    // a parked player bumps into the divider wall while the guard walks
    let door = room.door();
    let parked = PursuitState::new(escape_rl_core::Pos::new(door.row + 1, 0), false);
    room.reset_state();
    let route = room.patrol_route().to_vec();
    for phase in 0..route.len() - 1 {
        assert_eq!(room.enemy_pos(), route[phase]);
        let guard_next = route[phase + 1];

        // stepping onto the guard's next cell from a neighbour is fatal
        for action in Action::MOVES {
            let Some(from) = guard_next.step_back(action, 10) else {
                continue;
            };
            if room.grid().is_wall(from) || from == route[phase] {
                continue;
            }
            let mut probe = room.clone();
            let step = probe.step(&PursuitState::new(from, false), action, &mut rng);
            assert!(step.done, "phase {phase}: from {from} via {action}");
            assert_eq!(step.reward, -100.0);
        }

        let step = room.step(&parked, Action::Left, &mut rng);
        assert!(!step.done);
    }
}

fn puzzle() -> PlankRoom {
    let layout = PlankLayout {
        door: Pos::new(9, 8),
        silver_island: Pos::new(2, 2),
        golden_island: Pos::new(2, 6),
        planks: [Pos::new(6, 3), Pos::new(6, 7)],
        walls: vec![],
    };
    PlankRoom::with_layout(10, &layout).unwrap()
}

fn state(player: Pos, first: PlankSlot, second: PlankSlot) -> PlankState {
    PlankState {
        player,
        planks: [first, second],
        has_silver: false,
        has_golden: false,
    }
}

#[test]
fn test_second_bridge_to_same_key_rejected() {
    let mut room = puzzle();
    let mut rng = StdRng::seed_from_u64(0);

    // plank 1 already bridges (4, 3), south of the silver key at (3, 3);
    // plank 2 is pushed east onto (3, 2), the silver key's western access point
    let bridged = PlankSlot::bridge(Pos::new(4, 3), 10);
    let s = state(Pos::new(3, 0), bridged, PlankSlot::loose(Pos::new(3, 1)));
    let step = room.step(&s, Action::Right, &mut rng);

    assert_eq!(step.reward, -50.0);
    assert_eq!(step.state, s);
    assert!(!step.done);
    assert!(step.has_event(StepEvent::BridgeRejected));
}

#[test]
fn test_bridges_to_different_keys_accepted() {
    let mut room = puzzle();
    let mut rng = StdRng::seed_from_u64(0);

    let first = room.step(
        &state(Pos::new(6, 3), PlankSlot::loose(Pos::new(5, 3)), PlankSlot::loose(Pos::new(5, 7))),
        Action::Up,
        &mut rng,
    );
    approx::assert_relative_eq!(first.reward, 29.9);
    assert_eq!(first.state.planks[0].bridge_pos(10), Some(Pos::new(4, 3)));

    // golden key at (3, 7); (4, 7) is its southern access point
    let s = first.state.with_player(Pos::new(6, 7));
    let second = room.step(&s, Action::Up, &mut rng);
    approx::assert_relative_eq!(second.reward, 29.9);
    assert!(second.state.planks.iter().all(|p| p.is_bridge()));
    assert_eq!(second.state.features()[4], -1);
    assert_eq!(second.state.features()[5], 47);

    let shown = room.grid_for(&second.state);
    assert_eq!(shown.get(Pos::new(4, 3)), CellKind::Bridge);
    assert_eq!(shown.get(Pos::new(4, 7)), CellKind::Bridge);
}

#[test]
fn test_plank_room_full_escape() {
    let mut room = puzzle();
    let mut rng = StdRng::seed_from_u64(0);
    let bridges = state(
        Pos::new(5, 3),
        PlankSlot::bridge(Pos::new(4, 3), 10),
        PlankSlot::bridge(Pos::new(4, 7), 10),
    );

    let route = [
        Action::Up,
        Action::Up,
        Action::Down,
        Action::Down,
        Action::Right,
        Action::Right,
        Action::Right,
        Action::Right,
        Action::Up,
        Action::Up,
    ];
    let mut s = bridges;
    let mut total = 0.0;
    for action in route {
        let step = room.step(&s, action, &mut rng);
        assert!(!step.done);
        total += step.reward;
        s = step.state;
    }
    assert!(s.has_silver && s.has_golden);
    approx::assert_relative_eq!(total, 100.0 - 1.0, epsilon = 1e-9);

    // down the right-hand side, through the door
    let mut s = s.with_player(Pos::new(8, 6));
    for action in [Action::Down, Action::Right, Action::Right, Action::Right] {
        let step = room.step(&s, action, &mut rng);
        s = step.state;
        if step.done {
            assert_eq!(step.reward, 100.0);
            assert_eq!(s.player, room.exit());
            return;
        }
    }
    panic!("never reached the exit");
}
