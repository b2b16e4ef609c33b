//! End-to-end training sessions on generated layouts

use escape_rl_agent::prelude::*;
use escape_rl_agent::PolicyIterationConfig;
use escape_rl_core::{rollout, RunEnd, TrainingMode};
use escape_rl_env::{CollectRoom, PlankRoom, PursuitRoom};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_policy_iteration_session() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut room = CollectRoom::new(10).unwrap();
    room.generate_layout(&Settings::new(), &mut rng).unwrap();

    let mut agent = PolicyIterationAgent::new(room, &Settings::new(), rng);
    assert_eq!(agent.training_mode(), TrainingMode::Iterative);
    let iterations = agent.run_to_completion();
    assert!(agent.is_trained());
    assert!(iterations < PolicyIterationConfig::default().max_iterations);

    // every non-absorbing start configuration has an action
    let start = agent.env().initial_state();
    assert!(agent.policy().lookup(&start).unwrap().is_some());
    assert!(agent.value(&start).unwrap() > 0.0);

    let policy = agent.policy().clone();
    let gamma = agent.gamma();
    let mut rng = StdRng::seed_from_u64(7);
    let run = rollout(agent.env_mut(), &policy, start, gamma, 500, &mut rng);
    assert_ne!(run.end, RunEnd::NoPolicy);
}

#[test]
fn test_regenerate_layout_resets_agent() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut room = PursuitRoom::new(10).unwrap();
    room.generate_layout(&Settings::new(), &mut rng).unwrap();

    let mut agent = SarsaAgent::new(room, &Settings::new(), rng);
    assert_eq!(agent.training_mode(), TrainingMode::Episodic);
    agent.train(10);
    agent.extract_policy();
    assert!(agent.is_trained());

    let before = agent.env().original_grid().clone();
    agent
        .regenerate_layout(&Settings::new().with("Walls", 8).with("Slippery Tiles", 2))
        .unwrap();
    assert!(!agent.is_trained());
    assert!(agent.history().episodes.is_empty());
    assert!(agent.q_table().is_empty());
    assert_ne!(agent.env().original_grid(), &before);
}

#[test]
fn test_history_matches_reports() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut room = PlankRoom::new(10).unwrap();
    room.generate_layout(&Settings::new(), &mut rng).unwrap();

    let mut agent = QLearningAgent::new(room, &Settings::new().with("Max Steps", 60), rng);
    let reports = agent.train(15);
    assert_eq!(reports.len(), 15);

    let rewards = agent.history().rewards();
    for (report, recorded) in reports.iter().zip(&rewards) {
        let TrainReport::Episode { total_reward, steps, path } = report else {
            panic!("expected an episode report");
        };
        assert_eq!(total_reward, recorded);
        assert!(*steps <= 60);
        assert_eq!(path.len(), steps + 1);
    }
    assert!(agent.history().recent_mean_reward(5).is_some());
}
