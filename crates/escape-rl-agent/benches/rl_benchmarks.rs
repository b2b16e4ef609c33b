use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use escape_rl_agent::{PolicyIterationAgent, QLearningAgent, SarsaAgent};
use escape_rl_core::{Environment, Learning, Settings};
use escape_rl_env::{CollectRoom, PlankRoom, PursuitRoom};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn layout<E: Environment>(mut room: E, seed: u64) -> (E, StdRng) {
    let mut rng = StdRng::seed_from_u64(seed);
    room.generate_layout(&Settings::new(), &mut rng)
        .expect("default settings are feasible");
    (room, rng)
}

fn policy_iteration(c: &mut Criterion) {
    let (room, rng) = layout(CollectRoom::new(10).expect("valid size"), 1);
    c.bench_function("policy_iteration_outer_step", |b| {
        b.iter_batched(
            || PolicyIterationAgent::new(room.clone(), &Settings::new(), rng.clone()),
            |mut agent| black_box(agent.train_step()),
            BatchSize::LargeInput,
        );
    });
}

fn td_episodes(c: &mut Criterion) {
    let (pursuit, rng) = layout(PursuitRoom::new(10).expect("valid size"), 2);
    let mut sarsa = SarsaAgent::new(pursuit, &Settings::new(), rng);
    c.bench_function("sarsa_episode", |b| b.iter(|| black_box(sarsa.train_step())));

    let (plank, rng) = layout(PlankRoom::new(10).expect("valid size"), 3);
    let mut q_learning = QLearningAgent::new(plank, &Settings::new(), rng);
    c.bench_function("q_learning_episode", |b| b.iter(|| black_box(q_learning.train_step())));
}

criterion_group!(benches, policy_iteration, td_episodes);
criterion_main!(benches);
