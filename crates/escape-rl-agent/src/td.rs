//! Shared machinery for one-step temporal-difference control
//!
//! SARSA and Q-learning differ only in the value they bootstrap from, so both
//! are a [`TdLearner`] parameterised by a [`TdMethod`] marker. The learner owns
//! its room and random source, keeps a sparse Q-table, and can run either a
//! whole episode per call or a single transition per call (for step-by-step
//! visualisation).

use std::marker::PhantomData;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use escape_rl_core::{
    first_max, Action, ActionCounts, Agent, Environment, EpsilonGreedy, Learning, OptionSpec, Policy, QTable,
    Settings, State, Step, StepProgress, StepwiseLearning, TrainReport, TrainingHistory, TrainingMode,
};

use crate::utils::{td_target, td_update, ExponentialSchedule, Schedule};

/// Which next-state value a TD update bootstraps from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bootstrap {
    /// Value of the next action actually selected (SARSA)
    OnPolicy,
    /// Greedy value of the next state (Q-learning)
    OffPolicy,
}

/// Compile-time description of a TD control method
pub trait TdMethod: Send + Sync + 'static {
    /// Display name
    const NAME: &'static str;
    /// Default episode budget for `run_to_completion`
    const DEFAULT_MAX_EPISODES: usize;
    /// Bootstrap target
    const BOOTSTRAP: Bootstrap;
}

/// TD learning configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TdConfig {
    /// Learning rate
    pub alpha: f64,
    /// Discount factor
    pub gamma: f64,
    /// Initial exploration rate
    pub epsilon: f64,
    /// Multiplicative epsilon decay per episode
    pub epsilon_decay: f64,
    /// Exploration floor
    pub min_epsilon: f64,
    /// Step cap per episode
    pub max_steps: usize,
    /// Episode budget for `run_to_completion`
    pub max_episodes: usize,
}

impl TdConfig {
    /// Defaults with the given episode budget
    #[must_use]
    pub fn with_max_episodes(max_episodes: usize) -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 1.0,
            epsilon_decay: 0.9995,
            min_epsilon: 0.01,
            max_steps: 200,
            max_episodes,
        }
    }

    /// Parse from loosely typed settings
    #[must_use]
    pub fn from_settings(settings: &Settings, max_episodes: usize) -> Self {
        let defaults = Self::with_max_episodes(max_episodes);
        Self {
            alpha: settings.float("Alpha", defaults.alpha),
            gamma: settings.float("Gamma", defaults.gamma),
            epsilon: settings.float("Epsilon", defaults.epsilon),
            epsilon_decay: settings.float("Epsilon Decay", defaults.epsilon_decay),
            min_epsilon: settings.float("Min Epsilon", defaults.min_epsilon),
            max_steps: settings.int("Max Steps", defaults.max_steps),
            max_episodes: settings.int("Max Episodes", defaults.max_episodes),
        }
    }

    /// Editor schema
    #[must_use]
    pub fn schema(max_episodes: usize) -> Vec<OptionSpec> {
        let d = Self::with_max_episodes(max_episodes);
        vec![
            OptionSpec::float("Alpha", d.alpha),
            OptionSpec::float("Epsilon", d.epsilon),
            OptionSpec::float("Gamma", d.gamma),
            OptionSpec::float("Epsilon Decay", d.epsilon_decay),
            OptionSpec::float("Min Epsilon", d.min_epsilon),
            OptionSpec::int("Max Episodes", d.max_episodes),
            OptionSpec::int("Max Steps", d.max_steps),
        ]
    }

    fn schedule(&self) -> ExponentialSchedule {
        ExponentialSchedule::new(self.epsilon, self.min_epsilon, self.epsilon_decay)
    }
}

/// In-progress stepwise episode
#[derive(Debug, Clone)]
struct Session<S> {
    state: S,
    action: Option<Action>,
    path: Vec<S>,
    steps: usize,
    total_reward: f64,
}

/// Tabular TD control agent
pub struct TdLearner<E: Environment, M: TdMethod> {
    env: E,
    config: TdConfig,
    rng: StdRng,
    q_table: QTable<E::State>,
    explorer: EpsilonGreedy,
    schedule: ExponentialSchedule,
    policy: Policy<E::State>,
    trained: bool,
    history: TrainingHistory,
    action_counts: ActionCounts,
    episodes: usize,
    session: Option<Session<E::State>>,
    method: PhantomData<M>,
}

impl<E: Environment, M: TdMethod> TdLearner<E, M> {
    /// Create a learner over `env`
    pub fn new(env: E, settings: &Settings, rng: StdRng) -> Self {
        Self::with_config(env, TdConfig::from_settings(settings, M::DEFAULT_MAX_EPISODES), rng)
    }

    /// Create a learner with an explicit configuration
    pub fn with_config(env: E, config: TdConfig, rng: StdRng) -> Self {
        let q_table = QTable::new(env.actions(), 0.0);
        Self {
            env,
            config,
            rng,
            q_table,
            explorer: EpsilonGreedy::new(config.epsilon),
            schedule: config.schedule(),
            policy: Policy::new(),
            trained: false,
            history: TrainingHistory::default(),
            action_counts: ActionCounts::default(),
            episodes: 0,
            session: None,
            method: PhantomData,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &TdConfig {
        &self.config
    }

    /// Current exploration rate
    pub fn epsilon(&self) -> f64 {
        self.explorer.epsilon
    }

    /// Episodes finished since the last reset
    pub fn episodes_completed(&self) -> usize {
        self.episodes
    }

    /// Action values of `state` in canonical action order (0 when unvisited)
    pub fn q_values(&self, state: &E::State) -> Vec<f64> {
        self.q_table.row(state)
    }

    /// Learned Q-table
    pub fn q_table(&self) -> &QTable<E::State> {
        &self.q_table
    }

    /// Per-cell move counts chosen during training
    pub fn action_counts(&self) -> &ActionCounts {
        &self.action_counts
    }

    /// Mutable access to the room (e.g. to install a hand-made layout)
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Run full episodes until `target` have finished, then extract the policy.
    ///
    /// An in-progress stepwise episode is abandoned. Returns the number of
    /// episodes run.
    pub fn skip_to_episode(&mut self, target: usize) -> usize {
        self.session = None;
        let start = self.episodes;
        while self.episodes < target {
            self.run_episode();
        }
        self.extract_policy();
        self.episodes - start
    }

    fn choose(&mut self, state: &E::State) -> Option<Action> {
        let row = self.q_table.row(state);
        self.explorer.select(&row, self.env.actions(), &mut self.rng)
    }

    /// Take `action` in `state`, update the table, and pick the next action
    pub(crate) fn advance(&mut self, state: E::State, action: Action) -> (Step<E::State>, Option<Action>) {
        self.action_counts.record(state.position(), action);
        let step = self.env.step(&state, action, &mut self.rng);

        let next_action = match M::BOOTSTRAP {
            Bootstrap::OnPolicy => {
                let next = if step.done { None } else { self.choose(&step.state) };
                let next_value = next.map_or(0.0, |a| self.q_table.get(&step.state, a));
                self.update(state, action, &step, next_value);
                next
            }
            Bootstrap::OffPolicy => {
                let next_value = self.q_table.max_value(&step.state);
                self.update(state, action, &step, next_value);
                if step.done {
                    None
                } else {
                    self.choose(&step.state)
                }
            }
        };
        (step, next_action)
    }

    fn update(&mut self, state: E::State, action: Action, step: &Step<E::State>, next_value: f64) {
        let target = td_target(step.reward, self.config.gamma, next_value, step.done);
        let old = self.q_table.get(&state, action);
        self.q_table.set(state, action, td_update(old, target, self.config.alpha));
    }

    fn begin(&mut self) -> Session<E::State> {
        self.env.reset_state();
        let state = self.env.initial_state();
        let action = self.choose(&state);
        Session {
            state,
            action,
            path: vec![state],
            steps: 0,
            total_reward: 0.0,
        }
    }

    fn finish(&mut self, total_reward: f64, steps: usize, terminated: bool) {
        self.history.record_episode(total_reward, steps, terminated);
        let epsilon = self.schedule.next(self.explorer.epsilon);
        self.explorer.set_epsilon(epsilon);
        self.episodes += 1;
        debug!(
            agent = M::NAME,
            episode = self.episodes,
            total_reward,
            steps,
            terminated,
            epsilon,
            "episode finished"
        );
    }

    fn run_episode(&mut self) -> TrainReport<E::State> {
        let mut session = self.begin();
        let mut done = false;

        while !done && session.steps < self.config.max_steps {
            let Some(action) = session.action else {
                break;
            };
            let (step, next) = self.advance(session.state, action);
            session.total_reward += step.reward;
            session.path.push(step.state);
            session.state = step.state;
            session.action = next;
            session.steps += 1;
            done = step.done;
        }

        self.finish(session.total_reward, session.steps, done);
        TrainReport::Episode {
            total_reward: session.total_reward,
            steps: session.steps,
            path: session.path,
        }
    }
}

impl<E: Environment, M: TdMethod> Agent for TdLearner<E, M> {
    type Env = E;

    fn name(&self) -> &str {
        M::NAME
    }

    fn training_mode(&self) -> TrainingMode {
        TrainingMode::Episodic
    }

    fn options() -> Vec<OptionSpec> {
        TdConfig::schema(M::DEFAULT_MAX_EPISODES)
    }

    fn env(&self) -> &E {
        &self.env
    }

    fn gamma(&self) -> f64 {
        self.config.gamma
    }

    fn policy(&self) -> &Policy<E::State> {
        &self.policy
    }

    /// Greedy over currently valid actions for every visited state
    fn extract_policy(&mut self) -> &Policy<E::State> {
        self.policy.clear();
        for state in self.q_table.states() {
            let valid = self.env.valid_actions(state);
            let values: Vec<f64> = valid.iter().map(|&a| self.q_table.get(state, a)).collect();
            let action = first_max(&values).map(|i| valid[i]);
            self.policy.insert(*state, action);
        }
        self.trained = true;
        &self.policy
    }

    fn is_trained(&self) -> bool {
        self.trained
    }

    fn history(&self) -> &TrainingHistory {
        &self.history
    }

    fn reset(&mut self) {
        self.q_table.clear();
        self.explorer.set_epsilon(self.config.epsilon);
        self.policy.clear();
        self.trained = false;
        self.history.clear();
        self.action_counts.clear();
        self.episodes = 0;
        self.session = None;
    }

    fn regenerate_layout(&mut self, settings: &Settings) -> escape_rl_core::Result<()> {
        self.env.generate_layout(settings, &mut self.rng)?;
        self.reset();
        Ok(())
    }
}

impl<E: Environment, M: TdMethod> Learning for TdLearner<E, M> {
    fn train_step(&mut self) -> TrainReport<E::State> {
        self.session = None;
        self.run_episode()
    }

    fn run_to_completion(&mut self) -> usize {
        let run = self.skip_to_episode(self.config.max_episodes);
        info!(
            agent = M::NAME,
            episodes = self.episodes,
            epsilon = self.explorer.epsilon,
            states = self.q_table.len(),
            "training finished"
        );
        run
    }
}

impl<E: Environment, M: TdMethod> StepwiseLearning for TdLearner<E, M> {
    fn train_step_by_step(&mut self) -> StepProgress<E::State> {
        let mut session = match self.session.take() {
            Some(session) => session,
            None => self.begin(),
        };

        let mut done = true;
        if let (Some(action), true) = (session.action, session.steps < self.config.max_steps) {
            let (step, next) = self.advance(session.state, action);
            session.total_reward += step.reward;
            session.path.push(step.state);
            session.state = step.state;
            session.action = next;
            session.steps += 1;
            done = step.done;
        }

        let finished = done || session.steps >= self.config.max_steps;
        if finished {
            self.finish(session.total_reward, session.steps, done);
            StepProgress {
                path: session.path,
                episode_active: false,
                episodes_finished: self.episodes,
            }
        } else {
            let progress = StepProgress {
                path: session.path.clone(),
                episode_active: true,
                episodes_finished: self.episodes,
            };
            self.session = Some(session);
            progress
        }
    }

    fn episode_active(&self) -> bool {
        self.session.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QLearning, Sarsa};
    use approx::assert_relative_eq;
    use escape_rl_core::Pos;
    use escape_rl_env::{CollectRoom, CollectState, SlipTable};
    use rand::SeedableRng;

    fn room() -> CollectRoom {
        CollectRoom::with_layout(4, &[], Pos::new(1, 1), Pos::new(2, 2), SlipTable::new()).unwrap()
    }

    fn config(epsilon: f64) -> TdConfig {
        TdConfig {
            alpha: 0.5,
            epsilon,
            ..TdConfig::with_max_episodes(100)
        }
    }

    #[test]
    fn test_sarsa_bootstraps_on_selected_action() {
        let mut learner: TdLearner<CollectRoom, Sarsa> =
            TdLearner::with_config(room(), config(1.0), StdRng::seed_from_u64(3));
        let s = CollectState::new(Pos::new(0, 0), false, false);
        let next = CollectState::new(Pos::new(0, 1), false, false);
        for (i, &a) in Action::MOVES.iter().enumerate() {
            learner.q_table.set(next, a, i as f64 * 10.0);
        }

        let (step, chosen) = learner.advance(s, Action::Right);
        assert_eq!(step.state, next);
        let chosen = chosen.unwrap();
        let expected = 0.5 * (0.0 + 0.9 * learner.q_table.get(&next, chosen));
        assert_relative_eq!(learner.q_table.get(&s, Action::Right), expected);
    }

    #[test]
    fn test_q_learning_bootstraps_on_greedy_value() {
        let mut learner: TdLearner<CollectRoom, QLearning> =
            TdLearner::with_config(room(), config(1.0), StdRng::seed_from_u64(3));
        let s = CollectState::new(Pos::new(0, 0), false, false);
        let next = CollectState::new(Pos::new(0, 1), false, false);
        learner.q_table.set(next, Action::Left, 8.0);
        learner.q_table.set(next, Action::Down, -4.0);

        learner.advance(s, Action::Right);
        assert_relative_eq!(learner.q_table.get(&s, Action::Right), 0.5 * 0.9 * 8.0);
    }

    #[test]
    fn test_terminal_update_ignores_next_state() {
        let mut learner: TdLearner<CollectRoom, QLearning> =
            TdLearner::with_config(room(), config(0.0), StdRng::seed_from_u64(1));
        let s = CollectState::new(Pos::new(3, 2), true, true);
        let exit = CollectState::new(Pos::new(3, 3), true, true);
        learner.q_table.set(exit, Action::Up, 1000.0);

        let (step, next) = learner.advance(s, Action::Right);
        assert!(step.done);
        assert!(next.is_none());
        assert_relative_eq!(learner.q_table.get(&s, Action::Right), 50.0);
    }

    #[test]
    fn test_blocked_move_penalised_and_counted() {
        let mut learner: TdLearner<CollectRoom, Sarsa> =
            TdLearner::with_config(room(), config(0.0), StdRng::seed_from_u64(1));
        let s = CollectState::new(Pos::new(0, 0), false, false);

        let (step, _) = learner.advance(s, Action::Up);
        assert_eq!(step.state, s);
        assert_relative_eq!(learner.q_table.get(&s, Action::Up), -5.0);
        assert_eq!(learner.action_counts().at(Pos::new(0, 0)), [1, 0, 0, 0]);
    }

    #[test]
    fn test_epsilon_decays_once_per_episode() {
        let mut learner: TdLearner<CollectRoom, QLearning> = TdLearner::with_config(
            room(),
            TdConfig {
                epsilon_decay: 0.5,
                min_epsilon: 0.2,
                ..config(1.0)
            },
            StdRng::seed_from_u64(2),
        );
        learner.train(2);
        assert_relative_eq!(learner.epsilon(), 0.25);
        learner.train(1);
        assert_relative_eq!(learner.epsilon(), 0.2);
        assert_eq!(learner.history().episodes.len(), 3);
    }

    #[test]
    fn test_episode_respects_step_cap() {
        let mut learner: TdLearner<CollectRoom, Sarsa> = TdLearner::with_config(
            room(),
            TdConfig {
                max_steps: 3,
                ..config(1.0)
            },
            StdRng::seed_from_u64(4),
        );
        for report in learner.train(20) {
            let TrainReport::Episode { steps, path, .. } = report else {
                panic!("episodic learner produced an iteration report");
            };
            assert!(steps <= 3);
            assert_eq!(path.len(), steps + 1);
        }
    }

    #[test]
    fn test_stepwise_episode_lifecycle() {
        let mut learner: TdLearner<CollectRoom, Sarsa> = TdLearner::with_config(
            room(),
            TdConfig {
                max_steps: 5,
                ..config(1.0)
            },
            StdRng::seed_from_u64(6),
        );

        let mut calls = 0;
        let last = loop {
            let progress = learner.train_step_by_step();
            calls += 1;
            assert_eq!(progress.path.len(), calls + 1);
            if !progress.episode_active {
                break progress;
            }
            assert!(learner.episode_active());
        };

        assert!(calls <= 5);
        assert!(!learner.episode_active());
        assert_eq!(last.episodes_finished, 1);
        assert_eq!(learner.history().episodes[0].steps, calls);
        assert!(learner.epsilon() < 1.0);
    }

    #[test]
    fn test_skip_to_episode_abandons_stepwise_run() {
        let mut learner: TdLearner<CollectRoom, QLearning> =
            TdLearner::with_config(room(), config(1.0), StdRng::seed_from_u64(8));
        learner.train_step_by_step();

        let run = learner.skip_to_episode(10);
        assert_eq!(run, 10);
        assert_eq!(learner.episodes_completed(), 10);
        assert!(!learner.episode_active());
        assert!(learner.is_trained());
        assert!(!learner.policy().is_empty());
    }

    #[test]
    fn test_extract_policy_restricts_to_valid_actions() {
        let mut learner: TdLearner<CollectRoom, QLearning> =
            TdLearner::with_config(room(), config(0.0), StdRng::seed_from_u64(0));
        let corner = CollectState::new(Pos::new(0, 0), false, false);
        learner.q_table.set(corner, Action::Up, 100.0);
        learner.q_table.set(corner, Action::Left, 90.0);
        learner.q_table.set(corner, Action::Right, -1.0);

        let policy = learner.extract_policy();
        assert_eq!(policy.action(&corner), Some(Action::Down));
        assert_eq!(policy.len(), 1);
    }

    #[test]
    fn test_reset_forgets_everything() {
        let mut learner: TdLearner<CollectRoom, Sarsa> =
            TdLearner::with_config(room(), config(1.0), StdRng::seed_from_u64(5));
        learner.train(5);
        learner.extract_policy();
        learner.reset();

        assert!(learner.q_table().is_empty());
        assert!(learner.policy().is_empty());
        assert!(learner.history().episodes.is_empty());
        assert_eq!(learner.episodes_completed(), 0);
        assert_relative_eq!(learner.epsilon(), 1.0);
        assert!(!learner.is_trained());
    }
}
