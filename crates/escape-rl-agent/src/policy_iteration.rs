//! Policy iteration over an enumerated transition model

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use escape_rl_core::{
    first_max, Action, Agent, Learning, OptionSpec, Policy, Settings, StateValues, TrainReport,
    TrainingHistory, TrainingMode, TransitionModel,
};

/// Cap on evaluation sweeps within one outer iteration
const MAX_EVALUATION_SWEEPS: usize = 100_000;

/// Policy iteration configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyIterationConfig {
    /// Discount factor
    pub gamma: f64,
    /// Evaluation convergence threshold
    pub theta: f64,
    /// Outer iterations allowed by `run_to_completion`
    pub max_iterations: usize,
}

impl Default for PolicyIterationConfig {
    fn default() -> Self {
        Self {
            gamma: 0.9,
            theta: 1e-6,
            max_iterations: 500,
        }
    }
}

impl PolicyIterationConfig {
    /// Parse from loosely typed settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            gamma: settings.float("Discount Factor", defaults.gamma),
            theta: settings.float("Theta", defaults.theta),
            max_iterations: settings.int("Max Iterations", defaults.max_iterations),
        }
    }

    /// Editor schema
    #[must_use]
    pub fn schema() -> Vec<OptionSpec> {
        let defaults = Self::default();
        vec![
            OptionSpec::float("Discount Factor", defaults.gamma),
            OptionSpec::float("Theta", defaults.theta),
            OptionSpec::int("Max Iterations", defaults.max_iterations),
        ]
    }

    /// Value gap within which actions count as tied
    fn tie_tolerance(&self) -> f64 {
        if self.gamma < 1.0 {
            self.theta / (1.0 - self.gamma)
        } else {
            self.theta
        }
    }
}

/// Policy iteration agent.
///
/// Each training unit is one outer iteration: a synchronous policy
/// evaluation sweep run to `theta`, followed by greedy improvement.
pub struct PolicyIterationAgent<E: TransitionModel> {
    env: E,
    config: PolicyIterationConfig,
    rng: StdRng,
    states: Vec<E::State>,
    values: StateValues,
    policy: Policy<E::State>,
    trained: bool,
    history: TrainingHistory,
    sweep_deltas: Vec<f64>,
}

impl<E: TransitionModel> PolicyIterationAgent<E> {
    /// Display name
    pub const NAME: &'static str = "Dynamic Programming";

    /// Create an agent over `env` with a random valid initial policy
    pub fn new(env: E, settings: &Settings, rng: StdRng) -> Self {
        let mut agent = Self {
            env,
            config: PolicyIterationConfig::from_settings(settings),
            rng,
            states: Vec::new(),
            values: StateValues::zeros(0),
            policy: Policy::new(),
            trained: false,
            history: TrainingHistory::default(),
            sweep_deltas: Vec::new(),
        };
        agent.reset();
        agent
    }

    /// Active configuration
    pub fn config(&self) -> &PolicyIterationConfig {
        &self.config
    }

    /// Value of `state` under the current policy
    pub fn value(&self, state: &E::State) -> Option<f64> {
        self.env.state_index(state).map(|i| self.values.get(i))
    }

    /// Dense value function, ordered by the state index
    pub fn values(&self) -> &StateValues {
        &self.values
    }

    /// Per-sweep deltas of the most recent policy evaluation
    pub fn sweep_deltas(&self) -> &[f64] {
        &self.sweep_deltas
    }

    /// Mutable access to the room (e.g. to install a hand-made layout)
    ///
    /// Call [`Agent::reset`] afterwards so the state space is re-enumerated.
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    fn expected_return(&self, state: &E::State, action: Action, values: &StateValues) -> f64 {
        self.env
            .transitions(state, action)
            .iter()
            .map(|o| {
                let next = self.env.state_index(&o.next_state).map_or(0.0, |j| values.get(j));
                o.probability * (o.reward + self.config.gamma * next)
            })
            .sum()
    }

    /// Evaluate the current policy; returns the final sweep's delta
    fn evaluate(&mut self) -> f64 {
        self.sweep_deltas.clear();
        loop {
            let frozen = self.values.clone();
            let mut delta: f64 = 0.0;
            for (i, state) in self.states.iter().enumerate() {
                let Some(action) = self.policy.action(state) else {
                    continue;
                };
                let updated = self.expected_return(state, action, &frozen);
                delta = delta.max((frozen.get(i) - updated).abs());
                self.values.set(i, updated);
            }
            self.sweep_deltas.push(delta);

            if delta < self.config.theta {
                return delta;
            }
            if self.sweep_deltas.len() >= MAX_EVALUATION_SWEEPS {
                warn!(sweeps = self.sweep_deltas.len(), delta, "policy evaluation did not reach theta");
                return delta;
            }
        }
    }

    /// Greedy improvement; returns whether no action changed
    fn improve(&mut self) -> bool {
        let tolerance = self.config.tie_tolerance();
        let mut stable = true;

        for i in 0..self.states.len() {
            let state = self.states[i];
            let Some(old) = self.policy.action(&state) else {
                continue;
            };
            let actions = self.env.valid_actions(&state);
            let returns: Vec<f64> = actions
                .iter()
                .map(|&a| self.expected_return(&state, a, &self.values))
                .collect();
            let Some(best) = first_max(&returns) else {
                continue;
            };

            // first action in canonical order within tolerance of the best
            let chosen = actions[returns.iter().position(|&v| v >= returns[best] - tolerance).unwrap_or(best)];
            if chosen != old {
                stable = false;
                self.policy.insert(state, Some(chosen));
            }
        }
        stable
    }
}

impl<E: TransitionModel> Agent for PolicyIterationAgent<E> {
    type Env = E;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn training_mode(&self) -> TrainingMode {
        TrainingMode::Iterative
    }

    fn options() -> Vec<OptionSpec> {
        PolicyIterationConfig::schema()
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

    fn extract_policy(&mut self) -> &Policy<E::State> {
        // improvement already keeps the policy greedy
        &self.policy
    }

    fn is_trained(&self) -> bool {
        self.trained
    }

    fn history(&self) -> &TrainingHistory {
        &self.history
    }

    fn reset(&mut self) {
        self.states = self.env.states();
        self.values = StateValues::zeros(self.states.len());
        self.policy.clear();
        for &state in &self.states {
            let action = self.env.valid_actions(&state).choose(&mut self.rng).copied();
            self.policy.insert(state, action);
        }
        self.trained = false;
        self.history.clear();
        self.sweep_deltas.clear();
    }

    fn regenerate_layout(&mut self, settings: &Settings) -> escape_rl_core::Result<()> {
        self.env.generate_layout(settings, &mut self.rng)?;
        self.reset();
        Ok(())
    }
}

impl<E: TransitionModel> Learning for PolicyIterationAgent<E> {
    fn train_step(&mut self) -> TrainReport<E::State> {
        let delta = self.evaluate();
        let policy_stable = self.improve();

        self.history.iteration_deltas.push(delta);
        self.trained = policy_stable;
        debug!(
            iteration = self.history.iteration_deltas.len(),
            delta, policy_stable, "policy iteration step"
        );

        TrainReport::Iteration { policy_stable, delta }
    }

    fn run_to_completion(&mut self) -> usize {
        let reports = self.train(self.config.max_iterations);
        let iterations = reports.len();
        if self.trained {
            info!(iterations, "policy iteration converged");
        } else {
            warn!(iterations, "policy iteration stopped before the policy was stable");
        }
        self.extract_policy();
        iterations
    }
}
