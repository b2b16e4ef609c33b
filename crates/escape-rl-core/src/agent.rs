//! Agent traits and types

use serde::{Deserialize, Serialize};

use crate::{Environment, OptionSpec, Policy, Settings, TrainingHistory};

/// How an agent's training unit is counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainingMode {
    /// One unit is a full sweep over the model (planning agents)
    Iterative,
    /// One unit is an episode in the environment
    Episodic,
}

/// Report of one training unit
#[derive(Debug, Clone, PartialEq)]
pub enum TrainReport<S> {
    /// Outer policy-iteration round
    Iteration {
        /// Whether no state changed its action
        policy_stable: bool,
        /// Final evaluation delta of the round
        delta: f64,
    },
    /// Finished episode
    Episode {
        /// Undiscounted episode reward
        total_reward: f64,
        /// Environment steps taken
        steps: usize,
        /// States visited, start included
        path: Vec<S>,
    },
}

impl<S> TrainReport<S> {
    /// Whether training has converged (only planning agents converge)
    #[must_use]
    pub fn converged(&self) -> bool {
        matches!(self, Self::Iteration { policy_stable: true, .. })
    }
}

/// Progress of a single stepwise training call
#[derive(Debug, Clone, PartialEq)]
pub struct StepProgress<S> {
    /// Path of the current (or just finished) episode
    pub path: Vec<S>,
    /// Whether the episode is still running after this call
    pub episode_active: bool,
    /// Episodes finished so far
    pub episodes_finished: usize,
}

/// Core agent trait: the query surface a driver uses
pub trait Agent {
    /// Environment the agent trains on
    type Env: Environment;

    /// Display name
    fn name(&self) -> &str;

    /// Unit of `train_step`
    fn training_mode(&self) -> TrainingMode;

    /// Editor schema for the agent's settings
    fn options() -> Vec<OptionSpec>
    where
        Self: Sized;

    /// Environment the agent owns
    fn env(&self) -> &Self::Env;

    /// Discount factor used for returns
    fn gamma(&self) -> f64;

    /// Current policy (see [`Agent::extract_policy`])
    fn policy(&self) -> &Policy<<Self::Env as Environment>::State>;

    /// Recompute the greedy policy from the learned values
    fn extract_policy(&mut self) -> &Policy<<Self::Env as Environment>::State>;

    /// Whether the agent reached a usable policy
    fn is_trained(&self) -> bool;

    /// Reward/step history
    fn history(&self) -> &TrainingHistory;

    /// Forget everything learned
    fn reset(&mut self);

    /// Build a new layout through the agent's random source, then reset
    fn regenerate_layout(&mut self, settings: &Settings) -> crate::Result<()>;
}

/// Trait for agents that can learn
pub trait Learning: Agent {
    /// Run one training unit (iteration or episode)
    fn train_step(&mut self) -> TrainReport<<Self::Env as Environment>::State>;

    /// Run up to `units` training units, stopping early on convergence
    fn train(&mut self, units: usize) -> Vec<TrainReport<<Self::Env as Environment>::State>> {
        let mut reports = Vec::with_capacity(units);
        for _ in 0..units {
            let report = self.train_step();
            let done = report.converged();
            reports.push(report);
            if done {
                break;
            }
        }
        reports
    }

    /// Train until the agent's own budget or convergence, then extract the policy
    fn run_to_completion(&mut self) -> usize;
}

/// Agents whose episodes can be advanced one transition at a time.
///
/// Must not be interleaved with [`Learning::train_step`] within one session.
pub trait StepwiseLearning: Learning {
    /// Perform exactly one environment transition of the running episode
    fn train_step_by_step(&mut self) -> StepProgress<<Self::Env as Environment>::State>;

    /// Whether a stepwise episode is in progress
    fn episode_active(&self) -> bool;
}
