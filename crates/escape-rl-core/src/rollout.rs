//! Greedy policy execution traces

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Environment, Policy, StepEvent, Trajectory, Transition};

/// Default cap on rollout length
pub const DEFAULT_ROLLOUT_STEPS: usize = 200;

/// Why a rollout stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEnd {
    /// Reached a terminal state with a positive final reward
    Escaped,
    /// Reached a terminal state with a non-positive final reward
    Failed,
    /// Caught by the adversary
    Caught,
    /// Policy had no action (or no entry) for the state
    NoPolicy,
    /// Step cap reached
    MaxSteps,
}

impl RunEnd {
    /// Whether the run counts as a success
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Escaped
    }
}

/// Execution trace of a greedy policy
#[derive(Debug, Clone)]
pub struct Rollout<S> {
    /// Visited transitions
    pub trajectory: Trajectory<S>,
    /// Discounted return from the start
    pub discounted_return: f64,
    /// Why the run stopped
    pub end: RunEnd,
}

/// Follow `policy` from `start` until a terminal state, a missing action, or
/// `max_steps` transitions.
///
/// Room overlays are reset first so the trace starts from a clean episode.
pub fn rollout<E, R>(
    env: &mut E,
    policy: &Policy<E::State>,
    start: E::State,
    gamma: f64,
    max_steps: usize,
    rng: &mut R,
) -> Rollout<E::State>
where
    E: Environment,
    R: Rng + ?Sized,
{
    env.reset_state();
    let mut trajectory = Trajectory::new(start);
    let mut state = start;

    let end = loop {
        if trajectory.len() >= max_steps {
            break RunEnd::MaxSteps;
        }
        let Some(action) = policy.action(&state) else {
            break RunEnd::NoPolicy;
        };
        let step = env.step(&state, action, rng);
        trajectory.push(Transition {
            state,
            action,
            reward: step.reward,
            next_state: step.state,
            done: step.done,
        });
        state = step.state;
        if step.done {
            break if step.reward > 0.0 {
                RunEnd::Escaped
            } else if step.has_event(StepEvent::Caught) {
                RunEnd::Caught
            } else {
                RunEnd::Failed
            };
        }
    };

    Rollout {
        discounted_return: trajectory.discounted_return(gamma),
        trajectory,
        end,
    }
}
