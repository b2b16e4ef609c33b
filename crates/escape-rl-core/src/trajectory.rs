//! Trajectories, training history, and visit statistics

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Action, Pos, State};

/// Single transition in a trajectory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition<S> {
    /// State the action was taken in
    pub state: S,
    /// Action taken
    pub action: Action,
    /// Reward received
    pub reward: f64,
    /// Resulting state
    pub next_state: S,
    /// Whether the episode ended
    pub done: bool,
}

/// Sequence of transitions from one start state
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<S> {
    /// State the trajectory started from
    pub start: S,
    /// Transitions in order
    pub transitions: Vec<Transition<S>>,
    /// Undiscounted sum of rewards
    pub total_reward: f64,
}

impl<S: State> Trajectory<S> {
    /// Create an empty trajectory
    pub fn new(start: S) -> Self {
        Self {
            start,
            transitions: Vec::new(),
            total_reward: 0.0,
        }
    }

    /// Add a transition to the trajectory
    pub fn push(&mut self, transition: Transition<S>) {
        self.total_reward += transition.reward;
        self.transitions.push(transition);
    }

    /// Get the length of the trajectory
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Check if trajectory is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Visited states, start included
    #[must_use]
    pub fn path(&self) -> Vec<S> {
        std::iter::once(self.start)
            .chain(self.transitions.iter().map(|t| t.next_state))
            .collect()
    }

    /// Last state reached
    #[must_use]
    pub fn last_state(&self) -> S {
        self.transitions.last().map_or(self.start, |t| t.next_state)
    }

    /// Sum of `gamma^t * r_t` from the start
    #[must_use]
    pub fn discounted_return(&self, gamma: f64) -> f64 {
        let mut discount = 1.0;
        let mut total = 0.0;
        for t in &self.transitions {
            total += discount * t.reward;
            discount *= gamma;
        }
        total
    }

    /// Compute returns (cumulative discounted rewards) from every step
    #[must_use]
    pub fn returns(&self, gamma: f64) -> Vec<f64> {
        let mut returns = vec![0.0; self.len()];
        let mut running_return = 0.0;

        for i in (0..self.len()).rev() {
            if self.transitions[i].done {
                running_return = 0.0;
            }
            running_return = self.transitions[i].reward + gamma * running_return;
            returns[i] = running_return;
        }

        returns
    }
}

/// Bookkeeping for one finished training episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// Episode number (1-based)
    pub episode: usize,
    /// Undiscounted episode reward
    pub total_reward: f64,
    /// Number of environment steps
    pub steps: usize,
    /// Whether the episode hit a terminal state (as opposed to the step cap)
    pub terminated: bool,
    /// Wall-clock time the episode finished
    pub finished_at: DateTime<Utc>,
}

/// Ordered training history handed to plotting code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Finished episodes
    pub episodes: Vec<EpisodeRecord>,
    /// Final evaluation delta of each policy-iteration sweep
    pub iteration_deltas: Vec<f64>,
}

impl TrainingHistory {
    /// Record a finished episode
    pub fn record_episode(&mut self, total_reward: f64, steps: usize, terminated: bool) {
        self.episodes.push(EpisodeRecord {
            episode: self.episodes.len() + 1,
            total_reward,
            steps,
            terminated,
            finished_at: Utc::now(),
        });
    }

    /// Episode rewards in order
    #[must_use]
    pub fn rewards(&self) -> Vec<f64> {
        self.episodes.iter().map(|e| e.total_reward).collect()
    }

    /// Episode lengths in order
    #[must_use]
    pub fn steps(&self) -> Vec<usize> {
        self.episodes.iter().map(|e| e.steps).collect()
    }

    /// Mean reward over the last `window` episodes
    #[must_use]
    pub fn recent_mean_reward(&self, window: usize) -> Option<f64> {
        let n = self.episodes.len().min(window);
        if n == 0 {
            return None;
        }
        let sum: f64 = self.episodes[self.episodes.len() - n..]
            .iter()
            .map(|e| e.total_reward)
            .sum();
        Some(sum / n as f64)
    }

    /// Owned copy for out-of-process consumers
    #[must_use]
    pub fn snapshot(&self) -> TrainingHistory {
        self.clone()
    }

    /// Forget everything
    pub fn clear(&mut self) {
        self.episodes.clear();
        self.iteration_deltas.clear();
    }
}

/// Per-cell counts of chosen move directions (for heatmaps)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionCounts {
    counts: IndexMap<Pos, [usize; 4]>,
}

impl ActionCounts {
    /// Count `action` taken at `pos`; pull actions are not counted
    pub fn record(&mut self, pos: Pos, action: Action) {
        if action.is_move() {
            self.counts.entry(pos).or_insert([0; 4])[action.direction_index()] += 1;
        }
    }

    /// Counts for `pos` ordered up, down, left, right
    #[must_use]
    pub fn at(&self, pos: Pos) -> [usize; 4] {
        self.counts.get(&pos).copied().unwrap_or([0; 4])
    }

    /// Total selections at `pos`
    #[must_use]
    pub fn total_at(&self, pos: Pos) -> usize {
        self.at(pos).iter().sum()
    }

    /// Cells with at least one count
    pub fn iter(&self) -> impl Iterator<Item = (&Pos, &[usize; 4])> {
        self.counts.iter()
    }

    /// Forget every count
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
