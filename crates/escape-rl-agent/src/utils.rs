//! Utility functions and helpers for RL agents

/// Trait for schedules (e.g., for epsilon decay)
pub trait Schedule: Send + Sync {
    /// Value after `t` decay steps
    fn value(&self, t: usize) -> f64;

    /// Value following `current`
    fn next(&self, current: f64) -> f64;
}

/// Multiplicative decay toward a floor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialSchedule {
    /// Starting value
    pub start: f64,
    /// Minimum value
    pub min_value: f64,
    /// Decay rate
    pub decay_rate: f64,
}

impl ExponentialSchedule {
    /// Create a new exponential schedule
    #[must_use]
    pub fn new(start: f64, min_value: f64, decay_rate: f64) -> Self {
        Self {
            start,
            min_value,
            decay_rate,
        }
    }
}

impl Schedule for ExponentialSchedule {
    fn value(&self, t: usize) -> f64 {
        let value = self.start * self.decay_rate.powf(t as f64);
        value.max(self.min_value)
    }

    fn next(&self, current: f64) -> f64 {
        (current * self.decay_rate).max(self.min_value)
    }
}

/// Move `old` a fraction `alpha` of the way toward `target`
#[must_use]
pub fn td_update(old: f64, target: f64, alpha: f64) -> f64 {
    old + alpha * (target - old)
}

/// One-step TD target; terminal transitions do not bootstrap
#[must_use]
pub fn td_target(reward: f64, gamma: f64, next_value: f64, done: bool) -> f64 {
    if done {
        reward
    } else {
        reward + gamma * next_value
    }
}
