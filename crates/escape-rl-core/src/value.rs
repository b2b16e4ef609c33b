//! Value tables for tabular RL algorithms

use indexmap::IndexMap;
use ndarray::Array1;

use crate::{action_index, Action, State};

/// Sparse action-value table Q(s, a).
///
/// Rows are created on first write only. Reads of an unseen state or action
/// return `default_value`, so a lookup never inserts anything.
#[derive(Debug, Clone)]
pub struct QTable<S: State> {
    /// Rows indexed like `actions`
    q_values: IndexMap<S, Vec<f64>>,
    /// Action set the rows are indexed by
    actions: &'static [Action],
    /// Value reported for unseen pairs
    default_value: f64,
}

impl<S: State> QTable<S> {
    /// Create an empty table over `actions`
    #[must_use]
    pub fn new(actions: &'static [Action], default_value: f64) -> Self {
        Self {
            q_values: IndexMap::new(),
            actions,
            default_value,
        }
    }

    /// Action set the table is indexed by
    #[must_use]
    pub fn actions(&self) -> &'static [Action] {
        self.actions
    }

    /// Value returned on a lookup miss
    #[must_use]
    pub fn default_value(&self) -> f64 {
        self.default_value
    }

    /// Q(s, a), or the default for an unseen pair
    #[must_use]
    pub fn get(&self, state: &S, action: Action) -> f64 {
        let Some(i) = action_index(self.actions, action) else {
            return self.default_value;
        };
        self.q_values
            .get(state)
            .map_or(self.default_value, |row| row[i])
    }

    /// Estimates for every action of `state` (defaults if unseen)
    #[must_use]
    pub fn row(&self, state: &S) -> Vec<f64> {
        self.q_values
            .get(state)
            .cloned()
            .unwrap_or_else(|| vec![self.default_value; self.actions.len()])
    }

    /// Stored row for `state`, if it was ever written
    #[must_use]
    pub fn visited_row(&self, state: &S) -> Option<&[f64]> {
        self.q_values.get(state).map(Vec::as_slice)
    }

    /// Largest estimate for `state`
    #[must_use]
    pub fn max_value(&self, state: &S) -> f64 {
        match self.q_values.get(state) {
            Some(row) => row.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            None => self.default_value,
        }
    }

    /// Write Q(s, a)
    ///
    /// Actions outside the table's action set are ignored.
    pub fn set(&mut self, state: S, action: Action, value: f64) {
        let Some(i) = action_index(self.actions, action) else {
            return;
        };
        let (len, default) = (self.actions.len(), self.default_value);
        let row = self
            .q_values
            .entry(state)
            .or_insert_with(|| vec![default; len]);
        row[i] = value;
    }

    /// Visited states in first-write order
    pub fn states(&self) -> impl Iterator<Item = &S> {
        self.q_values.keys()
    }

    /// Number of visited states
    #[must_use]
    pub fn len(&self) -> usize {
        self.q_values.len()
    }

    /// Whether nothing was written yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.q_values.is_empty()
    }

    /// Forget every estimate
    pub fn clear(&mut self) {
        self.q_values.clear();
    }
}

/// Dense state-value function V(s) over an enumerated state space
#[derive(Debug, Clone, PartialEq)]
pub struct StateValues {
    /// Values indexed by dense state index
    pub values: Array1<f64>,
}

impl StateValues {
    /// All-zero value function over `count` states
    #[must_use]
    pub fn zeros(count: usize) -> Self {
        Self {
            values: Array1::zeros(count),
        }
    }

    /// V at a dense index
    #[must_use]
    pub fn get(&self, index: usize) -> f64 {
        self.values[index]
    }

    /// Set V at a dense index
    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }

    /// Number of states
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the state space is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Largest absolute difference to `other`
    #[must_use]
    pub fn max_abs_diff(&self, other: &StateValues) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}
