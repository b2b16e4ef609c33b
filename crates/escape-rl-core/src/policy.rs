//! Policy tables and action-selection rules

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::{Action, RLError, State};

/// Mapping from state to chosen action.
///
/// A state that is present with `None` is terminal or has no valid action; a
/// state that is absent lies outside the policy's domain.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy<S: State> {
    entries: IndexMap<S, Option<Action>>,
}

impl<S: State> Default for Policy<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State> Policy<S> {
    /// Empty policy
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Set the action for `state`
    pub fn insert(&mut self, state: S, action: Option<Action>) -> Option<Option<Action>> {
        self.entries.insert(state, action)
    }

    /// Action for `state`.
    ///
    /// Returns `Ok(None)` for a no-action entry and an error for a state the
    /// policy does not cover.
    pub fn lookup(&self, state: &S) -> crate::Result<Option<Action>> {
        self.entries
            .get(state)
            .copied()
            .ok_or_else(|| RLError::InvalidState(format!("{state:?} is not covered by the policy")))
    }

    /// Action for `state`, treating out-of-domain states as no-action
    #[must_use]
    pub fn action(&self, state: &S) -> Option<Action> {
        self.entries.get(state).copied().flatten()
    }

    /// Whether `state` is in the domain
    #[must_use]
    pub fn contains(&self, state: &S) -> bool {
        self.entries.contains_key(state)
    }

    /// Number of covered states
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the policy covers no state
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&S, &Option<Action>)> {
        self.entries.iter()
    }
}

/// Index of the first maximal value (deterministic tie-break)
#[must_use]
pub fn first_max(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Uniformly random index among all maximal values
pub fn random_max<R: Rng + ?Sized>(values: &[f64], rng: &mut R) -> Option<usize> {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let best: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v == max)
        .map(|(i, _)| i)
        .collect();
    best.choose(rng).copied()
}

/// Epsilon-greedy action selection over a full action set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedy {
    /// Exploration rate
    pub epsilon: f64,
}

impl EpsilonGreedy {
    /// Create a new epsilon-greedy rule
    #[must_use]
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.clamp(0.0, 1.0),
        }
    }

    /// Set the exploration rate
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// Pick an action given the estimates for every action in `actions`.
    ///
    /// Exploration draws from the whole action set, valid or not; exploitation
    /// breaks ties uniformly at random.
    pub fn select<R: Rng + ?Sized>(&self, q_values: &[f64], actions: &[Action], rng: &mut R) -> Option<Action> {
        if actions.is_empty() {
            return None;
        }
        if rng.gen::<f64>() < self.epsilon {
            return actions.choose(rng).copied();
        }
        random_max(q_values, rng)
            .and_then(|i| actions.get(i).copied())
            .or_else(|| actions.choose(rng).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pos;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    struct Cell(usize);

    impl State for Cell {
        fn position(&self) -> Pos {
            Pos::new(0, self.0)
        }

        fn features(&self) -> Vec<i64> {
            vec![self.0 as i64]
        }
    }

    #[test]
    fn test_lookup_domain() {
        let mut policy = Policy::new();
        policy.insert(Cell(0), Some(Action::Right));
        policy.insert(Cell(1), None);

        assert_eq!(policy.lookup(&Cell(0)).unwrap(), Some(Action::Right));
        assert_eq!(policy.lookup(&Cell(1)).unwrap(), None);
        assert!(matches!(policy.lookup(&Cell(2)), Err(RLError::InvalidState(_))));
        assert_eq!(policy.action(&Cell(2)), None);
    }

    #[test]
    fn test_first_max_prefers_earliest() {
        assert_eq!(first_max(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(first_max(&[]), None);
    }

    #[test]
    fn test_random_max_covers_all_ties() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = [5.0, 1.0, 5.0, 5.0];
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[random_max(&values, &mut rng).unwrap()] = true;
        }
        assert_eq!(seen, [true, false, true, true]);
    }

    #[test]
    fn test_greedy_without_exploration() {
        let mut rng = StdRng::seed_from_u64(1);
        let rule = EpsilonGreedy::new(0.0);
        let q = [0.0, 2.0, -1.0, 0.5];
        for _ in 0..20 {
            assert_eq!(rule.select(&q, &Action::MOVES, &mut rng), Some(Action::Down));
        }
    }

    #[test]
    fn test_full_exploration_uses_whole_set() {
        let mut rng = StdRng::seed_from_u64(3);
        let rule = EpsilonGreedy::new(1.0);
        let q = [10.0, 0.0, 0.0, 0.0];
        let picked: std::collections::HashSet<_> = (0..200)
            .filter_map(|_| rule.select(&q, &Action::MOVES, &mut rng))
            .collect();
        assert_eq!(picked.len(), 4);
    }
}
