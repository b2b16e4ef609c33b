//! Q-learning: off-policy TD control

use crate::td::{Bootstrap, TdLearner, TdMethod};

/// Marker for the Q-learning update
#[derive(Debug, Clone, Copy, Default)]
pub struct QLearning;

impl TdMethod for QLearning {
    const NAME: &'static str = "Q-Learning";
    const DEFAULT_MAX_EPISODES: usize = 10_000;
    const BOOTSTRAP: Bootstrap = Bootstrap::OffPolicy;
}

/// Q-learning agent over any room
pub type QLearningAgent<E> = TdLearner<E, QLearning>;
