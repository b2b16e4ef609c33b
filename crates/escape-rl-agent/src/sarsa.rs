//! SARSA: on-policy TD control

use crate::td::{Bootstrap, TdLearner, TdMethod};

/// Marker for the SARSA update
#[derive(Debug, Clone, Copy, Default)]
pub struct Sarsa;

impl TdMethod for Sarsa {
    const NAME: &'static str = "SARSA";
    const DEFAULT_MAX_EPISODES: usize = 5000;
    const BOOTSTRAP: Bootstrap = Bootstrap::OnPolicy;
}

/// SARSA agent over any room
pub type SarsaAgent<E> = TdLearner<E, Sarsa>;
