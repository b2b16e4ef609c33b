//! Tabular reinforcement learning agents for the escape rooms
//!
//! This crate provides:
//! - [`PolicyIterationAgent`]: model-based policy iteration for rooms with a
//!   full transition model
//! - [`SarsaAgent`]: on-policy TD control
//! - [`QLearningAgent`]: off-policy TD control

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod policy_iteration;
pub mod q_learning;
pub mod sarsa;
pub mod td;
pub mod utils;

// Re-export agents
pub use policy_iteration::{PolicyIterationAgent, PolicyIterationConfig};
pub use q_learning::{QLearning, QLearningAgent};
pub use sarsa::{Sarsa, SarsaAgent};
pub use td::{Bootstrap, TdConfig, TdLearner, TdMethod};

// Re-export utilities
pub use utils::{td_target, td_update, ExponentialSchedule, Schedule};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{PolicyIterationAgent, QLearningAgent, SarsaAgent, TdConfig};
    pub use escape_rl_core::prelude::*;
}
