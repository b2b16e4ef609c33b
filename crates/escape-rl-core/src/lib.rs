//! Core reinforcement learning contracts for the escape-room sandbox
//!
//! This crate holds the pieces every room and agent shares: grid actions and
//! positions, the cell grid, the environment and agent traits, tabular value
//! stores, policies, training history, and loosely typed settings.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

pub mod action;
pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod grid;
pub mod policy;
pub mod rollout;
pub mod state;
pub mod trajectory;
pub mod value;

// Re-export core traits and types
pub use action::{action_index, Action};
pub use agent::{Agent, Learning, StepProgress, StepwiseLearning, TrainReport, TrainingMode};
pub use config::{defaults_of, Count, OptionKind, OptionSpec, Settings, RANDOM};
pub use environment::{Environment, Outcome, Step, StepEvent, TransitionModel};
pub use error::{RLError, Result};
pub use grid::{CellKind, Grid, LayeredGrid};
pub use policy::{first_max, random_max, EpsilonGreedy, Policy};
pub use rollout::{rollout, Rollout, RunEnd, DEFAULT_ROLLOUT_STEPS};
pub use state::{flag, Pos, State};
pub use trajectory::{ActionCounts, EpisodeRecord, Trajectory, TrainingHistory, Transition};
pub use value::{QTable, StateValues};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, Agent, CellKind, Environment, Grid, Learning, Policy, Pos, Result, Settings, State,
        Step, StepwiseLearning, TrainReport, TransitionModel,
    };
}
