//! Environment traits and types

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{Action, Grid, OptionSpec, Pos, RLError, Settings, State};

/// Notable side effects of a single environment step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepEvent {
    /// Move was blocked by a wall, door, or the grid edge
    Blocked,
    /// A slippery tile overrode the chosen direction
    Slipped,
    /// An item or key was collected
    Collected,
    /// Player was moved through a portal
    Teleported,
    /// Player was caught by the adversary
    Caught,
    /// Player fell into a pothole
    Fell,
    /// A plank was pushed or pulled to a free cell
    PlankMoved,
    /// A plank became a bridge
    BridgeBuilt,
    /// A push onto a pothole was refused
    BridgeRejected,
    /// Player reached the exit
    Escaped,
}

/// Result of a single environment step
#[derive(Debug, Clone, PartialEq)]
pub struct Step<S> {
    /// Next learned state
    pub state: S,
    /// Reward signal
    pub reward: f64,
    /// Whether the episode is done
    pub done: bool,
    /// Side effects, in the order they happened
    pub events: Vec<StepEvent>,
}

impl<S> Step<S> {
    /// Step without side effects
    pub fn new(state: S, reward: f64, done: bool) -> Self {
        Self {
            state,
            reward,
            done,
            events: Vec::new(),
        }
    }

    /// Attach an event
    #[must_use]
    pub fn with_event(mut self, event: StepEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Whether `event` happened during this step
    #[must_use]
    pub fn has_event(&self, event: StepEvent) -> bool {
        self.events.contains(&event)
    }
}

/// One weighted outcome of a transition model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome<S> {
    /// Probability of this outcome
    pub probability: f64,
    /// Resulting state
    pub next_state: S,
    /// Reward collected
    pub reward: f64,
}

/// Core environment trait.
///
/// Rooms are driven through learned-state keys: `step` receives the state the
/// agent believes it is in and returns the next one. Mutable overlays (doors,
/// adversary position) live in the room and are restored by `reset_state`.
pub trait Environment: Send + Sync {
    /// Learned-state key
    type State: State;

    /// Display name
    fn name(&self) -> &str;

    /// Grid side length
    fn size(&self) -> usize;

    /// Full action set, in canonical order
    fn actions(&self) -> &'static [Action];

    /// Editor schema for this room's settings
    fn options(&self) -> Vec<OptionSpec>;

    /// Build a fresh solvable layout from `settings`.
    ///
    /// Infeasible random draws are retried internally; an error means the
    /// settings could not be satisfied within the retry budget.
    fn generate_layout<R: Rng + ?Sized>(&mut self, settings: &Settings, rng: &mut R) -> crate::Result<()>;

    /// Actions that do not run into a wall, the grid edge, or a locked door
    fn valid_actions(&self, state: &Self::State) -> Vec<Action>;

    /// Sample a single transition and apply its side effects
    fn step<R: Rng + ?Sized>(&mut self, state: &Self::State, action: Action, rng: &mut R) -> Step<Self::State>;

    /// Restore per-episode overlays without touching the layout
    fn reset_state(&mut self);

    /// State an episode starts from
    fn initial_state(&self) -> Self::State;

    /// Current grid snapshot
    fn grid(&self) -> &Grid;

    /// Start cell
    fn start(&self) -> Pos;

    /// Exit cell
    fn exit(&self) -> Pos;

    /// Full outcome distribution for `(state, action)`.
    ///
    /// Only model-based rooms provide this; the default reports a contract
    /// violation.
    fn transition_model(&self, _state: &Self::State, _action: Action) -> crate::Result<Vec<Outcome<Self::State>>> {
        Err(RLError::Unsupported(format!(
            "{} has no transition model",
            self.name()
        )))
    }
}

/// Environments with an enumerable state space and a full transition model
pub trait TransitionModel: Environment {
    /// Number of enumerated states
    fn state_count(&self) -> usize;

    /// Every state, ordered by [`TransitionModel::state_index`]
    fn states(&self) -> Vec<Self::State>;

    /// Dense index of `state`, if it belongs to the state space
    fn state_index(&self, state: &Self::State) -> Option<usize>;

    /// Outcome distribution for `(state, action)`; probabilities sum to one
    fn transitions(&self, state: &Self::State, action: Action) -> Vec<Outcome<Self::State>>;
}
