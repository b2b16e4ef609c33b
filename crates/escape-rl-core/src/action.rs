//! Grid actions and action sets

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single agent action on the grid.
///
/// The four `Pull*` variants are only offered by rooms with movable objects;
/// they share the direction vector of the matching move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    /// Move one row up
    Up,
    /// Move one row down
    Down,
    /// Move one column left
    Left,
    /// Move one column right
    Right,
    /// Pull the object above while stepping down
    PullUp,
    /// Pull the object below while stepping up
    PullDown,
    /// Pull the object on the left while stepping right
    PullLeft,
    /// Pull the object on the right while stepping left
    PullRight,
}

impl Action {
    /// The four plain moves, in canonical order
    pub const MOVES: [Action; 4] = [Action::Up, Action::Down, Action::Left, Action::Right];

    /// Moves followed by pulls
    pub const MOVES_AND_PULLS: [Action; 8] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::PullUp,
        Action::PullDown,
        Action::PullLeft,
        Action::PullRight,
    ];

    /// Row/column offset of the action's direction
    #[must_use]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up | Self::PullUp => (-1, 0),
            Self::Down | Self::PullDown => (1, 0),
            Self::Left | Self::PullLeft => (0, -1),
            Self::Right | Self::PullRight => (0, 1),
        }
    }

    /// Whether this is a pull action
    #[must_use]
    pub fn is_pull(self) -> bool {
        matches!(self, Self::PullUp | Self::PullDown | Self::PullLeft | Self::PullRight)
    }

    /// Whether this is one of the four plain moves
    #[must_use]
    pub fn is_move(self) -> bool {
        !self.is_pull()
    }

    /// Index among the four plain directions (pulls map onto their direction)
    #[must_use]
    pub fn direction_index(self) -> usize {
        match self {
            Self::Up | Self::PullUp => 0,
            Self::Down | Self::PullDown => 1,
            Self::Left | Self::PullLeft => 2,
            Self::Right | Self::PullRight => 3,
        }
    }

    /// Short arrow glyph used by text renderers
    #[must_use]
    pub fn glyph(self) -> char {
        match self {
            Self::Up => '↑',
            Self::Down => '↓',
            Self::Left => '←',
            Self::Right => '→',
            Self::PullUp => '⇡',
            Self::PullDown => '⇣',
            Self::PullLeft => '⇠',
            Self::PullRight => '⇢',
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::PullUp => "pull_up",
            Self::PullDown => "pull_down",
            Self::PullLeft => "pull_left",
            Self::PullRight => "pull_right",
        };
        f.write_str(name)
    }
}

/// Position of an action inside an action set, if present
#[must_use]
pub fn action_index(actions: &[Action], action: Action) -> Option<usize> {
    actions.iter().position(|&a| a == action)
}
