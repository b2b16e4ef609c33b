//! Grid positions and learned-state keys

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::hash::Hash;

use crate::Action;

/// A cell coordinate on a square grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    /// Row index (0 is the top row)
    pub row: usize,
    /// Column index (0 is the left column)
    pub col: usize,
}

impl Pos {
    /// Create a position
    #[must_use]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Position shifted by `(dr, dc)`, if it stays inside a `size`×`size` grid
    #[must_use]
    pub fn offset(self, (dr, dc): (i32, i32), size: usize) -> Option<Pos> {
        let row = self.row as i64 + i64::from(dr);
        let col = self.col as i64 + i64::from(dc);
        let limit = size as i64;
        if (0..limit).contains(&row) && (0..limit).contains(&col) {
            Some(Pos::new(row as usize, col as usize))
        } else {
            None
        }
    }

    /// Neighbouring position in the direction of `action`
    #[must_use]
    pub fn step(self, action: Action, size: usize) -> Option<Pos> {
        self.offset(action.delta(), size)
    }

    /// Position on the opposite side of `action`'s direction
    #[must_use]
    pub fn step_back(self, action: Action, size: usize) -> Option<Pos> {
        let (dr, dc) = action.delta();
        self.offset((-dr, -dc), size)
    }

    /// The four Manhattan neighbours, without bounds checking against a grid.
    ///
    /// Neighbours that would have a negative coordinate are skipped.
    #[must_use]
    pub fn manhattan_neighbours(self) -> Vec<Pos> {
        let mut out = Vec::with_capacity(4);
        if self.row > 0 {
            out.push(Pos::new(self.row - 1, self.col));
        }
        out.push(Pos::new(self.row + 1, self.col));
        if self.col > 0 {
            out.push(Pos::new(self.row, self.col - 1));
        }
        out.push(Pos::new(self.row, self.col + 1));
        out
    }
}

impl From<(usize, usize)> for Pos {
    fn from((row, col): (usize, usize)) -> Self {
        Self::new(row, col)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Trait for learned-state keys.
///
/// States are small fixed-width integer tuples; they key value tables and
/// policies, so they must be cheap to copy and hash.
pub trait State: Copy + Eq + Hash + Debug + Send + Sync {
    /// Player position encoded in the state
    fn position(&self) -> Pos;

    /// The state as its fixed-width integer tuple
    fn features(&self) -> Vec<i64>;
}

/// Convert a boolean item flag into its tuple encoding
#[must_use]
pub fn flag(value: bool) -> i64 {
    i64::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_respects_bounds() {
        let p = Pos::new(0, 0);
        assert_eq!(p.step(Action::Up, 4), None);
        assert_eq!(p.step(Action::Right, 4), Some(Pos::new(0, 1)));
        assert_eq!(Pos::new(3, 3).step(Action::Down, 4), None);
    }

    #[test]
    fn test_step_back() {
        let p = Pos::new(2, 2);
        assert_eq!(p.step_back(Action::PullUp, 5), Some(Pos::new(3, 2)));
        assert_eq!(p.step_back(Action::PullRight, 5), Some(Pos::new(2, 1)));
    }

    proptest::proptest! {
        #[test]
        fn test_step_then_back_returns_home(row in 0usize..12, col in 0usize..12, i in 0usize..8) {
            let action = Action::MOVES_AND_PULLS[i];
            let home = Pos::new(row, col);
            if let Some(next) = home.step(action, 12) {
                proptest::prop_assert_eq!(next.step_back(action, 12), Some(home));
            }
        }
    }
}
