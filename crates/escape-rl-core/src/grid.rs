//! Cell codes and the square grid shared by every room

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::{Action, Pos};

/// Cell type codes (stable integer encoding consumed by renderers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellKind {
    /// Free floor
    #[default]
    Empty = 0,
    /// Impassable wall
    Wall = 1,
    /// Start marker
    Start = 2,
    /// Exit marker
    Exit = 3,
    /// Slippery ice
    Slippery = 4,
    /// Collectible bag
    Bag = 5,
    /// Collectible rope
    Rope = 6,
    /// Iron key opening the pursuit room's door
    IronKey = 7,
    /// Teleport pad
    Portal = 8,
    /// Movable plank (display overlay only)
    Plank = 9,
    /// Hazard hole
    Pothole = 10,
    /// Plank laid over a pothole
    Bridge = 11,
    /// Door that opens once both puzzle keys are held
    LockedDoor = 12,
    /// Silver puzzle key
    SilverKey = 13,
    /// Golden puzzle key
    GoldenKey = 14,
}

impl CellKind {
    /// Integer code of the cell
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Character used by the text renderer
    #[must_use]
    pub fn glyph(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Wall => '#',
            Self::Start => 'S',
            Self::Exit => 'E',
            Self::Slippery => '~',
            Self::Bag => 'b',
            Self::Rope => 'r',
            Self::IronKey => 'k',
            Self::Portal => 'O',
            Self::Plank => '=',
            Self::Pothole => 'o',
            Self::Bridge => '+',
            Self::LockedDoor => 'D',
            Self::SilverKey => 's',
            Self::GoldenKey => 'g',
        }
    }
}

/// Square grid of cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cells: Array2<CellKind>,
}

impl Grid {
    /// Create an all-empty `size`×`size` grid
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            cells: Array2::from_elem((size, size), CellKind::Empty),
        }
    }

    /// Side length
    #[must_use]
    pub fn size(&self) -> usize {
        self.cells.nrows()
    }

    /// Cell at `pos`
    ///
    /// # Panics
    /// Panics if `pos` lies outside the grid.
    #[must_use]
    pub fn get(&self, pos: Pos) -> CellKind {
        self.cells[[pos.row, pos.col]]
    }

    /// Overwrite the cell at `pos`
    pub fn set(&mut self, pos: Pos, kind: CellKind) {
        self.cells[[pos.row, pos.col]] = kind;
    }

    /// Whether `pos` lies inside the grid
    #[must_use]
    pub fn contains(&self, pos: Pos) -> bool {
        pos.row < self.size() && pos.col < self.size()
    }

    /// Whether `pos` holds a wall
    #[must_use]
    pub fn is_wall(&self, pos: Pos) -> bool {
        self.get(pos) == CellKind::Wall
    }

    /// All positions in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        let size = self.size();
        (0..size).flat_map(move |row| (0..size).map(move |col| Pos::new(row, col)))
    }

    /// Positions holding `kind`, in row-major order
    #[must_use]
    pub fn positions_of(&self, kind: CellKind) -> Vec<Pos> {
        self.positions().filter(|&p| self.get(p) == kind).collect()
    }

    /// Moves from `pos` that stay on the grid and do not enter a wall
    #[must_use]
    pub fn open_moves(&self, pos: Pos) -> Vec<Action> {
        Action::MOVES
            .into_iter()
            .filter(|&a| matches!(pos.step(a, self.size()), Some(next) if !self.is_wall(next)))
            .collect()
    }

    /// Snapshot of the integer cell codes
    #[must_use]
    pub fn codes(&self) -> Array2<u8> {
        self.cells.mapv(CellKind::code)
    }

    /// Breadth-first reachability from `start` to `goal`.
    ///
    /// `passable` decides which cells may be entered; `teleports` adds extra
    /// one-way edges (entering the first cell lands on the second).
    #[must_use]
    pub fn path_exists<F>(&self, start: Pos, goal: Pos, passable: F, teleports: &[(Pos, Pos)]) -> bool
    where
        F: Fn(Pos, CellKind) -> bool,
    {
        let size = self.size();
        let mut visited = Array2::from_elem((size, size), false);
        let mut queue = VecDeque::from([start]);
        visited[[start.row, start.col]] = true;

        while let Some(pos) = queue.pop_front() {
            if pos == goal {
                return true;
            }
            for action in Action::MOVES {
                let Some(mut next) = pos.step(action, size) else {
                    continue;
                };
                if !passable(next, self.get(next)) {
                    continue;
                }
                if let Some(&(_, out)) = teleports.iter().find(|(entry, _)| *entry == next) {
                    if !visited[[next.row, next.col]] {
                        visited[[next.row, next.col]] = true;
                        if next == goal {
                            return true;
                        }
                    }
                    next = out;
                }
                if !visited[[next.row, next.col]] {
                    visited[[next.row, next.col]] = true;
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Render as one line of glyphs per row
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.size() * (self.size() + 1));
        for row in self.cells.rows() {
            out.extend(row.iter().map(|c| c.glyph()));
            out.push('\n');
        }
        out
    }
}

/// Original layout kept next to the per-episode working copy.
///
/// Episode side effects (opened doors, picked-up keys) only touch `current`;
/// [`LayeredGrid::restore`] copies `original` back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayeredGrid {
    original: Grid,
    current: Grid,
}

impl LayeredGrid {
    /// Wrap a freshly generated layout
    #[must_use]
    pub fn new(layout: Grid) -> Self {
        Self {
            current: layout.clone(),
            original: layout,
        }
    }

    /// Immutable generated layout
    #[must_use]
    pub fn original(&self) -> &Grid {
        &self.original
    }

    /// Working copy for the running episode
    #[must_use]
    pub fn current(&self) -> &Grid {
        &self.current
    }

    /// Mutable working copy
    pub fn current_mut(&mut self) -> &mut Grid {
        &mut self.current
    }

    /// Restore the working copy from the original
    pub fn restore(&mut self) {
        self.current.clone_from(&self.original);
    }
}
