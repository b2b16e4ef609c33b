//! Slip-probability tables for slippery tiles

use indexmap::IndexMap;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use escape_rl_core::{Action, Grid, Pos};

/// Lower bound of a raw slip weight before normalisation
const MIN_SLIP_WEIGHT: f64 = 0.2;

/// Per-tile slip distributions over the four moves.
///
/// Each row holds one probability per entry of [`Action::MOVES`]; directions
/// that leave the grid or enter a wall get zero. Rows are fixed once the
/// layout is generated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlipTable {
    tiles: IndexMap<Pos, [f64; 4]>,
}

impl SlipTable {
    /// Empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a weighted distribution for `pos`: `0.2 + U[0, 1)` per open
    /// direction, normalised.
    pub fn insert_weighted<R: Rng + ?Sized>(&mut self, grid: &Grid, pos: Pos, rng: &mut R) {
        let mut probs = [0.0; 4];
        for action in grid.open_moves(pos) {
            probs[action.direction_index()] = MIN_SLIP_WEIGHT + rng.gen::<f64>();
        }
        self.tiles.insert(pos, normalise(probs));
    }

    /// Uniform distribution over the open directions of `pos`
    pub fn insert_uniform(&mut self, grid: &Grid, pos: Pos) {
        let mut probs = [0.0; 4];
        for action in grid.open_moves(pos) {
            probs[action.direction_index()] = 1.0;
        }
        self.tiles.insert(pos, normalise(probs));
    }

    /// Install an explicit distribution (ordered like [`Action::MOVES`])
    pub fn insert(&mut self, pos: Pos, probs: [f64; 4]) {
        self.tiles.insert(pos, normalise(probs));
    }

    /// Distribution at `pos`, if it is a slippery tile
    #[must_use]
    pub fn get(&self, pos: Pos) -> Option<&[f64; 4]> {
        self.tiles.get(&pos)
    }

    /// Non-zero `(probability, direction)` pairs at `pos`
    #[must_use]
    pub fn outcomes(&self, pos: Pos) -> Vec<(f64, Action)> {
        self.get(pos)
            .map(|probs| {
                Action::MOVES
                    .into_iter()
                    .zip(probs.iter())
                    .filter(|(_, &p)| p > 0.0)
                    .map(|(a, &p)| (p, a))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sample the direction the tile at `pos` forces, if any
    pub fn sample<R: Rng + ?Sized>(&self, pos: Pos, rng: &mut R) -> Option<Action> {
        let probs = self.get(pos)?;
        let dist = WeightedIndex::new(probs.iter().copied()).ok()?;
        Some(Action::MOVES[dist.sample(rng)])
    }

    /// Slippery tiles in insertion order
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.tiles.keys().copied()
    }

    /// Number of slippery tiles
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether no tile is slippery
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

fn normalise(mut probs: [f64; 4]) -> [f64; 4] {
    let total: f64 = probs.iter().sum();
    if total > 0.0 {
        for p in &mut probs {
            *p /= total;
        }
    }
    probs
}

#[cfg(test)]
mod tests {
    use super::*;
    use escape_rl_core::CellKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_weighted_rows_sum_to_one() {
        let mut rng = StdRng::seed_from_u64(11);
        let grid = Grid::new(5);
        let mut table = SlipTable::new();
        for pos in [Pos::new(0, 0), Pos::new(2, 2), Pos::new(4, 3)] {
            table.insert_weighted(&grid, pos, &mut rng);
            let total: f64 = table.get(pos).unwrap().iter().sum();
            approx::assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        }
        // the corner cannot slip up or left
        let corner = table.get(Pos::new(0, 0)).unwrap();
        assert_eq!(corner[0], 0.0);
        assert_eq!(corner[2], 0.0);
    }

    #[test]
    fn test_uniform_ignores_walls() {
        let mut grid = Grid::new(3);
        grid.set(Pos::new(0, 1), CellKind::Wall);
        let mut table = SlipTable::new();
        table.insert_uniform(&grid, Pos::new(1, 1));
        assert_eq!(table.get(Pos::new(1, 1)), Some(&[0.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]));
        assert_eq!(table.outcomes(Pos::new(1, 1)).len(), 3);
    }

    #[test]
    fn test_sample_never_picks_blocked_direction() {
        let mut rng = StdRng::seed_from_u64(5);
        let grid = Grid::new(4);
        let mut table = SlipTable::new();
        table.insert_uniform(&grid, Pos::new(0, 0));
        for _ in 0..100 {
            let action = table.sample(Pos::new(0, 0), &mut rng).unwrap();
            assert!(matches!(action, Action::Down | Action::Right));
        }
        assert_eq!(table.sample(Pos::new(2, 2), &mut rng), None);
    }
}
