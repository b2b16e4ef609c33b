//! Shared layout-generation helpers

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use escape_rl_core::{CellKind, Grid, Pos, RLError, Result};

/// Attempts a room makes before reporting an infeasible configuration
pub const MAX_LAYOUT_ATTEMPTS: usize = 100;

/// Draw up to `count` distinct cells from `candidates`, in random order
pub fn sample_cells<R: Rng + ?Sized>(candidates: &[Pos], count: usize, rng: &mut R) -> Vec<Pos> {
    let mut pool = candidates.to_vec();
    let take = count.min(pool.len());
    let (picked, _) = pool.partial_shuffle(rng, take);
    picked.to_vec()
}

/// Empty cells of `grid` that are not listed in `reserved`
#[must_use]
pub fn free_cells(grid: &Grid, reserved: &[Pos]) -> Vec<Pos> {
    grid.positions()
        .filter(|p| grid.get(*p) == CellKind::Empty && !reserved.contains(p))
        .collect()
}

/// Paint `kind` on up to `count` random cells from `candidates`; returns the
/// painted cells
pub fn scatter<R: Rng + ?Sized>(
    grid: &mut Grid,
    candidates: &[Pos],
    count: usize,
    kind: CellKind,
    rng: &mut R,
) -> Vec<Pos> {
    let cells = sample_cells(candidates, count, rng);
    for &pos in &cells {
        grid.set(pos, kind);
    }
    cells
}

/// Run `attempt` until it yields a layout, giving up after
/// [`MAX_LAYOUT_ATTEMPTS`] tries.
pub fn retry_layout<T, F>(room: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Option<T>,
{
    for n in 1..=MAX_LAYOUT_ATTEMPTS {
        if let Some(layout) = attempt() {
            debug!(room, attempts = n, "layout generated");
            return Ok(layout);
        }
        warn!(room, attempt = n, "infeasible layout, regenerating");
    }
    Err(RLError::InfeasibleLayout {
        room: room.to_string(),
        attempts: MAX_LAYOUT_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_is_distinct_and_capped() {
        let mut rng = StdRng::seed_from_u64(2);
        let cells: Vec<Pos> = (0..5).map(|c| Pos::new(0, c)).collect();
        let picked = sample_cells(&cells, 3, &mut rng);
        assert_eq!(picked.len(), 3);
        assert!(picked.iter().all(|p| cells.contains(p)));
        assert_ne!(picked[0], picked[1]);
        assert_eq!(sample_cells(&cells, 10, &mut rng).len(), 5);
    }

    #[test]
    fn test_free_cells_skips_reserved() {
        let mut grid = Grid::new(2);
        grid.set(Pos::new(0, 0), CellKind::Start);
        let free = free_cells(&grid, &[Pos::new(1, 1)]);
        assert_eq!(free, vec![Pos::new(0, 1), Pos::new(1, 0)]);
    }

    #[test]
    fn test_retry_gives_up() {
        let mut calls = 0;
        let result: Result<()> = retry_layout("test room", || {
            calls += 1;
            None
        });
        assert!(matches!(result, Err(RLError::InfeasibleLayout { attempts, .. }) if attempts == MAX_LAYOUT_ATTEMPTS));
        assert_eq!(calls, MAX_LAYOUT_ATTEMPTS);
    }
}
