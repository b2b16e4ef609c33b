//! Room 2: pursuit-evasion
//!
//! A guard walks a fixed loop around the upper half of the room. The player
//! has to fetch the iron key, which opens a door in the dividing wall, and
//! then use the portal in the lower-left area to reach the exit.
//!
//! The learned state is `(row, col, has_key)`. The guard's position is part of
//! the room, not of the state, so states at different patrol phases alias.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use escape_rl_core::{
    flag, Action, CellKind, Count, Environment, Grid, LayeredGrid, OptionSpec, Pos, RLError, Result,
    Settings, State, Step, StepEvent,
};

use crate::layout::{free_cells, retry_layout, scatter};
use crate::slip::SlipTable;

/// Default side length
pub const DEFAULT_SIZE: usize = 10;

/// Smallest side the scaled skeleton still fits in
pub const MIN_SIZE: usize = 8;

const BLOCKED_REWARD: f64 = -5.0;
const CAUGHT_REWARD: f64 = -100.0;
const PORTAL_REWARD: f64 = 5.0;
const KEY_REWARD: f64 = 50.0;
const ESCAPE_REWARD: f64 = 100.0;

/// Learned state: `(row, col, has_key)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PursuitState {
    /// Player cell
    pub pos: Pos,
    /// Iron key collected
    pub has_key: bool,
}

impl PursuitState {
    /// Create a state
    #[must_use]
    pub const fn new(pos: Pos, has_key: bool) -> Self {
        Self { pos, has_key }
    }
}

impl State for PursuitState {
    fn position(&self) -> Pos {
        self.pos
    }

    fn features(&self) -> Vec<i64> {
        vec![self.pos.row as i64, self.pos.col as i64, flag(self.has_key)]
    }
}

/// Typed view of the room's settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PursuitRoomOptions {
    /// Number of random walls
    pub walls: Count,
    /// Number of slippery tiles
    pub slippery_tiles: Count,
}

impl Default for PursuitRoomOptions {
    fn default() -> Self {
        Self {
            walls: Count::Random,
            slippery_tiles: Count::Random,
        }
    }
}

impl PursuitRoomOptions {
    /// Parse from loosely typed settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            walls: settings.count("Walls", defaults.walls),
            slippery_tiles: settings.count("Slippery Tiles", defaults.slippery_tiles),
        }
    }

    /// Editor schema
    #[must_use]
    pub fn schema() -> Vec<OptionSpec> {
        vec![
            OptionSpec::count("Walls", 20, Count::Random),
            OptionSpec::count("Slippery Tiles", 20, Count::Random),
        ]
    }
}

/// Fixed walls of the room, scaled from the 10×10 design
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Skeleton {
    /// Row of the horizontal dividing wall
    divider: usize,
    /// Column of the vertical wall below the divider
    splitter: usize,
}

impl Skeleton {
    fn for_size(size: usize) -> Self {
        Self {
            divider: 2 * size / 5,
            splitter: 3 * size / 5,
        }
    }
}

/// Room 2 environment
#[derive(Debug, Clone)]
pub struct PursuitRoom {
    size: usize,
    skeleton: Skeleton,
    grid: LayeredGrid,
    start: Pos,
    exit: Pos,
    key: Pos,
    door: Pos,
    portal: Option<(Pos, Pos)>,
    slips: SlipTable,
    patrol_route: Vec<Pos>,
    patrol_index: usize,
    enemy: Pos,
}

struct Drawn {
    grid: Grid,
    key: Pos,
    door: Pos,
    portal: Option<(Pos, Pos)>,
    slips: SlipTable,
}

impl PursuitRoom {
    /// Room display name
    pub const NAME: &'static str = "Room 2: Pursuit";

    /// Create an unlaid room of side `size`; call
    /// [`Environment::generate_layout`] before use.
    pub fn new(size: usize) -> Result<Self> {
        if size < MIN_SIZE {
            return Err(RLError::Config(format!(
                "{} needs a side of at least {MIN_SIZE}, got {size}",
                Self::NAME
            )));
        }
        let skeleton = Skeleton::for_size(size);
        let patrol_route = patrol_route(size, skeleton.divider);
        let enemy = patrol_route[0];
        Ok(Self {
            size,
            skeleton,
            grid: LayeredGrid::new(Grid::new(size)),
            start: Pos::new(0, 0),
            exit: Pos::new(size - 1, size - 1),
            key: Pos::new(1, 1),
            door: Pos::new(skeleton.divider, 1),
            portal: None,
            slips: SlipTable::new(),
            patrol_route,
            patrol_index: 0,
            enemy,
        })
    }

    /// Cells the guard visits, in order; the first cell is repeated at the end
    #[must_use]
    pub fn patrol_route(&self) -> &[Pos] {
        &self.patrol_route
    }

    /// Guard's current cell
    #[must_use]
    pub fn enemy_pos(&self) -> Pos {
        self.enemy
    }

    /// Guard's index into the patrol route
    #[must_use]
    pub fn patrol_index(&self) -> usize {
        self.patrol_index
    }

    /// Iron key cell
    #[must_use]
    pub fn key(&self) -> Pos {
        self.key
    }

    /// Door cell in the dividing wall
    #[must_use]
    pub fn door(&self) -> Pos {
        self.door
    }

    /// Portal entry and exit, if both could be placed
    #[must_use]
    pub fn portal(&self) -> Option<(Pos, Pos)> {
        self.portal
    }

    /// Immutable generated layout
    #[must_use]
    pub fn original_grid(&self) -> &Grid {
        self.grid.original()
    }

    fn blocked(&self, pos: Pos, has_key: bool) -> bool {
        self.grid.original().is_wall(pos) && !(has_key && pos == self.door)
    }

    fn advance_patrol(&mut self) {
        self.patrol_index = (self.patrol_index + 1) % self.patrol_route.len();
        self.enemy = self.patrol_route[self.patrol_index];
    }

    fn draw<R: Rng + ?Sized>(&self, options: &PursuitRoomOptions, rng: &mut R) -> Option<Drawn> {
        let Skeleton { divider, splitter } = self.skeleton;
        let size = self.size;
        let mut grid = Grid::new(size);
        for col in 0..size {
            grid.set(Pos::new(divider, col), CellKind::Wall);
        }
        for row in divider..size {
            grid.set(Pos::new(row, splitter), CellKind::Wall);
        }
        grid.set(self.start, CellKind::Start);
        grid.set(self.exit, CellKind::Exit);

        let mut reserved = self.patrol_route.clone();
        let key_zone: Vec<Pos> = free_cells(&grid, &reserved)
            .into_iter()
            .filter(|p| p.row < divider)
            .collect();
        let key = *key_zone.choose(rng)?;
        grid.set(key, CellKind::IronKey);
        reserved.push(key);

        let door_candidates: Vec<Pos> = (1..splitter).map(|col| Pos::new(divider, col)).collect();
        let door = *door_candidates.choose(rng)?;

        let portal_row = 7 * size / 10;
        let entry_zone: Vec<Pos> = free_cells(&grid, &reserved)
            .into_iter()
            .filter(|p| p.row >= portal_row && p.col < 3 * size / 10)
            .collect();
        let exit_zone: Vec<Pos> = free_cells(&grid, &reserved)
            .into_iter()
            .filter(|p| p.row > divider && p.row < portal_row && p.col > splitter)
            .collect();
        let portal = match (entry_zone.choose(rng), exit_zone.choose(rng)) {
            (Some(&entry), Some(&out)) => {
                grid.set(entry, CellKind::Portal);
                grid.set(out, CellKind::Portal);
                Some((entry, out))
            }
            _ => None,
        };

        let free = free_cells(&grid, &reserved);
        let wall_count = options.walls.resolve(1..=10, rng);
        let walls = scatter(&mut grid, &free, wall_count, CellKind::Wall, rng);
        let free: Vec<Pos> = free.into_iter().filter(|p| !walls.contains(p)).collect();
        let slippery_count = options.slippery_tiles.resolve(1..=10, rng);
        let slippery = scatter(&mut grid, &free, slippery_count, CellKind::Slippery, rng);

        let mut slips = SlipTable::new();
        for pos in slippery {
            slips.insert_uniform(&grid, pos);
        }

        let drawn = Drawn {
            grid,
            key,
            door,
            portal,
            slips,
        };
        self.solvable(&drawn).then_some(drawn)
    }

    /// Key reachable with the door shut, exit reachable from the key with it open
    fn solvable(&self, drawn: &Drawn) -> bool {
        let teleports: Vec<(Pos, Pos)> = drawn.portal.into_iter().collect();
        let closed = |_: Pos, kind: CellKind| kind != CellKind::Wall;
        let open = |p: Pos, kind: CellKind| kind != CellKind::Wall || p == drawn.door;
        drawn.grid.path_exists(self.start, drawn.key, closed, &teleports)
            && drawn.grid.path_exists(drawn.key, self.exit, open, &teleports)
    }
}

/// Guard loop: along the top row right to left, down the first column, along
/// the row above the divider left to right, then up the last column.
fn patrol_route(size: usize, divider: usize) -> Vec<Pos> {
    let last_row = divider - 1;
    let last_col = size - 1;
    let mut route: Vec<Pos> = (0..size).rev().map(|c| Pos::new(0, c)).collect();
    route.extend((1..=last_row).map(|r| Pos::new(r, 0)));
    route.extend((1..size).map(|c| Pos::new(last_row, c)));
    route.extend((0..last_row).rev().map(|r| Pos::new(r, last_col)));
    route
}

impl Environment for PursuitRoom {
    type State = PursuitState;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn size(&self) -> usize {
        self.size
    }

    fn actions(&self) -> &'static [Action] {
        &Action::MOVES
    }

    fn options(&self) -> Vec<OptionSpec> {
        PursuitRoomOptions::schema()
    }

    fn generate_layout<R: Rng + ?Sized>(&mut self, settings: &Settings, rng: &mut R) -> Result<()> {
        let options = PursuitRoomOptions::from_settings(settings);
        let drawn = retry_layout(Self::NAME, || self.draw(&options, rng))?;
        self.grid = LayeredGrid::new(drawn.grid);
        self.key = drawn.key;
        self.door = drawn.door;
        self.portal = drawn.portal;
        self.slips = drawn.slips;
        self.reset_state();
        info!(
            room = Self::NAME,
            key = %self.key,
            door = %self.door,
            portal = ?self.portal,
            slippery = self.slips.len(),
            "layout ready"
        );
        Ok(())
    }

    fn valid_actions(&self, state: &PursuitState) -> Vec<Action> {
        Action::MOVES
            .into_iter()
            .filter(|&a| matches!(state.pos.step(a, self.size), Some(next) if !self.blocked(next, state.has_key)))
            .collect()
    }

    fn step<R: Rng + ?Sized>(&mut self, state: &PursuitState, action: Action, rng: &mut R) -> Step<PursuitState> {
        let mut events = Vec::new();
        let mut reward = 0.0;

        let mut direction = action;
        if self.grid.current().get(state.pos) == CellKind::Slippery {
            if let Some(forced) = self.slips.sample(state.pos, rng) {
                if forced != action {
                    events.push(StepEvent::Slipped);
                }
                direction = forced;
            }
        }

        let mut pos = match state.pos.step(direction, self.size) {
            Some(next) if !self.blocked(next, state.has_key) => next,
            _ => {
                events.push(StepEvent::Blocked);
                reward = BLOCKED_REWARD;
                state.pos
            }
        };

        let caught = |events: Vec<StepEvent>| Step {
            state: PursuitState::new(pos, state.has_key),
            reward: CAUGHT_REWARD,
            done: true,
            events,
        };
        if pos == self.enemy {
            events.push(StepEvent::Caught);
            return caught(events);
        }
        self.advance_patrol();
        if pos == self.enemy {
            events.push(StepEvent::Caught);
            debug!(at = %pos, "caught after guard move");
            return caught(events);
        }

        if let Some((entry, out)) = self.portal {
            if pos == entry {
                pos = out;
                reward += PORTAL_REWARD;
                events.push(StepEvent::Teleported);
            }
        }

        let mut has_key = state.has_key;
        if pos == self.key && !has_key {
            has_key = true;
            reward += KEY_REWARD;
            let grid = self.grid.current_mut();
            grid.set(self.key, CellKind::Empty);
            grid.set(self.door, CellKind::Empty);
            events.push(StepEvent::Collected);
        }

        let done = pos == self.exit;
        if done {
            reward += ESCAPE_REWARD;
            events.push(StepEvent::Escaped);
        }

        Step {
            state: PursuitState::new(pos, has_key),
            reward,
            done,
            events,
        }
    }

    fn reset_state(&mut self) {
        self.grid.restore();
        self.patrol_index = 0;
        self.enemy = self.patrol_route[0];
    }

    fn initial_state(&self) -> PursuitState {
        PursuitState::new(self.start, false)
    }

    fn grid(&self) -> &Grid {
        self.grid.current()
    }

    fn start(&self) -> Pos {
        self.start
    }

    fn exit(&self) -> Pos {
        self.exit
    }
}
