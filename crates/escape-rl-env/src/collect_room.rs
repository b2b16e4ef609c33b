//! Room 1: stochastic collect-and-exit
//!
//! Walls, slippery tiles with per-tile slip distributions, and two items
//! (bag, rope) whose rewards depend on pickup order. This is the only room
//! with a full transition model, so it is the one dynamic programming runs on.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use escape_rl_core::{
    flag, Action, CellKind, Count, Environment, Grid, OptionSpec, Outcome, Pos, RLError, Result,
    Settings, State, Step, StepEvent, TransitionModel,
};

use crate::layout::{free_cells, retry_layout, sample_cells, scatter};
use crate::slip::SlipTable;

/// Default side length
pub const DEFAULT_SIZE: usize = 10;

/// Side length of the central zone items spawn in
const ITEM_ZONE: usize = 4;

const BLOCKED_REWARD: f64 = -10.0;
const BAG_REWARD: f64 = 20.0;
const ROPE_REWARD: f64 = 30.0;
const ROPE_WITHOUT_BAG_REWARD: f64 = -10.0;
const ESCAPE_REWARD: f64 = 100.0;
const EARLY_EXIT_REWARD: f64 = -20.0;

/// Learned state: `(row, col, has_bag, has_rope)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectState {
    /// Player cell
    pub pos: Pos,
    /// Bag collected
    pub has_bag: bool,
    /// Rope collected
    pub has_rope: bool,
}

impl CollectState {
    /// Create a state
    #[must_use]
    pub const fn new(pos: Pos, has_bag: bool, has_rope: bool) -> Self {
        Self { pos, has_bag, has_rope }
    }
}

impl State for CollectState {
    fn position(&self) -> Pos {
        self.pos
    }

    fn features(&self) -> Vec<i64> {
        vec![
            self.pos.row as i64,
            self.pos.col as i64,
            flag(self.has_bag),
            flag(self.has_rope),
        ]
    }
}

/// Inventory the player starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StartItems {
    /// Empty-handed
    #[default]
    None,
    /// Bag only
    Bag,
    /// Rope only
    Rope,
    /// Both items
    Both,
}

impl StartItems {
    const CHOICES: [&'static str; 4] = ["None", "Bag", "Rope", "Both"];

    fn from_choice(choice: &str) -> Self {
        match choice {
            "Bag" => Self::Bag,
            "Rope" => Self::Rope,
            "Both" => Self::Both,
            _ => Self::None,
        }
    }

    fn flags(self) -> (bool, bool) {
        match self {
            Self::None => (false, false),
            Self::Bag => (true, false),
            Self::Rope => (false, true),
            Self::Both => (true, true),
        }
    }
}

/// Typed view of the room's settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectRoomOptions {
    /// Number of random walls
    pub walls: Count,
    /// Number of slippery tiles
    pub slippery_tiles: Count,
    /// Starting inventory
    pub start_items: StartItems,
}

impl Default for CollectRoomOptions {
    fn default() -> Self {
        Self {
            walls: Count::Random,
            slippery_tiles: Count::Random,
            start_items: StartItems::None,
        }
    }
}

impl CollectRoomOptions {
    /// Parse from loosely typed settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            walls: settings.count("Walls", defaults.walls),
            slippery_tiles: settings.count("Slippery Tiles", defaults.slippery_tiles),
            start_items: StartItems::from_choice(settings.choice(
                "Start with Items",
                &StartItems::CHOICES,
                "None",
            )),
        }
    }

    /// Editor schema
    #[must_use]
    pub fn schema() -> Vec<OptionSpec> {
        vec![
            OptionSpec::count("Walls", 20, Count::Random),
            OptionSpec::count("Slippery Tiles", 20, Count::Random),
            OptionSpec::choice("Start with Items", &StartItems::CHOICES, "None"),
        ]
    }
}

/// Room 1 environment
#[derive(Debug, Clone)]
pub struct CollectRoom {
    size: usize,
    grid: Grid,
    start: Pos,
    exit: Pos,
    bag: Pos,
    rope: Pos,
    slips: SlipTable,
    start_items: StartItems,
}

struct Drawn {
    grid: Grid,
    bag: Pos,
    rope: Pos,
    slips: SlipTable,
}

impl CollectRoom {
    /// Room display name
    pub const NAME: &'static str = "Room 1: Collect and Exit";

    /// Create an unlaid room of side `size`; call
    /// [`Environment::generate_layout`] before use.
    pub fn new(size: usize) -> Result<Self> {
        if size < ITEM_ZONE {
            return Err(RLError::Config(format!(
                "{} needs a side of at least {ITEM_ZONE}, got {size}",
                Self::NAME
            )));
        }
        let start = Pos::new(0, 0);
        let exit = Pos::new(size - 1, size - 1);
        let mut grid = Grid::new(size);
        grid.set(start, CellKind::Start);
        grid.set(exit, CellKind::Exit);
        Ok(Self {
            size,
            grid,
            start,
            exit,
            bag: Pos::new(0, 1),
            rope: Pos::new(1, 0),
            slips: SlipTable::new(),
            start_items: StartItems::None,
        })
    }

    /// Install an explicit layout.
    ///
    /// The start is the top-left and the exit the bottom-right corner; every
    /// cell of `slips` becomes a slippery tile. Fails if the exit cannot be
    /// reached or an object sits on another.
    pub fn with_layout(size: usize, walls: &[Pos], bag: Pos, rope: Pos, slips: SlipTable) -> Result<Self> {
        let mut room = Self::new(size)?;
        let mut grid = room.grid.clone();
        for &pos in walls {
            if !grid.contains(pos) {
                return Err(RLError::Environment(format!("wall {pos} is outside the grid")));
            }
            grid.set(pos, CellKind::Wall);
        }
        let objects = [(bag, CellKind::Bag), (rope, CellKind::Rope)]
            .into_iter()
            .chain(slips.positions().map(|p| (p, CellKind::Slippery)));
        for (pos, kind) in objects {
            if !grid.contains(pos) || grid.get(pos) != CellKind::Empty {
                return Err(RLError::Environment(format!("cell {pos} is not free")));
            }
            grid.set(pos, kind);
        }
        if !exit_reachable(&grid, room.start, room.exit) {
            return Err(RLError::Environment("exit is unreachable".to_string()));
        }
        room.install(Drawn { grid, bag, rope, slips });
        Ok(room)
    }

    /// Set the starting inventory
    pub fn set_start_items(&mut self, items: StartItems) {
        self.start_items = items;
    }

    /// Bag cell
    #[must_use]
    pub fn bag(&self) -> Pos {
        self.bag
    }

    /// Rope cell
    #[must_use]
    pub fn rope(&self) -> Pos {
        self.rope
    }

    /// Slip distributions of the slippery tiles
    #[must_use]
    pub fn slips(&self) -> &SlipTable {
        &self.slips
    }

    fn install(&mut self, drawn: Drawn) {
        self.grid = drawn.grid;
        self.bag = drawn.bag;
        self.rope = drawn.rope;
        self.slips = drawn.slips;
    }

    fn draw<R: Rng + ?Sized>(&self, options: &CollectRoomOptions, rng: &mut R) -> Option<Drawn> {
        let mut grid = Grid::new(self.size);
        grid.set(self.start, CellKind::Start);
        grid.set(self.exit, CellKind::Exit);

        let wall_count = options.walls.resolve(1..=15, rng);
        let free = free_cells(&grid, &[]);
        scatter(&mut grid, &free, wall_count, CellKind::Wall, rng);

        let lo = (self.size - ITEM_ZONE) / 2;
        let zone: Vec<Pos> = free_cells(&grid, &[])
            .into_iter()
            .filter(|p| (lo..lo + ITEM_ZONE).contains(&p.row) && (lo..lo + ITEM_ZONE).contains(&p.col))
            .collect();
        let items = sample_cells(&zone, 2, rng);
        let &[bag, rope] = items.as_slice() else {
            return None;
        };
        grid.set(bag, CellKind::Bag);
        grid.set(rope, CellKind::Rope);

        let slippery_count = options.slippery_tiles.resolve(1..=10, rng);
        let free = free_cells(&grid, &[]);
        let slippery = scatter(&mut grid, &free, slippery_count, CellKind::Slippery, rng);
        let mut slips = SlipTable::new();
        for pos in slippery {
            slips.insert_weighted(&grid, pos, rng);
        }

        exit_reachable(&grid, self.start, self.exit).then_some(Drawn { grid, bag, rope, slips })
    }

    /// Outcome of actually moving in `direction` from `state`
    fn resolve(&self, state: &CollectState, direction: Action) -> (CollectState, f64, Vec<StepEvent>) {
        let mut events = Vec::new();
        let (pos, mut reward) = match state.pos.step(direction, self.size) {
            Some(next) if !self.grid.is_wall(next) => (next, 0.0),
            _ => {
                events.push(StepEvent::Blocked);
                (state.pos, BLOCKED_REWARD)
            }
        };

        let mut next = CollectState::new(pos, state.has_bag, state.has_rope);
        if pos == self.bag && !state.has_bag {
            reward += BAG_REWARD;
            next.has_bag = true;
            events.push(StepEvent::Collected);
        } else if pos == self.rope && !state.has_rope {
            reward += if state.has_bag { ROPE_REWARD } else { ROPE_WITHOUT_BAG_REWARD };
            next.has_rope = true;
            events.push(StepEvent::Collected);
        }

        if pos == self.exit {
            reward += if next.has_bag && next.has_rope {
                ESCAPE_REWARD
            } else {
                EARLY_EXIT_REWARD
            };
            events.push(StepEvent::Escaped);
        }
        (next, reward, events)
    }

    fn is_absorbing(&self, pos: Pos) -> bool {
        matches!(self.grid.get(pos), CellKind::Wall | CellKind::Exit)
    }

    /// Directions that can actually happen, with their probabilities
    fn directions(&self, pos: Pos, action: Action) -> Vec<(f64, Action)> {
        if self.grid.get(pos) == CellKind::Slippery {
            let outcomes = self.slips.outcomes(pos);
            if !outcomes.is_empty() {
                return outcomes;
            }
        }
        vec![(1.0, action)]
    }
}

fn exit_reachable(grid: &Grid, start: Pos, exit: Pos) -> bool {
    grid.path_exists(start, exit, |_, kind| kind != CellKind::Wall, &[])
}

impl Environment for CollectRoom {
    type State = CollectState;

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
        CollectRoomOptions::schema()
    }

    fn generate_layout<R: Rng + ?Sized>(&mut self, settings: &Settings, rng: &mut R) -> Result<()> {
        let options = CollectRoomOptions::from_settings(settings);
        let drawn = retry_layout(Self::NAME, || self.draw(&options, rng))?;
        self.install(drawn);
        self.start_items = options.start_items;
        info!(
            room = Self::NAME,
            walls = self.grid.positions_of(CellKind::Wall).len(),
            slippery = self.slips.len(),
            bag = %self.bag,
            rope = %self.rope,
            "layout ready"
        );
        Ok(())
    }

    fn valid_actions(&self, state: &CollectState) -> Vec<Action> {
        self.grid.open_moves(state.pos)
    }

    fn step<R: Rng + ?Sized>(&mut self, state: &CollectState, action: Action, rng: &mut R) -> Step<CollectState> {
        if self.is_absorbing(state.pos) {
            return Step::new(*state, 0.0, state.pos == self.exit);
        }
        let directions = self.directions(state.pos, action);
        let direction = match WeightedIndex::new(directions.iter().map(|(p, _)| *p)) {
            Ok(dist) => directions[dist.sample(rng)].1,
            Err(_) => action,
        };
        let (next, reward, mut events) = self.resolve(state, direction);
        if direction != action {
            events.insert(0, StepEvent::Slipped);
        }
        Step {
            done: next.pos == self.exit,
            state: next,
            reward,
            events,
        }
    }

    fn reset_state(&mut self) {}

    fn initial_state(&self) -> CollectState {
        let (has_bag, has_rope) = self.start_items.flags();
        CollectState::new(self.start, has_bag, has_rope)
    }

    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn start(&self) -> Pos {
        self.start
    }

    fn exit(&self) -> Pos {
        self.exit
    }

    fn transition_model(&self, state: &CollectState, action: Action) -> Result<Vec<Outcome<CollectState>>> {
        Ok(self.transitions(state, action))
    }
}

impl TransitionModel for CollectRoom {
    fn state_count(&self) -> usize {
        self.size * self.size * 4
    }

    fn states(&self) -> Vec<CollectState> {
        self.grid
            .positions()
            .flat_map(|pos| {
                [(false, false), (false, true), (true, false), (true, true)]
                    .into_iter()
                    .map(move |(bag, rope)| CollectState::new(pos, bag, rope))
            })
            .collect()
    }

    fn state_index(&self, state: &CollectState) -> Option<usize> {
        if !self.grid.contains(state.pos) {
            return None;
        }
        let cell = state.pos.row * self.size + state.pos.col;
        Some(cell * 4 + usize::from(state.has_bag) * 2 + usize::from(state.has_rope))
    }

    fn transitions(&self, state: &CollectState, action: Action) -> Vec<Outcome<CollectState>> {
        if self.is_absorbing(state.pos) {
            return vec![Outcome {
                probability: 1.0,
                next_state: *state,
                reward: 0.0,
            }];
        }
        self.directions(state.pos, action)
            .into_iter()
            .map(|(probability, direction)| {
                let (next_state, reward, _) = self.resolve(state, direction);
                Outcome {
                    probability,
                    next_state,
                    reward,
                }
            })
            .collect()
    }
}
