//! Room 3: the pothole islands
//!
//! Two keys sit in the middle of two 3×3 pothole islands. The player pushes
//! (or pulls) two planks around; a plank pushed onto a pothole next to a key
//! becomes a bridge. Both keys open the locked door in front of the exit.
//!
//! The learned state is `(row, col, p1_row, p1_col, p2_row, p2_col,
//! has_silver, has_golden)`. A bridged plank stores `-1` as its row and the
//! linear index `row * size + col` of the bridge as its column.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use escape_rl_core::{
    flag, Action, CellKind, Count, Environment, Grid, LayeredGrid, OptionSpec, Pos, RLError, Result,
    Settings, State, Step, StepEvent,
};

use crate::layout::{retry_layout, sample_cells};

/// Default side length
pub const DEFAULT_SIZE: usize = 10;

/// Smallest side two islands fit in
pub const MIN_SIZE: usize = 10;

/// Row value marking a plank that became a bridge
pub const BRIDGE_ROW: i64 = -1;

const ISLAND: usize = 3;

const STEP_REWARD: f64 = -0.1;
const FAIL_REWARD: f64 = -5.0;
const FALL_REWARD: f64 = -100.0;
const USELESS_BRIDGE_REWARD: f64 = -20.0;
const DUPLICATE_BRIDGE_REWARD: f64 = -50.0;
const BRIDGE_REWARD: f64 = 30.0;
const KEY_REWARD: f64 = 50.0;
const ESCAPE_REWARD: f64 = 100.0;

/// Linear index of a bridge cell
#[must_use]
pub fn encode_bridge_pos(pos: Pos, size: usize) -> usize {
    pos.row * size + pos.col
}

/// Inverse of [`encode_bridge_pos`]
#[must_use]
pub fn decode_bridge_pos(code: usize, size: usize) -> Pos {
    Pos::new(code / size, code % size)
}

/// One plank's slot in the state tuple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlankSlot {
    /// Row, or [`BRIDGE_ROW`] once bridged
    pub row: i64,
    /// Column, or the encoded bridge cell once bridged
    pub col: i64,
}

impl PlankSlot {
    /// Loose plank lying at `pos`
    #[must_use]
    pub fn loose(pos: Pos) -> Self {
        Self {
            row: pos.row as i64,
            col: pos.col as i64,
        }
    }

    /// Plank laid as a bridge over `pos`
    #[must_use]
    pub fn bridge(pos: Pos, size: usize) -> Self {
        Self {
            row: BRIDGE_ROW,
            col: encode_bridge_pos(pos, size) as i64,
        }
    }

    /// Whether the plank became a bridge
    #[must_use]
    pub fn is_bridge(self) -> bool {
        self.row == BRIDGE_ROW
    }

    /// Cell of a loose plank
    #[must_use]
    pub fn loose_pos(self) -> Option<Pos> {
        (!self.is_bridge()).then(|| Pos::new(self.row as usize, self.col as usize))
    }

    /// Cell of a bridge
    #[must_use]
    pub fn bridge_pos(self, size: usize) -> Option<Pos> {
        self.is_bridge().then(|| decode_bridge_pos(self.col as usize, size))
    }
}

/// Learned state of the puzzle room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlankState {
    /// Player cell
    pub player: Pos,
    /// Both planks, in a fixed order
    pub planks: [PlankSlot; 2],
    /// Silver key collected
    pub has_silver: bool,
    /// Golden key collected
    pub has_golden: bool,
}

impl PlankState {
    fn has_both_keys(&self) -> bool {
        self.has_silver && self.has_golden
    }

    fn loose_plank_at(&self, pos: Pos) -> Option<usize> {
        self.planks.iter().position(|p| p.loose_pos() == Some(pos))
    }

    /// Same state with the player moved to `player`
    #[must_use]
    pub fn with_player(mut self, player: Pos) -> Self {
        self.player = player;
        self
    }

    /// Same state with plank `index` replaced by `slot`
    #[must_use]
    pub fn with_plank(mut self, index: usize, slot: PlankSlot) -> Self {
        self.planks[index] = slot;
        self
    }
}

impl State for PlankState {
    fn position(&self) -> Pos {
        self.player
    }

    fn features(&self) -> Vec<i64> {
        let [p1, p2] = self.planks;
        vec![
            self.player.row as i64,
            self.player.col as i64,
            p1.row,
            p1.col,
            p2.row,
            p2.col,
            flag(self.has_silver),
            flag(self.has_golden),
        ]
    }
}

/// Typed view of the room's settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlankRoomOptions {
    /// Number of random walls
    pub walls: Count,
}

impl Default for PlankRoomOptions {
    fn default() -> Self {
        Self { walls: Count::Fixed(0) }
    }
}

impl PlankRoomOptions {
    /// Parse from loosely typed settings
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            walls: settings.count("Walls", Self::default().walls),
        }
    }

    /// Editor schema
    #[must_use]
    pub fn schema() -> Vec<OptionSpec> {
        vec![OptionSpec::count("Walls", 20, Count::Fixed(0))]
    }
}

/// Object placement of a puzzle room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlankLayout {
    /// Locked door; must be one of the two cells next to the exit
    pub door: Pos,
    /// Top-left corner of the silver island
    pub silver_island: Pos,
    /// Top-left corner of the golden island
    pub golden_island: Pos,
    /// Starting plank cells
    pub planks: [Pos; 2],
    /// Extra walls
    pub walls: Vec<Pos>,
}

/// Room 3 environment
#[derive(Debug, Clone)]
pub struct PlankRoom {
    size: usize,
    grid: LayeredGrid,
    start: Pos,
    exit: Pos,
    door: Pos,
    silver_key: Pos,
    golden_key: Pos,
    silver_access: Vec<Pos>,
    golden_access: Vec<Pos>,
    planks: [Pos; 2],
}

fn island_cells(top_left: Pos) -> impl Iterator<Item = Pos> {
    (0..ISLAND).flat_map(move |dr| (0..ISLAND).map(move |dc| Pos::new(top_left.row + dr, top_left.col + dc)))
}

fn island_centre(top_left: Pos) -> Pos {
    Pos::new(top_left.row + 1, top_left.col + 1)
}

impl PlankRoom {
    /// Room display name
    pub const NAME: &'static str = "Room 3: Pothole Islands";

    /// Create an unlaid room of side `size`; call
    /// [`Environment::generate_layout`] before use.
    pub fn new(size: usize) -> Result<Self> {
        if size < MIN_SIZE {
            return Err(RLError::Config(format!(
                "{} needs a side of at least {MIN_SIZE}, got {size}",
                Self::NAME
            )));
        }
        Ok(Self {
            size,
            grid: LayeredGrid::new(Grid::new(size)),
            start: Pos::new(0, 0),
            exit: Pos::new(size - 1, size - 1),
            door: Pos::new(size - 2, size - 1),
            silver_key: Pos::new(3, 3),
            golden_key: Pos::new(6, 6),
            silver_access: Vec::new(),
            golden_access: Vec::new(),
            planks: [Pos::new(0, 1), Pos::new(1, 0)],
        })
    }

    /// Install an explicit layout
    pub fn with_layout(size: usize, layout: &PlankLayout) -> Result<Self> {
        let mut room = Self::new(size)?;
        room.install(layout)?;
        Ok(room)
    }

    /// Linear index of a bridge cell in this room
    #[must_use]
    pub fn encode_bridge_pos(&self, pos: Pos) -> usize {
        encode_bridge_pos(pos, self.size)
    }

    /// Cell of an encoded bridge in this room
    #[must_use]
    pub fn decode_bridge_pos(&self, code: usize) -> Pos {
        decode_bridge_pos(code, self.size)
    }

    /// Locked door cell
    #[must_use]
    pub fn door(&self) -> Pos {
        self.door
    }

    /// Silver and golden key cells
    #[must_use]
    pub fn keys(&self) -> (Pos, Pos) {
        (self.silver_key, self.golden_key)
    }

    /// Pothole cells a bridge must cover to reach the silver key
    #[must_use]
    pub fn silver_access(&self) -> &[Pos] {
        &self.silver_access
    }

    /// Pothole cells a bridge must cover to reach the golden key
    #[must_use]
    pub fn golden_access(&self) -> &[Pos] {
        &self.golden_access
    }

    /// Grid with the planks and bridges of `state` drawn in
    #[must_use]
    pub fn grid_for(&self, state: &PlankState) -> Grid {
        let mut grid = self.grid.current().clone();
        for slot in state.planks {
            if let Some(pos) = slot.bridge_pos(self.size) {
                grid.set(pos, CellKind::Bridge);
            } else if let Some(pos) = slot.loose_pos() {
                grid.set(pos, CellKind::Plank);
            }
        }
        grid
    }

    /// Cell kind at `pos` once the bridges of `state` are laid
    fn cell(&self, state: &PlankState, pos: Pos) -> CellKind {
        if state.planks.iter().any(|p| p.bridge_pos(self.size) == Some(pos)) {
            CellKind::Bridge
        } else {
            self.grid.current().get(pos)
        }
    }

    fn closed(&self, state: &PlankState, pos: Pos) -> bool {
        match self.cell(state, pos) {
            CellKind::Wall => true,
            CellKind::LockedDoor => !state.has_both_keys(),
            _ => false,
        }
    }

    fn install(&mut self, layout: &PlankLayout) -> Result<()> {
        let size = self.size;
        let (right, below) = (Pos::new(size - 2, size - 1), Pos::new(size - 1, size - 2));
        let sealed = if layout.door == right {
            below
        } else if layout.door == below {
            right
        } else {
            return Err(RLError::Environment(format!("door {} is not next to the exit", layout.door)));
        };

        let mut grid = Grid::new(size);
        grid.set(Pos::new(size - 2, size - 2), CellKind::Wall);
        grid.set(sealed, CellKind::Wall);
        for island in [layout.silver_island, layout.golden_island] {
            if island.row + ISLAND > size || island.col + ISLAND > size {
                return Err(RLError::Environment(format!("island at {island} leaves the grid")));
            }
            for pos in island_cells(island) {
                if grid.get(pos) != CellKind::Empty {
                    return Err(RLError::Environment(format!("island cell {pos} is taken")));
                }
                grid.set(pos, CellKind::Pothole);
            }
        }
        let silver_key = island_centre(layout.silver_island);
        let golden_key = island_centre(layout.golden_island);
        grid.set(silver_key, CellKind::SilverKey);
        grid.set(golden_key, CellKind::GoldenKey);
        for &pos in &layout.walls {
            grid.set(pos, CellKind::Wall);
        }
        grid.set(self.start, CellKind::Start);
        grid.set(self.exit, CellKind::Exit);
        grid.set(layout.door, CellKind::LockedDoor);
        for plank in layout.planks {
            if grid.get(plank) != CellKind::Empty {
                return Err(RLError::Environment(format!("plank cell {plank} is taken")));
            }
        }
        if layout.planks[0] == layout.planks[1] {
            return Err(RLError::Environment("planks share a cell".to_string()));
        }

        self.grid = LayeredGrid::new(grid);
        self.door = layout.door;
        self.silver_key = silver_key;
        self.golden_key = golden_key;
        self.silver_access = silver_key.manhattan_neighbours();
        self.golden_access = golden_key.manhattan_neighbours();
        self.planks = layout.planks;
        Ok(())
    }

    fn draw<R: Rng + ?Sized>(&self, options: &PlankRoomOptions, rng: &mut R) -> Option<PlankLayout> {
        let size = self.size;
        let mut occupied = vec![self.start, self.exit, Pos::new(size - 2, size - 2)];

        let (door, sealed, door_front) = if rng.gen_bool(0.5) {
            let door = Pos::new(size - 2, size - 1);
            (door, Pos::new(size - 1, size - 2), Pos::new(door.row - 1, door.col))
        } else {
            let door = Pos::new(size - 1, size - 2);
            (door, Pos::new(size - 2, size - 1), Pos::new(door.row, door.col - 1))
        };
        occupied.extend([door, sealed, door_front]);

        let mut corners: Vec<Pos> = (2..size - 4)
            .flat_map(|r| (2..size - 4).map(move |c| Pos::new(r, c)))
            .collect();
        corners.shuffle(rng);
        let mut islands = Vec::with_capacity(2);
        for _ in 0..2 {
            let corner = corners
                .iter()
                .copied()
                .find(|&tl| island_cells(tl).all(|p| !occupied.contains(&p)))?;
            occupied.extend(island_cells(corner));
            islands.push(corner);
        }

        let free: Vec<Pos> = Grid::new(size).positions().filter(|p| !occupied.contains(p)).collect();
        let planks = sample_cells(&free, 2, rng);
        let &[first, second] = planks.as_slice() else {
            return None;
        };
        let free: Vec<Pos> = free.into_iter().filter(|p| !planks.contains(p)).collect();
        let wall_count = options.walls.resolve(1..=10, rng);
        let walls = sample_cells(&free, wall_count, rng);

        Some(PlankLayout {
            door,
            silver_island: islands[0],
            golden_island: islands[1],
            planks: [first, second],
            walls,
        })
    }

    /// Exit and both planks reachable from the start over solid ground
    fn solvable(&self) -> bool {
        let grid = self.grid.original();
        let ground = |_: Pos, kind: CellKind| !matches!(kind, CellKind::Wall | CellKind::Pothole);
        grid.path_exists(self.start, self.exit, ground, &[])
            && self
                .planks
                .iter()
                .all(|&plank| grid.path_exists(self.start, plank, ground, &[]))
    }

    fn pull(&self, state: &PlankState, action: Action) -> Step<PlankState> {
        let fail = || Step::new(*state, FAIL_REWARD, false).with_event(StepEvent::Blocked);
        let Some(target) = state.player.step_back(action, self.size) else {
            return fail();
        };
        if self.closed(state, target) || state.loose_plank_at(target).is_some() {
            return fail();
        }
        if self.cell(state, target) == CellKind::Pothole {
            return Step::new(*state, FALL_REWARD, true).with_event(StepEvent::Fell);
        }
        let pulled = state
            .player
            .step(action, self.size)
            .and_then(|pos| state.loose_plank_at(pos));
        match pulled {
            Some(index) => {
                let next = state
                    .with_player(target)
                    .with_plank(index, PlankSlot::loose(state.player));
                Step::new(next, 0.0, false).with_event(StepEvent::PlankMoved)
            }
            None => fail(),
        }
    }

    fn push(&self, state: &PlankState, action: Action, index: usize, plank: Pos) -> Step<PlankState> {
        let fail = |reward| Step::new(*state, reward, false);
        let Some(beyond) = plank.step(action, self.size) else {
            return fail(FAIL_REWARD).with_event(StepEvent::Blocked);
        };
        if state.loose_plank_at(beyond).is_some() {
            return fail(FAIL_REWARD).with_event(StepEvent::Blocked);
        }
        match self.cell(state, beyond) {
            CellKind::Pothole => {
                let for_silver = self.silver_access.contains(&beyond);
                let for_golden = self.golden_access.contains(&beyond);
                if !for_silver && !for_golden {
                    return fail(USELESS_BRIDGE_REWARD).with_event(StepEvent::BridgeRejected);
                }
                if let Some(existing) = state.planks[1 - index].bridge_pos(self.size) {
                    let duplicate = (for_silver && self.silver_access.contains(&existing))
                        || (for_golden && self.golden_access.contains(&existing));
                    if duplicate {
                        return fail(DUPLICATE_BRIDGE_REWARD).with_event(StepEvent::BridgeRejected);
                    }
                }
                let next = state
                    .with_player(plank)
                    .with_plank(index, PlankSlot::bridge(beyond, self.size));
                Step::new(next, STEP_REWARD + BRIDGE_REWARD, false).with_event(StepEvent::BridgeBuilt)
            }
            CellKind::Empty => {
                let next = state.with_player(plank).with_plank(index, PlankSlot::loose(beyond));
                Step::new(next, 0.0, false).with_event(StepEvent::PlankMoved)
            }
            _ => fail(FAIL_REWARD).with_event(StepEvent::Blocked),
        }
    }

    fn walk(&self, state: &PlankState, action: Action) -> Step<PlankState> {
        let blocked = || Step::new(*state, FAIL_REWARD, false).with_event(StepEvent::Blocked);
        let Some(next) = state.player.step(action, self.size) else {
            return blocked();
        };
        if let Some(index) = state.loose_plank_at(next) {
            return self.push(state, action, index, next);
        }
        if self.closed(state, next) {
            return blocked();
        }
        if self.cell(state, next) == CellKind::Pothole {
            return Step::new(*state, FALL_REWARD, true).with_event(StepEvent::Fell);
        }

        let mut reward = STEP_REWARD;
        let mut events = Vec::new();
        let mut moved = state.with_player(next);
        if next == self.silver_key && !moved.has_silver {
            moved.has_silver = true;
            reward += KEY_REWARD;
            events.push(StepEvent::Collected);
        }
        if next == self.golden_key && !moved.has_golden {
            moved.has_golden = true;
            reward += KEY_REWARD;
            events.push(StepEvent::Collected);
        }
        if next == self.exit {
            events.push(StepEvent::Escaped);
            return Step {
                state: moved,
                reward: ESCAPE_REWARD,
                done: true,
                events,
            };
        }
        Step {
            state: moved,
            reward,
            done: false,
            events,
        }
    }
}

impl Environment for PlankRoom {
    type State = PlankState;

    fn name(&self) -> &str {
        Self::NAME
    }

    fn size(&self) -> usize {
        self.size
    }

    fn actions(&self) -> &'static [Action] {
        &Action::MOVES_AND_PULLS
    }

    fn options(&self) -> Vec<OptionSpec> {
        PlankRoomOptions::schema()
    }

    fn generate_layout<R: Rng + ?Sized>(&mut self, settings: &Settings, rng: &mut R) -> Result<()> {
        let options = PlankRoomOptions::from_settings(settings);
        let mut candidate = self.clone();
        let layout = retry_layout(Self::NAME, || {
            let layout = candidate.draw(&options, rng)?;
            candidate.install(&layout).ok()?;
            candidate.solvable().then_some(layout)
        })?;
        self.install(&layout)?;
        self.reset_state();
        info!(
            room = Self::NAME,
            door = %self.door,
            silver = %self.silver_key,
            golden = %self.golden_key,
            walls = layout.walls.len(),
            "layout ready"
        );
        Ok(())
    }

    fn valid_actions(&self, state: &PlankState) -> Vec<Action> {
        Action::MOVES_AND_PULLS
            .into_iter()
            .filter(|&a| matches!(state.player.step(a, self.size), Some(next) if !self.closed(state, next)))
            .collect()
    }

    fn step<R: Rng + ?Sized>(&mut self, state: &PlankState, action: Action, _rng: &mut R) -> Step<PlankState> {
        if action.is_pull() {
            self.pull(state, action)
        } else {
            self.walk(state, action)
        }
    }

    fn reset_state(&mut self) {
        self.grid.restore();
    }

    fn initial_state(&self) -> PlankState {
        PlankState {
            player: self.start,
            planks: self.planks.map(PlankSlot::loose),
            has_silver: false,
            has_golden: false,
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn room() -> PlankRoom {
        let layout = PlankLayout {
            door: Pos::new(8, 9),
            silver_island: Pos::new(2, 2),
            golden_island: Pos::new(2, 6),
            planks: [Pos::new(6, 3), Pos::new(0, 5)],
            walls: vec![],
        };
        PlankRoom::with_layout(10, &layout).unwrap()
    }

    fn at(room: &PlankRoom, player: Pos) -> PlankState {
        room.initial_state().with_player(player)
    }

    #[test]
    fn test_push_to_empty_cell() {
        let mut room = room();
        let mut rng = StdRng::seed_from_u64(0);
        let s = at(&room, Pos::new(7, 3));
        let step = room.step(&s, Action::Up, &mut rng);
        assert_eq!(step.reward, 0.0);
        assert_eq!(step.state.player, Pos::new(6, 3));
        assert_eq!(step.state.planks[0], PlankSlot::loose(Pos::new(5, 3)));
    }

    #[test]
    fn test_push_onto_access_point_builds_bridge() {
        let mut room = room();
        let mut rng = StdRng::seed_from_u64(0);
        // silver key at (3, 3); (4, 3) is its southern access point
        let s = at(&room, Pos::new(6, 3)).with_plank(0, PlankSlot::loose(Pos::new(5, 3)));
        let step = room.step(&s, Action::Up, &mut rng);
        approx::assert_relative_eq!(step.reward, 29.9);
        assert!(step.has_event(StepEvent::BridgeBuilt));
        let slot = step.state.planks[0];
        assert!(slot.is_bridge());
        assert_eq!(slot.bridge_pos(10), Some(Pos::new(4, 3)));
        assert_eq!(step.state.features()[2], -1);
        assert_eq!(step.state.features()[3], 43);

        // walk over the bridge onto the key
        let on_bridge = room.step(&step.state, Action::Up, &mut rng);
        assert_eq!(on_bridge.state.player, Pos::new(4, 3));
        let on_key = room.step(&on_bridge.state, Action::Up, &mut rng);
        assert!(on_key.state.has_silver);
        approx::assert_relative_eq!(on_key.reward, 49.9);
    }

    #[test]
    fn test_push_onto_non_access_pothole() {
        let mut room = room();
        let mut rng = StdRng::seed_from_u64(0);
        // (4, 2) is an island corner, not next to the key
        let s = at(&room, Pos::new(6, 2)).with_plank(0, PlankSlot::loose(Pos::new(5, 2)));
        let step = room.step(&s, Action::Up, &mut rng);
        assert_eq!(step.reward, -20.0);
        assert_eq!(step.state, s);
    }

    #[test]
    fn test_falling_into_pothole() {
        let mut room = room();
        let mut rng = StdRng::seed_from_u64(0);
        let s = at(&room, Pos::new(1, 2));
        let step = room.step(&s, Action::Down, &mut rng);
        assert!(step.done);
        assert_eq!(step.reward, -100.0);
        assert_eq!(step.state, s);
    }

    #[test]
    fn test_pull_moves_plank_behind_player() {
        let mut room = room();
        let mut rng = StdRng::seed_from_u64(0);
        // plank above the player, player steps down pulling it
        let s = at(&room, Pos::new(7, 3));
        let step = room.step(&s, Action::PullUp, &mut rng);
        assert_eq!(step.reward, 0.0);
        assert_eq!(step.state.player, Pos::new(8, 3));
        assert_eq!(step.state.planks[0], PlankSlot::loose(Pos::new(7, 3)));

        // nothing to pull on the left
        let step = room.step(&s, Action::PullLeft, &mut rng);
        assert_eq!(step.reward, -5.0);
        assert_eq!(step.state, s);
    }

    #[test]
    fn test_pull_into_pothole_is_fatal() {
        let mut room = room();
        let mut rng = StdRng::seed_from_u64(0);
        // player just below the silver island, plank below the player
        let s = at(&room, Pos::new(5, 3)).with_plank(0, PlankSlot::loose(Pos::new(6, 3)));
        let step = room.step(&s, Action::PullDown, &mut rng);
        assert!(step.done);
        assert_eq!(step.reward, -100.0);
    }

    #[test]
    fn test_loose_planks_do_not_stack() {
        let mut room = room();
        let mut rng = StdRng::seed_from_u64(0);
        let s = at(&room, Pos::new(7, 3))
            .with_plank(0, PlankSlot::loose(Pos::new(6, 3)))
            .with_plank(1, PlankSlot::loose(Pos::new(5, 3)));
        let step = room.step(&s, Action::Up, &mut rng);
        assert_eq!(step.reward, -5.0);
        assert_eq!(step.state, s);
    }

    #[test]
    fn test_door_needs_both_keys() {
        let room = room();
        let s = at(&room, Pos::new(7, 9));
        assert!(!room.valid_actions(&s).contains(&Action::Down));
        let mut keyed = s;
        keyed.has_silver = true;
        keyed.has_golden = true;
        assert!(room.valid_actions(&keyed).contains(&Action::Down));
        assert!(room.valid_actions(&keyed).contains(&Action::PullDown));
    }

    #[test]
    fn test_exit_reward_is_flat() {
        let mut room = room();
        let mut rng = StdRng::seed_from_u64(0);
        let mut s = at(&room, Pos::new(8, 9));
        s.has_silver = true;
        s.has_golden = true;
        let step = room.step(&s, Action::Down, &mut rng);
        assert!(step.done);
        assert_eq!(step.reward, 100.0);
    }

    #[test]
    fn test_generated_layouts() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut room = PlankRoom::new(DEFAULT_SIZE).unwrap();
            room.generate_layout(&Settings::new().with("Walls", "Random"), &mut rng).unwrap();
            let (silver, golden) = room.keys();
            assert_eq!(room.grid().get(silver), CellKind::SilverKey);
            assert_eq!(room.grid().get(golden), CellKind::GoldenKey);
            assert_eq!(room.grid().get(room.door()), CellKind::LockedDoor);
            assert_eq!(room.grid().positions_of(CellKind::Pothole).len(), 16);
            assert!(room.solvable());
        }
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut room = room();
        room.reset_state();
        let once = room.grid().clone();
        room.reset_state();
        assert_eq!(room.grid(), &once);
    }

    proptest! {
        #[test]
        fn prop_bridge_code_round_trip(size in 1usize..40, r in 0usize..40, c in 0usize..40) {
            let pos = Pos::new(r % size, c % size);
            prop_assert_eq!(decode_bridge_pos(encode_bridge_pos(pos, size), size), pos);
        }
    }
}
