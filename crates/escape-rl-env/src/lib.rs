//! Grid-world escape rooms
//!
//! This crate provides the three rooms of the sandbox:
//! - [`CollectRoom`]: walls, slippery tiles, and two ordered items, with a
//!   full transition model for planning agents
//! - [`PursuitRoom`]: a patrolling guard, a key and door, and a portal
//! - [`PlankRoom`]: movable planks that bridge pothole islands

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod catalog;
pub mod collect_room;
pub mod layout;
pub mod plank_room;
pub mod pursuit_room;
pub mod slip;

// Re-export rooms
pub use catalog::RoomKind;
pub use collect_room::{CollectRoom, CollectRoomOptions, CollectState, StartItems};
pub use plank_room::{
    decode_bridge_pos, encode_bridge_pos, PlankLayout, PlankRoom, PlankRoomOptions, PlankSlot, PlankState,
};
pub use pursuit_room::{PursuitRoom, PursuitRoomOptions, PursuitState};
pub use slip::SlipTable;

// Re-export core types
pub use escape_rl_core::{Action, CellKind, Environment, Grid, Pos, Settings, State, Step, TransitionModel};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{CollectRoom, PlankRoom, PursuitRoom, RoomKind};
    pub use escape_rl_core::prelude::*;
}
