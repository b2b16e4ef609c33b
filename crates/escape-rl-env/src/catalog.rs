//! Room catalog for name-based lookup

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use escape_rl_core::{OptionSpec, RLError};

use crate::{CollectRoomOptions, PlankRoomOptions, PursuitRoomOptions};

/// The rooms this crate provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    /// Room 1, solved by policy iteration
    Collect,
    /// Room 2, solved by SARSA
    Pursuit,
    /// Room 3, solved by Q-learning
    Plank,
}

impl RoomKind {
    /// Every room in presentation order
    pub const ALL: [RoomKind; 3] = [RoomKind::Collect, RoomKind::Pursuit, RoomKind::Plank];

    /// Display name of the room
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Collect => crate::CollectRoom::NAME,
            Self::Pursuit => crate::PursuitRoom::NAME,
            Self::Plank => crate::PlankRoom::NAME,
        }
    }

    /// Room number as shown in menus (1-based)
    #[must_use]
    pub fn number(self) -> usize {
        match self {
            Self::Collect => 1,
            Self::Pursuit => 2,
            Self::Plank => 3,
        }
    }

    /// Default side length
    #[must_use]
    pub fn default_size(self) -> usize {
        match self {
            Self::Collect => crate::collect_room::DEFAULT_SIZE,
            Self::Pursuit => crate::pursuit_room::DEFAULT_SIZE,
            Self::Plank => crate::plank_room::DEFAULT_SIZE,
        }
    }

    /// Editor schema of the room
    #[must_use]
    pub fn options(self) -> Vec<OptionSpec> {
        match self {
            Self::Collect => CollectRoomOptions::schema(),
            Self::Pursuit => PursuitRoomOptions::schema(),
            Self::Plank => PlankRoomOptions::schema(),
        }
    }
}

impl fmt::Display for RoomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RoomKind {
    type Err = RLError;

    /// Accepts the room number, a short name, or the display name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| {
                key == kind.number().to_string()
                    || key == format!("room{}", kind.number())
                    || key == kind.name().to_ascii_lowercase()
                    || key == format!("{kind:?}").to_ascii_lowercase()
            })
            .ok_or_else(|| RLError::Environment(format!("Unknown room: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_number_and_name() {
        assert_eq!("2".parse::<RoomKind>().unwrap(), RoomKind::Pursuit);
        assert_eq!("room3".parse::<RoomKind>().unwrap(), RoomKind::Plank);
        assert_eq!("collect".parse::<RoomKind>().unwrap(), RoomKind::Collect);
        assert!("room9".parse::<RoomKind>().is_err());
    }

    #[test]
    fn test_every_room_has_options() {
        for kind in RoomKind::ALL {
            assert!(kind.options().iter().any(|o| o.key == "Walls"));
        }
    }
}
