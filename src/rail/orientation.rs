use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Cardinal orientation of a placed piece, closed under quarter-turn rotation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize,
)]
pub enum Orientation {
    #[default]
    North,
    East,
    South,
    West,
}

impl Orientation {
    pub const COUNT: u8 = 4;

    pub const ALL: [Orientation; 4] = [
        Orientation::North,
        Orientation::East,
        Orientation::South,
        Orientation::West,
    ];

    pub fn index(self) -> u8 {
        match self {
            Orientation::North => 0,
            Orientation::East => 1,
            Orientation::South => 2,
            Orientation::West => 3,
        }
    }

    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index % Self::COUNT) as usize]
    }

    /// Rotate clockwise by `n` quarter turns
    pub fn rotate(self, n: u8) -> Self {
        Self::from_index(self.index() + n % Self::COUNT)
    }

    /// Number of quarter turns needed to rotate `base` into `top`
    pub fn relative(base: Self, top: Self) -> u8 {
        let mut current = base;
        let mut turns = 0;
        while current != top {
            current = current.rotate(1);
            turns += 1;
        }
        turns
    }

    /// The orientation that rotates `self` back to North
    pub fn inverse(self) -> Self {
        Self::from_index(Self::COUNT - self.index())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown orientation `{0}`")]
pub struct UnknownOrientation(pub String);

impl FromStr for Orientation {
    type Err = UnknownOrientation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "North" => Ok(Orientation::North),
            "East" => Ok(Orientation::East),
            "South" => Ok(Orientation::South),
            "West" => Ok(Orientation::West),
            other => Err(UnknownOrientation(other.to_string())),
        }
    }
}

/// Eight-way compass orientation used by the path-laying tool.
/// Grid convention: +x is East, +y is North.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize,
)]
pub enum CompassOrientation {
    #[default]
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassOrientation {
    pub const COUNT: u8 = 8;

    pub const ALL: [CompassOrientation; 8] = [
        CompassOrientation::North,
        CompassOrientation::NorthEast,
        CompassOrientation::East,
        CompassOrientation::SouthEast,
        CompassOrientation::South,
        CompassOrientation::SouthWest,
        CompassOrientation::West,
        CompassOrientation::NorthWest,
    ];

    pub fn index(self) -> u8 {
        Self::ALL.iter().position(|&o| o == self).unwrap_or(0) as u8
    }

    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index % Self::COUNT) as usize]
    }

    /// Rotate clockwise by `n` eighth turns
    pub fn rotate(self, n: u8) -> Self {
        Self::from_index(self.index() + n % Self::COUNT)
    }

    /// Number of eighth turns needed to rotate `base` into `top`
    pub fn relative(base: Self, top: Self) -> u8 {
        let mut current = base;
        let mut turns = 0;
        while current != top {
            current = current.rotate(1);
            turns += 1;
        }
        turns
    }

    pub fn opposite(self) -> Self {
        self.rotate(4)
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            CompassOrientation::NorthEast
                | CompassOrientation::SouthEast
                | CompassOrientation::SouthWest
                | CompassOrientation::NorthWest
        )
    }

    /// Unit grid step for this direction
    pub fn offset(self) -> IVec2 {
        match self {
            CompassOrientation::North => IVec2::new(0, 1),
            CompassOrientation::NorthEast => IVec2::new(1, 1),
            CompassOrientation::East => IVec2::new(1, 0),
            CompassOrientation::SouthEast => IVec2::new(1, -1),
            CompassOrientation::South => IVec2::new(0, -1),
            CompassOrientation::SouthWest => IVec2::new(-1, -1),
            CompassOrientation::West => IVec2::new(-1, 0),
            CompassOrientation::NorthWest => IVec2::new(-1, 1),
        }
    }

    /// Inverse of [`Self::offset`]; `None` for non-unit deltas
    pub fn from_offset(delta: IVec2) -> Option<Self> {
        Self::ALL.iter().copied().find(|o| o.offset() == delta)
    }
}

impl From<Orientation> for CompassOrientation {
    fn from(orientation: Orientation) -> Self {
        CompassOrientation::from_index(orientation.index() * 2)
    }
}
