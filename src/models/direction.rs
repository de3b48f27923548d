//! Compass directions understood by the region query.

use serde::{Deserialize, Serialize};

/// A directional partition of one or more base places.
///
/// Compound directions are distinct values, not combinations of the simple ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Central,
    #[serde(rename = "north-eastern")]
    NorthEast,
    #[serde(rename = "north-western")]
    NorthWest,
    #[serde(rename = "south-eastern")]
    SouthEast,
    #[serde(rename = "south-western")]
    SouthWest,
}

impl Direction {
    /// Canonical name, as reported in results and sent to `find_places_in_direction`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Central => "central",
            Direction::NorthEast => "north-eastern",
            Direction::NorthWest => "north-western",
            Direction::SouthEast => "south-eastern",
            Direction::SouthWest => "south-western",
        }
    }

    /// All directions, compound first
    pub fn all() -> &'static [Direction] {
        &[
            Direction::NorthEast,
            Direction::NorthWest,
            Direction::SouthEast,
            Direction::SouthWest,
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
            Direction::Central,
        ]
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
