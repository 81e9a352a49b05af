//! Block states and horizontal directions.

use crate::nbt::{CompoundExt, NbtCompound, NbtTag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const AIR: &str = "minecraft:air";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BlockStateParseError {
    #[error("block state is empty")]
    Empty,

    #[error("unterminated property list in `{0}`")]
    Unterminated(String),

    #[error("malformed property `{0}`")]
    BadProperty(String),
}

// ---------------------------------------------------------------------------
// Block state
// ---------------------------------------------------------------------------

/// A block identifier together with its state properties.
///
/// Textual form is `namespace:path[key=value,...]`; an identifier without a
/// namespace is taken to be in `minecraft:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockState {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.contains(':') {
            name
        } else {
            format!("minecraft:{}", name)
        };
        Self {
            name,
            properties: BTreeMap::new(),
        }
    }

    pub fn air() -> Self {
        Self::new(AIR)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn is_air(&self) -> bool {
        matches!(
            self.name.as_str(),
            "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air"
        )
    }

    /// Palette entry: `{Name, Properties?}`.
    pub fn to_compound(&self) -> NbtCompound {
        let mut tag = NbtCompound::new();
        tag.insert("Name", self.name.as_str());
        if !self.properties.is_empty() {
            let mut props = NbtCompound::new();
            for (k, v) in &self.properties {
                props.insert(k.as_str(), v.as_str());
            }
            tag.insert("Properties", props);
        }
        tag
    }

    /// Inverse of [`BlockState::to_compound`]; `None` when `Name` is missing.
    /// Non-string property values are ignored.
    pub fn from_compound(tag: &NbtCompound) -> Option<Self> {
        let mut state = BlockState::new(tag.get_str("Name")?);
        if let Some(props) = tag.get_compound("Properties") {
            for (k, v) in props.inner() {
                if let NbtTag::String(v) = v {
                    state.properties.insert(k.clone(), v.clone());
                }
            }
        }
        Some(state)
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.properties.is_empty() {
            f.write_str("[")?;
            for (i, (k, v)) in self.properties.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}={}", k, v)?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

impl FromStr for BlockState {
    type Err = BlockStateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(BlockStateParseError::Empty);
        }
        let Some(open) = s.find('[') else {
            return Ok(BlockState::new(s));
        };
        let Some(body) = s[open + 1..].strip_suffix(']') else {
            return Err(BlockStateParseError::Unterminated(s.to_string()));
        };
        let mut state = BlockState::new(&s[..open]);
        for pair in body.split(',').filter(|p| !p.trim().is_empty()) {
            let (k, v) = pair
                .split_once('=')
                .ok_or_else(|| BlockStateParseError::BadProperty(pair.to_string()))?;
            let (k, v) = (k.trim(), v.trim());
            if k.is_empty() || v.is_empty() {
                return Err(BlockStateParseError::BadProperty(pair.to_string()));
            }
            state.properties.insert(k.to_string(), v.to_string());
        }
        Ok(state)
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    pub fn from_name(name: &str) -> Option<Direction> {
        Some(match name {
            "down" => Direction::Down,
            "up" => Direction::Up,
            "north" => Direction::North,
            "south" => Direction::South,
            "west" => Direction::West,
            "east" => Direction::East,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Direction::Down => "down",
            Direction::Up => "up",
            Direction::North => "north",
            Direction::South => "south",
            Direction::West => "west",
            Direction::East => "east",
        }
    }

    /// Quarter turn clockwise seen from above; vertical directions are fixed.
    pub fn clockwise(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            vertical => vertical,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
