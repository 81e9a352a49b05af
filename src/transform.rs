//! Mirror / rotation / pivot transforms.
//!
//! Everything here is pure arithmetic.  Mirroring is always applied before
//! rotation, for block positions, entity positions, facings and yaw alike,
//! so a placed block and its orientation state never disagree.
//!
//! Axes follow the block world convention: +x east, +z south, yaw 0 = south,
//! yaw 90 = west.

use crate::block::{BlockState, Direction};
use crate::types::{BlockPos, Vec3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mirror
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mirror {
    #[default]
    None,
    /// Flip across the x axis origin (`mirror=x`): east and west swap.
    FrontBack,
    /// Flip across the z axis origin (`mirror=z`): north and south swap.
    LeftRight,
}

impl Mirror {
    /// Query-string form: `""`, `"x"` or `"z"`.
    pub fn from_query(value: &str) -> Option<Mirror> {
        match value {
            "" => Some(Mirror::None),
            "x" | "X" => Some(Mirror::FrontBack),
            "z" | "Z" => Some(Mirror::LeftRight),
            _ => None,
        }
    }

    pub fn apply_direction(self, dir: Direction) -> Direction {
        match (self, dir) {
            (Mirror::FrontBack, Direction::East | Direction::West) => dir.opposite(),
            (Mirror::LeftRight, Direction::North | Direction::South) => dir.opposite(),
            _ => dir,
        }
    }

    /// Mirror a rotation expressed in `count` steps per full turn
    /// (16 for standing signs and banners).
    pub fn apply_steps(self, value: i32, count: i32) -> i32 {
        let half = count / 2;
        let signed = if value > half { value - count } else { value };
        match self {
            Mirror::None => value,
            Mirror::FrontBack => (count - signed).rem_euclid(count),
            Mirror::LeftRight => (half - signed).rem_euclid(count),
        }
    }
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    CounterClockwise90,
}

impl Rotation {
    /// Quarter turns clockwise, taken modulo 4.  The remainder keeps the
    /// sign of `steps`, so negative counts are no rotation.
    pub fn from_steps(steps: i32) -> Rotation {
        match steps % 4 {
            1 => Rotation::Clockwise90,
            2 => Rotation::Clockwise180,
            3 => Rotation::CounterClockwise90,
            _ => Rotation::None,
        }
    }

    pub fn steps(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 1,
            Rotation::Clockwise180 => 2,
            Rotation::CounterClockwise90 => 3,
        }
    }

    pub fn apply_direction(self, dir: Direction) -> Direction {
        (0..self.steps()).fold(dir, |d, _| d.clockwise())
    }

    pub fn apply_steps(self, value: i32, count: i32) -> i32 {
        (value + self.steps() * count / 4).rem_euclid(count)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// How a structure is re-oriented when placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSettings {
    pub mirror: Mirror,
    pub rotation: Rotation,
    /// Rotation centre `(x, z)` in the structure's local space.
    pub pivot: (i32, i32),
    pub include_entities: bool,
}

impl TransformSettings {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn with_mirror(mut self, mirror: Mirror) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_pivot(mut self, x: i32, z: i32) -> Self {
        self.pivot = (x, z);
        self
    }

    pub fn with_entities(mut self, include: bool) -> Self {
        self.include_entities = include;
        self
    }

    pub fn is_identity(&self) -> bool {
        self.mirror == Mirror::None && self.rotation == Rotation::None
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Map a structure-local block position to its transformed local position.
///
/// Total over `i32`: arithmetic wraps at the integer bounds.
pub fn transform_position(pos: BlockPos, settings: &TransformSettings) -> BlockPos {
    let (mut x, y, mut z) = (pos.x, pos.y, pos.z);
    match settings.mirror {
        Mirror::FrontBack => x = x.wrapping_neg(),
        Mirror::LeftRight => z = z.wrapping_neg(),
        Mirror::None => {}
    }

    let (px, pz) = settings.pivot;
    let (x, z) = match settings.rotation {
        Rotation::None => (x, z),
        Rotation::Clockwise90 => (
            px.wrapping_add(pz).wrapping_sub(z),
            pz.wrapping_sub(px).wrapping_add(x),
        ),
        Rotation::Clockwise180 => (
            px.wrapping_add(px).wrapping_sub(x),
            pz.wrapping_add(pz).wrapping_sub(z),
        ),
        Rotation::CounterClockwise90 => (
            px.wrapping_sub(pz).wrapping_add(z),
            px.wrapping_add(pz).wrapping_sub(x),
        ),
    };
    BlockPos::new(x, y, z)
}

/// Continuous counterpart of [`transform_position`] for entity positions.
///
/// A point at the centre of block `b` ends up at the centre of
/// `transform_position(b)`.
pub fn transform_entity_position(pos: Vec3, settings: &TransformSettings) -> Vec3 {
    let (mut x, y, mut z) = (pos.x, pos.y, pos.z);
    match settings.mirror {
        Mirror::FrontBack => x = 1.0 - x,
        Mirror::LeftRight => z = 1.0 - z,
        Mirror::None => {}
    }

    let (px, pz) = (settings.pivot.0 as f64, settings.pivot.1 as f64);
    match settings.rotation {
        Rotation::None => Vec3::new(x, y, z),
        Rotation::Clockwise90 => Vec3::new(px + pz + 1.0 - z, y, pz - px + x),
        Rotation::Clockwise180 => Vec3::new(px + px + 1.0 - x, y, pz + pz + 1.0 - z),
        Rotation::CounterClockwise90 => Vec3::new(px - pz + z, y, px + pz + 1.0 - x),
    }
}

/// Entity heading in degrees after mirror then rotation, wrapped to `(-180, 180]`.
pub fn transform_yaw(yaw: f32, settings: &TransformSettings) -> f32 {
    let mirrored = match settings.mirror {
        Mirror::None => yaw,
        Mirror::FrontBack => -yaw,
        Mirror::LeftRight => 180.0 - yaw,
    };
    wrap_degrees(mirrored + 90.0 * settings.rotation.steps() as f32)
}

fn wrap_degrees(deg: f32) -> f32 {
    let wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

// ---------------------------------------------------------------------------
// Orientation state
// ---------------------------------------------------------------------------

pub fn transform_facing(dir: Direction, settings: &TransformSettings) -> Direction {
    settings
        .rotation
        .apply_direction(settings.mirror.apply_direction(dir))
}

/// Rewrite every orientation-carrying property of `state`.
///
/// Handles `facing` (six directions), `axis` (x/z swap on quarter turns),
/// `rotation` (sixteenth turns) and the horizontal connection flags
/// `north`/`east`/`south`/`west`.  Other properties pass through.
pub fn transform_state(state: &BlockState, settings: &TransformSettings) -> BlockState {
    if settings.is_identity() {
        return state.clone();
    }
    let mut out = state.clone();

    if let Some(dir) = state.property("facing").and_then(Direction::from_name) {
        out.properties
            .insert("facing".into(), transform_facing(dir, settings).name().into());
    }

    if settings.rotation.steps() % 2 == 1 {
        match state.property("axis") {
            Some("x") => {
                out.properties.insert("axis".into(), "z".into());
            }
            Some("z") => {
                out.properties.insert("axis".into(), "x".into());
            }
            _ => {}
        }
    }

    if let Some(r) = state.property("rotation").and_then(|v| v.parse::<i32>().ok()) {
        if (0..16).contains(&r) {
            let r = settings
                .rotation
                .apply_steps(settings.mirror.apply_steps(r, 16), 16);
            out.properties.insert("rotation".into(), r.to_string());
        }
    }

    for dir in Direction::HORIZONTAL {
        if let Some(value) = state.property(dir.name()) {
            out.properties.insert(
                transform_facing(dir, settings).name().into(),
                value.to_string(),
            );
        }
    }
    // A connection flag whose source side was absent must not linger.
    for dir in Direction::HORIZONTAL {
        let source_present = Direction::HORIZONTAL
            .iter()
            .any(|d| transform_facing(*d, settings) == dir && state.property(d.name()).is_some());
        if !source_present && state.property(dir.name()).is_some() {
            out.properties.remove(dir.name());
        }
    }

    out
}
