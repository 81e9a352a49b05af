//! Core world types shared across all modules.

use serde::{Deserialize, Serialize};
use std::ops;

// ---------------------------------------------------------------------------
// Block positions
// ---------------------------------------------------------------------------

/// Integer block coordinate, either world-space or structure-local.
#[derive(
    Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: BlockPos = BlockPos::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        self + BlockPos::new(dx, dy, dz)
    }

    /// `self + other`, or `None` when a coordinate leaves the `i32` range.
    pub fn checked_add(self, other: BlockPos) -> Option<Self> {
        Some(Self::new(
            self.x.checked_add(other.x)?,
            self.y.checked_add(other.y)?,
            self.z.checked_add(other.z)?,
        ))
    }

    /// Component-wise minimum.
    pub fn min(self, other: BlockPos) -> Self {
        Self::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[i32; 3]> for BlockPos {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Wraps at the `i32` bounds; use [`BlockPos::checked_add`] where leaving
/// the range must be reported.
impl ops::Add for BlockPos {
    type Output = BlockPos;

    fn add(self, o: BlockPos) -> BlockPos {
        BlockPos::new(
            self.x.wrapping_add(o.x),
            self.y.wrapping_add(o.y),
            self.z.wrapping_add(o.z),
        )
    }
}

impl ops::Sub for BlockPos {
    type Output = BlockPos;

    fn sub(self, o: BlockPos) -> BlockPos {
        BlockPos::new(
            self.x.wrapping_sub(o.x),
            self.y.wrapping_sub(o.y),
            self.z.wrapping_sub(o.z),
        )
    }
}

impl std::fmt::Display for BlockPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{},{}]", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Structure size
// ---------------------------------------------------------------------------

/// Extent of a block volume along x (width), y (height) and z (length).
#[derive(Debug, Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
    pub length: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32, length: u32) -> Self {
        Self {
            width,
            height,
            length,
        }
    }

    pub fn volume(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.length as u64
    }

    pub fn is_empty(&self) -> bool {
        self.volume() == 0
    }

    /// Whether a structure-local position falls inside `[0, size)`.
    pub fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && (pos.x as u32) < self.width
            && (pos.y as u32) < self.height
            && (pos.z as u32) < self.length
    }

    /// Every local position in the volume, x fastest, then y, then z.
    /// Extents beyond `i32::MAX` are clamped, as no local coordinate can
    /// exceed it.
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> {
        let extent = |e: u32| i32::try_from(e).unwrap_or(i32::MAX);
        let (w, h, l) = (extent(self.width), extent(self.height), extent(self.length));
        (0..l).flat_map(move |z| (0..h).flat_map(move |y| (0..w).map(move |x| BlockPos::new(x, y, z))))
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.length)
    }
}

// ---------------------------------------------------------------------------
// Continuous positions (entities)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// The block containing this point.
    pub fn block_pos(&self) -> BlockPos {
        BlockPos::new(
            self.x.floor() as i32,
            self.y.floor() as i32,
            self.z.floor() as i32,
        )
    }
}

impl ops::Add<BlockPos> for Vec3 {
    type Output = Vec3;

    fn add(self, o: BlockPos) -> Vec3 {
        Vec3::new(self.x + o.x as f64, self.y + o.y as f64, self.z + o.z as f64)
    }
}

impl ops::Sub<BlockPos> for Vec3 {
    type Output = Vec3;

    fn sub(self, o: BlockPos) -> Vec3 {
        Vec3::new(self.x - o.x as f64, self.y - o.y as f64, self.z - o.z as f64)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Socket address the HTTP listener binds to.
    pub bind: String,
    /// Largest request body accepted, in bytes.
    pub max_body_bytes: usize,
    /// `DataVersion` stamped on captured structures.
    pub data_version: i32,
    /// Dimension used when a request names none.
    pub default_dimension: String,
    /// Largest block count a single capture may cover.
    pub max_capture_volume: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:9000".into(),
            max_body_bytes: 64 * 1024 * 1024,
            data_version: 3465,
            default_dimension: "overworld".into(),
            max_capture_volume: 16 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_positions_iterate_x_fastest() {
        let size = Size::new(2, 1, 2);
        let all: Vec<_> = size.positions().collect();
        assert_eq!(
            all,
            vec![
                BlockPos::new(0, 0, 0),
                BlockPos::new(1, 0, 0),
                BlockPos::new(0, 0, 1),
                BlockPos::new(1, 0, 1),
            ]
        );
    }

    #[test]
    fn size_contains_rejects_negative_and_edge() {
        let size = Size::new(3, 3, 3);
        assert!(size.contains(BlockPos::new(2, 2, 2)));
        assert!(!size.contains(BlockPos::new(3, 0, 0)));
        assert!(!size.contains(BlockPos::new(-1, 0, 0)));
    }

    #[test]
    fn checked_add_reports_overflow() {
        let edge = BlockPos::new(i32::MAX, 0, 0);
        assert_eq!(edge.checked_add(BlockPos::new(1, 0, 0)), None);
        assert_eq!(
            edge.checked_add(BlockPos::new(-1, 5, 0)),
            Some(BlockPos::new(i32::MAX - 1, 5, 0))
        );
        assert_eq!(edge + BlockPos::new(1, 0, 0), BlockPos::new(i32::MIN, 0, 0));
    }

    #[test]
    fn huge_extent_positions_stay_non_negative() {
        let size = Size::new(1u32 << 31, 1, 1);
        let first: Vec<_> = size.positions().take(2).collect();
        assert_eq!(first, vec![BlockPos::new(0, 0, 0), BlockPos::new(1, 0, 0)]);
    }

    #[test]
    fn vec3_block_pos_floors_negative() {
        assert_eq!(Vec3::new(-0.5, 1.9, 2.0).block_pos(), BlockPos::new(-1, 1, 2));
    }
}
