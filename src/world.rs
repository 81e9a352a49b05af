//! World capability: the seam between the structure pipeline and whatever
//! owns the live blocks.
//!
//! The placer and capturer only ever talk to a [`WorldRegion`] handed to
//! them; they never reach for a global.  [`WorldHost`] resolves a dimension
//! name to a region and exposes the player roster.
//!
//! Implementations decide their own locking.  Nothing in this crate holds a
//! lock across a whole placement, so two placements into overlapping regions
//! may interleave block by block.

use crate::block::BlockState;
use crate::nbt::NbtCompound;
use crate::protocol::PlayerInfo;
use crate::types::{BlockPos, Size, Vec3};
use std::fmt;
use std::ops;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("position {0} is outside the world")]
    OutOfWorld(BlockPos),

    #[error("no block entity at {0}")]
    NoBlockEntity(BlockPos),

    #[error("offset {offset} from {origin} leaves the coordinate range")]
    Overflow { origin: BlockPos, offset: BlockPos },

    #[error("world operation failed: {0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Block update flags
// ---------------------------------------------------------------------------

/// Bitset passed along with every block write.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockFlags(u32);

impl BlockFlags {
    /// Notify neighbours (block update).
    pub const NEIGHBORS: BlockFlags = BlockFlags(1);
    /// Send the change to clients.
    pub const CLIENTS: BlockFlags = BlockFlags(2);
    pub const INVISIBLE: BlockFlags = BlockFlags(4);
    pub const IMMEDIATE: BlockFlags = BlockFlags(8);
    /// Skip neighbour shape reactions (fences connecting, observers pulsing).
    pub const KNOWN_SHAPE: BlockFlags = BlockFlags(16);
    /// Neighbour reactions do not drop items.
    pub const SUPPRESS_DROPS: BlockFlags = BlockFlags(32);
    pub const MOVED_BY_PISTON: BlockFlags = BlockFlags(64);

    pub const fn empty() -> Self {
        BlockFlags(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        BlockFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: BlockFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Flags for the `doBlockUpdates` / `spawnDrops` request options.
    pub fn from_options(do_block_updates: bool, spawn_drops: bool) -> Self {
        let updates = if do_block_updates {
            BlockFlags::NEIGHBORS
        } else {
            BlockFlags::KNOWN_SHAPE | BlockFlags::SUPPRESS_DROPS
        };
        let drops = if spawn_drops {
            BlockFlags::empty()
        } else {
            BlockFlags::SUPPRESS_DROPS
        };
        BlockFlags::CLIENTS | updates | drops
    }
}

impl ops::BitOr for BlockFlags {
    type Output = BlockFlags;

    fn bitor(self, rhs: BlockFlags) -> BlockFlags {
        BlockFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for BlockFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockFlags({:#09b})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// `origin + offset` as a world position.
pub fn world_pos(origin: BlockPos, offset: BlockPos) -> Result<BlockPos, WorldError> {
    origin
        .checked_add(offset)
        .ok_or(WorldError::Overflow { origin, offset })
}

/// An entity as the world stores it: position plus serialized state.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub pos: Vec3,
    pub nbt: NbtCompound,
}

/// Read/write access to one dimension's blocks, block entities and entities.
pub trait WorldRegion: Send + Sync {
    fn block(&self, pos: BlockPos) -> Result<BlockState, WorldError>;

    /// Write a block; returns whether the stored state changed.
    fn set_block(&self, pos: BlockPos, state: &BlockState, flags: BlockFlags)
        -> Result<bool, WorldError>;

    /// Serialized state of the block entity at `pos`, if one exists.
    fn block_entity(&self, pos: BlockPos) -> Result<Option<NbtCompound>, WorldError>;

    /// Overwrite an existing block entity's state.
    fn set_block_entity(&self, pos: BlockPos, data: NbtCompound) -> Result<(), WorldError>;

    /// Tell dependent systems that the block at `pos` changed.
    fn notify_change(&self, pos: BlockPos, flags: BlockFlags) -> Result<(), WorldError>;

    /// Entities whose position lies in `[min, min + size)`.
    fn entities_in(&self, min: BlockPos, size: Size) -> Result<Vec<EntityRecord>, WorldError>;

    fn spawn_entity(&self, entity: EntityRecord) -> Result<(), WorldError>;
}

/// Resolves dimensions and lists players.
pub trait WorldHost: Send + Sync {
    /// `None` selects the host's default dimension.
    fn level(&self, dimension: Option<&str>) -> Result<Arc<dyn WorldRegion>, WorldError>;

    fn players(&self) -> Vec<PlayerInfo>;
}
