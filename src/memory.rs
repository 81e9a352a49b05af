//! In-memory world host.
//!
//! [`MemoryWorld`] is a sparse block volume with block entities, entities and
//! a change log; [`MemoryHost`] bundles three dimensions and a player roster.
//! The server binary runs on these, and so do the tests.  Every call takes
//! the lock for one block only.

use crate::block::BlockState;
use crate::nbt::{CompoundExt, NbtCompound, NbtTag};
use crate::protocol::PlayerInfo;
use crate::types::{BlockPos, Size, Vec3};
use crate::world::{BlockFlags, EntityRecord, WorldError, WorldHost, WorldRegion};
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Block names that carry a block entity.
const BLOCK_ENTITY_SUFFIXES: &[&str] = &[
    "chest",
    "barrel",
    "furnace",
    "smoker",
    "hopper",
    "dispenser",
    "dropper",
    "shulker_box",
    "sign",
    "banner",
    "beacon",
    "spawner",
    "lectern",
    "jukebox",
    "bed",
    "command_block",
    "structure_block",
    "bell",
    "campfire",
    "beehive",
    "bee_nest",
    "brewing_stand",
    "enchanting_table",
    "head",
    "skull",
];

pub fn has_block_entity(state: &BlockState) -> bool {
    let path = state.name.rsplit(':').next().unwrap_or(&state.name);
    BLOCK_ENTITY_SUFFIXES
        .iter()
        .any(|suffix| path == *suffix || path.ends_with(&format!("_{}", suffix)))
}

#[derive(Default)]
struct Cells {
    blocks: HashMap<BlockPos, BlockState>,
    block_entities: HashMap<BlockPos, NbtCompound>,
    entities: Vec<EntityRecord>,
    notifications: Vec<(BlockPos, BlockFlags)>,
}

/// A sparse block volume kept in memory; unset positions read as air.
pub struct MemoryWorld {
    name: String,
    min_y: i32,
    max_y: i32,
    cells: RwLock<Cells>,
}

impl MemoryWorld {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_height(name, -64, 320)
    }

    /// World with buildable `y` in `[min_y, max_y)`.
    pub fn with_height(name: impl Into<String>, min_y: i32, max_y: i32) -> Self {
        Self {
            name: name.into(),
            min_y,
            max_y,
            cells: RwLock::new(Cells::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn check(&self, pos: BlockPos) -> Result<(), WorldError> {
        if pos.y < self.min_y || pos.y >= self.max_y {
            return Err(WorldError::OutOfWorld(pos));
        }
        Ok(())
    }

    /// Number of non-air blocks stored.
    pub fn block_count(&self) -> usize {
        self.cells.read().blocks.len()
    }

    pub fn entity_count(&self) -> usize {
        self.cells.read().entities.len()
    }

    /// Every `notify_change` call received so far, oldest first.
    pub fn notifications(&self) -> Vec<(BlockPos, BlockFlags)> {
        self.cells.read().notifications.clone()
    }
}

impl WorldRegion for MemoryWorld {
    fn block(&self, pos: BlockPos) -> Result<BlockState, WorldError> {
        self.check(pos)?;
        Ok(self
            .cells
            .read()
            .blocks
            .get(&pos)
            .cloned()
            .unwrap_or_else(BlockState::air))
    }

    fn set_block(
        &self,
        pos: BlockPos,
        state: &BlockState,
        _flags: BlockFlags,
    ) -> Result<bool, WorldError> {
        self.check(pos)?;
        let mut cells = self.cells.write();
        let previous = cells.blocks.get(&pos);
        let same_block = previous.map(|p| p.name == state.name).unwrap_or(state.is_air());
        if previous.map(|p| p == state).unwrap_or(state.is_air()) {
            return Ok(false);
        }

        if state.is_air() {
            cells.blocks.remove(&pos);
        } else {
            cells.blocks.insert(pos, state.clone());
        }

        if !has_block_entity(state) {
            cells.block_entities.remove(&pos);
        } else if !same_block || !cells.block_entities.contains_key(&pos) {
            let mut fresh = NbtCompound::new();
            fresh.insert("id", NbtTag::String(state.name.clone()));
            cells.block_entities.insert(pos, fresh);
        }
        Ok(true)
    }

    fn block_entity(&self, pos: BlockPos) -> Result<Option<NbtCompound>, WorldError> {
        self.check(pos)?;
        Ok(self.cells.read().block_entities.get(&pos).cloned())
    }

    fn set_block_entity(&self, pos: BlockPos, data: NbtCompound) -> Result<(), WorldError> {
        self.check(pos)?;
        let mut cells = self.cells.write();
        let Some(existing) = cells.block_entities.get_mut(&pos) else {
            return Err(WorldError::NoBlockEntity(pos));
        };
        // The entity type belongs to the block, not to the incoming data.
        let id = existing.tag("id").cloned();
        *existing = data;
        if let Some(id) = id {
            existing.insert("id", id);
        }
        Ok(())
    }

    fn notify_change(&self, pos: BlockPos, flags: BlockFlags) -> Result<(), WorldError> {
        self.check(pos)?;
        debug!("{}: change at {} ({:?})", self.name, pos, flags);
        self.cells.write().notifications.push((pos, flags));
        Ok(())
    }

    fn entities_in(&self, min: BlockPos, size: Size) -> Result<Vec<EntityRecord>, WorldError> {
        let (x0, y0, z0) = (min.x as f64, min.y as f64, min.z as f64);
        let (x1, y1, z1) = (
            x0 + size.width as f64,
            y0 + size.height as f64,
            z0 + size.length as f64,
        );
        Ok(self
            .cells
            .read()
            .entities
            .iter()
            .filter(|e| {
                let p = e.pos;
                p.x >= x0 && p.x < x1 && p.y >= y0 && p.y < y1 && p.z >= z0 && p.z < z1
            })
            .cloned()
            .collect())
    }

    fn spawn_entity(&self, entity: EntityRecord) -> Result<(), WorldError> {
        self.check(entity.pos.block_pos())?;
        self.cells.write().entities.push(entity);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory host
// ---------------------------------------------------------------------------

/// Three fixed dimensions plus a player roster.
pub struct MemoryHost {
    default_dimension: String,
    levels: HashMap<String, Arc<MemoryWorld>>,
    players: RwLock<HashMap<String, Vec3>>,
}

impl MemoryHost {
    pub const DIMENSIONS: [&'static str; 3] = ["overworld", "the_nether", "the_end"];

    pub fn new(default_dimension: &str) -> Self {
        let levels = Self::DIMENSIONS
            .iter()
            .map(|name| {
                let world = match *name {
                    "overworld" => MemoryWorld::new(*name),
                    _ => MemoryWorld::with_height(*name, 0, 256),
                };
                (name.to_string(), Arc::new(world))
            })
            .collect();
        let default_dimension =
            canonical_dimension(default_dimension).unwrap_or("overworld").to_string();
        Self {
            default_dimension,
            levels,
            players: RwLock::new(HashMap::new()),
        }
    }

    /// Concrete handle to a dimension, for seeding and inspection.
    pub fn memory_level(&self, dimension: Option<&str>) -> Arc<MemoryWorld> {
        let name = dimension
            .and_then(canonical_dimension)
            .unwrap_or(self.default_dimension.as_str());
        match self.levels.get(name) {
            Some(level) => level.clone(),
            None => self.levels[self.default_dimension.as_str()].clone(),
        }
    }

    pub fn register_player(&self, name: impl Into<String>, position: Vec3) {
        self.players.write().insert(name.into(), position);
    }

    pub fn unregister_player(&self, name: &str) {
        self.players.write().remove(name);
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new("overworld")
    }
}

/// Accepts `nether`, `minecraft:the_nether`, `END` and similar spellings.
pub fn canonical_dimension(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_ascii_lowercase();
    let path = lower.strip_prefix("minecraft:").unwrap_or(&lower);
    match path {
        "overworld" => Some("overworld"),
        "nether" | "the_nether" => Some("the_nether"),
        "end" | "the_end" => Some("the_end"),
        _ => None,
    }
}

impl WorldHost for MemoryHost {
    fn level(&self, dimension: Option<&str>) -> Result<Arc<dyn WorldRegion>, WorldError> {
        if let Some(name) = dimension {
            if canonical_dimension(name).is_none() {
                debug!("unknown dimension '{}', using {}", name, self.default_dimension);
            }
        }
        let level: Arc<dyn WorldRegion> = self.memory_level(dimension);
        Ok(level)
    }

    fn players(&self) -> Vec<PlayerInfo> {
        let mut players: Vec<_> = self
            .players
            .read()
            .iter()
            .map(|(name, pos)| PlayerInfo {
                name: name.clone(),
                x: pos.x,
                y: pos.y,
                z: pos.z,
            })
            .collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        players
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_write_reports_no_change() {
        let world = MemoryWorld::new("test");
        let stone = BlockState::new("stone");
        let pos = BlockPos::new(0, 0, 0);
        assert!(world.set_block(pos, &stone, BlockFlags::CLIENTS).unwrap());
        assert!(!world.set_block(pos, &stone, BlockFlags::CLIENTS).unwrap());
        assert!(!world
            .set_block(BlockPos::new(1, 0, 0), &BlockState::air(), BlockFlags::CLIENTS)
            .unwrap());
    }

    #[test]
    fn block_entity_lifecycle_follows_block() {
        let world = MemoryWorld::new("test");
        let pos = BlockPos::new(4, 10, 4);
        let chest = BlockState::new("chest").with("facing", "north");
        world.set_block(pos, &chest, BlockFlags::CLIENTS).unwrap();
        let be = world.block_entity(pos).unwrap().unwrap();
        assert_eq!(be.get_str("id"), Some("minecraft:chest"));

        let mut data = NbtCompound::new();
        data.insert("CustomName", "loot");
        world.set_block_entity(pos, data).unwrap();

        // re-orienting the same block keeps its contents
        let turned = chest.clone().with("facing", "east");
        world.set_block(pos, &turned, BlockFlags::CLIENTS).unwrap();
        let be = world.block_entity(pos).unwrap().unwrap();
        assert_eq!(be.get_str("CustomName"), Some("loot"));

        world
            .set_block(pos, &BlockState::new("stone"), BlockFlags::CLIENTS)
            .unwrap();
        assert!(world.block_entity(pos).unwrap().is_none());
    }

    #[test]
    fn writes_outside_height_fail() {
        let world = MemoryWorld::with_height("test", 0, 16);
        let err = world
            .set_block(BlockPos::new(0, 16, 0), &BlockState::new("stone"), BlockFlags::CLIENTS)
            .unwrap_err();
        assert!(matches!(err, WorldError::OutOfWorld(_)));
    }

    #[test]
    fn dimension_names_are_lenient() {
        assert_eq!(canonical_dimension("minecraft:the_nether"), Some("the_nether"));
        assert_eq!(canonical_dimension("END"), Some("the_end"));
        assert_eq!(canonical_dimension("moon"), None);

        let host = MemoryHost::default();
        assert_eq!(host.memory_level(Some("nether")).name(), "the_nether");
        assert_eq!(host.memory_level(Some("moon")).name(), "overworld");
    }

    #[test]
    fn players_are_listed_by_name() {
        let host = MemoryHost::default();
        host.register_player("zoe", Vec3::new(1.0, 64.0, 1.0));
        host.register_player("alex", Vec3::zero());
        let names: Vec<_> = host.players().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["alex", "zoe"]);
    }
}
