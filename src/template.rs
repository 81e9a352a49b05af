//! In-memory structure template: a captured block volume, its per-block
//! auxiliary records and the entities inside it.
//!
//! A template only ever holds auxiliary data on a block entry it owns, so a
//! record can never point at a position with no block.  Templates are built
//! either from a container tree ([`StructureTemplate::from_tag`]), from a
//! live region ([`StructureTemplate::from_world`]) or from explicit parts
//! ([`StructureTemplate::from_parts`]); all three paths validate.

use crate::block::BlockState;
use crate::nbt::{self, as_compound, as_f64, as_i64, as_slice, CompoundExt, NbtCompound, NbtTag};
use crate::transform::{
    transform_entity_position, transform_position, transform_state, transform_yaw,
    TransformSettings,
};
use crate::types::{BlockPos, Size, Vec3};
use crate::world::{world_pos, BlockFlags, EntityRecord, WorldError, WorldRegion};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// `DataVersion` written when a template carries none of its own.
pub const DEFAULT_DATA_VERSION: i32 = 3465;

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("auxiliary data at {0} has no block")]
    OrphanAuxiliary(BlockPos),

    #[error("two blocks at {0}")]
    DuplicateBlock(BlockPos),

    #[error("block at {pos} lies outside size {size}")]
    OutOfBounds { pos: BlockPos, size: Size },

    #[error("palette index {index} out of range (palette has {len} entries)")]
    PaletteIndex { index: i32, len: usize },

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("bad field `{field}`: {reason}")]
    BadField { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntry {
    /// Position relative to the structure origin, untransformed.
    pub pos: BlockPos,
    pub state: BlockState,
    /// Block entity state, stitched in after capture or applied after placement.
    pub nbt: Option<NbtCompound>,
}

impl BlockEntry {
    pub fn new(pos: BlockPos, state: BlockState) -> Self {
        Self {
            pos,
            state,
            nbt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityEntry {
    /// Position relative to the structure origin.
    pub pos: Vec3,
    pub block_pos: BlockPos,
    pub nbt: NbtCompound,
}

/// Counters filled in while a template is written to a region.  Stays valid
/// when the write stops early.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub blocks_written: usize,
    pub blocks_changed: usize,
    pub entities_spawned: usize,
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StructureTemplate {
    size: Size,
    data_version: i32,
    blocks: Vec<BlockEntry>,
    entities: Vec<EntityEntry>,
    index: HashMap<BlockPos, usize>,
}

impl StructureTemplate {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            data_version: DEFAULT_DATA_VERSION,
            blocks: Vec::new(),
            entities: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a template from block states plus a separate map of auxiliary
    /// records, rejecting any record whose position has no block.
    pub fn from_parts(
        size: Size,
        blocks: impl IntoIterator<Item = (BlockPos, BlockState)>,
        auxiliary: BTreeMap<BlockPos, NbtCompound>,
        entities: Vec<EntityEntry>,
    ) -> Result<Self, TemplateError> {
        let mut template = Self::new(size);
        for (pos, state) in blocks {
            template.push_block(BlockEntry::new(pos, state))?;
        }
        for (pos, data) in auxiliary {
            template.attach_auxiliary(pos, data)?;
        }
        template.entities = entities;
        Ok(template)
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn data_version(&self) -> i32 {
        self.data_version
    }

    pub fn set_data_version(&mut self, version: i32) {
        self.data_version = version;
    }

    pub fn blocks(&self) -> &[BlockEntry] {
        &self.blocks
    }

    pub fn entities(&self) -> &[EntityEntry] {
        &self.entities
    }

    pub fn block_at(&self, pos: BlockPos) -> Option<&BlockEntry> {
        self.index.get(&pos).map(|&i| &self.blocks[i])
    }

    pub fn push_block(&mut self, entry: BlockEntry) -> Result<(), TemplateError> {
        if !self.size.contains(entry.pos) {
            return Err(TemplateError::OutOfBounds {
                pos: entry.pos,
                size: self.size,
            });
        }
        if self.index.contains_key(&entry.pos) {
            return Err(TemplateError::DuplicateBlock(entry.pos));
        }
        self.index.insert(entry.pos, self.blocks.len());
        self.blocks.push(entry);
        Ok(())
    }

    pub fn push_entity(&mut self, entity: EntityEntry) {
        self.entities.push(entity);
    }

    /// Attach (or replace) the auxiliary record of the block at `pos`.
    pub fn attach_auxiliary(&mut self, pos: BlockPos, data: NbtCompound) -> Result<(), TemplateError> {
        let i = *self
            .index
            .get(&pos)
            .ok_or(TemplateError::OrphanAuxiliary(pos))?;
        self.blocks[i].nbt = Some(data);
        Ok(())
    }

    pub fn auxiliary_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.nbt.is_some()).count()
    }

    // -----------------------------------------------------------------------
    // World I/O
    // -----------------------------------------------------------------------

    /// Record every block in `[min, min + size)` relative to `min`, and the
    /// entities inside the box when asked.  Block entity state is not read
    /// here.
    pub fn from_world(
        region: &dyn WorldRegion,
        min: BlockPos,
        size: Size,
        include_entities: bool,
    ) -> Result<Self, WorldError> {
        let mut template = Self::new(size);
        for local in size.positions() {
            let state = region.block(world_pos(min, local)?)?;
            template.index.insert(local, template.blocks.len());
            template.blocks.push(BlockEntry::new(local, state));
        }

        if include_entities {
            for entity in region.entities_in(min, size)? {
                let mut data = entity.nbt;
                data.remove_key("UUID");
                template.entities.push(EntityEntry {
                    pos: entity.pos - min,
                    block_pos: entity.pos.block_pos() - min,
                    nbt: data,
                });
            }
        }
        Ok(template)
    }

    /// Write every block (and entity, when `settings.include_entities`) into
    /// `region` at `origin`; returns whether any block changed.
    pub fn to_world(
        &self,
        region: &dyn WorldRegion,
        origin: BlockPos,
        settings: &TransformSettings,
        flags: BlockFlags,
    ) -> Result<bool, WorldError> {
        let mut stats = WriteStats::default();
        self.write_to_world(region, origin, settings, flags, &mut stats)?;
        Ok(stats.blocks_changed > 0)
    }

    /// Like [`StructureTemplate::to_world`] but reports progress through
    /// `stats`, which stays meaningful when an error stops the write.
    pub fn write_to_world(
        &self,
        region: &dyn WorldRegion,
        origin: BlockPos,
        settings: &TransformSettings,
        flags: BlockFlags,
        stats: &mut WriteStats,
    ) -> Result<(), WorldError> {
        for entry in &self.blocks {
            let target = world_pos(origin, transform_position(entry.pos, settings))?;
            let state = transform_state(&entry.state, settings);
            if region.set_block(target, &state, flags)? {
                stats.blocks_changed += 1;
            }
            stats.blocks_written += 1;
        }

        if settings.include_entities {
            for entity in &self.entities {
                region.spawn_entity(place_entity(entity, origin, settings))?;
                stats.entities_spawned += 1;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Container tree
    // -----------------------------------------------------------------------

    /// Container tree: `DataVersion`, `size`, `palette`, `blocks`, `entities`.
    pub fn to_tag(&self) -> NbtCompound {
        let mut palette: Vec<&BlockState> = Vec::new();
        let mut palette_index: HashMap<&BlockState, i32> = HashMap::new();
        let mut blocks = Vec::with_capacity(self.blocks.len());

        for entry in &self.blocks {
            let state = *palette_index.entry(&entry.state).or_insert_with(|| {
                palette.push(&entry.state);
                (palette.len() - 1) as i32
            });
            let mut block = NbtCompound::new();
            block.insert("state", state);
            block.insert("pos", nbt::int_list(entry.pos.to_array()));
            if let Some(nbt) = &entry.nbt {
                block.insert("nbt", nbt.clone());
            }
            blocks.push(NbtTag::Compound(block));
        }

        let entities = self
            .entities
            .iter()
            .map(|e| {
                let mut tag = NbtCompound::new();
                tag.insert("pos", nbt::double_list(e.pos.to_array()));
                tag.insert("blockPos", nbt::int_list(e.block_pos.to_array()));
                tag.insert("nbt", e.nbt.clone());
                NbtTag::Compound(tag)
            })
            .collect();

        let size = self.size;
        let mut root = NbtCompound::new();
        root.insert("DataVersion", self.data_version);
        root.insert(
            "size",
            nbt::int_list([size.width as i32, size.height as i32, size.length as i32]),
        );
        root.insert(
            "palette",
            nbt::list(
                palette
                    .iter()
                    .map(|s| NbtTag::Compound(s.to_compound()))
                    .collect(),
            ),
        );
        root.insert("blocks", nbt::list(blocks));
        root.insert("entities", nbt::list(entities));
        root
    }

    /// Parse a container tree.  A file carrying several `palettes` uses the
    /// first one.
    pub fn from_tag(root: &NbtCompound) -> Result<Self, TemplateError> {
        let [w, h, l] = read_ints(root.tag("size").ok_or(TemplateError::MissingField("size"))?, "size")?;
        if w < 0 || h < 0 || l < 0 {
            return Err(TemplateError::BadField {
                field: "size",
                reason: format!("negative extent {}x{}x{}", w, h, l),
            });
        }
        let mut template = Self::new(Size::new(w as u32, h as u32, l as u32));
        if let Some(version) = root.get_int("DataVersion") {
            template.data_version = version;
        }

        let palette_tags = match root.get_list("palette") {
            Some(list) => list,
            None => root
                .get_list("palettes")
                .and_then(|all| all.first())
                .and_then(as_slice)
                .ok_or(TemplateError::MissingField("palette"))?,
        };
        let palette = palette_tags
            .iter()
            .map(|tag| {
                as_compound(tag)
                    .and_then(BlockState::from_compound)
                    .ok_or_else(|| TemplateError::BadField {
                        field: "palette",
                        reason: "entry without a Name".into(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for tag in root.get_list("blocks").unwrap_or_default() {
            let block = as_compound(tag).ok_or_else(|| TemplateError::BadField {
                field: "blocks",
                reason: "entry is not a compound".into(),
            })?;
            let index = block
                .get_int("state")
                .ok_or(TemplateError::MissingField("state"))?;
            let state = usize::try_from(index)
                .ok()
                .and_then(|i| palette.get(i))
                .ok_or(TemplateError::PaletteIndex {
                    index,
                    len: palette.len(),
                })?;
            let pos = read_ints(block.tag("pos").ok_or(TemplateError::MissingField("pos"))?, "pos")?;
            template.push_block(BlockEntry {
                pos: BlockPos::from(pos),
                state: state.clone(),
                nbt: block.get_compound("nbt").cloned(),
            })?;
        }

        for tag in root.get_list("entities").unwrap_or_default() {
            let entity = as_compound(tag).ok_or_else(|| TemplateError::BadField {
                field: "entities",
                reason: "entry is not a compound".into(),
            })?;
            let pos = read_doubles(
                entity.tag("pos").ok_or(TemplateError::MissingField("pos"))?,
                "pos",
            )?;
            let block_pos = match entity.tag("blockPos") {
                Some(tag) => BlockPos::from(read_ints(tag, "blockPos")?),
                None => pos.block_pos(),
            };
            template.entities.push(EntityEntry {
                pos,
                block_pos,
                nbt: entity
                    .get_compound("nbt")
                    .cloned()
                    .unwrap_or_else(NbtCompound::new),
            });
        }

        Ok(template)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn place_entity(entity: &EntityEntry, origin: BlockPos, settings: &TransformSettings) -> EntityRecord {
    let pos = transform_entity_position(entity.pos, settings) + origin;
    let mut data = entity.nbt.clone();
    // The world assigns a fresh identity to every spawned copy.
    data.remove_key("UUID");
    data.insert("Pos", nbt::double_list(pos.to_array()));
    let rotation = match data.get_list("Rotation") {
        Some([NbtTag::Float(yaw), pitch]) => Some((*yaw, pitch.clone())),
        _ => None,
    };
    if let Some((yaw, pitch)) = rotation {
        let yaw = NbtTag::Float(transform_yaw(yaw, settings));
        data.insert("Rotation", nbt::list(vec![yaw, pitch]));
    }
    EntityRecord { pos, nbt: data }
}

/// Three integers from an int list or int array.
fn read_ints(tag: &NbtTag, field: &'static str) -> Result<[i32; 3], TemplateError> {
    let values: Vec<i32> = match tag {
        NbtTag::IntArray(items) => items.clone(),
        NbtTag::List(items) => items
            .as_ref()
            .iter()
            .map(|t| as_i64(t).and_then(|v| i32::try_from(v).ok()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| TemplateError::BadField {
                field,
                reason: "expected integers".into(),
            })?,
        _ => {
            return Err(TemplateError::BadField {
                field,
                reason: "expected a list of three integers".into(),
            })
        }
    };
    <[i32; 3]>::try_from(values).map_err(|v| TemplateError::BadField {
        field,
        reason: format!("expected 3 values, found {}", v.len()),
    })
}

fn read_doubles(tag: &NbtTag, field: &'static str) -> Result<Vec3, TemplateError> {
    let bad = || TemplateError::BadField {
        field,
        reason: "expected a list of three numbers".into(),
    };
    match as_slice(tag) {
        Some([x, y, z]) => Ok(Vec3::new(
            as_f64(x).ok_or_else(bad)?,
            as_f64(y).ok_or_else(bad)?,
            as_f64(z).ok_or_else(bad)?,
        )),
        _ => Err(bad()),
    }
}
