//! Structure placement: write a template into a region, then copy the
//! captured block entity state onto the block entities the writes created.
//!
//! Placement is best effort.  A failing write stops the run and reports how
//! far it got; blocks already written stay in the world.

use crate::nbt::NbtCompound;
use crate::template::{StructureTemplate, WriteStats};
use crate::transform::{transform_position, TransformSettings};
use crate::types::BlockPos;
use crate::world::{world_pos, BlockFlags, WorldError, WorldRegion};
use log::{debug, info};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{source} (after {written} of {total} blocks)")]
pub struct PlacementError {
    #[source]
    pub source: WorldError,
    /// Blocks written before the failure.
    pub written: usize,
    pub total: usize,
}

/// Where and how one template is placed.  Built per request.
#[derive(Debug, Clone, Copy)]
pub struct PlacementRequest {
    pub origin: BlockPos,
    pub settings: TransformSettings,
    pub flags: BlockFlags,
}

impl PlacementRequest {
    pub fn new(origin: BlockPos) -> Self {
        Self {
            origin,
            settings: TransformSettings::identity(),
            flags: BlockFlags::from_options(true, false),
        }
    }

    pub fn with_settings(mut self, settings: TransformSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_flags(mut self, flags: BlockFlags) -> Self {
        self.flags = flags;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlacementResult {
    /// At least one block in the world changed.
    pub has_placed: bool,
    pub blocks_written: usize,
    pub blocks_changed: usize,
    pub block_entities_stitched: usize,
    /// Entries with block entity data whose target had no block entity.
    pub block_entities_missing: usize,
    pub entities_spawned: usize,
}

pub struct StructurePlacer<'a> {
    region: &'a dyn WorldRegion,
}

impl<'a> StructurePlacer<'a> {
    pub fn new(region: &'a dyn WorldRegion) -> Self {
        Self { region }
    }

    pub fn place(
        &self,
        template: &StructureTemplate,
        request: &PlacementRequest,
    ) -> Result<PlacementResult, PlacementError> {
        let total = template.blocks().len();
        let mut stats = WriteStats::default();
        template
            .write_to_world(
                self.region,
                request.origin,
                &request.settings,
                request.flags,
                &mut stats,
            )
            .map_err(|source| PlacementError {
                source,
                written: stats.blocks_written,
                total,
            })?;

        let mut result = PlacementResult {
            has_placed: stats.blocks_changed > 0,
            blocks_written: stats.blocks_written,
            blocks_changed: stats.blocks_changed,
            entities_spawned: stats.entities_spawned,
            ..PlacementResult::default()
        };

        // An unchanged placement keeps whatever state the world holds.
        if result.has_placed {
            self.stitch(template, request, &mut result)
                .map_err(|source| PlacementError {
                    source,
                    written: total,
                    total,
                })?;
        }

        info!(
            "placed {} at {}: {} changed, {} block entities, {} entities",
            template.size(),
            request.origin,
            result.blocks_changed,
            result.block_entities_stitched,
            result.entities_spawned
        );
        Ok(result)
    }

    fn stitch(
        &self,
        template: &StructureTemplate,
        request: &PlacementRequest,
        result: &mut PlacementResult,
    ) -> Result<(), WorldError> {
        for entry in template.blocks() {
            let Some(data) = &entry.nbt else { continue };
            let pos = world_pos(request.origin, transform_position(entry.pos, &request.settings))?;
            if self.region.block_entity(pos)?.is_none() {
                debug!("no block entity at {} for {}, skipping", pos, entry.state);
                result.block_entities_missing += 1;
                continue;
            }
            self.region.set_block_entity(pos, located(data, pos))?;
            self.region.notify_change(pos, request.flags)?;
            result.block_entities_stitched += 1;
        }
        Ok(())
    }
}

/// Block entity state carries its own world position.
fn located(data: &NbtCompound, pos: BlockPos) -> NbtCompound {
    let mut data = data.clone();
    data.insert("x", pos.x);
    data.insert("y", pos.y);
    data.insert("z", pos.z);
    data
}

#[cfg(all(test, feature = "server"))]
mod tests {
    use super::*;
    use crate::block::BlockState;
    use crate::memory::MemoryWorld;
    use crate::nbt::CompoundExt;
    use crate::template::BlockEntry;
    use crate::transform::Rotation;
    use crate::types::Size;

    fn chest_with_loot() -> StructureTemplate {
        let mut t = StructureTemplate::new(Size::new(2, 1, 1));
        t.push_block(BlockEntry::new(BlockPos::new(0, 0, 0), BlockState::new("stone")))
            .unwrap();
        t.push_block(BlockEntry::new(
            BlockPos::new(1, 0, 0),
            BlockState::new("chest").with("facing", "north"),
        ))
        .unwrap();
        let mut loot = NbtCompound::new();
        loot.insert("CustomName", "loot");
        t.attach_auxiliary(BlockPos::new(1, 0, 0), loot).unwrap();
        t
    }

    #[test]
    fn stitches_block_entity_at_rotated_position() {
        let world = MemoryWorld::new("test");
        let request = PlacementRequest::new(BlockPos::new(0, 64, 0))
            .with_settings(TransformSettings::identity().with_rotation(Rotation::Clockwise90));
        let result = StructurePlacer::new(&world)
            .place(&chest_with_loot(), &request)
            .unwrap();

        assert!(result.has_placed);
        assert_eq!(result.block_entities_stitched, 1);
        // (1, 0, 0) rotated clockwise about (0, 0) lands on (0, 0, 1).
        let pos = BlockPos::new(0, 64, 1);
        assert_eq!(world.block(pos).unwrap().property("facing"), Some("east"));
        let be = world.block_entity(pos).unwrap().unwrap();
        assert_eq!(be.get_str("CustomName"), Some("loot"));
        assert_eq!(be.get_int("z"), Some(1));
        assert_eq!(world.notifications().len(), 1);
    }

    #[test]
    fn missing_block_entity_is_skipped() {
        let mut t = StructureTemplate::new(Size::new(1, 1, 1));
        t.push_block(BlockEntry::new(BlockPos::ORIGIN, BlockState::new("stone")))
            .unwrap();
        t.attach_auxiliary(BlockPos::ORIGIN, NbtCompound::new()).unwrap();

        let world = MemoryWorld::new("test");
        let result = StructurePlacer::new(&world)
            .place(&t, &PlacementRequest::new(BlockPos::ORIGIN))
            .unwrap();
        assert!(result.has_placed);
        assert_eq!(result.block_entities_stitched, 0);
        assert_eq!(result.block_entities_missing, 1);
    }

    #[test]
    fn second_placement_changes_nothing() {
        let world = MemoryWorld::new("test");
        let placer = StructurePlacer::new(&world);
        let request = PlacementRequest::new(BlockPos::new(4, 0, 4));
        assert!(placer.place(&chest_with_loot(), &request).unwrap().has_placed);
        assert!(!placer.place(&chest_with_loot(), &request).unwrap().has_placed);
    }

    #[test]
    fn unchanged_placement_keeps_world_block_entities() {
        let world = MemoryWorld::new("test");
        let placer = StructurePlacer::new(&world);
        let request = PlacementRequest::new(BlockPos::ORIGIN);
        placer.place(&chest_with_loot(), &request).unwrap();

        let chest = BlockPos::new(1, 0, 0);
        let mut edited = NbtCompound::new();
        edited.insert("CustomName", "edited");
        world.set_block_entity(chest, edited).unwrap();
        let notified = world.notifications().len();

        let again = placer.place(&chest_with_loot(), &request).unwrap();
        assert!(!again.has_placed);
        assert_eq!(again.block_entities_stitched, 0);
        let be = world.block_entity(chest).unwrap().unwrap();
        assert_eq!(be.get_str("CustomName"), Some("edited"));
        assert_eq!(world.notifications().len(), notified);
    }

    #[test]
    fn origin_at_the_edge_fails_past_it() {
        let world = MemoryWorld::new("test");
        let err = StructurePlacer::new(&world)
            .place(
                &chest_with_loot(),
                &PlacementRequest::new(BlockPos::new(i32::MAX, 0, 0)),
            )
            .unwrap_err();
        assert!(matches!(err.source, WorldError::Overflow { .. }));
        assert_eq!(err.written, 1);
        assert_eq!(
            world.block(BlockPos::new(i32::MAX, 0, 0)).unwrap().name,
            "minecraft:stone"
        );
    }

    #[test]
    fn failure_keeps_earlier_blocks() {
        let world = MemoryWorld::with_height("short", 0, 1);
        let mut t = StructureTemplate::new(Size::new(1, 2, 1));
        t.push_block(BlockEntry::new(BlockPos::new(0, 0, 0), BlockState::new("stone")))
            .unwrap();
        t.push_block(BlockEntry::new(BlockPos::new(0, 1, 0), BlockState::new("stone")))
            .unwrap();

        let err = StructurePlacer::new(&world)
            .place(&t, &PlacementRequest::new(BlockPos::ORIGIN))
            .unwrap_err();
        assert_eq!(err.written, 1);
        assert_eq!(err.total, 2);
        assert_eq!(world.block(BlockPos::ORIGIN).unwrap().name, "minecraft:stone");
    }
}
