//! Region capture: read a box of the world into a template and attach the
//! block entity state of every block that has one.

use crate::template::StructureTemplate;
use crate::types::{BlockPos, Size};
use crate::nbt::CompoundExt;
use crate::world::{world_pos, WorldError, WorldRegion};
use log::info;

/// A normalized box: `min` is the lowest corner, `size` never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRegion {
    pub min: BlockPos,
    pub size: Size,
}

impl CaptureRegion {
    /// Box spanned by `origin` and `origin + delta`; negative deltas extend
    /// towards lower coordinates.  `None` when the far corner does not fit
    /// an `i32`.
    pub fn from_deltas(origin: BlockPos, delta: BlockPos) -> Option<Self> {
        let far = origin.checked_add(delta)?;
        Some(Self {
            min: origin.min(far),
            size: Size::new(
                delta.x.unsigned_abs(),
                delta.y.unsigned_abs(),
                delta.z.unsigned_abs(),
            ),
        })
    }
}

pub struct StructureCapturer<'a> {
    region: &'a dyn WorldRegion,
    data_version: i32,
}

impl<'a> StructureCapturer<'a> {
    pub fn new(region: &'a dyn WorldRegion, data_version: i32) -> Self {
        Self {
            region,
            data_version,
        }
    }

    pub fn capture(
        &self,
        area: CaptureRegion,
        include_entities: bool,
    ) -> Result<StructureTemplate, WorldError> {
        let mut template =
            StructureTemplate::from_world(self.region, area.min, area.size, include_entities)?;
        template.set_data_version(self.data_version);

        let pending: Vec<BlockPos> = template
            .blocks()
            .iter()
            .filter(|entry| entry.nbt.is_none())
            .map(|entry| entry.pos)
            .collect();
        for local in pending {
            if let Some(mut data) = self.region.block_entity(world_pos(area.min, local)?)? {
                // Placement writes the target position back in.
                data.remove_key("x");
                data.remove_key("y");
                data.remove_key("z");
                template
                    .attach_auxiliary(local, data)
                    .map_err(|e| WorldError::Other(e.to_string()))?;
            }
        }

        info!(
            "captured {} at {}: {} blocks, {} block entities, {} entities",
            area.size,
            area.min,
            template.blocks().len(),
            template.auxiliary_count(),
            template.entities().len()
        );
        Ok(template)
    }
}
