//! Applies an anatomical mapping to a skeleton from one landmark frame.

use anyhow::Result;

use crate::pose::LandmarkSet;
use crate::rig::mapping::{LimbMapping, MappingTable};
use crate::rig::rotation;
use crate::skeleton::Skeleton;

/// What a single [`PoseMapper::apply`] call actually touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoseReport {
    pub root_updated: bool,
    pub limbs_updated: usize,
    pub limbs_skipped: usize,
}

pub struct PoseMapper {
    table: MappingTable,
}

impl PoseMapper {
    pub fn new(table: MappingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &MappingTable {
        &self.table
    }

    /// Drive the root anchor and every limb chain whose joints are all
    /// present, then refresh the whole skeleton once. A limb with missing
    /// joints or unresolvable bones is skipped without affecting the rest.
    pub fn apply(&self, skeleton: &mut dyn Skeleton, landmarks: &LandmarkSet) -> Result<PoseReport> {
        let mut report = PoseReport::default();

        // root: position only, no rotation
        if let Some(point) = landmarks.get(self.table.root.landmark) {
            if let Some(bone) = skeleton.bone_mut(&self.table.root.bone) {
                bone.set_x(point.x);
                bone.set_y(point.y);
                skeleton.update_bone_transform(&self.table.root.bone)?;
                report.root_updated = true;
            }
        }

        for limb in &self.table.limbs {
            if self.apply_limb(skeleton, landmarks, limb)? {
                report.limbs_updated += 1;
            } else {
                report.limbs_skipped += 1;
            }
        }

        skeleton.update_world_transforms();
        Ok(report)
    }

    fn apply_limb(
        &self,
        skeleton: &mut dyn Skeleton,
        landmarks: &LandmarkSet,
        limb: &LimbMapping,
    ) -> Result<bool> {
        let Some([a, b, c]) = landmarks.triple(limb.joints) else {
            return Ok(false);
        };
        if skeleton.bone(&limb.proximal).is_none() || skeleton.bone(&limb.distal).is_none() {
            return Ok(false);
        }

        let chain = rotation::resolve_chain(a, b, c);

        // the proximal bone is committed and refreshed before the distal
        // write, so consumers reading between the two see its new world
        // transform
        if let Some(bone) = skeleton.bone_mut(&limb.proximal) {
            bone.set_rotation(chain.proximal);
        }
        skeleton.update_bone_transform(&limb.proximal)?;

        if let Some(bone) = skeleton.bone_mut(&limb.distal) {
            bone.set_rotation(chain.distal);
        }
        skeleton.update_bone_transform(&limb.distal)?;

        Ok(true)
    }
}
