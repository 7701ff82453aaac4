//! The anatomical mapping table: which landmark triples drive which bone
//! pairs. Injected as a value so alternate anatomies can be swapped in
//! without touching the dispatch path.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::pose::Landmark;
use crate::skeleton::Skeleton;

/// A two-segment limb chain: proximal/mid/distal joints driving a
/// proximal/distal bone pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimbMapping {
    pub joints: [Landmark; 3],
    pub proximal: String,
    pub distal: String,
}

/// Single-bone mapping: one landmark anchoring one bone's local position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorMapping {
    pub landmark: Landmark,
    pub bone: String,
}

/// Immutable anatomy description. The pose mapper drives the root anchor and
/// the limb chains; the head anchor is carried table data and checked by
/// [`MappingTable::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingTable {
    pub root: AnchorMapping,
    pub head: AnchorMapping,
    pub limbs: Vec<LimbMapping>,
}

impl MappingTable {
    /// The standard humanoid anatomy: both arms, both legs, root and head.
    pub fn standard() -> Self {
        let limb = |joints: [Landmark; 3], proximal: &str, distal: &str| LimbMapping {
            joints,
            proximal: proximal.to_string(),
            distal: distal.to_string(),
        };
        Self {
            root: AnchorMapping {
                landmark: Landmark::ChestMid,
                bone: "root".to_string(),
            },
            head: AnchorMapping {
                landmark: Landmark::Nose,
                bone: "head".to_string(),
            },
            limbs: vec![
                limb(
                    [Landmark::LeftShoulder, Landmark::LeftElbow, Landmark::LeftWrist],
                    "upper_arm_l",
                    "lower_arm_l",
                ),
                limb(
                    [Landmark::RightShoulder, Landmark::RightElbow, Landmark::RightWrist],
                    "upper_arm_r",
                    "lower_arm_r",
                ),
                limb(
                    [Landmark::LeftHip, Landmark::LeftKnee, Landmark::LeftAnkle],
                    "upper_leg_l",
                    "lower_leg_l",
                ),
                limb(
                    [Landmark::RightHip, Landmark::RightKnee, Landmark::RightAnkle],
                    "upper_leg_r",
                    "lower_leg_r",
                ),
            ],
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read mapping file {}", path.as_ref().display()))?;
        let table: MappingTable = serde_json::from_str(&content)?;
        Ok(table)
    }

    /// Every bone name referenced by this table, anchors included.
    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        [self.root.bone.as_str(), self.head.bone.as_str()]
            .into_iter()
            .chain(
                self.limbs
                    .iter()
                    .flat_map(|l| [l.proximal.as_str(), l.distal.as_str()]),
            )
    }

    /// Check that every referenced bone resolves in the live skeleton, so a
    /// mismatched rig fails at startup rather than mid-stream.
    pub fn validate(&self, skeleton: &dyn Skeleton) -> Result<()> {
        for name in self.bone_names() {
            if skeleton.bone(name).is_none() {
                bail!("Mapping references unknown bone: {name}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skeleton::BoneGraph;

    #[test]
    fn test_standard_table_shape() {
        let table = MappingTable::standard();
        assert_eq!(table.limbs.len(), 4);
        assert_eq!(table.root.landmark, Landmark::ChestMid);
        assert_eq!(table.root.bone, "root");
        assert_eq!(table.head.landmark, Landmark::Nose);
        // each limb uses a distinct bone pair
        let mut names: Vec<&str> = table
            .limbs
            .iter()
            .flat_map(|l| [l.proximal.as_str(), l.distal.as_str()])
            .collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_validate_against_standard_figure() {
        let graph = BoneGraph::standard_figure().unwrap();
        MappingTable::standard().validate(&graph).unwrap();
    }

    #[test]
    fn test_validate_rejects_missing_bone() {
        let graph = BoneGraph::standard_figure().unwrap();
        let mut table = MappingTable::standard();
        table.limbs[0].distal = "tentacle_l".to_string();
        let err = table.validate(&graph).unwrap_err();
        assert!(err.to_string().contains("tentacle_l"));
    }

    #[test]
    fn test_json_roundtrip_uses_wire_landmark_names() {
        let table = MappingTable::standard();
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("\"LEFT_SHOULDER\""));
        assert!(json.contains("\"CHEST_MID\""));
        let back: MappingTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
