//! Built-in bone-graph runtime.
//!
//! A rooted tree of bones with local transforms and cached world affines,
//! refreshed per bone or for the whole tree. Good enough to stand in for a
//! full rendering runtime behind the [`Skeleton`] trait: animations and
//! skins are registries with an active selection, not playback.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::{Bone, BoneInfo, Skeleton, SkeletonStructure};

/// One bone record of a skeleton definition file.
///
/// Definitions list parents before children; rest transforms default to the
/// identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoneDefinition {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub length: f32,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_scale")]
    pub scale_x: f32,
    #[serde(default = "default_scale")]
    pub scale_y: f32,
}

fn default_scale() -> f32 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkeletonDefinition {
    pub bones: Vec<BoneDefinition>,
    #[serde(default)]
    pub slots: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub skins: Vec<String>,
    #[serde(default)]
    pub animations: Vec<String>,
}

impl SkeletonDefinition {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read skeleton file {}", path.as_ref().display()))?;
        let def: SkeletonDefinition = serde_json::from_str(&content)?;
        Ok(def)
    }
}

#[derive(Debug, Clone)]
struct BoneNode {
    name: String,
    // parent index for traversal, parent name for the trait surface;
    // both fixed at construction
    parent_idx: Option<usize>,
    parent_name: Option<String>,
    length: f32,
    x: f32,
    y: f32,
    rotation: f32,
    scale_x: f32,
    scale_y: f32,
    // cached world affine: | a b world_x |
    //                      | c d world_y |
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    world_x: f32,
    world_y: f32,
}

impl BoneNode {
    fn local_matrix(&self) -> (f32, f32, f32, f32) {
        let (sin, cos) = self.rotation.to_radians().sin_cos();
        (
            cos * self.scale_x,
            -sin * self.scale_y,
            sin * self.scale_x,
            cos * self.scale_y,
        )
    }
}

impl Bone for BoneNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn parent(&self) -> Option<&str> {
        self.parent_name.as_deref()
    }

    fn length(&self) -> f32 {
        self.length
    }

    fn x(&self) -> f32 {
        self.x
    }

    fn y(&self) -> f32 {
        self.y
    }

    fn rotation(&self) -> f32 {
        self.rotation
    }

    fn scale_x(&self) -> f32 {
        self.scale_x
    }

    fn scale_y(&self) -> f32 {
        self.scale_y
    }

    fn set_x(&mut self, x: f32) {
        self.x = x;
    }

    fn set_y(&mut self, y: f32) {
        self.y = y;
    }

    fn set_rotation(&mut self, degrees: f32) {
        self.rotation = degrees;
    }

    fn set_scale_x(&mut self, scale: f32) {
        self.scale_x = scale;
    }

    fn set_scale_y(&mut self, scale: f32) {
        self.scale_y = scale;
    }

    fn local_to_world(&self, local_x: f32, local_y: f32) -> (f32, f32) {
        (
            self.a * local_x + self.b * local_y + self.world_x,
            self.c * local_x + self.d * local_y + self.world_y,
        )
    }

    fn world_to_local(&self, world_x: f32, world_y: f32) -> (f32, f32) {
        let dx = world_x - self.world_x;
        let dy = world_y - self.world_y;
        let det = self.a * self.d - self.b * self.c;
        if det.abs() < f32::EPSILON {
            // zero scale collapses the frame; pass the offset through
            return (dx, dy);
        }
        ((dx * self.d - dy * self.b) / det, (dy * self.a - dx * self.c) / det)
    }
}

#[derive(Debug, Clone)]
struct Skin {
    name: String,
    active: bool,
}

/// In-memory skeleton with cached world transforms.
#[derive(Debug, Clone)]
pub struct BoneGraph {
    // tree order: parents always precede children
    bones: Vec<BoneNode>,
    index: HashMap<String, usize>,
    slots: HashMap<String, Vec<String>>,
    skins: Vec<Skin>,
    animations: Vec<String>,
    playing: Option<(String, bool)>,
}

impl BoneGraph {
    pub fn from_definition(def: &SkeletonDefinition) -> Result<Self> {
        let mut bones = Vec::with_capacity(def.bones.len());
        let mut index = HashMap::new();
        for bone in &def.bones {
            if index.contains_key(&bone.name) {
                bail!("Duplicate bone: {}", bone.name);
            }
            let parent_idx = match &bone.parent {
                Some(parent) => match index.get(parent) {
                    Some(&i) => Some(i),
                    None => bail!("Parent {} of bone {} is not defined before it", parent, bone.name),
                },
                None => None,
            };
            index.insert(bone.name.clone(), bones.len());
            bones.push(BoneNode {
                name: bone.name.clone(),
                parent_idx,
                parent_name: bone.parent.clone(),
                length: bone.length,
                x: bone.x,
                y: bone.y,
                rotation: bone.rotation,
                scale_x: bone.scale_x,
                scale_y: bone.scale_y,
                a: 1.0,
                b: 0.0,
                c: 0.0,
                d: 1.0,
                world_x: 0.0,
                world_y: 0.0,
            });
        }

        let mut skins: Vec<Skin> = def
            .skins
            .iter()
            .map(|name| Skin { name: name.clone(), active: false })
            .collect();
        if !skins.iter().any(|s| s.name == "default") {
            skins.insert(0, Skin { name: "default".to_string(), active: false });
        }
        if let Some(first) = skins.iter_mut().find(|s| s.name == "default") {
            first.active = true;
        }

        let mut graph = Self {
            bones,
            index,
            slots: def.slots.clone(),
            skins,
            animations: def.animations.clone(),
            playing: None,
        };
        graph.update_world_transforms();
        Ok(graph)
    }

    /// The built-in humanoid rig whose bone names match the standard
    /// anatomical mapping.
    pub fn standard_figure() -> Result<Self> {
        Self::from_definition(&standard_figure_definition())
    }

    /// Currently selected animation track, if any.
    pub fn current_animation(&self) -> Option<(&str, bool)> {
        self.playing.as_ref().map(|(name, looped)| (name.as_str(), *looped))
    }

    /// Name of the skin currently marked active.
    pub fn active_skin(&self) -> Option<&str> {
        self.skins.iter().find(|s| s.active).map(|s| s.name.as_str())
    }

    fn compose(&mut self, i: usize) {
        let parent_world = self.bones[i].parent_idx.map(|p| {
            let p = &self.bones[p];
            (p.a, p.b, p.c, p.d, p.world_x, p.world_y)
        });
        let node = &mut self.bones[i];
        let (la, lb, lc, ld) = node.local_matrix();
        match parent_world {
            Some((pa, pb, pc, pd, pwx, pwy)) => {
                node.a = pa * la + pb * lc;
                node.b = pa * lb + pb * ld;
                node.c = pc * la + pd * lc;
                node.d = pc * lb + pd * ld;
                node.world_x = pa * node.x + pb * node.y + pwx;
                node.world_y = pc * node.x + pd * node.y + pwy;
            }
            None => {
                node.a = la;
                node.b = lb;
                node.c = lc;
                node.d = ld;
                node.world_x = node.x;
                node.world_y = node.y;
            }
        }
    }
}

impl Skeleton for BoneGraph {
    fn bone(&self, name: &str) -> Option<&dyn Bone> {
        self.index.get(name).map(|&i| &self.bones[i] as &dyn Bone)
    }

    fn bone_mut(&mut self, name: &str) -> Option<&mut dyn Bone> {
        let &i = self.index.get(name)?;
        Some(&mut self.bones[i] as &mut dyn Bone)
    }

    fn update_bone_transform(&mut self, name: &str) -> Result<()> {
        // recomputes from the parent's cached world transform; the parent
        // itself is not refreshed here
        match self.index.get(name) {
            Some(&i) => {
                self.compose(i);
                Ok(())
            }
            None => bail!("Bone not found: {name}"),
        }
    }

    fn update_world_transforms(&mut self) {
        for i in 0..self.bones.len() {
            self.compose(i);
        }
    }

    fn set_animation(&mut self, name: &str, looped: bool) -> Result<()> {
        if !self.animations.iter().any(|a| a == name) {
            bail!("Unknown animation: {name}");
        }
        self.playing = Some((name.to_string(), looped));
        Ok(())
    }

    fn set_skin(&mut self, name: &str) -> Result<()> {
        if !self.skins.iter().any(|s| s.name == name) {
            bail!("Unknown skin: {name}");
        }
        for skin in &mut self.skins {
            skin.active = skin.name == name;
        }
        Ok(())
    }

    fn structure(&self) -> SkeletonStructure {
        let mut children: HashMap<&str, Vec<String>> = HashMap::new();
        for bone in &self.bones {
            if let Some(parent) = bone.parent_name.as_deref() {
                children.entry(parent).or_default().push(bone.name.clone());
            }
        }

        let bones = self
            .bones
            .iter()
            .map(|bone| {
                let info = BoneInfo {
                    name: bone.name.clone(),
                    parent: bone.parent_name.clone(),
                    children: children.remove(bone.name.as_str()).unwrap_or_default(),
                    position: [bone.x, bone.y],
                    rotation: bone.rotation,
                    scale: [bone.scale_x, bone.scale_y],
                };
                (bone.name.clone(), info)
            })
            .collect();

        SkeletonStructure {
            bones,
            slots: self.slots.clone(),
            // the implicit default skin is not part of the snapshot
            skins: self
                .skins
                .iter()
                .filter(|s| s.name != "default")
                .map(|s| s.name.clone())
                .collect(),
            animations: self.animations.clone(),
        }
    }
}

/// Rest pose of the built-in humanoid figure. Proportions follow a ~380 unit
/// tall stick figure; limb bone names are the ones the standard anatomy
/// drives.
pub fn standard_figure_definition() -> SkeletonDefinition {
    let bone = |name: &str, parent: Option<&str>, length: f32, x: f32, y: f32, rotation: f32| {
        BoneDefinition {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            length,
            x,
            y,
            rotation,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    };

    let bones = vec![
        bone("root", None, 0.0, 0.0, 0.0, 0.0),
        bone("torso", Some("root"), 70.0, 0.0, 10.0, 90.0),
        bone("head", Some("torso"), 30.0, 70.0, 0.0, 0.0),
        bone("upper_arm_l", Some("torso"), 75.0, 55.0, 18.0, -160.0),
        bone("lower_arm_l", Some("upper_arm_l"), 60.0, 75.0, 0.0, -10.0),
        bone("hand_l", Some("lower_arm_l"), 20.0, 60.0, 0.0, 0.0),
        bone("upper_arm_r", Some("torso"), 75.0, 55.0, -18.0, 160.0),
        bone("lower_arm_r", Some("upper_arm_r"), 60.0, 75.0, 0.0, 10.0),
        bone("hand_r", Some("lower_arm_r"), 20.0, 60.0, 0.0, 0.0),
        bone("upper_leg_l", Some("root"), 75.0, 12.0, -5.0, -85.0),
        bone("lower_leg_l", Some("upper_leg_l"), 55.0, 75.0, 0.0, -5.0),
        bone("foot_l", Some("lower_leg_l"), 25.0, 55.0, 0.0, 85.0),
        bone("upper_leg_r", Some("root"), 75.0, -12.0, -5.0, -95.0),
        bone("lower_leg_r", Some("upper_leg_r"), 55.0, 75.0, 0.0, 5.0),
        bone("foot_r", Some("lower_leg_r"), 25.0, 55.0, 0.0, -85.0),
    ];

    let mut slots = HashMap::new();
    slots.insert("torso".to_string(), vec!["torso".to_string()]);
    slots.insert("head".to_string(), vec!["head".to_string(), "hair".to_string()]);

    SkeletonDefinition {
        bones,
        slots,
        skins: vec!["default".to_string(), "casual".to_string()],
        animations: vec!["idle".to_string(), "wave".to_string(), "walk".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_bone_chain() -> BoneGraph {
        let def = SkeletonDefinition {
            bones: vec![
                BoneDefinition {
                    name: "root".to_string(),
                    parent: None,
                    length: 0.0,
                    x: 10.0,
                    y: 20.0,
                    rotation: 0.0,
                    scale_x: 1.0,
                    scale_y: 1.0,
                },
                BoneDefinition {
                    name: "torso".to_string(),
                    parent: Some("root".to_string()),
                    length: 50.0,
                    x: 0.0,
                    y: 0.0,
                    rotation: 90.0,
                    scale_x: 1.0,
                    scale_y: 1.0,
                },
                BoneDefinition {
                    name: "head".to_string(),
                    parent: Some("torso".to_string()),
                    length: 20.0,
                    x: 50.0,
                    y: 0.0,
                    rotation: 0.0,
                    scale_x: 1.0,
                    scale_y: 1.0,
                },
            ],
            slots: HashMap::new(),
            skins: vec!["default".to_string(), "casual".to_string()],
            animations: vec!["idle".to_string()],
        };
        BoneGraph::from_definition(&def).unwrap()
    }

    #[test]
    fn test_structure_parent_and_children() {
        let graph = three_bone_chain();
        let structure = graph.structure();
        assert_eq!(structure.bones["torso"].parent.as_deref(), Some("root"));
        assert!(structure.bones["root"].children.contains(&"torso".to_string()));
        assert!(structure.bones["torso"].children.contains(&"head".to_string()));
        assert!(structure.bones["head"].children.is_empty());
    }

    #[test]
    fn test_structure_excludes_default_skin() {
        let graph = three_bone_chain();
        let structure = graph.structure();
        assert_eq!(structure.skins, vec!["casual".to_string()]);
        assert_eq!(structure.animations, vec!["idle".to_string()]);
    }

    #[test]
    fn test_structure_is_a_snapshot() {
        let mut graph = three_bone_chain();
        let before = graph.structure();
        graph.bone_mut("torso").unwrap().set_rotation(45.0);
        assert_eq!(before.bones["torso"].rotation, 90.0);
    }

    #[test]
    fn test_world_transform_composition() {
        let graph = three_bone_chain();
        // torso rotated 90°: its x axis points along world +y, so the head,
        // 50 units along torso, sits 50 above the root
        let (wx, wy) = graph.bone("head").unwrap().local_to_world(0.0, 0.0);
        assert!((wx - 10.0).abs() < 1e-4, "head world x: {wx}");
        assert!((wy - 70.0).abs() < 1e-4, "head world y: {wy}");
    }

    #[test]
    fn test_world_to_local_inverts_local_to_world() {
        let graph = three_bone_chain();
        let head = graph.bone("head").unwrap();
        let (wx, wy) = head.local_to_world(3.0, -4.0);
        let (lx, ly) = head.world_to_local(wx, wy);
        assert!((lx - 3.0).abs() < 1e-4);
        assert!((ly - -4.0).abs() < 1e-4);
    }

    #[test]
    fn test_per_bone_refresh_follows_parent_cache() {
        let mut graph = three_bone_chain();
        graph.bone_mut("root").unwrap().set_x(100.0);
        // head still composed against root's old cached world transform
        graph.update_bone_transform("head").unwrap();
        let (wx, _) = graph.bone("head").unwrap().local_to_world(0.0, 0.0);
        assert!((wx - 10.0).abs() < 1e-4);
        // full refresh propagates the move
        graph.update_world_transforms();
        let (wx, _) = graph.bone("head").unwrap().local_to_world(0.0, 0.0);
        assert!((wx - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_update_unknown_bone_fails() {
        let mut graph = three_bone_chain();
        let err = graph.update_bone_transform("tail").unwrap_err();
        assert!(err.to_string().contains("tail"));
    }

    #[test]
    fn test_set_animation_and_skin() {
        let mut graph = three_bone_chain();
        graph.set_animation("idle", false).unwrap();
        assert_eq!(graph.current_animation(), Some(("idle", false)));
        assert!(graph.set_animation("run", true).is_err());

        assert_eq!(graph.active_skin(), Some("default"));
        graph.set_skin("casual").unwrap();
        assert_eq!(graph.active_skin(), Some("casual"));
        let err = graph.set_skin("armor").unwrap_err();
        assert!(err.to_string().contains("armor"));
    }

    #[test]
    fn test_definition_rejects_unknown_parent() {
        let def = SkeletonDefinition {
            bones: vec![BoneDefinition {
                name: "arm".to_string(),
                parent: Some("torso".to_string()),
                length: 10.0,
                x: 0.0,
                y: 0.0,
                rotation: 0.0,
                scale_x: 1.0,
                scale_y: 1.0,
            }],
            ..Default::default()
        };
        assert!(BoneGraph::from_definition(&def).is_err());
    }

    #[test]
    fn test_definition_rejects_duplicate_bone() {
        let mut def = standard_figure_definition();
        def.bones.push(def.bones[0].clone());
        assert!(BoneGraph::from_definition(&def).is_err());
    }

    #[test]
    fn test_standard_figure_has_driven_bones() {
        let graph = BoneGraph::standard_figure().unwrap();
        for name in [
            "root",
            "head",
            "upper_arm_l",
            "lower_arm_l",
            "upper_arm_r",
            "lower_arm_r",
            "upper_leg_l",
            "lower_leg_l",
            "upper_leg_r",
            "lower_leg_r",
        ] {
            assert!(graph.bone(name).is_some(), "missing bone {name}");
        }
    }

    #[test]
    fn test_definition_json_roundtrip() {
        let def = standard_figure_definition();
        let json = serde_json::to_string(&def).unwrap();
        let back: SkeletonDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bones.len(), def.bones.len());
        assert_eq!(back.skins, def.skins);
    }
}
