//! Abstract view over a hierarchical 2D bone rig.
//!
//! The control core never talks to a concrete rendering runtime; it drives
//! whatever implements [`Skeleton`]. The crate ships [`graph::BoneGraph`] as
//! a self-contained implementation, and an external runtime binds through an
//! adapter exposing the same operations.

pub mod graph;

pub use graph::{BoneDefinition, BoneGraph, SkeletonDefinition};

use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Read/write access to one bone.
///
/// Local `x`/`y` are in the parent's coordinate frame and `rotation` is
/// parent-relative degrees (counter-clockwise positive). World queries are
/// only valid after a transform refresh has run since the last local
/// mutation.
pub trait Bone {
    fn name(&self) -> &str;
    fn parent(&self) -> Option<&str>;
    /// Rest-pose length, the normalization basis for relative inputs.
    fn length(&self) -> f32;

    fn x(&self) -> f32;
    fn y(&self) -> f32;
    fn rotation(&self) -> f32;
    fn scale_x(&self) -> f32;
    fn scale_y(&self) -> f32;

    fn set_x(&mut self, x: f32);
    fn set_y(&mut self, y: f32);
    fn set_rotation(&mut self, degrees: f32);
    fn set_scale_x(&mut self, scale: f32);
    fn set_scale_y(&mut self, scale: f32);

    fn local_to_world(&self, local_x: f32, local_y: f32) -> (f32, f32);
    fn world_to_local(&self, world_x: f32, world_y: f32) -> (f32, f32);
}

/// The skeleton runtime, seen through the operations the control core needs.
pub trait Skeleton {
    fn bone(&self, name: &str) -> Option<&dyn Bone>;
    fn bone_mut(&mut self, name: &str) -> Option<&mut dyn Bone>;

    /// Recompute one bone's world transform from its parent's current one.
    fn update_bone_transform(&mut self, name: &str) -> Result<()>;
    /// Recompute every world transform in hierarchy order.
    fn update_world_transforms(&mut self);

    fn set_animation(&mut self, name: &str, looped: bool) -> Result<()>;
    /// Mark the matching skin active and every other skin inactive, then
    /// reload attachments.
    fn set_skin(&mut self, name: &str) -> Result<()>;

    /// Value-copy snapshot of the skeleton; does not alias live bone state.
    fn structure(&self) -> SkeletonStructure;
}

/// Query-only snapshot of the full skeleton.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SkeletonStructure {
    pub bones: HashMap<String, BoneInfo>,
    pub slots: HashMap<String, Vec<String>>,
    pub skins: Vec<String>,
    pub animations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoneInfo {
    pub name: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub position: [f32; 2],
    pub rotation: f32,
    pub scale: [f32; 2],
}
