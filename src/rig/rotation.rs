//! Segment rotations from Cartesian joint positions.
//!
//! All angles are degrees, counter-clockwise positive, in the convention of
//! a runtime that adds a child's rotation onto its parent's accumulated one.

use nalgebra::{Point2, Rotation2, Vector2};

/// Rotations resolved for one two-segment chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainRotation {
    /// World-space rotation of the proximal bone.
    pub proximal: f32,
    /// Rotation of the distal bone relative to the proximal one.
    pub distal: f32,
}

/// World angle of a vector in degrees. `atan2(0, 0)` is 0, so a zero-length
/// segment resolves to 0 instead of failing.
pub fn world_angle(v: Vector2<f32>) -> f32 {
    v.y.atan2(v.x).to_degrees()
}

/// Angle of `child` measured in the frame of a parent rotated by
/// `parent_deg`: rotate the vector back by the parent rotation, then take
/// its angle.
pub fn relative_angle(parent_deg: f32, child: Vector2<f32>) -> f32 {
    let unrotate = Rotation2::new(-parent_deg.to_radians());
    world_angle(unrotate * child)
}

/// Resolve both segment rotations for a joint triple: proximal joint `a`,
/// mid joint `b`, distal joint `c`.
pub fn resolve_chain(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> ChainRotation {
    let proximal = world_angle(b - a);
    let distal = relative_angle(proximal, c - b);
    ChainRotation { proximal, distal }
}
