//! Stateless command dispatcher.
//!
//! Each call is an independent transition from a raw request payload to a
//! response value. Every error class (malformed payloads, failed lookups,
//! bad input, runtime failures) is converted into a `status: "error"`
//! response here; nothing unwinds into the server loop.

use thiserror::Error;

use crate::pose::LandmarkSet;
use crate::protocol::{AppliedValues, CommandEnvelope, Response};
use crate::rig::PoseMapper;
use crate::skeleton::Skeleton;

/// Normalization basis when a bone reports no rest length.
pub const FALLBACK_BONE_LENGTH: f32 = 10.0;

/// A decoded, validated command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GetStructure,
    ControlBone(BoneControl),
    SetAnimation { name: String, looped: bool },
    SetSkin { name: String },
    UpdatePose { landmarks: LandmarkSet },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneControl {
    pub bone: String,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    pub normalize: bool,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Malformed command payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Unknown command type: {0}")]
    UnknownCommand(String),
    #[error("Missing {field} for {command}")]
    MissingField { command: &'static str, field: &'static str },
    #[error("Bone not found: {0}")]
    BoneNotFound(String),
    #[error("No MediaPipe landmarks provided")]
    EmptyLandmarks,
    #[error(transparent)]
    Runtime(#[from] anyhow::Error),
}

impl TryFrom<CommandEnvelope> for Command {
    type Error = DispatchError;

    fn try_from(envelope: CommandEnvelope) -> Result<Self, Self::Error> {
        match envelope.command_type.as_str() {
            "get_structure" => Ok(Self::GetStructure),
            "control_bone" => {
                let bone = envelope.bone_name.ok_or(DispatchError::MissingField {
                    command: "control_bone",
                    field: "BoneName",
                })?;
                Ok(Self::ControlBone(BoneControl {
                    bone,
                    x: envelope.x,
                    y: envelope.y,
                    rotation: envelope.rotation,
                    scale_x: envelope.scale_x,
                    scale_y: envelope.scale_y,
                    normalize: envelope.normalize,
                }))
            }
            "set_animation" => {
                let name = envelope.animation_name.ok_or(DispatchError::MissingField {
                    command: "set_animation",
                    field: "AnimationName",
                })?;
                Ok(Self::SetAnimation { name, looped: envelope.looped })
            }
            "set_skin" => {
                let name = envelope.skin_name.ok_or(DispatchError::MissingField {
                    command: "set_skin",
                    field: "SkinName",
                })?;
                Ok(Self::SetSkin { name })
            }
            "update_pose_from_mediapipe" => {
                let landmarks = envelope
                    .media_pipe_landmarks
                    .filter(|m| !m.is_empty())
                    .ok_or(DispatchError::EmptyLandmarks)?;
                Ok(Self::UpdatePose { landmarks: LandmarkSet::new(landmarks) })
            }
            other => Err(DispatchError::UnknownCommand(other.to_string())),
        }
    }
}

pub struct Dispatcher {
    mapper: PoseMapper,
}

impl Dispatcher {
    pub fn new(mapper: PoseMapper) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &PoseMapper {
        &self.mapper
    }

    /// Decode, route and execute one raw request payload. Never fails: every
    /// error becomes an error response.
    pub fn dispatch(&self, skeleton: &mut dyn Skeleton, payload: &[u8]) -> Response {
        match self.try_dispatch(skeleton, payload) {
            Ok(response) => response,
            Err(err) => Response::error(err.to_string()),
        }
    }

    fn try_dispatch(
        &self,
        skeleton: &mut dyn Skeleton,
        payload: &[u8],
    ) -> Result<Response, DispatchError> {
        let envelope: CommandEnvelope = serde_json::from_slice(payload)?;
        match Command::try_from(envelope)? {
            Command::GetStructure => Ok(Response::structure(skeleton.structure())),
            Command::ControlBone(control) => self.control_bone(skeleton, control),
            Command::SetAnimation { name, looped } => {
                skeleton.set_animation(&name, looped)?;
                Ok(Response::animation(name))
            }
            Command::SetSkin { name } => {
                skeleton.set_skin(&name)?;
                Ok(Response::skin(name))
            }
            Command::UpdatePose { landmarks } => self.update_pose(skeleton, &landmarks),
        }
    }

    fn control_bone(
        &self,
        skeleton: &mut dyn Skeleton,
        control: BoneControl,
    ) -> Result<Response, DispatchError> {
        let lookup = |name: &str| DispatchError::BoneNotFound(name.to_string());

        let (length, parent) = {
            let bone = skeleton.bone(&control.bone).ok_or_else(|| lookup(&control.bone))?;
            (bone.length(), bone.parent().map(str::to_owned))
        };

        let mut x = control.x;
        let mut y = control.y;
        let mut rotation = control.rotation;

        if control.normalize {
            let basis = if length > 0.0 { length } else { FALLBACK_BONE_LENGTH };
            match &parent {
                Some(parent_name) => {
                    // inputs are fractions of bone length offset from the
                    // parent's world origin; round-trip through world space
                    // to land in the bone's local frame
                    let (px, py) = skeleton
                        .bone(parent_name)
                        .ok_or_else(|| lookup(parent_name))?
                        .local_to_world(0.0, 0.0);
                    let world_x = px + x * basis;
                    let world_y = py + y * basis;
                    let bone = skeleton.bone(&control.bone).ok_or_else(|| lookup(&control.bone))?;
                    (x, y) = bone.world_to_local(world_x, world_y);
                }
                None => {
                    // a root's local frame is the world frame; scale only
                    x *= basis;
                    y *= basis;
                }
            }
            rotation *= 360.0;
        }

        {
            let bone = skeleton.bone_mut(&control.bone).ok_or_else(|| lookup(&control.bone))?;
            bone.set_x(x);
            bone.set_y(y);
            bone.set_rotation(rotation);
            if let Some(scale_x) = control.scale_x {
                bone.set_scale_x(scale_x);
            }
            if let Some(scale_y) = control.scale_y {
                bone.set_scale_y(scale_y);
            }
        }
        skeleton.update_bone_transform(&control.bone)?;
        skeleton.update_world_transforms();

        let bone = skeleton.bone(&control.bone).ok_or_else(|| lookup(&control.bone))?;
        Ok(Response::bone_applied(
            &control.bone,
            AppliedValues {
                x: bone.x(),
                y: bone.y(),
                rotation: bone.rotation(),
                scale_x: bone.scale_x(),
                scale_y: bone.scale_y(),
            },
        ))
    }

    fn update_pose(
        &self,
        skeleton: &mut dyn Skeleton,
        landmarks: &LandmarkSet,
    ) -> Result<Response, DispatchError> {
        self.mapper.apply(skeleton, landmarks)?;
        // the reply counts entries received, as the upstream protocol does
        Ok(Response::pose_updated(landmarks.len()))
    }
}
