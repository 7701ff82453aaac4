//! Wire protocol for the skeleton control channel.
//!
//! One length-delimited frame carries one JSON command; the reply is one
//! frame with a JSON response. Field names follow the upstream client
//! (`CommandType`, `BoneName`, `MediaPipeLandmarks`, ...), responses always
//! carry `status` plus a command-specific payload.

use std::collections::HashMap;

use anyhow::Result;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::skeleton::SkeletonStructure;

// --- Command payload ---

/// Raw command object as received. Scalar transform inputs default to zero,
/// `Normalize` and `Loop` default to true, matching the upstream sender.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", default)]
pub struct CommandEnvelope {
    pub command_type: String,
    pub bone_name: Option<String>,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: Option<f32>,
    pub scale_y: Option<f32>,
    pub normalize: bool,
    pub animation_name: Option<String>,
    #[serde(rename = "Loop")]
    pub looped: bool,
    pub skin_name: Option<String>,
    pub media_pipe_landmarks: Option<HashMap<String, [f32; 2]>>,
}

impl Default for CommandEnvelope {
    fn default() -> Self {
        Self {
            command_type: String::new(),
            bone_name: None,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_x: None,
            scale_y: None,
            normalize: true,
            animation_name: None,
            looped: true,
            skin_name: None,
            media_pipe_landmarks: None,
        }
    }
}

// --- Response payload ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Transform values actually applied to a bone, echoed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedValues {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Structure {
        data: SkeletonStructure,
    },
    Bone {
        bone: String,
        #[serde(rename = "appliedValues")]
        applied_values: AppliedValues,
    },
    Animation {
        animation: String,
    },
    Skin {
        skin: String,
    },
    PoseUpdated {
        updated_bones: usize,
    },
    Error {
        message: String,
    },
}

/// One reply on the wire: `status` plus the flattened payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: Status,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl Response {
    pub fn structure(data: SkeletonStructure) -> Self {
        Self { status: Status::Success, body: ResponseBody::Structure { data } }
    }

    pub fn bone_applied(bone: impl Into<String>, applied_values: AppliedValues) -> Self {
        Self {
            status: Status::Success,
            body: ResponseBody::Bone { bone: bone.into(), applied_values },
        }
    }

    pub fn animation(name: impl Into<String>) -> Self {
        Self { status: Status::Success, body: ResponseBody::Animation { animation: name.into() } }
    }

    pub fn skin(name: impl Into<String>) -> Self {
        Self { status: Status::Success, body: ResponseBody::Skin { skin: name.into() } }
    }

    pub fn pose_updated(updated_bones: usize) -> Self {
        Self { status: Status::Success, body: ResponseBody::PoseUpdated { updated_bones } }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { status: Status::Error, body: ResponseBody::Error { message: message.into() } }
    }
}

// --- Framed channel helpers ---

pub type MessageStream<S> = Framed<S, LengthDelimitedCodec>;

/// Frame a duplex byte channel with length-delimited framing.
pub fn message_stream<S: AsyncRead + AsyncWrite>(io: S, max_frame_len: usize) -> MessageStream<S> {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_len)
        .new_codec();
    Framed::new(io, codec)
}

/// Send one JSON-encoded message frame.
pub async fn send_message<S, T>(stream: &mut MessageStream<S>, msg: &T) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: Serialize,
{
    let data = serde_json::to_vec(msg)?;
    stream.send(Bytes::from(data)).await?;
    Ok(())
}

/// Receive and decode one message frame.
pub async fn recv_message<S, T>(stream: &mut MessageStream<S>) -> Result<T>
where
    S: AsyncRead + AsyncWrite + Unpin,
    T: DeserializeOwned,
{
    match stream.next().await {
        Some(Ok(bytes)) => Ok(serde_json::from_slice(&bytes)?),
        Some(Err(e)) => Err(e.into()),
        None => Err(anyhow::anyhow!("connection closed")),
    }
}
