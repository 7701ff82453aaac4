use std::collections::HashMap;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// The 14 body-landmark names a pose frame may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Landmark {
    Nose,
    ChestMid,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Landmark {
    pub const COUNT: usize = 14;

    pub const ALL: [Landmark; Self::COUNT] = [
        Self::Nose,
        Self::ChestMid,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    /// Wire name of the landmark, as sent by the pose source.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nose => "NOSE",
            Self::ChestMid => "CHEST_MID",
            Self::LeftShoulder => "LEFT_SHOULDER",
            Self::RightShoulder => "RIGHT_SHOULDER",
            Self::LeftElbow => "LEFT_ELBOW",
            Self::RightElbow => "RIGHT_ELBOW",
            Self::LeftWrist => "LEFT_WRIST",
            Self::RightWrist => "RIGHT_WRIST",
            Self::LeftHip => "LEFT_HIP",
            Self::RightHip => "RIGHT_HIP",
            Self::LeftKnee => "LEFT_KNEE",
            Self::RightKnee => "RIGHT_KNEE",
            Self::LeftAnkle => "LEFT_ANKLE",
            Self::RightAnkle => "RIGHT_ANKLE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.as_str() == name)
    }
}

/// One observation frame: landmark name → 2D coordinate.
///
/// Wraps the wire map as received. Keys outside the fixed vocabulary are
/// carried but never looked up; a mapping step that needs an absent key
/// simply does not run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: HashMap<String, [f32; 2]>,
}

impl LandmarkSet {
    pub fn new(points: HashMap<String, [f32; 2]>) -> Self {
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of entries received, including unknown names.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn get(&self, landmark: Landmark) -> Option<Point2<f32>> {
        self.points
            .get(landmark.as_str())
            .map(|&[x, y]| Point2::new(x, y))
    }

    /// All three joints of a chain, or `None` if any is missing.
    pub fn triple(&self, joints: [Landmark; 3]) -> Option<[Point2<f32>; 3]> {
        Some([
            self.get(joints[0])?,
            self.get(joints[1])?,
            self.get(joints[2])?,
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> LandmarkSet {
        let mut points = HashMap::new();
        points.insert("LEFT_SHOULDER".to_string(), [0.1, 0.2]);
        points.insert("LEFT_ELBOW".to_string(), [0.3, 0.4]);
        points.insert("LEFT_WRIST".to_string(), [0.5, 0.6]);
        LandmarkSet::new(points)
    }

    #[test]
    fn test_vocabulary_count() {
        assert_eq!(Landmark::ALL.len(), Landmark::COUNT);
        assert_eq!(Landmark::COUNT, 14);
    }

    #[test]
    fn test_name_roundtrip() {
        for landmark in Landmark::ALL {
            assert_eq!(Landmark::from_name(landmark.as_str()), Some(landmark));
        }
        assert_eq!(Landmark::from_name("LEFT_EYEBROW"), None);
    }

    #[test]
    fn test_serde_names_match_wire_names() {
        for landmark in Landmark::ALL {
            let json = serde_json::to_string(&landmark).unwrap();
            assert_eq!(json, format!("\"{}\"", landmark.as_str()));
        }
    }

    #[test]
    fn test_get_present_and_missing() {
        let set = sample_set();
        let p = set.get(Landmark::LeftElbow).unwrap();
        assert_eq!((p.x, p.y), (0.3, 0.4));
        assert!(set.get(Landmark::RightWrist).is_none());
    }

    #[test]
    fn test_triple_requires_all_joints() {
        let set = sample_set();
        let triple = set
            .triple([Landmark::LeftShoulder, Landmark::LeftElbow, Landmark::LeftWrist])
            .unwrap();
        assert_eq!((triple[0].x, triple[0].y), (0.1, 0.2));
        assert!(set
            .triple([Landmark::RightShoulder, Landmark::RightElbow, Landmark::RightWrist])
            .is_none());
    }

    #[test]
    fn test_len_counts_unknown_names() {
        let mut points = HashMap::new();
        points.insert("NOSE".to_string(), [0.5, 0.1]);
        points.insert("LEFT_EAR".to_string(), [0.4, 0.1]);
        let set = LandmarkSet::new(points);
        assert_eq!(set.len(), 2);
        assert!(set.get(Landmark::Nose).is_some());
    }
}
