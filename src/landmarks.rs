use serde::Deserialize;

/// Number of keypoints in a full body detection.
pub const BODY_LANDMARK_COUNT: usize = 33;

/// Body keypoint slots this crate reads.
///
/// Values are indices into the 33 slot body schema used by the estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeOuter = 7,
    RightEyeOuter = 8,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
}

impl BodyLandmark {
    pub fn index(self) -> usize {
        self as usize
    }

    /// Smallest frame length that contains every slot above.
    pub const REQUIRED_LEN: usize = BodyLandmark::RightWrist as usize + 1;
}

/// A single keypoint in camera normalized space.
///
/// `x` and `y` are in [0, 1] relative to the image, smaller `y` is higher up.
/// `z` is relative depth, more negative is closer to the camera.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default)]
    pub visibility: Option<f32>,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }
}

/// Keypoints of the first detected body, or nothing if no body is in view.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LandmarkFrame {
    points: Vec<LandmarkPoint>,
}

impl LandmarkFrame {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    pub fn get(&self, landmark: BodyLandmark) -> Option<&LandmarkPoint> {
        self.points.get(landmark.index())
    }

    /// Whether every slot the interpreter reads is present.
    pub fn has_upper_body(&self) -> bool {
        self.points.len() >= BodyLandmark::REQUIRED_LEN
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedFrame {
    pub timestamp_ms: u64,
    pub frame: LandmarkFrame,
}

/// Detection message as published by the pose estimator.
#[derive(Deserialize, Debug)]
struct DetectionMessage {
    timestamp_ms: u64,
    #[serde(default)]
    landmarks: Vec<Vec<LandmarkPoint>>,
}

impl DetectionMessage {
    fn into_frame(self) -> TimestampedFrame {
        let frame = self
            .landmarks
            .into_iter()
            .next()
            .map(LandmarkFrame::new)
            .unwrap_or_default();
        TimestampedFrame {
            timestamp_ms: self.timestamp_ms,
            frame,
        }
    }
}

impl TimestampedFrame {
    /// Decode an estimator message. Bodies after the first are ignored.
    pub fn deserialize(data: &[u8]) -> Result<TimestampedFrame, serde_json::Error> {
        let message = serde_json::from_slice::<DetectionMessage>(data)?;
        Ok(message.into_frame())
    }
}
