//! Gesture interpretation from body landmarks.
//!
//! Maps one [`LandmarkFrame`] to a discrete [`PoseSymbol`] and a directional
//! [`MovementVector`]. Both interpreters are pure functions of the frame, any
//! debounce lives with the caller. [`ChangeFilter`] implements the "emit only
//! on change" discipline used between the interpreter and the controller.

use crate::config::GestureConfig;
use crate::landmarks::{BodyLandmark, LandmarkFrame, LandmarkPoint};
use std::fmt;

// ── Signals ────────────────────────────────────────────────

/// Discrete gesture read from a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseSymbol {
    None,
    /// Both wrists above the head, close together.
    Circle,
    /// Both wrists below the head, crossed.
    Cross,
}

impl PoseSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "-",
            Self::Circle => "O",
            Self::Cross => "X",
        }
    }
}

impl Default for PoseSymbol {
    fn default() -> Self {
        PoseSymbol::None
    }
}

impl fmt::Display for PoseSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional impulses for one tick. Every field is -1, 0 or 1.
///
/// The rate at which impulses are applied is owned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MovementVector {
    /// +1 when the left arm is stretched out, -1 for the right arm.
    pub strafe: f32,
    /// +1 for arms folded, -1 for wrists raised to the shoulders.
    pub forward_back: f32,
    /// Always zero, kept so the vector lines up with [`GrabVector`].
    pub reserved: f32,
    pub yaw: f32,
}

impl MovementVector {
    pub fn new(strafe: f32, forward_back: f32, yaw: f32) -> Self {
        Self {
            strafe,
            forward_back,
            reserved: 0.0,
            yaw,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.strafe, self.forward_back, self.reserved, self.yaw]
    }
}

impl fmt::Display for MovementVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.strafe, self.forward_back, self.reserved, self.yaw
        )
    }
}

/// Hand offset and grab trigger supplied by an external channel.
///
/// The offsets are already normalized and are used by the controller as is.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GrabVector {
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    pub trigger: bool,
}

impl GrabVector {
    pub fn new(gx: f32, gy: f32, gz: f32, trigger: bool) -> Self {
        Self {
            gx,
            gy,
            gz,
            trigger,
        }
    }

    pub fn as_array(&self) -> [f32; 4] {
        [self.gx, self.gy, self.gz, if self.trigger { 1.0 } else { 0.0 }]
    }
}

// ── Interpretation ─────────────────────────────────────────

/// Upper body keypoints read by both interpreters.
struct UpperBody<'a> {
    nose: &'a LandmarkPoint,
    left_eye_outer: &'a LandmarkPoint,
    right_eye_outer: &'a LandmarkPoint,
    left_shoulder: &'a LandmarkPoint,
    right_shoulder: &'a LandmarkPoint,
    left_elbow: &'a LandmarkPoint,
    right_elbow: &'a LandmarkPoint,
    left_wrist: &'a LandmarkPoint,
    right_wrist: &'a LandmarkPoint,
}

impl<'a> UpperBody<'a> {
    fn from_frame(frame: &'a LandmarkFrame) -> Option<Self> {
        if !frame.has_upper_body() {
            return None;
        }
        Some(Self {
            nose: frame.get(BodyLandmark::Nose)?,
            left_eye_outer: frame.get(BodyLandmark::LeftEyeOuter)?,
            right_eye_outer: frame.get(BodyLandmark::RightEyeOuter)?,
            left_shoulder: frame.get(BodyLandmark::LeftShoulder)?,
            right_shoulder: frame.get(BodyLandmark::RightShoulder)?,
            left_elbow: frame.get(BodyLandmark::LeftElbow)?,
            right_elbow: frame.get(BodyLandmark::RightElbow)?,
            left_wrist: frame.get(BodyLandmark::LeftWrist)?,
            right_wrist: frame.get(BodyLandmark::RightWrist)?,
        })
    }

    fn torso_width(&self) -> f32 {
        (self.left_shoulder.x - self.right_shoulder.x).abs()
    }
}

/// Classify the gesture in `frame`. First match wins: circle, then cross.
pub fn interpret_symbol(frame: &LandmarkFrame) -> PoseSymbol {
    let body = match UpperBody::from_frame(frame) {
        Some(body) => body,
        None => return PoseSymbol::None,
    };

    let nose_y = body.nose.y;
    let wrist_gap = (body.left_wrist.x - body.right_wrist.x).abs();

    if body.left_wrist.y < nose_y && body.right_wrist.y < nose_y && wrist_gap < body.torso_width()
    {
        return PoseSymbol::Circle;
    }

    if body.left_wrist.y > nose_y
        && body.right_wrist.y > nose_y
        && body.left_wrist.x - body.right_wrist.x < 0.0
    {
        return PoseSymbol::Cross;
    }

    PoseSymbol::None
}

/// Derive the movement impulses in `frame`. Each axis is computed on its own.
pub fn interpret_movement(frame: &LandmarkFrame, config: &GestureConfig) -> MovementVector {
    match UpperBody::from_frame(frame) {
        Some(body) => MovementVector::new(
            strafe(&body),
            forward_back(&body, config),
            yaw(&body, config),
        ),
        None => MovementVector::zero(),
    }
}

fn yaw(body: &UpperBody<'_>, config: &GestureConfig) -> f32 {
    let mut yaw = 0.0;
    if (body.nose.x - body.right_eye_outer.x).abs() < config.yaw_threshold {
        yaw = 1.0;
    }
    // evaluated after the right eye so it wins when both fire
    if (body.nose.x - body.left_eye_outer.x).abs() < config.yaw_threshold {
        yaw = -1.0;
    }
    yaw
}

fn strafe(body: &UpperBody<'_>) -> f32 {
    let left_arm_span = (body.left_wrist.x - body.left_shoulder.x).abs();
    let right_arm_span = (body.right_wrist.x - body.right_shoulder.x).abs();
    let torso_width = body.torso_width();

    if left_arm_span > torso_width {
        1.0
    } else if right_arm_span > torso_width {
        -1.0
    } else {
        0.0
    }
}

fn forward_back(body: &UpperBody<'_>, config: &GestureConfig) -> f32 {
    let fold = config.fold_threshold;
    let raise = config.raise_threshold();

    let folded = near(body.left_wrist, body.left_elbow, fold)
        && near(body.right_wrist, body.right_elbow, fold);
    if folded {
        return 1.0;
    }

    let raised = near(body.left_wrist, body.left_shoulder, raise)
        && near(body.right_wrist, body.right_shoulder, raise);
    if raised {
        -1.0
    } else {
        0.0
    }
}

/// Whether `a` is within `threshold` of `b` on both image axes.
fn near(a: &LandmarkPoint, b: &LandmarkPoint, threshold: f32) -> bool {
    (a.x - b.x).abs() < threshold && (a.y - b.y).abs() < threshold
}

// ── Change detection ───────────────────────────────────────

/// Passes a value through only when it differs from the last one passed.
#[derive(Debug, Clone)]
pub struct ChangeFilter<T> {
    last: T,
}

impl<T: PartialEq + Copy> ChangeFilter<T> {
    pub fn new(initial: T) -> Self {
        Self { last: initial }
    }

    /// Returns `Some(value)` if `value` is different from the previous one.
    pub fn update(&mut self, value: T) -> Option<T> {
        if value == self.last {
            None
        } else {
            self.last = value;
            Some(value)
        }
    }

    pub fn current(&self) -> T {
        self.last
    }
}

impl<T: PartialEq + Copy + Default> Default for ChangeFilter<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::landmarks::{BodyLandmark, LandmarkFrame, LandmarkPoint, BODY_LANDMARK_COUNT};

    /// Standing body, arms hanging down, head turned so neither eye lines up
    /// with the nose.
    pub fn neutral_frame() -> LandmarkFrame {
        let mut points = vec![LandmarkPoint::new(0.5, 0.5, 0.0); BODY_LANDMARK_COUNT];
        points[BodyLandmark::Nose.index()] = LandmarkPoint::new(0.5, 0.2, 0.0);
        points[BodyLandmark::LeftEyeOuter.index()] = LandmarkPoint::new(0.56, 0.18, 0.0);
        points[BodyLandmark::RightEyeOuter.index()] = LandmarkPoint::new(0.44, 0.18, 0.0);
        points[BodyLandmark::LeftShoulder.index()] = LandmarkPoint::new(0.6, 0.35, 0.0);
        points[BodyLandmark::RightShoulder.index()] = LandmarkPoint::new(0.4, 0.35, 0.0);
        points[BodyLandmark::LeftElbow.index()] = LandmarkPoint::new(0.62, 0.5, 0.0);
        points[BodyLandmark::RightElbow.index()] = LandmarkPoint::new(0.38, 0.5, 0.0);
        points[BodyLandmark::LeftWrist.index()] = LandmarkPoint::new(0.63, 0.7, 0.0);
        points[BodyLandmark::RightWrist.index()] = LandmarkPoint::new(0.37, 0.7, 0.0);
        LandmarkFrame::new(points)
    }

    pub fn with_point(frame: LandmarkFrame, landmark: BodyLandmark, x: f32, y: f32) -> LandmarkFrame {
        let mut points = frame.points().to_vec();
        points[landmark.index()] = LandmarkPoint::new(x, y, 0.0);
        LandmarkFrame::new(points)
    }

    /// Both wrists above the nose, closer together than the shoulders.
    pub fn circle_frame() -> LandmarkFrame {
        let frame = with_point(neutral_frame(), BodyLandmark::LeftWrist, 0.53, 0.1);
        with_point(frame, BodyLandmark::RightWrist, 0.47, 0.1)
    }

    /// Both wrists below the nose, left wrist crossed over to the right side.
    pub fn cross_frame() -> LandmarkFrame {
        let frame = with_point(neutral_frame(), BodyLandmark::LeftWrist, 0.45, 0.6);
        with_point(frame, BodyLandmark::RightWrist, 0.55, 0.6)
    }
}

// ── Tests ──────────────────────────────────────────────────
