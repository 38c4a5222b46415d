use crate::controller::{CameraPose, ControllerState, Mode};
use crate::error::SceneError;
use crate::landmarks::{BodyLandmark, LandmarkFrame};
use crate::resolver::ManipulableObject;
use kiss3d::camera::FirstPerson;
use kiss3d::scene::SceneNode;
use kiss3d::window::Window;
use nalgebra as na;
use palette::Srgb;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

fn default_size() -> f32 {
    0.5
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ObjectDescription {
    pub id: String,
    pub position: [f32; 3],
    #[serde(default)]
    pub environment: bool,
    /// Cube edge length in scene units.
    #[serde(default = "default_size")]
    pub size: f32,
}

/// Objects placed in the scene at session start.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SceneDescription {
    pub objects: Vec<ObjectDescription>,
}

impl SceneDescription {
    pub fn from_json(data: &[u8]) -> Result<Self, SceneError> {
        let description: SceneDescription = serde_json::from_slice(data)?;
        let mut seen = HashSet::new();
        for object in &description.objects {
            if !seen.insert(object.id.as_str()) {
                return Err(SceneError::DuplicateId(object.id.clone()));
            }
        }
        Ok(description)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    /// A floor with a few cubes in front of the default camera position.
    pub fn demo() -> Self {
        let cube = |id: &str, x: f32, z: f32| ObjectDescription {
            id: id.to_owned(),
            position: [x, 0.25, z],
            environment: false,
            size: default_size(),
        };
        SceneDescription {
            objects: vec![
                ObjectDescription {
                    id: String::from("floor"),
                    position: [0.0, -0.05, 0.0],
                    environment: true,
                    size: 8.0,
                },
                cube("red", -1.5, 0.0),
                cube("green", 0.0, -1.0),
                cube("blue", 1.5, 0.0),
            ],
        }
    }

    pub fn roster(&self) -> Vec<ManipulableObject> {
        self.objects
            .iter()
            .map(|object| ManipulableObject {
                id: object.id.clone(),
                position: na::Point3::from(na::Vector3::from(object.position)),
                is_environment: object.environment,
            })
            .collect()
    }
}

fn set_color(node: &mut SceneNode, color: Srgb) {
    node.set_color(color.red, color.green, color.blue);
}

fn object_color(index: usize) -> Srgb {
    const PALETTE: [(f32, f32, f32); 4] = [
        (0.9, 0.3, 0.2),
        (0.3, 0.8, 0.3),
        (0.2, 0.4, 0.9),
        (0.9, 0.8, 0.2),
    ];
    let (red, green, blue) = PALETTE[index % PALETTE.len()];
    Srgb::new(red, green, blue)
}

pub fn mode_color(mode: Mode) -> Srgb {
    match mode {
        Mode::Camera => Srgb::new(1.0, 1.0, 1.0),
        Mode::Object => Srgb::new(0.53, 0.96, 1.0),
    }
}

/// kiss3d nodes mirroring the object roster and grab marker.
///
/// Only reads controller state. Node order matches the roster order.
pub struct SceneView {
    nodes: Vec<SceneNode>,
    marker: SceneNode,
}

impl SceneView {
    pub fn new(window: &mut Window, description: &SceneDescription) -> Self {
        let mut colored = 0;
        let nodes = description
            .objects
            .iter()
            .map(|object| {
                if object.environment {
                    let mut node = window.add_cube(object.size, 0.1, object.size);
                    node.set_color(0.3, 0.3, 0.3);
                    node
                } else {
                    let mut node = window.add_cube(object.size, object.size, object.size);
                    set_color(&mut node, object_color(colored));
                    colored += 1;
                    node
                }
            })
            .collect();

        let mut marker = window.add_sphere(0.1);
        set_color(&mut marker, mode_color(Mode::Object));
        marker.set_visible(false);

        Self { nodes, marker }
    }

    pub fn update(&mut self, objects: &[ManipulableObject], state: &ControllerState) {
        for (node, object) in self.nodes.iter_mut().zip(objects) {
            node.set_local_translation(na::Translation3::from(object.position.coords));
        }
        match state.grab_marker {
            Some(position) => {
                self.marker
                    .set_local_translation(na::Translation3::from(position.coords));
                self.marker.set_visible(true);
            }
            None => self.marker.set_visible(false),
        }
    }
}

pub fn create_camera(pose: &CameraPose) -> FirstPerson {
    let mut camera = FirstPerson::new(pose.position, pose.target());
    // the controller is the only thing allowed to move the camera
    camera.rebind_up_key(None);
    camera.rebind_down_key(None);
    camera.rebind_left_key(None);
    camera.rebind_right_key(None);
    camera
}

pub fn sync_camera(camera: &mut FirstPerson, pose: &CameraPose) {
    camera.look_at(pose.position, pose.target());
}

// ── Skeleton overlay ───────────────────────────────────────────────────────

const SKELETON: [(BodyLandmark, BodyLandmark); 7] = [
    (BodyLandmark::LeftShoulder, BodyLandmark::RightShoulder),
    (BodyLandmark::LeftShoulder, BodyLandmark::LeftElbow),
    (BodyLandmark::LeftElbow, BodyLandmark::LeftWrist),
    (BodyLandmark::RightShoulder, BodyLandmark::RightElbow),
    (BodyLandmark::RightElbow, BodyLandmark::RightWrist),
    (BodyLandmark::Nose, BodyLandmark::LeftEyeOuter),
    (BodyLandmark::Nose, BodyLandmark::RightEyeOuter),
];

/// Share of the shorter window side taken by the overlay box.
const OVERLAY_FRACTION: f32 = 0.3;
const OVERLAY_MARGIN: f32 = 10.0;

/// Upper body bones as planar line segments inside a `size` square around `center`.
///
/// Planar coordinates have y pointing up, image coordinates have y pointing down.
/// Frames without a full upper body give no segments.
pub fn skeleton_segments(
    frame: &LandmarkFrame,
    center: na::Point2<f32>,
    size: f32,
) -> Vec<(na::Point2<f32>, na::Point2<f32>)> {
    if !frame.has_upper_body() {
        return Vec::new();
    }
    let project = |landmark: BodyLandmark| {
        frame.get(landmark).map(|point| {
            na::Point2::new(
                center.x + (point.x - 0.5) * size,
                center.y - (point.y - 0.5) * size,
            )
        })
    };
    SKELETON
        .iter()
        .filter_map(|&(from, to)| Some((project(from)?, project(to)?)))
        .collect()
}

/// Draw the latest landmarks in the bottom right corner of the window.
pub fn draw_skeleton(window: &mut Window, frame: &LandmarkFrame, color: Srgb) {
    // planar units are logical pixels
    let hidpi = window.hidpi_factor() as f32;
    let width = window.width() as f32 / hidpi;
    let height = window.height() as f32 / hidpi;
    let size = width.min(height) * OVERLAY_FRACTION;
    let half = size / 2.0;
    let center = na::Point2::new(
        width / 2.0 - OVERLAY_MARGIN - half,
        -height / 2.0 + OVERLAY_MARGIN + half,
    );

    let border = na::Point3::new(0.4, 0.4, 0.4);
    let corners = [
        na::Point2::new(center.x - half, center.y - half),
        na::Point2::new(center.x + half, center.y - half),
        na::Point2::new(center.x + half, center.y + half),
        na::Point2::new(center.x - half, center.y + half),
    ];
    for i in 0..corners.len() {
        window.draw_planar_line(&corners[i], &corners[(i + 1) % corners.len()], &border);
    }

    let color = na::Point3::new(color.red, color.green, color.blue);
    for (from, to) in skeleton_segments(frame, center, size) {
        window.draw_planar_line(&from, &to, &color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_description() {
        let description = SceneDescription::from_json(
            br#"{"objects": [
                {"id": "floor", "position": [0, -1, 0], "environment": true, "size": 10},
                {"id": "box", "position": [1, 2, 3]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(description.objects.len(), 2);
        assert!(description.objects[0].environment);
        assert_eq!(description.objects[1].size, 0.5);
        assert!(!description.objects[1].environment);

        let roster = description.roster();
        assert_eq!(roster[1].id, "box");
        assert_eq!(roster[1].position, na::Point3::new(1.0, 2.0, 3.0));
        assert!(roster[0].is_environment);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = SceneDescription::from_json(
            br#"{"objects": [{"id": "a", "position": [0, 0, 0]}, {"id": "a", "position": [1, 0, 0]}]}"#,
        );
        assert!(matches!(result, Err(SceneError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn test_demo_scene_has_grabbable_objects() {
        let roster = SceneDescription::demo().roster();
        assert!(roster.iter().any(|object| object.is_environment));
        assert_eq!(roster.iter().filter(|object| !object.is_environment).count(), 3);
    }

    #[test]
    fn test_skeleton_segments_follow_frame() {
        use crate::gesture::fixtures::neutral_frame;

        let frame = neutral_frame();
        let segments = skeleton_segments(&frame, na::Point2::new(100.0, -50.0), 200.0);
        assert_eq!(segments.len(), SKELETON.len());

        // nose sits at (0.5, 0.2) in the image, above the box center
        let (nose, _) = segments[5];
        assert!((nose.x - 100.0).abs() < 1e-4);
        assert!((nose.y - (-50.0 + 0.3 * 200.0)).abs() < 1e-4);

        for (from, to) in segments {
            for point in [from, to].iter() {
                assert!((point.x - 100.0).abs() <= 100.0);
                assert!((point.y + 50.0).abs() <= 100.0);
            }
        }
    }

    #[test]
    fn test_skeleton_needs_upper_body() {
        let center = na::Point2::origin();
        assert!(skeleton_segments(&LandmarkFrame::empty(), center, 100.0).is_empty());
        let short = LandmarkFrame::new(vec![Default::default(); 12]);
        assert!(skeleton_segments(&short, center, 100.0).is_empty());
    }

    #[test]
    fn test_object_colors_cycle() {
        assert_eq!(object_color(0), object_color(4));
        assert_ne!(object_color(0), object_color(1));
    }
}
