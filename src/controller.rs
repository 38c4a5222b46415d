//! Interaction state machine.
//!
//! Consumes one [`PoseSymbol`], [`MovementVector`] and [`GrabVector`] per
//! rendered frame. In camera mode the signals steer the camera, in object mode
//! they place a grab marker in front of the camera and snap the nearest object
//! onto it while the trigger is held. A sustained circle gesture toggles the
//! mode exactly once; the latch re-arms only after a frame with no gesture.

use crate::config::{ControllerConfig, MotionIntegration};
use crate::error::ConfigError;
use crate::gesture::{GrabVector, MovementVector, PoseSymbol};
use crate::resolver::{self, ManipulableObject};
use log::{debug, info, trace};
use nalgebra as na;
use std::fmt;
use std::time::Duration;

/// Upper bound on the step scale in elapsed mode.
const MAX_CATCH_UP_TICKS: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Camera,
    Object,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Camera => "CAMERA",
            Mode::Object => "OBJECT",
        }
    }

    fn toggled(self) -> Self {
        match self {
            Mode::Camera => Mode::Object,
            Mode::Object => Mode::Camera,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Camera position and heading. Pitch and roll are always zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: na::Point3<f32>,
    pub yaw: f32,
}

impl CameraPose {
    pub fn rotation(&self) -> na::UnitQuaternion<f32> {
        na::UnitQuaternion::from_axis_angle(&na::Vector3::y_axis(), self.yaw)
    }

    /// Camera local x axis in world space.
    pub fn right(&self) -> na::Vector3<f32> {
        self.rotation() * na::Vector3::x()
    }

    /// Camera local z axis in world space. The camera looks down its negative z.
    pub fn back(&self) -> na::Vector3<f32> {
        self.rotation() * na::Vector3::z()
    }

    pub fn forward(&self) -> na::Vector3<f32> {
        -self.back()
    }

    /// A point one unit ahead of the camera, for look-at style cameras.
    pub fn target(&self) -> na::Point3<f32> {
        self.position + self.forward()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerState {
    pub mode: Mode,
    /// Set when the next circle gesture is allowed to toggle the mode.
    pub toggle_latch: bool,
    pub camera: CameraPose,
    /// Only present in object mode.
    pub grab_marker: Option<na::Point3<f32>>,
}

impl ControllerState {
    pub fn new(initial_position: na::Point3<f32>) -> Self {
        Self {
            mode: Mode::Camera,
            toggle_latch: true,
            camera: CameraPose {
                position: initial_position,
                yaw: 0.0,
            },
            grab_marker: None,
        }
    }
}

/// Object mode diagnostics, emitted every object mode tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabDiagnostic {
    pub trigger: bool,
    /// Distance to the closest grabbable object, regardless of threshold.
    pub nearest_distance: Option<f32>,
    pub object_count: usize,
}

impl fmt::Display for GrabDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let trigger = if self.trigger { 1 } else { 0 };
        match self.nearest_distance {
            Some(distance) => write!(
                f,
                "trigger: {} nearest: {:.2} objects: {}",
                trigger, distance, self.object_count
            ),
            None => write!(
                f,
                "trigger: {} nearest: - objects: {}",
                trigger, self.object_count
            ),
        }
    }
}

/// What changed during a tick, for the renderer and UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    ModeChanged(Mode),
    CameraMoved(CameraPose),
    MarkerMoved(na::Point3<f32>),
    /// The marker stops being rendered when object mode is left.
    MarkerHidden,
    ObjectGrabbed {
        id: String,
        position: na::Point3<f32>,
    },
    Diagnostic(GrabDiagnostic),
}

/// Signals for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickInput {
    pub symbol: PoseSymbol,
    pub movement: MovementVector,
    pub grab: GrabVector,
    /// Time since the previous tick. Only used with elapsed time integration.
    pub elapsed: Duration,
}

pub struct InteractionController {
    config: ControllerConfig,
    state: ControllerState,
}

impl InteractionController {
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = ControllerState::new(config.initial_position());
        Ok(Self { config, state })
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    /// Advance one frame.
    ///
    /// `objects` is the scene roster. It is only written when a grab lands.
    pub fn tick(
        &mut self,
        input: &TickInput,
        objects: &mut [ManipulableObject],
    ) -> Vec<ControllerEvent> {
        let mut events = Vec::new();

        if let Some(mode) = self.update_mode(input.symbol) {
            events.push(ControllerEvent::ModeChanged(mode));
            if mode == Mode::Camera && self.state.grab_marker.take().is_some() {
                events.push(ControllerEvent::MarkerHidden);
            }
        }

        match self.state.mode {
            Mode::Camera => {
                let scale = self.step_scale(input.elapsed);
                self.move_camera(&input.movement, scale);
                events.push(ControllerEvent::CameraMoved(self.state.camera));
            }
            Mode::Object => self.update_grab(&input.grab, objects, &mut events),
        }

        events
    }

    /// Edge triggered toggle. Returns the new mode if it changed.
    fn update_mode(&mut self, symbol: PoseSymbol) -> Option<Mode> {
        match symbol {
            PoseSymbol::Circle if self.state.toggle_latch => {
                self.state.toggle_latch = false;
                self.state.mode = self.state.mode.toggled();
                info!("Interaction mode: {}", self.state.mode);
                Some(self.state.mode)
            }
            PoseSymbol::None => {
                self.state.toggle_latch = true;
                None
            }
            _ => None,
        }
    }

    fn step_scale(&self, elapsed: Duration) -> f32 {
        match self.config.integration {
            MotionIntegration::PerTick => 1.0,
            MotionIntegration::Elapsed { reference_hz } => {
                (elapsed.as_secs_f32() * reference_hz).min(MAX_CATCH_UP_TICKS)
            }
        }
    }

    fn move_camera(&mut self, movement: &MovementVector, scale: f32) {
        let step = self.config.movement_speed * scale;
        let camera = &mut self.state.camera;
        let translation = camera.right() * (-movement.strafe * step)
            + camera.back() * (-movement.forward_back * step);
        camera.position += translation;
        camera.yaw += movement.yaw * self.config.rotation_speed * scale;
    }

    /// World position of the grab marker for the current camera pose.
    pub fn marker_position(&self, grab: &GrabVector) -> na::Point3<f32> {
        let hand = na::Vector3::new(grab.gx, grab.gy, grab.gz);
        let local = self.config.marker_scale().component_mul(&hand) + self.config.marker_offset();
        let camera = &self.state.camera;
        camera.position + camera.rotation() * local
    }

    fn update_grab(
        &mut self,
        grab: &GrabVector,
        objects: &mut [ManipulableObject],
        events: &mut Vec<ControllerEvent>,
    ) {
        let marker = self.marker_position(grab);
        self.state.grab_marker = Some(marker);
        events.push(ControllerEvent::MarkerMoved(marker));

        let diagnostic = GrabDiagnostic {
            trigger: grab.trigger,
            nearest_distance: resolver::nearest(objects, &marker).map(|found| found.distance),
            object_count: objects.len(),
        };
        trace!("{}", diagnostic);
        events.push(ControllerEvent::Diagnostic(diagnostic));

        if !grab.trigger {
            return;
        }
        if let Some(found) = resolver::resolve(objects, &marker, self.config.grab_threshold) {
            let object = &mut objects[found.index];
            object.position = marker;
            debug!("Grabbed {} at distance {:.2}", object.id, found.distance);
            events.push(ControllerEvent::ObjectGrabbed {
                id: object.id.clone(),
                position: marker,
            });
        }
    }
}
