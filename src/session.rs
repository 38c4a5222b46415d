//! One interaction session: landmark source in, controller events out.
//!
//! The session is the only writer of the controller state and the object
//! roster. Renderers read them through the accessors.

use crate::config::{ControllerConfig, GestureConfig};
use crate::controller::{ControllerEvent, ControllerState, InteractionController, Mode, TickInput};
use crate::error::ConfigError;
use crate::gesture::{
    interpret_movement, interpret_symbol, ChangeFilter, GrabVector, MovementVector, PoseSymbol,
};
use crate::landmarks::LandmarkFrame;
use crate::resolver::ManipulableObject;
use crate::source::LandmarkSource;
use log::*;
use std::time::Duration;

/// Result of one [`Session::step`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    /// Set when a new frame changed the symbol.
    pub symbol_changed: Option<PoseSymbol>,
    /// Set when a new frame changed the movement vector.
    pub movement_changed: Option<MovementVector>,
    pub events: Vec<ControllerEvent>,
}

pub struct Session<S: LandmarkSource> {
    source: S,
    gesture_config: GestureConfig,
    symbol: ChangeFilter<PoseSymbol>,
    movement: ChangeFilter<MovementVector>,
    controller: InteractionController,
    objects: Vec<ManipulableObject>,
    last_timestamp: Option<u64>,
    last_frame: LandmarkFrame,
    stopped: bool,
}

impl<S: LandmarkSource> Session<S> {
    pub fn new(
        source: S,
        gesture_config: GestureConfig,
        controller_config: ControllerConfig,
        objects: Vec<ManipulableObject>,
    ) -> Result<Self, ConfigError> {
        gesture_config.validate()?;
        let controller = InteractionController::new(controller_config)?;
        info!(
            "Session started with {} objects in {} mode",
            objects.len(),
            controller.mode()
        );
        Ok(Self {
            source,
            gesture_config,
            symbol: ChangeFilter::default(),
            movement: ChangeFilter::default(),
            controller,
            objects,
            last_timestamp: None,
            last_frame: LandmarkFrame::empty(),
            stopped: false,
        })
    }

    /// Pull the newest frame, if any, and run one controller tick.
    ///
    /// Without a new frame the previous symbol and movement stay in effect.
    /// A stopped session does nothing.
    pub fn step(&mut self, grab: GrabVector, elapsed: Duration) -> Step {
        let mut step = Step::default();
        if self.stopped {
            return step;
        }

        if let Some(timestamped) = self.source.poll() {
            if self.in_order(timestamped.timestamp_ms) {
                let frame = &timestamped.frame;
                step.symbol_changed = self.symbol.update(interpret_symbol(frame));
                step.movement_changed = self
                    .movement
                    .update(interpret_movement(frame, &self.gesture_config));
                if let Some(symbol) = step.symbol_changed {
                    debug!("Pose symbol: {}", symbol);
                }
                if let Some(movement) = step.movement_changed {
                    debug!("Movement vector: {}", movement);
                }
                self.last_frame = timestamped.frame;
            } else {
                warn!(
                    "Ignoring out of order frame {} after {:?}",
                    timestamped.timestamp_ms, self.last_timestamp
                );
            }
        }

        let input = TickInput {
            symbol: self.symbol.current(),
            movement: self.movement.current(),
            grab,
            elapsed,
        };
        step.events = self.controller.tick(&input, &mut self.objects);
        step
    }

    fn in_order(&mut self, timestamp_ms: u64) -> bool {
        match self.last_timestamp {
            Some(last) if timestamp_ms < last => false,
            _ => {
                self.last_timestamp = Some(timestamp_ms);
                true
            }
        }
    }

    pub fn state(&self) -> &ControllerState {
        self.controller.state()
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn symbol(&self) -> PoseSymbol {
        self.symbol.current()
    }

    pub fn movement(&self) -> MovementVector {
        self.movement.current()
    }

    pub fn objects(&self) -> &[ManipulableObject] {
        &self.objects
    }

    /// Landmarks of the last accepted frame, empty until one arrives.
    pub fn last_frame(&self) -> &LandmarkFrame {
        &self.last_frame
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// End the session. Stops the source and hands back the final roster.
    ///
    /// Later calls return an empty roster and leave the source alone.
    pub fn stop(&mut self) -> Vec<ManipulableObject> {
        if self.stopped {
            return Vec::new();
        }
        self.stopped = true;
        self.source.stop();
        info!("Session stopped");
        std::mem::take(&mut self.objects)
    }
}

impl<S: LandmarkSource> Drop for Session<S> {
    fn drop(&mut self) {
        if !self.stopped {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::fixtures::*;
    use crate::landmarks::{BodyLandmark, LandmarkFrame, TimestampedFrame};
    use crate::source::ReplaySource;
    use nalgebra as na;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Source that never yields frames and counts `stop` calls.
    struct CountingSource {
        stops: Rc<Cell<usize>>,
    }

    impl LandmarkSource for CountingSource {
        fn poll(&mut self) -> Option<TimestampedFrame> {
            None
        }

        fn stop(&mut self) {
            self.stops.set(self.stops.get() + 1);
        }
    }

    fn counting_session(stops: &Rc<Cell<usize>>) -> Session<CountingSource> {
        Session::new(
            CountingSource {
                stops: stops.clone(),
            },
            GestureConfig::default(),
            ControllerConfig::default(),
            vec![ManipulableObject::new("cube", na::Point3::origin())],
        )
        .unwrap()
    }

    fn frames(frames: Vec<LandmarkFrame>) -> ReplaySource {
        ReplaySource::new(
            frames
                .into_iter()
                .enumerate()
                .map(|(i, frame)| TimestampedFrame {
                    timestamp_ms: i as u64 * 33,
                    frame,
                }),
        )
    }

    fn session(source: ReplaySource, objects: Vec<ManipulableObject>) -> Session<ReplaySource> {
        Session::new(
            source,
            GestureConfig::default(),
            ControllerConfig::default(),
            objects,
        )
        .unwrap()
    }

    fn tick(session: &mut Session<ReplaySource>, grab: GrabVector) -> Step {
        session.step(grab, Duration::from_millis(16))
    }

    fn count_mode_changes(steps: &[Step]) -> usize {
        steps
            .iter()
            .flat_map(|step| step.events.iter())
            .filter(|e| matches!(e, ControllerEvent::ModeChanged(_)))
            .count()
    }

    #[test]
    fn test_invalid_gesture_config_rejected() {
        let mut gesture = GestureConfig::default();
        gesture.fold_threshold = 0.0;
        let result = Session::new(
            frames(vec![]),
            gesture,
            ControllerConfig::default(),
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_circle_none_circle_from_frames() {
        let mut session = session(
            frames(vec![
                circle_frame(),
                circle_frame(),
                circle_frame(),
                neutral_frame(),
                circle_frame(),
                circle_frame(),
                circle_frame(),
            ]),
            vec![],
        );
        let mut steps = Vec::new();
        for _ in 0..7 {
            steps.push(tick(&mut session, GrabVector::default()));
        }
        assert_eq!(count_mode_changes(&steps), 2);
        assert_eq!(session.mode(), Mode::Camera);
    }

    #[test]
    fn test_changes_reported_once() {
        let mut session = session(
            frames(vec![circle_frame(), circle_frame(), neutral_frame()]),
            vec![],
        );
        let first = tick(&mut session, GrabVector::default());
        assert_eq!(first.symbol_changed, Some(PoseSymbol::Circle));
        let second = tick(&mut session, GrabVector::default());
        assert_eq!(second.symbol_changed, None);
        let third = tick(&mut session, GrabVector::default());
        assert_eq!(third.symbol_changed, Some(PoseSymbol::None));
    }

    #[test]
    fn test_previous_signals_hold_without_frames() {
        let folded = with_point(neutral_frame(), BodyLandmark::LeftWrist, 0.64, 0.52);
        let folded = with_point(folded, BodyLandmark::RightWrist, 0.36, 0.48);
        let mut session = session(frames(vec![folded]), vec![]);
        let start = session.state().camera.position;

        let first = tick(&mut session, GrabVector::default());
        assert_eq!(first.movement_changed, Some(MovementVector::new(0.0, 1.0, 0.0)));
        // source is drained, the forward impulse keeps applying
        let second = tick(&mut session, GrabVector::default());
        assert!(second.movement_changed.is_none());

        let moved = start.z - session.state().camera.position.z;
        assert!((moved - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_out_of_order_frame_ignored() {
        let source = ReplaySource::new(vec![
            TimestampedFrame {
                timestamp_ms: 100,
                frame: circle_frame(),
            },
            TimestampedFrame {
                timestamp_ms: 50,
                frame: neutral_frame(),
            },
            TimestampedFrame {
                timestamp_ms: 150,
                frame: circle_frame(),
            },
        ]);
        let mut session = session(source, vec![]);
        let mut steps = Vec::new();
        for _ in 0..3 {
            steps.push(tick(&mut session, GrabVector::default()));
        }
        // the stale neutral frame would have re-armed the toggle
        assert!(steps[1].symbol_changed.is_none());
        assert_eq!(count_mode_changes(&steps), 1);
        assert_eq!(session.mode(), Mode::Object);
    }

    #[test]
    fn test_empty_frame_rearms_toggle() {
        let mut session = session(
            frames(vec![
                circle_frame(),
                LandmarkFrame::empty(),
                circle_frame(),
            ]),
            vec![],
        );
        let mut steps = Vec::new();
        for _ in 0..3 {
            steps.push(tick(&mut session, GrabVector::default()));
        }
        assert_eq!(count_mode_changes(&steps), 2);
    }

    #[test]
    fn test_grab_moves_roster_object() {
        let marker = na::Point3::new(1.0, 0.5, 5.0);
        let far = marker + na::Vector3::new(15.0, 0.0, 0.0);
        let objects = vec![
            ManipulableObject::new("near", marker + na::Vector3::new(0.0, 0.0, -2.0)),
            ManipulableObject::new("far", far),
            ManipulableObject::environment("floor", marker),
        ];
        let mut session = session(frames(vec![circle_frame(), neutral_frame()]), objects);
        tick(&mut session, GrabVector::default());
        tick(&mut session, GrabVector::default());
        assert_eq!(session.mode(), Mode::Object);

        let step = tick(&mut session, GrabVector::new(0.0, 0.0, 0.0, true));
        assert!(step.events.iter().any(|e| matches!(e,
            ControllerEvent::ObjectGrabbed { id, .. } if id == "near"
        )));

        let roster = session.stop();
        assert!(na::distance(&roster[0].position, &marker) < 1e-5);
        assert_eq!(roster[1].position, far);
        assert_eq!(roster[2].position, marker);
    }

    #[test]
    fn test_last_frame_tracks_accepted_frames() {
        let source = ReplaySource::new(vec![
            TimestampedFrame {
                timestamp_ms: 100,
                frame: circle_frame(),
            },
            TimestampedFrame {
                timestamp_ms: 50,
                frame: neutral_frame(),
            },
        ]);
        let mut session = session(source, vec![]);
        assert!(session.last_frame().is_empty());
        tick(&mut session, GrabVector::default());
        assert_eq!(session.last_frame(), &circle_frame());
        // stale frame is not shown
        tick(&mut session, GrabVector::default());
        assert_eq!(session.last_frame(), &circle_frame());
    }

    #[test]
    fn test_drop_stops_source_once() {
        let stops = Rc::new(Cell::new(0));
        drop(counting_session(&stops));
        assert_eq!(stops.get(), 1);

        let stops = Rc::new(Cell::new(0));
        let mut session = counting_session(&stops);
        assert_eq!(session.stop().len(), 1);
        assert!(session.stop().is_empty());
        drop(session);
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_stopped_session_ignores_frames() {
        let mut session = session(frames(vec![circle_frame()]), vec![]);
        session.stop();
        assert!(session.is_stopped());
        let step = tick(&mut session, GrabVector::default());
        assert_eq!(step, Step::default());
        assert_eq!(session.mode(), Mode::Camera);
    }
}
