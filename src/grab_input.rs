use crate::gesture::GrabVector;
use anyhow::{anyhow, Result};
use gilrs::{Axis, Button, Gilrs};

/// External channel supplying the hand offset and grab trigger.
pub trait GrabInput {
    fn read(&mut self) -> GrabVector;
}

/// No hand offset and trigger never held.
pub struct NoGrab;

impl GrabInput for NoGrab {
    fn read(&mut self) -> GrabVector {
        GrabVector::default()
    }
}

/// Reads the grab vector from the first connected gamepad.
///
/// The left stick moves the marker across the view, the right stick moves it
/// in depth and the south button holds the grab. Stick values are flipped into
/// image orientation, where positive y points down.
pub struct GamepadGrabInput {
    gilrs: Gilrs,
    deadzone: f32,
}

impl GamepadGrabInput {
    pub fn new(deadzone: f32) -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|error| anyhow!("Failed to open gamepads: {}", error))?;
        Ok(Self { gilrs, deadzone })
    }
}

impl GrabInput for GamepadGrabInput {
    fn read(&mut self) -> GrabVector {
        // force consume all events
        while self.gilrs.next_event().is_some() {}
        match self.gilrs.gamepads().find(|(_, gamepad)| gamepad.is_connected()) {
            Some((_, gamepad)) => GrabVector::new(
                -apply_deadzone(gamepad.value(Axis::LeftStickX), self.deadzone),
                -apply_deadzone(gamepad.value(Axis::LeftStickY), self.deadzone),
                apply_deadzone(gamepad.value(Axis::RightStickY), self.deadzone),
                gamepad.is_pressed(Button::South),
            ),
            None => GrabVector::default(),
        }
    }
}

fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() > deadzone {
        value
    } else {
        0.0
    }
}
